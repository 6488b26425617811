//! Slot persistence: one JSON document per save slot.
//!
//! RULE: Only store.rs touches the saves directory.
//! Layout:
//!   <dir>/<slot name>   slot document
//!   <dir>/.current      name of the selected slot (may be empty)

use crate::{
    error::{SimError, SimResult},
    slot::{SaveSlot, DEFAULT_DAY_LENGTH},
    types::Timestamp,
};
use rust_decimal::Decimal;
use std::fs;
use std::path::{Path, PathBuf};

const CURRENT_FILE: &str = ".current";
const README: &str = "README.md";

/// Name used when no slot exists yet.
pub const FIRST_SLOT: &str = "1";

/// How a slot name was picked for this invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotChoice {
    /// Named on the command line.
    Explicit(String),
    /// Read from the current-slot pointer.
    Current(String),
    /// No pointer; the only slot on disk.
    OnlySlot(String),
    /// No pointer and no slots; a new slot will be created.
    Fresh(String),
    /// No pointer and several slots; the caller must ask.
    Ambiguous(Vec<String>),
}

pub struct SlotStore {
    dir: PathBuf,
}

impl SlotStore {
    /// Open (or create) the saves directory at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> SimResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn exists(&self, name: &str) -> bool {
        validate_name(name).is_ok() && self.dir.join(name).is_file()
    }

    /// Slot names on disk, sorted.
    pub fn list(&self) -> SimResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || name == README || name.ends_with(".tmp") {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    pub fn load(&self, name: &str) -> SimResult<SaveSlot> {
        let path = self.slot_path(name)?;
        if !path.is_file() {
            return Err(SimError::SlotNotFound { name: name.to_string() });
        }
        let content = fs::read_to_string(&path)?;
        let node: serde_json::Value = serde_json::from_str(&content)?;
        SaveSlot::from_document(&node)
    }

    /// Load `name`, creating a default slot first if it does not exist.
    pub fn load_or_create(&self, name: &str, now: Timestamp) -> SimResult<SaveSlot> {
        if self.exists(name) {
            return self.load(name);
        }
        log::info!("Creating save slot '{name}'");
        let slot = SaveSlot::new(Decimal::ONE, DEFAULT_DAY_LENGTH, now)?;
        self.save(name, &slot)?;
        Ok(slot)
    }

    /// Write the slot document. The write goes through a temporary file
    /// so an interrupted save never truncates the slot.
    pub fn save(&self, name: &str, slot: &SaveSlot) -> SimResult<()> {
        let path = self.slot_path(name)?;
        let tmp = self.dir.join(format!(".{name}.tmp"));
        let json = serde_json::to_string_pretty(&slot.to_document()?)?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        log::debug!("Saved slot '{name}' to {}", path.display());
        Ok(())
    }

    // ── Current-slot pointer ───────────────────────────────────────

    pub fn current(&self) -> SimResult<Option<String>> {
        let path = self.dir.join(CURRENT_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let name = fs::read_to_string(path)?.trim().to_string();
        Ok((!name.is_empty()).then_some(name))
    }

    pub fn set_current(&self, name: &str) -> SimResult<()> {
        validate_name(name)?;
        fs::write(self.dir.join(CURRENT_FILE), name)?;
        Ok(())
    }

    pub fn clear_current(&self) -> SimResult<()> {
        fs::write(self.dir.join(CURRENT_FILE), "")?;
        Ok(())
    }

    /// Pick the slot for this invocation: the explicit name, else the
    /// pointer, else the only slot, else a fresh one.
    pub fn resolve(&self, explicit: Option<&str>) -> SimResult<SlotChoice> {
        if let Some(name) = explicit {
            validate_name(name)?;
            return Ok(SlotChoice::Explicit(name.to_string()));
        }
        if let Some(name) = self.current()? {
            return Ok(SlotChoice::Current(name));
        }
        let mut names = self.list()?;
        Ok(match names.len() {
            0 => SlotChoice::Fresh(FIRST_SLOT.to_string()),
            1 => SlotChoice::OnlySlot(names.remove(0)),
            _ => SlotChoice::Ambiguous(names),
        })
    }

    fn slot_path(&self, name: &str) -> SimResult<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(name))
    }
}

/// Slot names are plain file names: no separators, no leading dot.
fn validate_name(name: &str) -> SimResult<()> {
    let ok = !name.is_empty()
        && !name.starts_with('.')
        && name != README
        && !name.contains(['/', '\\']);
    if ok {
        Ok(())
    } else {
        Err(SimError::InvalidCommand(format!("invalid save slot name '{name}'")))
    }
}
