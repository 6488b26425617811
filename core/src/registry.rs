//! Variant registry and tagged serialization.
//!
//! Every persisted entity type implements `Tagged`: a stable lowercase
//! tag plus a conversion to and from its field dictionary. The registry
//! maps each tag to a constructor. It is built once, on first use, and
//! never changes afterwards.
//!
//! Document shape of an entity:
//!   { "<field>": <encoded value>, ..., "__type__": "<tag>" }
//!
//! RULE: `deserialize(serialize(x)) == x` for every registered variant.
//! Adding a field means updating both `to_fields` and `from_fields`.

use crate::{
    boost::{Advertisement, CdnSetup, Channels, Friends},
    error::{SimError, SimResult},
    slot::SaveSlot,
    transaction::Transaction,
    value::{self, Value, DECIMAL_KEY},
};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

/// Reserved document key carrying an entity's variant tag.
pub const TAG_KEY: &str = "__type__";

/// A persisted entity type.
pub trait Tagged: Sized {
    /// Lowercased type name. Never change a tag once documents exist.
    const TAG: &'static str;

    fn to_fields(&self) -> Fields;

    fn from_fields(fields: Fields) -> SimResult<Self>;
}

/// Every reconstructable entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Advertisement(Advertisement),
    CdnSetup(CdnSetup),
    Friends(Friends),
    Channels(Channels),
    Transaction(Transaction),
    SaveSlot(Box<SaveSlot>),
}

impl Entity {
    pub fn tag(&self) -> &'static str {
        match self {
            Entity::Advertisement(_) => Advertisement::TAG,
            Entity::CdnSetup(_)      => CdnSetup::TAG,
            Entity::Friends(_)       => Friends::TAG,
            Entity::Channels(_)      => Channels::TAG,
            Entity::Transaction(_)   => Transaction::TAG,
            Entity::SaveSlot(_)      => SaveSlot::TAG,
        }
    }
}

impl From<Advertisement> for Entity {
    fn from(v: Advertisement) -> Self { Entity::Advertisement(v) }
}

impl From<CdnSetup> for Entity {
    fn from(v: CdnSetup) -> Self { Entity::CdnSetup(v) }
}

impl From<Friends> for Entity {
    fn from(v: Friends) -> Self { Entity::Friends(v) }
}

impl From<Channels> for Entity {
    fn from(v: Channels) -> Self { Entity::Channels(v) }
}

impl From<Transaction> for Entity {
    fn from(v: Transaction) -> Self { Entity::Transaction(v) }
}

impl From<SaveSlot> for Entity {
    fn from(v: SaveSlot) -> Self { Entity::SaveSlot(Box::new(v)) }
}

// ── Registry ──────────────────────────────────────────────────────

type Constructor = fn(BTreeMap<String, Value>) -> SimResult<Entity>;

static REGISTRY: OnceLock<HashMap<&'static str, Constructor>> = OnceLock::new();

fn registry() -> &'static HashMap<&'static str, Constructor> {
    REGISTRY.get_or_init(|| {
        let mut table = HashMap::new();
        register::<Advertisement>(&mut table);
        register::<CdnSetup>(&mut table);
        register::<Friends>(&mut table);
        register::<Channels>(&mut table);
        register::<Transaction>(&mut table);
        register::<SaveSlot>(&mut table);
        table
    })
}

fn register<T: Tagged + Into<Entity>>(table: &mut HashMap<&'static str, Constructor>) {
    let previous = table.insert(T::TAG, construct::<T> as Constructor);
    debug_assert!(previous.is_none(), "duplicate variant tag {}", T::TAG);
}

fn construct<T: Tagged + Into<Entity>>(entries: BTreeMap<String, Value>) -> SimResult<Entity> {
    T::from_fields(Fields::from_entries(T::TAG, entries)).map(Into::into)
}

/// All registered tags, sorted.
pub fn registered_tags() -> Vec<&'static str> {
    let mut tags: Vec<_> = registry().keys().copied().collect();
    tags.sort_unstable();
    tags
}

// ── Serialize ─────────────────────────────────────────────────────

/// Encode any value tree, entities included, into a document node.
pub fn serialize(value: &Value) -> SimResult<serde_json::Value> {
    match value {
        Value::Entity(entity) => serialize_entity(entity),
        Value::List(items) | Value::Tuple(items) => Ok(serde_json::Value::Array(
            items.iter().map(serialize).collect::<SimResult<Vec<_>>>()?,
        )),
        Value::Map(entries) => {
            let mut obj = serde_json::Map::new();
            for (key, item) in entries {
                obj.insert(key.clone(), serialize(item)?);
            }
            Ok(serde_json::Value::Object(obj))
        }
        _ => value::encode(value),
    }
}

pub fn serialize_entity(entity: &Entity) -> SimResult<serde_json::Value> {
    match entity {
        Entity::Advertisement(v) => serialize_tagged(v),
        Entity::CdnSetup(v)      => serialize_tagged(v),
        Entity::Friends(v)       => serialize_tagged(v),
        Entity::Channels(v)      => serialize_tagged(v),
        Entity::Transaction(v)   => serialize_tagged(v),
        Entity::SaveSlot(v)      => serialize_tagged(v.as_ref()),
    }
}

/// Encode one tagged entity without wrapping it in an `Entity` first.
pub fn serialize_tagged<T: Tagged>(entity: &T) -> SimResult<serde_json::Value> {
    let mut obj = serde_json::Map::new();
    for (key, item) in entity.to_fields().entries {
        obj.insert(key, serialize(&item)?);
    }
    obj.insert(TAG_KEY.to_string(), serde_json::Value::String(T::TAG.to_string()));
    Ok(serde_json::Value::Object(obj))
}

// ── Deserialize ───────────────────────────────────────────────────

/// Decode a document node and reconstruct every tagged entity in it.
pub fn from_document(node: &serde_json::Value) -> SimResult<Value> {
    deserialize(value::decode(node)?)
}

/// Reconstruct tagged entities in an already-decoded value tree.
///
/// Walks bottom-up: children are rebuilt before their parent's
/// constructor sees them. Values that are already entities pass through
/// untouched, so calling this twice is harmless.
pub fn deserialize(value: Value) -> SimResult<Value> {
    match value {
        Value::List(items) => Ok(Value::List(
            items.into_iter().map(deserialize).collect::<SimResult<Vec<_>>>()?,
        )),
        Value::Tuple(items) => Ok(Value::Tuple(
            items.into_iter().map(deserialize).collect::<SimResult<Vec<_>>>()?,
        )),
        Value::Map(mut entries) => {
            if entries.len() == 1 {
                if let Some(Value::Text(literal)) = entries.get(DECIMAL_KEY) {
                    return literal
                        .parse::<Decimal>()
                        .map(Value::Decimal)
                        .map_err(|_| SimError::InvalidDecimal { literal: literal.clone() });
                }
            }
            let tag = entries.remove(TAG_KEY);
            let mut rebuilt = BTreeMap::new();
            for (key, item) in entries {
                rebuilt.insert(key, deserialize(item)?);
            }
            match tag {
                None => Ok(Value::Map(rebuilt)),
                Some(Value::Text(tag)) => {
                    let constructor = registry()
                        .get(tag.as_str())
                        .ok_or(SimError::UnknownVariant { tag })?;
                    Ok(Value::Entity(Box::new(constructor(rebuilt)?)))
                }
                Some(other) => Err(SimError::UnsupportedValue {
                    type_name: format!("{} variant tag", other.type_name()),
                }),
            }
        }
        other => Ok(other),
    }
}

// ── Field dictionaries ────────────────────────────────────────────

/// The field dictionary of one tagged entity.
///
/// Readers remove the field they read, and report errors against the
/// owning variant's tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Fields {
    tag:     &'static str,
    entries: BTreeMap<String, Value>,
}

impl Fields {
    pub fn new(tag: &'static str) -> Self {
        Self { tag, entries: BTreeMap::new() }
    }

    pub fn from_entries(tag: &'static str, entries: BTreeMap<String, Value>) -> Self {
        Self { tag, entries }
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.entries.insert(name.to_string(), value.into());
        self
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn take(&mut self, name: &str) -> SimResult<Value> {
        self.entries.remove(name).ok_or_else(|| SimError::MissingField {
            tag:   self.tag,
            field: name.to_string(),
        })
    }

    /// `None` when the field is absent or null.
    pub fn take_opt(&mut self, name: &str) -> Option<Value> {
        match self.entries.remove(name) {
            None | Some(Value::Null) => None,
            some => some,
        }
    }

    pub fn take_i64(&mut self, name: &str) -> SimResult<i64> {
        let value = self.take(name)?;
        self.as_i64(name, value)
    }

    pub fn take_u64(&mut self, name: &str) -> SimResult<u64> {
        let value = self.take(name)?;
        self.as_u64(name, value)
    }

    pub fn take_i32(&mut self, name: &str) -> SimResult<i32> {
        let value = self.take(name)?;
        self.as_i32(name, value)
    }

    pub fn take_opt_u64(&mut self, name: &str) -> SimResult<Option<u64>> {
        self.take_opt(name).map(|v| self.as_u64(name, v)).transpose()
    }

    pub fn take_bool(&mut self, name: &str) -> SimResult<bool> {
        match self.take(name)? {
            Value::Bool(b) => Ok(b),
            _ => Err(self.mismatch(name, "bool")),
        }
    }

    pub fn take_decimal(&mut self, name: &str) -> SimResult<Decimal> {
        let value = self.take(name)?;
        self.as_decimal(name, value)
    }

    pub fn take_list(&mut self, name: &str) -> SimResult<Vec<Value>> {
        match self.take(name)? {
            Value::List(items) | Value::Tuple(items) => Ok(items),
            _ => Err(self.mismatch(name, "list")),
        }
    }

    /// A list of entities, each converted to the concrete type `T`.
    pub fn take_entities<T>(&mut self, name: &str) -> SimResult<Vec<T>>
    where
        T: TryFrom<Entity, Error = SimError>,
    {
        self.take_list(name)?
            .into_iter()
            .map(|item| self.as_entity(name, item))
            .collect()
    }

    pub fn take_entity<T>(&mut self, name: &str) -> SimResult<T>
    where
        T: TryFrom<Entity, Error = SimError>,
    {
        let value = self.take(name)?;
        self.as_entity(name, value)
    }

    /// A two-element array, as written for tuple fields.
    pub fn as_pair(&self, name: &str, value: Value) -> SimResult<(Value, Value)> {
        match value {
            Value::List(items) | Value::Tuple(items) if items.len() == 2 => {
                let mut it = items.into_iter();
                match (it.next(), it.next()) {
                    (Some(a), Some(b)) => Ok((a, b)),
                    _ => Err(self.mismatch(name, "pair")),
                }
            }
            _ => Err(self.mismatch(name, "pair")),
        }
    }

    pub fn as_i64(&self, name: &str, value: Value) -> SimResult<i64> {
        match value {
            Value::Int(n) => Ok(n),
            _ => Err(self.mismatch(name, "integer")),
        }
    }

    pub fn as_u64(&self, name: &str, value: Value) -> SimResult<u64> {
        match value {
            Value::UInt(n) => Ok(n),
            Value::Int(n) => u64::try_from(n).map_err(|_| self.mismatch(name, "non-negative integer")),
            _ => Err(self.mismatch(name, "integer")),
        }
    }

    pub fn as_i32(&self, name: &str, value: Value) -> SimResult<i32> {
        let n = self.as_i64(name, value)?;
        i32::try_from(n).map_err(|_| self.mismatch(name, "32-bit integer"))
    }

    pub fn as_decimal(&self, name: &str, value: Value) -> SimResult<Decimal> {
        match value {
            Value::Decimal(d) => Ok(d),
            Value::Int(n) => Ok(Decimal::from(n)),
            Value::UInt(n) => Ok(Decimal::from(n)),
            _ => Err(self.mismatch(name, "decimal")),
        }
    }

    fn as_entity<T>(&self, name: &str, value: Value) -> SimResult<T>
    where
        T: TryFrom<Entity, Error = SimError>,
    {
        match value {
            Value::Entity(entity) => T::try_from(*entity),
            _ => Err(self.mismatch(name, "tagged entity")),
        }
    }

    fn mismatch(&self, name: &str, expected: &'static str) -> SimError {
        SimError::FieldType { tag: self.tag, field: name.to_string(), expected }
    }
}
