//! Player commands: everything a player can do to a slot between updates.
//!
//! RULE: Commands validate their own arguments. The engine trusts what
//! ends up in `transactions_pending` and never re-checks it.
//! Variants are added over time, never removed or reordered.

use crate::{
    boost::{Advertisement, Boost, CdnSetup, Channels, Friends},
    error::{SimError, SimResult},
    slot::SaveSlot,
    transaction::Transaction,
    types::Day,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// When a purchase clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearAt {
    AfterDays(u64),
    OnDay(Day),
}

impl Default for ClearAt {
    fn default() -> Self { ClearAt::AfterDays(5) }
}

impl ClearAt {
    pub fn resolve(self, today: Day) -> Day {
        match self {
            ClearAt::AfterDays(days) => today.saturating_add(days),
            ClearAt::OnDay(day)      => day,
        }
    }
}

/// When an advertisement stops running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expiry {
    InDays(u64),
    UntilDay(Day),
}

impl Default for Expiry {
    fn default() -> Self { Expiry::InDays(7) }
}

/// How strong an advertisement is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdPower {
    /// Views per day.
    Fixed(i64),
    /// Multiple of the most recent day's views.
    FractionOfToday(f64),
}

impl Default for AdPower {
    fn default() -> Self { AdPower::Fixed(100) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum PlayerCommand {
    // ── Purchases ─────────────────────────────────
    BuyAdvertisement {
        clear:  ClearAt,
        expiry: Expiry,
        power:  AdPower,
        quote:  bool,
    },
    BuyCdn {
        clear:     ClearAt,
        latitude:  i32,
        longitude: i32,
        quote:     bool,
    },

    // ── Promotion ─────────────────────────────────
    PromoFriends { count: Option<i64> },
    PromoChannels { count: Option<i64> },

    // ── Settings ──────────────────────────────────
    SetAds { proportion: Option<Decimal> },
    SetDifficulty { multiplier: Option<Decimal> },

    // ── Queue management ──────────────────────────
    /// 1-based indexes into `transactions_pending`.
    CancelTransactions { indexes: Vec<usize> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// A transaction was appended at this 1-based queue position.
    Queued { position: usize },
    /// A priced transaction that was not queued.
    Quote(String),
    /// A read-only answer, e.g. a current setting.
    Report(String),
    Applied,
    Cancelled { removed: usize },
}

pub fn apply_command(slot: &mut SaveSlot, command: PlayerCommand) -> SimResult<CommandOutcome> {
    match command {
        PlayerCommand::BuyAdvertisement { clear, expiry, power, quote } => {
            let clear_date = resolve_clear_day(slot, clear)?;
            let action = advertisement(slot, expiry, power)?;
            if action.expires <= clear_date {
                return Err(invalid(format!(
                    "advertisement expires on day {} but would only clear on day {clear_date}",
                    action.expires
                )));
            }
            purchase(slot, Transaction::new(clear_date, action), quote)
        }
        PlayerCommand::BuyCdn { clear, latitude, longitude, quote } => {
            if !(-90..=90).contains(&latitude) {
                return Err(invalid(format!("latitude {latitude} out of range [-90, +90]")));
            }
            if !(-180..=180).contains(&longitude) {
                return Err(invalid(format!("longitude {longitude} out of range [-180, +180]")));
            }
            let clear_date = resolve_clear_day(slot, clear)?;
            let action = CdnSetup::new(latitude, longitude);
            purchase(slot, Transaction::new(clear_date, action), quote)
        }
        PlayerCommand::PromoFriends { count } => {
            let Some(count) = count else {
                return Ok(CommandOutcome::Report(format!(
                    "{}/{}",
                    slot.friends_pinged,
                    slot.friends_available()
                )));
            };
            let remaining = slot.friends_available().saturating_sub(slot.friends_pinged);
            let count = promo_count(count, remaining, "friends")?;
            Friends::new(count).activate(slot);
            Ok(CommandOutcome::Applied)
        }
        PlayerCommand::PromoChannels { count } => {
            let Some(count) = count else {
                return Ok(CommandOutcome::Report(format!(
                    "{}/{}",
                    slot.promos_used,
                    slot.promo_available()
                )));
            };
            let remaining = slot.promo_available().saturating_sub(slot.promos_used);
            let count = promo_count(count, remaining, "channels")?;
            Channels::new(count).activate(slot);
            Ok(CommandOutcome::Applied)
        }
        PlayerCommand::SetAds { proportion } => match proportion {
            None => Ok(CommandOutcome::Report(slot.ad_proportion.to_string())),
            Some(p) if p < Decimal::ZERO || p > Decimal::ONE => {
                Err(invalid(format!("ad proportion {p} out of range [0, 1]")))
            }
            Some(p) => {
                slot.ad_proportion = p;
                Ok(CommandOutcome::Applied)
            }
        },
        PlayerCommand::SetDifficulty { multiplier } => match multiplier {
            None => Ok(CommandOutcome::Report(slot.difficulty_multiplier.to_string())),
            Some(m) if m <= Decimal::ZERO => {
                Err(invalid(format!("difficulty multiplier {m} must be positive")))
            }
            Some(m) => {
                slot.difficulty_multiplier = m;
                Ok(CommandOutcome::Applied)
            }
        },
        PlayerCommand::CancelTransactions { indexes } => {
            let before = slot.transactions_pending.len();
            let kept = std::mem::take(&mut slot.transactions_pending)
                .into_iter()
                .enumerate()
                .filter(|(i, _)| !indexes.contains(&(i + 1)))
                .map(|(_, t)| t)
                .collect::<Vec<_>>();
            slot.transactions_pending = kept;
            Ok(CommandOutcome::Cancelled { removed: before - slot.transactions_pending.len() })
        }
    }
}

/// Today is already replayed, so the earliest a purchase can clear is
/// tomorrow.
fn resolve_clear_day(slot: &SaveSlot, clear: ClearAt) -> SimResult<Day> {
    let today = slot.today();
    let day = clear.resolve(today);
    if day <= today {
        return Err(invalid(format!("clear day {day} is on or before today ({today})")));
    }
    Ok(day)
}

fn advertisement(slot: &SaveSlot, expiry: Expiry, power: AdPower) -> SimResult<Advertisement> {
    let today = slot.today();
    let expires = match expiry {
        Expiry::InDays(days)   => today.saturating_add(days),
        Expiry::UntilDay(day)  => day,
    };
    if expires <= today {
        return Err(invalid(format!("expiry day {expires} is on or before today ({today})")));
    }
    let power = match power {
        AdPower::Fixed(views) => views,
        AdPower::FractionOfToday(fraction) => (slot.views_today() as f64 * fraction).floor() as i64,
    };
    if power <= 0 {
        return Err(invalid(format!("power {power} is non-positive")));
    }
    Ok(Advertisement::new(expires, power as u64))
}

fn purchase(slot: &mut SaveSlot, transaction: Transaction, quote: bool) -> SimResult<CommandOutcome> {
    if quote {
        return Ok(CommandOutcome::Quote(transaction.description(slot)));
    }
    log::info!("Queued {} purchase clearing on day {}", transaction.action.tag(), transaction.clear_date);
    slot.transactions_pending.push(transaction);
    Ok(CommandOutcome::Queued { position: slot.transactions_pending.len() })
}

fn promo_count(count: i64, remaining: u64, what: &str) -> SimResult<u64> {
    let count = u64::try_from(count)
        .ok()
        .filter(|&c| c > 0)
        .ok_or_else(|| invalid(format!("{what} count must be positive")))?;
    if count > remaining {
        return Err(invalid(format!("not enough {what} left: {remaining} remaining")));
    }
    Ok(count)
}

fn invalid(message: String) -> SimError {
    SimError::InvalidCommand(message)
}
