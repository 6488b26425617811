//! Events emitted while replaying days.
//!
//! `SaveSlot::update` returns these to the caller in the order they
//! happened. They are informational: the slot itself is the state of
//! record, and events are never persisted.

use crate::types::Day;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    DayAdvanced {
        day:        Day,
        views:      u64,
        cumulative: u64,
    },
    BoostExpired {
        day:   Day,
        boost: String,
    },
    TransactionCleared {
        day:     Day,
        boost:   String,
        charged: Decimal,
    },
    /// First time in this update that a due transaction could not be paid.
    TransactionDeferred {
        day:        Day,
        clear_date: Day,
        cost:       Decimal,
    },
    /// Cumulative views crossed a power of ten.
    MilestoneReached {
        day:        Day,
        cumulative: u64,
        view_rate:  u64,
    },
}
