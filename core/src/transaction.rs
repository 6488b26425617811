//! A scheduled purchase: one boost that takes effect on its clear day.

use crate::{
    boost::{AnyBoost, Boost},
    error::{SimError, SimResult},
    registry::{Entity, Fields, Tagged},
    slot::SaveSlot,
    types::Day,
    value::Value,
};
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Day number on which the transaction clears.
    pub clear_date: Day,
    /// What happens when it clears.
    pub action:     AnyBoost,
}

impl Transaction {
    pub fn new(clear_date: Day, action: impl Into<AnyBoost>) -> Self {
        Self { clear_date, action: action.into() }
    }

    pub fn is_due(&self, day: Day) -> bool {
        self.clear_date <= day
    }

    /// What clearing would cost on the slot's current day.
    pub fn cost(&self, slot: &SaveSlot) -> Decimal {
        self.action.cost(slot)
    }

    /// Activate the action, then charge for it.
    ///
    /// The charge is priced after activation so that it sees the slot the
    /// way the purchase left it. Returns the amount charged.
    pub fn clear(self, slot: &mut SaveSlot) -> Decimal {
        let pricing = self.action.clone();
        self.action.activate(slot);
        let charged = pricing.cost(slot);
        slot.money -= charged;
        charged
    }

    pub fn description(&self, slot: &SaveSlot) -> String {
        format!(
            "Day {}: {} (cost {})",
            self.clear_date,
            self.action.description(slot),
            self.cost(slot).round_dp(2)
        )
    }
}

impl Tagged for Transaction {
    const TAG: &'static str = "transaction";

    fn to_fields(&self) -> Fields {
        Fields::new(Self::TAG)
            .with("clear_date", Value::from_u64(self.clear_date))
            .with("action", Value::Entity(Box::new(self.action.clone().into())))
    }

    fn from_fields(mut fields: Fields) -> SimResult<Self> {
        Ok(Self {
            clear_date: fields.take_u64("clear_date")?,
            action:     fields.take_entity("action")?,
        })
    }
}

impl TryFrom<Entity> for Transaction {
    type Error = SimError;

    fn try_from(entity: Entity) -> SimResult<Self> {
        match entity {
            Entity::Transaction(t) => Ok(t),
            other => Err(SimError::UnexpectedVariant {
                expected: Transaction::TAG,
                found:    other.tag().to_string(),
            }),
        }
    }
}
