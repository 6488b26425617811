//! Boosts: purchasable modifiers of the daily view rate.
//!
//! RULE: Every variant implements the full `Boost` contract.
//! `AnyBoost` is the closed set the slot stores; it forwards each call to
//! the concrete variant.
//!
//! Lifetimes:
//!   Advertisement  expires on its `expires` day
//!   CdnSetup       folded into `view_rate` on activation, never stored
//!   Friends        applies to the first day recorded after activation
//!   Channels       never expires

use crate::{
    error::{SimError, SimResult},
    geo,
    registry::{Entity, Fields, Tagged},
    slot::SaveSlot,
    types::{Coordinate, Day},
    value::Value,
};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// Money scale of a CDN purchase.
pub const CDN_K: Decimal = Decimal::TEN;

/// Half-width, in grid cells, of the population window priced by a CDN.
pub const CDN_RADIUS: i64 = 5;

/// Views per channel per unit of difficulty on the day a promo starts.
pub const CHANNEL_K: f64 = 0.5;

/// The capability set shared by every boost.
pub trait Boost {
    /// The variant tag, as written in slot documents.
    fn tag(&self) -> &'static str;

    /// Day on which the boost stops applying, if it ever does.
    fn expires(&self) -> Option<Day>;

    /// Put the boost into effect on `slot`. Ownership moves into the slot.
    fn activate(self, slot: &mut SaveSlot)
    where
        Self: Sized;

    /// Views per day this boost adds on the slot's current day.
    fn boost(&self, slot: &SaveSlot) -> f64;

    /// Money charged when the boost is bought.
    fn cost(&self, slot: &SaveSlot) -> Decimal;

    fn description(&self, slot: &SaveSlot) -> String;
}

fn saturating_mul(a: Decimal, b: Decimal) -> Decimal {
    a.checked_mul(b).unwrap_or(Decimal::MAX)
}

// ── Advertisement ─────────────────────────────────────────────────

/// A flat view boost for a fixed window of days.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    pub expires: Day,
    /// Views per day.
    pub power:   u64,
}

impl Advertisement {
    pub fn new(expires: Day, power: u64) -> Self {
        Self { expires, power }
    }

    /// Days of the window still ahead of the slot's current day.
    pub fn remaining_days(&self, slot: &SaveSlot) -> u64 {
        self.expires.saturating_sub(slot.today())
    }
}

impl Boost for Advertisement {
    fn tag(&self) -> &'static str { Self::TAG }

    fn expires(&self) -> Option<Day> { Some(self.expires) }

    /// A window that has already closed is never stored: it would run for
    /// the current day without having been paid for.
    fn activate(self, slot: &mut SaveSlot) {
        if self.expires <= slot.today() {
            log::warn!("Advertisement expired on day {}; not activated", self.expires);
            return;
        }
        slot.boosts.push(self.into());
    }

    fn boost(&self, _slot: &SaveSlot) -> f64 {
        self.power as f64
    }

    fn cost(&self, slot: &SaveSlot) -> Decimal {
        let days_power = saturating_mul(
            Decimal::from(self.remaining_days(slot)),
            Decimal::from(self.power),
        );
        saturating_mul(days_power, slot.difficulty_multiplier)
    }

    fn description(&self, _slot: &SaveSlot) -> String {
        format!("Advertisement: +{} views/day until day {}", self.power, self.expires)
    }
}

impl Tagged for Advertisement {
    const TAG: &'static str = "advertisement";

    fn to_fields(&self) -> Fields {
        Fields::new(Self::TAG)
            .with("expires", Value::from_u64(self.expires))
            .with("power", Value::from_u64(self.power))
    }

    fn from_fields(mut fields: Fields) -> SimResult<Self> {
        Ok(Self {
            expires: fields.take_u64("expires")?,
            power:   fields.take_u64("power")?,
        })
    }
}

// ── CDN setup ─────────────────────────────────────────────────────

/// A content-delivery server at an integer-degree coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdnSetup {
    /// Degrees north (+) / south (-).
    pub latitude:  i32,
    /// Degrees east (+) / west (-).
    pub longitude: i32,
}

impl CdnSetup {
    pub fn new(latitude: i32, longitude: i32) -> Self {
        Self { latitude, longitude }
    }

    pub fn coordinate(&self) -> Coordinate {
        (self.latitude, self.longitude)
    }

    fn population_sum(&self) -> Decimal {
        let sum = geo::tables().population_window(self.latitude, self.longitude, CDN_RADIUS);
        Decimal::from_f64(sum).unwrap_or(Decimal::ZERO)
    }
}

impl Boost for CdnSetup {
    fn tag(&self) -> &'static str { Self::TAG }

    fn expires(&self) -> Option<Day> { None }

    /// Records the server and adds its rounded boost to the permanent rate.
    /// A coordinate that already hosts a server adds nothing.
    fn activate(self, slot: &mut SaveSlot) {
        let duplicate = slot.cdn_servers.contains(&self.coordinate());
        slot.cdn_servers.push(self.coordinate());
        let gain = if duplicate { 0.0 } else { self.boost(slot) };
        slot.view_rate = slot.view_rate.saturating_add(gain as u64);
        log::info!(
            "CDN server at ({}, {}) online: +{gain} views/day",
            self.latitude, self.longitude
        );
    }

    /// Brightness at the server's cell. A server that is the only one on
    /// record boosts nothing: there is nothing yet to deliver faster to.
    fn boost(&self, slot: &SaveSlot) -> f64 {
        if slot.cdn_servers.as_slice() == [self.coordinate()] {
            return 0.0;
        }
        geo::tables().brightness_at(self.latitude, self.longitude).round()
    }

    fn cost(&self, slot: &SaveSlot) -> Decimal {
        let population = self.population_sum();
        let scaled = saturating_mul(population, slot.difficulty_multiplier);
        let penalty = CDN_K / population.max(Decimal::ONE);
        saturating_mul(CDN_K, scaled.checked_add(penalty).unwrap_or(Decimal::MAX))
    }

    fn description(&self, slot: &SaveSlot) -> String {
        format!(
            "CDN server at {}°, {}°: +{} views/day",
            self.latitude,
            self.longitude,
            self.boost(slot)
        )
    }
}

impl Tagged for CdnSetup {
    const TAG: &'static str = "cdnsetup";

    fn to_fields(&self) -> Fields {
        Fields::new(Self::TAG)
            .with("latitude", self.latitude)
            .with("longitude", self.longitude)
    }

    fn from_fields(mut fields: Fields) -> SimResult<Self> {
        Ok(Self {
            latitude:  fields.take_i32("latitude")?,
            longitude: fields.take_i32("longitude")?,
        })
    }
}

// ── Friends ───────────────────────────────────────────────────────

/// A one-day boost from pinging friends directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Friends {
    pub count:   u64,
    /// Set on activation.
    pub expires: Option<Day>,
}

impl Friends {
    pub fn new(count: u64) -> Self {
        Self { count, expires: None }
    }
}

impl Boost for Friends {
    fn tag(&self) -> &'static str { Self::TAG }

    fn expires(&self) -> Option<Day> { self.expires }

    /// Today is already recorded, so the boost lands on tomorrow and is
    /// dropped the day after.
    fn activate(mut self, slot: &mut SaveSlot) {
        self.expires = Some(slot.today() + 2);
        slot.friends_pinged = slot.friends_pinged.saturating_add(self.count);
        slot.boosts.push(self.into());
    }

    fn boost(&self, _slot: &SaveSlot) -> f64 {
        self.count as f64
    }

    fn cost(&self, _slot: &SaveSlot) -> Decimal {
        Decimal::ZERO
    }

    fn description(&self, _slot: &SaveSlot) -> String {
        match self.expires {
            Some(day) => format!("Friends: {} pinged, +{} views until day {day}", self.count, self.count),
            None => format!("Friends: {} to ping", self.count),
        }
    }
}

impl Tagged for Friends {
    const TAG: &'static str = "friends";

    fn to_fields(&self) -> Fields {
        Fields::new(Self::TAG)
            .with("count", Value::from_u64(self.count))
            .with("expires", self.expires.map(Value::from_u64))
    }

    fn from_fields(mut fields: Fields) -> SimResult<Self> {
        Ok(Self {
            count:   fields.take_u64("count")?,
            expires: fields.take_opt_u64("expires")?,
        })
    }
}

// ── Channels ──────────────────────────────────────────────────────

/// Self-promotion on other channels. Once mentioned, the site stays
/// discoverable there, so the boost never expires and keeps growing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channels {
    pub count:   u64,
    /// Day the promotion went out. Set on activation.
    pub started: Day,
}

impl Channels {
    pub fn new(count: u64) -> Self {
        Self { count, started: 0 }
    }
}

impl Boost for Channels {
    fn tag(&self) -> &'static str { Self::TAG }

    fn expires(&self) -> Option<Day> { None }

    fn activate(mut self, slot: &mut SaveSlot) {
        self.started = slot.today();
        slot.promos_used = slot.promos_used.saturating_add(self.count);
        slot.boosts.push(self.into());
    }

    /// `difficulty × count × e^(today − started) × CHANNEL_K`
    fn boost(&self, slot: &SaveSlot) -> f64 {
        let elapsed = slot.today() as f64 - self.started as f64;
        let difficulty = slot.difficulty_multiplier.to_f64().unwrap_or(1.0);
        difficulty * self.count as f64 * elapsed.exp() * CHANNEL_K
    }

    fn cost(&self, _slot: &SaveSlot) -> Decimal {
        Decimal::ZERO
    }

    fn description(&self, slot: &SaveSlot) -> String {
        format!(
            "Channels: {} promoted since day {}, +{:.1} views/day",
            self.count,
            self.started,
            self.boost(slot)
        )
    }
}

impl Tagged for Channels {
    const TAG: &'static str = "channels";

    fn to_fields(&self) -> Fields {
        Fields::new(Self::TAG)
            .with("count", Value::from_u64(self.count))
            .with("started", Value::from_u64(self.started))
    }

    fn from_fields(mut fields: Fields) -> SimResult<Self> {
        Ok(Self {
            count:   fields.take_u64("count")?,
            started: fields.take_u64("started")?,
        })
    }
}

// ── Closed set ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnyBoost {
    Advertisement(Advertisement),
    CdnSetup(CdnSetup),
    Friends(Friends),
    Channels(Channels),
}

impl Boost for AnyBoost {
    fn tag(&self) -> &'static str {
        match self {
            AnyBoost::Advertisement(b) => b.tag(),
            AnyBoost::CdnSetup(b)      => b.tag(),
            AnyBoost::Friends(b)       => b.tag(),
            AnyBoost::Channels(b)      => b.tag(),
        }
    }

    fn expires(&self) -> Option<Day> {
        match self {
            AnyBoost::Advertisement(b) => b.expires(),
            AnyBoost::CdnSetup(b)      => b.expires(),
            AnyBoost::Friends(b)       => b.expires(),
            AnyBoost::Channels(b)      => b.expires(),
        }
    }

    fn activate(self, slot: &mut SaveSlot) {
        match self {
            AnyBoost::Advertisement(b) => b.activate(slot),
            AnyBoost::CdnSetup(b)      => b.activate(slot),
            AnyBoost::Friends(b)       => b.activate(slot),
            AnyBoost::Channels(b)      => b.activate(slot),
        }
    }

    fn boost(&self, slot: &SaveSlot) -> f64 {
        match self {
            AnyBoost::Advertisement(b) => b.boost(slot),
            AnyBoost::CdnSetup(b)      => b.boost(slot),
            AnyBoost::Friends(b)       => b.boost(slot),
            AnyBoost::Channels(b)      => b.boost(slot),
        }
    }

    fn cost(&self, slot: &SaveSlot) -> Decimal {
        match self {
            AnyBoost::Advertisement(b) => b.cost(slot),
            AnyBoost::CdnSetup(b)      => b.cost(slot),
            AnyBoost::Friends(b)       => b.cost(slot),
            AnyBoost::Channels(b)      => b.cost(slot),
        }
    }

    fn description(&self, slot: &SaveSlot) -> String {
        match self {
            AnyBoost::Advertisement(b) => b.description(slot),
            AnyBoost::CdnSetup(b)      => b.description(slot),
            AnyBoost::Friends(b)       => b.description(slot),
            AnyBoost::Channels(b)      => b.description(slot),
        }
    }
}

impl From<Advertisement> for AnyBoost {
    fn from(b: Advertisement) -> Self { AnyBoost::Advertisement(b) }
}

impl From<CdnSetup> for AnyBoost {
    fn from(b: CdnSetup) -> Self { AnyBoost::CdnSetup(b) }
}

impl From<Friends> for AnyBoost {
    fn from(b: Friends) -> Self { AnyBoost::Friends(b) }
}

impl From<Channels> for AnyBoost {
    fn from(b: Channels) -> Self { AnyBoost::Channels(b) }
}

impl From<AnyBoost> for Entity {
    fn from(b: AnyBoost) -> Self {
        match b {
            AnyBoost::Advertisement(b) => Entity::Advertisement(b),
            AnyBoost::CdnSetup(b)      => Entity::CdnSetup(b),
            AnyBoost::Friends(b)       => Entity::Friends(b),
            AnyBoost::Channels(b)      => Entity::Channels(b),
        }
    }
}

impl TryFrom<Entity> for AnyBoost {
    type Error = SimError;

    fn try_from(entity: Entity) -> SimResult<Self> {
        match entity {
            Entity::Advertisement(b) => Ok(b.into()),
            Entity::CdnSetup(b)      => Ok(b.into()),
            Entity::Friends(b)       => Ok(b.into()),
            Entity::Channels(b)      => Ok(b.into()),
            other => Err(SimError::UnexpectedVariant {
                expected: "boost",
                found:    other.tag().to_string(),
            }),
        }
    }
}
