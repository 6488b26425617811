//! The save slot. Every piece of mutable game state for one profile.
//!
//! RULE: `views.len()` always equals the day number of `last_touch`.
//! Only `SaveSlot::update` (engine.rs) appends to `views` or moves
//! `last_touch`; see the desync check there.

use crate::{
    boost::AnyBoost,
    clock::{self, day_number},
    error::{SimError, SimResult},
    registry::{self, Entity, Fields, Tagged},
    transaction::Transaction,
    types::{Coordinate, Day, Timestamp, ViewDay},
    value::Value,
};
use rust_decimal::Decimal;
use serde::Serialize;

/// Length of an in-game day unless configured otherwise: one real day.
pub const DEFAULT_DAY_LENGTH: u64 = 60 * 60 * 24;

/// Friends reachable per unit of difficulty.
pub const FRIENDS_PER_DIFFICULTY: u64 = 100;

/// Self-promotion channels reachable over a site's lifetime.
pub const PROMO_CHANNELS_AVAILABLE: u64 = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct SaveSlot {
    /// One (views, cumulative) entry per simulated day.
    pub views:                 Vec<ViewDay>,
    /// Permanent views/day.
    pub view_rate:             u64,
    pub boosts:                Vec<AnyBoost>,
    pub cdn_servers:           Vec<Coordinate>,
    pub transactions_pending:  Vec<Transaction>,
    pub money:                 Decimal,
    /// Fraction of potential views traded for ad revenue, in [0, 1].
    pub ad_proportion:         Decimal,
    pub difficulty_multiplier: Decimal,
    pub friends_pinged:        u64,
    pub promos_used:           u64,
    /// Seconds per in-game day.
    pub day_length:            u64,
    pub first_touch:           Timestamp,
    pub last_touch:            Timestamp,
    /// Whether the player chose to keep going after winning.
    pub continued:             bool,
    /// The day being replayed while `update` runs. Never persisted.
    pub(crate) replay_day:     Option<Day>,
}

impl SaveSlot {
    /// A fresh site created at `now`.
    pub fn new(difficulty_multiplier: Decimal, day_length: u64, now: Timestamp) -> SimResult<Self> {
        if day_length == 0 {
            return Err(SimError::InvalidDayLength);
        }
        if difficulty_multiplier <= Decimal::ZERO {
            return Err(SimError::InvalidCommand(format!(
                "difficulty multiplier must be positive, got {difficulty_multiplier}"
            )));
        }
        Ok(Self {
            views:                 Vec::new(),
            view_rate:             0,
            boosts:                Vec::new(),
            cdn_servers:           Vec::new(),
            transactions_pending:  Vec::new(),
            money:                 Decimal::ZERO,
            ad_proportion:         Decimal::ZERO,
            difficulty_multiplier,
            friends_pinged:        0,
            promos_used:           0,
            day_length,
            first_touch:           now,
            last_touch:            now,
            continued:             false,
            replay_day:            None,
        })
    }

    /// Day number of `timestamp` on this slot's calendar.
    pub fn day_number(&self, timestamp: Timestamp) -> SimResult<Day> {
        day_number(self.first_touch, self.day_length, timestamp)
    }

    /// The current day: the day being replayed during `update`, otherwise
    /// the day of the last touch.
    pub fn today(&self) -> Day {
        self.replay_day
            .unwrap_or_else(|| self.day_number(self.last_touch).unwrap_or(0))
    }

    /// Views during the most recent simulated day.
    pub fn views_today(&self) -> u64 {
        self.views.last().map_or(0, |&(views, _)| views)
    }

    /// Views over the lifetime of the site.
    pub fn views_total(&self) -> u64 {
        self.views.last().map_or(0, |&(_, cumulative)| cumulative)
    }

    /// `floor(100 × difficulty)`.
    pub fn friends_available(&self) -> u64 {
        use rust_decimal::prelude::ToPrimitive;
        (Decimal::from(FRIENDS_PER_DIFFICULTY) * self.difficulty_multiplier)
            .floor()
            .to_u64()
            .unwrap_or(0)
    }

    pub fn promo_available(&self) -> u64 {
        PROMO_CHANNELS_AVAILABLE
    }

    pub fn stats(&self) -> SlotStats {
        SlotStats {
            today:       self.today(),
            views:       self.views_today(),
            cumulative:  self.views_total(),
            money:       self.money,
            boosts:      self.boosts.len(),
            pending:     self.transactions_pending.len(),
            cdn:         self.cdn_servers.len(),
            friends:     format!("{}/{}", self.friends_pinged, self.friends_available()),
            promos:      format!("{}/{}", self.promos_used, self.promo_available()),
            difficulty:  self.difficulty_multiplier,
            day_length:  self.day_length,
            ctime:       clock::format_utc(self.first_touch),
            mtime:       clock::format_utc(self.last_touch),
        }
    }

    /// Encode the whole slot as a tagged document.
    pub fn to_document(&self) -> SimResult<serde_json::Value> {
        registry::serialize_tagged(self)
    }

    pub fn from_document(node: &serde_json::Value) -> SimResult<Self> {
        match registry::from_document(node)? {
            Value::Entity(entity) => SaveSlot::try_from(*entity),
            other => Err(SimError::UnexpectedVariant {
                expected: Self::TAG,
                found:    other.type_name().to_string(),
            }),
        }
    }
}

/// A read-only summary of a slot, as shown by `check stats`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotStats {
    pub today:      Day,
    pub views:      u64,
    pub cumulative: u64,
    pub money:      Decimal,
    pub boosts:     usize,
    pub pending:    usize,
    pub cdn:        usize,
    pub friends:    String,
    pub promos:     String,
    pub difficulty: Decimal,
    pub day_length: u64,
    pub ctime:      String,
    pub mtime:      String,
}

impl Tagged for SaveSlot {
    const TAG: &'static str = "saveslot";

    fn to_fields(&self) -> Fields {
        let views = self
            .views
            .iter()
            .map(|&(v, c)| Value::pair(Value::from_u64(v), Value::from_u64(c)))
            .collect();
        let boosts = self
            .boosts
            .iter()
            .map(|b| Value::Entity(Box::new(b.clone().into())))
            .collect();
        let cdn_servers = self
            .cdn_servers
            .iter()
            .map(|&(lat, long)| Value::pair(lat.into(), long.into()))
            .collect();
        let pending = self
            .transactions_pending
            .iter()
            .map(|t| Value::Entity(Box::new(t.clone().into())))
            .collect();

        Fields::new(Self::TAG)
            .with("views", Value::List(views))
            .with("view_rate", Value::from_u64(self.view_rate))
            .with("boosts", Value::List(boosts))
            .with("cdn_servers", Value::List(cdn_servers))
            .with("transactions_pending", Value::List(pending))
            .with("money", self.money)
            .with("ad_proportion", self.ad_proportion)
            .with("difficulty_multiplier", self.difficulty_multiplier)
            .with("friends_pinged", Value::from_u64(self.friends_pinged))
            .with("promos_used", Value::from_u64(self.promos_used))
            .with("day_length", Value::from_u64(self.day_length))
            .with("first_touch", self.first_touch)
            .with("last_touch", self.last_touch)
            .with("continued", self.continued)
    }

    /// `ad_proportion` and `continued` may be absent in documents written
    /// before those settings existed; they default to zero and false.
    fn from_fields(mut fields: Fields) -> SimResult<Self> {
        let views = fields
            .take_list("views")?
            .into_iter()
            .map(|item| {
                let (v, c) = fields.as_pair("views", item)?;
                Ok((fields.as_u64("views", v)?, fields.as_u64("views", c)?))
            })
            .collect::<SimResult<Vec<_>>>()?;
        let cdn_servers = fields
            .take_list("cdn_servers")?
            .into_iter()
            .map(|item| {
                let (lat, long) = fields.as_pair("cdn_servers", item)?;
                Ok((fields.as_i32("cdn_servers", lat)?, fields.as_i32("cdn_servers", long)?))
            })
            .collect::<SimResult<Vec<_>>>()?;
        let ad_proportion = match fields.take_opt("ad_proportion") {
            Some(v) => fields.as_decimal("ad_proportion", v)?,
            None => Decimal::ZERO,
        };
        let continued = fields.contains("continued") && fields.take_bool("continued")?;

        let day_length = fields.take_u64("day_length")?;
        if day_length == 0 {
            return Err(SimError::InvalidDayLength);
        }

        Ok(Self {
            views,
            view_rate:             fields.take_u64("view_rate")?,
            boosts:                fields.take_entities("boosts")?,
            cdn_servers,
            transactions_pending:  fields.take_entities("transactions_pending")?,
            money:                 fields.take_decimal("money")?,
            ad_proportion,
            difficulty_multiplier: fields.take_decimal("difficulty_multiplier")?,
            friends_pinged:        fields.take_u64("friends_pinged")?,
            promos_used:           fields.take_u64("promos_used")?,
            day_length,
            first_touch:           fields.take_i64("first_touch")?,
            last_touch:            fields.take_i64("last_touch")?,
            continued,
            replay_day:            None,
        })
    }
}

impl TryFrom<Entity> for SaveSlot {
    type Error = SimError;

    fn try_from(entity: Entity) -> SimResult<Self> {
        match entity {
            Entity::SaveSlot(slot) => Ok(*slot),
            other => Err(SimError::UnexpectedVariant {
                expected: SaveSlot::TAG,
                found:    other.tag().to_string(),
            }),
        }
    }
}
