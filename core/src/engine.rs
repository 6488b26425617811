//! The day-replay engine.
//!
//! `SaveSlot::update` catches a slot up to the present by replaying every
//! day since its last touch, one at a time.
//!
//! PER-DAY ORDER (fixed, never reordered):
//!   1. Expire boosts whose `expires` day has arrived.
//!   2. Settle due transactions, in queue order, while money covers them.
//!   3. Compute the day's view rate (permanent rate + active boosts,
//!      less the share traded for ad revenue).
//!   4. Append the day to the view history, then add the milestone bonus
//!      `floor(log10(previous cumulative))` to the permanent rate.
//!
//! RULES:
//!   - Days are replayed in order; none is skipped.
//!   - A transaction is only cleared if money covers its cost at that
//!     moment. Money never goes negative through the engine.
//!   - A stuck transaction is warned about once: in the update during
//!     which it first comes due. Later updates retry it silently.
//!   - A view history that disagrees with the day counter is fatal.
//!
//! The replay has no upper bound: a slot untouched for N days replays N
//! days on its next update. With the default one-day `day_length` that
//! is negligible; a one-second day left alone for a month is 2.6M
//! iterations.

use crate::{
    boost::Boost,
    clock::{Clock, SystemClock},
    error::{SimError, SimResult},
    event::SimEvent,
    slot::SaveSlot,
    transaction::Transaction,
    types::{Day, Timestamp},
};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::collections::BTreeSet;

/// Cumulative views that win the game: one view per person on Earth.
pub const WIN_THRESHOLD: u64 = 8_000_000_000;

/// Steepness of the view loss from ads: views are scaled by
/// `e^(-AD_REVENUE_DECAY × ad_proportion)`.
pub const AD_REVENUE_DECAY: f64 = 2.0;

/// Where the session stands after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    /// The win threshold is reached and the player has not yet chosen
    /// whether to continue. Resolve with `SaveSlot::resolve_win`.
    WonPendingDecision,
    /// The player declined to continue.
    Ended,
}

/// A due transaction that money could not cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnaffordableWarning {
    /// 1-based position in the pending queue after the update.
    pub position:    usize,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub days_advanced: u64,
    pub events:        Vec<SimEvent>,
    /// One per transaction that came due during this update and is still
    /// stuck, in queue order.
    pub warnings:      Vec<UnaffordableWarning>,
    pub state:         SessionState,
}

/// A pending transaction tagged with its queue position at the start of
/// the update, so warnings can be deduplicated across replayed days.
type Queued = (usize, Transaction);

impl SaveSlot {
    /// Catch up to the system clock.
    pub fn update(&mut self) -> SimResult<UpdateOutcome> {
        self.update_with(&SystemClock)
    }

    pub fn update_with(&mut self, clock: &impl Clock) -> SimResult<UpdateOutcome> {
        self.update_at(clock.now())
    }

    /// Catch up to `now`.
    ///
    /// A `now` earlier than the last touch (clock moved backwards) leaves
    /// `last_touch` where it was; moving it back would desync the view
    /// history on the next update.
    pub fn update_at(&mut self, now: Timestamp) -> SimResult<UpdateOutcome> {
        let old_day = self.day_number(self.last_touch)?;
        let recorded = self.views.len() as u64;
        if recorded != old_day {
            return Err(SimError::Desync { expected: old_day, actual: recorded });
        }

        if now < self.last_touch {
            log::warn!(
                "Clock moved backwards ({now} < last touch {}); keeping last touch",
                self.last_touch
            );
        } else {
            self.last_touch = now;
        }
        let new_day = self.day_number(self.last_touch)?;

        let mut events = Vec::new();
        let mut warned = BTreeSet::new();
        let mut pending: Vec<Queued> = std::mem::take(&mut self.transactions_pending)
            .into_iter()
            .enumerate()
            .collect();

        for day in (old_day + 1)..=new_day {
            self.replay_day = Some(day);
            self.expire_boosts(day, &mut events);
            pending = self.settle_transactions(day, old_day, pending, &mut warned, &mut events);
            self.record_day(day, &mut events);
        }
        self.replay_day = None;

        let mut warnings = Vec::new();
        for (index, (id, transaction)) in pending.iter().enumerate() {
            if warned.contains(id) {
                let description = transaction.description(self);
                log::warn!("Transaction {} cannot be afforded: {description}", index + 1);
                warnings.push(UnaffordableWarning { position: index + 1, description });
            }
        }
        self.transactions_pending = pending.into_iter().map(|(_, t)| t).collect();

        let state = if !self.continued && self.views_total() >= WIN_THRESHOLD {
            SessionState::WonPendingDecision
        } else {
            SessionState::Running
        };

        Ok(UpdateOutcome {
            days_advanced: new_day - old_day,
            events,
            warnings,
            state,
        })
    }

    /// Settle a `WonPendingDecision`: accepting keeps the site running
    /// past the threshold for good, declining ends the session.
    pub fn resolve_win(&mut self, accept: bool) -> SessionState {
        if accept {
            self.continued = true;
            SessionState::Running
        } else {
            SessionState::Ended
        }
    }

    fn expire_boosts(&mut self, day: Day, events: &mut Vec<SimEvent>) {
        self.boosts.retain(|boost| match boost.expires() {
            Some(expires) if expires <= day => {
                log::info!("day={day} {} boost expired", boost.tag());
                events.push(SimEvent::BoostExpired { day, boost: boost.tag().to_string() });
                false
            }
            _ => true,
        });
    }

    /// `settled_through` is the last day replayed by earlier updates;
    /// transactions due by then were already warned about.
    fn settle_transactions(
        &mut self,
        day: Day,
        settled_through: Day,
        pending: Vec<Queued>,
        warned: &mut BTreeSet<usize>,
        events: &mut Vec<SimEvent>,
    ) -> Vec<Queued> {
        let mut still_pending = Vec::with_capacity(pending.len());
        for (id, transaction) in pending {
            if !transaction.is_due(day) {
                still_pending.push((id, transaction));
                continue;
            }
            let cost = transaction.cost(self);
            if cost > self.money {
                let newly_due = transaction.clear_date > settled_through;
                if newly_due && warned.insert(id) {
                    log::debug!("day={day} deferring transaction: cost {cost} > money {}", self.money);
                    events.push(SimEvent::TransactionDeferred {
                        day,
                        clear_date: transaction.clear_date,
                        cost,
                    });
                }
                still_pending.push((id, transaction));
                continue;
            }
            let boost = transaction.action.tag().to_string();
            let charged = transaction.clear(self);
            log::info!("day={day} {boost} transaction cleared, charged {charged}");
            events.push(SimEvent::TransactionCleared { day, boost, charged });
        }
        still_pending
    }

    fn record_day(&mut self, day: Day, events: &mut Vec<SimEvent>) {
        let boosted: f64 = self.boosts.iter().map(|b| b.boost(self)).sum();
        let mut rate = self.view_rate as f64 + boosted;

        if self.ad_proportion > Decimal::ZERO {
            let proportion = self.ad_proportion.to_f64().unwrap_or(0.0);
            rate *= (-AD_REVENUE_DECAY * proportion).exp();
            let revenue = Decimal::from_f64(rate)
                .and_then(|r| r.checked_mul(self.ad_proportion))
                .unwrap_or(Decimal::ZERO);
            self.money = self.money.checked_add(revenue).unwrap_or(Decimal::MAX);
        }

        // Float-to-int casts saturate; a runaway channel boost pins at u64::MAX.
        let views = rate.ceil() as u64;
        let previous = self.views_total();
        let cumulative = previous.saturating_add(views);
        self.views.push((views, cumulative));

        let bonus = u64::from(previous.max(1).ilog10());
        self.view_rate = self.view_rate.saturating_add(bonus);

        log::debug!(
            "day={day} views={views} cumulative={cumulative} rate={} boosts={}",
            self.view_rate,
            self.boosts.len()
        );
        events.push(SimEvent::DayAdvanced { day, views, cumulative });
        if cumulative.max(1).ilog10() > previous.max(1).ilog10() {
            events.push(SimEvent::MilestoneReached {
                day,
                cumulative,
                view_rate: self.view_rate,
            });
        }
    }
}
