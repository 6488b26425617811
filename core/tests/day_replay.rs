//! Day-replay engine tests.
//!
//! Every slot here uses `day_length = 1` and `first_touch = 0`, so a
//! timestamp is its own day number.

use rust_decimal::Decimal;
use sitesim_core::{
    clock::FixedClock,
    engine::{SessionState, WIN_THRESHOLD},
    event::SimEvent,
    Advertisement, Boost, CdnSetup, Friends, SaveSlot, SimError, Transaction,
};

// ── Test helpers ────────────────────────────────────────────────────────────

fn make_slot(view_rate: u64) -> SaveSlot {
    // RUST_LOG=debug shows the per-day replay trace.
    let _ = env_logger::builder().is_test(true).try_init();
    let mut slot = SaveSlot::new(Decimal::ONE, 1, 0).expect("valid slot");
    slot.view_rate = view_rate;
    slot
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Three days at a flat rate of 5, before any milestone bonus applies.
#[test]
fn flat_rate_produces_expected_history() {
    let mut slot = make_slot(5);

    let outcome = slot.update_at(3).unwrap();

    assert_eq!(slot.views, vec![(5, 5), (5, 10), (5, 15)]);
    assert_eq!(outcome.days_advanced, 3);
    assert_eq!(outcome.state, SessionState::Running);
    // Day 3 started from cumulative 10: floor(log10(10)) = 1.
    assert_eq!(slot.view_rate, 6);
}

/// The view history length tracks the day counter through any sequence
/// of forward-moving timestamps.
#[test]
fn history_length_matches_day_number() {
    let mut slot = SaveSlot::new(Decimal::ONE, 5, 0).unwrap();
    slot.view_rate = 3;

    for now in [0, 7, 7, 20, 45, 46, 120] {
        slot.update_at(now).unwrap();
        assert_eq!(
            slot.views.len() as u64,
            slot.day_number(slot.last_touch).unwrap(),
            "history desynced at timestamp {now}"
        );
    }
}

/// Updating again inside the same day changes nothing but `last_touch`.
#[test]
fn update_within_a_day_is_idempotent() {
    let mut slot = SaveSlot::new(Decimal::ONE, 10, 0).unwrap();
    slot.view_rate = 40;
    slot.transactions_pending.push(Transaction::new(9, Advertisement::new(12, 5)));
    slot.update_at(25).unwrap();

    let before = slot.clone();
    let outcome = slot.update_at(29).unwrap();

    let mut expected = before;
    expected.last_touch = 29;
    assert_eq!(slot, expected);
    assert_eq!(outcome.days_advanced, 0);
    assert!(outcome.events.is_empty());
}

/// A due transaction that money cannot cover stays queued, and is applied
/// exactly once when a later update finds enough money.
#[test]
fn unaffordable_transaction_waits_for_money() {
    let mut slot = make_slot(0);
    slot.transactions_pending.push(Transaction::new(2, Advertisement::new(10, 100)));

    let outcome = slot.update_at(3).unwrap();
    assert_eq!(slot.transactions_pending.len(), 1, "transaction must stay pending");
    assert!(slot.boosts.is_empty());
    assert_eq!(slot.money, Decimal::ZERO);
    assert_eq!(outcome.warnings.len(), 1);

    slot.money = Decimal::from(1000);
    slot.update_at(4).unwrap();

    // Cleared on day 4: (10 - 4) days × 100 views × difficulty 1.
    assert!(slot.transactions_pending.is_empty());
    assert_eq!(slot.money, Decimal::from(400));
    assert_eq!(slot.boosts.len(), 1);
    assert_eq!(slot.views[3], (100, 100));

    slot.update_at(5).unwrap();
    assert_eq!(slot.money, Decimal::from(400), "transaction must not be charged twice");
    assert_eq!(slot.boosts.len(), 1);
}

/// A stuck transaction is warned about once, in the update where it first
/// comes due, however many later days and updates retry it.
#[test]
fn stuck_transaction_warns_once() {
    let mut slot = make_slot(0);
    slot.transactions_pending.push(Transaction::new(1, Advertisement::new(30, 50)));

    let first = slot.update_at(6).unwrap();
    let same_day = slot.update_at(6).unwrap();
    let next_day = slot.update_at(7).unwrap();

    assert_eq!(first.warnings.len(), 1);
    assert_eq!(first.warnings[0].position, 1);
    assert!(same_day.warnings.is_empty());
    assert_eq!(next_day.days_advanced, 1);
    assert!(next_day.warnings.is_empty(), "an already-warned transaction must stay quiet");
    assert_eq!(slot.transactions_pending.len(), 1, "the transaction must still be pending");

    let deferred = [&first, &same_day, &next_day]
        .iter()
        .flat_map(|outcome| outcome.events.iter())
        .filter(|e| matches!(e, SimEvent::TransactionDeferred { .. }))
        .count();
    assert_eq!(deferred, 1, "deferral event must be reported once");
}

/// A transaction that comes due in a later update is warned about then,
/// even when an older stuck one is not.
#[test]
fn newly_due_transaction_warns_beside_an_old_one() {
    let mut slot = make_slot(0);
    slot.transactions_pending.push(Transaction::new(1, Advertisement::new(30, 50)));
    slot.update_at(2).unwrap();
    slot.transactions_pending.push(Transaction::new(4, Advertisement::new(30, 50)));

    let outcome = slot.update_at(5).unwrap();

    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].position, 2);
}

/// Warnings report positions in the queue as it stands after the update.
#[test]
fn warning_positions_follow_the_final_queue() {
    let mut slot = make_slot(0);
    slot.money = Decimal::from(500);
    // Affordable: (5 - 1) × 100 = 400. Cleared on day 1.
    slot.transactions_pending.push(Transaction::new(1, Advertisement::new(5, 100)));
    // Unaffordable once the first is paid.
    slot.transactions_pending.push(Transaction::new(1, Advertisement::new(50, 100)));

    let outcome = slot.update_at(1).unwrap();

    assert_eq!(slot.transactions_pending.len(), 1);
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].position, 1);
    assert_eq!(slot.money, Decimal::from(100));
}

/// Two transactions due on the same day never drive money negative.
#[test]
fn money_never_goes_negative() {
    let mut slot = make_slot(0);
    slot.money = Decimal::from(600);
    slot.transactions_pending.push(Transaction::new(1, Advertisement::new(5, 100)));
    slot.transactions_pending.push(Transaction::new(1, Advertisement::new(5, 100)));

    slot.update_at(1).unwrap();

    assert!(slot.money >= Decimal::ZERO);
    assert_eq!(slot.transactions_pending.len(), 1);
}

/// A view history that disagrees with the day counter is fatal.
#[test]
fn desynced_history_is_rejected() {
    let mut slot = make_slot(1);
    slot.views.push((1, 1));

    let result = slot.update_at(4);

    assert!(
        matches!(result, Err(SimError::Desync { expected: 0, actual: 1 })),
        "expected desync error, got {result:?}"
    );
    assert_eq!(slot.last_touch, 0, "a failed update must not move last_touch");
}

/// Boosts are dropped on their expiry day before that day's views count.
#[test]
fn boosts_expire_before_the_day_is_recorded() {
    let mut slot = make_slot(0);
    slot.boosts.push(Advertisement::new(3, 10).into());

    let outcome = slot.update_at(3).unwrap();

    // Day 3 gets only the milestone bonus earned on day 2.
    assert_eq!(slot.views, vec![(10, 10), (10, 20), (1, 21)]);
    assert!(slot.boosts.is_empty());
    assert!(outcome.events.contains(&SimEvent::BoostExpired {
        day:   3,
        boost: "advertisement".into(),
    }));
}

/// An advertisement that clears after its own expiry day adds no views.
#[test]
fn stale_advertisement_never_runs() {
    let mut slot = make_slot(0);
    slot.transactions_pending.push(Transaction::new(10, Advertisement::new(7, 1000)));

    slot.update_at(11).unwrap();

    assert!(slot.transactions_pending.is_empty());
    assert!(slot.boosts.is_empty());
    assert_eq!(slot.views[9], (0, 0));
    assert_eq!(slot.money, Decimal::ZERO);
}

/// Friends boost exactly the next recorded day.
#[test]
fn friends_last_one_day() {
    let mut slot = make_slot(0);
    Friends::new(30).activate(&mut slot);
    assert_eq!(slot.friends_pinged, 30);

    slot.update_at(2).unwrap();

    assert_eq!(slot.views, vec![(30, 30), (0, 30)]);
    assert!(slot.boosts.is_empty());
}

/// A CDN purchase clears into the permanent rate and is charged its cost.
#[test]
fn cdn_transaction_raises_permanent_rate() {
    let mut slot = make_slot(0);
    slot.money = Decimal::from(1_000_000);
    slot.cdn_servers.push((0, 0));
    let cdn = CdnSetup::new(35, 140);
    let cost = cdn.cost(&slot);
    let gain = sitesim_core::geo::tables().brightness_at(35, 140).round() as u64;
    slot.transactions_pending.push(Transaction::new(1, cdn));

    slot.update_at(1).unwrap();

    assert!(gain > 0, "test coordinate should be lit");
    assert_eq!(slot.view_rate, gain);
    assert_eq!(slot.views, vec![(gain, gain)]);
    assert_eq!(slot.money, Decimal::from(1_000_000) - cost);
    assert_eq!(slot.cdn_servers, vec![(0, 0), (35, 140)]);
    assert!(slot.boosts.is_empty(), "CDN boosts never sit in the boost list");
}

/// Trading views for ads scales the rate by e^(-2p) and pays p × rate.
#[test]
fn ad_proportion_trades_views_for_money() {
    let mut slot = make_slot(100);
    slot.ad_proportion = Decimal::new(5, 1);

    slot.update_at(1).unwrap();

    // 100 × e^-1 ≈ 36.79 views, half of that in money.
    assert_eq!(slot.views, vec![(37, 37)]);
    assert!(slot.money > Decimal::new(1839, 2) && slot.money < Decimal::new(1840, 2),
        "unexpected ad revenue {}", slot.money);
}

/// Reaching the threshold asks the player; accepting keeps the game going.
#[test]
fn win_threshold_requires_a_decision() {
    let mut slot = make_slot(WIN_THRESHOLD);

    let outcome = slot.update_at(1).unwrap();
    assert_eq!(outcome.state, SessionState::WonPendingDecision);

    assert_eq!(slot.resolve_win(true), SessionState::Running);
    assert!(slot.continued);

    let outcome = slot.update_at(2).unwrap();
    assert_eq!(outcome.state, SessionState::Running, "a continued slot is never asked again");
}

#[test]
fn declining_the_win_ends_the_session() {
    let mut slot = make_slot(WIN_THRESHOLD);
    slot.update_at(1).unwrap();

    assert_eq!(slot.resolve_win(false), SessionState::Ended);
    assert!(!slot.continued);
}

/// A clock that runs backwards never moves `last_touch` back.
#[test]
fn backwards_clock_keeps_last_touch() {
    let mut slot = make_slot(2);
    slot.update_with(&FixedClock(5)).unwrap();

    let outcome = slot.update_with(&FixedClock(3)).unwrap();

    assert_eq!(outcome.days_advanced, 0);
    assert_eq!(slot.last_touch, 5);
    assert_eq!(slot.views.len(), 5);
    slot.update_with(&FixedClock(6)).unwrap();
    assert_eq!(slot.views.len(), 6);
}

/// Crossing a power of ten in cumulative views is reported.
#[test]
fn milestones_are_reported() {
    let mut slot = make_slot(60);

    let outcome = slot.update_at(2).unwrap();

    let milestones: Vec<_> = outcome
        .events
        .iter()
        .filter_map(|e| match e {
            SimEvent::MilestoneReached { day, cumulative, .. } => Some((*day, *cumulative)),
            _ => None,
        })
        .collect();
    // Day 1 reaches 60 (units → tens), day 2 reaches 120 (tens → hundreds).
    assert_eq!(milestones, vec![(1, 60), (2, 120)]);
}
