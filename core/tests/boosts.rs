//! The four boost variants: pricing, strength and activation.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sitesim_core::{
    boost::{CDN_K, CDN_RADIUS},
    geo::{self, GRID_COLS, GRID_ROWS},
    Advertisement, AnyBoost, Boost, CdnSetup, Channels, Friends, SaveSlot,
};

fn slot_with_difficulty(difficulty: Decimal) -> SaveSlot {
    SaveSlot::new(difficulty, 1, 0).unwrap()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

// ── Advertisement ───────────────────────────────────────────────────────────

/// Remaining days × power × difficulty.
#[test]
fn advertisement_cost_scales_with_window_and_difficulty() {
    let slot = slot_with_difficulty(Decimal::new(15, 1));

    let cost = Advertisement::new(7, 100).cost(&slot);

    assert_eq!(cost, Decimal::from(1050));
}

#[test]
fn expired_advertisement_costs_nothing() {
    let mut slot = slot_with_difficulty(Decimal::ONE);
    slot.view_rate = 1;
    slot.update_at(9).unwrap();

    assert_eq!(Advertisement::new(4, 100).cost(&slot), Decimal::ZERO);
}

#[test]
fn advertisement_activation_stores_the_boost() {
    let mut slot = slot_with_difficulty(Decimal::ONE);

    Advertisement::new(3, 20).activate(&mut slot);

    assert_eq!(slot.boosts, vec![AnyBoost::Advertisement(Advertisement::new(3, 20))]);
    assert_close(slot.boosts[0].boost(&slot), 20.0);
}

// ── CDN ─────────────────────────────────────────────────────────────────────

/// On a slot with no servers, the boost is the rounded brightness of the
/// server's own cell.
#[test]
fn cdn_boost_reads_the_brightness_table() {
    let slot = slot_with_difficulty(Decimal::ONE);
    let expected = geo::tables().brightness.cell(90, 180).unwrap().round();

    assert_close(CdnSetup::new(0, 0).boost(&slot), expected);
    assert_close(CdnSetup::new(0, 0).boost(&slot), CdnSetup::new(0, 0).boost(&slot));
}

#[test]
fn first_cdn_server_adds_nothing() {
    let mut slot = slot_with_difficulty(Decimal::ONE);

    CdnSetup::new(35, 140).activate(&mut slot);

    assert_eq!(slot.cdn_servers, vec![(35, 140)]);
    assert_eq!(slot.view_rate, 0);
    assert!(slot.boosts.is_empty());
}

#[test]
fn later_cdn_servers_raise_the_rate_once_per_coordinate() {
    let mut slot = slot_with_difficulty(Decimal::ONE);
    let gain = geo::tables().brightness_at(35, 140).round() as u64;

    CdnSetup::new(0, 0).activate(&mut slot);
    CdnSetup::new(35, 140).activate(&mut slot);
    assert_eq!(slot.view_rate, gain);

    CdnSetup::new(35, 140).activate(&mut slot);
    assert_eq!(slot.view_rate, gain, "a duplicate coordinate must not add again");
    assert_eq!(slot.cdn_servers.len(), 3);
}

/// `K × (population × difficulty + K / max(population, 1))`.
#[test]
fn cdn_cost_follows_population() {
    let slot = slot_with_difficulty(Decimal::from(2));
    let population =
        Decimal::from_f64(geo::tables().population_window(0, 0, CDN_RADIUS)).unwrap();

    let cost = CdnSetup::new(0, 0).cost(&slot);

    let expected = CDN_K * (population * Decimal::from(2) + CDN_K / population.max(Decimal::ONE));
    assert_eq!(cost, expected);
    assert!(cost > Decimal::ZERO);
}

/// Coordinates off the grid read zero population and zero brightness.
#[test]
fn cdn_off_the_grid() {
    let slot = slot_with_difficulty(Decimal::ONE);
    let far = CdnSetup::new(500, 500);

    assert_eq!(far.cost(&slot), CDN_K * CDN_K);
    assert_close(far.boost(&slot), 0.0);
}

/// Windows at the edge of the grid drop the cells that fall outside it.
#[test]
fn cdn_cost_at_the_pole_is_finite() {
    let slot = slot_with_difficulty(Decimal::ONE);

    let cost = CdnSetup::new(90, 180).cost(&slot);

    assert!(cost > Decimal::ZERO);
    assert_eq!(geo::tables().brightness.dimensions(), (GRID_ROWS, GRID_COLS));
}

// ── Friends ─────────────────────────────────────────────────────────────────

#[test]
fn friends_are_free_and_counted() {
    let mut slot = slot_with_difficulty(Decimal::ONE);
    let friends = Friends::new(40);
    assert_eq!(friends.cost(&slot), Decimal::ZERO);
    assert_eq!(friends.expires(), None);

    friends.activate(&mut slot);

    assert_eq!(slot.friends_pinged, 40);
    assert_eq!(slot.boosts[0].expires(), Some(2));
    assert_close(slot.boosts[0].boost(&slot), 40.0);
}

#[test]
fn friends_available_follows_difficulty() {
    assert_eq!(slot_with_difficulty(Decimal::ONE).friends_available(), 100);
    assert_eq!(slot_with_difficulty(Decimal::new(25, 1)).friends_available(), 250);
    assert_eq!(slot_with_difficulty(Decimal::new(1005, 3)).friends_available(), 100);
}

// ── Channels ────────────────────────────────────────────────────────────────

/// On the day of activation the exponential term is 1.
#[test]
fn channels_start_at_half_a_view_per_channel() {
    let mut slot = slot_with_difficulty(Decimal::from(2));

    Channels::new(10).activate(&mut slot);

    assert_eq!(slot.promos_used, 10);
    assert_eq!(slot.boosts[0].expires(), None);
    assert_close(slot.boosts[0].boost(&slot), 10.0);
}

#[test]
fn channels_grow_exponentially() {
    let mut slot = slot_with_difficulty(Decimal::ONE);
    Channels::new(4).activate(&mut slot);

    slot.update_at(2).unwrap();

    let expected = 4.0 * 2f64.exp() * 0.5;
    assert_close(slot.boosts[0].boost(&slot), expected);
    assert_eq!(slot.views[0].0, (4.0 * 1f64.exp() * 0.5).ceil() as u64);
}

/// Descriptions name what was bought.
#[test]
fn descriptions_are_readable() {
    let slot = slot_with_difficulty(Decimal::ONE);

    assert!(Advertisement::new(8, 30).description(&slot).contains("+30 views/day"));
    assert!(CdnSetup::new(-33, 151).description(&slot).contains("-33°, 151°"));
    assert!(Friends::new(5).description(&slot).contains("5"));
    assert!(Channels::new(2).description(&slot).starts_with("Channels: 2"));
}
