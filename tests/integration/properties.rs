//! Invariants that hold for any walk: bounded history, exactly-once
//! settlement, conservation of money and clean runner teardown.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use tradesim::config::AppConfig;
use tradesim::engine::runner;
use tradesim::engine::Simulation;
use tradesim::market::random::{ScriptedRandom, StdRandom};
use tradesim::types::*;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

fn seeded_sim(seed: u64) -> Simulation {
    Simulation::new(&AppConfig::default(), Box::new(StdRandom::seeded(seed)), start()).unwrap()
}

fn request(pair: &str, direction: Direction, amount: Decimal, duration_secs: u64) -> TradeRequest {
    TradeRequest {
        pair: pair.parse().unwrap(),
        direction,
        amount,
        duration_secs,
    }
}

#[test]
fn series_never_exceeds_capacity() {
    let mut sim = seeded_sim(7);
    sim.advance_by(Duration::seconds(500));
    for pair in sim.market().pairs() {
        assert_eq!(sim.market().series(pair).unwrap().len(), 50);
    }
    assert_eq!(sim.chart().prices.len(), 50);
}

#[test]
fn same_seed_same_walk() {
    let mut a = seeded_sim(42);
    let mut b = seeded_sim(42);
    a.advance_by(Duration::seconds(30));
    b.advance_by(Duration::seconds(30));
    assert_eq!(a.chart().prices, b.chart().prices);
}

#[test]
fn every_trade_settles_exactly_once() {
    let mut sim = seeded_sim(9);
    let mut rx = sim.subscribe();
    let mut ids = Vec::new();
    for (i, pair) in ["EURUSD", "GBPUSD", "USDJPY", "AUDUSD"].iter().enumerate() {
        let direction = if i % 2 == 0 { Direction::Up } else { Direction::Down };
        ids.push(sim.place_trade(request(pair, direction, dec!(25), 3 + i as u64)).unwrap());
    }

    let first = sim.advance_by(Duration::seconds(20)).settlements().count();
    let second = sim.advance_by(Duration::seconds(20)).settlements().count();
    assert_eq!(first, 4);
    assert_eq!(second, 0);
    assert!(sim.pending_trades().is_empty());

    let mut settled_ids = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let tradesim::engine::tracker::TrackerEvent::TradeSettled { settlement, .. } = event {
            settled_ids.push(settlement.trade.id);
        }
    }
    settled_ids.sort();
    ids.sort();
    assert_eq!(settled_ids, ids);

    let stats = sim.stats();
    assert_eq!(stats.placed, 4);
    assert_eq!(stats.won + stats.lost, 4);
}

#[test]
fn balance_accounts_for_every_settlement() {
    let mut sim = seeded_sim(13);
    for _ in 0..10 {
        sim.place_trade(request("EURUSD", Direction::Up, dec!(100), 2)).unwrap();
        sim.advance_by(Duration::seconds(1));
    }
    sim.advance_by(Duration::seconds(5));

    let stats = sim.stats();
    let expected = dec!(10000) - dec!(1000) + Decimal::from(stats.won) * dec!(85);
    assert_eq!(sim.account().balance, expected);
    assert_eq!(
        sim.account().daily_pnl,
        Decimal::from(stats.won) * dec!(85) - Decimal::from(stats.lost) * dec!(100)
    );
}

#[test]
fn recent_history_is_bounded_newest_first() {
    let mut sim = seeded_sim(21);
    for i in 0..8u64 {
        sim.place_trade(request("EURUSD", Direction::Down, dec!(10), 1 + i)).unwrap();
    }
    sim.advance_by(Duration::seconds(10));

    let recent = sim.recent_settlements();
    assert_eq!(recent.len(), 5);
    for pair in recent.windows(2) {
        assert!(pair[0].settled_at >= pair[1].settled_at);
    }
    assert_eq!(recent[0].trade.duration_secs, 8);
}

#[test]
fn flat_market_ties_lose_both_ways() {
    let mut sim =
        Simulation::new(&AppConfig::default(), Box::new(ScriptedRandom::flat()), start()).unwrap();
    sim.place_trade(request("GBPUSD", Direction::Up, dec!(100), 1)).unwrap();
    sim.place_trade(request("GBPUSD", Direction::Down, dec!(100), 1)).unwrap();
    sim.advance_by(Duration::seconds(1));

    assert_eq!(sim.stats().lost, 2);
    assert_eq!(sim.account().balance, dec!(9800));
}

#[test]
fn trades_settle_against_their_own_pair_after_switch() {
    let mut sim = seeded_sim(5);
    sim.place_trade(request("USDJPY", Direction::Up, dec!(50), 2)).unwrap();
    sim.change_pair("GBPUSD".parse().unwrap()).unwrap();

    let report = sim.advance_by(Duration::seconds(2));
    let settled: Vec<_> = report.settlements().collect();
    assert_eq!(settled.len(), 1);
    assert_eq!(settled[0].trade.pair.as_str(), "USDJPY");
    // JPY quotes live around 150, nowhere near a USD-quoted major.
    assert!(settled[0].exit_price > 100.0);
}

#[test]
fn rejected_trades_leave_no_trace() {
    let mut sim = seeded_sim(3);
    let mut rx = sim.subscribe();

    for (req, matcher) in [
        (
            request("EURUSD", Direction::Up, dec!(0), 60),
            ValidationError::NonPositiveAmount(dec!(0)),
        ),
        (request("EURUSD", Direction::Up, dec!(10), 0), ValidationError::ZeroDuration),
    ] {
        assert_eq!(sim.place_trade(req).unwrap_err(), matcher);
    }
    assert!(matches!(
        sim.place_trade(request("XAUUSD", Direction::Up, dec!(10), 60)),
        Err(ValidationError::UnknownPair(_))
    ));

    assert_eq!(sim.account().balance, dec!(10000));
    assert_eq!(sim.stats().placed, 0);
    assert!(rx.try_recv().is_err());
}

#[test]
fn overlong_durations_are_rejected_before_they_reach_settlement() {
    let mut sim = seeded_sim(17);
    for duration in [10_000_000_000_000, i64::MAX as u64, u64::MAX] {
        assert_eq!(
            sim.place_trade(request("EURUSD", Direction::Up, dec!(10), duration)),
            Err(ValidationError::DurationTooLong(duration))
        );
    }
    let report = sim.advance_by(Duration::seconds(5));
    assert_eq!(report.ticks.len(), 5);
    assert_eq!(report.settlements().count(), 0);
    assert_eq!(sim.account().balance, dec!(10000));
}

#[test]
fn invalid_timer_config_is_rejected() {
    for (tick, overview) in [(0, 3_000), (1_000, 0), (u64::MAX, 3_000)] {
        let mut cfg = AppConfig::default();
        cfg.simulation.tick_interval_ms = tick;
        cfg.simulation.overview_interval_ms = overview;
        assert!(Simulation::new(&cfg, Box::new(ScriptedRandom::flat()), start()).is_err());
    }
}

#[tokio::test]
async fn runner_stop_freezes_the_simulation() {
    let mut cfg = AppConfig::default();
    cfg.simulation.tick_interval_ms = 10;
    let sim = Simulation::new(&cfg, Box::new(StdRandom::seeded(1)), Utc::now()).unwrap();
    let sim = runner::shared(sim);

    sim.write()
        .await
        .place_trade(request("EURUSD", Direction::Up, dec!(10), 3600))
        .unwrap();

    let handle = runner::spawn(sim.clone(), std::time::Duration::from_millis(5));
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    handle.stop().await.unwrap();

    let frozen = sim.read().await.tick_count();
    assert!(frozen > 0);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let sim = sim.read().await;
    assert_eq!(sim.tick_count(), frozen);
    assert_eq!(sim.pending_trades().len(), 1);
}
