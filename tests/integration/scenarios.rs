//! Worked trading scenarios with scripted prices.
//!
//! Each test builds a `Simulation` on a deterministic random source and a
//! fixed start time, places trades, and walks simulated time forward.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use tradesim::config::AppConfig;
use tradesim::engine::tracker::TrackerEvent;
use tradesim::engine::Simulation;
use tradesim::market::random::{RandomSource, ScriptedRandom};
use tradesim::types::*;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 14, 30, 0).unwrap()
}

/// One EURUSD pair at exactly 1.0800 with a $10,000 account.
fn single_pair_config() -> AppConfig {
    AppConfig::parse(
        r#"
        [simulation]
        initial_balance = 10000.0
        active_pair = "EURUSD"

        [pairs.EURUSD]
        base_price = 1.0800
        volatility = 0.0040
        overview_volatility = 0.0
        "#,
    )
    .unwrap()
}

/// Flat while the series is generated, then `value` forever.
struct Staged {
    warmup: usize,
    value: f64,
}

impl RandomSource for Staged {
    fn next_unit(&mut self) -> f64 {
        if self.warmup > 0 {
            self.warmup -= 1;
            0.5
        } else {
            self.value
        }
    }
}

fn scripted(value: f64) -> Staged {
    Staged { warmup: 50, value }
}

fn request(direction: Direction, amount: Decimal, duration_secs: u64) -> TradeRequest {
    TradeRequest {
        pair: "EURUSD".parse().unwrap(),
        direction,
        amount,
        duration_secs,
    }
}

#[test]
fn scenario_up_trade_wins() {
    // Every tick: (1.0 - 0.5) * 0.004 = +0.002
    let rng = scripted(1.0);
    let mut sim = Simulation::new(&single_pair_config(), Box::new(rng), start()).unwrap();
    let eur: Pair = "EURUSD".parse().unwrap();
    assert_eq!(sim.market().last_price(&eur), Some(1.08));

    sim.place_trade(request(Direction::Up, dec!(100), 1)).unwrap();
    assert_eq!(sim.account().balance, dec!(9900));

    let report = sim.advance_by(Duration::seconds(1));
    let settled: Vec<_> = report.settlements().cloned().collect();
    assert_eq!(settled.len(), 1);
    assert_eq!(settled[0].outcome, Outcome::Win);
    assert!((settled[0].exit_price - 1.082).abs() < 1e-12);
    assert_eq!(sim.account().balance, dec!(9985));
}

#[test]
fn scenario_up_trade_loses() {
    // (0.25 - 0.5) * 0.004 = -0.001
    let rng = scripted(0.25);
    let mut sim = Simulation::new(&single_pair_config(), Box::new(rng), start()).unwrap();

    sim.place_trade(request(Direction::Up, dec!(100), 1)).unwrap();
    sim.advance_by(Duration::seconds(1));

    assert_eq!(sim.account().balance, dec!(9900));
    assert_eq!(sim.account().daily_pnl, dec!(-100));
    assert_eq!(sim.stats().lost, 1);
}

#[test]
fn scenario_oversized_trade_rejected() {
    let mut sim =
        Simulation::new(&single_pair_config(), Box::new(ScriptedRandom::flat()), start()).unwrap();

    let err = sim.place_trade(request(Direction::Up, dec!(20000), 60)).unwrap_err();
    assert!(matches!(err, ValidationError::InsufficientBalance { .. }));
    assert_eq!(sim.account().balance, dec!(10000));
    assert!(sim.pending_trades().is_empty());
}

#[test]
fn scenario_sixty_second_trade_settles_at_expiry() {
    let rng = scripted(1.0);
    let mut sim = Simulation::new(&single_pair_config(), Box::new(rng), start()).unwrap();
    sim.place_trade(request(Direction::Down, dec!(100), 60)).unwrap();

    assert_eq!(sim.advance_by(Duration::seconds(59)).settlements().count(), 0);
    assert_eq!(sim.pending_trades().len(), 1);

    let report = sim.advance_by(Duration::seconds(1));
    let settled: Vec<_> = report.settlements().collect();
    assert_eq!(settled.len(), 1);
    assert_eq!(settled[0].settled_at, start() + Duration::seconds(60));
    // Price rose, DOWN loses.
    assert_eq!(settled[0].outcome, Outcome::Loss);
    assert_eq!(sim.account().balance, dec!(9900));
}

#[test]
fn scenario_mixed_book() {
    // Rising walk: UP wins, DOWN loses.
    let rng = scripted(1.0);
    let mut sim = Simulation::new(&single_pair_config(), Box::new(rng), start()).unwrap();

    sim.place_trade(request(Direction::Up, dec!(200), 2)).unwrap();
    sim.place_trade(request(Direction::Down, dec!(300), 2)).unwrap();
    assert_eq!(sim.account().balance, dec!(9500));

    sim.advance_by(Duration::seconds(2));
    // 9500 + 200 * 0.85
    assert_eq!(sim.account().balance, dec!(9670));
    assert_eq!(sim.account().daily_pnl, dec!(-130));

    let recent = sim.recent_settlements();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].trade.direction, Direction::Down);
    assert_eq!(recent[1].trade.direction, Direction::Up);
}

#[test]
fn scenario_subscriber_sees_lifecycle() {
    let rng = scripted(1.0);
    let mut sim = Simulation::new(&single_pair_config(), Box::new(rng), start()).unwrap();
    let mut rx = sim.subscribe();

    let id = sim.place_trade(request(Direction::Up, dec!(50), 1)).unwrap();
    sim.advance_by(Duration::seconds(3));

    let mut placed = 0;
    let mut settled = 0;
    while let Ok(event) = rx.try_recv() {
        match event {
            TrackerEvent::TradePlaced { trade, .. } => {
                assert_eq!(trade.id, id);
                placed += 1;
            }
            TrackerEvent::TradeSettled { settlement, account } => {
                assert_eq!(settlement.trade.id, id);
                assert_eq!(account.balance, dec!(9992.5));
                settled += 1;
            }
        }
    }
    assert_eq!((placed, settled), (1, 1));
}

#[test]
fn scenario_opening_daily_pnl_carries() {
    let mut cfg = single_pair_config();
    cfg.simulation.opening_daily_pnl = dec!(245.80);
    let rng = scripted(1.0);
    let mut sim = Simulation::new(&cfg, Box::new(rng), start()).unwrap();

    sim.place_trade(request(Direction::Up, dec!(100), 1)).unwrap();
    sim.advance_by(Duration::seconds(1));
    assert_eq!(sim.account().daily_pnl, dec!(330.80));
}

#[test]
fn scenario_dashboard_round_trip() {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;
    use tradesim::dashboard::{build_router, routes::DashboardState};
    use tradesim::engine::runner::shared;

    let sim = Simulation::new(&single_pair_config(), Box::new(ScriptedRandom::flat()), Utc::now())
        .unwrap();
    let state = Arc::new(DashboardState::new("TRADESIM-IT", shared(sim)));

    tokio_test::block_on(async {
        let resp = build_router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/trades")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"direction":"up","amount":250,"duration":60}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = build_router(state.clone())
            .oneshot(Request::builder().uri("/api/account").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["balance_display"], "$9,750.00");
        assert_eq!(json["open_positions"], 1);
    });
}
