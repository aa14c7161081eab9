//! Simulation context and its simulated-time scheduler.
//!
//! `Simulation` owns the market and the trade tracker and replaces the
//! page-global panel object: it is created explicitly, driven explicitly
//! and dropped when the session ends. Two recurring timers live inside
//! it as plain data:
//!
//! - price tick: advance every pair, then settle due trades
//! - overview tick: perturb the market-overview quotes
//!
//! Nothing here reads the wall clock. Callers move time forward with
//! `advance_to` / `advance_by`; the real-time runner simply passes
//! `Utc::now()`.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use super::accountant::Accountant;
use super::tracker::{TrackerEvent, TradeStats, TradeTracker};
use crate::config::AppConfig;
use crate::market::overview::OverviewQuote;
use crate::market::random::RandomSource;
use crate::market::{ChartSnapshot, Market};
use crate::types::{Account, Pair, Settlement, Timeframe, Trade, TradeId, TradeRequest, ValidationError};

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

/// A fixed-period timer expressed in simulated time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    period: Duration,
    next_due: DateTime<Utc>,
}

impl Timer {
    /// First firing is one period after `start`.
    pub fn new(period: Duration, start: DateTime<Utc>) -> Self {
        Self {
            period,
            next_due: start + period,
        }
    }

    pub fn next_due(&self) -> DateTime<Utc> {
        self.next_due
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_due <= now
    }

    fn rearm(&mut self) {
        self.next_due += self.period;
    }
}

fn period(ms: u64) -> Result<Duration> {
    i64::try_from(ms)
        .ok()
        .and_then(Duration::try_milliseconds)
        .with_context(|| format!("Timer period of {ms}ms is out of range"))
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Result of one price tick.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub at: DateTime<Utc>,
    pub prices: Vec<(Pair, f64)>,
    pub settlements: Vec<Settlement>,
}

/// Everything that happened during one `advance_to` call.
#[derive(Debug, Clone, Default)]
pub struct AdvanceReport {
    pub ticks: Vec<TickReport>,
    pub overview_updates: u32,
}

impl AdvanceReport {
    pub fn settlements(&self) -> impl Iterator<Item = &Settlement> {
        self.ticks.iter().flat_map(|t| t.settlements.iter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Price,
    Overview,
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

pub struct Simulation {
    market: Market,
    tracker: TradeTracker,
    price_timer: Timer,
    overview_timer: Timer,
    now: DateTime<Utc>,
    tick_count: u64,
}

impl Simulation {
    /// Build a simulation whose clock starts at `start`. The configuration
    /// is validated first.
    pub fn new(config: &AppConfig, rng: Box<dyn RandomSource>, start: DateTime<Utc>) -> Result<Self> {
        config.validate().context("Invalid simulation configuration")?;
        let sim = &config.simulation;
        let price_period = period(sim.tick_interval_ms)?;
        let overview_period = period(sim.overview_interval_ms)?;
        let market = Market::new(config, rng)?;
        let tracker = TradeTracker::new(
            Account::new(sim.initial_balance, sim.opening_daily_pnl),
            Accountant::new(sim.payout_ratio),
            sim.recent_trades,
        );
        Ok(Self {
            market,
            tracker,
            price_timer: Timer::new(price_period, start),
            overview_timer: Timer::new(overview_period, start),
            now: start,
            tick_count: 0,
        })
    }

    // -- Time ---------------------------------------------------------------

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Run one price tick at the current simulated time, independent of
    /// the timers.
    pub fn advance_tick(&mut self) -> TickReport {
        self.tick_count += 1;
        let prices = self.market.advance_all();
        let settlements = self.settle_due_trades(self.now);
        debug!(tick = self.tick_count, settled = settlements.len(), "Tick");
        TickReport {
            tick: self.tick_count,
            at: self.now,
            prices,
            settlements,
        }
    }

    /// Move the clock to `now`, firing every timer that falls due on the
    /// way in chronological order. Moving backwards is a no-op.
    pub fn advance_to(&mut self, now: DateTime<Utc>) -> AdvanceReport {
        let mut report = AdvanceReport::default();
        if now < self.now {
            return report;
        }

        while let Some(kind) = self.next_due_timer(now) {
            match kind {
                TimerKind::Price => {
                    self.now = self.price_timer.next_due();
                    self.price_timer.rearm();
                    report.ticks.push(self.advance_tick());
                }
                TimerKind::Overview => {
                    self.now = self.overview_timer.next_due();
                    self.overview_timer.rearm();
                    self.market.update_overview();
                    report.overview_updates += 1;
                }
            }
        }

        self.now = now;
        report
    }

    pub fn advance_by(&mut self, elapsed: Duration) -> AdvanceReport {
        self.advance_to(self.now + elapsed)
    }

    /// Earliest timer due at or before `now`; price wins a tie so trades
    /// settle against the freshest price.
    fn next_due_timer(&self, now: DateTime<Utc>) -> Option<TimerKind> {
        let price = self.price_timer.is_due(now).then(|| self.price_timer.next_due());
        let overview = self.overview_timer.is_due(now).then(|| self.overview_timer.next_due());
        match (price, overview) {
            (Some(p), Some(o)) if o < p => Some(TimerKind::Overview),
            (Some(_), _) => Some(TimerKind::Price),
            (None, Some(_)) => Some(TimerKind::Overview),
            (None, None) => None,
        }
    }

    // -- Trading ------------------------------------------------------------

    /// Place a trade at the pair's latest price and the current time.
    pub fn place_trade(&mut self, request: TradeRequest) -> Result<TradeId, ValidationError> {
        let entry_price = self.market.last_price(&request.pair);
        self.tracker.place(request, entry_price, self.now)
    }

    /// Settle every trade due at `now` against current prices.
    pub fn settle_due_trades(&mut self, now: DateTime<Utc>) -> Vec<Settlement> {
        let market = &self.market;
        self.tracker.settle_due(now, |pair| market.last_price(pair))
    }

    pub fn account(&self) -> Account {
        self.tracker.account()
    }

    pub fn pending_trades(&self) -> &[Trade] {
        self.tracker.pending()
    }

    pub fn recent_settlements(&self) -> Vec<Settlement> {
        self.tracker.recent().cloned().collect()
    }

    pub fn stats(&self) -> TradeStats {
        self.tracker.stats()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.tracker.subscribe()
    }

    // -- Market -------------------------------------------------------------

    pub fn market(&self) -> &Market {
        &self.market
    }

    pub fn change_pair(&mut self, pair: Pair) -> Result<(), ValidationError> {
        self.market.change_pair(pair)
    }

    pub fn set_timeframe(&mut self, timeframe: Timeframe) {
        self.market.set_timeframe(timeframe);
    }

    pub fn chart(&self) -> ChartSnapshot {
        self.market.chart(self.now)
    }

    pub fn overview(&self) -> Vec<OverviewQuote> {
        self.market.overview()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
