//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every section has built-in defaults matching the stock trading
//! panel, so a partial file (or no file at all) still yields a usable
//! simulation.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;

use crate::types::Timeframe;

/// Upper bound for the tick and overview periods (one day).
pub const MAX_PERIOD_MS: u64 = 86_400_000;

/// Upper bound for the number of points kept per price series.
pub const MAX_HISTORY_CAPACITY: usize = 10_000;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default = "default_pairs")]
    pub pairs: BTreeMap<String, PairSpec>,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimulationConfig {
    pub name: String,
    /// Price tick period; trades are settled on the same tick.
    pub tick_interval_ms: u64,
    /// Market-overview refresh period.
    pub overview_interval_ms: u64,
    /// Number of points kept per price series.
    pub history_capacity: usize,
    pub initial_balance: Decimal,
    pub opening_daily_pnl: Decimal,
    /// Profit credited per unit staked on a winning trade.
    pub payout_ratio: Decimal,
    pub active_pair: String,
    pub timeframe: Timeframe,
    /// How many settled trades the recent-results list keeps.
    pub recent_trades: usize,
    /// Fixed RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            name: "TRADESIM-001".to_string(),
            tick_interval_ms: 1_000,
            overview_interval_ms: 3_000,
            history_capacity: 50,
            initial_balance: dec!(10000),
            opening_daily_pnl: Decimal::ZERO,
            payout_ratio: dec!(0.85),
            active_pair: "EURUSD".to_string(),
            timeframe: Timeframe::M5,
            recent_trades: 5,
            seed: None,
        }
    }
}

/// Static per-pair parameters of the random walk.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct PairSpec {
    pub base_price: f64,
    /// Full width of the per-tick delta range on the chart series.
    pub volatility: f64,
    /// Full width of the per-update delta range in the market overview.
    pub overview_volatility: f64,
    /// Decimal places used when displaying prices.
    #[serde(default = "default_decimals")]
    pub decimals: usize,
}

impl PairSpec {
    /// Fallback for symbols without an explicit entry.
    pub const FALLBACK: PairSpec = PairSpec {
        base_price: 1.0,
        volatility: 0.0005,
        overview_volatility: 0.0003,
        decimals: 4,
    };
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8080,
        }
    }
}

fn default_decimals() -> usize {
    4
}

fn default_pairs() -> BTreeMap<String, PairSpec> {
    [
        ("EURUSD", 1.0842, 0.0005, 0.0003, 4),
        ("GBPUSD", 1.2134, 0.0008, 0.0004, 4),
        ("USDJPY", 149.82, 0.05, 0.03, 2),
        ("AUDUSD", 0.6758, 0.0006, 0.0003, 4),
    ]
    .into_iter()
    .map(|(symbol, base_price, volatility, overview_volatility, decimals)| {
        (
            symbol.to_string(),
            PairSpec {
                base_price,
                volatility,
                overview_volatility,
                decimals,
            },
        )
    })
    .collect()
}

/// Built-in configuration: four majors and a $10,000 demo account.
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            pairs: default_pairs(),
            dashboard: DashboardConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the simulation cannot run with.
    pub fn validate(&self) -> Result<()> {
        let sim = &self.simulation;
        anyhow::ensure!(
            (1..=MAX_PERIOD_MS).contains(&sim.tick_interval_ms),
            "tick_interval_ms must be between 1 and {MAX_PERIOD_MS}"
        );
        anyhow::ensure!(
            (1..=MAX_PERIOD_MS).contains(&sim.overview_interval_ms),
            "overview_interval_ms must be between 1 and {MAX_PERIOD_MS}"
        );
        anyhow::ensure!(
            (2..=MAX_HISTORY_CAPACITY).contains(&sim.history_capacity),
            "history_capacity must be between 2 and {MAX_HISTORY_CAPACITY}"
        );
        anyhow::ensure!(sim.payout_ratio >= Decimal::ZERO, "payout_ratio must not be negative");
        anyhow::ensure!(!self.pairs.is_empty(), "at least one pair must be configured");
        for (symbol, spec) in &self.pairs {
            anyhow::ensure!(
                spec.base_price.is_finite() && spec.base_price > 0.0,
                "pair {symbol}: base_price must be positive"
            );
            anyhow::ensure!(
                spec.volatility >= 0.0 && spec.overview_volatility >= 0.0,
                "pair {symbol}: volatility must not be negative"
            );
        }
        Ok(())
    }
}
