//! Simulated market: per-pair random walks, chart state and the
//! market overview.
//!
//! Every configured pair keeps its own bounded series and is advanced on
//! every price tick, so a trade always settles against its own pair. The
//! "active" pair is only what the chart shows; switching to it (or
//! changing the timeframe) regenerates its series.

pub mod overview;
pub mod random;
pub mod series;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, PairSpec};
use crate::types::{format_price, Pair, Timeframe, Trend, ValidationError};
use overview::{MarketOverview, OverviewQuote};
use random::RandomSource;
use series::PriceSeries;

// ---------------------------------------------------------------------------
// Chart snapshot
// ---------------------------------------------------------------------------

/// Everything needed to draw the price chart of the active pair.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSnapshot {
    pub pair: Pair,
    pub timeframe: Timeframe,
    pub prices: Vec<f64>,
    /// `HH:MM` label per point, oldest first.
    pub labels: Vec<String>,
    pub last_price: Option<f64>,
    pub display_price: Option<String>,
    pub trend: Option<Trend>,
}

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

pub struct Market {
    specs: BTreeMap<Pair, PairSpec>,
    series: BTreeMap<Pair, PriceSeries>,
    overview: MarketOverview,
    active: Pair,
    timeframe: Timeframe,
    capacity: usize,
    rng: Box<dyn RandomSource>,
}

impl Market {
    /// Build the market from configuration. Pair symbols that fail to
    /// parse are skipped; an unknown active pair falls back to the first.
    pub fn new(config: &AppConfig, rng: Box<dyn RandomSource>) -> Result<Self> {
        let mut specs = BTreeMap::new();
        for (symbol, spec) in &config.pairs {
            match symbol.parse::<Pair>() {
                Ok(pair) => {
                    specs.insert(pair, *spec);
                }
                Err(e) => warn!(symbol = %symbol, error = %e, "Skipping invalid pair"),
            }
        }

        let fallback = specs
            .keys()
            .next()
            .cloned()
            .context("No valid pairs configured")?;
        let active = match config.simulation.active_pair.parse::<Pair>() {
            Ok(pair) if specs.contains_key(&pair) => pair,
            _ => {
                warn!(
                    requested = %config.simulation.active_pair,
                    using = %fallback,
                    "Active pair not configured, falling back"
                );
                fallback
            }
        };

        let overview = MarketOverview::new(&specs);
        let mut market = Self {
            specs,
            series: BTreeMap::new(),
            overview,
            active,
            timeframe: config.simulation.timeframe,
            capacity: config.simulation.history_capacity,
            rng,
        };

        let pairs: Vec<Pair> = market.specs.keys().cloned().collect();
        for pair in pairs {
            market.reset_series(&pair);
        }

        info!(
            pairs = market.specs.len(),
            active = %market.active,
            capacity = market.capacity,
            "Market initialised"
        );
        Ok(market)
    }

    // -- Queries ------------------------------------------------------------

    pub fn pairs(&self) -> impl Iterator<Item = &Pair> {
        self.specs.keys()
    }

    pub fn is_quoted(&self, pair: &Pair) -> bool {
        self.specs.contains_key(pair)
    }

    /// Parameters for a pair, with a generic fallback for unknown symbols.
    pub fn spec(&self, pair: &Pair) -> PairSpec {
        self.specs.get(pair).copied().unwrap_or(PairSpec::FALLBACK)
    }

    pub fn series(&self, pair: &Pair) -> Option<&PriceSeries> {
        self.series.get(pair)
    }

    /// Latest price of a pair.
    pub fn last_price(&self, pair: &Pair) -> Option<f64> {
        self.series.get(pair).and_then(PriceSeries::last)
    }

    pub fn active_pair(&self) -> &Pair {
        &self.active
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn format_price(&self, pair: &Pair, price: f64) -> String {
        format_price(price, self.spec(pair).decimals)
    }

    // -- Price walk ---------------------------------------------------------

    /// Step one pair's walk. `None` if the pair is not quoted.
    pub fn advance_price(&mut self, pair: &Pair) -> Option<f64> {
        let volatility = self.specs.get(pair)?.volatility;
        let series = self.series.get_mut(pair)?;
        let price = series.advance(volatility, self.rng.as_mut())?;
        debug!(pair = %pair, price, "Price advanced");
        Some(price)
    }

    /// Step every pair once, returning the new last prices.
    pub fn advance_all(&mut self) -> Vec<(Pair, f64)> {
        let pairs: Vec<Pair> = self.specs.keys().cloned().collect();
        pairs
            .into_iter()
            .filter_map(|pair| self.advance_price(&pair).map(|price| (pair, price)))
            .collect()
    }

    /// Regenerate a pair's series from its current reference price.
    pub fn reset_series(&mut self, pair: &Pair) {
        let Some(spec) = self.specs.get(pair).copied() else {
            return;
        };
        let start = self
            .overview
            .reference_price(pair)
            .unwrap_or(spec.base_price);
        let series = PriceSeries::generate(start, self.capacity, spec.volatility, self.rng.as_mut());
        self.series.insert(pair.clone(), series);
    }

    /// Switch the chart to another pair and restart its series.
    pub fn change_pair(&mut self, pair: Pair) -> Result<(), ValidationError> {
        if !self.is_quoted(&pair) {
            return Err(ValidationError::UnknownPair(pair));
        }
        self.reset_series(&pair);
        info!(from = %self.active, to = %pair, "Active pair changed");
        self.active = pair;
        Ok(())
    }

    /// Change the chart timeframe; the active series is regenerated.
    pub fn set_timeframe(&mut self, timeframe: Timeframe) {
        self.timeframe = timeframe;
        let active = self.active.clone();
        self.reset_series(&active);
        info!(timeframe = %timeframe, pair = %active, "Timeframe changed");
    }

    // -- Overview -----------------------------------------------------------

    pub fn update_overview(&mut self) {
        self.overview.update(&self.specs, self.rng.as_mut());
        debug!(quotes = self.specs.len(), "Market overview updated");
    }

    pub fn overview(&self) -> Vec<OverviewQuote> {
        self.overview.quotes()
    }

    // -- Chart --------------------------------------------------------------

    /// Snapshot of the active pair, labelled relative to `now`.
    pub fn chart(&self, now: DateTime<Utc>) -> ChartSnapshot {
        let pair = self.active.clone();
        let prices = self
            .series
            .get(&pair)
            .map(PriceSeries::to_vec)
            .unwrap_or_default();
        let labels = time_labels(prices.len(), self.timeframe, now);
        let series = self.series.get(&pair);
        let last_price = series.and_then(PriceSeries::last);

        ChartSnapshot {
            display_price: last_price.map(|p| self.format_price(&pair, p)),
            trend: series.and_then(PriceSeries::trend),
            pair,
            timeframe: self.timeframe,
            prices,
            labels,
            last_price,
        }
    }
}

/// `HH:MM` labels for `count` points ending at `now`, spaced by the timeframe.
pub fn time_labels(count: usize, timeframe: Timeframe, now: DateTime<Utc>) -> Vec<String> {
    (0..count)
        .map(|i| {
            let steps_back = i32::try_from(count - 1 - i).unwrap_or(i32::MAX);
            now.checked_sub_signed(timeframe.step() * steps_back)
                .unwrap_or(now)
                .format("%H:%M")
                .to_string()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
