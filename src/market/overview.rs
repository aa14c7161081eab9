//! Market overview: a slower-moving quote list for every pair.
//!
//! Each quote doubles as the pair's reference price; a regenerated
//! chart series starts its walk from here.

use serde::Serialize;
use std::collections::BTreeMap;

use super::random::{delta, RandomSource};
use crate::config::PairSpec;
use crate::types::{format_price, Pair, Trend};

/// One row of the overview list.
#[derive(Debug, Clone, Serialize)]
pub struct OverviewQuote {
    pub pair: Pair,
    /// `EUR/USD` style label.
    pub symbol: String,
    pub price: f64,
    pub display_price: String,
    /// Last applied change.
    pub change: f64,
    /// `change / price * 100`, rounded to two places.
    pub change_pct: f64,
    pub trend: Trend,
}

#[derive(Debug, Clone, Default)]
pub struct MarketOverview {
    quotes: BTreeMap<Pair, OverviewQuote>,
}

impl MarketOverview {
    /// Seed every quote at its base price with no change yet.
    pub fn new(specs: &BTreeMap<Pair, PairSpec>) -> Self {
        let quotes = specs
            .iter()
            .map(|(pair, spec)| {
                (
                    pair.clone(),
                    OverviewQuote {
                        pair: pair.clone(),
                        symbol: pair.slashed(),
                        price: spec.base_price,
                        display_price: format_price(spec.base_price, spec.decimals),
                        change: 0.0,
                        change_pct: 0.0,
                        trend: Trend::Up,
                    },
                )
            })
            .collect();
        Self { quotes }
    }

    /// Perturb every quote once using the pair's overview volatility.
    pub fn update(&mut self, specs: &BTreeMap<Pair, PairSpec>, rng: &mut dyn RandomSource) {
        for (pair, quote) in self.quotes.iter_mut() {
            let spec = specs.get(pair).copied().unwrap_or(PairSpec::FALLBACK);
            let change = delta(rng, spec.overview_volatility);
            quote.price += change;
            quote.change = change;
            quote.change_pct = if quote.price != 0.0 {
                ((change / quote.price) * 100.0 * 100.0).round() / 100.0
            } else {
                0.0
            };
            quote.trend = Trend::from_change(change);
            quote.display_price = format_price(quote.price, spec.decimals);
        }
    }

    pub fn reference_price(&self, pair: &Pair) -> Option<f64> {
        self.quotes.get(pair).map(|q| q.price)
    }

    pub fn quote(&self, pair: &Pair) -> Option<&OverviewQuote> {
        self.quotes.get(pair)
    }

    pub fn quotes(&self) -> Vec<OverviewQuote> {
        self.quotes.values().cloned().collect()
    }
}
