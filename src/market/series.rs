//! Bounded price history for one pair.

use std::collections::VecDeque;

use super::random::{delta, RandomSource};
use crate::types::Trend;

/// The most recent `capacity` prices of a pair, oldest first.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    prices: VecDeque<f64>,
    capacity: usize,
}

impl PriceSeries {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            prices: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Fill a fresh series by walking `capacity` steps away from `start`.
    /// The start price itself is not part of the series.
    pub fn generate(
        start: f64,
        capacity: usize,
        volatility: f64,
        rng: &mut dyn RandomSource,
    ) -> Self {
        let mut series = Self::new(capacity);
        let mut price = start;
        for _ in 0..series.capacity {
            price += delta(rng, volatility);
            series.push(price);
        }
        series
    }

    /// Append a price, evicting the oldest when over capacity.
    pub fn push(&mut self, price: f64) {
        self.prices.push_back(price);
        while self.prices.len() > self.capacity {
            self.prices.pop_front();
        }
    }

    /// Step the walk once from the last price. An empty series does not move.
    pub fn advance(&mut self, volatility: f64, rng: &mut dyn RandomSource) -> Option<f64> {
        let next = self.last()? + delta(rng, volatility);
        self.push(next);
        Some(next)
    }

    pub fn last(&self) -> Option<f64> {
        self.prices.back().copied()
    }

    pub fn previous(&self) -> Option<f64> {
        let len = self.prices.len();
        if len < 2 {
            None
        } else {
            self.prices.get(len - 2).copied()
        }
    }

    /// Trend of the latest step, `None` until two prices exist.
    pub fn trend(&self) -> Option<Trend> {
        Some(Trend::from_change(self.last()? - self.previous()?))
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.prices.iter().copied().collect()
    }
}
