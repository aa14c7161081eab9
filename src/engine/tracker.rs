//! Trade tracker: placement, the pending set, settlement and events.
//!
//! The tracker owns the account and every open trade. Prices are passed
//! in by the caller, so the tracker knows nothing about how the market
//! moves; it only decides when a trade is due.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use super::accountant::Accountant;
use crate::types::{
    expiry_after, Account, Outcome, Pair, Settlement, Trade, TradeId, TradeRequest,
    ValidationError,
};

const EVENT_CHANNEL_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Published to subscribers on every account-changing action.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrackerEvent {
    TradePlaced { trade: Trade, account: Account },
    TradeSettled { settlement: Settlement, account: Account },
}

/// Win/loss counters since the tracker was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TradeStats {
    pub placed: u64,
    pub won: u64,
    pub lost: u64,
}

impl TradeStats {
    /// Win rate as a percentage. Returns 0.0 if nothing has settled.
    pub fn win_rate(&self) -> f64 {
        let settled = self.won + self.lost;
        if settled == 0 {
            0.0
        } else {
            (self.won as f64 / settled as f64) * 100.0
        }
    }
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

pub struct TradeTracker {
    account: Account,
    accountant: Accountant,
    pending: Vec<Trade>,
    recent: VecDeque<Settlement>,
    recent_capacity: usize,
    stats: TradeStats,
    events: broadcast::Sender<TrackerEvent>,
}

impl TradeTracker {
    pub fn new(account: Account, accountant: Accountant, recent_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            account,
            accountant,
            pending: Vec::new(),
            recent: VecDeque::with_capacity(recent_capacity),
            recent_capacity,
            stats: TradeStats::default(),
            events,
        }
    }

    pub fn account(&self) -> Account {
        self.account
    }

    /// Open trades in placement order.
    pub fn pending(&self) -> &[Trade] {
        &self.pending
    }

    /// Most recent settlements, newest first.
    pub fn recent(&self) -> impl Iterator<Item = &Settlement> {
        self.recent.iter()
    }

    pub fn stats(&self) -> TradeStats {
        self.stats
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.events.subscribe()
    }

    /// Validate, debit and enqueue a trade.
    ///
    /// `entry_price` is the pair's latest price, or `None` when the market
    /// does not quote the pair. Any rejection leaves all state unchanged.
    pub fn place(
        &mut self,
        request: TradeRequest,
        entry_price: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<TradeId, ValidationError> {
        if let Err(e) = self.validate(&request, entry_price, now) {
            warn!(
                pair = %request.pair,
                amount = %request.amount,
                balance = %self.account.balance,
                error = %e,
                "Trade rejected"
            );
            return Err(e);
        }
        let Some(entry_price) = entry_price else {
            return Err(ValidationError::UnknownPair(request.pair));
        };

        let trade = Trade {
            id: Uuid::new_v4(),
            pair: request.pair,
            direction: request.direction,
            amount: request.amount,
            duration_secs: request.duration_secs,
            entry_price,
            placed_at: now,
        };

        Accountant::debit_stake(&mut self.account, trade.amount);
        self.stats.placed += 1;

        info!(
            trade_id = %trade.id,
            pair = %trade.pair,
            direction = %trade.direction,
            amount = %trade.amount,
            entry = trade.entry_price,
            duration_secs = trade.duration_secs,
            balance = %self.account.balance,
            "Trade placed"
        );

        let id = trade.id;
        self.publish(TrackerEvent::TradePlaced {
            trade: trade.clone(),
            account: self.account,
        });
        self.pending.push(trade);
        Ok(id)
    }

    fn validate(
        &self,
        request: &TradeRequest,
        entry_price: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        Accountant::check_stake(&self.account, request.amount)?;
        if request.duration_secs == 0 {
            return Err(ValidationError::ZeroDuration);
        }
        if expiry_after(now, request.duration_secs).is_none() {
            return Err(ValidationError::DurationTooLong(request.duration_secs));
        }
        if entry_price.is_none() {
            return Err(ValidationError::UnknownPair(request.pair.clone()));
        }
        Ok(())
    }

    /// Settle every trade whose duration has elapsed at `now`, using the
    /// latest price of the trade's own pair. Returns settlements in
    /// placement order.
    pub fn settle_due<F>(&mut self, now: DateTime<Utc>, price_of: F) -> Vec<Settlement>
    where
        F: Fn(&Pair) -> Option<f64>,
    {
        let mut settlements = Vec::new();
        let mut still_pending = Vec::with_capacity(self.pending.len());

        for trade in std::mem::take(&mut self.pending) {
            if !trade.is_due(now) {
                still_pending.push(trade);
                continue;
            }
            let Some(exit_price) = price_of(&trade.pair) else {
                warn!(trade_id = %trade.id, pair = %trade.pair, "No price for due trade, deferring");
                still_pending.push(trade);
                continue;
            };

            let settlement = self.accountant.settle(&mut self.account, trade, exit_price, now);
            match settlement.outcome {
                Outcome::Win => self.stats.won += 1,
                Outcome::Loss => self.stats.lost += 1,
            }
            self.remember(settlement.clone());
            self.publish(TrackerEvent::TradeSettled {
                settlement: settlement.clone(),
                account: self.account,
            });
            settlements.push(settlement);
        }

        self.pending = still_pending;
        settlements
    }

    fn remember(&mut self, settlement: Settlement) {
        if self.recent_capacity == 0 {
            return;
        }
        self.recent.push_front(settlement);
        self.recent.truncate(self.recent_capacity);
    }

    fn publish(&self, event: TrackerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
