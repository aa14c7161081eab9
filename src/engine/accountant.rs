//! Accountant: balance checks, stake debits and settlement credits.
//!
//! Every mutation of the demo account goes through here: the stake is
//! reserved when a trade is placed, and on expiry a winning trade is
//! credited `amount × payout_ratio` while a losing one gets nothing back.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info};

use crate::types::{Account, Outcome, Settlement, Trade, ValidationError};

/// Default fraction of the stake paid out as profit on a win.
pub const DEFAULT_PAYOUT_RATIO: Decimal = dec!(0.85);

// ---------------------------------------------------------------------------
// Accountant
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct Accountant {
    payout_ratio: Decimal,
}

impl Default for Accountant {
    fn default() -> Self {
        Self::new(DEFAULT_PAYOUT_RATIO)
    }
}

impl Accountant {
    pub fn new(payout_ratio: Decimal) -> Self {
        Self { payout_ratio }
    }

    pub fn payout_ratio(&self) -> Decimal {
        self.payout_ratio
    }

    /// Check a stake against the account without touching it.
    pub fn check_stake(account: &Account, amount: Decimal) -> Result<(), ValidationError> {
        if amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount(amount));
        }
        if amount > account.balance {
            return Err(ValidationError::InsufficientBalance {
                needed: amount,
                available: account.balance,
            });
        }
        Ok(())
    }

    /// Reserve the stake of a newly placed trade.
    pub fn debit_stake(account: &mut Account, amount: Decimal) {
        account.balance -= amount;
        debug!(amount = %amount, balance = %account.balance, "Stake debited");
    }

    /// Resolve a due trade at `exit_price` and book the result.
    ///
    /// The stake was already debited at placement, so a loss leaves the
    /// balance untouched and only the daily P&L records `-amount`.
    pub fn settle(
        &self,
        account: &mut Account,
        trade: Trade,
        exit_price: f64,
        now: DateTime<Utc>,
    ) -> Settlement {
        let won = trade.direction.wins(trade.entry_price, exit_price);
        let (outcome, credited, pnl) = if won {
            let profit = trade.amount * self.payout_ratio;
            (Outcome::Win, profit, profit)
        } else {
            (Outcome::Loss, Decimal::ZERO, -trade.amount)
        };

        account.balance += credited;
        account.daily_pnl += pnl;

        info!(
            trade_id = %trade.id,
            pair = %trade.pair,
            direction = %trade.direction,
            entry = trade.entry_price,
            exit = exit_price,
            outcome = %outcome,
            pnl = %pnl,
            balance = %account.balance,
            "Trade settled"
        );

        Settlement {
            trade,
            exit_price,
            outcome,
            credited,
            pnl,
            settled_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
