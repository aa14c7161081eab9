//! Shared types for the trading simulation.
//!
//! These types form the data model used across all modules.
//! They are kept free of engine logic so that market, engine and
//! dashboard modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Instruments
// ---------------------------------------------------------------------------

/// A tradable currency pair, stored in compact upper-case form (`EURUSD`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pair(String);

impl Pair {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Slash-separated display form (`EUR/USD`) for six-letter symbols.
    pub fn slashed(&self) -> String {
        if self.0.len() == 6 {
            format!("{}/{}", &self.0[..3], &self.0[3..])
        } else {
            self.0.clone()
        }
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accepts `EURUSD`, `eurusd` and `EUR/USD`.
impl FromStr for Pair {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let symbol: String = s
            .trim()
            .chars()
            .filter(|c| *c != '/')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(anyhow::anyhow!("Invalid pair symbol: {s}"));
        }
        Ok(Pair(symbol))
    }
}

impl TryFrom<String> for Pair {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Pair> for String {
    fn from(pair: Pair) -> Self {
        pair.0
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Predicted price movement of a binary trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Button label used by the trade panel.
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Up => "Higher",
            Direction::Down => "Lower",
        }
    }

    pub fn arrow(&self) -> char {
        match self {
            Direction::Up => '↑',
            Direction::Down => '↓',
        }
    }

    /// Whether a move from `entry` to `exit` wins in this direction.
    /// Only a strictly favourable move wins; an unchanged price loses.
    pub fn wins(&self, entry: f64, exit: f64) -> bool {
        match self {
            Direction::Up => exit > entry,
            Direction::Down => exit < entry,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "UP"),
            Direction::Down => write!(f, "DOWN"),
        }
    }
}

impl FromStr for Direction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "up" | "higher" | "call" => Ok(Direction::Up),
            "down" | "lower" | "put" => Ok(Direction::Down),
            _ => Err(anyhow::anyhow!("Unknown direction: {s}")),
        }
    }
}

/// Chart timeframe. Only affects the spacing of chart time labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
}

impl Timeframe {
    pub const ALL: &'static [Timeframe] = &[Timeframe::M1, Timeframe::M5, Timeframe::M15, Timeframe::H1];

    /// Time between two consecutive chart points.
    pub fn step(&self) -> chrono::Duration {
        match self {
            Timeframe::M1 => chrono::Duration::minutes(1),
            Timeframe::M5 => chrono::Duration::minutes(5),
            Timeframe::M15 => chrono::Duration::minutes(15),
            Timeframe::H1 => chrono::Duration::hours(1),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeframe::M1 => write!(f, "1m"),
            Timeframe::M5 => write!(f, "5m"),
            Timeframe::M15 => write!(f, "15m"),
            Timeframe::H1 => write!(f, "1h"),
        }
    }
}

impl FromStr for Timeframe {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1m" => Ok(Timeframe::M1),
            "5m" => Ok(Timeframe::M5),
            "15m" => Ok(Timeframe::M15),
            "1h" | "60m" => Ok(Timeframe::H1),
            _ => Err(anyhow::anyhow!("Unknown timeframe: {s}")),
        }
    }
}

/// Direction of the latest price move, used for chart and quote colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
}

impl Trend {
    /// `Up` only for a strictly positive change.
    pub fn from_change(change: f64) -> Self {
        if change > 0.0 {
            Trend::Up
        } else {
            Trend::Down
        }
    }
}

/// Outcome of a settled trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Win => write!(f, "WIN"),
            Outcome::Loss => write!(f, "LOSS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Trades
// ---------------------------------------------------------------------------

pub type TradeId = Uuid;

/// User input for a new simulated trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRequest {
    pub pair: Pair,
    pub direction: Direction,
    pub amount: Decimal,
    /// Time to expiry in seconds.
    pub duration_secs: u64,
}

/// A placed, not yet settled, simulated trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub pair: Pair,
    pub direction: Direction,
    pub amount: Decimal,
    pub duration_secs: u64,
    pub entry_price: f64,
    pub placed_at: DateTime<Utc>,
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} @ {} ({}s)",
            self.pair,
            self.direction.arrow(),
            self.direction.label(),
            format_currency(self.amount),
            self.entry_price,
            self.duration_secs,
        )
    }
}

impl Trade {
    /// Nominal expiry instant, `None` if it is not representable.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        expiry_after(self.placed_at, self.duration_secs)
    }

    /// Whether the trade's duration has fully elapsed at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| now >= at)
    }
}

/// Instant `duration_secs` after `placed_at`, or `None` when it falls
/// outside chrono's date range.
pub fn expiry_after(placed_at: DateTime<Utc>, duration_secs: u64) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(duration_secs).ok()?;
    placed_at.checked_add_signed(chrono::Duration::try_seconds(secs)?)
}

/// Result of settling a trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub trade: Trade,
    pub exit_price: f64,
    pub outcome: Outcome,
    /// Amount credited back to the balance (zero on a loss).
    pub credited: Decimal,
    /// Signed profit and loss booked to the daily figure.
    pub pnl: Decimal,
    pub settled_at: DateTime<Utc>,
}

impl fmt::Display for Settlement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} -> {} ({})",
            self.trade.pair,
            self.trade.direction.label(),
            format_currency(self.trade.amount),
            self.outcome,
            self.exit_price,
            format_signed_currency(self.pnl),
        )
    }
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// Demo account shown in the balance panel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub balance: Decimal,
    /// Cumulative profit and loss for the current day.
    pub daily_pnl: Decimal,
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "balance={} today={}",
            format_currency(self.balance),
            format_signed_currency(self.daily_pnl),
        )
    }
}

impl Account {
    pub fn new(balance: Decimal, daily_pnl: Decimal) -> Self {
        Self { balance, daily_pnl }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Invalid trade input. Rejection never mutates any state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid trade amount: {0} must be positive")]
    NonPositiveAmount(Decimal),

    #[error("Insufficient balance: need ${needed:.2}, have ${available:.2}")]
    InsufficientBalance { needed: Decimal, available: Decimal },

    #[error("Invalid trade duration: must be at least one second")]
    ZeroDuration,

    #[error("Invalid trade duration: {0}s is too long")]
    DurationTooLong(u64),

    #[error("Unknown pair: {0}")]
    UnknownPair(Pair),
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Format a price with a fixed number of decimals (`1.0842`, `149.82`).
pub fn format_price(price: f64, decimals: usize) -> String {
    format!("{price:.decimals$}")
}

/// US-dollar formatting with thousands separators: `$10,000.00`, `-$85.50`.
pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    let text = format!("{:.2}", rounded.abs());
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{sign}${grouped}.{frac}")
}

/// Currency with an explicit `+` for positive amounts.
pub fn format_signed_currency(amount: Decimal) -> String {
    if amount > Decimal::ZERO {
        format!("+{}", format_currency(amount))
    } else {
        format_currency(amount)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
