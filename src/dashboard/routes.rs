//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.
//! Mutating handlers first bring the simulation clock up to the wall
//! clock so a trade is stamped and priced at the moment it is placed.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::engine::runner::SharedSimulation;
use crate::market::overview::OverviewQuote;
use crate::market::ChartSnapshot;
use crate::types::{
    format_currency, format_signed_currency, Direction, Outcome, Pair, Timeframe, Trade, TradeId,
    TradeRequest, ValidationError,
};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub name: String,
    pub sim: SharedSimulation,
    pub started: DateTime<Utc>,
}

impl DashboardState {
    pub fn new(name: impl Into<String>, sim: SharedSimulation) -> Self {
        Self {
            name: name.into(),
            sim,
            started: Utc::now(),
        }
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct AccountResponse {
    pub name: String,
    pub balance: Decimal,
    pub balance_display: String,
    pub daily_pnl: Decimal,
    pub daily_pnl_display: String,
    pub open_positions: usize,
    pub trades_placed: u64,
    pub trades_won: u64,
    pub trades_lost: u64,
    pub win_rate: f64,
    pub uptime_secs: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeLogEntry {
    pub trade_id: TradeId,
    pub pair: Pair,
    pub direction: Direction,
    pub label: String,
    pub amount: Decimal,
    pub amount_display: String,
    pub outcome: Outcome,
    pub pnl: Decimal,
    pub pnl_display: String,
    pub entry_price: f64,
    pub exit_price: f64,
    pub settled_at: String,
}

/// Trade-panel form. Missing fields fall back to the panel defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceTradeBody {
    pub pair: Option<Pair>,
    pub direction: Direction,
    #[serde(default = "default_amount")]
    pub amount: Decimal,
    #[serde(default = "default_duration")]
    pub duration: u64,
}

fn default_amount() -> Decimal {
    dec!(10)
}

fn default_duration() -> u64 {
    300
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaceTradeResponse {
    pub trade_id: TradeId,
    pub message: String,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePairBody {
    pub pair: Pair,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeTimeframeBody {
    pub timeframe: Timeframe,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Validation failures map to 422 with a user-facing message.
#[derive(Debug)]
pub struct ApiError(pub ValidationError);

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/account
pub async fn get_account(State(state): State<AppState>) -> Json<AccountResponse> {
    let sim = state.sim.read().await;
    let account = sim.account();
    let stats = sim.stats();

    Json(AccountResponse {
        name: state.name.clone(),
        balance: account.balance,
        balance_display: format_currency(account.balance),
        daily_pnl: account.daily_pnl,
        daily_pnl_display: format_signed_currency(account.daily_pnl),
        open_positions: sim.pending_trades().len(),
        trades_placed: stats.placed,
        trades_won: stats.won,
        trades_lost: stats.lost,
        win_rate: stats.win_rate(),
        uptime_secs: (Utc::now() - state.started).num_seconds(),
    })
}

/// GET /api/chart
pub async fn get_chart(State(state): State<AppState>) -> Json<ChartSnapshot> {
    Json(state.sim.read().await.chart())
}

/// GET /api/overview
pub async fn get_overview(State(state): State<AppState>) -> Json<Vec<OverviewQuote>> {
    Json(state.sim.read().await.overview())
}

/// GET /api/trades
pub async fn get_open_trades(State(state): State<AppState>) -> Json<Vec<Trade>> {
    Json(state.sim.read().await.pending_trades().to_vec())
}

/// GET /api/trades/history
pub async fn get_trade_history(State(state): State<AppState>) -> Json<Vec<TradeLogEntry>> {
    let sim = state.sim.read().await;
    let entries = sim
        .recent_settlements()
        .into_iter()
        .map(|s| TradeLogEntry {
            trade_id: s.trade.id,
            label: format!("{} {}", s.trade.direction.arrow(), s.trade.direction.label()),
            amount_display: format_currency(s.trade.amount),
            pnl_display: format_signed_currency(s.pnl),
            pair: s.trade.pair,
            direction: s.trade.direction,
            amount: s.trade.amount,
            outcome: s.outcome,
            pnl: s.pnl,
            entry_price: s.trade.entry_price,
            exit_price: s.exit_price,
            settled_at: s.settled_at.to_rfc3339(),
        })
        .collect();
    Json(entries)
}

/// POST /api/trades
pub async fn place_trade(
    State(state): State<AppState>,
    Json(body): Json<PlaceTradeBody>,
) -> Result<(StatusCode, Json<PlaceTradeResponse>), ApiError> {
    let mut sim = state.sim.write().await;
    sim.advance_to(Utc::now());

    let pair = body.pair.unwrap_or_else(|| sim.market().active_pair().clone());
    let message = format!(
        "Trade placed: {} {} {}",
        pair,
        body.direction,
        format_currency(body.amount)
    );
    let trade_id = sim.place_trade(TradeRequest {
        pair,
        direction: body.direction,
        amount: body.amount,
        duration_secs: body.duration,
    })?;

    Ok((
        StatusCode::CREATED,
        Json(PlaceTradeResponse {
            trade_id,
            message,
            balance: sim.account().balance,
        }),
    ))
}

/// POST /api/pair
pub async fn change_pair(
    State(state): State<AppState>,
    Json(body): Json<ChangePairBody>,
) -> Result<Json<ChartSnapshot>, ApiError> {
    let mut sim = state.sim.write().await;
    sim.advance_to(Utc::now());
    sim.change_pair(body.pair)?;
    Ok(Json(sim.chart()))
}

/// POST /api/timeframe
pub async fn change_timeframe(
    State(state): State<AppState>,
    Json(body): Json<ChangeTimeframeBody>,
) -> Json<ChartSnapshot> {
    let mut sim = state.sim.write().await;
    sim.advance_to(Utc::now());
    sim.set_timeframe(body.timeframe);
    info!(timeframe = %body.timeframe, "Timeframe changed via dashboard");
    Json(sim.chart())
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
