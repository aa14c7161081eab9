//! TRADESIM: simulated market and binary-option trade tracker
//!
//! Entry point. Loads configuration, initialises structured logging,
//! builds the simulation, starts the real-time runner and the dashboard,
//! and tears both down on Ctrl+C.

use anyhow::Result;
use chrono::Utc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use tradesim::config::AppConfig;
use tradesim::dashboard;
use tradesim::dashboard::routes::DashboardState;
use tradesim::engine::runner;
use tradesim::engine::tracker::TrackerEvent;
use tradesim::engine::Simulation;
use tradesim::market::random::StdRandom;

const BANNER: &str = r#"
 _____ ____      _    ____  _____ ____ ___ __  __
|_   _|  _ \    / \  |  _ \| ____/ ___|_ _|  \/  |
  | | | |_) |  / _ \ | | | |  _| \___ \| || |\/| |
  | | |  _ <  / ___ \| |_| | |___ ___) | || |  | |
  |_| |_| \_\/_/   \_\____/|_____|____/___|_|  |_|

  Simulated market & trade tracker
  v0.1.0
"#;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let config_path =
        std::env::var("TRADESIM_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let cfg = if std::path::Path::new(&config_path).exists() {
        AppConfig::load(&config_path)?
    } else {
        warn!(path = %config_path, "Config file not found, using built-in defaults");
        AppConfig::default()
    };

    println!("{BANNER}");
    info!(
        name = %cfg.simulation.name,
        tick_interval_ms = cfg.simulation.tick_interval_ms,
        initial_balance = %cfg.simulation.initial_balance,
        pairs = cfg.pairs.len(),
        "TRADESIM starting up"
    );

    // -- Build the simulation --------------------------------------------

    let rng = StdRandom::from_seed(cfg.simulation.seed);
    let sim = runner::shared(Simulation::new(&cfg, Box::new(rng), Utc::now())?);
    let mut events = sim.read().await.subscribe();

    // Sample the wall clock a few times per tick.
    let resolution = Duration::from_millis((cfg.simulation.tick_interval_ms / 4).max(10));
    let runner = runner::spawn(sim.clone(), resolution);

    let dashboard_task = if cfg.dashboard.enabled {
        let state = std::sync::Arc::new(DashboardState::new(cfg.simulation.name.clone(), sim.clone()));
        Some(dashboard::spawn_dashboard(state, cfg.dashboard.port).await?)
    } else {
        None
    };

    // -- Main loop -------------------------------------------------------

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("Entering main loop. Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event log fell behind");
                }
                Err(RecvError::Closed) => break,
            },
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    // Stop all timers before reporting so the account no longer moves.
    runner.stop().await?;
    if let Some(task) = dashboard_task {
        task.abort();
    }

    let sim = sim.read().await;
    let account = sim.account();
    let stats = sim.stats();
    info!(
        balance = %account.balance,
        daily_pnl = %account.daily_pnl,
        open = sim.pending_trades().len(),
        placed = stats.placed,
        won = stats.won,
        lost = stats.lost,
        "TRADESIM shut down cleanly."
    );

    Ok(())
}

/// Human-readable line per tracker event, for `RUST_LOG=tradesim=debug`.
fn log_event(event: &TrackerEvent) {
    match event {
        TrackerEvent::TradePlaced { trade, account } => {
            debug!(trade = %trade, account = %account, "Placed");
        }
        TrackerEvent::TradeSettled { settlement, account } => {
            debug!(settlement = %settlement, account = %account, "Settled");
        }
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tradesim=info"));

    let json_logging = std::env::var("TRADESIM_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
