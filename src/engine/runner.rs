//! Real-time driver for a shared `Simulation`.
//!
//! Wakes on a tokio interval, moves the simulation clock to `Utc::now()`
//! and logs what settled. `RunnerHandle::stop` tears the loop down; once
//! it returns nothing mutates the simulation in the background any more.

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::scheduler::Simulation;

pub type SharedSimulation = Arc<RwLock<Simulation>>;

pub fn shared(sim: Simulation) -> SharedSimulation {
    Arc::new(RwLock::new(sim))
}

/// Handle to a spawned runner loop.
pub struct RunnerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RunnerHandle {
    /// Stop the loop and wait for it to exit.
    pub async fn stop(self) -> Result<()> {
        // The receiver may already be gone if the task ended on its own.
        let _ = self.shutdown.send(true);
        self.task.await.context("Runner task panicked")?;
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawn the loop. `resolution` is how often the wall clock is sampled;
/// the simulation's own timers decide what actually fires.
pub fn spawn(sim: SharedSimulation, resolution: Duration) -> RunnerHandle {
    let (shutdown, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(resolution);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let resolution_ms = u64::try_from(resolution.as_millis()).unwrap_or(u64::MAX);
        info!(resolution_ms, "Simulation runner started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let report = sim.write().await.advance_to(Utc::now());
                    if !report.ticks.is_empty() {
                        debug!(
                            ticks = report.ticks.len(),
                            overview_updates = report.overview_updates,
                            "Simulation advanced"
                        );
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Simulation runner stopped");
    });

    RunnerHandle { shutdown, task }
}
