//! Ecosim
//!
//! Runs the simulation worker and plays the presentation side: polls a
//! frame at display rate and logs what it sees.
//!
//! Usage: `ecosim [config.json]`

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ecosim::{config::SimConfig, SimulationHandle, VERSION};

/// Presentation poll interval (~60 Hz).
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Reports frame truncation when it starts and when it stops.
#[derive(Debug, Default)]
struct TruncationLog {
    active: bool,
    frames: u64,
}

impl TruncationLog {
    fn observe(&mut self, truncated: bool, records: u32) -> bool {
        let changed = truncated != self.active;
        match (self.active, truncated) {
            (false, true) => {
                warn!(records, "frames truncated");
                self.frames = 1;
            }
            (true, true) => self.frames += 1,
            (true, false) => info!(frames = self.frames, "frames complete again"),
            (false, false) => {}
        }
        self.active = truncated;
        changed
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("Ecosim v{}", VERSION);

    let config = match std::env::args().nth(1) {
        Some(path) => SimConfig::load(&path)
            .with_context(|| format!("failed to load configuration from {path}"))?,
        None => SimConfig::default(),
    };
    let run_for = config.run_seconds.map(Duration::from_secs);
    info!(
        tps = config.tps,
        turbo = config.turbo,
        plants = config.population.plant,
        herbivores = config.population.herbivore,
        carnivores = config.population.carnivore,
        "configuration"
    );

    let handle = SimulationHandle::spawn(config).context("failed to start simulation")?;
    info!(seed = handle.seed(), "simulation started");

    let consumer = handle.consumer();
    let mut frames = tokio::time::interval(FRAME_INTERVAL);
    let mut report = tokio::time::interval(Duration::from_secs(1));
    let stop = async {
        match run_for {
            Some(limit) => tokio::time::sleep(limit).await,
            None => {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "ctrl-c handler unavailable");
                    std::future::pending::<()>().await;
                }
            }
        }
    };
    tokio::pin!(stop);

    let mut polled = 0u64;
    let mut skipped = 0u64;
    let mut last_count = 0u32;
    let mut last_tick = 0u32;
    let mut truncation = TruncationLog::default();

    loop {
        tokio::select! {
            _ = &mut stop => {
                info!("stopping");
                break;
            }
            _ = frames.tick() => {
                match consumer.poll() {
                    Ok(Some(snapshot)) => {
                        polled += 1;
                        last_count = snapshot.header.count;
                        last_tick = snapshot.header.tick;
                        truncation.observe(snapshot.header.truncated, last_count);
                    }
                    Ok(None) => skipped += 1,
                    Err(e) => warn!(error = %e, "malformed frame"),
                }
                if handle.is_finished() {
                    warn!("simulation worker exited");
                    break;
                }
            }
            _ = report.tick() => {
                info!(tick = last_tick, entities = last_count, polled, skipped, "frames");
                if let Some(stats) = handle.stats() {
                    info!(
                        stats = %serde_json::to_string(&stats).unwrap_or_default(),
                        "stats"
                    );
                }
            }
        }
    }

    let hash = tokio::task::spawn_blocking(move || handle.shutdown())
        .await
        .context("shutdown task panicked")?
        .context("simulation failed")?;
    info!("Final State Hash: {}", hex::encode(hash));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncation_logged_on_change_only() {
        let mut log = TruncationLog::default();
        assert!(!log.observe(false, 10));
        assert!(log.observe(true, 10));
        assert!(!log.observe(true, 10));
        assert!(!log.observe(true, 10));
        assert_eq!(log.frames, 3);
        assert!(log.observe(false, 8));
        assert!(!log.observe(false, 8));
    }
}
