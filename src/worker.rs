//! Simulation Worker
//!
//! Runs the world on its own OS thread. The presentation side keeps a
//! [`SimulationHandle`]: commands go in over an unbounded channel, frames
//! come out through the shared buffer and stats through a watch channel.
//!
//! ```text
//!  presentation                          worker thread
//! ┌──────────────┐   Command (mpsc)    ┌──────────────────────┐
//! │ handle.send  │ ──────────────────▶ │ drain, apply         │
//! │              │                     │ game_loop.run_tick   │
//! │ consumer.poll│ ◀── SharedBuffer ── │   publish frame      │
//! │ stats        │ ◀── watch ───────── │   stats per window   │
//! └──────────────┘                     └──────────────────────┘
//! ```

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::channel::frame::{buffer_size_for, FrameConsumer, FramePublisher};
use crate::channel::protocol::{Command, StatsReport};
use crate::channel::shared::SharedBuffer;
use crate::config::SimConfig;
use crate::core::hash::StateHash;
use crate::core::vec2::Vec2;
use crate::error::{SimError, SimResult};
use crate::game::game_loop::{GameLoop, TickMode, TickOutcome};
use crate::game::world::World;

/// Extra frame records beyond twice the configured population.
const RECORD_HEADROOM: usize = 256;

/// Longest sleep between two polls in default mode.
const SLEEP_SLICE: Duration = Duration::from_millis(1);

/// Controls a running simulation worker.
#[derive(Debug)]
pub struct SimulationHandle {
    commands: UnboundedSender<Command>,
    stats: watch::Receiver<Option<StatsReport>>,
    buffer: SharedBuffer,
    seed: u32,
    thread: Option<JoinHandle<SimResult<StateHash>>>,
}

impl SimulationHandle {
    /// Start a worker for `config` and initialise it.
    pub fn spawn(config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        let seed = config.resolve_seed();
        let counts = config.population;

        let scale = config.map.scale;
        let expected = (counts.plant as f32 * scale * scale).ceil() as usize
            + counts.herbivore as usize
            + counts.carnivore as usize;
        let buffer = SharedBuffer::new(buffer_size_for(expected * 2 + RECORD_HEADROOM));

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (stats_tx, stats_rx) = watch::channel(None);

        let thread = thread::Builder::new()
            .name("ecosim-worker".into())
            .spawn(move || run_worker(config, seed, command_rx, stats_tx))?;

        let handle = Self {
            commands: command_tx,
            stats: stats_rx,
            buffer: buffer.clone(),
            seed,
            thread: Some(thread),
        };
        handle.send(Command::Init { buffer, counts })?;
        Ok(handle)
    }

    /// Queue a command for the next loop iteration.
    pub fn send(&self, command: Command) -> SimResult<()> {
        self.commands
            .send(command)
            .map_err(|_| SimError::WorkerDisconnected)
    }

    /// Seed the world was built from.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Reader for published frames.
    pub fn consumer(&self) -> FrameConsumer {
        FrameConsumer::new(self.buffer.clone())
    }

    /// Latest stats report, if a window has closed yet.
    pub fn stats(&self) -> Option<StatsReport> {
        self.stats.borrow().clone()
    }

    /// Watch receiver for stats reports.
    pub fn subscribe_stats(&self) -> watch::Receiver<Option<StatsReport>> {
        self.stats.clone()
    }

    /// True once the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop the worker and wait for it. Returns the final world hash.
    pub fn shutdown(mut self) -> SimResult<StateHash> {
        self.stop()
    }

    fn stop(&mut self) -> SimResult<StateHash> {
        let Some(thread) = self.thread.take() else {
            return Err(SimError::WorkerDisconnected);
        };
        // The worker may already have exited on error
        let _ = self.commands.send(Command::Shutdown);
        thread.join().map_err(|_| SimError::WorkerDisconnected)?
    }
}

impl Drop for SimulationHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            if let Err(e) = self.stop() {
                debug!(error = %e, "worker stopped with error");
            }
        }
    }
}

enum Flow {
    Continue,
    Stop,
}

/// Worker thread body.
fn run_worker(
    config: SimConfig,
    seed: u32,
    mut commands: UnboundedReceiver<Command>,
    stats: watch::Sender<Option<StatsReport>>,
) -> SimResult<StateHash> {
    info!(seed, tps = config.tps, turbo = config.turbo, "simulation worker started");

    let (buffer, counts) = loop {
        match commands.blocking_recv() {
            Some(Command::Init { buffer, counts }) => break (buffer, counts),
            Some(Command::Shutdown) | None => {
                info!("simulation worker stopped before init");
                return Err(SimError::NotInitialized);
            }
            Some(other) => warn!(command = ?other, "command before init ignored"),
        }
    };

    let mut world = World::new(&config, seed)?;
    world.populate(&counts);

    let mut publisher = FramePublisher::new(
        buffer,
        Duration::from_millis(config.publish_timeout_ms),
    );
    let mut game = GameLoop::new(
        config.tps,
        TickMode::from_turbo(config.turbo),
        config.stats_window_ms,
    );
    let start = Instant::now();

    'run: loop {
        loop {
            match commands.try_recv() {
                Ok(command) => {
                    if let Flow::Stop = apply_command(&mut world, &mut game, command) {
                        break 'run;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    info!("command channel closed");
                    break 'run;
                }
            }
        }

        let now = start.elapsed().as_millis() as u64;
        match game.run_tick(&mut world, Some(&mut publisher), now) {
            Ok(TickOutcome::Ran { stats: Some(report), .. }) => {
                info!(
                    tps = report.tps,
                    mspt = format_args!("{:.2}", report.mspt),
                    plants = report.plants,
                    herbivores = report.herbivores,
                    carnivores = report.carnivores,
                    "tick stats"
                );
                stats.send_replace(Some(report));
            }
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, tick = world.tick(), "simulation aborted");
                return Err(e);
            }
        }

        match game.mode() {
            TickMode::Turbo => thread::yield_now(),
            TickMode::Default => {
                let now = start.elapsed().as_millis() as u64;
                let wait = game.time_until_next_tick(now).min(SLEEP_SLICE);
                if !wait.is_zero() {
                    thread::sleep(wait);
                }
            }
        }
    }

    let hash = world.compute_hash();
    info!(tick = world.tick(), entities = world.len(), "simulation worker stopped");
    Ok(hash)
}

fn apply_command(world: &mut World, game: &mut GameLoop, command: Command) -> Flow {
    match command {
        Command::Init { .. } => warn!("simulation already initialised"),
        Command::Pause(paused) => {
            info!(paused, "pause");
            game.set_paused(paused);
        }
        Command::Speed(speed) => {
            if game.set_speed(speed) {
                info!(speed, "speed");
            } else {
                warn!(speed, "invalid speed ignored");
            }
        }
        Command::Move { id, x, y } => {
            if !world.move_entity(id, Vec2::new(x, y)) {
                debug!(id, "move of unknown entity ignored");
            }
        }
        Command::Destroy(id) => {
            if !world.destroy(id) {
                debug!(id, "destroy of unknown entity ignored");
            }
        }
        Command::Shutdown => return Flow::Stop,
    }
    Flow::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PopulationConfig;

    fn small_config() -> SimConfig {
        SimConfig {
            seed: Some(7),
            tps: 0,
            turbo: true,
            population: PopulationConfig {
                plant: 40,
                herbivore: 4,
                carnivore: 2,
            },
            ..SimConfig::default()
        }
    }

    #[test]
    fn test_worker_publishes_frames() {
        let handle = SimulationHandle::spawn(small_config()).unwrap();
        assert_eq!(handle.seed(), 7);
        let consumer = handle.consumer();

        let deadline = Instant::now() + Duration::from_secs(10);
        let mut seen = None;
        while Instant::now() < deadline {
            if let Some(snapshot) = consumer.poll().unwrap() {
                if snapshot.header.count > 0 {
                    seen = Some(snapshot);
                    break;
                }
            }
            thread::sleep(Duration::from_millis(1));
        }

        let snapshot = seen.expect("no frame published");
        assert!(snapshot.header.turbo);
        assert_eq!(snapshot.records.len(), snapshot.header.count as usize);
        handle.shutdown().unwrap();
    }

    #[test]
    fn test_commands_after_shutdown_fail() {
        let handle = SimulationHandle::spawn(small_config()).unwrap();
        handle.send(Command::Pause(true)).unwrap();
        handle.send(Command::Speed(2.0)).unwrap();
        handle.send(Command::Destroy(9_999)).unwrap();
        handle.send(Command::Shutdown).unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(handle.is_finished());
        assert!(matches!(
            handle.send(Command::Pause(false)),
            Err(SimError::WorkerDisconnected)
        ));
        assert!(handle.shutdown().is_ok());
    }

    #[test]
    fn test_shutdown_before_init() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (stats_tx, _stats_rx) = watch::channel(None);
        tx.send(Command::Pause(true)).unwrap();
        tx.send(Command::Shutdown).unwrap();
        assert!(matches!(
            run_worker(small_config(), 1, rx, stats_tx),
            Err(SimError::NotInitialized)
        ));
    }

    #[test]
    fn test_apply_move_and_destroy() {
        let config = small_config();
        let mut world = World::new(&config, 3).unwrap();
        let mut game = GameLoop::new(0, TickMode::Turbo, 1000);
        let id = world.spawn(crate::game::species::Species::Herbivore, Vec2::new(2000.0, 2000.0));

        apply_command(&mut world, &mut game, Command::Move { id, x: 1000.0, y: 900.0 });
        assert_eq!(world.get(id).unwrap().body.position, Vec2::new(1000.0, 900.0));

        apply_command(&mut world, &mut game, Command::Destroy(id));
        assert!(!world.is_live(id));

        assert!(matches!(
            apply_command(&mut world, &mut game, Command::Shutdown),
            Flow::Stop
        ));
    }
}
