//! Game Loop
//!
//! Fixed-cadence driver around [`World`]. The loop never sleeps itself: the
//! caller asks [`GameLoop::time_until_next_tick`] and calls
//! [`GameLoop::run_tick`] when it is due.
//!
//! ## Tick Order
//!
//! 1. Run due scheduled tasks
//! 2. Update entities (behaviour, integration, grid filing)
//! 3. Pairwise interaction pass over the dynamic grid
//! 4. Drop destroyed records
//! 5. Publish the frame
//! 6. Clear the dynamic grid

use std::time::{Duration, Instant};

#[cfg(feature = "debug-tracing")]
use tracing::trace;

use crate::channel::frame::FramePublisher;
use crate::channel::protocol::StatsReport;
use crate::error::SimResult;
use crate::game::world::World;

/// How the runner re-arms after a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickMode {
    /// Yield and poll again immediately
    Turbo,
    /// Sleep in small fixed slices until the next tick is due
    Default,
}

impl TickMode {
    /// Mode for the `turbo` flag.
    pub fn from_turbo(turbo: bool) -> Self {
        if turbo {
            TickMode::Turbo
        } else {
            TickMode::Default
        }
    }
}

/// What a call to [`GameLoop::run_tick`] did.
#[derive(Debug, PartialEq)]
pub enum TickOutcome {
    /// Called before the minimum tick delta elapsed
    NotDue,
    /// Tick consumed while paused; the world did not advance
    Paused,
    /// A tick ran
    Ran {
        /// Index of the tick that ran
        tick: u64,
        /// Whether a frame reached the shared buffer
        published: bool,
        /// Report, when the stats window closed on this tick
        stats: Option<StatsReport>,
    },
}

#[derive(Debug, Default)]
struct StatsWindow {
    started_ms: Option<u64>,
    ticks: u32,
    busy: Duration,
}

/// Fixed-tick scheduler.
#[derive(Debug)]
pub struct GameLoop {
    min_tick_delta: f64,
    mode: TickMode,
    last_tick: Option<u64>,
    paused: bool,
    speed: f32,
    uptime_ms: f64,
    window: StatsWindow,
    window_ms: u64,
}

impl GameLoop {
    /// Loop running at `tps` ticks per second (0 = uncapped).
    pub fn new(tps: u32, mode: TickMode, window_ms: u64) -> Self {
        Self {
            min_tick_delta: if tps == 0 { 0.0 } else { 1000.0 / f64::from(tps) },
            mode,
            last_tick: None,
            paused: false,
            speed: 1.0,
            uptime_ms: 0.0,
            window: StatsWindow::default(),
            window_ms,
        }
    }

    /// Minimum milliseconds between two ticks.
    #[inline]
    pub fn min_tick_delta(&self) -> f64 {
        self.min_tick_delta
    }

    /// Re-arm strategy.
    #[inline]
    pub fn mode(&self) -> TickMode {
        self.mode
    }

    /// True while paused.
    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Pause or resume from the next tick on.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Current speed multiplier.
    #[inline]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Scale simulated time. Negative and non-finite factors are ignored.
    pub fn set_speed(&mut self, speed: f32) -> bool {
        if !speed.is_finite() || speed < 0.0 {
            return false;
        }
        self.speed = speed;
        true
    }

    /// Simulated milliseconds so far (speed-scaled, pauses excluded).
    pub fn uptime_ms(&self) -> f64 {
        self.uptime_ms
    }

    /// Time left until a tick is due at `now_ms`.
    pub fn time_until_next_tick(&self, now_ms: u64) -> Duration {
        let Some(last) = self.last_tick else {
            return Duration::ZERO;
        };
        let elapsed = now_ms.saturating_sub(last) as f64;
        let remaining = (self.min_tick_delta - elapsed).max(0.0);
        Duration::from_micros((remaining * 1000.0).round() as u64)
    }

    /// Run one tick at `now_ms` if it is due.
    ///
    /// The step handed to entities is the speed-scaled elapsed time divided
    /// by ten. Configuration errors raised by behaviour or collision
    /// abort the tick.
    pub fn run_tick(
        &mut self,
        world: &mut World,
        publisher: Option<&mut FramePublisher>,
        now_ms: u64,
    ) -> SimResult<TickOutcome> {
        let elapsed = match self.last_tick {
            Some(last) => now_ms.saturating_sub(last) as f64,
            None => self.min_tick_delta,
        };
        if elapsed < self.min_tick_delta {
            return Ok(TickOutcome::NotDue);
        }
        self.last_tick = Some(now_ms);
        if self.paused {
            return Ok(TickOutcome::Paused);
        }

        let started = Instant::now();
        let delta = elapsed * f64::from(self.speed);
        self.uptime_ms += delta;

        world.set_speed(self.speed);
        world.advance_clock(now_ms);
        world.run_due_tasks();
        if let Some(span) = world.update_entities((delta / 10.0) as f32)? {
            world.resolve_pairs(span)?;
        }
        world.flush_removals();

        let published = match publisher {
            Some(publisher) => publisher.publish(world, self.mode == TickMode::Turbo)?,
            None => false,
        };

        let tick = world.tick();
        world.end_tick();

        #[cfg(feature = "debug-tracing")]
        trace!(tick, entities = world.len(), published, "tick");

        let stats = self.record(world, now_ms, started.elapsed());
        Ok(TickOutcome::Ran { tick, published, stats })
    }

    fn record(&mut self, world: &World, now_ms: u64, busy: Duration) -> Option<StatsReport> {
        let started = *self.window.started_ms.get_or_insert(now_ms);
        self.window.ticks += 1;
        self.window.busy += busy;

        let span = now_ms.saturating_sub(started);
        if span < self.window_ms || span == 0 {
            return None;
        }

        let ticks = self.window.ticks;
        let census = world.census();
        let report = StatsReport {
            tps: (f64::from(ticks) / span as f64 * 1000.0).ceil() as u32,
            mspt: self.window.busy.as_secs_f64() * 1000.0 / f64::from(ticks),
            carnivores: census.carnivores,
            herbivores: census.herbivores,
            plants: census.plants,
            uptime_ms: self.uptime_ms as u64,
            tick: world.tick(),
        };

        self.window = StatsWindow {
            started_ms: Some(now_ms),
            ..StatsWindow::default()
        };
        world.log_population();
        Some(report)
    }
}
