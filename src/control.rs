//! Control surface for running the simulation on its own thread
//!
//! The loop thread owns the [`Intersection`] outright while it runs. The
//! handle only ever talks to it through a command channel and a cooperative
//! stop flag, and reads the immutable snapshot the loop publishes after each
//! tick. Stopping hands the intersection back through the thread's join
//! handle, which is what lets `reset` touch state only once the loop is gone.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};
use thiserror::Error;

use crate::simulation::{
    validate_speed_multiplier, ConfigurationError, Intersection, IntersectionSnapshot,
};

/// A reset arrived while the loop had not yet acknowledged a stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot reset while the simulation loop is still running")]
pub struct ConcurrentResetError;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    ConcurrentReset(#[from] ConcurrentResetError),

    #[error("the simulation loop thread panicked")]
    LoopPanicked,

    #[error("failed to start the simulation thread")]
    Spawn(#[source] std::io::Error),
}

/// Configuration changes forwarded to a running loop
#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    SetSpeedMultiplier(f32),
    SetNightMode(bool),
}

struct RunningLoop {
    stop: Arc<AtomicBool>,
    commands: Sender<Command>,
    thread: JoinHandle<Option<Intersection>>,
}

enum LoopState {
    Idle(Box<Intersection>),
    Running(RunningLoop),
    Poisoned,
}

type SharedSnapshot = Arc<RwLock<Arc<IntersectionSnapshot>>>;

/// Start/stop/reset control over a simulation running on a background thread
pub struct SimulationHandle {
    state: LoopState,
    snapshot: SharedSnapshot,
    /// Wall-clock delay between ticks
    pacing: Duration,
    stack_size: Option<usize>,
    speed_multiplier: f32,
    night_mode: bool,
}

impl SimulationHandle {
    /// Wrap an intersection; ticks are paced at its logical tick interval
    pub fn new(intersection: Intersection) -> Self {
        let snapshot = Arc::new(RwLock::new(Arc::new(intersection.snapshot())));
        let config = intersection.config();
        Self {
            pacing: config.tick_interval,
            stack_size: None,
            speed_multiplier: config.speed_multiplier,
            night_mode: config.night_mode,
            state: LoopState::Idle(Box::new(intersection)),
            snapshot,
        }
    }

    /// Change the wall-clock delay between ticks. Logical time per tick is
    /// unaffected.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Request a stack size for the loop thread instead of the platform default
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Start the loop. Starting a running loop does nothing; starting one that
    /// is still winding down waits for it first. If the thread cannot be
    /// started the handle stays idle and keeps its intersection.
    pub fn start(&mut self) -> Result<(), ControlError> {
        if let LoopState::Running(running) = &self.state {
            if !running.stop.load(Ordering::Acquire) {
                return Ok(());
            }
            self.join()?;
        }

        let intersection = match std::mem::replace(&mut self.state, LoopState::Poisoned) {
            LoopState::Idle(intersection) => intersection,
            LoopState::Poisoned => return Err(ControlError::LoopPanicked),
            LoopState::Running(running) => {
                self.state = LoopState::Running(running);
                return Ok(());
            }
        };

        let stop = Arc::new(AtomicBool::new(false));
        let (commands, inbox) = mpsc::channel();
        // The thread only receives the intersection once it is known to exist.
        let (handoff, pickup) = mpsc::channel::<Box<Intersection>>();
        let snapshot = Arc::clone(&self.snapshot);
        let pacing = self.pacing;
        let loop_stop = Arc::clone(&stop);

        let mut builder = thread::Builder::new().name("intersection-sim".to_string());
        if let Some(bytes) = self.stack_size {
            builder = builder.stack_size(bytes);
        }
        let spawned = builder.spawn(move || {
            let intersection = pickup.recv().ok()?;
            Some(run_loop(*intersection, loop_stop, inbox, snapshot, pacing))
        });

        let thread = match spawned {
            Ok(thread) => thread,
            Err(err) => {
                warn!("could not start simulation thread: {}", err);
                self.state = LoopState::Idle(intersection);
                return Err(ControlError::Spawn(err));
            }
        };

        if let Err(mpsc::SendError(intersection)) = handoff.send(intersection) {
            // The thread died before picking the intersection up.
            self.state = LoopState::Idle(intersection);
            return Err(ControlError::LoopPanicked);
        }

        info!("simulation started");
        self.state = LoopState::Running(RunningLoop {
            stop,
            commands,
            thread,
        });
        Ok(())
    }

    /// Ask the loop to stop after its current tick. Does not wait.
    pub fn stop(&mut self) {
        if let LoopState::Running(running) = &self.state {
            running.stop.store(true, Ordering::Release);
            debug!("stop requested");
        }
    }

    /// Stop the loop and wait until it has handed the intersection back
    pub fn join(&mut self) -> Result<(), ControlError> {
        let running = match std::mem::replace(&mut self.state, LoopState::Poisoned) {
            LoopState::Running(running) => running,
            LoopState::Idle(intersection) => {
                self.state = LoopState::Idle(intersection);
                return Ok(());
            }
            LoopState::Poisoned => return Err(ControlError::LoopPanicked),
        };

        running.stop.store(true, Ordering::Release);
        let mut intersection = running
            .thread
            .join()
            .map_err(|_| ControlError::LoopPanicked)?
            .ok_or(ControlError::LoopPanicked)?;

        // Commands sent after the loop's last drain are re-applied here.
        if let Err(err) = intersection.set_speed_multiplier(self.speed_multiplier) {
            warn!("could not re-apply speed multiplier: {}", err);
        }
        intersection.set_night_mode(self.night_mode);
        publish(&self.snapshot, &intersection);

        info!("simulation stopped at tick {}", intersection.ticks());
        self.state = LoopState::Idle(Box::new(intersection));
        Ok(())
    }

    /// Stop synchronously, clear every vehicle and restart the signal cycle
    pub fn reset(&mut self) -> Result<(), ControlError> {
        self.join()?;
        self.reset_idle()
    }

    /// Reset without waiting. Fails with [`ConcurrentResetError`] unless the
    /// loop has already acknowledged a stop.
    pub fn try_reset(&mut self) -> Result<(), ControlError> {
        if let LoopState::Running(running) = &self.state {
            if !running.stop.load(Ordering::Acquire) || !running.thread.is_finished() {
                warn!("reset rejected: simulation loop still running");
                return Err(ConcurrentResetError.into());
            }
            self.join()?;
        }
        self.reset_idle()
    }

    fn reset_idle(&mut self) -> Result<(), ControlError> {
        match &mut self.state {
            LoopState::Idle(intersection) => {
                intersection.reset();
                publish(&self.snapshot, intersection);
                Ok(())
            }
            LoopState::Poisoned => Err(ControlError::LoopPanicked),
            LoopState::Running(_) => Err(ConcurrentResetError.into()),
        }
    }

    /// Validate and apply a new speed multiplier
    pub fn set_speed_multiplier(&mut self, value: f32) -> Result<(), ControlError> {
        let value = validate_speed_multiplier(value)?;
        self.speed_multiplier = value;
        self.send(Command::SetSpeedMultiplier(value))
    }

    pub fn set_night_mode(&mut self, enabled: bool) -> Result<(), ControlError> {
        self.night_mode = enabled;
        self.send(Command::SetNightMode(enabled))
    }

    fn send(&mut self, command: Command) -> Result<(), ControlError> {
        match &mut self.state {
            LoopState::Running(running) => {
                // A closed channel means the loop is exiting; `join` re-applies.
                if running.commands.send(command).is_err() {
                    debug!("loop gone, {:?} deferred until join", command);
                }
                Ok(())
            }
            LoopState::Idle(intersection) => {
                apply(intersection, command)?;
                publish(&self.snapshot, intersection);
                Ok(())
            }
            LoopState::Poisoned => Err(ControlError::LoopPanicked),
        }
    }

    /// The most recently published snapshot
    pub fn snapshot(&self) -> Arc<IntersectionSnapshot> {
        let guard = self
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// True while the loop runs and no stop has been requested
    pub fn is_running(&self) -> bool {
        match &self.state {
            LoopState::Running(running) => !running.stop.load(Ordering::Acquire),
            _ => false,
        }
    }

    /// Borrow the intersection while the loop is not running
    pub fn intersection(&self) -> Option<&Intersection> {
        match &self.state {
            LoopState::Idle(intersection) => Some(intersection.as_ref()),
            _ => None,
        }
    }

    /// Mutably borrow the intersection while the loop is not running
    pub fn intersection_mut(&mut self) -> Option<&mut Intersection> {
        match &mut self.state {
            LoopState::Idle(intersection) => Some(intersection.as_mut()),
            _ => None,
        }
    }

    /// Stop the loop and take the intersection back
    pub fn into_intersection(mut self) -> Result<Intersection, ControlError> {
        self.join()?;
        match std::mem::replace(&mut self.state, LoopState::Poisoned) {
            LoopState::Idle(intersection) => Ok(*intersection),
            _ => Err(ControlError::LoopPanicked),
        }
    }
}

impl Drop for SimulationHandle {
    fn drop(&mut self) {
        if !matches!(self.state, LoopState::Running(_)) {
            return;
        }
        if let Err(err) = self.join() {
            warn!("simulation loop did not shut down cleanly: {}", err);
        }
    }
}

fn run_loop(
    mut intersection: Intersection,
    stop: Arc<AtomicBool>,
    inbox: Receiver<Command>,
    snapshot: SharedSnapshot,
    pacing: Duration,
) -> Intersection {
    debug!("simulation loop running from tick {}", intersection.ticks());

    while !stop.load(Ordering::Acquire) {
        for command in inbox.try_iter() {
            if let Err(err) = apply(&mut intersection, command) {
                warn!("ignoring {:?}: {}", command, err);
            }
        }

        intersection.tick();
        publish(&snapshot, &intersection);

        if !pacing.is_zero() {
            thread::sleep(pacing);
        }
    }

    for command in inbox.try_iter() {
        if let Err(err) = apply(&mut intersection, command) {
            warn!("ignoring {:?}: {}", command, err);
        }
    }

    intersection
}

fn apply(intersection: &mut Intersection, command: Command) -> Result<(), ConfigurationError> {
    match command {
        Command::SetSpeedMultiplier(value) => intersection.set_speed_multiplier(value),
        Command::SetNightMode(enabled) => {
            intersection.set_night_mode(enabled);
            Ok(())
        }
    }
}

fn publish(snapshot: &SharedSnapshot, intersection: &Intersection) {
    let next = Arc::new(intersection.snapshot());
    let mut guard = snapshot.write().unwrap_or_else(PoisonError::into_inner);
    *guard = next;
}
