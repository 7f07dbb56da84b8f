//! Simulation configuration
//!
//! Every tunable of the engine lives in [`SimConfig`]. Defaults come from the
//! constants in `types.rs`; values crossing the control boundary go through
//! [`SimConfig::validate`] or [`validate_speed_multiplier`].

use std::time::Duration;

use log::warn;
use thiserror::Error;

use super::types::{
    DEFAULT_SPEED_MULTIPLIER, FOLLOWING_GAP, GREEN_SECONDS, LANE_OFFSET, MAX_AGENTS,
    PLAY_AREA_HEIGHT, PLAY_AREA_WIDTH, RED_SECONDS, REMOVAL_MARGIN, SIGNAL_PERIOD,
    SPAWN_COOLDOWN, SPAWN_INSET, SPEED_JITTER_MAX, SPEED_JITTER_MIN, SPEED_MULTIPLIER_MAX,
    SPEED_MULTIPLIER_MIN, SPEED_MULTIPLIER_STEP, STOP_BAND_DEPTH, STOP_LINE_DISTANCE,
    TICK_INTERVAL, TURN_OFFSET, TURN_STEPS, TURN_TRIGGER_DISTANCE, YELLOW_SECONDS,
};

/// A configuration value the engine refuses to run with
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("speed multiplier must be a finite number, got {0}")]
    SpeedMultiplierNotFinite(f32),

    #[error("speed multiplier {value} is outside [{min}, {max}]")]
    SpeedMultiplierOutOfRange { value: f32, min: f32, max: f32 },

    #[error("speed multiplier {value} is not a multiple of {step}")]
    SpeedMultiplierOffStep { value: f32, step: f32 },

    #[error("tick interval must be greater than zero")]
    ZeroTickInterval,

    #[error("turns need at least one interpolation step")]
    ZeroTurnSteps,

    #[error("following gap must be positive, got {0}")]
    NonPositiveFollowingGap(f32),

    #[error("population cap must be at least one vehicle")]
    ZeroPopulationCap,

    #[error("speed jitter must be a positive, ordered range, got [{low}, {high}]")]
    InvalidSpeedJitter { low: f32, high: f32 },

    #[error(
        "top vehicle speed {speed:.1} per tick would jump the {band:.1}-unit stop-line band"
    )]
    StopBandTooShallow { speed: f32, band: f32 },
}

/// How red countdowns are maintained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedCountdown {
    /// Red starts at a fixed duration and holds at zero once it runs out
    Fixed,
    /// Red always shows the seconds left until the approach turns green
    #[default]
    Scheduled,
}

/// Which vehicles the following rule compares against each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FollowingMode {
    /// Any vehicle with the same origin approach
    ApproachWide,
    /// Same origin approach, same heading, and the same lane
    #[default]
    LaneAware,
}

/// Tunables of the simulation engine
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Scales the speed of newly spawned vehicles
    pub speed_multiplier: f32,
    /// Cosmetic; carried into snapshots only
    pub night_mode: bool,

    pub tick_interval: Duration,
    pub signal_period: Duration,
    pub spawn_cooldown: Duration,

    pub green_seconds: u32,
    pub yellow_seconds: u32,
    pub red_seconds: u32,
    pub red_countdown: RedCountdown,

    pub max_agents: usize,
    /// Spawn vehicles automatically every cooldown
    pub auto_spawn: bool,
    pub speed_jitter: (f32, f32),

    pub play_area: (f32, f32),
    pub spawn_inset: f32,
    pub removal_margin: f32,
    pub lane_offset: f32,

    pub turn_offset: f32,
    pub turn_steps: u32,
    pub turn_trigger_distance: f32,

    pub following_gap: f32,
    pub following_mode: FollowingMode,
    pub stop_line_distance: f32,
    pub stop_band_depth: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            speed_multiplier: DEFAULT_SPEED_MULTIPLIER,
            night_mode: false,
            tick_interval: TICK_INTERVAL,
            signal_period: SIGNAL_PERIOD,
            spawn_cooldown: SPAWN_COOLDOWN,
            green_seconds: GREEN_SECONDS,
            yellow_seconds: YELLOW_SECONDS,
            red_seconds: RED_SECONDS,
            red_countdown: RedCountdown::default(),
            max_agents: MAX_AGENTS,
            auto_spawn: true,
            speed_jitter: (SPEED_JITTER_MIN, SPEED_JITTER_MAX),
            play_area: (PLAY_AREA_WIDTH, PLAY_AREA_HEIGHT),
            spawn_inset: SPAWN_INSET,
            removal_margin: REMOVAL_MARGIN,
            lane_offset: LANE_OFFSET,
            turn_offset: TURN_OFFSET,
            turn_steps: TURN_STEPS,
            turn_trigger_distance: TURN_TRIGGER_DISTANCE,
            following_gap: FOLLOWING_GAP,
            following_mode: FollowingMode::default(),
            stop_line_distance: STOP_LINE_DISTANCE,
            stop_band_depth: STOP_BAND_DEPTH,
        }
    }
}

impl SimConfig {
    /// Check every value the core relies on
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_speed_multiplier(self.speed_multiplier)?;

        if self.tick_interval.is_zero() {
            return Err(ConfigurationError::ZeroTickInterval);
        }
        if self.turn_steps == 0 {
            return Err(ConfigurationError::ZeroTurnSteps);
        }
        if self.following_gap.is_nan() || self.following_gap <= 0.0 {
            return Err(ConfigurationError::NonPositiveFollowingGap(self.following_gap));
        }
        if self.max_agents == 0 {
            return Err(ConfigurationError::ZeroPopulationCap);
        }

        let (low, high) = self.speed_jitter;
        if !low.is_finite() || !high.is_finite() || low <= 0.0 || low > high {
            warn!("rejected speed jitter [{}, {}]", low, high);
            return Err(ConfigurationError::InvalidSpeedJitter { low, high });
        }

        // A vehicle must land inside the band at least once on its way in.
        let top_speed = SPEED_MULTIPLIER_MAX * self.speed_jitter.1;
        if top_speed >= self.stop_band_depth {
            return Err(ConfigurationError::StopBandTooShallow {
                speed: top_speed,
                band: self.stop_band_depth,
            });
        }

        Ok(())
    }

    /// Ticks in one signal period, for reporting
    pub fn ticks_per_second(&self) -> u32 {
        let interval = self.tick_interval.as_secs_f64();
        if interval <= 0.0 {
            return 1;
        }
        (1.0 / interval).round().max(1.0) as u32
    }
}

/// Validate a speed multiplier coming from the control surface
pub fn validate_speed_multiplier(value: f32) -> Result<f32, ConfigurationError> {
    let result = if !value.is_finite() {
        Err(ConfigurationError::SpeedMultiplierNotFinite(value))
    } else if !(SPEED_MULTIPLIER_MIN..=SPEED_MULTIPLIER_MAX).contains(&value) {
        Err(ConfigurationError::SpeedMultiplierOutOfRange {
            value,
            min: SPEED_MULTIPLIER_MIN,
            max: SPEED_MULTIPLIER_MAX,
        })
    } else {
        let steps = value / SPEED_MULTIPLIER_STEP;
        if (steps - steps.round()).abs() > 1e-4 {
            Err(ConfigurationError::SpeedMultiplierOffStep {
                value,
                step: SPEED_MULTIPLIER_STEP,
            })
        } else {
            Ok(value)
        }
    };

    if let Err(err) = &result {
        warn!("rejected speed multiplier: {}", err);
    }
    result
}
