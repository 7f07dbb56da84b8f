//! Intersection simulation engine
//!
//! This module contains the whole simulation core: signal phases, vehicle
//! motion, collision gating and spawning on a logical clock. It has no notion
//! of threads or rendering and can be stepped directly from tests or the
//! console.

mod clock;
mod collision;
mod config;
mod intersection;
mod layout;
mod signal;
mod snapshot;
mod spawner;
mod types;
mod vehicle;

// Re-export public types for external use
// These may not be used within this crate but are part of the public API
#[allow(unused_imports)]
pub use clock::{CooldownGate, IntervalGate, SimulationClock};
#[allow(unused_imports)]
pub use collision::{
    blocked, entry_is_clear, held_at_stop_line, held_before_turn, held_by_leader,
    nearest_leader_gap,
};
#[allow(unused_imports)]
pub use config::{
    validate_speed_multiplier, ConfigurationError, FollowingMode, RedCountdown, SimConfig,
};
pub use intersection::{Intersection, SimStats, TickReport};
#[allow(unused_imports)]
pub use layout::RoadLayout;
#[allow(unused_imports)]
pub use signal::{SignalController, SignalPhase};
#[allow(unused_imports)]
pub use snapshot::{IntersectionSnapshot, SignalView, VehicleView};
#[allow(unused_imports)]
pub use spawner::{RandomSpawns, ScriptedSpawns, SpawnPlan, SpawnSource, VehicleSpawner};
#[allow(unused_imports)]
pub use types::{
    AgentId, Approach, Direction, Position, SignalColor, TurnIntent, VehicleColor,
    DEFAULT_SPEED_MULTIPLIER, FOLLOWING_GAP, GREEN_SECONDS, LANE_OFFSET, MAX_AGENTS,
    PLAY_AREA_HEIGHT, PLAY_AREA_WIDTH, RED_SECONDS, REMOVAL_MARGIN, SIGNAL_PERIOD,
    SPAWN_COOLDOWN, SPAWN_INSET, SPEED_MULTIPLIER_MAX, SPEED_MULTIPLIER_MIN,
    SPEED_MULTIPLIER_STEP, STOP_BAND_DEPTH, STOP_LINE_DISTANCE, TICK_INTERVAL, TURN_OFFSET,
    TURN_STEPS, TURN_TRIGGER_DISTANCE, YELLOW_SECONDS,
};
#[allow(unused_imports)]
pub use vehicle::{MotionKind, MotionState, TurnProgress, VehicleAgent, VehicleUpdate};
