//! Collision gating
//!
//! Decides, per vehicle and per tick, whether it has to hold its position.
//! Nothing here mutates state.

use ordered_float::OrderedFloat;

use super::config::{FollowingMode, SimConfig};
use super::layout::RoadLayout;
use super::signal::SignalController;
use super::vehicle::VehicleAgent;

/// Whether `agent` must hold this tick
pub fn blocked(
    agent: &VehicleAgent,
    all: &[VehicleAgent],
    signals: &SignalController,
    layout: &RoadLayout,
    config: &SimConfig,
) -> bool {
    held_at_stop_line(agent, signals, layout)
        || held_by_leader(agent, all, config)
        || held_before_turn(agent, all, layout, config)
}

/// Stop-line rule: no green for the agent's approach and it is waiting in the band
pub fn held_at_stop_line(
    agent: &VehicleAgent,
    signals: &SignalController,
    layout: &RoadLayout,
) -> bool {
    !signals.is_green(agent.origin) && layout.in_stop_band(agent.origin, &agent.position)
}

/// Following rule: moving would bring the agent within the following gap of
/// the vehicle ahead
pub fn held_by_leader(agent: &VehicleAgent, all: &[VehicleAgent], config: &SimConfig) -> bool {
    nearest_leader_gap(agent, all, config)
        .is_some_and(|gap| gap < config.following_gap + agent.speed)
}

/// Turn clearance: a turn cannot be held once started, so it only starts when
/// its end point is at least the following gap from every vehicle of the same
/// origin that is, or will be, driving along the exit lane. A vehicle that is
/// itself mid-turn is checked both where it is and where its turn ends.
///
/// Applies in [`FollowingMode::LaneAware`] only.
pub fn held_before_turn(
    agent: &VehicleAgent,
    all: &[VehicleAgent],
    layout: &RoadLayout,
    config: &SimConfig,
) -> bool {
    if config.following_mode != FollowingMode::LaneAware {
        return false;
    }
    let Some(turn) = agent.planned_turn(layout, config) else {
        return false;
    };

    let heading = turn.final_direction;
    all.iter()
        .filter(|other| other.id != agent.id && other.origin == agent.origin)
        .flat_map(|other| [(other.position, other.direction), other.settled_pose()])
        .filter(|(position, direction)| {
            *direction == heading
                && heading.lateral(&turn.end, position).abs() < config.lane_offset
        })
        .any(|(position, _)| heading.project(&turn.end, &position).abs() < config.following_gap)
}

/// Projected distance to the closest vehicle ahead that the following rule
/// compares against
pub fn nearest_leader_gap(
    agent: &VehicleAgent,
    all: &[VehicleAgent],
    config: &SimConfig,
) -> Option<f32> {
    all.iter()
        .filter(|other| shares_lane(agent, other, config))
        .map(|other| agent.direction.project(&agent.position, &other.position))
        .filter(|gap| *gap > 0.0)
        .min_by_key(|gap| OrderedFloat(*gap))
}

/// Whether a vehicle about to appear would land inside another vehicle's
/// following gap, in front or behind
pub fn entry_is_clear(candidate: &VehicleAgent, all: &[VehicleAgent], config: &SimConfig) -> bool {
    !all.iter()
        .filter(|other| shares_lane(candidate, other, config))
        .map(|other| candidate.direction.project(&candidate.position, &other.position))
        .any(|gap| gap.abs() < config.following_gap)
}

fn shares_lane(agent: &VehicleAgent, other: &VehicleAgent, config: &SimConfig) -> bool {
    if other.id == agent.id || other.origin != agent.origin {
        return false;
    }
    match config.following_mode {
        FollowingMode::ApproachWide => other.is_straight(),
        // A turning vehicle keeps its heading until the turn completes, and
        // its interpolated position still blocks the lane behind it.
        FollowingMode::LaneAware => {
            other.direction == agent.direction
                && agent
                    .direction
                    .lateral(&agent.position, &other.position)
                    .abs()
                    < config.lane_offset
        }
    }
}
