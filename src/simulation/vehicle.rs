//! Vehicle motion logic for the intersection simulation
//!
//! A vehicle drives straight down its inbound lane, performs at most one turn
//! at its turn point, then drives straight until it leaves the play area.

use super::config::SimConfig;
use super::layout::RoadLayout;
use super::types::{AgentId, Approach, Direction, Position, VehicleColor};

/// Progress through a turn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnProgress {
    pub step: u32,
    pub total_steps: u32,
    pub start: Position,
    pub end: Position,
    pub final_direction: Direction,
}

impl TurnProgress {
    /// Fraction of the turn completed
    pub fn fraction(&self) -> f32 {
        self.step as f32 / self.total_steps as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionState {
    Straight,
    Turning(TurnProgress),
}

/// Motion state without the turn details, for renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionKind {
    Straight,
    Turning,
}

impl From<&MotionState> for MotionKind {
    fn from(state: &MotionState) -> Self {
        match state {
            MotionState::Straight => MotionKind::Straight,
            MotionState::Turning(_) => MotionKind::Turning,
        }
    }
}

/// What happened to a vehicle during one update
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VehicleUpdate {
    /// Gated this tick, did not move
    Held,
    /// Moved along its heading
    Advanced,
    /// Moved and began a turn
    StartedTurn,
    /// One interpolation step of a turn
    Turned,
    /// Snapped to the end of its turn
    FinishedTurn,
}

/// A vehicle in the intersection simulation
#[derive(Debug, Clone)]
pub struct VehicleAgent {
    pub id: AgentId,
    pub origin: Approach,
    pub target: Approach,
    pub position: Position,
    pub direction: Direction,
    pub speed: f32,
    pub color: VehicleColor,
    pub motion: MotionState,
    turn_done: bool,
}

impl VehicleAgent {
    pub fn new(
        id: AgentId,
        origin: Approach,
        target: Approach,
        position: Position,
        speed: f32,
        color: VehicleColor,
    ) -> Self {
        Self {
            id,
            origin,
            target,
            position,
            direction: origin.inbound_direction(),
            speed,
            color,
            motion: MotionState::Straight,
            turn_done: false,
        }
    }

    pub fn is_straight(&self) -> bool {
        matches!(self.motion, MotionState::Straight)
    }

    pub fn is_turning(&self) -> bool {
        matches!(self.motion, MotionState::Turning(_))
    }

    /// True once the vehicle has completed its turn
    pub fn has_turned(&self) -> bool {
        self.turn_done
    }

    pub fn motion_kind(&self) -> MotionKind {
        MotionKind::from(&self.motion)
    }

    /// Advance one tick. `held` is the collision gate's verdict and only
    /// applies while driving straight; turns always run to completion.
    pub fn update(&mut self, held: bool, layout: &RoadLayout, config: &SimConfig) -> VehicleUpdate {
        if let MotionState::Turning(mut turn) = self.motion {
            turn.step += 1;
            if turn.step >= turn.total_steps {
                self.position = turn.end;
                self.direction = turn.final_direction;
                self.motion = MotionState::Straight;
                self.turn_done = true;
                return VehicleUpdate::FinishedTurn;
            }
            self.position = turn.start.lerp(&turn.end, turn.fraction());
            self.motion = MotionState::Turning(turn);
            return VehicleUpdate::Turned;
        }

        if held {
            return VehicleUpdate::Held;
        }

        let planned = self.planned_turn(layout, config);
        self.position = self.position.offset(self.direction, self.speed);

        if let Some(turn) = planned {
            self.motion = MotionState::Turning(turn);
            return VehicleUpdate::StartedTurn;
        }

        VehicleUpdate::Advanced
    }

    /// The turn this vehicle would begin if it moved this tick, starting from
    /// the position it would move to
    pub fn planned_turn(&self, layout: &RoadLayout, config: &SimConfig) -> Option<TurnProgress> {
        if !self.is_straight() || self.target == self.origin || self.turn_done {
            return None;
        }

        let next = self.position.offset(self.direction, self.speed);
        let turn_point = layout.turn_point(self.origin, self.target);
        if next.manhattan_distance(&turn_point) >= config.turn_trigger_distance {
            return None;
        }

        let final_direction = self.target.outward_direction();
        Some(TurnProgress {
            step: 0,
            total_steps: config.turn_steps,
            start: next,
            end: next.offset(final_direction, config.turn_offset),
            final_direction,
        })
    }

    /// Where this vehicle will be driving straight once any turn in progress
    /// completes, and in which direction
    pub fn settled_pose(&self) -> (Position, Direction) {
        match self.motion {
            MotionState::Straight => (self.position, self.direction),
            MotionState::Turning(turn) => (turn.end, turn.final_direction),
        }
    }
}
