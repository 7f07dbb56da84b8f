//! Read-only views handed to renderers and the control surface

use std::time::Duration;

use super::types::{AgentId, Approach, Position, SignalColor, VehicleColor};
use super::vehicle::MotionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalView {
    pub approach: Approach,
    pub color: SignalColor,
    pub remaining_seconds: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleView {
    pub id: AgentId,
    pub origin: Approach,
    pub target: Approach,
    pub position: Position,
    pub color: VehicleColor,
    pub motion: MotionKind,
}

/// Everything a renderer needs to draw one frame
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionSnapshot {
    pub tick: u64,
    pub time: Duration,
    pub night_mode: bool,
    pub speed_multiplier: f32,
    /// Indexed in cyclic approach order
    pub signals: [SignalView; 4],
    pub vehicles: Vec<VehicleView>,
}

impl IntersectionSnapshot {
    pub fn signal(&self, approach: Approach) -> SignalView {
        self.signals[approach.index()]
    }

    pub fn count_with_color(&self, color: SignalColor) -> usize {
        self.signals.iter().filter(|s| s.color == color).count()
    }

    pub fn vehicle(&self, id: AgentId) -> Option<&VehicleView> {
        self.vehicles.iter().find(|v| v.id == id)
    }
}
