//! Road layout of the intersection
//!
//! Two-way roads meet at the center of the play area. Traffic keeps right, so
//! each approach has an inbound lane on one side of the painted median and an
//! outbound lane on the other, both `lane_offset` away from the centerline.

use super::config::SimConfig;
use super::types::{Approach, Position};

#[derive(Debug, Clone)]
pub struct RoadLayout {
    width: f32,
    height: f32,
    lane_offset: f32,
    spawn_inset: f32,
    removal_margin: f32,
    stop_line_distance: f32,
    stop_band_depth: f32,
}

impl RoadLayout {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            width: config.play_area.0,
            height: config.play_area.1,
            lane_offset: config.lane_offset,
            spawn_inset: config.spawn_inset,
            removal_margin: config.removal_margin,
            stop_line_distance: config.stop_line_distance,
            stop_band_depth: config.stop_band_depth,
        }
    }

    pub fn center(&self) -> Position {
        Position::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    /// The point of an approach's inbound lane level with the center
    pub fn inbound_lane_anchor(&self, approach: Approach) -> Position {
        let heading = approach.inbound_direction();
        self.center().offset(heading.right(), self.lane_offset)
    }

    /// The point of an approach's outbound lane level with the center
    pub fn outbound_lane_anchor(&self, approach: Approach) -> Position {
        let heading = approach.outward_direction();
        self.center().offset(heading.right(), self.lane_offset)
    }

    /// Where vehicles entering from `approach` appear, just outside the play area
    pub fn spawn_point(&self, approach: Approach) -> Position {
        let lane = self.inbound_lane_anchor(approach);
        match approach {
            Approach::North => Position::new(lane.x, -self.spawn_inset),
            Approach::East => Position::new(self.width + self.spawn_inset, lane.y),
            Approach::South => Position::new(lane.x, self.height + self.spawn_inset),
            Approach::West => Position::new(-self.spawn_inset, lane.y),
        }
    }

    /// Where the inbound lane of `origin` meets the outbound lane of `target`.
    ///
    /// Straight-through lanes never cross, so those vehicles pivot level with
    /// the center instead.
    pub fn turn_point(&self, origin: Approach, target: Approach) -> Position {
        let inbound = self.inbound_lane_anchor(origin);
        let outbound = self.outbound_lane_anchor(target);
        let center = self.center();

        if origin.is_vertical() {
            let y = if target.is_vertical() { center.y } else { outbound.y };
            Position::new(inbound.x, y)
        } else {
            let x = if target.is_vertical() { outbound.x } else { center.x };
            Position::new(x, inbound.y)
        }
    }

    /// Distance from the center along the approach's axis, positive on the
    /// approach's own side
    pub fn distance_up_approach(&self, approach: Approach, position: &Position) -> f32 {
        -approach
            .inbound_direction()
            .project(&self.center(), position)
    }

    /// Whether `position` lies in the band where traffic from `approach`
    /// waits for a green
    pub fn in_stop_band(&self, approach: Approach, position: &Position) -> bool {
        let distance = self.distance_up_approach(approach, position);
        let near_edge = self.stop_line_distance - self.stop_band_depth;
        (near_edge..=self.stop_line_distance).contains(&distance)
    }

    /// Near edge of the stop-line band, measured from the center
    pub fn stop_line(&self) -> f32 {
        self.stop_line_distance - self.stop_band_depth
    }

    pub fn is_out_of_bounds(&self, position: &Position) -> bool {
        let m = self.removal_margin;
        position.x < -m
            || position.x > self.width + m
            || position.y < -m
            || position.y > self.height + m
    }
}
