//! Core types for the intersection simulation
//!
//! Plain data types and the named constants every other module builds on.
//! Screen coordinates are used throughout: `x` grows east, `y` grows south.

use std::fmt;
use std::time::Duration;

/// A unique identifier for a vehicle agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub usize);

/// One of the four roads feeding the intersection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Approach {
    North,
    East,
    South,
    West,
}

impl Approach {
    /// All approaches in cyclic order
    pub const ALL: [Approach; 4] = [
        Approach::North,
        Approach::East,
        Approach::South,
        Approach::West,
    ];

    pub fn index(self) -> usize {
        match self {
            Approach::North => 0,
            Approach::East => 1,
            Approach::South => 2,
            Approach::West => 3,
        }
    }

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 4]
    }

    /// The approach `steps` positions later in cyclic order
    pub fn offset(self, steps: usize) -> Self {
        Self::from_index(self.index() + steps)
    }

    pub fn next(self) -> Self {
        self.offset(1)
    }

    pub fn previous(self) -> Self {
        self.offset(3)
    }

    pub fn opposite(self) -> Self {
        self.offset(2)
    }

    /// How many cyclic steps it takes to get from `self` to `other`
    pub fn steps_to(self, other: Approach) -> usize {
        (other.index() + 4 - self.index()) % 4
    }

    /// True for the approaches whose traffic runs along the y axis
    pub fn is_vertical(self) -> bool {
        matches!(self, Approach::North | Approach::South)
    }

    /// Unit vector of traffic entering from this approach, pointing at the center
    pub fn inbound_direction(self) -> Direction {
        match self {
            Approach::North => Direction::new(0.0, 1.0),
            Approach::East => Direction::new(-1.0, 0.0),
            Approach::South => Direction::new(0.0, -1.0),
            Approach::West => Direction::new(1.0, 0.0),
        }
    }

    /// Unit vector of traffic leaving the intersection through this approach
    pub fn outward_direction(self) -> Direction {
        self.inbound_direction().reversed()
    }
}

impl fmt::Display for Approach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Approach::North => "North",
            Approach::East => "East",
            Approach::South => "South",
            Approach::West => "West",
        };
        f.write_str(name)
    }
}

/// What a vehicle intends to do once it reaches the intersection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnIntent {
    Left,
    Straight,
    Right,
}

impl TurnIntent {
    /// The approach a vehicle coming from `origin` leaves through
    pub fn target_from(self, origin: Approach) -> Approach {
        match self {
            TurnIntent::Left => origin.next(),
            TurnIntent::Right => origin.previous(),
            TurnIntent::Straight => origin.opposite(),
        }
    }
}

/// Signal head color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalColor {
    Green,
    Yellow,
    Red,
}

impl fmt::Display for SignalColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalColor::Green => "green",
            SignalColor::Yellow => "yellow",
            SignalColor::Red => "red",
        };
        f.write_str(name)
    }
}

/// Body color of a vehicle. Purely cosmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleColor {
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    Slate,
}

impl VehicleColor {
    pub const PALETTE: [VehicleColor; 6] = [
        VehicleColor::Red,
        VehicleColor::Blue,
        VehicleColor::Green,
        VehicleColor::Yellow,
        VehicleColor::Purple,
        VehicleColor::Slate,
    ];

    /// Hex color a renderer can use as-is
    pub fn hex(self) -> &'static str {
        match self {
            VehicleColor::Red => "#e74c3c",
            VehicleColor::Blue => "#3498db",
            VehicleColor::Green => "#2ecc71",
            VehicleColor::Yellow => "#f1c40f",
            VehicleColor::Purple => "#9b59b6",
            VehicleColor::Slate => "#34495e",
        }
    }
}

/// A 2D position in the play area
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn manhattan_distance(&self, other: &Position) -> f32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    pub fn lerp(&self, other: &Position, t: f32) -> Position {
        Position {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Move `distance` units along `direction`
    pub fn offset(&self, direction: Direction, distance: f32) -> Position {
        Position {
            x: self.x + direction.dx * distance,
            y: self.y + direction.dy * distance,
        }
    }
}

/// A unit heading vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Direction {
    pub dx: f32,
    pub dy: f32,
}

impl Direction {
    pub const fn new(dx: f32, dy: f32) -> Self {
        Self { dx, dy }
    }

    pub fn reversed(self) -> Self {
        Self::new(-self.dx, -self.dy)
    }

    /// The driver's right-hand side (screen coordinates, y down)
    pub fn right(self) -> Self {
        Self::new(-self.dy, self.dx)
    }

    /// Signed length of `from -> to` along this heading
    pub fn project(self, from: &Position, to: &Position) -> f32 {
        (to.x - from.x) * self.dx + (to.y - from.y) * self.dy
    }

    /// Signed length of `from -> to` across this heading, positive to the right
    pub fn lateral(self, from: &Position, to: &Position) -> f32 {
        self.right().project(from, to)
    }
}

/// Seconds a phase stays green before turning yellow
pub const GREEN_SECONDS: u32 = 10;

/// Seconds a phase stays yellow before turning red
pub const YELLOW_SECONDS: u32 = 2;

/// Red countdown used by the fixed red-countdown policy
pub const RED_SECONDS: u32 = 12;

/// Logical time between two signal firings
pub const SIGNAL_PERIOD: Duration = Duration::from_secs(1);

/// Minimum logical time between two successful spawns
pub const SPAWN_COOLDOWN: Duration = Duration::from_millis(1500);

/// Logical time covered by one loop iteration
pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Maximum number of live vehicles
pub const MAX_AGENTS: usize = 24;

/// Lateral distance from the road centerline to a lane center
pub const LANE_OFFSET: f32 = 60.0;

/// Distance covered by a turn
pub const TURN_OFFSET: f32 = 30.0;

/// Discrete interpolation steps of a turn
pub const TURN_STEPS: u32 = 20;

/// Manhattan distance to the turn point at which a turn begins
pub const TURN_TRIGGER_DISTANCE: f32 = 20.0;

/// Minimum forward spacing between vehicles of one lane
pub const FOLLOWING_GAP: f32 = 35.0;

/// Distance from the center to the outer edge of a stop-line band
pub const STOP_LINE_DISTANCE: f32 = 140.0;

/// Depth of a stop-line band along the approach axis
pub const STOP_BAND_DEPTH: f32 = 20.0;

/// How far outside the play area a vehicle may go before it is removed
pub const REMOVAL_MARGIN: f32 = 30.0;

/// How far outside the play area vehicles appear
pub const SPAWN_INSET: f32 = 20.0;

/// Play area width
pub const PLAY_AREA_WIDTH: f32 = 700.0;

/// Play area height
pub const PLAY_AREA_HEIGHT: f32 = 700.0;

/// Speed multiplier a fresh simulation starts with
pub const DEFAULT_SPEED_MULTIPLIER: f32 = 2.0;

/// Bounds and granularity of the speed multiplier control
pub const SPEED_MULTIPLIER_MIN: f32 = 0.5;
pub const SPEED_MULTIPLIER_MAX: f32 = 5.0;
pub const SPEED_MULTIPLIER_STEP: f32 = 0.5;

/// Per-vehicle speed jitter applied on top of the multiplier
pub const SPEED_JITTER_MIN: f32 = 0.8;
pub const SPEED_JITTER_MAX: f32 = 1.2;
