//! The intersection aggregate
//!
//! Owns the signal controller and every live vehicle, and composes the
//! subsystems into one logical tick:
//!
//! 1. the clock advances,
//! 2. the signals advance (at most once per signal period),
//! 3. each live vehicle is gated and updated, in spawn order,
//! 4. at most one vehicle spawns (at most once per spawn cooldown),
//! 5. vehicles past the removal margin are dropped.
//!
//! A light change is therefore visible to the same tick's gating, and a
//! freshly spawned vehicle never moves on its spawn tick.

use std::time::Duration;

use log::{debug, info, trace};

use super::clock::SimulationClock;
use super::collision;
use super::config::{validate_speed_multiplier, ConfigurationError, SimConfig};
use super::layout::RoadLayout;
use super::signal::SignalController;
use super::snapshot::{IntersectionSnapshot, SignalView, VehicleView};
use super::spawner::{RandomSpawns, SpawnSource, VehicleSpawner};
use super::types::{AgentId, Approach, Direction, SignalColor, TurnIntent};
use super::vehicle::{VehicleAgent, VehicleUpdate};

/// Running totals since the last reset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimStats {
    pub spawned: usize,
    pub exited: usize,
    pub turns_completed: usize,
    pub peak_population: usize,
    /// Sum over ticks of vehicles held by the gate
    pub held_vehicle_ticks: u64,
    pub signal_hand_offs: usize,
}

/// What one tick did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub time: Duration,
    pub signals_fired: bool,
    pub held: usize,
    pub spawned: Option<AgentId>,
    pub exited: Vec<AgentId>,
}

pub struct Intersection {
    config: SimConfig,
    layout: RoadLayout,
    clock: SimulationClock,
    signals: SignalController,
    spawner: VehicleSpawner,
    agents: Vec<VehicleAgent>,
    stats: SimStats,
}

impl Intersection {
    /// Intersection spawning from an unseeded random source
    pub fn new(config: SimConfig) -> Result<Self, ConfigurationError> {
        Self::with_source(config, Box::new(RandomSpawns::new()))
    }

    /// Intersection with a seeded RNG for reproducible simulations
    pub fn with_seed(config: SimConfig, seed: u64) -> Result<Self, ConfigurationError> {
        Self::with_source(config, Box::new(RandomSpawns::with_seed(seed)))
    }

    pub fn with_source(
        config: SimConfig,
        source: Box<dyn SpawnSource>,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let clock = SimulationClock::new(config.tick_interval);
        let now = clock.now();
        Ok(Self {
            layout: RoadLayout::new(&config),
            signals: SignalController::new(&config, now),
            spawner: VehicleSpawner::new(&config, now, source),
            clock,
            agents: Vec::new(),
            stats: SimStats::default(),
            config,
        })
    }

    /// Run one logical tick
    pub fn tick(&mut self) -> TickReport {
        let now = self.clock.advance();
        let mut report = TickReport {
            time: now,
            ..Default::default()
        };

        let green_before = self.signals.current();
        report.signals_fired = self.signals.advance(now);
        if self.signals.current() != green_before {
            self.stats.signal_hand_offs += 1;
        }

        self.update_vehicles(&mut report);

        if self.config.auto_spawn {
            if let Some(agent) =
                self.spawner
                    .maybe_spawn(now, &self.agents, &self.layout, &self.config)
            {
                report.spawned = Some(agent.id);
                self.admit(agent);
            }
        }

        self.remove_departed(&mut report);
        report
    }

    /// Run `count` ticks
    pub fn run(&mut self, count: u64) {
        for _ in 0..count {
            self.tick();
        }
    }

    fn update_vehicles(&mut self, report: &mut TickReport) {
        // Vehicles updated earlier in the pass are seen at their new positions.
        for i in 0..self.agents.len() {
            let held = collision::blocked(
                &self.agents[i],
                &self.agents,
                &self.signals,
                &self.layout,
                &self.config,
            );
            let agent = &mut self.agents[i];
            match agent.update(held, &self.layout, &self.config) {
                VehicleUpdate::Held => {
                    report.held += 1;
                    self.stats.held_vehicle_ticks += 1;
                }
                VehicleUpdate::StartedTurn => {
                    trace!(
                        "vehicle {} turning {} -> {} at ({:.1}, {:.1})",
                        agent.id.0,
                        agent.origin,
                        agent.target,
                        agent.position.x,
                        agent.position.y
                    );
                }
                VehicleUpdate::FinishedTurn => self.stats.turns_completed += 1,
                VehicleUpdate::Advanced | VehicleUpdate::Turned => {}
            }
        }
    }

    fn remove_departed(&mut self, report: &mut TickReport) {
        let layout = &self.layout;
        let exited = &mut report.exited;
        self.agents.retain(|agent| {
            if layout.is_out_of_bounds(&agent.position) {
                trace!("vehicle {} left via {}", agent.id.0, agent.target);
                exited.push(agent.id);
                false
            } else {
                true
            }
        });
        self.stats.exited += report.exited.len();
    }

    fn admit(&mut self, agent: VehicleAgent) {
        debug!(
            "spawned vehicle {} from {} to {} at speed {:.2}",
            agent.id.0, agent.origin, agent.target, agent.speed
        );
        self.agents.push(agent);
        self.stats.spawned += 1;
        self.stats.peak_population = self.stats.peak_population.max(self.agents.len());
    }

    /// Spawn a vehicle right now with a chosen origin and turn intent.
    /// Returns `None` at the population cap or when the entry lane is occupied.
    pub fn spawn(&mut self, origin: Approach, intent: TurnIntent) -> Option<AgentId> {
        let agent = self
            .spawner
            .spawn_now(origin, intent, &self.agents, &self.layout, &self.config)?;
        let id = agent.id;
        self.admit(agent);
        Some(id)
    }

    /// Clear all vehicles and return the signals to their start state
    pub fn reset(&mut self) {
        self.agents.clear();
        self.clock.reset();
        let now = self.clock.now();
        self.signals.reset(now);
        self.spawner.reset(now);
        self.stats = SimStats::default();
        info!("intersection reset");
    }

    pub fn set_speed_multiplier(&mut self, value: f32) -> Result<(), ConfigurationError> {
        self.config.speed_multiplier = validate_speed_multiplier(value)?;
        debug!("speed multiplier set to {}", value);
        Ok(())
    }

    pub fn set_night_mode(&mut self, enabled: bool) {
        self.config.night_mode = enabled;
    }

    pub fn set_spawn_source(&mut self, source: Box<dyn SpawnSource>) {
        self.spawner.set_source(source);
    }

    pub fn snapshot(&self) -> IntersectionSnapshot {
        let signals = Approach::ALL.map(|approach| {
            let phase = self.signals.phase(approach);
            SignalView {
                approach,
                color: phase.color,
                remaining_seconds: phase.remaining_seconds,
            }
        });

        let vehicles = self
            .agents
            .iter()
            .map(|agent| VehicleView {
                id: agent.id,
                origin: agent.origin,
                target: agent.target,
                position: agent.position,
                color: agent.color,
                motion: agent.motion_kind(),
            })
            .collect();

        IntersectionSnapshot {
            tick: self.clock.ticks(),
            time: self.clock.now(),
            night_mode: self.config.night_mode,
            speed_multiplier: self.config.speed_multiplier,
            signals,
            vehicles,
        }
    }

    pub fn agents(&self) -> &[VehicleAgent] {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Option<&VehicleAgent> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn signals(&self) -> &SignalController {
        &self.signals
    }

    pub fn layout(&self) -> &RoadLayout {
        &self.layout
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn ticks(&self) -> u64 {
        self.clock.ticks()
    }

    /// Print a summary of the intersection state
    pub fn print_summary(&self) {
        println!(
            "=== Intersection at {:.1}s (tick {}) ===",
            self.now().as_secs_f32(),
            self.ticks()
        );

        println!("--- Signals ---");
        for approach in Approach::ALL {
            let phase = self.signals.phase(approach);
            println!(
                "  {:<5}: {:<6} {:>2}s",
                approach.to_string(),
                phase.color.to_string(),
                phase.remaining_seconds
            );
        }

        if !self.agents.is_empty() {
            println!("--- Vehicles ---");
            for agent in &self.agents {
                let gap = collision::nearest_leader_gap(agent, &self.agents, &self.config)
                    .map(|g| format!("{:.1}", g))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "  Vehicle {:>3}: {} -> {}, position=({:.1}, {:.1}), speed={:.2}, {:?}, gap={}",
                    agent.id.0,
                    agent.origin,
                    agent.target,
                    agent.position.x,
                    agent.position.y,
                    agent.speed,
                    agent.motion_kind(),
                    gap
                );
            }
        }

        println!("--- Totals ---");
        println!(
            "  live={}, spawned={}, exited={}, turns={}, peak={}",
            self.agents.len(),
            self.stats.spawned,
            self.stats.exited,
            self.stats.turns_completed,
            self.stats.peak_population
        );
    }

    /// Draw a visual map of the intersection in the terminal
    pub fn draw_map(&self) {
        for line in self.render_map() {
            println!("{}", line);
        }
    }

    /// The terminal map as lines of text
    pub fn render_map(&self) -> Vec<String> {
        // Characters per world unit
        let scale = 1.0 / 20.0;
        let (width, height) = self.layout.size();
        let cols = (width * scale).ceil() as usize + 1;
        let rows = (height * scale).ceil() as usize + 1;
        let mut grid = vec![vec![' '; cols]; rows];

        let to_grid = |x: f32, y: f32| -> Option<(usize, usize)> {
            if x < 0.0 || y < 0.0 {
                return None;
            }
            let col = (x * scale).round() as usize;
            let row = (y * scale).round() as usize;
            (row < rows && col < cols).then_some((row, col))
        };

        // Roads: both lanes of every approach
        let center = self.layout.center();
        let lane = self.config.lane_offset;
        for row in 0..rows {
            for col in 0..cols {
                let x = col as f32 / scale;
                let y = row as f32 / scale;
                let on_vertical = (x - center.x).abs() <= lane;
                let on_horizontal = (y - center.y).abs() <= lane;
                if on_vertical || on_horizontal {
                    grid[row][col] = '.';
                }
            }
        }

        // Signal heads at the stop lines
        for approach in Approach::ALL {
            let anchor = self.layout.inbound_lane_anchor(approach);
            let stop = anchor.offset(approach.outward_direction(), self.layout.stop_line());
            if let Some((row, col)) = to_grid(stop.x, stop.y) {
                grid[row][col] = match self.signals.phase(approach).color {
                    SignalColor::Green => 'G',
                    SignalColor::Yellow => 'Y',
                    SignalColor::Red => 'R',
                };
            }
        }

        // Vehicles
        for agent in &self.agents {
            if let Some((row, col)) = to_grid(agent.position.x, agent.position.y) {
                grid[row][col] = if agent.is_turning() {
                    '*'
                } else {
                    heading_glyph(agent.direction)
                };
            }
        }

        let mut lines = vec![
            "=== Intersection Map ===".to_string(),
            "Legend: G/Y/R=signal, v<^>=vehicle heading, *=turning, .=road".to_string(),
        ];
        lines.extend(grid.iter().map(|row| row.iter().collect::<String>()));
        lines
    }
}

fn heading_glyph(direction: Direction) -> char {
    if direction.dx.abs() >= direction.dy.abs() {
        if direction.dx >= 0.0 {
            '>'
        } else {
            '<'
        }
    } else if direction.dy >= 0.0 {
        'v'
    } else {
        '^'
    }
}
