//! Vehicle spawning
//!
//! The spawner decides when a vehicle may appear; a [`SpawnSource`] decides
//! what it looks like. Sources are swappable so runs can be seeded or fully
//! scripted.

use std::collections::VecDeque;
use std::time::Duration;

use log::trace;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use super::clock::CooldownGate;
use super::collision::entry_is_clear;
use super::config::SimConfig;
use super::layout::RoadLayout;
use super::types::{AgentId, Approach, TurnIntent, VehicleColor};
use super::vehicle::VehicleAgent;

/// Everything random about a new vehicle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPlan {
    pub origin: Approach,
    pub intent: TurnIntent,
    /// Multiplied with the configured speed multiplier
    pub speed_factor: f32,
    pub color: VehicleColor,
}

/// Supplies spawn plans to a [`VehicleSpawner`]
pub trait SpawnSource: Send {
    /// The next vehicle to spawn, or `None` to skip this opportunity.
    /// `speed_jitter` is a validated `(low, high)` range with `0 < low <= high`.
    fn next_plan(&mut self, speed_jitter: (f32, f32)) -> Option<SpawnPlan>;

    /// Hand back a plan that could not be placed
    fn defer(&mut self, _plan: SpawnPlan) {}
}

/// Uniform origin, weighted turn intent (1/4 left, 1/2 straight, 1/4 right)
#[derive(Debug, Default)]
pub struct RandomSpawns {
    /// Optional seeded RNG for reproducible simulations
    rng: Option<StdRng>,
}

impl RandomSpawns {
    pub fn new() -> Self {
        Self { rng: None }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Some(StdRng::seed_from_u64(seed)),
        }
    }

    fn random_index(&mut self, len: usize) -> usize {
        match &mut self.rng {
            Some(rng) => rng.random_range(0..len),
            None => rand::rng().random_range(0..len),
        }
    }

    fn random_unit(&mut self) -> f32 {
        match &mut self.rng {
            Some(rng) => rng.random_range(0.0..1.0),
            None => rand::rng().random_range(0.0..1.0),
        }
    }

    fn random_between(&mut self, low: f32, high: f32) -> f32 {
        match &mut self.rng {
            Some(rng) => rng.random_range(low..=high),
            None => rand::rng().random_range(low..=high),
        }
    }
}

impl SpawnSource for RandomSpawns {
    fn next_plan(&mut self, speed_jitter: (f32, f32)) -> Option<SpawnPlan> {
        let origin = Approach::from_index(self.random_index(Approach::ALL.len()));
        let roll = self.random_unit();
        let intent = if roll < 0.25 {
            TurnIntent::Left
        } else if roll < 0.75 {
            TurnIntent::Straight
        } else {
            TurnIntent::Right
        };
        let (low, high) = speed_jitter;
        let speed_factor = self.random_between(low, high);
        let color = VehicleColor::PALETTE[self.random_index(VehicleColor::PALETTE.len())];

        Some(SpawnPlan {
            origin,
            intent,
            speed_factor,
            color,
        })
    }
}

/// Replays a fixed list of origins and intents, then stops spawning
#[derive(Debug, Default)]
pub struct ScriptedSpawns {
    queue: VecDeque<SpawnPlan>,
}

impl ScriptedSpawns {
    pub fn new<I>(plans: I) -> Self
    where
        I: IntoIterator<Item = (Approach, TurnIntent)>,
    {
        let queue = plans
            .into_iter()
            .enumerate()
            .map(|(i, (origin, intent))| SpawnPlan {
                origin,
                intent,
                speed_factor: 1.0,
                color: VehicleColor::PALETTE[i % VehicleColor::PALETTE.len()],
            })
            .collect();
        Self { queue }
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl SpawnSource for ScriptedSpawns {
    fn next_plan(&mut self, _speed_jitter: (f32, f32)) -> Option<SpawnPlan> {
        self.queue.pop_front()
    }

    fn defer(&mut self, plan: SpawnPlan) {
        self.queue.push_front(plan);
    }
}

/// Paces vehicle creation and assigns identities
pub struct VehicleSpawner {
    cooldown: CooldownGate,
    next_id: usize,
    source: Box<dyn SpawnSource>,
}

impl VehicleSpawner {
    pub fn new(config: &SimConfig, now: Duration, source: Box<dyn SpawnSource>) -> Self {
        Self {
            cooldown: CooldownGate::new(config.spawn_cooldown, now),
            next_id: 0,
            source,
        }
    }

    pub fn reset(&mut self, now: Duration) {
        self.cooldown.record(now);
        self.next_id = 0;
    }

    pub fn set_source(&mut self, source: Box<dyn SpawnSource>) {
        self.source = source;
    }

    /// Zero or one new vehicle. Cooldown, population cap and a blocked
    /// entry lane all turn into a silent `None`.
    pub fn maybe_spawn(
        &mut self,
        now: Duration,
        live: &[VehicleAgent],
        layout: &RoadLayout,
        config: &SimConfig,
    ) -> Option<VehicleAgent> {
        if !self.cooldown.is_open(now) || live.len() >= config.max_agents {
            return None;
        }

        let plan = self.source.next_plan(config.speed_jitter)?;
        let agent = self.build(plan, layout, config);

        if !entry_is_clear(&agent, live, config) {
            trace!("{} entry lane occupied, deferring spawn", plan.origin);
            self.source.defer(plan);
            return None;
        }

        self.cooldown.record(now);
        self.next_id += 1;
        Some(agent)
    }

    /// Spawn immediately with a chosen origin and intent, ignoring the
    /// cooldown. The population cap and entry clearance still apply.
    pub fn spawn_now(
        &mut self,
        origin: Approach,
        intent: TurnIntent,
        live: &[VehicleAgent],
        layout: &RoadLayout,
        config: &SimConfig,
    ) -> Option<VehicleAgent> {
        if live.len() >= config.max_agents {
            return None;
        }

        let plan = SpawnPlan {
            origin,
            intent,
            speed_factor: 1.0,
            color: VehicleColor::PALETTE[self.next_id % VehicleColor::PALETTE.len()],
        };
        let agent = self.build(plan, layout, config);
        if !entry_is_clear(&agent, live, config) {
            return None;
        }

        self.next_id += 1;
        Some(agent)
    }

    fn build(&self, plan: SpawnPlan, layout: &RoadLayout, config: &SimConfig) -> VehicleAgent {
        VehicleAgent::new(
            AgentId(self.next_id),
            plan.origin,
            plan.intent.target_from(plan.origin),
            layout.spawn_point(plan.origin),
            config.speed_multiplier * plan.speed_factor,
            plan.color,
        )
    }
}
