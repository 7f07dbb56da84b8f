//! Spawn policy, population bound and long-run properties

use std::collections::HashMap;

use intersection_sim::simulation::{
    validate_speed_multiplier, AgentId, Approach, ConfigurationError, Intersection, MotionState,
    RandomSpawns, ScriptedSpawns, SignalColor, SimConfig, SpawnSource, TurnIntent, TurnProgress,
    VehicleAgent, FOLLOWING_GAP, LANE_OFFSET,
};

/// Closest forward gap between two straight vehicles of one origin driving
/// the same lane in the same direction, with the follower and leader ids
fn closest_following_gap(agents: &[VehicleAgent]) -> Option<(f32, AgentId, AgentId)> {
    let mut closest: Option<(f32, AgentId, AgentId)> = None;
    for follower in agents.iter().filter(|a| a.is_straight()) {
        for leader in agents.iter().filter(|a| a.is_straight() && a.id != follower.id) {
            if leader.origin != follower.origin || leader.direction != follower.direction {
                continue;
            }
            let heading = follower.direction;
            if heading.lateral(&follower.position, &leader.position).abs() >= LANE_OFFSET {
                continue;
            }
            let gap = heading.project(&follower.position, &leader.position);
            if gap > 0.0 && closest.map_or(true, |(best, _, _)| gap < best) {
                closest = Some((gap, follower.id, leader.id));
            }
        }
    }
    closest
}

fn assert_following_gap(intersection: &Intersection, tick: u64) {
    if let Some((gap, follower, leader)) = closest_following_gap(intersection.agents()) {
        assert!(
            gap >= FOLLOWING_GAP - 1e-3,
            "tick {}: vehicle {} is {:.2} behind vehicle {}",
            tick,
            follower.0,
            gap,
            leader.0
        );
    }
}

#[test]
fn test_spawn_cooldown_and_order() {
    let source = ScriptedSpawns::new([
        (Approach::North, TurnIntent::Straight),
        (Approach::East, TurnIntent::Left),
        (Approach::South, TurnIntent::Right),
    ]);
    let mut intersection =
        Intersection::with_source(SimConfig::default(), Box::new(source)).unwrap();

    let mut spawn_ticks = Vec::new();
    for tick in 1..=200u64 {
        let report = intersection.tick();
        if let Some(id) = report.spawned {
            spawn_ticks.push((tick, id));
        }
    }

    // 1.5s cooldown at 50ms per tick
    assert_eq!(
        spawn_ticks,
        vec![(30, AgentId(0)), (60, AgentId(1)), (90, AgentId(2))]
    );

    let origins: Vec<_> = intersection.agents().iter().map(|a| a.origin).collect();
    assert_eq!(origins, vec![Approach::North, Approach::East, Approach::South]);
    assert_eq!(intersection.agent(AgentId(1)).unwrap().target, Approach::South);
    assert_eq!(intersection.agent(AgentId(2)).unwrap().target, Approach::East);
}

#[test]
fn test_spawned_vehicle_does_not_move_on_its_spawn_tick() {
    let source = ScriptedSpawns::new([(Approach::West, TurnIntent::Straight)]);
    let mut intersection =
        Intersection::with_source(SimConfig::default(), Box::new(source)).unwrap();

    intersection.run(29);
    let report = intersection.tick();
    let id = report.spawned.unwrap();
    let spawn_point = intersection.layout().spawn_point(Approach::West);
    assert_eq!(intersection.agent(id).unwrap().position, spawn_point);

    intersection.tick();
    assert!(intersection.agent(id).unwrap().position.x > spawn_point.x);
}

#[test]
fn test_speed_scales_with_multiplier() {
    let config = SimConfig {
        speed_multiplier: 3.5,
        auto_spawn: false,
        ..SimConfig::default()
    };
    let mut intersection = Intersection::new(config).unwrap();
    let id = intersection.spawn(Approach::South, TurnIntent::Left).unwrap();
    assert_eq!(intersection.agent(id).unwrap().speed, 3.5);

    intersection.set_speed_multiplier(1.0).unwrap();
    let id = intersection.spawn(Approach::North, TurnIntent::Left).unwrap();
    assert_eq!(intersection.agent(id).unwrap().speed, 1.0);

    // Existing vehicles keep their speed
    assert_eq!(intersection.agent(AgentId(0)).unwrap().speed, 3.5);
}

#[test]
fn test_random_source_distribution() {
    let mut source = RandomSpawns::with_seed(42);
    let mut origins: HashMap<Approach, usize> = HashMap::new();
    let mut straight = 0;
    let mut left = 0;
    let mut right = 0;
    let samples = 20_000;

    for _ in 0..samples {
        let plan = source.next_plan((0.8, 1.2)).unwrap();
        *origins.entry(plan.origin).or_default() += 1;
        match plan.intent {
            TurnIntent::Straight => straight += 1,
            TurnIntent::Left => left += 1,
            TurnIntent::Right => right += 1,
        }
        assert!((0.8..=1.2).contains(&plan.speed_factor));
    }

    let share = |count: usize| count as f64 / samples as f64;
    for approach in Approach::ALL {
        assert!((share(origins[&approach]) - 0.25).abs() < 0.02);
    }
    assert!((share(straight) - 0.5).abs() < 0.02);
    assert!((share(left) - 0.25).abs() < 0.02);
    assert!((share(right) - 0.25).abs() < 0.02);
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let mut a = Intersection::with_seed(SimConfig::default(), 7).unwrap();
    let mut b = Intersection::with_seed(SimConfig::default(), 7).unwrap();
    a.run(1500);
    b.run(1500);
    assert_eq!(a.snapshot(), b.snapshot());
    assert_eq!(a.stats(), b.stats());
}

#[test]
fn test_population_cap_is_respected() {
    let config = SimConfig {
        speed_multiplier: 0.5,
        ..SimConfig::default()
    };
    let mut intersection = Intersection::with_seed(config, 3).unwrap();

    for _ in 0..20_000 {
        intersection.tick();
        assert!(intersection.agents().len() <= 24);
    }
    assert!(intersection.stats().spawned > 24);
    assert!(intersection.stats().peak_population <= 24);
}

#[test]
fn test_small_population_cap() {
    let config = SimConfig {
        max_agents: 2,
        ..SimConfig::default()
    };
    let source = ScriptedSpawns::new([
        (Approach::North, TurnIntent::Straight),
        (Approach::East, TurnIntent::Straight),
        (Approach::South, TurnIntent::Straight),
        (Approach::West, TurnIntent::Straight),
    ]);
    let mut intersection = Intersection::with_source(config, Box::new(source)).unwrap();

    intersection.run(200);
    assert_eq!(intersection.agents().len(), 2);
    assert!(intersection.spawn(Approach::West, TurnIntent::Left).is_none());
}

#[test]
fn test_long_run_properties() {
    for seed in [1, 2, 3] {
        let config = SimConfig {
            speed_multiplier: 4.0,
            ..SimConfig::default()
        };
        let mut intersection = Intersection::with_seed(config, seed).unwrap();
        let mut turns: HashMap<AgentId, (u64, TurnProgress)> = HashMap::new();

        for tick in 1..=8_000u64 {
            intersection.tick();

            let snapshot = intersection.snapshot();
            assert!(snapshot.count_with_color(SignalColor::Green) <= 1);
            assert!(snapshot.vehicles.len() <= 24);
            assert_following_gap(&intersection, tick);

            for agent in intersection.agents() {
                match agent.motion {
                    MotionState::Turning(progress) => {
                        turns.entry(agent.id).or_insert((tick, progress));
                    }
                    MotionState::Straight => {
                        if let Some((started, progress)) = turns.remove(&agent.id) {
                            assert_eq!(tick - started, 20);
                            assert_eq!(agent.position, progress.end);
                        }
                    }
                }
            }
        }

        assert!(intersection.stats().turns_completed > 0);
        assert!(intersection.stats().exited > 0);
    }
}

#[test]
fn test_following_gap_holds_at_every_speed() {
    for (speed, seed) in [(0.5, 2), (2.0, 3), (3.5, 4), (5.0, 1)] {
        let config = SimConfig {
            speed_multiplier: speed,
            ..SimConfig::default()
        };
        let mut intersection = Intersection::with_seed(config, seed).unwrap();

        for tick in 1..=12_000u64 {
            intersection.tick();
            assert_following_gap(&intersection, tick);
        }
        assert!(intersection.stats().exited > 0);
    }
}

#[test]
fn test_speed_multiplier_validation() {
    assert_eq!(validate_speed_multiplier(2.5), Ok(2.5));
    assert_eq!(validate_speed_multiplier(0.5), Ok(0.5));
    assert_eq!(validate_speed_multiplier(5.0), Ok(5.0));

    assert!(matches!(
        validate_speed_multiplier(0.0),
        Err(ConfigurationError::SpeedMultiplierOutOfRange { .. })
    ));
    assert!(matches!(
        validate_speed_multiplier(-1.0),
        Err(ConfigurationError::SpeedMultiplierOutOfRange { .. })
    ));
    assert!(matches!(
        validate_speed_multiplier(5.5),
        Err(ConfigurationError::SpeedMultiplierOutOfRange { .. })
    ));
    assert!(matches!(
        validate_speed_multiplier(1.25),
        Err(ConfigurationError::SpeedMultiplierOffStep { .. })
    ));
    assert!(matches!(
        validate_speed_multiplier(f32::NAN),
        Err(ConfigurationError::SpeedMultiplierNotFinite(_))
    ));

    let config = SimConfig {
        speed_multiplier: 0.0,
        ..SimConfig::default()
    };
    assert!(Intersection::new(config).is_err());

    let mut intersection = Intersection::new(SimConfig::default()).unwrap();
    assert!(intersection.set_speed_multiplier(7.0).is_err());
    assert_eq!(intersection.config().speed_multiplier, 2.0);
}

#[test]
fn test_config_validation() {
    assert!(SimConfig::default().validate().is_ok());

    let shallow_band = SimConfig {
        stop_band_depth: 5.0,
        ..SimConfig::default()
    };
    assert!(matches!(
        shallow_band.validate(),
        Err(ConfigurationError::StopBandTooShallow { .. })
    ));

    let no_steps = SimConfig {
        turn_steps: 0,
        ..SimConfig::default()
    };
    assert_eq!(no_steps.validate(), Err(ConfigurationError::ZeroTurnSteps));

    for jitter in [
        (-1.2, -0.8),
        (0.0, 1.2),
        (1.2, 0.8),
        (f32::NAN, f32::NAN),
        (0.8, f32::NAN),
        (0.8, f32::INFINITY),
    ] {
        let config = SimConfig {
            speed_jitter: jitter,
            ..SimConfig::default()
        };
        assert!(
            matches!(
                config.validate(),
                Err(ConfigurationError::InvalidSpeedJitter { .. })
            ),
            "speed jitter {:?} was accepted",
            jitter
        );
        assert!(Intersection::with_seed(config, 1).is_err());
    }

    // A degenerate range is a fixed speed factor
    let fixed = SimConfig {
        speed_jitter: (1.0, 1.0),
        ..SimConfig::default()
    };
    let mut intersection = Intersection::with_seed(fixed, 1).unwrap();
    intersection.run(30);
    assert_eq!(intersection.agents()[0].speed, 2.0);
}

#[test]
fn test_reset_clears_vehicles_and_signals() {
    let mut intersection = Intersection::with_seed(SimConfig::default(), 11).unwrap();
    intersection.run(700);
    assert!(!intersection.agents().is_empty());

    intersection.reset();
    let snapshot = intersection.snapshot();
    assert!(snapshot.vehicles.is_empty());
    assert_eq!(snapshot.tick, 0);
    assert_eq!(snapshot.signal(Approach::North).color, SignalColor::Green);
    assert_eq!(snapshot.signal(Approach::North).remaining_seconds, 10);
    assert_eq!(intersection.stats().spawned, 0);

    // Cooldown restarts with the clock
    intersection.run(29);
    assert!(intersection.agents().is_empty());
    intersection.run(1);
    assert_eq!(intersection.agents().len(), 1);
}
