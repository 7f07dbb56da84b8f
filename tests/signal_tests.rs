//! Signal controller behaviour: start state, transition table, exclusivity
//! and the cyclic hand-off order

use std::time::Duration;

use intersection_sim::simulation::{
    Approach, Intersection, RedCountdown, SignalColor, SignalController, SignalPhase, SimConfig,
};

fn controller(policy: RedCountdown) -> SignalController {
    let config = SimConfig {
        red_countdown: policy,
        ..SimConfig::default()
    };
    SignalController::new(&config, Duration::ZERO)
}

fn fire(controller: &mut SignalController, second: u64) {
    assert!(controller.advance(Duration::from_secs(second)));
}

#[test]
fn test_start_state_fixed_policy() {
    let signals = controller(RedCountdown::Fixed);
    assert_eq!(
        signals.phase(Approach::North),
        SignalPhase::new(SignalColor::Green, 10)
    );
    for approach in [Approach::East, Approach::South, Approach::West] {
        assert_eq!(signals.phase(approach), SignalPhase::new(SignalColor::Red, 12));
    }
}

#[test]
fn test_start_state_scheduled_policy() {
    let signals = controller(RedCountdown::Scheduled);
    assert_eq!(signals.current(), Approach::North);
    assert_eq!(signals.phase(Approach::East).remaining_seconds, 13);
    assert_eq!(signals.phase(Approach::South).remaining_seconds, 27);
    assert_eq!(signals.phase(Approach::West).remaining_seconds, 41);
}

#[test]
fn test_advance_is_gated_to_once_per_second() {
    let mut signals = controller(RedCountdown::Fixed);

    assert!(!signals.advance(Duration::from_millis(999)));
    assert_eq!(signals.phase(Approach::North).remaining_seconds, 10);

    assert!(signals.advance(Duration::from_secs(1)));
    assert_eq!(signals.phase(Approach::North).remaining_seconds, 9);

    // Next deadline is measured from the firing
    assert!(!signals.advance(Duration::from_millis(1500)));
    assert!(signals.advance(Duration::from_secs(2)));
    assert_eq!(signals.phase(Approach::North).remaining_seconds, 8);
}

#[test]
fn test_transition_table() {
    let mut signals = controller(RedCountdown::Fixed);

    for second in 1..=10 {
        fire(&mut signals, second);
    }
    assert_eq!(
        signals.phase(Approach::North),
        SignalPhase::new(SignalColor::Green, 0)
    );

    fire(&mut signals, 11);
    assert_eq!(
        signals.phase(Approach::North),
        SignalPhase::new(SignalColor::Yellow, 2)
    );
    assert!(!signals.is_green(Approach::East));

    fire(&mut signals, 12);
    fire(&mut signals, 13);
    assert_eq!(
        signals.phase(Approach::North),
        SignalPhase::new(SignalColor::Yellow, 0)
    );

    fire(&mut signals, 14);
    assert_eq!(
        signals.phase(Approach::North),
        SignalPhase::new(SignalColor::Red, 12)
    );
    assert_eq!(
        signals.phase(Approach::East),
        SignalPhase::new(SignalColor::Green, 10)
    );
    assert_eq!(signals.current(), Approach::East);
}

#[test]
fn test_fixed_red_holds_at_zero() {
    let mut signals = controller(RedCountdown::Fixed);
    for second in 1..=13 {
        fire(&mut signals, second);
    }
    // South has been red for 13 firings with a 12 second countdown
    assert_eq!(
        signals.phase(Approach::South),
        SignalPhase::new(SignalColor::Red, 0)
    );
}

#[test]
fn test_scheduled_red_counts_down_to_its_green() {
    let mut signals = controller(RedCountdown::Scheduled);
    let mut previous = *signals.phases();

    for second in 1..=600 {
        fire(&mut signals, second);
        let phases = *signals.phases();

        for approach in Approach::ALL {
            let before = previous[approach.index()];
            let after = phases[approach.index()];
            match (before.color, after.color) {
                (SignalColor::Red, SignalColor::Red) => {
                    assert_eq!(
                        after.remaining_seconds + 1,
                        before.remaining_seconds,
                        "{} red countdown stalled at {}s",
                        approach,
                        second
                    );
                }
                (SignalColor::Red, SignalColor::Green) => {
                    assert_eq!(before.remaining_seconds, 0);
                }
                _ => {}
            }
        }
        previous = phases;
    }
}

#[test]
fn test_exclusive_green_and_cyclic_order() {
    for policy in [RedCountdown::Fixed, RedCountdown::Scheduled] {
        let mut signals = controller(policy);
        let mut greens = vec![signals.current()];

        for second in 1..=1000 {
            fire(&mut signals, second);

            let active = signals
                .phases()
                .iter()
                .filter(|p| p.color != SignalColor::Red)
                .count();
            let green = signals
                .phases()
                .iter()
                .filter(|p| p.color == SignalColor::Green)
                .count();
            assert_eq!(active, 1, "exactly one approach may be green or yellow");
            assert!(green <= 1);

            if *greens.last().unwrap() != signals.current() {
                greens.push(signals.current());
            }
        }

        // 1000 seconds at 14 seconds per slot
        assert_eq!(greens.len(), 1 + 1000 / 14);
        for (i, approach) in greens.iter().enumerate() {
            assert_eq!(*approach, Approach::from_index(i));
        }
    }
}

#[test]
fn test_reset_restores_start_state() {
    let mut signals = controller(RedCountdown::Scheduled);
    for second in 1..=30 {
        fire(&mut signals, second);
    }
    assert_eq!(signals.current(), Approach::South);

    signals.reset(Duration::from_secs(30));
    assert_eq!(signals.current(), Approach::North);
    assert_eq!(
        signals.phase(Approach::North),
        SignalPhase::new(SignalColor::Green, 10)
    );
    assert_eq!(signals.next_change(), Duration::from_secs(31));
}

#[test]
fn test_example_scenario_on_the_tick_clock() {
    let config = SimConfig {
        auto_spawn: false,
        ..SimConfig::default()
    };
    let mut intersection = Intersection::new(config).unwrap();

    // 20 ticks of 50ms per logical second
    intersection.run(200);
    assert_eq!(intersection.now(), Duration::from_secs(10));
    let snapshot = intersection.snapshot();
    assert_eq!(snapshot.signal(Approach::North).color, SignalColor::Green);
    assert_eq!(snapshot.signal(Approach::North).remaining_seconds, 0);

    intersection.run(20);
    let snapshot = intersection.snapshot();
    assert_eq!(snapshot.signal(Approach::North).color, SignalColor::Yellow);
    assert_eq!(snapshot.signal(Approach::North).remaining_seconds, 2);
    assert_eq!(snapshot.signal(Approach::East).color, SignalColor::Red);

    intersection.run(60);
    let snapshot = intersection.snapshot();
    assert_eq!(snapshot.signal(Approach::North).color, SignalColor::Red);
    assert_eq!(snapshot.signal(Approach::East).color, SignalColor::Green);
    assert_eq!(snapshot.signal(Approach::East).remaining_seconds, 10);
    assert_eq!(intersection.stats().signal_hand_offs, 1);
}
