//! Signal-phase controller
//!
//! Holds one phase per approach and rotates the green through the approaches in
//! cyclic order. Only the privileged approach is ever green or yellow.

use std::time::Duration;

use log::debug;

use super::clock::IntervalGate;
use super::config::{RedCountdown, SimConfig};
use super::types::{Approach, SignalColor};

/// Color and countdown of one approach's signal head
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalPhase {
    pub color: SignalColor,
    pub remaining_seconds: u32,
}

impl SignalPhase {
    pub fn new(color: SignalColor, remaining_seconds: u32) -> Self {
        Self {
            color,
            remaining_seconds,
        }
    }
}

/// Cyclic four-way signal controller
#[derive(Debug, Clone)]
pub struct SignalController {
    phases: [SignalPhase; 4],
    current: Approach,
    gate: IntervalGate,
    green_seconds: u32,
    yellow_seconds: u32,
    red_seconds: u32,
    red_countdown: RedCountdown,
}

impl SignalController {
    /// North starts green; the first firing is one period after `now`
    pub fn new(config: &SimConfig, now: Duration) -> Self {
        let mut controller = Self {
            phases: [SignalPhase::new(SignalColor::Red, config.red_seconds); 4],
            current: Approach::North,
            gate: IntervalGate::new(config.signal_period, now),
            green_seconds: config.green_seconds,
            yellow_seconds: config.yellow_seconds,
            red_seconds: config.red_seconds,
            red_countdown: config.red_countdown,
        };
        controller.reset(now);
        controller
    }

    /// Back to the default cyclic start state
    pub fn reset(&mut self, now: Duration) {
        self.current = Approach::North;
        self.phases = [SignalPhase::new(SignalColor::Red, self.red_seconds); 4];
        self.phases[self.current.index()] = SignalPhase::new(SignalColor::Green, self.green_seconds);
        self.refresh_red_countdowns();
        self.gate.rearm(now);
    }

    /// Advance all phases if a signal period has elapsed.
    /// Returns true when the controller fired.
    pub fn advance(&mut self, now: Duration) -> bool {
        if !self.gate.fire(now) {
            return false;
        }

        let mut hand_off = false;
        for phase in self.phases.iter_mut() {
            if phase.remaining_seconds > 0 {
                phase.remaining_seconds -= 1;
                continue;
            }
            match phase.color {
                SignalColor::Green => {
                    *phase = SignalPhase::new(SignalColor::Yellow, self.yellow_seconds);
                }
                SignalColor::Yellow => {
                    *phase = SignalPhase::new(SignalColor::Red, self.red_seconds);
                    hand_off = true;
                }
                SignalColor::Red => {}
            }
        }

        if hand_off {
            let previous = self.current;
            self.current = self.current.next();
            self.phases[self.current.index()] =
                SignalPhase::new(SignalColor::Green, self.green_seconds);
            self.refresh_red_countdowns();
            debug!("signal hand-off {} -> {} at {:?}", previous, self.current, now);
        }

        true
    }

    fn refresh_red_countdowns(&mut self) {
        if self.red_countdown != RedCountdown::Scheduled {
            return;
        }
        for approach in Approach::ALL {
            let steps = self.current.steps_to(approach);
            if steps == 0 {
                continue;
            }
            // The approach turns green on the firing that ends the
            // `steps`-th slot, so its countdown shows zero one firing before.
            let firings = steps as u32 * self.slot_firings();
            self.phases[approach.index()].remaining_seconds = firings - 1;
        }
    }

    /// Firings one approach spends green plus yellow
    pub fn slot_firings(&self) -> u32 {
        self.green_seconds + self.yellow_seconds + 2
    }

    pub fn phase(&self, approach: Approach) -> SignalPhase {
        self.phases[approach.index()]
    }

    pub fn phases(&self) -> &[SignalPhase; 4] {
        &self.phases
    }

    /// The approach currently holding the right of way
    pub fn current(&self) -> Approach {
        self.current
    }

    pub fn is_green(&self, approach: Approach) -> bool {
        self.phase(approach).color == SignalColor::Green
    }

    pub fn next_change(&self) -> Duration {
        self.gate.next_fire()
    }

    pub fn set_red_countdown(&mut self, policy: RedCountdown) {
        self.red_countdown = policy;
        self.refresh_red_countdowns();
    }
}
