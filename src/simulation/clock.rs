//! Logical clock and the gates that pace subsystems off it
//!
//! Time only moves when the loop calls [`SimulationClock::advance`], one fixed
//! interval per tick, so a run is reproducible no matter how fast it is driven.

use std::time::Duration;

/// Fixed-cadence logical clock
#[derive(Debug, Clone)]
pub struct SimulationClock {
    tick_interval: Duration,
    now: Duration,
    ticks: u64,
}

impl SimulationClock {
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            tick_interval,
            now: Duration::ZERO,
            ticks: 0,
        }
    }

    /// Step one tick and return the new logical time
    pub fn advance(&mut self) -> Duration {
        self.ticks += 1;
        self.now += self.tick_interval;
        self.now
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn reset(&mut self) {
        self.now = Duration::ZERO;
        self.ticks = 0;
    }
}

/// Fires at most once per period; the next deadline is measured from the firing
#[derive(Debug, Clone)]
pub struct IntervalGate {
    period: Duration,
    next_fire: Duration,
}

impl IntervalGate {
    /// First firing is one period after `now`
    pub fn new(period: Duration, now: Duration) -> Self {
        Self {
            period,
            next_fire: now + period,
        }
    }

    /// Returns true and reschedules if the deadline has passed
    pub fn fire(&mut self, now: Duration) -> bool {
        if now < self.next_fire {
            return false;
        }
        self.next_fire = now + self.period;
        true
    }

    pub fn next_fire(&self) -> Duration {
        self.next_fire
    }

    pub fn rearm(&mut self, now: Duration) {
        self.next_fire = now + self.period;
    }
}

/// Open once `cooldown` has passed since the last recorded success
#[derive(Debug, Clone)]
pub struct CooldownGate {
    cooldown: Duration,
    last: Duration,
}

impl CooldownGate {
    pub fn new(cooldown: Duration, now: Duration) -> Self {
        Self {
            cooldown,
            last: now,
        }
    }

    pub fn is_open(&self, now: Duration) -> bool {
        now.saturating_sub(self.last) >= self.cooldown
    }

    pub fn record(&mut self, now: Duration) {
        self.last = now;
    }

    pub fn last(&self) -> Duration {
        self.last
    }
}
