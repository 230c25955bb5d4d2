//! Small timers shared by the entity rules

use serde::{Deserialize, Serialize};

use crate::consts::TIME_EPSILON;

/// Cumulative exposure to something (a fluid, a neighbour) that fires once
/// per full period while the exposure lasts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Exposure {
    elapsed: f64,
    engaged: bool,
}

impl Exposure {
    /// Advance by `t` seconds and return how many periods completed.
    ///
    /// Leaving the exposure resets the timer. With `first_contact`, the
    /// step that starts an exposure fires once immediately.
    pub fn advance(&mut self, exposed: bool, t: f64, period: f64, first_contact: bool) -> u32 {
        if !exposed {
            self.reset();
            return 0;
        }
        self.elapsed += t;
        if !self.engaged {
            self.engaged = true;
            if first_contact {
                self.elapsed = 0.0;
                return 1;
            }
        }
        let mut fired = 0;
        while self.elapsed >= period - TIME_EPSILON {
            self.elapsed -= period;
            fired += 1;
        }
        fired
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged
    }
}

/// Countdown that blocks an effect until it reaches zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cooldown {
    remaining: f64,
}

impl Cooldown {
    pub fn tick(&mut self, t: f64) {
        self.remaining = (self.remaining - t).max(0.0);
        if self.remaining <= TIME_EPSILON {
            self.remaining = 0.0;
        }
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.remaining == 0.0
    }

    pub fn arm(&mut self, duration: f64) {
        self.remaining = self.remaining.max(duration);
    }

    pub fn remaining(&self) -> f64 {
        self.remaining
    }
}

/// Countdown to a single event (lifetime, death linger)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Countdown {
    remaining: f64,
}

impl Countdown {
    pub fn new(duration: f64) -> Self {
        Self {
            remaining: duration,
        }
    }

    /// Consume `t` seconds; returns true once expired
    pub fn consume(&mut self, t: f64) -> bool {
        self.remaining -= t;
        self.is_expired()
    }

    pub fn is_expired(&self) -> bool {
        self.remaining <= TIME_EPSILON
    }

    pub fn remaining(&self) -> f64 {
        self.remaining.max(0.0)
    }
}
