//! Miscellaneous utility structs and functions.

use std::fmt::Debug;

use cgmath::num_traits::Float;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An interval on the real number line.
#[derive(Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Interval<T> {
    pub min: T,
    pub max: T,
}

impl<T> Interval<T> {
    /// Creates a new interval.
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T: Float> Interval<T> {
    /// Restricts a value to lie within the interval.
    pub fn clamp(&self, value: T) -> T {
        value.max(self.min).min(self.max)
    }
}

impl<T: Debug> Debug for Interval<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Interval({:?}, {:?})", &self.min, &self.max)
    }
}

/// A timer which fires once every `period` seconds of simulated time.
///
/// The timer is checked once per step and re-arms as soon as it fires,
/// so it fires at most once per step regardless of the step size.
#[derive(Clone, Copy, Debug)]
pub struct RepeatingTimer {
    /// The time between firings in s.
    period: f64,
    /// The time since the timer last fired in s.
    elapsed: f64,
}

impl RepeatingTimer {
    /// Creates a timer that first fires once `period` has elapsed.
    pub fn new(period: f64) -> Self {
        Self {
            period,
            elapsed: 0.0,
        }
    }

    /// Advances the timer by `dt` seconds and returns `true` if it fired.
    pub fn tick(&mut self, dt: f64) -> bool {
        self.elapsed += dt;
        if self.elapsed < self.period {
            false
        } else {
            self.elapsed = 0.0;
            true
        }
    }
}
