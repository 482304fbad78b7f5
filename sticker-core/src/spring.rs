//! Damped spring used to animate the rendered sticker size.
//!
//! The spring only drives what is drawn on screen. Logical transform state
//! jumps straight to its new value; [`SpringValue`] chases it over time.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Longest integration step. Larger frame times are split into sub-steps.
const MAX_STEP_SECS: f32 = 1.0 / 240.0;

/// Longest frame time simulated. The default spring settles well within it.
const MAX_FRAME_SECS: f32 = 4.0;

/// Physical parameters of the spring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringConfig {
    /// Spring constant.
    pub stiffness: f32,
    /// Damping coefficient.
    pub damping: f32,
    /// Mass of the animated value.
    pub mass: f32,
    /// Displacement below which the spring may come to rest.
    pub rest_displacement: f32,
    /// Speed (units per second) below which the spring may come to rest.
    pub rest_speed: f32,
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            stiffness: 100.0,
            damping: 10.0,
            mass: 1.0,
            rest_displacement: 0.01,
            rest_speed: 2.0,
        }
    }
}

/// A value that follows its target with spring dynamics.
#[derive(Debug, Clone, PartialEq)]
pub struct SpringValue {
    config: SpringConfig,
    value: f32,
    velocity: f32,
    target: f32,
}

impl SpringValue {
    /// Create a spring at rest at `initial`.
    #[must_use]
    pub fn new(initial: f32) -> Self {
        Self::with_config(initial, SpringConfig::default())
    }

    /// Create a spring at rest with custom parameters.
    #[must_use]
    pub fn with_config(initial: f32, config: SpringConfig) -> Self {
        Self {
            config,
            value: initial,
            velocity: 0.0,
            target: initial,
        }
    }

    /// Current animated value.
    #[must_use]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Value the spring is moving toward.
    #[must_use]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Current velocity in units per second.
    #[must_use]
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Retarget the spring, keeping its current value and velocity.
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Jump to `value` and stop.
    pub fn snap_to(&mut self, value: f32) {
        self.value = value;
        self.target = value;
        self.velocity = 0.0;
    }

    /// Whether the spring has come to rest at its target.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        (self.target - self.value).abs() < f32::EPSILON && self.velocity == 0.0
    }

    fn at_rest(&self) -> bool {
        (self.value - self.target).abs() < self.config.rest_displacement
            && self.velocity.abs() < self.config.rest_speed
    }

    /// Advance the simulation by `dt`. Returns the new value.
    ///
    /// Frame times beyond a few seconds are treated as a few seconds.
    pub fn step(&mut self, dt: Duration) -> f32 {
        if self.is_settled() {
            return self.value;
        }

        let secs = dt.as_secs_f32().min(MAX_FRAME_SECS);
        if secs <= 0.0 {
            return self.value;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let steps = (secs / MAX_STEP_SECS).ceil().max(1.0) as u32;
        #[allow(clippy::cast_precision_loss)]
        let h = secs / steps as f32;
        let SpringConfig {
            stiffness,
            damping,
            mass,
            ..
        } = self.config;
        let mass = mass.max(f32::EPSILON);

        for _ in 0..steps {
            let displacement = self.value - self.target;
            let accel = (-stiffness * displacement - damping * self.velocity) / mass;
            // Semi-implicit Euler: velocity first, then position.
            self.velocity += accel * h;
            self.value += self.velocity * h;
            if self.at_rest() {
                self.snap_to(self.target);
                break;
            }
        }

        self.value
    }
}
