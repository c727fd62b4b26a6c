//! Steering behaviors for AI movement
//!
//! Classic steering behaviors in the simulation plane, and a manager that
//! accumulates them into a single steering vector per tick.

use glam::Vec2;

/// Output from a steering behavior
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SteeringOutput {
    /// Linear acceleration
    pub linear: Vec2,
}

impl SteeringOutput {
    /// Zero steering
    pub const ZERO: Self = Self { linear: Vec2::ZERO };

    /// Combine with another steering output
    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        Self {
            linear: self.linear + other.linear,
        }
    }

    /// Scale the output
    #[must_use]
    pub fn scale(self, factor: f32) -> Self {
        Self {
            linear: self.linear * factor,
        }
    }
}

/// Trait for steering behaviors
pub trait SteeringBehavior {
    /// Calculate steering based on agent state
    fn calculate(&self, position: Vec2, velocity: Vec2) -> SteeringOutput;
}

/// Seek behavior - move towards target
#[derive(Debug, Clone)]
pub struct Seek {
    pub target: Vec2,
    pub max_acceleration: f32,
}

impl Seek {
    #[must_use]
    pub fn new(target: Vec2, max_acceleration: f32) -> Self {
        Self {
            target,
            max_acceleration,
        }
    }
}

impl SteeringBehavior for Seek {
    fn calculate(&self, position: Vec2, _velocity: Vec2) -> SteeringOutput {
        let direction = (self.target - position).normalize_or_zero();
        SteeringOutput {
            linear: direction * self.max_acceleration,
        }
    }
}

/// Flee behavior - move away from target
#[derive(Debug, Clone)]
pub struct Flee {
    pub target: Vec2,
    pub max_acceleration: f32,
}

impl Flee {
    #[must_use]
    pub fn new(target: Vec2, max_acceleration: f32) -> Self {
        Self {
            target,
            max_acceleration,
        }
    }
}

impl SteeringBehavior for Flee {
    fn calculate(&self, position: Vec2, _velocity: Vec2) -> SteeringOutput {
        let direction = (position - self.target).normalize_or_zero();
        SteeringOutput {
            linear: direction * self.max_acceleration,
        }
    }
}

/// Accumulates steering requests for one agent
#[derive(Debug, Clone)]
pub struct SteeringManager {
    /// Maximum acceleration of a single behavior
    pub max_acceleration: f32,
    steering: SteeringOutput,
}

impl SteeringManager {
    #[must_use]
    pub fn new(max_acceleration: f32) -> Self {
        Self {
            max_acceleration,
            steering: SteeringOutput::ZERO,
        }
    }

    /// Drop all accumulated steering
    pub fn reset(&mut self) {
        self.steering = SteeringOutput::ZERO;
    }

    /// Steer towards a point
    pub fn seek(&mut self, position: Vec2, velocity: Vec2, target: Vec2) {
        let output = Seek::new(target, self.max_acceleration).calculate(position, velocity);
        self.steering = self.steering.combine(output);
    }

    /// Steer away from obstacles that lie within `lookahead` of the point
    /// the agent is heading towards, weighted by `weight`
    pub fn avoid(
        &mut self,
        position: Vec2,
        velocity: Vec2,
        obstacles: &[Vec2],
        lookahead: f32,
        weight: f32,
    ) {
        let ahead = position + velocity.normalize_or_zero() * lookahead;

        for &obstacle in obstacles {
            if obstacle.distance(ahead) <= lookahead {
                let output = Flee::new(obstacle, self.max_acceleration).calculate(position, velocity);
                self.steering = self.steering.combine(output.scale(weight));
            }
        }
    }

    /// Accumulated steering this tick
    pub fn steering(&self) -> Vec2 {
        self.steering.linear
    }
}
