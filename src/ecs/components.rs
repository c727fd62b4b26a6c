//! Common ECS components

use hecs::Entity;

use crate::physics::RigidBodyHandle;

/// Name component for debugging and log messages
#[derive(Debug, Clone)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// A vessel whose hull is simulated by a single rigid body
#[derive(Debug, Clone, Copy)]
pub struct Vessel {
    /// Hull body; its position and velocity are the vessel's
    pub body: RigidBodyHandle,
}

/// Marks an entity as belonging to a vessel (hull segments, fixtures)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VesselMember(pub Entity);

/// Accumulated damage and stun on a creature
#[derive(Debug, Clone, Copy, Default)]
pub struct Health {
    /// Total damage taken
    pub damage: f32,
    /// Remaining stun time
    pub stun: f32,
}

impl Health {
    /// Apply damage and extend the stun timer
    pub fn apply(&mut self, amount: f32, stun: f32) {
        self.damage += amount;
        self.stun = self.stun.max(stun);
    }

    /// Count down the stun timer
    pub fn tick(&mut self, dt: f32) {
        self.stun = (self.stun - dt).max(0.0);
    }

    /// Check if the creature is stunned
    pub fn is_stunned(&self) -> bool {
        self.stun > 0.0
    }
}
