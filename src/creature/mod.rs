//! Creatures and their physical bodies

mod ragdoll;

pub use ragdoll::{BodyShape, Limb, LimbSpec, LimbType, Ragdoll, ShapeKind, UnknownLimbType};

use glam::Vec2;
use hecs::Entity;

use crate::physics::Physics;

/// Runtime state of a creature the AI drives
#[derive(Debug, Clone)]
pub struct Creature {
    pub entity: Entity,
    pub name: String,
    pub ragdoll: Ragdoll,
    /// Vessel whose interior the creature is inside, if any
    pub inside_vessel: Option<Entity>,
    pub dead: bool,
}

impl Creature {
    pub fn new(entity: Entity, name: impl Into<String>, ragdoll: Ragdoll) -> Self {
        Self {
            entity,
            name: name.into(),
            ragdoll,
            inside_vessel: None,
            dead: false,
        }
    }

    /// Position of the main collider
    pub fn position(&self, physics: &Physics) -> Option<Vec2> {
        physics.get_position(self.ragdoll.collider)
    }

    /// Velocity of the main collider
    pub fn velocity(&self, physics: &Physics) -> Option<Vec2> {
        physics.get_linear_velocity(self.ragdoll.collider)
    }

    pub fn is_inside_vessel(&self) -> bool {
        self.inside_vessel.is_some()
    }
}
