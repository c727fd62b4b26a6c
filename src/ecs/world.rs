//! World wrapper around hecs

use glam::Vec2;
use hecs::Entity;

use super::components::{Health, Name, Vessel, VesselMember};
use crate::physics::{Physics, RigidBodyHandle};

/// Game world containing vessels, creatures and other entities
pub struct World {
    /// The underlying hecs world
    pub inner: hecs::World,
}

impl World {
    /// Create a new empty world
    pub fn new() -> Self {
        Self {
            inner: hecs::World::new(),
        }
    }

    /// Spawn an entity with the given components
    pub fn spawn(&mut self, components: impl hecs::DynamicBundle) -> Entity {
        self.inner.spawn(components)
    }

    /// Despawn an entity
    pub fn despawn(&mut self, entity: Entity) -> Result<(), hecs::NoSuchEntity> {
        self.inner.despawn(entity)
    }

    /// Check if an entity exists
    pub fn contains(&self, entity: Entity) -> bool {
        self.inner.contains(entity)
    }

    /// Spawn a named vessel around an existing hull body and make the
    /// vessel the body's owner
    pub fn spawn_vessel(
        &mut self,
        physics: &mut Physics,
        name: impl Into<String>,
        body: RigidBodyHandle,
    ) -> Entity {
        let vessel = self.inner.spawn((Name::new(name), Vessel { body }));
        physics.set_body_owner(body, Some(vessel));
        vessel
    }

    /// Vessel an entity belongs to.
    ///
    /// A vessel is its own vessel; any other entity resolves through its
    /// `VesselMember` component.
    pub fn vessel_of(&self, entity: Entity) -> Option<Entity> {
        if self.inner.satisfies::<&Vessel>(entity).unwrap_or(false) {
            return Some(entity);
        }

        let member = self.inner.get::<&VesselMember>(entity).ok()?;
        let vessel = member.0;
        self.inner
            .satisfies::<&Vessel>(vessel)
            .unwrap_or(false)
            .then_some(vessel)
    }

    /// Hull body of a vessel
    pub fn vessel_body(&self, vessel: Entity) -> Option<RigidBodyHandle> {
        self.inner.get::<&Vessel>(vessel).ok().map(|v| v.body)
    }

    /// Current position of a vessel
    pub fn vessel_position(&self, vessel: Entity, physics: &Physics) -> Option<Vec2> {
        physics.get_position(self.vessel_body(vessel)?)
    }

    /// Current velocity of a vessel
    pub fn vessel_velocity(&self, vessel: Entity, physics: &Physics) -> Option<Vec2> {
        physics.get_linear_velocity(self.vessel_body(vessel)?)
    }

    /// Display name of an entity, or a placeholder
    pub fn name_of(&self, entity: Entity) -> String {
        self.inner
            .get::<&Name>(entity)
            .map(|name| name.0.clone())
            .unwrap_or_else(|_| format!("{entity:?}"))
    }

    /// Apply damage and stun to an entity with a `Health` component
    pub fn apply_damage(&mut self, entity: Entity, amount: f32, stun: f32) -> bool {
        match self.inner.get::<&mut Health>(entity) {
            Ok(mut health) => {
                health.apply(amount, stun);
                true
            }
            Err(_) => false,
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
