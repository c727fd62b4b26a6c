//! Latching creature AI for a 2D physics sandbox
//!
//! This crate provides:
//! - An attachment controller that welds creatures onto walls and vessels
//! - Planar physics on top of rapier3d
//! - Entity Component System (ECS) bookkeeping with hecs
//! - Grid-indexed level geometry and steering behaviors

pub mod ai;
pub mod attach;
pub mod core;
pub mod creature;
pub mod ecs;
pub mod level;
pub mod physics;

// Re-exports for convenience
pub use glam;
pub use hecs;
pub use rapier3d;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::ai::{AiState, AttackingLimb, EnemyAi, HostBehavior};
    pub use crate::attach::{
        AttachConfig, AttachContext, AttachTarget, AttachmentController, DetachCause, LatchState,
    };
    pub use crate::core::{EventQueue, GameEvent};
    pub use crate::creature::{BodyShape, Creature, LimbSpec, LimbType, Ragdoll};
    pub use crate::ecs::{Health, Name, Vessel, VesselMember, World};
    pub use crate::level::{Level, SpatialQuery};
    pub use crate::physics::{ConstraintHandle, Physics, RigidBodyHandle};
    pub use glam::Vec2;
}
