//! Physics simulation module
//!
//! Built on top of rapier3d, constrained to the XY plane

mod world;

pub use world::{ColliderHandle, ConstraintHandle, Physics, RigidBodyHandle, WeldConfig, WeldInfo};
