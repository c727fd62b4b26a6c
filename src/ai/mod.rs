//! AI module
//!
//! The host behavior contract the attachment controller consumes, steering
//! behaviors, and a concrete host for hostile creatures.

mod enemy;
mod host;
mod steering;

pub use enemy::EnemyAi;
pub use host::{AiState, AttackingLimb, HostBehavior};
pub use steering::{Flee, Seek, SteeringBehavior, SteeringManager, SteeringOutput};
