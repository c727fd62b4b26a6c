//! The behavior layer an attachment controller serves

use glam::Vec2;

/// High-level behavior state of a creature's AI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AiState {
    #[default]
    Idle,
    Attack,
    Escape,
    Eat,
    Patrol,
}

/// The limb a creature is currently striking with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackingLimb {
    pub world_position: Vec2,
    /// Distance within which the strike lands
    pub damage_range: f32,
}

/// Behavior controller that owns the creature's AI state and locomotion.
///
/// The attachment controller reads the state each tick and calls back into
/// steering when it needs to move the creature towards a wall.
pub trait HostBehavior {
    fn state(&self) -> AiState;

    fn attacking_limb(&self) -> Option<AttackingLimb>;

    /// Whether the creature is currently squeezing through a gap
    fn is_steering_through_gap(&self) -> bool {
        false
    }

    fn steering_reset(&mut self);

    fn steering_avoid(&mut self, delta_time: f32, lookahead: f32, weight: f32);

    fn steering_seek(&mut self, target: Vec2);
}
