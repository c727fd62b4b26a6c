//! A simple host behavior for hostile creatures

use glam::Vec2;

use super::host::{AiState, AttackingLimb, HostBehavior};
use super::steering::SteeringManager;

/// Behavior state and locomotion of a hostile creature.
///
/// The owner syncs the creature's kinematic state and nearby obstacles in
/// before the attachment controller runs, and reads `steering()` after.
#[derive(Debug, Clone)]
pub struct EnemyAi {
    pub state: AiState,
    pub attacking_limb: Option<AttackingLimb>,
    pub steering_through_gap: bool,
    steering: SteeringManager,
    position: Vec2,
    velocity: Vec2,
    obstacles: Vec<Vec2>,
}

impl EnemyAi {
    #[must_use]
    pub fn new(max_acceleration: f32) -> Self {
        Self {
            state: AiState::Idle,
            attacking_limb: None,
            steering_through_gap: false,
            steering: SteeringManager::new(max_acceleration),
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            obstacles: Vec::new(),
        }
    }

    /// Update the creature's kinematic state
    pub fn sync(&mut self, position: Vec2, velocity: Vec2) {
        self.position = position;
        self.velocity = velocity;
    }

    /// Replace the obstacles avoidance steers around
    pub fn set_obstacles(&mut self, obstacles: impl IntoIterator<Item = Vec2>) {
        self.obstacles.clear();
        self.obstacles.extend(obstacles);
    }

    /// Steering accumulated this tick
    pub fn steering(&self) -> Vec2 {
        self.steering.steering()
    }
}

impl HostBehavior for EnemyAi {
    fn state(&self) -> AiState {
        self.state
    }

    fn attacking_limb(&self) -> Option<AttackingLimb> {
        self.attacking_limb
    }

    fn is_steering_through_gap(&self) -> bool {
        self.steering_through_gap
    }

    fn steering_reset(&mut self) {
        self.steering.reset();
    }

    fn steering_avoid(&mut self, _delta_time: f32, lookahead: f32, weight: f32) {
        self.steering
            .avoid(self.position, self.velocity, &self.obstacles, lookahead, weight);
    }

    fn steering_seek(&mut self, target: Vec2) {
        self.steering.seek(self.position, self.velocity, target);
    }
}
