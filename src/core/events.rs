//! Event queue for creature lifecycle and attachment notifications
//!
//! Gameplay systems push events during one tick and consumers (damage
//! resolution, effects, the attachment controllers themselves) read them on
//! the next. Creature death is delivered this way instead of through a
//! callback registered on the creature.
//!
//! # Example
//!
//! ```ignore
//! events.push(GameEvent::CreatureDied { entity });
//!
//! // next tick
//! events.swap();
//! let delivered: Vec<GameEvent> = events.drain().collect();
//! for event in &delivered {
//!     controller.handle_event(event, &mut physics, &mut events);
//! }
//! ```

use std::collections::VecDeque;

use glam::Vec2;
use hecs::Entity;

use crate::attach::DetachCause;
use crate::physics::RigidBodyHandle;

// ============================================================================
// Event Types
// ============================================================================

/// Game events for inter-system communication.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum GameEvent {
    /// A creature took damage.
    CreatureDamaged {
        /// The damaged creature
        entity: Entity,
        /// World position the damage was applied at
        position: Vec2,
        /// Amount of damage dealt
        amount: f32,
        /// Stun duration
        stun: f32,
    },

    /// A creature died. Controllers owned by it release everything.
    CreatureDied {
        /// The dead creature
        entity: Entity,
    },

    /// A creature latched onto a body.
    Attached {
        /// The latching creature
        entity: Entity,
        /// Body it is welded to
        target: RigidBodyHandle,
        /// World-space attach point
        point: Vec2,
    },

    /// A creature let go of the body it was latched onto.
    Detached {
        /// The creature
        entity: Entity,
        /// Why the attachment ended
        cause: DetachCause,
    },
}

// ============================================================================
// Event Queue
// ============================================================================

/// Double-buffered event queue.
///
/// Events pushed during tick N are readable during tick N+1.
#[derive(Debug)]
pub struct EventQueue {
    /// Events being written this tick
    pending: VecDeque<GameEvent>,
    /// Events from previous tick, ready for processing
    processing: VecDeque<GameEvent>,
}

impl EventQueue {
    const DEFAULT_CAPACITY: usize = 32;

    /// Create a new event queue with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: VecDeque::with_capacity(Self::DEFAULT_CAPACITY),
            processing: VecDeque::with_capacity(Self::DEFAULT_CAPACITY),
        }
    }

    /// Push an event to be processed next tick.
    #[inline]
    pub fn push(&mut self, event: GameEvent) {
        self.pending.push_back(event);
    }

    /// Swap the pending and processing queues. Call once per tick.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.pending, &mut self.processing);
        self.pending.clear();
    }

    /// Iterate over events from the previous tick.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &GameEvent> {
        self.processing.iter()
    }

    /// Drain all events from the previous tick.
    #[inline]
    pub fn drain(&mut self) -> impl Iterator<Item = GameEvent> + '_ {
        self.processing.drain(..)
    }

    /// Events written this tick that are not yet readable.
    #[inline]
    pub fn pending(&self) -> impl Iterator<Item = &GameEvent> {
        self.pending.iter()
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.processing.is_empty()
    }

    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.processing.len()
    }

    #[must_use]
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Clear all events (both pending and processing).
    pub fn clear(&mut self) {
        self.pending.clear();
        self.processing.clear();
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
