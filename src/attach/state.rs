//! Attachment state

use std::fmt;

use glam::Vec2;
use hecs::Entity;

use crate::creature::LimbType;
use crate::physics::{ConstraintHandle, RigidBodyHandle};

/// A surface point a creature may latch onto
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttachTarget {
    /// Body the surface belongs to
    pub body: RigidBodyHandle,
    /// Vessel the point is relative to; world space when `None`
    pub vessel: Option<Entity>,
    pub point: Vec2,
    /// Outward surface normal at the point
    pub normal: Vec2,
}

/// Constraints holding a creature to a body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attachment {
    pub body: RigidBodyHandle,
    /// Anchor limb weld first, main collider weld second
    pub joints: [ConstraintHandle; 2],
    /// Facing of the anchor limb when the limb weld was last laid out
    pub joint_dir: f32,
}

/// Where a creature is in the attach cycle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LatchState {
    #[default]
    Unattached,
    /// Moving towards a wall point that is still out of reach
    Approaching { point: Vec2 },
    Attached(Attachment),
}

impl LatchState {
    pub fn name(&self) -> &'static str {
        match self {
            LatchState::Unattached => "Unattached",
            LatchState::Approaching { .. } => "Approaching",
            LatchState::Attached(_) => "Attached",
        }
    }
}

/// Why an attachment ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetachCause {
    /// Released by the host
    Requested,
    /// The creature went inside a vessel
    EnteredVessel,
    /// The behavior state no longer allows attaching
    StateChanged,
    /// The target body or wall point disappeared
    TargetLost,
    /// Moving away to approach a different point
    Repositioning,
    /// Replaced by an attachment to another body
    Retarget,
    /// Constraint anchors drifted apart
    Integrity,
    /// Shaken off by a fast-moving vessel
    ShakenOff,
    /// The creature died
    Death,
}

impl fmt::Display for DetachCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DetachCause::Requested => "requested",
            DetachCause::EnteredVessel => "entered vessel",
            DetachCause::StateChanged => "behavior state changed",
            DetachCause::TargetLost => "target lost",
            DetachCause::Repositioning => "repositioning",
            DetachCause::Retarget => "retargeting",
            DetachCause::Integrity => "anchor drift",
            DetachCause::ShakenOff => "shaken off",
            DetachCause::Death => "death",
        };
        f.write_str(text)
    }
}

/// Reasons an attach attempt can fail
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttachError {
    /// The target body no longer exists
    MissingTarget,
    /// The anchor limb is missing from the ragdoll or physics world
    MissingLimb(LimbType),
    /// The main collider body no longer exists
    MissingCollider,
    /// Attaching is suppressed after being shaken off
    CoolingDown { remaining: f32 },
    /// The creature is dead
    Dead,
}

impl fmt::Display for AttachError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTarget => write!(f, "attach target body no longer exists"),
            Self::MissingLimb(limb) => write!(f, "attach limb {limb} is missing"),
            Self::MissingCollider => write!(f, "main collider body is missing"),
            Self::CoolingDown { remaining } => {
                write!(f, "re-attach cooldown active ({remaining:.2} left)")
            }
            Self::Dead => write!(f, "creature is dead"),
        }
    }
}

impl std::error::Error for AttachError {}
