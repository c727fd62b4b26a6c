//! Articulated creature bodies

use std::fmt;
use std::str::FromStr;

use glam::Vec2;
use hecs::Entity;
use smallvec::SmallVec;

use crate::physics::{Physics, RigidBodyHandle};

/// Which part of the body a limb is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimbType {
    Head,
    Torso,
    Tail,
    Jaw,
    LeftArm,
    RightArm,
    LeftHand,
    RightHand,
    LeftLeg,
    RightLeg,
    LeftFoot,
    RightFoot,
}

impl LimbType {
    /// All limb types, used for name lookup
    pub const ALL: [LimbType; 12] = [
        LimbType::Head,
        LimbType::Torso,
        LimbType::Tail,
        LimbType::Jaw,
        LimbType::LeftArm,
        LimbType::RightArm,
        LimbType::LeftHand,
        LimbType::RightHand,
        LimbType::LeftLeg,
        LimbType::RightLeg,
        LimbType::LeftFoot,
        LimbType::RightFoot,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LimbType::Head => "Head",
            LimbType::Torso => "Torso",
            LimbType::Tail => "Tail",
            LimbType::Jaw => "Jaw",
            LimbType::LeftArm => "LeftArm",
            LimbType::RightArm => "RightArm",
            LimbType::LeftHand => "LeftHand",
            LimbType::RightHand => "RightHand",
            LimbType::LeftLeg => "LeftLeg",
            LimbType::RightLeg => "RightLeg",
            LimbType::LeftFoot => "LeftFoot",
            LimbType::RightFoot => "RightFoot",
        }
    }
}

impl fmt::Display for LimbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a limb name doesn't match any limb type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLimbType(pub String);

impl fmt::Display for UnknownLimbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown limb type: {:?}", self.0)
    }
}

impl std::error::Error for UnknownLimbType {}

impl FromStr for LimbType {
    type Err = UnknownLimbType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        LimbType::ALL
            .into_iter()
            .find(|limb| limb.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownLimbType(s.to_string()))
    }
}

/// Outline of a collision body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Circle,
    /// Capsule along the local Y axis
    Capsule,
    /// Capsule along the local X axis
    HorizontalCapsule,
    Rectangle,
}

/// Dimensions of a collision body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyShape {
    pub kind: ShapeKind,
    pub radius: f32,
    pub width: f32,
    pub height: f32,
}

impl BodyShape {
    pub fn circle(radius: f32) -> Self {
        Self {
            kind: ShapeKind::Circle,
            radius,
            width: 0.0,
            height: 0.0,
        }
    }

    pub fn capsule(radius: f32, height: f32) -> Self {
        Self {
            kind: ShapeKind::Capsule,
            radius,
            width: 0.0,
            height,
        }
    }

    pub fn horizontal_capsule(radius: f32, width: f32) -> Self {
        Self {
            kind: ShapeKind::HorizontalCapsule,
            radius,
            width,
            height: 0.0,
        }
    }

    pub fn rectangle(width: f32, height: f32) -> Self {
        Self {
            kind: ShapeKind::Rectangle,
            radius: 0.0,
            width,
            height,
        }
    }

    /// Point at the front end of the shape in local space
    pub fn local_front(&self) -> Vec2 {
        match self.kind {
            ShapeKind::Circle => Vec2::new(0.0, self.radius),
            ShapeKind::Capsule => Vec2::new(0.0, self.height * 0.5 + self.radius),
            ShapeKind::HorizontalCapsule => Vec2::new(self.width * 0.5 + self.radius, 0.0),
            ShapeKind::Rectangle => Vec2::new(0.0, self.height * 0.5),
        }
    }

    /// Largest of radius, width and height
    pub fn max_dimension(&self) -> f32 {
        self.radius.max(self.width).max(self.height)
    }

    fn add_collider(&self, physics: &mut Physics, body: RigidBodyHandle, density: f32) {
        match self.kind {
            ShapeKind::Circle => {
                physics.add_ball_collider(body, self.radius, density);
            }
            ShapeKind::Capsule => {
                physics.add_capsule_collider(body, self.height * 0.5, self.radius, density);
            }
            // Approximated by its bounds
            ShapeKind::HorizontalCapsule => {
                let half = Vec2::new(self.width * 0.5 + self.radius, self.radius);
                physics.add_box_collider(body, half, density);
            }
            ShapeKind::Rectangle => {
                let half = Vec2::new(self.width * 0.5, self.height * 0.5);
                physics.add_box_collider(body, half, density);
            }
        }
    }
}

/// One articulated body part
#[derive(Debug, Clone, Copy)]
pub struct Limb {
    pub kind: LimbType,
    pub body: RigidBodyHandle,
    /// Facing direction, +1 right or -1 left
    pub dir: f32,
}

/// Description of a limb to spawn, relative to the main collider
#[derive(Debug, Clone, Copy)]
pub struct LimbSpec {
    pub kind: LimbType,
    pub offset: Vec2,
    pub radius: f32,
}

/// The physical body of a creature: a main collider plus limbs
#[derive(Debug, Clone)]
pub struct Ragdoll {
    /// Main collision body the creature moves with
    pub collider: RigidBodyHandle,
    pub collider_shape: BodyShape,
    limbs: SmallVec<[Limb; 8]>,
    main_limb: LimbType,
    /// Scale applied to limb-space offsets
    pub limb_scale: f32,
}

impl Ragdoll {
    /// Spawn a ragdoll's bodies. The first limb is the main limb.
    pub fn spawn(
        physics: &mut Physics,
        owner: Option<Entity>,
        position: Vec2,
        collider_shape: BodyShape,
        limbs: &[LimbSpec],
    ) -> Self {
        let collider = physics.create_dynamic_body(position, 0.0, owner);
        collider_shape.add_collider(physics, collider, 1.0);

        let limbs: SmallVec<[Limb; 8]> = limbs
            .iter()
            .map(|spec| {
                let body = physics.create_dynamic_body(position + spec.offset, 0.0, owner);
                physics.add_ball_collider(body, spec.radius, 1.0);
                Limb {
                    kind: spec.kind,
                    body,
                    dir: 1.0,
                }
            })
            .collect();

        let main_limb = limbs.first().map_or(LimbType::Torso, |limb| limb.kind);

        Self {
            collider,
            collider_shape,
            limbs,
            main_limb,
            limb_scale: 1.0,
        }
    }

    /// Set the limb scale
    #[must_use]
    pub fn with_limb_scale(mut self, scale: f32) -> Self {
        self.limb_scale = scale;
        self
    }

    pub fn limb(&self, kind: LimbType) -> Option<&Limb> {
        self.limbs.iter().find(|limb| limb.kind == kind)
    }

    pub fn limbs(&self) -> &[Limb] {
        &self.limbs
    }

    pub fn main_limb_type(&self) -> LimbType {
        self.main_limb
    }

    pub fn main_limb(&self) -> Option<&Limb> {
        self.limb(self.main_limb)
    }

    /// Turn every limb to face `dir`
    pub fn set_dir(&mut self, dir: f32) {
        for limb in &mut self.limbs {
            limb.dir = dir;
        }
    }

    /// Facing of the main limb
    pub fn dir(&self) -> f32 {
        self.main_limb().map_or(1.0, |limb| limb.dir)
    }

    /// Every body this ragdoll consists of
    pub fn bodies(&self) -> impl Iterator<Item = RigidBodyHandle> + '_ {
        std::iter::once(self.collider).chain(self.limbs.iter().map(|limb| limb.body))
    }
}
