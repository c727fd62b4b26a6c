//! Planar physics simulation using rapier3d
//!
//! Everything lives in the XY plane: bodies are locked to it and rotate
//! only about Z, so positions are exchanged as `Vec2` and orientations as a
//! single angle in radians.

use glam::Vec2;
use hecs::Entity;
use rapier3d::prelude::*;
use rustc_hash::FxHashMap;

/// Handle to a rigid body in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RigidBodyHandle(pub rapier3d::dynamics::RigidBodyHandle);

/// Handle to a collider in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColliderHandle(pub rapier3d::geometry::ColliderHandle);

/// Handle to a weld constraint in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintHandle(pub ImpulseJointHandle);

/// Softness and coupling settings of a weld constraint.
///
/// rapier solves every impulse joint with one world-wide softness, so the
/// frequency and damping of the most recently added weld apply to all
/// welds in the world. See [`Physics::joint_softness`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeldConfig {
    /// Spring frequency in Hz
    pub frequency: f32,
    /// Damping ratio of the spring
    pub damping_ratio: f32,
    /// Body B is treated as immovable by this constraint. A dynamic body B
    /// is then followed by a kinematic proxy the weld attaches to instead.
    pub kinematic_b: bool,
    /// Whether the two welded bodies still collide with each other
    pub collide_connected: bool,
}

impl Default for WeldConfig {
    fn default() -> Self {
        Self {
            frequency: 10.0,
            damping_ratio: 0.5,
            kinematic_b: true,
            collide_connected: false,
        }
    }
}

/// Snapshot of a weld constraint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeldInfo {
    pub body_a: RigidBodyHandle,
    pub body_b: RigidBodyHandle,
    /// Anchor in body A's local space
    pub local_anchor_a: Vec2,
    /// Anchor in body B's local space
    pub local_anchor_b: Vec2,
    /// Angle of body B minus angle of body A at creation
    pub reference_angle: f32,
    /// Anchor B transformed into world space
    pub world_anchor_b: Vec2,
    pub config: WeldConfig,
}

#[derive(Debug, Clone, Copy)]
struct WeldRecord {
    config: WeldConfig,
    reference_angle: f32,
    /// The body the weld was made against
    body_b: rapier3d::dynamics::RigidBodyHandle,
    /// Kinematic stand-in for a dynamic body B, moved to match it every step
    proxy: Option<rapier3d::dynamics::RigidBodyHandle>,
}

fn planar_isometry(position: Vec2, angle: f32) -> Isometry<Real> {
    Isometry::new(vector![position.x, position.y, 0.0], vector![0.0, 0.0, angle])
}

fn planar_angle(rotation: &Rotation<Real>) -> f32 {
    rotation.euler_angles().2
}

fn owner_bits(owner: Option<Entity>) -> u128 {
    owner.map_or(0, |entity| u128::from(entity.to_bits().get()))
}

fn owner_from_bits(bits: u128) -> Option<Entity> {
    u64::try_from(bits).ok().and_then(Entity::from_bits)
}

/// Physics world manager
pub struct Physics {
    /// Gravity vector
    pub gravity: Vec2,
    pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    integration_parameters: IntegrationParameters,
    /// Settings of every weld created through this wrapper
    welds: FxHashMap<ImpulseJointHandle, WeldRecord>,
}

impl Physics {
    /// Create a new physics world without gravity (bodies float)
    pub fn new() -> Self {
        Self::with_gravity(Vec2::ZERO)
    }

    /// Create a new physics world with custom gravity
    pub fn with_gravity(gravity: Vec2) -> Self {
        Self {
            gravity,
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            integration_parameters: IntegrationParameters::default(),
            welds: FxHashMap::default(),
        }
    }

    /// Step the physics simulation
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.sync_proxies();

        self.pipeline.step(
            &vector![self.gravity.x, self.gravity.y, 0.0],
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    fn insert_body(&mut self, builder: RigidBodyBuilder, owner: Option<Entity>) -> RigidBodyHandle {
        let body = builder
            .locked_axes(
                LockedAxes::TRANSLATION_LOCKED_Z
                    | LockedAxes::ROTATION_LOCKED_X
                    | LockedAxes::ROTATION_LOCKED_Y,
            )
            .user_data(owner_bits(owner))
            .build();

        RigidBodyHandle(self.rigid_body_set.insert(body))
    }

    /// Create a fixed body (level walls)
    pub fn create_fixed_body(
        &mut self,
        position: Vec2,
        angle: f32,
        owner: Option<Entity>,
    ) -> RigidBodyHandle {
        let builder = RigidBodyBuilder::fixed().position(planar_isometry(position, angle));
        self.insert_body(builder, owner)
    }

    /// Create a dynamic body (creature limbs, vessels)
    pub fn create_dynamic_body(
        &mut self,
        position: Vec2,
        angle: f32,
        owner: Option<Entity>,
    ) -> RigidBodyHandle {
        let builder = RigidBodyBuilder::dynamic().position(planar_isometry(position, angle));
        self.insert_body(builder, owner)
    }

    /// Create a kinematic body moved by setting its velocity
    pub fn create_kinematic_body(
        &mut self,
        position: Vec2,
        angle: f32,
        owner: Option<Entity>,
    ) -> RigidBodyHandle {
        let builder =
            RigidBodyBuilder::kinematic_velocity_based().position(planar_isometry(position, angle));
        self.insert_body(builder, owner)
    }

    /// Add a box collider to a rigid body
    pub fn add_box_collider(
        &mut self,
        body: RigidBodyHandle,
        half_extents: Vec2,
        density: f32,
    ) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, 0.5)
            .density(density)
            .build();

        ColliderHandle(self.collider_set.insert_with_parent(
            collider,
            body.0,
            &mut self.rigid_body_set,
        ))
    }

    /// Add a ball collider to a rigid body
    pub fn add_ball_collider(
        &mut self,
        body: RigidBodyHandle,
        radius: f32,
        density: f32,
    ) -> ColliderHandle {
        let collider = ColliderBuilder::ball(radius).density(density).build();

        ColliderHandle(self.collider_set.insert_with_parent(
            collider,
            body.0,
            &mut self.rigid_body_set,
        ))
    }

    /// Add a capsule collider aligned with the body's Y axis
    pub fn add_capsule_collider(
        &mut self,
        body: RigidBodyHandle,
        half_height: f32,
        radius: f32,
        density: f32,
    ) -> ColliderHandle {
        let collider = ColliderBuilder::capsule_y(half_height, radius)
            .density(density)
            .build();

        ColliderHandle(self.collider_set.insert_with_parent(
            collider,
            body.0,
            &mut self.rigid_body_set,
        ))
    }

    /// Check whether a body still exists
    pub fn contains_body(&self, body: RigidBodyHandle) -> bool {
        self.rigid_body_set.contains(body.0)
    }

    /// Entity that owns a body, if any
    pub fn body_owner(&self, body: RigidBodyHandle) -> Option<Entity> {
        self.rigid_body_set
            .get(body.0)
            .and_then(|rb| owner_from_bits(rb.user_data))
    }

    /// Change the entity that owns a body
    pub fn set_body_owner(&mut self, body: RigidBodyHandle, owner: Option<Entity>) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            rb.user_data = owner_bits(owner);
        }
    }

    /// Get the position of a rigid body
    pub fn get_position(&self, body: RigidBodyHandle) -> Option<Vec2> {
        self.rigid_body_set.get(body.0).map(|rb| {
            let pos = rb.translation();
            Vec2::new(pos.x, pos.y)
        })
    }

    /// Get the rotation of a rigid body about Z
    pub fn get_angle(&self, body: RigidBodyHandle) -> Option<f32> {
        self.rigid_body_set
            .get(body.0)
            .map(|rb| planar_angle(rb.rotation()))
    }

    /// Teleport a body to a position and orientation
    pub fn set_transform(&mut self, body: RigidBodyHandle, position: Vec2, angle: f32) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            rb.set_position(planar_isometry(position, angle), true);
        }
    }

    /// Project a world point into a body's local space
    pub fn local_point(&self, body: RigidBodyHandle, world_point: Vec2) -> Option<Vec2> {
        self.rigid_body_set.get(body.0).map(|rb| {
            let local = rb
                .position()
                .inverse_transform_point(&point![world_point.x, world_point.y, 0.0]);
            Vec2::new(local.x, local.y)
        })
    }

    /// Transform a body-local point into world space
    pub fn world_point(&self, body: RigidBodyHandle, local_point: Vec2) -> Option<Vec2> {
        self.rigid_body_set.get(body.0).map(|rb| {
            let world = rb
                .position()
                .transform_point(&point![local_point.x, local_point.y, 0.0]);
            Vec2::new(world.x, world.y)
        })
    }

    /// Apply an impulse to a dynamic body
    pub fn apply_impulse(&mut self, body: RigidBodyHandle, impulse: Vec2) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            rb.apply_impulse(vector![impulse.x, impulse.y, 0.0], true);
        }
    }

    /// Set the linear velocity of a body
    pub fn set_linear_velocity(&mut self, body: RigidBodyHandle, velocity: Vec2) {
        if let Some(rb) = self.rigid_body_set.get_mut(body.0) {
            rb.set_linvel(vector![velocity.x, velocity.y, 0.0], true);
        }
    }

    /// Get the linear velocity of a body
    pub fn get_linear_velocity(&self, body: RigidBodyHandle) -> Option<Vec2> {
        self.rigid_body_set.get(body.0).map(|rb| {
            let vel = rb.linvel();
            Vec2::new(vel.x, vel.y)
        })
    }

    /// Weld two bodies together at the given local anchors.
    ///
    /// The current relative orientation of the bodies becomes the reference
    /// angle the weld maintains. With `kinematic_b` set and a dynamic body B,
    /// body A is welded to a kinematic proxy that tracks B, so A never pulls
    /// B along. Returns `None` if either body is gone.
    pub fn add_weld(
        &mut self,
        body_a: RigidBodyHandle,
        body_b: RigidBodyHandle,
        local_anchor_a: Vec2,
        local_anchor_b: Vec2,
        config: WeldConfig,
    ) -> Option<ConstraintHandle> {
        let angle_a = self.get_angle(body_a)?;
        let angle_b = self.get_angle(body_b)?;
        let reference_angle = angle_b - angle_a;

        let b_is_dynamic = self.rigid_body_set.get(body_b.0)?.is_dynamic();
        let proxy = if config.kinematic_b && b_is_dynamic {
            Some(self.spawn_proxy(body_b.0)?)
        } else {
            None
        };

        let joint = FixedJointBuilder::new()
            .local_frame1(planar_isometry(local_anchor_a, 0.0))
            .local_frame2(planar_isometry(local_anchor_b, -reference_angle))
            .contacts_enabled(config.collide_connected)
            .build();

        self.integration_parameters.joint_natural_frequency = config.frequency;
        self.integration_parameters.joint_damping_ratio = config.damping_ratio;

        let handle =
            self.impulse_joint_set
                .insert(body_a.0, proxy.unwrap_or(body_b.0), joint, true);
        self.welds.insert(
            handle,
            WeldRecord {
                config,
                reference_angle,
                body_b: body_b.0,
                proxy,
            },
        );

        Some(ConstraintHandle(handle))
    }

    /// Spring frequency and damping ratio every joint is solved with
    pub fn joint_softness(&self) -> (f32, f32) {
        (
            self.integration_parameters.joint_natural_frequency,
            self.integration_parameters.joint_damping_ratio,
        )
    }

    fn spawn_proxy(
        &mut self,
        target: rapier3d::dynamics::RigidBodyHandle,
    ) -> Option<rapier3d::dynamics::RigidBodyHandle> {
        let rb = self.rigid_body_set.get(target)?;
        let builder = RigidBodyBuilder::kinematic_velocity_based()
            .position(*rb.position())
            .linvel(*rb.linvel())
            .angvel(*rb.angvel());
        Some(self.insert_body(builder, None).0)
    }

    /// Move every proxy onto the body it stands in for
    fn sync_proxies(&mut self) {
        for record in self.welds.values() {
            let Some(proxy) = record.proxy else {
                continue;
            };
            let Some(target) = self.rigid_body_set.get(record.body_b) else {
                continue;
            };
            let (position, linvel, angvel) = (*target.position(), *target.linvel(), *target.angvel());

            if let Some(rb) = self.rigid_body_set.get_mut(proxy) {
                rb.set_position(position, true);
                rb.set_linvel(linvel, true);
                rb.set_angvel(angvel, true);
            }
        }
    }

    /// Remove a constraint. Returns false if it no longer existed.
    pub fn remove_constraint(&mut self, handle: ConstraintHandle) -> bool {
        let removed = self.impulse_joint_set.remove(handle.0, true).is_some();
        if let Some(proxy) = self.welds.remove(&handle.0).and_then(|record| record.proxy) {
            self.rigid_body_set.remove(
                proxy,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            );
        }
        removed
    }

    /// Read back a weld constraint
    pub fn weld(&self, handle: ConstraintHandle) -> Option<WeldInfo> {
        let joint = self.impulse_joint_set.get(handle.0)?;
        let record = self.welds.get(&handle.0)?;
        let body_b = self.rigid_body_set.get(record.body_b)?;

        let anchor_a = joint.data.local_anchor1();
        let anchor_b = joint.data.local_anchor2();
        let world_b = body_b.position().transform_point(&anchor_b);

        Some(WeldInfo {
            body_a: RigidBodyHandle(joint.body1),
            body_b: RigidBodyHandle(record.body_b),
            local_anchor_a: Vec2::new(anchor_a.x, anchor_a.y),
            local_anchor_b: Vec2::new(anchor_b.x, anchor_b.y),
            reference_angle: record.reference_angle,
            world_anchor_b: Vec2::new(world_b.x, world_b.y),
            config: record.config,
        })
    }

    /// Mirror a weld for a left/right flip of body A.
    ///
    /// Anchor A is reflected across body A's local Y axis and the reference
    /// angle is negated, keeping the same constraint alive.
    pub fn mirror_weld(&mut self, handle: ConstraintHandle) -> bool {
        let Some(record) = self.welds.get_mut(&handle.0) else {
            return false;
        };
        let Some(joint) = self.impulse_joint_set.get_mut(handle.0) else {
            return false;
        };

        record.reference_angle = -record.reference_angle;

        let anchor_a = joint.data.local_anchor1();
        joint
            .data
            .set_local_anchor1(point![-anchor_a.x, anchor_a.y, anchor_a.z]);

        let anchor_b = joint.data.local_anchor2();
        joint.data.local_frame2 = planar_isometry(
            Vec2::new(anchor_b.x, anchor_b.y),
            -record.reference_angle,
        );

        true
    }

    /// Number of live constraints in the world
    pub fn constraint_count(&self) -> usize {
        self.impulse_joint_set.len()
    }

    /// Remove a rigid body, its colliders and every constraint attached to it
    pub fn remove_body(&mut self, body: RigidBodyHandle) {
        self.rigid_body_set.remove(
            body.0,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );

        // Welds made against the body through a proxy, and welds whose joint
        // went with the body
        let joints = &self.impulse_joint_set;
        let stale: Vec<ImpulseJointHandle> = self
            .welds
            .iter()
            .filter(|(handle, record)| record.body_b == body.0 || joints.get(**handle).is_none())
            .map(|(handle, _)| *handle)
            .collect();
        for handle in stale {
            self.remove_constraint(ConstraintHandle(handle));
        }
    }
}

impl Default for Physics {
    fn default() -> Self {
        Self::new()
    }
}
