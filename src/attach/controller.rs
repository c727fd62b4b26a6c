//! The attachment controller
//!
//! Runs once per simulation tick from the owning creature's update. Decides
//! whether to latch, hold or let go, and owns the pair of weld constraints
//! that hold the creature in place.

use std::f32::consts::FRAC_PI_2;

use glam::Vec2;
use hecs::Entity;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::acquisition::find_wall_target;
use super::config::{AttachConfig, ConfigError};
use super::risk::{detach_risk, is_shaken_off};
use super::state::{AttachError, AttachTarget, Attachment, DetachCause, LatchState};
use crate::ai::{AiState, HostBehavior};
use crate::core::{EventQueue, GameEvent};
use crate::creature::{Creature, LimbType};
use crate::ecs::World;
use crate::level::SpatialQuery;
use crate::physics::{ConstraintHandle, Physics, RigidBodyHandle, WeldConfig};

/// Time between wall searches
pub const RAYCAST_INTERVAL: f32 = 5.0;
/// Time between detachment risk checks while attached
pub const DETACH_CHECK_INTERVAL: f32 = 5.0;
/// Time attaching is suppressed after being shaken off
pub const REATTACH_COOLDOWN: f32 = 5.0;
/// Attach when closer than this many times the collider's largest dimension
pub const ATTACH_DISTANCE_FACTOR: f32 = 1.2;
/// Squared distance between a weld's anchors that counts as broken
pub const MAX_ANCHOR_DRIFT_SQUARED: f32 = 10.0 * 10.0;

const AVOID_LOOKAHEAD: f32 = 1.0;
const AVOID_WEIGHT: f32 = 0.1;

/// Everything outside the creature the controller reads or mutates
pub struct AttachContext<'a> {
    pub physics: &'a mut Physics,
    pub world: &'a World,
    /// Loaded level, if any
    pub level: Option<&'a dyn SpatialQuery>,
    pub events: &'a mut EventQueue,
}

/// Three-valued sign, 0 for zero
fn sign(value: f32) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

fn vector_to_angle(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

/// Latches a creature onto walls and vessels
#[derive(Debug)]
pub struct AttachmentController {
    config: AttachConfig,
    creature: Entity,
    creature_name: String,
    attach_limb: LimbType,
    attach_limb_rotation: f32,
    weld: WeldConfig,

    target: Option<AttachTarget>,
    state: LatchState,
    wall_attach_point: Option<Vec2>,

    raycast_timer: f32,
    deattach_timer: f32,
    attach_cooldown: f32,
    dead: bool,
    rng: StdRng,
}

impl AttachmentController {
    /// Create a controller for a creature.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration has out-of-range values
    pub fn new(config: AttachConfig, creature: &Creature) -> Result<Self, ConfigError> {
        let config = config.validated()?;
        let attach_limb = config.resolve_attach_limb(&creature.ragdoll);
        let rng = config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

        Ok(Self {
            attach_limb,
            attach_limb_rotation: config.attach_limb_rotation_radians(),
            weld: WeldConfig::default(),
            creature: creature.entity,
            creature_name: creature.name.clone(),
            config,
            target: None,
            state: LatchState::Unattached,
            wall_attach_point: None,
            raycast_timer: 0.0,
            deattach_timer: 0.0,
            attach_cooldown: 0.0,
            dead: false,
            rng,
        })
    }

    pub fn config(&self) -> &AttachConfig {
        &self.config
    }

    pub fn attach_limb(&self) -> LimbType {
        self.attach_limb
    }

    pub fn state(&self) -> &LatchState {
        &self.state
    }

    pub fn is_attached(&self) -> bool {
        matches!(self.state, LatchState::Attached(_))
    }

    /// Whether the held body is a vessel or belongs to one
    pub fn is_attached_to_vessel(&self, physics: &Physics, world: &World) -> bool {
        match self.state {
            LatchState::Attached(attachment) => physics
                .body_owner(attachment.body)
                .and_then(|owner| world.vessel_of(owner))
                .is_some(),
            _ => false,
        }
    }

    /// Target handed over by the host or found by the wall search
    pub fn attach_target(&self) -> Option<AttachTarget> {
        self.target
    }

    /// World-space point the creature is attached to or heading for
    pub fn current_wall_attach_point(&self) -> Option<Vec2> {
        self.wall_attach_point
    }

    /// Constraints currently held, limb weld first. Empty or exactly two.
    pub fn constraints(&self) -> &[ConstraintHandle] {
        match &self.state {
            LatchState::Attached(attachment) => &attachment.joints[..],
            _ => &[],
        }
    }

    /// Remaining time attaching is suppressed
    pub fn attach_cooldown(&self) -> f32 {
        self.attach_cooldown.max(0.0)
    }

    /// Name of the creature used in log messages
    pub fn creature_name(&self) -> &str {
        &self.creature_name
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Hand over a target found by attack/collision resolution.
    ///
    /// With a vessel, `point` is relative to the vessel's position.
    pub fn set_attach_target(
        &mut self,
        body: RigidBodyHandle,
        vessel: Option<Entity>,
        point: Vec2,
        normal: Vec2,
    ) {
        self.target = Some(AttachTarget {
            body,
            vessel,
            point,
            normal,
        });
    }

    /// Release any held constraints. Does nothing when unattached.
    pub fn deattach(&mut self, physics: &mut Physics, events: &mut EventQueue) {
        self.detach(physics, events, DetachCause::Requested);
    }

    /// React to lifecycle events of the owning creature
    pub fn handle_event(
        &mut self,
        event: &GameEvent,
        physics: &mut Physics,
        events: &mut EventQueue,
    ) {
        if let GameEvent::CreatureDied { entity } = event {
            if *entity == self.creature && !self.dead {
                self.detach(physics, events, DetachCause::Death);
                self.target = None;
                self.wall_attach_point = None;
                self.dead = true;
            }
        }
    }

    /// Advance one tick
    pub fn update(
        &mut self,
        host: &mut dyn HostBehavior,
        creature: &Creature,
        ctx: &mut AttachContext<'_>,
        delta_time: f32,
    ) {
        if self.dead || creature.dead {
            self.detach(ctx.physics, ctx.events, DetachCause::Death);
            self.target = None;
            self.wall_attach_point = None;
            self.dead = true;
            return;
        }

        if creature.is_inside_vessel() {
            self.detach(ctx.physics, ctx.events, DetachCause::EnteredVessel);
            self.target = None;
            self.wall_attach_point = None;
            return;
        }

        if !self.hold(creature, ctx) {
            return;
        }

        self.attach_cooldown -= delta_time;
        self.deattach_timer -= delta_time;

        match host.state() {
            AiState::Idle => self.update_idle(host, creature, ctx, delta_time),
            AiState::Attack => self.update_attack(host, creature, ctx),
            _ => {
                self.wall_attach_point = None;
                self.detach(ctx.physics, ctx.events, DetachCause::StateChanged);
                return;
            }
        }

        self.wall_attach_point = self.transformed_attach_point(ctx);
        self.check_detach_risk(creature, ctx);
    }

    /// Keep held constraints valid. Returns false if the tick should stop.
    fn hold(&mut self, creature: &Creature, ctx: &mut AttachContext<'_>) -> bool {
        let LatchState::Attached(mut attachment) = self.state else {
            return true;
        };

        if !ctx.physics.contains_body(attachment.body) {
            log::debug!("{}: attach target body is gone", creature.name);
            self.target = None;
            self.detach(ctx.physics, ctx.events, DetachCause::TargetLost);
            return true;
        }

        let limb = creature.ragdoll.limb(self.attach_limb).copied();
        if let Some(limb) = limb {
            if sign(limb.dir) != sign(attachment.joint_dir) {
                ctx.physics.mirror_weld(attachment.joints[0]);
                attachment.joint_dir = limb.dir;
                self.state = LatchState::Attached(attachment);
            }
        }

        let drifted = limb.is_none()
            || attachment.joints.iter().any(|&joint| {
                let Some(weld) = ctx.physics.weld(joint) else {
                    return true;
                };
                ctx.physics
                    .get_position(weld.body_a)
                    .is_none_or(|pos| pos.distance_squared(weld.world_anchor_b) > MAX_ANCHOR_DRIFT_SQUARED)
            });

        if drifted {
            log::error!(
                "Limb body of creature \"{}\" is very far from the attach joint anchor, detaching",
                creature.name
            );
            self.detach(ctx.physics, ctx.events, DetachCause::Integrity);
            return false;
        }

        true
    }

    fn update_idle(
        &mut self,
        host: &mut dyn HostBehavior,
        creature: &Creature,
        ctx: &mut AttachContext<'_>,
        delta_time: f32,
    ) {
        let Some(position) = creature.position(ctx.physics) else {
            return;
        };

        match ctx.level {
            Some(level) if self.config.attach_to_walls => {
                self.raycast_timer -= delta_time;
                if self.raycast_timer < 0.0 {
                    self.target = find_wall_target(level, position);
                    log::trace!("{}: wall search found {:?}", creature.name, self.target);
                    self.raycast_timer = RAYCAST_INTERVAL;
                }
            }
            _ => self.target = None,
        }

        let (Some(target), Some(point)) = (self.target, self.transformed_attach_point(ctx)) else {
            self.detach(ctx.physics, ctx.events, DetachCause::TargetLost);
            return;
        };

        let reach = creature.ragdoll.collider_shape.max_dimension() * ATTACH_DISTANCE_FACTOR;
        if position.distance(point) <= reach {
            match self.attach_to_body(creature, target, point, ctx.physics, ctx.events) {
                Ok(()) => host.steering_reset(),
                Err(e) => self.on_attach_failed(creature, e),
            }
        } else {
            let already_approaching =
                matches!(self.state, LatchState::Approaching { point: p } if p == point);
            self.detach(ctx.physics, ctx.events, DetachCause::Repositioning);
            if !already_approaching {
                log::debug!("{}: approaching wall at {point}", creature.name);
            }
            self.state = LatchState::Approaching { point };
            host.steering_avoid(delta_time, AVOID_LOOKAHEAD, AVOID_WEIGHT);
            host.steering_seek(point);
        }
    }

    fn update_attack(
        &mut self,
        host: &mut dyn HostBehavior,
        creature: &Creature,
        ctx: &mut AttachContext<'_>,
    ) {
        let Some(attacking_limb) = host.attacking_limb() else {
            return;
        };
        if !self.config.attach_to_vessel || host.is_steering_through_gap() {
            return;
        }
        let Some(target) = self.target else {
            return;
        };
        if !ctx.physics.contains_body(target.body) {
            log::debug!("{}: attack target body is gone", creature.name);
            self.target = None;
            return;
        }
        let Some(point) = self.transformed_attach_point(ctx) else {
            return;
        };

        let free_or_same = match self.state {
            LatchState::Attached(attachment) => attachment.body == target.body,
            _ => true,
        };
        let range = attacking_limb.damage_range;
        if free_or_same && point.distance_squared(attacking_limb.world_position) < range * range {
            if let Err(e) = self.attach_to_body(creature, target, point, ctx.physics, ctx.events) {
                self.on_attach_failed(creature, e);
            }
        }
    }

    fn on_attach_failed(&mut self, creature: &Creature, error: AttachError) {
        match error {
            AttachError::CoolingDown { .. } => log::trace!("{}: {error}", creature.name),
            AttachError::MissingTarget => {
                log::debug!("{}: {error}", creature.name);
                self.target = None;
            }
            _ => log::warn!("{}: {error}", creature.name),
        }
    }

    /// Candidate point in world space, following the target vessel
    fn transformed_attach_point(&self, ctx: &AttachContext<'_>) -> Option<Vec2> {
        let target = self.target?;
        match target.vessel {
            Some(vessel) => ctx
                .world
                .vessel_position(vessel, ctx.physics)
                .map(|offset| target.point + offset),
            None => Some(target.point),
        }
    }

    /// Weld the creature to `target` at world point `point`.
    ///
    /// A no-op when already attached to the same body; an attachment to
    /// another body is released first. Both welds are created or neither.
    ///
    /// # Errors
    ///
    /// Returns an error if a body involved is gone, the creature is dead or
    /// the re-attach cooldown is running
    pub fn attach_to_body(
        &mut self,
        creature: &Creature,
        target: AttachTarget,
        point: Vec2,
        physics: &mut Physics,
        events: &mut EventQueue,
    ) -> Result<(), AttachError> {
        if self.dead {
            return Err(AttachError::Dead);
        }
        if let LatchState::Attached(attachment) = self.state {
            if attachment.body == target.body {
                return Ok(());
            }
            self.detach(physics, events, DetachCause::Retarget);
        }
        if self.attach_cooldown > 0.0 {
            return Err(AttachError::CoolingDown {
                remaining: self.attach_cooldown,
            });
        }

        let limb = creature
            .ragdoll
            .limb(self.attach_limb)
            .copied()
            .filter(|limb| physics.contains_body(limb.body))
            .ok_or(AttachError::MissingLimb(self.attach_limb))?;
        let collider = creature.ragdoll.collider;
        if !physics.contains_body(collider) {
            return Err(AttachError::MissingCollider);
        }
        let target_local = physics
            .local_point(target.body, point)
            .ok_or(AttachError::MissingTarget)?;

        let joint_dir = limb.dir;
        let normal = target.normal;
        let surface_angle = vector_to_angle(-normal) - FRAC_PI_2;

        let mut limb_anchor = self.config.local_attach_pos() * creature.ragdoll.limb_scale;
        if joint_dir < 0.0 {
            limb_anchor.x = -limb_anchor.x;
        }
        physics.set_transform(
            limb.body,
            point + normal * limb_anchor.length(),
            surface_angle + self.attach_limb_rotation * limb.dir,
        );
        let limb_joint = physics
            .add_weld(limb.body, target.body, limb_anchor, target_local, self.weld)
            .ok_or(AttachError::MissingTarget)?;

        let mut front = creature.ragdoll.collider_shape.local_front();
        if joint_dir < 0.0 {
            front.x = -front.x;
        }
        physics.set_transform(collider, point + normal * front.length(), surface_angle);
        let Some(collider_joint) =
            physics.add_weld(collider, target.body, front, target_local, self.weld)
        else {
            physics.remove_constraint(limb_joint);
            return Err(AttachError::MissingCollider);
        };

        self.state = LatchState::Attached(Attachment {
            body: target.body,
            joints: [limb_joint, collider_joint],
            joint_dir,
        });
        log::info!("{} attached at {point}", creature.name);
        events.push(GameEvent::Attached {
            entity: self.creature,
            target: target.body,
            point,
        });

        Ok(())
    }

    /// Remove both welds and return to unattached
    fn detach(&mut self, physics: &mut Physics, events: &mut EventQueue, cause: DetachCause) {
        let previous = std::mem::take(&mut self.state);
        let LatchState::Attached(attachment) = previous else {
            return;
        };

        for joint in attachment.joints {
            physics.remove_constraint(joint);
        }
        log::info!("{} detached: {cause}", self.creature_name);
        events.push(GameEvent::Detached {
            entity: self.creature,
            cause,
        });
    }

    fn check_detach_risk(&mut self, creature: &Creature, ctx: &mut AttachContext<'_>) {
        let LatchState::Attached(attachment) = self.state else {
            return;
        };
        if self.deattach_timer >= 0.0 {
            return;
        }
        self.deattach_timer = DETACH_CHECK_INTERVAL;

        let Some(vessel) = ctx
            .physics
            .body_owner(attachment.body)
            .and_then(|owner| ctx.world.vessel_of(owner))
        else {
            return;
        };

        let speed = ctx
            .world
            .vessel_velocity(vessel, ctx.physics)
            .map_or(0.0, |velocity| velocity.length());
        let risk = detach_risk(
            speed,
            self.config.min_deattach_speed,
            self.config.max_deattach_speed,
        );
        let draw: f32 = self.rng.gen_range(0.0..1.0);
        log::trace!(
            "{}: vessel speed {speed:.2}, detach risk {risk:.2}, draw {draw:.2}",
            creature.name
        );

        if is_shaken_off(risk, draw) {
            self.detach(ctx.physics, ctx.events, DetachCause::ShakenOff);
            ctx.events.push(GameEvent::CreatureDamaged {
                entity: self.creature,
                position: creature.position(ctx.physics).unwrap_or_default(),
                amount: self.config.damage_on_detach,
                stun: self.config.detach_stun,
            });
            self.attach_cooldown = REATTACH_COOLDOWN;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AttackingLimb, EnemyAi};
    use crate::creature::{BodyShape, LimbSpec, Ragdoll};
    use crate::ecs::{Health, Name, Vessel};
    use crate::level::Level;

    const DT: f32 = 0.1;

    fn square(center: Vec2, half: f32) -> [Vec2; 4] {
        [
            center + Vec2::new(-half, -half),
            center + Vec2::new(half, -half),
            center + Vec2::new(half, half),
            center + Vec2::new(-half, half),
        ]
    }

    /// A creature floating above a wall whose top surface is at y = -1.
    /// The creature's collider is 1.0 at its largest, so it latches on
    /// within 1.2 of the surface.
    struct Scene {
        physics: Physics,
        world: World,
        level: Level,
        events: EventQueue,
        creature: Creature,
        host: EnemyAi,
        wall: RigidBodyHandle,
    }

    impl Scene {
        fn new(creature_position: Vec2) -> Self {
            Self::with_wall(Vec2::new(0.0, -2.0), creature_position)
        }

        /// Two-unit square wall centered at `wall_center`
        fn with_wall(wall_center: Vec2, creature_position: Vec2) -> Self {
            let mut physics = Physics::new();
            let mut world = World::new();
            let mut level = Level::new(10.0);
            let wall_index = level.add_wall(&mut physics, &square(wall_center, 1.0));
            let wall = level.fragment(wall_index).unwrap().body;

            let entity = world.spawn((Name::new("crawler"), Health::default()));
            let ragdoll = Ragdoll::spawn(
                &mut physics,
                Some(entity),
                creature_position,
                BodyShape::capsule(0.25, 1.0),
                &[
                    LimbSpec {
                        kind: LimbType::Torso,
                        offset: Vec2::ZERO,
                        radius: 0.3,
                    },
                    LimbSpec {
                        kind: LimbType::Head,
                        offset: Vec2::new(0.0, 0.6),
                        radius: 0.2,
                    },
                ],
            );

            Self {
                physics,
                world,
                level,
                events: EventQueue::new(),
                creature: Creature::new(entity, "crawler", ragdoll),
                host: EnemyAi::new(1.0),
                wall,
            }
        }

        fn controller(&self, config: AttachConfig) -> AttachmentController {
            AttachmentController::new(config.with_seed(42), &self.creature).unwrap()
        }

        fn wall_controller(&self) -> AttachmentController {
            self.controller(AttachConfig::default().with_attach_to_walls(true))
        }

        fn tick(&mut self, controller: &mut AttachmentController) {
            let position = self.creature.position(&self.physics).unwrap_or_default();
            self.host.sync(position, Vec2::ZERO);

            let mut ctx = AttachContext {
                physics: &mut self.physics,
                world: &self.world,
                level: Some(&self.level as &dyn SpatialQuery),
                events: &mut self.events,
            };
            controller.update(&mut self.host, &self.creature, &mut ctx, DT);
        }

        fn head(&self) -> RigidBodyHandle {
            self.creature.ragdoll.limb(LimbType::Head).unwrap().body
        }

        /// Hull moving at `velocity`, positioned below the creature
        fn spawn_vessel(&mut self, velocity: Vec2) -> (Entity, RigidBodyHandle) {
            let hull = self
                .physics
                .create_kinematic_body(Vec2::new(0.0, -3.0), 0.0, None);
            self.physics.set_linear_velocity(hull, velocity);
            let vessel = self.world.spawn_vessel(&mut self.physics, "Typhon", hull);
            (vessel, hull)
        }

        fn detach_causes(&self) -> Vec<DetachCause> {
            self.events
                .pending()
                .filter_map(|event| match event {
                    GameEvent::Detached { cause, .. } => Some(*cause),
                    _ => None,
                })
                .collect()
        }

        fn assert_constraint_invariant(&self, controller: &AttachmentController) {
            let held = controller.constraints().len();
            assert!(held == 0 || held == 2, "held {held} constraints");
            assert_eq!(self.physics.constraint_count(), held);
        }
    }

    fn hull_of(scene: &Scene) -> RigidBodyHandle {
        let mut query = scene.world.inner.query::<&Vessel>();
        let hull = query.iter().map(|(_, vessel)| vessel.body).next();
        hull.unwrap()
    }

    /// Latch onto a vessel hull through the attack path
    fn attached_to_vessel(speed: f32, min: f32, max: f32) -> (Scene, AttachmentController) {
        let mut scene = Scene::new(Vec2::ZERO);
        let (vessel, hull) = scene.spawn_vessel(Vec2::new(speed, 0.0));

        let config = AttachConfig::default()
            .with_attach_to_vessel(true)
            .with_deattach_speeds(min, max)
            .with_detach_damage(12.0, 3.0);
        let mut controller = scene.controller(config);

        scene.host.state = AiState::Attack;
        scene.host.attacking_limb = Some(AttackingLimb {
            world_position: Vec2::new(0.0, -1.0),
            damage_range: 1.0,
        });
        // Hull-relative: two units above the hull's origin
        controller.set_attach_target(hull, Some(vessel), Vec2::new(0.0, 2.0), Vec2::Y);

        (scene, controller)
    }

    #[test]
    fn test_deattach_when_unattached_is_noop() {
        let mut scene = Scene::new(Vec2::new(0.0, 5.0));
        let mut controller = scene.wall_controller();

        controller.deattach(&mut scene.physics, &mut scene.events);

        assert!(!controller.is_attached());
        assert!(controller.constraints().is_empty());
        assert_eq!(scene.events.pending_count(), 0);
        scene.assert_constraint_invariant(&controller);
    }

    #[test]
    fn test_idle_attaches_within_reach() {
        let mut scene = Scene::new(Vec2::new(0.0, 0.1));
        let mut controller = scene.wall_controller();

        scene.tick(&mut controller);

        assert!(controller.is_attached());
        assert_eq!(controller.constraints().len(), 2);
        assert!(!controller.is_attached_to_vessel(&scene.physics, &scene.world));
        scene.assert_constraint_invariant(&controller);

        let point = controller.current_wall_attach_point().unwrap();
        assert!((point - Vec2::new(0.0, -1.0)).length() < 1e-4);
        assert_eq!(scene.host.steering(), Vec2::ZERO);
        assert!(
            scene
                .events
                .pending()
                .any(|event| matches!(event, GameEvent::Attached { target, .. } if *target == scene.wall))
        );
    }

    #[test]
    fn test_attach_distance_gate() {
        let mut near = Scene::new(Vec2::new(0.0, 0.19));
        let mut controller = near.wall_controller();
        near.tick(&mut controller);
        assert!(controller.is_attached());

        let mut far = Scene::new(Vec2::new(0.0, 0.21));
        let mut controller = far.wall_controller();
        far.tick(&mut controller);
        assert!(!controller.is_attached());
        assert!(matches!(controller.state(), LatchState::Approaching { .. }));
        far.assert_constraint_invariant(&controller);
    }

    #[test]
    fn test_idle_approaches_out_of_reach() {
        let mut scene = Scene::new(Vec2::new(0.0, 1.0));
        let mut controller = scene.wall_controller();

        scene.tick(&mut controller);

        let LatchState::Approaching { point } = *controller.state() else {
            panic!("expected Approaching, got {}", controller.state().name());
        };
        assert!((point - Vec2::new(0.0, -1.0)).length() < 1e-4);
        assert!(controller.constraints().is_empty());
        // Steering pulls the creature down towards the wall
        assert!(scene.host.steering().y < 0.0);
    }

    #[test]
    fn test_attach_pose() {
        let mut scene = Scene::new(Vec2::new(0.0, 0.1));
        let mut controller = scene.controller(
            AttachConfig::default()
                .with_attach_to_walls(true)
                .with_local_attach_pos(Vec2::new(0.0, 0.4)),
        );

        scene.tick(&mut controller);
        assert!(controller.is_attached());

        // Limb sits its anchor length out along the normal, facing into the wall
        let head = scene.head();
        let head_pos = scene.physics.get_position(head).unwrap();
        assert!((head_pos - Vec2::new(0.0, -0.6)).length() < 1e-4);
        let angle = scene.physics.get_angle(head).unwrap();
        assert!((angle.cos() + 1.0).abs() < 1e-4);

        // Collider sits its front length out: 0.5 half height + 0.25 radius
        let collider_pos = scene.physics.get_position(scene.creature.ragdoll.collider).unwrap();
        assert!((collider_pos - Vec2::new(0.0, -0.25)).length() < 1e-4);

        let limb_weld = scene.physics.weld(controller.constraints()[0]).unwrap();
        assert_eq!(limb_weld.body_a, head);
        assert_eq!(limb_weld.body_b, scene.wall);
        assert_eq!(limb_weld.config, WeldConfig::default());
        assert!((limb_weld.world_anchor_b - Vec2::new(0.0, -1.0)).length() < 1e-4);

        let collider_weld = scene.physics.weld(controller.constraints()[1]).unwrap();
        assert_eq!(collider_weld.body_a, scene.creature.ragdoll.collider);
        assert!((collider_weld.local_anchor_a - Vec2::new(0.0, 0.75)).length() < 1e-4);
    }

    #[test]
    fn test_attach_is_idempotent() {
        let mut scene = Scene::new(Vec2::new(0.0, 0.1));
        let mut controller = scene.wall_controller();

        scene.tick(&mut controller);
        let joints = controller.constraints().to_vec();
        scene.tick(&mut controller);
        scene.tick(&mut controller);

        assert_eq!(controller.constraints(), joints.as_slice());
        scene.assert_constraint_invariant(&controller);

        let target = AttachTarget {
            body: scene.wall,
            vessel: None,
            point: Vec2::new(0.0, -1.0),
            normal: Vec2::Y,
        };
        controller
            .attach_to_body(
                &scene.creature,
                target,
                target.point,
                &mut scene.physics,
                &mut scene.events,
            )
            .unwrap();

        assert_eq!(controller.constraints(), joints.as_slice());
        assert_eq!(scene.physics.constraint_count(), 2);
    }

    #[test]
    fn test_attach_to_other_body_replaces_constraints() {
        let mut scene = Scene::new(Vec2::new(0.0, 0.1));
        let mut controller = scene.wall_controller();
        scene.tick(&mut controller);

        let rock = scene
            .physics
            .create_fixed_body(Vec2::new(3.0, 0.0), 0.0, None);
        let target = AttachTarget {
            body: rock,
            vessel: None,
            point: Vec2::new(2.5, 0.0),
            normal: Vec2::NEG_X,
        };
        controller
            .attach_to_body(
                &scene.creature,
                target,
                target.point,
                &mut scene.physics,
                &mut scene.events,
            )
            .unwrap();

        let LatchState::Attached(attachment) = *controller.state() else {
            panic!("expected Attached");
        };
        assert_eq!(attachment.body, rock);
        assert_eq!(scene.detach_causes(), vec![DetachCause::Retarget]);
        scene.assert_constraint_invariant(&controller);
    }

    #[test]
    fn test_entering_vessel_detaches() {
        let mut scene = Scene::new(Vec2::new(0.0, 0.1));
        let (vessel, _) = scene.spawn_vessel(Vec2::ZERO);
        let mut controller = scene.wall_controller();
        scene.tick(&mut controller);
        assert!(controller.is_attached());

        scene.creature.inside_vessel = Some(vessel);
        scene.tick(&mut controller);

        assert!(!controller.is_attached());
        assert_eq!(controller.current_wall_attach_point(), None);
        assert_eq!(scene.detach_causes(), vec![DetachCause::EnteredVessel]);
        scene.assert_constraint_invariant(&controller);

        // Stays released while inside
        scene.tick(&mut controller);
        assert!(!controller.is_attached());
        assert_eq!(controller.current_wall_attach_point(), None);
    }

    #[test]
    fn test_state_change_detaches() {
        let mut scene = Scene::new(Vec2::new(0.0, 0.1));
        let mut controller = scene.wall_controller();
        scene.tick(&mut controller);
        assert!(controller.is_attached());

        scene.host.state = AiState::Escape;
        scene.tick(&mut controller);

        assert!(!controller.is_attached());
        assert_eq!(controller.current_wall_attach_point(), None);
        assert_eq!(scene.detach_causes(), vec![DetachCause::StateChanged]);
        scene.assert_constraint_invariant(&controller);
    }

    #[test]
    fn test_removed_target_body_is_target_loss() {
        let mut scene = Scene::new(Vec2::new(0.0, 0.1));
        let mut controller = scene.wall_controller();
        scene.tick(&mut controller);
        assert!(controller.is_attached());

        scene.physics.remove_body(scene.wall);
        scene.tick(&mut controller);

        assert!(!controller.is_attached());
        assert_eq!(scene.detach_causes(), vec![DetachCause::TargetLost]);
        scene.assert_constraint_invariant(&controller);
    }

    #[test]
    fn test_anchor_drift_forces_detach() {
        let mut scene = Scene::new(Vec2::new(0.0, 0.1));
        let mut controller = scene.wall_controller();
        scene.tick(&mut controller);

        // Squared distance 98.01 is tolerated
        let head = scene.head();
        scene.physics.set_transform(head, Vec2::new(9.9, -1.0), 0.0);
        scene.tick(&mut controller);
        assert!(controller.is_attached());

        // Squared distance 101 is not
        scene
            .physics
            .set_transform(head, Vec2::new(101.0_f32.sqrt(), -1.0), 0.0);
        scene.tick(&mut controller);

        assert!(!controller.is_attached());
        assert_eq!(scene.detach_causes(), vec![DetachCause::Integrity]);
        scene.assert_constraint_invariant(&controller);
    }

    #[test]
    fn test_facing_flip_mirrors_limb_weld() {
        let mut scene = Scene::new(Vec2::new(0.0, 0.1));
        let mut controller = scene.controller(
            AttachConfig::default()
                .with_attach_to_walls(true)
                .with_local_attach_pos(Vec2::new(0.5, 0.0)),
        );
        scene.tick(&mut controller);

        let limb_joint = controller.constraints()[0];
        let before = scene.physics.weld(limb_joint).unwrap();
        assert!((before.local_anchor_a - Vec2::new(0.5, 0.0)).length() < 1e-4);

        scene.creature.ragdoll.set_dir(-1.0);
        scene.tick(&mut controller);

        assert_eq!(controller.constraints()[0], limb_joint);
        let after = scene.physics.weld(limb_joint).unwrap();
        assert!((after.local_anchor_a - Vec2::new(-0.5, 0.0)).length() < 1e-4);
        assert!((after.reference_angle + before.reference_angle).abs() < 1e-4);

        // Same facing again: nothing changes
        scene.tick(&mut controller);
        let again = scene.physics.weld(limb_joint).unwrap();
        assert_eq!(again.local_anchor_a, after.local_anchor_a);
        scene.assert_constraint_invariant(&controller);
    }

    #[test]
    fn test_vessel_attach_through_attack() {
        let (mut scene, mut controller) = attached_to_vessel(0.0, 3.0, 10.0);

        scene.tick(&mut controller);

        assert!(controller.is_attached());
        assert!(controller.is_attached_to_vessel(&scene.physics, &scene.world));
        let point = controller.current_wall_attach_point().unwrap();
        assert!((point - Vec2::new(0.0, -1.0)).length() < 1e-4);
    }

    #[test]
    fn test_attack_requires_strike_range() {
        let (mut scene, mut controller) = attached_to_vessel(0.0, 3.0, 10.0);
        scene.host.attacking_limb = Some(AttackingLimb {
            world_position: Vec2::new(5.0, 5.0),
            damage_range: 1.0,
        });

        scene.tick(&mut controller);
        assert!(!controller.is_attached());
    }

    #[test]
    fn test_attack_skipped_through_gap() {
        let (mut scene, mut controller) = attached_to_vessel(0.0, 3.0, 10.0);
        scene.host.steering_through_gap = true;

        scene.tick(&mut controller);
        assert!(!controller.is_attached());
    }

    #[test]
    fn test_stationary_vessel_never_shakes_off() {
        // Risk factor (0 - 3) / 7 is negative
        let (mut scene, mut controller) = attached_to_vessel(0.0, 3.0, 10.0);

        for _ in 0..200 {
            scene.tick(&mut controller);
        }

        assert!(controller.is_attached());
        assert!(!scene.detach_causes().contains(&DetachCause::ShakenOff));
        scene.assert_constraint_invariant(&controller);
    }

    #[test]
    fn test_fast_vessel_always_shakes_off() {
        // Risk factor (20 - 3) / 7 is above 1
        let (mut scene, mut controller) = attached_to_vessel(20.0, 3.0, 10.0);

        scene.tick(&mut controller);

        assert!(!controller.is_attached());
        assert_eq!(scene.detach_causes(), vec![DetachCause::ShakenOff]);
        let damage = scene.events.pending().find_map(|event| match event {
            GameEvent::CreatureDamaged { amount, stun, .. } => Some((*amount, *stun)),
            _ => None,
        });
        assert_eq!(damage, Some((12.0, 3.0)));
        assert!(controller.attach_cooldown() > 0.0);
        scene.assert_constraint_invariant(&controller);
    }

    #[test]
    fn test_reattach_cooldown_is_enforced() {
        let (mut scene, mut controller) = attached_to_vessel(20.0, 3.0, 10.0);
        scene.tick(&mut controller);
        assert!(!controller.is_attached());

        // Still in range of the strike, but cooling down
        for _ in 0..10 {
            scene.tick(&mut controller);
            assert!(!controller.is_attached());
        }

        // Hull stops; once the cooldown runs out the strike latches on again
        let hull = hull_of(&scene);
        scene.physics.set_linear_velocity(hull, Vec2::ZERO);
        for _ in 0..45 {
            scene.tick(&mut controller);
        }

        assert!(controller.is_attached());
        assert_eq!(controller.attach_cooldown(), 0.0);
        let attaches = scene
            .events
            .pending()
            .filter(|event| matches!(event, GameEvent::Attached { .. }))
            .count();
        assert_eq!(attaches, 2);
    }

    #[test]
    fn test_equal_thresholds_are_a_step() {
        let (mut scene, mut controller) = attached_to_vessel(5.0, 5.0, 5.0);
        scene.tick(&mut controller);
        assert!(!controller.is_attached());

        let (mut scene, mut controller) = attached_to_vessel(4.9, 5.0, 5.0);
        for _ in 0..200 {
            scene.tick(&mut controller);
        }
        assert!(controller.is_attached());
    }

    #[test]
    fn test_wall_attachment_has_no_detach_risk() {
        let mut scene = Scene::new(Vec2::new(0.0, 0.1));
        let mut controller = scene.controller(
            AttachConfig::default()
                .with_attach_to_walls(true)
                .with_deattach_speeds(0.0, 0.0),
        );

        for _ in 0..200 {
            scene.tick(&mut controller);
        }
        assert!(controller.is_attached());
    }

    #[test]
    fn test_death_releases_and_is_terminal() {
        let mut scene = Scene::new(Vec2::new(0.0, 0.1));
        let mut controller = scene.wall_controller();
        scene.tick(&mut controller);
        assert!(controller.is_attached());

        let died = GameEvent::CreatureDied {
            entity: scene.creature.entity,
        };
        controller.handle_event(&died, &mut scene.physics, &mut scene.events);

        assert!(controller.is_dead());
        assert!(!controller.is_attached());
        assert_eq!(scene.detach_causes(), vec![DetachCause::Death]);

        for _ in 0..100 {
            scene.tick(&mut controller);
        }
        assert!(!controller.is_attached());
        scene.assert_constraint_invariant(&controller);
    }

    #[test]
    fn test_other_creature_death_is_ignored() {
        let mut scene = Scene::new(Vec2::new(0.0, 0.1));
        let mut controller = scene.wall_controller();
        scene.tick(&mut controller);

        let other = scene.world.spawn((Name::new("bystander"),));
        controller.handle_event(
            &GameEvent::CreatureDied { entity: other },
            &mut scene.physics,
            &mut scene.events,
        );

        assert!(controller.is_attached());
        assert!(!controller.is_dead());
    }

    #[test]
    fn test_no_level_or_walls_disabled() {
        let mut scene = Scene::new(Vec2::new(0.0, 0.1));

        let mut disabled = scene.controller(AttachConfig::default());
        scene.tick(&mut disabled);
        assert!(!disabled.is_attached());
        assert_eq!(disabled.current_wall_attach_point(), None);

        let mut controller = scene.wall_controller();
        let mut ctx = AttachContext {
            physics: &mut scene.physics,
            world: &scene.world,
            level: None,
            events: &mut scene.events,
        };
        controller.update(&mut scene.host, &scene.creature, &mut ctx, DT);
        assert!(!controller.is_attached());
    }

    #[test]
    fn test_repeated_cycles_do_not_leak_constraints() {
        let mut scene = Scene::new(Vec2::new(0.0, 0.1));
        let mut controller = scene.wall_controller();

        for cycle in 0..50 {
            scene.host.state = if cycle % 2 == 0 {
                AiState::Idle
            } else {
                AiState::Patrol
            };
            scene.tick(&mut controller);
            scene.assert_constraint_invariant(&controller);
            assert_eq!(controller.is_attached(), cycle % 2 == 0);
        }
    }

    #[test]
    fn test_attach_gate_boundary_is_inclusive() {
        let reach = BodyShape::capsule(0.25, 1.0).max_dimension() * ATTACH_DISTANCE_FACTOR;

        // Wall top surface at y = 0, creature exactly `reach` above it
        let mut scene = Scene::with_wall(Vec2::new(0.0, -1.0), Vec2::new(0.0, reach));
        let mut controller = scene.wall_controller();
        scene.tick(&mut controller);
        assert!(controller.is_attached());

        let just_outside = f32::from_bits(reach.to_bits() + 1);
        let mut scene = Scene::with_wall(Vec2::new(0.0, -1.0), Vec2::new(0.0, just_outside));
        let mut controller = scene.wall_controller();
        scene.tick(&mut controller);
        assert!(matches!(controller.state(), LatchState::Approaching { .. }));
    }

    #[test]
    fn test_limb_scale_scales_attach_offset() {
        let mut scene = Scene::new(Vec2::new(0.0, 0.1));
        scene.creature.ragdoll = scene.creature.ragdoll.clone().with_limb_scale(2.0);
        let mut controller = scene.controller(
            AttachConfig::default()
                .with_attach_to_walls(true)
                .with_local_attach_pos(Vec2::new(0.3, 0.2)),
        );

        scene.tick(&mut controller);
        assert!(controller.is_attached());

        let weld = scene.physics.weld(controller.constraints()[0]).unwrap();
        assert!((weld.local_anchor_a - Vec2::new(0.6, 0.4)).length() < 1e-4);

        let head = scene.physics.get_position(scene.head()).unwrap();
        let expected = Vec2::new(0.0, -1.0 + Vec2::new(0.6, 0.4).length());
        assert!((head - expected).length() < 1e-4);
    }

    #[test]
    fn test_attach_limb_rotation_follows_facing() {
        let config = AttachConfig::default()
            .with_attach_to_walls(true)
            .with_local_attach_pos(Vec2::new(0.3, 0.4))
            .with_attach_limb_rotation(90.0);

        // Facing right: surface angle -pi plus a quarter turn
        let mut scene = Scene::new(Vec2::new(0.0, 0.1));
        let mut controller = scene.controller(config.clone());
        scene.tick(&mut controller);

        let angle = scene.physics.get_angle(scene.head()).unwrap();
        assert!((angle.sin() + 1.0).abs() < 1e-4);
        let weld = scene.physics.weld(controller.constraints()[0]).unwrap();
        assert!((weld.local_anchor_a - Vec2::new(0.3, 0.4)).length() < 1e-4);

        // Facing left: the quarter turn and the anchor are mirrored
        let mut scene = Scene::new(Vec2::new(0.0, 0.1));
        scene.creature.ragdoll.set_dir(-1.0);
        let mut controller = scene.controller(config);
        scene.tick(&mut controller);

        let angle = scene.physics.get_angle(scene.head()).unwrap();
        assert!((angle.sin() - 1.0).abs() < 1e-4);
        let weld = scene.physics.weld(controller.constraints()[0]).unwrap();
        assert!((weld.local_anchor_a - Vec2::new(-0.3, 0.4)).length() < 1e-4);

        let head = scene.physics.get_position(scene.head()).unwrap();
        assert!((head - Vec2::new(0.0, -0.5)).length() < 1e-4);
    }

    #[test]
    fn test_removed_attack_target_is_dropped() {
        let (mut scene, mut controller) = attached_to_vessel(0.0, 3.0, 10.0);
        let hull = hull_of(&scene);
        scene.physics.remove_body(hull);

        scene.tick(&mut controller);

        assert!(!controller.is_attached());
        assert!(controller.constraints().is_empty());
        assert_eq!(controller.attach_target(), None);
        assert_eq!(controller.current_wall_attach_point(), None);
        scene.assert_constraint_invariant(&controller);
    }

    #[test]
    fn test_creature_death_flag_clears_targets() {
        let mut scene = Scene::new(Vec2::new(0.0, 0.1));
        let mut controller = scene.wall_controller();
        scene.tick(&mut controller);
        assert!(controller.current_wall_attach_point().is_some());

        scene.creature.dead = true;
        scene.tick(&mut controller);

        assert!(controller.is_dead());
        assert!(!controller.is_attached());
        assert_eq!(controller.attach_target(), None);
        assert_eq!(controller.current_wall_attach_point(), None);
        assert_eq!(scene.detach_causes(), vec![DetachCause::Death]);
        scene.assert_constraint_invariant(&controller);
    }

    #[test]
    fn test_controller_keeps_creature_name() {
        let scene = Scene::new(Vec2::new(0.0, 5.0));
        let controller = scene.wall_controller();

        assert_eq!(controller.creature_name(), "crawler");
    }
}
