//! Headless demo: a creature bites onto a vessel hull, gets shaken off once
//! the vessel speeds up, then steers towards the wall below and latches on.

use latchon::prelude::*;

const DT: f32 = 1.0 / 60.0;
const TICKS: u32 = 1800;
const LETHAL_DAMAGE: f32 = 100.0;
/// Top speed the creature can swim at under its own steering
const MAX_SWIM_SPEED: f32 = 3.0;

struct Demo {
    physics: Physics,
    world: World,
    level: Level,
    events: EventQueue,
    creature: Creature,
    host: EnemyAi,
    controller: AttachmentController,
    hull: RigidBodyHandle,
}

impl Demo {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let mut physics = Physics::new();
        let mut world = World::new();

        let mut level = Level::new(10.0);
        level.add_wall(
            &mut physics,
            &[
                Vec2::new(-4.0, -6.0),
                Vec2::new(4.0, -6.0),
                Vec2::new(4.0, -4.0),
                Vec2::new(-4.0, -4.0),
            ],
        );

        let hull = physics.create_kinematic_body(Vec2::new(0.0, -2.0), 0.0, None);
        physics.add_box_collider(hull, Vec2::new(3.0, 0.5), 1.0);
        let vessel = world.spawn_vessel(&mut physics, "Typhon", hull);

        let entity = world.spawn((Name::new("Crawler"), Health::default()));
        let ragdoll = Ragdoll::spawn(
            &mut physics,
            Some(entity),
            Vec2::new(0.0, 0.0),
            BodyShape::capsule(0.25, 1.0),
            &[
                LimbSpec {
                    kind: LimbType::Torso,
                    offset: Vec2::ZERO,
                    radius: 0.3,
                },
                LimbSpec {
                    kind: LimbType::Head,
                    offset: Vec2::new(0.0, -0.6),
                    radius: 0.2,
                },
            ],
        );
        let creature = Creature::new(entity, "Crawler", ragdoll);

        let config = AttachConfig::from_ron(
            r#"(
                attach_to_walls: true,
                attach_to_vessel: true,
                min_deattach_speed: 2.0,
                max_deattach_speed: 6.0,
                damage_on_detach: 40.0,
                detach_stun: 1.0,
                local_attach_pos: (0.0, 0.2),
                attach_limb: "Head",
                seed: Some(7),
            )"#,
        )?;
        let controller = AttachmentController::new(config, &creature)?;

        let mut host = EnemyAi::new(4.0);
        host.state = AiState::Attack;
        host.attacking_limb = Some(AttackingLimb {
            world_position: Vec2::new(0.0, -1.5),
            damage_range: 1.0,
        });

        let mut demo = Self {
            physics,
            world,
            level,
            events: EventQueue::new(),
            creature,
            host,
            controller,
            hull,
        };
        // Top of the hull, relative to the vessel
        demo.controller
            .set_attach_target(hull, Some(vessel), Vec2::new(0.0, 0.5), Vec2::Y);

        Ok(demo)
    }

    fn tick(&mut self, tick: u32) {
        // The vessel speeds up over time
        let speed = tick as f32 * DT * 0.5;
        self.physics
            .set_linear_velocity(self.hull, Vec2::new(speed, 0.0));

        let position = self.creature.position(&self.physics).unwrap_or_default();
        let velocity = self.creature.velocity(&self.physics).unwrap_or_default();
        self.host.sync(position, velocity);
        self.host.steering_reset();

        let mut ctx = AttachContext {
            physics: &mut self.physics,
            world: &self.world,
            level: Some(&self.level as &dyn SpatialQuery),
            events: &mut self.events,
        };
        self.controller
            .update(&mut self.host, &self.creature, &mut ctx, DT);
        self.swim(velocity);

        self.physics.step(DT);
        self.events.swap();
        self.process_events();
    }

    /// Turn the host's steering into movement of the free creature
    fn swim(&mut self, velocity: Vec2) {
        if self.controller.is_attached() || self.creature.dead {
            return;
        }
        let steering = self.host.steering();
        if steering == Vec2::ZERO {
            return;
        }

        let velocity = (velocity + steering * DT).clamp_length_max(MAX_SWIM_SPEED);
        self.physics
            .set_linear_velocity(self.creature.ragdoll.collider, velocity);
    }

    fn process_events(&mut self) {
        let events: Vec<GameEvent> = self.events.drain().collect();
        for event in events {
            match event {
                GameEvent::CreatureDamaged {
                    entity,
                    amount,
                    stun,
                    ..
                } => {
                    self.world.apply_damage(entity, amount, stun);
                    let damage = self
                        .world
                        .inner
                        .get::<&Health>(entity)
                        .map_or(0.0, |health| health.damage);
                    log::info!(
                        "{} took {amount} damage ({damage} total)",
                        self.world.name_of(entity)
                    );
                    if damage >= LETHAL_DAMAGE {
                        self.events.push(GameEvent::CreatureDied { entity });
                    }
                    // Dazed: stop attacking the vessel and look for a wall
                    self.host.state = AiState::Idle;
                    self.host.attacking_limb = None;
                }
                GameEvent::CreatureDied { entity } => {
                    if entity == self.creature.entity {
                        self.creature.dead = true;
                    }
                    self.controller
                        .handle_event(&event, &mut self.physics, &mut self.events);
                }
                GameEvent::Attached { point, .. } => {
                    log::info!("{} latched on at {point}", self.creature.name);
                }
                GameEvent::Detached { cause, .. } => {
                    log::info!("{} let go: {cause}", self.creature.name);
                }
                _ => {}
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    log::info!("Starting latch demo");

    let mut demo = Demo::new()?;
    for tick in 0..TICKS {
        demo.tick(tick);
    }

    log::info!(
        "Finished after {TICKS} ticks: {}, {} constraints",
        demo.controller.state().name(),
        demo.physics.constraint_count()
    );
    Ok(())
}
