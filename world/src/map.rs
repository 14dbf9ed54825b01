use incursion_core::{
    geometry, EntityId, EntityKind, EntitySnapshot, EntityView, Event, Faction, LevelRecipe,
    PickupKind, SpawnRejection, TileGrid, Vec2, BOMB_EXPLOSION_RADIUS, BOMB_FUSE_SECONDS,
    BULLET_SPEED, EXPLOSION_MAX_DURATION, FACTION_BOMB_DROP_CHANCE, PLAYER_GUN_TURN_SPEED,
    PLAYER_TURN_SPEED,
};
use incursion_system_tank_ai::{TankAi, TankBrain};
use incursion_system_turret_ai::TurretAi;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::{
    collision,
    entity::{Behavior, Entity, PlayerState},
    perception::MapSensor,
    registry::Registry,
};

/// Random positions drawn before an enemy spawn request gives up.
const SPAWN_POINT_ATTEMPTS: u32 = 10_000;

/// Kinds that set off bombs and stop bullets. The player comes first so it can be sliced off.
const CONTACT_KINDS: [EntityKind; 5] = [
    EntityKind::Player,
    EntityKind::NpcTank,
    EntityKind::NpcTurret,
    EntityKind::Boulder,
    EntityKind::Bomb,
];

/// Kinds that push each other around. The player comes first so it can be sliced off.
const PUSHING_KINDS: [EntityKind; 4] = [
    EntityKind::Player,
    EntityKind::NpcTank,
    EntityKind::NpcTurret,
    EntityKind::Boulder,
];

const PICKUP_COLLECTORS: [EntityKind; 2] = [EntityKind::Player, EntityKind::NpcTank];
const BULLET_KINDS: [EntityKind; 2] = [EntityKind::GoodBullet, EntityKind::EvilBullet];
const COMBATANT_KINDS: [EntityKind; 3] = [
    EntityKind::Player,
    EntityKind::NpcTank,
    EntityKind::NpcTurret,
];

/// Passes that make up one tick after cleanup and the completion check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Stage {
    UpdateEntities,
    BombTriggers,
    Pickups,
    EntityCollisions,
    Bullets,
    TileCollisions,
}

impl Stage {
    pub(crate) const ORDER: [Stage; 6] = [
        Stage::UpdateEntities,
        Stage::BombTriggers,
        Stage::Pickups,
        Stage::EntityCollisions,
        Stage::Bullets,
        Stage::TileCollisions,
    ];
}

/// Session state a map borrows while it advances.
pub(crate) struct TickContext<'a> {
    pub(crate) rng: &'a mut ChaCha8Rng,
    pub(crate) events: &'a mut Vec<Event>,
    pub(crate) tank_ai: &'a TankAi,
    pub(crate) turret_ai: &'a TurretAi,
    pub(crate) player_collision: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Projectile {
    Bullet,
    Bomb,
}

/// One level: its tiles and the entities living on them.
#[derive(Clone, Debug)]
pub(crate) struct Map {
    pub(crate) grid: TileGrid,
    pub(crate) registry: Registry,
    deaths: Vec<EntityId>,
    scratch: Vec<EntityId>,
    targets: Vec<EntityId>,
}

impl Map {
    pub(crate) fn new(grid: TileGrid) -> Self {
        Self {
            grid,
            registry: Registry::default(),
            deaths: Vec::new(),
            scratch: Vec::new(),
            targets: Vec::new(),
        }
    }

    /// Spawns the recipe's turrets, tanks and boulders, reporting the first kind that cannot be placed.
    pub(crate) fn start_up(
        &mut self,
        recipe: &LevelRecipe,
        ctx: &mut TickContext<'_>,
    ) -> Result<(), (EntityKind, SpawnRejection)> {
        let population = [
            (EntityKind::NpcTurret, Faction::Evil, recipe.turrets),
            (EntityKind::NpcTank, Faction::Evil, recipe.tanks),
            (EntityKind::Boulder, Faction::Neutral, recipe.boulders),
        ];
        for (kind, faction, count) in population {
            for _ in 0..count {
                let _ = self
                    .spawn_npc(kind, faction, None, ctx)
                    .map_err(|reason| (kind, reason))?;
            }
            if kind == EntityKind::NpcTurret {
                self.separate_turrets();
            }
        }
        Ok(())
    }

    /// Runs every stage in order, settling deaths after each one.
    pub(crate) fn run_stages(&mut self, dt: f32, ctx: &mut TickContext<'_>) {
        for stage in Stage::ORDER {
            self.run_stage(stage, dt, ctx);
        }
    }

    pub(crate) fn run_stage(&mut self, stage: Stage, dt: f32, ctx: &mut TickContext<'_>) {
        match stage {
            Stage::UpdateEntities => self.update_entities(dt, ctx),
            Stage::BombTriggers => self.trigger_bombs(ctx),
            Stage::Pickups => self.collect_pickups(ctx),
            Stage::EntityCollisions => self.resolve_entity_collisions(ctx),
            Stage::Bullets => self.resolve_bullets(ctx),
            Stage::TileCollisions => self.resolve_tile_collisions(),
        }
        self.settle_deaths(ctx);
    }

    /// Reclaims the slots of dead entities other than the player.
    pub(crate) fn prune_dead(&mut self) -> usize {
        self.registry.prune_dead()
    }

    fn player_id(&self) -> Option<EntityId> {
        self.registry
            .iter_kind(EntityKind::Player)
            .next()
            .map(|player| player.id)
    }

    pub(crate) fn live_player(&self) -> Option<&Entity> {
        self.registry
            .iter_kind(EntityKind::Player)
            .find(|player| player.alive)
    }

    /// A live player exists and every live combatant fights on its side.
    pub(crate) fn is_level_completed(&self) -> bool {
        let Some(player) = self.live_player() else {
            return false;
        };
        COMBATANT_KINDS.iter().all(|kind| {
            self.registry
                .iter_kind(*kind)
                .filter(|entity| entity.alive)
                .all(|entity| entity.faction == player.faction)
        })
    }

    pub(crate) fn view(&self, kind: EntityKind) -> EntityView {
        let snapshots: Vec<EntitySnapshot> = self
            .registry
            .iter_kind(kind)
            .filter(|entity| entity.alive)
            .map(Entity::snapshot)
            .collect();
        EntityView::from_snapshots(snapshots)
    }

    pub(crate) fn player_mut(&mut self) -> Option<&mut PlayerState> {
        let id = self.player_id()?;
        match &mut self.registry.get_mut(id)?.behavior {
            Behavior::Player(state) => Some(state),
            _ => None,
        }
    }

    fn spawn(
        &mut self,
        kind: EntityKind,
        faction: Faction,
        position: Vec2,
        orientation_degrees: f32,
        behavior: Behavior,
        events: &mut Vec<Event>,
    ) -> EntityId {
        let id = self.registry.insert(kind, |id| {
            Entity::new(id, faction, position, orientation_degrees, behavior)
        });
        events.push(Event::EntitySpawned {
            entity: id,
            faction,
        });
        id
    }

    fn spawn_explosion(
        &mut self,
        position: Vec2,
        radius: f32,
        duration: f32,
        events: &mut Vec<Event>,
    ) -> EntityId {
        self.spawn(
            EntityKind::Explosion,
            Faction::Neutral,
            position,
            0.0,
            Behavior::Explosion { radius, duration },
            events,
        )
    }

    /// Spawns a player, replacing any existing one at its position.
    pub(crate) fn spawn_player(
        &mut self,
        faction: Faction,
        preferred: Vec2,
        events: &mut Vec<Event>,
    ) -> EntityId {
        let position = self
            .player_id()
            .and_then(|previous| self.registry.remove(previous))
            .map_or(preferred, |previous| previous.position);
        self.spawn(
            EntityKind::Player,
            faction,
            position,
            0.0,
            Behavior::Player(PlayerState::default()),
            events,
        )
    }

    /// Removes the player so it can move to another map.
    pub(crate) fn take_player(&mut self) -> Option<Entity> {
        let id = self.player_id()?;
        self.registry.remove(id)
    }

    /// Adopts a player taken from another map under a fresh id.
    pub(crate) fn receive_player(
        &mut self,
        mut player: Entity,
        position: Vec2,
        events: &mut Vec<Event>,
    ) -> EntityId {
        player.position = position;
        let faction = player.faction;
        let id = self.registry.insert(EntityKind::Player, move |id| {
            player.id = id;
            player
        });
        events.push(Event::EntitySpawned {
            entity: id,
            faction,
        });
        id
    }

    /// Spawns a tank, turret or boulder at `at`, or at a random enemy spawn point.
    pub(crate) fn spawn_npc(
        &mut self,
        kind: EntityKind,
        faction: Faction,
        at: Option<Vec2>,
        ctx: &mut TickContext<'_>,
    ) -> Result<EntityId, SpawnRejection> {
        let behavior = match kind {
            EntityKind::NpcTank => Behavior::Tank(TankBrain::new()),
            EntityKind::NpcTurret => Behavior::Turret(ctx.turret_ai.brain()),
            EntityKind::Boulder => Behavior::Boulder,
            _ => return Err(SpawnRejection::NotAnNpc),
        };
        let position = match at {
            Some(position) => position,
            None => self
                .enemy_spawn_point(&mut *ctx.rng)
                .ok_or(SpawnRejection::NoSpawnableTile)?,
        };
        let id = self.spawn(kind, faction, position, 0.0, behavior, ctx.events);
        let orientation = ctx.rng.gen_range(0.0..360.0);
        if let Some(entity) = self.registry.get_mut(id) {
            collision::push_out_of_tiles(&self.grid, entity);
            entity.orientation_degrees = orientation;
        }
        Ok(id)
    }

    fn enemy_spawn_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Vec2> {
        let extent = self.grid.extent();
        if extent.x <= 0.0 || extent.y <= 0.0 {
            return None;
        }
        (0..SPAWN_POINT_ATTEMPTS)
            .map(|_| Vec2::new(rng.gen_range(0.0..extent.x), rng.gen_range(0.0..extent.y)))
            .find(|position| self.grid.is_enemy_spawnable_at(*position))
    }

    fn separate_turrets(&mut self) {
        let mut turrets = std::mem::take(&mut self.scratch);
        turrets.clear();
        self.registry.live_ids(&[EntityKind::NpcTurret], &mut turrets);
        for first in &turrets {
            for second in &turrets {
                let Some((a, b)) = self.registry.pair_mut(*first, *second) else {
                    continue;
                };
                let (moved_a, moved_b) = geometry::push_discs_apart(
                    a.position,
                    a.physics_radius,
                    b.position,
                    b.physics_radius,
                );
                a.position = moved_a;
                b.position = moved_b;
            }
        }
        self.scratch = turrets;
    }

    fn kill(&mut self, id: EntityId, events: &mut Vec<Event>) {
        let Some(entity) = self.registry.live_mut(id) else {
            return;
        };
        entity.alive = false;
        self.deaths.push(id);
        events.push(Event::EntityDied { entity: id });
        tracing::trace!(?id, "entity died");
    }

    fn damage(&mut self, id: EntityId, events: &mut Vec<Event>) {
        let Some(entity) = self.registry.live_mut(id) else {
            return;
        };
        entity.health -= 1;
        let health = entity.health;
        events.push(Event::EntityDamaged { entity: id, health });
        if health <= 0 {
            self.kill(id, events);
        }
    }

    /// Applies the side effects of every death recorded during the last stage.
    fn settle_deaths(&mut self, ctx: &mut TickContext<'_>) {
        let mut index = 0;
        while index < self.deaths.len() {
            let id = self.deaths[index];
            index += 1;
            let Some(entity) = self.registry.get(id) else {
                continue;
            };
            let (position, faction, radius) = (entity.position, entity.faction, entity.cosmetic_radius);
            match id.kind() {
                EntityKind::NpcTank | EntityKind::NpcTurret => {
                    let _ = self.spawn_explosion(
                        position,
                        radius,
                        0.5 * EXPLOSION_MAX_DURATION,
                        ctx.events,
                    );
                    let pickup = if ctx.rng.gen::<f32>() < FACTION_BOMB_DROP_CHANCE {
                        PickupKind::FactionBomb
                    } else {
                        PickupKind::Health
                    };
                    let _ = self.spawn(
                        EntityKind::Pickup,
                        faction.opposite(),
                        position,
                        0.0,
                        Behavior::Pickup(pickup),
                        ctx.events,
                    );
                }
                EntityKind::GoodBullet | EntityKind::EvilBullet => {
                    let _ = self.spawn_explosion(
                        position,
                        3.0 * radius,
                        0.1 * EXPLOSION_MAX_DURATION,
                        ctx.events,
                    );
                }
                EntityKind::Player => {
                    let _ = self.spawn_explosion(
                        position,
                        2.0 * radius,
                        EXPLOSION_MAX_DURATION,
                        ctx.events,
                    );
                }
                EntityKind::Bomb => self.detonate(id, faction, position, ctx.events),
                EntityKind::Boulder | EntityKind::Pickup | EntityKind::Explosion => {}
            }
        }
        self.deaths.clear();
    }

    /// Converts tanks and turrets strictly inside the blast radius to the bomb's faction.
    fn detonate(&mut self, bomb: EntityId, faction: Faction, position: Vec2, events: &mut Vec<Event>) {
        let mut targets = std::mem::take(&mut self.targets);
        targets.clear();
        self.registry
            .live_ids(&[EntityKind::NpcTank, EntityKind::NpcTurret], &mut targets);

        let mut converted = 0;
        for id in &targets {
            let Some(entity) = self.registry.live_mut(*id) else {
                continue;
            };
            if entity.faction == faction || entity.position.distance(position) >= BOMB_EXPLOSION_RADIUS {
                continue;
            }
            entity.faction = faction;
            let (at, radius) = (entity.position, entity.cosmetic_radius);
            converted += 1;
            events.push(Event::FactionSwitched {
                entity: *id,
                faction,
            });
            let _ = self.spawn_explosion(at, radius, 0.5 * EXPLOSION_MAX_DURATION, events);
        }
        self.targets = targets;

        let _ = self.spawn_explosion(
            position,
            BOMB_EXPLOSION_RADIUS,
            0.4 * EXPLOSION_MAX_DURATION,
            events,
        );
        events.push(Event::BombDetonated { bomb, converted });
        tracing::trace!(?bomb, converted, "bomb detonated");
    }

    fn launch(
        &mut self,
        shooter: EntityId,
        projectile: Projectile,
        heading: f32,
        muzzle_distance: f32,
        events: &mut Vec<Event>,
    ) {
        let Some(entity) = self.registry.live_mut(shooter) else {
            return;
        };
        let faction = entity.faction;
        let (kind, behavior) = match projectile {
            Projectile::Bomb => {
                if entity.bomb_charges == 0 {
                    return;
                }
                entity.bomb_charges -= 1;
                (EntityKind::Bomb, Behavior::Bomb)
            }
            Projectile::Bullet => match EntityKind::bullet_for(faction) {
                Some(kind) => (kind, Behavior::Bullet),
                None => return,
            },
        };
        let origin = entity.position + geometry::polar_degrees(heading, muzzle_distance);

        let projectile = self.spawn(kind, faction, origin, heading, behavior, events);
        if let Some(launched) = self.registry.get_mut(projectile) {
            launched.velocity = geometry::polar_degrees(heading, BULLET_SPEED);
        }
        events.push(Event::ShotFired {
            shooter,
            projectile,
        });
        tracing::trace!(?shooter, ?projectile, "shot fired");
    }

    fn update_entities(&mut self, dt: f32, ctx: &mut TickContext<'_>) {
        let mut ids = std::mem::take(&mut self.scratch);
        ids.clear();
        self.registry.live_ids(&EntityKind::ALL, &mut ids);
        for id in &ids {
            match id.kind() {
                EntityKind::Player => self.update_player(*id, dt, ctx),
                EntityKind::NpcTank => self.update_tank(*id, dt, ctx),
                EntityKind::NpcTurret => self.update_turret(*id, dt, ctx),
                _ => {
                    let Some(entity) = self.registry.live_mut(*id) else {
                        continue;
                    };
                    if expired(&self.grid, entity) {
                        self.kill(*id, ctx.events);
                    } else {
                        entity.integrate(dt);
                    }
                }
            }
        }
        self.scratch = ids;
    }

    fn update_player(&mut self, id: EntityId, dt: f32, ctx: &mut TickContext<'_>) {
        let Some(entity) = self.registry.live_mut(id) else {
            return;
        };
        let dt = dt * self.grid.speed_factor_at(entity.position);
        let Behavior::Player(state) = &mut entity.behavior else {
            return;
        };
        let intent = state.intent;
        state.intent.fire = false;
        state.intent.drop_bomb = false;

        let thrust = intent.thrust.clamp(0.0, 1.0);
        let mut hull = entity.orientation_degrees;
        if thrust > 0.0 {
            hull = geometry::turned_toward(hull, intent.heading_degrees, PLAYER_TURN_SPEED * dt);
        }
        if let Some(aim) = intent.aim_degrees {
            let gun = geometry::turned_toward(
                hull + state.gun_relative_degrees,
                aim,
                PLAYER_GUN_TURN_SPEED * dt,
            );
            state.gun_relative_degrees = gun - hull;
        }
        entity.orientation_degrees = hull;
        entity.velocity = if thrust > 0.0 {
            geometry::polar_degrees(hull, thrust * entity.speed_limit)
        } else {
            Vec2::ZERO
        };

        let gun = entity.gun_orientation_degrees();
        let muzzle = entity.cosmetic_radius;
        if intent.fire {
            self.launch(id, Projectile::Bullet, gun, muzzle, ctx.events);
        }
        if intent.drop_bomb {
            self.launch(id, Projectile::Bomb, gun, muzzle, ctx.events);
        }
        if let Some(entity) = self.registry.live_mut(id) {
            entity.integrate(dt);
        }
    }

    fn update_tank(&mut self, id: EntityId, dt: f32, ctx: &mut TickContext<'_>) {
        let Some(entity) = self.registry.live(id) else {
            return;
        };
        let Behavior::Tank(brain) = &entity.behavior else {
            return;
        };
        let mut brain = brain.clone();
        let dt = dt * self.grid.speed_factor_at(entity.position);
        let pose = entity.pose();
        let projectile = if entity.bomb_charges > 0 {
            Projectile::Bomb
        } else {
            Projectile::Bullet
        };

        let sensor = MapSensor::new(&self.grid, &self.registry);
        let command = ctx.tank_ai.think(&mut brain, pose, &sensor, &mut *ctx.rng, dt);
        if command.fire {
            self.launch(
                id,
                projectile,
                pose.orientation_degrees,
                pose.physics_radius,
                ctx.events,
            );
        }

        let Some(entity) = self.registry.live_mut(id) else {
            return;
        };
        entity.behavior = Behavior::Tank(brain);
        entity.orientation_degrees = command.orientation_degrees;
        entity.velocity = command.velocity;
        entity.integrate(dt);
    }

    fn update_turret(&mut self, id: EntityId, dt: f32, ctx: &mut TickContext<'_>) {
        let Some(entity) = self.registry.live(id) else {
            return;
        };
        let Behavior::Turret(brain) = &entity.behavior else {
            return;
        };
        let mut brain = brain.clone();
        let pose = entity.pose();
        let muzzle = entity.cosmetic_radius;

        let sensor = MapSensor::new(&self.grid, &self.registry);
        let command = ctx.turret_ai.think(&mut brain, pose, &sensor, dt);
        if command.fire {
            self.launch(
                id,
                Projectile::Bullet,
                command.orientation_degrees,
                muzzle,
                ctx.events,
            );
        }

        let Some(entity) = self.registry.live_mut(id) else {
            return;
        };
        entity.behavior = Behavior::Turret(brain);
        entity.orientation_degrees = command.orientation_degrees;
        entity.angular_velocity = command.angular_velocity;
        entity.integrate(dt);
    }

    fn trigger_bombs(&mut self, ctx: &mut TickContext<'_>) {
        let mut bombs = std::mem::take(&mut self.scratch);
        let mut others = std::mem::take(&mut self.targets);
        bombs.clear();
        others.clear();
        self.registry.live_ids(&[EntityKind::Bomb], &mut bombs);
        self.registry
            .live_ids(participants(&CONTACT_KINDS, ctx.player_collision), &mut others);

        for bomb in &bombs {
            for other in &others {
                if bomb == other {
                    continue;
                }
                let Some(armed) = self.registry.live(*bomb) else {
                    break;
                };
                let Some(touched) = self.registry.live(*other) else {
                    continue;
                };
                if armed.faction == touched.faction || !armed.overlaps(touched) {
                    continue;
                }
                self.kill(*bomb, ctx.events);
                if other.kind() == EntityKind::Bomb {
                    self.kill(*other, ctx.events);
                }
                break;
            }
        }

        self.scratch = bombs;
        self.targets = others;
    }

    fn collect_pickups(&mut self, ctx: &mut TickContext<'_>) {
        let mut pickups = std::mem::take(&mut self.scratch);
        let mut collectors = std::mem::take(&mut self.targets);
        pickups.clear();
        collectors.clear();
        self.registry.live_ids(&[EntityKind::Pickup], &mut pickups);
        self.registry.live_ids(&PICKUP_COLLECTORS, &mut collectors);

        for pickup in &pickups {
            for collector in &collectors {
                let Some(item) = self.registry.live(*pickup) else {
                    break;
                };
                let Some(holder) = self.registry.live(*collector) else {
                    continue;
                };
                if item.faction != holder.faction || !item.overlaps(holder) {
                    continue;
                }
                let Behavior::Pickup(kind) = item.behavior else {
                    break;
                };
                if let Some(holder) = self.registry.live_mut(*collector) {
                    holder.collect(kind);
                }
                ctx.events.push(Event::PickupCollected {
                    pickup: *pickup,
                    collector: *collector,
                    kind,
                });
                self.kill(*pickup, ctx.events);
                break;
            }
        }

        self.scratch = pickups;
        self.targets = collectors;
    }

    fn resolve_entity_collisions(&mut self, ctx: &mut TickContext<'_>) {
        let mut ids = std::mem::take(&mut self.scratch);
        ids.clear();
        self.registry
            .live_ids(participants(&PUSHING_KINDS, ctx.player_collision), &mut ids);
        for first in &ids {
            for second in &ids {
                let Some((a, b)) = self.registry.pair_mut(*first, *second) else {
                    continue;
                };
                if a.alive && b.alive {
                    collision::resolve_pair(a, b);
                }
            }
        }
        self.scratch = ids;
    }

    fn resolve_bullets(&mut self, ctx: &mut TickContext<'_>) {
        let mut bullets = std::mem::take(&mut self.scratch);
        let mut targets = std::mem::take(&mut self.targets);
        bullets.clear();
        targets.clear();
        self.registry.live_ids(&BULLET_KINDS, &mut bullets);
        self.registry
            .live_ids(participants(&CONTACT_KINDS, ctx.player_collision), &mut targets);

        for bullet in &bullets {
            for target in &targets {
                let Some((shot, hit)) = self.registry.pair_mut(*bullet, *target) else {
                    continue;
                };
                if !shot.alive {
                    break;
                }
                if !hit.alive || shot.faction == hit.faction || !shot.overlaps(hit) {
                    continue;
                }
                if target.kind() == EntityKind::Boulder {
                    collision::deflect(shot, hit);
                    ctx.events.push(Event::BulletDeflected {
                        bullet: *bullet,
                        boulder: *target,
                    });
                    continue;
                }
                if !hit.capabilities.damaged_by_bullets() {
                    continue;
                }
                self.damage(*bullet, ctx.events);
                self.damage(*target, ctx.events);
            }
        }

        self.scratch = bullets;
        self.targets = targets;
    }

    fn resolve_tile_collisions(&mut self) {
        let grid = &self.grid;
        for entity in self.registry.iter_mut().filter(|entity| entity.alive) {
            collision::push_out_of_tiles(grid, entity);
        }
    }
}

/// Drops the leading player kind when the player is excluded from collisions.
fn participants(kinds: &[EntityKind], player_collision: bool) -> &[EntityKind] {
    match kinds.split_first() {
        Some((EntityKind::Player, rest)) if !player_collision => rest,
        _ => kinds,
    }
}

/// Reports whether a passive entity dies this update instead of moving.
fn expired(grid: &TileGrid, entity: &Entity) -> bool {
    match entity.behavior {
        Behavior::Bullet => grid.is_solid_at(entity.position),
        Behavior::Bomb => {
            entity.living_time > BOMB_FUSE_SECONDS && grid.is_solid_at(entity.position)
        }
        Behavior::Explosion { duration, .. } => entity.living_time > duration,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use incursion_core::{PlayerIntent, TileDefinitions, TileType};
    use rand::SeedableRng;

    struct Harness {
        rng: ChaCha8Rng,
        events: Vec<Event>,
        tank_ai: TankAi,
        turret_ai: TurretAi,
        player_collision: bool,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                rng: ChaCha8Rng::seed_from_u64(11),
                events: Vec::new(),
                tank_ai: TankAi::default(),
                turret_ai: TurretAi::default(),
                player_collision: true,
            }
        }

        fn ctx(&mut self) -> TickContext<'_> {
            TickContext {
                rng: &mut self.rng,
                events: &mut self.events,
                tank_ai: &self.tank_ai,
                turret_ai: &self.turret_ai,
                player_collision: self.player_collision,
            }
        }

        fn died(&self, id: EntityId) -> bool {
            self.events.contains(&Event::EntityDied { entity: id })
        }
    }

    fn walled_map(width: u32, height: u32) -> Map {
        let definitions = TileDefinitions::standard().expect("standard table");
        let mut grid = TileGrid::filled(width, height, TileType::Grass, definitions);
        for (coord, _) in grid.clone().iter() {
            if grid.is_edge(coord) {
                let _ = grid.set(coord, TileType::Stone);
            }
        }
        Map::new(grid)
    }

    fn place(
        map: &mut Map,
        harness: &mut Harness,
        kind: EntityKind,
        faction: Faction,
        position: Vec2,
    ) -> EntityId {
        let behavior = match kind {
            EntityKind::Player => Behavior::Player(PlayerState::default()),
            EntityKind::NpcTank => Behavior::Tank(TankBrain::new()),
            EntityKind::NpcTurret => Behavior::Turret(harness.turret_ai.brain()),
            EntityKind::GoodBullet | EntityKind::EvilBullet => Behavior::Bullet,
            EntityKind::Bomb => Behavior::Bomb,
            EntityKind::Pickup => Behavior::Pickup(PickupKind::Health),
            EntityKind::Explosion => Behavior::Explosion {
                radius: 1.0,
                duration: 0.3,
            },
            EntityKind::Boulder => Behavior::Boulder,
        };
        map.spawn(kind, faction, position, 0.0, behavior, &mut harness.events)
    }

    fn entity(map: &Map, id: EntityId) -> &Entity {
        map.registry.get(id).expect("entity stored")
    }

    #[test]
    fn full_health_pickup_is_consumed_without_exceeding_the_limit() {
        let mut map = walled_map(10, 10);
        let mut harness = Harness::new();
        let player = place(&mut map, &mut harness, EntityKind::Player, Faction::Good, Vec2::new(3.0, 3.0));
        let pickup = place(&mut map, &mut harness, EntityKind::Pickup, Faction::Good, Vec2::new(3.2, 3.0));

        map.run_stage(Stage::Pickups, 0.0, &mut harness.ctx());
        assert!(harness.died(pickup));
        assert!(harness.events.contains(&Event::PickupCollected {
            pickup,
            collector: player,
            kind: PickupKind::Health,
        }));
        let collector = entity(&map, player);
        assert_eq!(collector.health, collector.health_limit);
    }

    #[test]
    fn mismatched_pickup_is_left_in_place() {
        let mut map = walled_map(10, 10);
        let mut harness = Harness::new();
        let _ = place(&mut map, &mut harness, EntityKind::Player, Faction::Good, Vec2::new(3.0, 3.0));
        let pickup = place(&mut map, &mut harness, EntityKind::Pickup, Faction::Evil, Vec2::new(3.2, 3.0));

        map.run_stage(Stage::Pickups, 0.0, &mut harness.ctx());
        assert!(entity(&map, pickup).alive);
    }

    #[test]
    fn bomb_converts_strictly_inside_its_radius() {
        let mut map = walled_map(20, 12);
        let mut harness = Harness::new();
        let bomb = place(&mut map, &mut harness, EntityKind::Bomb, Faction::Good, Vec2::new(10.0, 5.5));
        let _ = place(&mut map, &mut harness, EntityKind::Boulder, Faction::Neutral, Vec2::new(10.2, 5.5));
        let near = place(&mut map, &mut harness, EntityKind::NpcTank, Faction::Evil, Vec2::new(13.99, 5.5));
        let rim = place(&mut map, &mut harness, EntityKind::NpcTurret, Faction::Evil, Vec2::new(10.0, 9.5));
        let ally = place(&mut map, &mut harness, EntityKind::NpcTank, Faction::Good, Vec2::new(8.0, 5.5));

        map.run_stage(Stage::BombTriggers, 0.0, &mut harness.ctx());
        assert!(harness.died(bomb));
        assert_eq!(entity(&map, near).faction, Faction::Good);
        assert_eq!(entity(&map, rim).faction, Faction::Evil);
        assert_eq!(entity(&map, ally).faction, Faction::Good);
        assert!(harness.events.contains(&Event::BombDetonated { bomb, converted: 1 }));
        assert!(harness.events.contains(&Event::FactionSwitched {
            entity: near,
            faction: Faction::Good,
        }));
    }

    #[test]
    fn bombs_ignore_their_own_faction() {
        let mut map = walled_map(10, 10);
        let mut harness = Harness::new();
        let bomb = place(&mut map, &mut harness, EntityKind::Bomb, Faction::Good, Vec2::new(4.0, 4.0));
        let _ = place(&mut map, &mut harness, EntityKind::Player, Faction::Good, Vec2::new(4.1, 4.0));
        map.run_stage(Stage::BombTriggers, 0.0, &mut harness.ctx());
        assert!(entity(&map, bomb).alive);
    }

    #[test]
    fn last_hit_point_kills_on_that_exact_hit() {
        let mut map = walled_map(10, 10);
        let mut harness = Harness::new();
        let player = place(&mut map, &mut harness, EntityKind::Player, Faction::Good, Vec2::new(4.0, 4.0));
        map.registry.get_mut(player).expect("player").health = 2;

        let first = place(&mut map, &mut harness, EntityKind::EvilBullet, Faction::Evil, Vec2::new(4.2, 4.0));
        map.run_stage(Stage::Bullets, 0.0, &mut harness.ctx());
        assert!(harness.died(first));
        assert!(!harness.died(player));
        assert_eq!(entity(&map, player).health, 1);

        let _ = map.prune_dead();
        let second = place(&mut map, &mut harness, EntityKind::EvilBullet, Faction::Evil, Vec2::new(4.2, 4.0));
        map.run_stage(Stage::Bullets, 0.0, &mut harness.ctx());
        assert!(harness.died(second));
        assert!(harness.events.contains(&Event::EntityDamaged { entity: player, health: 0 }));
        assert!(harness.died(player));
        assert!(map.live_player().is_none());
    }

    #[test]
    fn disabled_player_collision_lets_bullets_pass() {
        let mut map = walled_map(10, 10);
        let mut harness = Harness::new();
        harness.player_collision = false;
        let player = place(&mut map, &mut harness, EntityKind::Player, Faction::Good, Vec2::new(4.0, 4.0));
        let bullet = place(&mut map, &mut harness, EntityKind::EvilBullet, Faction::Evil, Vec2::new(4.2, 4.0));
        map.run_stage(Stage::Bullets, 0.0, &mut harness.ctx());
        assert!(entity(&map, bullet).alive);
        assert_eq!(entity(&map, player).health, entity(&map, player).health_limit);
    }

    #[test]
    fn boulders_deflect_bullets_without_damage() {
        let mut map = walled_map(10, 10);
        let mut harness = Harness::new();
        let boulder = place(&mut map, &mut harness, EntityKind::Boulder, Faction::Neutral, Vec2::new(5.0, 5.0));
        let bullet = place(&mut map, &mut harness, EntityKind::GoodBullet, Faction::Good, Vec2::new(4.75, 5.1));
        map.registry.get_mut(bullet).expect("bullet").velocity = Vec2::new(2.0, 0.0);

        map.run_stage(Stage::Bullets, 0.0, &mut harness.ctx());
        let deflected = entity(&map, bullet);
        assert!(deflected.alive);
        assert!((deflected.velocity.length() - 2.0).abs() < 1e-4);
        assert!(deflected.velocity.x < 0.0);
        assert!(harness.events.contains(&Event::BulletDeflected { bullet, boulder }));
    }

    #[test]
    fn bullets_die_in_walls_and_leave_an_explosion() {
        let mut map = walled_map(10, 10);
        let mut harness = Harness::new();
        let bullet = place(&mut map, &mut harness, EntityKind::GoodBullet, Faction::Good, Vec2::new(0.5, 4.0));
        map.run_stage(Stage::UpdateEntities, 0.1, &mut harness.ctx());
        assert!(harness.died(bullet));
        assert_eq!(map.view(EntityKind::Explosion).len(), 1);
        assert_eq!(map.prune_dead(), 1);
    }

    #[test]
    fn destroyed_turret_drops_an_opposite_pickup() {
        let mut map = walled_map(10, 10);
        let mut harness = Harness::new();
        let turret = place(&mut map, &mut harness, EntityKind::NpcTurret, Faction::Evil, Vec2::new(5.0, 5.0));
        map.registry.get_mut(turret).expect("turret").health = 1;
        let _ = place(&mut map, &mut harness, EntityKind::GoodBullet, Faction::Good, Vec2::new(5.2, 5.0));

        map.run_stage(Stage::Bullets, 0.0, &mut harness.ctx());
        let pickups = map.view(EntityKind::Pickup).into_vec();
        assert_eq!(pickups.len(), 1);
        assert_eq!(pickups[0].faction, Faction::Good);
        assert!(pickups[0].pickup.is_some());
    }

    #[test]
    fn level_completes_once_every_combatant_sides_with_the_player() {
        let mut map = walled_map(10, 10);
        let mut harness = Harness::new();
        assert!(!map.is_level_completed());
        let _ = place(&mut map, &mut harness, EntityKind::Player, Faction::Good, Vec2::new(2.0, 2.0));
        let tank = place(&mut map, &mut harness, EntityKind::NpcTank, Faction::Evil, Vec2::new(6.0, 6.0));
        let _ = place(&mut map, &mut harness, EntityKind::Boulder, Faction::Neutral, Vec2::new(4.0, 6.0));
        assert!(!map.is_level_completed());
        map.registry.get_mut(tank).expect("tank").faction = Faction::Good;
        assert!(map.is_level_completed());
    }

    #[test]
    fn respawned_player_replaces_the_old_one_in_place() {
        let mut map = walled_map(10, 10);
        let mut harness = Harness::new();
        let first = map.spawn_player(Faction::Good, Vec2::new(1.5, 1.5), &mut harness.events);
        map.registry.get_mut(first).expect("player").position = Vec2::new(6.0, 3.0);
        let second = map.spawn_player(Faction::Good, Vec2::new(1.5, 1.5), &mut harness.events);
        assert!(map.registry.get(first).is_none());
        assert_eq!(entity(&map, second).position, Vec2::new(6.0, 3.0));
        assert_eq!(map.view(EntityKind::Player).len(), 1);
    }

    #[test]
    fn player_fire_is_consumed_after_one_shot() {
        let mut map = walled_map(10, 10);
        let mut harness = Harness::new();
        let player = map.spawn_player(Faction::Good, Vec2::new(3.5, 3.5), &mut harness.events);
        if let Some(state) = map.player_mut() {
            state.intent = PlayerIntent {
                thrust: 1.0,
                heading_degrees: 0.0,
                aim_degrees: Some(0.0),
                fire: true,
                drop_bomb: true,
            };
        }
        map.run_stage(Stage::UpdateEntities, 0.1, &mut harness.ctx());
        map.run_stage(Stage::UpdateEntities, 0.1, &mut harness.ctx());
        let shots = harness
            .events
            .iter()
            .filter(|event| matches!(event, Event::ShotFired { shooter, .. } if *shooter == player))
            .count();
        assert_eq!(shots, 1);
        assert_eq!(map.view(EntityKind::Bomb).len(), 0);
        assert!((entity(&map, player).position.x - 3.7).abs() < 1e-5);
    }

    #[test]
    fn start_up_populates_the_recipe_population() {
        let mut map = walled_map(16, 16);
        let mut harness = Harness::new();
        let recipe = LevelRecipe {
            width: 16,
            height: 16,
            default_tile: TileType::Grass,
            edge_tile: TileType::Stone,
            start_tile: TileType::Ground,
            end_tile: TileType::Ground,
            worms: Vec::new(),
            turrets: 6,
            tanks: 2,
            boulders: 3,
        };
        map.start_up(&recipe, &mut harness.ctx()).expect("populated");

        assert_eq!(map.view(EntityKind::NpcTurret).len(), 6);
        assert_eq!(map.view(EntityKind::NpcTank).len(), 2);
        let boulders = map.view(EntityKind::Boulder).into_vec();
        assert_eq!(boulders.len(), 3);
        assert!(boulders.iter().all(|boulder| boulder.faction == Faction::Neutral));
        assert!(map
            .view(EntityKind::NpcTank)
            .iter()
            .all(|tank| tank.faction == Faction::Evil));
    }

    #[test]
    fn start_up_reports_unplaceable_kinds() {
        let mut map = walled_map(10, 10);
        for (coord, _) in map.grid.clone().iter() {
            let _ = map.grid.set(coord, TileType::Ground);
        }
        let mut harness = Harness::new();
        let recipe = LevelRecipe {
            width: 10,
            height: 10,
            default_tile: TileType::Ground,
            edge_tile: TileType::Stone,
            start_tile: TileType::Ground,
            end_tile: TileType::Ground,
            worms: Vec::new(),
            turrets: 0,
            tanks: 1,
            boulders: 0,
        };
        assert_eq!(
            map.start_up(&recipe, &mut harness.ctx()),
            Err((EntityKind::NpcTank, SpawnRejection::NoSpawnableTile))
        );
    }

    #[test]
    fn npc_spawns_land_on_spawnable_tiles() {
        let mut map = walled_map(12, 12);
        let mut harness = Harness::new();
        for _ in 0..20 {
            let id = map
                .spawn_npc(EntityKind::NpcTank, Faction::Evil, None, &mut harness.ctx())
                .expect("spawn point found");
            let tank = entity(&map, id);
            assert!(!map.grid.is_solid_at(tank.position));
            assert!((0.0..360.0).contains(&tank.orientation_degrees));
        }
        assert_eq!(
            map.spawn_npc(EntityKind::Bomb, Faction::Evil, None, &mut harness.ctx()),
            Err(SpawnRejection::NotAnNpc)
        );
    }
}
