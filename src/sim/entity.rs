//! Entity record, identifiers and the closed set of behaviours

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{DVec2, IVec2};
use serde::{Deserialize, Serialize};

use super::body::{Body, MotionLaw, TerrainContact};
use super::geometry::PixelBox;
use super::plant::PlantState;
use super::player::PlayerState;
use super::school::SchoolId;
use super::shark::SharkState;
use super::slime::SlimeState;
use super::stage::Stage;
use crate::consts::{
    MAX_WORLD_DT, PLANT_SPEED, PLAYER_ACCELERATION, PLAYER_MAX_HP, PLAYER_MAX_SPEED,
    PLAYER_MIN_SPEED, PLAYER_MIN_SPRITES, PLAYER_START_HP, SHARK_ACCELERATION, SHARK_START_HP,
    SKULLCAB_HP, SKULLCAB_LIFETIME, SLIME_ACCELERATION, SLIME_MAX_SPEED, SLIME_START_HP,
    SNEEZEWORT_HP, SNEEZEWORT_LIFETIME,
};
use crate::error::{Result, SimError};

/// Registry key of an entity inside a world (assigned on registration)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Identity of a world instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorldId(pub u64);

impl WorldId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        WorldId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Slime identifier, unique within the world that reserved it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlimeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Sneezewort,
    Skullcab,
    Slime,
    Shark,
}

impl EntityKind {
    /// Plants never block and are never blocked
    pub const fn is_plant(self) -> bool {
        matches!(self, EntityKind::Sneezewort | EntityKind::Skullcab)
    }

    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Small set of entity kinds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct KindSet(u8);

impl KindSet {
    pub fn insert(&mut self, kind: EntityKind) {
        self.0 |= kind.bit();
    }

    pub fn contains(&self, kind: EntityKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<EntityKind> for KindSet {
    fn from_iter<I: IntoIterator<Item = EntityKind>>(iter: I) -> Self {
        let mut set = KindSet::default();
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

/// Sprite dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprite {
    pub width: i32,
    pub height: i32,
}

impl Sprite {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    #[inline]
    pub const fn sign(self) -> f64 {
        match self {
            Direction::Left => -1.0,
            Direction::Right => 1.0,
        }
    }

    #[inline]
    pub const fn orientation(self) -> i32 {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
        }
    }

    pub const fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// Commands a player accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerAction {
    StartMove(Direction),
    EndMove,
    StartJump,
    EndJump,
    StartDuck,
    EndDuck,
}

impl PlayerAction {
    pub const fn name(self) -> &'static str {
        match self {
            PlayerAction::StartMove(_) => "start move",
            PlayerAction::EndMove => "end move",
            PlayerAction::StartJump => "start jump",
            PlayerAction::EndJump => "end jump",
            PlayerAction::StartDuck => "start duck",
            PlayerAction::EndDuck => "end duck",
        }
    }
}

/// Variant-specific state machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Behavior {
    Player(PlayerState),
    Plant(PlantState),
    Slime(SlimeState),
    Shark(SharkState),
}

fn validate_sprites(kind: EntityKind, sprites: &[Sprite]) -> Result<()> {
    if let Some(bad) = sprites.iter().find(|s| s.width < 1 || s.height < 1) {
        return Err(SimError::InvalidSprites(format!(
            "{kind:?} sprite {}x{} must be at least 1x1",
            bad.width, bad.height
        )));
    }
    let count = sprites.len();
    let ok = match kind {
        EntityKind::Player => count >= PLAYER_MIN_SPRITES && count % 2 == 0,
        EntityKind::Sneezewort | EntityKind::Skullcab | EntityKind::Slime => count == 2,
        EntityKind::Shark => count == 3,
    };
    if ok {
        Ok(())
    } else {
        Err(SimError::InvalidSprites(format!(
            "{kind:?} cannot use {count} sprites"
        )))
    }
}

fn validate_pixels(x: i32, y: i32) -> Result<IVec2> {
    if x < 0 || y < 0 {
        return Err(SimError::InvalidCoordinate(format!("({x}, {y}) is negative")));
    }
    Ok(IVec2::new(x, y))
}

/// A simulated object: physical body plus its behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub(crate) body: Body,
    pub(crate) behavior: Behavior,
}

impl Entity {
    pub fn player(x: i32, y: i32, sprites: Vec<Sprite>) -> Result<Self> {
        validate_sprites(EntityKind::Player, &sprites)?;
        let pixels = validate_pixels(x, y)?;
        let body = Body::new(
            EntityKind::Player,
            pixels,
            sprites,
            PLAYER_START_HP,
            PLAYER_MAX_HP,
        )
        .with_laws(
            Some(MotionLaw::new(
                PLAYER_MIN_SPEED,
                PLAYER_MAX_SPEED,
                PLAYER_ACCELERATION,
            )),
            Some(MotionLaw::free(0.0)),
        );
        Ok(Self {
            body,
            behavior: Behavior::Player(PlayerState::default()),
        })
    }

    /// Horizontal walker plant
    pub fn sneezewort(x: i32, y: i32, sprites: Vec<Sprite>) -> Result<Self> {
        validate_sprites(EntityKind::Sneezewort, &sprites)?;
        let pixels = validate_pixels(x, y)?;
        let mut body = Body::new(
            EntityKind::Sneezewort,
            pixels,
            sprites,
            SNEEZEWORT_HP,
            SNEEZEWORT_HP,
        )
        .with_laws(Some(MotionLaw::fixed(PLANT_SPEED)), None);
        let state = PlantState::new(SNEEZEWORT_LIFETIME);
        state.launch(&mut body);
        Ok(Self {
            body,
            behavior: Behavior::Plant(state),
        })
    }

    /// Vertical bobber plant
    pub fn skullcab(x: i32, y: i32, sprites: Vec<Sprite>) -> Result<Self> {
        validate_sprites(EntityKind::Skullcab, &sprites)?;
        let pixels = validate_pixels(x, y)?;
        let mut body = Body::new(EntityKind::Skullcab, pixels, sprites, SKULLCAB_HP, SKULLCAB_HP)
            .with_laws(None, Some(MotionLaw::fixed(PLANT_SPEED)));
        let state = PlantState::new(SKULLCAB_LIFETIME);
        state.launch(&mut body);
        Ok(Self {
            body,
            behavior: Behavior::Plant(state),
        })
    }

    pub fn shark(x: i32, y: i32, sprites: Vec<Sprite>) -> Result<Self> {
        validate_sprites(EntityKind::Shark, &sprites)?;
        let pixels = validate_pixels(x, y)?;
        let body = Body::new(EntityKind::Shark, pixels, sprites, SHARK_START_HP, i32::MAX)
            .with_laws(Some(MotionLaw::free(SHARK_ACCELERATION)), Some(MotionLaw::free(0.0)));
        Ok(Self {
            body,
            behavior: Behavior::Shark(SharkState::default()),
        })
    }

    /// Slimes are created through [`World::create_slime`](super::World::create_slime),
    /// which reserves the id
    pub(crate) fn slime(
        x: i32,
        y: i32,
        sprites: Vec<Sprite>,
        id: SlimeId,
        home: WorldId,
        school: Option<SchoolId>,
    ) -> Result<Self> {
        validate_sprites(EntityKind::Slime, &sprites)?;
        let pixels = validate_pixels(x, y)?;
        let mut body = Body::new(EntityKind::Slime, pixels, sprites, SLIME_START_HP, i32::MAX)
            .with_laws(
                Some(MotionLaw::new(0.0, SLIME_MAX_SPEED, SLIME_ACCELERATION)),
                None,
            );
        let state = SlimeState::new(id, home, school);
        state.launch(&mut body);
        Ok(Self {
            body,
            behavior: Behavior::Slime(state),
        })
    }

    // --- accessors ---

    pub fn kind(&self) -> EntityKind {
        self.body.kind
    }

    /// Continuous position in meters
    pub fn position(&self) -> DVec2 {
        self.body.meters()
    }

    pub fn pixel_position(&self) -> IVec2 {
        self.body.pixels()
    }

    pub fn velocity(&self) -> DVec2 {
        self.body.velocity
    }

    pub fn acceleration(&self) -> DVec2 {
        self.body.acceleration
    }

    pub fn horizontal_law(&self) -> Option<MotionLaw> {
        self.body.horizontal
    }

    pub fn vertical_law(&self) -> Option<MotionLaw> {
        self.body.vertical
    }

    pub fn orientation(&self) -> i32 {
        self.body.orientation
    }

    pub fn hit_points(&self) -> i32 {
        self.body.hit_points
    }

    pub fn max_hit_points(&self) -> i32 {
        self.body.max_hit_points
    }

    pub fn sprites(&self) -> &[Sprite] {
        &self.body.sprites
    }

    pub fn current_sprite(&self) -> Sprite {
        self.body.sprite()
    }

    pub fn current_sprite_index(&self) -> usize {
        self.body.current_sprite
    }

    pub fn is_dead(&self) -> bool {
        self.body.dead
    }

    pub fn is_terminated(&self) -> bool {
        self.body.terminated
    }

    /// World this entity is registered in
    pub fn world(&self) -> Option<WorldId> {
        self.body.world
    }

    pub fn bounding_box(&self) -> PixelBox {
        self.body.bounding_box()
    }

    pub fn terrain_contact(&self) -> TerrainContact {
        self.body.contact
    }

    pub fn is_in_water(&self) -> bool {
        self.body.contact.in_water
    }

    pub fn is_in_magma(&self) -> bool {
        self.body.contact.in_magma
    }

    pub fn is_in_gas(&self) -> bool {
        self.body.contact.in_gas
    }

    pub fn is_on_ground(&self) -> bool {
        self.body.contact.on_ground
    }

    pub fn is_submerged(&self) -> bool {
        self.body.contact.submerged
    }

    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    pub fn is_moving(&self) -> bool {
        match &self.behavior {
            Behavior::Player(p) => p.is_moving(),
            _ => self.body.velocity.x != 0.0 || self.body.acceleration.x != 0.0,
        }
    }

    pub fn is_jumping(&self) -> bool {
        matches!(&self.behavior, Behavior::Player(p) if p.is_jumping())
    }

    pub fn is_ducking(&self) -> bool {
        matches!(&self.behavior, Behavior::Player(p) if p.is_ducking())
    }

    pub fn slime_id(&self) -> Option<SlimeId> {
        match &self.behavior {
            Behavior::Slime(s) => Some(s.id()),
            _ => None,
        }
    }

    pub fn school(&self) -> Option<SchoolId> {
        match &self.behavior {
            Behavior::Slime(s) => s.school(),
            _ => None,
        }
    }

    /// Remaining lifetime of a plant
    pub fn lifetime(&self) -> Option<f64> {
        match &self.behavior {
            Behavior::Plant(p) => Some(p.lifetime()),
            _ => None,
        }
    }

    // --- geometry and hit points ---

    pub fn collides_with(&self, other: &Entity) -> bool {
        self.bounding_box().collides(&other.bounding_box())
    }

    pub fn is_next_to(&self, other: &Entity) -> bool {
        self.bounding_box().is_next_to(&other.bounding_box())
    }

    pub fn add_hit_points(&mut self, delta: i32) {
        self.body.add_hit_points(delta);
    }

    pub(crate) fn arm_shark_cooldown(&mut self) {
        if let Behavior::Player(player) = &mut self.behavior {
            player.arm_shark_cooldown();
        }
    }

    // --- detached operations ---

    /// Run an operation with no world around the entity
    fn detached<R>(&mut self, op: impl FnOnce(&mut Self, &mut Stage<'_>) -> R) -> Result<R> {
        if self.body.world.is_some() {
            return Err(SimError::Registered);
        }
        let mut others = BTreeMap::new();
        let mut schools = BTreeMap::new();
        let mut stage = Stage::new(None, &mut others, &mut schools, None);
        Ok(op(self, &mut stage))
    }

    /// Apply a player command to an entity that is not in a world
    pub fn perform(&mut self, action: PlayerAction) -> Result<()> {
        self.detached(|entity, stage| entity.act(action, stage))?
    }

    /// Advance an entity that is not in a world
    pub fn advance_time(&mut self, dt: f64) -> Result<()> {
        check_dt(dt)?;
        self.detached(|entity, stage| entity.advance(dt, stage))
    }

    /// Reposition an entity that is not in a world
    pub fn change_actual_position(&mut self, meters: DVec2) -> Result<()> {
        self.detached(|entity, stage| entity.reposition(meters, stage))?
    }

    /// Terminate an entity that is not in a world
    ///
    /// Registered entities are terminated through the world, which also
    /// releases their registry slot. Slimes hold an id reserved by their
    /// home world and go through [`World::discard_slime`] instead.
    ///
    /// [`World::discard_slime`]: super::world::World::discard_slime
    pub fn terminate(&mut self) -> Result<()> {
        if matches!(self.behavior, Behavior::Slime(_)) {
            return Err(SimError::WrongKind {
                kind: self.body.kind,
                action: "terminate outside its world",
            });
        }
        self.detached(|entity, _| entity.body.terminate())
    }

    // --- staged operations ---

    pub(crate) fn act(&mut self, action: PlayerAction, stage: &mut Stage<'_>) -> Result<()> {
        if self.body.terminated {
            return Err(SimError::Terminated("entity"));
        }
        match &mut self.behavior {
            Behavior::Player(player) => player.perform(&mut self.body, action, stage),
            _ => Err(SimError::WrongKind {
                kind: self.body.kind,
                action: action.name(),
            }),
        }
    }

    pub(crate) fn reposition(&mut self, meters: DVec2, stage: &mut Stage<'_>) -> Result<()> {
        if self.body.terminated {
            return Err(SimError::Terminated("entity"));
        }
        if !meters.is_finite() {
            return Err(SimError::InvalidCoordinate(format!(
                "({}, {}) is not finite",
                meters.x, meters.y
            )));
        }
        if stage.outside(self.body.box_at(meters)) {
            self.body.terminate();
            return Ok(());
        }
        if !self.kind().is_plant() && !self.body.probe(meters, stage).accessible {
            log::warn!(
                "rejected reposition of {:?} to ({:.3}, {:.3})",
                self.kind(),
                meters.x,
                meters.y
            );
            return Err(SimError::Inaccessible);
        }
        self.body.place(meters, stage.grid());
        Ok(())
    }

    /// Advance the state machine by `dt` seconds
    pub(crate) fn advance(&mut self, dt: f64, stage: &mut Stage<'_>) {
        if self.body.terminated {
            return;
        }
        let leftover = if self.body.dead {
            dt
        } else {
            match &mut self.behavior {
                Behavior::Player(player) => player.advance(&mut self.body, dt, stage),
                Behavior::Plant(plant) => plant.advance(&mut self.body, dt, stage),
                Behavior::Slime(slime) => slime.advance(&mut self.body, dt, stage),
                Behavior::Shark(shark) => shark.advance(&mut self.body, dt, stage),
            }
        };
        if self.body.dead && !self.body.terminated {
            if let Behavior::Plant(plant) = &mut self.behavior {
                plant.while_dead(&mut self.body, stage);
            }
            self.body.linger_for(leftover);
        }
    }
}

/// Time steps must be finite, non-negative and at most [`MAX_WORLD_DT`]
pub(crate) fn check_dt(dt: f64) -> Result<()> {
    if !dt.is_finite() || dt < 0.0 || dt > MAX_WORLD_DT {
        return Err(SimError::InvalidTimeStep(dt));
    }
    Ok(())
}
