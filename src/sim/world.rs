//! The world: terrain grid, entity and school registries, slime ids
//!
//! Entities are keyed by [`EntityId`] in a `BTreeMap`, so every sweep runs
//! in registration order. While one entity is being stepped it is taken
//! out of the registry and handed a [`Stage`] over the rest.

use std::collections::{BTreeMap, BTreeSet};

use glam::{DVec2, IVec2};

use super::entity::{Behavior, Entity, EntityId, EntityKind, SlimeId, Sprite, WorldId};
use super::geometry::{Grid, PixelBox, Terrain};
use super::school::{School, SchoolId};
use super::stage::Stage;
use crate::consts::{MAX_ENTITIES, MAX_SCHOOLS};
use crate::error::{Result, SimError};

#[derive(Debug)]
pub struct World {
    id: WorldId,
    grid: Grid,
    target_tile: IVec2,
    window: IVec2,
    pub(crate) entities: BTreeMap<EntityId, Entity>,
    retired: BTreeMap<EntityId, Entity>,
    next_entity: u32,
    pub(crate) player: Option<EntityId>,
    schools: BTreeMap<SchoolId, School>,
    next_school: u32,
    slime_ids: BTreeSet<SlimeId>,
    started: bool,
    terminated: bool,
    pub(crate) elapsed: f64,
    pub(crate) outcome_logged: bool,
}

impl World {
    /// Create a world from bottom-row-first feature codes
    ///
    /// Tile length and counts are taken by absolute value. The visible
    /// window must fit inside the world.
    pub fn new(
        tile_length: i32,
        tiles_x: i32,
        tiles_y: i32,
        target_tile: IVec2,
        window_width: i32,
        window_height: i32,
        features: &[i32],
    ) -> Result<Self> {
        let grid = Grid::new(
            tile_length.saturating_abs(),
            tiles_x.saturating_abs(),
            tiles_y.saturating_abs(),
            features,
        )?;
        let size = grid.size_in_pixels();
        if window_width < 0 || window_height < 0 || window_width > size.x || window_height > size.y
        {
            return Err(SimError::InvalidWorld(format!(
                "window {window_width}x{window_height} does not fit a {}x{} world",
                size.x, size.y
            )));
        }
        let world = Self {
            id: WorldId::next(),
            grid,
            target_tile,
            window: IVec2::new(window_width, window_height),
            entities: BTreeMap::new(),
            retired: BTreeMap::new(),
            next_entity: 0,
            player: None,
            schools: BTreeMap::new(),
            next_school: 0,
            slime_ids: BTreeSet::new(),
            started: false,
            terminated: false,
            elapsed: 0.0,
            outcome_logged: false,
        };
        log::info!(
            "world {:?} created: {}x{} tiles of {} px, target {:?}",
            world.id,
            world.grid.tiles_x(),
            world.grid.tiles_y(),
            world.grid.tile_length(),
            target_tile
        );
        Ok(world)
    }

    pub fn id(&self) -> WorldId {
        self.id
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn tile_length(&self) -> i32 {
        self.grid.tile_length()
    }

    pub fn size_in_pixels(&self) -> IVec2 {
        self.grid.size_in_pixels()
    }

    pub fn target_tile(&self) -> IVec2 {
        self.target_tile
    }

    pub fn set_target_tile(&mut self, tile: IVec2) {
        self.target_tile = tile;
    }

    pub fn visible_window_size(&self) -> IVec2 {
        self.window
    }

    /// Bottom-left of the visible window, centred on the player and kept inside the world
    pub fn visible_window_position(&self) -> IVec2 {
        let Some(player) = self.player() else {
            return IVec2::ZERO;
        };
        let max = self.size_in_pixels() - self.window;
        let centred = player.pixel_position() - self.window / 2;
        centred.clamp(IVec2::ZERO, max)
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Simulated time so far
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    // --- terrain ---

    pub fn feature_at(&self, px: i32, py: i32) -> i32 {
        self.grid.feature_at(px, py)
    }

    /// Overwrite the tile under a pixel; pixels outside the world are ignored
    pub fn set_feature(&mut self, px: i32, py: i32, code: i32) -> Result<()> {
        let terrain = Terrain::from_feature(code)
            .ok_or_else(|| SimError::InvalidWorld(format!("unknown feature code {code}")))?;
        if self.grid.set_terrain_at(px, py, terrain) {
            for entity in self.entities.values_mut() {
                entity.body.refresh_contact(Some(&self.grid));
            }
        }
        Ok(())
    }

    // --- entities ---

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// An entity that terminated while registered here
    pub fn retired_entity(&self, id: EntityId) -> Option<&Entity> {
        self.retired.get(&id)
    }

    /// Hand over every entity that terminated so far
    pub fn drain_retired(&mut self) -> BTreeMap<EntityId, Entity> {
        std::mem::take(&mut self.retired)
    }

    pub fn has_entity(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Live entities in registration order
    pub fn all_entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> + '_ {
        self.entities.iter().map(|(&id, e)| (id, e))
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn player_id(&self) -> Option<EntityId> {
        self.player
    }

    pub fn player(&self) -> Option<&Entity> {
        self.player.and_then(|id| self.entities.get(&id))
    }

    /// Register an entity
    pub fn add_entity(&mut self, mut entity: Entity) -> Result<EntityId> {
        if self.terminated {
            return Err(SimError::Terminated("world"));
        }
        if self.started {
            return Err(SimError::IllegalState("game already started"));
        }
        if entity.is_terminated() {
            return Err(SimError::Terminated("entity"));
        }
        if entity.world().is_some() {
            return Err(SimError::AlreadyInWorld);
        }
        if let Behavior::Slime(slime) = &entity.behavior {
            if slime.home() != self.id {
                return Err(SimError::InvalidWorld(format!(
                    "slime {:?} was created by another world",
                    slime.id()
                )));
            }
        }
        let origin = entity.pixel_position();
        if !self.grid.contains_pixel(origin.x, origin.y) {
            return Err(SimError::InvalidCoordinate(format!(
                "({}, {}) is outside the world",
                origin.x, origin.y
            )));
        }
        let kind = entity.kind();
        if !kind.is_plant() {
            let standing = entity.sprites()[0];
            let bx = PixelBox::at(origin, standing.width, standing.height);
            let blocked = self.entities.values().any(|other| {
                !other.kind().is_plant() && bx.collides(&other.bounding_box())
            });
            if blocked || !self.grid.is_passable(&bx) {
                return Err(SimError::Inaccessible);
            }
        }
        if kind == EntityKind::Player {
            if self.player.is_some() {
                return Err(SimError::DuplicatePlayer);
            }
        } else {
            let others = self.entities.len() - usize::from(self.player.is_some());
            if others >= MAX_ENTITIES {
                return Err(SimError::Capacity("entities"));
            }
        }
        if let (Some(slime), Some(school)) = (entity.slime_id(), entity.school()) {
            let members = self
                .schools
                .get_mut(&school)
                .ok_or(SimError::UnknownSchool(school))?;
            members.insert(slime);
        }

        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        entity.body.world = Some(self.id);
        entity.body.refresh_contact(Some(&self.grid));
        if kind == EntityKind::Player {
            self.player = Some(id);
        }
        log::debug!("registered {kind:?} as {id:?} at {origin:?}");
        self.entities.insert(id, entity);
        Ok(id)
    }

    /// Unregister an entity and hand it back detached
    pub fn remove_entity(&mut self, id: EntityId) -> Result<Entity> {
        let mut entity = self
            .entities
            .remove(&id)
            .ok_or(SimError::UnknownEntity(id))?;
        entity.body.world = None;
        if self.player == Some(id) {
            self.player = None;
        }
        log::debug!("removed {:?} ({:?})", id, entity.kind());
        Ok(entity)
    }

    pub fn terminate_entity(&mut self, id: EntityId) -> Result<()> {
        let mut entity = self
            .entities
            .remove(&id)
            .ok_or(SimError::UnknownEntity(id))?;
        entity.body.terminate();
        self.retire(id, entity);
        Ok(())
    }

    fn retire(&mut self, id: EntityId, mut entity: Entity) {
        entity.body.world = None;
        if self.player == Some(id) {
            self.player = None;
        }
        if let Behavior::Slime(slime) = &mut entity.behavior {
            self.slime_ids.remove(&slime.id());
            if let Some(school) = slime.school().and_then(|s| self.schools.get_mut(&s)) {
                school.remove(slime.id());
            }
            slime.set_school(None);
        }
        log::debug!("{:?} ({:?}) left the world", id, entity.kind());
        self.retired.insert(id, entity);
    }

    /// Take an entity out, run `op` against the rest of the world, put it back
    pub(crate) fn with_entity<R>(
        &mut self,
        id: EntityId,
        op: impl FnOnce(&mut Entity, &mut Stage<'_>) -> R,
    ) -> Result<R> {
        let mut entity = self
            .entities
            .remove(&id)
            .ok_or(SimError::UnknownEntity(id))?;
        let player = self.player.filter(|&p| p != id);
        let result = {
            let mut stage = Stage::new(
                Some(&self.grid),
                &mut self.entities,
                &mut self.schools,
                player,
            );
            op(&mut entity, &mut stage)
        };
        if entity.is_terminated() {
            self.retire(id, entity);
        } else {
            self.entities.insert(id, entity);
        }
        Ok(result)
    }

    /// Apply a player command to a registered player
    pub fn perform(&mut self, id: EntityId, action: super::entity::PlayerAction) -> Result<()> {
        self.with_entity(id, |entity, stage| entity.act(action, stage))?
    }

    /// Move an entity directly, bypassing physics but not accessibility
    pub fn change_actual_position(&mut self, id: EntityId, meters: DVec2) -> Result<()> {
        self.with_entity(id, |entity, stage| entity.reposition(meters, stage))?
    }

    pub fn start_game(&mut self) -> Result<()> {
        if self.terminated {
            return Err(SimError::Terminated("world"));
        }
        if self.player.is_none() {
            return Err(SimError::IllegalState("a game needs a player"));
        }
        self.started = true;
        log::info!("game started in world {:?}", self.id);
        Ok(())
    }

    /// Detach every entity and stop accepting new ones
    ///
    /// Slime ids and school memberships are dropped with the world.
    pub fn terminate(&mut self) -> Vec<Entity> {
        self.terminated = true;
        self.player = None;
        self.slime_ids.clear();
        for school in self.schools.values_mut() {
            school.clear();
        }
        let entities = std::mem::take(&mut self.entities);
        entities
            .into_values()
            .map(|mut entity| {
                entity.body.world = None;
                if let Behavior::Slime(slime) = &mut entity.behavior {
                    slime.set_school(None);
                }
                entity
            })
            .collect()
    }

    // --- outcome ---

    /// The player's corner tiles span the target tile
    pub fn did_player_win(&self) -> bool {
        let Some(player) = self.player() else {
            return false;
        };
        let bx = player.bounding_box();
        let low = self.grid.pixel_to_tile(bx.x, bx.y);
        let high = self.grid.pixel_to_tile(bx.x + bx.width, bx.y + bx.height);
        let target = self.target_tile;
        low.x <= target.x && target.x <= high.x && low.y <= target.y && target.y <= high.y
    }

    pub fn is_game_over(&self) -> bool {
        self.player.is_none() || self.did_player_win()
    }

    // --- schools ---

    pub fn create_school(&mut self) -> Result<SchoolId> {
        if self.terminated {
            return Err(SimError::Terminated("world"));
        }
        if self.schools.len() >= MAX_SCHOOLS {
            return Err(SimError::Capacity("schools"));
        }
        let id = SchoolId(self.next_school);
        self.next_school += 1;
        self.schools.insert(id, School::new());
        Ok(id)
    }

    pub fn school(&self, id: SchoolId) -> Option<&School> {
        self.schools.get(&id)
    }

    pub fn schools(&self) -> impl Iterator<Item = (SchoolId, &School)> + '_ {
        self.schools.iter().map(|(&id, s)| (id, s))
    }

    /// Registered slimes of a school
    pub fn school_members(&self, id: SchoolId) -> Vec<EntityId> {
        let Some(school) = self.schools.get(&id) else {
            return Vec::new();
        };
        self.entities
            .iter()
            .filter(|(_, e)| e.slime_id().is_some_and(|s| school.contains(s)))
            .map(|(&id, _)| id)
            .collect()
    }

    /// Stop a school from accepting members
    pub fn terminate_school(&mut self, id: SchoolId) -> Result<()> {
        let school = self
            .schools
            .get_mut(&id)
            .ok_or(SimError::UnknownSchool(id))?;
        school.terminate();
        Ok(())
    }

    /// Drop a school; its registered members become school-less
    pub fn remove_school(&mut self, id: SchoolId) -> Result<School> {
        let school = self.schools.remove(&id).ok_or(SimError::UnknownSchool(id))?;
        for entity in self.entities.values_mut() {
            if let Behavior::Slime(slime) = &mut entity.behavior {
                if slime.school() == Some(id) {
                    slime.set_school(None);
                }
            }
        }
        Ok(school)
    }

    /// Put a registered slime that has no school into one
    pub fn add_to_school(&mut self, school: SchoolId, id: EntityId) -> Result<()> {
        let target = self
            .schools
            .get_mut(&school)
            .ok_or(SimError::UnknownSchool(school))?;
        if target.is_terminated() {
            return Err(SimError::Terminated("school"));
        }
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(SimError::UnknownEntity(id))?;
        let kind = entity.kind();
        let Behavior::Slime(slime) = &mut entity.behavior else {
            return Err(SimError::WrongKind {
                kind,
                action: "join a school",
            });
        };
        if slime.school().is_some() {
            return Err(SimError::IllegalState("slime already belongs to a school"));
        }
        target.insert(slime.id());
        slime.set_school(Some(school));
        Ok(())
    }

    /// Take a registered slime out of its school
    pub fn remove_from_school(&mut self, id: EntityId) -> Result<()> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(SimError::UnknownEntity(id))?;
        let kind = entity.kind();
        let Behavior::Slime(slime) = &mut entity.behavior else {
            return Err(SimError::WrongKind {
                kind,
                action: "leave a school",
            });
        };
        let current = slime
            .school()
            .ok_or(SimError::IllegalState("slime has no school"))?;
        if let Some(school) = self.schools.get_mut(&current) {
            school.remove(slime.id());
        }
        slime.set_school(None);
        Ok(())
    }

    /// Move a registered slime to another school with hit-point redistribution
    pub fn switch_school(&mut self, id: EntityId, to: SchoolId) -> Result<()> {
        match self.schools.get(&to) {
            None => return Err(SimError::UnknownSchool(to)),
            Some(school) if school.is_terminated() => return Err(SimError::Terminated("school")),
            Some(_) => {}
        }
        self.with_entity(id, |entity, stage| {
            let kind = entity.kind();
            let Behavior::Slime(slime) = &mut entity.behavior else {
                return Err(SimError::WrongKind {
                    kind,
                    action: "switch school",
                });
            };
            let from = slime
                .school()
                .ok_or(SimError::IllegalState("slime has no school"))?;
            if stage.transfer_school(slime.id(), &mut entity.body, from, to) {
                slime.set_school(Some(to));
            }
            Ok(())
        })?
    }

    // --- slime ids ---

    /// Create a detached slime, reserving its id in this world
    pub fn create_slime(
        &mut self,
        id: u64,
        x: i32,
        y: i32,
        sprites: Vec<Sprite>,
        school: Option<SchoolId>,
    ) -> Result<Entity> {
        let slime_id = SlimeId(id);
        if self.slime_ids.contains(&slime_id) {
            return Err(SimError::DuplicateSlimeId(id));
        }
        if let Some(school) = school {
            match self.schools.get(&school) {
                None => return Err(SimError::UnknownSchool(school)),
                Some(s) if s.is_terminated() => return Err(SimError::Terminated("school")),
                Some(_) => {}
            }
        }
        let entity = Entity::slime(x, y, sprites, slime_id, self.id, school)?;
        self.slime_ids.insert(slime_id);
        if let Some(members) = school.and_then(|s| self.schools.get_mut(&s)) {
            members.insert(slime_id);
        }
        Ok(entity)
    }

    pub fn has_slime_id(&self, id: u64) -> bool {
        self.slime_ids.contains(&SlimeId(id))
    }

    /// Terminate a detached slime created here and free its id
    ///
    /// Also accepts a slime that already terminated on its own while
    /// detached (left the world area, magma), so its id is not stranded.
    pub fn discard_slime(&mut self, entity: &mut Entity) -> Result<()> {
        if entity.world().is_some() {
            return Err(SimError::Registered);
        }
        let Behavior::Slime(slime) = &mut entity.behavior else {
            return Err(SimError::WrongKind {
                kind: entity.body.kind,
                action: "discard",
            });
        };
        if slime.home() != self.id {
            return Err(SimError::InvalidWorld(format!(
                "slime {:?} was created by another world",
                slime.id()
            )));
        }
        self.slime_ids.remove(&slime.id());
        if let Some(school) = slime.school().and_then(|s| self.schools.get_mut(&s)) {
            school.remove(slime.id());
        }
        slime.set_school(None);
        entity.body.terminate();
        Ok(())
    }
}
