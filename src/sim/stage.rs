//! What an entity sees of its world while it is being advanced
//!
//! The advancing entity is taken out of the registry for the duration of
//! its step, so the stage hands out the terrain grid, the remaining
//! entities and the schools without aliasing the entity itself.

use std::collections::BTreeMap;

use super::body::Body;
use super::entity::{Entity, EntityId, SlimeId};
use super::geometry::{Grid, PixelBox};
use super::school::{School, SchoolId};

pub struct Stage<'a> {
    grid: Option<&'a Grid>,
    others: &'a mut BTreeMap<EntityId, Entity>,
    schools: &'a mut BTreeMap<SchoolId, School>,
    player: Option<EntityId>,
}

impl<'a> Stage<'a> {
    pub(crate) fn new(
        grid: Option<&'a Grid>,
        others: &'a mut BTreeMap<EntityId, Entity>,
        schools: &'a mut BTreeMap<SchoolId, School>,
        player: Option<EntityId>,
    ) -> Self {
        Self {
            grid,
            others,
            schools,
            player,
        }
    }

    pub fn grid(&self) -> Option<&'a Grid> {
        self.grid
    }

    /// Origin of the box lies outside the world (never without a world)
    pub fn outside(&self, bx: PixelBox) -> bool {
        self.grid.is_some_and(|grid| !grid.contains_pixel(bx.x, bx.y))
    }

    /// Live entities other than the one being advanced
    pub fn others(&self) -> impl Iterator<Item = (EntityId, &Entity)> + '_ {
        self.others
            .iter()
            .filter(|(_, e)| !e.is_terminated())
            .map(|(&id, e)| (id, e))
    }

    pub fn other_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.others.get_mut(&id).filter(|e| !e.is_terminated())
    }

    pub fn player_id(&self) -> Option<EntityId> {
        self.player
    }

    pub fn player(&self) -> Option<&Entity> {
        self.player
            .and_then(|id| self.others.get(&id))
            .filter(|e| !e.is_terminated())
    }

    pub fn player_mut(&mut self) -> Option<&mut Entity> {
        let id = self.player?;
        self.other_mut(id)
    }

    /// Box stands exactly on top of a non-plant entity
    pub fn supports(&self, bx: &PixelBox) -> bool {
        self.others()
            .any(|(_, e)| !e.kind().is_plant() && bx.rests_on(&e.bounding_box()))
    }

    pub fn school(&self, id: SchoolId) -> Option<&School> {
        self.schools.get(&id)
    }

    /// Add `delta` hit points to every registered member of a school except `me`
    ///
    /// Returns how many members were affected.
    pub(crate) fn share_with_school(&mut self, school: SchoolId, me: SlimeId, delta: i32) -> i32 {
        let Some(members) = self.schools.get(&school) else {
            return 0;
        };
        let mut affected = 0;
        for entity in self.others.values_mut() {
            let Some(slime) = entity.slime_id() else {
                continue;
            };
            if slime != me && !entity.is_terminated() && members.contains(slime) {
                entity.add_hit_points(delta);
                affected += 1;
            }
        }
        affected
    }

    /// Move `me` from one school to another, redistributing hit points
    ///
    /// Each other member of the old school gains one point taken from the
    /// mover; each other member of the new school then gives one back.
    pub(crate) fn transfer_school(
        &mut self,
        me: SlimeId,
        body: &mut Body,
        from: SchoolId,
        to: SchoolId,
    ) -> bool {
        if from == to || self.schools.get(&to).is_none_or(School::is_terminated) {
            return false;
        }
        let given = self.share_with_school(from, me, 1);
        body.add_hit_points(-given);
        if let Some(old) = self.schools.get_mut(&from) {
            old.remove(me);
        }
        if let Some(new) = self.schools.get_mut(&to) {
            new.insert(me);
        }
        let taken = self.share_with_school(to, me, -1);
        body.add_hit_points(taken);
        log::debug!("slime {me:?} moved from {from:?} to {to:?} (gave {given}, took {taken})");
        true
    }
}
