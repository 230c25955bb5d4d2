//! Slimes: horizontal walkers that reverse on meeting each other and
//! share damage with their school

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::body::{Body, Probe, StepOutcome};
use super::entity::{EntityId, EntityKind, SlimeId, WorldId};
use super::school::{School, SchoolId};
use super::stage::Stage;
use super::timers::{Cooldown, Exposure};
use crate::consts::{
    CONTACT_COOLDOWN, SCHOOL_PENALTY, SLIME_ACCELERATION, SLIME_GAS_HEAL, SLIME_GAS_PERIOD,
    SLIME_PLAYER_DAMAGE, SLIME_WATER_DAMAGE, SLIME_WATER_PERIOD,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlimeState {
    id: SlimeId,
    /// World that reserved the id
    home: WorldId,
    school: Option<SchoolId>,
    /// Slimes touched at the end of the previous step
    contacts: BTreeSet<EntityId>,
    water: Exposure,
    gas: Exposure,
    player_cooldown: Cooldown,
}

impl SlimeState {
    pub(crate) fn new(id: SlimeId, home: WorldId, school: Option<SchoolId>) -> Self {
        Self {
            id,
            home,
            school,
            contacts: BTreeSet::new(),
            water: Exposure::default(),
            gas: Exposure::default(),
            player_cooldown: Cooldown::default(),
        }
    }

    /// Start accelerating to the right from rest
    pub(crate) fn launch(&self, body: &mut Body) {
        body.set_acceleration_x(SLIME_ACCELERATION);
        body.orientation = 1;
        Self::select_sprite(body);
    }

    pub fn id(&self) -> SlimeId {
        self.id
    }

    pub fn home(&self) -> WorldId {
        self.home
    }

    pub fn school(&self) -> Option<SchoolId> {
        self.school
    }

    pub(crate) fn set_school(&mut self, school: Option<SchoolId>) {
        self.school = school;
    }

    fn select_sprite(body: &mut Body) {
        body.current_sprite = usize::from(body.orientation < 0);
    }

    fn reverse(body: &mut Body) {
        body.set_velocity_x(0.0);
        body.set_acceleration_x(-body.acceleration.x);
        body.orientation = -body.orientation;
        Self::select_sprite(body);
    }

    fn penalize_school(&self, stage: &mut Stage<'_>, times: i32) {
        if let Some(school) = self.school {
            stage.share_with_school(school, self.id, -SCHOOL_PENALTY * times);
        }
    }

    /// Advance the slime; returns the time left over after dying
    pub(crate) fn advance(&mut self, body: &mut Body, dt: f64, stage: &mut Stage<'_>) -> f64 {
        let mut reversed = false;
        let mut remaining = dt;
        while remaining > 0.0 {
            let t = body.adaptive_step(remaining);
            remaining -= t;
            self.player_cooldown.tick(t);

            body.refresh_contact(stage.grid());
            let contact = body.contact;
            if contact.in_magma {
                body.terminate();
                return 0.0;
            }
            let soaked = self.water.advance(
                contact.in_water && !contact.in_gas,
                t,
                SLIME_WATER_PERIOD,
                false,
            ) as i32;
            if soaked > 0 {
                body.add_hit_points(-SLIME_WATER_DAMAGE * soaked);
                self.penalize_school(stage, soaked);
            }
            let healed = self.gas.advance(contact.in_gas, t, SLIME_GAS_PERIOD, false) as i32;
            if healed > 0 {
                body.add_hit_points(SLIME_GAS_HEAL * healed);
            }

            let mut seen = Probe::default();
            match body.integrate(t, stage, &mut seen) {
                StepOutcome::Left => return 0.0,
                StepOutcome::Moved | StepOutcome::Horizontal => {}
                _ => body.set_velocity_x(0.0),
            }

            self.touch(body, stage, &seen, &mut reversed);
            if body.dead {
                return remaining;
            }
        }
        0.0
    }

    /// Contact rules with other slimes and the player
    fn touch(&mut self, body: &mut Body, stage: &mut Stage<'_>, seen: &Probe, reversed: &mut bool) {
        let bx = body.bounding_box();
        let mut current = BTreeSet::new();
        let mut onset: Option<Option<SchoolId>> = None;
        let mut player_contact = false;
        for (id, other) in stage.others() {
            let other_box = other.bounding_box();
            match other.kind() {
                EntityKind::Slime => {
                    if bx.collides(&other_box) || seen.overlaps_entity(id) {
                        current.insert(id);
                        if onset.is_none() && !self.contacts.contains(&id) {
                            onset = Some(other.school());
                        }
                    }
                }
                EntityKind::Player => {
                    player_contact |= bx.is_next_to(&other_box) || seen.overlaps_entity(id);
                }
                _ => {}
            }
        }
        self.contacts = current;

        if let Some(their_school) = onset {
            if !*reversed && !body.is_stationary() {
                Self::reverse(body);
                *reversed = true;
                self.join_larger_school(body, their_school, stage);
            }
        }

        if player_contact && self.player_cooldown.is_ready() {
            self.player_cooldown.arm(CONTACT_COOLDOWN);
            body.add_hit_points(-SLIME_PLAYER_DAMAGE);
            self.penalize_school(stage, 1);
        }
    }

    fn join_larger_school(&mut self, body: &mut Body, theirs: Option<SchoolId>, stage: &mut Stage<'_>) {
        let (Some(mine), Some(theirs)) = (self.school, theirs) else {
            return;
        };
        let size = |id| stage.school(id).map_or(0, School::len);
        if size(mine) < size(theirs) && stage.transfer_school(self.id, body, mine, theirs) {
            self.school = Some(theirs);
        }
    }
}
