//! Physical state shared by every entity
//!
//! A [`Body`] is the data record of an entity: position, velocity and
//! acceleration pairs, hit points, sprite table and lifecycle flags. The
//! per-variant state machines in `player`, `plant`, `slime` and `shark`
//! drive a body through a [`Stage`].

use glam::{DVec2, IVec2};
use serde::{Deserialize, Serialize};

use super::entity::{EntityId, EntityKind, KindSet, Sprite, WorldId};
use super::geometry::{Grid, PixelBox, Terrain};
use super::position::{Position, meters_to_pixel};
use super::stage::Stage;
use super::timers::Countdown;
use crate::consts::{DEATH_LINGER, STEP_DISTANCE};

/// Speed limits and standard acceleration along one axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionLaw {
    pub min_speed: f64,
    pub max_speed: f64,
    pub acceleration: f64,
}

impl MotionLaw {
    pub const fn new(min_speed: f64, max_speed: f64, acceleration: f64) -> Self {
        Self {
            min_speed,
            max_speed,
            acceleration,
        }
    }

    /// Constant speed, no acceleration
    pub const fn fixed(speed: f64) -> Self {
        Self::new(0.0, speed, 0.0)
    }

    /// Unbounded speed
    pub const fn free(acceleration: f64) -> Self {
        Self::new(0.0, f64::INFINITY, acceleration)
    }

    /// Clamp a speed into `[min, max]` keeping its sign; zero stays zero
    pub fn clamp(&self, value: f64) -> f64 {
        let magnitude = value.abs();
        if magnitude > self.max_speed {
            self.max_speed.copysign(value)
        } else if magnitude < self.min_speed && value != 0.0 {
            self.min_speed.copysign(value)
        } else {
            value
        }
    }
}

/// Terrain the current bounding box touches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainContact {
    pub in_water: bool,
    pub in_magma: bool,
    pub in_gas: bool,
    pub on_ground: bool,
    /// Water reaches the row just above the box
    pub submerged: bool,
}

impl TerrainContact {
    /// Terrain around `bx`; ground is checked across `standing_width` columns
    pub fn sense(grid: Option<&Grid>, bx: &PixelBox, standing_width: i32) -> Self {
        let Some(grid) = grid else {
            return Self::default();
        };
        Self {
            in_water: grid.region_overlaps(bx, |t| t == Terrain::Water),
            in_magma: grid.region_overlaps(bx, |t| t == Terrain::Magma),
            in_gas: grid.region_overlaps(bx, |t| t == Terrain::Gas),
            on_ground: grid.rests_on_ground(&PixelBox {
                width: standing_width,
                ..*bx
            }),
            submerged: grid.top_row_overlaps(bx, |t| t == Terrain::Water),
        }
    }
}

/// Answer to "could this entity stand here?"
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Probe {
    pub accessible: bool,
    /// Entities the hypothetical box would overlap (plants included)
    pub overlaps: Vec<(EntityId, EntityKind)>,
}

impl Probe {
    pub fn kinds(&self) -> KindSet {
        self.overlaps.iter().map(|&(_, kind)| kind).collect()
    }

    pub fn overlaps_entity(&self, id: EntityId) -> bool {
        self.overlaps.iter().any(|&(other, _)| other == id)
    }

    /// Union of two probes' overlap lists
    pub fn merge_overlaps(&mut self, other: &Probe) {
        for &entry in &other.overlaps {
            if !self.overlaps.contains(&entry) {
                self.overlaps.push(entry);
            }
        }
    }
}

/// Outcome of one integration step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Full displacement committed
    Moved,
    /// Only the horizontal part was possible
    Horizontal,
    /// Only the vertical part was possible
    Vertical,
    /// Each axis alone was possible but not both together
    Cornered,
    /// Neither axis was possible
    Blocked,
    /// The displacement left the world
    Left,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub(crate) kind: EntityKind,
    pub(crate) position: Position,
    pub(crate) velocity: DVec2,
    pub(crate) acceleration: DVec2,
    pub(crate) horizontal: Option<MotionLaw>,
    pub(crate) vertical: Option<MotionLaw>,
    pub(crate) orientation: i32,
    pub(crate) hit_points: i32,
    pub(crate) max_hit_points: i32,
    pub(crate) sprites: Vec<Sprite>,
    pub(crate) current_sprite: usize,
    pub(crate) dead: bool,
    pub(crate) terminated: bool,
    pub(crate) linger: Countdown,
    pub(crate) world: Option<WorldId>,
    pub(crate) contact: TerrainContact,
}

impl Body {
    pub(crate) fn new(
        kind: EntityKind,
        pixels: IVec2,
        sprites: Vec<Sprite>,
        hit_points: i32,
        max_hit_points: i32,
    ) -> Self {
        Self {
            kind,
            position: Position::from_pixels(pixels),
            velocity: DVec2::ZERO,
            acceleration: DVec2::ZERO,
            horizontal: None,
            vertical: None,
            orientation: 0,
            hit_points,
            max_hit_points,
            sprites,
            current_sprite: 0,
            dead: false,
            terminated: false,
            linger: Countdown::new(DEATH_LINGER),
            world: None,
            contact: TerrainContact::default(),
        }
    }

    pub(crate) fn with_laws(mut self, horizontal: Option<MotionLaw>, vertical: Option<MotionLaw>) -> Self {
        self.horizontal = horizontal;
        self.vertical = vertical;
        self
    }

    #[inline]
    pub fn meters(&self) -> DVec2 {
        self.position.meters()
    }

    #[inline]
    pub fn pixels(&self) -> IVec2 {
        self.position.pixels()
    }

    pub fn sprite(&self) -> Sprite {
        self.sprites[self.current_sprite]
    }

    pub fn bounding_box(&self) -> PixelBox {
        let sprite = self.sprite();
        PixelBox::at(self.pixels(), sprite.width, sprite.height)
    }

    /// Box of the current sprite placed at another position
    pub fn box_at(&self, meters: DVec2) -> PixelBox {
        let sprite = self.sprite();
        PixelBox::new(
            meters_to_pixel(meters.x),
            meters_to_pixel(meters.y),
            sprite.width,
            sprite.height,
        )
    }

    pub fn set_velocity_x(&mut self, value: f64) {
        self.velocity.x = self.horizontal.map_or(0.0, |law| law.clamp(value));
    }

    pub fn set_velocity_y(&mut self, value: f64) {
        self.velocity.y = self.vertical.map_or(0.0, |law| law.clamp(value));
    }

    pub fn set_acceleration_x(&mut self, value: f64) {
        self.acceleration.x = if self.horizontal.is_some() { value } else { 0.0 };
    }

    pub fn set_acceleration_y(&mut self, value: f64) {
        self.acceleration.y = if self.vertical.is_some() { value } else { 0.0 };
    }

    pub fn stop(&mut self) {
        self.velocity = DVec2::ZERO;
        self.acceleration = DVec2::ZERO;
    }

    pub fn is_stationary(&self) -> bool {
        self.velocity == DVec2::ZERO && self.acceleration == DVec2::ZERO
    }

    /// Clamp hit points into `[0, max]`; reaching zero kills
    pub fn add_hit_points(&mut self, delta: i32) {
        if self.terminated {
            return;
        }
        self.hit_points = self
            .hit_points
            .saturating_add(delta)
            .clamp(0, self.max_hit_points);
        if self.hit_points == 0 && !self.dead {
            self.die();
        }
    }

    pub(crate) fn die(&mut self) {
        self.hit_points = 0;
        self.dead = true;
        log::debug!("{:?} died at {:?}", self.kind, self.pixels());
    }

    pub(crate) fn terminate(&mut self) {
        if !self.terminated {
            log::debug!("{:?} terminated at {:?}", self.kind, self.pixels());
        }
        self.terminated = true;
        self.world = None;
    }

    pub(crate) fn refresh_contact(&mut self, grid: Option<&Grid>) {
        self.contact = TerrainContact::sense(grid, &self.bounding_box(), self.sprites[0].width);
    }

    /// Move without any check
    pub(crate) fn place(&mut self, meters: DVec2, grid: Option<&Grid>) {
        self.position = Position::from_meters(meters);
        self.refresh_contact(grid);
    }

    /// Check a hypothetical position against terrain and other entities
    pub fn probe(&self, candidate: DVec2, stage: &Stage<'_>) -> Probe {
        let bx = self.box_at(candidate);
        let passable = stage.grid().is_none_or(|grid| grid.is_passable(&bx));
        let mut blocked = false;
        let mut overlaps = Vec::new();
        for (id, other) in stage.others() {
            if bx.collides(&other.bounding_box()) {
                overlaps.push((id, other.kind()));
                blocked |= !other.kind().is_plant();
            }
        }
        Probe {
            accessible: passable && !blocked,
            overlaps,
        }
    }

    /// Sub-step length keeping the displacement near [`STEP_DISTANCE`]
    pub fn adaptive_step(&self, remaining: f64) -> f64 {
        let rate = self.velocity.length() + self.acceleration.length() * remaining;
        if rate > 0.0 {
            (STEP_DISTANCE / rate).min(remaining)
        } else {
            remaining
        }
    }

    fn displacement(&self, t: f64) -> DVec2 {
        self.velocity * t + self.acceleration * (t * t / 2.0)
    }

    /// Integrate `t` seconds of constant-acceleration motion
    ///
    /// A rejected displacement is decomposed per axis; the caller decides
    /// how to react to anything but [`StepOutcome::Moved`]. Velocity is
    /// only advanced along the axes that actually moved. Overlaps seen by
    /// any probe are accumulated into `seen`.
    pub(crate) fn integrate(&mut self, t: f64, stage: &Stage<'_>, seen: &mut Probe) -> StepOutcome {
        let start = self.meters();
        let delta = self.displacement(t);
        let candidate = start + delta;
        if candidate.is_nan() {
            return StepOutcome::Blocked;
        }
        let grid = stage.grid();
        if stage.outside(self.box_at(candidate)) {
            self.terminate();
            return StepOutcome::Left;
        }
        let full = self.probe(candidate, stage);
        seen.merge_overlaps(&full);
        if full.accessible {
            self.place(candidate, grid);
            self.set_velocity_x(self.velocity.x + self.acceleration.x * t);
            self.set_velocity_y(self.velocity.y + self.acceleration.y * t);
            return StepOutcome::Moved;
        }

        let across = DVec2::new(start.x + delta.x, start.y);
        let along = DVec2::new(start.x, start.y + delta.y);
        let horizontal = self.probe(across, stage);
        let vertical = self.probe(along, stage);
        seen.merge_overlaps(&horizontal);
        seen.merge_overlaps(&vertical);
        match (horizontal.accessible, vertical.accessible) {
            (true, true) => StepOutcome::Cornered,
            (true, false) => {
                self.place(across, grid);
                self.set_velocity_x(self.velocity.x + self.acceleration.x * t);
                StepOutcome::Horizontal
            }
            (false, true) => {
                self.place(along, grid);
                self.set_velocity_y(self.velocity.y + self.acceleration.y * t);
                StepOutcome::Vertical
            }
            (false, false) => StepOutcome::Blocked,
        }
    }

    /// Count down the post-death linger; terminates when it runs out
    pub(crate) fn linger_for(&mut self, t: f64) {
        if self.dead && !self.terminated && self.linger.consume(t) {
            self.terminate();
        }
    }
}
