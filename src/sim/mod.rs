//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Caller-driven time steps only (at most 0.2 s each)
//! - Stable iteration order (player first, then by entity ID)
//! - No rendering or platform dependencies

pub mod body;
pub mod entity;
pub mod geometry;
pub mod plant;
pub mod player;
pub mod position;
pub mod school;
pub mod shark;
pub mod slime;
pub mod stage;
pub mod tick;
pub mod timers;
pub mod world;

pub use body::{MotionLaw, Probe, StepOutcome, TerrainContact};
pub use entity::{
    Behavior, Direction, Entity, EntityId, EntityKind, KindSet, PlayerAction, SlimeId, Sprite,
    WorldId,
};
pub use geometry::{Grid, PixelBox, Terrain};
pub use position::{Position, meters_to_pixel, pixel_to_meters};
pub use school::{School, SchoolId};
pub use shark::Phase as SharkPhase;
pub use stage::Stage;
pub use timers::{Cooldown, Countdown, Exposure};
pub use world::World;
