//! Error types for the simulation.

use thiserror::Error;

use crate::sim::{EntityId, EntityKind, SchoolId};

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("invalid sprite set: {0}")]
    InvalidSprites(String),

    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("invalid world: {0}")]
    InvalidWorld(String),

    #[error("invalid time step {0}")]
    InvalidTimeStep(f64),

    #[error("illegal state: {0}")]
    IllegalState(&'static str),

    #[error("{kind:?} does not support {action}")]
    WrongKind {
        kind: EntityKind,
        action: &'static str,
    },

    #[error("position is blocked by terrain or another entity")]
    Inaccessible,

    #[error("capacity exceeded: {0}")]
    Capacity(&'static str),

    #[error("world already has a player")]
    DuplicatePlayer,

    #[error("slime id {0} is already taken")]
    DuplicateSlimeId(u64),

    #[error("unknown entity {0:?}")]
    UnknownEntity(EntityId),

    #[error("unknown school {0:?}")]
    UnknownSchool(SchoolId),

    #[error("entity is already registered in a world")]
    AlreadyInWorld,

    #[error("entity is registered in a world; go through the world")]
    Registered,

    #[error("terminated: {0}")]
    Terminated(&'static str),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}
