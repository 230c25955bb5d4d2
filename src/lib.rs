//! Jumping Alien - simulation core of a tile-world platformer
//!
//! Core modules:
//! - `sim`: Simulation (integrator, terrain queries, entity rules, world tick)
//! - `config`: Data-driven level description (JSON)
//! - `error`: Error taxonomy shared by every fallible operation

pub mod config;
pub mod error;
pub mod sim;

pub use config::{LevelConfig, SpawnConfig, SpawnKind};
pub use error::{Result, SimError};

/// Game configuration constants
///
/// Distances are in meters unless the name says pixels; 1 m = 100 px.
pub mod consts {
    /// Pixels per meter
    pub const PIXELS_PER_METER: f64 = 100.0;
    /// Tolerance used when rounding meters to pixels
    pub const PIXEL_EPSILON: f64 = 1e-6;
    /// Tolerance for timer comparisons (sub-steps accumulate rounding error)
    pub const TIME_EPSILON: f64 = 1e-9;

    /// Largest dt accepted by a world tick (seconds)
    pub const MAX_WORLD_DT: f64 = 0.2;
    /// Target displacement per integrator sub-step (meters)
    pub const STEP_DISTANCE: f64 = 0.01;

    /// Standard gravity (m/s²)
    pub const GRAVITY: f64 = -10.0;

    /// World registry ceilings
    pub const MAX_ENTITIES: usize = 100;
    pub const MAX_SCHOOLS: usize = 10;

    /// Time an entity stays in the world after dying (seconds)
    pub const DEATH_LINGER: f64 = 0.6;
    /// Length of an invulnerability window after contact damage (seconds)
    pub const CONTACT_COOLDOWN: f64 = 0.6;

    /// Player movement
    pub const PLAYER_MIN_SPEED: f64 = 1.0;
    pub const PLAYER_MAX_SPEED: f64 = 3.0;
    pub const PLAYER_ACCELERATION: f64 = 0.9;
    pub const PLAYER_JUMP_SPEED: f64 = 8.0;
    /// Speed while ducking and moving
    pub const PLAYER_DUCK_SPEED: f64 = 1.0;

    /// Player hit points
    pub const PLAYER_START_HP: i32 = 100;
    pub const PLAYER_MAX_HP: i32 = 500;

    /// Player terrain exposure
    pub const MAGMA_PERIOD: f64 = 0.2;
    pub const MAGMA_DAMAGE: i32 = 50;
    pub const WATER_PERIOD: f64 = 0.2;
    pub const WATER_DAMAGE: i32 = 2;
    pub const GAS_PERIOD: f64 = 0.2;
    pub const GAS_DAMAGE: i32 = 4;

    /// Player contact damage
    pub const SLIME_BITE: i32 = 20;
    pub const SHARK_BITE: i32 = 50;

    /// Player sprite timing
    pub const RUN_FRAME_TIME: f64 = 0.075;
    pub const IDLE_AFTER: f64 = 1.0;
    pub const PLAYER_MIN_SPRITES: usize = 10;

    /// Plants
    pub const PLANT_SPEED: f64 = 0.5;
    pub const PLANT_LEG_TIME: f64 = 0.5;
    pub const PLANT_BITE_PERIOD: f64 = 0.6;
    pub const PLANT_NUTRITION: i32 = 50;
    pub const ROTTEN_PLANT_DAMAGE: i32 = 20;
    pub const SNEEZEWORT_HP: i32 = 1;
    pub const SNEEZEWORT_LIFETIME: f64 = 10.0;
    pub const SKULLCAB_HP: i32 = 3;
    pub const SKULLCAB_LIFETIME: f64 = 12.0;
    pub const SKULLCAB_MAX_BITES: u32 = 3;

    /// Slimes
    pub const SLIME_START_HP: i32 = 100;
    pub const SLIME_MAX_SPEED: f64 = 2.5;
    pub const SLIME_ACCELERATION: f64 = 0.7;
    pub const SLIME_PLAYER_DAMAGE: i32 = 30;
    pub const SLIME_WATER_PERIOD: f64 = 0.4;
    pub const SLIME_WATER_DAMAGE: i32 = 4;
    pub const SLIME_GAS_PERIOD: f64 = 0.3;
    pub const SLIME_GAS_HEAL: i32 = 2;
    pub const SCHOOL_PENALTY: i32 = 1;

    /// Sharks
    pub const SHARK_START_HP: i32 = 100;
    pub const SHARK_ACCELERATION: f64 = 1.5;
    pub const SHARK_JUMP_SPEED: f64 = 2.0;
    pub const SHARK_PATROL_TIME: f64 = 0.5;
    pub const SHARK_REST_TIME: f64 = 1.0;
    pub const SHARK_DRY_PERIOD: f64 = 0.2;
    pub const SHARK_DRY_DAMAGE: i32 = 6;
    pub const SHARK_SLIME_HEAL: i32 = 10;
    pub const SHARK_PLAYER_DAMAGE: i32 = 50;

    /// Feature code returned for pixels outside the grid
    pub const OUT_OF_BOUNDS_FEATURE: i32 = -1;
}
