//! Level description
//!
//! A level is plain data: grid dimensions, feature codes, target tile,
//! visible window and a list of spawns. Stored as JSON.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::sim::{Entity, SchoolId, Sprite, World};

/// Which entity a spawn creates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnKind {
    Player,
    Sneezewort,
    Skullcab,
    Slime,
    Shark,
}

impl SpawnKind {
    /// Size of the default sprite table
    pub fn sprite_count(&self) -> usize {
        match self {
            SpawnKind::Player => 10,
            SpawnKind::Sneezewort | SpawnKind::Skullcab | SpawnKind::Slime => 2,
            SpawnKind::Shark => 3,
        }
    }
}

/// One entity placed in a level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnConfig {
    pub kind: SpawnKind,
    /// Bottom-left pixel
    pub x: i32,
    pub y: i32,
    /// Sprite sizes; empty means `default_sprite` repeated
    #[serde(default)]
    pub sprites: Vec<Sprite>,
    /// Slime id; defaults to the spawn's index
    #[serde(default)]
    pub slime_id: Option<u64>,
    /// Index into the level's schools
    #[serde(default)]
    pub school: Option<usize>,
}

impl SpawnConfig {
    pub fn new(kind: SpawnKind, x: i32, y: i32) -> Self {
        Self {
            kind,
            x,
            y,
            sprites: Vec::new(),
            slime_id: None,
            school: None,
        }
    }

    pub fn in_school(mut self, school: usize) -> Self {
        self.school = Some(school);
        self
    }

    fn sprite_set(&self, fallback: Sprite) -> Vec<Sprite> {
        if self.sprites.is_empty() {
            vec![fallback; self.kind.sprite_count()]
        } else {
            self.sprites.clone()
        }
    }
}

/// A complete level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelConfig {
    pub tile_length: i32,
    pub tiles_x: i32,
    pub tiles_y: i32,
    /// Feature codes, bottom row first; missing or unknown codes are air
    #[serde(default)]
    pub features: Vec<i32>,
    pub target_tile: IVec2,
    pub window: IVec2,
    /// Number of slime schools to create
    #[serde(default)]
    pub schools: usize,
    #[serde(default = "default_sprite")]
    pub default_sprite: Sprite,
    #[serde(default)]
    pub spawns: Vec<SpawnConfig>,
}

fn default_sprite() -> Sprite {
    Sprite::new(10, 10)
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self::demo()
    }
}

impl LevelConfig {
    /// Built-in level: a floor, a pond with a shark, plants and a slime pair
    pub fn demo() -> Self {
        let (tiles_x, tiles_y) = (40, 12);
        let mut features = vec![0; (tiles_x * tiles_y) as usize];
        // Floor
        features[..tiles_x as usize].fill(1);
        // Pond two tiles deep, dug into the floor row above
        for tx in 18..24 {
            features[(tiles_x + tx) as usize] = 2;
            features[(2 * tiles_x + tx) as usize] = 2;
        }
        for tx in [17, 24] {
            features[(tiles_x + tx) as usize] = 1;
            features[(2 * tiles_x + tx) as usize] = 1;
        }
        // A gas pocket and a ledge of ice
        features[(3 * tiles_x + 30) as usize] = 5;
        for tx in 8..12 {
            features[(4 * tiles_x + tx) as usize] = 4;
        }

        Self {
            tile_length: 10,
            tiles_x,
            tiles_y,
            features,
            target_tile: IVec2::new(38, 1),
            window: IVec2::new(200, 120),
            schools: 2,
            default_sprite: default_sprite(),
            spawns: vec![
                SpawnConfig::new(SpawnKind::Player, 10, 10),
                SpawnConfig::new(SpawnKind::Sneezewort, 60, 12),
                SpawnConfig::new(SpawnKind::Skullcab, 140, 30),
                SpawnConfig::new(SpawnKind::Shark, 200, 10),
                SpawnConfig::new(SpawnKind::Slime, 270, 10).in_school(0),
                SpawnConfig::new(SpawnKind::Slime, 300, 10).in_school(1),
                SpawnConfig::new(SpawnKind::Slime, 330, 10).in_school(1),
            ],
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Create the world and register every spawn
    pub fn build(&self) -> Result<World> {
        let mut world = World::new(
            self.tile_length,
            self.tiles_x,
            self.tiles_y,
            self.target_tile,
            self.window.x,
            self.window.y,
            &self.features,
        )?;
        let schools = (0..self.schools)
            .map(|_| world.create_school())
            .collect::<Result<Vec<SchoolId>>>()?;

        for (index, spawn) in self.spawns.iter().enumerate() {
            let sprites = spawn.sprite_set(self.default_sprite);
            let (x, y) = (spawn.x, spawn.y);
            let entity = match spawn.kind {
                SpawnKind::Player => Entity::player(x, y, sprites)?,
                SpawnKind::Sneezewort => Entity::sneezewort(x, y, sprites)?,
                SpawnKind::Skullcab => Entity::skullcab(x, y, sprites)?,
                SpawnKind::Shark => Entity::shark(x, y, sprites)?,
                SpawnKind::Slime => {
                    let school = match spawn.school {
                        Some(i) => Some(*schools.get(i).ok_or_else(|| {
                            SimError::InvalidWorld(format!("spawn {index} names school {i}"))
                        })?),
                        None => None,
                    };
                    let id = spawn.slime_id.unwrap_or(index as u64);
                    world.create_slime(id, x, y, sprites, school)?
                }
            };
            world.add_entity(entity)?;
        }
        log::info!(
            "level built: {} entities, {} schools",
            world.entity_count(),
            schools.len()
        );
        Ok(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::EntityKind;

    #[test]
    fn test_demo_level_builds() {
        let world = LevelConfig::demo().build().unwrap();
        assert!(world.player().is_some());
        assert_eq!(world.entity_count(), 7);
        assert_eq!(world.schools().count(), 2);
        let sharks = world
            .all_entities()
            .filter(|(_, e)| e.kind() == EntityKind::Shark)
            .count();
        assert_eq!(sharks, 1);
    }

    #[test]
    fn test_json_round_trip_keeps_spawns() {
        let level = LevelConfig::demo();
        let json = level.to_json().unwrap();
        let back = LevelConfig::from_json(&json).unwrap();
        assert_eq!(back.spawns.len(), level.spawns.len());
        assert_eq!(back.features, level.features);
        assert_eq!(back.spawns[4].school, Some(0));
    }

    #[test]
    fn test_minimal_json() {
        let json = r#"{
            "tile_length": 10,
            "tiles_x": 5,
            "tiles_y": 5,
            "target_tile": [4, 4],
            "window": [20, 20],
            "spawns": [{ "kind": "player", "x": 0, "y": 0 }]
        }"#;
        let level = LevelConfig::from_json(json).unwrap();
        assert!(level.features.is_empty());
        assert_eq!(level.default_sprite, Sprite::new(10, 10));
        let world = level.build().unwrap();
        assert_eq!(world.player().unwrap().sprites().len(), 10);
    }

    #[test]
    fn test_bad_input() {
        assert!(matches!(
            LevelConfig::from_json("{ not json"),
            Err(SimError::Config(_))
        ));
        let mut level = LevelConfig::demo();
        level.spawns.push(SpawnConfig::new(SpawnKind::Slime, 350, 10).in_school(7));
        assert!(matches!(level.build(), Err(SimError::InvalidWorld(_))));
        let mut level = LevelConfig::demo();
        level.spawns.push(SpawnConfig::new(SpawnKind::Player, 100, 10));
        assert!(matches!(level.build(), Err(SimError::DuplicatePlayer)));
    }
}
