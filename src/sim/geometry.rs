//! Tile grid geometry and terrain classification
//!
//! The grid is stored bottom row first: tile (tx, ty) lives at index
//! `ty * tiles_x + tx`, and pixel (px, py) maps to tile (px / L, py / L).
//!
//! Every pixel query is answered per tile: a pixel range is clipped to the
//! grid and then walked tile by tile. Pixels outside the grid never match a
//! terrain predicate.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::consts::OUT_OF_BOUNDS_FEATURE;
use crate::error::{Result, SimError};

/// Terrain kind of a single tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Terrain {
    #[default]
    Air,
    SolidGround,
    Water,
    Magma,
    Ice,
    Gas,
}

impl Terrain {
    /// Numeric feature code
    pub const fn feature(self) -> i32 {
        match self {
            Terrain::Air => 0,
            Terrain::SolidGround => 1,
            Terrain::Water => 2,
            Terrain::Magma => 3,
            Terrain::Ice => 4,
            Terrain::Gas => 5,
        }
    }

    pub fn from_feature(code: i32) -> Option<Self> {
        match code {
            0 => Some(Terrain::Air),
            1 => Some(Terrain::SolidGround),
            2 => Some(Terrain::Water),
            3 => Some(Terrain::Magma),
            4 => Some(Terrain::Ice),
            5 => Some(Terrain::Gas),
            _ => None,
        }
    }

    /// Solid ground and ice block movement
    pub const fn is_impassable(self) -> bool {
        matches!(self, Terrain::SolidGround | Terrain::Ice)
    }
}

/// Axis-aligned pixel box anchored at its bottom-left pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelBox {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn at(origin: IVec2, width: i32, height: i32) -> Self {
        Self::new(origin.x, origin.y, width, height)
    }

    /// Boxes overlap (last pixel column/row of each box is `origin + size - 1`)
    pub fn collides(&self, other: &PixelBox) -> bool {
        !(self.x + self.width - 1 < other.x
            || other.x + other.width - 1 < self.x
            || self.y + self.height - 1 < other.y
            || other.y + other.height - 1 < self.y)
    }

    /// Boxes overlap or share an edge
    pub fn is_next_to(&self, other: &PixelBox) -> bool {
        !(self.x + self.width < other.x
            || other.x + other.width < self.x
            || self.y + self.height < other.y
            || other.y + other.height < self.y)
    }

    /// `self` stands exactly on top of `other`
    pub fn rests_on(&self, other: &PixelBox) -> bool {
        self.y == other.y + other.height
            && self.x <= other.x + other.width
            && other.x <= self.x + self.width
    }
}

/// The tile grid of a world
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    tile_length: i32,
    tiles_x: i32,
    tiles_y: i32,
    /// Extent in pixels
    size: IVec2,
    tiles: Vec<Terrain>,
}

impl Grid {
    /// Build a grid from bottom-row-first feature codes
    ///
    /// Missing or unknown codes become air.
    pub fn new(tile_length: i32, tiles_x: i32, tiles_y: i32, features: &[i32]) -> Result<Self> {
        if tile_length <= 0 {
            return Err(SimError::InvalidWorld(format!(
                "tile length must be positive, got {tile_length}"
            )));
        }
        if tiles_x <= 0 || tiles_y <= 0 {
            return Err(SimError::InvalidWorld(format!(
                "grid must have tiles, got {tiles_x}x{tiles_y}"
            )));
        }
        let too_large = || {
            SimError::InvalidWorld(format!(
                "{tiles_x}x{tiles_y} tiles of {tile_length} px do not fit in pixel coordinates"
            ))
        };
        let size = IVec2::new(
            tiles_x.checked_mul(tile_length).ok_or_else(too_large)?,
            tiles_y.checked_mul(tile_length).ok_or_else(too_large)?,
        );
        let count = tiles_x.checked_mul(tiles_y).ok_or_else(too_large)? as usize;
        let tiles = (0..count)
            .map(|i| {
                features
                    .get(i)
                    .and_then(|&code| Terrain::from_feature(code))
                    .unwrap_or_default()
            })
            .collect();
        Ok(Self {
            tile_length,
            tiles_x,
            tiles_y,
            size,
            tiles,
        })
    }

    #[inline]
    pub fn tile_length(&self) -> i32 {
        self.tile_length
    }

    #[inline]
    pub fn tiles_x(&self) -> i32 {
        self.tiles_x
    }

    #[inline]
    pub fn tiles_y(&self) -> i32 {
        self.tiles_y
    }

    /// World extent in pixels
    pub fn size_in_pixels(&self) -> IVec2 {
        self.size
    }

    /// Tile containing a pixel (integer division, truncating toward zero)
    #[inline]
    pub fn pixel_to_tile(&self, px: i32, py: i32) -> IVec2 {
        IVec2::new(px / self.tile_length, py / self.tile_length)
    }

    pub fn contains_pixel(&self, px: i32, py: i32) -> bool {
        let size = self.size_in_pixels();
        px >= 0 && py >= 0 && px < size.x && py < size.y
    }

    pub fn tile(&self, tx: i32, ty: i32) -> Option<Terrain> {
        if tx < 0 || ty < 0 || tx >= self.tiles_x || ty >= self.tiles_y {
            return None;
        }
        Some(self.tiles[(ty * self.tiles_x + tx) as usize])
    }

    pub fn terrain_at(&self, px: i32, py: i32) -> Option<Terrain> {
        if !self.contains_pixel(px, py) {
            return None;
        }
        let tile = self.pixel_to_tile(px, py);
        self.tile(tile.x, tile.y)
    }

    /// Feature code of a pixel, or [`OUT_OF_BOUNDS_FEATURE`]
    pub fn feature_at(&self, px: i32, py: i32) -> i32 {
        self.terrain_at(px, py)
            .map(Terrain::feature)
            .unwrap_or(OUT_OF_BOUNDS_FEATURE)
    }

    /// Overwrite the tile containing a pixel; pixels outside the grid are ignored
    pub fn set_terrain_at(&mut self, px: i32, py: i32, terrain: Terrain) -> bool {
        if !self.contains_pixel(px, py) {
            return false;
        }
        let tile = self.pixel_to_tile(px, py);
        let index = (tile.y * self.tiles_x + tile.x) as usize;
        self.tiles[index] = terrain;
        true
    }

    /// Does any pixel in the inclusive range match the predicate?
    fn any_in(&self, x0: i32, x1: i32, y0: i32, y1: i32, pred: impl Fn(Terrain) -> bool) -> bool {
        let size = self.size_in_pixels();
        let (x0, x1) = (x0.max(0), x1.min(size.x - 1));
        let (y0, y1) = (y0.max(0), y1.min(size.y - 1));
        if x0 > x1 || y0 > y1 {
            return false;
        }
        let lo = self.pixel_to_tile(x0, y0);
        let hi = self.pixel_to_tile(x1, y1);
        for ty in lo.y..=hi.y {
            for tx in lo.x..=hi.x {
                if self.tile(tx, ty).is_some_and(&pred) {
                    return true;
                }
            }
        }
        false
    }

    /// Any pixel of the closed box `[x, x + w] × [y, y + h]` matches
    pub fn region_overlaps(&self, bx: &PixelBox, pred: impl Fn(Terrain) -> bool) -> bool {
        self.any_in(bx.x, bx.x + bx.width, bx.y, bx.y + bx.height, pred)
    }

    /// Any pixel of the row just above the box (`y + h`) matches
    pub fn top_row_overlaps(&self, bx: &PixelBox, pred: impl Fn(Terrain) -> bool) -> bool {
        let row = bx.y + bx.height;
        self.any_in(bx.x, bx.x + bx.width, row, row, pred)
    }

    /// No impassable tile under columns `x..x+w` and rows `y+1..y+h`
    ///
    /// The bottom row is left out so an entity may sink one pixel into the
    /// surface it stands on.
    pub fn is_passable(&self, bx: &PixelBox) -> bool {
        !self.any_in(
            bx.x,
            bx.x + bx.width - 1,
            bx.y + 1,
            bx.y + bx.height - 1,
            Terrain::is_impassable,
        )
    }

    /// Solid ground directly below or in the bottom row, ignoring the outer columns
    pub fn rests_on_ground(&self, bx: &PixelBox) -> bool {
        self.any_in(bx.x + 1, bx.x + bx.width - 1, bx.y - 1, bx.y, |t| {
            t == Terrain::SolidGround
        })
    }
}
