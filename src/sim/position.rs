//! Continuous (meter) and discrete (pixel) positions

use glam::{DVec2, IVec2};
use serde::{Deserialize, Serialize};

use crate::consts::{PIXEL_EPSILON, PIXELS_PER_METER};

/// Pixel coordinate of a meter coordinate
///
/// Truncates `meters * 100`, bumping up when the fractional part is within
/// [`PIXEL_EPSILON`] of the next pixel. Values in (-0.01, 0) map to pixel -1.
pub fn meters_to_pixel(meters: f64) -> i32 {
    if meters < 0.0 && meters > -1.0 / PIXELS_PER_METER {
        return -1;
    }
    let scaled = meters * PIXELS_PER_METER;
    let truncated = scaled as i32;
    if scaled - truncated as f64 >= 1.0 - PIXEL_EPSILON {
        truncated + 1
    } else {
        truncated
    }
}

#[inline]
pub fn pixel_to_meters(pixel: i32) -> f64 {
    pixel as f64 / PIXELS_PER_METER
}

/// A position kept in both units; the pixel form is always derived
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    meters: DVec2,
    pixels: IVec2,
}

impl Position {
    pub fn from_meters(meters: DVec2) -> Self {
        Self {
            meters,
            pixels: IVec2::new(meters_to_pixel(meters.x), meters_to_pixel(meters.y)),
        }
    }

    pub fn from_pixels(pixels: IVec2) -> Self {
        Self {
            meters: DVec2::new(pixel_to_meters(pixels.x), pixel_to_meters(pixels.y)),
            pixels,
        }
    }

    #[inline]
    pub fn meters(&self) -> DVec2 {
        self.meters
    }

    #[inline]
    pub fn pixels(&self) -> IVec2 {
        self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rounding_rules() {
        assert_eq!(meters_to_pixel(0.0), 0);
        assert_eq!(meters_to_pixel(0.015), 1);
        assert_eq!(meters_to_pixel(1.0), 100);
        // 0.29 * 100 = 28.999999999999996
        assert_eq!(meters_to_pixel(0.29), 29);
        assert_eq!(meters_to_pixel(-0.005), -1);
        assert_eq!(meters_to_pixel(-0.0), 0);
    }

    #[test]
    fn test_pixel_round_trip() {
        for px in [0, 1, 29, 57, 99, 1000, 12345] {
            assert_eq!(Position::from_pixels(IVec2::new(px, px)).pixels(), IVec2::new(px, px));
        }
    }

    proptest! {
        #[test]
        fn prop_pixel_follows_meters(x in 0.0f64..100.0, y in 0.0f64..100.0) {
            let pos = Position::from_meters(DVec2::new(x, y));
            let px = pos.pixels();
            // Within one pixel below the scaled value, never above it by more than epsilon
            prop_assert!((px.x as f64) <= x * PIXELS_PER_METER + PIXEL_EPSILON);
            prop_assert!((px.x as f64) > x * PIXELS_PER_METER - 1.0);
            prop_assert!((px.y as f64) <= y * PIXELS_PER_METER + PIXEL_EPSILON);
            prop_assert!((px.y as f64) > y * PIXELS_PER_METER - 1.0);
        }

        #[test]
        fn prop_negative_band_is_minus_one(x in -0.0099f64..-1e-12) {
            prop_assert_eq!(meters_to_pixel(x), -1);
        }
    }
}
