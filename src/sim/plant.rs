//! Plants: Sneezewort walks left and right, Skullcab bobs up and down
//!
//! Plants move unconditionally through terrain and other entities. They
//! own the rule for being eaten by the player.

use serde::{Deserialize, Serialize};

use super::body::Body;
use super::entity::EntityKind;
use super::stage::Stage;
use super::timers::{Countdown, Exposure};
use crate::consts::{
    PLANT_BITE_PERIOD, PLANT_LEG_TIME, PLANT_NUTRITION, PLANT_SPEED, ROTTEN_PLANT_DAMAGE,
    SKULLCAB_MAX_BITES, STEP_DISTANCE, TIME_EPSILON,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlantState {
    lifetime: Countdown,
    /// Time travelled since the last reversal
    leg: f64,
    bite: Exposure,
    bites: u32,
}

impl PlantState {
    pub(crate) fn new(lifetime: f64) -> Self {
        Self {
            lifetime: Countdown::new(lifetime),
            leg: 0.0,
            bite: Exposure::default(),
            bites: 0,
        }
    }

    /// Set the initial motion: Sneezewort left, Skullcab up
    pub(crate) fn launch(&self, body: &mut Body) {
        match body.kind {
            EntityKind::Skullcab => body.set_velocity_y(PLANT_SPEED),
            _ => {
                body.set_velocity_x(-PLANT_SPEED);
                body.orientation = -1;
            }
        }
        Self::select_sprite(body);
    }

    pub fn lifetime(&self) -> f64 {
        self.lifetime.remaining()
    }

    pub fn bites(&self) -> u32 {
        self.bites
    }

    fn reverse(&mut self, body: &mut Body) {
        self.leg = 0.0;
        body.velocity = -body.velocity;
        body.orientation = -body.orientation;
        Self::select_sprite(body);
    }

    fn select_sprite(body: &mut Body) {
        body.current_sprite = match body.kind {
            EntityKind::Skullcab => usize::from(body.velocity.y <= 0.0),
            _ => usize::from(body.velocity.x >= 0.0),
        };
    }

    /// Advance the plant; returns the time left over after dying
    pub(crate) fn advance(&mut self, body: &mut Body, dt: f64, stage: &mut Stage<'_>) -> f64 {
        let mut remaining = dt;
        while remaining > 0.0 {
            // Never step past a reversal
            let t = (STEP_DISTANCE / PLANT_SPEED)
                .min(remaining)
                .min(PLANT_LEG_TIME - self.leg);
            remaining -= t;

            let candidate = body.meters() + body.velocity * t;
            if stage.outside(body.box_at(candidate)) {
                body.terminate();
                return 0.0;
            }
            body.place(candidate, stage.grid());

            self.leg += t;
            if self.leg >= PLANT_LEG_TIME - TIME_EPSILON {
                self.reverse(body);
            }

            if self.lifetime.consume(t) {
                body.die();
                return remaining;
            }
            self.feed(body, t, stage);
            if body.terminated {
                return 0.0;
            }
            if body.dead {
                return remaining;
            }
        }
        0.0
    }

    /// Let an overlapping player take bites
    fn feed(&mut self, body: &mut Body, t: f64, stage: &mut Stage<'_>) {
        let bx = body.bounding_box();
        let touching = stage
            .player()
            .is_some_and(|player| !player.is_dead() && bx.collides(&player.bounding_box()));
        let mut bites = self.bite.advance(touching, t, PLANT_BITE_PERIOD, true);
        if body.kind == EntityKind::Skullcab {
            bites = bites.min(SKULLCAB_MAX_BITES.saturating_sub(self.bites));
        }
        for _ in 0..bites {
            self.bites += 1;
            body.add_hit_points(-1);
            if let Some(player) = stage.player_mut() {
                if player.hit_points() < player.max_hit_points() {
                    player.add_hit_points(PLANT_NUTRITION);
                }
            }
            if body.kind == EntityKind::Sneezewort {
                log::debug!("sneezewort eaten at {:?}", body.pixels());
                body.terminate();
                return;
            }
            if body.dead {
                return;
            }
        }
    }

    /// A rotting Sneezewort makes the player sick once and disappears
    pub(crate) fn while_dead(&mut self, body: &mut Body, stage: &mut Stage<'_>) {
        if body.kind != EntityKind::Sneezewort {
            return;
        }
        let bx = body.bounding_box();
        let Some(player) = stage.player_mut() else {
            return;
        };
        if !player.is_dead() && bx.collides(&player.bounding_box()) {
            player.add_hit_points(-ROTTEN_PLANT_DAMAGE);
            body.terminate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::{Entity, Sprite};

    fn sprites() -> Vec<Sprite> {
        vec![Sprite::new(10, 10); 2]
    }

    #[test]
    fn test_sneezewort_reverses_every_half_second() {
        let mut plant = Entity::sneezewort(100, 100, sprites()).unwrap();
        assert_eq!(plant.velocity().x, -0.5);
        assert_eq!(plant.current_sprite_index(), 0);
        for _ in 0..5 {
            plant.advance_time(0.1).unwrap();
        }
        assert_eq!(plant.pixel_position().x, 75);
        assert_eq!(plant.velocity().x, 0.5);
        assert_eq!(plant.current_sprite_index(), 1);
        for _ in 0..5 {
            plant.advance_time(0.1).unwrap();
        }
        assert_eq!(plant.pixel_position().x, 100);
    }

    #[test]
    fn test_skullcab_bobs_vertically() {
        let mut plant = Entity::skullcab(100, 100, sprites()).unwrap();
        assert_eq!(plant.velocity().y, 0.5);
        assert_eq!(plant.velocity().x, 0.0);
        plant.advance_time(0.2).unwrap();
        assert_eq!(plant.pixel_position(), glam::IVec2::new(100, 110));
    }

    #[test]
    fn test_lifetime_then_linger() {
        let mut plant = Entity::sneezewort(500, 500, sprites()).unwrap();
        for _ in 0..49 {
            plant.advance_time(0.2).unwrap();
        }
        assert!(!plant.is_dead());
        plant.advance_time(0.2).unwrap();
        assert!(plant.is_dead());
        assert_eq!(plant.hit_points(), 0);
        plant.advance_time(0.2).unwrap();
        plant.advance_time(0.2).unwrap();
        assert!(!plant.is_terminated());
        plant.advance_time(0.2).unwrap();
        assert!(plant.is_terminated());
    }
}
