//! Sharks: patrol, rest, reverse; jump when in water or on ground

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::body::{Body, Probe, StepOutcome};
use super::entity::{Direction, EntityKind};
use super::geometry::{Grid, PixelBox};
use super::position::pixel_to_meters;
use super::stage::Stage;
use super::timers::{Cooldown, Exposure};
use crate::consts::{
    CONTACT_COOLDOWN, GRAVITY, SHARK_ACCELERATION, SHARK_DRY_DAMAGE, SHARK_DRY_PERIOD,
    SHARK_JUMP_SPEED, SHARK_PATROL_TIME, SHARK_PLAYER_DAMAGE, SHARK_REST_TIME, SHARK_SLIME_HEAL,
    TIME_EPSILON,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Phase {
    Patrol { direction: Direction, elapsed: f64 },
    Rest { remaining: f64, next: Direction },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharkState {
    phase: Phase,
    dry: Exposure,
    player_cooldown: Cooldown,
}

impl Default for SharkState {
    fn default() -> Self {
        Self {
            phase: Phase::Rest {
                remaining: 0.0,
                next: Direction::Left,
            },
            dry: Exposure::default(),
            player_cooldown: Cooldown::default(),
        }
    }
}

impl SharkState {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn start_patrol(&mut self, body: &mut Body, direction: Direction) {
        self.phase = Phase::Patrol {
            direction,
            elapsed: 0.0,
        };
        body.set_velocity_x(0.0);
        body.set_acceleration_x(direction.sign() * SHARK_ACCELERATION);
        body.orientation = direction.orientation();
        body.current_sprite = match direction {
            Direction::Left => 1,
            Direction::Right => 2,
        };
        if body.contact.in_water || body.contact.on_ground {
            body.set_velocity_y(SHARK_JUMP_SPEED);
            body.set_acceleration_y(GRAVITY);
        }
    }

    fn start_rest(&mut self, body: &mut Body, next: Direction) {
        self.phase = Phase::Rest {
            remaining: SHARK_REST_TIME,
            next,
        };
        if body.velocity.y > 0.0 {
            body.set_velocity_y(0.0);
        }
        body.set_velocity_x(0.0);
        body.set_acceleration_x(0.0);
        body.current_sprite = 0;
    }

    fn phase_left(&self) -> f64 {
        match self.phase {
            Phase::Patrol { elapsed, .. } => SHARK_PATROL_TIME - elapsed,
            Phase::Rest { remaining, .. } => remaining,
        }
    }

    fn advance_phase(&mut self, body: &mut Body, t: f64) {
        match &mut self.phase {
            Phase::Patrol { direction, elapsed } => {
                *elapsed += t;
                if *elapsed >= SHARK_PATROL_TIME - TIME_EPSILON {
                    let next = direction.opposite();
                    self.start_rest(body, next);
                }
            }
            Phase::Rest { remaining, .. } => *remaining -= t,
        }
    }

    /// Gravity out of water; no sinking into ground or while submerged
    fn reconcile(body: &mut Body, grid: Option<&Grid>) {
        if !body.contact.submerged {
            body.set_acceleration_y(GRAVITY);
        }
        if body.contact.on_ground {
            Self::settle(body, grid);
        }
        let contact = body.contact;
        if (contact.submerged || contact.on_ground) && body.velocity.y <= 0.0 {
            body.set_velocity_y(0.0);
            body.set_acceleration_y(0.0);
        }
    }

    /// Lift the shark until it sits flush on the ground
    fn settle(body: &mut Body, grid: Option<&Grid>) {
        let Some(terrain) = grid else {
            return;
        };
        let sprite = body.sprite();
        let standing = body.sprites[0].width;
        let origin = body.pixels();
        let top = terrain.size_in_pixels().y;
        let mut y = origin.y;
        while y < top
            && terrain.rests_on_ground(&PixelBox::new(origin.x, y + 1, standing, sprite.height))
        {
            y += 1;
        }
        if y != origin.y {
            body.place(DVec2::new(body.meters().x, pixel_to_meters(y)), grid);
        }
    }

    /// Advance the shark; returns the time left over after dying
    pub(crate) fn advance(&mut self, body: &mut Body, dt: f64, stage: &mut Stage<'_>) -> f64 {
        let mut remaining = dt;
        while remaining > 0.0 {
            body.refresh_contact(stage.grid());
            if let Phase::Rest { remaining: rest, next } = self.phase {
                if rest <= TIME_EPSILON {
                    self.start_patrol(body, next);
                }
            }
            Self::reconcile(body, stage.grid());

            let t = body.adaptive_step(remaining).min(self.phase_left());
            remaining -= t;
            self.player_cooldown.tick(t);

            let mut seen = Probe::default();
            match body.integrate(t, stage, &mut seen) {
                StepOutcome::Left => return 0.0,
                StepOutcome::Moved => {}
                StepOutcome::Horizontal => {
                    let contact = body.contact;
                    body.set_velocity_y(0.0);
                    body.set_acceleration_y(if contact.on_ground || contact.submerged {
                        0.0
                    } else {
                        GRAVITY
                    });
                }
                StepOutcome::Cornered => {
                    body.velocity = DVec2::ZERO;
                    body.set_acceleration_y(0.0);
                }
                StepOutcome::Vertical | StepOutcome::Blocked => body.set_velocity_x(0.0),
            }
            self.advance_phase(body, t);

            self.apply_contact(body, t, stage, &seen);
            if body.dead {
                return remaining;
            }
        }
        0.0
    }

    fn apply_contact(&mut self, body: &mut Body, t: f64, stage: &mut Stage<'_>, seen: &Probe) {
        let dried = self
            .dry
            .advance(!body.contact.in_water, t, SHARK_DRY_PERIOD, false) as i32;
        if dried > 0 {
            body.add_hit_points(-SHARK_DRY_DAMAGE * dried);
        }

        let bx = body.bounding_box();
        let mut slime = false;
        let mut player = false;
        for (id, other) in stage.others() {
            let near = bx.is_next_to(&other.bounding_box()) || seen.overlaps_entity(id);
            match other.kind() {
                EntityKind::Slime => slime |= near,
                EntityKind::Player => player |= near,
                _ => {}
            }
        }
        // Every sub-step in contact heals
        if slime {
            body.add_hit_points(SHARK_SLIME_HEAL);
        }
        if player && self.player_cooldown.is_ready() {
            self.player_cooldown.arm(CONTACT_COOLDOWN);
            body.add_hit_points(-SHARK_PLAYER_DAMAGE);
            if let Some(target) = stage.player_mut() {
                target.arm_shark_cooldown();
            }
        }
    }
}
