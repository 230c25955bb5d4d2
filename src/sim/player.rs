//! Player state machine

use serde::{Deserialize, Serialize};

use super::body::{Body, Probe, StepOutcome};
use super::entity::{Direction, EntityKind, PlayerAction};
use super::geometry::PixelBox;
use super::stage::Stage;
use super::timers::{Cooldown, Exposure};
use crate::consts::{
    CONTACT_COOLDOWN, GAS_DAMAGE, GAS_PERIOD, GRAVITY, IDLE_AFTER, MAGMA_DAMAGE, MAGMA_PERIOD,
    PLAYER_ACCELERATION, PLAYER_DUCK_SPEED, PLAYER_JUMP_SPEED, PLAYER_MIN_SPEED, RUN_FRAME_TIME,
    SHARK_BITE, SLIME_BITE, WATER_DAMAGE, WATER_PERIOD,
};
use crate::error::{Result, SimError};

/// Movement flags, animation clocks and damage timers of the player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    moving: bool,
    jumping: bool,
    ducking: bool,
    facing: Direction,
    /// Time since the player last moved horizontally
    since_moved: f64,
    /// Time spent running in the current direction
    run_clock: f64,
    magma: Exposure,
    water: Exposure,
    gas: Exposure,
    slime_cooldown: Cooldown,
    shark_cooldown: Cooldown,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            moving: false,
            jumping: false,
            ducking: false,
            facing: Direction::Right,
            since_moved: IDLE_AFTER,
            run_clock: 0.0,
            magma: Exposure::default(),
            water: Exposure::default(),
            gas: Exposure::default(),
            slime_cooldown: Cooldown::default(),
            shark_cooldown: Cooldown::default(),
        }
    }
}

impl PlayerState {
    pub fn is_moving(&self) -> bool {
        self.moving
    }

    pub fn is_jumping(&self) -> bool {
        self.jumping
    }

    pub fn is_ducking(&self) -> bool {
        self.ducking
    }

    pub fn facing(&self) -> Direction {
        self.facing
    }

    /// Block shark damage for one contact window
    pub(crate) fn arm_shark_cooldown(&mut self) {
        self.shark_cooldown.arm(CONTACT_COOLDOWN);
    }

    pub(crate) fn perform(
        &mut self,
        body: &mut Body,
        action: PlayerAction,
        stage: &mut Stage<'_>,
    ) -> Result<()> {
        match action {
            PlayerAction::StartMove(direction) => self.start_move(body, direction)?,
            PlayerAction::EndMove => self.end_move(body)?,
            PlayerAction::StartJump => self.start_jump(body)?,
            PlayerAction::EndJump => self.end_jump(body)?,
            PlayerAction::StartDuck => self.start_duck(body),
            PlayerAction::EndDuck => self.end_duck(body, stage),
        }
        self.select_sprite(body);
        body.refresh_contact(stage.grid());
        Ok(())
    }

    fn start_move(&mut self, body: &mut Body, direction: Direction) -> Result<()> {
        if body.dead {
            return Err(SimError::IllegalState("a dead player cannot move"));
        }
        if self.moving {
            return Err(SimError::IllegalState("player is already moving"));
        }
        self.moving = true;
        self.facing = direction;
        self.run_clock = 0.0;
        body.orientation = direction.orientation();
        // Against the left edge only the intent is recorded
        if direction == Direction::Left && body.meters().x <= 0.0 {
            return Ok(());
        }
        if self.ducking {
            body.set_velocity_x(direction.sign() * PLAYER_DUCK_SPEED);
            body.set_acceleration_x(0.0);
        } else {
            body.set_velocity_x(direction.sign() * PLAYER_MIN_SPEED);
            body.set_acceleration_x(direction.sign() * PLAYER_ACCELERATION);
        }
        Ok(())
    }

    fn end_move(&mut self, body: &mut Body) -> Result<()> {
        if !self.moving {
            return Err(SimError::IllegalState("player is not moving"));
        }
        self.moving = false;
        self.since_moved = 0.0;
        self.run_clock = 0.0;
        body.set_velocity_x(0.0);
        body.set_acceleration_x(0.0);
        body.set_acceleration_y(0.0);
        Ok(())
    }

    fn start_jump(&mut self, body: &mut Body) -> Result<()> {
        if body.dead {
            return Err(SimError::IllegalState("a dead player cannot jump"));
        }
        if self.jumping {
            return Err(SimError::IllegalState("player is already jumping"));
        }
        self.jumping = true;
        body.set_velocity_y(PLAYER_JUMP_SPEED);
        body.set_acceleration_y(GRAVITY);
        Ok(())
    }

    fn end_jump(&mut self, body: &mut Body) -> Result<()> {
        if !self.jumping {
            return Err(SimError::IllegalState("player is not jumping"));
        }
        self.jumping = false;
        if body.velocity.y > 0.0 {
            body.set_velocity_y(0.0);
        }
        body.set_acceleration_y(GRAVITY);
        Ok(())
    }

    fn start_duck(&mut self, body: &mut Body) {
        if self.ducking || body.dead {
            return;
        }
        self.ducking = true;
        if body.velocity.x != 0.0 {
            body.set_velocity_x(body.velocity.x.signum() * PLAYER_DUCK_SPEED);
        }
        body.set_acceleration_x(0.0);
    }

    /// Stand up unless the standing sprite would be blocked
    fn end_duck(&mut self, body: &mut Body, stage: &Stage<'_>) {
        if !self.ducking {
            return;
        }
        let standing = body.sprites[0];
        let bx = PixelBox::at(body.pixels(), standing.width, standing.height);
        let passable = stage.grid().is_none_or(|grid| grid.is_passable(&bx));
        let blocked = stage
            .others()
            .any(|(_, other)| !other.kind().is_plant() && bx.collides(&other.bounding_box()));
        if !passable || blocked {
            return;
        }
        self.ducking = false;
        if self.moving && body.velocity.x != 0.0 {
            body.set_acceleration_x(self.facing.sign() * PLAYER_ACCELERATION);
        }
    }

    /// Advance the player; returns the time left over after dying
    pub(crate) fn advance(&mut self, body: &mut Body, dt: f64, stage: &mut Stage<'_>) -> f64 {
        let mut remaining = dt;
        while remaining > 0.0 {
            body.refresh_contact(stage.grid());
            let supported = stage.supports(&body.bounding_box());
            self.reconcile(body, supported);

            let t = body.adaptive_step(remaining);
            remaining -= t;
            self.tick_timers(body, t);

            let mut seen = Probe::default();
            match body.integrate(t, stage, &mut seen) {
                StepOutcome::Left => return 0.0,
                StepOutcome::Moved => {}
                StepOutcome::Horizontal => {
                    let grounded =
                        body.contact.on_ground || stage.supports(&body.bounding_box());
                    body.set_velocity_y(0.0);
                    body.set_acceleration_y(if grounded { 0.0 } else { GRAVITY });
                }
                StepOutcome::Vertical => body.set_velocity_x(0.0),
                StepOutcome::Cornered => {
                    body.stop();
                    self.jumping = false;
                    self.since_moved = 0.0;
                }
                StepOutcome::Blocked => {
                    body.stop();
                    self.moving = false;
                    self.since_moved = IDLE_AFTER;
                }
            }

            self.apply_damage(body, t, stage, &seen);
            self.select_sprite(body);
            body.refresh_contact(stage.grid());
            if body.dead {
                return remaining;
            }
        }
        0.0
    }

    /// Bring acceleration in line with ground contact, jumping and ducking
    fn reconcile(&self, body: &mut Body, supported: bool) {
        let grounded = body.contact.on_ground || supported;
        if !grounded {
            body.set_acceleration_y(GRAVITY);
        } else if !self.jumping {
            body.set_acceleration_y(0.0);
            if body.velocity.y < 0.0 {
                body.set_velocity_y(0.0);
            }
        }
        if !self.moving {
            body.set_velocity_x(0.0);
            body.set_acceleration_x(0.0);
        } else if self.ducking {
            body.set_acceleration_x(0.0);
            if body.velocity.x != 0.0 {
                body.set_velocity_x(self.facing.sign() * PLAYER_DUCK_SPEED);
            }
        }
    }

    fn tick_timers(&mut self, body: &Body, t: f64) {
        if self.moving && body.velocity.x != 0.0 {
            self.since_moved = 0.0;
            self.run_clock += t;
        } else {
            self.since_moved += t;
            self.run_clock = 0.0;
        }
        self.slime_cooldown.tick(t);
        self.shark_cooldown.tick(t);
    }

    fn apply_damage(&mut self, body: &mut Body, t: f64, stage: &Stage<'_>, seen: &Probe) {
        let contact = body.contact;
        let magma = self.magma.advance(contact.in_magma, t, MAGMA_PERIOD, true) as i32;
        let water = self.water.advance(
            contact.in_water && !contact.in_gas && !contact.in_magma,
            t,
            WATER_PERIOD,
            false,
        ) as i32;
        let gas = self
            .gas
            .advance(contact.in_gas && !contact.in_magma, t, GAS_PERIOD, true) as i32;
        let mut delta = -(magma * MAGMA_DAMAGE + water * WATER_DAMAGE + gas * GAS_DAMAGE);

        if !body.is_stationary() {
            let bx = body.bounding_box();
            let mut slime = false;
            let mut shark = false;
            for (id, other) in stage.others() {
                let other_box = other.bounding_box();
                match other.kind() {
                    EntityKind::Slime => {
                        slime |= bx.collides(&other_box) || seen.overlaps_entity(id)
                    }
                    EntityKind::Shark => shark |= bx.is_next_to(&other_box),
                    _ => {}
                }
            }
            if slime && self.slime_cooldown.is_ready() {
                self.slime_cooldown.arm(CONTACT_COOLDOWN);
                delta -= SLIME_BITE;
            }
            if shark && self.shark_cooldown.is_ready() {
                self.shark_cooldown.arm(CONTACT_COOLDOWN);
                delta -= SHARK_BITE;
            }
        }
        if delta != 0 {
            body.add_hit_points(delta);
        }
    }

    /// Pick the animation frame for the current flags
    fn select_sprite(&self, body: &mut Body) {
        let right = self.facing == Direction::Right;
        let cycle = (body.sprites.len() - 8) / 2;
        let index = if !self.moving {
            if self.ducking {
                1
            } else if self.since_moved < IDLE_AFTER {
                if right { 2 } else { 3 }
            } else {
                0
            }
        } else if self.ducking {
            if right { 6 } else { 7 }
        } else if self.jumping {
            if right { 4 } else { 5 }
        } else {
            let frame = (self.run_clock / RUN_FRAME_TIME) as usize % cycle;
            if right { 8 + frame } else { 8 + cycle + frame }
        };
        body.current_sprite = index;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::sim::entity::{Entity, Sprite};
    use crate::sim::geometry::Grid;

    fn sprites() -> Vec<Sprite> {
        vec![Sprite::new(10, 10); 10]
    }

    fn floor_grid() -> Grid {
        // 10x10 tiles of 10 px, bottom row solid
        let mut features = vec![0; 100];
        features[..10].fill(1);
        Grid::new(10, 10, 10, &features).unwrap()
    }

    fn advance_on(grid: &Grid, player: &mut Entity, dt: f64) {
        let mut others = BTreeMap::new();
        let mut schools = BTreeMap::new();
        let mut stage = Stage::new(Some(grid), &mut others, &mut schools, None);
        player.advance(dt, &mut stage);
    }

    #[test]
    fn test_start_move_sets_min_speed() {
        let mut player = Entity::player(50, 10, sprites()).unwrap();
        player.perform(PlayerAction::StartMove(Direction::Right)).unwrap();
        assert_eq!(player.velocity().x, 1.0);
        assert_eq!(player.acceleration().x, 0.9);
        assert_eq!(player.orientation(), 1);
        assert!(player.perform(PlayerAction::StartMove(Direction::Left)).is_err());
        player.perform(PlayerAction::EndMove).unwrap();
        assert_eq!(player.velocity().x, 0.0);
        assert!(player.perform(PlayerAction::EndMove).is_err());
        // Recently moved right
        assert_eq!(player.current_sprite_index(), 2);
    }

    #[test]
    fn test_left_edge_records_intent_only() {
        let mut player = Entity::player(0, 10, sprites()).unwrap();
        player.perform(PlayerAction::StartMove(Direction::Left)).unwrap();
        assert!(player.is_moving());
        assert_eq!(player.velocity().x, 0.0);
    }

    #[test]
    fn test_jump_state_machine() {
        let mut player = Entity::player(0, 10, sprites()).unwrap();
        player.perform(PlayerAction::StartJump).unwrap();
        assert_eq!(player.velocity().y, 8.0);
        assert_eq!(player.acceleration().y, -10.0);
        assert!(matches!(
            player.perform(PlayerAction::StartJump),
            Err(SimError::IllegalState(_))
        ));
        player.perform(PlayerAction::EndJump).unwrap();
        assert_eq!(player.velocity().y, 0.0);
        assert!(player.perform(PlayerAction::EndJump).is_err());
    }

    #[test]
    fn test_duck_clamps_speed() {
        let mut player = Entity::player(50, 10, sprites()).unwrap();
        player.perform(PlayerAction::StartMove(Direction::Left)).unwrap();
        player.perform(PlayerAction::StartDuck).unwrap();
        assert_eq!(player.velocity().x, -1.0);
        assert_eq!(player.acceleration().x, 0.0);
        assert_eq!(player.current_sprite_index(), 7);
        player.perform(PlayerAction::EndDuck).unwrap();
        assert!(!player.is_ducking());
        assert_eq!(player.acceleration().x, -0.9);
    }

    #[test]
    fn test_end_duck_refused_under_ceiling() {
        // Ducking sprite 10x10, standing sprite 10x30; ice ceiling at tile row 2
        let mut sizes = vec![Sprite::new(10, 10); 10];
        sizes[0] = Sprite::new(10, 30);
        let mut features = vec![0; 100];
        features[..10].fill(1);
        features[20..30].fill(4);
        let grid = Grid::new(10, 10, 10, &features).unwrap();

        let mut player = Entity::player(50, 10, sizes).unwrap();
        let mut others = BTreeMap::new();
        let mut schools = BTreeMap::new();
        let mut stage = Stage::new(Some(&grid), &mut others, &mut schools, None);
        player.act(PlayerAction::StartDuck, &mut stage).unwrap();
        player.act(PlayerAction::EndDuck, &mut stage).unwrap();
        assert!(player.is_ducking());
    }

    #[test]
    fn test_lands_on_ground() {
        let grid = floor_grid();
        let mut player = Entity::player(50, 15, sprites()).unwrap();
        advance_on(&grid, &mut player, 0.2);
        assert_eq!(player.velocity().y, 0.0);
        assert!(player.is_on_ground());
        assert!(player.pixel_position().y >= 9 && player.pixel_position().y <= 10);
    }

    #[test]
    fn test_hit_points_never_leave_bounds_in_magma() {
        let mut features = vec![3; 100];
        features[..10].fill(1);
        let grid = Grid::new(10, 10, 10, &features).unwrap();
        let mut player = Entity::player(50, 10, sprites()).unwrap();
        // First contact costs 50 at once
        advance_on(&grid, &mut player, 0.01);
        assert_eq!(player.hit_points(), 50);
        advance_on(&grid, &mut player, 0.2);
        assert_eq!(player.hit_points(), 0);
        assert!(player.is_dead());
    }

    #[test]
    fn test_run_cycle_sprites() {
        let grid = floor_grid();
        let mut player = Entity::player(10, 10, vec![Sprite::new(10, 10); 12]).unwrap();
        let mut others = BTreeMap::new();
        let mut schools = BTreeMap::new();
        let mut stage = Stage::new(Some(&grid), &mut others, &mut schools, None);
        player
            .act(PlayerAction::StartMove(Direction::Right), &mut stage)
            .unwrap();
        player.advance(0.05, &mut stage);
        // Two run frames per direction: 8, 9 right
        assert!((8..10).contains(&player.current_sprite_index()));
        player.act(PlayerAction::EndMove, &mut stage).unwrap();
        player
            .act(PlayerAction::StartMove(Direction::Left), &mut stage)
            .unwrap();
        player.advance(0.05, &mut stage);
        assert!((10..12).contains(&player.current_sprite_index()));
        assert_eq!(player.pixel_position().y, 10);
    }
}
