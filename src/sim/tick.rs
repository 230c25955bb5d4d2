//! World tick driver
//!
//! One call advances every registered entity by the same `dt`: the player
//! first, then the rest in registration order. Entity-vs-entity effects
//! happen inside each entity's own step.

use super::entity::{EntityId, check_dt};
use super::world::World;
use crate::error::{Result, SimError};

impl World {
    /// Advance the whole world by `dt` seconds (at most 0.2)
    pub fn advance_world_time(&mut self, dt: f64) -> Result<()> {
        if let Err(err) = check_dt(dt) {
            log::warn!("rejected world tick: {err}");
            return Err(err);
        }
        if self.is_terminated() {
            return Err(SimError::Terminated("world"));
        }

        // Snapshot: entities retired mid-sweep are skipped, none are added
        let order: Vec<EntityId> = self
            .player
            .into_iter()
            .chain(self.entities.keys().copied().filter(|&id| Some(id) != self.player))
            .collect();
        for id in order {
            if !self.has_entity(id) {
                continue;
            }
            self.with_entity(id, |entity, stage| entity.advance(dt, stage))?;
        }
        self.elapsed += dt;

        if !self.outcome_logged {
            if self.did_player_win() {
                self.outcome_logged = true;
                log::info!("player reached the target tile after {:.2} s", self.elapsed);
            } else if self.is_game_over() && self.is_started() {
                self.outcome_logged = true;
                log::info!("game over after {:.2} s", self.elapsed);
            }
        }
        Ok(())
    }

    /// Advance a single registered entity against the rest of the world
    pub fn advance_entity_time(&mut self, id: EntityId, dt: f64) -> Result<()> {
        check_dt(dt)?;
        if self.is_terminated() {
            return Err(SimError::Terminated("world"));
        }
        self.with_entity(id, |entity, stage| entity.advance(dt, stage))
    }
}

#[cfg(test)]
mod tests {
    use glam::{DVec2, IVec2};
    use proptest::prelude::*;

    use crate::error::SimError;
    use crate::sim::entity::{Direction, Entity, EntityKind, PlayerAction, Sprite};
    use crate::sim::world::World;

    fn sprites(count: usize) -> Vec<Sprite> {
        vec![Sprite::new(10, 10); count]
    }

    /// 10x10 tiles of 10 px, solid bottom row
    fn floor_world(target: IVec2) -> World {
        let mut features = vec![0; 100];
        features[..10].fill(1);
        World::new(10, 10, 10, target, 50, 50, &features).unwrap()
    }

    #[test]
    fn test_rejects_bad_time_steps() {
        let mut world = floor_world(IVec2::new(9, 1));
        let id = world
            .add_entity(Entity::player(0, 10, sprites(10)).unwrap())
            .unwrap();
        for dt in [f64::NAN, f64::INFINITY, -0.01, 0.21] {
            assert!(matches!(
                world.advance_world_time(dt),
                Err(SimError::InvalidTimeStep(_))
            ));
        }
        assert_eq!(world.entity(id).unwrap().pixel_position(), IVec2::new(0, 10));
        assert_eq!(world.elapsed(), 0.0);
    }

    #[test]
    fn test_player_walks_to_target() {
        let mut world = floor_world(IVec2::new(9, 1));
        let id = world
            .add_entity(Entity::player(0, 10, sprites(10)).unwrap())
            .unwrap();
        world.start_game().unwrap();
        world
            .perform(id, PlayerAction::StartMove(Direction::Right))
            .unwrap();
        let mut won_at = None;
        for tick in 0..100 {
            world.advance_world_time(0.1).unwrap();
            let player = world.player().unwrap();
            let right = player.bounding_box().x + player.bounding_box().width;
            assert_eq!(world.did_player_win(), right / 10 >= 9);
            if world.did_player_win() {
                won_at = Some(tick);
                break;
            }
        }
        assert!(won_at.is_some());
        assert!(world.is_game_over());
    }

    #[test]
    fn test_player_lands_on_floor() {
        let mut world = floor_world(IVec2::new(9, 9));
        let id = world
            .add_entity(Entity::player(20, 15, sprites(10)).unwrap())
            .unwrap();
        world.advance_world_time(0.2).unwrap();
        let player = world.entity(id).unwrap();
        assert_eq!(player.velocity().y, 0.0);
        assert!(player.is_on_ground());
    }

    #[test]
    fn test_slimes_reverse_once_on_contact() {
        let mut world = floor_world(IVec2::new(9, 9));
        let left = world.create_slime(1, 20, 10, sprites(2), None).unwrap();
        let left = world.add_entity(left).unwrap();
        let right = world.create_slime(2, 40, 10, sprites(2), None).unwrap();
        let right = world.add_entity(right).unwrap();
        // Point the right slime at the left one
        world
            .change_actual_position(right, DVec2::new(0.31, 0.10))
            .unwrap();
        world.entities.get_mut(&right).unwrap().body.set_acceleration_x(-0.7);
        world.entities.get_mut(&right).unwrap().body.set_velocity_x(-0.5);
        world.entities.get_mut(&left).unwrap().body.set_velocity_x(0.5);

        let mut reversed_on = None;
        for tick in 0..20 {
            world.advance_world_time(0.02).unwrap();
            if world.entity(left).unwrap().acceleration().x < 0.0 {
                reversed_on = Some(tick);
                break;
            }
        }
        assert!(reversed_on.is_some());
        let before = world.entity(left).unwrap().acceleration().x;
        world.advance_world_time(0.02).unwrap();
        assert_eq!(world.entity(left).unwrap().acceleration().x, before);
    }

    #[test]
    fn test_plant_dies_then_leaves_world() {
        let mut world = floor_world(IVec2::new(9, 9));
        let id = world
            .add_entity(Entity::sneezewort(50, 50, sprites(2)).unwrap())
            .unwrap();
        for _ in 0..50 {
            world.advance_world_time(0.2).unwrap();
        }
        let plant = world.entity(id).unwrap();
        assert!(plant.is_dead());
        assert!(!plant.is_terminated());
        for _ in 0..3 {
            world.advance_world_time(0.2).unwrap();
        }
        assert!(!world.has_entity(id));
        assert!(world.all_entities().all(|(other, _)| other != id));
        let retired = world.retired_entity(id).unwrap();
        assert!(retired.is_terminated());
        assert!(retired.world().is_none());
    }

    #[test]
    fn test_player_eats_sneezewort() {
        let mut world = floor_world(IVec2::new(9, 9));
        let player = world
            .add_entity(Entity::player(30, 10, sprites(10)).unwrap())
            .unwrap();
        let plant = world
            .add_entity(Entity::sneezewort(32, 12, sprites(2)).unwrap())
            .unwrap();
        world.advance_world_time(0.01).unwrap();
        assert_eq!(world.entity(player).unwrap().hit_points(), 150);
        assert!(!world.has_entity(plant));
        assert_eq!(world.retired_entity(plant).unwrap().kind(), EntityKind::Sneezewort);
    }

    /// Same layout, water everywhere above the floor
    fn pond_world() -> World {
        let mut features = vec![2; 100];
        features[..10].fill(1);
        World::new(10, 10, 10, IVec2::new(9, 9), 50, 50, &features).unwrap()
    }

    #[test]
    fn test_player_and_slime_trade_damage() {
        let mut world = floor_world(IVec2::new(9, 9));
        let school = world.create_school().unwrap();
        let player = world
            .add_entity(Entity::player(20, 10, sprites(10)).unwrap())
            .unwrap();
        let hit = world.create_slime(1, 30, 10, sprites(2), Some(school)).unwrap();
        let hit = world.add_entity(hit).unwrap();
        let mate = world.create_slime(2, 70, 10, sprites(2), Some(school)).unwrap();
        let mate = world.add_entity(mate).unwrap();
        world
            .perform(player, PlayerAction::StartMove(Direction::Right))
            .unwrap();
        // Well inside one contact window
        for _ in 0..5 {
            world.advance_world_time(0.02).unwrap();
        }
        assert_eq!(world.entity(player).unwrap().hit_points(), 80);
        assert_eq!(world.entity(hit).unwrap().hit_points(), 70);
        assert_eq!(world.entity(mate).unwrap().hit_points(), 99);
    }

    #[test]
    fn test_moving_player_and_shark_bite_each_other() {
        let mut world = floor_world(IVec2::new(9, 9));
        let player = world
            .add_entity(Entity::player(20, 10, sprites(10)).unwrap())
            .unwrap();
        let shark = world
            .add_entity(Entity::shark(30, 10, sprites(3)).unwrap())
            .unwrap();
        world
            .perform(player, PlayerAction::StartMove(Direction::Right))
            .unwrap();
        for _ in 0..5 {
            world.advance_world_time(0.02).unwrap();
        }
        assert_eq!(world.entity(player).unwrap().hit_points(), 50);
        assert_eq!(world.entity(shark).unwrap().hit_points(), 50);
    }

    #[test]
    fn test_shark_bite_shields_the_player_for_a_window() {
        let mut world = floor_world(IVec2::new(9, 9));
        let player = world
            .add_entity(Entity::player(20, 10, sprites(10)).unwrap())
            .unwrap();
        let shark = world
            .add_entity(Entity::shark(30, 10, sprites(3)).unwrap())
            .unwrap();
        // A standing player takes no contact damage, but the shark still pays
        world.advance_world_time(0.02).unwrap();
        assert_eq!(world.entity(player).unwrap().hit_points(), 100);
        assert_eq!(world.entity(shark).unwrap().hit_points(), 50);
        // Moving now, yet the shark already armed the player's cooldown
        world
            .perform(player, PlayerAction::StartMove(Direction::Right))
            .unwrap();
        world.advance_world_time(0.02).unwrap();
        assert_eq!(world.entity(player).unwrap().hit_points(), 100);
        assert_eq!(world.entity(shark).unwrap().hit_points(), 50);
    }

    #[test]
    fn test_shark_heals_on_every_sub_step_next_to_a_slime() {
        let mut world = pond_world();
        let shark = world
            .add_entity(Entity::shark(50, 10, sprites(3)).unwrap())
            .unwrap();
        let slime = world.create_slime(1, 40, 10, sprites(2), None).unwrap();
        world.add_entity(slime).unwrap();
        world.advance_world_time(0.02).unwrap();
        let healed = world.entity(shark).unwrap().hit_points() - 100;
        // Several sub-steps in contact, ten points each
        assert!(healed >= 20, "healed {healed}");
        assert_eq!(healed % 10, 0);
    }

    #[test]
    fn test_colliding_slime_joins_the_larger_school() {
        let mut world = floor_world(IVec2::new(9, 9));
        let small = world.create_school().unwrap();
        let large = world.create_school().unwrap();
        let left = world.create_slime(1, 20, 10, sprites(2), Some(small)).unwrap();
        let left = world.add_entity(left).unwrap();
        let right = world.create_slime(2, 40, 10, sprites(2), Some(large)).unwrap();
        let right = world.add_entity(right).unwrap();
        let far = world.create_slime(3, 80, 10, sprites(2), Some(large)).unwrap();
        let far = world.add_entity(far).unwrap();
        world
            .change_actual_position(right, DVec2::new(0.31, 0.10))
            .unwrap();
        world.entities.get_mut(&right).unwrap().body.set_acceleration_x(-0.7);
        world.entities.get_mut(&right).unwrap().body.set_velocity_x(-0.5);
        world.entities.get_mut(&left).unwrap().body.set_velocity_x(0.5);

        for _ in 0..20 {
            world.advance_world_time(0.02).unwrap();
            if world.entity(left).unwrap().school() == Some(large) {
                break;
            }
        }
        assert_eq!(world.entity(left).unwrap().school(), Some(large));
        assert!(world.school(small).unwrap().is_empty());
        assert_eq!(world.school(large).unwrap().len(), 3);
        // Nobody left behind to pay; both new mates give one point each
        assert_eq!(world.entity(left).unwrap().hit_points(), 102);
        assert_eq!(world.entity(right).unwrap().hit_points(), 99);
        assert_eq!(world.entity(far).unwrap().hit_points(), 99);
        // The other slime stays where it was
        assert_eq!(world.entity(right).unwrap().school(), Some(large));
    }

    #[test]
    fn test_skullcab_feeds_three_times_then_dies() {
        let mut world = floor_world(IVec2::new(9, 9));
        // Tall enough to cover the whole bobbing range
        let player = world
            .add_entity(Entity::player(30, 10, vec![Sprite::new(10, 40); 10]).unwrap())
            .unwrap();
        let plant = world
            .add_entity(Entity::skullcab(32, 12, sprites(2)).unwrap())
            .unwrap();
        let run = |world: &mut World, ticks: usize| {
            for _ in 0..ticks {
                world.advance_world_time(0.1).unwrap();
            }
        };
        // Bites land at about 0.0, 0.6 and 1.2 s
        run(&mut world, 5);
        assert_eq!(world.entity(player).unwrap().hit_points(), 150);
        assert_eq!(world.entity(plant).unwrap().hit_points(), 2);
        run(&mut world, 6);
        assert_eq!(world.entity(player).unwrap().hit_points(), 200);
        assert_eq!(world.entity(plant).unwrap().hit_points(), 1);
        run(&mut world, 2);
        assert_eq!(world.entity(player).unwrap().hit_points(), 250);
        assert!(world.entity(plant).unwrap().is_dead());
        run(&mut world, 10);
        assert_eq!(world.entity(player).unwrap().hit_points(), 250);
        assert!(!world.has_entity(plant));
    }

    #[test]
    fn test_rotten_sneezewort_sickens_the_player() {
        let mut world = floor_world(IVec2::new(9, 9));
        let player = world
            .add_entity(Entity::player(0, 10, sprites(10)).unwrap())
            .unwrap();
        let plant = world
            .add_entity(Entity::sneezewort(50, 50, sprites(2)).unwrap())
            .unwrap();
        for _ in 0..50 {
            world.advance_world_time(0.2).unwrap();
        }
        assert!(world.entity(plant).unwrap().is_dead());
        assert_eq!(world.entity(player).unwrap().hit_points(), 100);
        world
            .change_actual_position(player, DVec2::new(0.5, 0.5))
            .unwrap();
        world.advance_world_time(0.01).unwrap();
        assert_eq!(world.entity(player).unwrap().hit_points(), 80);
        assert!(!world.has_entity(plant));
        assert!(world.retired_entity(plant).unwrap().is_terminated());
    }

    #[test]
    fn test_soaked_slime_drains_its_school() {
        let mut world = pond_world();
        let school = world.create_school().unwrap();
        let mut ids = Vec::new();
        for (n, (x, member)) in [(10, true), (40, true), (70, false)].into_iter().enumerate() {
            let slime = world
                .create_slime(n as u64, x, 10, sprites(2), member.then_some(school))
                .unwrap();
            ids.push(world.add_entity(slime).unwrap());
        }
        // One soak period of 0.4 s
        for _ in 0..5 {
            world.advance_world_time(0.1).unwrap();
        }
        let hp: Vec<i32> = ids
            .iter()
            .map(|id| world.entity(*id).unwrap().hit_points())
            .collect();
        // Own soak plus one point for the mate's soak; the loner only soaks
        assert_eq!(hp, vec![95, 95, 96]);
    }

    #[test]
    fn test_player_leaving_world_ends_game() {
        let mut world = World::new(10, 10, 10, IVec2::new(9, 9), 50, 50, &[]).unwrap();
        world
            .add_entity(Entity::player(0, 0, sprites(10)).unwrap())
            .unwrap();
        world.start_game().unwrap();
        for _ in 0..5 {
            world.advance_world_time(0.2).unwrap();
        }
        assert!(world.player().is_none());
        assert!(world.is_game_over());
        assert!(!world.did_player_win());
    }

    #[test]
    fn test_terminated_world_rejects_ticks() {
        let mut world = floor_world(IVec2::new(9, 9));
        let detached = world.terminate();
        assert!(detached.is_empty());
        assert!(matches!(
            world.advance_world_time(0.1),
            Err(SimError::Terminated(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_hit_points_stay_in_range(steps in 1usize..40, dt in 0.001f64..0.2) {
            let mut features = vec![0; 100];
            features[..10].fill(3);
            let mut world = World::new(10, 10, 10, IVec2::new(9, 9), 50, 50, &features).unwrap();
            let id = world
                .add_entity(Entity::player(20, 10, sprites(10)).unwrap())
                .unwrap();
            for _ in 0..steps {
                world.advance_world_time(dt).unwrap();
                if let Some(player) = world.entity(id) {
                    prop_assert!((0..=player.max_hit_points()).contains(&player.hit_points()));
                    prop_assert_eq!(player.is_dead(), player.hit_points() == 0);
                }
            }
        }

        #[test]
        fn prop_split_steps_agree_for_plants(split in 1usize..8) {
            // One 0.2 s tick versus the same time in equal slices
            let mut whole = floor_world(IVec2::new(9, 9));
            let a = whole.add_entity(Entity::skullcab(50, 30, sprites(2)).unwrap()).unwrap();
            whole.advance_world_time(0.2).unwrap();

            let mut sliced = floor_world(IVec2::new(9, 9));
            let b = sliced.add_entity(Entity::skullcab(50, 30, sprites(2)).unwrap()).unwrap();
            for _ in 0..split {
                sliced.advance_world_time(0.2 / split as f64).unwrap();
            }
            let pa = whole.entity(a).unwrap().pixel_position();
            let pb = sliced.entity(b).unwrap().pixel_position();
            prop_assert!((pa.y - pb.y).abs() <= 1);
            prop_assert_eq!(pa.x, pb.x);
        }
    }
}
