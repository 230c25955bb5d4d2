//! Jumping Alien headless runner
//!
//! Loads a level (or the built-in demo), drives the player with a simple
//! script and reports how the run ended.

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;

use jumping_alien::LevelConfig;
use jumping_alien::consts::MAX_WORLD_DT;
use jumping_alien::sim::{Direction, PlayerAction, World};

#[derive(Parser, Debug)]
#[command(name = "jumping-alien", version, about = "Run a Jumping Alien level headless")]
struct Args {
    /// Level file (JSON); the built-in demo level when omitted
    #[arg(short, long)]
    level: Option<PathBuf>,

    /// Simulated seconds to run
    #[arg(short, long, default_value_t = 20.0)]
    seconds: f64,

    /// Time step per tick (at most 0.2)
    #[arg(long, default_value_t = 0.05)]
    dt: f64,

    /// Seconds between scripted jumps
    #[arg(long, default_value_t = 1.5)]
    jump_every: f64,

    /// Print the level as JSON and exit
    #[arg(long)]
    dump_level: bool,
}

/// Walk right and hop at a fixed rhythm
struct Script {
    jump_every: f64,
    since_jump: f64,
    airborne: f64,
}

impl Script {
    fn new(jump_every: f64) -> Self {
        Self {
            jump_every,
            since_jump: 0.0,
            airborne: 0.0,
        }
    }

    fn start(&self, world: &mut World) {
        if let Some(player) = world.player_id() {
            if let Err(err) = world.perform(player, PlayerAction::StartMove(Direction::Right)) {
                log::warn!("could not start moving: {err}");
            }
        }
    }

    fn step(&mut self, world: &mut World, dt: f64) {
        let Some(player) = world.player_id() else {
            return;
        };
        self.since_jump += dt;
        let mut actions = Vec::new();
        if self.airborne > 0.0 {
            self.airborne -= dt;
            if self.airborne <= 0.0 {
                actions.push(PlayerAction::EndJump);
            }
        } else if self.since_jump >= self.jump_every {
            self.since_jump = 0.0;
            self.airborne = 0.4;
            actions.push(PlayerAction::StartJump);
        }
        // A blocked player stops; get going again
        if world.player().is_some_and(|p| !p.is_moving()) {
            actions.push(PlayerAction::StartMove(Direction::Right));
        }
        for action in actions {
            if let Err(err) = world.perform(player, action) {
                log::debug!("{} refused: {err}", action.name());
            }
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let level = match &args.level {
        Some(path) => LevelConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => LevelConfig::demo(),
    };
    if args.dump_level {
        println!("{}", level.to_json()?);
        return Ok(());
    }
    if !(args.dt > 0.0 && args.dt <= MAX_WORLD_DT) {
        return Err(format!("--dt must be in (0, {MAX_WORLD_DT}], got {}", args.dt).into());
    }

    let mut world = level.build()?;
    world.start_game()?;
    log::info!("Jumping Alien running ({} s at dt {})", args.seconds, args.dt);

    let mut script = Script::new(args.jump_every);
    script.start(&mut world);
    let ticks = (args.seconds / args.dt).ceil() as u64;
    for _ in 0..ticks {
        script.step(&mut world, args.dt);
        world.advance_world_time(args.dt)?;
        if world.is_game_over() {
            break;
        }
    }

    let retired = world.drain_retired().len();
    let window = world.visible_window_position();
    let player = world.player().map(|p| {
        serde_json::json!({
            "pixel": [p.pixel_position().x, p.pixel_position().y],
            "hit_points": p.hit_points(),
            "sprite": p.current_sprite_index(),
        })
    });
    let summary = serde_json::json!({
        "elapsed": world.elapsed(),
        "won": world.did_player_win(),
        "game_over": world.is_game_over(),
        "player": player,
        "entities": world.entity_count(),
        "retired": retired,
        "window": [window.x, window.y],
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
