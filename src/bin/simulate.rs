//! Headless simulation runner
//!
//! Drives the sim with a scripted player for a fixed number of ticks and
//! prints a JSON summary, for soak testing and determinism checks:
//!
//! ```text
//! cargo run --bin simulate -- --seed 7 --ticks 7200 --trace
//! ```
//!
//! Two runs with the same seed and tick count must print the same summary.

use std::error::Error;

use clap::Parser;
use serde::Serialize;

use tank_arena::consts::SIM_DT;
use tank_arena::sim::{GameEvent, GamePhase, GameState, TickInput, tick};

#[derive(Parser, Debug)]
#[command(name = "simulate", about = "Run the tank battle simulation headless")]
struct Args {
    /// RNG seed
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Maximum number of ticks to run
    #[arg(long, default_value_t = 3600)]
    ticks: u64,

    /// Player count (1 or 2)
    #[arg(long, default_value_t = 1)]
    players: usize,

    /// Print every event as a JSON line before the summary
    #[arg(long)]
    trace: bool,
}

#[derive(Serialize)]
struct Summary {
    seed: u64,
    ticks_run: u64,
    phase: GamePhase,
    level: usize,
    score: [u32; 2],
    tanks_destroyed: u32,
    bullets_fired: u32,
    bonuses_collected: u32,
}

/// Scripted stand-in for a human: patrol in a square, shoot on a cadence
fn scripted_input(t: u64) -> TickInput {
    let mut input = TickInput::default();
    input.start = t == 0;
    for keys in input.players.iter_mut() {
        match (t / 45) % 4 {
            0 => keys.up = true,
            1 => keys.right = true,
            2 => keys.down = true,
            _ => keys.left = true,
        }
        keys.fire = t % 50 == 0;
    }
    input
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut state = GameState::new(args.seed, args.players);
    let mut summary = Summary {
        seed: args.seed,
        ticks_run: 0,
        phase: state.phase,
        level: 0,
        score: [0; 2],
        tanks_destroyed: 0,
        bullets_fired: 0,
        bonuses_collected: 0,
    };

    for t in 0..args.ticks {
        tick(&mut state, &scripted_input(t), SIM_DT);
        summary.ticks_run = t + 1;
        for event in state.take_events() {
            match event {
                GameEvent::TankDestroyed { .. } => summary.tanks_destroyed += 1,
                GameEvent::BulletFired { .. } => summary.bullets_fired += 1,
                GameEvent::BonusCollected { .. } => summary.bonuses_collected += 1,
                _ => {}
            }
            if args.trace {
                println!("{}", serde_json::to_string(&event)?);
            }
        }
        if matches!(state.phase, GamePhase::GameOver | GamePhase::Victory) {
            break;
        }
    }

    summary.phase = state.phase;
    summary.level = state.level_index;
    summary.score = state.score;
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}
