//! Numfuse entry point
//!
//! Headless demo driver: runs a seeded session with a naive auto-player and
//! prints the run summary. A real shell would render the state and feed
//! player taps instead.

use std::time::{SystemTime, UNIX_EPOCH};

use numfuse::consts::*;
use numfuse::services::{FileStore, LogAnalytics, MemoryLeaderboard};
use numfuse::session::{Screen, Session};
use numfuse::settings::Settings;
use numfuse::sim::{CellValue, Effect, GameState, Input, Position, evaluate, grid::OPERATORS};

fn main() {
    env_logger::init();

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(1)
        });
    log::info!("numfuse demo starting, seed={seed}");

    let settings = Settings {
        tutorial: false,
        ..Default::default()
    };
    let store = FileStore::new(std::env::temp_dir().join("numfuse").join("run.json"));
    let mut session = Session::new(settings, MemoryLeaderboard::new(), LogAnalytics, store);
    session.start_game(seed);

    // Enough ticks for a few minutes of simulated play
    let max_ticks = 10 * 60 * 10;
    for _ in 0..max_ticks {
        if session.screen() != Screen::InGame {
            break;
        }
        let done = session
            .game()
            .map(|g| g.is_game_over())
            .unwrap_or(true);
        if done {
            break;
        }

        if let Some(plan) = session.game().and_then(plan_move) {
            for input in plan {
                for effect in session.handle_input(input) {
                    report(&effect);
                }
            }
        }
        for effect in session.tick(TICK_DT) {
            report(&effect);
        }
    }

    if let Some(game) = session.game() {
        println!("final score:     {}", game.score);
        println!("targets cleared: {}", game.targets_cleared);
        println!("highest combo:   {}", game.highest_combo);
        println!("highest tier:    {}", game.highest_tier);
        if let Some(reason) = game.game_over {
            println!("ended:           {}", reason.as_str());
        }
    }
    if let Some(best) = session.personal_best() {
        println!("personal best:   {best}");
    }
}

/// The tap sequence for the best available synthesis: an exact target hit
/// when one exists, otherwise any legal merge to make progress.
fn plan_move(state: &GameState) -> Option<Vec<Input>> {
    if state.is_game_over() || state.is_synthesizing() || state.selected_num.is_some() {
        return None;
    }
    // Acknowledge an open reward modal before anything else
    match state.gacha.phase {
        numfuse::sim::GachaPhase::Open => return Some(vec![Input::GachaDraw]),
        numfuse::sim::GachaPhase::ResultShown => return Some(vec![Input::GachaClaim]),
        _ => {}
    }

    let cells = numeric_positions(state);
    let target = state.current_target.value;

    let mut fallback = None;
    for &(first_pos, a) in &cells {
        for &(second_pos, b) in &cells {
            if first_pos == second_pos {
                continue;
            }
            for (op_row, op) in OPERATORS.iter().enumerate() {
                let Ok(result) = evaluate(*op, a, b) else {
                    continue;
                };
                let taps = vec![
                    tap_for(first_pos),
                    Input::TapCell { col: 1, row: op_row },
                    tap_for(second_pos),
                ];
                if result == target {
                    return Some(taps);
                }
                if fallback.is_none() {
                    fallback = Some(taps);
                }
            }
        }
    }
    fallback
}

fn numeric_positions(state: &GameState) -> Vec<(Position, i64)> {
    let mut out = Vec::new();
    for (col, cells) in state.grid.cols.iter().enumerate() {
        for (row, cell) in cells.iter().enumerate() {
            if let CellValue::Number(n) = cell.value {
                out.push((Position::Grid { col, row }, n));
            }
        }
    }
    out
}

fn tap_for(pos: Position) -> Input {
    match pos {
        Position::Grid { col, row } => Input::TapCell {
            col: if col == 0 { 0 } else { 2 },
            row,
        },
        Position::Storage { index } => Input::TapStorage { index },
    }
}

fn report(effect: &Effect) {
    match effect {
        Effect::ScorePopup(points) => log::info!("+{points}"),
        Effect::DifficultyBanner(level) => log::info!("difficulty level {level}"),
        Effect::GachaOpened => log::info!("reward modal opened"),
        Effect::GachaResolved(result) => log::info!("reward: {result:?}"),
        Effect::GameOver(reason) => log::info!("game over: {}", reason.as_str()),
        Effect::Rejected(reason) => log::debug!("rejected: {}", reason.message()),
        _ => {}
    }
}
