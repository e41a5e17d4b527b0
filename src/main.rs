//! The CLI surface: one executable entry point, no flags, a fixed save
//! file path. Reads decoded player intent one line at a time from stdin
//! and drives [`deepdelve::App`]; a real ASCII renderer and real-time key
//! decoding are external collaborators out of scope here — this loop
//! stands in for both with the smallest thing that can still drive the
//! engine from a terminal: one command per line.

use std::io::{self, BufRead, Write};

use deepdelve::app::App;
use deepdelve::state::PlayerCommand;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut app = App::load_or_new();
    print_messages(&app);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let cmd = decode_command(&line);

        if app.should_quit(cmd) {
            break;
        }

        app.tick(cmd);
        print_messages(&app);
    }

    if let Err(error) = app.save() {
        tracing::error!(%error, "failed to save game on exit");
    }
}

/// Translates one line of stdin into a [`PlayerCommand`], decoded to the
/// coarsest possible grain since there is no real key-event stream behind
/// this binary. Vi-style movement keys avoid colliding with the menu/verb
/// letters by reserving a fixed key set for movement.
fn decode_command(line: &str) -> Option<PlayerCommand> {
    let line = line.trim();
    match line {
        "" => return Some(PlayerCommand::Confirm),
        "esc" => return Some(PlayerCommand::Escape),
        "new" => return Some(PlayerCommand::NewGame),
        "resume" => return Some(PlayerCommand::ResumeGame),
        "quit" => return Some(PlayerCommand::Quit),
        "up" => return Some(PlayerCommand::CursorUp),
        "down" => return Some(PlayerCommand::CursorDown),
        _ => {}
    }

    let mut chars = line.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        return None;
    };

    match c {
        'h' => Some(PlayerCommand::Direction(-1, 0)),
        'l' => Some(PlayerCommand::Direction(1, 0)),
        'k' => Some(PlayerCommand::Direction(0, -1)),
        'j' => Some(PlayerCommand::Direction(0, 1)),
        'y' => Some(PlayerCommand::Direction(-1, -1)),
        'u' => Some(PlayerCommand::Direction(1, -1)),
        'b' => Some(PlayerCommand::Direction(-1, 1)),
        'n' => Some(PlayerCommand::Direction(1, 1)),
        'g' => Some(PlayerCommand::Pickup),
        'i' => Some(PlayerCommand::UseMenu),
        'd' => Some(PlayerCommand::DropMenu),
        '>' => Some(PlayerCommand::TakeStairsDown),
        '<' => Some(PlayerCommand::TakeStairsUp),
        'c' => Some(PlayerCommand::OpenCharacterScreen),
        'v' => Some(PlayerCommand::OpenMessageHistory),
        '/' => Some(PlayerCommand::Look),
        other if other.is_ascii_lowercase() => Some(PlayerCommand::Select(other)),
        _ => None,
    }
}

/// Prints any message-log lines since last flush. Stands in for a real
/// renderer's draw pass; a real frontend would render the console grid
/// instead, but the text log is player-facing content the engine already
/// owns, so echoing it is a faithful minimal surface.
fn print_messages(app: &App) {
    let mut out = io::stdout();
    if let Some(last) = app.world.messages.last() {
        let _ = writeln!(out, "{}", last.full_text());
    }
    let _ = out.flush();
}
