//! Minimal terminal driver for a pinion session. Reads square names
//! from stdin, prints the board from the exposed occupancy map, and
//! lets the scheduler play the computer side.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use pinion_core::geometry::{parse_square, square_at, square_name};
use pinion_core::piece::{Role, Side};
use pinion_session::{
    schedule_computed_move, PlayerKind, Session, SessionConfig, Submission,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = SessionConfig::load_or_default(Path::new("session.toml"));
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("single-threaded runtime");
    runtime.block_on(run(config));
}

async fn run(config: SessionConfig) {
    let mut session = Session::new(config.white, config.black);
    let delay = Duration::from_millis(config.think_delay_ms);
    println!("pinion | white: {:?}, black: {:?}", config.white, config.black);
    print_board(&session);

    loop {
        if session.game_over() {
            let result = session.state().last_move().unwrap_or("?").to_string();
            println!("game over: {result}");
            break;
        }

        match session.current_player() {
            PlayerKind::Computer => {
                let side = session.state().side_to_move();
                println!("{side:?} is thinking...");
                let pending = schedule_computed_move(session.state(), delay);
                match pending.outcome().await {
                    Some(mv) => {
                        session.apply_generated(&mv);
                    }
                    None => {
                        // no move to make: signal the draw on the
                        // opposing king, as the submission protocol asks
                        let opp_king = session.state().king_square(side.other());
                        session.submit_square(opp_king);
                    }
                }
                print_board(&session);
                print_last_move(&session);
            }
            PlayerKind::Human => {
                if !human_turn(&mut session) {
                    break;
                }
            }
        }
    }
}

/// One human interaction; false ends the program.
fn human_turn(session: &mut Session) -> bool {
    print!("> ");
    let _ = io::stdout().flush();
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).unwrap_or(0) == 0 {
        return false;
    }
    match line.trim() {
        "quit" => return false,
        "new" => {
            session.new_game();
            print_board(session);
            return true;
        }
        "pause" => {
            session.toggle_pause();
            println!("paused: {}", session.paused());
            return true;
        }
        text => match parse_square(text) {
            Some(square) => match session.submit_square(square) {
                Submission::Selected(view) => {
                    let names: Vec<String> =
                        view.legals.iter().map(|&s| square_name(s)).collect();
                    println!("selected {}, legal: {}", square_name(square), names.join(" "));
                }
                Submission::Applied { notation } => {
                    print_board(session);
                    println!("played {notation}");
                }
                Submission::PromotionPending { .. } => {
                    let role = prompt_promotion();
                    if let Submission::Applied { notation } = session.submit_promotion(role) {
                        print_board(session);
                        println!("played {notation}");
                    }
                }
                Submission::DrawClaimed => println!("draw claimed"),
                Submission::Cleared => println!("selection cleared"),
                Submission::Rejected => println!("not a usable square"),
                Submission::GameOver => {}
            },
            None => println!("squares look like e2; commands: new, pause, quit"),
        },
    }
    true
}

fn prompt_promotion() -> Role {
    loop {
        print!("promote to [Q/R/B/N]: ");
        let _ = io::stdout().flush();
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line).unwrap_or(0) == 0 {
            return Role::Queen;
        }
        match line.trim().to_ascii_uppercase().as_str() {
            "Q" | "" => return Role::Queen,
            "R" => return Role::Rook,
            "B" => return Role::Bishop,
            "N" => return Role::Knight,
            _ => {}
        }
    }
}

fn print_board(session: &Session) {
    let state = session.state();
    for rank in (0..8).rev() {
        print!("{} ", rank + 1);
        for file in 0..8 {
            let square = square_at(file, rank).expect("on-board coordinates");
            let glyph = match state.piece_at(square) {
                Some(piece) => {
                    let letter = piece.role.letter();
                    if piece.side == Side::White {
                        letter
                    } else {
                        letter.to_ascii_lowercase()
                    }
                }
                None => '.',
            };
            print!("{glyph} ");
        }
        println!();
    }
    println!("  a b c d e f g h");
}

fn print_last_move(session: &Session) {
    if let Some(last) = session.state().last_move() {
        println!("played {last}");
    }
}
