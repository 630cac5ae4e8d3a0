use std::env;
use std::io::{self, BufRead, Write};
use std::process;

use chess_arbiter_core::game::SessionEvent;
use chess_arbiter_core::{
    pgn, storage, Board, Color, Error, Game, GameSession, GameSettings, GameState, Player,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    println!("Chess Arbiter");
    println!("==================");
    println!();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        process::exit(1);
    }

    match args[1].as_str() {
        "play" => {
            let chess960 = args.iter().any(|a| a == "--960");
            play(chess960).await;
        }
        "fen" => {
            if args.len() < 3 {
                println!("Error: Please provide a FEN string");
                println!("Usage: {} fen \"<fen>\"", args[0]);
                process::exit(1);
            }
            show_fen(&args[2]);
        }
        "pgn" => {
            if args.len() < 3 {
                println!("Error: Please provide a PGN file");
                println!("Usage: {} pgn <pgn_file>", args[0]);
                process::exit(1);
            }
            show_pgn(&args[2]);
        }
        "resume" => {
            if args.len() < 3 {
                println!("Error: Please provide a saved game file");
                println!("Usage: {} resume <save_file>", args[0]);
                process::exit(1);
            }
            resume(&args[2]);
        }
        _ => {
            print_usage(&args[0]);
            process::exit(1);
        }
    }
}

fn print_usage(program: &str) {
    println!("Usage: {} <command> [arguments]", program);
    println!();
    println!("Commands:");
    println!("  play [--960]         Play a local two-player game");
    println!("  fen \"<fen>\"          Validate and display a position");
    println!("  pgn <pgn_file>       Replay and summarize a PGN file");
    println!("  resume <save_file>   Inspect a saved game");
    println!();
    println!("Examples:");
    println!("  {} play --960", program);
    println!("  {} fen \"rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1\"", program);
    println!("  {} pgn games.pgn", program);
}

async fn play(chess960: bool) {
    let settings = GameSettings {
        chess960,
        ..GameSettings::default()
    };
    let (session, mut events) = match GameSession::new(
        settings,
        Player::human("White"),
        Player::human("Black"),
    ) {
        Ok(pair) => pair,
        Err(e) => {
            println!("[ERROR] Could not set up the game: {}", e);
            return;
        }
    };

    if let Err(e) = session.start().await {
        println!("[ERROR] Could not start the game: {}", e);
        return;
    }

    println!("Enter moves in coordinate form (e2e4, e7e8q, O-O).");
    println!("Commands: undo, fen, quit");
    println!();

    let stdin = io::stdin();
    loop {
        drain_events(&mut events);

        let fen = session.fen();
        print_board(&fen);
        println!(
            "   {:?} to move | {} plies played",
            session.turn(),
            session.records().len()
        );
        print!("> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let input = line.trim();

        match input {
            "quit" => break,
            "fen" => {
                println!("{}", session.fen());
                continue;
            }
            "undo" => {
                if let Err(e) = session.undo_last_human_move().await {
                    println!("[ERROR] {}", e);
                }
                continue;
            }
            "" => continue,
            mv => match session.submit_move(mv).await {
                Ok(record) => println!("   played {}", record.san),
                Err(Error::InvalidMove { reason, .. }) => {
                    println!("[ERROR] Invalid move ({})", reason);
                }
                Err(e) => println!("[ERROR] {}", e),
            },
        }

        if session.state() == GameState::Ended {
            print_board(&session.fen());
            match session.outcome() {
                Some(outcome) => println!("Game over: {:?}", outcome),
                None => println!("Game over"),
            }
            break;
        }
    }

    session.stop().await;
}

fn drain_events(events: &mut tokio::sync::mpsc::UnboundedReceiver<SessionEvent>) {
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::GameEnded { outcome } = event {
            println!("   [event] game ended: {:?}", outcome);
        }
    }
}

fn print_board(fen: &str) {
    let field = fen.split_whitespace().next().unwrap_or("");
    match Board::from_board_fen(field) {
        Ok(board) => println!("{}", board),
        Err(e) => println!("[ERROR] Bad board field: {}", e),
    }
}

fn show_fen(fen: &str) {
    let settings = GameSettings {
        initial_fen: Some(fen.to_string()),
        ..GameSettings::default()
    };
    let mut game = match Game::new(settings) {
        Ok(g) => g,
        Err(e) => {
            println!("[ERROR] Invalid FEN: {}", e);
            process::exit(1);
        }
    };

    print_board(fen);
    println!();
    println!("   Turn: {:?}", game.turn());
    println!("   In check: {}", game.is_check(game.turn()));
    println!("   Checkmate: {}", game.is_checkmate(game.turn()));
    println!("   Stalemate: {}", game.is_stalemate(game.turn()));
    println!("   Drawable: {}", game.is_draw());
    println!("   Round-trip: {}", game.fen());
}

fn show_pgn(path: &str) {
    let game = match pgn::load_game_file(path) {
        Ok(g) => g,
        Err(e) => {
            println!("[ERROR] {}", e);
            process::exit(1);
        }
    };

    println!("[OK] Replayed {} plies", game.records().len());
    println!();
    for record in game.records() {
        let number = match record.color {
            Some(Color::White) => format!("{}. ", record.status.fullmove),
            _ => String::from("   ... "),
        };
        match &record.comment {
            Some(comment) => println!("   {}{} {{{}}}", number, record.san, comment),
            None => println!("   {}{}", number, record.san),
        }
    }
    println!();
    print_board(&game.fen());
    println!("   Final: {}", game.fen());
    if let Some(outcome) = game.outcome() {
        println!("   Result: {:?} ({})", outcome, outcome.result_token());
    }
}

fn resume(path: &str) {
    let game = match storage::load_file(path) {
        Ok(g) => g,
        Err(e) => {
            println!("[ERROR] {}", e);
            process::exit(1);
        }
    };

    println!("[OK] Loaded {} plies", game.records().len());
    print_board(&game.fen());
    println!("   Position: {}", game.fen());
    println!("   State: {:?}", game.state());
    if let Some(outcome) = game.outcome() {
        println!("   Result: {:?}", outcome);
    }
}
