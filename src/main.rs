//! Console game: a human plays the engine in the terminal.
//!
//! Commands at the move prompt:
//! - a move in coordinate form (`e2e4`, `e7e8q`)
//! - `moves`: list legal moves
//! - `fen`: print the current position
//! - `undo`: take back the last full move
//! - `quit`

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, ValueEnum};

use quince_chess::config::EngineConfig;
use quince_chess::engines::engine_trait::{Engine, GoParams};
use quince_chess::engines::search_engine::SearchEngine;
use quince_chess::game_state::{chess_types::*, game_state::GameState, undo_state::UndoState};
use quince_chess::move_generation::legal_move_apply::{make_move, unmake_move};
use quince_chess::move_generation::legal_move_generator::{game_status, legal_moves, GameStatus};
use quince_chess::utils::long_algebraic::{
    move_description_to_long_algebraic, parse_move_text, resolve_move_text, MoveTextError,
};
use quince_chess::utils::render_game_state::render_with_status;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Side {
    White,
    Black,
}

impl Side {
    fn color(self) -> Color {
        match self {
            Side::White => Color::Light,
            Side::Black => Color::Dark,
        }
    }
}

/// Play chess against the quince engine.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML engine configuration; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Colour played by the human.
    #[arg(long, value_enum, default_value_t = Side::White)]
    play_as: Side,
    /// Start position instead of the standard one.
    #[arg(long)]
    fen: Option<String>,
    #[arg(long, short)]
    depth: Option<u8>,
    /// Per-move time budget in milliseconds.
    #[arg(long)]
    movetime: Option<u64>,
    #[arg(long, short)]
    threads: Option<usize>,
    #[arg(long)]
    hash_mb: Option<usize>,
    /// Opening book (`.tsv` lines or `.csv` hash table).
    #[arg(long)]
    book: Option<PathBuf>,
    /// Disable every opening book, including the built-in one.
    #[arg(long)]
    no_book: bool,
    /// Endgame table TSV (`fen  best_move  distance`).
    #[arg(long)]
    endgame_table: Option<PathBuf>,
    /// Default log filter; RUST_LOG takes precedence.
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Cli {
    fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_path(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => EngineConfig::default(),
        };
        if let Some(depth) = self.depth {
            config.depth = depth;
        }
        if self.movetime.is_some() {
            config.movetime_ms = self.movetime;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(hash_mb) = self.hash_mb {
            config.hash_mb = hash_mb;
        }
        if self.book.is_some() {
            config.opening_book = self.book.clone();
        }
        if self.no_book {
            config.opening_book = None;
            config.embedded_book = false;
        }
        if self.endgame_table.is_some() {
            config.endgame_table = self.endgame_table.clone();
        }
        config.validate().context("invalid engine settings")?;
        Ok(config)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Quit,
    Undo,
    ListMoves,
    PrintFen,
    Move(&'a str),
    Empty,
}

fn parse_command(line: &str) -> Command<'_> {
    let line = line.trim();
    match line.to_ascii_lowercase().as_str() {
        "" => Command::Empty,
        "quit" | "exit" => Command::Quit,
        "undo" => Command::Undo,
        "moves" => Command::ListMoves,
        "fen" => Command::PrintFen,
        _ => Command::Move(line),
    }
}

fn describe_status(status: GameStatus) -> &'static str {
    match status {
        GameStatus::Checkmate { winner: Color::Light } => "checkmate, white wins",
        GameStatus::Checkmate { winner: Color::Dark } => "checkmate, black wins",
        GameStatus::Stalemate => "stalemate, draw",
        GameStatus::FiftyMoveRule => "fifty-move rule, draw",
        GameStatus::Repetition => "threefold repetition, draw",
        GameStatus::Ongoing => "game in progress",
    }
}

struct Session {
    state: GameState,
    /// Undo records, one per ply, newest last.
    history: Vec<UndoState>,
    human: Color,
}

impl Session {
    fn play(&mut self, mv: u64) -> Result<()> {
        let undo = make_move(&mut self.state, mv).context("applying move")?;
        self.history.push(undo);
        Ok(())
    }

    /// Take back plies until it is the human's turn again, at least one.
    fn undo_full_move(&mut self) -> bool {
        let Some(undo) = self.history.pop() else {
            return false;
        };
        unmake_move(&mut self.state, &undo);
        if self.state.side_to_move != self.human {
            if let Some(undo) = self.history.pop() {
                unmake_move(&mut self.state, &undo);
            }
        }
        true
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level.as_str())).init();

    let config = cli.engine_config()?;
    let mut engine = SearchEngine::from_config(&config).context("starting engine")?;
    let state = match &cli.fen {
        Some(fen) => GameState::from_fen(fen).with_context(|| format!("parsing start position {fen:?}"))?,
        None => GameState::new_game(),
    };
    let mut session = Session {
        state,
        history: Vec::new(),
        human: cli.play_as.color(),
    };

    let session_start = Local::now();
    println!("quince chess, session started {}", session_start.format("%Y-%m-%d %H:%M:%S"));
    println!("enter moves like e2e4; commands: moves, fen, undo, quit");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let params = GoParams::default();

    loop {
        println!("\n{}", render_with_status(&session.state));
        let status = game_status(&session.state).context("checking game status")?;
        if status.is_over() {
            println!("{}", describe_status(status));
            break;
        }

        if session.state.side_to_move != session.human {
            let started = Local::now();
            let output = engine
                .choose_move(&session.state, &params)
                .context("engine failed to choose a move")?;
            let Some(mv) = output.best_move else {
                println!("engine has no move");
                break;
            };
            let took = Local::now() - started;
            println!(
                "[{}] engine plays {} ({:?}, {}.{:03}s)",
                started.format("%H:%M:%S"),
                move_description_to_long_algebraic(mv),
                output.source,
                took.num_seconds(),
                took.num_milliseconds() % 1000,
            );
            for line in &output.info_lines {
                log::debug!("{line}");
            }
            session.play(mv)?;
            continue;
        }

        print!("your move> ");
        io::stdout().flush().context("flushing stdout")?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("reading stdin")?;

        match parse_command(&line) {
            Command::Empty => {}
            Command::Quit => break,
            Command::PrintFen => println!("{}", session.state.get_fen()),
            Command::ListMoves => {
                let legal = legal_moves(&session.state).context("generating moves")?;
                let texts: Vec<String> = legal.iter().map(|&mv| move_description_to_long_algebraic(mv)).collect();
                println!("{}", texts.join(" "));
            }
            Command::Undo => {
                if !session.undo_full_move() {
                    println!("nothing to undo");
                }
            }
            Command::Move(text) => {
                let legal = legal_moves(&session.state).context("generating moves")?;
                let chosen = parse_move_text(text).and_then(|parsed| resolve_move_text(text, parsed, &legal));
                match chosen {
                    Ok(mv) => {
                        log::info!("[{}] human plays {text}", Local::now().format("%H:%M:%S"));
                        session.play(mv)?;
                    }
                    Err(MoveTextError::Malformed(_)) => {
                        println!("could not read {text:?}; use from and to squares, e.g. e2e4 or e7e8q")
                    }
                    Err(MoveTextError::Illegal(_)) => println!("{text} is not legal here; type 'moves' for a list"),
                    Err(err @ MoveTextError::Ambiguous { .. }) => println!("{err}"),
                    Err(err) => return Err(err).context("resolving move"),
                }
            }
        }
    }

    println!("final position: {}", session.state.get_fen());
    let elapsed = Local::now() - session_start;
    println!("session lasted {}m{:02}s", elapsed.num_minutes(), elapsed.num_seconds() % 60);
    Ok(())
}
