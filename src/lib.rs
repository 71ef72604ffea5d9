//! Crate root module declarations for the quince chess engine.
//!
//! Exposes the board model, move generation, search, opening and endgame
//! advisors, and text utilities so the binaries, benchmarks and external
//! tooling can import stable module paths.

pub mod config;

pub mod game_state {
    pub mod chess_rules;
    pub mod chess_types;
    pub mod game_state;
    pub mod undo_state;
}

pub mod moves {
    pub mod magic_tables;
    pub mod move_descriptions;
    pub mod slider_rays;
    pub mod step_attacks;
}

pub mod move_generation {
    pub mod legal_move_apply;
    pub mod legal_move_checks;
    pub mod legal_move_generator;
    pub mod legal_moves_king;
    pub mod legal_moves_pawn;
    pub mod legal_moves_pieces;
    pub mod move_generator;
    pub mod perft;
}

pub mod search {
    pub mod board_scoring;
    pub mod iterative_deepening;
    pub mod search_control;
    pub mod transposition_table;
    pub mod worker_pool;
    pub mod zobrist;
}

pub mod tables {
    pub mod endgame_oracle;
    pub mod opening_book;
}

pub mod engines {
    pub mod engine_trait;
    pub mod search_engine;
}

pub mod utils {
    pub mod algebraic;
    pub mod fen_generator;
    pub mod fen_parser;
    pub mod long_algebraic;
    pub mod render_game_state;
}
