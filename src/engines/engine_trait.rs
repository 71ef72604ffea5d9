//! Engine abstraction used by the console loop and the benchmarks.
//!
//! An engine turns a position plus per-move limits into a chosen move and
//! reports where that move came from.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use thiserror::Error;

use crate::game_state::game_state::GameState;
use crate::move_generation::move_generator::MoveGenerationError;
use crate::search::iterative_deepening::SearchError;

/// Per-move limits. `None` falls back to the engine's configured value.
#[derive(Debug, Clone, Default)]
pub struct GoParams {
    pub depth: Option<u8>,
    pub movetime_ms: Option<u64>,
    pub max_nodes: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveSource {
    Book,
    Oracle,
    Search,
}

#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub best_move: Option<u64>,
    pub source: MoveSource,
    /// Side-to-move score when the move came from search.
    pub score: Option<i32>,
    pub depth: u8,
    pub nodes: u64,
    pub principal_variation: Vec<u64>,
    pub info_lines: Vec<String>,
}

impl EngineOutput {
    pub(crate) fn advisor(best_move: u64, source: MoveSource, info: String) -> Self {
        Self {
            best_move: Some(best_move),
            source,
            score: None,
            depth: 0,
            nodes: 0,
            principal_variation: vec![best_move],
            info_lines: vec![info],
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Generation(#[from] MoveGenerationError),
}

pub trait Engine: Send {
    fn new_game(&mut self) {}

    /// Flag polled by the search; setting it ends the current search early.
    fn set_stop_signal(&mut self, _stop_signal: Option<Arc<AtomicBool>>) {}

    fn choose_move(&mut self, game_state: &GameState, params: &GoParams) -> Result<EngineOutput, EngineError>;
}
