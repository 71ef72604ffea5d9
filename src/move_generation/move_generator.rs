use thiserror::Error;

use crate::game_state::chess_types::Square;
use crate::game_state::game_state::{GameState, GameStateError};

pub type MoveGenResult<T> = Result<T, MoveGenerationError>;

/// Reasons `make_move` refuses a move. Generated moves never hit these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveApplyError {
    #[error("no piece on from-square {0}")]
    EmptyOrigin(Square),
    #[error("piece on square {0} does not belong to the side to move")]
    WrongSideToMove(Square),
    #[error("move would capture own piece on square {0}")]
    CaptureOwnPiece(Square),
    #[error("en-passant victim missing from square {0}")]
    MissingEnPassantVictim(Square),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveGenerationError {
    #[error("invalid game state: {0}")]
    InvalidState(#[from] GameStateError),
    #[error("generated move failed to apply: {0}")]
    Apply(#[from] MoveApplyError),
}

/// A legal move together with the position it leads to.
#[derive(Debug, Clone)]
pub struct GeneratedMove {
    pub move_description: u64,
    pub game_after_move: GameState,
}

pub trait MoveGenerator: Send + Sync {
    fn generate_legal_moves(&self, game_state: &GameState) -> MoveGenResult<Vec<GeneratedMove>>;
}
