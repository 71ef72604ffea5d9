//! Full legal move generation pipeline.
//!
//! Pseudo-legal moves come from the per-piece generators. Each candidate is
//! then made on a scratch state and kept only if the mover's king is not
//! attacked afterwards.

use crate::game_state::chess_rules::FIFTY_MOVE_HALFMOVES;
use crate::game_state::{chess_types::*, game_state::GameState, game_state::GameStateError};
use crate::move_generation::legal_move_apply::{apply_move, make_move, unmake_move};
use crate::move_generation::legal_move_checks::{king_in_check, king_square};
use crate::move_generation::legal_moves_king::generate_king_moves;
use crate::move_generation::legal_moves_pawn::generate_pawn_moves;
use crate::move_generation::legal_moves_pieces::generate_piece_moves;
use crate::move_generation::move_generator::{GeneratedMove, MoveGenResult, MoveGenerator};

/// Outcome of a position as far as the rules are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Ongoing,
    Checkmate { winner: Color },
    Stalemate,
    FiftyMoveRule,
    Repetition,
}

impl GameStatus {
    pub fn is_over(self) -> bool {
        self != GameStatus::Ongoing
    }
}

pub struct LegalMoveGenerator;

impl MoveGenerator for LegalMoveGenerator {
    fn generate_legal_moves(&self, game_state: &GameState) -> MoveGenResult<Vec<GeneratedMove>> {
        legal_moves(game_state)?
            .into_iter()
            .map(|mv| {
                Ok(GeneratedMove {
                    move_description: mv,
                    game_after_move: apply_move(game_state, mv)?,
                })
            })
            .collect()
    }
}

pub fn generate_pseudo_legal_moves(game_state: &GameState, out: &mut Vec<u64>) {
    generate_pawn_moves(game_state, out);
    generate_piece_moves(game_state, out);
    generate_king_moves(game_state, out);
}

/// Legal moves of the side to move.
pub fn legal_moves(game_state: &GameState) -> MoveGenResult<Vec<u64>> {
    let mut scratch = game_state.clone();
    legal_moves_in_place(&mut scratch)
}

/// Legal moves, filtered by make/unmake on `game_state` itself. The state is
/// restored before returning, including on error.
pub fn legal_moves_in_place(game_state: &mut GameState) -> MoveGenResult<Vec<u64>> {
    let mut pseudo = Vec::with_capacity(64);
    generate_pseudo_legal_moves(game_state, &mut pseudo);

    let mover = game_state.side_to_move;
    king_square(game_state, mover).ok_or(GameStateError::KingCount(mover, 0))?;
    let mut legal = Vec::with_capacity(pseudo.len());
    for mv in pseudo {
        let undo = make_move(game_state, mv)?;
        let leaves_king_attacked = king_in_check(game_state, mover);
        unmake_move(game_state, &undo);
        if !leaves_king_attacked? {
            legal.push(mv);
        }
    }
    Ok(legal)
}

/// Checkmate, stalemate and rule draws, in that order of precedence.
pub fn game_status(game_state: &GameState) -> MoveGenResult<GameStatus> {
    if legal_moves(game_state)?.is_empty() {
        if king_in_check(game_state, game_state.side_to_move)? {
            return Ok(GameStatus::Checkmate {
                winner: game_state.side_to_move.opposite(),
            });
        }
        return Ok(GameStatus::Stalemate);
    }
    if game_state.halfmove_clock >= FIFTY_MOVE_HALFMOVES {
        return Ok(GameStatus::FiftyMoveRule);
    }
    if game_state.is_rule_draw() {
        return Ok(GameStatus::Repetition);
    }
    Ok(GameStatus::Ongoing)
}

#[cfg(test)]
mod tests {
    use super::{game_status, legal_moves, GameStatus, LegalMoveGenerator};
    use crate::game_state::chess_types::Color;
    use crate::game_state::game_state::{GameState, GameStateError};
    use crate::move_generation::legal_move_apply::apply_move;
    use crate::move_generation::move_generator::{MoveGenerationError, MoveGenerator};
    use crate::utils::long_algebraic::long_algebraic_to_move_description;

    #[test]
    fn start_position_has_twenty_moves() {
        let game = GameState::new_game();
        assert_eq!(legal_moves(&game).expect("generation should succeed").len(), 20);
        let generated = LegalMoveGenerator
            .generate_legal_moves(&game)
            .expect("generation should succeed");
        assert_eq!(generated.len(), 20);
        assert!(generated.iter().all(|g| g.game_after_move.side_to_move == Color::Dark));
    }

    #[test]
    fn missing_king_of_the_mover_is_an_error() {
        let mut game = GameState::new_game();
        game.remove_piece(4);
        assert_eq!(
            legal_moves(&game),
            Err(MoveGenerationError::InvalidState(GameStateError::KingCount(Color::Light, 0)))
        );
        assert!(game_status(&game).is_err());
    }

    #[test]
    fn pinned_piece_cannot_leave_the_line() {
        // The e2 knight is pinned by the e8 rook.
        let game = GameState::from_fen("4r1k1/8/8/8/8/8/4N3/4K3 w - - 0 1").expect("FEN should parse");
        let moves = legal_moves(&game).expect("generation should succeed");
        assert_eq!(moves.len(), 4);
    }

    #[test]
    fn detects_checkmate_and_stalemate() {
        let mate = GameState::from_fen("6k1/6Q1/6K1/8/8/8/8/8 b - - 0 1").expect("FEN should parse");
        assert_eq!(
            game_status(&mate).expect("status should compute"),
            GameStatus::Checkmate { winner: Color::Light }
        );

        let stale = GameState::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").expect("FEN should parse");
        assert_eq!(game_status(&stale).expect("status should compute"), GameStatus::Stalemate);
    }

    #[test]
    fn knight_shuffle_reaches_threefold_repetition() {
        let mut game = GameState::new_game();
        for text in ["g1f3", "g8f6", "f3g1", "f6g8", "g1f3", "g8f6", "f3g1", "f6g8"] {
            assert!(!game_status(&game).expect("status should compute").is_over());
            let mv = long_algebraic_to_move_description(text, &game).expect("move should parse");
            game = apply_move(&game, mv).expect("move should apply");
        }
        assert_eq!(game_status(&game).expect("status should compute"), GameStatus::Repetition);
    }

    #[test]
    fn fifty_move_rule_is_reported() {
        let game = GameState::from_fen("4k3/8/8/8/8/8/8/4K2R w - - 100 80").expect("FEN should parse");
        assert_eq!(game_status(&game).expect("status should compute"), GameStatus::FiftyMoveRule);
    }
}
