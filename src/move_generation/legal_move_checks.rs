//! Attack queries against a board.

use crate::game_state::{chess_types::*, game_state::GameState, game_state::GameStateError};
use crate::moves::magic_tables::{bishop_attacks, rook_attacks};
use crate::moves::step_attacks::{king_attacks, knight_attacks, pawn_attacks};

#[inline]
pub fn king_square(game_state: &GameState, color: Color) -> Option<Square> {
    let kings = game_state.pieces_of(color, PieceKind::King);
    if kings == 0 {
        None
    } else {
        Some(kings.trailing_zeros() as Square)
    }
}

/// Hot-path check test for states already known to be valid. A missing king
/// reads as "not in check"; use [`king_in_check`] where that cannot be assumed.
#[inline]
pub fn is_king_in_check(game_state: &GameState, color: Color) -> bool {
    let Some(king_sq) = king_square(game_state, color) else {
        return false;
    };
    is_square_attacked(game_state, king_sq, color.opposite())
}

/// Like [`is_king_in_check`], but a board without a `color` king is an error.
#[inline]
pub fn king_in_check(game_state: &GameState, color: Color) -> Result<bool, GameStateError> {
    let king_sq = king_square(game_state, color).ok_or(GameStateError::KingCount(color, 0))?;
    Ok(is_square_attacked(game_state, king_sq, color.opposite()))
}

#[inline]
pub fn is_square_attacked(game_state: &GameState, square: Square, attacker_color: Color) -> bool {
    attackers_to(game_state, square, attacker_color, game_state.occupancy_all) != 0
}

/// Bitboard of `attacker_color` pieces attacking `square` given `occupancy`.
///
/// Works backwards from the target: a pawn of the attacking color attacks the
/// square exactly when a defending pawn on the square would attack it.
pub fn attackers_to(
    game_state: &GameState,
    square: Square,
    attacker_color: Color,
    occupancy: u64,
) -> u64 {
    let pieces = &game_state.pieces[attacker_color.index()];
    let diagonal = pieces[PieceKind::Bishop.index()] | pieces[PieceKind::Queen.index()];
    let straight = pieces[PieceKind::Rook.index()] | pieces[PieceKind::Queen.index()];

    (pawn_attacks(attacker_color.opposite(), square) & pieces[PieceKind::Pawn.index()])
        | (knight_attacks(square) & pieces[PieceKind::Knight.index()])
        | (king_attacks(square) & pieces[PieceKind::King.index()])
        | (bishop_attacks(square, occupancy) & diagonal)
        | (rook_attacks(square, occupancy) & straight)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_position_has_no_checks() {
        let game = GameState::new_game();
        assert!(!is_king_in_check(&game, Color::Light));
        assert!(!is_king_in_check(&game, Color::Dark));
        // f3 is covered by the e2/g2 pawns and the g1 knight.
        assert_eq!(attackers_to(&game, 21, Color::Light, game.occupancy_all).count_ones(), 3);
    }

    #[test]
    fn slider_check_through_open_file() {
        let game = GameState::from_fen("4k3/8/8/8/8/8/8/4RK2 b - - 0 1").expect("FEN should parse");
        assert!(is_king_in_check(&game, Color::Dark));
        let blocked =
            GameState::from_fen("4k3/4p3/8/8/8/8/8/4RK2 b - - 0 1").expect("FEN should parse");
        assert!(!is_king_in_check(&blocked, Color::Dark));
    }
}
