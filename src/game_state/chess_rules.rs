//! Canonical chess-rule constants.

use crate::game_state::chess_types::*;

/// Standard chess starting position in Forsyth-Edwards Notation (FEN).
pub const STARTING_POSITION_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Halfmove clock value at which the fifty-move rule applies.
pub const FIFTY_MOVE_HALFMOVES: u16 = 100;

/// Occurrences of one position that make a repetition draw.
pub const REPETITION_DRAW_COUNT: usize = 3;

pub const LIGHT_KING_START: Square = 4;
pub const DARK_KING_START: Square = 60;

/// Geometry of one castling move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastleSpec {
    pub right: CastlingRights,
    pub king_from: Square,
    pub king_to: Square,
    pub rook_from: Square,
    pub rook_to: Square,
    /// Squares that must be empty between king and rook.
    pub empty_mask: u64,
    /// Squares the king crosses or lands on; none may be attacked.
    pub transit: [Square; 2],
}

pub const CASTLES: [CastleSpec; 4] = [
    CastleSpec {
        right: CASTLE_LIGHT_KINGSIDE,
        king_from: LIGHT_KING_START,
        king_to: 6,
        rook_from: 7,
        rook_to: 5,
        empty_mask: (1 << 5) | (1 << 6),
        transit: [5, 6],
    },
    CastleSpec {
        right: CASTLE_LIGHT_QUEENSIDE,
        king_from: LIGHT_KING_START,
        king_to: 2,
        rook_from: 0,
        rook_to: 3,
        empty_mask: (1 << 1) | (1 << 2) | (1 << 3),
        transit: [3, 2],
    },
    CastleSpec {
        right: CASTLE_DARK_KINGSIDE,
        king_from: DARK_KING_START,
        king_to: 62,
        rook_from: 63,
        rook_to: 61,
        empty_mask: (1 << 61) | (1 << 62),
        transit: [61, 62],
    },
    CastleSpec {
        right: CASTLE_DARK_QUEENSIDE,
        king_from: DARK_KING_START,
        king_to: 58,
        rook_from: 56,
        rook_to: 59,
        empty_mask: (1 << 57) | (1 << 58) | (1 << 59),
        transit: [59, 58],
    },
];

/// The castle whose king move is `from -> to`, if any.
pub fn castle_for_king_move(from: Square, to: Square) -> Option<&'static CastleSpec> {
    CASTLES
        .iter()
        .find(|spec| spec.king_from == from && spec.king_to == to)
}

/// Rights lost when a move starts or ends on `square`.
pub const fn castling_rights_touched_by(square: Square) -> CastlingRights {
    match square {
        LIGHT_KING_START => CASTLE_LIGHT_KINGSIDE | CASTLE_LIGHT_QUEENSIDE,
        DARK_KING_START => CASTLE_DARK_KINGSIDE | CASTLE_DARK_QUEENSIDE,
        7 => CASTLE_LIGHT_KINGSIDE,
        0 => CASTLE_LIGHT_QUEENSIDE,
        63 => CASTLE_DARK_KINGSIDE,
        56 => CASTLE_DARK_QUEENSIDE,
        _ => 0,
    }
}
