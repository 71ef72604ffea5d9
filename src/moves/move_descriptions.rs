//! Packed move encoding.
//!
//! A move is a plain `u64`:
//! bits 0-5 from, 6-11 to, 12-14 moved piece, 15-17 captured piece,
//! 18-20 promotion piece (7 = none), then one bit per special flag.

use crate::game_state::chess_types::{PieceKind, Square};

const FROM_SHIFT: u64 = 0;
const TO_SHIFT: u64 = 6;
const MOVED_PIECE_SHIFT: u64 = 12;
const CAPTURED_PIECE_SHIFT: u64 = 15;
const PROMOTION_PIECE_SHIFT: u64 = 18;

const SQUARE_MASK: u64 = 0x3F;
const PIECE_MASK: u64 = 0x7;
pub const NO_PIECE_CODE: u64 = 0x7;

pub const FLAG_CAPTURE: u64 = 1u64 << 21;
pub const FLAG_DOUBLE_PAWN_PUSH: u64 = 1u64 << 22;
pub const FLAG_EN_PASSANT: u64 = 1u64 << 23;
pub const FLAG_CASTLING: u64 = 1u64 << 24;

/// Never produced by the generator; marks "no move" in TT entries and results.
pub const NO_MOVE: u64 = 0;

#[inline]
pub fn pack_move_description(
    from: Square,
    to: Square,
    moved_piece: PieceKind,
    captured_piece: Option<PieceKind>,
    promotion_piece: Option<PieceKind>,
    flags: u64,
) -> u64 {
    let captured = captured_piece.map_or(NO_PIECE_CODE, piece_kind_to_code);
    let promotion = promotion_piece.map_or(NO_PIECE_CODE, piece_kind_to_code);
    ((from as u64) << FROM_SHIFT)
        | ((to as u64) << TO_SHIFT)
        | (piece_kind_to_code(moved_piece) << MOVED_PIECE_SHIFT)
        | (captured << CAPTURED_PIECE_SHIFT)
        | (promotion << PROMOTION_PIECE_SHIFT)
        | flags
}

#[inline]
pub fn move_from(move_description: u64) -> Square {
    ((move_description >> FROM_SHIFT) & SQUARE_MASK) as Square
}

#[inline]
pub fn move_to(move_description: u64) -> Square {
    ((move_description >> TO_SHIFT) & SQUARE_MASK) as Square
}

#[inline]
pub fn move_moved_piece(move_description: u64) -> Option<PieceKind> {
    piece_kind_from_code((move_description >> MOVED_PIECE_SHIFT) & PIECE_MASK)
}

#[inline]
pub fn move_captured_piece(move_description: u64) -> Option<PieceKind> {
    piece_kind_from_code((move_description >> CAPTURED_PIECE_SHIFT) & PIECE_MASK)
}

#[inline]
pub fn move_promotion_piece(move_description: u64) -> Option<PieceKind> {
    piece_kind_from_code((move_description >> PROMOTION_PIECE_SHIFT) & PIECE_MASK)
}

#[inline]
pub fn move_is_capture(move_description: u64) -> bool {
    move_description & FLAG_CAPTURE != 0
}

#[inline]
pub fn move_is_promotion(move_description: u64) -> bool {
    (move_description >> PROMOTION_PIECE_SHIFT) & PIECE_MASK != NO_PIECE_CODE
}

/// Captures and promotions; everything quiescence is allowed to search.
#[inline]
pub fn move_is_tactical(move_description: u64) -> bool {
    move_is_capture(move_description) || move_is_promotion(move_description)
}

#[inline]
pub fn piece_kind_to_code(piece_kind: PieceKind) -> u64 {
    piece_kind.index() as u64
}

#[inline]
pub fn piece_kind_from_code(code: u64) -> Option<PieceKind> {
    match code {
        0 => Some(PieceKind::Pawn),
        1 => Some(PieceKind::Knight),
        2 => Some(PieceKind::Bishop),
        3 => Some(PieceKind::Rook),
        4 => Some(PieceKind::Queen),
        5 => Some(PieceKind::King),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_promotion_fields_survive_packing() {
        let mv = pack_move_description(
            54,
            63,
            PieceKind::Pawn,
            Some(PieceKind::Rook),
            Some(PieceKind::Knight),
            FLAG_CAPTURE,
        );
        assert_eq!(move_from(mv), 54);
        assert_eq!(move_to(mv), 63);
        assert_eq!(move_moved_piece(mv), Some(PieceKind::Pawn));
        assert_eq!(move_captured_piece(mv), Some(PieceKind::Rook));
        assert_eq!(move_promotion_piece(mv), Some(PieceKind::Knight));
        assert!(move_is_tactical(mv));
    }

    #[test]
    fn quiet_move_is_not_tactical_and_never_equals_no_move() {
        let mv = pack_move_description(0, 8, PieceKind::Pawn, None, None, 0);
        assert!(!move_is_tactical(mv));
        assert_ne!(mv, NO_MOVE);
        assert_eq!(move_promotion_piece(mv), None);
    }
}
