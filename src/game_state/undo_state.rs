use crate::game_state::chess_types::*;

/// Single undo record produced by `make_move` and consumed by `unmake_move`.
///
/// The moved piece kind is stored explicitly rather than inferred from the
/// destination square, because a promotion overwrites it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoState {
    pub mv: u64,
    pub moved_piece: PieceKind,
    /// Captured piece and the square it stood on (differs from the
    /// destination for en-passant captures).
    pub captured: Option<(PieceKind, Square)>,
    pub promotion: Option<PieceKind>,
    /// Rook relocation performed by a castle, as `(from, to)`.
    pub castle_rook: Option<(Square, Square)>,

    pub prev_side_to_move: Color,
    pub prev_castling_rights: CastlingRights,
    pub prev_en_passant_square: Option<Square>,
    pub prev_halfmove_clock: u16,
    pub prev_fullmove_number: u16,
    pub prev_ply: u16,
    pub prev_zobrist_key: u64,
}
