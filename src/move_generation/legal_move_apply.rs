//! Make / unmake and copy-based application of moves.
//!
//! `make_move` mutates a state in place and returns the `UndoState` that
//! `unmake_move` needs to restore it exactly. `apply_move` is the copy-based
//! variant: clone, then make.

use crate::game_state::chess_rules::{castle_for_king_move, castling_rights_touched_by};
use crate::game_state::{chess_types::*, game_state::GameState};
use crate::move_generation::move_generator::MoveApplyError;
use crate::moves::move_descriptions::{
    move_from, move_promotion_piece, move_to, pack_move_description, FLAG_EN_PASSANT,
};

pub fn make_move(
    game_state: &mut GameState,
    move_description: u64,
) -> Result<UndoState, MoveApplyError> {
    let from = move_from(move_description);
    let to = move_to(move_description);
    let moving_color = game_state.side_to_move;

    let moved = game_state
        .piece_at(from)
        .ok_or(MoveApplyError::EmptyOrigin(from))?;
    if moved.color != moving_color {
        return Err(MoveApplyError::WrongSideToMove(from));
    }

    let captured_square = if move_description & FLAG_EN_PASSANT != 0 {
        match moving_color {
            Color::Light => to.wrapping_sub(8),
            Color::Dark => to.wrapping_add(8),
        }
    } else {
        to
    };
    let captured = match game_state.piece_at(captured_square) {
        Some(piece) if piece.color == moving_color => {
            return Err(MoveApplyError::CaptureOwnPiece(captured_square));
        }
        Some(piece) => Some((piece.kind, captured_square)),
        None if captured_square != to => {
            return Err(MoveApplyError::MissingEnPassantVictim(captured_square));
        }
        None => None,
    };

    let promotion = move_promotion_piece(move_description).filter(|_| moved.kind == PieceKind::Pawn);
    let castle = if moved.kind == PieceKind::King {
        castle_for_king_move(from, to)
    } else {
        None
    };

    let undo = UndoState {
        mv: move_description,
        moved_piece: moved.kind,
        captured,
        promotion,
        castle_rook: castle.map(|spec| (spec.rook_from, spec.rook_to)),
        prev_side_to_move: moving_color,
        prev_castling_rights: game_state.castling_rights,
        prev_en_passant_square: game_state.en_passant_square,
        prev_halfmove_clock: game_state.halfmove_clock,
        prev_fullmove_number: game_state.fullmove_number,
        prev_ply: game_state.ply,
        prev_zobrist_key: game_state.zobrist_key,
    };

    game_state.repetition_history.push(game_state.zobrist_key);

    if let Some((_, square)) = captured {
        game_state.remove_piece(square);
    }
    game_state.remove_piece(from);
    game_state.place_piece(moving_color, promotion.unwrap_or(moved.kind), to);

    if let Some(spec) = castle {
        game_state.remove_piece(spec.rook_from);
        game_state.place_piece(moving_color, PieceKind::Rook, spec.rook_to);
    }

    let rights = game_state.castling_rights
        & !(castling_rights_touched_by(from) | castling_rights_touched_by(to));
    game_state.set_castling_rights(rights);

    let double_push = moved.kind == PieceKind::Pawn && from.abs_diff(to) == 16;
    game_state.set_en_passant_square(double_push.then(|| (from + to) / 2));

    if moved.kind == PieceKind::Pawn || captured.is_some() {
        game_state.halfmove_clock = 0;
    } else {
        game_state.halfmove_clock = game_state.halfmove_clock.saturating_add(1);
    }
    if moving_color == Color::Dark {
        game_state.fullmove_number = game_state.fullmove_number.saturating_add(1);
    }
    game_state.ply = game_state.ply.saturating_add(1);
    game_state.flip_side_to_move();

    debug_assert_eq!(game_state.validate(), Ok(()));
    Ok(undo)
}

/// Exact inverse of the `make_move` call that produced `undo`.
pub fn unmake_move(game_state: &mut GameState, undo: &UndoState) {
    let from = move_from(undo.mv);
    let to = move_to(undo.mv);
    let color = undo.prev_side_to_move;

    if let Some((rook_from, rook_to)) = undo.castle_rook {
        game_state.remove_piece(rook_to);
        game_state.place_piece(color, PieceKind::Rook, rook_from);
    }

    game_state.remove_piece(to);
    game_state.place_piece(color, undo.moved_piece, from);

    if let Some((kind, square)) = undo.captured {
        game_state.place_piece(color.opposite(), kind, square);
    }

    game_state.side_to_move = color;
    game_state.castling_rights = undo.prev_castling_rights;
    game_state.en_passant_square = undo.prev_en_passant_square;
    game_state.halfmove_clock = undo.prev_halfmove_clock;
    game_state.fullmove_number = undo.prev_fullmove_number;
    game_state.ply = undo.prev_ply;
    game_state.zobrist_key = undo.prev_zobrist_key;
    game_state.repetition_history.pop();

    debug_assert_eq!(game_state.validate(), Ok(()));
}

/// Copy-based application: the input state is left untouched.
pub fn apply_move(game_state: &GameState, move_description: u64) -> Result<GameState, MoveApplyError> {
    let mut next = game_state.clone();
    make_move(&mut next, move_description)?;
    Ok(next)
}

/// Pass the turn. Used by null-move pruning only; never legal in a game.
pub fn apply_null_move(game_state: &GameState) -> GameState {
    let mut next = game_state.clone();
    next.repetition_history.push(next.zobrist_key);
    next.set_en_passant_square(None);
    next.halfmove_clock = next.halfmove_clock.saturating_add(1);
    next.ply = next.ply.saturating_add(1);
    next.flip_side_to_move();
    next
}

#[inline]
pub fn build_move(
    from: Square,
    to: Square,
    moved_piece: PieceKind,
    captured_piece: Option<PieceKind>,
    promotion_piece: Option<PieceKind>,
    flags: u64,
) -> u64 {
    pack_move_description(from, to, moved_piece, captured_piece, promotion_piece, flags)
}
