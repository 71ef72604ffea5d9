//! FEN-to-GameState parser.
//!
//! Every field is checked before the state is returned, and the finished
//! state must pass `GameState::validate`. A rejected string never yields a
//! partially built position.

use thiserror::Error;

use crate::game_state::game_state::GameStateError;
use crate::game_state::{chess_types::*, game_state::GameState};
use crate::move_generation::legal_move_checks::is_king_in_check;
use crate::utils::algebraic::algebraic_to_square;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenError {
    #[error("missing {0} field")]
    MissingField(&'static str),
    #[error("unexpected trailing fields")]
    ExtraFields,
    #[error("bad board layout: {0}")]
    BadBoard(String),
    #[error("bad side-to-move field {0:?}")]
    BadSide(String),
    #[error("bad castling character {0:?}")]
    BadCastling(char),
    #[error("bad en-passant field {0:?}")]
    BadEnPassant(String),
    #[error("bad clock field {0:?}")]
    BadClock(String),
    #[error("side not to move is in check")]
    OpponentInCheck,
    #[error(transparent)]
    InvalidPosition(#[from] GameStateError),
}

/// Parse a FEN string. The two clock fields may be omitted (EPD style) and
/// then default to `0 1`.
pub fn parse_fen(fen: &str) -> Result<GameState, FenError> {
    let mut parts = fen.split_whitespace();

    let board_part = parts.next().ok_or(FenError::MissingField("board"))?;
    let side_part = parts.next().ok_or(FenError::MissingField("side-to-move"))?;
    let castling_part = parts.next().ok_or(FenError::MissingField("castling"))?;
    let en_passant_part = parts.next().ok_or(FenError::MissingField("en-passant"))?;
    let halfmove_part = parts.next().unwrap_or("0");
    let fullmove_part = parts.next().unwrap_or("1");

    if parts.next().is_some() {
        return Err(FenError::ExtraFields);
    }

    let mut game_state = GameState::default();
    parse_board(board_part, &mut game_state)?;
    game_state.side_to_move = parse_side_to_move(side_part)?;
    game_state.castling_rights = parse_castling_rights(castling_part)?;
    game_state.en_passant_square = parse_en_passant_square(en_passant_part, &game_state)?;
    game_state.halfmove_clock = parse_clock(halfmove_part)?;
    game_state.fullmove_number = parse_clock(fullmove_part)?.max(1);
    game_state.refresh_hash();

    game_state.validate()?;
    if is_king_in_check(&game_state, game_state.side_to_move.opposite()) {
        return Err(FenError::OpponentInCheck);
    }

    Ok(game_state)
}

fn parse_board(board_part: &str, game_state: &mut GameState) -> Result<(), FenError> {
    let ranks: Vec<&str> = board_part.split('/').collect();
    if ranks.len() != 8 {
        return Err(FenError::BadBoard(format!("expected 8 ranks, found {}", ranks.len())));
    }

    for (fen_rank_idx, rank_str) in ranks.iter().enumerate() {
        let board_rank = 7 - fen_rank_idx as u8;
        let mut file = 0u8;

        for ch in rank_str.chars() {
            if let Some(empty_count) = ch.to_digit(10) {
                if !(1..=8).contains(&empty_count) {
                    return Err(FenError::BadBoard(format!("invalid empty-square count {ch:?}")));
                }
                file += empty_count as u8;
            } else {
                let (color, piece) = piece_from_fen_char(ch)
                    .ok_or_else(|| FenError::BadBoard(format!("invalid piece character {ch:?}")))?;
                if file >= 8 {
                    return Err(FenError::BadBoard(format!("rank {} is too long", board_rank + 1)));
                }
                game_state.place_piece(color, piece, board_rank * 8 + file);
                file += 1;
            }

            if file > 8 {
                return Err(FenError::BadBoard(format!("rank {} is too long", board_rank + 1)));
            }
        }

        if file != 8 {
            return Err(FenError::BadBoard(format!(
                "rank {} covers {file} files",
                board_rank + 1
            )));
        }
    }

    Ok(())
}

fn parse_side_to_move(side_part: &str) -> Result<Color, FenError> {
    match side_part {
        "w" => Ok(Color::Light),
        "b" => Ok(Color::Dark),
        _ => Err(FenError::BadSide(side_part.to_owned())),
    }
}

fn parse_castling_rights(castling_part: &str) -> Result<CastlingRights, FenError> {
    if castling_part == "-" {
        return Ok(0);
    }

    castling_part.chars().try_fold(0, |rights, ch| {
        let bit = match ch {
            'K' => CASTLE_LIGHT_KINGSIDE,
            'Q' => CASTLE_LIGHT_QUEENSIDE,
            'k' => CASTLE_DARK_KINGSIDE,
            'q' => CASTLE_DARK_QUEENSIDE,
            _ => return Err(FenError::BadCastling(ch)),
        };
        Ok(rights | bit)
    })
}

/// The target must sit on the rank a double push by the side not to move
/// passes over, with that side's pawn just beyond it and both the target and
/// the pawn's origin square empty.
fn parse_en_passant_square(en_passant_part: &str, game_state: &GameState) -> Result<Option<Square>, FenError> {
    if en_passant_part == "-" {
        return Ok(None);
    }

    let bad = || FenError::BadEnPassant(en_passant_part.to_owned());
    let square = algebraic_to_square(en_passant_part).map_err(|_| bad())?;
    let pusher = game_state.side_to_move.opposite();
    let (expected_rank, victim, origin) = match pusher {
        Color::Dark => (5, square.wrapping_sub(8), square.wrapping_add(8)),
        Color::Light => (2, square.wrapping_add(8), square.wrapping_sub(8)),
    };
    if square_rank(square) != expected_rank {
        return Err(bad());
    }
    if game_state.piece_at(victim) != Some(Piece::new(pusher, PieceKind::Pawn))
        || game_state.piece_at(square).is_some()
        || game_state.piece_at(origin).is_some()
    {
        return Err(bad());
    }
    Ok(Some(square))
}

fn parse_clock(text: &str) -> Result<u16, FenError> {
    text.parse::<u16>()
        .map_err(|_| FenError::BadClock(text.to_owned()))
}

fn piece_from_fen_char(ch: char) -> Option<(Color, PieceKind)> {
    let color = if ch.is_ascii_uppercase() {
        Color::Light
    } else {
        Color::Dark
    };

    let piece = match ch.to_ascii_lowercase() {
        'p' => PieceKind::Pawn,
        'n' => PieceKind::Knight,
        'b' => PieceKind::Bishop,
        'r' => PieceKind::Rook,
        'q' => PieceKind::Queen,
        'k' => PieceKind::King,
        _ => return None,
    };

    Some((color, piece))
}
