//! Coordinate move text (`e2e4`, `a7a8q`).
//!
//! Parsing is two-stage. `parse_move_text` checks syntax only and never looks
//! at a board. `resolve_move_text` then matches the parsed squares against a
//! legal-move list, which is where illegal and ambiguous input is told apart.

use std::fmt;

use thiserror::Error;

use crate::game_state::{chess_types::*, game_state::GameState};
use crate::move_generation::legal_move_generator::legal_moves;
use crate::move_generation::move_generator::MoveGenerationError;
use crate::moves::move_descriptions::{move_from, move_promotion_piece, move_to};
use crate::utils::algebraic::{algebraic_to_square, square_to_algebraic};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveTextError {
    #[error("malformed move text {0:?}")]
    Malformed(String),
    #[error("{0} is not a legal move here")]
    Illegal(String),
    #[error("{text} matches {candidates} legal moves; add a promotion piece")]
    Ambiguous { text: String, candidates: usize },
    #[error(transparent)]
    Generation(#[from] MoveGenerationError),
}

/// Syntactically valid move text, not yet checked against any position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveText {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceKind>,
}

impl fmt::Display for MoveText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", square_to_algebraic(self.from), square_to_algebraic(self.to))?;
        if let Some(promotion) = self.promotion {
            write!(f, "{}", promotion_to_char(promotion))?;
        }
        Ok(())
    }
}

pub fn parse_move_text(text: &str) -> Result<MoveText, MoveTextError> {
    let trimmed = text.trim();
    let malformed = || MoveTextError::Malformed(text.to_owned());
    if !trimmed.is_ascii() || !(4..=5).contains(&trimmed.len()) {
        return Err(malformed());
    }

    let from = algebraic_to_square(&trimmed[0..2]).map_err(|_| malformed())?;
    let to = algebraic_to_square(&trimmed[2..4]).map_err(|_| malformed())?;
    if from == to {
        return Err(malformed());
    }

    let promotion = match trimmed[4..].chars().next() {
        None => None,
        Some(ch) => Some(char_to_promotion(ch).ok_or_else(malformed)?),
    };

    Ok(MoveText { from, to, promotion })
}

/// Pick the unique legal move matching `parsed`.
pub fn resolve_move_text(
    text: &str,
    parsed: MoveText,
    legal: &[u64],
) -> Result<u64, MoveTextError> {
    let candidates: Vec<u64> = legal
        .iter()
        .copied()
        .filter(|&mv| move_from(mv) == parsed.from && move_to(mv) == parsed.to)
        .filter(|&mv| parsed.promotion.is_none() || move_promotion_piece(mv) == parsed.promotion)
        .collect();

    match candidates.as_slice() {
        [] => Err(MoveTextError::Illegal(text.trim().to_owned())),
        [mv] => Ok(*mv),
        many => Err(MoveTextError::Ambiguous {
            text: text.trim().to_owned(),
            candidates: many.len(),
        }),
    }
}

/// Parse and resolve against the legal moves of `game_state`.
pub fn long_algebraic_to_move_description(
    long_algebraic: &str,
    game_state: &GameState,
) -> Result<u64, MoveTextError> {
    let parsed = parse_move_text(long_algebraic)?;
    let legal = legal_moves(game_state)?;
    resolve_move_text(long_algebraic, parsed, &legal)
}

pub fn move_description_to_long_algebraic(move_description: u64) -> String {
    let mut out = square_to_algebraic(move_from(move_description));
    out.push_str(&square_to_algebraic(move_to(move_description)));
    if let Some(promotion) = move_promotion_piece(move_description) {
        out.push(promotion_to_char(promotion));
    }
    out
}

fn promotion_to_char(piece_kind: PieceKind) -> char {
    match piece_kind {
        PieceKind::Knight => 'n',
        PieceKind::Bishop => 'b',
        PieceKind::Rook => 'r',
        _ => 'q',
    }
}

fn char_to_promotion(ch: char) -> Option<PieceKind> {
    match ch.to_ascii_lowercase() {
        'n' => Some(PieceKind::Knight),
        'b' => Some(PieceKind::Bishop),
        'r' => Some(PieceKind::Rook),
        'q' => Some(PieceKind::Queen),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{long_algebraic_to_move_description, move_description_to_long_algebraic, MoveTextError};
    use crate::moves::move_descriptions::{FLAG_CASTLING, FLAG_DOUBLE_PAWN_PUSH, FLAG_EN_PASSANT};
    use crate::utils::fen_parser::parse_fen;

    #[test]
    fn round_trip_simple_move() {
        let game_state = parse_fen("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1").expect("FEN should parse");
        let mv = long_algebraic_to_move_description("e2e4", &game_state).expect("move should parse");
        assert_eq!(move_description_to_long_algebraic(mv), "e2e4");
        assert_ne!(mv & FLAG_DOUBLE_PAWN_PUSH, 0);
    }

    #[test]
    fn round_trip_promotion() {
        let game_state = parse_fen("8/P7/8/8/8/8/8/k6K w - - 0 1").expect("FEN should parse");
        let mv = long_algebraic_to_move_description("a7a8q", &game_state).expect("move should parse");
        assert_eq!(move_description_to_long_algebraic(mv), "a7a8q");
        let under = long_algebraic_to_move_description("a7a8N", &game_state).expect("move should parse");
        assert_eq!(move_description_to_long_algebraic(under), "a7a8n");
    }

    #[test]
    fn resolves_castling_and_en_passant_flags() {
        let castle_state = parse_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").expect("FEN should parse");
        let castle_move =
            long_algebraic_to_move_description("e1g1", &castle_state).expect("castle should parse");
        assert_ne!(castle_move & FLAG_CASTLING, 0);

        let ep_state = parse_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").expect("FEN should parse");
        let ep_move = long_algebraic_to_move_description("e5d6", &ep_state).expect("en-passant should parse");
        assert_ne!(ep_move & FLAG_EN_PASSANT, 0);
    }

    #[test]
    fn malformed_illegal_and_ambiguous_are_distinct() {
        let game = parse_fen("8/P7/8/8/8/8/8/k6K w - - 0 1").expect("FEN should parse");

        for bad in ["", "e2", "e2e9", "z1a1", "a7a8x", "a7a8qq", "a1a1"] {
            assert!(
                matches!(long_algebraic_to_move_description(bad, &game), Err(MoveTextError::Malformed(_))),
                "{bad:?} should be malformed"
            );
        }

        assert_eq!(
            long_algebraic_to_move_description("h1h3", &game),
            Err(MoveTextError::Illegal("h1h3".to_owned()))
        );
        assert_eq!(
            long_algebraic_to_move_description("a7a6", &game),
            Err(MoveTextError::Illegal("a7a6".to_owned()))
        );
        assert_eq!(
            long_algebraic_to_move_description("a7a8", &game),
            Err(MoveTextError::Ambiguous {
                text: "a7a8".to_owned(),
                candidates: 4
            })
        );
    }
}
