//! Square <-> coordinate text (`e4`) conversions.

use thiserror::Error;

use crate::game_state::chess_types::{square_file, square_rank, Square};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid square text: {0:?}")]
pub struct SquareTextError(pub String);

/// Convert coordinate text (for example: "e4") to a square index.
#[inline]
pub fn algebraic_to_square(text: &str) -> Result<Square, SquareTextError> {
    match text.as_bytes() {
        &[file @ b'a'..=b'h', rank @ b'1'..=b'8'] => Ok((rank - b'1') * 8 + (file - b'a')),
        _ => Err(SquareTextError(text.to_owned())),
    }
}

/// Convert a square index (`0..=63`) to coordinate text (for example: "e4").
#[inline]
pub fn square_to_algebraic(square: Square) -> String {
    let file_char = char::from(b'a' + square_file(square));
    let rank_char = char::from(b'1' + square_rank(square));
    format!("{file_char}{rank_char}")
}

#[cfg(test)]
mod tests {
    use super::{algebraic_to_square, square_to_algebraic};

    #[test]
    fn corners_and_centre() {
        assert_eq!(algebraic_to_square("a1"), Ok(0));
        assert_eq!(algebraic_to_square("h8"), Ok(63));
        assert_eq!(algebraic_to_square("e4"), Ok(28));
        assert_eq!(square_to_algebraic(28), "e4");
    }

    #[test]
    fn rejects_out_of_range_text() {
        for bad in ["", "e", "e9", "i1", "E4", "e44"] {
            assert!(algebraic_to_square(bad).is_err(), "{bad} should be rejected");
        }
    }
}
