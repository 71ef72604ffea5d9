//! Terminal board renderer for the console loop and diagnostics.

use crate::game_state::{chess_types::*, game_state::GameState};
use crate::utils::algebraic::square_to_algebraic;
use crate::utils::fen_generator::generate_castling_field;

/// Render the board to a Unicode string, rank 8 at the top.
pub fn render_game_state(game_state: &GameState) -> String {
    let mut out = String::from("  a b c d e f g h\n");

    for rank in (0..8u8).rev() {
        let rank_char = char::from(b'1' + rank);
        out.push(rank_char);
        out.push(' ');

        for file in 0..8u8 {
            out.push(game_state.piece_at(rank * 8 + file).map_or('·', piece_to_unicode));
            if file < 7 {
                out.push(' ');
            }
        }

        out.push(' ');
        out.push(rank_char);
        out.push('\n');
    }

    out.push_str("  a b c d e f g h");
    out
}

/// Board plus one line of side-to-move, rights, en-passant and clocks.
pub fn render_with_status(game_state: &GameState) -> String {
    let side = match game_state.side_to_move {
        Color::Light => "white",
        Color::Dark => "black",
    };
    let en_passant = game_state
        .en_passant_square
        .map_or_else(|| "-".to_owned(), square_to_algebraic);
    format!(
        "{}\n{side} to move | castling {} | en passant {en_passant} | halfmove {} | move {}",
        render_game_state(game_state),
        generate_castling_field(game_state.castling_rights),
        game_state.halfmove_clock,
        game_state.fullmove_number,
    )
}

fn piece_to_unicode(piece: Piece) -> char {
    match (piece.color, piece.kind) {
        (Color::Light, PieceKind::Pawn) => '♙',
        (Color::Light, PieceKind::Knight) => '♘',
        (Color::Light, PieceKind::Bishop) => '♗',
        (Color::Light, PieceKind::Rook) => '♖',
        (Color::Light, PieceKind::Queen) => '♕',
        (Color::Light, PieceKind::King) => '♔',
        (Color::Dark, PieceKind::Pawn) => '♟',
        (Color::Dark, PieceKind::Knight) => '♞',
        (Color::Dark, PieceKind::Bishop) => '♝',
        (Color::Dark, PieceKind::Rook) => '♜',
        (Color::Dark, PieceKind::Queen) => '♛',
        (Color::Dark, PieceKind::King) => '♚',
    }
}

#[cfg(test)]
mod tests {
    use super::{render_game_state, render_with_status};
    use crate::game_state::game_state::GameState;

    #[test]
    fn start_position_renders_back_ranks() {
        let text = render_game_state(&GameState::new_game());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[1], "8 ♜ ♞ ♝ ♛ ♚ ♝ ♞ ♜ 8");
        assert_eq!(lines[8], "1 ♖ ♘ ♗ ♕ ♔ ♗ ♘ ♖ 1");
    }

    #[test]
    fn status_line_reports_rights_and_clocks() {
        let game = GameState::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 7").expect("FEN should parse");
        let text = render_with_status(&game);
        assert!(text.ends_with("white to move | castling - | en passant d6 | halfmove 0 | move 7"));
    }
}
