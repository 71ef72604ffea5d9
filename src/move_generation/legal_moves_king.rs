use crate::game_state::chess_rules::CASTLES;
use crate::game_state::{chess_types::*, game_state::GameState};
use crate::move_generation::legal_move_apply::build_move;
use crate::move_generation::legal_move_checks::is_square_attacked;
use crate::move_generation::legal_moves_pieces::push_targets;
use crate::moves::move_descriptions::FLAG_CASTLING;
use crate::moves::step_attacks::king_attacks;

pub fn generate_king_moves(game_state: &GameState, out: &mut Vec<u64>) {
    let side = game_state.side_to_move;
    let king_bb = game_state.pieces_of(side, PieceKind::King);
    if king_bb == 0 {
        return;
    }

    let from = king_bb.trailing_zeros() as Square;
    let targets = king_attacks(from) & !game_state.occupancy_by_color[side.index()];
    push_targets(game_state, from, PieceKind::King, targets, out);

    generate_castling_moves(game_state, from, out);
}

/// Castles are emitted only when fully legal: rights held, path empty, rook
/// present, king not in check and no transit square attacked.
fn generate_castling_moves(game_state: &GameState, king_from: Square, out: &mut Vec<u64>) {
    let side = game_state.side_to_move;
    let enemy = side.opposite();
    let rooks = game_state.pieces_of(side, PieceKind::Rook);

    let mut checked_origin = false;
    for spec in CASTLES.iter().filter(|spec| spec.king_from == king_from) {
        if game_state.castling_rights & spec.right == 0
            || game_state.occupancy_all & spec.empty_mask != 0
            || rooks & (1u64 << spec.rook_from) == 0
        {
            continue;
        }
        if !checked_origin {
            if is_square_attacked(game_state, king_from, enemy) {
                return;
            }
            checked_origin = true;
        }
        if spec
            .transit
            .iter()
            .any(|&sq| is_square_attacked(game_state, sq, enemy))
        {
            continue;
        }
        out.push(build_move(
            spec.king_from,
            spec.king_to,
            PieceKind::King,
            None,
            None,
            FLAG_CASTLING,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::generate_king_moves;
    use crate::game_state::game_state::GameState;
    use crate::moves::move_descriptions::FLAG_CASTLING;

    fn castle_count(fen: &str) -> usize {
        let game = GameState::from_fen(fen).expect("FEN should parse");
        let mut out = Vec::new();
        generate_king_moves(&game, &mut out);
        out.iter().filter(|&&mv| mv & FLAG_CASTLING != 0).count()
    }

    #[test]
    fn both_castles_available_on_open_back_rank() {
        assert_eq!(castle_count("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1"), 2);
    }

    #[test]
    fn attacked_transit_square_blocks_only_that_side() {
        // Rook on f8 covers f1.
        assert_eq!(castle_count("r3kr2/8/8/8/8/8/8/R3K2R w KQq - 0 1"), 1);
    }

    #[test]
    fn no_castling_out_of_check() {
        assert_eq!(castle_count("r3k2r/8/8/8/8/8/8/R3K2r w KQkq - 0 1"), 0);
        assert_eq!(castle_count("4r1k1/8/8/8/8/8/8/R3K2R w KQ - 0 1"), 0);
    }
}
