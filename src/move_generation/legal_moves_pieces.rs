//! Knight, bishop, rook and queen move generation.

use crate::game_state::{chess_types::*, game_state::GameState};
use crate::move_generation::legal_move_apply::build_move;
use crate::moves::magic_tables::{bishop_attacks, queen_attacks, rook_attacks};
use crate::moves::move_descriptions::FLAG_CAPTURE;
use crate::moves::step_attacks::knight_attacks;

pub fn generate_piece_moves(game_state: &GameState, out: &mut Vec<u64>) {
    let occupancy = game_state.occupancy_all;
    generate_for_kind(game_state, PieceKind::Knight, knight_attacks, out);
    generate_for_kind(game_state, PieceKind::Bishop, |sq| bishop_attacks(sq, occupancy), out);
    generate_for_kind(game_state, PieceKind::Rook, |sq| rook_attacks(sq, occupancy), out);
    generate_for_kind(game_state, PieceKind::Queen, |sq| queen_attacks(sq, occupancy), out);
}

fn generate_for_kind<F>(game_state: &GameState, kind: PieceKind, attacks: F, out: &mut Vec<u64>)
where
    F: Fn(Square) -> u64,
{
    let side = game_state.side_to_move;
    let own = game_state.occupancy_by_color[side.index()];
    let mut pieces = game_state.pieces_of(side, kind);
    while pieces != 0 {
        let from = pieces.trailing_zeros() as Square;
        push_targets(game_state, from, kind, attacks(from) & !own, out);
        pieces &= pieces - 1;
    }
}

/// Push one move per target square, tagging captures from the mailbox.
pub(crate) fn push_targets(
    game_state: &GameState,
    from: Square,
    kind: PieceKind,
    targets: u64,
    out: &mut Vec<u64>,
) {
    let mut bb = targets;
    while bb != 0 {
        let to = bb.trailing_zeros() as Square;
        match game_state.piece_at(to) {
            Some(victim) => out.push(build_move(from, to, kind, Some(victim.kind), None, FLAG_CAPTURE)),
            None => out.push(build_move(from, to, kind, None, None, 0)),
        }
        bb &= bb - 1;
    }
}

#[cfg(test)]
mod tests {
    use super::generate_piece_moves;
    use crate::game_state::game_state::GameState;
    use crate::moves::move_descriptions::move_is_capture;

    #[test]
    fn start_position_piece_moves_are_knight_hops() {
        let mut out = Vec::new();
        generate_piece_moves(&GameState::new_game(), &mut out);
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn queen_in_open_board_sees_captures() {
        let game = GameState::from_fen("4k3/8/8/3p4/8/3Q4/8/4K3 w - - 0 1").expect("FEN should parse");
        let mut out = Vec::new();
        generate_piece_moves(&game, &mut out);
        assert_eq!(out.iter().filter(|&&mv| move_is_capture(mv)).count(), 1);
        assert_eq!(out.len(), 22);
    }
}
