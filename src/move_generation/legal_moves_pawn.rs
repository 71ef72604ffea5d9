use crate::game_state::{chess_types::*, game_state::GameState};
use crate::move_generation::legal_move_apply::build_move;
use crate::moves::move_descriptions::{FLAG_CAPTURE, FLAG_DOUBLE_PAWN_PUSH, FLAG_EN_PASSANT};
use crate::moves::step_attacks::pawn_attacks;

const FILE_A: u64 = 0x0101_0101_0101_0101;
const FILE_H: u64 = FILE_A << 7;
const RANK_3: u64 = 0xFF << 16;
const RANK_6: u64 = 0xFF << 40;
const BACK_RANKS: u64 = 0xFF00_0000_0000_00FF;

/// Promotion choices, strongest first so ordering sees the queen early.
const PROMOTION_ORDER: [PieceKind; 4] = [
    PieceKind::Queen,
    PieceKind::Knight,
    PieceKind::Rook,
    PieceKind::Bishop,
];

/// Pseudo-legal pawn moves, generated set-wise by shifting the pawn bitboard.
pub fn generate_pawn_moves(game_state: &GameState, out: &mut Vec<u64>) {
    let side = game_state.side_to_move;
    let pawns = game_state.pieces_of(side, PieceKind::Pawn);
    let enemy = game_state.occupancy_by_color[side.opposite().index()];
    let empty = !game_state.occupancy_all;

    // Every target set is paired with the signed square delta back to its origin.
    let (single, double, capture_west, capture_east, forward, west, east) = match side {
        Color::Light => {
            let single = (pawns << 8) & empty;
            (
                single,
                ((single & RANK_3) << 8) & empty,
                ((pawns & !FILE_A) << 7) & enemy,
                ((pawns & !FILE_H) << 9) & enemy,
                8i8,
                7i8,
                9i8,
            )
        }
        Color::Dark => {
            let single = (pawns >> 8) & empty;
            (
                single,
                ((single & RANK_6) >> 8) & empty,
                ((pawns & !FILE_A) >> 9) & enemy,
                ((pawns & !FILE_H) >> 7) & enemy,
                -8i8,
                -9i8,
                -7i8,
            )
        }
    };

    push_pawn_targets(game_state, single, forward, 0, out);
    push_pawn_targets(game_state, capture_west, west, FLAG_CAPTURE, out);
    push_pawn_targets(game_state, capture_east, east, FLAG_CAPTURE, out);

    let mut doubles = double;
    while doubles != 0 {
        let to = doubles.trailing_zeros() as Square;
        let from = origin(to, 2 * forward);
        out.push(build_move(from, to, PieceKind::Pawn, None, None, FLAG_DOUBLE_PAWN_PUSH));
        doubles &= doubles - 1;
    }

    if let Some(ep) = game_state.en_passant_square {
        // Our pawns that could capture onto `ep` are those an enemy pawn there would attack.
        let mut attackers = pawn_attacks(side.opposite(), ep) & pawns;
        while attackers != 0 {
            let from = attackers.trailing_zeros() as Square;
            out.push(build_move(
                from,
                ep,
                PieceKind::Pawn,
                Some(PieceKind::Pawn),
                None,
                FLAG_CAPTURE | FLAG_EN_PASSANT,
            ));
            attackers &= attackers - 1;
        }
    }
}

fn push_pawn_targets(game_state: &GameState, targets: u64, delta: i8, flags: u64, out: &mut Vec<u64>) {
    let mut bb = targets;
    while bb != 0 {
        let to = bb.trailing_zeros() as Square;
        let from = origin(to, delta);
        let captured = game_state.piece_at(to).map(|piece| piece.kind);
        if (1u64 << to) & BACK_RANKS != 0 {
            for promo in PROMOTION_ORDER {
                out.push(build_move(from, to, PieceKind::Pawn, captured, Some(promo), flags));
            }
        } else {
            out.push(build_move(from, to, PieceKind::Pawn, captured, None, flags));
        }
        bb &= bb - 1;
    }
}

#[inline]
fn origin(to: Square, delta: i8) -> Square {
    (to as i8 - delta) as Square
}

#[cfg(test)]
mod tests {
    use super::generate_pawn_moves;
    use crate::game_state::game_state::GameState;

    #[test]
    fn start_position_has_sixteen_pawn_moves() {
        let mut out = Vec::new();
        generate_pawn_moves(&GameState::new_game(), &mut out);
        assert_eq!(out.len(), 16);
    }

    #[test]
    fn capture_promotion_expands_to_four_moves_each() {
        let game = GameState::from_fen("1n2k3/P7/8/8/8/8/8/4K3 w - - 0 1").expect("FEN should parse");
        let mut out = Vec::new();
        generate_pawn_moves(&game, &mut out);
        // a7a8 and a7xb8, each with four promotion pieces.
        assert_eq!(out.len(), 8);
    }
}
