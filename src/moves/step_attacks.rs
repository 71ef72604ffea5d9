//! Fixed attack sets for the non-sliding pieces, indexed by source square.

use crate::game_state::chess_types::{Color, Square};

const KNIGHT_STEPS: [(i32, i32); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

const KING_STEPS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

const LIGHT_PAWN_CAPTURE_STEPS: [(i32, i32); 2] = [(-1, 1), (1, 1)];
const DARK_PAWN_CAPTURE_STEPS: [(i32, i32); 2] = [(-1, -1), (1, -1)];

pub const KNIGHT_ATTACKS: [u64; 64] = build_step_table(&KNIGHT_STEPS);
pub const KING_ATTACKS: [u64; 64] = build_step_table(&KING_STEPS);
pub const LIGHT_PAWN_ATTACKS: [u64; 64] = build_step_table(&LIGHT_PAWN_CAPTURE_STEPS);
pub const DARK_PAWN_ATTACKS: [u64; 64] = build_step_table(&DARK_PAWN_CAPTURE_STEPS);

#[inline]
pub const fn knight_attacks(square: Square) -> u64 {
    KNIGHT_ATTACKS[square as usize]
}

#[inline]
pub const fn king_attacks(square: Square) -> u64 {
    KING_ATTACKS[square as usize]
}

/// Squares a pawn of `color` standing on `square` attacks.
#[inline]
pub const fn pawn_attacks(color: Color, square: Square) -> u64 {
    match color {
        Color::Light => LIGHT_PAWN_ATTACKS[square as usize],
        Color::Dark => DARK_PAWN_ATTACKS[square as usize],
    }
}

const fn build_step_table(steps: &[(i32, i32)]) -> [u64; 64] {
    let mut table = [0u64; 64];
    let mut sq = 0usize;

    while sq < 64 {
        let file = (sq % 8) as i32;
        let rank = (sq / 8) as i32;
        let mut i = 0usize;
        while i < steps.len() {
            let f = file + steps[i].0;
            let r = rank + steps[i].1;
            if f >= 0 && f < 8 && r >= 0 && r < 8 {
                table[sq] |= 1u64 << ((r * 8 + f) as u32);
            }
            i += 1;
        }
        sq += 1;
    }

    table
}
