//! Static evaluation.
//!
//! Search only talks to `BoardScorer`, so heuristics can be swapped without
//! touching the search code. Every scorer answers from the side to move's
//! point of view; internally terms are summed as light-minus-dark and folded
//! with `Color::sign` at the end.

use crate::game_state::{chess_types::*, game_state::GameState};
use crate::move_generation::legal_move_checks::{attackers_to, king_square};
use crate::moves::magic_tables::{bishop_attacks, queen_attacks, rook_attacks};
use crate::moves::step_attacks::{king_attacks, knight_attacks, pawn_attacks};

pub const MATE_SCORE: i32 = 30000;

pub trait BoardScorer: Send + Sync {
    /// Score from the perspective of the side to move.
    fn score(&self, game_state: &GameState) -> i32;
}

#[inline]
fn from_side_to_move(game_state: &GameState, light_minus_dark: i32) -> i32 {
    game_state.side_to_move.sign() * light_minus_dark
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MaterialScorer;

impl MaterialScorer {
    #[inline]
    pub const fn piece_value(piece: PieceKind) -> i32 {
        match piece {
            PieceKind::Pawn => 100,
            PieceKind::Knight => 320,
            PieceKind::Bishop => 330,
            PieceKind::Rook => 500,
            PieceKind::Queen => 900,
            PieceKind::King => 5000,
        }
    }

    #[inline]
    fn material_balance_white_minus_black(game_state: &GameState) -> i32 {
        ALL_PIECE_KINDS
            .iter()
            .map(|&piece| {
                let white = game_state.pieces_of(Color::Light, piece).count_ones() as i32;
                let black = game_state.pieces_of(Color::Dark, piece).count_ones() as i32;
                (white - black) * Self::piece_value(piece)
            })
            .sum()
    }
}

impl BoardScorer for MaterialScorer {
    fn score(&self, game_state: &GameState) -> i32 {
        from_side_to_move(game_state, Self::material_balance_white_minus_black(game_state))
    }
}

/// Piece-square tables, written from light's side with rank 8 on the first
/// row. Light pieces look up `square ^ 56`, dark pieces look up `square`.
#[rustfmt::skip]
const PAWN_TABLE: [i32; 64] = [
     0,  0,  0,  0,  0,  0,  0,  0,
    50, 50, 50, 50, 50, 50, 50, 50,
    10, 10, 20, 30, 30, 20, 10, 10,
     5,  5, 10, 25, 25, 10,  5,  5,
     0,  5,  5, 20, 20,  5,  5,  5,
     5,  5,  0,  0,  0,  0,  5,  5,
     5,  5, 10,-20,-20, 10,  5,  5,
     0,  0,  0,  0,  0,  0,  0,  0,
];

#[rustfmt::skip]
const KNIGHT_TABLE: [i32; 64] = [
    -50,-40,-30,-30,-30,-30,-40,-50,
    -40,-20,  0,  5,  5,  0,-20,-40,
    -30,  5, 10, 15, 15, 10,  5,-30,
    -30,  0, 15, 20, 20, 15,  0,-30,
    -30,  5, 15, 20, 20, 15,  5,-30,
    -30,  0, 10, 15, 15, 10,  0,-30,
    -40,-20,  0,  0,  0,  0,-20,-40,
    -50,-40,-30,-30,-30,-30,-40,-50,
];

#[rustfmt::skip]
const BISHOP_TABLE: [i32; 64] = [
    -20,  0,  0,  0,  0,  0,  0,-20,
      0, 10,  0,  5,  5,  0, 10,  0,
      5,  0,  0,  5,  5,  0,  0,  5,
      0,  0,  5,  0,  0,  5,  0,  0,
      0,  5,  0,  0,  0,  0,  5,  0,
      0,  0,  0,  0,  0,  0,  0,  5,
      0, 10,  0,  5,  5,  0, 10,  0,
    -20,  0,  0,  0,  0,-20,  0,-20,
];

#[rustfmt::skip]
const ROOK_TABLE: [i32; 64] = [
    5, 5, 5, 5, 5, 5, 5, 5,
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
    5, 5, 5, 5, 5, 5, 5, 5,
];

#[rustfmt::skip]
const QUEEN_TABLE: [i32; 64] = [
    0, 5, 5, 0, 0, 5, 5, 0,
    5, 5, 5, 0, 0, 5, 5, 5,
    5, 5, 5, 0, 0, 5, 5, 5,
    0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0,
    5, 5, 5, 0, 0, 5, 5, 5,
    5, 5, 5, 0, 0, 5, 5, 5,
    0, 5, 5, 0, 0, 5, 5, 0,
];

#[rustfmt::skip]
const KING_TABLE: [i32; 64] = [
    0,  0,  0, 0, 0, 0,  0, 0,
    0,  0,  0, 0, 0, 0,  0, 0,
    0,  0,  0, 0, 0, 0,  0, 0,
    0,  0,  0, 0, 0, 0,  0, 0,
    0,  0,  0, 0, 0, 0,  0, 0,
    0,  0,  0, 0, 0, 0,  0, 0,
    0,  0,  0, 0, 0, 0,  0, 0,
    5, 40, 40, 0, 0, 5, 80, 5,
];

/// Material, piece-square tables, mobility, defended pieces, connected pawns
/// and king safety.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardScorer;

impl StandardScorer {
    /// Past this material-plus-table lead the structural terms are skipped.
    const LAZY_MARGIN: i32 = 500;
    const SHIELD_PAWN_PENALTY: i32 = 12;
    const KING_ZONE_PRESSURE: i32 = 3;

    /// Full evaluation as light-minus-dark, independent of the side to move.
    pub fn white_minus_black(game_state: &GameState) -> i32 {
        let base = MaterialScorer::material_balance_white_minus_black(game_state)
            + Self::positional_term(game_state);
        if base.abs() > Self::LAZY_MARGIN {
            return base;
        }

        base + Self::activity_term(game_state)
            + Self::defended_term(game_state)
            + Self::connected_pawn_term(game_state)
            + Self::king_shield_term(game_state)
    }

    fn positional_term(game_state: &GameState) -> i32 {
        let mut score = 0i32;
        for color in [Color::Light, Color::Dark] {
            for piece in ALL_PIECE_KINDS {
                let mut bb = game_state.pieces_of(color, piece);
                while bb != 0 {
                    let sq = bb.trailing_zeros() as u8;
                    score += color.sign() * piece_square_bonus(piece, color, sq);
                    bb &= bb - 1;
                }
            }
        }
        score
    }

    fn activity_term(game_state: &GameState) -> i32 {
        let light = piece_activity(game_state, Color::Light);
        let dark = piece_activity(game_state, Color::Dark);
        (light.mobility - dark.mobility)
            + (light.king_zone_hits - dark.king_zone_hits) * Self::KING_ZONE_PRESSURE
    }

    fn defended_term(game_state: &GameState) -> i32 {
        let occ = game_state.occupancy_all;
        let mut score = 0i32;
        for color in [Color::Light, Color::Dark] {
            let mut bb = game_state.occupancy_by_color[color.index()];
            while bb != 0 {
                let sq = bb.trailing_zeros() as u8;
                bb &= bb - 1;
                let Some(piece) = game_state.piece_at(sq) else {
                    continue;
                };
                if attackers_to(game_state, sq, color, occ) != 0 {
                    score += color.sign() * defended_bonus(piece.kind);
                }
            }
        }
        score
    }

    fn connected_pawn_term(game_state: &GameState) -> i32 {
        connected_pawn_bonus(game_state, Color::Light) - connected_pawn_bonus(game_state, Color::Dark)
    }

    fn king_shield_term(game_state: &GameState) -> i32 {
        let missing_light = 3 - shield_pawn_count(game_state, Color::Light);
        let missing_dark = 3 - shield_pawn_count(game_state, Color::Dark);
        (missing_dark - missing_light) * Self::SHIELD_PAWN_PENALTY
    }
}

impl BoardScorer for StandardScorer {
    fn score(&self, game_state: &GameState) -> i32 {
        from_side_to_move(game_state, Self::white_minus_black(game_state))
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Activity {
    mobility: i32,
    /// Attacked squares in the enemy king's neighbourhood.
    king_zone_hits: i32,
}

fn piece_activity(game_state: &GameState, color: Color) -> Activity {
    let occ = game_state.occupancy_all;
    let own = game_state.occupancy_by_color[color.index()];
    let enemy_king_zone = king_square(game_state, color.opposite())
        .map_or(0, |sq| king_attacks(sq) | (1u64 << sq));

    let mut activity = Activity::default();
    let mut tally = |attacks: u64, weight: i32| {
        activity.mobility += (attacks & !own).count_ones() as i32 * weight;
        activity.king_zone_hits += (attacks & enemy_king_zone).count_ones() as i32;
    };

    let mut knights = game_state.pieces_of(color, PieceKind::Knight);
    while knights != 0 {
        let sq = knights.trailing_zeros() as u8;
        tally(knight_attacks(sq), 4);
        knights &= knights - 1;
    }

    let mut bishops = game_state.pieces_of(color, PieceKind::Bishop);
    while bishops != 0 {
        let sq = bishops.trailing_zeros() as u8;
        tally(bishop_attacks(sq, occ), 4);
        bishops &= bishops - 1;
    }

    let mut rooks = game_state.pieces_of(color, PieceKind::Rook);
    while rooks != 0 {
        let sq = rooks.trailing_zeros() as u8;
        tally(rook_attacks(sq, occ), 2);
        rooks &= rooks - 1;
    }

    let mut queens = game_state.pieces_of(color, PieceKind::Queen);
    while queens != 0 {
        let sq = queens.trailing_zeros() as u8;
        tally(queen_attacks(sq, occ), 1);
        queens &= queens - 1;
    }

    let mut pawn_cover = 0u64;
    let mut pawns = game_state.pieces_of(color, PieceKind::Pawn);
    while pawns != 0 {
        let sq = pawns.trailing_zeros() as u8;
        pawn_cover |= pawn_attacks(color, sq);
        pawns &= pawns - 1;
    }
    activity.mobility += (pawn_cover & !own).count_ones() as i32 / 2;
    activity.king_zone_hits += (pawn_cover & enemy_king_zone).count_ones() as i32;

    activity
}

fn piece_square_bonus(piece: PieceKind, color: Color, sq: u8) -> i32 {
    let idx = match color {
        Color::Light => (sq ^ 56) as usize,
        Color::Dark => sq as usize,
    };
    match piece {
        PieceKind::Pawn => PAWN_TABLE[idx],
        PieceKind::Knight => KNIGHT_TABLE[idx],
        PieceKind::Bishop => BISHOP_TABLE[idx],
        PieceKind::Rook => ROOK_TABLE[idx],
        PieceKind::Queen => QUEEN_TABLE[idx],
        PieceKind::King => KING_TABLE[idx],
    }
}

const fn defended_bonus(piece: PieceKind) -> i32 {
    match piece {
        PieceKind::Knight | PieceKind::Bishop | PieceKind::Rook => 4,
        PieceKind::Pawn | PieceKind::Queen => 2,
        PieceKind::King => 0,
    }
}

/// Pawns with a friendly pawn on an adjacent file at most one rank away.
/// Advanced pawns earn a little more.
fn connected_pawn_bonus(game_state: &GameState, color: Color) -> i32 {
    let pawns = game_state.pieces_of(color, PieceKind::Pawn);
    let mut bonus = 0i32;
    let mut bb = pawns;
    while bb != 0 {
        let sq = bb.trailing_zeros() as u8;
        bb &= bb - 1;
        let file = square_file(sq) as i32;
        let rank = square_rank(sq) as i32;
        let relative_rank = match color {
            Color::Light => rank,
            Color::Dark => 7 - rank,
        };
        for df in [-1, 1] {
            for dr in -1..=1 {
                let (f, r) = (file + df, rank + dr);
                if !(0..8).contains(&f) || !(0..8).contains(&r) {
                    continue;
                }
                if pawns & (1u64 << (r * 8 + f)) != 0 {
                    bonus += 2 + relative_rank / 2;
                }
            }
        }
    }
    bonus
}

/// Own pawns on the three squares directly in front of the king.
fn shield_pawn_count(game_state: &GameState, color: Color) -> i32 {
    let Some(king_sq) = king_square(game_state, color) else {
        return 0;
    };
    let shield_rank = match color {
        Color::Light => square_rank(king_sq) as i32 + 1,
        Color::Dark => square_rank(king_sq) as i32 - 1,
    };
    if !(0..8).contains(&shield_rank) {
        return 0;
    }

    let pawns = game_state.pieces_of(color, PieceKind::Pawn);
    let king_file = square_file(king_sq) as i32;
    (king_file - 1..=king_file + 1)
        .filter(|f| (0..8).contains(f))
        .filter(|&f| pawns & (1u64 << (shield_rank * 8 + f)) != 0)
        .count() as i32
}
