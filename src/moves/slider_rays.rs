//! Ray walking for rooks and bishops.
//!
//! These are the slow reference routines. Search and move generation use the
//! magic lookups in `magic_tables`, which are built from and tested against
//! the functions here.

use crate::game_state::chess_types::Square;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slider {
    Rook,
    Bishop,
}

impl Slider {
    pub const fn directions(self) -> [(i32, i32); 4] {
        match self {
            Slider::Rook => [(0, 1), (0, -1), (1, 0), (-1, 0)],
            Slider::Bishop => [(1, 1), (-1, 1), (1, -1), (-1, -1)],
        }
    }
}

/// Attack set from `square`, each ray stopping on (and including) the first
/// occupied square.
pub fn ray_attacks(slider: Slider, square: Square, occupancy: u64) -> u64 {
    let mut attacks = 0u64;
    for (file_step, rank_step) in slider.directions() {
        let mut file = i32::from(square % 8) + file_step;
        let mut rank = i32::from(square / 8) + rank_step;
        while (0..8).contains(&file) && (0..8).contains(&rank) {
            let bit = 1u64 << (rank * 8 + file);
            attacks |= bit;
            if occupancy & bit != 0 {
                break;
            }
            file += file_step;
            rank += rank_step;
        }
    }
    attacks
}

/// Squares whose occupancy can change the attack set: every ray square except
/// the last one before the edge.
pub fn relevant_occupancy_mask(slider: Slider, square: Square) -> u64 {
    let mut mask = 0u64;
    for (file_step, rank_step) in slider.directions() {
        let mut file = i32::from(square % 8) + file_step;
        let mut rank = i32::from(square / 8) + rank_step;
        loop {
            let next_file = file + file_step;
            let next_rank = rank + rank_step;
            if !(0..8).contains(&next_file) || !(0..8).contains(&next_rank) {
                break;
            }
            mask |= 1u64 << (rank * 8 + file);
            file = next_file;
            rank = next_rank;
        }
    }
    mask
}

/// Every subset of `mask`, starting from the empty set (carry-rippler walk).
pub fn occupancy_subsets(mask: u64) -> Vec<u64> {
    let mut subsets = Vec::with_capacity(1usize << mask.count_ones());
    let mut subset = 0u64;
    loop {
        subsets.push(subset);
        subset = subset.wrapping_sub(mask) & mask;
        if subset == 0 {
            break;
        }
    }
    subsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_board_ray_counts() {
        let d4 = 27u8;
        assert_eq!(ray_attacks(Slider::Rook, d4, 0).count_ones(), 14);
        assert_eq!(ray_attacks(Slider::Bishop, d4, 0).count_ones(), 13);
    }

    #[test]
    fn blocker_stops_ray_but_is_attacked() {
        let a1 = 0u8;
        let blocker_on_a4 = 1u64 << 24;
        let attacks = ray_attacks(Slider::Rook, a1, blocker_on_a4);
        assert_ne!(attacks & blocker_on_a4, 0);
        assert_eq!(attacks & (1u64 << 32), 0);

        let c1 = 2u8;
        let blocker_on_e3 = 1u64 << 20;
        let attacks = ray_attacks(Slider::Bishop, c1, blocker_on_e3);
        assert_ne!(attacks & blocker_on_e3, 0);
        assert_eq!(attacks & (1u64 << 29), 0);
    }

    #[test]
    fn relevant_masks_drop_edges() {
        assert_eq!(relevant_occupancy_mask(Slider::Rook, 0).count_ones(), 12);
        assert_eq!(relevant_occupancy_mask(Slider::Rook, 27).count_ones(), 10);
        assert_eq!(relevant_occupancy_mask(Slider::Bishop, 27).count_ones(), 9);
        assert_eq!(relevant_occupancy_mask(Slider::Bishop, 0).count_ones(), 6);
    }

    #[test]
    fn subset_walk_is_exhaustive() {
        let mask = relevant_occupancy_mask(Slider::Bishop, 0);
        let subsets = occupancy_subsets(mask);
        assert_eq!(subsets.len(), 64);
        assert!(subsets.iter().all(|s| s & !mask == 0));
    }
}
