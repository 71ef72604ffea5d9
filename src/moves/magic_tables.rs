//! Magic-bitboard attack tables for rooks, bishops and queens.
//!
//! For every square the relevant occupancy subsets are enumerated, the true
//! ray-traced attack set is computed for each, and a multiplier is searched
//! that maps every subset to a slot without destructive collisions. Lookups
//! are then a mask, multiply, shift and one table read.
//!
//! The tables are built once into a process-wide `OnceLock` and are read-only
//! afterwards. `initialize_attack_tables` forces the build up front; lookups
//! build lazily otherwise.

use std::sync::OnceLock;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::game_state::chess_types::Square;
use crate::moves::slider_rays::{occupancy_subsets, ray_attacks, relevant_occupancy_mask, Slider};

const MAGIC_SEED: u64 = 0x5155_494E_4345_u64;

#[derive(Debug, Clone, Copy, Default)]
struct Magic {
    mask: u64,
    magic: u64,
    shift: u32,
    offset: usize,
}

impl Magic {
    #[inline]
    fn index(&self, occupancy: u64) -> usize {
        self.offset + ((occupancy & self.mask).wrapping_mul(self.magic) >> self.shift) as usize
    }
}

#[derive(Debug)]
pub struct AttackTables {
    rook: [Magic; 64],
    bishop: [Magic; 64],
    attacks: Vec<u64>,
}

static ATTACK_TABLES: OnceLock<AttackTables> = OnceLock::new();

/// Build the tables if they are not built yet and return them.
pub fn initialize_attack_tables() -> &'static AttackTables {
    ATTACK_TABLES.get_or_init(build_attack_tables)
}

#[inline]
pub fn rook_attacks(square: Square, occupancy: u64) -> u64 {
    let tables = initialize_attack_tables();
    tables.attacks[tables.rook[square as usize].index(occupancy)]
}

#[inline]
pub fn bishop_attacks(square: Square, occupancy: u64) -> u64 {
    let tables = initialize_attack_tables();
    tables.attacks[tables.bishop[square as usize].index(occupancy)]
}

#[inline]
pub fn queen_attacks(square: Square, occupancy: u64) -> u64 {
    rook_attacks(square, occupancy) | bishop_attacks(square, occupancy)
}

impl AttackTables {
    /// Total table slots across both slider kinds.
    pub fn len(&self) -> usize {
        self.attacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attacks.is_empty()
    }
}

fn build_attack_tables() -> AttackTables {
    let mut rng = StdRng::seed_from_u64(MAGIC_SEED);
    let mut attacks = Vec::new();
    let mut rook = [Magic::default(); 64];
    let mut bishop = [Magic::default(); 64];

    for square in 0..64u8 {
        rook[square as usize] = find_magic(Slider::Rook, square, &mut rng, &mut attacks);
    }
    for square in 0..64u8 {
        bishop[square as usize] = find_magic(Slider::Bishop, square, &mut rng, &mut attacks);
    }

    log::trace!("built slider attack tables with {} slots", attacks.len());
    AttackTables {
        rook,
        bishop,
        attacks,
    }
}

/// Search a collision-free multiplier for one square and append its slots to
/// the shared attack vector.
fn find_magic<R: Rng + ?Sized>(
    slider: Slider,
    square: Square,
    rng: &mut R,
    attacks: &mut Vec<u64>,
) -> Magic {
    let mask = relevant_occupancy_mask(slider, square);
    let bits = mask.count_ones();
    let shift = 64 - bits;
    let subsets = occupancy_subsets(mask);
    let reference: Vec<u64> = subsets
        .iter()
        .map(|&occupancy| ray_attacks(slider, square, occupancy))
        .collect();

    let size = 1usize << bits;
    let mut slots = vec![0u64; size];
    let mut stamp = vec![0u32; size];
    let mut attempt = 0u32;

    loop {
        let candidate = rng.random::<u64>() & rng.random::<u64>() & rng.random::<u64>();
        if (mask.wrapping_mul(candidate) & 0xFF00_0000_0000_0000).count_ones() < 6 {
            continue;
        }

        attempt += 1;
        let mut ok = true;
        for (occupancy, &expected) in subsets.iter().zip(&reference) {
            let index = (occupancy.wrapping_mul(candidate) >> shift) as usize;
            if stamp[index] != attempt {
                stamp[index] = attempt;
                slots[index] = expected;
            } else if slots[index] != expected {
                ok = false;
                break;
            }
        }

        if ok {
            let offset = attacks.len();
            attacks.extend_from_slice(&slots);
            return Magic {
                mask,
                magic: candidate,
                shift,
                offset,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn magic_lookup_matches_ray_tracing_for_random_occupancies() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..2_000 {
            let occupancy = rng.random::<u64>() & rng.random::<u64>();
            let square = rng.random_range(0..64u8);
            assert_eq!(
                rook_attacks(square, occupancy),
                ray_attacks(Slider::Rook, square, occupancy)
            );
            assert_eq!(
                bishop_attacks(square, occupancy),
                ray_attacks(Slider::Bishop, square, occupancy)
            );
        }
    }

    #[test]
    fn table_sizes_are_the_sum_of_subset_counts() {
        let tables = initialize_attack_tables();
        assert_eq!(tables.len(), 102_400 + 5_248);
    }

    #[test]
    fn queen_combines_both_sliders() {
        let d4 = 27u8;
        assert_eq!(queen_attacks(d4, 0).count_ones(), 27);
    }
}
