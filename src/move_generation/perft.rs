//! Exhaustive move-path enumeration for generator verification.
//!
//! `perft_nodes` is the fast leaf counter. `perft_counts` additionally breaks
//! the leaves down by move kind. `perft_parallel` splits root moves across a
//! `WorkerPool`, one task per root move.

use thiserror::Error;

use crate::game_state::game_state::GameState;
use crate::move_generation::legal_move_apply::{make_move, unmake_move};
use crate::move_generation::legal_move_checks::is_king_in_check;
use crate::move_generation::legal_move_generator::legal_moves_in_place;
use crate::move_generation::move_generator::{MoveGenResult, MoveGenerationError};
use crate::moves::move_descriptions::{
    move_is_capture, move_is_promotion, FLAG_CASTLING, FLAG_EN_PASSANT,
};
use crate::search::worker_pool::{PoolError, WorkerPool};
use crate::utils::long_algebraic::move_description_to_long_algebraic;

#[derive(Debug, Error)]
pub enum PerftError {
    #[error(transparent)]
    Generation(#[from] MoveGenerationError),
    #[error(transparent)]
    Pool(#[from] PoolError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerftCounts {
    pub nodes: u64,
    pub captures: u64,
    pub en_passant: u64,
    pub castles: u64,
    pub promotions: u64,
    pub checks: u64,
    pub checkmates: u64,
}

impl PerftCounts {
    fn merge(&mut self, rhs: PerftCounts) {
        self.nodes += rhs.nodes;
        self.captures += rhs.captures;
        self.en_passant += rhs.en_passant;
        self.castles += rhs.castles;
        self.promotions += rhs.promotions;
        self.checks += rhs.checks;
        self.checkmates += rhs.checkmates;
    }
}

/// Leaf count at `depth`, bulk-counting the last ply.
pub fn perft_nodes(game_state: &GameState, depth: u8) -> MoveGenResult<u64> {
    let mut scratch = game_state.clone();
    nodes_recurse(&mut scratch, depth)
}

fn nodes_recurse(game_state: &mut GameState, depth: u8) -> MoveGenResult<u64> {
    if depth == 0 {
        return Ok(1);
    }
    let moves = legal_moves_in_place(game_state)?;
    if depth == 1 {
        return Ok(moves.len() as u64);
    }
    let mut total = 0;
    for mv in moves {
        let undo = make_move(game_state, mv)?;
        let sub = nodes_recurse(game_state, depth - 1);
        unmake_move(game_state, &undo);
        total += sub?;
    }
    Ok(total)
}

/// Leaf count with per-kind breakdown of the final ply.
pub fn perft_counts(game_state: &GameState, depth: u8) -> MoveGenResult<PerftCounts> {
    let mut scratch = game_state.clone();
    let mut counts = PerftCounts::default();
    if depth == 0 {
        counts.nodes = 1;
        return Ok(counts);
    }
    counts_recurse(&mut scratch, depth, &mut counts)?;
    Ok(counts)
}

fn counts_recurse(game_state: &mut GameState, depth: u8, counts: &mut PerftCounts) -> MoveGenResult<()> {
    for mv in legal_moves_in_place(game_state)? {
        let undo = make_move(game_state, mv)?;
        let outcome = if depth == 1 {
            tally_leaf(game_state, mv, counts)
        } else {
            counts_recurse(game_state, depth - 1, counts)
        };
        unmake_move(game_state, &undo);
        outcome?;
    }
    Ok(())
}

fn tally_leaf(after: &mut GameState, mv: u64, counts: &mut PerftCounts) -> MoveGenResult<()> {
    counts.nodes += 1;
    if move_is_capture(mv) {
        counts.captures += 1;
    }
    if mv & FLAG_EN_PASSANT != 0 {
        counts.en_passant += 1;
    }
    if mv & FLAG_CASTLING != 0 {
        counts.castles += 1;
    }
    if move_is_promotion(mv) {
        counts.promotions += 1;
    }
    if is_king_in_check(after, after.side_to_move) {
        counts.checks += 1;
        if legal_moves_in_place(after)?.is_empty() {
            counts.checkmates += 1;
        }
    }
    Ok(())
}

/// Leaf count per root move, in generation order.
pub fn perft_divide(game_state: &GameState, depth: u8) -> MoveGenResult<Vec<(String, u64)>> {
    let mut scratch = game_state.clone();
    let mut out = Vec::new();
    for mv in legal_moves_in_place(&mut scratch)? {
        let undo = make_move(&mut scratch, mv)?;
        let nodes = nodes_recurse(&mut scratch, depth.saturating_sub(1));
        unmake_move(&mut scratch, &undo);
        out.push((move_description_to_long_algebraic(mv), nodes?));
    }
    Ok(out)
}

/// `perft_nodes` with one pool task per root move.
pub fn perft_parallel(pool: &WorkerPool, game_state: &GameState, depth: u8) -> Result<u64, PerftError> {
    if depth <= 1 {
        return Ok(perft_nodes(game_state, depth)?);
    }

    let mut scratch = game_state.clone();
    let mut handles = Vec::new();
    for mv in legal_moves_in_place(&mut scratch)? {
        let mut child = scratch.clone();
        make_move(&mut child, mv).map_err(MoveGenerationError::from)?;
        handles.push(pool.submit(move || nodes_recurse(&mut child, depth - 1))?);
    }

    let mut total = 0;
    for handle in handles {
        total += handle.join()??;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
    const POSITION_3: &str = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1";

    #[test]
    fn start_position_reference_counts() {
        let game = GameState::new_game();
        assert_eq!(perft_nodes(&game, 1).expect("perft should run"), 20);
        assert_eq!(perft_nodes(&game, 2).expect("perft should run"), 400);
        assert_eq!(perft_nodes(&game, 3).expect("perft should run"), 8_902);
        assert_eq!(perft_nodes(&game, 4).expect("perft should run"), 197_281);
    }

    #[test]
    fn start_position_depth_three_breakdown() {
        let counts = perft_counts(&GameState::new_game(), 3).expect("perft should run");
        assert_eq!(
            counts,
            PerftCounts {
                nodes: 8_902,
                captures: 34,
                en_passant: 0,
                castles: 0,
                promotions: 0,
                checks: 12,
                checkmates: 0,
            }
        );
    }

    #[test]
    fn kiwipete_reference_counts() {
        let game = GameState::from_fen(KIWIPETE).expect("FEN should parse");
        assert_eq!(perft_nodes(&game, 1).expect("perft should run"), 48);
        let counts = perft_counts(&game, 2).expect("perft should run");
        assert_eq!(counts.nodes, 2_039);
        assert_eq!(counts.captures, 351);
        assert_eq!(counts.en_passant, 1);
        assert_eq!(counts.castles, 91);
        assert_eq!(counts.checks, 3);
    }

    #[test]
    fn position_three_reference_counts() {
        let game = GameState::from_fen(POSITION_3).expect("FEN should parse");
        assert_eq!(perft_nodes(&game, 1).expect("perft should run"), 14);
        assert_eq!(perft_nodes(&game, 2).expect("perft should run"), 191);
        assert_eq!(perft_nodes(&game, 3).expect("perft should run"), 2_812);
    }

    #[test]
    fn parallel_perft_matches_sequential() {
        let pool = WorkerPool::new(3).expect("pool should start");
        let game = GameState::from_fen(KIWIPETE).expect("FEN should parse");
        assert_eq!(perft_parallel(&pool, &game, 3).expect("perft should run"), 97_862);
    }

    #[test]
    fn divide_sums_to_total() {
        let game = GameState::new_game();
        let divide = perft_divide(&game, 2).expect("perft should run");
        assert_eq!(divide.len(), 20);
        assert_eq!(divide.iter().map(|(_, n)| n).sum::<u64>(), 400);
        assert!(divide.iter().any(|(mv, n)| mv == "e2e4" && *n == 20));
    }
}
