//! Iterative deepening search with negamax alpha-beta pruning.
//!
//! Heuristics:
//! - Transposition table probe/store with mate-distance normalisation.
//! - Quiescence over captures and promotions, all evasions when in check.
//! - Null-move pruning, futility pruning, late-move pruning and reductions.
//! - MVV-LVA capture ordering, then killer, countermove and history quiets.
//! - Principal variation search.
//! - Aspiration windows around the previous iteration's score.
//! - Sibling fan-out onto a `WorkerPool` once the first child has set alpha.
//!
//! Scores are always from the side to move's point of view.

use std::cmp::Reverse;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game_state::{chess_types::*, game_state::GameState};
use crate::move_generation::legal_move_apply::{apply_null_move, make_move, unmake_move};
use crate::move_generation::legal_move_checks::is_king_in_check;
use crate::move_generation::legal_move_generator::{legal_moves, legal_moves_in_place};
use crate::move_generation::move_generator::{MoveApplyError, MoveGenerationError};
use crate::moves::move_descriptions::{
    move_captured_piece, move_is_capture, move_is_promotion, move_is_tactical, move_moved_piece,
    move_promotion_piece, move_to,
};
use crate::search::board_scoring::{BoardScorer, MaterialScorer, MATE_SCORE};
use crate::search::search_control::{DeadlinePolling, SearchControl};
use crate::search::transposition_table::{Bound, TTEntry, TTStats, TranspositionTable};
use crate::search::worker_pool::{PoolError, TaskHandle, WorkerPool};
use crate::utils::long_algebraic::move_description_to_long_algebraic;

pub const MAX_PLY: usize = 128;
/// Scores at or beyond this magnitude encode a forced mate.
pub const MATE_TT_THRESHOLD: i32 = MATE_SCORE - 1000;
pub const DRAW_SCORE: i32 = 0;
/// Window bound strictly outside every reachable score.
const INFINITY: i32 = MATE_SCORE + 1;
const QUIESCENCE_MAX_PLY: u8 = 16;
const QUIESCENCE_DELTA_MARGIN: i32 = 200;
const ASPIRATION_MAX_ATTEMPTS: u8 = 8;
const NULL_MOVE_MIN_DEPTH: u8 = 4;
const HISTORY_CAP: i32 = 50_000;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Generation(#[from] MoveGenerationError),
    #[error(transparent)]
    Pool(#[from] PoolError),
}

impl From<MoveApplyError> for SearchError {
    fn from(err: MoveApplyError) -> Self {
        SearchError::Generation(err.into())
    }
}

/// `Ok(None)` means the search was stopped before this node finished.
type SearchOutcome<T> = Result<Option<T>, SearchError>;

/// Toggles for the heuristics that trade exactness for speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PruningConfig {
    pub null_move: bool,
    pub futility: bool,
    pub late_move: bool,
    pub aspiration: bool,
}

impl Default for PruningConfig {
    fn default() -> Self {
        Self {
            null_move: true,
            futility: true,
            late_move: true,
            aspiration: true,
        }
    }
}

impl PruningConfig {
    /// Plain alpha-beta: every score is exact for the searched depth.
    pub const fn disabled() -> Self {
        Self {
            null_move: false,
            futility: false,
            late_move: false,
            aspiration: false,
        }
    }
}

/// When a node is big enough to hand its remaining siblings to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    pub min_split_depth: u8,
    /// Nodes the first child must have cost.
    pub min_split_nodes: u64,
    /// Siblings left after the first child.
    pub min_split_siblings: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            min_split_depth: 4,
            min_split_nodes: 2_000,
            min_split_siblings: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub max_depth: u8,
    pub movetime_ms: Option<u64>,
    pub max_nodes: Option<u64>,
    pub stop_flag: Option<Arc<AtomicBool>>,
    pub deadline_polling: DeadlinePolling,
    pub pruning: PruningConfig,
    pub parallel: ParallelConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_depth: 6,
            movetime_ms: None,
            max_nodes: None,
            stop_flag: None,
            deadline_polling: DeadlinePolling::RootMoves,
            pruning: PruningConfig::default(),
            parallel: ParallelConfig::default(),
        }
    }
}

impl SearchConfig {
    pub fn with_depth(max_depth: u8) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    pub best_move: Option<u64>,
    pub best_score: i32,
    pub reached_depth: u8,
    pub nodes: u64,
    pub elapsed_ms: u64,
    pub nps: u64,
    pub tt_stats: TTStats,
    pub principal_variation: Vec<u64>,
}

/// A subtree's score together with the move that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredMove {
    pub score: i32,
    pub best_move: Option<u64>,
}

impl ScoredMove {
    const fn score_only(score: i32) -> Self {
        Self {
            score,
            best_move: None,
        }
    }
}

#[inline]
pub fn is_mate_score(score: i32) -> bool {
    score.abs() >= MATE_TT_THRESHOLD
}

/// Search driver owning the scorer, the shared table and the optional pool.
pub struct Searcher {
    scorer: Arc<dyn BoardScorer>,
    tt: Option<Arc<TranspositionTable>>,
    pool: Option<WorkerPool>,
}

impl Searcher {
    pub fn new(scorer: Arc<dyn BoardScorer>, tt_size_mb: usize) -> Self {
        Self {
            scorer,
            tt: Some(Arc::new(TranspositionTable::new_with_mb(tt_size_mb))),
            pool: None,
        }
    }

    /// A searcher that never probes or stores.
    pub fn without_table(scorer: Arc<dyn BoardScorer>) -> Self {
        Self {
            scorer,
            tt: None,
            pool: None,
        }
    }

    /// Search with `threads` threads in total: the caller's plus
    /// `threads - 1` pool workers.
    pub fn with_threads(mut self, threads: usize) -> Result<Self, SearchError> {
        self.pool = if threads > 1 {
            Some(WorkerPool::new(threads - 1)?)
        } else {
            None
        };
        Ok(self)
    }

    pub fn thread_count(&self) -> usize {
        1 + self.pool.as_ref().map_or(0, WorkerPool::thread_count)
    }

    pub fn table(&self) -> Option<&TranspositionTable> {
        self.tt.as_deref()
    }

    pub fn clear_table(&self) {
        if let Some(tt) = &self.tt {
            tt.clear();
        }
    }

    pub fn search(&self, game_state: &GameState, config: &SearchConfig) -> Result<SearchResult, SearchError> {
        game_state.validate().map_err(MoveGenerationError::InvalidState)?;

        let control = Arc::new(SearchControl::new(
            config.movetime_ms,
            config.max_nodes,
            config.stop_flag.clone(),
            config.deadline_polling,
        ));

        if config.max_depth == 0 {
            let score = if legal_moves(game_state)?.is_empty() {
                terminal_score(game_state, 0)
            } else {
                self.scorer.score(game_state)
            };
            return Ok(SearchResult {
                best_score: score,
                nodes: 1,
                tt_stats: self.tt_stats(),
                ..SearchResult::default()
            });
        }

        let shared = SharedSearch {
            scorer: Arc::clone(&self.scorer),
            tt: self.tt.clone(),
            control: Arc::clone(&control),
            pruning: config.pruning,
            parallel: config.parallel,
        };
        let mut worker = SearchWorker::new(shared, self.pool.as_ref(), false);
        let mut root = game_state.clone();
        let mut result = SearchResult::default();
        let max_depth = config.max_depth.min((MAX_PLY - 1) as u8);
        let mut sweep = None;

        for depth in 1..=max_depth {
            // The first iteration always completes so a move is always known.
            let completed_one = result.reached_depth > 0;
            if completed_one && control.should_stop_at_root() {
                break;
            }
            worker.interruptible = completed_one;
            if let Some(tt) = &self.tt {
                if tt.new_generation() {
                    finish_sweep(sweep.take())?;
                    sweep = self.start_sweep(tt)?;
                }
            }
            worker.heuristics.reset_iteration();

            let Some(root_result) = worker.search_root(&mut root, depth, result.best_score)? else {
                break;
            };

            result.best_move = root_result.best_move;
            result.best_score = root_result.score;
            result.reached_depth = depth;
            result.nodes = control.nodes();
            result.principal_variation = self.principal_variation(game_state, depth);

            log::debug!(
                "depth {depth} score {} nodes {} time {}ms pv {}",
                result.best_score,
                result.nodes,
                control.elapsed_ms(),
                format_moves(&result.principal_variation),
            );

            if result.best_move.is_none() {
                break;
            }
        }

        finish_sweep(sweep)?;

        result.nodes = control.nodes();
        result.elapsed_ms = control.elapsed_ms();
        result.nps = if result.elapsed_ms == 0 {
            0
        } else {
            result.nodes.saturating_mul(1000) / result.elapsed_ms
        };
        result.tt_stats = self.tt_stats();
        Ok(result)
    }

    /// Evict stale table entries on a pool worker, or right here without a
    /// pool. The returned handle must be joined before the search returns.
    fn start_sweep(&self, tt: &Arc<TranspositionTable>) -> Result<Option<TaskHandle<usize>>, SearchError> {
        match &self.pool {
            Some(pool) => {
                let tt = Arc::clone(tt);
                Ok(Some(pool.submit(move || tt.reclaim_stale())?))
            }
            None => {
                let evicted = tt.reclaim_stale();
                log::trace!("tt generation {}: reclaimed {evicted} stale entries", tt.generation());
                Ok(None)
            }
        }
    }

    fn tt_stats(&self) -> TTStats {
        self.tt.as_ref().map(|tt| tt.stats()).unwrap_or_default()
    }

    /// Follow stored best moves from `game_state`, re-checking each for
    /// legality and stopping at the first repeated position.
    pub fn principal_variation(&self, game_state: &GameState, max_len: u8) -> Vec<u64> {
        let Some(tt) = &self.tt else {
            return Vec::new();
        };
        let mut line = Vec::new();
        let mut state = game_state.clone();
        let mut seen = vec![state.zobrist_key];
        for _ in 0..max_len {
            let Some(mv) = tt.probe(state.zobrist_key).and_then(|entry| entry.best_move) else {
                break;
            };
            let Ok(legal) = legal_moves_in_place(&mut state) else {
                break;
            };
            if !legal.contains(&mv) || make_move(&mut state, mv).is_err() {
                break;
            }
            line.push(mv);
            if seen.contains(&state.zobrist_key) {
                break;
            }
            seen.push(state.zobrist_key);
        }
        line
    }
}

/// One-off search with a private 16 MiB table and no worker pool.
pub fn iterative_deepening_search(
    game_state: &GameState,
    scorer: Arc<dyn BoardScorer>,
    config: &SearchConfig,
) -> Result<SearchResult, SearchError> {
    Searcher::new(scorer, 16).search(game_state, config)
}

fn finish_sweep(sweep: Option<TaskHandle<usize>>) -> Result<(), SearchError> {
    if let Some(handle) = sweep {
        let evicted = handle.join()?;
        log::trace!("background sweep reclaimed {evicted} stale entries");
    }
    Ok(())
}

fn format_moves(moves: &[u64]) -> String {
    moves
        .iter()
        .map(|&mv| move_description_to_long_algebraic(mv))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Everything a worker task needs, cheap to clone into it.
#[derive(Clone)]
struct SharedSearch {
    scorer: Arc<dyn BoardScorer>,
    tt: Option<Arc<TranspositionTable>>,
    control: Arc<SearchControl>,
    pruning: PruningConfig,
    parallel: ParallelConfig,
}

struct SearchWorker<'p> {
    shared: SharedSearch,
    /// Only the root driver splits; pool tasks never hold the pool.
    pool: Option<&'p WorkerPool>,
    heuristics: SearchHeuristics,
    interruptible: bool,
}

impl<'p> SearchWorker<'p> {
    fn new(shared: SharedSearch, pool: Option<&'p WorkerPool>, interruptible: bool) -> Self {
        Self {
            shared,
            pool,
            heuristics: SearchHeuristics::default(),
            interruptible,
        }
    }

    fn search_root(&mut self, root: &mut GameState, depth: u8, prev_score: i32) -> SearchOutcome<ScoredMove> {
        if depth <= 1 || !self.shared.pruning.aspiration || is_mate_score(prev_score) {
            return self.negamax(root, depth, -INFINITY, INFINITY, 0, None, true);
        }

        let mut window = aspiration_initial_window(depth);
        let mut alpha = (prev_score - window).max(-INFINITY);
        let mut beta = (prev_score + window).min(INFINITY);
        let mut attempts = 0u8;

        loop {
            attempts += 1;
            let Some(found) = self.negamax(root, depth, alpha, beta, 0, None, true)? else {
                return Ok(None);
            };
            let full_window = alpha <= -INFINITY && beta >= INFINITY;
            if full_window || (found.score > alpha && found.score < beta) {
                return Ok(Some(found));
            }

            window = window.saturating_mul(2);
            if attempts >= ASPIRATION_MAX_ATTEMPTS || window >= MATE_SCORE {
                alpha = -INFINITY;
                beta = INFINITY;
            } else {
                alpha = (found.score - window).max(-INFINITY);
                beta = (found.score + window).min(INFINITY);
            }
            log::trace!("aspiration re-search at depth {depth}: [{alpha}, {beta}]");
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn negamax(
        &mut self,
        state: &mut GameState,
        depth: u8,
        mut alpha: i32,
        beta: i32,
        ply: u8,
        prev_move: Option<u64>,
        allow_null: bool,
    ) -> SearchOutcome<ScoredMove> {
        let control = Arc::clone(&self.shared.control);
        let nodes = control.count_node();
        if self.interruptible && control.should_stop_in_tree(nodes) {
            return Ok(None);
        }

        let is_root = ply == 0;
        if !is_root && state.is_rule_draw() {
            return Ok(Some(ScoredMove::score_only(DRAW_SCORE)));
        }

        let alpha_orig = alpha;
        let mut tt_move = None;
        if let Some(entry) = self.probe_tt(state.zobrist_key) {
            tt_move = entry.best_move;
            if !is_root && entry.depth >= depth {
                let tt_score = tt_score_from_storage(entry.score, ply);
                let usable = match entry.bound {
                    Bound::Exact => true,
                    Bound::Lower => tt_score >= beta,
                    Bound::Upper => tt_score <= alpha,
                };
                if usable {
                    return Ok(Some(ScoredMove {
                        score: tt_score,
                        best_move: entry.best_move,
                    }));
                }
            }
        }

        if depth == 0 {
            return Ok(self
                .quiescence(state, alpha, beta, ply, 0)?
                .map(ScoredMove::score_only));
        }

        let side = state.side_to_move;
        let in_check = is_king_in_check(state, side);
        let pruning = self.shared.pruning;
        let static_eval = if in_check || !(pruning.futility || pruning.null_move) {
            None
        } else {
            Some(self.shared.scorer.score(state))
        };

        if pruning.null_move
            && allow_null
            && !is_root
            && depth >= NULL_MOVE_MIN_DEPTH
            && beta < MATE_TT_THRESHOLD
            && static_eval.is_some_and(|eval| eval >= beta)
            && has_non_pawn_material(state, side)
        {
            let reduction = if depth >= 6 { 3 } else { 2 };
            let mut passed = apply_null_move(state);
            let Some(reply) = self.negamax(
                &mut passed,
                depth.saturating_sub(1 + reduction),
                -beta,
                -beta + 1,
                ply.saturating_add(1),
                None,
                false,
            )?
            else {
                return Ok(None);
            };
            let score = -reply.score;
            if score >= beta {
                // A null-move cutoff never proves a mate.
                let bounded = if score >= MATE_TT_THRESHOLD { beta } else { score };
                return Ok(Some(ScoredMove::score_only(bounded)));
            }
        }

        let mut moves = legal_moves_in_place(state)?;
        if moves.is_empty() {
            return Ok(Some(ScoredMove::score_only(terminal_score(state, ply))));
        }

        let ply_idx = usize::from(ply).min(MAX_PLY - 1);
        self.heuristics
            .order_moves(&mut moves, tt_move, prev_move, ply_idx, side);

        let mut best = ScoredMove::score_only(-INFINITY);
        let mut first_child_nodes = 0u64;

        for (index, &mv) in moves.iter().enumerate() {
            if is_root && index > 0 && self.interruptible && control.should_stop_at_root() {
                return Ok(None);
            }

            if index == 1 && self.should_split(depth, first_child_nodes, moves.len() - 1) {
                let Some(pool) = self.pool else {
                    break;
                };
                let Some(folded) =
                    self.search_siblings_parallel(pool, state, &moves[1..], depth, alpha, beta, ply, in_check, best)?
                else {
                    return Ok(None);
                };
                best = folded;
                alpha = alpha.max(best.score);
                if alpha >= beta {
                    if let Some(cut) = best.best_move.filter(|&m| !move_is_tactical(m)) {
                        self.heuristics.record_cutoff(ply_idx, side, prev_move, cut, depth);
                    }
                }
                break;
            }

            let nodes_before = control.nodes();
            let quiet = !move_is_tactical(mv);
            let undo = make_move(state, mv)?;
            let gives_check = is_king_in_check(state, state.side_to_move);

            if !is_root && quiet && !in_check && !gives_check && best.score > -MATE_TT_THRESHOLD {
                let late_prune = pruning.late_move && should_lmp_prune(depth, index);
                let futile = pruning.futility
                    && depth <= 2
                    && static_eval.is_some_and(|eval| eval + futility_margin(depth) <= alpha);
                if late_prune || futile {
                    unmake_move(state, &undo);
                    continue;
                }
            }

            let reduction = if pruning.late_move {
                lmr_reduction(depth, index, quiet && !gives_check, in_check)
            } else {
                0
            };
            let child = self.search_child(state, depth, alpha, beta, ply, mv, index, reduction);
            unmake_move(state, &undo);
            let Some(score) = child? else {
                return Ok(None);
            };

            if index == 0 {
                first_child_nodes = control.nodes().saturating_sub(nodes_before);
            }
            if score > best.score {
                best = ScoredMove {
                    score,
                    best_move: Some(mv),
                };
            }
            if score > alpha {
                alpha = score;
            }
            if alpha >= beta {
                if quiet {
                    self.heuristics.record_cutoff(ply_idx, side, prev_move, mv, depth);
                }
                break;
            }
        }

        let bound = if best.score <= alpha_orig {
            Bound::Upper
        } else if best.score >= beta {
            Bound::Lower
        } else {
            Bound::Exact
        };
        self.store_tt(state.zobrist_key, depth, best.score, bound, best.best_move, ply);

        Ok(Some(best))
    }

    /// Search one child already made on `state` and return its score from the
    /// parent's side. The first move gets the full window; later moves get a
    /// (possibly reduced) null-window probe and are re-searched only if they
    /// beat alpha.
    #[allow(clippy::too_many_arguments)]
    fn search_child(
        &mut self,
        state: &mut GameState,
        depth: u8,
        alpha: i32,
        beta: i32,
        ply: u8,
        mv: u64,
        index: usize,
        reduction: u8,
    ) -> SearchOutcome<i32> {
        let child_depth = depth.saturating_sub(1);
        let next_ply = ply.saturating_add(1);

        if index == 0 {
            return Ok(self
                .negamax(state, child_depth, -beta, -alpha, next_ply, Some(mv), true)?
                .map(|reply| -reply.score));
        }

        let reduced = child_depth.saturating_sub(reduction);
        let Some(reply) = self.negamax(state, reduced, -alpha - 1, -alpha, next_ply, Some(mv), true)? else {
            return Ok(None);
        };
        let mut score = -reply.score;

        if score > alpha && reduced < child_depth {
            let Some(reply) = self.negamax(state, child_depth, -alpha - 1, -alpha, next_ply, Some(mv), true)? else {
                return Ok(None);
            };
            score = -reply.score;
        }

        if score > alpha && score < beta {
            let Some(reply) = self.negamax(state, child_depth, -beta, -alpha, next_ply, Some(mv), true)? else {
                return Ok(None);
            };
            score = -reply.score;
        }

        Ok(Some(score))
    }

    fn should_split(&self, depth: u8, first_child_nodes: u64, siblings: usize) -> bool {
        let parallel = self.shared.parallel;
        self.pool.is_some()
            && depth >= parallel.min_split_depth
            && first_child_nodes >= parallel.min_split_nodes
            && siblings >= parallel.min_split_siblings
    }

    /// Hand every sibling to the pool, each on its own copy of the board, and
    /// fold the answers in move order the way the sequential loop would.
    /// All handles are joined before returning, even after a stop or error.
    #[allow(clippy::too_many_arguments)]
    fn search_siblings_parallel(
        &mut self,
        pool: &WorkerPool,
        state: &GameState,
        siblings: &[u64],
        depth: u8,
        alpha: i32,
        beta: i32,
        ply: u8,
        parent_in_check: bool,
        mut best: ScoredMove,
    ) -> SearchOutcome<ScoredMove> {
        let mut handles: Vec<(u64, TaskHandle<SearchOutcome<i32>>)> = Vec::with_capacity(siblings.len());
        let mut first_error: Option<SearchError> = None;

        for (offset, &mv) in siblings.iter().enumerate() {
            let shared = self.shared.clone();
            let mut task_state = state.clone();
            let interruptible = self.interruptible;
            let index = offset + 1;
            let submitted = pool.submit(move || -> SearchOutcome<i32> {
                let quiet = !move_is_tactical(mv);
                make_move(&mut task_state, mv)?;
                let gives_check = is_king_in_check(&task_state, task_state.side_to_move);
                let reduction = if shared.pruning.late_move {
                    lmr_reduction(depth, index, quiet && !gives_check, parent_in_check)
                } else {
                    0
                };
                let mut helper = SearchWorker::new(shared, None, interruptible);
                helper.search_child(&mut task_state, depth, alpha, beta, ply, mv, index, reduction)
            });
            match submitted {
                Ok(handle) => handles.push((mv, handle)),
                Err(err) => {
                    first_error = Some(err.into());
                    break;
                }
            }
        }

        let mut stopped = false;
        let mut scores = Vec::with_capacity(handles.len());
        for (mv, handle) in handles {
            match handle.join() {
                Ok(Ok(Some(score))) => scores.push((mv, score)),
                Ok(Ok(None)) => stopped = true,
                Ok(Err(err)) => {
                    first_error.get_or_insert(err);
                }
                Err(err) => {
                    first_error.get_or_insert(err.into());
                }
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }
        if stopped {
            return Ok(None);
        }

        for (mv, score) in scores {
            if score > best.score {
                best = ScoredMove {
                    score,
                    best_move: Some(mv),
                };
            }
        }
        Ok(Some(best))
    }

    fn quiescence(&mut self, state: &mut GameState, mut alpha: i32, beta: i32, ply: u8, qply: u8) -> SearchOutcome<i32> {
        let control = Arc::clone(&self.shared.control);
        let nodes = control.count_node();
        if self.interruptible && control.should_stop_in_tree(nodes) {
            return Ok(None);
        }
        if state.is_rule_draw() {
            return Ok(Some(DRAW_SCORE));
        }

        let in_check = is_king_in_check(state, state.side_to_move);
        let moves = legal_moves_in_place(state)?;
        if moves.is_empty() {
            return Ok(Some(terminal_score(state, ply)));
        }

        let stand_pat = if in_check {
            None
        } else {
            Some(self.shared.scorer.score(state))
        };
        if let Some(eval) = stand_pat {
            if eval >= beta {
                return Ok(Some(eval));
            }
            alpha = alpha.max(eval);
        }
        if qply >= QUIESCENCE_MAX_PLY {
            return Ok(Some(stand_pat.unwrap_or_else(|| self.shared.scorer.score(state))));
        }

        let mut candidates: Vec<u64> = if in_check {
            moves
        } else {
            moves.into_iter().filter(|&mv| move_is_tactical(mv)).collect()
        };
        if let (Some(eval), true) = (stand_pat, self.shared.pruning.futility) {
            candidates.retain(|&mv| {
                move_is_promotion(mv) || eval + capture_gain(mv) + QUIESCENCE_DELTA_MARGIN > alpha
            });
        }
        candidates.sort_by_cached_key(|&mv| Reverse(tactical_order_score(mv)));

        let mut best = stand_pat.unwrap_or(-INFINITY);
        for mv in candidates {
            let undo = make_move(state, mv)?;
            let child = self.quiescence(state, -beta, -alpha, ply.saturating_add(1), qply + 1);
            unmake_move(state, &undo);
            let Some(score) = child? else {
                return Ok(None);
            };
            let score = -score;

            if score > best {
                best = score;
            }
            if score > alpha {
                alpha = score;
            }
            if alpha >= beta {
                break;
            }
        }

        Ok(Some(best))
    }

    fn probe_tt(&self, key: u64) -> Option<TTEntry> {
        self.shared.tt.as_ref().and_then(|tt| tt.probe(key))
    }

    fn store_tt(&self, key: u64, depth: u8, score: i32, bound: Bound, best_move: Option<u64>, ply: u8) {
        if let Some(tt) = &self.shared.tt {
            tt.store(TTEntry {
                key,
                depth,
                score: tt_score_for_storage(score, ply),
                bound,
                best_move,
                generation: 0,
            });
        }
    }
}

/// Mated side to move scores `-MATE_SCORE + ply`, so nearer mates rank
/// higher for the winner. Stalemate is a draw.
fn terminal_score(game_state: &GameState, ply: u8) -> i32 {
    if is_king_in_check(game_state, game_state.side_to_move) {
        -MATE_SCORE + i32::from(ply)
    } else {
        DRAW_SCORE
    }
}

/// Mate scores are stored relative to the node, not the root.
#[inline]
fn tt_score_for_storage(score: i32, ply: u8) -> i32 {
    if score >= MATE_TT_THRESHOLD {
        score + i32::from(ply)
    } else if score <= -MATE_TT_THRESHOLD {
        score - i32::from(ply)
    } else {
        score
    }
}

#[inline]
fn tt_score_from_storage(score: i32, ply: u8) -> i32 {
    if score >= MATE_TT_THRESHOLD {
        score - i32::from(ply)
    } else if score <= -MATE_TT_THRESHOLD {
        score + i32::from(ply)
    } else {
        score
    }
}

#[inline]
fn aspiration_initial_window(depth: u8) -> i32 {
    25 + i32::from(depth) * 10
}

#[inline]
fn futility_margin(depth: u8) -> i32 {
    if depth <= 1 {
        150
    } else {
        300
    }
}

#[inline]
fn should_lmp_prune(depth: u8, move_index: usize) -> bool {
    let threshold = match depth {
        0 | 1 => 3,
        2 => 6,
        3 => 10,
        _ => return false,
    };
    move_index >= threshold
}

#[inline]
fn lmr_reduction(depth: u8, move_index: usize, quiet: bool, in_check: bool) -> u8 {
    if !quiet || in_check || depth < 3 || move_index < 3 {
        0
    } else if depth >= 7 && move_index >= 8 {
        2
    } else {
        1
    }
}

fn has_non_pawn_material(game_state: &GameState, color: Color) -> bool {
    [PieceKind::Knight, PieceKind::Bishop, PieceKind::Rook, PieceKind::Queen]
        .iter()
        .any(|&kind| game_state.pieces_of(color, kind) != 0)
}

#[inline]
fn victim_value(move_description: u64) -> i32 {
    if !move_is_capture(move_description) {
        return 0;
    }
    // En-passant captures carry no victim code; the victim is a pawn.
    MaterialScorer::piece_value(move_captured_piece(move_description).unwrap_or(PieceKind::Pawn))
}

#[inline]
fn capture_gain(move_description: u64) -> i32 {
    let promotion = move_promotion_piece(move_description)
        .map_or(0, |kind| MaterialScorer::piece_value(kind) - MaterialScorer::piece_value(PieceKind::Pawn));
    victim_value(move_description) + promotion
}

/// MVV-LVA for captures, then promotions by promoted piece.
fn tactical_order_score(move_description: u64) -> i32 {
    let mut score = 0;
    if move_is_capture(move_description) {
        let aggressor = move_moved_piece(move_description).map_or(100, MaterialScorer::piece_value);
        score += 100_000 + victim_value(move_description) * 16 - aggressor;
    }
    if let Some(kind) = move_promotion_piece(move_description) {
        score += 90_000 + MaterialScorer::piece_value(kind);
    }
    score
}

type HistoryTable = [[[i32; 64]; 6]; 2];
type CounterMoveTable = [[u64; 64]; 6];

/// Quiet-move ordering memory. Each worker owns its own copy.
#[derive(Debug, Clone)]
struct SearchHeuristics {
    killers: [[u64; 2]; MAX_PLY],
    history: HistoryTable,
    countermove: CounterMoveTable,
}

impl Default for SearchHeuristics {
    fn default() -> Self {
        Self {
            killers: [[0; 2]; MAX_PLY],
            history: [[[0; 64]; 6]; 2],
            countermove: [[0; 64]; 6],
        }
    }
}

impl SearchHeuristics {
    fn reset_iteration(&mut self) {
        self.killers.fill([0; 2]);
    }

    fn order_moves(&self, moves: &mut [u64], tt_move: Option<u64>, prev_move: Option<u64>, ply: usize, side: Color) {
        let killers = self.killers[ply];
        let countermove = self.countermove_for(prev_move);
        moves.sort_by_cached_key(|&mv| {
            if Some(mv) == tt_move {
                return Reverse(1_000_000);
            }
            if move_is_tactical(mv) {
                return Reverse(tactical_order_score(mv));
            }
            let mut score = 0;
            if mv == killers[0] {
                score += 80_000;
            } else if mv == killers[1] {
                score += 70_000;
            }
            if Some(mv) == countermove {
                score += 60_000;
            }
            if let Some(piece) = move_moved_piece(mv) {
                score += self.history[side.index()][piece.index()][move_to(mv) as usize];
            }
            Reverse(score)
        });
    }

    fn record_cutoff(&mut self, ply: usize, side: Color, prev_move: Option<u64>, mv: u64, depth: u8) {
        if self.killers[ply][0] != mv {
            self.killers[ply][1] = self.killers[ply][0];
            self.killers[ply][0] = mv;
        }

        if let Some(piece) = move_moved_piece(mv) {
            let bonus = i32::from(depth) * i32::from(depth);
            let entry = &mut self.history[side.index()][piece.index()][move_to(mv) as usize];
            *entry = (*entry + bonus).min(HISTORY_CAP);
        }

        if let Some((prev_piece, prev_to)) = prev_move.and_then(move_meta) {
            self.countermove[prev_piece.index()][prev_to] = mv;
        }
    }

    fn countermove_for(&self, prev_move: Option<u64>) -> Option<u64> {
        let (piece, to) = prev_move.and_then(move_meta)?;
        let mv = self.countermove[piece.index()][to];
        (mv != 0).then_some(mv)
    }
}

#[inline]
fn move_meta(move_description: u64) -> Option<(PieceKind, usize)> {
    let piece = move_moved_piece(move_description)?;
    Some((piece, move_to(move_description) as usize))
}
