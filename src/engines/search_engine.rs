//! The playing engine: opening book, then endgame oracle, then search.
//!
//! Advisor answers are always resolved against the legal moves of the
//! position. An advisor that misses, errors, or suggests an illegal move
//! simply falls through to the next source.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::EngineConfig;
use crate::engines::engine_trait::{Engine, EngineError, EngineOutput, GoParams, MoveSource};
use crate::game_state::game_state::GameState;
use crate::move_generation::legal_move_generator::legal_moves;
use crate::move_generation::move_generator::MoveGenerationError;
use crate::search::board_scoring::{BoardScorer, StandardScorer};
use crate::search::iterative_deepening::{SearchConfig, Searcher};
use crate::tables::endgame_oracle::{EndgameOracle, OracleAnswer, OracleQuery, TableFileOracle, UnavailableOracle};
use crate::tables::opening_book::OpeningBook;
use crate::utils::long_algebraic::{move_description_to_long_algebraic, resolve_move_text};

pub struct SearchEngine {
    searcher: Searcher,
    base_config: SearchConfig,
    book: Option<OpeningBook>,
    opening_min_depth: u8,
    oracle: Box<dyn EndgameOracle>,
    rng: StdRng,
    stop_signal: Option<Arc<AtomicBool>>,
}

impl SearchEngine {
    pub fn new(searcher: Searcher, base_config: SearchConfig) -> Self {
        Self {
            searcher,
            base_config,
            book: None,
            opening_min_depth: 3,
            oracle: Box::new(UnavailableOracle),
            rng: StdRng::from_os_rng(),
            stop_signal: None,
        }
    }

    /// Build from configuration. Book and table files that fail to load are
    /// logged and left out; only a failing worker pool is an error.
    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        let scorer: Arc<dyn BoardScorer> = Arc::new(StandardScorer);
        let searcher = Searcher::new(scorer, config.hash_mb).with_threads(config.threads)?;
        let mut engine = Self::new(searcher, config.search_config());

        let book = match &config.opening_book {
            Some(path) => OpeningBook::from_path(path)
                .inspect_err(|err| log::warn!("opening book disabled: {err}"))
                .ok(),
            None if config.embedded_book => OpeningBook::embedded()
                .inspect_err(|err| log::warn!("embedded opening book disabled: {err}"))
                .ok(),
            None => None,
        };
        if let Some(book) = book {
            log::info!("opening book loaded with {} positions", book.len());
            engine = engine.with_book(book, config.opening_min_depth);
        }

        if let Some(path) = &config.endgame_table {
            match TableFileOracle::from_path(path) {
                Ok(oracle) => {
                    log::info!(
                        "endgame table loaded with {} positions, up to {} pieces",
                        oracle.len(),
                        oracle.max_pieces()
                    );
                    engine = engine.with_oracle(Box::new(oracle));
                }
                Err(err) => log::warn!("endgame table disabled: {err}"),
            }
        }

        Ok(engine)
    }

    pub fn with_book(mut self, book: OpeningBook, opening_min_depth: u8) -> Self {
        self.book = Some(book);
        self.opening_min_depth = opening_min_depth;
        self
    }

    pub fn with_oracle(mut self, oracle: Box<dyn EndgameOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn searcher(&self) -> &Searcher {
        &self.searcher
    }

    fn book_move(&mut self, game_state: &GameState, depth: u8) -> Result<Option<u64>, MoveGenerationError> {
        if depth < self.opening_min_depth {
            return Ok(None);
        }
        let Some(book) = &self.book else {
            return Ok(None);
        };
        book.choose_weighted_move(game_state, &mut self.rng)
    }

    fn oracle_move(&self, game_state: &GameState) -> Result<Option<(u64, OracleAnswer)>, MoveGenerationError> {
        let query = OracleQuery::from_game_state(game_state);
        if query.piece_count() > self.oracle.max_pieces() {
            return Ok(None);
        }
        let answer = match self.oracle.probe(&query) {
            Ok(Some(answer)) => answer,
            Ok(None) => return Ok(None),
            Err(err) => {
                log::debug!("endgame oracle gave no answer: {err}");
                return Ok(None);
            }
        };

        let legal = legal_moves(game_state)?;
        let text = answer.best_move.to_string();
        match resolve_move_text(&text, answer.best_move, &legal) {
            Ok(mv) => Ok(Some((mv, answer))),
            Err(err) => {
                log::warn!("discarding endgame oracle move: {err}");
                Ok(None)
            }
        }
    }

    fn search_config_for(&self, params: &GoParams) -> SearchConfig {
        let mut config = self.base_config.clone();
        if let Some(depth) = params.depth {
            config.max_depth = depth;
        }
        if params.movetime_ms.is_some() {
            config.movetime_ms = params.movetime_ms;
        }
        if params.max_nodes.is_some() {
            config.max_nodes = params.max_nodes;
        }
        if self.stop_signal.is_some() {
            config.stop_flag = self.stop_signal.clone();
        }
        config
    }
}

impl Engine for SearchEngine {
    fn new_game(&mut self) {
        self.searcher.clear_table();
    }

    fn set_stop_signal(&mut self, stop_signal: Option<Arc<AtomicBool>>) {
        self.stop_signal = stop_signal;
    }

    fn choose_move(&mut self, game_state: &GameState, params: &GoParams) -> Result<EngineOutput, EngineError> {
        game_state.validate().map_err(MoveGenerationError::InvalidState)?;
        let config = self.search_config_for(params);

        if let Some(mv) = self.book_move(game_state, config.max_depth)? {
            let text = move_description_to_long_algebraic(mv);
            log::info!("book move {text}");
            return Ok(EngineOutput::advisor(mv, MoveSource::Book, format!("book {text}")));
        }

        if let Some((mv, answer)) = self.oracle_move(game_state)? {
            let text = move_description_to_long_algebraic(mv);
            log::info!("endgame oracle move {text} ({:?} in {})", answer.outcome, answer.distance);
            return Ok(EngineOutput::advisor(
                mv,
                MoveSource::Oracle,
                format!("oracle {text} {:?} distance {}", answer.outcome, answer.distance),
            ));
        }

        let result = self.searcher.search(game_state, &config)?;
        let pv_text = result
            .principal_variation
            .iter()
            .map(|&mv| move_description_to_long_algebraic(mv))
            .collect::<Vec<_>>()
            .join(" ");
        let info = format!(
            "depth {} score {} nodes {} nps {} time {}ms pv {pv_text}",
            result.reached_depth, result.best_score, result.nodes, result.nps, result.elapsed_ms
        );
        if let Some(mv) = result.best_move {
            log::info!("search move {} ({info})", move_description_to_long_algebraic(mv));
        }

        Ok(EngineOutput {
            best_move: result.best_move,
            source: MoveSource::Search,
            score: Some(result.best_score),
            depth: result.reached_depth,
            nodes: result.nodes,
            principal_variation: result.principal_variation,
            info_lines: vec![info],
        })
    }
}
