//! Endgame oracle interface and a file-backed table implementation.
//!
//! An oracle answers exact best moves for positions with few pieces. Queries
//! are a normalised view of the board (piece-type masks shared by both
//! colours plus one mask per colour), matching how tablebase probers take
//! their input. Every error is recoverable: callers treat it as "no answer".

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::game_state::{chess_types::*, game_state::GameState};
use crate::move_generation::legal_move_generator::legal_moves;
use crate::utils::fen_parser::FenError;
use crate::utils::long_algebraic::{parse_move_text, resolve_move_text, MoveText, MoveTextError};

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("endgame oracle has no data loaded")]
    NotInitialized,
    #[error("position has {pieces} pieces, oracle covers at most {max}")]
    TooManyPieces { pieces: u32, max: u32 },
    #[error("failed to read endgame table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("line {line}: {source}")]
    Fen {
        line: usize,
        #[source]
        source: FenError,
    },
    #[error("line {line}: {source}")]
    Move {
        line: usize,
        #[source]
        source: MoveTextError,
    },
}

/// Board view handed to an oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OracleQuery {
    pub white: u64,
    pub black: u64,
    pub kings: u64,
    pub queens: u64,
    pub rooks: u64,
    pub bishops: u64,
    pub knights: u64,
    pub pawns: u64,
    pub white_to_move: bool,
    pub castling: CastlingRights,
    pub en_passant: Option<Square>,
    pub rule50: u16,
}

impl OracleQuery {
    pub fn from_game_state(game_state: &GameState) -> Self {
        let both = |kind: PieceKind| {
            game_state.pieces_of(Color::Light, kind) | game_state.pieces_of(Color::Dark, kind)
        };
        Self {
            white: game_state.occupancy_by_color[Color::Light.index()],
            black: game_state.occupancy_by_color[Color::Dark.index()],
            kings: both(PieceKind::King),
            queens: both(PieceKind::Queen),
            rooks: both(PieceKind::Rook),
            bishops: both(PieceKind::Bishop),
            knights: both(PieceKind::Knight),
            pawns: both(PieceKind::Pawn),
            white_to_move: game_state.side_to_move == Color::Light,
            castling: game_state.castling_rights,
            en_passant: game_state.en_passant_square,
            rule50: game_state.halfmove_clock,
        }
    }

    #[inline]
    pub fn piece_count(&self) -> u32 {
        (self.white | self.black).count_ones()
    }

    /// Identity of the position, ignoring the rule-50 clock.
    fn position_key(&self) -> PositionKey {
        PositionKey {
            masks: [
                self.white,
                self.black,
                self.kings,
                self.queens,
                self.rooks,
                self.bishops,
                self.knights,
                self.pawns,
            ],
            white_to_move: self.white_to_move,
            castling: self.castling,
            en_passant: self.en_passant,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PositionKey {
    masks: [u64; 8],
    white_to_move: bool,
    castling: CastlingRights,
    en_passant: Option<Square>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleOutcome {
    Win,
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OracleAnswer {
    /// Unresolved move text; the caller checks it against its legal moves.
    pub best_move: MoveText,
    pub outcome: OracleOutcome,
    /// Moves to the outcome; 0 for draws.
    pub distance: u32,
}

pub trait EndgameOracle: Send + Sync {
    /// Largest piece count, kings included, the oracle can answer.
    fn max_pieces(&self) -> u32;

    /// `Ok(None)` when the position is covered but has no move worth
    /// playing (not found, or lost for the side to move).
    fn probe(&self, query: &OracleQuery) -> Result<Option<OracleAnswer>, OracleError>;
}

/// Stand-in used when no table path is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableOracle;

impl EndgameOracle for UnavailableOracle {
    fn max_pieces(&self) -> u32 {
        0
    }

    fn probe(&self, _query: &OracleQuery) -> Result<Option<OracleAnswer>, OracleError> {
        Err(OracleError::NotInitialized)
    }
}

#[derive(Debug, Clone, Copy)]
struct TableEntry {
    best_move: MoveText,
    /// Positive: side to move wins in this many moves. Zero: draw.
    /// Negative: side to move loses.
    distance: i32,
}

/// Oracle backed by a TSV of `fen  best_move  distance` rows.
///
/// Lines starting with `#` and a leading `fen` header are skipped. Each best
/// move is checked for legality when the file is loaded.
#[derive(Debug, Clone, Default)]
pub struct TableFileOracle {
    entries: HashMap<PositionKey, TableEntry>,
    max_pieces: u32,
}

impl TableFileOracle {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, OracleError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| OracleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_tsv_str(&data)
    }

    pub fn from_tsv_str(tsv: &str) -> Result<Self, OracleError> {
        let mut oracle = Self::default();
        for (index, raw) in tsv.lines().enumerate() {
            let line = index + 1;
            let row = raw.trim();
            if row.is_empty() || row.starts_with('#') || row.starts_with("fen\t") {
                continue;
            }

            let fields: Vec<&str> = row.split('\t').map(str::trim).collect();
            let [fen, best_move, distance] = fields[..] else {
                return Err(OracleError::Parse {
                    line,
                    reason: format!("expected 3 tab-separated fields, found {}", fields.len()),
                });
            };

            let game_state = GameState::from_fen(fen).map_err(|source| OracleError::Fen { line, source })?;
            let distance = distance.parse::<i32>().map_err(|_| OracleError::Parse {
                line,
                reason: format!("bad distance {distance:?}"),
            })?;
            let parsed = parse_move_text(best_move).map_err(|source| OracleError::Move { line, source })?;
            let legal = legal_moves(&game_state).map_err(|err| OracleError::Move {
                line,
                source: err.into(),
            })?;
            resolve_move_text(best_move, parsed, &legal).map_err(|source| OracleError::Move { line, source })?;

            let query = OracleQuery::from_game_state(&game_state);
            oracle.max_pieces = oracle.max_pieces.max(query.piece_count());
            oracle.entries.insert(
                query.position_key(),
                TableEntry {
                    best_move: parsed,
                    distance,
                },
            );
        }
        Ok(oracle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl EndgameOracle for TableFileOracle {
    fn max_pieces(&self) -> u32 {
        self.max_pieces
    }

    fn probe(&self, query: &OracleQuery) -> Result<Option<OracleAnswer>, OracleError> {
        if self.entries.is_empty() {
            return Err(OracleError::NotInitialized);
        }
        let pieces = query.piece_count();
        if pieces > self.max_pieces {
            return Err(OracleError::TooManyPieces {
                pieces,
                max: self.max_pieces,
            });
        }

        let Some(entry) = self.entries.get(&query.position_key()) else {
            return Ok(None);
        };
        let answer = match entry.distance {
            d if d > 0 => Some(OracleAnswer {
                best_move: entry.best_move,
                outcome: OracleOutcome::Win,
                distance: d.unsigned_abs(),
            }),
            0 => Some(OracleAnswer {
                best_move: entry.best_move,
                outcome: OracleOutcome::Draw,
                distance: 0,
            }),
            _ => None,
        };
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::{EndgameOracle, OracleError, OracleOutcome, OracleQuery, TableFileOracle, UnavailableOracle};
    use crate::game_state::game_state::GameState;
    use crate::utils::long_algebraic::parse_move_text;

    const TABLE: &str = "fen\tbest_move\tdistance\n\
        # KQ vs K\n\
        6k1/8/6K1/8/8/8/8/5Q2 w - - 0 1\tf1f7\t1\n\
        7k/8/6K1/8/8/8/8/8 w - - 0 1\tg6f6\t0\n\
        6k1/8/6K1/8/8/8/8/5q2 w - - 0 1\tg6h6\t-3\n";

    fn query(fen: &str) -> OracleQuery {
        OracleQuery::from_game_state(&GameState::from_fen(fen).expect("FEN should parse"))
    }

    #[test]
    fn query_normalises_piece_masks() {
        let q = query("6k1/8/6K1/8/8/8/8/5Q2 w - - 7 1");
        assert_eq!(q.piece_count(), 3);
        assert_eq!(q.kings.count_ones(), 2);
        assert_eq!(q.queens, 1 << 5);
        assert_eq!(q.white & q.black, 0);
        assert!(q.white_to_move);
        assert_eq!(q.rule50, 7);
    }

    #[test]
    fn winning_and_drawing_entries_answer() {
        let oracle = TableFileOracle::from_tsv_str(TABLE).expect("table should load");
        assert_eq!(oracle.len(), 3);
        assert_eq!(oracle.max_pieces(), 3);

        // The rule-50 clock does not affect the lookup.
        let win = oracle
            .probe(&query("6k1/8/6K1/8/8/8/8/5Q2 w - - 12 40"))
            .expect("probe should succeed")
            .expect("winning entry should answer");
        assert_eq!(win.outcome, OracleOutcome::Win);
        assert_eq!(win.distance, 1);
        assert_eq!(win.best_move, parse_move_text("f1f7").expect("move text"));

        let draw = oracle
            .probe(&query("7k/8/6K1/8/8/8/8/8 w - - 0 1"))
            .expect("probe should succeed")
            .expect("drawing entry should answer");
        assert_eq!(draw.outcome, OracleOutcome::Draw);
    }

    #[test]
    fn losing_and_missing_entries_give_no_move() {
        let oracle = TableFileOracle::from_tsv_str(TABLE).expect("table should load");
        assert_eq!(
            oracle
                .probe(&query("6k1/8/6K1/8/8/8/8/5q2 w - - 0 1"))
                .expect("probe should succeed"),
            None
        );
        assert_eq!(
            oracle
                .probe(&query("6k1/8/5K2/8/8/8/8/5Q2 w - - 0 1"))
                .expect("probe should succeed"),
            None
        );
    }

    #[test]
    fn oversized_and_uninitialised_queries_fail() {
        let oracle = TableFileOracle::from_tsv_str(TABLE).expect("table should load");
        let start = OracleQuery::from_game_state(&GameState::new_game());
        assert!(matches!(
            oracle.probe(&start),
            Err(OracleError::TooManyPieces { pieces: 32, max: 3 })
        ));
        assert!(matches!(UnavailableOracle.probe(&start), Err(OracleError::NotInitialized)));
        assert!(matches!(
            TableFileOracle::default().probe(&start),
            Err(OracleError::NotInitialized)
        ));
    }

    #[test]
    fn illegal_table_move_is_rejected_at_load() {
        let bad = "6k1/8/6K1/8/8/8/8/5Q2 w - - 0 1\tf1f8x\t1\n";
        assert!(matches!(
            TableFileOracle::from_tsv_str(bad),
            Err(OracleError::Move { line: 1, .. })
        ));
        let illegal = "6k1/8/6K1/8/8/8/8/5Q2 w - - 0 1\tg6g7\t1\n";
        assert!(matches!(
            TableFileOracle::from_tsv_str(illegal),
            Err(OracleError::Move { line: 1, .. })
        ));
        assert!(matches!(
            TableFileOracle::from_tsv_str("8/8/8/8/8/8/8/8 w - - 0 1\ta1a2\n"),
            Err(OracleError::Parse { line: 1, .. })
        ));
    }
}
