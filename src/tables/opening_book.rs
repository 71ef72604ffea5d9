//! Opening book keyed by position Zobrist hash.
//!
//! Two source formats are understood:
//! - a TSV of opening lines (`eco  name  pgn  uci  epd`, or any header with a
//!   `uci` / `moves` column and an optional `weight` / `count` column). Every
//!   prefix position of every line contributes its next move, weighted by the
//!   row weight.
//! - a CSV of `hash,total,move1,count1,move2,count2,move3,count3` rows, as
//!   written by [`OpeningBook::to_csv_string`].
//!
//! Book replies are kept as move text and resolved against the legal moves of
//! the probed position, so a stale or corrupt entry can never be played.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rand::Rng;
use thiserror::Error;

use crate::game_state::game_state::GameState;
use crate::move_generation::legal_move_apply::apply_move;
use crate::move_generation::legal_move_generator::legal_moves;
use crate::move_generation::move_generator::MoveGenerationError;
use crate::utils::long_algebraic::{
    long_algebraic_to_move_description, move_description_to_long_algebraic, parse_move_text,
    resolve_move_text, MoveTextError,
};

/// Replies kept per position in the CSV export.
pub const CSV_REPLIES_PER_POSITION: usize = 3;

const CSV_HEADER: &str = "hash,total,move1,count1,move2,count2,move3,count3";

#[derive(Debug, Error)]
pub enum BookError {
    #[error("failed to read opening book {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("opening book is empty")]
    Empty,
    #[error("opening TSV must contain a 'uci' or 'moves' column")]
    MissingMoveColumn,
    #[error("line {line}: {reason}")]
    Row { line: usize, reason: String },
    #[error("line {line}: move {token:?}: {source}")]
    Move {
        line: usize,
        token: String,
        #[source]
        source: MoveTextError,
    },
    #[error("line {line}: {source}")]
    Apply {
        line: usize,
        #[source]
        source: MoveGenerationError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookMove {
    /// Coordinate move text, e.g. `e2e4`.
    pub text: String,
    pub weight: u32,
}

#[derive(Debug, Clone, Default)]
pub struct OpeningBook {
    by_hash: HashMap<u64, Vec<BookMove>>,
}

impl OpeningBook {
    /// Small built-in book used when no data file is configured.
    pub fn embedded() -> Result<Self, BookError> {
        Self::from_tsv_str(include_str!("data/opening_book_minimal.tsv"))
    }

    /// Load by extension: `.csv` is the hash-keyed format, anything else TSV.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, BookError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| BookError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv {
            Self::from_csv_str(&data)
        } else {
            Self::from_tsv_str(&data)
        }
    }

    pub fn from_tsv_str(tsv: &str) -> Result<Self, BookError> {
        let mut lines = tsv
            .lines()
            .enumerate()
            .map(|(index, line)| (index + 1, line))
            .filter(|(_, line)| !line.trim().is_empty());
        let (_, header) = lines.next().ok_or(BookError::Empty)?;

        let mut uci_idx = None;
        let mut moves_idx = None;
        let mut weight_idx = None;
        for (i, name) in header.split('\t').enumerate() {
            match name.trim().to_ascii_lowercase().as_str() {
                "uci" => uci_idx = Some(i),
                "moves" => moves_idx = Some(i),
                "weight" | "count" | "plays" => weight_idx = Some(i),
                _ => {}
            }
        }
        let sequence_idx = uci_idx.or(moves_idx).ok_or(BookError::MissingMoveColumn)?;

        let mut counts: HashMap<u64, HashMap<u64, u32>> = HashMap::new();
        for (line_no, line) in lines {
            let fields: Vec<&str> = line.split('\t').collect();
            let sequence = fields
                .get(sequence_idx)
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| BookError::Row {
                    line: line_no,
                    reason: "missing move sequence".to_owned(),
                })?;
            let row_weight = weight_idx
                .and_then(|idx| fields.get(idx))
                .and_then(|w| w.trim().parse::<u32>().ok())
                .unwrap_or(1)
                .max(1);

            let mut state = GameState::new_game();
            for token in sequence.split_whitespace() {
                let mv = long_algebraic_to_move_description(token, &state).map_err(|source| BookError::Move {
                    line: line_no,
                    token: token.to_owned(),
                    source,
                })?;
                let weight = counts.entry(state.zobrist_key).or_default().entry(mv).or_insert(0);
                *weight = weight.saturating_add(row_weight);
                state = apply_move(&state, mv).map_err(|err| BookError::Apply {
                    line: line_no,
                    source: err.into(),
                })?;
            }
        }

        let by_hash = counts
            .into_iter()
            .map(|(hash, moves)| {
                let replies = moves
                    .into_iter()
                    .map(|(mv, weight)| BookMove {
                        text: move_description_to_long_algebraic(mv),
                        weight,
                    })
                    .collect();
                (hash, sorted_replies(replies))
            })
            .collect();
        Ok(Self { by_hash })
    }

    pub fn from_csv_str(csv: &str) -> Result<Self, BookError> {
        let mut by_hash: HashMap<u64, Vec<BookMove>> = HashMap::new();
        for (index, line) in csv.lines().enumerate() {
            let line_no = index + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with("hash") {
                continue;
            }
            let row_error = |reason: &str| BookError::Row {
                line: line_no,
                reason: reason.to_owned(),
            };

            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() < 2 || fields.len() % 2 != 0 {
                return Err(row_error("expected hash,total followed by move,count pairs"));
            }
            let hash = fields[0].parse::<u64>().map_err(|_| row_error("bad position hash"))?;
            fields[1].parse::<u64>().map_err(|_| row_error("bad total"))?;

            let replies = by_hash.entry(hash).or_default();
            for pair in fields[2..].chunks_exact(2) {
                if pair[0].is_empty() {
                    continue;
                }
                parse_move_text(pair[0]).map_err(|source| BookError::Move {
                    line: line_no,
                    token: pair[0].to_owned(),
                    source,
                })?;
                let weight = pair[1].parse::<u32>().map_err(|_| row_error("bad reply count"))?;
                replies.push(BookMove {
                    text: pair[0].to_owned(),
                    weight,
                });
            }
        }
        by_hash.retain(|_, replies| !replies.is_empty());
        Ok(Self { by_hash })
    }

    /// Export in the hash-keyed CSV format with the most frequent replies
    /// first. Rows are ordered by hash.
    pub fn to_csv_string(&self) -> String {
        let mut hashes: Vec<u64> = self.by_hash.keys().copied().collect();
        hashes.sort_unstable();

        let mut out = String::from(CSV_HEADER);
        out.push('\n');
        for hash in hashes {
            let replies = &self.by_hash[&hash];
            let total: u64 = replies.iter().map(|m| u64::from(m.weight)).sum();
            let _ = write!(out, "{hash},{total}");
            for slot in 0..CSV_REPLIES_PER_POSITION {
                match replies.get(slot) {
                    Some(reply) => {
                        let _ = write!(out, ",{},{}", reply.text, reply.weight);
                    }
                    None => out.push_str(",,"),
                }
            }
            out.push('\n');
        }
        out
    }

    /// Number of positions with at least one reply.
    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    pub fn moves_for(&self, game_state: &GameState) -> Option<&[BookMove]> {
        self.by_hash.get(&game_state.zobrist_key).map(Vec::as_slice)
    }

    /// Book replies that are legal in `game_state`, with their weights.
    /// Entries that do not resolve are logged and skipped.
    pub fn legal_replies(&self, game_state: &GameState) -> Result<Vec<(u64, u32)>, MoveGenerationError> {
        let Some(replies) = self.moves_for(game_state) else {
            return Ok(Vec::new());
        };
        let legal = legal_moves(game_state)?;
        let resolved = replies
            .iter()
            .filter_map(|reply| {
                let resolved = parse_move_text(&reply.text)
                    .and_then(|parsed| resolve_move_text(&reply.text, parsed, &legal));
                match resolved {
                    Ok(mv) => Some((mv, reply.weight)),
                    Err(err) => {
                        log::warn!("discarding book move {}: {err}", reply.text);
                        None
                    }
                }
            })
            .collect();
        Ok(resolved)
    }

    /// Weighted random pick among the legal book replies.
    pub fn choose_weighted_move<R: Rng + ?Sized>(
        &self,
        game_state: &GameState,
        rng: &mut R,
    ) -> Result<Option<u64>, MoveGenerationError> {
        let replies = self.legal_replies(game_state)?;
        let Some(&(first, _)) = replies.first() else {
            return Ok(None);
        };

        let total_weight: u64 = replies.iter().map(|&(_, w)| u64::from(w)).sum();
        if total_weight == 0 {
            return Ok(Some(first));
        }

        let mut pick = rng.random_range(0..total_weight);
        for &(mv, weight) in &replies {
            let weight = u64::from(weight);
            if pick < weight {
                return Ok(Some(mv));
            }
            pick -= weight;
        }
        Ok(Some(first))
    }
}

fn sorted_replies(mut replies: Vec<BookMove>) -> Vec<BookMove> {
    replies.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.text.cmp(&b.text)));
    replies
}
