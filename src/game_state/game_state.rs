//! Core board state representation.
//!
//! `GameState` stores piece bitboards, occupancy caches, a square mailbox,
//! turn/state flags, clocks, and an incrementally maintained Zobrist key. All
//! piece mutation goes through `place_piece` / `remove_piece` so the three
//! placement views and the hash never drift apart.

use thiserror::Error;

use crate::game_state::chess_rules::{FIFTY_MOVE_HALFMOVES, REPETITION_DRAW_COUNT};
use crate::game_state::chess_types::*;
use crate::search::zobrist::{
    castling_key, compute_zobrist_key, en_passant_file_key, piece_square_key, side_to_move_key,
};
use crate::utils::fen_generator::generate_fen;
use crate::utils::fen_parser::{parse_fen, FenError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameStateError {
    #[error("square {square} mailbox holds {mailbox:?} but bitboards hold {bitboards:?}")]
    PlacementMismatch {
        square: Square,
        mailbox: Option<Piece>,
        bitboards: Option<Piece>,
    },
    #[error("occupancy caches disagree with piece bitboards")]
    OccupancyMismatch,
    #[error("{0:?} must have exactly one king, found {1}")]
    KingCount(Color, u32),
    #[error("pawn found on a back rank at square {0}")]
    PawnOnBackRank(Square),
    #[error("incremental hash {incremental:#018x} differs from recomputed {recomputed:#018x}")]
    HashMismatch { incremental: u64, recomputed: u64 },
}

/// Board state optimized for copy-based branching and exact make/unmake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    // [color][piece_kind]
    pub pieces: [[u64; 6]; 2],

    pub occupancy_by_color: [u64; 2],
    pub occupancy_all: u64,

    /// Dense square -> piece lookup mirroring `pieces`.
    pub mailbox: [Option<Piece>; 64],

    pub side_to_move: Color,
    pub castling_rights: CastlingRights,
    pub en_passant_square: Option<Square>,

    pub halfmove_clock: u16,
    pub fullmove_number: u16,

    pub zobrist_key: u64,

    /// Plies played since this state was constructed.
    pub ply: u16,
    /// Hashes of every earlier position, oldest first.
    pub repetition_history: Vec<u64>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            pieces: [[0; 6]; 2],
            occupancy_by_color: [0; 2],
            occupancy_all: 0,
            mailbox: [None; 64],

            side_to_move: Color::Light,
            castling_rights: 0,
            en_passant_square: None,

            halfmove_clock: 0,
            fullmove_number: 1,

            zobrist_key: 0,

            ply: 0,
            repetition_history: Vec::new(),
        }
    }
}

impl GameState {
    /// Empty board with light to move and no hash contributions.
    #[inline]
    pub fn new_empty() -> Self {
        let mut state = Self::default();
        state.refresh_hash();
        state
    }

    /// Standard starting position, built square by square so it cannot fail.
    pub fn new_game() -> Self {
        const BACK_RANK: [PieceKind; 8] = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];

        let mut state = Self::new_empty();
        for (file, kind) in BACK_RANK.into_iter().enumerate() {
            let file = file as Square;
            state.place_piece(Color::Light, kind, file);
            state.place_piece(Color::Light, PieceKind::Pawn, 8 + file);
            state.place_piece(Color::Dark, PieceKind::Pawn, 48 + file);
            state.place_piece(Color::Dark, kind, 56 + file);
        }
        state.set_castling_rights(
            CASTLE_LIGHT_KINGSIDE | CASTLE_LIGHT_QUEENSIDE | CASTLE_DARK_KINGSIDE | CASTLE_DARK_QUEENSIDE,
        );
        state
    }

    #[inline]
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        parse_fen(fen)
    }

    #[inline]
    pub fn get_fen(&self) -> String {
        generate_fen(self)
    }

    #[inline]
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.mailbox[square as usize]
    }

    #[inline]
    pub fn pieces_of(&self, color: Color, kind: PieceKind) -> u64 {
        self.pieces[color.index()][kind.index()]
    }

    #[inline]
    pub fn piece_count(&self) -> u32 {
        self.occupancy_all.count_ones()
    }

    /// Put a piece on an empty square, updating bitboards, mailbox and hash.
    #[inline]
    pub fn place_piece(&mut self, color: Color, kind: PieceKind, square: Square) {
        let mask = 1u64 << square;
        debug_assert!(self.mailbox[square as usize].is_none());
        self.pieces[color.index()][kind.index()] |= mask;
        self.occupancy_by_color[color.index()] |= mask;
        self.occupancy_all |= mask;
        self.mailbox[square as usize] = Some(Piece::new(color, kind));
        self.zobrist_key ^= piece_square_key(color, kind, square);
    }

    /// Lift whatever stands on `square`, updating bitboards, mailbox and hash.
    #[inline]
    pub fn remove_piece(&mut self, square: Square) -> Option<Piece> {
        let piece = self.mailbox[square as usize].take()?;
        let mask = !(1u64 << square);
        self.pieces[piece.color.index()][piece.kind.index()] &= mask;
        self.occupancy_by_color[piece.color.index()] &= mask;
        self.occupancy_all &= mask;
        self.zobrist_key ^= piece_square_key(piece.color, piece.kind, square);
        Some(piece)
    }

    #[inline]
    pub fn set_castling_rights(&mut self, rights: CastlingRights) {
        self.zobrist_key ^= castling_key(self.castling_rights);
        self.castling_rights = rights & 0x0F;
        self.zobrist_key ^= castling_key(self.castling_rights);
    }

    #[inline]
    pub fn set_en_passant_square(&mut self, square: Option<Square>) {
        if let Some(old) = self.en_passant_square {
            self.zobrist_key ^= en_passant_file_key(square_file(old));
        }
        self.en_passant_square = square;
        if let Some(new) = square {
            self.zobrist_key ^= en_passant_file_key(square_file(new));
        }
    }

    #[inline]
    pub fn flip_side_to_move(&mut self) {
        self.side_to_move = self.side_to_move.opposite();
        self.zobrist_key ^= side_to_move_key();
    }

    #[inline]
    pub fn refresh_hash(&mut self) {
        self.zobrist_key = compute_zobrist_key(self);
    }

    /// Fifty-move rule or threefold repetition.
    pub fn is_rule_draw(&self) -> bool {
        self.halfmove_clock >= FIFTY_MOVE_HALFMOVES || self.repetition_count() >= REPETITION_DRAW_COUNT
    }

    /// Occurrences of the current position, counting itself, since the last
    /// irreversible move.
    pub fn repetition_count(&self) -> usize {
        let window = usize::from(self.halfmove_clock).min(self.repetition_history.len());
        1 + self
            .repetition_history
            .iter()
            .rev()
            .take(window)
            .skip(1)
            .step_by(2)
            .filter(|&&key| key == self.zobrist_key)
            .count()
    }

    /// Check every cross-view invariant. A failure means a make/unmake or
    /// construction bug.
    pub fn validate(&self) -> Result<(), GameStateError> {
        let mut by_color = [0u64; 2];
        for color in [Color::Light, Color::Dark] {
            for kind in ALL_PIECE_KINDS {
                by_color[color.index()] |= self.pieces_of(color, kind);
            }
            let kings = self.pieces_of(color, PieceKind::King).count_ones();
            if kings != 1 {
                return Err(GameStateError::KingCount(color, kings));
            }
        }
        if by_color != self.occupancy_by_color || (by_color[0] | by_color[1]) != self.occupancy_all {
            return Err(GameStateError::OccupancyMismatch);
        }

        for square in 0..64u8 {
            let from_boards = self.piece_from_bitboards(square);
            let from_mailbox = self.mailbox[square as usize];
            if from_boards != from_mailbox {
                return Err(GameStateError::PlacementMismatch {
                    square,
                    mailbox: from_mailbox,
                    bitboards: from_boards,
                });
            }
        }

        let pawns = self.pieces_of(Color::Light, PieceKind::Pawn)
            | self.pieces_of(Color::Dark, PieceKind::Pawn);
        let back_ranks = 0xFF00_0000_0000_00FFu64;
        if pawns & back_ranks != 0 {
            return Err(GameStateError::PawnOnBackRank(
                (pawns & back_ranks).trailing_zeros() as Square,
            ));
        }

        let recomputed = compute_zobrist_key(self);
        if recomputed != self.zobrist_key {
            return Err(GameStateError::HashMismatch {
                incremental: self.zobrist_key,
                recomputed,
            });
        }

        Ok(())
    }

    /// The same position with colors swapped and the board flipped rank-wise.
    ///
    /// Side to move, castling rights and the en-passant square are mirrored
    /// too, so the result is the identical game seen from the other side.
    pub fn color_flipped(&self) -> GameState {
        let mut out = GameState::default();
        for square in 0..64u8 {
            if let Some(piece) = self.mailbox[square as usize] {
                out.place_piece(piece.color.opposite(), piece.kind, square ^ 56);
            }
        }

        let rights = self.castling_rights;
        let mut flipped = 0;
        if rights & CASTLE_LIGHT_KINGSIDE != 0 {
            flipped |= CASTLE_DARK_KINGSIDE;
        }
        if rights & CASTLE_LIGHT_QUEENSIDE != 0 {
            flipped |= CASTLE_DARK_QUEENSIDE;
        }
        if rights & CASTLE_DARK_KINGSIDE != 0 {
            flipped |= CASTLE_LIGHT_KINGSIDE;
        }
        if rights & CASTLE_DARK_QUEENSIDE != 0 {
            flipped |= CASTLE_LIGHT_QUEENSIDE;
        }

        out.castling_rights = flipped;
        out.en_passant_square = self.en_passant_square.map(|sq| sq ^ 56);
        out.side_to_move = self.side_to_move.opposite();
        out.halfmove_clock = self.halfmove_clock;
        out.fullmove_number = self.fullmove_number;
        out.refresh_hash();
        out
    }

    fn piece_from_bitboards(&self, square: Square) -> Option<Piece> {
        let mask = 1u64 << square;
        for color in [Color::Light, Color::Dark] {
            for kind in ALL_PIECE_KINDS {
                if self.pieces_of(color, kind) & mask != 0 {
                    return Some(Piece::new(color, kind));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{GameState, GameStateError};
    use crate::game_state::chess_rules::STARTING_POSITION_FEN;
    use crate::game_state::chess_types::{Color, PieceKind};

    #[test]
    fn starting_position_is_valid() {
        let game = GameState::new_game();
        game.validate().expect("start position should validate");
        assert_eq!(game.piece_count(), 32);
        let parsed = GameState::from_fen(STARTING_POSITION_FEN).expect("start FEN should parse");
        assert_eq!(game, parsed);
        assert_eq!(game.get_fen(), STARTING_POSITION_FEN);
    }

    #[test]
    fn validate_catches_mailbox_drift() {
        let mut game = GameState::new_game();
        game.mailbox[12] = None;
        assert!(matches!(
            game.validate(),
            Err(GameStateError::PlacementMismatch { square: 12, .. })
        ));
    }

    #[test]
    fn validate_catches_stale_hash() {
        let mut game = GameState::new_game();
        game.zobrist_key ^= 1;
        assert!(matches!(game.validate(), Err(GameStateError::HashMismatch { .. })));
    }

    #[test]
    fn place_and_remove_keep_hash_incremental() {
        let mut game = GameState::new_game();
        let before = game.zobrist_key;
        let piece = game.remove_piece(1).expect("knight on b1");
        assert_eq!(piece.kind, PieceKind::Knight);
        game.place_piece(piece.color, piece.kind, 18);
        let mut recomputed = game.clone();
        recomputed.refresh_hash();
        assert_eq!(game.zobrist_key, recomputed.zobrist_key);
        assert_ne!(game.zobrist_key, before);
    }

    #[test]
    fn color_flip_is_an_involution() {
        let game = GameState::from_fen("r3k2r/pp3ppp/8/3pP3/8/8/PPP2PPP/R3K2R w Kq d6 0 12")
            .expect("FEN should parse");
        let flipped = game.color_flipped();
        assert_eq!(flipped.side_to_move, Color::Dark);
        assert_eq!(flipped.get_fen(), "r3k2r/ppp2ppp/8/8/3Pp3/8/PP3PPP/R3K2R b Qk d3 0 12");
        flipped.validate().expect("flipped state should validate");
        assert_eq!(flipped.color_flipped().get_fen(), game.get_fen());
    }
}
