pub mod config;
pub mod error;
pub mod process;
pub mod review;
pub mod score;
pub mod session;
pub mod state;
pub mod stockfish;
pub mod threat;
pub mod uci;

pub use config::EngineConfig;
pub use error::EngineError;
pub use review::MoveReview;
pub use score::{eval_bar_fraction, MoveClassification};
pub use state::EngineState;
pub use stockfish::StockfishEngine;
pub use uci::{format_uci_move, parse_uci_message, parse_uci_move, UciError, UciMessage};

use cozy_chess::Move;

/// FEN of the standard starting position.
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Hard ceiling on the number of ranked lines the client will report.
pub const MAX_MULTI_PV: u8 = 5;

/// Commands sent to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    Uci,
    IsReady,
    SetOption { name: String, value: Option<String> },
    SetPosition { fen: String },
    Go { movetime_ms: u64 },
    Stop,
    Quit,
}

/// Evaluation fields of one `info` line.
///
/// Search statistics (`nodes`, `nps`, `time`, ...) are skipped by the parser.
#[derive(Debug, Clone, Default)]
pub struct EngineInfo {
    pub depth: Option<u32>,
    pub score: Option<Score>,
    pub pv: Vec<Move>, // Principal variation
    pub multipv: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    Mate(i32), // Negative for being mated
}

/// One ranked candidate line reported by the engine.
///
/// `score_cp` and `score_mate` are never both set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisLine {
    pub rank: u8,
    pub score_cp: Option<i32>,
    pub score_mate: Option<i32>,
    pub first_move: Option<Move>,
    pub depth: Option<u32>,
    pub raw: String,
}

impl AnalysisLine {
    pub fn new(rank: u8) -> Self {
        Self {
            rank,
            score_cp: None,
            score_mate: None,
            first_move: None,
            depth: None,
            raw: String::new(),
        }
    }

    pub fn score(&self) -> Option<Score> {
        match (self.score_cp, self.score_mate) {
            (_, Some(mate)) => Some(Score::Mate(mate)),
            (Some(cp), None) => Some(Score::Centipawns(cp)),
            (None, None) => None,
        }
    }

    pub fn set_score(&mut self, score: Score) {
        match score {
            Score::Centipawns(cp) => {
                self.score_cp = Some(cp);
                self.score_mate = None;
            }
            Score::Mate(mate) => {
                self.score_mate = Some(mate);
                self.score_cp = None;
            }
        }
    }
}

/// Ranked lines plus the engine's overall choice.
///
/// `best_move` is `None` when the engine answered `bestmove (none)` (the
/// position is checkmate or stalemate) and whenever the session failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisResult {
    pub lines: Vec<AnalysisLine>,
    pub best_move: Option<Move>,
}

impl AnalysisResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.best_move.is_none()
    }

    /// The rank-1 line, if the engine reported one.
    pub fn top_line(&self) -> Option<&AnalysisLine> {
        self.lines.first()
    }
}

/// Top-line evaluation of a position, from the side to move's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub score: Option<Score>,
    pub best_move: Option<Move>,
}
