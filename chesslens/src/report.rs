//! Rendering engine results for the terminal.
//!
//! Engines score from the side to move's point of view; everything printed
//! here is converted to White's point of view first.

use cozy_chess::{Board, Color, Move};
use engine::score::DEFAULT_BAR_CLAMP_CP;
use engine::{
    eval_bar_fraction, format_uci_move, AnalysisLine, AnalysisResult, Evaluation, MoveReview,
};
use serde::Serialize;

pub const NO_EVALUATION: &str = "no evaluation available";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("invalid FEN: {0}")]
    InvalidFen(String),

    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validate `fen` and return whose turn it is.
pub fn side_to_move(fen: &str) -> Result<Color, ReportError> {
    let board: Board = fen
        .trim()
        .parse()
        .map_err(|_| ReportError::InvalidFen(fen.to_string()))?;
    Ok(board.side_to_move())
}

#[derive(Debug, Serialize)]
pub struct LineReport {
    pub rank: u8,
    pub score_cp: Option<i32>,
    pub score_mate: Option<i32>,
    /// Score from White's point of view, e.g. `+0.35` or `M-2`.
    pub score: Option<String>,
    pub first_move: Option<String>,
    pub depth: Option<u32>,
}

impl LineReport {
    fn new(line: &AnalysisLine, side: Color) -> Self {
        Self {
            rank: line.rank,
            score_cp: line.score_cp,
            score_mate: line.score_mate,
            score: line.score().map(|s| s.white_pov(side).display()),
            first_move: line.first_move.as_ref().map(format_uci_move),
            depth: line.depth,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub lines: Vec<LineReport>,
    pub best_move: Option<String>,
}

impl AnalysisReport {
    pub fn new(result: &AnalysisResult, side: Color) -> Self {
        Self {
            lines: result
                .lines
                .iter()
                .map(|line| LineReport::new(line, side))
                .collect(),
            best_move: result.best_move.as_ref().map(format_uci_move),
        }
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_text(&self) -> String {
        if self.lines.is_empty() && self.best_move.is_none() {
            return format!("{}\n", NO_EVALUATION);
        }

        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&format!(
                "{}. {:<6} {:>7}",
                line.rank,
                line.first_move.as_deref().unwrap_or("-"),
                line.score.as_deref().unwrap_or("?"),
            ));
            if let Some(depth) = line.depth {
                out.push_str(&format!("  (depth {})", depth));
            }
            out.push('\n');
        }
        match &self.best_move {
            Some(mv) => out.push_str(&format!("best: {}\n", mv)),
            None => out.push_str("best: none\n"),
        }
        out
    }
}

pub fn evaluation_text(evaluation: &Evaluation, side: Color) -> String {
    let Some(score) = evaluation.score else {
        return format!("{}\n", NO_EVALUATION);
    };

    let white = score.white_pov(side);
    let bar = eval_bar_fraction(white, DEFAULT_BAR_CLAMP_CP);
    let mut out = format!("eval: {}  white: {:.0}%", white.display(), bar * 100.0);
    if let Some(mv) = &evaluation.best_move {
        out.push_str(&format!("  best: {}", format_uci_move(mv)));
    }
    out.push('\n');
    out
}

pub fn threat_text(threat: Option<Move>) -> String {
    match threat {
        Some(mv) => format!("threat: {}\n", format_uci_move(&mv)),
        None => "no threat found\n".to_string(),
    }
}

/// One row per move: `1. e2e4  loss 10`, `1... e7e5??  loss 380`.
pub fn review_text(reviews: &[MoveReview]) -> String {
    let mut out = String::new();
    for review in reviews {
        let dots = match review.mover {
            Color::White => ".",
            Color::Black => "...",
        };
        let annotation = review.classification.map_or("", |c| c.annotation());
        let mv = format!("{}{}", format_uci_move(&review.mv), annotation);
        out.push_str(&format!("{}{} {:<8}", review.move_number, dots, mv));
        match review.cp_loss {
            Some(loss) => out.push_str(&format!("  loss {}\n", loss)),
            None => out.push_str(&format!("  {}\n", NO_EVALUATION)),
        }
    }
    out
}
