//! Presentation helpers for engine scores.
//!
//! Engines report scores from the side to move's point of view. Evaluation
//! bars and game reviews want White's point of view instead.

use cozy_chess::Color;

use crate::Score;

/// Centipawn value at which the evaluation bar is pinned to one side.
pub const DEFAULT_BAR_CLAMP_CP: i32 = 1000;

impl Score {
    /// Convert a side-to-move score to White's point of view.
    pub fn white_pov(self, side_to_move: Color) -> Score {
        match side_to_move {
            Color::White => self,
            Color::Black => self.negate(),
        }
    }

    pub fn negate(self) -> Score {
        match self {
            Score::Centipawns(cp) => Score::Centipawns(-cp),
            Score::Mate(m) => Score::Mate(-m),
        }
    }

    /// `+0.35` for centipawns, `M3` / `M-2` for mate.
    pub fn display(self) -> String {
        match self {
            Score::Centipawns(cp) => format!("{:+.2}", cp as f64 / 100.0),
            Score::Mate(m) => format!("M{}", m),
        }
    }
}

/// Fraction of the evaluation bar that belongs to White, in `[0, 1]`.
///
/// `score` must already be from White's point of view. A forced mate pins the
/// bar; centipawns are clamped to `±clamp_cp`.
pub fn eval_bar_fraction(score: Score, clamp_cp: i32) -> f64 {
    match score {
        Score::Mate(m) if m > 0 => 1.0,
        Score::Mate(_) => 0.0,
        Score::Centipawns(cp) => {
            let clamp_cp = clamp_cp.max(1);
            let clamped = cp.clamp(-clamp_cp, clamp_cp);
            (clamped as f64 / clamp_cp as f64) * 0.5 + 0.5
        }
    }
}

/// Quality of a played move, judged by how much evaluation it gave away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveClassification {
    Good,
    Inaccuracy,
    Mistake,
    Blunder,
}

impl MoveClassification {
    pub fn from_eval_loss(cp_loss: i32) -> Self {
        match cp_loss {
            l if l > 250 => MoveClassification::Blunder,
            l if l > 120 => MoveClassification::Mistake,
            l if l > 60 => MoveClassification::Inaccuracy,
            _ => MoveClassification::Good,
        }
    }

    /// Annotation suffix used in move lists (`??`, `?`, `?!`).
    pub fn annotation(self) -> &'static str {
        match self {
            MoveClassification::Good => "",
            MoveClassification::Inaccuracy => "?!",
            MoveClassification::Mistake => "?",
            MoveClassification::Blunder => "??",
        }
    }
}
