//! Folding streamed engine output into an [`AnalysisResult`].
//!
//! The collector is pure: it only sees text lines, so it can be exercised
//! without a subprocess.

use std::collections::BTreeMap;

use cozy_chess::Move;

use crate::uci::{parse_uci_message, UciMessage};
use crate::{AnalysisLine, AnalysisResult, MAX_MULTI_PV};

/// Outcome of feeding one line to the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Continue,
    /// `bestmove` arrived; `None` means the engine answered `(none)`.
    BestMove(Option<Move>),
}

/// Accumulates `info` lines by rank until `bestmove`.
#[derive(Debug)]
pub struct AnalysisCollector {
    lines: BTreeMap<u8, AnalysisLine>,
    limit: usize,
}

impl AnalysisCollector {
    pub fn new(multi_pv: u8) -> Self {
        Self {
            lines: BTreeMap::new(),
            limit: multi_pv.clamp(1, MAX_MULTI_PV) as usize,
        }
    }

    pub fn feed(&mut self, line: &str) -> Progress {
        match parse_uci_message(line) {
            Ok(UciMessage::Info(info)) => {
                // Progress reports (`currmove`, `string`, ...) carry no evaluation
                if info.score.is_none() && info.pv.is_empty() {
                    return Progress::Continue;
                }
                let rank = info.multipv.unwrap_or(1);
                if rank == 0 {
                    tracing::trace!("Discarding info line with multipv 0: {}", line);
                    return Progress::Continue;
                }

                let entry = self
                    .lines
                    .entry(rank)
                    .or_insert_with(|| AnalysisLine::new(rank));
                if let Some(score) = info.score {
                    entry.set_score(score);
                }
                if let Some(mv) = info.pv.first() {
                    entry.first_move = Some(*mv);
                }
                if info.depth.is_some() {
                    entry.depth = info.depth;
                }
                entry.raw = line.to_string();
                Progress::Continue
            }
            Ok(UciMessage::BestMove { mv, .. }) => Progress::BestMove(mv),
            Ok(_) => Progress::Continue,
            Err(e) if line.starts_with("bestmove") => {
                tracing::warn!("Unreadable bestmove line: {}", e);
                Progress::BestMove(None)
            }
            Err(e) => {
                tracing::trace!("Discarding engine line: {}", e);
                Progress::Continue
            }
        }
    }

    /// Ranked lines so far, ascending, with ranks above the MultiPV limit
    /// dropped.
    pub fn finish(self, best_move: Option<Move>) -> AnalysisResult {
        let limit = self.limit;
        AnalysisResult {
            lines: self
                .lines
                .into_values()
                .filter(|line| line.rank as usize <= limit)
                .collect(),
            best_move,
        }
    }
}
