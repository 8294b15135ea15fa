//! Move-by-move game review.
//!
//! Every position of the game is evaluated once. A move's evaluation loss is
//! the mover's score before the move minus the mover's score after it, where
//! the latter is the negated score the opponent gets in the next position.

use cozy_chess::{Board, Color, File, Move, Piece, Square};

use crate::score::MoveClassification;
use crate::uci::{format_uci_move, UciError};
use crate::{Score, StockfishEngine};

/// Centipawn stand-in for a forced mate when measuring evaluation loss.
pub const MATE_CP: i32 = 10_000;

/// Review of one played move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveReview {
    pub mv: Move,
    pub mover: Color,
    pub move_number: u16,
    /// Top-line score before the move, from the mover's point of view.
    pub before: Option<Score>,
    /// Top-line score after the move, from the opponent's point of view.
    pub after: Option<Score>,
    /// `None` when either position went unevaluated.
    pub classification: Option<MoveClassification>,
    pub cp_loss: Option<i32>,
}

/// One replayed position and the move played from it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Ply {
    fen: String,
    mv: Move,
    mover: Color,
    move_number: u16,
}

/// Replay `moves` from `fen`. Returns the plies and the final position.
///
/// Moves use UCI notation, so castling is written as the king's two-square
/// step (`e1g1`).
fn replay(fen: &str, moves: &[Move]) -> Result<(Vec<Ply>, String), UciError> {
    let mut board: Board = fen
        .trim()
        .parse()
        .map_err(|_| UciError::InvalidFen(fen.to_string()))?;

    let mut plies = Vec::with_capacity(moves.len());
    for &mv in moves {
        let ply = Ply {
            fen: board.to_string(),
            mv,
            mover: board.side_to_move(),
            move_number: board.fullmove_number(),
        };
        board
            .try_play(board_move(&board, mv))
            .map_err(|_| UciError::IllegalMove(format_uci_move(&mv)))?;
        plies.push(ply);
    }

    Ok((plies, board.to_string()))
}

/// cozy-chess encodes castling as the king capturing its own rook.
fn board_move(board: &Board, mv: Move) -> Move {
    let is_king = board.piece_on(mv.from) == Some(Piece::King);
    let step = mv.to.file() as i8 - mv.from.file() as i8;
    if !is_king || step.abs() != 2 || mv.from.rank() != mv.to.rank() {
        return mv;
    }

    let rook_file = if step > 0 { File::H } else { File::A };
    Move {
        from: mv.from,
        to: Square::new(rook_file, mv.from.rank()),
        promotion: None,
    }
}

/// Score as centipawns, with forced mates pinned to `±MATE_CP`.
pub fn score_cp(score: Score) -> i32 {
    match score {
        Score::Centipawns(cp) => cp.clamp(-MATE_CP, MATE_CP),
        Score::Mate(m) if m > 0 => MATE_CP,
        // Mate 0: the side to move is already mated
        Score::Mate(_) => -MATE_CP,
    }
}

/// Evaluation the mover gave away; never negative.
pub fn eval_loss(before: Score, after: Score) -> i32 {
    (score_cp(before) + score_cp(after)).max(0)
}

impl StockfishEngine {
    /// Evaluate every position of a game and classify each move.
    ///
    /// Fails only for an unreadable FEN or an illegal move, before the engine
    /// is contacted. Engine failures leave the affected scores empty. The
    /// position set by [`Self::set_position_from_fen`] is left untouched.
    pub async fn review_game(
        &self,
        fen: &str,
        moves: &[Move],
        movetime_ms: u64,
    ) -> Result<Vec<MoveReview>, UciError> {
        let (plies, final_fen) = replay(fen, moves)?;
        tracing::info!("Reviewing {} moves", plies.len());

        let mut scores = Vec::with_capacity(plies.len() + 1);
        let fens = plies.iter().map(|p| p.fen.as_str());
        for fen in fens.chain([final_fen.as_str()]) {
            let result = self.analyze_fen(fen, movetime_ms).await;
            scores.push(result.top_line().and_then(|line| line.score()));
        }

        let reviews = plies
            .into_iter()
            .zip(scores.windows(2))
            .map(|(ply, pair)| {
                let (before, after) = (pair[0], pair[1]);
                let cp_loss = before.zip(after).map(|(b, a)| eval_loss(b, a));
                MoveReview {
                    mv: ply.mv,
                    mover: ply.mover,
                    move_number: ply.move_number,
                    before,
                    after,
                    classification: cp_loss.map(MoveClassification::from_eval_loss),
                    cp_loss,
                }
            })
            .collect();
        Ok(reviews)
    }
}
