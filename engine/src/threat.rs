//! Position helpers for the threat search.
//!
//! A threat search asks the engine what the side *not* to move would play if
//! it were its turn. The derived position may be unreachable in a real game
//! (the previously moving king can be left in check), so the engine's answer
//! is only a heuristic.

use cozy_chess::{Board, GameStatus};

use crate::uci::UciError;

/// Derive the "pass the move" position: side to move flipped, en passant
/// target cleared. Castling rights and move counters are kept as they are.
pub fn threat_fen(fen: &str) -> Result<String, UciError> {
    let mut fields: Vec<&str> = fen.split_whitespace().collect();
    if fields.len() < 4 || fields.len() > 6 {
        return Err(UciError::InvalidFen(fen.to_string()));
    }

    fields[1] = match fields[1] {
        "w" => "b",
        "b" => "w",
        _ => return Err(UciError::InvalidFen(fen.to_string())),
    };
    // The capture-in-passing right belonged to the real side to move
    fields[3] = "-";

    Ok(fields.join(" "))
}

/// Whether the side to move has no legal moves (checkmate or stalemate).
pub fn is_game_over(fen: &str) -> Result<bool, UciError> {
    let board: Board = fen
        .parse()
        .map_err(|_| UciError::InvalidFen(fen.to_string()))?;
    Ok(board.status() != GameStatus::Ongoing)
}

#[cfg(test)]
mod tests {
    use super::*;

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn test_threat_fen_flips_side() {
        assert_eq!(
            threat_fen(START_FEN).unwrap(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1"
        );
    }

    #[test]
    fn test_threat_fen_clears_en_passant() {
        let fen = "rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3";
        assert_eq!(
            threat_fen(fen).unwrap(),
            "rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR b KQkq - 0 3"
        );
    }

    #[test]
    fn test_threat_fen_black_to_move() {
        let fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
        assert_eq!(
            threat_fen(fen).unwrap(),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 1"
        );
    }

    #[test]
    fn test_threat_fen_rejects_bad_input() {
        assert!(threat_fen("").is_err());
        assert!(threat_fen("8/8/8/8/8/8/8/8").is_err());
        assert!(threat_fen("8/8/8/8/8/8/8/8 x - - 0 1").is_err());
    }

    #[test]
    fn test_is_game_over_checkmate() {
        // Fool's mate final position
        let fen = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3";
        assert!(is_game_over(fen).unwrap());
    }

    #[test]
    fn test_is_game_over_stalemate() {
        let fen = "k7/8/1Q6/8/8/8/8/2K5 b - - 0 1";
        assert!(is_game_over(fen).unwrap());
    }

    #[test]
    fn test_not_game_over() {
        assert!(!is_game_over(START_FEN).unwrap());
    }

    #[test]
    fn test_is_game_over_invalid_fen() {
        assert!(is_game_over("not a fen").is_err());
    }
}
