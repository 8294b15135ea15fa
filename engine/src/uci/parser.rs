use cozy_chess::{Move, Piece, Square};

use super::UciError;
use crate::{EngineInfo, Score};

/// Incoming message from UCI engine
#[derive(Debug, Clone)]
pub enum UciMessage {
    Id { name: String, value: String },
    UciOk,
    ReadyOk,
    /// `mv` is `None` for `bestmove (none)`: the side to move has no legal move.
    BestMove { mv: Option<Move>, ponder: Option<Move> },
    Info(EngineInfo),
}

/// Parse a UCI message line
pub fn parse_uci_message(line: &str) -> Result<UciMessage, UciError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens.first() {
        Some(&"uciok") => Ok(UciMessage::UciOk),
        Some(&"readyok") => Ok(UciMessage::ReadyOk),

        Some(&"id") => {
            if tokens.len() < 3 {
                return Err(UciError::MalformedMessage(line.to_string()));
            }
            let name = tokens[1].to_string();
            let value = tokens[2..].join(" ");
            Ok(UciMessage::Id { name, value })
        }

        Some(&"bestmove") => {
            let Some(&token) = tokens.get(1) else {
                return Err(UciError::MalformedMessage(line.to_string()));
            };
            let mv = match token {
                "(none)" => None,
                _ => Some(parse_uci_move(token)?),
            };
            let ponder = match (tokens.get(2), tokens.get(3)) {
                (Some(&"ponder"), Some(ponder)) => parse_uci_move(ponder).ok(),
                _ => None,
            };
            Ok(UciMessage::BestMove { mv, ponder })
        }

        Some(&"info") => parse_info_line(&tokens[1..])
            .map(UciMessage::Info)
            .ok_or_else(|| UciError::MalformedMessage(line.to_string())),

        _ => Err(UciError::UnknownMessage(line.to_string())),
    }
}

/// Whether `token` appears as a whole word in `line`.
pub fn has_token(line: &str, token: &str) -> bool {
    line.split_whitespace().any(|t| t == token)
}

/// Parse an "info" line from the engine.
///
/// Returns `None` if the depth, rank or score is unreadable.
fn parse_info_line(tokens: &[&str]) -> Option<EngineInfo> {
    let mut info = EngineInfo::default();
    let mut i = 0;

    while i < tokens.len() {
        match tokens[i] {
            "depth" => {
                i += 1;
                info.depth = Some(tokens.get(i)?.parse().ok()?);
            }
            "score" => {
                let score_type = *tokens.get(i + 1)?;
                let value = tokens.get(i + 2)?;
                info.score = Some(match score_type {
                    "cp" => Score::Centipawns(value.parse().ok()?),
                    "mate" => Score::Mate(value.parse().ok()?),
                    _ => return None,
                });
                i += 2;
            }
            "pv" => {
                // Collect all moves until next keyword
                i += 1;
                while i < tokens.len() && !is_keyword(tokens[i]) {
                    if let Ok(mv) = parse_uci_move(tokens[i]) {
                        info.pv.push(mv);
                    }
                    i += 1;
                }
                continue; // Don't increment i again
            }
            "multipv" => {
                i += 1;
                info.multipv = Some(tokens.get(i)?.parse().ok()?);
            }
            // Search statistics: skip the value without reading it
            "seldepth" | "time" | "nodes" | "nps" | "currmove" | "currmovenumber"
            | "hashfull" | "tbhits" | "sbhits" | "cpuload" => {
                i += 1;
            }
            // Free text runs to the end of the line
            "string" => break,
            _ => {
                // Unknown keyword, skip
            }
        }
        i += 1;
    }

    Some(info)
}

fn is_keyword(token: &str) -> bool {
    matches!(
        token,
        "depth"
            | "seldepth"
            | "time"
            | "nodes"
            | "score"
            | "pv"
            | "multipv"
            | "currmove"
            | "currmovenumber"
            | "hashfull"
            | "nps"
            | "tbhits"
            | "sbhits"
            | "cpuload"
            | "string"
    )
}

/// Parse UCI move format (e2e4, e7e8q)
pub fn parse_uci_move(s: &str) -> Result<Move, UciError> {
    if !s.is_ascii() || !(4..=5).contains(&s.len()) {
        return Err(UciError::InvalidMove(s.to_string()));
    }

    let from = parse_square(&s[0..2])?;
    let to = parse_square(&s[2..4])?;

    let promotion = if s.len() == 5 {
        Some(match s.as_bytes()[4] {
            b'q' => Piece::Queen,
            b'r' => Piece::Rook,
            b'b' => Piece::Bishop,
            b'n' => Piece::Knight,
            _ => return Err(UciError::InvalidPromotion(s.to_string())),
        })
    } else {
        None
    };

    Ok(Move {
        from,
        to,
        promotion,
    })
}

fn parse_square(s: &str) -> Result<Square, UciError> {
    s.parse().map_err(|_| UciError::InvalidSquare(s.to_string()))
}

/// Format move for UCI (cozy-chess Move → "e2e4")
pub fn format_uci_move(mv: &Move) -> String {
    let mut s = format!("{}{}", mv.from, mv.to);
    if let Some(promo) = mv.promotion {
        s.push(match promo {
            Piece::Queen => 'q',
            Piece::Rook => 'r',
            Piece::Bishop => 'b',
            Piece::Knight => 'n',
            Piece::Pawn => 'p',
            Piece::King => 'k',
        });
    }
    s
}
