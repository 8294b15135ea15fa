use crate::EngineCommand;
use std::fmt;

impl EngineCommand {
    pub fn skill_level(level: u8) -> Self {
        Self::SetOption {
            name: "Skill Level".to_string(),
            value: Some(level.to_string()),
        }
    }

    pub fn multi_pv(count: u8) -> Self {
        Self::SetOption {
            name: "MultiPV".to_string(),
            value: Some(count.to_string()),
        }
    }

    pub fn threads(threads: u32) -> Self {
        Self::SetOption {
            name: "Threads".to_string(),
            value: Some(threads.to_string()),
        }
    }

    pub fn hash(hash_mb: u32) -> Self {
        Self::SetOption {
            name: "Hash".to_string(),
            value: Some(hash_mb.to_string()),
        }
    }
}

/// Wire form of a command, without the trailing newline.
impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineCommand::Uci => write!(f, "uci"),
            EngineCommand::IsReady => write!(f, "isready"),
            EngineCommand::SetOption { name, value } => match value {
                Some(val) => write!(f, "setoption name {} value {}", name, val),
                None => write!(f, "setoption name {}", name),
            },
            EngineCommand::SetPosition { fen } => write!(f, "position fen {}", fen),
            EngineCommand::Go { movetime_ms } => write!(f, "go movetime {}", movetime_ms),
            EngineCommand::Stop => write!(f, "stop"),
            EngineCommand::Quit => write!(f, "quit"),
        }
    }
}
