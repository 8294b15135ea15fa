//! Failure modes of the engine client.
//!
//! None of these reach callers of the public [`crate::StockfishEngine`]
//! operations: each is logged and converted to an empty result or an absent
//! move where it occurs.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine binary is missing or cannot be executed.
    #[error("failed to spawn engine at {path}: {source}")]
    ExecutableNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The spawned process did not expose a piped standard stream.
    #[error("engine has no {0}")]
    MissingPipe(&'static str),

    /// `uciok` or `readyok` was not observed within the startup timeout.
    #[error("timed out after {timeout:?} waiting for '{token}'")]
    HandshakeTimeout {
        token: &'static str,
        timeout: Duration,
    },

    /// Writing to the engine's stdin failed.
    #[error("engine stdin closed: {0}")]
    BrokenChannel(#[source] std::io::Error),

    /// No `bestmove` arrived before the session deadline.
    #[error("no bestmove within {0:?}")]
    ProtocolTimeout(Duration),

    /// The engine exited (or closed its stdout) before answering.
    #[error("engine exited unexpectedly")]
    UnexpectedExit,

    /// The operation needs a ready engine.
    #[error("engine is not ready")]
    NotReady,
}
