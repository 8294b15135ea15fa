//! Configuration for the engine client.
//!
//! Every value has a compile-time default and can be overridden either through
//! a `with_*` builder method or, via [`EngineConfig::from_env`], through a
//! dedicated environment variable.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::MAX_MULTI_PV;

/// Default engine strength (full strength).
pub const DEFAULT_SKILL_LEVEL: u8 = 20;

/// Default number of ranked lines.
pub const DEFAULT_MULTI_PV: u8 = 3;

/// Default search budget for a regular analysis.
pub const DEFAULT_MOVETIME_MS: u64 = 2000;

/// Default search budget for a threat search.
pub const DEFAULT_THREAT_MOVETIME_MS: u64 = 500;

/// Default time allowed for each handshake step.
pub const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default time the engine gets to exit after `quit` before it is killed.
pub const DEFAULT_QUIT_GRACE_MS: u64 = 2000;

/// Default time an abandoned search gets to answer `stop` with `bestmove`.
pub const DEFAULT_STOP_TIMEOUT_MS: u64 = 2000;

pub const MAX_SKILL_LEVEL: u8 = 20;

#[cfg(windows)]
const PLATFORM_DEFAULT_PATH: &str = "./stockfish.exe";
#[cfg(not(windows))]
const PLATFORM_DEFAULT_PATH: &str = "./stockfish";

/// Common install locations checked after the platform default.
const COMMON_PATHS: &[&str] = &[
    "/usr/local/bin/stockfish",
    "/usr/bin/stockfish",
    "/opt/homebrew/bin/stockfish",
    "/usr/games/stockfish",
];

/// Falls back to a `PATH` lookup.
const BARE_NAME: &str = "stockfish";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub path: PathBuf,
    pub skill_level: u8,
    pub multi_pv: u8,
    pub movetime_ms: u64,
    pub threat_movetime_ms: u64,
    pub threads: Option<u32>,
    pub hash_mb: Option<u32>,
    pub startup_timeout: Duration,
    pub quit_grace: Duration,
    pub stop_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: default_engine_path(),
            skill_level: DEFAULT_SKILL_LEVEL,
            multi_pv: DEFAULT_MULTI_PV,
            movetime_ms: DEFAULT_MOVETIME_MS,
            threat_movetime_ms: DEFAULT_THREAT_MOVETIME_MS,
            threads: None,
            hash_mb: None,
            startup_timeout: Duration::from_secs(DEFAULT_STARTUP_TIMEOUT_SECS),
            quit_grace: Duration::from_millis(DEFAULT_QUIT_GRACE_MS),
            stop_timeout: Duration::from_millis(DEFAULT_STOP_TIMEOUT_MS),
        }
    }
}

impl EngineConfig {
    /// Defaults, overridden by environment variables where set.
    ///
    /// - `CHESSLENS_ENGINE_PATH`
    /// - `CHESSLENS_SKILL_LEVEL`
    /// - `CHESSLENS_MULTIPV`
    /// - `CHESSLENS_MOVETIME_MS`
    /// - `CHESSLENS_STARTUP_TIMEOUT_SECS`
    ///
    /// Values that cannot be parsed are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("CHESSLENS_ENGINE_PATH") {
            config.path = PathBuf::from(path);
        }
        if let Some(level) = env_parse("CHESSLENS_SKILL_LEVEL") {
            config = config.with_skill_level(level);
        }
        if let Some(count) = env_parse("CHESSLENS_MULTIPV") {
            config = config.with_multi_pv(count);
        }
        if let Some(ms) = env_parse("CHESSLENS_MOVETIME_MS") {
            config = config.with_movetime_ms(ms);
        }
        if let Some(secs) = env_parse("CHESSLENS_STARTUP_TIMEOUT_SECS") {
            config.startup_timeout = Duration::from_secs(secs);
        }

        config
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_skill_level(mut self, level: u8) -> Self {
        self.skill_level = clamp_skill_level(level);
        self
    }

    pub fn with_multi_pv(mut self, count: u8) -> Self {
        self.multi_pv = clamp_multi_pv(count);
        self
    }

    pub fn with_movetime_ms(mut self, ms: u64) -> Self {
        self.movetime_ms = ms.max(1);
        self
    }

    pub fn with_threat_movetime_ms(mut self, ms: u64) -> Self {
        self.threat_movetime_ms = ms.max(1);
        self
    }

    pub fn with_threads(mut self, threads: u32) -> Self {
        self.threads = Some(threads.clamp(1, 16));
        self
    }

    pub fn with_hash_mb(mut self, hash_mb: u32) -> Self {
        self.hash_mb = Some(hash_mb.clamp(1, 2048));
        self
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    pub fn with_quit_grace(mut self, grace: Duration) -> Self {
        self.quit_grace = grace;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }
}

pub fn clamp_skill_level(level: u8) -> u8 {
    level.min(MAX_SKILL_LEVEL)
}

pub fn clamp_multi_pv(count: u8) -> u8 {
    count.clamp(1, MAX_MULTI_PV)
}

/// Deadline for one analysis session: the search budget plus one second of
/// slack, never less than one second.
pub fn session_timeout(movetime_ms: u64) -> Duration {
    Duration::from_millis(movetime_ms.saturating_add(1000).max(1000))
}

/// Find the engine executable.
///
/// Priority:
/// 1. `./stockfish` (`./stockfish.exe` on Windows) if it exists
/// 2. Common install locations
/// 3. `stockfish` resolved through `PATH`
pub fn default_engine_path() -> PathBuf {
    std::iter::once(PLATFORM_DEFAULT_PATH)
        .chain(COMMON_PATHS.iter().copied())
        .map(Path::new)
        .find(|path| path.is_file())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(BARE_NAME))
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.trim().parse().ok()
}
