//! Scripted fake UCI engines for integration tests.
//!
//! Every script is written once into a shared temporary directory before any
//! test spawns a process, so no engine is ever executed while another thread
//! still holds a script open for writing.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use engine::EngineConfig;
use tempfile::TempDir;

/// Ranked MultiPV output, out of order and with noise.
pub const RANKED: &str = "ranked";
/// Tags every info line with the request counter and leaves stale lines
/// behind after `bestmove`.
pub const TAGGED: &str = "tagged";
/// Never answers `go` with `bestmove`.
pub const SILENT: &str = "silent";
/// Exits in the middle of a search.
pub const CRASH: &str = "crash";
/// Reports a finished game.
pub const NO_MOVE: &str = "no_move";
/// Never answers `uci`.
pub const MUTE: &str = "mute";
/// Answers `uci` but never `isready`.
pub const NO_READYOK: &str = "no_readyok";
/// Ignores `quit` and stays alive.
pub const STUBBORN: &str = "stubborn";
/// Logs every received command to `record.log`.
pub const RECORD: &str = "record";
/// Logs every received command to `threat.log`.
pub const THREAT: &str = "threat";
/// Logs every received command to `shutdown.log`.
pub const SHUTDOWN: &str = "shutdown";
/// Answers its first search only after 1.5 s; logs to `late_timeout.log`.
pub const LATE_TIMEOUT: &str = "late_timeout";
/// Same as [`LATE_TIMEOUT`], logging to `late_cancel.log`.
pub const LATE_CANCEL: &str = "late_cancel";
/// Closes its stdin after the handshake but keeps stdout open.
pub const CLOSED_STDIN: &str = "closed_stdin";
/// Scores successive searches +30, -20, +400.
pub const REVIEW: &str = "review";

const RANKED_SCRIPT: &str = r#"
while read -r cmd rest; do
  case "$cmd" in
    uci) echo "id name FakeRanked"; echo "uciok" ;;
    isready) echo "readyok" ;;
    go)
      echo "info depth 1 multipv 2 score cp 20 pv d2d4 d7d5"
      echo "info depth 1 multipv 1 score cp 35 pv e2e4 e7e5"
      echo "info string evaluation noise"
      echo "info depth 1 multipv 3 score mate 2 pv g1f3"
      echo "info depth 1 multipv x score cp 1 pv a2a3"
      echo "info depth 2 multipv 1 score cp 31 pv e2e4 c7c5"
      echo "bestmove e2e4 ponder c7c5"
      ;;
    quit) exit 0 ;;
  esac
done
"#;

const TAGGED_SCRIPT: &str = r#"
n=0
while read -r cmd rest; do
  case "$cmd" in
    uci) echo "uciok" ;;
    isready) echo "readyok" ;;
    go)
      n=$((n + 1))
      echo "info depth 1 multipv 1 score cp $n pv e2e4"
      echo "bestmove e2e4"
      echo "info depth 9 multipv 1 score cp $n pv a2a3"
      echo "info depth 9 multipv 2 score cp $n pv h2h3"
      ;;
    quit) exit 0 ;;
  esac
done
"#;

const SILENT_SCRIPT: &str = r#"
while read -r cmd rest; do
  case "$cmd" in
    uci) echo "uciok" ;;
    isready) echo "readyok" ;;
    go) echo "info depth 1 multipv 1 score cp 5 pv e2e4" ;;
    quit) exit 0 ;;
  esac
done
"#;

const CRASH_SCRIPT: &str = r#"
while read -r cmd rest; do
  case "$cmd" in
    uci) echo "uciok" ;;
    isready) echo "readyok" ;;
    go) echo "info depth 1 multipv 1 score cp 5 pv e2e4"; exit 3 ;;
  esac
done
"#;

const NO_MOVE_SCRIPT: &str = r#"
while read -r cmd rest; do
  case "$cmd" in
    uci) echo "uciok" ;;
    isready) echo "readyok" ;;
    go) echo "info depth 0 score mate 0"; echo "bestmove (none)" ;;
    quit) exit 0 ;;
  esac
done
"#;

const MUTE_SCRIPT: &str = r#"
while read -r cmd rest; do
  :
done
"#;

const NO_READYOK_SCRIPT: &str = r#"
while read -r cmd rest; do
  case "$cmd" in
    uci) echo "uciok" ;;
  esac
done
"#;

const STUBBORN_SCRIPT: &str = r#"
while read -r cmd rest; do
  case "$cmd" in
    uci) echo "uciok" ;;
    isready) echo "readyok" ;;
    go) echo "bestmove e2e4" ;;
    quit) exec sleep 30 ;;
  esac
done
exec sleep 30
"#;

const CLOSED_STDIN_SCRIPT: &str = r#"
while read -r cmd rest; do
  case "$cmd" in
    uci) echo "uciok" ;;
    isready) exec 0<&-; echo "readyok"; exec sleep 30 ;;
  esac
done
"#;

const REVIEW_SCRIPT: &str = r#"
n=0
while read -r cmd rest; do
  case "$cmd" in
    uci) echo "uciok" ;;
    isready) echo "readyok" ;;
    go)
      n=$((n + 1))
      case "$n" in
        1) cp=30 ;;
        2) cp=-20 ;;
        *) cp=400 ;;
      esac
      echo "info depth 8 multipv 1 score cp $cp pv g1f3"
      echo "bestmove g1f3"
      ;;
    quit) exit 0 ;;
  esac
done
"#;

/// The first `go` is answered after 1.5 s with `cp 1` / `a2a3`, every later
/// one at once with `cp <n>` / `h2h3`. `stop` is logged but otherwise ignored.
fn late_script(log_name: &str) -> String {
    format!(
        r#"
LOG="$(dirname "$0")/{log_name}.log"
n=0
while IFS= read -r line; do
  printf '%s\n' "$line" >> "$LOG"
  case "$line" in
    uci) echo "uciok" ;;
    isready) echo "readyok" ;;
    go*)
      n=$((n + 1))
      if [ "$n" -eq 1 ]; then
        sleep 1.5
        echo "info depth 1 multipv 1 score cp 1 pv a2a3"
        echo "bestmove a2a3"
      else
        echo "info depth 1 multipv 1 score cp $n pv h2h3"
        echo "bestmove h2h3"
      fi
      ;;
    quit) exit 0 ;;
  esac
done
"#
    )
}

fn recording_script(log_name: &str, reply: &str) -> String {
    format!(
        r#"
LOG="$(dirname "$0")/{log_name}.log"
while IFS= read -r line; do
  printf '%s\n' "$line" >> "$LOG"
  case "$line" in
    uci) echo "uciok" ;;
    isready) echo "readyok" ;;
    go*) echo "info depth 1 multipv 1 score cp 12 pv {reply}"; echo "bestmove {reply}" ;;
    quit) exit 0 ;;
  esac
done
"#
    )
}

static FIXTURE: OnceLock<TempDir> = OnceLock::new();

fn fixture() -> &'static TempDir {
    FIXTURE.get_or_init(|| {
        let dir = TempDir::new().expect("create fixture dir");
        let scripts = [
            (RANKED, RANKED_SCRIPT.to_string()),
            (TAGGED, TAGGED_SCRIPT.to_string()),
            (SILENT, SILENT_SCRIPT.to_string()),
            (CRASH, CRASH_SCRIPT.to_string()),
            (NO_MOVE, NO_MOVE_SCRIPT.to_string()),
            (MUTE, MUTE_SCRIPT.to_string()),
            (NO_READYOK, NO_READYOK_SCRIPT.to_string()),
            (STUBBORN, STUBBORN_SCRIPT.to_string()),
            (RECORD, recording_script(RECORD, "e2e4")),
            (THREAT, recording_script(THREAT, "e7e5")),
            (SHUTDOWN, recording_script(SHUTDOWN, "e2e4")),
            (LATE_TIMEOUT, late_script(LATE_TIMEOUT)),
            (LATE_CANCEL, late_script(LATE_CANCEL)),
            (CLOSED_STDIN, CLOSED_STDIN_SCRIPT.to_string()),
            (REVIEW, REVIEW_SCRIPT.to_string()),
        ];
        for (name, body) in scripts {
            write_script(dir.path(), name, &body);
        }
        dir
    })
}

fn write_script(dir: &Path, name: &str, body: &str) {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}")).expect("write fake engine");
    let mut perms = fs::metadata(&path).expect("stat fake engine").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("chmod fake engine");
}

/// Path of the named fake engine.
pub fn engine_path(name: &str) -> PathBuf {
    fixture().path().join(name)
}

/// Route engine logs to the test harness; `RUST_LOG=engine=trace` shows
/// the raw UCI traffic.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Config pointing at the named fake engine with test-friendly timeouts.
pub fn config(name: &str) -> EngineConfig {
    init_tracing();
    EngineConfig::default()
        .with_path(engine_path(name))
        .with_startup_timeout(Duration::from_secs(5))
        .with_quit_grace(Duration::from_millis(500))
}

/// Commands the named recording engine has received so far.
pub fn read_log(name: &str) -> Vec<String> {
    let path = fixture().path().join(format!("{name}.log"));
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}
