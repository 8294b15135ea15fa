use crate::config::{clamp_multi_pv, clamp_skill_level, session_timeout, EngineConfig};
use crate::error::EngineError;
use crate::process::{self, EngineProcess};
use crate::session::{AnalysisCollector, Progress};
use crate::state::{EngineState, SharedState};
use crate::threat;
use crate::uci::has_token;
use crate::{AnalysisResult, EngineCommand, Evaluation, START_FEN};
use cozy_chess::Move;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin};
use tokio::sync::{mpsc, Mutex};

/// Client for a UCI engine subprocess.
///
/// Construction never fails: if the engine cannot be spawned or does not
/// complete the handshake, the client is `Disabled` and every operation
/// returns an empty result. Run at most one analysis at a time; concurrent
/// calls are serialized on the output queue.
pub struct StockfishEngine {
    config: EngineConfig,
    shared: Arc<SharedState>,
    child: Mutex<Option<Child>>,
    stdin: Mutex<Option<ChildStdin>>,
    lines: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
    position: Mutex<String>,
    skill_level: AtomicU8,
    multi_pv: AtomicU8,
    /// Set from `go` until its `bestmove` is consumed.
    searching: AtomicBool,
}

impl StockfishEngine {
    /// Spawn the engine and run the UCI handshake.
    #[tracing::instrument(level = "info", skip(config), fields(path = %config.path.display()))]
    pub async fn start(config: EngineConfig) -> Self {
        let shared = Arc::new(SharedState::new());
        shared.transition(EngineState::Starting);

        let process = match process::spawn(&config.path, shared.clone()) {
            Ok(process) => Some(process),
            Err(e) => {
                tracing::error!("Engine unavailable: {}", e);
                shared.transition(EngineState::Disabled);
                None
            }
        };
        let engine = Self::assemble(config, shared, process);
        if engine.state() == EngineState::Disabled {
            return engine;
        }

        if let Err(e) = engine.handshake().await {
            tracing::error!("Engine handshake failed: {}", e);
            engine.shared.set_alive(false);
            engine.shared.transition(EngineState::Disabled);
            engine.kill().await;
            return engine;
        }

        engine.shared.transition(EngineState::Ready);
        if !engine.shared.is_alive() {
            // Exited right after readyok
            engine.shared.mark_exited();
        }
        tracing::info!("Engine ready");
        engine
    }

    fn assemble(
        config: EngineConfig,
        shared: Arc<SharedState>,
        process: Option<EngineProcess>,
    ) -> Self {
        let skill_level = AtomicU8::new(config.skill_level);
        let multi_pv = AtomicU8::new(config.multi_pv);
        let (child, stdin, lines) = match process {
            Some(p) => (Some(p.child), Some(p.stdin), Some(p.lines)),
            None => (None, None, None),
        };

        Self {
            config,
            shared,
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            lines: Mutex::new(lines),
            position: Mutex::new(START_FEN.to_string()),
            skill_level,
            multi_pv,
            searching: AtomicBool::new(false),
        }
    }

    async fn handshake(&self) -> Result<(), EngineError> {
        let timeout = self.config.startup_timeout;
        let mut guard = self.lines.lock().await;
        let lines = guard.as_mut().ok_or(EngineError::NotReady)?;

        tracing::debug!("Sending 'uci' command");
        self.send(&EngineCommand::Uci).await?;
        wait_for_token(lines, "uciok", timeout).await?;
        tracing::debug!("Received uciok");

        self.send(&EngineCommand::skill_level(self.skill_level())).await?;
        self.send(&EngineCommand::multi_pv(self.multi_pv())).await?;
        if let Some(threads) = self.config.threads {
            tracing::info!("Setting Threads to {}", threads);
            self.send(&EngineCommand::threads(threads)).await?;
        }
        if let Some(hash_mb) = self.config.hash_mb {
            tracing::info!("Setting Hash to {} MB", hash_mb);
            self.send(&EngineCommand::hash(hash_mb)).await?;
        }

        tracing::debug!("Sending 'isready' command");
        self.send(&EngineCommand::IsReady).await?;
        wait_for_token(lines, "readyok", timeout).await?;
        tracing::debug!("Received readyok");
        Ok(())
    }

    /// Write one command line to the engine.
    ///
    /// Fails without writing once the engine is gone. A failed write retires
    /// the engine.
    async fn send(&self, cmd: &EngineCommand) -> Result<(), EngineError> {
        if !self.shared.is_alive() {
            return Err(EngineError::UnexpectedExit);
        }
        let mut guard = self.stdin.lock().await;
        let Some(stdin) = guard.as_mut() else {
            return Err(EngineError::NotReady);
        };

        tracing::trace!("UCI >> {}", cmd);
        let line = format!("{}\n", cmd);
        let written: std::io::Result<()> = async {
            stdin.write_all(line.as_bytes()).await?;
            stdin.flush().await
        }
        .await;

        if let Err(e) = written {
            tracing::warn!("Failed to write to engine stdin: {}", e);
            *guard = None;
            self.shared.mark_exited();
            return Err(EngineError::BrokenChannel(e));
        }
        Ok(())
    }

    pub fn state(&self) -> EngineState {
        self.shared.state()
    }

    pub fn is_ready(&self) -> bool {
        self.shared.is_ready()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn skill_level(&self) -> u8 {
        self.skill_level.load(Ordering::Relaxed)
    }

    pub fn multi_pv(&self) -> u8 {
        self.multi_pv.load(Ordering::Relaxed)
    }

    /// Change engine strength (clamped to 0..=20).
    pub async fn set_skill_level(&self, level: u8) {
        let level = clamp_skill_level(level);
        self.skill_level.store(level, Ordering::Relaxed);
        if !self.is_ready() {
            return;
        }
        tracing::info!("Setting skill level to {}", level);
        if let Err(e) = self.send(&EngineCommand::skill_level(level)).await {
            tracing::warn!("Failed to set skill level: {}", e);
        }
    }

    /// Change the number of ranked lines (clamped to 1..=5).
    pub async fn set_multi_pv(&self, count: u8) {
        let count = clamp_multi_pv(count);
        self.multi_pv.store(count, Ordering::Relaxed);
        if !self.is_ready() {
            return;
        }
        tracing::info!("Setting MultiPV to {}", count);
        if let Err(e) = self.send(&EngineCommand::multi_pv(count)).await {
            tracing::warn!("Failed to set MultiPV: {}", e);
        }
    }

    /// Position used by the next [`Self::get_analysis`].
    ///
    /// The FEN is expected to be valid; it is sent to the engine as-is when
    /// the analysis starts.
    pub async fn set_position_from_fen(&self, fen: &str) {
        tracing::debug!("Setting position: FEN={}", fen);
        *self.position.lock().await = fen.trim().to_string();
    }

    /// Search the current position for `movetime_ms`.
    ///
    /// Blocks the calling task for at most `max(1s, movetime + 1s)`. Returns
    /// an empty result if the engine is not ready, dies, or times out.
    pub async fn get_analysis(&self, movetime_ms: u64) -> AnalysisResult {
        let fen = self.position.lock().await.clone();
        self.analyze_fen(&fen, movetime_ms).await
    }

    /// Rank-1 score and best move of the current position.
    pub async fn get_evaluation(&self, movetime_ms: u64) -> Evaluation {
        let result = self.get_analysis(movetime_ms).await;
        Evaluation {
            score: result.top_line().and_then(|line| line.score()),
            best_move: result.best_move,
        }
    }

    /// The move the side *not* to move would play if it were its turn.
    ///
    /// Returns `None` for finished games, unreadable FENs, or when the engine
    /// gives no answer. The position set by [`Self::set_position_from_fen`]
    /// is left untouched.
    pub async fn get_threat(&self, fen: &str, movetime_ms: u64) -> Option<Move> {
        if !self.is_ready() {
            return None;
        }

        match threat::is_game_over(fen) {
            Ok(false) => {}
            Ok(true) => {
                tracing::debug!("No threat in a finished game");
                return None;
            }
            Err(e) => {
                tracing::warn!("Threat search skipped: {}", e);
                return None;
            }
        }

        let flipped = match threat::threat_fen(fen) {
            Ok(flipped) => flipped,
            Err(e) => {
                tracing::warn!("Threat search skipped: {}", e);
                return None;
            }
        };
        tracing::debug!("Searching threat: FEN={}", flipped);

        // Scores are from the wrong side's perspective here; only the move is kept
        self.analyze_fen(&flipped, movetime_ms).await.best_move
    }

    pub(crate) async fn analyze_fen(&self, fen: &str, movetime_ms: u64) -> AnalysisResult {
        if !self.is_ready() {
            tracing::debug!("Analysis requested while engine is {:?}", self.state());
            return AnalysisResult::empty();
        }

        match self.run_session(fen, movetime_ms).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Analysis failed: {}", e);
                AnalysisResult::empty()
            }
        }
    }

    async fn run_session(
        &self,
        fen: &str,
        movetime_ms: u64,
    ) -> Result<AnalysisResult, EngineError> {
        let movetime_ms = movetime_ms.max(1);
        let mut guard = self.lines.lock().await;
        let lines = guard.as_mut().ok_or(EngineError::NotReady)?;

        if self.searching.load(Ordering::Acquire) {
            self.finish_abandoned_search(lines).await?;
        }

        // The protocol has no request ids: anything still queued belongs to
        // an earlier, finished exchange
        let stale = drain(lines);
        if stale > 0 {
            tracing::debug!("Discarded {} stale engine lines", stale);
        }

        self.send(&EngineCommand::SetPosition {
            fen: fen.to_string(),
        })
        .await?;
        tracing::info!("Starting engine calculation with movetime={}ms", movetime_ms);
        self.searching.store(true, Ordering::Release);
        self.send(&EngineCommand::Go { movetime_ms }).await?;

        let timeout = session_timeout(movetime_ms);
        let deadline = tokio::time::Instant::now() + timeout;
        let mut collector = AnalysisCollector::new(self.multi_pv());

        loop {
            match tokio::time::timeout_at(deadline, lines.recv()).await {
                Err(_) => return Err(EngineError::ProtocolTimeout(timeout)),
                Ok(None) => return Err(EngineError::UnexpectedExit),
                Ok(Some(line)) => {
                    if let Progress::BestMove(mv) = collector.feed(&line) {
                        self.searching.store(false, Ordering::Release);
                        tracing::debug!("Received bestmove: {:?}", mv);
                        return Ok(collector.finish(mv));
                    }
                }
            }
        }
    }

    /// Stop a search whose session timed out or was cancelled and discard
    /// its output up to and including its `bestmove`.
    ///
    /// An engine that never answers is retired: its late output could not be
    /// told apart from the next search's.
    async fn finish_abandoned_search(
        &self,
        lines: &mut mpsc::UnboundedReceiver<String>,
    ) -> Result<(), EngineError> {
        tracing::debug!("Previous search still running, sending stop");
        self.send(&EngineCommand::Stop).await?;

        let timeout = self.config.stop_timeout;
        match wait_for_bestmove(lines, timeout).await {
            Ok(discarded) => {
                tracing::debug!("Abandoned search finished, discarded {} lines", discarded);
                self.searching.store(false, Ordering::Release);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Engine did not finish abandoned search: {}", e);
                self.shared.mark_exited();
                self.kill().await;
                Err(e)
            }
        }
    }

    /// Send `quit`, give the engine `quit_grace` to exit, then kill it.
    ///
    /// Only the first call does anything.
    pub async fn quit_engine(&self) {
        let Some(mut child) = self.child.lock().await.take() else {
            tracing::debug!("Engine already shut down");
            return;
        };

        tracing::info!("Sending quit command to engine");
        if let Err(e) = self.send(&EngineCommand::Quit).await {
            tracing::debug!("Quit not delivered: {}", e);
        }
        self.shared.set_alive(false);
        self.shared.transition(EngineState::Terminated);
        *self.stdin.lock().await = None;

        wait_or_kill(&mut child, self.config.quit_grace).await;
    }

    /// Kill the process outright after a failed handshake or an unanswered
    /// `stop`.
    async fn kill(&self) {
        *self.stdin.lock().await = None;
        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(e) = child.kill().await {
                tracing::warn!("Failed to kill engine: {}", e);
            }
        }
    }
}

async fn wait_for_token(
    lines: &mut mpsc::UnboundedReceiver<String>,
    token: &'static str,
    timeout: Duration,
) -> Result<(), EngineError> {
    let wait = async {
        while let Some(line) = lines.recv().await {
            if has_token(&line, token) {
                return Ok(());
            }
        }
        Err(EngineError::UnexpectedExit)
    };

    tokio::time::timeout(timeout, wait)
        .await
        .map_err(|_| EngineError::HandshakeTimeout { token, timeout })?
}

/// Discard lines up to and including the next `bestmove`; returns how many
/// lines were dropped before it.
async fn wait_for_bestmove(
    lines: &mut mpsc::UnboundedReceiver<String>,
    timeout: Duration,
) -> Result<usize, EngineError> {
    let wait = async {
        let mut discarded = 0;
        while let Some(line) = lines.recv().await {
            if line.split_whitespace().next() == Some("bestmove") {
                return Ok(discarded);
            }
            discarded += 1;
        }
        Err(EngineError::UnexpectedExit)
    };

    tokio::time::timeout(timeout, wait)
        .await
        .map_err(|_| EngineError::ProtocolTimeout(timeout))?
}

/// Discard everything currently queued; returns how many lines were dropped.
fn drain(lines: &mut mpsc::UnboundedReceiver<String>) -> usize {
    let mut count = 0;
    while lines.try_recv().is_ok() {
        count += 1;
    }
    count
}

async fn wait_or_kill(child: &mut Child, grace: Duration) {
    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => tracing::info!("Engine exited: {}", status),
        Ok(Err(e)) => tracing::warn!("Failed to wait for engine: {}", e),
        Err(_) => {
            tracing::warn!("Engine did not exit within {:?}, killing", grace);
            if let Err(e) = child.kill().await {
                tracing::warn!("Failed to kill engine: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_drain_counts_stale_lines() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send("bestmove e2e4".to_string()).unwrap();
        tx.send("info depth 1".to_string()).unwrap();

        assert_eq!(drain(&mut rx), 2);
        assert_eq!(drain(&mut rx), 0);
    }

    #[tokio::test]
    async fn test_wait_for_token_skips_other_lines() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send("id name Fake".to_string()).unwrap();
        tx.send("option name Hash type spin".to_string()).unwrap();
        tx.send("uciok".to_string()).unwrap();

        wait_for_token(&mut rx, "uciok", Duration::from_millis(100))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_token_times_out() {
        let (_tx, mut rx) = mpsc::unbounded_channel::<String>();
        let result = wait_for_token(&mut rx, "readyok", Duration::from_millis(20)).await;
        assert!(matches!(
            result,
            Err(EngineError::HandshakeTimeout {
                token: "readyok",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_wait_for_token_closed_queue() {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        drop(tx);
        let result = wait_for_token(&mut rx, "uciok", Duration::from_secs(1)).await;
        assert!(matches!(result, Err(EngineError::UnexpectedExit)));
    }

    #[tokio::test]
    async fn test_wait_for_bestmove_discards_search_output() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send("info depth 1 multipv 1 score cp 9 pv a2a3".to_string()).unwrap();
        tx.send("info string bestmove soon".to_string()).unwrap();
        tx.send("bestmove a2a3".to_string()).unwrap();
        tx.send("info depth 1 multipv 1 score cp 2 pv h2h3".to_string()).unwrap();

        let discarded = wait_for_bestmove(&mut rx, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(discarded, 2);
        assert_eq!(drain(&mut rx), 1);
    }

    #[tokio::test]
    async fn test_wait_for_bestmove_times_out() {
        let (_tx, mut rx) = mpsc::unbounded_channel::<String>();
        let result = wait_for_bestmove(&mut rx, Duration::from_millis(20)).await;
        assert!(matches!(result, Err(EngineError::ProtocolTimeout(_))));
    }

    #[tokio::test]
    async fn test_invalid_path_is_disabled() {
        let config = EngineConfig::default().with_path("/nonexistent/stockfish");
        let engine = StockfishEngine::start(config).await;

        assert!(!engine.is_ready());
        assert_eq!(engine.state(), EngineState::Disabled);

        let result = engine.get_analysis(100).await;
        assert!(result.lines.is_empty());
        assert!(result.best_move.is_none());
        assert!(engine.get_threat(START_FEN, 100).await.is_none());

        engine.set_skill_level(5).await;
        assert_eq!(engine.skill_level(), 5);

        engine.quit_engine().await;
        engine.quit_engine().await;
        assert_eq!(engine.state(), EngineState::Disabled);
    }
}
