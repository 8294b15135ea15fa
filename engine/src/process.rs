//! Engine subprocess spawning and the background output reader.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdin};
use tokio::sync::mpsc;

use crate::error::EngineError;
use crate::state::SharedState;

/// A freshly spawned engine whose stdout is already being drained.
pub struct EngineProcess {
    pub child: Child,
    pub stdin: ChildStdin,
    /// Engine output, one trimmed line per message, in arrival order.
    pub lines: mpsc::UnboundedReceiver<String>,
}

/// Spawn the engine at `path` with piped stdin/stdout and start the reader
/// task.
///
/// Marks `shared` alive on success. The reader clears it again when the
/// engine's stdout closes.
pub fn spawn(path: &Path, shared: Arc<SharedState>) -> Result<EngineProcess, EngineError> {
    tracing::debug!("Spawning engine process: {}", path.display());
    let mut child = tokio::process::Command::new(path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| EngineError::ExecutableNotFound {
            path: path.to_path_buf(),
            source,
        })?;

    let stdin = child.stdin.take().ok_or(EngineError::MissingPipe("stdin"))?;
    let stdout = child.stdout.take().ok_or(EngineError::MissingPipe("stdout"))?;

    let (line_tx, lines) = mpsc::unbounded_channel();
    shared.set_alive(true);

    tracing::debug!("Spawning output reader task");
    tokio::spawn(read_output_loop(BufReader::new(stdout), line_tx, shared));

    Ok(EngineProcess {
        child,
        stdin,
        lines,
    })
}

/// Forward every non-empty line from `reader` to `line_tx` until EOF or a
/// read error, then mark the engine as exited.
///
/// Dropping `line_tx` on exit wakes any consumer waiting on the queue.
pub async fn read_output_loop<R>(
    mut reader: R,
    line_tx: mpsc::UnboundedSender<String>,
    shared: Arc<SharedState>,
) where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                tracing::warn!("Engine stdout EOF - engine closed");
                break;
            }
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                tracing::trace!("UCI << {}", trimmed);

                if line_tx.send(trimmed.to_string()).is_err() {
                    tracing::debug!("Output queue closed, stopping reader");
                    break;
                }
            }
            Err(e) => {
                tracing::error!("Error reading from engine stdout: {}", e);
                break;
            }
        }
    }

    shared.mark_exited();
    tracing::info!("Output reader task exiting");
}
