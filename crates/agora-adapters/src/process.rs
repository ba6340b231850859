//! Subprocess plumbing shared by the CLI adapters.
//!
//! All CLI adapters run their tool the same way: spawn the binary with
//! piped stdio, enforce a timeout, and either collect stdout in one shot
//! or forward it line by line as stream chunks.

use agora_core::{AdapterError, AdapterResult, ChunkStream, StreamChunk};
use futures::StreamExt;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::debug;

/// Whether `command` resolves on the PATH.
pub(crate) async fn cli_available(command: &str) -> bool {
    Command::new("which")
        .arg(command)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Fail with a `CliNotFound` carrying the install hint when `command` is
/// not on the PATH.
pub(crate) async fn ensure_cli(
    adapter: &str,
    command: &str,
    install_hint: &str,
) -> AdapterResult<()> {
    if cli_available(command).await {
        Ok(())
    } else {
        Err(AdapterError::CliNotFound {
            adapter: adapter.to_string(),
            command: command.to_string(),
            install_hint: install_hint.to_string(),
        })
    }
}

/// Whether `command --version` exits cleanly within a short window.
pub(crate) async fn cli_responds(command: &str) -> bool {
    let mut cmd = Command::new(command);
    cmd.arg("--version").stdout(Stdio::null()).stderr(Stdio::null());
    match tokio::time::timeout(Duration::from_secs(10), cmd.output()).await {
        Ok(Ok(output)) => output.status.success(),
        _ => false,
    }
}

/// Run a CLI to completion and return its stdout.
pub(crate) async fn run_cli(
    adapter: &str,
    command: &str,
    args: &[String],
    timeout: Duration,
) -> AdapterResult<String> {
    let mut cmd = Command::new(command);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(adapter, command, "Invoking CLI");

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| AdapterError::Timeout {
            adapter: adapter.to_string(),
            timeout,
        })?
        .map_err(|e| AdapterError::Execution {
            adapter: adapter.to_string(),
            message: e.to_string(),
            exit_code: None,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = if stderr.trim().is_empty() {
            format!("CLI exited with code {:?}", output.status.code())
        } else {
            stderr.trim().to_string()
        };
        return Err(AdapterError::Execution {
            adapter: adapter.to_string(),
            message,
            exit_code: output.status.code(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Spawn a CLI and forward its stdout as a chunk stream.
///
/// Each stdout line goes through `parse`; lines that yield text become
/// chunks. The final chunk reports success or carries stderr when the
/// process exits non-zero. Dropping the stream kills the process.
pub(crate) fn spawn_cli_stream<F>(
    adapter: String,
    command: &str,
    args: &[String],
    timeout: Duration,
    parse: F,
) -> AdapterResult<ChunkStream>
where
    F: Fn(&str) -> Option<String> + Send + Sync + 'static,
{
    let mut cmd = Command::new(command);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(adapter = %adapter, command, "Invoking CLI (streaming)");

    let mut child = cmd.spawn().map_err(|e| AdapterError::Execution {
        adapter: adapter.clone(),
        message: format!("failed to spawn: {}", e),
        exit_code: None,
    })?;
    let stdout = child.stdout.take().ok_or_else(|| AdapterError::Execution {
        adapter: adapter.clone(),
        message: "failed to capture stdout".to_string(),
        exit_code: None,
    })?;

    let (tx, rx) = mpsc::channel::<StreamChunk>(32);
    tokio::spawn(async move {
        let pump = async {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if let Some(text) = parse(line) {
                    if !text.is_empty() && tx.send(StreamChunk::text(text)).await.is_err() {
                        // Receiver dropped: execution was canceled
                        return;
                    }
                }
            }
            match child.wait().await {
                Ok(status) if !status.success() => {
                    let mut stderr_buf = String::new();
                    if let Some(mut stderr) = child.stderr.take() {
                        let _ = stderr.read_to_string(&mut stderr_buf).await;
                    }
                    let message = if stderr_buf.trim().is_empty() {
                        format!("CLI exited with code {:?}", status.code())
                    } else {
                        stderr_buf.trim().to_string()
                    };
                    let _ = tx.send(StreamChunk::failed(message)).await;
                }
                Ok(_) => {
                    let _ = tx.send(StreamChunk::done()).await;
                }
                Err(e) => {
                    let _ = tx.send(StreamChunk::failed(e.to_string())).await;
                }
            }
        };
        if tokio::time::timeout(timeout, pump).await.is_err() {
            let _ = tx
                .send(StreamChunk::failed(format!(
                    "execution timed out after {}s",
                    timeout.as_secs()
                )))
                .await;
        }
    });

    Ok(futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    })
    .boxed())
}
