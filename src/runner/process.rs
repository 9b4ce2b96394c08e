//! Captured, mirrored and cancellable shell execution.

use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, info};

use crate::context::Context;
use crate::error::{ApplyError, CribError, Result};

/// Serializes external command execution across the process.
static EXEC_GATE: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

type Buffer = Arc<Mutex<Vec<u8>>>;

async fn pump<R, W>(mut reader: R, mut mirror: Option<W>, buffer: Buffer) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut chunk = [0_u8; 4096];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        if let Some(out) = mirror.as_mut() {
            out.write_all(&chunk[..n]).await?;
            out.flush().await?;
        }
        buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(&chunk[..n]);
    }
}

/// Runs `line` through `shell -c`, returning combined stdout and stderr.
///
/// Output is captured in arrival order and, with `mirror`, copied live to
/// this process's stdout and stderr. Cancelling `ctx` kills the child.
pub(crate) async fn run_shell(
    ctx: &Context,
    shell: &Path,
    line: &str,
    mirror: bool,
) -> Result<Vec<u8>> {
    let command = format!("{} -c {line}", shell.display());
    let _gate = EXEC_GATE.lock().await;
    if ctx.is_cancelled() {
        return Err(ApplyError::Cancelled { command }.into());
    }

    info!("Executing {}", line);
    let mut child = Command::new(shell)
        .arg("-c")
        .arg(line)
        .kill_on_drop(true)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ApplyError::Spawn {
            command: command.clone(),
            source,
        })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| CribError::internal("child stdout not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| CribError::internal("child stderr not captured"))?;

    let buffer = Buffer::default();
    let run = async {
        let (out, err) = tokio::join!(
            pump(stdout, mirror.then(tokio::io::stdout), Arc::clone(&buffer)),
            pump(stderr, mirror.then(tokio::io::stderr), Arc::clone(&buffer)),
        );
        out?;
        err?;
        child.wait().await
    };

    let status = tokio::select! {
        status = run => status.map_err(|source| ApplyError::Spawn {
            command: command.clone(),
            source,
        })?,
        () = ctx.cancellation().cancelled() => {
            debug!("Cancelled {}", command);
            return Err(ApplyError::Cancelled { command }.into());
        }
    };

    let output = std::mem::take(&mut *buffer.lock().unwrap_or_else(PoisonError::into_inner));
    if !status.success() {
        return Err(ApplyError::CommandFailed {
            command,
            status: status.code(),
            output: String::from_utf8_lossy(&output).into_owned(),
        }
        .into());
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SH: &str = "/bin/sh";

    #[tokio::test]
    async fn test_captures_both_streams() {
        let output = run_shell(&Context::new(), Path::new(SH), "echo out; echo err 1>&2", false)
            .await
            .unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("out\n"));
        assert!(text.contains("err\n"));
    }

    #[tokio::test]
    async fn test_failure_carries_status_and_output() {
        let err = run_shell(&Context::new(), Path::new(SH), "echo nope; exit 3", false)
            .await
            .unwrap_err();
        match err {
            CribError::Apply(ApplyError::CommandFailed { status, output, .. }) => {
                assert_eq!(status, Some(3));
                assert_eq!(output, "nope\n");
            }
            other => panic!("expected command failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_context_stops_command() {
        let ctx = Context::new();
        let runner = {
            let ctx = ctx.clone();
            tokio::spawn(async move { run_shell(&ctx, Path::new(SH), "sleep 30", false).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        ctx.cancel();
        let err = runner.await.unwrap().unwrap_err();
        assert!(matches!(err, CribError::Apply(ApplyError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn test_missing_shell_fails_to_spawn() {
        let err = run_shell(&Context::new(), Path::new("/no/such/shell"), "true", false)
            .await
            .unwrap_err();
        assert!(matches!(err, CribError::Apply(ApplyError::Spawn { .. })));
    }
}
