//! Subprocess transport: an external HTTP client with piped stdio
//!
//! The request body goes to the child over stdin; stdout chunks stream
//! out as they arrive while stderr is drained concurrently. A nonzero
//! exit or any bytes on stderr surface as a transport error, distinct
//! from a successful-but-empty body.

use std::process::Stdio;

use async_stream::stream;
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::transport::{ChunkStream, HttpRequest, Transport};

/// Transport backed by an external HTTP client process (curl by default)
pub struct CurlTransport {
    program: String,
}

impl CurlTransport {
    pub fn new() -> Self {
        Self {
            program: "curl".to_string(),
        }
    }

    /// Use a different client binary (e.g. a curl found off `PATH`)
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Blocking invocation for hosts without an async reactor.
    ///
    /// Degraded mode: the caller's thread is held for the full round
    /// trip. Prefer `send` wherever a runtime is available.
    pub fn send_blocking(&self, request: &HttpRequest) -> Result<Vec<u8>> {
        run_blocking(&self.program, curl_args(request), &request.body)
    }
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for CurlTransport {
    async fn send(&self, request: &HttpRequest) -> Result<ChunkStream> {
        tracing::debug!(program = %self.program, url = %request.url, "dispatching via subprocess");
        spawn_streaming(&self.program, curl_args(request), request.body.clone())
    }
}

/// Command line for the client binary: silent except for errors, body
/// read from stdin, response body written to stdout.
fn curl_args(request: &HttpRequest) -> Vec<String> {
    let mut args = vec![
        "-s".to_string(),
        "-S".to_string(),
        "-X".to_string(),
        request.method.clone(),
    ];
    for (name, value) in &request.headers {
        args.push("-H".to_string());
        args.push(format!("{name}: {value}"));
    }
    args.push("--data-binary".to_string());
    args.push("@-".to_string());
    args.push(request.url.clone());
    args
}

/// Blocking counterpart of `spawn_streaming`.
///
/// The body is fed from a separate thread, so a child that fills its
/// stdout pipe before draining stdin can't deadlock against the write.
fn run_blocking(program: &str, args: Vec<String>, body: &[u8]) -> Result<Vec<u8>> {
    let mut child = std::process::Command::new(program)
        .args(&args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::Transport(format!("failed to launch {program}: {e}")))?;

    let writer = child.stdin.take().map(|mut stdin| {
        let body = body.to_vec();
        std::thread::spawn(move || {
            use std::io::Write;
            let _ = stdin.write_all(&body);
        })
    });

    let output = child.wait_with_output()?;
    if let Some(handle) = writer {
        let _ = handle.join();
    }

    if !output.status.success() || !output.stderr.is_empty() {
        return Err(exit_error(program, output.status.code(), &output.stderr));
    }
    Ok(output.stdout)
}

/// Spawn the child, feed it the body, and stream its stdout.
///
/// The child and its pipes are owned by the returned stream and are
/// released when it is dropped, on every exit path.
fn spawn_streaming(program: &str, args: Vec<String>, body: Vec<u8>) -> Result<ChunkStream> {
    let mut child = tokio::process::Command::new(program)
        .args(&args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::Transport(format!("failed to launch {program}: {e}")))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| Error::Transport("child stdin unavailable".to_string()))?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::Transport("child stdout unavailable".to_string()))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| Error::Transport("child stderr unavailable".to_string()))?;

    // Feed the body from a separate task so a child that writes before
    // consuming all of stdin can't deadlock the pipe.
    let writer = tokio::spawn(async move {
        let _ = stdin.write_all(&body).await;
        let _ = stdin.shutdown().await;
    });

    let stderr_reader = tokio::spawn(async move {
        let mut captured = Vec::new();
        let _ = stderr.read_to_end(&mut captured).await;
        captured
    });

    let program = program.to_string();
    let chunks = stream! {
        let mut buf = [0u8; 8192];
        loop {
            match stdout.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => yield Ok(buf[..n].to_vec()),
                Err(e) => {
                    yield Err(Error::transport(e));
                    return;
                }
            }
        }

        let _ = writer.await;
        let captured = stderr_reader.await.unwrap_or_default();
        match child.wait().await {
            Ok(status) if status.success() && captured.is_empty() => {}
            Ok(status) => yield Err(exit_error(&program, status.code(), &captured)),
            Err(e) => yield Err(Error::transport(e)),
        }
    };

    Ok(Box::pin(chunks))
}

fn exit_error(program: &str, code: Option<i32>, stderr: &[u8]) -> Error {
    let detail = String::from_utf8_lossy(stderr);
    let detail = detail.trim();
    if detail.is_empty() {
        Error::Transport(format!(
            "{program} exited with status {}",
            code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
        ))
    } else {
        Error::Transport(format!("{program}: {detail}"))
    }
}
