//! Transport abstraction and response aggregation
//!
//! A transport delivers a single prepared HTTP request and yields the raw
//! response as a stream of byte chunks with unpredictable boundaries. Two
//! implementations share the contract: `CurlTransport` (subprocess HTTP
//! client) and `SocketTransport` (hand-rolled HTTP/1.1 over TCP/TLS).

pub mod curl;
pub mod socket;

use std::{pin::Pin, time::Duration};

use async_trait::async_trait;
use futures::StreamExt;
use tokio_stream::Stream;

use crate::error::{Error, Result};

pub use curl::CurlTransport;
pub use socket::SocketTransport;

/// A prepared request: everything a transport needs to dispatch it
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Create a POST request with a JSON body
    pub fn post(url: impl Into<String>, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self {
            method: "POST".to_string(),
            url: url.into(),
            headers,
            body,
        }
    }
}

/// A stream of response byte chunks, terminated by end-of-stream or an error
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// Delivers one request and yields the raw response bytes.
///
/// Implementations guarantee at most one logical response stream per
/// `send` call, and release their resources (pipes, sockets, TLS
/// session) on every exit path including error and timeout.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<ChunkStream>;

    /// Whether this transport's chunks carry a full HTTP response
    /// (status line and headers) rather than just the body.
    fn delivers_http_response(&self) -> bool {
        false
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: &HttpRequest) -> Result<ChunkStream> {
        (**self).send(request).await
    }

    fn delivers_http_response(&self) -> bool {
        (**self).delivers_http_response()
    }
}

/// Fixed transport timing. Set once at construction; not caller-adjustable
/// per call.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// TCP connect timeout (raw-socket transport)
    pub connect_timeout: Duration,
    /// Maximum gap between chunks before the read is abandoned
    pub idle_timeout: Duration,
    /// Overall deadline for aggregating a full response
    pub response_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(30),
            response_timeout: Duration::from_secs(120),
        }
    }
}

// ============================================================================
// Response aggregation
// ============================================================================

/// Aggregation state: collecting chunks, or done with an outcome.
enum State {
    Collecting(Vec<u8>),
    Done(Result<Vec<u8>>),
}

/// Buffers chunks until end-of-stream. All-or-nothing: no partial bytes
/// are ever exposed, and a failure drops whatever was collected.
pub struct Aggregator {
    state: State,
}

impl Aggregator {
    pub fn new() -> Self {
        Self {
            state: State::Collecting(Vec::new()),
        }
    }

    /// Append one chunk. Ignored once the aggregation is done.
    pub fn push(&mut self, chunk: &[u8]) {
        if let State::Collecting(buf) = &mut self.state {
            buf.extend_from_slice(chunk);
        }
    }

    /// Transition to `Done` on end-of-stream.
    pub fn finish(&mut self) {
        if let State::Collecting(buf) = &mut self.state {
            self.state = State::Done(Ok(std::mem::take(buf)));
        }
    }

    /// Transition to `Done` on a transport error.
    pub fn fail(&mut self, error: Error) {
        if matches!(self.state, State::Collecting(_)) {
            self.state = State::Done(Err(error));
        }
    }

    /// Consume the aggregator, yielding the full byte sequence or the
    /// terminal error. A still-collecting aggregator has seen no
    /// terminal signal, which is itself a failure.
    pub fn into_result(self) -> Result<Vec<u8>> {
        match self.state {
            State::Done(result) => result,
            State::Collecting(_) => Err(Error::Transport(
                "stream ended without a terminal signal".to_string(),
            )),
        }
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Drive a chunk stream to completion under a deadline.
///
/// On a stream error or on timeout the partial buffer is dropped; the
/// parser downstream only ever sees a complete byte sequence.
pub async fn aggregate(mut stream: ChunkStream, timeout: Duration) -> Result<Vec<u8>> {
    let collect = async {
        let mut aggregator = Aggregator::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => aggregator.push(&chunk),
                Err(e) => {
                    aggregator.fail(e);
                    return aggregator.into_result();
                }
            }
        }
        aggregator.finish();
        aggregator.into_result()
    };

    match tokio::time::timeout(timeout, collect).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(timeout)),
    }
}
