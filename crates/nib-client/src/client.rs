//! The editor-facing client facade
//!
//! One `Client` per hosting application instance. It owns the
//! conversation log, holds the configured transport as a trait object,
//! and runs the pipeline: build request, dispatch, aggregate, parse,
//! append, extract.

use std::collections::HashMap;
use std::sync::Arc;

use nib_ai::{
    CodeBlock, Completion, Turn,
    request::{self, GenerationOptions, TopicOverride},
    transport::{CurlTransport, HttpRequest, SocketTransport, Transport, TransportConfig, aggregate},
};

use crate::{
    config::{Config, TransportKind},
    error::Result,
    history::ConversationLog,
    notify::{Notifier, Severity},
    store::{HistoryStore, JsonFileStore, NullStore},
};

/// Runtime-settable options, replaceable as a unit via `configure`
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub endpoint: String,
    pub generation: GenerationOptions,
    pub topics: HashMap<String, TopicOverride>,
}

impl ClientOptions {
    fn from_config(config: &Config) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            generation: config.generation_options(),
            topics: config.topics.clone(),
        }
    }
}

/// The completion client consumed by the editor glue
pub struct Client {
    options: ClientOptions,
    api_key: Option<String>,
    transport: Box<dyn Transport>,
    transport_config: TransportConfig,
    log: ConversationLog,
    notifier: Arc<dyn Notifier>,
}

impl Client {
    /// Build a client from configuration: transport per the configured
    /// kind, history store per the configured path, credential resolved
    /// once here. A missing credential is reported through the notifier
    /// immediately but construction still succeeds — every `submit`
    /// will fail fast until it is provided.
    pub fn from_config(config: &Config, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let transport_config = TransportConfig::default();
        let transport: Box<dyn Transport> = match config.transport {
            TransportKind::Curl => Box::new(CurlTransport::with_program(&config.http_client)),
            TransportKind::Socket => Box::new(SocketTransport::new(transport_config.clone())?),
        };

        let store: Arc<dyn HistoryStore> = match &config.history_file {
            Some(path) => Arc::new(JsonFileStore::new(path)),
            None => Arc::new(NullStore),
        };

        let api_key = config.resolve_api_key();
        if api_key.is_none() {
            notifier.notify(
                "no API key: set ANTHROPIC_API_KEY or api_key in the config file",
                Severity::Error,
            );
        }

        Ok(Self {
            options: ClientOptions::from_config(config),
            api_key,
            transport,
            transport_config,
            log: ConversationLog::new(config.max_history, store),
            notifier,
        })
    }

    /// Assemble a client from explicit parts. Hosts use this to inject
    /// their own transport or store; tests use it for mocks.
    pub fn with_parts(
        options: ClientOptions,
        api_key: Option<String>,
        transport: Box<dyn Transport>,
        store: Arc<dyn HistoryStore>,
        notifier: Arc<dyn Notifier>,
        max_history: usize,
    ) -> Self {
        Self {
            options,
            api_key,
            transport,
            transport_config: TransportConfig::default(),
            log: ConversationLog::new(max_history, store),
            notifier,
        }
    }

    /// Replace the runtime options as a unit
    pub fn configure(&mut self, options: ClientOptions) {
        self.options = options;
    }

    /// Send a prompt and wait for the completion.
    ///
    /// Taking `&mut self` serializes submits: a second request cannot be
    /// issued while one is outstanding, so completions always append to
    /// the log in request order. Nothing is appended until the exchange
    /// completes. No automatic retries; every failure is terminal for
    /// this call.
    pub async fn submit(&mut self, prompt: &str) -> Result<Completion> {
        self.submit_with_topic(prompt, None).await
    }

    /// Like `submit`, with per-topic overrides resolved from the
    /// language/topic identifier.
    pub async fn submit_with_topic(
        &mut self,
        prompt: &str,
        topic: Option<&str>,
    ) -> Result<Completion> {
        match self.run_exchange(prompt, topic).await {
            Ok(completion) => Ok(completion),
            Err(e) => {
                self.notifier.notify(&e.to_string(), Severity::Error);
                Err(e)
            }
        }
    }

    async fn run_exchange(&mut self, prompt: &str, topic: Option<&str>) -> Result<Completion> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| nib_ai::Error::Config("API key is missing".to_string()))?;

        let generation = self.options.generation.for_topic(topic, &self.options.topics);
        let history: Vec<Turn> = self.log.turns().cloned().collect();
        let payload = request::build_request(prompt, &history, &generation)?;
        let headers = request::build_headers(api_key)?;
        let body = serde_json::to_vec(&payload).map_err(nib_ai::Error::from)?;
        let http = HttpRequest::post(&self.options.endpoint, headers, body);

        tracing::debug!(model = %generation.model, "submitting completion request");
        self.notifier.notify("waiting for completion...", Severity::Info);

        let stream = self.transport.send(&http).await?;
        let raw = aggregate(stream, self.transport_config.response_timeout).await?;

        let text = if self.transport.delivers_http_response() {
            nib_ai::envelope::parse_http_envelope(&raw)?
        } else {
            nib_ai::envelope::parse_envelope(&raw)?
        };

        // The exchange is complete; only now does the log change.
        self.log.append(Turn::user(prompt));
        self.log.append(Turn::assistant(&text));

        Ok(Completion::from_text(text))
    }

    /// The most recent assistant reply, verbatim ("apply recommendation")
    pub fn last_assistant_text(&self) -> Option<String> {
        self.log.last_assistant_text().map(|s| s.to_string())
    }

    /// Fenced code regions of the most recent assistant reply, recomputed
    /// on demand; the first is the one "insert code at cursor" uses.
    pub fn last_code_blocks(&self) -> Vec<CodeBlock> {
        self.log
            .last_assistant_text()
            .map(nib_ai::extract::code_blocks)
            .unwrap_or_default()
    }

    /// Move the history cursor by `step` and return the turn there.
    /// `&mut self` keeps cycling and an in-flight submit from
    /// interleaving.
    pub fn cycle_history(&mut self, step: i64) -> Option<Turn> {
        self.log.cycle(step).cloned()
    }

    /// Number of turns currently in the log
    pub fn history_len(&self) -> usize {
        self.log.len()
    }
}
