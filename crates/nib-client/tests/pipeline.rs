//! End-to-end pipeline tests with a scripted transport

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use nib_ai::request::GenerationOptions;
use nib_ai::transport::{ChunkStream, HttpRequest, Transport};
use nib_client::{Client, ClientOptions, Error, JsonFileStore, Notifier, NullStore, Severity};

/// Transport that replays canned chunks and records what it was sent
struct ScriptedTransport {
    chunks: Vec<nib_ai::Result<Vec<u8>>>,
    seen: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    fn replying(body: &[u8]) -> Arc<Self> {
        // Deliver in two chunks so aggregation is actually exercised.
        let mid = body.len() / 2;
        Arc::new(Self {
            chunks: vec![Ok(body[..mid].to_vec()), Ok(body[mid..].to_vec())],
            seen: Mutex::new(Vec::new()),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            chunks: vec![Err(nib_ai::Error::Transport(message.to_string()))],
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &HttpRequest) -> nib_ai::Result<ChunkStream> {
        self.seen.lock().unwrap().push(request.clone());
        let chunks: Vec<nib_ai::Result<Vec<u8>>> = self
            .chunks
            .iter()
            .map(|c| match c {
                Ok(bytes) => Ok(bytes.clone()),
                Err(e) => Err(nib_ai::Error::Transport(e.to_string())),
            })
            .collect();
        Ok(Box::pin(tokio_stream::iter(chunks)))
    }
}

/// Notifier that records everything it is told
#[derive(Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<(String, Severity)>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        self.messages
            .lock()
            .unwrap()
            .push((message.to_string(), severity));
    }
}

fn options() -> ClientOptions {
    ClientOptions {
        endpoint: "https://api.anthropic.com/v1/messages".to_string(),
        generation: GenerationOptions::default(),
        topics: HashMap::new(),
    }
}

fn client_with(transport: &Arc<ScriptedTransport>) -> (Client, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let client = Client::with_parts(
        options(),
        Some("sk-test".to_string()),
        Box::new(Arc::clone(transport)),
        Arc::new(NullStore),
        notifier.clone(),
        50,
    );
    (client, notifier)
}

#[tokio::test]
async fn submit_appends_turns_and_extracts_code() {
    let transport =
        ScriptedTransport::replying(br#"{"content":[{"text":"```go\nfmt.Println(x)\n```"}]}"#);
    let (mut client, _) = client_with(&transport);

    let completion = client.submit("explain x").await.unwrap();

    assert_eq!(completion.text, "```go\nfmt.Println(x)\n```");
    assert_eq!(client.history_len(), 2);
    assert_eq!(
        client.last_assistant_text().as_deref(),
        Some("```go\nfmt.Println(x)\n```")
    );

    let blocks = client.last_code_blocks();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].language.as_deref(), Some("go"));
    assert_eq!(blocks[0].code, "fmt.Println(x)");

    // The cursor lands on the newest turn; one step back is the prompt.
    let newest = client.cycle_history(0).unwrap();
    assert_eq!(newest.content, "```go\nfmt.Println(x)\n```");
    let previous = client.cycle_history(-1).unwrap();
    assert_eq!(previous.content, "explain x");
}

#[tokio::test]
async fn submit_sends_configured_payload() {
    let transport = ScriptedTransport::replying(br#"{"content":[{"text":"ok"}]}"#);
    let mut generation = GenerationOptions::default();
    generation.model = "claude-testing".to_string();
    generation.system_prompt = "answer tersely".to_string();

    let mut client = Client::with_parts(
        ClientOptions {
            endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            generation,
            topics: HashMap::new(),
        },
        Some("sk-test".to_string()),
        Box::new(Arc::clone(&transport)),
        Arc::new(NullStore),
        Arc::new(RecordingNotifier::default()),
        50,
    );

    client.submit("hello").await.unwrap();

    let seen = transport.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let request = &seen[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.url, "https://api.anthropic.com/v1/messages");
    assert!(
        request
            .headers
            .iter()
            .any(|(k, v)| k == "x-api-key" && v == "sk-test")
    );

    let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(body["model"], "claude-testing");
    assert_eq!(body["system"], "answer tersely");
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["messages"][0]["content"], "hello");
}

#[tokio::test]
async fn second_submit_carries_prior_turns() {
    let transport = ScriptedTransport::replying(br#"{"content":[{"text":"an answer"}]}"#);
    let (mut client, _) = client_with(&transport);

    client.submit("q1").await.unwrap();
    client.submit("q2").await.unwrap();

    let seen = transport.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    let body: serde_json::Value = serde_json::from_slice(&seen[1].body).unwrap();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0]["content"], "q1");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["content"], "an answer");
    assert_eq!(messages[2]["content"], "q2");
}

#[tokio::test]
async fn transport_failure_leaves_log_untouched_and_notifies() {
    let transport = ScriptedTransport::failing("connection refused");
    let (mut client, notifier) = client_with(&transport);

    let err = client.submit("explain x").await.unwrap_err();
    assert!(matches!(err, Error::Ai(nib_ai::Error::Transport(_))));
    assert_eq!(client.history_len(), 0);
    assert!(client.last_assistant_text().is_none());

    let messages = notifier.messages.lock().unwrap();
    assert!(
        messages
            .iter()
            .any(|(m, s)| *s == Severity::Error && m.contains("connection refused"))
    );
}

#[tokio::test]
async fn provider_error_surfaces_verbatim() {
    let transport = ScriptedTransport::replying(
        br#"{"error":{"type":"overloaded_error","message":"try later"}}"#,
    );
    let (mut client, _) = client_with(&transport);

    let err = client.submit("explain x").await.unwrap_err();
    match err {
        Error::Ai(nib_ai::Error::Provider { status, message }) => {
            assert_eq!(status, "overloaded_error");
            assert_eq!(message, "try later");
        }
        other => panic!("expected Provider, got {other:?}"),
    }
    assert_eq!(client.history_len(), 0);
}

#[tokio::test]
async fn missing_credential_fails_before_transport() {
    let transport = ScriptedTransport::replying(br#"{"content":[{"text":"never sent"}]}"#);
    let mut client = Client::with_parts(
        options(),
        None,
        Box::new(Arc::clone(&transport)),
        Arc::new(NullStore),
        Arc::new(RecordingNotifier::default()),
        50,
    );

    let err = client.submit("explain x").await.unwrap_err();
    assert!(err.is_config());
    assert!(transport.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn topic_override_changes_the_payload() {
    let transport = ScriptedTransport::replying(br#"{"content":[{"text":"ok"}]}"#);
    let mut topics = HashMap::new();
    topics.insert(
        "python".to_string(),
        nib_ai::request::TopicOverride {
            model: Some("claude-python-tuned".to_string()),
            ..Default::default()
        },
    );

    let mut client = Client::with_parts(
        ClientOptions {
            endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            generation: GenerationOptions::default(),
            topics,
        },
        Some("sk-test".to_string()),
        Box::new(Arc::clone(&transport)),
        Arc::new(NullStore),
        Arc::new(RecordingNotifier::default()),
        50,
    );

    client
        .submit_with_topic("sort a list", Some("python"))
        .await
        .unwrap();

    let seen = transport.seen.lock().unwrap();
    let body: serde_json::Value = serde_json::from_slice(&seen[0].body).unwrap();
    assert_eq!(body["model"], "claude-python-tuned");
}

#[tokio::test]
async fn history_persists_across_clients() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");

    {
        let transport =
            ScriptedTransport::replying(br#"{"content":[{"text":"persisted answer"}]}"#);
        let mut client = Client::with_parts(
            options(),
            Some("sk-test".to_string()),
            Box::new(transport),
            Arc::new(JsonFileStore::new(&path)),
            Arc::new(RecordingNotifier::default()),
            50,
        );
        client.submit("persisted question").await.unwrap();
    }

    // A fresh client over the same store starts with the saved turns.
    let mut reloaded = Client::with_parts(
        options(),
        Some("sk-test".to_string()),
        Box::new(ScriptedTransport::replying(b"{}")),
        Arc::new(JsonFileStore::new(&path)),
        Arc::new(RecordingNotifier::default()),
        50,
    );
    assert_eq!(reloaded.history_len(), 2);
    assert_eq!(
        reloaded.last_assistant_text().as_deref(),
        Some("persisted answer")
    );
    assert_eq!(
        reloaded.cycle_history(-1).unwrap().content,
        "persisted question"
    );
}

#[tokio::test]
async fn empty_prompt_is_a_config_error() {
    let transport = ScriptedTransport::replying(b"{}");
    let (mut client, _) = client_with(&transport);
    let err = client.submit("   ").await.unwrap_err();
    assert!(err.is_config());
}
