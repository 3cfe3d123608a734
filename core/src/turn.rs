use tracing::{debug, info, warn};

use crate::citations::linkify_citations;
use crate::client::ChatBackend;
use crate::config::CurioConfig;
use crate::conversation::ConversationStore;
use crate::errors::{CurioError, CurioResult};
use crate::links::rewrite_links;
use crate::prompts::{error_reply, CREDENTIAL_PROMPT, NO_RESULTS_NOTICE, SYSTEM_PROMPT, USER_SUFFIX};
use crate::stream::{decode_stream, DecodedStream};
use crate::types::{ChatCompletionRequest, Message, Role, StreamMetadata};

/// How a single turn ended
#[derive(Debug)]
pub enum TurnOutcome {
    /// The assistant answered; `reply` is the rendered text now at the end of the history
    Answered {
        reply: String,
        metadata: StreamMetadata,
    },
    /// The request failed; `reply` is the apology recorded in the history
    Failed { reply: String, error: CurioError },
    /// No API key is configured, nothing was sent and no reply was recorded
    MissingCredential { prompt: String, error: CurioError },
}

impl TurnOutcome {
    /// The text to show the user for this turn
    pub fn text(&self) -> &str {
        match self {
            TurnOutcome::Answered { reply, .. } => reply,
            TurnOutcome::Failed { reply, .. } => reply,
            TurnOutcome::MissingCredential { prompt, .. } => prompt,
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self, TurnOutcome::Answered { .. })
    }
}

/// Runs one user turn end to end: request, stream decoding, rendering and history update
pub struct TurnOrchestrator<B> {
    backend: B,
}

impl<B: ChatBackend> TurnOrchestrator<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Appends `user_text` to `history`, asks the backend for a reply and records it.
    ///
    /// Whatever happens after the credential check, exactly one assistant message
    /// follows the new user message. `observer` sees the partial content as it streams.
    pub async fn handle_turn(
        &self,
        history: &mut ConversationStore,
        user_text: &str,
        config: &CurioConfig,
        observer: Option<&mut dyn FnMut(&str)>,
    ) -> TurnOutcome {
        history.push_user(user_text);

        let api_key = match config.require_api_key() {
            Ok(key) => key,
            Err(error) => {
                warn!(error = %error, "Skipping request");
                return TurnOutcome::MissingCredential {
                    prompt: CREDENTIAL_PROMPT.to_string(),
                    error,
                };
            }
        };

        match self.request_reply(history, api_key, config, observer).await {
            Ok(decoded) => {
                let metadata = decoded.metadata.clone();
                let reply = render_reply(decoded, config);
                history.push_assistant(reply.clone());
                TurnOutcome::Answered { reply, metadata }
            }
            Err(error) => {
                warn!(error = %error, transport = error.is_transport(), "Turn failed");
                let reply = error_reply(&error.to_string());
                history.push_assistant(reply.clone());
                TurnOutcome::Failed { reply, error }
            }
        }
    }

    async fn request_reply(
        &self,
        history: &ConversationStore,
        api_key: &str,
        config: &CurioConfig,
        observer: Option<&mut dyn FnMut(&str)>,
    ) -> CurioResult<DecodedStream> {
        let request = build_request(history, config);
        let body = self.backend.stream_chat(api_key, &request).await?;
        let decoded = decode_stream(body, observer).await?;
        debug!(content = %decoded.content, "Decoded assistant content");
        Ok(decoded)
    }
}

/// Builds the outbound request for the current history.
///
/// The leading greeting is not sent, every user message carries the resource
/// instruction suffix, and back-to-back user messages (left by a turn that never
/// reached the API) are folded into one so roles keep alternating.
pub fn build_request(history: &ConversationStore, config: &CurioConfig) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: config.model,
        messages: build_messages(history),
        temperature: config.temperature,
        stream: true,
        search_recency_filter: config.search_recency.as_filter().map(str::to_string),
    }
}

fn build_messages(history: &ConversationStore) -> Vec<Message> {
    let mut messages = vec![Message::system(SYSTEM_PROMPT)];

    for message in history.iter().skip_while(|m| m.role == Role::Assistant) {
        match message.role {
            Role::User => {
                let content = format!("{}{}", message.content, USER_SUFFIX);
                match messages.last_mut() {
                    Some(last) if last.role == Role::User => {
                        last.content.push_str("\n\n");
                        last.content.push_str(&content);
                    }
                    _ => messages.push(Message::user(content)),
                }
            }
            Role::Assistant => messages.push(message.clone()),
            Role::System => {}
        }
    }

    messages
}

/// Turns decoded content into the text stored and displayed for the turn
pub fn render_reply(decoded: DecodedStream, config: &CurioConfig) -> String {
    let DecodedStream {
        mut content,
        metadata,
    } = decoded;

    if metadata.has_results() {
        info!(count = metadata.results().len(), "Found search results");
        if config.link_citations {
            content = linkify_citations(&content, metadata.results());
        }
    } else {
        info!("No search results found");
        content.push_str(NO_RESULTS_NOTICE);
    }

    if let Some(tokens) = metadata.total_tokens() {
        debug!(total_tokens = tokens, "Token usage");
    }

    rewrite_links(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ByteStream;
    use crate::prompts::GREETING;
    use crate::types::{Model, SearchRecency};
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Backend that replays canned event lines and records what it was sent
    struct MockBackend {
        lines: Vec<String>,
        status: Option<u16>,
        break_stream: bool,
        calls: AtomicUsize,
        last_request: Mutex<Option<ChatCompletionRequest>>,
    }

    impl MockBackend {
        fn replying(lines: &[&str]) -> Self {
            Self {
                lines: lines.iter().map(|l| l.to_string()).collect(),
                status: None,
                break_stream: false,
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                status: Some(status),
                ..Self::replying(&[])
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_request(&self) -> ChatCompletionRequest {
            self.last_request.lock().unwrap().clone().unwrap()
        }
    }

    #[async_trait]
    impl ChatBackend for MockBackend {
        async fn stream_chat(
            &self,
            _api_key: &str,
            request: &ChatCompletionRequest,
        ) -> CurioResult<ByteStream> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());

            if let Some(status_code) = self.status {
                return Err(CurioError::HttpError {
                    status_code,
                    message: "upstream unavailable".to_string(),
                });
            }

            let mut chunks: Vec<CurioResult<Bytes>> = self
                .lines
                .iter()
                .map(|line| Ok(Bytes::from(format!("{}\n", line))))
                .collect();
            if self.break_stream {
                chunks.push(Err(CurioError::StreamError("connection reset".to_string())));
            }
            Ok(Box::pin(stream::iter(chunks)))
        }
    }

    fn config() -> CurioConfig {
        CurioConfig {
            api_key: Some("pplx-test".to_string()),
            ..CurioConfig::default()
        }
    }

    const WITH_RESULTS: &[&str] = &[
        r#"data: {"choices":[{"delta":{"content":"Start here [1]: "}}]}"#,
        r#"data: {"choices":[{"delta":{"content":"https://www.youtube.com/watch?v=dQw4w9WgXcQ"}}]}"#,
        r#"data: {"search_results":[{"url":"https://yt.example/v","title":"Intro video"}]}"#,
        "data: [DONE]",
    ];

    #[tokio::test]
    async fn test_missing_key_makes_no_call() {
        let orchestrator = TurnOrchestrator::new(MockBackend::replying(WITH_RESULTS));
        let mut history = ConversationStore::new();
        let config = CurioConfig::default();

        let outcome = orchestrator
            .handle_turn(&mut history, "algebra, grade 8", &config, None)
            .await;

        assert!(matches!(
            outcome,
            TurnOutcome::MissingCredential {
                error: CurioError::MissingApiKey,
                ..
            }
        ));
        assert_eq!(outcome.text(), CREDENTIAL_PROMPT);
        assert_eq!(orchestrator.backend().calls(), 0);
        assert_eq!(history.len(), 2);
        assert_eq!(history.messages()[0], Message::assistant(GREETING));
        assert_eq!(history.messages()[1], Message::user("algebra, grade 8"));
    }

    #[tokio::test]
    async fn test_answered_turn_renders_and_records_reply() {
        let orchestrator = TurnOrchestrator::new(MockBackend::replying(WITH_RESULTS));
        let mut history = ConversationStore::new();

        let outcome = orchestrator
            .handle_turn(&mut history, "music theory", &config(), None)
            .await;

        let (reply, metadata) = match outcome {
            TurnOutcome::Answered { reply, metadata } => (reply, metadata),
            other => panic!("unexpected outcome: {:?}", other),
        };
        assert!(reply.starts_with("Start here [1]: "));
        assert!(reply.contains("https://www.youtube.com/embed/dQw4w9WgXcQ"));
        assert!(!reply.contains("watch?v="));
        assert!(!reply.contains("No search results found"));
        assert_eq!(metadata.results().len(), 1);

        assert_eq!(history.len(), 3);
        assert_eq!(history.last().unwrap(), &Message::assistant(reply));
        assert_eq!(orchestrator.backend().calls(), 1);
    }

    #[tokio::test]
    async fn test_request_shape() {
        let orchestrator = TurnOrchestrator::new(MockBackend::replying(WITH_RESULTS));
        let mut history = ConversationStore::new();
        let config = CurioConfig {
            model: Model::SonarPro,
            temperature: 0.2,
            search_recency: SearchRecency::Week,
            ..config()
        };

        orchestrator
            .handle_turn(&mut history, "biology", &config, None)
            .await;
        orchestrator
            .handle_turn(&mut history, "only cells please", &config, None)
            .await;

        let request = orchestrator.backend().last_request();
        assert_eq!(request.model, Model::SonarPro);
        assert_eq!(request.temperature, 0.2);
        assert!(request.stream);
        assert_eq!(request.search_recency_filter.as_deref(), Some("week"));

        let roles: Vec<Role> = request.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(request.messages[0].content, SYSTEM_PROMPT);
        assert_eq!(
            request.messages[1].content,
            format!("biology{}", USER_SUFFIX)
        );
        assert_eq!(
            request.messages[3].content,
            format!("only cells please{}", USER_SUFFIX)
        );

        // Stored history is never decorated
        assert_eq!(history.messages()[1].content, "biology");
        assert_eq!(history.messages()[3].content, "only cells please");
    }

    #[tokio::test]
    async fn test_any_recency_is_omitted() {
        let orchestrator = TurnOrchestrator::new(MockBackend::replying(WITH_RESULTS));
        let mut history = ConversationStore::new();

        orchestrator
            .handle_turn(&mut history, "geometry", &config(), None)
            .await;

        assert_eq!(orchestrator.backend().last_request().search_recency_filter, None);
    }

    #[tokio::test]
    async fn test_no_results_appends_notice() {
        let orchestrator = TurnOrchestrator::new(MockBackend::replying(&[
            r#"data: {"choices":[{"delta":{"content":"Read https://x.org/a.pdf"}}]}"#,
            r#"data: {"search_results":[]}"#,
            "data: [DONE]",
        ]));
        let mut history = ConversationStore::new();

        let outcome = orchestrator
            .handle_turn(&mut history, "poetry", &config(), None)
            .await;

        assert!(outcome.is_answered());
        let reply = outcome.text();
        assert!(reply.contains("📄 https://x.org/a.pdf"));
        assert!(reply.contains("**🔍 No search results found**"));
        assert!(reply.ends_with("This might be due to the query type or API configuration."));
    }

    #[tokio::test]
    async fn test_transport_failure_records_apology() {
        let orchestrator = TurnOrchestrator::new(MockBackend::failing(503));
        let mut history = ConversationStore::new();

        let outcome = orchestrator
            .handle_turn(&mut history, "physics", &config(), None)
            .await;

        match &outcome {
            TurnOutcome::Failed { reply, error } => {
                assert!(error.is_transport());
                assert!(reply.starts_with("Sorry, I encountered an error:"));
                assert!(reply.contains("503"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        assert_eq!(history.len(), 3);
        assert_eq!(history.messages()[1], Message::user("physics"));
        assert_eq!(history.messages()[2].role, Role::Assistant);
        assert_eq!(history.messages()[2].content, outcome.text());
    }

    #[tokio::test]
    async fn test_broken_stream_fails_turn() {
        let mut backend = MockBackend::replying(&[
            r#"data: {"choices":[{"delta":{"content":"half an ans"}}]}"#,
        ]);
        backend.break_stream = true;
        let orchestrator = TurnOrchestrator::new(backend);
        let mut history = ConversationStore::new();

        let outcome = orchestrator
            .handle_turn(&mut history, "history", &config(), None)
            .await;

        assert!(matches!(outcome, TurnOutcome::Failed { .. }));
        assert!(!outcome.text().contains("half an ans"));
        assert_eq!(history.len(), 3);
    }

    #[tokio::test]
    async fn test_citation_linking_is_opt_in() {
        let mut history = ConversationStore::new();

        let orchestrator = TurnOrchestrator::new(MockBackend::replying(WITH_RESULTS));
        let outcome = orchestrator
            .handle_turn(&mut history, "music", &config(), None)
            .await;
        assert!(!outcome.text().contains("[1](https://yt.example/v"));

        let linked = CurioConfig {
            link_citations: true,
            ..config()
        };
        let outcome = orchestrator
            .handle_turn(&mut history, "music again", &linked, None)
            .await;
        assert!(outcome
            .text()
            .contains("[1](https://yt.example/v \"Intro video\")"));
    }

    #[tokio::test]
    async fn test_observer_receives_partial_content() {
        let orchestrator = TurnOrchestrator::new(MockBackend::replying(WITH_RESULTS));
        let mut history = ConversationStore::new();

        let mut partials: Vec<String> = Vec::new();
        let mut observer = |content: &str| partials.push(content.to_string());
        orchestrator
            .handle_turn(&mut history, "music", &config(), Some(&mut observer))
            .await;

        assert_eq!(partials.len(), 2);
        assert_eq!(partials[0], "Start here [1]: ");
        assert!(partials[1].ends_with("watch?v=dQw4w9WgXcQ"));
    }

    #[test]
    fn test_unanswered_user_turns_are_folded() {
        let mut history = ConversationStore::new();
        history.push_user("first try");
        history.push_user("second try");

        let messages = build_messages(&history);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(
            messages[1].content,
            format!("first try{}\n\nsecond try{}", USER_SUFFIX, USER_SUFFIX)
        );
    }
}
