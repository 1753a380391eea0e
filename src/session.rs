//! Chat session orchestration.
//!
//! A session owns the transcript and drives at most one outbound request at a
//! time: submit a user message, stream the reply into the transcript, and
//! settle in `Succeeded` or `Failed`. No retries, no timeout, no cancellation
//! primitive; an abandoned stream is simply dropped with the session.

use futures::StreamExt;

use crate::error::ChatError;
use crate::store::Persona;
use crate::streaming::{StreamEvent, stream_events};
use crate::transcript::Transcript;
use crate::types::ChatCompletionRequest;

/// Model requested when the caller does not pick one.
pub const DEFAULT_MODEL: &str = "gpt-oss-120b";

/// Path of the chat completion endpoint, relative to the base URL.
const COMPLETIONS_PATH: &str = "/api/chat/completions";

/// Lifecycle of a session's current submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// Request sent, waiting for response headers.
    Sending,
    /// Response accepted, consuming body frames.
    Streaming,
    /// Last submission failed; the error slot holds the cause.
    Failed,
    /// Last submission streamed to completion.
    Succeeded,
}

impl SessionState {
    /// True while a submission is outstanding; new submissions are rejected.
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Sending | Self::Streaming)
    }
}

/// Configuration for one chat session, immutable for the duration of a
/// request.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub base_url: String,
    pub model: String,
    pub system_prompt: String,
    pub api_key: Option<String>,
    /// Whether the target deployment rejects unauthenticated requests. When
    /// set and no key is configured, `submit` fails before any network call.
    pub credential_required: bool,
}

impl SessionConfig {
    pub fn new(base_url: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: system_prompt.into(),
            api_key: None,
            credential_required: false,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_credential_required(mut self, required: bool) -> Self {
        self.credential_required = required;
        self
    }

    /// Use a persona's resolved system prompt. The only thing the chat core
    /// consumes from the record store.
    pub fn with_persona(mut self, persona: &Persona) -> Self {
        self.system_prompt = persona.system_message.clone();
        self
    }

    fn completions_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), COMPLETIONS_PATH)
    }
}

/// One chat conversation against a completion endpoint.
pub struct ChatSession {
    http: reqwest::Client,
    config: SessionConfig,
    transcript: Transcript,
    state: SessionState,
    error: Option<ChatError>,
}

impl ChatSession {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_http_client(config, reqwest::Client::new())
    }

    /// Build a session around a caller-provided HTTP client, so connection
    /// pools and TLS setup can be shared across sessions.
    pub fn with_http_client(config: SessionConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            config,
            transcript: Transcript::new(),
            state: SessionState::Idle,
            error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// The error from the last failed submission, if any. Cleared when the
    /// next submission is accepted.
    pub fn last_error(&self) -> Option<&ChatError> {
        self.error.as_ref()
    }

    /// Submit one user message and stream the reply into the transcript.
    ///
    /// Blank input and submission while busy are silent no-ops that leave the
    /// transcript untouched. A missing required credential fails before
    /// anything is appended, so the user can fix the key and resubmit without
    /// duplicating the turn. Any later failure rolls the pending reply back
    /// so the transcript never keeps a dangling empty assistant turn, records
    /// the error in the slot, and also returns it. Every path leaves the
    /// session non-busy.
    pub async fn submit(&mut self, input: &str) -> Result<(), ChatError> {
        if self.state.is_busy() || input.trim().is_empty() {
            return Ok(());
        }
        if self.config.credential_required && self.config.api_key.is_none() {
            let err = ChatError::Configuration(
                "API key required by this endpoint but not configured".to_string(),
            );
            self.error = Some(err.clone());
            self.state = SessionState::Failed;
            return Err(err);
        }
        if !self.transcript.append_user_turn(input) {
            return Ok(());
        }
        self.error = None;
        self.state = SessionState::Sending;

        match self.stream_reply().await {
            Ok(()) => {
                self.transcript.commit();
                self.state = SessionState::Succeeded;
                Ok(())
            }
            Err(err) => {
                tracing::warn!("chat request failed: {err}");
                self.transcript.rollback();
                self.error = Some(err.clone());
                self.state = SessionState::Failed;
                Err(err)
            }
        }
    }

    async fn stream_reply(&mut self) -> Result<(), ChatError> {
        let payload = ChatCompletionRequest {
            model: self.config.model.clone(),
            stream: true,
            messages: self
                .transcript
                .request_messages(&self.config.system_prompt),
        };

        let mut request = self.http.post(self.config.completions_url()).json(&payload);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChatError::Stream(format!("failed to send request: {e}")))?;

        let status = response.status();
        if !status.is_success() || !is_event_stream(&response) {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Transport {
                status: status.as_u16(),
                body,
            });
        }

        self.state = SessionState::Streaming;

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other));
        let mut events = std::pin::pin!(stream_events(bytes));
        while let Some(event) = events.next().await {
            match event? {
                StreamEvent::Delta(text) => self.transcript.append_delta(&text),
                StreamEvent::Done => break,
                StreamEvent::Ignored => {}
            }
        }
        Ok(())
    }
}

fn is_event_stream(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.to_ascii_lowercase().contains("text/event-stream"))
        .unwrap_or(false)
}
