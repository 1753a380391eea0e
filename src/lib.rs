//! # PersonaChat Core
//!
//! Streaming chat client core for persona-driven conversations. A caller
//! resolves a persona (a system prompt), opens a [`session::ChatSession`],
//! and submits user messages; the session streams the assistant reply
//! token-by-token into a [`transcript::Transcript`] the caller can render at
//! any point.
//!
//! The interesting part is the wire pipeline in [`streaming`]: the endpoint
//! answers with newline-delimited `data:` frames, delivered as arbitrary byte
//! chunks that can split a frame or even a single multi-byte character. The
//! pipeline reassembles those incrementally and tolerates malformed frames
//! without aborting a healthy stream.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use personachat::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::new(
//!         "http://test-chat.atomic-dns.com:3001",
//!         "You are a helpful assistant.",
//!     );
//!     let mut session = ChatSession::new(config);
//!
//!     session.submit("Hello!").await?;
//!     for turn in session.transcript().visible_turns() {
//!         println!("{:?}: {}", turn.role, turn.content);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Persona and user records live in an external record store behind the
//! [`store::RecordStore`] trait; the core only ever consumes the resolved
//! system prompt of the active persona.

#![deny(unsafe_code)]

pub mod error;
pub mod session;
pub mod settings;
pub mod store;
pub mod streaming;
pub mod transcript;
pub mod types;

/// Commonly used types, re-exported for convenience.
pub mod prelude {
    pub use crate::error::ChatError;
    pub use crate::session::{ChatSession, SessionConfig, SessionState};
    pub use crate::settings::Settings;
    pub use crate::store::{
        AuthSession, MemoryStore, Persona, PersonaDraft, RecordStore, StoreError, UserProfile,
    };
    pub use crate::streaming::{StreamEvent, parse_frame, stream_events};
    pub use crate::transcript::Transcript;
    pub use crate::types::{ChatCompletionRequest, ChatMessage, MessageRole};
}
