// Core Curio functionality:
// - Streaming chat-completions client
// - Event-stream decoding
// - Link and citation rewriting
// - Conversation state and turn orchestration
// - Configuration loading
// - Shared error types

// Export client module - API client and backend trait
pub mod client;
pub use client::*;

// Export types module - Messages, search results, request bodies
pub mod types;
pub use types::*;

// Export config module - Configuration loading
pub mod config;
pub use config::*;

// Export errors module - Shared error types
pub mod errors;
pub use errors::*;

pub mod citations;
pub mod conversation;
pub mod links;
pub mod prompts;
pub mod session;
pub mod stream;
pub mod turn;

pub use citations::linkify_citations;
pub use conversation::ConversationStore;
pub use links::rewrite_links;
pub use session::Session;
pub use stream::{decode_stream, DecodedStream, StreamDecoder};
pub use turn::{TurnOrchestrator, TurnOutcome};
