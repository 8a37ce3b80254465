//! AI provider adapters. Implement `ProviderClient` for each backend.
//!
//! Also hosts the response side: error classification and the tolerant
//! answer parser.

pub mod basic_adapter;
pub mod claude_adapter;
pub mod error_mapping;
pub mod gemini_adapter;
mod http;
pub mod loose_json;
pub mod mock_adapter;
pub mod openai_adapter;
pub mod payload;
pub mod result_parser;

pub use basic_adapter::BasicAdapter;
pub use claude_adapter::ClaudeAdapter;
pub use gemini_adapter::GeminiAdapter;
pub use mock_adapter::MockProvider;
pub use openai_adapter::OpenAiAdapter;
pub use result_parser::ResultParser;
