//! AI adapter module. Implements AiPort for LLM integration.
//!
//! Provides the DeepSeek (OpenAI-compatible) adapter and a mock adapter for testing.

pub mod deepseek_adapter;
pub mod mock_adapter;

pub use deepseek_adapter::{DeepSeekAdapter, RetryPolicy};
pub use mock_adapter::{MockAiAdapter, MockReply};
