//! # glossa-translate
//!
//! Translation backend abstraction for glossa.
//!
//! This crate provides:
//! - An OpenAI-compatible chat-completions backend, which also covers local
//!   servers (Ollama, vLLM, LM Studio) via `OPENAI_BASE_URL`
//! - A mock backend for deterministic pipeline tests
//!
//! # Example
//!
//! ```rust,no_run
//! use glossa_translate::OpenAITranslator;
//! use glossa_core::TranslationBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let translator = OpenAITranslator::from_env().unwrap();
//!     let korean = translator.translate("A paragraph of English.").await.unwrap();
//!     println!("{korean}");
//! }
//! ```

pub mod openai;

// Mock translation backend for testing
// Note: Always compiled so downstream crates can use it in their tests
pub mod mock;

// Re-export core types
pub use glossa_core::*;

pub use mock::MockTranslator;
pub use openai::{OpenAITranslator, TranslatorConfig};
