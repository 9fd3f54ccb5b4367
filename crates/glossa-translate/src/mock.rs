//! Mock translation backend for deterministic testing.
//!
//! Always compiled (not `#[cfg(test)]`) so downstream crates can drive
//! pipeline tests without a network. Records every input for assertion.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use glossa_translate::mock::MockTranslator;
//!
//! #[tokio::test]
//! async fn test_with_mock_translator() {
//!     let translator = MockTranslator::new().with_echo_prefix("[ko] ");
//!
//!     let out = translator.translate("Hello").await.unwrap();
//!     assert_eq!(out, "[ko] Hello");
//!     assert_eq!(translator.call_count(), 1);
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use glossa_core::{Error, Result, TranslationBackend};

/// Mock translation backend with scripted responses and failure injection.
#[derive(Clone)]
pub struct MockTranslator {
    config: Arc<MockConfig>,
    calls: Arc<Mutex<Vec<String>>>,
}

#[derive(Debug, Clone, Default)]
struct MockConfig {
    /// Exact-input overrides checked before the echo fallback.
    responses: HashMap<String, String>,
    /// Prepended to the input for unscripted calls. Empty means identity.
    echo_prefix: String,
    /// 1-based call index that fails; the call is still recorded.
    fail_on_call: Option<usize>,
}

impl MockTranslator {
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Translate unscripted inputs to `prefix + input` instead of echoing
    /// them unchanged, so output provenance is visible in assertions.
    pub fn with_echo_prefix(mut self, prefix: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).echo_prefix = prefix.into();
        self
    }

    /// Script an exact response for a specific input.
    pub fn with_response_mapping(
        mut self,
        input: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Arc::make_mut(&mut self.config)
            .responses
            .insert(input.into(), output.into());
        self
    }

    /// Make the nth call (1-based) fail. Later calls succeed again, which
    /// lets tests verify the caller actually stopped at the failure.
    pub fn fail_on_call(mut self, n: usize) -> Self {
        Arc::make_mut(&mut self.config).fail_on_call = Some(n);
        self
    }

    /// All translated inputs, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for MockTranslator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranslationBackend for MockTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        let call_index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(text.to_string());
            calls.len()
        };

        if self.config.fail_on_call == Some(call_index) {
            return Err(Error::Translation(format!(
                "simulated translation failure (call {})",
                call_index
            )));
        }

        if let Some(scripted) = self.config.responses.get(text) {
            return Ok(scripted.clone());
        }

        Ok(format!("{}{}", self.config.echo_prefix, text))
    }

    fn model_name(&self) -> &str {
        "mock-translator"
    }
}
