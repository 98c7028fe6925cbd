// Translation Client Port (Interface)
// One chunk of HTML in, translated HTML or a typed failure out

use async_trait::async_trait;
use thiserror::Error;

/// Failure of a single engine call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    #[error("Missing API key")]
    MissingCredential,

    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Engine error: {0}")]
    EngineError(String),

    #[error("Response cut off by token limit. Chunk size may be too large.")]
    TruncatedOutput,
}

/// Translation engine trait
///
/// Implementations:
/// - OpenAiTranslationClient: chat-completions over HTTP (infra-http)
/// - MockTranslationClient: scripted responses (tests)
#[async_trait]
pub trait TranslationClient: Send + Sync {
    /// Translate one chunk of HTML, preserving markup
    ///
    /// # Errors
    /// - TranslateError::MissingCredential if no API key is configured
    /// - TranslateError::TransportFailure if the request never completed
    /// - TranslateError::EngineError if the engine reported an error
    /// - TranslateError::TruncatedOutput if the response hit the token limit
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
        model: &str,
    ) -> Result<String, TranslateError>;

    /// Verify the credential against the engine
    async fn check_connection(&self) -> Result<(), TranslateError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    type Probe = Box<dyn Fn() + Send + Sync>;

    /// One recorded engine call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RecordedCall {
        pub text: String,
        pub source_lang: String,
        pub target_lang: String,
        pub model: String,
    }

    /// Mock client: scripted replies first, then `[{target}] {text}`
    #[derive(Default)]
    pub struct MockTranslationClient {
        script: Mutex<VecDeque<Result<String, TranslateError>>>,
        calls: Mutex<Vec<RecordedCall>>,
        connection: Mutex<Option<TranslateError>>,
        probe: Option<Probe>,
    }

    impl MockTranslationClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue replies consumed by the next calls, in order
        pub fn with_script(replies: Vec<Result<String, TranslateError>>) -> Self {
            Self {
                script: Mutex::new(replies.into()),
                ..Self::default()
            }
        }

        /// Run `probe` at the start of every call
        pub fn with_probe(mut self, probe: impl Fn() + Send + Sync + 'static) -> Self {
            self.probe = Some(Box::new(probe));
            self
        }

        pub fn fail_connection(&self, error: TranslateError) {
            *self.connection.lock().unwrap() = Some(error);
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TranslationClient for MockTranslationClient {
        async fn translate(
            &self,
            text: &str,
            source_lang: &str,
            target_lang: &str,
            model: &str,
        ) -> Result<String, TranslateError> {
            if let Some(probe) = &self.probe {
                probe();
            }
            self.calls.lock().unwrap().push(RecordedCall {
                text: text.to_string(),
                source_lang: source_lang.to_string(),
                target_lang: target_lang.to_string(),
                model: model.to_string(),
            });

            match self.script.lock().unwrap().pop_front() {
                Some(reply) => reply,
                None => Ok(format!("[{}] {}", target_lang, text)),
            }
        }

        async fn check_connection(&self) -> Result<(), TranslateError> {
            match self.connection.lock().unwrap().clone() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
    }
}
