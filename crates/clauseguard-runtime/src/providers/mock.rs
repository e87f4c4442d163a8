//! Scripted provider for tests and offline runs.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, TokenUsage};

type Responder = Box<dyn Fn(&[ChatMessage]) -> Result<String, ProviderError> + Send + Sync>;

/// Judgment returned when nothing else is scripted.
pub const DEFAULT_JUDGMENT: &str = r#"{"risk_level":"Low","explanation":"This clause describes a routine obligation.","affected_party":"Both Parties","negotiation_tip":"No change needed."}"#;

/// Provider that answers from a script.
///
/// Each call takes the next scripted result; when the script is exhausted
/// the responder function is used, and without one [`DEFAULT_JUDGMENT`].
pub struct MockProvider {
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    responder: Option<Responder>,
    delay: Option<Duration>,
    calls: AtomicU32,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            responder: None,
            delay: None,
            calls: AtomicU32::new(0),
        }
    }

    /// Answer with `responses` in order.
    pub fn with_responses(responses: impl IntoIterator<Item = Result<String, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().collect()),
            ..Self::new()
        }
    }

    /// Answer every call with `responder`, which sees the request messages.
    pub fn from_fn<F>(responder: F) -> Self
    where
        F: Fn(&[ChatMessage]) -> Result<String, ProviderError> + Send + Sync + 'static,
    {
        Self {
            responder: Some(Box::new(responder)),
            ..Self::new()
        }
    }

    /// Fail every call with `error`.
    pub fn failing(error: ProviderError) -> Self {
        Self::from_fn(move |_| Err(error.clone()))
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `complete` calls so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_scripted(&self) -> Option<Result<String, ProviderError>> {
        match self.script.lock() {
            Ok(mut script) => script.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let content = match self.next_scripted() {
            Some(result) => result?,
            None => match &self.responder {
                Some(responder) => responder(&messages)?,
                None => DEFAULT_JUDGMENT.to_string(),
            },
        };

        Ok(CompletionResponse {
            content,
            usage: TokenUsage::default(),
            model: config.model.clone(),
            stop_reason: Some("stop".to_string()),
        })
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CompletionConfig {
        CompletionConfig {
            model: "mock-model".to_string(),
            temperature: 0.0,
            max_tokens: 100,
            json_mode: true,
        }
    }

    #[tokio::test]
    async fn test_script_then_default() {
        let provider = MockProvider::with_responses(vec![
            Err(ProviderError::EmptyCompletion),
            Ok("first".to_string()),
        ]);

        let first = provider.complete(vec![], &config()).await;
        assert_eq!(first.unwrap_err(), ProviderError::EmptyCompletion);

        let second = provider.complete(vec![], &config()).await.unwrap();
        assert_eq!(second.content, "first");
        assert_eq!(second.model, "mock-model");

        let third = provider.complete(vec![], &config()).await.unwrap();
        assert_eq!(third.content, DEFAULT_JUDGMENT);
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_responder_sees_messages() {
        let provider = MockProvider::from_fn(|messages| Ok(format!("{} messages", messages.len())));
        let response = provider
            .complete(vec![ChatMessage::system("s"), ChatMessage::user("u")], &config())
            .await
            .unwrap();
        assert_eq!(response.content, "2 messages");
    }

    #[tokio::test]
    async fn test_failing_provider() {
        let provider = MockProvider::failing(ProviderError::Network("down".into()));
        for _ in 0..3 {
            assert!(provider.complete(vec![], &config()).await.is_err());
        }
        assert_eq!(provider.calls(), 3);
        assert!(provider.health_check().await);
    }
}
