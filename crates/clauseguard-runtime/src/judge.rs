//! LLM Judgment Adapter.
//!
//! Sends one clause to the provider, retries transient failures with
//! jittered exponential backoff and validates the answer strictly. Every
//! outbound request first takes a permit from a shared semaphore, so the
//! number of requests in flight never exceeds the configured limit no
//! matter how many adapters or tasks share it.
//!
//! The adapter never returns an error: clause failures become an
//! [`LlmFailure`] inside the [`JudgmentOutcome`], and a failed contract
//! summary is simply absent.

use std::sync::Arc;

use clauseguard_core::{Clause, ContractSummary, JudgmentOutcome, Language, LlmFailure};
use tokio::sync::Semaphore;

use crate::config::RuntimeConfig;
use crate::prompt::{build_messages, build_summary_messages};
use crate::providers::{ChatMessage, CompletionConfig, LlmProvider, ProviderError};
use crate::response::{parse_judgment, parse_summary, ValidationError};
use crate::retry::RetryPolicy;

pub struct JudgmentAdapter {
    provider: Arc<dyn LlmProvider>,
    completion: CompletionConfig,
    languages: Vec<Language>,
    policy: RetryPolicy,
    limiter: Arc<Semaphore>,
}

impl JudgmentAdapter {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        completion: CompletionConfig,
        languages: Vec<Language>,
        policy: RetryPolicy,
        limiter: Arc<Semaphore>,
    ) -> Self {
        Self {
            provider,
            completion,
            languages,
            policy,
            limiter,
        }
    }

    /// Adapter with its own limiter sized by `config.concurrency`.
    pub fn from_config(provider: Arc<dyn LlmProvider>, config: &RuntimeConfig) -> Self {
        Self::with_limiter(provider, config, Arc::new(Semaphore::new(config.concurrency.max(1))))
    }

    /// Adapter drawing permits from `limiter`, which other adapters may share.
    pub fn with_limiter(provider: Arc<dyn LlmProvider>, config: &RuntimeConfig, limiter: Arc<Semaphore>) -> Self {
        let completion = CompletionConfig {
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            json_mode: true,
        };

        Self::new(
            provider,
            completion,
            config.llm.languages.clone(),
            RetryPolicy::from(&config.retry),
            limiter,
        )
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Judge one clause.
    pub async fn judge(&self, clause: &Clause) -> JudgmentOutcome {
        let messages = build_messages(clause, &self.languages);

        let subject = format!("clause {}", clause.index);
        match self.request(&subject, messages, parse_judgment).await {
            Ok(judgment) => {
                tracing::debug!(clause = clause.index, risk_level = %judgment.risk_level, "LLM judgment received");
                JudgmentOutcome::available(judgment)
            }
            Err(failure) => JudgmentOutcome::unavailable(failure),
        }
    }

    /// Ask for a contract-level business summary. `None` on any failure.
    pub async fn summarize(&self, text: &str) -> Option<ContractSummary> {
        let messages = build_summary_messages(text, &self.languages);

        match self.request("contract summary", messages, parse_summary).await {
            Ok(summary) => {
                tracing::debug!(recommendations = summary.recommendations.len(), "Contract summary received");
                Some(summary)
            }
            Err(failure) => {
                tracing::warn!(failure = %failure, "Contract summary unavailable");
                None
            }
        }
    }

    /// Send `messages` until `parse` accepts an answer or retries run out.
    ///
    /// Validation failures are final; only retryable transport errors are retried.
    async fn request<T>(
        &self,
        subject: &str,
        messages: Vec<ChatMessage>,
        parse: fn(&str) -> Result<T, ValidationError>,
    ) -> Result<T, LlmFailure> {
        let mut retry = 0u32;

        loop {
            let attempt = retry + 1;
            let result = match self.limiter.acquire().await {
                Ok(_permit) => self.provider.complete(messages.clone(), &self.completion).await,
                Err(_) => Err(ProviderError::NotConfigured("request limiter closed".to_string())),
            };

            let error = match result {
                Ok(response) => {
                    return parse(&response.content).map_err(|e| {
                        tracing::warn!(subject, attempt, error = %e, "LLM response failed validation");
                        LlmFailure::ValidationFailed { detail: e.to_string() }
                    });
                }
                Err(e) => e,
            };

            if !error.is_retryable() || retry >= self.policy.max_retries {
                tracing::warn!(subject, attempts = attempt, error = %error, "LLM request unavailable");
                return Err(LlmFailure::Unavailable {
                    attempts: attempt,
                    last_error: error.to_string(),
                });
            }

            let delay = {
                let mut rng = rand::thread_rng();
                self.policy.delay_for(retry, error.retry_after(), &mut rng)
            };
            tracing::warn!(
                subject,
                attempt,
                delay = ?delay,
                error = %error,
                "LLM request failed, retrying"
            );
            tokio::time::sleep(delay).await;
            retry += 1;
        }
    }
}
