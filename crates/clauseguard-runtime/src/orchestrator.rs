//! Analysis orchestrator.
//!
//! Runs one contract through the full pipeline:
//! 1. Segment the prepared source (fatal errors are returned)
//! 2. Evaluate the rule catalog on every clause (synchronous)
//! 3. Fan out LLM judgments with bounded concurrency
//! 4. Fan in: reconcile and aggregate deterministically in clause order
//! 5. Optionally ask for a contract-level summary within the same deadline
//!
//! Judgments still outstanding when the overall deadline passes are
//! recorded as timed out; the report is produced anyway. Cancellation is
//! the only way to get no report for a valid contract.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio::sync::{watch, Semaphore};
use tokio::time::Instant;

use clauseguard_core::{
    assemble_report, segment, AnalysisError, Clause, ContractReport, ContractSummary, JudgmentOutcome,
    LlmFailure, PreparedSource, RuleEngine, RuleFinding,
};

use crate::config::RuntimeConfig;
use crate::judge::JudgmentAdapter;
use crate::providers::{LlmProvider, OpenAiProvider};
use crate::RuntimeError;

/// Caller side of a cancellation signal.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// A token observing this handle.
    pub fn token(&self) -> CancelToken {
        CancelToken { rx: self.tx.subscribe() }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Analysis side of a cancellation signal.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that is never cancelled.
    pub fn never() -> Self {
        CancelHandle::new().token()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled. Pends forever if the handle is dropped first.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// The orchestrator owns configuration, the rule catalog and, unless it
/// runs rules-only, the judgment adapter.
pub struct AnalysisOrchestrator {
    adapter: Option<JudgmentAdapter>,
    engine: RuleEngine,
    config: RuntimeConfig,
}

impl AnalysisOrchestrator {
    /// Create an orchestrator. Without a provider every clause is judged by rules alone.
    pub fn new(provider: Option<Arc<dyn LlmProvider>>, config: RuntimeConfig) -> Result<Self, RuntimeError> {
        Self::with_limiter(provider, config, None)
    }

    /// Like [`new`](Self::new), drawing request permits from `limiter` when given.
    ///
    /// Orchestrators handed the same limiter share one bound on requests in flight.
    pub fn with_limiter(
        provider: Option<Arc<dyn LlmProvider>>,
        config: RuntimeConfig,
        limiter: Option<Arc<Semaphore>>,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;
        let adapter = provider.map(|p| match &limiter {
            Some(limiter) => JudgmentAdapter::with_limiter(p, &config, Arc::clone(limiter)),
            None => JudgmentAdapter::from_config(p, &config),
        });

        Ok(Self {
            adapter,
            engine: RuleEngine::new(),
            config,
        })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    pub fn is_rules_only(&self) -> bool {
        self.adapter.is_none()
    }

    /// Analyze a prepared source.
    pub async fn analyze(&self, source: &PreparedSource) -> Result<ContractReport, RuntimeError> {
        self.analyze_with_cancel(source, CancelToken::never()).await
    }

    /// Analyze a prepared source, aborting with [`RuntimeError::Cancelled`]
    /// as soon as `cancel` fires. No partial report is returned.
    pub async fn analyze_with_cancel(
        &self,
        source: &PreparedSource,
        mut cancel: CancelToken,
    ) -> Result<ContractReport, RuntimeError> {
        if cancel.is_cancelled() {
            return Err(RuntimeError::Cancelled);
        }

        let analysis = &self.config.analysis;
        let deadline = Instant::now().checked_add(self.config.timeouts.overall).ok_or_else(|| {
            AnalysisError::InvalidConfig("timeouts.overall is too large to schedule".to_string())
        })?;
        let clauses = segment(&source.text, &analysis.segmentation)?;
        let findings: Vec<Vec<RuleFinding>> = clauses.iter().map(|c| self.engine.evaluate(c)).collect();

        tracing::info!(
            clauses = clauses.len(),
            rule_findings = findings.iter().map(Vec::len).sum::<usize>(),
            rules_only = self.is_rules_only(),
            "Contract segmented"
        );

        let (outcomes, timed_out) = match &self.adapter {
            Some(adapter) => self.collect_judgments(adapter, &clauses, deadline, &mut cancel).await?,
            None => (
                vec![JudgmentOutcome::unavailable(LlmFailure::Disabled); clauses.len()],
                false,
            ),
        };

        if cancel.is_cancelled() {
            return Err(RuntimeError::Cancelled);
        }

        let summary = match &self.adapter {
            Some(adapter) if self.config.llm.summarize && !timed_out => {
                self.request_summary(adapter, source, deadline, &mut cancel).await?
            }
            _ => None,
        };

        // Use configured analyzed_at for reproducible reports
        let analyzed_at = self.config.determinism.analyzed_at.unwrap_or_else(Utc::now);

        let mut report = assemble_report(
            source,
            analysis,
            &self.engine,
            clauses,
            findings,
            outcomes,
            timed_out,
            analyzed_at,
        );
        report.summary = summary;
        Ok(report)
    }

    /// Contract summary, or `None` when it fails or misses the deadline.
    async fn request_summary(
        &self,
        adapter: &JudgmentAdapter,
        source: &PreparedSource,
        deadline: Instant,
        cancel: &mut CancelToken,
    ) -> Result<Option<ContractSummary>, RuntimeError> {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                tracing::info!("Analysis cancelled");
                Err(RuntimeError::Cancelled)
            }

            summary = tokio::time::timeout_at(deadline, adapter.summarize(&source.text)) => match summary {
                Ok(summary) => Ok(summary),
                Err(_) => {
                    tracing::warn!("Overall deadline reached before the contract summary arrived");
                    Ok(None)
                }
            },
        }
    }

    /// Fan out one judgment per clause and collect them in clause order.
    async fn collect_judgments(
        &self,
        adapter: &JudgmentAdapter,
        clauses: &[Clause],
        deadline: Instant,
        cancel: &mut CancelToken,
    ) -> Result<(Vec<JudgmentOutcome>, bool), RuntimeError> {
        let overall = self.config.timeouts.overall;
        let mut slots: Vec<Option<JudgmentOutcome>> = vec![None; clauses.len()];
        let mut timed_out = false;

        tracing::debug!(
            provider = adapter.provider_name(),
            concurrency = self.config.concurrency,
            timeout = ?overall,
            "Requesting LLM judgments"
        );

        let mut pending = stream::iter(clauses.iter().enumerate())
            .map(|(i, clause)| async move { (i, adapter.judge(clause).await) })
            .buffer_unordered(self.config.concurrency);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    tracing::info!("Analysis cancelled");
                    return Err(RuntimeError::Cancelled);
                }

                next = tokio::time::timeout_at(deadline, pending.next()) => match next {
                    Ok(Some((i, outcome))) => slots[i] = Some(outcome),
                    Ok(None) => break,
                    Err(_) => {
                        timed_out = true;
                        tracing::warn!(
                            timeout = ?overall,
                            outstanding = slots.iter().filter(|s| s.is_none()).count(),
                            "Overall deadline reached, remaining clauses judged by rules only"
                        );
                        break;
                    }
                },
            }
        }

        let outcomes = slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| JudgmentOutcome::unavailable(LlmFailure::TimedOut)))
            .collect();

        Ok((outcomes, timed_out))
    }
}

/// Builder for AnalysisOrchestrator.
pub struct AnalysisOrchestratorBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    config: RuntimeConfig,
    engine: Option<RuleEngine>,
    limiter: Option<Arc<Semaphore>>,
}

impl AnalysisOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            config: RuntimeConfig::default(),
            engine: None,
            limiter: None,
        }
    }

    /// Set the LLM provider.
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Use the OpenAI-compatible provider described by the current `llm` config.
    ///
    /// Call after [`config`](Self::config). Fails when the API key variable is unset.
    pub fn openai_from_env(self) -> Result<Self, RuntimeError> {
        let provider = OpenAiProvider::from_config(&self.config.llm)
            .map_err(|e| RuntimeError::ProviderNotConfigured(e.to_string()))?;
        Ok(self.provider(Arc::new(provider)))
    }

    /// Set the configuration.
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the default rule catalog.
    pub fn engine(mut self, engine: RuleEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Share a request limiter with other orchestrators instead of
    /// creating one sized by `concurrency`.
    pub fn limiter(mut self, limiter: Arc<Semaphore>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Build the orchestrator. Without a provider it runs rules-only.
    pub fn build(self) -> Result<AnalysisOrchestrator, RuntimeError> {
        let mut orchestrator = AnalysisOrchestrator::with_limiter(self.provider, self.config, self.limiter)?;
        if let Some(engine) = self.engine {
            orchestrator.engine = engine;
        }
        Ok(orchestrator)
    }
}

impl Default for AnalysisOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{MockProvider, ProviderError};
    use chrono::TimeZone;
    use clauseguard_core::{AnalysisError, RiskLevel};
    use std::time::Duration;

    const SERVICE_CONTRACT: &str = "\
1. Services. The Provider shall deliver the consulting services described in Schedule A to the Client in a professional manner.

2. Payment. The Client shall pay each invoice within 30 days of receipt, and late amounts accrue interest at an interest rate of 36% per annum.

3. Liability. The Vendor shall have unlimited liability for any damages arising out of or in connection with the performance of this agreement.

4. Confidentiality. Each party shall keep the other party's confidential information secret and use it only for the purposes of this agreement.

5. Governing Law. This agreement is governed by the laws of England and Wales and the courts of London have exclusive jurisdiction.";

    const LOW: &str = r#"{"risk_level":"Low","explanation":"Routine clause.","affected_party":"Both Parties","negotiation_tip":"None."}"#;
    const MEDIUM: &str = r#"{"risk_level":"Medium","explanation":"Payment is tight.","affected_party":"Client","negotiation_tip":"Ask for 45 days."}"#;

    fn config() -> RuntimeConfig {
        let mut config = RuntimeConfig::default();
        config.retry.retry_delay = Duration::from_millis(1);
        config.retry.max_delay = Duration::from_millis(5);
        config.determinism.analyzed_at = Some(Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap());
        config
    }

    fn source() -> PreparedSource {
        PreparedSource::new(SERVICE_CONTRACT, "en")
    }

    fn orchestrator(provider: MockProvider, config: RuntimeConfig) -> AnalysisOrchestrator {
        AnalysisOrchestratorBuilder::new()
            .provider(Arc::new(provider))
            .config(config)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_rule_finding_survives_low_llm_judgment() {
        let orchestrator = orchestrator(MockProvider::from_fn(|_| Ok(LOW.to_string())), config());
        let report = orchestrator.analyze(&source()).await.unwrap();

        let liability = report.verdict(2).unwrap();
        assert_eq!(liability.final_risk_level, RiskLevel::High);
        assert_eq!(liability.llm_risk_level, Some(RiskLevel::Low));
        assert!(liability.contributing_rule_ids.contains(&"unlimited_liability".to_string()));
        assert_eq!(report.health.overall_risk, RiskLevel::High);
        assert_eq!(report.degraded_clause_count, 0);
        assert!(!report.timed_out);
    }

    #[tokio::test]
    async fn test_judgments_land_on_their_own_clause() {
        let provider = MockProvider::from_fn(|messages| {
            let user = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
            if user.contains("Payment.") {
                Ok(MEDIUM.to_string())
            } else {
                Ok(LOW.to_string())
            }
        })
        .with_delay(Duration::from_millis(5));

        let report = orchestrator(provider, config()).analyze(&source()).await.unwrap();

        let levels: Vec<Option<RiskLevel>> = report.verdicts.iter().map(|v| v.llm_risk_level).collect();
        assert_eq!(
            levels,
            vec![
                Some(RiskLevel::Low),
                Some(RiskLevel::Medium),
                Some(RiskLevel::Low),
                Some(RiskLevel::Low),
                Some(RiskLevel::Low)
            ]
        );
        assert_eq!(report.verdict(1).unwrap().affected_party, "Client");
    }

    #[tokio::test]
    async fn test_unreachable_service_degrades_every_clause() {
        let mut cfg = config();
        cfg.retry.max_retries = 1;
        let provider = Arc::new(MockProvider::failing(ProviderError::Network("connection refused".into())));
        let orchestrator = AnalysisOrchestratorBuilder::new()
            .provider(provider.clone())
            .config(cfg)
            .build()
            .unwrap();

        let report = orchestrator.analyze(&source()).await.unwrap();

        assert_eq!(report.degraded_clause_count, report.clauses.len());
        // Two attempts per clause plus two for the contract summary.
        assert_eq!(provider.calls() as usize, report.clauses.len() * 2 + 2);
        assert!(report.summary.is_none());
        assert_eq!(report.health.overall_risk_llm, None);
        for verdict in &report.verdicts {
            assert!(!verdict.llm_available);
            assert!(matches!(
                verdict.llm_failure,
                Some(LlmFailure::Unavailable { attempts: 2, .. })
            ));
        }
        assert_eq!(report.verdict(2).unwrap().final_risk_level, RiskLevel::High);
        assert_eq!(report.verdict(0).unwrap().final_risk_level, RiskLevel::Low);
    }

    #[tokio::test]
    async fn test_overall_deadline_marks_outstanding_clauses() {
        let mut cfg = config();
        cfg.timeouts.overall = Duration::from_millis(50);
        let provider = MockProvider::new().with_delay(Duration::from_secs(5));

        let report = orchestrator(provider, cfg).analyze(&source()).await.unwrap();

        assert!(report.timed_out);
        assert_eq!(report.degraded_clause_count, 5);
        assert!(report
            .verdicts
            .iter()
            .all(|v| v.llm_failure == Some(LlmFailure::TimedOut)));
        assert_eq!(report.verdict(2).unwrap().final_risk_level, RiskLevel::High);
    }

    #[tokio::test]
    async fn test_cancellation_returns_no_report() {
        let orchestrator = orchestrator(MockProvider::new().with_delay(Duration::from_secs(5)), config());
        let handle = CancelHandle::new();
        let token = handle.token();

        let src = source();
        let (result, _) = tokio::join!(orchestrator.analyze_with_cancel(&src, token), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        });

        assert!(matches!(result, Err(RuntimeError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let orchestrator = orchestrator(MockProvider::new(), config());
        let handle = CancelHandle::new();
        handle.cancel();

        let result = orchestrator.analyze_with_cancel(&source(), handle.token()).await;
        assert!(matches!(result, Err(RuntimeError::Cancelled)));
    }

    #[tokio::test]
    async fn test_rules_only_without_provider() {
        let orchestrator = AnalysisOrchestratorBuilder::new().config(config()).build().unwrap();
        assert!(orchestrator.is_rules_only());

        let report = orchestrator.analyze(&source()).await.unwrap();
        assert!(report
            .verdicts
            .iter()
            .all(|v| v.llm_failure == Some(LlmFailure::Disabled)));
        assert_eq!(report.health.overall_risk, RiskLevel::High);
    }

    #[tokio::test]
    async fn test_reports_are_reproducible() {
        let orchestrator = orchestrator(MockProvider::from_fn(|_| Ok(MEDIUM.to_string())), config());
        let first = orchestrator.analyze(&source()).await.unwrap();
        let second = orchestrator.analyze(&source()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.analyzed_at, Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_empty_contract_is_fatal() {
        let orchestrator = orchestrator(MockProvider::new(), config());
        let result = orchestrator.analyze(&PreparedSource::new("  \n ", "en")).await;
        assert!(matches!(
            result,
            Err(RuntimeError::Analysis(AnalysisError::EmptyOrUnsegmentableContract(_)))
        ));
    }

    #[test]
    fn test_invalid_config_rejected_at_build() {
        let mut cfg = config();
        cfg.concurrency = 0;
        let result = AnalysisOrchestratorBuilder::new().config(cfg).build();
        assert!(matches!(result, Err(RuntimeError::Analysis(AnalysisError::InvalidConfig(_)))));
    }

    #[test]
    fn test_openai_from_env_without_key() {
        let mut cfg = config();
        cfg.llm.api_key_env = "CLAUSEGUARD_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        let result = AnalysisOrchestratorBuilder::new().config(cfg).openai_from_env();
        assert!(matches!(result, Err(RuntimeError::ProviderNotConfigured(_))));
    }

    const SUMMARY: &str = r#"{"business_summary":"A consulting services agreement governed by English law.","key_risks":["Uncapped vendor liability"],"recommendations":["Cap liability at twelve months of fees."]}"#;

    #[tokio::test]
    async fn test_summary_and_risk_split_in_report() {
        let provider = MockProvider::from_fn(|messages| {
            let user = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
            if user.starts_with("Summarize this contract") {
                Ok(SUMMARY.to_string())
            } else {
                Ok(LOW.to_string())
            }
        });

        let report = orchestrator(provider, config()).analyze(&source()).await.unwrap();

        let summary = report.summary.as_ref().unwrap();
        assert!(summary.business_summary.contains("consulting services"));
        assert_eq!(summary.recommendations.len(), 1);
        assert_eq!(report.health.overall_risk, RiskLevel::High);
        assert_eq!(report.health.overall_risk_rules, RiskLevel::High);
        assert_eq!(report.health.overall_risk_llm, Some(RiskLevel::Low));
        assert!(report.verdict(2).unwrap().final_risk_score > report.verdict(0).unwrap().final_risk_score);
    }

    #[tokio::test]
    async fn test_summary_can_be_turned_off() {
        let mut cfg = config();
        cfg.llm.summarize = false;
        let provider = Arc::new(MockProvider::new());
        let orchestrator = AnalysisOrchestratorBuilder::new()
            .provider(provider.clone())
            .config(cfg)
            .build()
            .unwrap();

        let report = orchestrator.analyze(&source()).await.unwrap();
        assert!(report.summary.is_none());
        assert_eq!(provider.calls() as usize, report.clauses.len());
    }

    #[tokio::test]
    async fn test_shared_limiter_bounds_every_orchestrator() {
        let limiter = Arc::new(Semaphore::new(1));
        let _held = limiter.clone().acquire_owned().await.unwrap();

        let mut cfg = config();
        cfg.timeouts.overall = Duration::from_millis(50);
        let provider = Arc::new(MockProvider::new());
        let orchestrator = AnalysisOrchestratorBuilder::new()
            .provider(provider.clone())
            .config(cfg)
            .limiter(Arc::clone(&limiter))
            .build()
            .unwrap();

        let report = orchestrator.analyze(&source()).await.unwrap();

        assert!(report.timed_out);
        assert_eq!(provider.calls(), 0);
        assert_eq!(report.degraded_clause_count, report.clauses.len());
    }

    #[tokio::test]
    async fn test_oversized_deadline_is_rejected() {
        let mut cfg = config();
        cfg.timeouts.overall = Duration::MAX;
        let result = AnalysisOrchestratorBuilder::new()
            .provider(Arc::new(MockProvider::new()))
            .config(cfg)
            .build();
        assert!(matches!(result, Err(RuntimeError::Analysis(AnalysisError::InvalidConfig(_)))));
    }
}
