//! Classification dispatcher: model-backed primary with a keyword fallback.
//!
//! Chain layout:
//!
//! ```text
//! primary     PrimaryStrategy   threshold = config (default 0.0: trust the model)
//! fallback_0  KeywordHeuristic  threshold = 0.0, never declines
//! ```
//!
//! The primary strategy reads its backend's readiness from the registry on
//! every call and declines while it is unready.  Backend errors, timeouts and
//! out-of-range scores are also declines.  The heuristic is unconditional, so
//! `classify` always produces a result for non-empty input.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::ClassifierBackend;
use crate::chain::{ResolutionChain, Strategy, StrategyFuture};
use crate::config::ClassificationConfig;
use crate::error::GatewayError;
use crate::registry::BackendRegistry;
use crate::types::{Candidate, Capability, Confidence, Request, Resolution};

pub const POSITIVE: &str = "positive";
pub const NEGATIVE: &str = "negative";
pub const NEUTRAL: &str = "neutral";

const KEYWORD_CONFIDENCE: f64 = 0.7;
const NEUTRAL_CONFIDENCE: f64 = 0.5;

// ── PrimaryStrategy ───────────────────────────────────────────────────────────

/// Delegates to the injected classifier backend, accepting its output as-is.
pub struct PrimaryStrategy {
    /// Registry name of the backend; also the strategy id.
    backend_name: String,
    registry: BackendRegistry,
    backend: ClassifierBackend,
    timeout: Duration,
}

impl PrimaryStrategy {
    pub fn new(
        backend_name: impl Into<String>,
        registry: BackendRegistry,
        backend: ClassifierBackend,
        timeout: Duration,
    ) -> Self {
        Self { backend_name: backend_name.into(), registry, backend, timeout }
    }

    async fn run(&self, request: &Request) -> Option<Candidate> {
        if !self.registry.is_ready(&self.backend_name).await {
            let reason = GatewayError::BackendUnready(self.backend_name.clone());
            debug!(%reason, "primary declined");
            return None;
        }

        let output = match tokio::time::timeout(self.timeout, self.backend.classify(request.text())).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(backend = %self.backend_name, error = %e, "classifier call failed");
                return None;
            }
            Err(_) => {
                warn!(
                    backend = %self.backend_name,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "classifier call timed out"
                );
                return None;
            }
        };

        match Confidence::new(output.score) {
            Some(confidence) => Some(Candidate::new(output.label, confidence)),
            None => {
                warn!(backend = %self.backend_name, score = output.score, "classifier score out of range");
                None
            }
        }
    }
}

impl Strategy for PrimaryStrategy {
    fn id(&self) -> &str {
        &self.backend_name
    }

    fn resolve<'a>(&'a self, request: &'a Request) -> StrategyFuture<'a> {
        Box::pin(self.run(request))
    }
}

// ── KeywordHeuristic ──────────────────────────────────────────────────────────

/// Sentiment by keyword containment. Positive keywords are checked before
/// negative ones; no match yields `neutral`.
pub struct KeywordHeuristic {
    positive: Vec<String>,
    negative: Vec<String>,
}

impl KeywordHeuristic {
    pub fn new(positive: Vec<String>, negative: Vec<String>) -> Self {
        Self { positive, negative }
    }

    pub fn evaluate(&self, text: &str) -> Candidate {
        let hit = |words: &[String]| words.iter().any(|w| text.contains(w.as_str()));
        if hit(&self.positive) {
            Candidate::new(POSITIVE, Confidence::clamped(KEYWORD_CONFIDENCE))
        } else if hit(&self.negative) {
            Candidate::new(NEGATIVE, Confidence::clamped(KEYWORD_CONFIDENCE))
        } else {
            Candidate::new(NEUTRAL, Confidence::clamped(NEUTRAL_CONFIDENCE))
        }
    }
}

impl Strategy for KeywordHeuristic {
    fn id(&self) -> &str {
        "keyword_heuristic"
    }

    fn resolve<'a>(&'a self, request: &'a Request) -> StrategyFuture<'a> {
        let candidate = self.evaluate(request.text());
        Box::pin(async move { Some(candidate) })
    }

    fn is_unconditional(&self) -> bool {
        true
    }
}

// ── ClassificationDispatcher ──────────────────────────────────────────────────

pub struct ClassificationDispatcher {
    chain: ResolutionChain,
}

impl ClassificationDispatcher {
    /// Build the standard primary → heuristic chain.
    pub fn new(
        config: &ClassificationConfig,
        registry: BackendRegistry,
        backend: ClassifierBackend,
    ) -> Self {
        let primary = PrimaryStrategy::new(
            config.name.clone(),
            registry,
            backend,
            Duration::from_millis(config.timeout_ms),
        );
        let heuristic = KeywordHeuristic::new(
            config.positive_keywords.clone(),
            config.negative_keywords.clone(),
        );
        let chain = ResolutionChain::builder(Capability::Classification)
            .primary(Arc::new(primary), Confidence::clamped(config.threshold))
            .fallback(Arc::new(heuristic), Confidence::ZERO)
            .build();
        Self::from_chain(chain)
    }

    /// Wrap a custom chain. It should end in an unconditional strategy.
    pub fn from_chain(chain: ResolutionChain) -> Self {
        if !chain.has_terminal() {
            warn!("classification chain has no terminal strategy; requests may fail");
        }
        Self { chain }
    }

    pub async fn classify(&self, text: &str) -> Result<Resolution, GatewayError> {
        self.classify_with(text, &CancellationToken::new()).await
    }

    /// Like [`classify`](Self::classify), abandoning between strategies once `cancel` fires.
    pub async fn classify_with(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<Resolution, GatewayError> {
        let request = Request::new(text);
        if request.is_empty() {
            return Err(GatewayError::EmptyInput);
        }
        let resolution = self.chain.resolve(&request, cancel).await?;
        info!(
            source = %resolution.source,
            label = %resolution.output,
            confidence = %resolution.confidence,
            "text classified"
        );
        Ok(resolution)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::providers::fixed::StaticClassifier;
    use crate::registry::BackendDescriptor;
    use crate::types::Source;

    const BACKEND: &str = "primary";

    async fn dispatcher(backend: StaticClassifier, ready: bool, threshold: f64) -> ClassificationDispatcher {
        let registry = BackendRegistry::new();
        registry
            .register(BackendDescriptor::new(BACKEND, Capability::Classification, ready))
            .await
            .unwrap();
        let mut cfg = ClassificationConfig::test_default();
        cfg.name = BACKEND.into();
        cfg.threshold = threshold;
        cfg.timeout_ms = 500;
        ClassificationDispatcher::new(&cfg, registry, ClassifierBackend::Static(backend))
    }

    fn heuristic() -> KeywordHeuristic {
        let cfg = ClassificationConfig::default();
        KeywordHeuristic::new(cfg.positive_keywords, cfg.negative_keywords)
    }

    #[test]
    fn heuristic_labels() {
        let h = heuristic();
        let pos = h.evaluate("这个产品很好");
        assert_eq!((pos.output.as_str(), pos.confidence.value()), (POSITIVE, 0.7));
        let neg = h.evaluate("服务太差了");
        assert_eq!((neg.output.as_str(), neg.confidence.value()), (NEGATIVE, 0.7));
        let neu = h.evaluate("今天是星期一");
        assert_eq!((neu.output.as_str(), neu.confidence.value()), (NEUTRAL, 0.5));
    }

    #[test]
    fn heuristic_positive_checked_first() {
        let h = heuristic();
        assert_eq!(h.evaluate("好坏参半").output, POSITIVE);
    }

    #[tokio::test]
    async fn ready_primary_output_returned_verbatim() {
        let d = dispatcher(StaticClassifier::new("LABEL_1", 0.8731), true, 0.0).await;
        let res = d.classify("产品质量不错").await.unwrap();
        assert_eq!(res.output, "LABEL_1");
        assert_eq!(res.confidence.value(), 0.8731);
        assert_eq!(res.source, Source::Primary);
    }

    #[tokio::test]
    async fn primary_trusted_even_when_keywords_match() {
        let d = dispatcher(StaticClassifier::new("negative", 0.05), true, 0.0).await;
        let res = d.classify("好").await.unwrap();
        assert_eq!(res.output, "negative");
        assert_eq!(res.source, Source::Primary);
    }

    #[tokio::test]
    async fn unready_primary_uses_heuristic() {
        let d = dispatcher(StaticClassifier::new("LABEL_1", 0.99), false, 0.0).await;
        let res = d.classify("服务很好").await.unwrap();
        assert_eq!(res.output, POSITIVE);
        assert_eq!(res.confidence.value(), 0.7);
        assert_eq!(res.source, Source::Fallback(0));
    }

    #[tokio::test]
    async fn unready_matches_heuristic_exactly() {
        let d = dispatcher(StaticClassifier::new("LABEL_1", 0.99), false, 0.0).await;
        let h = heuristic();
        for text in ["好", "太糟糕", "平平无奇", "不满意"] {
            let res = d.classify(text).await.unwrap();
            let expected = h.evaluate(text);
            assert_eq!(res.output, expected.output, "input {text}");
            assert_eq!(res.confidence, expected.confidence, "input {text}");
            assert_eq!(res.source, Source::Fallback(0));
        }
    }

    #[tokio::test]
    async fn backend_error_falls_back() {
        let d = dispatcher(StaticClassifier::unavailable("oom"), true, 0.0).await;
        let res = d.classify("差").await.unwrap();
        assert_eq!(res.output, NEGATIVE);
        assert_eq!(res.source, Source::Fallback(0));
    }

    #[tokio::test]
    async fn invalid_score_falls_back() {
        let d = dispatcher(StaticClassifier::new("LABEL_1", 3.5), true, 0.0).await;
        let res = d.classify("abc").await.unwrap();
        assert_eq!(res.output, NEUTRAL);
        assert_eq!(res.source, Source::Fallback(0));
    }

    #[tokio::test]
    async fn threshold_can_reject_low_confidence() {
        let d = dispatcher(StaticClassifier::new("LABEL_1", 0.4), true, 0.6).await;
        let res = d.classify("abc").await.unwrap();
        assert_eq!(res.source, Source::Fallback(0));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_times_out_into_fallback() {
        let slow = StaticClassifier::new("LABEL_1", 0.9).with_latency(Duration::from_secs(10));
        let d = dispatcher(slow, true, 0.0).await;
        let res = d.classify("喜欢").await.unwrap();
        assert_eq!(res.output, POSITIVE);
        assert_eq!(res.source, Source::Fallback(0));
    }

    #[tokio::test]
    async fn empty_text_rejected() {
        let d = dispatcher(StaticClassifier::new("LABEL_1", 0.9), true, 0.0).await;
        assert!(matches!(d.classify("").await, Err(GatewayError::EmptyInput)));
    }

    #[tokio::test]
    async fn empty_text_invokes_no_strategy() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct Counting(AtomicUsize);
        impl Strategy for Counting {
            fn id(&self) -> &str {
                "counting"
            }
            fn resolve<'a>(&'a self, _request: &'a Request) -> StrategyFuture<'a> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Box::pin(async { Some(Candidate::new(NEUTRAL, Confidence::ZERO)) })
            }
            fn is_unconditional(&self) -> bool {
                true
            }
        }

        let counting = Arc::new(Counting(AtomicUsize::new(0)));
        let chain = ResolutionChain::builder(Capability::Classification)
            .primary(counting.clone(), Confidence::ZERO)
            .build();
        let d = ClassificationDispatcher::from_chain(chain);

        assert!(matches!(d.classify("").await, Err(GatewayError::EmptyInput)));
        assert_eq!(counting.0.load(Ordering::SeqCst), 0);
        d.classify("x").await.unwrap();
        assert_eq!(counting.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn readiness_flip_is_observed_per_request() {
        let registry = BackendRegistry::new();
        registry
            .register(BackendDescriptor::new(BACKEND, Capability::Classification, true))
            .await
            .unwrap();
        let mut cfg = ClassificationConfig::test_default();
        cfg.name = BACKEND.into();
        let d = ClassificationDispatcher::new(
            &cfg,
            registry.clone(),
            ClassifierBackend::Static(StaticClassifier::new("LABEL_1", 0.9)),
        );

        assert_eq!(d.classify("好").await.unwrap().source, Source::Primary);
        registry.set_ready(BACKEND, false).await.unwrap();
        assert_eq!(d.classify("好").await.unwrap().source, Source::Fallback(0));
    }
}
