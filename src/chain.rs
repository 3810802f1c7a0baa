//! Resolution chain: ordered strategies with decline-and-fall-through.
//!
//! A [`ResolutionChain`] is a fixed list of links, each pairing a
//! [`Strategy`] with a confidence threshold and the [`Source`] tag it stamps
//! on a winning result.  Evaluation walks the links in order and stops at the
//! first candidate that meets its link's threshold; later links are never
//! invoked.  A strategy that returns `None` (backend unready, error, timeout)
//! or a candidate below threshold simply hands over to the next link.
//!
//! The chain itself can run dry; callers are expected to end every chain in
//! an unconditional strategy (threshold 0, never declines).  When that
//! configuration rule is broken the chain returns
//! [`GatewayError::NoStrategySucceeded`].
//!
//! Cancellation is cooperative: the token is checked before each link, never
//! while a strategy is running.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::GatewayError;
use crate::types::{Candidate, Capability, Confidence, Request, Resolution, Source};

// ── Strategy ──────────────────────────────────────────────────────────────────

/// A boxed, borrowed future returned by [`Strategy::resolve`].
pub type StrategyFuture<'a> = Pin<Box<dyn Future<Output = Option<Candidate>> + Send + 'a>>;

/// One unit of resolution logic.
///
/// Implementations must be cheap to share across concurrent requests; they
/// receive `&self` and carry no per-request state.
pub trait Strategy: Send + Sync {
    /// Stable identifier used in log messages.
    fn id(&self) -> &str;

    /// Offer a candidate for `request`, or decline with `None`.
    fn resolve<'a>(&'a self, request: &'a Request) -> StrategyFuture<'a>;

    /// `true` if this strategy can never decline.
    fn is_unconditional(&self) -> bool {
        false
    }
}

// ── Link ──────────────────────────────────────────────────────────────────────

struct Link {
    strategy: Arc<dyn Strategy>,
    threshold: Confidence,
    source: Source,
}

// ── ResolutionChain ───────────────────────────────────────────────────────────

pub struct ResolutionChain {
    capability: Capability,
    links: Vec<Link>,
}

impl ResolutionChain {
    pub fn builder(capability: Capability) -> ChainBuilder {
        ChainBuilder { capability, primary: None, fallbacks: Vec::new(), default: None }
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// `true` if the last link can never decline and accepts any confidence.
    pub fn has_terminal(&self) -> bool {
        self.links
            .last()
            .is_some_and(|l| l.threshold == Confidence::ZERO && l.strategy.is_unconditional())
    }

    /// Evaluate the chain for `request`.
    pub async fn resolve(
        &self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<Resolution, GatewayError> {
        for link in &self.links {
            if cancel.is_cancelled() {
                debug!(capability = %self.capability, "chain evaluation cancelled");
                return Err(GatewayError::Cancelled);
            }

            let strategy = link.strategy.id();
            match link.strategy.resolve(request).await {
                Some(candidate) if candidate.confidence >= link.threshold => {
                    debug!(
                        capability = %self.capability,
                        %strategy,
                        source = %link.source,
                        confidence = %candidate.confidence,
                        "strategy accepted"
                    );
                    return Ok(Resolution {
                        output: candidate.output,
                        confidence: candidate.confidence,
                        source: link.source,
                    });
                }
                Some(candidate) => {
                    debug!(
                        capability = %self.capability,
                        %strategy,
                        confidence = %candidate.confidence,
                        threshold = %link.threshold,
                        "strategy below threshold, falling through"
                    );
                }
                None => {
                    debug!(capability = %self.capability, %strategy, "strategy declined");
                }
            }
        }

        Err(GatewayError::NoStrategySucceeded(self.capability.to_string()))
    }
}

// ── ChainBuilder ──────────────────────────────────────────────────────────────

/// Assembles links as primary → fallbacks (in call order) → default.
pub struct ChainBuilder {
    capability: Capability,
    primary: Option<Link>,
    fallbacks: Vec<Link>,
    default: Option<Link>,
}

impl ChainBuilder {
    /// Set the primary link. A second call replaces the first.
    pub fn primary(mut self, strategy: Arc<dyn Strategy>, threshold: Confidence) -> Self {
        self.primary = Some(Link { strategy, threshold, source: Source::Primary });
        self
    }

    /// Append a fallback; it is tagged `Fallback(k)` with `k` its position among fallbacks.
    pub fn fallback(mut self, strategy: Arc<dyn Strategy>, threshold: Confidence) -> Self {
        let source = Source::Fallback(self.fallbacks.len());
        self.fallbacks.push(Link { strategy, threshold, source });
        self
    }

    /// Set the terminal default link. Its threshold is always zero.
    pub fn default(mut self, strategy: Arc<dyn Strategy>) -> Self {
        self.default = Some(Link { strategy, threshold: Confidence::ZERO, source: Source::Default });
        self
    }

    pub fn build(self) -> ResolutionChain {
        let links = self
            .primary
            .into_iter()
            .chain(self.fallbacks)
            .chain(self.default)
            .collect();
        ResolutionChain { capability: self.capability, links }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
