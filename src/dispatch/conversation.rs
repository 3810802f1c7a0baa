//! Conversation dispatcher: ordered keyword replies ending in a catch-all.
//!
//! Each configured `(keyword, reply)` becomes one fallback link, in declared
//! order, matched by substring containment with confidence 0.8.  A default
//! reply at 0.3 closes the chain and always matches.  Pure logic: the
//! conversation backend has no I/O and is always ready.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::chain::{ResolutionChain, Strategy, StrategyFuture};
use crate::config::ConversationConfig;
use crate::error::GatewayError;
use crate::types::{Candidate, Capability, Confidence, Request, Resolution};

const KEYWORD_CONFIDENCE: f64 = 0.8;
const DEFAULT_CONFIDENCE: f64 = 0.3;

// ── KeywordReply ──────────────────────────────────────────────────────────────

pub struct KeywordReply {
    id: String,
    keyword: String,
    reply: String,
}

impl KeywordReply {
    pub fn new(keyword: impl Into<String>, reply: impl Into<String>) -> Self {
        let keyword = keyword.into();
        Self { id: format!("keyword:{keyword}"), keyword, reply: reply.into() }
    }
}

impl Strategy for KeywordReply {
    fn id(&self) -> &str {
        &self.id
    }

    fn resolve<'a>(&'a self, request: &'a Request) -> StrategyFuture<'a> {
        let candidate = request
            .text()
            .contains(self.keyword.as_str())
            .then(|| Candidate::new(self.reply.clone(), Confidence::clamped(KEYWORD_CONFIDENCE)));
        Box::pin(async move { candidate })
    }
}

// ── DefaultReply ──────────────────────────────────────────────────────────────

pub struct DefaultReply {
    reply: String,
}

impl DefaultReply {
    pub fn new(reply: impl Into<String>) -> Self {
        Self { reply: reply.into() }
    }
}

impl Strategy for DefaultReply {
    fn id(&self) -> &str {
        "default_reply"
    }

    fn resolve<'a>(&'a self, _request: &'a Request) -> StrategyFuture<'a> {
        let candidate = Candidate::new(self.reply.clone(), Confidence::clamped(DEFAULT_CONFIDENCE));
        Box::pin(async move { Some(candidate) })
    }

    fn is_unconditional(&self) -> bool {
        true
    }
}

// ── ConversationDispatcher ────────────────────────────────────────────────────

pub struct ConversationDispatcher {
    chain: ResolutionChain,
}

impl ConversationDispatcher {
    pub fn new(config: &ConversationConfig) -> Self {
        let chain = config
            .keywords
            .iter()
            .fold(ResolutionChain::builder(Capability::Conversation), |b, k| {
                b.fallback(
                    Arc::new(KeywordReply::new(k.keyword.clone(), k.reply.clone())),
                    Confidence::ZERO,
                )
            })
            .default(Arc::new(DefaultReply::new(config.default_reply.clone())))
            .build();
        Self::from_chain(chain)
    }

    /// Wrap a custom chain. It should end in an unconditional strategy.
    pub fn from_chain(chain: ResolutionChain) -> Self {
        if !chain.has_terminal() {
            warn!("conversation chain has no terminal strategy; requests may fail");
        }
        Self { chain }
    }

    pub async fn chat(&self, message: &str) -> Result<Resolution, GatewayError> {
        self.chat_with(message, &CancellationToken::new()).await
    }

    /// Like [`chat`](Self::chat), abandoning between strategies once `cancel` fires.
    pub async fn chat_with(
        &self,
        message: &str,
        cancel: &CancellationToken,
    ) -> Result<Resolution, GatewayError> {
        let request = Request::new(message);
        if request.is_empty() {
            return Err(GatewayError::EmptyInput);
        }
        let resolution = self.chain.resolve(&request, cancel).await?;
        info!(
            source = %resolution.source,
            confidence = %resolution.confidence,
            reply_len = resolution.output.len(),
            "chat reply selected"
        );
        Ok(resolution)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeywordReplyConfig;
    use crate::types::Source;

    fn bot() -> ConversationDispatcher {
        ConversationDispatcher::new(&ConversationConfig::default())
    }

    #[tokio::test]
    async fn greeting_matches_before_weather() {
        let res = bot().chat("你好，今天天气如何").await.unwrap();
        assert_eq!(res.output, "你好！我是AI助手，有什么可以帮助你的吗？");
        assert_eq!(res.confidence.value(), 0.8);
        assert_eq!(res.source, Source::Fallback(0));
    }

    #[tokio::test]
    async fn later_keyword_matches_alone() {
        let res = bot().chat("现在几点了？时间呢").await.unwrap();
        assert_eq!(res.output, "我是一个AI助手，没有实时时间功能。");
        assert_eq!(res.source, Source::Fallback(2));
    }

    #[tokio::test]
    async fn unmatched_uses_default() {
        let cfg = ConversationConfig::default();
        let res = bot().chat("推荐一本书").await.unwrap();
        assert_eq!(res.output, cfg.default_reply);
        assert_eq!(res.confidence.value(), 0.3);
        assert_eq!(res.source, Source::Default);
    }

    #[tokio::test]
    async fn declared_order_decides_not_position_in_text() {
        let cfg = ConversationConfig {
            name: "chatbot".into(),
            default_reply: "?".into(),
            keywords: vec![
                KeywordReplyConfig { keyword: "beta".into(), reply: "B".into() },
                KeywordReplyConfig { keyword: "alpha".into(), reply: "A".into() },
            ],
        };
        let res = ConversationDispatcher::new(&cfg).chat("alpha then beta").await.unwrap();
        assert_eq!(res.output, "B");
    }

    #[tokio::test]
    async fn empty_table_still_answers() {
        let cfg = ConversationConfig { name: "chatbot".into(), default_reply: "hi".into(), keywords: vec![] };
        let res = ConversationDispatcher::new(&cfg).chat("anything").await.unwrap();
        assert_eq!(res.source, Source::Default);
    }

    #[tokio::test]
    async fn empty_message_rejected() {
        assert!(matches!(bot().chat("").await, Err(GatewayError::EmptyInput)));
    }

    #[tokio::test]
    async fn confidence_always_in_range() {
        let d = bot();
        for msg in ["你好", "天气", "时间", "随便", "x"] {
            let c = d.chat(msg).await.unwrap().confidence.value();
            assert!((0.0..=1.0).contains(&c));
        }
    }
}
