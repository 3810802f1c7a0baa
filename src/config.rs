//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` (or the file given by `-f` / `TIERGATE_CONFIG`)
//! relative to the current working directory, then applies
//! `TIERGATE_LOG_LEVEL` and `TIERGATE_BIND` env overrides.
//!
//! Keyword tables live here as data: every section has built-in defaults so a
//! config file only needs `[gateway]`.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;
use crate::logger;

/// Server-level settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub name: String,
    pub log_level: String,
    /// Socket address for the HTTP listener.
    pub bind: String,
    /// Seconds between background readiness probes; `0` disables probing.
    pub probe_interval_seconds: u64,
}

/// `[classification.static]`: canned model output.
#[derive(Debug, Clone)]
pub struct StaticModelConfig {
    pub label: String,
    pub score: f64,
    /// `false` simulates a model that failed to load.
    pub available: bool,
    pub latency_ms: u64,
}

/// `[classification.remote]`: external model server.
#[derive(Debug, Clone)]
pub struct RemoteModelConfig {
    pub url: String,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// Classification chain configuration.
#[derive(Debug, Clone)]
pub struct ClassificationConfig {
    /// Registry name of the model-backed backend.
    pub name: String,
    /// Which backend implementation is active (`"static"`, `"remote"`).
    pub backend: String,
    /// Minimum confidence for the primary strategy. `0.0` trusts the model unconditionally.
    pub threshold: f64,
    /// Upper bound on one backend call before the primary strategy declines.
    pub timeout_ms: u64,
    pub positive_keywords: Vec<String>,
    pub negative_keywords: Vec<String>,
    pub static_model: StaticModelConfig,
    pub remote: RemoteModelConfig,
}

/// One `[[conversation.keywords]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeywordReplyConfig {
    pub keyword: String,
    pub reply: String,
}

/// Conversation chain configuration.
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// Registry name of the keyword bot.
    pub name: String,
    pub default_reply: String,
    /// Evaluated in declared order; the first contained keyword wins.
    pub keywords: Vec<KeywordReplyConfig>,
}

/// Fully-resolved gateway configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub classification: ClassificationConfig,
    pub conversation: ConversationConfig,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        RawClassification::default().resolve()
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        RawConversation::default().resolve()
    }
}

/// Raw TOML shape; `serde` target before resolution.
#[derive(Deserialize)]
struct RawConfig {
    gateway: RawGateway,
    #[serde(default)]
    classification: RawClassification,
    #[serde(default)]
    conversation: RawConversation,
}

#[derive(Deserialize)]
struct RawGateway {
    #[serde(default = "default_gateway_name")]
    name: String,
    log_level: String,
    #[serde(default = "default_bind")]
    bind: String,
    #[serde(default)]
    probe_interval_seconds: u64,
}

#[derive(Deserialize)]
struct RawClassification {
    #[serde(default = "default_classifier_name")]
    name: String,
    #[serde(default = "default_classifier_backend")]
    backend: String,
    #[serde(default)]
    threshold: f64,
    #[serde(default = "default_classify_timeout_ms")]
    timeout_ms: u64,
    #[serde(default = "default_positive_keywords")]
    positive_keywords: Vec<String>,
    #[serde(default = "default_negative_keywords")]
    negative_keywords: Vec<String>,
    #[serde(rename = "static", default)]
    static_model: RawStaticModel,
    #[serde(default)]
    remote: RawRemoteModel,
}

impl Default for RawClassification {
    fn default() -> Self {
        Self {
            name: default_classifier_name(),
            backend: default_classifier_backend(),
            threshold: 0.0,
            timeout_ms: default_classify_timeout_ms(),
            positive_keywords: default_positive_keywords(),
            negative_keywords: default_negative_keywords(),
            static_model: RawStaticModel::default(),
            remote: RawRemoteModel::default(),
        }
    }
}

impl RawClassification {
    fn resolve(self) -> ClassificationConfig {
        ClassificationConfig {
            name: self.name,
            backend: self.backend,
            threshold: self.threshold,
            timeout_ms: self.timeout_ms,
            positive_keywords: self.positive_keywords,
            negative_keywords: self.negative_keywords,
            static_model: StaticModelConfig {
                label: self.static_model.label,
                score: self.static_model.score,
                available: self.static_model.available,
                latency_ms: self.static_model.latency_ms,
            },
            remote: RemoteModelConfig {
                url: self.remote.url,
                timeout_seconds: self.remote.timeout_seconds,
            },
        }
    }
}

#[derive(Deserialize)]
struct RawStaticModel {
    #[serde(default = "default_static_label")]
    label: String,
    #[serde(default = "default_static_score")]
    score: f64,
    #[serde(default = "default_true")]
    available: bool,
    #[serde(default)]
    latency_ms: u64,
}

impl Default for RawStaticModel {
    fn default() -> Self {
        Self {
            label: default_static_label(),
            score: default_static_score(),
            available: true,
            latency_ms: 0,
        }
    }
}

#[derive(Deserialize)]
struct RawRemoteModel {
    #[serde(default = "default_remote_url")]
    url: String,
    #[serde(default = "default_remote_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawRemoteModel {
    fn default() -> Self {
        Self { url: default_remote_url(), timeout_seconds: default_remote_timeout_seconds() }
    }
}

#[derive(Deserialize)]
struct RawConversation {
    #[serde(default = "default_chatbot_name")]
    name: String,
    #[serde(default = "default_reply")]
    default_reply: String,
    #[serde(default = "default_chat_keywords")]
    keywords: Vec<KeywordReplyConfig>,
}

impl Default for RawConversation {
    fn default() -> Self {
        Self {
            name: default_chatbot_name(),
            default_reply: default_reply(),
            keywords: default_chat_keywords(),
        }
    }
}

impl RawConversation {
    fn resolve(self) -> ConversationConfig {
        ConversationConfig {
            name: self.name,
            default_reply: self.default_reply,
            keywords: self.keywords,
        }
    }
}

fn default_gateway_name() -> String { "tiergate".to_string() }
fn default_bind() -> String { "127.0.0.1:5000".to_string() }
fn default_classifier_name() -> String { "text_classifier".to_string() }
fn default_classifier_backend() -> String { "static".to_string() }
fn default_classify_timeout_ms() -> u64 { 3_000 }
fn default_static_label() -> String { "neutral".to_string() }
fn default_static_score() -> f64 { 0.6 }
fn default_remote_url() -> String { "http://127.0.0.1:8000/classify".to_string() }
fn default_remote_timeout_seconds() -> u64 { 10 }
fn default_chatbot_name() -> String { "chatbot".to_string() }
fn default_true() -> bool { true }

fn default_positive_keywords() -> Vec<String> {
    ["好", "棒", "喜欢", "优秀", "满意"].map(String::from).to_vec()
}

fn default_negative_keywords() -> Vec<String> {
    ["坏", "差", "讨厌", "糟糕", "不满"].map(String::from).to_vec()
}

fn default_reply() -> String {
    "我理解你的问题，但我需要更多上下文来给出准确回答。".to_string()
}

fn default_chat_keywords() -> Vec<KeywordReplyConfig> {
    [
        ("你好", "你好！我是AI助手，有什么可以帮助你的吗？"),
        ("天气", "我无法获取实时天气信息，建议查看天气预报应用。"),
        ("时间", "我是一个AI助手，没有实时时间功能。"),
    ]
    .into_iter()
    .map(|(keyword, reply)| KeywordReplyConfig { keyword: keyword.into(), reply: reply.into() })
    .collect()
}

/// Load config, then apply env-var overrides.
///
/// Path precedence: `config_path` (CLI) > `TIERGATE_CONFIG` > `config/default.toml`.
pub fn load(config_path: Option<&str>) -> Result<Config, AppError> {
    let path = config_path
        .map(PathBuf::from)
        .or_else(|| env::var("TIERGATE_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("config/default.toml"));
    let log_level_override = env::var("TIERGATE_LOG_LEVEL").ok();
    let bind_override = env::var("TIERGATE_BIND").ok();
    load_from(&path, log_level_override.as_deref(), bind_override.as_deref())
}

/// Internal loader. Accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    log_level_override: Option<&str>,
    bind_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let g = parsed.gateway;
    let config = Config {
        gateway: GatewayConfig {
            name: g.name,
            log_level: log_level_override.unwrap_or(&g.log_level).to_string(),
            bind: bind_override.unwrap_or(&g.bind).to_string(),
            probe_interval_seconds: g.probe_interval_seconds,
        },
        classification: parsed.classification.resolve(),
        conversation: parsed.conversation.resolve(),
    };

    validate(&config)?;
    Ok(config)
}

/// Reject configurations that would break chain invariants at runtime.
pub fn validate(config: &Config) -> Result<(), AppError> {
    logger::parse_level(&config.gateway.log_level)?;

    let c = &config.classification;
    if !(0.0..=1.0).contains(&c.threshold) {
        return Err(AppError::Config(format!(
            "classification.threshold must be within [0, 1], got {}",
            c.threshold
        )));
    }
    if c.timeout_ms == 0 {
        return Err(AppError::Config("classification.timeout_ms must be > 0".into()));
    }
    if c.positive_keywords.iter().chain(&c.negative_keywords).any(String::is_empty) {
        return Err(AppError::Config("classification keywords must not be empty strings".into()));
    }

    let conv = &config.conversation;
    if let Some(pos) = conv.keywords.iter().position(|k| k.keyword.is_empty()) {
        return Err(AppError::Config(format!("conversation.keywords[{pos}].keyword is empty")));
    }

    if c.name.is_empty() || conv.name.is_empty() {
        return Err(AppError::Config("backend names must not be empty".into()));
    }
    if c.name == conv.name {
        return Err(AppError::Config(format!(
            "classification and conversation backends share the name '{}'",
            c.name
        )));
    }
    Ok(())
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// `Config` for unit tests: static model and probing disabled.
#[cfg(test)]
impl Config {
    pub fn test_default() -> Self {
        Self {
            gateway: GatewayConfig {
                name: "test".into(),
                log_level: "info".into(),
                bind: "127.0.0.1:0".into(),
                probe_interval_seconds: 0,
            },
            classification: ClassificationConfig::test_default(),
            conversation: ConversationConfig::default(),
        }
    }
}

#[cfg(test)]
impl ClassificationConfig {
    pub fn test_default() -> Self {
        let mut cfg = Self::default();
        cfg.backend = "static".into();
        cfg.static_model.label = "LABEL_1".into();
        cfg.static_model.score = 0.92;
        cfg
    }
}
