//! Core value types shared by the registry, chains and dispatchers.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

// ── Capability ────────────────────────────────────────────────────────────────

/// What a backend (and the chain built on it) resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Classification,
    Conversation,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Classification => f.write_str("classification"),
            Capability::Conversation => f.write_str("conversation"),
        }
    }
}

// ── Request ───────────────────────────────────────────────────────────────────

/// One incoming call. Immutable once built.
#[derive(Debug, Clone)]
pub struct Request {
    text: String,
}

impl Request {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

// ── Confidence ────────────────────────────────────────────────────────────────

/// A score that is always finite and within `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Confidence(f64);

impl Confidence {
    pub const ZERO: Confidence = Confidence(0.0);

    /// Returns `None` for NaN, infinities and anything outside `[0, 1]`.
    pub fn new(value: f64) -> Option<Self> {
        (value.is_finite() && (0.0..=1.0).contains(&value)).then_some(Self(value))
    }

    /// Clamp into range; NaN maps to zero.
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            Self::ZERO
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

// ── Source ────────────────────────────────────────────────────────────────────

/// Which link of a chain produced a [`Resolution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Primary,
    /// Zero-based index among the chain's fallback links.
    Fallback(usize),
    Default,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Primary => f.write_str("primary"),
            Source::Fallback(k) => write!(f, "fallback_{k}"),
            Source::Default => f.write_str("default"),
        }
    }
}

impl Serialize for Source {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ── Candidate / Resolution ────────────────────────────────────────────────────

/// What a strategy offers before the chain applies its threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub output: String,
    pub confidence: Confidence,
}

impl Candidate {
    pub fn new(output: impl Into<String>, confidence: Confidence) -> Self {
        Self { output: output.into(), confidence }
    }
}

/// The single result returned for a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    /// Classification label or conversational reply.
    pub output: String,
    pub confidence: Confidence,
    pub source: Source,
}
