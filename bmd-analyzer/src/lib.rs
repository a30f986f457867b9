//! Capability interface for the external BMD analysis engine.
//!
//! The engine that actually parses BMD text lives outside this workspace; it
//! may be an embedded library, a spawned process, or a network service. This
//! crate pins down the contract between that engine and the language server:
//! plain value types in, a tagged result out. Both calls are stateless and
//! idempotent for identical inputs, so no session object exists.
//!
//! Offsets in [`Marker`] and [`StyleSpan`] are byte offsets into the request
//! text. The cursor offset in [`PredictRequest`] is counted in UTF-16 code
//! units, the engine's native unit.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single analysis request over a full document snapshot.
///
/// Built fresh for every engine call; the text may change between calls, so
/// requests are never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub text: String,
    /// Starting-symbol override. Unset in the default flow.
    pub axiom: Option<String>,
}

impl AnalysisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            axiom: None,
        }
    }

    pub fn with_axiom(text: impl Into<String>, axiom: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            axiom: Some(axiom.into()),
        }
    }
}

/// A completion request: an analysis request plus the cursor location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictRequest {
    pub request: AnalysisRequest,
    /// Cursor offset in UTF-16 code units, `0 ≤ offset ≤ utf16_len(text)`.
    pub offset: usize,
}

impl PredictRequest {
    pub fn new(request: AnalysisRequest, offset: usize) -> Self {
        Self { request, offset }
    }
}

/// One diagnostic finding over the half-open byte range
/// `[offset, offset + length)`. A zero length marks a point diagnostic
/// ("missing token here").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub offset: usize,
    pub length: usize,
    /// Severity as reported by the engine: `"info"`, `"warning"` or
    /// `"error"`. Consumers must tolerate unknown values.
    pub severity: String,
    /// Localized message texts keyed by locale tag.
    pub messages: BTreeMap<String, String>,
}

impl Marker {
    /// Message for `locale`, falling back to any available locale.
    pub fn message(&self, locale: &str) -> Option<&str> {
        self.messages
            .get(locale)
            .or_else(|| self.messages.values().next())
            .map(String::as_str)
    }
}

/// One semantic-highlighting classification over a half-open byte range.
/// Spans arrive in no particular order and may overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleSpan {
    pub offset: usize,
    pub length: usize,
    pub name: String,
}

/// Range of text a completion proposal would replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementSpan {
    pub offset: usize,
    pub length: usize,
}

/// One completion candidate. Carries no resolved detail; the server attaches
/// detail lazily when the client asks for it, using the proposal itself as
/// the correlation key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionProposal {
    pub text: String,
    pub replacement: Option<ReplacementSpan>,
}

impl CompletionProposal {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            replacement: None,
        }
    }
}

/// Outcome of [`Analyzer::analyze`]. A failed parse carries no partial
/// markers or styles, only an optional error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisResult {
    Success {
        markers: Vec<Marker>,
        styles: Vec<StyleSpan>,
    },
    Failure {
        error: Option<String>,
    },
}

/// Outcome of [`Analyzer::predict`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredictResult {
    Success {
        proposals: Vec<CompletionProposal>,
    },
    Failure {
        error: Option<String>,
    },
}

/// The engine capability consumed by the language server.
///
/// Calls are modeled as async because the engine may sit behind a process or
/// network boundary. Implementations must be safe to share across the
/// server's request handlers.
#[async_trait]
pub trait Analyzer: Send + Sync + 'static {
    async fn analyze(&self, request: AnalysisRequest) -> AnalysisResult;
    async fn predict(&self, request: PredictRequest) -> PredictResult;
}
