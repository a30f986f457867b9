//! Mapping of analysis results onto LSP diagnostics.

use bmd_analyzer::{AnalysisResult, Marker};
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Range};

use crate::documents::DocumentSnapshot;

/// Source tag attached to every diagnostic published by this server.
pub const DIAGNOSTIC_SOURCE: &str = "bmd";

/// Locale markers are resolved for.
const MESSAGE_LOCALE: &str = "en";

/// Message used when the engine reports a failure without any text.
const UNHANDLED_PARSE_ERROR: &str = "Unhandled parsing error";

/// Engine severity string → LSP severity. Unknown values default to error.
fn severity_for(name: &str) -> DiagnosticSeverity {
    match name {
        "info" => DiagnosticSeverity::INFORMATION,
        "warning" => DiagnosticSeverity::WARNING,
        _ => DiagnosticSeverity::ERROR,
    }
}

fn diagnostic(
    snapshot: &DocumentSnapshot,
    severity: DiagnosticSeverity,
    start: usize,
    end: usize,
    message: String,
) -> Diagnostic {
    Diagnostic {
        range: Range {
            start: snapshot.position_at(start),
            end: snapshot.position_at(end),
        },
        severity: Some(severity),
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message,
        ..Diagnostic::default()
    }
}

fn from_marker(snapshot: &DocumentSnapshot, marker: &Marker) -> Diagnostic {
    diagnostic(
        snapshot,
        severity_for(&marker.severity),
        marker.offset,
        marker.offset.saturating_add(marker.length),
        marker.message(MESSAGE_LOCALE).unwrap_or_default().to_string(),
    )
}

/// The full diagnostic set for one analysis pass over one snapshot.
///
/// A successful parse maps every marker; a failed parse yields exactly one
/// diagnostic spanning the whole document. The caller publishes the returned
/// list as a full replacement of whatever was published before.
pub fn diagnostics_for(snapshot: &DocumentSnapshot, result: &AnalysisResult) -> Vec<Diagnostic> {
    match result {
        AnalysisResult::Success { markers, .. } => markers
            .iter()
            .map(|marker| from_marker(snapshot, marker))
            .collect(),
        AnalysisResult::Failure { error } => vec![diagnostic(
            snapshot,
            DiagnosticSeverity::ERROR,
            0,
            snapshot.text().len(),
            error
                .clone()
                .unwrap_or_else(|| UNHANDLED_PARSE_ERROR.to_string()),
        )],
    }
}
