//! Delta-encoded semantic tokens from analyzer style spans.

use bmd_analyzer::StyleSpan;
use tower_lsp::lsp_types::{SemanticToken, SemanticTokenType, SemanticTokensLegend};

use crate::documents::{utf16_len, DocumentSnapshot};

/// Legend announced during the initialize handshake. The order is fixed for
/// the lifetime of a session: encoded streams reference these entries by
/// index.
pub fn legend() -> SemanticTokensLegend {
    SemanticTokensLegend {
        token_types: vec![
            SemanticTokenType::KEYWORD,
            SemanticTokenType::STRING,
            SemanticTokenType::ENUM,
        ],
        token_modifiers: Vec::new(),
    }
}

/// Engine style name → legend index. Unknown styles render as the first
/// legend entry rather than being dropped or rejected.
fn token_type_index(name: &str) -> u32 {
    match name {
        "keyword" => 0,
        "builtin-type" => 1,
        "domain-value" => 2,
        _ => 0,
    }
}

/// Encode style spans as the protocol's relative integer stream.
///
/// Spans arrive from the engine in no particular order; they are sorted by
/// offset here so the emitted deltas are non-negative.
pub fn encode_style_spans(
    snapshot: &DocumentSnapshot,
    mut styles: Vec<StyleSpan>,
) -> Vec<SemanticToken> {
    styles.sort_by_key(|style| (style.offset, style.length));

    let mut data = Vec::new();
    let mut prev_line = 0u32;
    let mut prev_start = 0u32;

    for style in &styles {
        let token_type = token_type_index(&style.name);
        for (line, start, length) in split_span_on_lines(snapshot, style) {
            if length == 0 {
                continue;
            }
            let delta_line = line.saturating_sub(prev_line);
            let delta_start = if delta_line == 0 {
                start.saturating_sub(prev_start)
            } else {
                start
            };
            data.push(SemanticToken {
                delta_line,
                delta_start,
                length,
                token_type,
                token_modifiers_bitset: 0,
            });
            prev_line = line;
            prev_start = start;
        }
    }

    data
}

/// Expand a span into single-line `(line, character, length)` segments.
///
/// The wire format encodes tokens relative to the previous token and
/// disallows spanning multiple lines, so every multi-line span must be
/// broken into per-line slices before encoding. Character and length are in
/// UTF-16 code units. Spans that do not land on character boundaries are
/// dropped.
fn split_span_on_lines(snapshot: &DocumentSnapshot, span: &StyleSpan) -> Vec<(u32, u32, u32)> {
    let text = snapshot.text();
    let start = span.offset.min(text.len());
    let end = span.offset.saturating_add(span.length).min(text.len());
    let Some(slice) = text.get(start..end) else {
        return Vec::new();
    };

    let mut segments = Vec::new();
    let mut segment_start = start;
    for (idx, ch) in slice.char_indices() {
        if ch == '\n' {
            push_segment(snapshot, &mut segments, segment_start, start + idx);
            segment_start = start + idx + ch.len_utf8();
        }
    }
    push_segment(snapshot, &mut segments, segment_start, end);
    segments
}

fn push_segment(
    snapshot: &DocumentSnapshot,
    segments: &mut Vec<(u32, u32, u32)>,
    start: usize,
    end: usize,
) {
    if end <= start {
        return;
    }
    let position = snapshot.position_at(start);
    let length = utf16_len(&snapshot.text()[start..end]) as u32;
    segments.push((position.line, position.character, length));
}
