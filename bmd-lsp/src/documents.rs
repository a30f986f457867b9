//! Open-document tracking and position mapping.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tower_lsp::lsp_types::{Position, Url};

/// Immutable view of one open document at a point in time.
///
/// Snapshots are cheap to clone; every analysis and encoding pass works off
/// the snapshot taken when its triggering event was dispatched, so markers
/// and styles from different document states never mix.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    text: Arc<String>,
    line_offsets: Arc<Vec<usize>>,
    version: i32,
}

impl DocumentSnapshot {
    pub(crate) fn new(text: String, version: i32) -> Self {
        let line_offsets = Arc::new(compute_line_offsets(&text));
        Self {
            text: Arc::new(text),
            line_offsets,
            version,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    /// Byte offset → LSP position. Offsets past the end of the document are
    /// clamped to the final position; the character column counts UTF-16
    /// code units, the unit the protocol mandates.
    pub fn position_at(&self, offset: usize) -> Position {
        let offset = offset.min(self.text.len());
        let line = self.line_offsets.partition_point(|&start| start <= offset) - 1;
        let line_start = self.line_offsets[line];
        let mut character = 0u32;
        for (idx, ch) in self.text[line_start..].char_indices() {
            if line_start + idx >= offset {
                break;
            }
            character += ch.len_utf16() as u32;
        }
        Position::new(line as u32, character)
    }

    /// LSP position → UTF-16 code-unit offset into the whole text. Positions
    /// past the end of a line or of the document clamp to the nearest valid
    /// offset.
    pub fn utf16_offset_at(&self, position: Position) -> usize {
        let line = position.line as usize;
        if line >= self.line_offsets.len() {
            return utf16_len(&self.text);
        }
        let line_start = self.line_offsets[line];
        let mut units = utf16_len(&self.text[..line_start]);
        let mut remaining = position.character as usize;
        for ch in self.text[line_start..].chars() {
            if remaining == 0 || ch == '\n' {
                break;
            }
            let width = ch.len_utf16();
            if width > remaining {
                break;
            }
            units += width;
            remaining -= width;
        }
        units
    }
}

pub(crate) fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

fn compute_line_offsets(text: &str) -> Vec<usize> {
    let mut offsets = vec![0];
    for (idx, ch) in text.char_indices() {
        if ch == '\n' {
            offsets.push(idx + ch.len_utf8());
        }
    }
    offsets
}

/// Authoritative mapping from URI to open document state.
///
/// Passive: mutated only by the open/change/close notifications, never by the
/// query paths. Versions are owned here (1 on open, +1 per change) rather
/// than read from the client, which keeps them monotonic without trusting
/// the wire.
#[derive(Default)]
pub struct DocumentStore {
    entries: RwLock<HashMap<Url, DocumentSnapshot>>,
}

impl DocumentStore {
    pub async fn open(&self, uri: Url, text: String) -> DocumentSnapshot {
        let snapshot = DocumentSnapshot::new(text, 1);
        self.entries.write().await.insert(uri, snapshot.clone());
        snapshot
    }

    /// Replace the text of an open document, bumping its version. Unknown
    /// URIs are nothing to do.
    pub async fn change(&self, uri: &Url, text: String) -> Option<DocumentSnapshot> {
        let mut entries = self.entries.write().await;
        let current = entries.get(uri)?;
        let snapshot = DocumentSnapshot::new(text, current.version.saturating_add(1));
        entries.insert(uri.clone(), snapshot.clone());
        Some(snapshot)
    }

    pub async fn close(&self, uri: &Url) {
        self.entries.write().await.remove(uri);
    }

    pub async fn get(&self, uri: &Url) -> Option<DocumentSnapshot> {
        self.entries.read().await.get(uri).cloned()
    }

    /// Every open document, for the revalidation sweep after a
    /// configuration change.
    pub async fn all(&self) -> Vec<(Url, DocumentSnapshot)> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(uri, snapshot)| (uri.clone(), snapshot.clone()))
            .collect()
    }
}
