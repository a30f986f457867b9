//! Two-phase completion: proposal listing and lazy resolution.
//!
//! The list phase returns lightweight items; the full proposal rides along
//! as each item's opaque `data` payload so the resolve phase can recover it
//! from the client's echo, without any server-side correlation table.

use bmd_analyzer::CompletionProposal;
use tower_lsp::lsp_types::{CompletionItem, CompletionItemKind};

/// Map engine proposals onto completion items, preserving their order
/// verbatim. No reordering, no filtering.
pub fn items_for(proposals: Vec<CompletionProposal>) -> Vec<CompletionItem> {
    proposals
        .into_iter()
        .map(|proposal| {
            let data = serde_json::to_value(&proposal).ok();
            CompletionItem {
                label: proposal.text,
                kind: Some(CompletionItemKind::TEXT),
                data,
                ..CompletionItem::default()
            }
        })
        .collect()
}

/// Attach resolved detail to an item picked from a previously returned list.
/// Items without a recoverable proposal payload come back unchanged;
/// resolution never fails.
pub fn resolve(mut item: CompletionItem) -> CompletionItem {
    let proposal = item
        .data
        .as_ref()
        .and_then(|data| serde_json::from_value::<CompletionProposal>(data.clone()).ok());
    if let Some(proposal) = proposal {
        item.detail = Some(proposal.text);
    }
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use bmd_analyzer::ReplacementSpan;
    use serde_json::json;

    fn proposals(texts: &[&str]) -> Vec<CompletionProposal> {
        texts
            .iter()
            .map(|text| CompletionProposal::new(*text))
            .collect()
    }

    #[test]
    fn preserves_proposal_order() {
        let items = items_for(proposals(&["is", "has", "a", "an", "concept"]));
        let labels: Vec<&str> = items.iter().map(|item| item.label.as_str()).collect();
        assert_eq!(labels, ["is", "has", "a", "an", "concept"]);
    }

    #[test]
    fn items_carry_the_full_proposal_as_payload() {
        let proposal = CompletionProposal {
            text: "has".to_string(),
            replacement: Some(ReplacementSpan {
                offset: 2,
                length: 1,
            }),
        };
        let items = items_for(vec![proposal.clone()]);
        assert_eq!(items[0].kind, Some(CompletionItemKind::TEXT));
        let payload = items[0].data.clone().expect("payload attached");
        let recovered: CompletionProposal =
            serde_json::from_value(payload).expect("payload decodes");
        assert_eq!(recovered, proposal);
    }

    #[test]
    fn resolve_attaches_the_proposal_text_as_detail() {
        let items = items_for(proposals(&["has"]));
        let resolved = resolve(items.into_iter().next().unwrap());
        assert_eq!(resolved.detail.as_deref(), Some("has"));
        assert_eq!(resolved.label, "has");
    }

    #[test]
    fn resolve_without_payload_returns_item_unchanged() {
        let item = CompletionItem {
            label: "bare".to_string(),
            ..CompletionItem::default()
        };
        let resolved = resolve(item.clone());
        assert_eq!(resolved, item);
    }

    #[test]
    fn resolve_with_malformed_payload_returns_item_unchanged() {
        let item = CompletionItem {
            label: "odd".to_string(),
            data: Some(json!({ "unexpected": true })),
            ..CompletionItem::default()
        };
        let resolved = resolve(item.clone());
        assert_eq!(resolved, item);
    }
}
