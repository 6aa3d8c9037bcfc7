//! Colon-aware badge insertion into a container's trailing text run.
//!
//! A referenced block often ends in a label ("Steps:"). Appending the badge
//! after the colon reads wrong, so the badge is tucked in front of a trailing
//! colon by splitting the text node, keeping the colon attached to its label.
//! The operation is structure-preserving: one text node becomes two plus the
//! inserted element, and the visible text is unchanged.

use std::sync::LazyLock;

use regex::Regex;

use crate::dom::{Fragment, NodeId};

// ASCII or full-width colon, optionally followed by trailing whitespace.
static TRAILING_COLON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[:：]\s*$").expect("trailing colon regex"));

/// Insert `badge` as far right as possible inside `container` without moving
/// it past a trailing label colon.
///
/// Scans the container's children from the end, skipping elements and
/// whitespace-only text nodes. If the last real text run ends in a colon, the
/// run is split at the colon and the badge lands just before it; otherwise
/// the badge is appended as the container's last child.
pub fn insert_respecting_colon(frag: &mut Fragment, container: NodeId, badge: NodeId) {
    let mut trailing_text = None;
    for &child in frag.children(container).iter().rev() {
        if let Some(text) = frag.text(child) {
            if !text.trim().is_empty() {
                trailing_text = Some(child);
                break;
            }
        }
    }

    if let Some(text_node) = trailing_text {
        let content = frag.text(text_node).unwrap_or_default().to_string();
        if let Some(found) = TRAILING_COLON.find(&content) {
            if let Some(colon_node) = frag.split_text(text_node, found.start()) {
                frag.insert_before(colon_node, badge);
                return;
            }
        }
    }

    frag.append_child(container, badge);
}
