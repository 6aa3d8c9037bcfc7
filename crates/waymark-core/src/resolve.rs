//! Link-text expansion and the link-resolution collaborator seam.
//!
//! Resolving a link target to a vault file is the indexer's job; the overlay
//! only needs the resulting vault-absolute key. [`LinkResolver`] is that seam.
//! What *is* in scope here is the purely textual part: normalizing keys for
//! case-insensitive comparison and expanding fragment-only links (`#heading`,
//! `#^block`) against the path of the document they appear in.

use std::collections::HashMap;

/// Normalize an entity key for case-insensitive comparison.
pub fn normalize_key(text: &str) -> String {
    text.to_uppercase()
}

/// Expand a fragment-only link against the path of the file it appears in.
///
/// `"Notes/Page.md"` + `"#^quote"` becomes `"Notes/Page#^quote"`; the file's
/// extension is dropped so the result lines up with vault-absolute link keys.
/// Non-fragment links are returned unchanged.
pub fn expand_fragment_link(file_path: &str, link_text: &str) -> String {
    if !link_text.starts_with('#') {
        return link_text.to_string();
    }
    let base = match file_path.rfind('.') {
        // Only strip a dot that belongs to the file name, not a directory.
        Some(dot) if file_path.rfind('/').map_or(true, |slash| dot > slash) => &file_path[..dot],
        _ => file_path,
    };
    format!("{base}{link_text}")
}

/// Maps raw link text to a vault-absolute key (path plus optional fragment).
///
/// Implemented by the host over its vault metadata. Returning `None` means
/// the target is unknown; the overlay degrades to the raw text or skips the
/// node, depending on the call site.
pub trait LinkResolver: Send + Sync {
    fn resolve(&self, link_text: &str) -> Option<String>;
}

/// Table-backed resolver for hosts with a precomputed link map, and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    targets: HashMap<String, String>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a link text and the key it resolves to.
    pub fn insert(&mut self, link_text: impl AsRef<str>, resolved: impl Into<String>) {
        self.targets
            .insert(normalize_key(link_text.as_ref()), resolved.into());
    }

    /// Builder-style [`StaticResolver::insert`].
    pub fn with(mut self, link_text: impl AsRef<str>, resolved: impl Into<String>) -> Self {
        self.insert(link_text, resolved);
        self
    }
}

impl LinkResolver for StaticResolver {
    fn resolve(&self, link_text: &str) -> Option<String> {
        self.targets.get(&normalize_key(link_text)).cloned()
    }
}
