//! Index snapshot model consumed from the vault indexer.
//!
//! The indexer (external collaborator) parses vault files and produces, per
//! file, ordered sequences of referenceable entities together with their
//! inbound references. The overlay engine consumes these as read-only,
//! point-in-time snapshots; it never mutates a cache. The live
//! [`ReferenceIndex`] is the one mutable structure, owned by the indexer and
//! shared with the reconciliation loop.

use std::fmt;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::resolve::normalize_key;

/// The four referenceable structural categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Block,
    Embed,
    Link,
    Heading,
}

impl EntityKind {
    /// Stable lowercase name, used in badge attributes and style classes.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Block => "block",
            EntityKind::Embed => "embed",
            EntityKind::Link => "link",
            EntityKind::Heading => "heading",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inbound citation of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Raw source text of the citation as written in the citing document.
    pub real_link: String,
    /// Vault path of the resolved target file, when resolution succeeded.
    pub resolved_path: Option<String>,
}

impl Reference {
    /// An unresolved reference.
    pub fn new(real_link: impl Into<String>) -> Self {
        Self {
            real_link: real_link.into(),
            resolved_path: None,
        }
    }

    /// A reference with a resolved target file.
    pub fn resolved(real_link: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            real_link: real_link.into(),
            resolved_path: Some(path.into()),
        }
    }
}

/// Start/end line span of an entity within its source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineSpan {
    pub start_line: u32,
    pub end_line: u32,
}

impl LineSpan {
    pub fn new(start_line: u32, end_line: u32) -> Self {
        Self {
            start_line,
            end_line,
        }
    }

    /// A span covering a single line.
    pub fn line(line: u32) -> Self {
        Self::new(line, line)
    }

    /// Whether this span lies entirely within `outer`.
    pub fn within(&self, outer: LineSpan) -> bool {
        self.start_line >= outer.start_line && self.end_line <= outer.end_line
    }
}

/// A referenceable unit within one source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedEntity {
    /// Identity string, unique within the entity's kind and file.
    /// Compared case-insensitively (uppercased) everywhere.
    pub key: String,
    /// Inbound references in discovery order. The order is authoritative:
    /// placement matches the earliest entity first, not the closest.
    pub references: Vec<Reference>,
    /// Line span within the source document.
    pub pos: LineSpan,
    /// Normalized heading text, present for heading entities only.
    pub header_match: Option<String>,
}

impl IndexedEntity {
    pub fn new(key: impl Into<String>, pos: LineSpan) -> Self {
        Self {
            key: key.into(),
            references: Vec::new(),
            pos,
            header_match: None,
        }
    }

    /// Attach one reference (builder style).
    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.references.push(reference);
        self
    }

    /// Set the heading correlation text (builder style).
    pub fn with_header_match(mut self, text: impl Into<String>) -> Self {
        self.header_match = Some(text.into());
        self
    }

    /// Number of inbound references; this is the badge count.
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// First reference, which supplies the badge's real-link and file path.
    pub fn first_reference(&self) -> Option<&Reference> {
        self.references.first()
    }
}

/// Frontmatter-derived flags that disable annotation for a whole document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionFlags {
    /// The file opted out of annotation entirely.
    pub exclude_file: bool,
    /// The file opted out of canvas-preview annotation.
    pub exclude_canvas_preview: bool,
    /// The file carries a third-party board plugin marker.
    pub kanban_board: bool,
}

/// Per-file snapshot of indexed entities, one ordered sequence per kind.
///
/// Rebuilt by the indexer whenever the source document changes; the overlay
/// reads it at render time and never writes to it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileCache {
    pub blocks: Vec<IndexedEntity>,
    pub embeds: Vec<IndexedEntity>,
    pub links: Vec<IndexedEntity>,
    pub headings: Vec<IndexedEntity>,
    pub flags: ExclusionFlags,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entities of one kind, in index order.
    pub fn entities(&self, kind: EntityKind) -> &[IndexedEntity] {
        match kind {
            EntityKind::Block => &self.blocks,
            EntityKind::Embed => &self.embeds,
            EntityKind::Link => &self.links,
            EntityKind::Heading => &self.headings,
        }
    }

    /// True when no kind has any entity.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
            && self.embeds.is_empty()
            && self.links.is_empty()
            && self.headings.is_empty()
    }
}

/// Live global mapping from normalized entity key to its reference list.
///
/// Owned by the indexer, which rewrites entries as vault files change; read
/// by the reconciliation loop and by placement for file-less fragments. Keys
/// are normalized on the way in, so lookups are case-insensitive.
#[derive(Debug, Default)]
pub struct ReferenceIndex {
    entries: DashMap<String, Vec<Reference>>,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the reference list for a key.
    pub fn set(&self, key: &str, references: Vec<Reference>) {
        self.entries.insert(normalize_key(key), references);
    }

    /// Drop a key entirely.
    pub fn remove(&self, key: &str) {
        self.entries.remove(&normalize_key(key));
    }

    /// Current number of references for a key; 0 for unknown keys.
    pub fn count(&self, key: &str) -> usize {
        self.entries
            .get(&normalize_key(key))
            .map(|refs| refs.len())
            .unwrap_or(0)
    }

    /// Snapshot of the reference list for a key.
    pub fn references(&self, key: &str) -> Option<Vec<Reference>> {
        self.entries.get(&normalize_key(key)).map(|r| r.clone())
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
