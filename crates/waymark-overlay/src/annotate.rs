//! Placement pass: match indexed entities against a rendered fragment and
//! insert count badges at the right anchors.
//!
//! One independent procedure per entity kind. All share the same eligibility
//! filter (`references >= effective threshold`) and the same failure mode: a
//! miss skips that one insertion and nothing else. The pass runs once per
//! rendered fragment; keeping already-placed badges current is the
//! reconciliation loop's job, not this module's.
//!
//! Anchor heuristics are ordered fallback chains:
//! - blocks: exact `data-line` match, then the first paragraph. The paragraph
//!   fallback can pick the wrong block in a multi-block fragment; inherited
//!   imprecision, kept as-is.
//! - headings: marker text match, then the first `h1..h6` in the fragment.

use tracing::{debug, trace};
use waymark_core::{
    expand_fragment_link, normalize_key, EntityKind, FileCache, IndexedEntity, LineSpan,
    LinkResolver, OverlaySettings, Platform, ReferenceIndex,
};

use crate::badge::{build_badge, preview_class, BadgeSpec, LIVE_UPDATE_CLASS};
use crate::dom::{Element, Fragment, NodeId};
use crate::insert::insert_respecting_colon;

/// Class marking internal link anchors in the rendered tree.
pub const INTERNAL_LINK_CLASS: &str = "internal-link";
/// Class marking embedded-content nodes in the rendered tree.
pub const INTERNAL_EMBED_CLASS: &str = "internal-embed";
/// Class on task-list containers; such fragments are never annotated.
pub const TASK_LIST_CLASS: &str = "contains-task-list";
/// Root attribute marking trees rendered by the overlay itself (popover
/// content); annotating those again would recurse.
pub const INTERNAL_RENDER_ATTR: &str = "data-wm-internal";

const ATTR_LINE_IN_SECTION: &str = "data-line";
const ATTR_HEADING_TEXT: &str = "data-heading";
const ATTR_LINK_TARGET: &str = "data-href";
const ATTR_EMBED_SOURCE: &str = "src";

// Embed renders nested this deep get annotated by their own render pass.
const SKIP_NEST_LEVEL: u32 = 4;

/// Line window of the fragment within its source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionSpan {
    pub line_start: u32,
    pub line_end: u32,
}

impl SectionSpan {
    pub fn new(line_start: u32, line_end: u32) -> Self {
        Self {
            line_start,
            line_end,
        }
    }

    fn contains(&self, entity: &IndexedEntity) -> bool {
        entity
            .pos
            .within(LineSpan::new(self.line_start, self.line_end))
    }
}

/// What the renderer knows about the fragment being annotated.
#[derive(Debug, Clone, Copy)]
pub struct FragmentSource<'a> {
    /// Index snapshot for the owning file.
    pub cache: &'a FileCache,
    /// Vault path of the owning file.
    pub file_path: &'a str,
    /// Line window of this fragment, when the renderer can supply one.
    /// Block annotation needs it; the other kinds do not.
    pub section: Option<SectionSpan>,
    /// Remaining embed-nesting budget, when rendered inside an embed chain.
    pub remaining_nest_level: Option<u32>,
}

impl<'a> FragmentSource<'a> {
    pub fn new(cache: &'a FileCache, file_path: &'a str) -> Self {
        Self {
            cache,
            file_path,
            section: None,
            remaining_nest_level: None,
        }
    }

    pub fn with_section(mut self, section: SectionSpan) -> Self {
        self.section = Some(section);
        self
    }
}

/// Placement engine for one host configuration.
pub struct Annotator<'a> {
    settings: &'a OverlaySettings,
    platform: Platform,
    resolver: &'a dyn LinkResolver,
}

impl<'a> Annotator<'a> {
    pub fn new(
        settings: &'a OverlaySettings,
        platform: Platform,
        resolver: &'a dyn LinkResolver,
    ) -> Self {
        Self {
            settings,
            platform,
            resolver,
        }
    }

    /// Annotate one rendered fragment of a vault file. Returns the number of
    /// badges inserted.
    pub fn annotate(&self, frag: &mut Fragment, source: &FragmentSource<'_>) -> usize {
        if self.skip_fragment(frag, source.remaining_nest_level) {
            return 0;
        }
        let flags = &source.cache.flags;
        if flags.exclude_file || flags.exclude_canvas_preview {
            trace!(file = source.file_path, "fragment excluded by frontmatter");
            return 0;
        }
        if flags.kanban_board && !self.settings.annotate_boards {
            trace!(file = source.file_path, "board document skipped");
            return 0;
        }
        if source.cache.is_empty() {
            return 0;
        }

        let mut inserted = 0;
        if self.settings.render_blocks {
            inserted += self.annotate_blocks(frag, source);
        }
        if self.settings.render_embeds {
            inserted += self.annotate_embeds(frag, source);
        }
        if self.settings.render_links {
            inserted += self.annotate_links(frag, source);
        }
        if self.settings.render_headings {
            inserted += self.annotate_headings(frag, source);
        }
        debug!(file = source.file_path, inserted, "placement pass done");
        inserted
    }

    /// Annotate a fragment with no backing file (ephemeral documents).
    ///
    /// Without a per-file cache, link and embed targets are resolved
    /// directly and counted against the global index; targets without a
    /// resolved file are skipped.
    pub fn annotate_unbound(&self, frag: &mut Fragment, index: &ReferenceIndex) -> usize {
        if self.skip_fragment(frag, None) {
            return 0;
        }
        let threshold = self.settings.minimum_ref_count;
        let targets: Vec<NodeId> = frag
            .select(frag.root(), |el| {
                el.has_class(INTERNAL_LINK_CLASS) || el.has_class(INTERNAL_EMBED_CLASS)
            })
            .collect();

        let mut inserted = 0;
        for node in targets {
            let kind = if frag.has_class(node, INTERNAL_LINK_CLASS) {
                EntityKind::Link
            } else {
                EntityKind::Embed
            };
            let Some(raw) = frag
                .attr(node, ATTR_LINK_TARGET)
                .or_else(|| frag.attr(node, ATTR_EMBED_SOURCE))
                .map(str::to_string)
            else {
                continue;
            };
            let Some(resolved) = self.resolver.resolve(&raw) else {
                continue;
            };
            let key = normalize_key(&resolved);
            let count = index.count(&key);
            if count == 0 || count < threshold {
                continue;
            }
            if is_annotated(frag, node, preview_class(kind)) {
                continue;
            }
            let file_path = resolved.split('#').next().unwrap_or(&resolved).to_string();
            let badge = build_badge(
                frag,
                &BadgeSpec {
                    count,
                    kind,
                    real_link: &raw,
                    key: &key,
                    file_path: &file_path,
                    attach_classes: &[LIVE_UPDATE_CLASS, preview_class(kind)],
                    line: 1,
                },
                self.platform,
                self.settings,
            );
            if frag.insert_after(node, badge.node) {
                inserted += 1;
            }
        }
        debug!(inserted, "unbound placement pass done");
        inserted
    }

    fn skip_fragment(&self, frag: &Fragment, nest_level: Option<u32>) -> bool {
        if nest_level == Some(SKIP_NEST_LEVEL) {
            return true;
        }
        if frag.attr(frag.root(), INTERNAL_RENDER_ATTR).is_some() {
            return true;
        }
        frag.find(frag.root(), |el| el.has_class(TASK_LIST_CLASS))
            .is_some()
    }

    // ── Blocks ───────────────────────────────────────────────────────────

    fn annotate_blocks(&self, frag: &mut Fragment, source: &FragmentSource<'_>) -> usize {
        let Some(section) = source.section else {
            return 0;
        };
        let threshold = self.settings.effective_threshold(EntityKind::Block);
        let mut inserted = 0;

        for entity in &source.cache.blocks {
            if entity.reference_count() < threshold || !section.contains(entity) {
                continue;
            }
            let Some(first) = entity.first_reference() else {
                continue;
            };

            let line_in_section = (entity.pos.start_line - section.line_start).to_string();
            let anchor = frag
                .find(frag.root(), |el| {
                    el.attr(ATTR_LINE_IN_SECTION) == Some(line_in_section.as_str())
                })
                .or_else(|| frag.find(frag.root(), |el| el.tag == "p"));
            let Some(anchor) = anchor else {
                continue;
            };
            if block_annotated(frag, anchor, &entity.key) {
                continue;
            }

            let badge = build_badge(
                frag,
                &BadgeSpec {
                    count: entity.reference_count(),
                    kind: EntityKind::Block,
                    real_link: &first.real_link,
                    key: &entity.key,
                    file_path: first.resolved_path.as_deref().unwrap_or(""),
                    attach_classes: &[LIVE_UPDATE_CLASS],
                    line: entity.pos.start_line,
                },
                self.platform,
                self.settings,
            );
            // A block that opens a nested list gets its badge ahead of the
            // list; anything else gets the colon-aware text insertion.
            match frag.find(anchor, |el| el.tag == "ul") {
                Some(list) => {
                    frag.insert_before(list, badge.node);
                }
                None => insert_respecting_colon(frag, anchor, badge.node),
            }
            frag.add_class(badge.node, preview_class(EntityKind::Block));
            inserted += 1;
        }
        inserted
    }

    // ── Embeds and links ─────────────────────────────────────────────────

    fn annotate_embeds(&self, frag: &mut Fragment, source: &FragmentSource<'_>) -> usize {
        self.annotate_link_like(
            frag,
            source,
            EntityKind::Embed,
            |el| el.has_class(INTERNAL_EMBED_CLASS),
            ATTR_EMBED_SOURCE,
        )
    }

    fn annotate_links(&self, frag: &mut Fragment, source: &FragmentSource<'_>) -> usize {
        self.annotate_link_like(
            frag,
            source,
            EntityKind::Link,
            |el| el.tag == "a" && el.has_class(INTERNAL_LINK_CLASS),
            ATTR_LINK_TARGET,
        )
    }

    fn annotate_link_like(
        &self,
        frag: &mut Fragment,
        source: &FragmentSource<'_>,
        kind: EntityKind,
        select: impl Fn(&Element) -> bool,
        target_attr: &str,
    ) -> usize {
        let threshold = self.settings.effective_threshold(kind);
        let entities = source.cache.entities(kind);
        let marker = preview_class(kind);
        let targets: Vec<NodeId> = frag.select(frag.root(), select).collect();

        let mut inserted = 0;
        for node in targets {
            if is_annotated(frag, node, marker) {
                continue;
            }
            let Some(raw) = frag.attr(node, target_attr).map(str::to_string) else {
                continue;
            };
            let needle = normalize_key(&self.lookup_key(source.file_path, &raw));

            // First match wins; entity order is authoritative.
            for entity in entities {
                if entity.reference_count() < threshold
                    || normalize_key(&entity.key) != needle
                {
                    continue;
                }
                let Some(first) = entity.first_reference() else {
                    break;
                };
                let badge = build_badge(
                    frag,
                    &BadgeSpec {
                        count: entity.reference_count(),
                        kind,
                        real_link: &first.real_link,
                        key: &entity.key,
                        file_path: first.resolved_path.as_deref().unwrap_or(""),
                        attach_classes: &[LIVE_UPDATE_CLASS],
                        line: entity.pos.start_line,
                    },
                    self.platform,
                    self.settings,
                );
                frag.add_class(badge.node, marker);
                if frag.insert_after(node, badge.node) {
                    inserted += 1;
                }
                break;
            }
        }
        inserted
    }

    /// Derive the lookup key for a raw link/embed target: expand
    /// fragment-only targets against the current file, then resolve; an
    /// unresolvable target falls back to its raw text.
    fn lookup_key(&self, file_path: &str, raw: &str) -> String {
        let expanded = if raw.starts_with('#') {
            expand_fragment_link(file_path, raw)
        } else {
            raw.to_string()
        };
        self.resolver
            .resolve(&expanded)
            .unwrap_or_else(|| raw.to_string())
    }

    // ── Headings ─────────────────────────────────────────────────────────

    fn annotate_headings(&self, frag: &mut Fragment, source: &FragmentSource<'_>) -> usize {
        let threshold = self.settings.effective_threshold(EntityKind::Heading);
        let Some(marker_text) = frag
            .descendants(frag.root())
            .find_map(|id| frag.attr(id, ATTR_HEADING_TEXT).map(str::to_string))
        else {
            return 0;
        };
        let normalized = marker_text.replace(['[', ']'], "");

        for entity in &source.cache.headings {
            if entity.reference_count() < threshold
                || entity.header_match.as_deref() != Some(normalized.as_str())
            {
                continue;
            }
            let Some(first) = entity.first_reference() else {
                return 0;
            };
            let Some(heading) = frag.find(frag.root(), |el| is_heading_tag(&el.tag)) else {
                return 0;
            };
            if frag
                .find(heading, |el| el.has_class(preview_class(EntityKind::Heading)))
                .is_some()
            {
                return 0;
            }
            let badge = build_badge(
                frag,
                &BadgeSpec {
                    count: entity.reference_count(),
                    kind: EntityKind::Heading,
                    real_link: &first.real_link,
                    key: &entity.key,
                    file_path: first.resolved_path.as_deref().unwrap_or(""),
                    attach_classes: &[LIVE_UPDATE_CLASS],
                    line: entity.pos.start_line,
                },
                self.platform,
                self.settings,
            );
            frag.add_class(badge.node, preview_class(EntityKind::Heading));
            frag.append_child(heading, badge.node);
            return 1;
        }
        0
    }
}

fn is_heading_tag(tag: &str) -> bool {
    matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// A link/embed node counts as annotated when it (or its next sibling)
/// already carries the kind's preview class.
fn is_annotated(frag: &Fragment, node: NodeId, marker: &str) -> bool {
    if frag.has_class(node, marker) {
        return true;
    }
    frag.next_sibling(node)
        .is_some_and(|sibling| frag.has_class(sibling, marker))
}

/// A block anchor counts as annotated for `key` when its subtree already
/// holds a block badge with that key.
fn block_annotated(frag: &Fragment, anchor: NodeId, key: &str) -> bool {
    let needle = normalize_key(key);
    frag.find(anchor, |el| {
        el.has_class(preview_class(EntityKind::Block))
            && el.attr(crate::badge::ATTR_KEY) == Some(needle.as_str())
    })
    .is_some()
}
