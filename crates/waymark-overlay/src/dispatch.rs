//! Interaction dispatch: badge clicks open the details view, hovers populate
//! the preview popover.
//!
//! The dispatcher never validates badge metadata: attribute reads default to
//! an empty string or zero, and the activation request is issued with whatever
//! partial data exists. The details-view collaborator owns graceful handling
//! of incomplete identifiers.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace};
use waymark_core::OverlaySettings;

use crate::badge::{ATTR_FILE_PATH, ATTR_KEY, ATTR_LINE, ATTR_REAL_LINK, ATTR_TYPE};
use crate::dom::{Fragment, NodeId};
use crate::reconcile::SharedFragment;

/// Identifying metadata read off one badge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceActivation {
    /// Entity kind as stored on the badge ("" when missing).
    pub kind: String,
    pub real_link: String,
    pub key: String,
    pub file_path: String,
    pub line: u32,
}

/// Read a badge's identifying attributes, defaulting missing ones.
pub fn activation_from_badge(frag: &Fragment, badge: NodeId) -> ReferenceActivation {
    let read = |name: &str| frag.attr(badge, name).unwrap_or_default().to_string();
    ReferenceActivation {
        kind: read(ATTR_TYPE),
        real_link: read(ATTR_REAL_LINK),
        key: read(ATTR_KEY),
        file_path: read(ATTR_FILE_PATH),
        line: frag
            .attr(badge, ATTR_LINE)
            .and_then(|value| value.parse().ok())
            .unwrap_or(0),
    }
}

/// The details-view collaborator.
#[async_trait]
pub trait ReferenceDetails: Send + Sync {
    /// Open the side-panel view scoped to one reference.
    async fn open_reference(&self, request: ReferenceActivation);

    /// Produce renderable markup for a hover preview, or `None` when there is
    /// nothing to show.
    async fn preview_content(&self, request: ReferenceActivation) -> Option<String>;
}

/// Modifier state of the pointer event that triggered a hover.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerModifiers {
    pub ctrl: bool,
    pub meta: bool,
}

impl PointerModifiers {
    /// True when either platform command modifier is held.
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Routes badge interactions to the details-view collaborator.
pub struct InteractionDispatcher {
    details: Arc<dyn ReferenceDetails>,
    settings: Arc<OverlaySettings>,
}

impl InteractionDispatcher {
    pub fn new(details: Arc<dyn ReferenceDetails>, settings: Arc<OverlaySettings>) -> Self {
        Self { details, settings }
    }

    /// Handle a badge click: forward the badge's metadata to the details
    /// view. Fire-and-forget; the caller does not await the view opening.
    pub fn activate(&self, frag: &Fragment, badge: NodeId) {
        let request = activation_from_badge(frag, badge);
        debug!(key = %request.key, kind = %request.kind, "badge activated");
        let details = Arc::clone(&self.details);
        tokio::spawn(async move {
            details.open_reference(request).await;
        });
    }

    /// Handle a badge hover: populate `popover` with preview content.
    ///
    /// Returns false when the modifier gate rejects the trigger, when the
    /// collaborator has no content, or when the popover was detached before
    /// content arrived (an accepted race, not a fault). Population is
    /// deferred by one scheduling tick so the host can finish showing the
    /// popover surface first.
    pub async fn populate_hover(
        &self,
        view: &SharedFragment,
        badge: NodeId,
        popover: NodeId,
        modifiers: PointerModifiers,
    ) -> bool {
        if self.settings.require_modifier_for_preview && !modifiers.command() {
            trace!("hover preview suppressed by modifier gate");
            return false;
        }
        let request = {
            let frag = view.lock();
            activation_from_badge(&frag, badge)
        };

        tokio::task::yield_now().await;

        let Some(content) = self.details.preview_content(request).await else {
            return false;
        };
        let mut frag = view.lock();
        if !frag.is_attached(popover) {
            trace!("popover vanished before preview content arrived");
            return false;
        }
        frag.set_text_content(popover, &content);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use waymark_core::{EntityKind, Platform};

    use crate::badge::{build_badge, BadgeSpec, LIVE_UPDATE_CLASS};

    #[derive(Default)]
    struct RecordingDetails {
        opened: Mutex<Vec<ReferenceActivation>>,
        previews: Mutex<Vec<ReferenceActivation>>,
        content: Option<String>,
    }

    #[async_trait]
    impl ReferenceDetails for RecordingDetails {
        async fn open_reference(&self, request: ReferenceActivation) {
            self.opened.lock().push(request);
        }

        async fn preview_content(&self, request: ReferenceActivation) -> Option<String> {
            self.previews.lock().push(request);
            self.content.clone()
        }
    }

    fn view_with_badge() -> (SharedFragment, NodeId, NodeId) {
        let mut frag = Fragment::new("div");
        let badge = build_badge(
            &mut frag,
            &BadgeSpec {
                count: 2,
                kind: EntityKind::Block,
                real_link: "[[Note#^quote]]",
                key: "Note#^quote",
                file_path: "Note.md",
                attach_classes: &[LIVE_UPDATE_CLASS],
                line: 14,
            },
            Platform::Desktop,
            &OverlaySettings::default(),
        )
        .node;
        let root = frag.root();
        frag.append_child(root, badge);
        let popover = frag.create_element("div");
        frag.add_class(popover, "wm-popover");
        frag.append_child(root, popover);
        (Arc::new(Mutex::new(frag)), badge, popover)
    }

    #[tokio::test]
    async fn click_forwards_badge_metadata() {
        let (view, badge, _) = view_with_badge();
        let details = Arc::new(RecordingDetails::default());
        let dispatcher = InteractionDispatcher::new(
            details.clone(),
            Arc::new(OverlaySettings::default()),
        );

        dispatcher.activate(&view.lock(), badge);
        tokio::task::yield_now().await;

        let opened = details.opened.lock();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].kind, "block");
        assert_eq!(opened[0].key, "NOTE#^QUOTE");
        assert_eq!(opened[0].file_path, "Note.md");
        assert_eq!(opened[0].line, 14);
    }

    #[tokio::test]
    async fn click_on_bare_element_sends_defaults() {
        let view: SharedFragment = Arc::new(Mutex::new(Fragment::new("div")));
        let bare = {
            let mut frag = view.lock();
            let root = frag.root();
            let node = frag.create_element("span");
            frag.append_child(root, node);
            node
        };
        let details = Arc::new(RecordingDetails::default());
        let dispatcher = InteractionDispatcher::new(
            details.clone(),
            Arc::new(OverlaySettings::default()),
        );

        dispatcher.activate(&view.lock(), bare);
        tokio::task::yield_now().await;

        let opened = details.opened.lock();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0], ReferenceActivation::default());
    }

    #[tokio::test]
    async fn hover_populates_the_popover() {
        let (view, badge, popover) = view_with_badge();
        let details = Arc::new(RecordingDetails {
            content: Some("3 references".to_string()),
            ..RecordingDetails::default()
        });
        let dispatcher = InteractionDispatcher::new(
            details.clone(),
            Arc::new(OverlaySettings::default()),
        );

        let shown = dispatcher
            .populate_hover(&view, badge, popover, PointerModifiers::default())
            .await;
        assert!(shown);
        assert_eq!(view.lock().text_content(popover), "3 references");
    }

    #[tokio::test]
    async fn modifier_gate_suppresses_preview() {
        let (view, badge, popover) = view_with_badge();
        let details = Arc::new(RecordingDetails {
            content: Some("content".to_string()),
            ..RecordingDetails::default()
        });
        let settings = OverlaySettings {
            require_modifier_for_preview: true,
            ..OverlaySettings::default()
        };
        let dispatcher = InteractionDispatcher::new(
            details.clone(),
            Arc::new(settings),
        );

        let shown = dispatcher
            .populate_hover(&view, badge, popover, PointerModifiers::default())
            .await;
        assert!(!shown);
        // The gate rejects before any content request is made.
        assert!(details.previews.lock().is_empty());

        let shown = dispatcher
            .populate_hover(
                &view,
                badge,
                popover,
                PointerModifiers {
                    ctrl: true,
                    meta: false,
                },
            )
            .await;
        assert!(shown);
    }

    #[tokio::test]
    async fn detached_popover_is_a_silent_no_op() {
        let (view, badge, popover) = view_with_badge();
        view.lock().detach(popover);
        let details = Arc::new(RecordingDetails {
            content: Some("content".to_string()),
            ..RecordingDetails::default()
        });
        let dispatcher = InteractionDispatcher::new(
            details.clone(),
            Arc::new(OverlaySettings::default()),
        );

        let shown = dispatcher
            .populate_hover(&view, badge, popover, PointerModifiers::default())
            .await;
        assert!(!shown);
        assert_eq!(view.lock().text_content(popover), "");
    }
}
