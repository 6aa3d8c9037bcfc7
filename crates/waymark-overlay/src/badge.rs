//! Badge construction and environment-conditional interaction wiring.
//!
//! A badge is a small `span` carrying the reference count as its text plus
//! identifying metadata as data attributes. The factory builds it detached;
//! placement decides where it goes. The same decoration is used inline next
//! to links and embeds, inside headings, and on referenced blocks.

use waymark_core::{normalize_key, EntityKind, OverlaySettings, Platform, TouchAction};

use crate::dom::{Fragment, NodeId};

/// Tag used for badge elements.
pub const BADGE_TAG: &str = "span";
/// Class carried by every badge.
pub const BADGE_CLASS: &str = "wm-reference";
/// Class marking a badge as subject to reconciliation.
pub const LIVE_UPDATE_CLASS: &str = "wm-live-update";

/// Entity kind (block/embed/link/heading).
pub const ATTR_TYPE: &str = "data-wm-type";
/// Raw source text of the first citation.
pub const ATTR_REAL_LINK: &str = "data-wm-real-link";
/// Uppercased entity key.
pub const ATTR_KEY: &str = "data-wm-key";
/// Vault path of the owning file.
pub const ATTR_FILE_PATH: &str = "data-wm-filepath";
/// Source line the entity starts on.
pub const ATTR_LINE: &str = "data-wm-line";

/// Per-kind style class added to a badge once placed.
pub fn preview_class(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Block => "wm-block-preview",
        EntityKind::Embed => "wm-embed-preview",
        EntityKind::Link => "wm-link-preview",
        EntityKind::Heading => "wm-heading-preview",
    }
}

/// Inputs for one badge.
#[derive(Debug, Clone, Copy)]
pub struct BadgeSpec<'a> {
    /// Number shown in the badge.
    pub count: usize,
    pub kind: EntityKind,
    /// Raw citation text carried through to the details view.
    pub real_link: &'a str,
    /// Entity key; stored uppercased on the element.
    pub key: &'a str,
    /// Vault path of the owning file ("" when unresolved).
    pub file_path: &'a str,
    /// Extra style classes attached as-is.
    pub attach_classes: &'a [&'a str],
    /// Source line number of the entity.
    pub line: u32,
}

/// Which interactions a badge responds to in the current environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionWiring {
    /// Click opens the details side panel.
    pub click: bool,
    /// Hover opens the preview popover (subject to the modifier gate).
    pub hover: bool,
}

/// A built badge: the detached element plus its interaction wiring.
#[derive(Debug, Clone, Copy)]
pub struct Badge {
    pub node: NodeId,
    pub wiring: InteractionWiring,
}

/// Decide interaction wiring from the host environment.
///
/// Click activation needs a pointing device, or a touch environment whose
/// tap action is the side panel. Hover previews are wired everywhere except
/// touch environments configured for the side-panel action.
pub fn interaction_wiring(platform: Platform, settings: &OverlaySettings) -> InteractionWiring {
    let click = !platform.is_mobile() || settings.touch_action == TouchAction::SidePanel;
    let hover = !platform.is_mobile() || settings.touch_action == TouchAction::Popover;
    InteractionWiring { click, hover }
}

/// Build a detached badge element.
///
/// Purely presentational: no index or network I/O happens here, and malformed
/// inputs (empty strings) are rendered as-is.
pub fn build_badge(
    frag: &mut Fragment,
    spec: &BadgeSpec<'_>,
    platform: Platform,
    settings: &OverlaySettings,
) -> Badge {
    let node = frag.create_element(BADGE_TAG);
    frag.add_class(node, BADGE_CLASS);
    frag.add_class(node, &format!("wm-{}", spec.kind.as_str()));
    for class in spec.attach_classes {
        frag.add_class(node, class);
    }
    frag.set_attr(node, ATTR_TYPE, spec.kind.as_str());
    frag.set_attr(node, ATTR_REAL_LINK, spec.real_link);
    frag.set_attr(node, ATTR_KEY, &normalize_key(spec.key));
    frag.set_attr(node, ATTR_FILE_PATH, spec.file_path);
    frag.set_attr(node, ATTR_LINE, &spec.line.to_string());
    let count = frag.create_text(&spec.count.to_string());
    frag.append_child(node, count);
    Badge {
        node,
        wiring: interaction_wiring(platform, settings),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn spec<'a>() -> BadgeSpec<'a> {
        BadgeSpec {
            count: 3,
            kind: EntityKind::Link,
            real_link: "[[Page A]]",
            key: "Notes/Page A",
            file_path: "Notes/Page A.md",
            attach_classes: &[LIVE_UPDATE_CLASS],
            line: 12,
        }
    }

    #[test]
    fn badge_carries_metadata_and_count() {
        let mut frag = Fragment::new("div");
        let badge = build_badge(
            &mut frag,
            &spec(),
            Platform::Desktop,
            &OverlaySettings::default(),
        );
        let node = badge.node;
        assert_eq!(frag.element(node).unwrap().tag, BADGE_TAG);
        assert!(frag.has_class(node, BADGE_CLASS));
        assert!(frag.has_class(node, "wm-link"));
        assert!(frag.has_class(node, LIVE_UPDATE_CLASS));
        assert_eq!(frag.attr(node, ATTR_TYPE), Some("link"));
        assert_eq!(frag.attr(node, ATTR_REAL_LINK), Some("[[Page A]]"));
        assert_eq!(frag.attr(node, ATTR_KEY), Some("NOTES/PAGE A"));
        assert_eq!(frag.attr(node, ATTR_FILE_PATH), Some("Notes/Page A.md"));
        assert_eq!(frag.attr(node, ATTR_LINE), Some("12"));
        assert_eq!(frag.text_content(node), "3");
        // Built detached; placement decides where it goes.
        assert!(!frag.is_attached(node));
    }

    #[test]
    fn empty_inputs_render_as_is() {
        let mut frag = Fragment::new("div");
        let badge = build_badge(
            &mut frag,
            &BadgeSpec {
                count: 0,
                kind: EntityKind::Block,
                real_link: "",
                key: "",
                file_path: "",
                attach_classes: &[],
                line: 0,
            },
            Platform::Desktop,
            &OverlaySettings::default(),
        );
        assert_eq!(frag.attr(badge.node, ATTR_KEY), Some(""));
        assert_eq!(frag.text_content(badge.node), "0");
    }

    #[test_case(Platform::Desktop, TouchAction::SidePanel, true, true; "desktop side panel")]
    #[test_case(Platform::Desktop, TouchAction::Popover, true, true; "desktop popover")]
    #[test_case(Platform::Mobile, TouchAction::SidePanel, true, false; "mobile side panel taps open panel")]
    #[test_case(Platform::Mobile, TouchAction::Popover, false, true; "mobile popover taps open popover")]
    fn wiring_matrix(platform: Platform, action: TouchAction, click: bool, hover: bool) {
        let settings = OverlaySettings {
            touch_action: action,
            ..OverlaySettings::default()
        };
        let wiring = interaction_wiring(platform, &settings);
        assert_eq!(wiring.click, click);
        assert_eq!(wiring.hover, hover);
    }
}
