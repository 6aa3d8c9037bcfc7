//! Overlay settings and host environment description.
//!
//! The settings struct is the read-only configuration surface handed in by the
//! host. Persistence and settings UI belong to the host; this crate only
//! defines the recognized options and their defaults.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::index::EntityKind;

/// Default minimum number of inbound references required to draw a badge.
pub const DEFAULT_MIN_REF_COUNT: usize = 1;

/// Read-only overlay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlaySettings {
    /// Minimum inbound reference count for a badge to be displayed.
    pub minimum_ref_count: usize,
    /// Annotate referenced blocks.
    pub render_blocks: bool,
    /// Annotate embedded content.
    pub render_embeds: bool,
    /// Annotate internal links.
    pub render_links: bool,
    /// Annotate headings.
    pub render_headings: bool,
    /// What a badge tap does on touch devices.
    pub touch_action: TouchAction,
    /// Only open the hover preview when ctrl/cmd is held.
    pub require_modifier_for_preview: bool,
    /// Also annotate documents carrying the third-party board frontmatter
    /// marker. Off by default; board plugins render their own layout.
    pub annotate_boards: bool,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            minimum_ref_count: DEFAULT_MIN_REF_COUNT,
            render_blocks: true,
            render_embeds: true,
            render_links: true,
            render_headings: true,
            touch_action: TouchAction::SidePanel,
            require_modifier_for_preview: false,
            annotate_boards: false,
        }
    }
}

impl OverlaySettings {
    /// Check invariants the overlay relies on.
    pub fn validate(&self) -> Result<()> {
        if self.minimum_ref_count == 0 {
            return Err(Error::Config(
                "minimum_ref_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Minimum reference count for one entity kind.
    ///
    /// Links use a floor of 2: every internal link is trivially referenced
    /// once by its own source, so a higher bar is needed to avoid noise.
    pub fn effective_threshold(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Link => self.minimum_ref_count.max(2),
            _ => self.minimum_ref_count,
        }
    }

    /// Whether annotation is enabled for one entity kind.
    pub fn kind_enabled(&self, kind: EntityKind) -> bool {
        match kind {
            EntityKind::Block => self.render_blocks,
            EntityKind::Embed => self.render_embeds,
            EntityKind::Link => self.render_links,
            EntityKind::Heading => self.render_headings,
        }
    }
}

/// Action taken when a badge is tapped on a touch device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TouchAction {
    /// Open the details side panel.
    #[serde(rename = "side-panel")]
    SidePanel,
    /// Open the hover popover instead.
    #[serde(rename = "popover")]
    Popover,
}

/// The environment the host runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    /// Pointing-device environment (desktop app or desktop browser).
    #[serde(rename = "desktop")]
    Desktop,
    /// Touch-only environment.
    #[serde(rename = "mobile")]
    Mobile,
}

impl Platform {
    /// True for touch-only environments.
    pub fn is_mobile(self) -> bool {
        matches!(self, Platform::Mobile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn defaults_render_everything() {
        let settings = OverlaySettings::default();
        assert_eq!(settings.minimum_ref_count, 1);
        assert!(settings.render_blocks);
        assert!(settings.render_embeds);
        assert!(settings.render_links);
        assert!(settings.render_headings);
        assert!(!settings.require_modifier_for_preview);
        assert!(!settings.annotate_boards);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let settings = OverlaySettings {
            minimum_ref_count: 0,
            ..OverlaySettings::default()
        };
        assert!(matches!(settings.validate(), Err(Error::Config(_))));
    }

    #[test_case(EntityKind::Block, 1, 1; "block uses configured threshold")]
    #[test_case(EntityKind::Embed, 1, 1; "embed uses configured threshold")]
    #[test_case(EntityKind::Heading, 3, 3; "heading uses configured threshold")]
    #[test_case(EntityKind::Link, 1, 2; "link floor raises low thresholds")]
    #[test_case(EntityKind::Link, 5, 5; "link floor keeps high thresholds")]
    fn effective_threshold(kind: EntityKind, configured: usize, expected: usize) {
        let settings = OverlaySettings {
            minimum_ref_count: configured,
            ..OverlaySettings::default()
        };
        assert_eq!(settings.effective_threshold(kind), expected);
    }

    #[test]
    fn kind_toggles_are_independent() {
        let settings = OverlaySettings {
            render_links: false,
            ..OverlaySettings::default()
        };
        assert!(settings.kind_enabled(EntityKind::Block));
        assert!(!settings.kind_enabled(EntityKind::Link));
    }

    #[test]
    fn touch_action_serde_names() {
        let json = serde_json::to_string(&TouchAction::SidePanel).unwrap();
        assert_eq!(json, "\"side-panel\"");
        let parsed: TouchAction = serde_json::from_str("\"popover\"").unwrap();
        assert_eq!(parsed, TouchAction::Popover);
    }
}
