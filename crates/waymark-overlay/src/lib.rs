//! Waymark overlay engine
//!
//! Draws small reference-count badges into rendered knowledge-vault documents
//! and keeps them synchronized with the live reference index. The engine never
//! rewrites document content; it only inserts auxiliary elements into an
//! already-rendered fragment tree and mutates their text over time.
//!
//! Pipeline:
//! - [`annotate`] runs once per rendered fragment, matching indexed entities
//!   against anchor nodes and inserting badges built by [`badge`]
//! - [`reconcile`] periodically re-counts all live badges in the visible tree,
//!   updating or removing them without re-placement
//! - [`dispatch`] turns badge clicks and hovers into requests against the
//!   details-view collaborator
//!
//! Everything is best-effort: a failed lookup means "no badge", and no single
//! annotation attempt can abort the remaining ones.

pub mod annotate;
pub mod badge;
pub mod dispatch;
pub mod dom;
pub mod error;
pub mod insert;
pub mod reconcile;

pub use annotate::{Annotator, FragmentSource, SectionSpan};
pub use badge::{
    build_badge, interaction_wiring, Badge, BadgeSpec, InteractionWiring, ATTR_FILE_PATH,
    ATTR_KEY, ATTR_LINE, ATTR_REAL_LINK, ATTR_TYPE, BADGE_CLASS, LIVE_UPDATE_CLASS,
};
pub use dispatch::{
    activation_from_badge, InteractionDispatcher, PointerModifiers, ReferenceActivation,
    ReferenceDetails,
};
pub use dom::{Element, Fragment, NodeId};
pub use error::{Error, Result};
pub use insert::insert_respecting_colon;
pub use reconcile::{
    reconcile_pass, ReconcileOutcome, Reconciler, SharedFragment, RECONCILE_DEBOUNCE_MS,
};
