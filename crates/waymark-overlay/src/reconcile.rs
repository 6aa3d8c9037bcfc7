//! Live badge reconciliation: debounced re-count, update, or removal.
//!
//! Placement happens once per render; afterwards the index keeps moving. The
//! reconciler owns a debounced background task: the host signals it on every
//! index invalidation, bursts collapse into a single trailing pass, and the
//! first signal after an idle stretch runs a pass immediately. Each pass
//! scans the visible tree for live badges and re-reads the index; membership
//! is purely tree presence, nothing is tracked on the side.
//!
//! The pass never re-places anything: a badge is updated in place or removed,
//! never moved or re-created.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, trace};
use waymark_core::{OverlaySettings, ReferenceIndex};

use crate::badge::{ATTR_KEY, LIVE_UPDATE_CLASS};
use crate::dom::{Fragment, NodeId};
use crate::error::{Error, Result};

/// Default debounce delay between an invalidation burst and its pass.
pub const RECONCILE_DEBOUNCE_MS: u64 = 1000;

/// The visible tree, shared between the renderer, placement, and the
/// reconciliation task.
pub type SharedFragment = Arc<Mutex<Fragment>>;

/// What one reconciliation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Badges whose displayed count was rewritten.
    pub updated: usize,
    /// Badges removed because their count fell below the threshold.
    pub removed: usize,
    /// Badges left untouched.
    pub untouched: usize,
}

impl ReconcileOutcome {
    /// Number of tree mutations the pass performed.
    pub fn mutations(&self) -> usize {
        self.updated + self.removed
    }
}

/// One synchronous reconciliation pass over every live badge in the tree.
///
/// Idempotent: running it again without an index change mutates nothing.
pub fn reconcile_pass(
    frag: &mut Fragment,
    index: &ReferenceIndex,
    minimum_ref_count: usize,
) -> ReconcileOutcome {
    let live: Vec<NodeId> = frag
        .select(frag.root(), |el| el.has_class(LIVE_UPDATE_CLASS))
        .collect();

    let mut outcome = ReconcileOutcome::default();
    for node in live {
        let key = frag.attr(node, ATTR_KEY).unwrap_or_default().to_string();
        let count = index.count(&key);
        if count < minimum_ref_count {
            frag.detach(node);
            outcome.removed += 1;
            continue;
        }
        let text = count.to_string();
        if frag.text_content(node) != text {
            frag.set_text_content(node, &text);
            outcome.updated += 1;
        } else {
            outcome.untouched += 1;
        }
    }
    trace!(
        updated = outcome.updated,
        removed = outcome.removed,
        untouched = outcome.untouched,
        "reconcile pass"
    );
    outcome
}

/// Handle to the debounced reconciliation task.
pub struct Reconciler {
    signal: mpsc::UnboundedSender<()>,
    task: JoinHandle<()>,
}

impl Reconciler {
    /// Spawn the reconciliation task against a shared view.
    pub fn spawn(
        view: SharedFragment,
        index: Arc<ReferenceIndex>,
        settings: Arc<OverlaySettings>,
        delay: Duration,
    ) -> Self {
        let (signal, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_debounced(view, index, settings, delay, receiver));
        Self { signal, task }
    }

    /// [`Reconciler::spawn`] with the default delay.
    pub fn spawn_default(
        view: SharedFragment,
        index: Arc<ReferenceIndex>,
        settings: Arc<OverlaySettings>,
    ) -> Self {
        Self::spawn(
            view,
            index,
            settings,
            Duration::from_millis(RECONCILE_DEBOUNCE_MS),
        )
    }

    /// Signal that the index changed and badges may be stale.
    pub fn invalidate(&self) -> Result<()> {
        self.signal.send(()).map_err(|_| Error::ReconcilerStopped)
    }

    /// Stop the task after any pending pass has run.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.signal);
        self.task.await.map_err(|e| Error::Join(e.to_string()))
    }
}

async fn run_debounced(
    view: SharedFragment,
    index: Arc<ReferenceIndex>,
    settings: Arc<OverlaySettings>,
    delay: Duration,
    mut receiver: mpsc::UnboundedReceiver<()>,
) {
    // Idle until the first invalidation, which runs immediately; signals
    // arriving during the quiet window afterwards coalesce into one trailing
    // pass. A superseded timer simply never fires.
    while receiver.recv().await.is_some() {
        run_pass(&view, &index, &settings);
        let mut pending = false;
        loop {
            match timeout(delay, receiver.recv()).await {
                Ok(Some(())) => pending = true,
                Ok(None) => {
                    if pending {
                        run_pass(&view, &index, &settings);
                    }
                    return;
                }
                Err(_) => break,
            }
        }
        if pending {
            run_pass(&view, &index, &settings);
        }
    }
}

fn run_pass(view: &SharedFragment, index: &ReferenceIndex, settings: &OverlaySettings) {
    let mut frag = view.lock();
    let outcome = reconcile_pass(&mut frag, index, settings.minimum_ref_count);
    if outcome.mutations() > 0 {
        debug!(
            updated = outcome.updated,
            removed = outcome.removed,
            "live badges reconciled"
        );
    }
}
