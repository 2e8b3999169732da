//! Lifecycle hooks — what re-triggers discovery for the active adapter.
//!
//! - Every adapter: discovery on the window `load` event.
//! - Named-event hook: one more window listener on the hook's trigger.
//! - Mutation hook: the trigger installs an observer under the adapter's
//!   root; any batch whose added nodes carry the marker class re-runs
//!   discovery over every wrapper.
//!
//! The mutation heuristic is coarse: it neither checks where the marker
//! appeared nor limits the scan to the new subtree, and relies on
//! discovery being idempotent.

use crate::adapter::HookAction;
use crate::context::Context;
use crate::dom::Document;
use crate::engine;
use crate::page::{Handler, ListenerId, MutationBatch, Page};

/// Install the adapter's listeners. At most once per context.
pub fn install<D: Document>(ctx: &mut Context, page: &mut Page<D>) {
    if ctx.hooks_installed() {
        tracing::debug!(adapter = %ctx.adapter().id, "lifecycle hooks already installed");
        return;
    }

    page.add_window_listener("load", Handler::Discover);

    if let Some(hook) = &ctx.adapter().lifecycle_hook {
        page.add_window_listener(&hook.trigger, handler_for(hook.action));
        tracing::debug!(
            adapter = %ctx.adapter().id,
            trigger = %hook.trigger,
            action = %hook.action,
            "lifecycle hook installed"
        );
    }

    ctx.mark_hooks_installed();
}

fn handler_for(action: HookAction) -> Handler {
    match action {
        HookAction::Discover => Handler::Discover,
        HookAction::ObserveMutations => Handler::ObserveMutations,
    }
}

/// Start observing the adapter's root subtree.
///
/// No-op when the adapter has no observer config, when the root is not
/// in the document, or when an observer is already installed.
pub fn observe<D: Document>(ctx: &mut Context, page: &mut Page<D>) -> Option<ListenerId> {
    if let Some(existing) = ctx.observer() {
        return Some(existing);
    }

    let Some(config) = &ctx.adapter().observer else {
        tracing::warn!(adapter = %ctx.adapter().id, "observe hook fired without observer config");
        return None;
    };

    let Some(root) = page.document().query(None, &config.root) else {
        tracing::debug!(
            adapter = %ctx.adapter().id,
            root = %config.root,
            "observer root not in document"
        );
        return None;
    };

    let id = page.observe(root, &config.marker_class);
    tracing::debug!(
        adapter = %ctx.adapter().id,
        root = %config.root,
        marker = %config.marker_class,
        "mutation observer installed"
    );
    ctx.set_observer(id);
    Some(id)
}

/// Handle one mutation batch. Returns whether discovery ran.
pub fn on_mutations<D: Document>(ctx: &Context, page: &mut Page<D>, batch: &MutationBatch) -> bool {
    let marker_seen = batch
        .added
        .iter()
        .any(|&node| page.document().has_class(node, &batch.marker_class));

    if marker_seen {
        tracing::debug!(
            observer = ?batch.observer,
            added = batch.added.len(),
            marker = %batch.marker_class,
            "player view mounted, re-running discovery"
        );
        engine::discover(ctx, page);
    }
    marker_seen
}
