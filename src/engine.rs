//! Discovery and injection — find player wrappers, add one PiP control each.
//!
//! Both entry points are idempotent: a wrapper (or, for shared
//! placement, the whole document) that already carries a control with
//! the marker class is left alone, so discovery may run from a mutation
//! observer any number of times.

use crate::adapter::Placement;
use crate::context::{Context, EngineConfig, MARKER_CLASS};
use crate::dom::{Document, NodeId, toggle_presentation};
use crate::page::{ClickEvent, Handler, Page};
use crate::toggle::PipToggle;

/// Tooltip on every injected control.
pub const CONTROL_TITLE: &str = "PiP Mode";

const ICON_DIR: &str = "images/";
const ICON_SUFFIX: &str = "-icon.svg";

/// Result of one injection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectOutcome {
    Injected { control: NodeId },
    /// A control is already in place; nothing added.
    AlreadyPresent,
    /// Wrapper has no playable element yet.
    NoVideo,
    /// Controls destination not rendered yet.
    NoDestination,
}

/// Scan every player wrapper of the active adapter and inject.
pub fn discover<D: Document>(ctx: &Context, page: &mut Page<D>) -> Vec<InjectOutcome> {
    let wrappers = page
        .document()
        .query_all(None, &ctx.adapter().player_wrapper_selector);

    let outcomes: Vec<InjectOutcome> = wrappers
        .into_iter()
        .map(|wrapper| inject(ctx, page, wrapper))
        .collect();

    let injected: Vec<NodeId> = outcomes
        .iter()
        .filter_map(|o| match o {
            InjectOutcome::Injected { control } => Some(*control),
            _ => None,
        })
        .collect();
    tracing::debug!(
        adapter = %ctx.adapter().id,
        wrappers = outcomes.len(),
        injected = ?injected,
        "discovery pass"
    );
    outcomes
}

/// Inject a control for one wrapper, if it is ready and has none yet.
pub fn inject<D: Document>(ctx: &Context, page: &mut Page<D>, wrapper: NodeId) -> InjectOutcome {
    let adapter = ctx.adapter();

    let Some(video) = page.document().query(Some(wrapper), &adapter.video_selector) else {
        tracing::trace!(?wrapper, "no playable element yet");
        return InjectOutcome::NoVideo;
    };

    let destination = match placement_target(ctx, page.document(), wrapper) {
        Ok(node) => node,
        Err(outcome) => {
            tracing::trace!(?wrapper, ?outcome, "control not placed");
            return outcome;
        }
    };

    let control = build_control(ctx, page.document_mut());
    page.add_click_listener(control, Handler::ControlClick { video });
    page.document_mut().append_child(destination, control);

    tracing::info!(adapter = %adapter.id, ?wrapper, ?control, "PiP control injected");
    InjectOutcome::Injected { control }
}

/// Decide where a new control goes, or why it does not.
fn placement_target<D: Document>(
    ctx: &Context,
    doc: &D,
    wrapper: NodeId,
) -> Result<NodeId, InjectOutcome> {
    match &ctx.adapter().placement {
        Placement::ContainerAppend { container } => {
            let container = doc
                .query(Some(wrapper), container)
                .ok_or(InjectOutcome::NoDestination)?;
            if doc.query(Some(container), ctx.marker()).is_some() {
                return Err(InjectOutcome::AlreadyPresent);
            }
            Ok(container)
        }
        // Single shared status bar: one control per document.
        Placement::SharedDestination { destination } => {
            if doc.query(None, ctx.marker()).is_some() {
                return Err(InjectOutcome::AlreadyPresent);
            }
            doc.query(None, destination)
                .ok_or(InjectOutcome::NoDestination)
        }
    }
}

/// Detached control: adapter classes plus the marker, a title, and the
/// adapter's icon.
fn build_control<D: Document>(ctx: &Context, doc: &mut D) -> NodeId {
    let adapter = ctx.adapter();
    let control = doc.create_element(adapter.element_kind.tag());

    let mut classes = adapter.button_classes.clone();
    if !classes.iter().any(|c| c == MARKER_CLASS) {
        classes.push(MARKER_CLASS.to_string());
    }
    doc.set_class_list(control, &classes);
    doc.set_attribute(control, "title", CONTROL_TITLE);

    let icon = doc.create_element("img");
    doc.set_attribute(icon, "src", &icon_path(ctx.config(), &adapter.id));
    doc.set_attribute(icon, "height", "100%");
    doc.append_child(control, icon);

    control
}

/// `<asset base>images/<adapter id>-icon.svg`
pub fn icon_path(config: &EngineConfig, adapter_id: &str) -> String {
    format!("{}{ICON_DIR}{adapter_id}{ICON_SUFFIX}", config.asset_base())
}

/// Click on an injected control: switch its video's mode and disarm.
pub fn on_control_click<D: Document>(
    page: &mut Page<D>,
    toggle: &mut PipToggle,
    video: NodeId,
    event: &mut ClickEvent,
) {
    event.prevent_default();
    match toggle_presentation(page.document_mut(), video) {
        Some(mode) => {
            tracing::info!(?video, mode = mode.as_str(), "presentation mode switched by control")
        }
        None => tracing::debug!(?video, "video lacks PiP capability"),
    }
    // The user acted through the dedicated control; drop any armed state.
    toggle.disarm(page);
}
