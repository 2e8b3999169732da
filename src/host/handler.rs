//! Request dispatch against the page runtime.
//!
//! Pure logic — no I/O. Each handler takes the runtime mutably and
//! returns the response message. Lookup failures are reported with a
//! machine-readable reason, never by closing the connection.

use crate::context::MARKER_CLASS;
use crate::dom::{Document, MemoryDocument, NodeId, Selector};
use crate::ipc::protocol::{Message, PROTOCOL_VERSION, PageSnapshot, Status, reason};
use crate::runtime::Runtime;
use crate::toggle::PipState;

pub fn handle_message(runtime: &mut Runtime<MemoryDocument>, request: Message) -> Message {
    match request {
        Message::Hello { id, version } => handle_hello(id, version),
        Message::TogglePip { id } => handle_toggle(runtime, id),
        Message::FireEvent { id, name } => handle_fire(runtime, id, &name),
        Message::Click { id, selector } => handle_click(runtime, id, &selector),
        Message::Mount { id, parent, node } => {
            match find(runtime, &parent) {
                Ok(parent) => {
                    let node = runtime.document_mut().build(&node);
                    runtime.append(parent, node);
                    Message::ok(id)
                }
                Err(why) => Message::error(id, why),
            }
        }
        Message::Snapshot { id } => Message::Response {
            id,
            status: Status::Ok,
            error: None,
            state: None,
            listeners: None,
            default_prevented: None,
            snapshot: Some(snapshot(runtime)),
        },
        // Host-originated messages should never be sent by clients.
        Message::HelloAck { id, .. } | Message::Response { id, .. } => {
            Message::error(id, reason::UNKNOWN_TYPE)
        }
    }
}

fn handle_hello(id: u32, version: u32) -> Message {
    if version != PROTOCOL_VERSION {
        tracing::warn!(version, expected = PROTOCOL_VERSION, "rejecting client version");
        return Message::HelloAck {
            id,
            status: Status::Error,
            error: Some(reason::VERSION_MISMATCH.into()),
        };
    }
    Message::HelloAck {
        id,
        status: Status::Ok,
        error: None,
    }
}

fn handle_toggle(runtime: &mut Runtime<MemoryDocument>, id: u32) -> Message {
    let state = match runtime.toggle_command() {
        PipState::Idle => "idle",
        PipState::Armed { .. } => "armed",
    };
    Message::Response {
        id,
        status: Status::Ok,
        error: None,
        state: Some(state.into()),
        listeners: None,
        default_prevented: None,
        snapshot: None,
    }
}

fn handle_fire(runtime: &mut Runtime<MemoryDocument>, id: u32, name: &str) -> Message {
    let ran = runtime.fire(name);
    Message::Response {
        id,
        status: Status::Ok,
        error: None,
        state: None,
        listeners: Some(u32::try_from(ran).unwrap_or(u32::MAX)),
        default_prevented: None,
        snapshot: None,
    }
}

fn handle_click(runtime: &mut Runtime<MemoryDocument>, id: u32, selector: &str) -> Message {
    match find(runtime, selector) {
        Ok(target) => {
            let event = runtime.click(target);
            Message::Response {
                id,
                status: Status::Ok,
                error: None,
                state: None,
                listeners: None,
                default_prevented: Some(event.default_prevented()),
                snapshot: None,
            }
        }
        Err(why) => Message::error(id, why),
    }
}

/// First element matching `selector`, or the error reason.
fn find(runtime: &Runtime<MemoryDocument>, selector: &str) -> Result<NodeId, &'static str> {
    let selector = Selector::parse(selector).map_err(|e| {
        tracing::debug!(error = %e, "rejecting selector");
        reason::INVALID_SELECTOR
    })?;
    runtime
        .document()
        .query(None, &selector)
        .ok_or(reason::NO_MATCH)
}

fn snapshot(runtime: &Runtime<MemoryDocument>) -> PageSnapshot {
    let doc = runtime.document();
    let controls = doc.query_all(None, &Selector::class(MARKER_CLASS)).len();
    PageSnapshot {
        hostname: runtime.hostname().to_string(),
        adapter: runtime.adapter_id().map(str::to_string),
        armed: runtime.is_armed(),
        controls: u32::try_from(controls).unwrap_or(u32::MAX),
        outline: doc.outline(),
    }
}
