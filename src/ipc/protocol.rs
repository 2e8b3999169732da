//! Wire protocol message types for host IPC.
//!
//! All messages are MessagePack-encoded maps with at minimum `type` and `id`
//! fields.

use serde::{Deserialize, Serialize};

use crate::dom::NodeSpec;

/// All wire protocol messages.
///
/// Serialized as a tagged union on the `type` field via MessagePack.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Message {
    // -- Handshake --
    #[serde(rename = "hello")]
    Hello { id: u32, version: u32 },

    #[serde(rename = "hello_ack")]
    HelloAck {
        id: u32,
        status: Status,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    // -- Commands --
    /// Arm the toggle if idle, disarm it if armed.
    #[serde(rename = "toggle_pip")]
    TogglePip { id: u32 },

    // -- Page driving --
    /// Fire a window event (`load`, `DOMContentLoaded`, `spfdone`, ...).
    #[serde(rename = "fire_event")]
    FireEvent { id: u32, name: String },

    /// Click the first element matching `selector`.
    #[serde(rename = "click")]
    Click { id: u32, selector: String },

    /// Build `node` and append it under the first match of `parent`.
    #[serde(rename = "mount")]
    Mount {
        id: u32,
        parent: String,
        node: NodeSpec,
    },

    // -- Query --
    #[serde(rename = "snapshot")]
    Snapshot { id: u32 },

    // -- Generic response --
    #[serde(rename = "response")]
    Response {
        id: u32,
        status: Status,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// Toggle state after a `toggle_pip` (`armed` / `idle`).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<String>,
        /// Listeners run by a `fire_event`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        listeners: Option<u32>,
        /// Whether a `click` had its default action prevented.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_prevented: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        snapshot: Option<PageSnapshot>,
    },
}

impl Message {
    /// Bare success response for `id`.
    pub fn ok(id: u32) -> Self {
        Message::Response {
            id,
            status: Status::Ok,
            error: None,
            state: None,
            listeners: None,
            default_prevented: None,
            snapshot: None,
        }
    }

    /// Error response carrying a machine-readable reason.
    pub fn error(id: u32, reason: &str) -> Self {
        Message::Response {
            id,
            status: Status::Error,
            error: Some(reason.to_string()),
            state: None,
            listeners: None,
            default_prevented: None,
            snapshot: None,
        }
    }
}

/// Response status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// Page state returned in snapshot responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageSnapshot {
    pub hostname: String,
    /// Active adapter id, absent when the page is dormant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter: Option<String>,
    pub armed: bool,
    /// Injected controls currently in the document.
    pub controls: u32,
    /// One line per element, indented by depth.
    pub outline: Vec<String>,
}

/// Protocol version.
pub const PROTOCOL_VERSION: u32 = 1;

/// Maximum payload size (16 MiB).
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Error reasons carried in `response.error`.
pub mod reason {
    pub const NO_MATCH: &str = "no_match";
    pub const INVALID_SELECTOR: &str = "invalid_selector";
    pub const UNKNOWN_TYPE: &str = "unknown_type";
    pub const VERSION_MISMATCH: &str = "version_mismatch";
}

/// Minimal envelope for extracting `{type, id}` from unknown messages.
///
/// Used by the host as a fallback when [`Message`] deserialization
/// fails (e.g., unknown `type` tag), so the error response can echo the
/// request `id`.
#[derive(Debug, Deserialize)]
pub struct RawEnvelope {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub id: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(msg: &Message) -> Message {
        let encoded = rmp_serde::to_vec_named(msg).unwrap();
        rmp_serde::from_slice(&encoded).unwrap()
    }

    #[test]
    fn mount_carries_nested_node_spec() {
        let node = NodeSpec::new("div")
            .class("html5-video-player")
            .child(NodeSpec::new("video").class("html5-main-video"));
        let msg = Message::Mount {
            id: 4,
            parent: "body".into(),
            node,
        };
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn response_with_snapshot_round_trip() {
        let msg = Message::Response {
            id: 9,
            status: Status::Ok,
            error: None,
            state: None,
            listeners: None,
            default_prevented: None,
            snapshot: Some(PageSnapshot {
                hostname: "www.youtube.com".into(),
                adapter: Some("youtube".into()),
                armed: false,
                controls: 1,
                outline: vec!["<html>".into(), "  <body>".into()],
            }),
        };
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn type_tag_is_snake_case() {
        #[derive(Deserialize)]
        struct Tag {
            #[serde(rename = "type")]
            msg_type: String,
        }
        let encoded = rmp_serde::to_vec_named(&Message::TogglePip { id: 1 }).unwrap();
        let tag: Tag = rmp_serde::from_slice(&encoded).unwrap();
        assert_eq!(tag.msg_type, "toggle_pip");
    }

    #[test]
    fn node_spec_optional_fields_default() {
        // Minimal mount node: only the tag is present on the wire.
        #[derive(Serialize)]
        struct MinimalMount {
            #[serde(rename = "type")]
            msg_type: &'static str,
            id: u32,
            parent: &'static str,
            node: MinimalNode,
        }
        #[derive(Serialize)]
        struct MinimalNode {
            tag: &'static str,
        }
        let encoded = rmp_serde::to_vec_named(&MinimalMount {
            msg_type: "mount",
            id: 2,
            parent: "#plex",
            node: MinimalNode { tag: "video" },
        })
        .unwrap();
        match rmp_serde::from_slice::<Message>(&encoded).unwrap() {
            Message::Mount { id, parent, node } => {
                assert_eq!(id, 2);
                assert_eq!(parent, "#plex");
                assert_eq!(node, NodeSpec::new("video"));
            }
            other => panic!("expected Mount, got {other:?}"),
        }
    }

    #[test]
    fn error_helper_sets_reason() {
        match Message::error(3, reason::NO_MATCH) {
            Message::Response { id, status, error, .. } => {
                assert_eq!(id, 3);
                assert_eq!(status, Status::Error);
                assert_eq!(error.as_deref(), Some("no_match"));
            }
            other => panic!("expected Response, got {other:?}"),
        }
    }
}
