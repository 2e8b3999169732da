//! Host client for the CLI client.
//!
//! Connects to the host daemon, performs the handshake, and provides
//! one method per page operation.

use std::path::Path;

use futures::{SinkExt, StreamExt};
use tokio::net::UnixStream;
use tokio_util::codec::Framed;

use crate::dom::NodeSpec;
use crate::host;
use crate::ipc::codec::LengthPrefixedCodec;
use crate::ipc::protocol::{Message, PROTOCOL_VERSION, PageSnapshot, Status};

use super::ClientError;

/// Host client for one-shot CLI commands.
///
/// Each CLI invocation performs a handful of request-response cycles
/// on one connection, so no split sink/stream is needed.
pub struct HostClient {
    framed: Framed<UnixStream, LengthPrefixedCodec>,
    next_id: u32,
}

impl HostClient {
    /// Connect to the host at the default socket path.
    pub async fn connect() -> Result<Self, ClientError> {
        let socket_path =
            host::resolve_socket_path().map_err(|e| ClientError::Host(e.to_string()))?;
        Self::connect_to(&socket_path).await
    }

    /// Connect to the host at `socket_path` and perform the handshake.
    pub async fn connect_to(socket_path: &Path) -> Result<Self, ClientError> {
        let stream = UnixStream::connect(socket_path)
            .await
            .map_err(|e| ClientError::Host(format!("connect failed: {e}")))?;
        let mut framed = Framed::new(stream, LengthPrefixedCodec::new());

        // Handshake: Hello → HelloAck.
        framed
            .send(Message::Hello {
                id: 0,
                version: PROTOCOL_VERSION,
            })
            .await
            .map_err(|e| ClientError::Host(format!("send hello: {e}")))?;

        match framed.next().await {
            Some(Ok(Message::HelloAck {
                status: Status::Ok, ..
            })) => {}
            Some(Ok(Message::HelloAck {
                status: Status::Error,
                error,
                ..
            })) => {
                return Err(ClientError::Host(format!(
                    "handshake rejected: {}",
                    error.unwrap_or_default()
                )));
            }
            other => {
                return Err(ClientError::Host(format!(
                    "unexpected handshake response: {other:?}"
                )));
            }
        }

        Ok(Self {
            framed,
            next_id: 1, // 0 = Hello
        })
    }

    /// Arm or disarm the toggle. Returns the new state name.
    pub async fn toggle(&mut self) -> Result<String, ClientError> {
        match self.request("toggle_pip", |id| Message::TogglePip { id }).await? {
            Message::Response {
                state: Some(state), ..
            } => Ok(state),
            other => Err(unexpected("toggle_pip", &other)),
        }
    }

    /// Fire a window event. Returns how many listeners ran.
    pub async fn fire(&mut self, name: &str) -> Result<u32, ClientError> {
        let name = name.to_string();
        match self
            .request("fire_event", |id| Message::FireEvent { id, name })
            .await?
        {
            Message::Response {
                listeners: Some(n), ..
            } => Ok(n),
            other => Err(unexpected("fire_event", &other)),
        }
    }

    /// Click the first element matching `selector`. Returns whether the
    /// page prevented the click's default action.
    pub async fn click(&mut self, selector: &str) -> Result<bool, ClientError> {
        let selector = selector.to_string();
        match self
            .request("click", |id| Message::Click { id, selector })
            .await?
        {
            Message::Response {
                default_prevented: Some(prevented),
                ..
            } => Ok(prevented),
            other => Err(unexpected("click", &other)),
        }
    }

    /// Mount `node` under the first element matching `parent`.
    pub async fn mount(&mut self, parent: &str, node: NodeSpec) -> Result<(), ClientError> {
        let parent = parent.to_string();
        self.request("mount", |id| Message::Mount { id, parent, node })
            .await?;
        Ok(())
    }

    pub async fn snapshot(&mut self) -> Result<PageSnapshot, ClientError> {
        match self.request("snapshot", |id| Message::Snapshot { id }).await? {
            Message::Response {
                snapshot: Some(snapshot),
                ..
            } => Ok(snapshot),
            other => Err(unexpected("snapshot", &other)),
        }
    }

    /// Send one request and wait for its successful response.
    async fn request(
        &mut self,
        op: &str,
        build: impl FnOnce(u32) -> Message,
    ) -> Result<Message, ClientError> {
        let id = self.next_id;
        self.next_id += 1;

        self.framed
            .send(build(id))
            .await
            .map_err(|e| ClientError::Host(format!("send {op}: {e}")))?;

        match self.framed.next().await {
            Some(Ok(
                msg @ Message::Response {
                    status: Status::Ok, ..
                },
            )) => Ok(msg),
            Some(Ok(Message::Response { error, .. })) => Err(ClientError::Host(format!(
                "{op} failed: {}",
                error.unwrap_or_default()
            ))),
            other => Err(ClientError::Host(format!(
                "unexpected {op} response: {other:?}"
            ))),
        }
    }
}

fn unexpected(op: &str, msg: &Message) -> ClientError {
    ClientError::Host(format!("unexpected {op} response: {msg:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::Registry;
    use crate::context::EngineConfig;
    use crate::dom::MemoryDocument;
    use crate::runtime::Runtime;

    async fn start_host(path: &Path, hostname: &str) {
        let listener = tokio::net::UnixListener::bind(path).unwrap();
        let runtime = Runtime::start(
            MemoryDocument::new(),
            Registry::builtin().unwrap(),
            hostname,
            EngineConfig::new("file:///ext"),
        );
        tokio::spawn(host::serve(listener, runtime, std::future::pending()));
    }

    #[tokio::test]
    async fn plex_session_through_client() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("host.sock");
        start_host(&sock, "app.plex.tv").await;

        let mut client = HostClient::connect_to(&sock).await.unwrap();
        client
            .mount("body", NodeSpec::new("div").id("plex"))
            .await
            .unwrap();
        assert_eq!(client.fire("DOMContentLoaded").await.unwrap(), 1);

        let view = NodeSpec::new("div").class("video-player").child(
            NodeSpec::new("div")
                .class("video-container")
                .child(NodeSpec::new("video").class("html-video"))
                .child(
                    NodeSpec::new("div")
                        .class("video-controls-overlay-bottom")
                        .child(NodeSpec::new("div").class("video-controls-right")),
                ),
        );
        client.mount("#plex", view).await.unwrap();

        let snap = client.snapshot().await.unwrap();
        assert_eq!(snap.controls, 1);
        assert!(
            snap.outline
                .iter()
                .any(|l| l.contains("src=\"file:///ext/images/plex-icon.svg\""))
        );
    }

    #[tokio::test]
    async fn armed_toggle_switches_clicked_video() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("host.sock");
        start_host(&sock, "example.org").await;

        let mut client = HostClient::connect_to(&sock).await.unwrap();
        client.mount("body", NodeSpec::new("a")).await.unwrap();
        client.mount("body", NodeSpec::new("video")).await.unwrap();

        assert_eq!(client.toggle().await.unwrap(), "armed");
        assert!(!client.click("a").await.unwrap());
        assert!(client.click("video").await.unwrap());
        assert!(!client.snapshot().await.unwrap().armed);
    }

    #[tokio::test]
    async fn request_errors_carry_reason() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("host.sock");
        start_host(&sock, "example.org").await;

        let mut client = HostClient::connect_to(&sock).await.unwrap();
        let err = client.click(".missing").await.unwrap_err();
        assert!(err.to_string().contains("no_match"), "{err}");

        // The connection survives a failed request.
        assert_eq!(client.toggle().await.unwrap(), "armed");
    }

    #[tokio::test]
    async fn connect_fails_without_host() {
        let dir = tempfile::tempdir().unwrap();
        let err = HostClient::connect_to(&dir.path().join("absent.sock"))
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("connect failed"));
    }
}
