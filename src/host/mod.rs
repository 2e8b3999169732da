//! Host daemon — owns one page runtime and drives it over IPC.
//!
//! Architecture: channel-based actor. A single host loop owns the
//! [`Runtime`] and the document behind it. Per-connection tasks forward
//! requests via an mpsc channel and wait on a oneshot for the reply, so
//! page events, clicks and commands are handled strictly one at a time.

mod connection;
mod handler;

use std::future::Future;
use std::path::{Path, PathBuf};

use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;

use connection::HostCommand;

use crate::adapter::{AdapterError, Registry};
use crate::context::EngineConfig;
use crate::dom::MemoryDocument;
use crate::runtime::Runtime;

/// Host startup/runtime errors.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("$XDG_RUNTIME_DIR is not set")]
    NoRuntimeDir,
    #[error("host already running at {0}")]
    AlreadyRunning(PathBuf),
    #[error("failed to create directory {path}: {source}")]
    MkdirFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to bind socket {path}: {source}")]
    BindFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("adapter table: {0}")]
    Adapter(#[from] AdapterError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run the host for a page on `hostname` until SIGTERM or SIGINT.
///
/// The socket lives at `$XDG_RUNTIME_DIR/piptool/host.sock` in a 0700
/// directory and is removed on shutdown. Page state is in-memory only.
pub async fn run(hostname: String, config: EngineConfig) -> Result<(), HostError> {
    let registry = Registry::builtin()?;
    let runtime = Runtime::start(MemoryDocument::new(), registry, &hostname, config);
    match runtime.adapter_id() {
        Some(adapter) => tracing::info!(%hostname, adapter, "page runtime started"),
        None => tracing::info!(%hostname, "page runtime started, no adapter (dormant)"),
    }

    let socket_path = resolve_socket_path()?;
    let listener = bind_socket(&socket_path).await?;
    tracing::info!(path = %socket_path.display(), "host listening");

    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;
    let shutdown = async move {
        tokio::select! {
            _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
            _ = sigint.recv() => tracing::info!("received SIGINT, shutting down"),
        }
    };

    serve(listener, runtime, shutdown).await;

    if let Err(e) = std::fs::remove_file(&socket_path) {
        tracing::warn!(error = %e, path = %socket_path.display(), "failed to remove socket");
    }
    tracing::info!("host stopped");
    Ok(())
}

/// Host loop: accept connections and apply their requests to `runtime`
/// until `shutdown` resolves.
pub(crate) async fn serve(
    listener: UnixListener,
    mut runtime: Runtime<MemoryDocument>,
    shutdown: impl Future<Output = ()>,
) {
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<HostCommand>();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            // -- New connection --
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        connection::spawn_connection(stream, cmd_tx.clone());
                        tracing::debug!("accepted connection");
                    }
                    Err(e) => tracing::warn!(error = %e, "accept failed"),
                }
            }

            // -- Request from connection task --
            Some(cmd) = cmd_rx.recv() => {
                let response = handler::handle_message(&mut runtime, cmd.request);
                let _ = cmd.response_tx.send(response);
            }

            () = &mut shutdown => break,
        }
    }
}

// -- Socket setup --

/// Resolve the host socket path from `$XDG_RUNTIME_DIR`.
pub fn resolve_socket_path() -> Result<PathBuf, HostError> {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").map_err(|_| HostError::NoRuntimeDir)?;
    Ok(PathBuf::from(runtime_dir).join("piptool").join("host.sock"))
}

/// Create the socket directory and bind the Unix listener.
///
/// On EADDRINUSE, connects to the existing socket: success means another
/// host is running, failure means the socket is stale and is replaced.
async fn bind_socket(path: &Path) -> Result<UnixListener, HostError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    if !parent.exists() {
        std::fs::create_dir_all(parent).map_err(|e| HostError::MkdirFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700)).map_err(|e| {
            HostError::MkdirFailed {
                path: parent.to_path_buf(),
                source: e,
            }
        })?;
    }

    let bind_failed = |source: std::io::Error| HostError::BindFailed {
        path: path.to_path_buf(),
        source,
    };

    match UnixListener::bind(path) {
        Ok(listener) => Ok(listener),
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            if UnixStream::connect(path).await.is_ok() {
                return Err(HostError::AlreadyRunning(path.to_path_buf()));
            }
            tracing::info!(path = %path.display(), "removing stale socket");
            std::fs::remove_file(path).map_err(bind_failed)?;
            UnixListener::bind(path).map_err(bind_failed)
        }
        Err(e) => Err(bind_failed(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{SinkExt, StreamExt};
    use tokio_util::codec::Framed;

    use crate::dom::NodeSpec;
    use crate::ipc::codec::{FrameCodec, LengthPrefixedCodec};
    use crate::ipc::protocol::{Message, PROTOCOL_VERSION, PageSnapshot, Status};

    type Conn = Framed<UnixStream, LengthPrefixedCodec>;

    /// Start a host for `hostname` on a temp socket. The task runs until
    /// the test runtime shuts down.
    async fn start_host(path: &Path, hostname: &str) -> tokio::task::JoinHandle<()> {
        let listener = bind_socket(path).await.unwrap();
        let runtime = Runtime::start(
            MemoryDocument::new(),
            Registry::builtin().unwrap(),
            hostname,
            EngineConfig::default(),
        );
        tokio::spawn(serve(listener, runtime, std::future::pending()))
    }

    async fn connect(path: &Path) -> Conn {
        let stream = UnixStream::connect(path).await.unwrap();
        Framed::new(stream, LengthPrefixedCodec::new())
    }

    async fn send_recv(framed: &mut Conn, msg: Message) -> Message {
        framed.send(msg).await.unwrap();
        framed.next().await.unwrap().unwrap()
    }

    async fn handshake(framed: &mut Conn) {
        let resp = send_recv(
            framed,
            Message::Hello {
                id: 0,
                version: PROTOCOL_VERSION,
            },
        )
        .await;
        assert!(matches!(
            resp,
            Message::HelloAck {
                status: Status::Ok,
                ..
            }
        ));
    }

    async fn snapshot(framed: &mut Conn, id: u32) -> PageSnapshot {
        match send_recv(framed, Message::Snapshot { id }).await {
            Message::Response {
                snapshot: Some(snapshot),
                ..
            } => snapshot,
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn youtube_session_injects_and_toggles() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("host.sock");
        let _host = start_host(&sock, "www.youtube.com").await;

        let mut conn = connect(&sock).await;
        handshake(&mut conn).await;

        let player = NodeSpec::new("div")
            .class("html5-video-player")
            .child(NodeSpec::new("video").class("html5-main-video"))
            .child(NodeSpec::new("div").class("ytp-right-controls"));
        let resp = send_recv(
            &mut conn,
            Message::Mount {
                id: 1,
                parent: "body".into(),
                node: player,
            },
        )
        .await;
        assert!(matches!(resp, Message::Response { id: 1, status: Status::Ok, .. }));

        let resp = send_recv(
            &mut conn,
            Message::FireEvent {
                id: 2,
                name: "spfdone".into(),
            },
        )
        .await;
        assert!(matches!(resp, Message::Response { listeners: Some(1), .. }));

        let snap = snapshot(&mut conn, 3).await;
        assert_eq!(snap.adapter.as_deref(), Some("youtube"));
        assert_eq!(snap.controls, 1);

        let resp = send_recv(
            &mut conn,
            Message::Click {
                id: 4,
                selector: ".pip-button".into(),
            },
        )
        .await;
        assert!(matches!(
            resp,
            Message::Response {
                default_prevented: Some(true),
                ..
            }
        ));

        let snap = snapshot(&mut conn, 5).await;
        assert!(
            snap.outline
                .iter()
                .any(|line| line.contains("<video") && line.contains("[picture-in-picture]")),
            "{:#?}",
            snap.outline
        );
    }

    #[tokio::test]
    async fn toggle_command_arms_and_disarms() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("host.sock");
        let _host = start_host(&sock, "example.org").await;

        let mut conn = connect(&sock).await;
        handshake(&mut conn).await;

        let resp = send_recv(&mut conn, Message::TogglePip { id: 1 }).await;
        assert!(matches!(resp, Message::Response { state: Some(ref s), .. } if s == "armed"));
        assert!(snapshot(&mut conn, 2).await.armed);

        let resp = send_recv(&mut conn, Message::TogglePip { id: 3 }).await;
        assert!(matches!(resp, Message::Response { state: Some(ref s), .. } if s == "idle"));

        let snap = snapshot(&mut conn, 4).await;
        assert!(!snap.armed);
        assert_eq!(snap.adapter, None);
    }

    #[tokio::test]
    async fn state_is_shared_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("host.sock");
        let _host = start_host(&sock, "example.org").await;

        let mut first = connect(&sock).await;
        handshake(&mut first).await;
        send_recv(&mut first, Message::TogglePip { id: 1 }).await;
        drop(first);

        let mut second = connect(&sock).await;
        handshake(&mut second).await;
        assert!(snapshot(&mut second, 1).await.armed);
    }

    #[tokio::test]
    async fn version_mismatch_closes_connection() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("host.sock");
        let _host = start_host(&sock, "example.org").await;

        let mut conn = connect(&sock).await;
        let resp = send_recv(&mut conn, Message::Hello { id: 0, version: 999 }).await;
        match resp {
            Message::HelloAck { status, error, .. } => {
                assert_eq!(status, Status::Error);
                assert_eq!(error.as_deref(), Some("version_mismatch"));
            }
            other => panic!("expected HelloAck error, got {other:?}"),
        }

        let next = conn.next().await;
        assert!(next.is_none(), "expected connection closed");
    }

    #[tokio::test]
    async fn non_hello_first_message_closes_connection() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("host.sock");
        let _host = start_host(&sock, "example.org").await;

        let mut conn = connect(&sock).await;
        conn.send(Message::TogglePip { id: 1 }).await.unwrap();

        let next = conn.next().await;
        assert!(next.is_none(), "expected connection closed, got {next:?}");
    }

    #[tokio::test]
    async fn unknown_type_returns_error_keeps_connection() {
        use bytes::BufMut;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("host.sock");
        let _host = start_host(&sock, "example.org").await;

        let stream = UnixStream::connect(&sock).await.unwrap();
        let mut framed = Framed::new(stream, FrameCodec::new());
        framed
            .send(Message::Hello {
                id: 0,
                version: PROTOCOL_VERSION,
            })
            .await
            .unwrap();
        let ack_raw = framed.next().await.unwrap().unwrap();
        let ack: Message = rmp_serde::from_slice(&ack_raw).unwrap();
        assert!(matches!(ack, Message::HelloAck { status: Status::Ok, .. }));

        // FrameCodec only encodes `Message`; write the unknown frame raw.
        #[derive(serde::Serialize)]
        struct FakeMsg {
            #[serde(rename = "type")]
            msg_type: String,
            id: u32,
        }
        let unknown = rmp_serde::to_vec_named(&FakeMsg {
            msg_type: "rewind".into(),
            id: 42,
        })
        .unwrap();
        let mut raw_frame = bytes::BytesMut::new();
        raw_frame.put_u32(unknown.len() as u32);
        raw_frame.extend_from_slice(&unknown);

        let (mut reader, mut writer) = framed.into_inner().into_split();
        writer.write_all(&raw_frame).await.unwrap();

        async fn read_frame(reader: &mut tokio::net::unix::OwnedReadHalf) -> Message {
            let mut len_buf = [0u8; 4];
            reader.read_exact(&mut len_buf).await.unwrap();
            let mut buf = vec![0u8; u32::from_be_bytes(len_buf) as usize];
            reader.read_exact(&mut buf).await.unwrap();
            rmp_serde::from_slice(&buf).unwrap()
        }

        match read_frame(&mut reader).await {
            Message::Response { id, status, error, .. } => {
                assert_eq!(id, 42);
                assert_eq!(status, Status::Error);
                assert_eq!(error.as_deref(), Some("unknown_type"));
            }
            other => panic!("expected error Response, got {other:?}"),
        }

        // Still open.
        let snapshot = rmp_serde::to_vec_named(&Message::Snapshot { id: 7 }).unwrap();
        let mut frame = bytes::BytesMut::new();
        frame.put_u32(snapshot.len() as u32);
        frame.extend_from_slice(&snapshot);
        writer.write_all(&frame).await.unwrap();
        assert!(matches!(
            read_frame(&mut reader).await,
            Message::Response { id: 7, status: Status::Ok, .. }
        ));
    }

    #[tokio::test]
    async fn live_socket_is_not_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("host.sock");
        let _host = start_host(&sock, "example.org").await;

        let err = bind_socket(&sock).await.unwrap_err();
        assert!(matches!(err, HostError::AlreadyRunning(_)));
    }

    #[tokio::test]
    async fn stale_socket_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("host.sock");
        // Bound then dropped: the file stays but nobody listens.
        drop(std::os::unix::net::UnixListener::bind(&sock).unwrap());

        assert!(bind_socket(&sock).await.is_ok());
    }
}
