//! Per-connection task — framed I/O, handshake, request forwarding.
//!
//! Each client connection spawns a tokio task that:
//! 1. Wraps the socket in a length-prefixed frame codec.
//! 2. Reads the first message (must be `Hello`) and forwards it to the
//!    host loop for version validation.
//! 3. Forwards every later request to the host loop and writes back the
//!    reply, until the client disconnects.

use futures::{SinkExt, StreamExt};
use tokio::net::UnixStream;
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::Framed;

use crate::ipc::codec::{CodecError, DecodeResult, FrameCodec, decode_frame};
use crate::ipc::protocol::{Message, Status, reason};

/// Request sent from a connection task to the host loop.
#[derive(Debug)]
pub struct HostCommand {
    pub request: Message,
    pub response_tx: oneshot::Sender<Message>,
}

/// Connection-level errors.
#[derive(Debug, thiserror::Error)]
enum ConnectionError {
    #[error("unexpected EOF during handshake")]
    HandshakeEof,
    #[error("first message must be Hello")]
    NotHello,
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] rmp_serde::decode::Error),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("host loop closed")]
    HostGone,
    #[error("response channel closed")]
    ResponseDropped,
}

/// Spawn a connection handler task.
///
/// The task runs until the client disconnects or a protocol error occurs.
pub fn spawn_connection(stream: UnixStream, cmd_tx: mpsc::UnboundedSender<HostCommand>) {
    tokio::spawn(async move {
        if let Err(e) = handle_connection(stream, cmd_tx).await {
            tracing::debug!(error = %e, "connection closed");
        }
    });
}

async fn handle_connection(
    stream: UnixStream,
    cmd_tx: mpsc::UnboundedSender<HostCommand>,
) -> Result<(), ConnectionError> {
    let mut framed = Framed::new(stream, FrameCodec::new());

    // -- Handshake: first message must be Hello --
    let first_frame = framed
        .next()
        .await
        .ok_or(ConnectionError::HandshakeEof)??;

    let hello = match decode_frame(&first_frame) {
        DecodeResult::Ok(msg @ Message::Hello { .. }) => msg,
        DecodeResult::Ok(_) | DecodeResult::UnknownType(_) => {
            return Err(ConnectionError::NotHello);
        }
        DecodeResult::Malformed(e) => return Err(ConnectionError::MalformedFrame(e)),
    };

    let ack = send_command(&cmd_tx, hello).await?;
    let rejected = matches!(
        ack,
        Message::HelloAck {
            status: Status::Error,
            ..
        }
    );
    framed.send(ack).await?;
    if rejected {
        return Ok(());
    }

    // -- Request loop --
    while let Some(frame) = framed.next().await {
        let raw = frame?;
        let response = match decode_frame(&raw) {
            DecodeResult::Ok(msg) => send_command(&cmd_tx, msg).await?,
            DecodeResult::UnknownType(envelope) => {
                // Echo the id; the connection stays open.
                tracing::debug!(msg_type = %envelope.msg_type, id = envelope.id, "unknown message type");
                Message::error(envelope.id, reason::UNKNOWN_TYPE)
            }
            DecodeResult::Malformed(e) => return Err(ConnectionError::MalformedFrame(e)),
        };
        framed.send(response).await?;
    }
    Ok(())
}

/// Send a request to the host loop and wait for the response.
async fn send_command(
    cmd_tx: &mpsc::UnboundedSender<HostCommand>,
    request: Message,
) -> Result<Message, ConnectionError> {
    let (response_tx, response_rx) = oneshot::channel();
    cmd_tx
        .send(HostCommand {
            request,
            response_tx,
        })
        .map_err(|_| ConnectionError::HostGone)?;
    response_rx
        .await
        .map_err(|_| ConnectionError::ResponseDropped)
}
