//! TCP protocol between a client holding the rolling frame buffer and the
//! posture server.
//!
//! Each request carries the complete window; the server keeps no per-client state.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::analysis::PostureResponse;

/// Default upper bound for one framed message
pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

// --- Message types ---

/// Client → server
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum ClientMessage {
    /// Classify one window shaped [1][T][132]. `window` is None when the client
    /// had no data to send.
    Classify {
        request_id: u64,
        window: Option<Vec<Vec<Vec<f32>>>>,
    },
    /// Ask for the sequence length and class names the server was started with
    DescribeModel,
}

/// Server → client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Classification {
        request_id: u64,
        response: PostureResponse,
    },
    /// Client error (bad shape, missing window)
    Rejected { request_id: u64, error: String },
    /// Server-side failure; message carries no internal details
    Failed { request_id: u64, error: String },
    ModelInfo {
        enabled: bool,
        sequence_length: usize,
        class_names: Vec<String>,
    },
}

impl ServerMessage {
    /// Map an analysis result to the message sent back to the client
    pub fn from_result(request_id: u64, result: crate::error::Result<PostureResponse>) -> Self {
        match result {
            Ok(response) => Self::Classification {
                request_id,
                response,
            },
            Err(e) if e.is_client_error() => Self::Rejected {
                request_id,
                error: e.public_message(),
            },
            Err(e) => Self::Failed {
                request_id,
                error: e.public_message(),
            },
        }
    }
}

// --- TCP codec helpers ---

pub type MessageStream = Framed<TcpStream, LengthDelimitedCodec>;

/// Create a framed message stream with length-delimited framing.
pub fn message_stream(stream: TcpStream, max_frame_bytes: usize) -> MessageStream {
    let codec = LengthDelimitedCodec::builder()
        .max_frame_length(max_frame_bytes)
        .new_codec();
    Framed::new(stream, codec)
}

/// Send a serializable message (bincode + length prefix).
pub async fn send_message<T: Serialize>(
    stream: &mut MessageStream,
    msg: &T,
) -> anyhow::Result<()> {
    let data = bincode::serialize(msg)?;
    stream.send(Bytes::from(data)).await?;
    Ok(())
}

/// Receive and deserialize a message. `None` when the peer closed the connection.
pub async fn recv_message<T: DeserializeOwned>(
    stream: &mut MessageStream,
) -> anyhow::Result<Option<T>> {
    match stream.next().await {
        Some(Ok(bytes)) => Ok(Some(bincode::deserialize(&bytes)?)),
        Some(Err(e)) => Err(e.into()),
        None => Ok(None),
    }
}
