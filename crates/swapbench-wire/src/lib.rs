//! Wire format shared by the swapbench TCP services.
//!
//! Messages use postcard serialization with length-prefixed framing
//! (4-byte big-endian length followed by the postcard body). Both the sync
//! server and the TCP block exchange speak this framing over plain
//! `tokio` streams.

use serde::Deserialize;
use serde::Serialize;
use snafu::ResultExt;
use snafu::Snafu;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;

/// Maximum size of a control frame (requests, acknowledgements, topic payloads).
pub const MAX_CONTROL_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum size of a frame carrying block data (64 MiB plus envelope).
pub const MAX_BLOCK_FRAME_SIZE: usize = 64 * 1024 * 1024 + 1024;

const _: () = assert!(MAX_CONTROL_FRAME_SIZE > 0);
const _: () = assert!(MAX_BLOCK_FRAME_SIZE >= MAX_CONTROL_FRAME_SIZE);
const _: () = assert!(MAX_BLOCK_FRAME_SIZE <= u32::MAX as usize);

/// Errors from reading or writing frames.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum WireError {
    /// Frame length exceeds the configured maximum.
    #[snafu(display("frame too large: {size} > {max}"))]
    FrameTooLarge {
        /// Size of the offending frame.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Stream ended in the middle of a frame.
    #[snafu(display("connection closed mid-frame"))]
    Truncated,

    /// Underlying I/O failure.
    #[snafu(display("{operation} failed: {source}"))]
    Io {
        /// What was being attempted.
        operation: &'static str,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Body could not be encoded.
    #[snafu(display("failed to encode frame: {source}"))]
    Encode {
        /// The underlying postcard error.
        source: postcard::Error,
    },

    /// Body could not be decoded.
    #[snafu(display("failed to decode frame: {source}"))]
    Decode {
        /// The underlying postcard error.
        source: postcard::Error,
    },
}

/// Read one length-prefixed message.
///
/// Returns `Ok(None)` when the peer closed the stream cleanly on a frame
/// boundary.
pub async fn read_message<T, R>(reader: &mut R, max_size: usize) -> Result<Option<T>, WireError>
where
    T: for<'de> Deserialize<'de>,
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(source) => {
            return Err(WireError::Io {
                operation: "read frame length",
                source,
            });
        }
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_size {
        return FrameTooLargeSnafu { size: len, max: max_size }.fail();
    }

    let mut buf = vec![0u8; len];
    match reader.read_exact(&mut buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return TruncatedSnafu.fail(),
        Err(source) => {
            return Err(WireError::Io {
                operation: "read frame body",
                source,
            });
        }
    }

    postcard::from_bytes(&buf).context(DecodeSnafu).map(Some)
}

/// Write one length-prefixed message and flush it.
pub async fn write_message<T, W>(writer: &mut W, message: &T, max_size: usize) -> Result<(), WireError>
where
    T: Serialize,
    W: AsyncWrite + Unpin,
{
    let buf = postcard::to_allocvec(message).context(EncodeSnafu)?;
    if buf.len() > max_size {
        return FrameTooLargeSnafu {
            size: buf.len(),
            max: max_size,
        }
        .fail();
    }

    let len = buf.len() as u32;
    writer.write_all(&len.to_be_bytes()).await.context(IoSnafu {
        operation: "write frame length",
    })?;
    writer.write_all(&buf).await.context(IoSnafu {
        operation: "write frame body",
    })?;
    writer.flush().await.context(IoSnafu { operation: "flush frame" })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde::Serialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    enum Ping {
        Hello { name: String },
        Payload(Vec<u8>),
    }

    #[tokio::test]
    async fn test_frames_survive_a_duplex_stream() {
        let (mut client, mut server) = tokio::io::duplex(4096);

        write_message(&mut client, &Ping::Hello { name: "p1".into() }, MAX_CONTROL_FRAME_SIZE).await.unwrap();
        write_message(&mut client, &Ping::Payload(vec![7; 100]), MAX_CONTROL_FRAME_SIZE).await.unwrap();
        drop(client);

        let first: Option<Ping> = read_message(&mut server, MAX_CONTROL_FRAME_SIZE).await.unwrap();
        assert_eq!(first, Some(Ping::Hello { name: "p1".into() }));
        let second: Option<Ping> = read_message(&mut server, MAX_CONTROL_FRAME_SIZE).await.unwrap();
        assert_eq!(second, Some(Ping::Payload(vec![7; 100])));

        // Clean close on a frame boundary.
        let end: Option<Ping> = read_message(&mut server, MAX_CONTROL_FRAME_SIZE).await.unwrap();
        assert!(end.is_none());
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected_on_write() {
        let (mut client, _server) = tokio::io::duplex(64);
        let err = write_message(&mut client, &Ping::Payload(vec![0; 256]), 16).await.unwrap_err();
        assert!(matches!(err, WireError::FrameTooLarge { max: 16, .. }));
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected_on_read() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        write_message(&mut client, &Ping::Payload(vec![1; 512]), MAX_CONTROL_FRAME_SIZE).await.unwrap();

        let err = read_message::<Ping, _>(&mut server, 32).await.unwrap_err();
        assert!(matches!(err, WireError::FrameTooLarge { max: 32, .. }));
    }

    #[tokio::test]
    async fn test_truncated_body_is_an_error() {
        use tokio::io::AsyncWriteExt;

        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&10u32.to_be_bytes()).await.unwrap();
        client.write_all(&[1, 2, 3]).await.unwrap();
        drop(client);

        let err = read_message::<Ping, _>(&mut server, MAX_CONTROL_FRAME_SIZE).await.unwrap_err();
        assert!(matches!(err, WireError::Truncated));
    }
}
