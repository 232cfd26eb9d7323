//! Frame-level I/O over an opaque byte stream
//!
//! [`FrameStream`] turns any async byte stream pair into a frame reader and
//! writer. Reads are single-consumer; writes from any number of tasks are
//! serialized by the framer's internal write lock, so each frame reaches the
//! wire atomically.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::{BrokerError, Result};
use crate::protocol::codec::Message;
use crate::protocol::frame::{Frame, FrameAssembler};

const READ_CHUNK_SIZE: usize = 4096;

struct ReadHalf {
    io: Box<dyn AsyncRead + Send + Unpin>,
    assembler: FrameAssembler,
    buf: Vec<u8>,
}

struct WriteHalf {
    io: Box<dyn AsyncWrite + Send + Unpin>,
    finished: bool,
}

/// Length-prefixed frame I/O over a bidirectional byte stream
pub struct FrameStream {
    read_half: Mutex<ReadHalf>,
    write_half: Mutex<WriteHalf>,
}

impl FrameStream {
    /// Wrap a receive/send half pair. Works for QUIC streams and in-memory
    /// pipes alike.
    pub fn new(
        recv: impl AsyncRead + Send + Unpin + 'static,
        send: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            read_half: Mutex::new(ReadHalf {
                io: Box::new(recv),
                assembler: FrameAssembler::new(),
                buf: vec![0u8; READ_CHUNK_SIZE],
            }),
            write_half: Mutex::new(WriteHalf {
                io: Box::new(send),
                finished: false,
            }),
        }
    }

    /// Read the next fully decoded frame.
    ///
    /// Errors are classified: [`BrokerError::Eof`] for a clean end of
    /// stream, [`BrokerError::Malformed`] for undecodable bytes (including a
    /// stream that ends mid-frame), [`BrokerError::Closed`] when the
    /// transport is gone, and [`BrokerError::Network`] for other I/O
    /// failures.
    pub async fn read_frame(&self) -> Result<Frame> {
        let mut guard = self.read_half.lock().await;
        let half = &mut *guard;
        loop {
            if let Some(frame) = half
                .assembler
                .next_frame()
                .map_err(|e| BrokerError::malformed(e.to_string()))?
            {
                return Ok(frame);
            }

            let n = half.io.read(&mut half.buf).await?;
            if n == 0 {
                if half.assembler.pending_len() > 0 {
                    return Err(BrokerError::malformed("stream ended mid-frame"));
                }
                return Err(BrokerError::Eof);
            }
            half.assembler.push(&half.buf[..n]);
        }
    }

    /// Write one frame, atomically with respect to other writers on this
    /// framer.
    pub async fn write_frame(&self, frame: &Frame) -> Result<()> {
        let data = frame.to_wire();
        let mut half = self.write_half.lock().await;
        if half.finished {
            return Err(BrokerError::closed("write side already shut down"));
        }
        half.io.write_all(&data).await?;
        half.io.flush().await?;
        Ok(())
    }

    /// Encode a typed message and write it as one frame
    pub async fn write_message<M: Message>(&self, msg: &M) -> Result<()> {
        let frame = msg
            .to_frame()
            .map_err(|e| BrokerError::serialization(e.to_string()))?;
        self.write_frame(&frame).await
    }

    /// Finish the write side. Idempotent; the peer observes a clean EOF
    /// after all buffered frames are delivered.
    pub async fn shutdown(&self) -> Result<()> {
        let mut half = self.write_half.lock().await;
        if half.finished {
            return Ok(());
        }
        half.finished = true;
        half.io.shutdown().await?;
        Ok(())
    }
}

impl std::fmt::Debug for FrameStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameStream").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::FrameType;
    use crate::protocol::messages::{CloseStream, Goaway};
    use std::sync::Arc;

    fn pipe_pair() -> (FrameStream, FrameStream) {
        let (a, b) = tokio::io::duplex(64 * 1024);
        let (ar, aw) = tokio::io::split(a);
        let (br, bw) = tokio::io::split(b);
        (FrameStream::new(ar, aw), FrameStream::new(br, bw))
    }

    #[tokio::test]
    async fn test_read_write_roundtrip() {
        let (left, right) = pipe_pair();

        let frame = Frame::new(FrameType::Data, vec![1, 2, 3]);
        left.write_frame(&frame).await.unwrap();

        let got = right.read_frame().await.unwrap();
        assert_eq!(got, frame);
    }

    #[tokio::test]
    async fn test_write_message() {
        let (left, right) = pipe_pair();

        let msg = CloseStream {
            stream_id: "s1".to_string(),
            reason: "bye".to_string(),
        };
        left.write_message(&msg).await.unwrap();

        let got = right.read_frame().await.unwrap();
        assert_eq!(got.kind, FrameType::CloseStream);
    }

    #[tokio::test]
    async fn test_clean_eof() {
        let (left, right) = pipe_pair();

        left.write_message(&Goaway {
            message: "done".to_string(),
        })
        .await
        .unwrap();
        left.shutdown().await.unwrap();

        right.read_frame().await.unwrap();
        let err = right.read_frame().await.unwrap_err();
        assert!(err.is_eof());
    }

    #[tokio::test]
    async fn test_truncated_frame_is_malformed() {
        let (a, b) = tokio::io::duplex(1024);
        let (_ar, mut aw) = tokio::io::split(a);
        let (br, bw) = tokio::io::split(b);
        let right = FrameStream::new(br, bw);

        // A header promising more payload than ever arrives
        let frame = Frame::new(FrameType::Data, vec![0u8; 32]);
        let bytes = frame.to_wire();
        aw.write_all(&bytes[..10]).await.unwrap();
        aw.shutdown().await.unwrap();

        let err = right.read_frame().await.unwrap_err();
        assert!(matches!(err, BrokerError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let (left, _right) = pipe_pair();
        left.shutdown().await.unwrap();
        left.shutdown().await.unwrap();

        let err = left
            .write_frame(&Frame::new(FrameType::Goaway, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::Closed(_)));
    }

    #[tokio::test]
    async fn test_concurrent_writers_are_serialized() {
        let (left, right) = pipe_pair();
        let left = Arc::new(left);

        let mut handles = Vec::new();
        for tag in 0..4u8 {
            let writer = Arc::clone(&left);
            handles.push(tokio::spawn(async move {
                for i in 0..25u8 {
                    let frame = Frame::new(FrameType::Data, vec![tag, i]);
                    writer.write_frame(&frame).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        left.shutdown().await.unwrap();

        // Every frame must decode intact; interleaved partial writes would
        // surface as malformed or misordered payload lengths.
        let mut count = 0;
        loop {
            match right.read_frame().await {
                Ok(frame) => {
                    assert_eq!(frame.kind, FrameType::Data);
                    assert_eq!(frame.payload.len(), 2);
                    count += 1;
                }
                Err(e) => {
                    assert!(e.is_eof());
                    break;
                }
            }
        }
        assert_eq!(count, 100);
    }
}
