//! Write side: streams a length-prefixed body through an idle writer, flushing between chunks.

use std::io;

use async_trait::async_trait;
use idleio::{DeadlineStream, config::IdleTimeouts, is_timeout};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    net::TcpStream,
};
use tracing::{error, info, instrument, trace, warn};

use crate::{
    config::{ConfigError, body_len},
    tcp::StreamServerHook,
};

pub const CHUNK_BYTE: u8 = b'A';

#[derive(Debug, Clone)]
pub struct SourceHook {
    timeouts: IdleTimeouts,
    chunk_size: usize,
    chunks: usize,
    body_len: u64,
}

impl SourceHook {
    pub fn new(
        timeouts: IdleTimeouts,
        chunk_size: usize,
        chunks: usize,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            timeouts,
            chunk_size,
            chunks,
            body_len: body_len(chunk_size, chunks)?,
        })
    }

    /// Body length announced in the prefix.
    pub fn body_len(&self) -> u64 {
        self.body_len
    }

    /// Returns the number of body bytes written.
    pub async fn stream(&self, stream: TcpStream) -> io::Result<u64> {
        let stream = DeadlineStream::new(stream);
        let handle = stream.handle();
        let mut writer = self.timeouts.writer(handle, stream);
        self.write_body(&mut writer).await
    }

    async fn write_body<W>(&self, writer: &mut W) -> io::Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_u64(self.body_len()).await?;
        let chunk = vec![CHUNK_BYTE; self.chunk_size];
        let mut written = 0;
        for i in 0..self.chunks {
            writer.write_all(&chunk).await?;
            writer.flush().await?;
            written += chunk.len() as u64;
            trace!(i, written, "Chunk flushed");
        }
        writer.shutdown().await?;
        Ok(written)
    }
}

#[async_trait]
impl StreamServerHook for SourceHook {
    #[instrument(skip(self, stream))]
    async fn handle_stream(&self, stream: TcpStream) {
        let peer = stream.peer_addr().ok();
        match self.stream(stream).await {
            Ok(bytes) => info!(?peer, bytes, "Response streamed"),
            Err(e) if is_timeout(&e) => warn!(?peer, ?e, "Response stalled past idle timeout"),
            Err(e) => error!(?peer, ?e, "Failed to stream response"),
        }
    }
}
