//! Read side: drains each request through an idle reader and answers with what happened.

use std::io;

use async_trait::async_trait;
use idleio::{DeadlineStream, config::IdleTimeouts, is_timeout};
use tokio::{io::AsyncWriteExt, net::TcpStream};
use tracing::{error, info, instrument, warn};

use crate::tcp::StreamServerHook;

pub const TIMEOUT_RESPONSE: &str = "timeout";

#[derive(Debug, Clone)]
pub struct SinkHook {
    timeouts: IdleTimeouts,
}

impl SinkHook {
    pub fn new(timeouts: IdleTimeouts) -> Self {
        Self { timeouts }
    }

    /// Discards everything the peer sends until it half-closes, then writes the response.
    pub async fn drain(&self, stream: TcpStream) -> io::Result<u64> {
        let mut stream = DeadlineStream::new(stream);
        let handle = stream.handle();
        let mut reader = self.timeouts.reader(&handle, &mut stream);
        let res = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await;

        let resp = sink_response(&res);
        stream
            .write_all(resp.as_bytes())
            .await
            .inspect_err(|e| error!(?e, "Failed to write response"))?;
        stream
            .shutdown()
            .await
            .inspect_err(|e| error!(?e, "Failed to shut down stream"))?;
        res
    }
}

#[async_trait]
impl StreamServerHook for SinkHook {
    #[instrument(skip(self, stream))]
    async fn handle_stream(&self, stream: TcpStream) {
        let peer = stream.peer_addr().ok();
        match self.drain(stream).await {
            Ok(bytes) => info!(?peer, bytes, "Request drained"),
            Err(e) if is_timeout(&e) => warn!(?peer, ?e, "Request stalled past idle timeout"),
            Err(e) => error!(?peer, ?e, "Failed to drain request"),
        }
    }
}

/// `<bytes>` on success, `timeout` if the peer went idle, `copy: <error>` otherwise.
pub fn sink_response(res: &io::Result<u64>) -> String {
    match res {
        Ok(bytes) => bytes.to_string(),
        Err(e) if is_timeout(e) => TIMEOUT_RESPONSE.to_owned(),
        Err(e) => format!("copy: {e}\n"),
    }
}
