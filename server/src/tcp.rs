use std::{io, sync::Arc};

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{error, info, instrument, trace};

#[async_trait]
pub trait StreamServerHook {
    async fn handle_stream(&self, stream: TcpStream);
}

#[derive(Debug)]
pub struct TcpServer<H> {
    listener: TcpListener,
    hook: H,
}

impl<H> TcpServer<H> {
    pub fn new(listener: TcpListener, hook: H) -> Self {
        Self { listener, hook }
    }

    pub fn listener(&self) -> &TcpListener {
        &self.listener
    }
}

impl<H> TcpServer<H>
where
    H: StreamServerHook + Send + Sync + 'static,
{
    #[instrument(skip(self))]
    pub async fn serve(self) -> io::Result<()> {
        let addr = self
            .listener
            .local_addr()
            .inspect_err(|e| error!(?e, "Failed to get local address"))?;
        info!(?addr, "Listening");
        let hook = Arc::new(self.hook);
        loop {
            trace!("Waiting for connection");
            let (stream, peer) = self
                .listener
                .accept()
                .await
                .inspect_err(|e| error!(?e, "Failed to accept connection"))?;
            trace!(?peer, "Accepted connection");
            let hook = Arc::clone(&hook);
            tokio::spawn(async move {
                hook.handle_stream(stream).await;
            });
        }
    }
}

pub async fn build_tcp_server<H>(
    listen_addr: impl ToSocketAddrs,
    hook: H,
) -> io::Result<TcpServer<H>> {
    let listener = TcpListener::bind(listen_addr)
        .await
        .inspect_err(|e| error!(?e, "Failed to bind to listen address"))?;
    Ok(TcpServer::new(listener, hook))
}
