use std::io;

use config::ServerConfig;
use sink::SinkHook;
use source::SourceHook;
use tcp::build_tcp_server;
use thiserror::Error;
use tracing::info;

pub mod config;
pub mod sink;
pub mod source;
pub mod tcp;

/// Binds every configured server and runs them until one fails.
pub async fn serve(config: ServerConfig) -> Result<(), ServeError> {
    let timeouts = config.idle_timeout.build();
    info!(?timeouts, "Idle timeouts");
    let mut server_tasks = tokio::task::JoinSet::new();

    for sink in config.sink {
        let server = build_tcp_server(sink.listen_addr.as_ref(), SinkHook::new(timeouts))
            .await
            .map_err(ServeError::Bind)?;
        server_tasks.spawn(server.serve());
    }
    for source in config.source {
        let hook = SourceHook::new(timeouts, source.chunk_size, source.chunks)
            .map_err(ServeError::Config)?;
        let server = build_tcp_server(source.listen_addr.as_ref(), hook)
            .await
            .map_err(ServeError::Bind)?;
        server_tasks.spawn(server.serve());
    }

    if server_tasks.is_empty() {
        return Err(ServeError::NoServers);
    }
    while let Some(res) = server_tasks.join_next().await {
        res.map_err(ServeError::Join)?
            .map_err(ServeError::ServerTask)?;
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("Failed to bind server: {0}")]
    Bind(#[source] io::Error),
    #[error("Invalid server config: {0}")]
    Config(#[source] config::ConfigError),
    #[error("No servers configured")]
    NoServers,
    #[error("Server task failed: {0}")]
    ServerTask(#[source] io::Error),
    #[error("Server task panicked: {0}")]
    Join(#[source] tokio::task::JoinError),
}
