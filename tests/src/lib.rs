use std::{net::SocketAddr, time::Duration};

use idleio::config::IdleTimeouts;
use server::{
    sink::SinkHook,
    source::SourceHook,
    tcp::{StreamServerHook, build_tcp_server},
};

mod read;
mod write;

pub const IDLE_TIMEOUT: Duration = Duration::from_secs(1);
pub const CHUNK_SIZE: usize = 1_000_000;
pub const CHUNKS: usize = 10;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn timeouts() -> IdleTimeouts {
    IdleTimeouts::symmetric(IDLE_TIMEOUT)
}

pub async fn spawn_server<H>(join_set: &mut tokio::task::JoinSet<()>, hook: H) -> SocketAddr
where
    H: StreamServerHook + Send + Sync + 'static,
{
    let server = build_tcp_server("127.0.0.1:0", hook).await.unwrap();
    let addr = server.listener().local_addr().unwrap();
    join_set.spawn(async move {
        server.serve().await.unwrap();
    });
    addr
}

pub async fn spawn_sink(join_set: &mut tokio::task::JoinSet<()>) -> SocketAddr {
    spawn_server(join_set, SinkHook::new(timeouts())).await
}

pub async fn spawn_source(join_set: &mut tokio::task::JoinSet<()>) -> SocketAddr {
    spawn_server(join_set, SourceHook::new(timeouts(), CHUNK_SIZE, CHUNKS).unwrap()).await
}
