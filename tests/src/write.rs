#[cfg(test)]
mod tests {
    use std::time::Duration;

    use idleio::is_timeout;
    use serial_test::serial;
    use server::source::{CHUNK_BYTE, SourceHook};
    use tokio::{
        io::AsyncReadExt,
        net::{TcpListener, TcpSocket, TcpStream},
    };

    use crate::{CHUNK_SIZE, CHUNKS, init_tracing, spawn_source, timeouts};

    /// A client whose receive window stays small, so an idle reader backs up the server quickly.
    async fn connect_small_window(addr: std::net::SocketAddr) -> TcpStream {
        let socket = TcpSocket::new_v4().unwrap();
        socket.set_recv_buffer_size(64 * 1024).unwrap();
        socket.connect(addr).await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    #[serial]
    async fn write_no_timeout() {
        init_tracing();
        let mut join_set = tokio::task::JoinSet::new();
        let addr = spawn_source(&mut join_set).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let len = stream.read_u64().await.unwrap();
        assert_eq!(len, (CHUNK_SIZE * CHUNKS) as u64);

        let mut body = Vec::new();
        stream.read_to_end(&mut body).await.unwrap();
        assert_eq!(body.len() as u64, len);
        assert!(body.iter().all(|b| *b == CHUNK_BYTE));
    }

    #[tokio::test(flavor = "multi_thread")]
    #[serial]
    async fn write_timeout() {
        init_tracing();
        let mut join_set = tokio::task::JoinSet::new();
        let addr = spawn_source(&mut join_set).await;

        let mut stream = connect_small_window(addr).await;
        tokio::time::sleep(Duration::from_secs(2)).await;

        let len = stream.read_u64().await.unwrap();
        let mut body = vec![0; len as usize];
        let e = stream.read_exact(&mut body).await.unwrap_err();
        assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test(flavor = "multi_thread")]
    #[serial]
    async fn server_sees_timeout() {
        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = connect_small_window(addr).await;
        let (stream, _) = listener.accept().await.unwrap();

        let hook = SourceHook::new(timeouts(), CHUNK_SIZE, CHUNKS).unwrap();
        let e = hook.stream(stream).await.unwrap_err();
        assert!(is_timeout(&e), "{e:?}");
        drop(client);
    }
}
