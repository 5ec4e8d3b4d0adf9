#[cfg(test)]
mod tests {
    use std::time::Duration;

    use idleio::is_timeout;
    use serial_test::serial;
    use server::sink::{SinkHook, TIMEOUT_RESPONSE};
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
        time::Instant,
    };

    use crate::{IDLE_TIMEOUT, init_tracing, spawn_sink, timeouts};

    #[tokio::test(flavor = "multi_thread")]
    #[serial]
    async fn read_no_timeout() {
        init_tracing();
        let mut join_set = tokio::task::JoinSet::new();
        let addr = spawn_sink(&mut join_set).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"AAA").await.unwrap();
        stream.shutdown().await.unwrap();

        let mut resp = String::new();
        stream.read_to_string(&mut resp).await.unwrap();
        assert_eq!(resp, "3");
    }

    #[tokio::test(flavor = "multi_thread")]
    #[serial]
    async fn read_timeout() {
        init_tracing();
        let mut join_set = tokio::task::JoinSet::new();
        let addr = spawn_sink(&mut join_set).await;

        let stream = TcpStream::connect(addr).await.unwrap();
        let (mut rd, mut wr) = stream.into_split();
        let start = Instant::now();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            // The server is long gone by now
            let _ = wr.write_all(b"AAA").await;
        });

        let mut resp = String::new();
        rd.read_to_string(&mut resp).await.unwrap();
        assert_eq!(resp, TIMEOUT_RESPONSE);
        // The server may arm its deadline a moment before `start`
        assert!(start.elapsed() >= IDLE_TIMEOUT - Duration::from_millis(100));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(flavor = "multi_thread")]
    #[serial]
    async fn slow_but_steady_upload() {
        init_tracing();
        let mut join_set = tokio::task::JoinSet::new();
        let addr = spawn_sink(&mut join_set).await;

        // Five sends, each well inside the idle window, together well past it
        let start = Instant::now();
        let mut stream = TcpStream::connect(addr).await.unwrap();
        for _ in 0..5 {
            tokio::time::sleep(Duration::from_millis(400)).await;
            stream.write_all(b"A").await.unwrap();
        }
        stream.shutdown().await.unwrap();

        let mut resp = String::new();
        stream.read_to_string(&mut resp).await.unwrap();
        assert_eq!(resp, "5");
        assert!(start.elapsed() > IDLE_TIMEOUT);
    }

    #[tokio::test(flavor = "multi_thread")]
    #[serial]
    async fn server_sees_timeout() {
        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let _client = TcpStream::connect(addr).await.unwrap();
        let (stream, _) = listener.accept().await.unwrap();

        let hook = SinkHook::new(timeouts());
        let e = hook.drain(stream).await.unwrap_err();
        assert!(is_timeout(&e), "{e:?}");
    }
}
