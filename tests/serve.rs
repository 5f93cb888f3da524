use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use gracevisor::serve::{ServeError, Server, TcpServer, serve};
use gracevisor::{BoxError, Context, ContextError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn bind() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

async fn until_connections<H: gracevisor::serve::Handler>(server: &TcpServer<H>, n: usize) {
    while server.connections() < n {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn cancellation_drains_open_connections() -> anyhow::Result<()> {
    let server = Arc::new(TcpServer::new(
        |ctx: Context, mut stream: TcpStream, _peer: SocketAddr| async move {
            ctx.done().await;
            stream.write_all(b"bye").await?;
            Ok::<(), BoxError>(())
        },
    ));
    let (listener, addr) = bind().await;
    let ctx = Context::background().with_cancel();

    let serving = {
        let ctx = ctx.clone();
        let server = Arc::clone(&server);
        tokio::spawn(async move { serve(&ctx, Duration::from_secs(5), server, listener).await })
    };

    let mut client = TcpStream::connect(addr).await?;
    until_connections(&server, 1).await;

    ctx.cancel();
    let served = serving.await?;
    assert!(served.is_err_and(|err| err.is_closed()));

    let mut got = Vec::new();
    client.read_to_end(&mut got).await?;
    assert_eq!(got, b"bye");
    assert_eq!(server.connections(), 0);
    Ok(())
}

#[tokio::test]
async fn slow_connection_fails_shutdown_after_timeout() {
    let server = Arc::new(TcpServer::new(
        |_ctx: Context, _stream: TcpStream, _peer: SocketAddr| async move {
            std::future::pending::<()>().await;
            Ok::<(), BoxError>(())
        },
    ));
    let (listener, addr) = bind().await;
    let ctx = Context::background().with_cancel();

    let serving = {
        let ctx = ctx.clone();
        let server = Arc::clone(&server);
        tokio::spawn(
            async move { serve(&ctx, Duration::from_millis(50), server, listener).await },
        )
    };

    let _client = TcpStream::connect(addr).await.unwrap();
    until_connections(&server, 1).await;
    ctx.cancel();

    let err = serving.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        ServeError::Shutdown(ContextError::DeadlineExceeded)
    ));
    assert_eq!(err.to_string(), "failed to shutdown server: context deadline exceeded");
}

#[tokio::test]
async fn accept_loop_is_gone_when_serve_returns() {
    let server = Arc::new(TcpServer::new(
        |_ctx: Context, _stream: TcpStream, _peer: SocketAddr| async move { Ok::<(), BoxError>(()) },
    ));
    let (listener, _) = bind().await;
    let ctx = Context::background().with_cancel();
    ctx.cancel();

    let err = serve(&ctx, Duration::from_secs(1), Arc::clone(&server), listener)
        .await
        .unwrap_err();
    assert!(matches!(err, ServeError::Closed));
    assert_eq!(err.to_string(), "server closed");

    assert!(server.is_closed());
    let (again, _) = bind().await;
    let err = server.serve(Context::background(), again).await.unwrap_err();
    assert!(err.is_closed());
}

#[tokio::test]
async fn echo_roundtrip_while_serving() -> anyhow::Result<()> {
    let server = Arc::new(TcpServer::new(
        |_ctx: Context, mut stream: TcpStream, _peer: SocketAddr| async move {
            let mut buf = vec![0u8; 1024];
            loop {
                let n = stream.read(&mut buf).await?;
                if n == 0 {
                    return Ok::<(), BoxError>(());
                }
                stream.write_all(&buf[..n]).await?;
            }
        },
    ));
    let (listener, addr) = bind().await;
    let ctx = Context::background().with_cancel();

    let serving = {
        let ctx = ctx.clone();
        let server = Arc::clone(&server);
        tokio::spawn(async move { serve(&ctx, Duration::from_secs(5), server, listener).await })
    };

    let mut client = TcpStream::connect(addr).await?;
    client.write_all(b"hello").await?;
    let mut got = [0u8; 5];
    client.read_exact(&mut got).await?;
    assert_eq!(&got, b"hello");
    drop(client);

    ctx.cancel();
    assert!(matches!(serving.await?, Err(ServeError::Closed)));
    Ok(())
}
