use glint::{App, Config, app, handler_fn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

async fn spawn(app: App) -> (std::net::SocketAddr, oneshot::Sender<()>, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        app.serve(listener, async {
            let _ = rx.await;
        })
        .await
        .unwrap();
    });

    (addr, tx, handle)
}

async fn roundtrip(addr: std::net::SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    String::from_utf8(buf).unwrap()
}

#[tokio::test]
async fn echo_over_tcp() {
    let mut app = app();
    app.get(
        "/echo",
        handler_fn(|ctx| {
            Box::pin(async move {
                let name = ctx.query("name").unwrap_or_default();
                ctx.string(200, name);
            })
        }),
    );

    let (addr, shutdown, handle) = spawn(app).await;

    let reply = roundtrip(
        addr,
        "GET /echo?name=Ada HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;
    let lower = reply.to_ascii_lowercase();

    assert!(reply.starts_with("HTTP/1.1 200 OK"), "{reply}");
    assert!(lower.contains("content-type: text/plain\r\n"), "{reply}");
    assert!(reply.ends_with("\r\n\r\nAda"), "{reply}");

    shutdown.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let mut app = App::with_config(Config {
        max_body_bytes: 8,
        ..Default::default()
    });
    app.post(
        "/upload",
        handler_fn(|ctx| Box::pin(async move { ctx.string(200, "stored") })),
    );

    let (addr, shutdown, handle) = spawn(app).await;

    let reply = roundtrip(
        addr,
        "POST /upload HTTP/1.1\r\nHost: localhost\r\nContent-Length: 16\r\nConnection: close\r\n\r\n0123456789abcdef",
    )
    .await;

    assert!(reply.starts_with("HTTP/1.1 413"), "{reply}");
    assert!(!reply.contains("stored"), "{reply}");

    shutdown.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn unreadable_body_is_rejected() {
    let mut app = app();
    app.post(
        "/upload",
        handler_fn(|ctx| Box::pin(async move { ctx.string(200, "stored") })),
    );

    let (addr, shutdown, handle) = spawn(app).await;

    let reply = roundtrip(
        addr,
        "POST /upload HTTP/1.1\r\nHost: localhost\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\nzz\r\nhello\r\n0\r\n\r\n",
    )
    .await;

    assert!(reply.starts_with("HTTP/1.1 400"), "{reply}");
    assert!(!reply.contains("stored"), "{reply}");

    shutdown.send(()).unwrap();
    handle.await.unwrap();
}
