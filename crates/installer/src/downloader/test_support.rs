//! Minimal HTTP server for responses wiremock cannot produce
//! (no content length, bodies shorter than declared, stalled bodies)

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Answer every connection with `head` followed by `body`, then close.
///
/// Returns the URL to request.
pub async fn serve_raw(head: &str, body: &[u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut response = head.as_bytes().to_vec();
    response.extend_from_slice(body);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            let _ = socket.write_all(&response).await;
            let _ = socket.shutdown().await;
        }
    });

    format!("http://{}/payload.bin", addr)
}

/// Declare `declared` bytes, send `sent` of them and keep the connection
/// open. The receiver fires once the client hangs up.
pub async fn serve_stalled(declared: usize, sent: usize) -> (String, oneshot::Receiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (closed_tx, closed_rx) = oneshot::channel();

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut request = [0u8; 4096];
        let _ = socket.read(&mut request).await;

        let head = format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n", declared);
        let _ = socket.write_all(head.as_bytes()).await;
        let _ = socket.write_all(&vec![0u8; sent]).await;

        // Reads return 0 once the client side is dropped
        let mut rest = [0u8; 64];
        while matches!(socket.read(&mut rest).await, Ok(n) if n > 0) {}
        let _ = closed_tx.send(());
    });

    (format!("http://{}/stalled.bin", addr), closed_rx)
}
