use tokio::net::TcpListener;

/// Start the reference lock service on an ephemeral port and return the
/// full lock URL (`http://127.0.0.1:<port>/locks`).
pub async fn spawn_lock_service() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind lock service listener");
    let addr = listener.local_addr().expect("lock service address");
    tokio::spawn(async move {
        if let Err(e) = suiterun::lockservice::serve_on(listener).await {
            eprintln!("lock service stopped: {e}");
        }
    });
    format!("http://{addr}{}", suiterun::lockservice::LOCKS_PATH)
}

/// Accept connections on an ephemeral port and never answer them.
///
/// Returns a lock URL whose every request hangs until the client gives up.
pub async fn spawn_unresponsive_service() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind unresponsive listener");
    let addr = listener.local_addr().expect("unresponsive listener address");
    tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            open.push(socket);
        }
    });
    format!("http://{addr}{}", suiterun::lockservice::LOCKS_PATH)
}
