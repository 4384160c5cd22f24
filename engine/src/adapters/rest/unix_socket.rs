//! Transports for the status API
//!
//! - Unix: Unix domain socket, mode 0660
//! - TCP on any platform

use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use tracing::{info, warn};

pub type ServeError = Box<dyn std::error::Error + Send + Sync>;

#[cfg(unix)]
use hyper::server::accept;
#[cfg(unix)]
use tokio::net::UnixListener;
#[cfg(unix)]
use tokio_stream::wrappers::UnixListenerStream;

/// Serve the status API on a Unix socket until `shutdown` resolves.
///
/// A stale socket file is removed first and the socket is removed again
/// on the way out.
#[cfg(unix)]
pub async fn serve_on_unix_socket<F>(
    socket_path: &str,
    app: Router,
    shutdown: F,
) -> Result<(), ServeError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let path = Path::new(socket_path);

    if path.exists() {
        info!(path = socket_path, "Removing existing socket file");
        std::fs::remove_file(path)?;
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            info!(path = %parent.display(), "Creating socket directory");
            std::fs::create_dir_all(parent)?;
        }
    }

    let listener = UnixListener::bind(socket_path)?;

    // Owner and group can read/write
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o660);
        std::fs::set_permissions(socket_path, permissions)?;
    }

    info!(path = socket_path, "Status API listening on Unix socket");

    let stream = UnixListenerStream::new(listener);
    let result = axum::Server::builder(accept::from_stream(stream))
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await;

    if path.exists() {
        warn!(path = socket_path, "Cleaning up socket file");
        let _ = std::fs::remove_file(path);
    }

    result.map_err(Into::into)
}

/// Serve the status API on TCP until `shutdown` resolves
pub async fn serve_on_tcp<F>(addr: SocketAddr, app: Router, shutdown: F) -> Result<(), ServeError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let server = axum::Server::try_bind(&addr)?.serve(app.into_make_service());
    info!(addr = %server.local_addr(), "Status API listening on TCP");

    server.with_graceful_shutdown(shutdown).await?;
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use axum::routing::get;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_unix_socket_serves_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let socket = dir.path().join("run").join("status.sock");
        let socket_str = socket.to_str().unwrap().to_string();

        // Stale file from a previous run
        std::fs::create_dir_all(socket.parent().unwrap()).unwrap();
        std::fs::write(&socket, b"stale").unwrap();

        let token = CancellationToken::new();
        let app = Router::new().route("/health", get(|| async { "ok" }));
        let server = {
            let token = token.clone();
            let path = socket_str.clone();
            tokio::spawn(async move {
                serve_on_unix_socket(&path, app, async move { token.cancelled().await }).await
            })
        };

        let mut stream = None;
        for _ in 0..50 {
            if let Ok(s) = tokio::net::UnixStream::connect(&socket).await {
                stream = Some(s);
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        let mut stream = stream.expect("socket never came up");

        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&socket).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o660);
        }

        stream
            .write_all(b"GET /health HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("ok"));

        token.cancel();
        server.await.unwrap().unwrap();
        assert!(!socket.exists());
    }
}
