//! Static file server for `--serve`
//!
//! Serves a directory on `127.0.0.1:<port>` while scenarios run, so local
//! builds can be checked over HTTP instead of `file://`.

use crate::error::{CliError, CliResult};
use axum::Router;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

/// A running static server; stop it with [`StaticServer::shutdown`]
#[derive(Debug)]
pub struct StaticServer {
    addr: SocketAddr,
    root: PathBuf,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl StaticServer {
    /// Bind `port` (0 picks a free port) and serve `root`
    pub async fn start(root: &Path, port: u16) -> CliResult<Self> {
        if !root.is_dir() {
            return Err(CliError::serve(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let app = Router::new().fallback_service(ServeDir::new(root));
        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], port)))
            .await
            .map_err(|e| CliError::serve(format!("cannot bind port {port}: {e}")))?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    // A dropped sender also stops the server.
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = served {
                warn!(error = %e, "static server stopped with an error");
            }
        });

        info!(root = %root.display(), %addr, "static server listening");
        Ok(Self {
            addr,
            root: root.to_path_buf(),
            shutdown_tx: Some(shutdown_tx),
            handle,
        })
    }

    /// Bound address
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Served directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Default target for the served directory
    #[must_use]
    pub fn target(&self) -> String {
        format!("localhost:{}", self.addr.port())
    }

    /// Stop accepting connections and wait for in-flight requests
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.handle.await {
            warn!(error = %e, "static server task failed");
        }
        debug!(addr = %self.addr, "static server stopped");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_serves_files_and_index() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>shop</h1>").unwrap();
        std::fs::write(dir.path().join("app.css"), "body{margin:0}").unwrap();

        let server = StaticServer::start(dir.path(), 0).await.unwrap();
        assert_ne!(server.addr().port(), 0);
        assert_eq!(server.target(), format!("localhost:{}", server.addr().port()));

        let index = get(server.addr(), "/").await;
        assert!(index.starts_with("HTTP/1.1 200"));
        assert!(index.contains("<h1>shop</h1>"));

        let css = get(server.addr(), "/app.css").await;
        assert!(css.contains("text/css"));

        let missing = get(server.addr(), "/nope.js").await;
        assert!(missing.starts_with("HTTP/1.1 404"));

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_port_released_after_shutdown() {
        let dir = TempDir::new().unwrap();
        let server = StaticServer::start(dir.path(), 0).await.unwrap();
        let addr = server.addr();
        server.shutdown().await;
        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        let err = StaticServer::start(&dir.path().join("dist"), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Serve { .. }));
    }
}
