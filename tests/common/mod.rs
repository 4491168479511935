//! Shared harness: a reference service on an ephemeral port backed by a
//! temporary database.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use stowage::remote::{ClientConfig, RetryConfig};
use stowage::server::{NamespaceDb, router};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub struct TestServer {
    addr: SocketAddr,
    db: NamespaceDb,
    handle: JoinHandle<()>,
    _dir: TempDir,
}

impl TestServer {
    pub async fn start() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let db = NamespaceDb::open(dir.path().join("kv.redb")).expect("Failed to open database");

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        let app = router(db.clone());
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server failed");
        });

        Self {
            addr,
            db,
            handle,
            _dir: dir,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn db(&self) -> &NamespaceDb {
        &self.db
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Client settings that fail fast instead of retrying.
pub fn fast_client() -> ClientConfig {
    ClientConfig {
        request_timeout_ms: 2_000,
        connect_timeout_ms: 500,
        retry: RetryConfig::none(),
    }
}

/// An address nothing listens on.
pub async fn unused_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind probe listener");
    let addr = listener.local_addr().expect("Listener has no address");
    drop(listener);
    tokio::time::sleep(Duration::from_millis(10)).await;
    format!("http://{addr}")
}
