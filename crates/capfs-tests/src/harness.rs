//! Test server harness.

use std::net::SocketAddr;
use std::sync::Arc;

use capfs_server::{Client, ClientError, Server, ServerConfig};
use capfs_store::{FileTable, StoreConfig};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;

/// A server listening on an ephemeral loopback port.
///
/// The listener stops when the harness is dropped.
pub struct TestServer {
    addr: SocketAddr,
    table: Arc<FileTable>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl TestServer {
    /// Starts a server with default configuration.
    pub async fn start() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Self::with_config(ServerConfig::loopback(), StoreConfig::default()).await
    }

    /// Starts a server with the given configuration.
    ///
    /// The listen address is always replaced with an ephemeral loopback one.
    pub async fn with_config(
        config: ServerConfig,
        store: StoreConfig,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let config = ServerConfig {
            listen_addr: ServerConfig::loopback().listen_addr,
            ..config
        };
        let table = Arc::new(FileTable::new(store));
        let server = Server::bind(config, Arc::clone(&table)).await?;
        let addr = server.local_addr()?;

        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let _ = server
                .run(async {
                    let _ = rx.await;
                })
                .await;
        });

        info!(addr = %addr, "Test server started");
        Ok(Self {
            addr,
            table,
            shutdown: Some(tx),
            task,
        })
    }

    /// Returns the listen address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the server's file table.
    pub fn table(&self) -> &Arc<FileTable> {
        &self.table
    }

    /// Connects and authenticates a client.
    pub async fn connect(&self, username: &str, group: &str) -> Result<Client, ClientError> {
        Client::connect(self.addr, username, group).await
    }

    /// Stops accepting connections and waits for the listener to exit.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.task).await;
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
