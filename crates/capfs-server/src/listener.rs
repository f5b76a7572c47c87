//! TCP listener.
//!
//! Accepts connections and runs one session task per connection, up to the
//! configured client limit. Connections beyond the limit are closed without
//! a response.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use capfs_store::FileTable;
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::ServerConfig;
use crate::session::Session;
use crate::{ServerError, SessionError};

/// A bound capfs server.
pub struct Server {
    config: Arc<ServerConfig>,
    table: Arc<FileTable>,
    listener: TcpListener,
    slots: Arc<Semaphore>,
}

impl Server {
    /// Binds the configured listen address.
    pub async fn bind(config: ServerConfig, table: Arc<FileTable>) -> Result<Self, ServerError> {
        let addr = config.listen_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let slots = Arc::new(Semaphore::new(config.max_clients));

        Ok(Self {
            config: Arc::new(config),
            table,
            listener,
            slots,
        })
    }

    /// Returns the bound address.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until `shutdown` completes.
    ///
    /// Sessions already running are left to finish on their own.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        info!(addr = %self.local_addr()?, "Listening");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => self.admit(stream, peer),
                        Err(e) => warn!("Accept failed: {}", e),
                    }
                }
                _ = &mut shutdown => {
                    info!("Listener shutting down");
                    return Ok(());
                }
            }
        }
    }

    fn admit(&self, stream: TcpStream, peer: SocketAddr) {
        let Ok(permit) = Arc::clone(&self.slots).try_acquire_owned() else {
            warn!(peer = %peer, max = self.config.max_clients, "Max clients reached, rejecting connection");
            return;
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!(peer = %peer, "Failed to set TCP_NODELAY: {}", e);
        }

        let table = Arc::clone(&self.table);
        let config = Arc::clone(&self.config);
        let span = info_span!("session", peer = %peer);

        tokio::spawn(
            async move {
                let (read_half, write_half) = stream.into_split();
                let mut session = Session::new(table, config, BufReader::new(read_half), write_half);
                match session.run().await {
                    Ok(()) => debug!("Session closed"),
                    Err(SessionError::Closed) => info!("Session aborted by peer"),
                    Err(e) => error!("Session failed: {}", e),
                }
                drop(permit);
            }
            .instrument(span),
        );
    }
}
