//! Capfs Server - Session protocol and transport.
//!
//! Provides:
//! - The per-connection session state machine
//! - A TCP listener spawning one task per connection
//! - A client speaking the same protocol

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod client;
pub mod config;
pub mod listener;
pub mod session;

pub use client::{Client, ClientError};
pub use config::ServerConfig;
pub use listener::Server;
pub use session::{Session, SessionState};

use thiserror::Error;

/// Errors that end a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// IO error on the connection
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Peer closed the connection in the middle of an exchange
    #[error("Connection closed by peer")]
    Closed,
}

/// Errors from the listener.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Could not bind the listen address
    #[error("Bind failed on {addr}: {source}")]
    Bind {
        /// Address we tried to bind
        addr: std::net::SocketAddr,
        /// Underlying error
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
