//! Capfs Store - In-memory file table.
//!
//! Provides:
//! - File records with growable content
//! - Per-record reader/writer admission gates
//! - The file table and its capability listing

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod config;
pub mod content;
pub mod gate;
pub mod record;
pub mod table;

pub use config::StoreConfig;
pub use content::ContentBuffer;
pub use gate::{Gate, GateState};
pub use record::{FileRecord, ReadAdmission, WriteAdmission};
pub use table::{CapabilityList, FileSnapshot, FileTable};

use thiserror::Error;

/// Errors from file table operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// A file with this name already exists
    #[error("File {0} already exists")]
    AlreadyExists(String),

    /// No file with this name
    #[error("File {0} not found")]
    NotFound(String),

    /// Requester is not allowed to change this file
    #[error("Permission denied on {0}")]
    PermissionDenied(String),

    /// Permission mask is malformed
    #[error("Invalid permission mask: {0:?}")]
    InvalidMask(String),

    /// Filename is malformed
    #[error("Invalid filename: {0:?}")]
    InvalidName(String),

    /// The table holds its configured maximum number of files
    #[error("File table is full ({0} files)")]
    TableFull(usize),
}
