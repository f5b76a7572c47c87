//! Capfs Core - Core types and the access model for the capfs file store.
//!
//! This crate provides:
//! - Group whitelist and session identities
//! - Six-character permission masks
//! - The owner/group/other access decision
//! - Creation timestamps

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod identity;
pub mod mask;
pub mod permission;
pub mod time;

pub use identity::{Group, Identity};
pub use mask::PermissionMask;
pub use permission::{authorize, Class, Operation, Ownership, WriteMode};
pub use time::Timestamp;

use thiserror::Error;

/// Maximum filename length in bytes.
pub const MAX_FILENAME_LEN: usize = 49;

/// Errors from parsing core types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Mask is not six characters over `r`, `w` and `-`
    #[error("Invalid permission mask: {0:?}")]
    InvalidMask(String),

    /// Group is not in the recognized whitelist
    #[error("Unknown group: {0:?}")]
    UnknownGroup(String),

    /// Write mode is neither `o` nor `a`
    #[error("Invalid write mode: {0:?}")]
    InvalidWriteMode(String),
}

/// Returns true if `name` is usable as a filename.
///
/// Names are non-empty, at most [`MAX_FILENAME_LEN`] bytes and contain no
/// whitespace or control characters, since commands are whitespace-separated.
pub fn is_valid_filename(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_FILENAME_LEN
        && !name.chars().any(|c| c.is_whitespace() || c.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_rules() {
        assert!(is_valid_filename("notes.txt"));
        assert!(!is_valid_filename(""));
        assert!(!is_valid_filename("two words"));
        assert!(!is_valid_filename(&"x".repeat(MAX_FILENAME_LEN + 1)));
        assert!(is_valid_filename(&"x".repeat(MAX_FILENAME_LEN)));
    }
}
