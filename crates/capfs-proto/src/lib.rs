//! Capfs Proto - Session protocol definitions.
//!
//! Defines:
//! - The handshake and command grammar
//! - Response texts and the read end-of-stream marker
//! - Bounded line framing over a byte stream

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod command;
pub mod frame;
pub mod response;

pub use command::{parse_handshake, Command, CommandKind, HandshakeError, ParseError};
pub use frame::{Frame, LineReader};
pub use response::{Response, END_OF_FILE, END_OF_STREAM};

/// Default TCP port.
pub const DEFAULT_PORT: u16 = 12350;

/// Maximum command line length in bytes, terminator excluded.
pub const MAX_COMMAND_LINE: usize = 512;

/// Default maximum content piece length in bytes.
pub const MAX_CONTENT_LINE: usize = 256 * 1024;

/// Default read chunk size in bytes.
pub const READ_CHUNK_SIZE: usize = 65535;
