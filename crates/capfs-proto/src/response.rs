//! Response texts.
//!
//! Every rejected operation produces exactly one response. Responses to
//! `read` (including its failures) end with the end-of-stream marker so the
//! caller always knows where the stream stops.

use std::fmt;

use crate::command::CommandKind;

/// Token marking the end of a `read` response.
pub const END_OF_FILE: &str = "END_OF_FILE";

/// The marker as sent on the wire.
pub const END_OF_STREAM: &[u8] = b"END_OF_FILE\n";

/// A server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Handshake accepted
    Welcome,
    /// Handshake rejected
    InvalidGroup,
    /// `create` succeeded
    Created,
    /// `create` named an existing file
    AlreadyExists(String),
    /// `create` hit the table's file limit
    TableFull,
    /// `mode` succeeded
    ModeChanged(String),
    /// `mode` named an unknown file
    ModeNotFound,
    /// `mode` requester is not the owner
    NotOwner,
    /// `write` named an unknown file
    WriteNotFound(String),
    /// `write` refused because of a reader or writer
    WriteBusy,
    /// `write` not permitted
    WriteDenied(String),
    /// `write` admitted; content may follow
    WritePrompt,
    /// `write` finished
    Written {
        /// Filename
        name: String,
        /// Bytes ingested
        bytes: usize,
    },
    /// `read` named an unknown file
    ReadNotFound(String),
    /// `read` refused because of a writer
    ReadBusy,
    /// `read` not permitted
    ReadDenied(String),
    /// `read` of a file with no content
    ReadEmpty(String),
    /// Malformed arguments to a known command
    Usage(CommandKind),
    /// Command line over the length limit
    LineTooLong(usize),
    /// Unknown command
    InvalidCommand,
}

impl Response {
    /// Returns true if the response is followed by the end-of-stream marker.
    pub fn ends_stream(&self) -> bool {
        matches!(
            self,
            Response::ReadNotFound(_)
                | Response::ReadBusy
                | Response::ReadDenied(_)
                | Response::ReadEmpty(_)
                | Response::Usage(CommandKind::Read)
        )
    }

    /// Returns the bytes to send.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Welcome => writeln!(f),
            Response::InvalidGroup => writeln!(f, "Invalid group"),
            Response::Created => writeln!(f, "File created successfully."),
            Response::AlreadyExists(name) => writeln!(f, "File {name} already exists."),
            Response::TableFull => writeln!(f, "File table is full."),
            Response::ModeChanged(name) => {
                writeln!(f, "Permissions of file {name} updated successfully.")
            }
            Response::ModeNotFound => writeln!(f, "file not exist"),
            Response::NotOwner => writeln!(f, "Permission denied: You are not the owner."),
            Response::WriteNotFound(name) | Response::ReadNotFound(name) => {
                writeln!(f, "File {name} not found.")
            }
            Response::WriteBusy => writeln!(f, "Other client is reading or writing this file."),
            Response::WriteDenied(name) => {
                writeln!(f, "Permission denied: You cannot write to file {name}.")
            }
            Response::WritePrompt => writeln!(f, "Enter your content. End with an empty line:"),
            Response::Written { name, bytes } => {
                writeln!(f, "File {name} written successfully with {bytes} bytes.")
            }
            Response::ReadBusy => writeln!(f, "Other client is writing this file"),
            Response::ReadDenied(name) => {
                writeln!(f, "Permission denied: You cannot read file {name}.")
            }
            Response::ReadEmpty(name) => writeln!(f, "File {name} is empty."),
            Response::Usage(kind) => writeln!(f, "Invalid command. Usage: {}.", kind.usage()),
            Response::LineTooLong(limit) => {
                writeln!(f, "Invalid command. Line exceeds {limit} bytes.")
            }
            Response::InvalidCommand => writeln!(f, "Invalid command."),
        }?;
        if self.ends_stream() {
            writeln!(f, "{END_OF_FILE}")?;
        }
        Ok(())
    }
}
