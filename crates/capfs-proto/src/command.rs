//! Handshake and command grammar.
//!
//! Commands are whitespace-separated tokens. The first token selects the
//! command; tokens beyond the ones a command needs are ignored.

use std::fmt;

use capfs_core::{is_valid_filename, Group, Identity, PermissionMask, WriteMode};
use thiserror::Error;

/// Command names, used to pick the matching usage text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// `create`
    Create,
    /// `mode`
    Mode,
    /// `write`
    Write,
    /// `read`
    Read,
}

impl CommandKind {
    /// Returns the usage line for this command.
    pub fn usage(&self) -> &'static str {
        match self {
            CommandKind::Create => "create <filename> <rwrwrw>",
            CommandKind::Mode => "mode <filename> <rwrwrw>",
            CommandKind::Write => "write <filename> <o/a>",
            CommandKind::Read => "read <filename>",
        }
    }
}

/// A parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create an empty file
    Create {
        /// Filename
        name: String,
        /// Initial mask
        mask: PermissionMask,
    },
    /// Change a file's mask
    Mode {
        /// Filename
        name: String,
        /// New mask
        mask: PermissionMask,
    },
    /// Write lines into a file
    Write {
        /// Filename
        name: String,
        /// Overwrite or append
        mode: WriteMode,
    },
    /// Stream a file's content
    Read {
        /// Filename
        name: String,
    },
    /// End the session
    Exit,
}

/// Command parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Known command with missing or malformed arguments
    #[error("Usage: {}", .0.usage())]
    Usage(CommandKind),

    /// Unrecognized command word
    #[error("Unknown command: {0:?}")]
    Unknown(String),
}

impl Command {
    /// Parses one command line (terminator already stripped).
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut tokens = line.split_whitespace();
        let word = tokens.next().unwrap_or("");
        let name = tokens.next().filter(|n| is_valid_filename(n));
        let arg = tokens.next();

        match word {
            "create" | "mode" => {
                let kind = if word == "create" {
                    CommandKind::Create
                } else {
                    CommandKind::Mode
                };
                let (name, mask) = name
                    .zip(arg.and_then(|m| m.parse::<PermissionMask>().ok()))
                    .ok_or(ParseError::Usage(kind))?;
                let name = name.to_string();
                Ok(if kind == CommandKind::Create {
                    Command::Create { name, mask }
                } else {
                    Command::Mode { name, mask }
                })
            }
            "write" => {
                let (name, mode) = name
                    .zip(arg.and_then(|m| m.parse::<WriteMode>().ok()))
                    .ok_or(ParseError::Usage(CommandKind::Write))?;
                Ok(Command::Write {
                    name: name.to_string(),
                    mode,
                })
            }
            "read" => {
                let name = name.ok_or(ParseError::Usage(CommandKind::Read))?;
                Ok(Command::Read {
                    name: name.to_string(),
                })
            }
            "exit" => Ok(Command::Exit),
            other => Err(ParseError::Unknown(other.to_string())),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Create { name, mask } => write!(f, "create {name} {mask}"),
            Command::Mode { name, mask } => write!(f, "mode {name} {mask}"),
            Command::Write { name, mode } => write!(f, "write {name} {mode}"),
            Command::Read { name } => write!(f, "read {name}"),
            Command::Exit => f.write_str("exit"),
        }
    }
}

/// Handshake errors. All of them end the connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    /// No username before the separator
    #[error("Missing username")]
    MissingUsername,

    /// Group missing or not whitelisted
    #[error("Invalid group: {0:?}")]
    InvalidGroup(String),
}

/// Parses a `<username>|<group>` handshake line.
pub fn parse_handshake(line: &str) -> Result<Identity, HandshakeError> {
    let mut parts = line.split('|');
    let username = parts.next().unwrap_or("").trim();
    let group = parts.next().unwrap_or("").trim();

    if username.is_empty() {
        return Err(HandshakeError::MissingUsername);
    }
    let group: Group = group
        .parse()
        .map_err(|_| HandshakeError::InvalidGroup(group.to_string()))?;
    Ok(Identity::new(username, group))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create_and_mode() {
        assert_eq!(
            Command::parse("create notes.txt rw----").unwrap(),
            Command::Create {
                name: "notes.txt".into(),
                mask: "rw----".parse().unwrap()
            }
        );
        assert_eq!(
            Command::parse("  mode notes.txt rwr---  extra").unwrap(),
            Command::Mode {
                name: "notes.txt".into(),
                mask: "rwr---".parse().unwrap()
            }
        );
    }

    #[test]
    fn test_parse_usage_errors() {
        for (line, kind) in [
            ("create", CommandKind::Create),
            ("create f", CommandKind::Create),
            ("create f rwx---", CommandKind::Create),
            ("create f rw-rw-rw-", CommandKind::Create),
            ("mode f", CommandKind::Mode),
            ("write f", CommandKind::Write),
            ("write f x", CommandKind::Write),
            ("read", CommandKind::Read),
        ] {
            assert_eq!(Command::parse(line), Err(ParseError::Usage(kind)), "{line:?}");
        }

        let long = format!("read {}", "n".repeat(capfs_core::MAX_FILENAME_LEN + 1));
        assert_eq!(Command::parse(&long), Err(ParseError::Usage(CommandKind::Read)));
    }

    #[test]
    fn test_parse_write_read_exit() {
        assert_eq!(
            Command::parse("write big.txt o").unwrap(),
            Command::Write {
                name: "big.txt".into(),
                mode: WriteMode::Overwrite
            }
        );
        assert_eq!(
            Command::parse("read big.txt").unwrap(),
            Command::Read {
                name: "big.txt".into()
            }
        );
        assert_eq!(Command::parse("exit").unwrap(), Command::Exit);
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(
            Command::parse("delete f"),
            Err(ParseError::Unknown("delete".into()))
        );
        assert_eq!(Command::parse(""), Err(ParseError::Unknown(String::new())));
        // Command words are case-sensitive.
        assert!(matches!(Command::parse("READ f"), Err(ParseError::Unknown(_))));
    }

    #[test]
    fn test_display_roundtrip() {
        for line in ["create a rw----", "mode a ------", "write a a", "read a", "exit"] {
            assert_eq!(Command::parse(line).unwrap().to_string(), line);
        }
    }

    #[test]
    fn test_handshake() {
        let id = parse_handshake("alice|CSE-students").unwrap();
        assert_eq!(id.username(), "alice");
        assert_eq!(id.group(), Group::CseStudents);

        assert_eq!(
            parse_handshake("alice|EE-students"),
            Err(HandshakeError::InvalidGroup("EE-students".into()))
        );
        assert_eq!(
            parse_handshake("alice"),
            Err(HandshakeError::InvalidGroup(String::new()))
        );
        assert_eq!(
            parse_handshake("|AOS-students"),
            Err(HandshakeError::MissingUsername)
        );
    }
}
