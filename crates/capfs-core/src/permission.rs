//! Owner/group/other access decision.

use std::fmt;
use std::str::FromStr;

use crate::identity::{Group, Identity};
use crate::mask::PermissionMask;
use crate::CoreError;

/// An operation a session asks to perform on a file's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Read the content
    Read,
    /// Write the content
    Write,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Read => "read",
            Operation::Write => "write",
        })
    }
}

/// How a write session treats existing content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the content, starting from the first line received
    Overwrite,
    /// Keep the content and add to its end
    Append,
}

impl FromStr for WriteMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "o" => Ok(WriteMode::Overwrite),
            "a" => Ok(WriteMode::Append),
            _ => Err(CoreError::InvalidWriteMode(s.to_string())),
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WriteMode::Overwrite => "o",
            WriteMode::Append => "a",
        })
    }
}

/// The permission class a requester falls into for a given file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    /// Requester is the owner
    Owner,
    /// Requester shares the file's group
    Group,
    /// Everyone else
    Other,
}

/// Ownership captured when a file is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ownership {
    /// Creator's username
    pub owner: String,
    /// Creator's group
    pub group: Group,
}

impl Ownership {
    /// Captures the ownership of a file created by `identity`.
    pub fn of(identity: &Identity) -> Self {
        Self {
            owner: identity.username().to_string(),
            group: identity.group(),
        }
    }

    /// Classifies `identity` against this ownership.
    ///
    /// Username match wins even when the requester's current group differs
    /// from the file's group.
    pub fn classify(&self, identity: &Identity) -> Class {
        if identity.username() == self.owner {
            Class::Owner
        } else if identity.group() == self.group {
            Class::Group
        } else {
            Class::Other
        }
    }

    /// Returns true if `identity` may change this file's mask.
    ///
    /// Both the username and the group have to match.
    pub fn is_owner(&self, identity: &Identity) -> bool {
        identity.username() == self.owner && identity.group() == self.group
    }
}

/// Decides whether `identity` may perform `op` on a file.
///
/// The first matching class decides; classes are not cumulative, so an owner
/// without the owner bit is denied even if the other bit is set.
pub fn authorize(
    ownership: &Ownership,
    mask: &PermissionMask,
    identity: &Identity,
    op: Operation,
) -> bool {
    mask.allows(ownership.classify(identity), op)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice_file() -> Ownership {
        Ownership::of(&Identity::new("alice", Group::CseStudents))
    }

    fn mask(s: &str) -> PermissionMask {
        s.parse().unwrap()
    }

    #[test]
    fn test_classify_precedence() {
        let file = alice_file();

        // username match, same group
        assert_eq!(file.classify(&Identity::new("alice", Group::CseStudents)), Class::Owner);
        // username match, different group: still owner
        assert_eq!(file.classify(&Identity::new("alice", Group::AosStudents)), Class::Owner);
        // username mismatch, same group
        assert_eq!(file.classify(&Identity::new("bob", Group::CseStudents)), Class::Group);
        // neither
        assert_eq!(file.classify(&Identity::new("bob", Group::AosStudents)), Class::Other);
    }

    #[test]
    fn test_authorize_first_match_only() {
        let file = alice_file();
        let alice = Identity::new("alice", Group::CseStudents);
        let bob = Identity::new("bob", Group::CseStudents);
        let carol = Identity::new("carol", Group::AosStudents);

        // Owner denied even though group and other bits are set.
        let m = mask("--rwrw");
        assert!(!authorize(&file, &m, &alice, Operation::Read));
        assert!(!authorize(&file, &m, &alice, Operation::Write));
        assert!(authorize(&file, &m, &bob, Operation::Read));
        assert!(authorize(&file, &m, &carol, Operation::Write));

        // Group member denied even though the other bit is set.
        let m = mask("rw--rw");
        assert!(authorize(&file, &m, &alice, Operation::Read));
        assert!(!authorize(&file, &m, &bob, Operation::Read));
        assert!(authorize(&file, &m, &carol, Operation::Read));
    }

    #[test]
    fn test_authorize_every_permutation() {
        let file = alice_file();
        let cases = [
            (Identity::new("alice", Group::CseStudents), 0usize),
            (Identity::new("alice", Group::AosStudents), 0),
            (Identity::new("bob", Group::CseStudents), 2),
            (Identity::new("bob", Group::AosStudents), 4),
        ];

        for (identity, slot) in cases {
            for (offset, op, letter) in [(0, Operation::Read, 'r'), (1, Operation::Write, 'w')] {
                let mut granted = ['-'; 6];
                granted[slot + offset] = letter;
                let granted: String = granted.iter().collect();
                assert!(
                    authorize(&file, &mask(&granted), &identity, op),
                    "{identity} should get {op} from {granted}"
                );

                // Every other single bit leaves this requester denied.
                for other in (0..6).filter(|&i| i != slot + offset) {
                    let mut bits = ['-'; 6];
                    bits[other] = if other % 2 == 0 { 'r' } else { 'w' };
                    let bits: String = bits.iter().collect();
                    assert!(
                        !authorize(&file, &mask(&bits), &identity, op),
                        "{identity} should not get {op} from {bits}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_write_mode_parse() {
        assert_eq!("o".parse::<WriteMode>(), Ok(WriteMode::Overwrite));
        assert_eq!("a".parse::<WriteMode>(), Ok(WriteMode::Append));
        assert!("x".parse::<WriteMode>().is_err());
        assert!("oa".parse::<WriteMode>().is_err());
        assert_eq!(WriteMode::Append.to_string(), "a");
    }

    #[test]
    fn test_is_owner_needs_group() {
        let file = alice_file();
        assert!(file.is_owner(&Identity::new("alice", Group::CseStudents)));
        assert!(!file.is_owner(&Identity::new("alice", Group::AosStudents)));
        assert!(!file.is_owner(&Identity::new("bob", Group::CseStudents)));
    }
}
