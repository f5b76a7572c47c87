//! Groups and session identities.

use std::fmt;
use std::str::FromStr;

use crate::CoreError;

/// A recognized group.
///
/// The whitelist is fixed for the whole process; a handshake naming any other
/// group is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    /// `AOS-students`
    AosStudents,
    /// `CSE-students`
    CseStudents,
}

impl Group {
    /// All recognized groups, in display order.
    pub const ALL: [Group; 2] = [Group::AosStudents, Group::CseStudents];

    /// Returns the wire name of the group.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Group::AosStudents => "AOS-students",
            Group::CseStudents => "CSE-students",
        }
    }
}

impl FromStr for Group {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Group::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| CoreError::UnknownGroup(s.to_string()))
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identity a session presents at handshake.
///
/// Immutable for the lifetime of the session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    username: String,
    group: Group,
}

impl Identity {
    /// Creates a new identity.
    pub fn new(username: impl Into<String>, group: Group) -> Self {
        Self {
            username: username.into(),
            group,
        }
    }

    /// Returns the username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the group.
    pub fn group(&self) -> Group {
        self.group
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.username, self.group)
    }
}
