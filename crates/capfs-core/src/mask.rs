//! Six-character permission masks.
//!
//! A mask reads `[owner-read, owner-write, group-read, group-write,
//! other-read, other-write]`, each position one of `r`, `w` or `-`.

use std::fmt;
use std::str::FromStr;

use crate::permission::{Class, Operation};
use crate::CoreError;

/// Number of characters in a mask.
pub const MASK_LEN: usize = 6;

/// A validated permission mask.
///
/// Only the shape is validated: any of `r`, `w`, `-` may appear in any
/// position. A position grants access only when it holds the letter of its
/// own operation (`r` at a read slot, `w` at a write slot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PermissionMask([u8; MASK_LEN]);

impl PermissionMask {
    /// Mask that grants nothing.
    pub const NONE: PermissionMask = PermissionMask(*b"------");

    /// Returns true if `s` is a well-formed mask.
    pub fn is_valid(s: &str) -> bool {
        s.len() == MASK_LEN && s.bytes().all(|b| matches!(b, b'r' | b'w' | b'-'))
    }

    /// Returns true if the bit for `class` and `op` is set.
    pub fn allows(&self, class: Class, op: Operation) -> bool {
        let base = match class {
            Class::Owner => 0,
            Class::Group => 2,
            Class::Other => 4,
        };
        match op {
            Operation::Read => self.0[base] == b'r',
            Operation::Write => self.0[base + 1] == b'w',
        }
    }

    /// Returns the mask as a string slice.
    pub fn as_str(&self) -> &str {
        // Only ASCII bytes are ever stored.
        std::str::from_utf8(&self.0).unwrap_or("------")
    }
}

impl FromStr for PermissionMask {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !Self::is_valid(s) {
            return Err(CoreError::InvalidMask(s.to_string()));
        }
        let mut bytes = [0u8; MASK_LEN];
        bytes.copy_from_slice(s.as_bytes());
        Ok(Self(bytes))
    }
}

impl TryFrom<&str> for PermissionMask {
    type Error = CoreError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for PermissionMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_parse() {
        let mask: PermissionMask = "rw-r--".parse().unwrap();
        assert_eq!(mask.to_string(), "rw-r--");

        assert!(mask.allows(Class::Owner, Operation::Read));
        assert!(mask.allows(Class::Owner, Operation::Write));
        assert!(!mask.allows(Class::Group, Operation::Write));
        assert!(mask.allows(Class::Group, Operation::Read));
        assert!(!mask.allows(Class::Other, Operation::Read));
        assert!(!mask.allows(Class::Other, Operation::Write));
    }

    #[test]
    fn test_mask_rejects_bad_shape() {
        for bad in ["", "rw", "rw-rw-rw-", "rwxrwx", "RW----", "rw--- ", "rw-rw-\n"] {
            assert_eq!(
                bad.parse::<PermissionMask>(),
                Err(CoreError::InvalidMask(bad.to_string())),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_mask_letter_position_matters() {
        // Well-formed, but a `w` in a read slot grants nothing.
        let mask: PermissionMask = "wrwrwr".parse().unwrap();
        for class in [Class::Owner, Class::Group, Class::Other] {
            assert!(!mask.allows(class, Operation::Read));
            assert!(!mask.allows(class, Operation::Write));
        }
    }

    #[test]
    fn test_none_mask() {
        assert_eq!(PermissionMask::NONE.as_str(), "------");
        assert!(!PermissionMask::NONE.allows(Class::Owner, Operation::Read));
    }
}
