//! Newtype ID for class identification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A class id as written in the first column of a YOLO label line.
///
/// Ids are dense indices into a [`crate::classes::ClassRegistry`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(pub usize);

impl ClassId {
    /// Creates a new ClassId.
    #[inline]
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    /// Returns the underlying index.
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl From<usize> for ClassId {
    fn from(id: usize) -> Self {
        Self(id)
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_ordering() {
        assert!(ClassId(1) < ClassId(2));
        assert_eq!(ClassId::from(3).index(), 3);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(ClassId(7).to_string(), "7");
        assert_eq!(format!("{:?}", ClassId(7)), "ClassId(7)");
    }
}
