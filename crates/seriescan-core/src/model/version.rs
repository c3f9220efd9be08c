//! Write-precedence key for overlapping data.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Global write precedence of one chunk: `(file_version, chunk_offset)`
/// compared lexicographically, larger is newer.
///
/// `file_version` is unique per file by construction, so two chunks
/// from different files never compare equal; within one file the chunk
/// offset disambiguates. At equal timestamps the point from the larger
/// key shadows the others.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct VersionKey {
    pub file_version: u64,
    pub chunk_offset: u64,
}

impl VersionKey {
    pub fn new(file_version: u64, chunk_offset: u64) -> Self {
        VersionKey {
            file_version,
            chunk_offset,
        }
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.file_version, self.chunk_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_lexicographic() {
        assert!(VersionKey::new(2, 0) > VersionKey::new(1, 99));
        assert!(VersionKey::new(1, 8) > VersionKey::new(1, 7));
        assert_eq!(VersionKey::new(3, 4), VersionKey::new(3, 4));
    }
}
