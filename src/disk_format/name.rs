use std::fmt::{self, Debug};
use std::mem::size_of;

use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;

use crate::error::FsError;

/// The size of the name field of an inode record, including the nul-terminator.
pub const MAX_NAME_LEN: usize = 256;
const_assert!(size_of::<InodeName>() == MAX_NAME_LEN);

/// The full absolute path naming an inode, nul-padded to [`MAX_NAME_LEN`] bytes.
///
/// At most `MAX_NAME_LEN - 1` bytes are stored so that the field always ends in a nul.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(C)]
pub struct InodeName(#[serde(with = "BigArray")] [u8; MAX_NAME_LEN]);

impl InodeName {
    pub const EMPTY: InodeName = InodeName([0; MAX_NAME_LEN]);

    /// The stored bytes up to (excluding) the first nul.
    pub fn as_bytes(&self) -> &[u8] {
        let len = self.0.iter().position(|b| *b == 0).unwrap_or(MAX_NAME_LEN);
        &self.0[..len]
    }

    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }

    pub fn matches(&self, path: &str) -> bool {
        self.as_bytes() == path.as_bytes()
    }

    /// The stored path, or `None` if the bytes are not UTF-8.
    pub fn to_str(&self) -> Option<&str> {
        std::str::from_utf8(self.as_bytes()).ok()
    }
}

impl TryFrom<&str> for InodeName {
    type Error = FsError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let bytes = value.as_bytes();

        if bytes.is_empty() || bytes.contains(&0) {
            return Err(FsError::InvalidArgument);
        }

        if bytes.len() >= MAX_NAME_LEN {
            return Err(FsError::NameTooLong);
        }

        let mut converted = [0; MAX_NAME_LEN];
        converted[..bytes.len()].copy_from_slice(bytes);

        Ok(InodeName(converted))
    }
}

impl Debug for InodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InodeName")
            .field(&String::from_utf8_lossy(self.as_bytes()))
            .finish()
    }
}

impl fmt::Display for InodeName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        let name = InodeName::try_from("/a/b").unwrap();
        assert_eq!(name.as_bytes(), b"/a/b");
        assert_eq!(name.to_str(), Some("/a/b"));
        assert!(name.matches("/a/b"));
        assert!(!name.matches("/a/b/"));
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(matches!(
            InodeName::try_from(""),
            Err(FsError::InvalidArgument)
        ));
        assert!(InodeName::EMPTY.is_empty());
    }

    #[test]
    fn test_interior_nul_rejected() {
        assert!(matches!(
            InodeName::try_from("/a\0b"),
            Err(FsError::InvalidArgument)
        ));
    }

    #[test]
    fn test_longest_name() {
        let longest = format!("/{}", "x".repeat(MAX_NAME_LEN - 2));
        assert!(InodeName::try_from(longest.as_str()).is_ok());

        let too_long = format!("/{}", "x".repeat(MAX_NAME_LEN - 1));
        assert!(matches!(
            InodeName::try_from(too_long.as_str()),
            Err(FsError::NameTooLong)
        ));
    }

    #[test]
    fn test_serialized_without_length_prefix() {
        let name = InodeName::try_from("/hello").unwrap();
        let bytes = bincode::serialize(&name).unwrap();

        assert_eq!(bytes.len(), MAX_NAME_LEN);
        assert_eq!(&bytes[..6], b"/hello");
        assert!(bytes[6..].iter().all(|b| *b == 0));

        let parsed: InodeName = bincode::deserialize(&bytes).unwrap();
        assert_eq!(parsed, name);
    }
}
