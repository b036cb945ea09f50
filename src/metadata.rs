use std::time::SystemTime;

/// Timestamps reported for every node. The image stores none, so they come from the storage.
pub struct TimeMetadata {
    /// Last access time.
    pub atime: SystemTime,
    /// Last modification time.
    pub mtime: SystemTime,
    /// Creation time.
    pub crtime: SystemTime,
}

impl Default for TimeMetadata {
    fn default() -> Self {
        Self {
            atime: SystemTime::UNIX_EPOCH,
            mtime: SystemTime::UNIX_EPOCH,
            crtime: SystemTime::UNIX_EPOCH,
        }
    }
}

/// Ownership reported for every node, taken from the storage.
#[derive(Default)]
pub struct OwnershipMetadata {
    /// Owner user ID.
    pub uid: u32,
    /// Owner group ID.
    pub gid: u32,
}
