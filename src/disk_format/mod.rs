//! Constants and structures that define the on-disk image format.

/// Perform a const assertion.
macro_rules! const_assert {
    ($($tt:tt)*) => {
        const _: () = assert!($($tt)*);
    }
}

/// Blocks.
pub mod block;
/// Inode records.
pub mod inode;
/// Fixed region offsets of the image.
pub mod layout;
/// Full-path names stored in inode records.
pub mod name;
