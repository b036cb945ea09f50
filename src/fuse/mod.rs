/// An implementation of a FUSE filesystem around [`crate::flatfs::FlatFs`].
mod filesystem;

pub use filesystem::{ino_to_slot, slot_to_ino, FlatFsFuse};
