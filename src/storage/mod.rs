/// File-backed storage.
mod file;
/// The storage abstraction.
mod flatfs_storage;
/// In-memory storage.
mod memory;

pub use file::*;
pub use flatfs_storage::*;
pub use memory::*;
