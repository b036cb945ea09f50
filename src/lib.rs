pub mod bitmap;
pub mod disk_format;
pub mod error;
pub mod flatfs;
pub mod fuse;
pub mod metadata;
pub mod path;
pub mod shared;
pub mod storage;

pub use error::{FsError, Result};
pub use flatfs::{Attributes, DirectoryEntry, FlatFs};
pub use shared::SharedFlatFs;
