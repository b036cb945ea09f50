use std::fs::File;

use flatfs::disk_format::block::BLOCKS_NUM;
use flatfs::disk_format::inode::{InodeType, INODES_NUM, MAX_FILE_SIZE};
use flatfs::disk_format::layout::IMAGE_SIZE;
use flatfs::storage::{FileBackedStorage, FlatFsStorage};
use flatfs::{FlatFs, FsError};

fn open_image(file: &File) -> FlatFs<FileBackedStorage> {
    FlatFs::open(FileBackedStorage::new(file.try_clone().unwrap())).unwrap()
}

#[test]
fn test_fresh_image_scenario() {
    let image = tempfile::tempfile().unwrap();
    let mut fs = open_image(&image);
    assert_eq!(fs.storage.len().unwrap() as usize, IMAGE_SIZE);

    fs.mkdir("/a", 0o755).unwrap();
    let attr = fs.getattr("/a").unwrap();
    assert_eq!(attr.type_, InodeType::Directory);
    assert_eq!(attr.links_count, 2);

    fs.create("/a/f", 0o644).unwrap();
    assert_eq!(fs.write("/a/f", b"hello", 0, false).unwrap(), 5);
    assert_eq!(fs.read("/a/f", 5, 0).unwrap(), b"hello");

    fs.unlink("/a/f").unwrap();
    fs.rmdir("/a").unwrap();

    assert_eq!(fs.num_free_blocks(), BLOCKS_NUM - 1);
    assert_eq!(fs.num_free_inodes(), INODES_NUM - 1);
}

#[test]
fn test_state_survives_remount() {
    let image = tempfile::tempfile().unwrap();

    {
        let mut fs = open_image(&image);
        fs.mkdir("/docs", 0o755).unwrap();
        fs.create("/docs/big", 0o600).unwrap();
        let data = (0..MAX_FILE_SIZE).map(|i| (i % 256) as u8).collect::<Vec<_>>();
        fs.write("/docs/big", &data, 0, false).unwrap();
        fs.create("/gone", 0o644).unwrap();
        fs.unlink("/gone").unwrap();
    }

    let fs = open_image(&image);
    fs.check_filesystem().unwrap();

    assert!(fs.resolve("/gone").is_none());
    assert_eq!(fs.list_children("/"), vec!["docs"]);
    assert_eq!(fs.list_children("/docs"), vec!["big"]);

    let attr = fs.getattr("/docs/big").unwrap();
    assert_eq!(attr.size as usize, MAX_FILE_SIZE);
    assert_eq!(attr.permissions, 0o600);

    let data = fs.read("/docs/big", MAX_FILE_SIZE, 0).unwrap();
    assert!(data.iter().enumerate().all(|(i, b)| *b == (i % 256) as u8));
}

#[test]
fn test_capacity_ceiling_on_disk() {
    let image = tempfile::tempfile().unwrap();
    let mut fs = open_image(&image);
    fs.create("/f", 0o644).unwrap();

    assert!(matches!(
        fs.write("/f", b"x", MAX_FILE_SIZE, false),
        Err(FsError::FileTooBig)
    ));
    assert!(fs.read("/f", 1, MAX_FILE_SIZE).unwrap().is_empty());
}
