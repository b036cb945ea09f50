use std::{fs::File, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use flatfs::{storage::FileBackedStorage, FlatFs};

#[derive(Parser)]
struct Args {
    /// Disk image
    disk_file: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let disk_file = File::options().read(true).open(&args.disk_file)?;
    let storage = FileBackedStorage::new(disk_file);

    // an empty image would be formatted, which needs write access
    let fs = FlatFs::load(storage).context("unable to load disk image")?;
    fs.check_filesystem()?;

    info!(
        "{} is consistent ({} free blocks, {} free inodes)",
        args.disk_file.display(),
        fs.num_free_blocks(),
        fs.num_free_inodes()
    );

    Ok(())
}
