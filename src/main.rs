use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use fuser::MountOption;
use log::info;

use flatfs::fuse::FlatFsFuse;
use flatfs::storage::FileBackedStorage;
use flatfs::{FlatFs, SharedFlatFs};

#[derive(Parser)]
struct Args {
    /// Disk image; created and formatted if it does not exist or is empty
    #[arg(short, long, default_value = "filesystem.img")]
    disk_file: PathBuf,
    /// FUSE mountpoint
    mountpoint: PathBuf,
    /// Allow users other than the mounting user to access the filesystem
    #[arg(long)]
    allow_other: bool,
    /// Unmount automatically when the process exits
    #[arg(long)]
    auto_unmount: bool,
    /// Mount read-only
    #[arg(long)]
    read_only: bool,
}

impl Args {
    fn mount_options(&self) -> Vec<MountOption> {
        let mut options = vec![MountOption::FSName("flatfs".to_owned())];

        if self.allow_other {
            options.push(MountOption::AllowOther);
        }

        if self.auto_unmount {
            options.push(MountOption::AutoUnmount);
        }

        if self.read_only {
            options.push(MountOption::RO);
        }

        options
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let disk_file = File::options()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&args.disk_file)
        .with_context(|| {
            format!(
                "unable to open {} in read-write mode",
                args.disk_file.display()
            )
        })?;

    let fs =
        FlatFs::open(FileBackedStorage::new(disk_file)).context("unable to open disk image")?;

    info!(
        "mounting {} at {}",
        args.disk_file.display(),
        args.mountpoint.display()
    );

    let options = args.mount_options();
    let filesystem = FlatFsFuse::new(SharedFlatFs::new(fs));
    fuser::mount2(filesystem, &args.mountpoint, &options).context("mount failed")?;

    Ok(())
}
