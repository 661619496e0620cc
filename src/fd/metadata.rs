use std::time::{Duration, SystemTime};

use libc::stat;

/// A snapshot of the attributes of an open file, as reported by `fstat(2)`.
///
/// The snapshot is not updated; query [`metadata`](super::FileDescriptor::metadata) again to see
/// later changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub size: i64,             // st_size
    pub file_type: FileType,   // st_mode
    pub mode: u32,             // st_mode
    pub uid: u32,              // st_uid
    pub gid: u32,              // st_gid
    pub parent_device_id: u64, // st_dev
    pub self_device_id: u64,   // st_rdev
    // x86_64:
    pub time_accessed: (i64, i64), // st_atime, st_atime_nsec
    pub time_modified: (i64, i64), // st_mtime, st_mtime_nsec
    pub time_changed: (i64, i64),  // st_ctime, st_ctime_nsec
    pub links: u64,                // st_nlink
    pub block_size: i64,           // st_blksize
    // 64-bit:
    pub blocks: i64,    // st_blocks
    pub inode_num: u64, // st_ino
}

impl Metadata {
    #[allow(clippy::unnecessary_cast)]
    pub(crate) const fn from_stat(raw: stat) -> Metadata {
        Metadata {
            size: raw.st_size as i64,
            file_type: FileType::from_stat_mode(raw.st_mode),
            mode: raw.st_mode,
            uid: raw.st_uid,
            gid: raw.st_gid,
            parent_device_id: raw.st_dev as u64,
            self_device_id: raw.st_rdev as u64,
            time_accessed: (raw.st_atime as i64, raw.st_atime_nsec as i64),
            time_modified: (raw.st_mtime as i64, raw.st_mtime_nsec as i64),
            time_changed: (raw.st_ctime as i64, raw.st_ctime_nsec as i64),
            links: raw.st_nlink as u64,
            block_size: raw.st_blksize as i64,
            blocks: raw.st_blocks as i64,
            inode_num: raw.st_ino as u64,
        }
    }

    pub const fn is_dir(&self) -> bool {
        self.file_type.is_dir()
    }

    pub const fn is_file(&self) -> bool {
        self.file_type.is_file()
    }

    pub const fn is_symlink(&self) -> bool {
        self.file_type.is_symlink()
    }

    /// The permission bits of `mode`, including setuid, setgid and sticky.
    pub const fn permissions(&self) -> u32 {
        self.mode & 0o7777
    }

    pub fn accessed(&self) -> SystemTime {
        to_system_time(self.time_accessed)
    }

    pub fn modified(&self) -> SystemTime {
        to_system_time(self.time_modified)
    }

    pub fn changed(&self) -> SystemTime {
        to_system_time(self.time_changed)
    }
}

/// What a descriptor refers to, decoded from the `S_IFMT` bits of `st_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    BlockDevice,
    CharDevice,
    Directory,
    Fifo,
    Symlink,
    Regular,
    Socket,
    Other,
}

impl FileType {
    pub(crate) const fn from_stat_mode(st_mode: u32) -> FileType {
        match st_mode & libc::S_IFMT {
            libc::S_IFBLK =>  FileType::BlockDevice,
            libc::S_IFCHR =>  FileType::CharDevice,
            libc::S_IFDIR =>  FileType::Directory,
            libc::S_IFIFO =>  FileType::Fifo,
            libc::S_IFLNK =>  FileType::Symlink,
            libc::S_IFREG =>  FileType::Regular,
            libc::S_IFSOCK => FileType::Socket,
            _ =>              FileType::Other,
        }
    }

    pub const fn is_dir(self) -> bool {
        matches!(self, FileType::Directory)
    }

    pub const fn is_file(self) -> bool {
        matches!(self, FileType::Regular)
    }

    pub const fn is_symlink(self) -> bool {
        matches!(self, FileType::Symlink)
    }

    /// Pipes, sockets and character devices, where reads may return less than is eventually
    /// available and seeking is meaningless.
    pub const fn is_stream(self) -> bool {
        matches!(self, FileType::Fifo | FileType::Socket | FileType::CharDevice)
    }
}

fn to_system_time((secs, nsecs): (i64, i64)) -> SystemTime {
    // The kernel keeps nsecs in 0..1_000_000_000, also for times before the epoch.
    let nanos = Duration::from_nanos(nsecs as u64);
    if secs >= 0 {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs as u64) + nanos
    } else {
        SystemTime::UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs()) + nanos
    }
}
