//! An owning handle over raw file descriptors, [`FileDescriptor`], and the types it hands out.
//!
//! The handle itself doesn't open anything (apart from [`pipe`]). Whatever opened the descriptor
//! passes the raw value in and gets an owner back which closes it exactly once:
//!
//! ```no_run
//! use std::io::Write;
//!
//! use file_descriptor::fd::{FileDescriptor, SystemError};
//!
//! fn open_log() -> Result<FileDescriptor, SystemError> {
//!     // SAFETY: open returns a fresh descriptor or -1.
//!     let fd = unsafe {
//!         FileDescriptor::from_raw_checked(
//!             libc::open(c"/tmp/log".as_ptr(), libc::O_WRONLY | libc::O_APPEND),
//!             "open",
//!         )?
//!     };
//!     fd.set_cloexec()?;
//!     Ok(fd)
//! }
//!
//! let mut log = open_log().expect("log should open");
//! log.write_all(b"hello\n").expect("log should be writable");
//! ```
//!
//! # Errors
//! Only [`FileDescriptor::read`] and [`FileDescriptor::write`] use [`io::Error`](std::io::Error).
//! All other operations fail with a [`SystemError`], apart from
//! [`close`](FileDescriptor::close), which narrows the possible failures down to [`CloseError`].

mod descriptor;
mod error;
mod metadata;
mod panic;
mod pipe;


pub use descriptor::*;
pub use error::*;
pub use metadata::*;
pub use pipe::*;
