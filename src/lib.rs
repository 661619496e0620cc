//! This crate provides [`FileDescriptor`](fd::FileDescriptor), an owning handle over a raw Linux
//! file descriptor which guarantees that the descriptor is closed exactly once.
//!
//! # Purpose
//! A descriptor value is just an integer, and the kernel reuses freed values immediately. Closing
//! one twice, or using it after closing, silently hits whatever unrelated file was opened next.
//! Everything in this crate exists to make that impossible outside of `unsafe` construction: the
//! handle is move-only, closing it always leaves it empty and dropping it closes whatever it still
//! owns.
//!
//! Opening files, sockets or pipes is left to the caller, who passes the resulting value in via
//! [`FileDescriptor::from_raw`](fd::FileDescriptor::from_raw) or
//! [`FileDescriptor::from_raw_checked`](fd::FileDescriptor::from_raw_checked). The one exception
//! is [`pipe`](fd::pipe), which is provided because it is the simplest loopback to test with.
//!
//! # Error Handling
//! Errors are split into two channels on purpose:
//! - [`read`](fd::FileDescriptor::read) and [`write`](fd::FileDescriptor::write) return
//!   [`io::Result`](std::io::Result), because failures there (`EAGAIN`, `EINTR`) are routine and
//!   callers branch on them constantly.
//! - Setup and metadata operations return a [`SystemError`](fd::SystemError) carrying the OS error
//!   code and a label naming the failed call, since those failures are rare and usually point at a
//!   bug.
//!
//! Calling an operation which requires a descriptor on an empty handle is a contract violation and
//! panics, in the same way that indexing out of bounds does.
//!
//! # Dependencies
//! The [`fd`] module relies on `libc` for its thin syscall wrappers and on `derive_more` for its
//! error types. With the default `tracing` feature enabled, close failures that can't be reported
//! (while dropping) are emitted as `tracing` debug events instead of disappearing completely.
#![cfg(target_os = "linux")]

#![warn(clippy::missing_safety_doc)]
#![warn(clippy::undocumented_unsafe_blocks)]
#![warn(clippy::missing_const_for_fn)]
#![warn(clippy::missing_panics_doc)]
#![warn(clippy::unwrap_used)]
#![allow(clippy::module_inception)]

pub mod fd;

pub(crate) mod util;
