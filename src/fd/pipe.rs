use libc::{O_CLOEXEC, c_int};

use super::{FileDescriptor, SystemError};

/// Creates a pipe, returning its read and write ends, in that order. Both ends have close-on-exec
/// set.
pub fn pipe() -> Result<(FileDescriptor, FileDescriptor), SystemError> {
    let mut fds: [c_int; 2] = [-1; 2];
    // SAFETY: fds has room for the two descriptors pipe2 writes.
    if unsafe { libc::pipe2(fds.as_mut_ptr(), O_CLOEXEC) } == -1 {
        Err(SystemError::last("pipe2"))?
    }

    // SAFETY: pipe2 succeeded, so both values are fresh descriptors owned by nobody else.
    unsafe { Ok((FileDescriptor::from_raw(fds[0]), FileDescriptor::from_raw(fds[1]))) }
}
