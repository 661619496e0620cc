use std::io;

use libc::c_int;

/// Returns the calling thread's current `errno`.
pub fn err_no() -> c_int {
    // last_os_error is built from errno, so this is always Some.
    io::Error::last_os_error().raw_os_error().unwrap_or(libc::EIO)
}

