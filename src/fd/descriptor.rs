use std::ffi::{CStr, CString, OsString};
use std::fmt::{self, Debug, Formatter};
use std::io::{self, Read, Write};
use std::mem::MaybeUninit;
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStringExt;
use std::path::PathBuf;

use libc::{FD_CLOEXEC, F_GETFD, F_GETFL, F_SETFD, F_SETFL, O_NONBLOCK, c_int, stat};

use super::error::{CloseError, SystemError};
use super::panic::{BadStackAddrPanic, EmptyDescriptorPanic, Panic};
use super::Metadata;
use crate::util::log::{log_debug, log_trace};
use crate::util::syscall::err_no;

/// The value the OS uses for "no descriptor". Never stored, only translated at the boundary.
const SENTINEL: c_int = -1;

/// The initial buffer size when resolving links. Grown as needed.
const LINK_BUFFER_SIZE: usize = libc::PATH_MAX as usize;

/// An owned file descriptor, which is closed when dropped.
///
/// A `FileDescriptor` is either open, owning exactly one descriptor value, or empty. It can't be
/// copied or cloned, so no two handles ever own the same value. Moving it moves ownership, while
/// [`take_ownership`](FileDescriptor::take_ownership) moves ownership out from behind a `&mut` and
/// leaves the source empty. Assigning over an open handle closes its previous descriptor.
///
/// Once empty (after [`close`](FileDescriptor::close), [`release`](FileDescriptor::release) or
/// `take_ownership`), a handle stays empty until something new is assigned to it.
///
/// # Errors
/// [`read`](FileDescriptor::read) and [`write`](FileDescriptor::write) report failures as
/// [`io::Error`]s, everything else uses [`SystemError`], which names the failed call.
///
/// # Panics
/// Flag, metadata and path operations require an open handle and panic when called on an empty
/// one. Check [`is_open`](FileDescriptor::is_open) first when in doubt.
#[derive(Default)]
pub struct FileDescriptor {
    fd: Option<c_int>,
}

impl FileDescriptor {
    /// Creates an empty handle, which owns nothing.
    pub const fn new() -> FileDescriptor {
        FileDescriptor { fd: None }
    }

    /// Takes ownership of a raw descriptor value. `-1` produces an empty handle, anything else is
    /// wrapped as is, without checking that it is actually open.
    ///
    /// # Safety
    /// If `fd` isn't `-1`, it must be an open descriptor that nothing else will close or wrap.
    /// Otherwise the handle will eventually close a value that belongs to someone else.
    pub const unsafe fn from_raw(fd: c_int) -> FileDescriptor {
        FileDescriptor {
            fd: if fd == SENTINEL { None } else { Some(fd) },
        }
    }

    /// Takes ownership of the result of a descriptor-creating system call.
    ///
    /// Meant to be called directly with the return value of `open`, `socket`, `accept` and
    /// similar: if `fd` is `-1`, the call failed and the current `errno` is returned as a
    /// [`SystemError`] labelled with `operation`.
    ///
    /// # Safety
    /// The same as [`from_raw`](FileDescriptor::from_raw).
    pub unsafe fn from_raw_checked(
        fd: c_int,
        operation: &'static str,
    ) -> Result<FileDescriptor, SystemError> {
        match fd {
            SENTINEL => Err(SystemError::last(operation)),
            // SAFETY: Guaranteed by the caller.
            fd => Ok(unsafe { FileDescriptor::from_raw(fd) }),
        }
    }

    /// Returns true if this handle owns a descriptor.
    pub const fn is_open(&self) -> bool {
        self.fd.is_some()
    }

    /// The owned descriptor value, without giving up ownership.
    pub const fn raw(&self) -> Option<c_int> {
        self.fd
    }

    /// Moves ownership into a new handle, leaving this one empty.
    ///
    /// Not named `take`, which would be shadowed by [`Read::take`] wherever `Read` is in scope.
    pub const fn take_ownership(&mut self) -> FileDescriptor {
        FileDescriptor { fd: self.fd.take() }
    }

    /// Gives up ownership without closing, returning the raw value to the caller, who is then
    /// responsible for closing it. Returns `None` if the handle was already empty.
    pub fn release(&mut self) -> Option<c_int> {
        let fd = self.fd.take();
        log_trace!(?fd, "released file descriptor");
        fd
    }

    /// Closes the owned descriptor, if any, leaving the handle empty.
    ///
    /// The handle is empty afterwards even if an error is returned, because the kernel frees the
    /// descriptor value regardless of the outcome. Closing an empty handle does nothing.
    pub fn close(&mut self) -> Result<(), CloseError> {
        let Some(fd) = self.fd.take() else {
            return Ok(());
        };

        // SAFETY: fd was owned by self and has already been removed from it, so it can't be
        // closed a second time.
        if unsafe { libc::close(fd) } == -1 {
            let error = CloseError::from_err_no(err_no());
            log_debug!(fd, %error, "failed to close file descriptor");
            Err(error)?
        }
        Ok(())
    }

    /// Duplicates the descriptor into a new, independently owned handle with close-on-exec set.
    ///
    /// # Panics
    /// Panics if the handle is empty.
    pub fn try_clone(&self) -> Result<FileDescriptor, SystemError> {
        let fd = self.expect_open();
        // SAFETY: F_DUPFD_CLOEXEC doesn't touch memory.
        let new_fd = unsafe { libc::fcntl(fd, libc::F_DUPFD_CLOEXEC, 0) };
        // SAFETY: On success, new_fd is a fresh descriptor that nothing else knows about.
        let cloned = unsafe { FileDescriptor::from_raw_checked(new_fd, "fcntl(F_DUPFD_CLOEXEC)")? };
        log_trace!(fd, new_fd, "duplicated file descriptor");
        Ok(cloned)
    }

    /// Sets the close-on-exec flag.
    ///
    /// # Panics
    /// Panics if the handle is empty.
    pub fn set_cloexec(&self) -> Result<(), SystemError> {
        self.update_flags(FdFlags::DESCRIPTOR, FD_CLOEXEC, true)
    }

    /// Returns true if the close-on-exec flag is set.
    ///
    /// # Panics
    /// Panics if the handle is empty.
    pub fn is_cloexec(&self) -> Result<bool, SystemError> {
        Ok(self.get_flags(FdFlags::DESCRIPTOR)? & FD_CLOEXEC != 0)
    }

    /// Switches the descriptor to non-blocking I/O.
    ///
    /// # Panics
    /// Panics if the handle is empty.
    pub fn set_nonblock(&self) -> Result<(), SystemError> {
        self.update_flags(FdFlags::STATUS, O_NONBLOCK, true)
    }

    /// Switches the descriptor back to blocking I/O.
    ///
    /// # Panics
    /// Panics if the handle is empty.
    pub fn clear_nonblock(&self) -> Result<(), SystemError> {
        self.update_flags(FdFlags::STATUS, O_NONBLOCK, false)
    }

    /// Returns true if the descriptor is in non-blocking mode.
    ///
    /// # Panics
    /// Panics if the handle is empty.
    pub fn is_nonblock(&self) -> Result<bool, SystemError> {
        Ok(self.get_flags(FdFlags::STATUS)? & O_NONBLOCK != 0)
    }

    /// Queries the metadata of the open file, equivalent to `fstat(2)`.
    ///
    /// # Panics
    /// Panics if the handle is empty.
    pub fn metadata(&self) -> Result<Metadata, SystemError> {
        let fd = self.expect_open();
        let mut raw_meta: MaybeUninit<stat> = MaybeUninit::uninit();
        // SAFETY: raw_meta is valid for writes of a whole stat struct.
        if unsafe { libc::fstat(fd, raw_meta.as_mut_ptr()) } == -1 {
            match err_no() {
                libc::EFAULT => BadStackAddrPanic.panic(),
                e => Err(SystemError::new(e, "fstat"))?,
            }
        }
        // SAFETY: fstat either initializes raw_meta or returns an error and diverges.
        let raw = unsafe { raw_meta.assume_init() };

        Ok(Metadata::from_stat(raw))
    }

    /// Returns the path the descriptor was opened with, as currently known to the kernel.
    ///
    /// The path reflects later renames. If the file has been deleted, the kernel appends
    /// `" (deleted)"`.
    ///
    /// # Panics
    /// Panics if the handle is empty.
    pub fn opened_path(&self) -> Result<PathBuf, SystemError> {
        let fd = self.expect_open();
        let proc_path = CString::new(format!("/proc/self/fd/{fd}"))
            .map_err(|_| SystemError::new(libc::EINVAL, "readlink"))?;
        read_link_at(libc::AT_FDCWD, &proc_path, "readlink")
    }

    /// Returns the target of the symbolic link this descriptor refers to.
    ///
    /// This only works for descriptors opened on the link itself, i.e. with
    /// `O_PATH | O_NOFOLLOW`. Any other descriptor produces the OS error (`ENOENT`).
    ///
    /// # Panics
    /// Panics if the handle is empty.
    pub fn read_symbolic_link(&self) -> Result<PathBuf, SystemError> {
        read_link_at(self.expect_open(), c"", "readlinkat")
    }

    /// Performs a single `read(2)` into `buf`, returning the number of bytes read.
    ///
    /// Fewer bytes than requested is a normal outcome, and `Ok(0)` means end of input (or an
    /// empty `buf`). Nothing is retried, including `EINTR` and `EAGAIN`. An empty handle fails
    /// with `EBADF`, as the OS would for `-1`.
    pub fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(fd) = self.fd else {
            return Err(io::Error::from_raw_os_error(libc::EBADF));
        };
        // SAFETY: buf is valid for writes of buf.len() bytes.
        match unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) } {
            -1 => Err(io::Error::last_os_error()),
            count => Ok(count as usize),
        }
    }

    /// Performs a single `write(2)` from `buf`, returning the number of bytes written.
    ///
    /// Like [`read`](FileDescriptor::read), short writes are success and nothing is retried.
    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let Some(fd) = self.fd else {
            return Err(io::Error::from_raw_os_error(libc::EBADF));
        };
        // SAFETY: buf is valid for reads of buf.len() bytes.
        match unsafe { libc::write(fd, buf.as_ptr().cast(), buf.len()) } {
            -1 => Err(io::Error::last_os_error()),
            count => Ok(count as usize),
        }
    }

    /// Converts into the standard library's owned descriptor, or `None` if empty.
    pub fn into_owned_fd(mut self) -> Option<OwnedFd> {
        // SAFETY: Ownership of the value moves from self to the OwnedFd.
        self.release().map(|fd| unsafe { OwnedFd::from_raw_fd(fd) })
    }

    fn expect_open(&self) -> c_int {
        match self.fd {
            Some(fd) => fd,
            None => EmptyDescriptorPanic.panic(),
        }
    }

    fn get_flags(&self, flags: FdFlags) -> Result<c_int, SystemError> {
        let fd = self.expect_open();
        // SAFETY: F_GETFD and F_GETFL don't touch memory.
        match unsafe { libc::fcntl(fd, flags.get) } {
            -1 => Err(SystemError::last(flags.get_label)),
            value => Ok(value),
        }
    }

    fn update_flags(&self, flags: FdFlags, flag: c_int, enable: bool) -> Result<(), SystemError> {
        let current = self.get_flags(flags)?;
        let updated = if enable { current | flag } else { current & !flag };
        if updated == current {
            return Ok(());
        }

        // SAFETY: F_SETFD and F_SETFL don't touch memory. expect_open passed in get_flags.
        if unsafe { libc::fcntl(self.expect_open(), flags.set, updated) } == -1 {
            Err(SystemError::last(flags.set_label))?
        }
        Ok(())
    }
}

/// A pair of `fcntl` commands for reading and writing one set of flags.
#[derive(Clone, Copy)]
struct FdFlags {
    get: c_int,
    set: c_int,
    get_label: &'static str,
    set_label: &'static str,
}

impl FdFlags {
    const DESCRIPTOR: FdFlags = FdFlags {
        get: F_GETFD,
        set: F_SETFD,
        get_label: "fcntl(F_GETFD)",
        set_label: "fcntl(F_SETFD)",
    };

    const STATUS: FdFlags = FdFlags {
        get: F_GETFL,
        set: F_SETFL,
        get_label: "fcntl(F_GETFL)",
        set_label: "fcntl(F_SETFL)",
    };
}

/// `readlinkat(2)`, growing the buffer until the whole target fits.
fn read_link_at(dir_fd: c_int, path: &CStr, label: &'static str) -> Result<PathBuf, SystemError> {
    let mut buf: Vec<u8> = Vec::with_capacity(LINK_BUFFER_SIZE);
    loop {
        // SAFETY: buf has room for buf.capacity() bytes and path is NUL-terminated.
        let count = unsafe {
            libc::readlinkat(dir_fd, path.as_ptr(), buf.as_mut_ptr().cast(), buf.capacity())
        };
        if count == -1 {
            Err(SystemError::last(label))?
        }

        let count = count as usize;
        if count < buf.capacity() {
            // SAFETY: readlinkat initialized the first count bytes.
            unsafe { buf.set_len(count) };
            return Ok(PathBuf::from(OsString::from_vec(buf)));
        }
        // A result that fills the buffer may have been truncated.
        buf.reserve(buf.capacity() * 2);
    }
}

impl Drop for FileDescriptor {
    fn drop(&mut self) {
        if let Some(fd) = self.fd.take() {
            // SAFETY: After this, the descriptor is invalidated but we are dropping self so it
            // doesn't matter. Errors can't be reported from here.
            if unsafe { libc::close(fd) } == -1 {
                log_debug!(
                    fd,
                    error = %CloseError::from_err_no(err_no()),
                    "failed to close file descriptor while dropping"
                );
            }
        }
    }
}

impl Debug for FileDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.fd {
            Some(fd) => write!(f, "FileDescriptor({fd})"),
            None => write!(f, "FileDescriptor(<empty>)"),
        }
    }
}

impl AsRawFd for FileDescriptor {
    /// Returns `-1` for an empty handle.
    fn as_raw_fd(&self) -> RawFd {
        self.fd.unwrap_or(SENTINEL)
    }
}

impl From<OwnedFd> for FileDescriptor {
    fn from(value: OwnedFd) -> Self {
        FileDescriptor {
            fd: Some(value.into_raw_fd()),
        }
    }
}

impl Read for &FileDescriptor {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        FileDescriptor::read(*self, buf)
    }
}

impl Read for FileDescriptor {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        FileDescriptor::read(self, buf)
    }
}

impl Write for &FileDescriptor {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        FileDescriptor::write(*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Write for FileDescriptor {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        FileDescriptor::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
