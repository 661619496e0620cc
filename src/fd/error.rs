use std::fmt::{self, Display, Formatter};
use std::io::{self, ErrorKind};

use derive_more::{Display, Error, From, IsVariant};
use libc::c_int;

/// A failed system call, described by the OS error code it produced and a label naming the
/// operation that failed.
///
/// Displayed as `"<operation>: <os message>"`, e.g. `"open: Permission denied (os error 13)"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct SystemError {
    code: c_int,
    operation: &'static str,
}

impl SystemError {
    pub const fn new(code: c_int, operation: &'static str) -> SystemError {
        SystemError { code, operation }
    }

    /// Captures the calling thread's current `errno`. Must be called directly after the failing
    /// system call, before anything else has a chance to overwrite it.
    pub fn last(operation: &'static str) -> SystemError {
        SystemError::new(crate::util::syscall::err_no(), operation)
    }

    /// The raw OS error code (`errno`).
    pub const fn code(&self) -> c_int {
        self.code
    }

    /// The label of the operation that failed.
    pub const fn operation(&self) -> &'static str {
        self.operation
    }

    /// The system independent category of this error.
    pub fn kind(&self) -> ErrorKind {
        io::Error::from_raw_os_error(self.code).kind()
    }
}

impl Display for SystemError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.operation, io::Error::from_raw_os_error(self.code))
    }
}

impl From<SystemError> for io::Error {
    fn from(value: SystemError) -> Self {
        io::Error::new(value.kind(), value)
    }
}

#[derive(Debug, Display, Clone, PartialEq, Eq, Error)]
#[display("interrupted by signal")]
pub struct InterruptError;

#[derive(Debug, Display, Clone, PartialEq, Eq, Error)]
#[display("error during I/O")]
pub struct IOError;

#[derive(Debug, Display, Clone, PartialEq, Eq, Error)]
#[display("available storage space exhausted")]
pub struct StorageExhaustedError;

#[derive(Debug, Display, Clone, PartialEq, Eq, Error)]
#[display("not an open file descriptor")]
pub struct BadDescriptorError;

/// The ways an explicit [`close`](super::FileDescriptor::close) can fail.
///
/// Whatever the variant, the descriptor is gone afterwards. Retrying the close is never correct,
/// as the value may already belong to another file.
#[derive(Debug, Display, Clone, PartialEq, Eq, From, Error, IsVariant)]
pub enum CloseError {
    Interrupt(InterruptError),
    IO(IOError),
    StorageExhausted(StorageExhaustedError),
    BadDescriptor(BadDescriptorError),
    Unexpected(SystemError),
}

impl CloseError {
    pub(crate) const fn from_err_no(code: c_int) -> CloseError {
        match code {
            libc::EINTR =>                 CloseError::Interrupt(InterruptError),
            libc::EIO =>                   CloseError::IO(IOError),
            libc::ENOSPC | libc::EDQUOT => CloseError::StorageExhausted(StorageExhaustedError),
            libc::EBADF =>                 CloseError::BadDescriptor(BadDescriptorError),
            e =>                           CloseError::Unexpected(SystemError::new(e, "close")),
        }
    }
}
