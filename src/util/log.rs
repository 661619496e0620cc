//! Thin wrappers over `tracing`, compiled out when the `tracing` feature is disabled.

macro_rules! log_debug {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::debug!($($arg)*);
    };
}

macro_rules! log_trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::trace!($($arg)*);
    };
}

pub(crate) use log_debug;
pub(crate) use log_trace;
