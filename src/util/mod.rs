pub mod log;
pub mod panic;
pub mod syscall;
