use std::error::Error;

use derive_more::{Display, Error};

pub trait Panic: Error {
    fn panic(&self) -> ! {
        panic!("{}", self)
    }
}

#[derive(Debug, Display, Error)]
#[display("operation on empty file descriptor")]
pub struct EmptyDescriptorPanic;
impl Panic for EmptyDescriptorPanic {}

#[derive(Debug, Display, Error)]
#[display("pointer exceeded stack space")]
pub struct BadStackAddrPanic;
impl Panic for BadStackAddrPanic {}
