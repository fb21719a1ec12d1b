#![no_std]
#[cfg(any(test, feature = "alloc"))]
extern crate alloc;

mod core_streams;
mod extended_streams;
mod traits;

pub use core_streams::*;
pub use extended_streams::*;
pub use traits::*;
