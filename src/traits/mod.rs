mod copy;
mod read;
mod write;
mod write_all;

pub use copy::*;
pub use read::*;
pub use write::*;
pub use write_all::*;
