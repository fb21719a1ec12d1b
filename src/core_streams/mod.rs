mod writer_bytewise;
mod writer_chunked;

pub use writer_bytewise::*;
pub use writer_chunked::*;
