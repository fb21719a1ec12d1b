#[cfg(feature = "alloc")]
mod collecting_handler;
mod entry_handler;
mod parser_options;
mod parsing_errors;
pub mod tar_constants;
mod tar_parser;
mod tar_violations;
mod tar_workspace;

#[cfg(feature = "alloc")]
pub use collecting_handler::*;
pub use entry_handler::*;
pub use parser_options::*;
pub use parsing_errors::*;
pub use tar_constants::{
  parse_octal, EntryKind, HeaderFormat, ParseOctalError, TarHeader, TarHeaderChecksumError,
  TarTypeFlag, BLOCK_SIZE,
};
pub use tar_parser::*;
pub use tar_violations::*;
pub use tar_workspace::*;

#[cfg(all(test, feature = "alloc"))]
mod tar_test;
