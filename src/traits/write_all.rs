use thiserror::Error;

use crate::Write;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum WriteAllError<E> {
  /// The sink stopped taking bytes before the buffer was used up.
  #[error("Sink accepted nothing after {bytes_written} bytes")]
  ZeroWrite { bytes_written: usize },
  #[error("Sink error: {0:?}")]
  Io(#[from] E),
}

/// Pushes a whole buffer into a [`Write`] sink.
///
/// Archive bytes usually reach a [`crate::TarStreamParser`] this way, often through an
/// adapter such as [`crate::ChunkedWriter`] that splits them and reports partial writes.
/// The parser itself always takes everything or fails.
pub trait WriteAll: Write {
  /// Does not flush, `sync_hint` is passed to every `write` call.
  fn write_all(
    &mut self,
    input_buffer: &[u8],
    sync_hint: bool,
  ) -> Result<(), WriteAllError<Self::WriteError>> {
    let mut bytes_written = 0;
    while bytes_written < input_buffer.len() {
      match self.write(&input_buffer[bytes_written..], sync_hint)? {
        0 => return Err(WriteAllError::ZeroWrite { bytes_written }),
        written => bytes_written += written,
      }
    }
    Ok(())
  }
}

impl<W: Write + ?Sized> WriteAll for W {}
