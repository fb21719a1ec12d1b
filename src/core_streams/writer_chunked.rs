use crate::Write;

/// A writer that forwards data in chunks of at most `chunk_size` bytes.
///
/// Splits every write into pieces the same way a network stack or a flash driver
/// would hand them out, so consumers can be exercised with arbitrary fragmentation.
pub struct ChunkedWriter<'a, W: Write + ?Sized> {
  target_writer: &'a mut W,
  chunk_size: usize,
}

impl<'a, W: Write + ?Sized> ChunkedWriter<'a, W> {
  /// A `chunk_size` of zero is treated as one.
  #[must_use]
  pub fn new(target_writer: &'a mut W, chunk_size: usize) -> Self {
    Self {
      target_writer,
      chunk_size: chunk_size.max(1),
    }
  }
}

impl<W: Write + ?Sized> Write for ChunkedWriter<'_, W> {
  type WriteError = W::WriteError;
  type FlushError = W::FlushError;

  fn write(&mut self, input_buffer: &[u8], sync_hint: bool) -> Result<usize, Self::WriteError> {
    let mut bytes_written = 0;
    while bytes_written < input_buffer.len() {
      let end = core::cmp::min(bytes_written + self.chunk_size, input_buffer.len());
      let last = end == input_buffer.len();
      let written = self
        .target_writer
        .write(&input_buffer[bytes_written..end], sync_hint && last)?;
      if written == 0 {
        break;
      }
      bytes_written += written;
    }
    Ok(bytes_written)
  }

  fn flush(&mut self) -> Result<(), Self::FlushError> {
    self.target_writer.flush()
  }
}
