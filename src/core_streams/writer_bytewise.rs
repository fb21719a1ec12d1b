use crate::Write;

/// A writer that forwards data byte by byte, useful for testing.
///
/// Stops early and reports a short write as soon as the target accepts zero bytes.
pub struct BytewiseWriter<'a, W: Write + ?Sized> {
  target_writer: &'a mut W,
}

impl<'a, W: Write + ?Sized> BytewiseWriter<'a, W> {
  #[must_use]
  pub fn new(target_writer: &'a mut W) -> Self {
    Self { target_writer }
  }
}

impl<W: Write + ?Sized> Write for BytewiseWriter<'_, W> {
  type WriteError = W::WriteError;
  type FlushError = W::FlushError;

  fn write(&mut self, input_buffer: &[u8], sync_hint: bool) -> Result<usize, Self::WriteError> {
    let mut bytes_written = 0;
    for (index, byte) in input_buffer.iter().enumerate() {
      // only the last byte carries the sync hint
      let last = index + 1 == input_buffer.len();
      let written = self
        .target_writer
        .write(core::slice::from_ref(byte), sync_hint && last)?;
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
