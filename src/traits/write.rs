#[cfg(feature = "alloc")]
use alloc::{collections::TryReserveError, vec::Vec};

/// Trait for writing bytes.
pub trait Write {
  type WriteError;
  type FlushError;

  /// Write the contents of `input_buffer` to the underlying device.
  /// Providing an empty `input_buffer` is valid and will return 0 bytes written.
  ///
  /// Returns the number of bytes written.
  /// If `sync_hint` is true, it indicates that the write should be flushed to the actual device.
  fn write(&mut self, input_buffer: &[u8], sync_hint: bool) -> Result<usize, Self::WriteError>;

  /// Flush any buffered data to the underlying device.
  /// Must be called at the end to ensure all data is written.
  fn flush(&mut self) -> Result<(), Self::FlushError>;
}

impl<W: Write + ?Sized> Write for &mut W {
  type WriteError = W::WriteError;
  type FlushError = W::FlushError;

  fn write(&mut self, input_buffer: &[u8], sync_hint: bool) -> Result<usize, Self::WriteError> {
    (**self).write(input_buffer, sync_hint)
  }

  fn flush(&mut self) -> Result<(), Self::FlushError> {
    (**self).flush()
  }
}

/// Write is implemented for `&mut [u8]` by copying into the slice, overwriting
/// its data.
///
/// Note that writing updates the slice to point to the yet unwritten part.
/// The slice will be empty when it has been completely overwritten.
///
/// If the number of bytes to be written exceeds the size of the slice, write operations will
/// return short writes: ultimately, `Ok(0)`; in this situation, `write_all` returns
/// [`crate::WriteAllError::ZeroWrite`].
impl Write for &mut [u8] {
  type WriteError = core::convert::Infallible;
  type FlushError = core::convert::Infallible;

  fn write(&mut self, input_buffer: &[u8], _sync_hint: bool) -> Result<usize, Self::WriteError> {
    let amt = core::cmp::min(input_buffer.len(), self.len());
    let (a, b) = core::mem::take(self).split_at_mut(amt);

    a.copy_from_slice(&input_buffer[..amt]);

    *self = b;
    Ok(amt)
  }

  fn flush(&mut self) -> Result<(), Self::FlushError> {
    Ok(())
  }
}

#[cfg(feature = "alloc")]
impl Write for Vec<u8> {
  type WriteError = TryReserveError;
  type FlushError = core::convert::Infallible;

  fn write(&mut self, input_buffer: &[u8], _sync_hint: bool) -> Result<usize, Self::WriteError> {
    if input_buffer.is_empty() {
      return Ok(0);
    }
    self.try_reserve(input_buffer.len())?;
    self.extend_from_slice(input_buffer);
    Ok(input_buffer.len())
  }

  fn flush(&mut self) -> Result<(), Self::FlushError> {
    Ok(())
  }
}
