use core::convert::Infallible;

/// Trait for reading bytes.
///
/// This is the seam where a host plugs in its archive source (flash, socket, UART).
pub trait Read {
  type ReadError;

  /// Read up to `output_buffer.len()` bytes into `output_buffer`.
  /// Providing an empty `output_buffer` is valid and will return 0 bytes read.
  ///
  /// Returns number of bytes read.
  /// On EOF, it returns 0 bytes read.
  /// Any further reads after EOF return 0 bytes read.
  fn read(&mut self, output_buffer: &mut [u8]) -> Result<usize, Self::ReadError>;
}

impl<R: Read + ?Sized> Read for &mut R {
  type ReadError = R::ReadError;

  fn read(&mut self, output_buffer: &mut [u8]) -> Result<usize, Self::ReadError> {
    (**self).read(output_buffer)
  }
}

impl Read for &[u8] {
  type ReadError = Infallible;

  fn read(&mut self, output_buffer: &mut [u8]) -> Result<usize, Self::ReadError> {
    let n = core::cmp::min(output_buffer.len(), self.len());
    let (head, tail) = self.split_at(n);
    output_buffer[..n].copy_from_slice(head);
    *self = tail;
    Ok(n)
  }
}
