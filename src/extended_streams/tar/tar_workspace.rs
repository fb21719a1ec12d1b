use crate::extended_streams::tar::{TarParserError, TarParserErrorKind, BLOCK_SIZE};

/// Fixed-capacity buffer the stream parser stages incoming bytes in.
///
/// Only the first `len()` bytes are valid. They always start at offset zero:
/// [`TarWorkspace::consume`] shifts the remaining bytes to the front, so a header
/// block can be viewed in one piece as soon as it has fully arrived.
///
/// The buffer is never grown. A borrowed `&mut [u8]` is the usual backing store,
/// owned arrays work as well.
#[derive(Debug)]
pub struct TarWorkspace<B: AsRef<[u8]> + AsMut<[u8]>> {
  buffer: B,
  /// Number of valid bytes at the front of `buffer`.
  position: usize,
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> TarWorkspace<B> {
  /// Fails if the buffer cannot hold one header block.
  pub fn new(buffer: B) -> Result<Self, TarParserError> {
    let capacity = buffer.as_ref().len();
    if capacity < BLOCK_SIZE {
      return Err(TarParserError::fatal(
        TarParserErrorKind::WorkspaceTooSmall { capacity },
      ));
    }
    Ok(Self {
      buffer,
      position: 0,
    })
  }

  #[must_use]
  pub fn capacity(&self) -> usize {
    self.buffer.as_ref().len()
  }

  /// Number of valid, unconsumed bytes.
  #[must_use]
  pub fn len(&self) -> usize {
    self.position
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.position == 0
  }

  #[must_use]
  pub fn is_full(&self) -> bool {
    self.position == self.capacity()
  }

  /// The valid bytes, oldest first.
  #[must_use]
  pub fn ready(&self) -> &[u8] {
    &self.buffer.as_ref()[..self.position]
  }

  /// Copies as much of `input` as fits behind the valid bytes.
  ///
  /// Returns the number of bytes taken, which is short when the workspace fills up.
  pub fn append(&mut self, input: &[u8]) -> usize {
    let position = self.position;
    let free = &mut self.buffer.as_mut()[position..];
    let amount = core::cmp::min(free.len(), input.len());
    free[..amount].copy_from_slice(&input[..amount]);
    self.position += amount;
    amount
  }

  /// Drops the first `amount` valid bytes and moves the rest to the front.
  pub fn consume(&mut self, amount: usize) {
    debug_assert!(
      amount <= self.position,
      "BUG: consuming {amount} bytes but only {} are valid",
      self.position
    );
    let amount = core::cmp::min(amount, self.position);
    if amount == 0 {
      return;
    }
    let position = self.position;
    self.buffer.as_mut().copy_within(amount..position, 0);
    self.position -= amount;
  }

  /// Bytes that are present, still needed by the current state and inside the buffer.
  ///
  /// This is the only bound the state machine uses to size views into the workspace.
  #[must_use]
  pub fn max_ready(&self, state_left: u64) -> usize {
    let capacity = self.capacity() as u64;
    core::cmp::min(core::cmp::min(capacity, state_left), self.position as u64) as usize
  }

  /// Forgets all valid bytes.
  pub fn clear(&mut self) {
    self.position = 0;
  }

  pub fn into_inner(self) -> B {
    self.buffer
  }
}
