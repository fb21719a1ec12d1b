use crate::extended_streams::tar::TarTypeFlag;

/// Returned by every handler callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Flow {
  Continue,
  /// Abandons the stream. The parser ends up aborted and must be reset.
  Stop,
}

impl Flow {
  #[must_use]
  pub fn is_stop(self) -> bool {
    self == Flow::Stop
  }
}

impl From<bool> for Flow {
  /// `true` means continue.
  fn from(keep_going: bool) -> Self {
    if keep_going {
      Flow::Continue
    } else {
      Flow::Stop
    }
  }
}

/// Receives the contents of an archive while it streams through the parser.
///
/// Every slice handed to a callback points into the parser workspace and is only
/// valid for the duration of the call. Copy what must outlive it.
pub trait TarEntryHandler {
  /// Called once per regular file, before any of its data.
  ///
  /// `name` holds the raw bytes of the name field up to the first NUL. Archives carry
  /// no encoding information, so the name is not required to be UTF-8.
  fn on_file_start(&mut self, name: &[u8], size: u64) -> Flow;

  /// Called zero or more times per file with consecutive pieces of its content.
  ///
  /// The lengths of all pieces of one file add up to the size given to `on_file_start`.
  /// A piece is never longer than the workspace.
  fn on_data(&mut self, data: &[u8]) -> Flow;

  /// Called for directories, links and every other entry whose content is skipped.
  fn on_entry_skipped(&mut self, _name: &[u8], _typeflag: TarTypeFlag, _size: u64) -> Flow {
    Flow::Continue
  }
}

impl<H: TarEntryHandler + ?Sized> TarEntryHandler for &mut H {
  fn on_file_start(&mut self, name: &[u8], size: u64) -> Flow {
    (**self).on_file_start(name, size)
  }

  fn on_data(&mut self, data: &[u8]) -> Flow {
    (**self).on_data(data)
  }

  fn on_entry_skipped(&mut self, name: &[u8], typeflag: TarTypeFlag, size: u64) -> Flow {
    (**self).on_entry_skipped(name, typeflag, size)
  }
}

/// Drives a pair of closures with a user context that is passed through untouched.
///
/// ```
/// use ustar_stream::{Flow, FnEntryHandler};
///
/// let handler = FnEntryHandler::new(
///   0_u64,
///   |_total: &mut u64, _name: &[u8], _size: u64| Flow::Continue,
///   |total: &mut u64, data: &[u8]| {
///     *total += data.len() as u64;
///     Flow::Continue
///   },
/// );
/// assert_eq!(*handler.context(), 0);
/// ```
pub struct FnEntryHandler<C, S, D>
where
  S: FnMut(&mut C, &[u8], u64) -> Flow,
  D: FnMut(&mut C, &[u8]) -> Flow,
{
  context: C,
  on_file_start: S,
  on_data: D,
}

impl<C, S, D> FnEntryHandler<C, S, D>
where
  S: FnMut(&mut C, &[u8], u64) -> Flow,
  D: FnMut(&mut C, &[u8]) -> Flow,
{
  pub fn new(context: C, on_file_start: S, on_data: D) -> Self {
    Self {
      context,
      on_file_start,
      on_data,
    }
  }

  pub fn context(&self) -> &C {
    &self.context
  }

  pub fn context_mut(&mut self) -> &mut C {
    &mut self.context
  }

  pub fn into_context(self) -> C {
    self.context
  }
}

impl<C, S, D> TarEntryHandler for FnEntryHandler<C, S, D>
where
  S: FnMut(&mut C, &[u8], u64) -> Flow,
  D: FnMut(&mut C, &[u8]) -> Flow,
{
  fn on_file_start(&mut self, name: &[u8], size: u64) -> Flow {
    (self.on_file_start)(&mut self.context, name, size)
  }

  fn on_data(&mut self, data: &[u8]) -> Flow {
    (self.on_data)(&mut self.context, data)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_fn_handler_threads_context_through() {
    let mut handler = FnEntryHandler::new(
      (0_u32, 0_usize),
      |(files, _): &mut (u32, usize), _name: &[u8], _size: u64| {
        *files += 1;
        Flow::Continue
      },
      |(_, bytes): &mut (u32, usize), data: &[u8]| {
        *bytes += data.len();
        Flow::from(*bytes < 8)
      },
    );
    assert_eq!(handler.on_file_start(b"a", 3), Flow::Continue);
    assert_eq!(handler.on_data(b"abc"), Flow::Continue);
    assert_eq!(handler.on_data(b"defgh"), Flow::Stop);
    assert_eq!(
      handler.on_entry_skipped(b"dir/", TarTypeFlag::Directory, 0),
      Flow::Continue
    );
    assert_eq!(handler.into_context(), (1, 8));
  }

  #[test]
  fn test_flow_from_bool() {
    assert_eq!(Flow::from(true), Flow::Continue);
    assert!(Flow::from(false).is_stop());
  }
}
