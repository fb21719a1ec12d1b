use alloc::vec::Vec;

use crate::extended_streams::tar::{Flow, TarEntryHandler};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedFile {
  /// Raw name bytes as stored in the header.
  pub name: Vec<u8>,
  pub data: Vec<u8>,
}

/// Buffers every regular file of an archive in memory.
///
/// Meant for tests and small archives. Use [`CollectingHandler::with_max_total_bytes`]
/// when the input is not trusted.
#[derive(Debug, Default)]
pub struct CollectingHandler {
  files: Vec<CollectedFile>,
  keep_only_last: bool,
  max_total_bytes: Option<u64>,
  total_bytes: u64,
}

impl CollectingHandler {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// A later member replaces an earlier one with the same name, like extracting would.
  #[must_use]
  pub fn keep_only_last(mut self, keep_only_last: bool) -> Self {
    self.keep_only_last = keep_only_last;
    self
  }

  /// Stops the parser once the content of all files exceeds `max_total_bytes`.
  #[must_use]
  pub fn with_max_total_bytes(mut self, max_total_bytes: u64) -> Self {
    self.max_total_bytes = Some(max_total_bytes);
    self
  }

  pub fn files(&self) -> &[CollectedFile] {
    &self.files
  }

  pub fn file(&self, name: impl AsRef<[u8]>) -> Option<&CollectedFile> {
    let name = name.as_ref();
    self.files.iter().rev().find(|file| file.name == name)
  }

  /// Content bytes received so far, including replaced members.
  #[must_use]
  pub fn total_bytes(&self) -> u64 {
    self.total_bytes
  }

  pub fn into_files(self) -> Vec<CollectedFile> {
    self.files
  }
}

impl TarEntryHandler for CollectingHandler {
  fn on_file_start(&mut self, name: &[u8], size: u64) -> Flow {
    if self.keep_only_last {
      self.files.retain(|file| file.name != name);
    }
    // the declared size is only a hint, it comes from untrusted input
    let capacity = usize::try_from(size).unwrap_or(0).min(64 * 1024);
    self.files.push(CollectedFile {
      name: name.to_vec(),
      data: Vec::with_capacity(capacity),
    });
    Flow::Continue
  }

  fn on_data(&mut self, data: &[u8]) -> Flow {
    let Some(file) = self.files.last_mut() else {
      return Flow::Stop;
    };
    self.total_bytes += data.len() as u64;
    if let Some(max_total_bytes) = self.max_total_bytes {
      if self.total_bytes > max_total_bytes {
        log::debug!("Collected more than {max_total_bytes} bytes, stopping");
        return Flow::Stop;
      }
    }
    file.data.extend_from_slice(data);
    Flow::Continue
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_collects_files_in_order() {
    let mut handler = CollectingHandler::new();
    assert_eq!(handler.on_file_start(b"a", 3), Flow::Continue);
    assert_eq!(handler.on_data(b"ab"), Flow::Continue);
    assert_eq!(handler.on_data(b"c"), Flow::Continue);
    assert_eq!(handler.on_file_start(b"b", 0), Flow::Continue);

    assert_eq!(handler.total_bytes(), 3);
    assert_eq!(
      handler.into_files(),
      [
        CollectedFile {
          name: "a".into(),
          data: b"abc".to_vec()
        },
        CollectedFile {
          name: "b".into(),
          data: Vec::new()
        },
      ]
    );
  }

  #[test]
  fn test_keep_only_last_replaces_earlier_members() {
    let mut handler = CollectingHandler::new().keep_only_last(true);
    assert_eq!(handler.on_file_start(b"same", 1), Flow::Continue);
    assert_eq!(handler.on_data(b"1"), Flow::Continue);
    assert_eq!(handler.on_file_start(b"other", 1), Flow::Continue);
    assert_eq!(handler.on_data(b"o"), Flow::Continue);
    assert_eq!(handler.on_file_start(b"same", 1), Flow::Continue);
    assert_eq!(handler.on_data(b"2"), Flow::Continue);

    assert_eq!(handler.files().len(), 2);
    assert_eq!(handler.file("same").unwrap().data, b"2");
    assert_eq!(handler.files()[0].name, b"other");
  }

  #[test]
  fn test_byte_limit_stops() {
    let mut handler = CollectingHandler::new().with_max_total_bytes(4);
    assert_eq!(handler.on_file_start(b"a", 10), Flow::Continue);
    assert_eq!(handler.on_data(b"abcd"), Flow::Continue);
    assert_eq!(handler.on_data(b"e"), Flow::Stop);
    assert_eq!(handler.file("a").unwrap().data, b"abcd");
  }

  #[test]
  fn test_data_without_file_start_stops() {
    let mut handler = CollectingHandler::new();
    assert_eq!(handler.on_data(b"orphan"), Flow::Stop);
  }
}
