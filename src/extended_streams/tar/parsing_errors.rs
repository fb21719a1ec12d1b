use core::fmt::Display;

use thiserror::Error;

use crate::extended_streams::tar::{
  tar_constants::{ParseOctalError, TarHeaderChecksumError},
  ParserState, BLOCK_SIZE,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeneralParseError {
  #[error("Invalid octal number: {0}")]
  InvalidOctalNumber(#[from] ParseOctalError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TarHeaderParserError {
  #[error("Unknown magic+version: {magic:?}+{version:?}")]
  UnknownHeaderMagicVersion { magic: [u8; 6], version: [u8; 2] },
  #[error("Checksum error: {0}")]
  CorruptHeaderChecksum(#[from] TarHeaderChecksumError),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CorruptFieldContext {
  HeaderSize,
}

impl Display for CorruptFieldContext {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match self {
      CorruptFieldContext::HeaderSize => write!(f, "header.size"),
    }
  }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LimitExceededContext {
  FileSize,
}

impl LimitExceededContext {
  pub(crate) fn context_unit(self) -> (&'static str, &'static str) {
    match self {
      Self::FileSize => ("bytes", "The declared size of an archive member is too large"),
    }
  }
}

/// The callback that asked the parser to stop.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HandlerCallback {
  FileStart,
  Data,
  EntrySkipped,
}

impl Display for HandlerCallback {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match self {
      HandlerCallback::FileStart => write!(f, "on_file_start"),
      HandlerCallback::Data => write!(f, "on_data"),
      HandlerCallback::EntrySkipped => write!(f, "on_entry_skipped"),
    }
  }
}

// Equivalent to a bool but allows searching for errors more easily.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
  Fatal,
  Recoverable,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct TarParserError {
  pub kind: TarParserErrorKind,
  pub severity: ErrorSeverity,
}

impl TarParserError {
  pub(crate) fn new<EK: Into<TarParserErrorKind>>(kind: EK, severity: ErrorSeverity) -> Self {
    Self {
      kind: kind.into(),
      severity,
    }
  }

  pub(crate) fn fatal<EK: Into<TarParserErrorKind>>(kind: EK) -> Self {
    Self::new(kind, ErrorSeverity::Fatal)
  }

  pub(crate) fn recoverable<EK: Into<TarParserErrorKind>>(kind: EK) -> Self {
    Self::new(kind, ErrorSeverity::Recoverable)
  }

  #[must_use]
  pub fn is_fatal(&self) -> bool {
    self.severity == ErrorSeverity::Fatal
  }

  /// `true` when a handler callback, not the archive, ended the stream.
  #[must_use]
  pub fn is_stopped_by_handler(&self) -> bool {
    matches!(self.kind, TarParserErrorKind::StoppedByHandler { .. })
  }
}

impl Display for TarParserError {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match self.severity {
      ErrorSeverity::Fatal => write!(f, "Fatal Tar parser error: {}", self.kind),
      ErrorSeverity::Recoverable => write!(f, "Recoverable Tar parser error: {}", self.kind),
    }
  }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TarParserErrorKind {
  #[error("Tar header parser error: {0}")]
  HeaderParserError(#[from] TarHeaderParserError),
  #[error("Limit of {limit} {unit} exceeded: {description}", unit = context.context_unit().0, description = context.context_unit().1)]
  LimitExceeded {
    limit: u64,
    context: LimitExceededContext,
  },
  #[error("Parsing field {field} failed: {error}")]
  CorruptField {
    field: CorruptFieldContext,
    error: GeneralParseError,
  },
  #[error("Workspace of {capacity} bytes is smaller than one {block} byte block", block = BLOCK_SIZE)]
  WorkspaceTooSmall { capacity: usize },
  #[error("Handler callback {callback} requested to stop")]
  StoppedByHandler { callback: HandlerCallback },
  #[error("Parser was aborted by an earlier error and must be reset")]
  ParserAborted,
  #[error("Input ended in state {state:?} with {missing} bytes outstanding")]
  UnexpectedEndOfInput { state: ParserState, missing: u64 },
  #[error("Input ended without the two zero blocks that close an archive")]
  MissingEndOfArchive,
  #[error("A single zero block was followed by another header")]
  LoneZeroBlock,
}

#[must_use]
pub(crate) fn corrupt_field_to_tar_err<T: Into<GeneralParseError>>(
  field: CorruptFieldContext,
) -> impl FnOnce(T) -> TarParserErrorKind {
  move |error| TarParserErrorKind::CorruptField {
    field,
    error: error.into(),
  }
}
