#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use crate::extended_streams::tar::TarParserError;

pub trait TarViolationHandler {
  /// When a violation occurs, this method is called.
  /// It should return `true` if parsing should ignore the error and continue parsing - discarding the corruption or format violation.
  ///
  /// If `is_fatal` is `true`, the parser will ignore the return value of this function.
  ///
  /// Note: A tar stream cannot be resynchronized, so checksum, size and handler errors are always fatal.
  #[must_use]
  fn handle(&mut self, error: &TarParserError, is_fatal: bool) -> bool;
}

impl<VH: TarViolationHandler + ?Sized> TarViolationHandler for &mut VH {
  fn handle(&mut self, error: &TarParserError, is_fatal: bool) -> bool {
    (**self).handle(error, is_fatal)
  }
}

#[derive(Debug, Default)]
pub struct StrictTarViolationHandler;

impl TarViolationHandler for StrictTarViolationHandler {
  fn handle(&mut self, _error: &TarParserError, _is_fatal: bool) -> bool {
    false
  }
}

#[cfg(feature = "alloc")]
#[derive(Debug, Default)]
pub struct AuditTarViolationHandler {
  pub violations: Vec<(TarParserError, bool)>,
}

#[cfg(feature = "alloc")]
impl AuditTarViolationHandler {
  #[must_use]
  pub fn new() -> Self {
    Self {
      violations: Vec::new(),
    }
  }
}

#[cfg(feature = "alloc")]
impl TarViolationHandler for AuditTarViolationHandler {
  fn handle(&mut self, error: &TarParserError, fatal_error: bool) -> bool {
    self.violations.push((error.clone(), fatal_error));
    true
  }
}

#[derive(Debug, Default)]
pub struct IgnoreTarViolationHandler;

impl TarViolationHandler for IgnoreTarViolationHandler {
  fn handle(&mut self, _error: &TarParserError, _fatal_error: bool) -> bool {
    true
  }
}

/// A wrapper around a `TarViolationHandler` that provides convenience methods for handling violations.
pub(crate) struct VHW<'a, VH: TarViolationHandler>(pub(crate) &'a mut VH);

impl<VH: TarViolationHandler> VHW<'_, VH> {
  /// Handles a potential violation in error form by calling the violation handler.
  ///
  /// Returns `Ok(())` if the handler tolerates the violation.
  pub(crate) fn hpve(&mut self, error: TarParserError) -> Result<(), TarParserError> {
    if self.0.handle(&error, false) {
      log::warn!("Tolerating tar violation: {error}");
      Ok(())
    } else {
      Err(error)
    }
  }

  /// Handles a fatal violation in error form by calling the violation handler.
  pub(crate) fn hfve(&mut self, error: TarParserError) -> TarParserError {
    let _fatal_error = self.0.handle(&error, true);
    error
  }
}
