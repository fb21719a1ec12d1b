use core::convert::Infallible;

use crate::{
  extended_streams::tar::{
    corrupt_field_to_tar_err, tar_constants::TarHeader, CorruptFieldContext, EntryKind,
    HandlerCallback, HeaderFormat, IgnoreTarViolationHandler, LimitExceededContext,
    TarEntryHandler, TarHeaderParserError, TarParserError, TarParserErrorKind, TarParserLimits,
    TarParserOptions, TarViolationHandler, TarWorkspace, BLOCK_SIZE, VHW,
  },
  Write,
};

const BLOCK_SIZE_U64: u64 = BLOCK_SIZE as u64;

/// Number of zero bytes that follow `size` content bytes up to the next block boundary.
pub(crate) fn padding_after(size: u64) -> u64 {
  (BLOCK_SIZE_U64 - size % BLOCK_SIZE_U64) % BLOCK_SIZE_U64
}

/// What the bytes at the front of the workspace are interpreted as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
  /// The next 512 bytes are a header block.
  Header,
  /// Content of the current file, handed to `on_data`.
  Data,
  /// Alignment bytes or the content of a skipped entry.
  Padding,
  /// Terminal, entered on the first fatal error.
  Abort,
  /// Terminal, the end-of-archive marker has been seen.
  End,
}

/// Returned by [`TarStreamParser::feed`] when the stream is still healthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
  /// More input is expected.
  Continue,
  /// The archive ended gracefully. Further input is discarded.
  ArchiveEnd,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TarParserStats {
  /// Non-empty header blocks that passed the checksum.
  pub headers: u64,
  /// Entries announced through `on_file_start`.
  pub files: u64,
  /// Entries whose content was skipped.
  pub skipped_entries: u64,
  /// All-zero header blocks.
  pub empty_blocks: u64,
  /// Total length of all `on_data` slices.
  pub bytes_delivered: u64,
  /// Bytes received after the end of the archive.
  pub trailing_bytes: u64,
}

/// Incremental ustar parser working out of a fixed-size workspace.
///
/// Bytes are pushed in with [`TarStreamParser::feed`] (or through [`Write`]) in chunks of any
/// size. Whenever enough bytes are buffered the parser advances and reports entries to its
/// [`TarEntryHandler`]. It never allocates and never needs more than one header block of
/// workspace, file content is streamed through in workspace-sized pieces.
pub struct TarStreamParser<B, H, VH = IgnoreTarViolationHandler>
where
  B: AsRef<[u8]> + AsMut<[u8]>,
  H: TarEntryHandler,
  VH: TarViolationHandler,
{
  workspace: TarWorkspace<B>,
  handler: H,
  violation_handler: VH,

  state: ParserState,
  /// Bytes originally assigned to the current state.
  state_size: u64,
  /// Bytes still required before the current state is complete.
  state_left: u64,
  /// Successive all-zero header blocks, two of them end the archive.
  consecutive_empty_headers: u8,

  ignore_zeros: bool,
  limits: TarParserLimits,
  stats: TarParserStats,
}

impl<B, H> TarStreamParser<B, H>
where
  B: AsRef<[u8]> + AsMut<[u8]>,
  H: TarEntryHandler,
{
  /// Creates a parser with default options that tolerates recoverable violations.
  ///
  /// Fails if the workspace is smaller than one block.
  pub fn new(workspace: B, handler: H) -> Result<Self, TarParserError> {
    Self::with_options(
      workspace,
      handler,
      TarParserOptions::default(),
      IgnoreTarViolationHandler,
    )
  }
}

impl<B, H, VH> TarStreamParser<B, H, VH>
where
  B: AsRef<[u8]> + AsMut<[u8]>,
  H: TarEntryHandler,
  VH: TarViolationHandler,
{
  pub fn with_options(
    workspace: B,
    handler: H,
    options: TarParserOptions,
    violation_handler: VH,
  ) -> Result<Self, TarParserError> {
    Ok(Self {
      workspace: TarWorkspace::new(workspace)?,
      handler,
      violation_handler,
      state: ParserState::Header,
      state_size: BLOCK_SIZE_U64,
      state_left: BLOCK_SIZE_U64,
      consecutive_empty_headers: 0,
      ignore_zeros: options.ignore_zeros,
      limits: options.tar_parser_limits,
      stats: TarParserStats::default(),
    })
  }

  /// Prepares the parser for a new stream, keeping workspace, handler and options.
  pub fn reset(&mut self) {
    self.workspace.clear();
    self.enter(ParserState::Header, BLOCK_SIZE_U64);
    self.consecutive_empty_headers = 0;
    self.stats = TarParserStats::default();
  }

  #[must_use]
  pub fn state(&self) -> ParserState {
    self.state
  }

  #[must_use]
  pub fn state_size(&self) -> u64 {
    self.state_size
  }

  #[must_use]
  pub fn state_left(&self) -> u64 {
    self.state_left
  }

  /// Number of bytes buffered but not yet processed.
  #[must_use]
  pub fn buffered(&self) -> usize {
    self.workspace.len()
  }

  #[must_use]
  pub fn stats(&self) -> &TarParserStats {
    &self.stats
  }

  pub fn handler(&self) -> &H {
    &self.handler
  }

  pub fn handler_mut(&mut self) -> &mut H {
    &mut self.handler
  }

  pub fn violation_handler(&self) -> &VH {
    &self.violation_handler
  }

  /// Gives back the workspace buffer and the handler.
  pub fn into_parts(self) -> (B, H) {
    (self.workspace.into_inner(), self.handler)
  }

  /// Delivers the next chunk of the archive.
  ///
  /// Chunk boundaries carry no meaning, they may split any header or field. The whole
  /// chunk is always taken: whenever the workspace is full the current state can make
  /// progress, so bytes are staged and processed in turns until none are left.
  ///
  /// Returns an error once the stream is aborted. Every later call reports
  /// [`TarParserErrorKind::ParserAborted`] until [`TarStreamParser::reset`] is called.
  pub fn feed(&mut self, input: &[u8]) -> Result<FeedStatus, TarParserError> {
    match self.state {
      ParserState::Abort => {
        return Err(TarParserError::fatal(TarParserErrorKind::ParserAborted));
      },
      ParserState::End => {
        self.stats.trailing_bytes += input.len() as u64;
        return Ok(FeedStatus::ArchiveEnd);
      },
      _ => {},
    }

    let mut remaining = input;
    loop {
      let accepted = self.workspace.append(remaining);
      remaining = &remaining[accepted..];

      let progressed = self.drive()?;

      if self.state == ParserState::End {
        self.stats.trailing_bytes += (self.workspace.len() + remaining.len()) as u64;
        self.workspace.clear();
        return Ok(FeedStatus::ArchiveEnd);
      }
      if remaining.is_empty() {
        return Ok(FeedStatus::Continue);
      }
      if accepted == 0 && !progressed {
        unreachable!(
          "BUG: full workspace made no progress in state {:?}",
          self.state
        );
      }
    }
  }

  /// Declares the end of the input.
  ///
  /// An archive that stops at an entry boundary without its two zero blocks is a
  /// recoverable [`TarParserErrorKind::MissingEndOfArchive`] violation. Stopping inside
  /// an entry is fatal.
  pub fn finish(&mut self) -> Result<FeedStatus, TarParserError> {
    match self.state {
      ParserState::End => Ok(FeedStatus::ArchiveEnd),
      ParserState::Abort => Err(TarParserError::fatal(TarParserErrorKind::ParserAborted)),
      ParserState::Header if self.workspace.is_empty() => {
        if !self.ignore_zeros {
          let violation = TarParserError::recoverable(TarParserErrorKind::MissingEndOfArchive);
          if let Err(error) = VHW(&mut self.violation_handler).hpve(violation) {
            self.state = ParserState::Abort;
            return Err(error);
          }
        }
        log::debug!("Input finished after {} entries", self.stats.headers);
        self.state = ParserState::End;
        Ok(FeedStatus::ArchiveEnd)
      },
      state => {
        let missing = self
          .state_left
          .saturating_sub(self.workspace.len() as u64);
        let error = TarParserError::fatal(TarParserErrorKind::UnexpectedEndOfInput {
          state,
          missing,
        });
        self.state = ParserState::Abort;
        Err(VHW(&mut self.violation_handler).hfve(error))
      },
    }
  }

  /// Runs the state machine until it stops making progress.
  ///
  /// Returns whether any step consumed bytes or changed state.
  fn drive(&mut self) -> Result<bool, TarParserError> {
    let mut progressed = false;
    loop {
      let step = match self.state {
        ParserState::Header => self.state_header(),
        ParserState::Data => self.state_data(),
        ParserState::Padding => self.state_padding(),
        ParserState::Abort | ParserState::End => return Ok(progressed),
      };
      match step {
        Ok(true) => progressed = true,
        Ok(false) => return Ok(progressed),
        Err(error) => {
          log::trace!("{:?} -> Abort: {error}", self.state);
          self.state = ParserState::Abort;
          return Err(error);
        },
      }
    }
  }

  fn enter(&mut self, state: ParserState, size: u64) {
    log::trace!("{:?} -> {state:?} ({size} bytes)", self.state);
    self.state = state;
    self.state_size = size;
    self.state_left = size;
  }

  fn consume(&mut self, amount: usize) {
    self.workspace.consume(amount);
    self.state_left -= amount as u64;
  }

  fn state_header(&mut self) -> Result<bool, TarParserError> {
    if self.workspace.max_ready(self.state_left) < BLOCK_SIZE {
      // wait for the rest of the block
      return Ok(false);
    }
    let Some(block) = self.workspace.ready().first_chunk::<BLOCK_SIZE>() else {
      return Ok(false);
    };
    let header = TarHeader::from_block(block);

    if header.name[0] == 0 {
      self.consume(BLOCK_SIZE);
      self.end_of_archive_block();
      return Ok(true);
    }

    let vh = &mut VHW(&mut self.violation_handler);

    let lone_zero_block = self.consecutive_empty_headers == 1;
    self.consecutive_empty_headers = 0;

    header
      .verify_checksum()
      .map_err(|error| vh.hfve(TarParserError::fatal(TarHeaderParserError::from(error))))?;

    if lone_zero_block {
      vh.hpve(TarParserError::recoverable(TarParserErrorKind::LoneZeroBlock))?;
    }

    if header.header_format() == HeaderFormat::Unknown {
      vh.hpve(TarParserError::recoverable(
        TarHeaderParserError::UnknownHeaderMagicVersion {
          magic: header.magic,
          version: header.version,
        },
      ))?;
    }

    let size = header.parse_size().map_err(|error| {
      vh.hfve(TarParserError::fatal(corrupt_field_to_tar_err(
        CorruptFieldContext::HeaderSize,
      )(error)))
    })?;

    if size > self.limits.max_file_size {
      return Err(vh.hfve(TarParserError::fatal(TarParserErrorKind::LimitExceeded {
        limit: self.limits.max_file_size,
        context: LimitExceededContext::FileSize,
      })));
    }

    let typeflag = header.parse_typeflag();
    let entry_kind = header.entry_kind();
    let name = header.name_bytes();

    let (flow, callback, padded_size) = match entry_kind {
      EntryKind::File => {
        log::debug!("File entry \"{}\" with {size} bytes", name.escape_ascii());
        let flow = self.handler.on_file_start(name, size);
        (flow, HandlerCallback::FileStart, Some(size))
      },
      EntryKind::Skip => {
        log::debug!("Skipping {typeflag:?} entry with {size} bytes");
        let flow = self.handler.on_entry_skipped(name, typeflag, size);
        let padded_size = size.checked_next_multiple_of(BLOCK_SIZE_U64);
        (flow, HandlerCallback::EntrySkipped, padded_size)
      },
    };

    if flow.is_stop() {
      return Err(vh.hfve(TarParserError::fatal(
        TarParserErrorKind::StoppedByHandler { callback },
      )));
    }

    let Some(next_state_size) = padded_size else {
      return Err(vh.hfve(TarParserError::fatal(
        TarParserErrorKind::LimitExceeded {
          limit: u64::MAX,
          context: LimitExceededContext::FileSize,
        },
      )));
    };

    self.stats.headers += 1;
    self.consume(BLOCK_SIZE);
    match entry_kind {
      EntryKind::File => {
        self.stats.files += 1;
        self.enter(ParserState::Data, next_state_size);
      },
      EntryKind::Skip => {
        self.stats.skipped_entries += 1;
        self.enter(ParserState::Padding, next_state_size);
      },
    }
    Ok(true)
  }

  fn end_of_archive_block(&mut self) {
    self.stats.empty_blocks += 1;
    self.enter(ParserState::Header, BLOCK_SIZE_U64);
    if self.ignore_zeros {
      return;
    }
    self.consecutive_empty_headers += 1;
    if self.consecutive_empty_headers >= 2 {
      log::debug!(
        "End of archive after {} entries ({} files)",
        self.stats.headers,
        self.stats.files
      );
      self.state = ParserState::End;
    }
  }

  fn state_data(&mut self) -> Result<bool, TarParserError> {
    let ready = self.workspace.max_ready(self.state_left);
    if ready > 0 {
      let flow = self.handler.on_data(&self.workspace.ready()[..ready]);
      if flow.is_stop() {
        let error = TarParserError::fatal(TarParserErrorKind::StoppedByHandler {
          callback: HandlerCallback::Data,
        });
        return Err(VHW(&mut self.violation_handler).hfve(error));
      }
      self.consume(ready);
      self.stats.bytes_delivered += ready as u64;
    }

    if self.state_left == 0 {
      self.enter(ParserState::Padding, padding_after(self.state_size));
      return Ok(true);
    }
    Ok(ready > 0)
  }

  fn state_padding(&mut self) -> Result<bool, TarParserError> {
    let ready = self.workspace.max_ready(self.state_left);
    self.consume(ready);

    if self.state_left == 0 {
      self.enter(ParserState::Header, BLOCK_SIZE_U64);
      return Ok(true);
    }
    Ok(ready > 0)
  }
}

impl<B, H, VH> Write for TarStreamParser<B, H, VH>
where
  B: AsRef<[u8]> + AsMut<[u8]>,
  H: TarEntryHandler,
  VH: TarViolationHandler,
{
  type WriteError = TarParserError;
  type FlushError = Infallible;

  /// Feeds the buffer and reports it as fully written.
  fn write(&mut self, input_buffer: &[u8], _sync_hint: bool) -> Result<usize, Self::WriteError> {
    self.feed(input_buffer)?;
    Ok(input_buffer.len())
  }

  fn flush(&mut self) -> Result<(), Self::FlushError> {
    Ok(())
  }
}
