#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TarParserLimits {
  /// The largest member size a header may declare, in bytes.
  ///
  /// Larger members abort the stream before any of their data is delivered.
  pub max_file_size: u64,
}

impl Default for TarParserLimits {
  fn default() -> Self {
    Self {
      max_file_size: u64::MAX,
    }
  }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TarParserOptions {
  /// Behaves like GNU tar's `--ignore-zeros`.
  ///
  /// If true, zero blocks are skipped and never end the archive, which allows
  /// parsing concatenated archives. The parser then only stops on `finish`.
  /// If false, two consecutive zero blocks end the archive.
  pub ignore_zeros: bool,
  pub tar_parser_limits: TarParserLimits,
}
