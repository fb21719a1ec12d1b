use core::{ops::Range, str::Utf8Error};

use thiserror::Error;
use zerocopy::{FromBytes, FromZeros as _, Immutable, IntoBytes, KnownLayout};

// --- Constants for the TAR Header Format ---
pub const BLOCK_SIZE: usize = 512;

/// A block of zeros for padding and end-of-archive markers.
pub const TAR_ZERO_HEADER: [u8; BLOCK_SIZE] = [0; BLOCK_SIZE];

/// Byte ranges of the header fields inside a 512 byte block.
///
/// These mirror the layout of [`TarHeader`], for code that works on a raw block
/// instead of the typed view. The checksum uses [`field_ranges::CHECKSUM`].
pub mod field_ranges {
  use core::ops::Range;

  pub const NAME: Range<usize> = 0..100;
  pub const MODE: Range<usize> = 100..108;
  pub const UID: Range<usize> = 108..116;
  pub const GID: Range<usize> = 116..124;
  pub const SIZE: Range<usize> = 124..136;
  pub const MTIME: Range<usize> = 136..148;
  pub const CHECKSUM: Range<usize> = 148..156;
  pub const TYPEFLAG: usize = 156;
  pub const LINKNAME: Range<usize> = 157..257;
  pub const MAGIC: Range<usize> = 257..263;
  pub const VERSION: Range<usize> = 263..265;
  pub const UNAME: Range<usize> = 265..297;
  pub const GNAME: Range<usize> = 297..329;
  pub const DEV_MAJOR: Range<usize> = 329..337;
  pub const DEV_MINOR: Range<usize> = 337..345;
  pub const PREFIX: Range<usize> = 345..500;
  pub const PADDING: Range<usize> = 500..512;
}

const CHECKSUM_RANGE: Range<usize> = field_ranges::CHECKSUM;

/// https://www.gnu.org/software/tar/manual/html_node/Standard.html
/// # Typeflags:
///
/// ## STANDARD:
///
/// - `0` or `\0` for regular file (also called oldgnu)
/// - `1` for hard link
/// - `2` for symbolic link
/// - `3` for character device
/// - `4` for block device
/// - `5` for directory
/// - `6` for FIFO
/// - `7` for contiguous file
///
/// ## PAX:
///
/// - `x` for extended header (precedes the file it is associated with) also known as `pax`
/// - `g` for global extended header (applies to all following entries)
///
/// ## GNU:
///
/// - `L` for long name
/// - `K` for long link name
/// - `S` for sparse file (old format for sparse files)
///
/// Only the regular file flag is delivered by the stream parser.
/// Every other flag is skipped together with its data.
#[derive(Debug, Eq, Hash, PartialEq, Clone, Copy)]
pub enum TarTypeFlag {
  /// Regular file
  RegularFile,
  /// Hard link
  HardLink,
  /// Symbolic link
  SymbolicLink,
  /// Character device
  CharacterDevice,
  /// Block device
  BlockDevice,
  /// Directory
  Directory,
  /// FIFO (named pipe)
  Fifo,
  ContiguousFile,
  /// Extended header `pax`
  PaxExtendedHeader,
  /// Global extended header `pax`
  PaxGlobalExtendedHeader,
  /// GNU extension - long file name
  LongNameGnu,
  /// GNU extension - long link name (link target)
  LongLinkNameGnu,
  /// GNU extension - sparse file
  SparseOldGnu,
  UnknownTypeFlag(u8),
}

impl From<u8> for TarTypeFlag {
  fn from(value: u8) -> Self {
    match value {
      b'\0' | b'0' => TarTypeFlag::RegularFile,
      b'1' => TarTypeFlag::HardLink,
      b'2' => TarTypeFlag::SymbolicLink,
      b'3' => TarTypeFlag::CharacterDevice,
      b'4' => TarTypeFlag::BlockDevice,
      b'5' => TarTypeFlag::Directory,
      b'6' => TarTypeFlag::Fifo,
      b'7' => TarTypeFlag::ContiguousFile,
      b'x' => TarTypeFlag::PaxExtendedHeader,
      b'g' => TarTypeFlag::PaxGlobalExtendedHeader,
      b'L' => TarTypeFlag::LongNameGnu,
      b'K' => TarTypeFlag::LongLinkNameGnu,
      b'S' => TarTypeFlag::SparseOldGnu,
      _ => TarTypeFlag::UnknownTypeFlag(value),
    }
  }
}

impl From<TarTypeFlag> for u8 {
  fn from(value: TarTypeFlag) -> Self {
    match value {
      TarTypeFlag::RegularFile => b'0',
      TarTypeFlag::HardLink => b'1',
      TarTypeFlag::SymbolicLink => b'2',
      TarTypeFlag::CharacterDevice => b'3',
      TarTypeFlag::BlockDevice => b'4',
      TarTypeFlag::Directory => b'5',
      TarTypeFlag::Fifo => b'6',
      TarTypeFlag::ContiguousFile => b'7',
      TarTypeFlag::PaxExtendedHeader => b'x',
      TarTypeFlag::PaxGlobalExtendedHeader => b'g',
      TarTypeFlag::LongNameGnu => b'L',
      TarTypeFlag::LongLinkNameGnu => b'K',
      TarTypeFlag::SparseOldGnu => b'S',
      TarTypeFlag::UnknownTypeFlag(value) => value,
    }
  }
}

/// What the stream parser does with the content of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
  /// Regular file, content is handed to the data callback.
  File,
  /// Directory, link, device or anything else, content is skipped.
  Skip,
}

/// The format family a header claims through its magic and version bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderFormat {
  V7,
  /// Shared by `ustar`, `pax` and `posix` archives.
  Ustar,
  Gnu,
  Unknown,
}

pub(crate) fn find_null_terminator_index(bytes: &[u8]) -> usize {
  bytes
    .iter()
    .position(|&b| b == b'\0')
    .unwrap_or(bytes.len())
}

/// The bytes of a NUL-padded field up to (not including) the first NUL.
#[must_use]
pub fn null_terminated_bytes(bytes: &[u8]) -> &[u8] {
  &bytes[..find_null_terminator_index(bytes)]
}

pub fn parse_null_terminated_string(bytes: &[u8]) -> Result<&str, Utf8Error> {
  core::str::from_utf8(null_terminated_bytes(bytes))
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseOctalError {
  #[error("Invalid octal digit {digit:#04x} at index {index}")]
  InvalidDigit { digit: u8, index: usize },
  #[error("Numeric field does not fit into 64 bits")]
  Overflow,
}

/// Parses a numeric header field.
///
/// Octal digits are read up to the first NUL, surrounding ASCII whitespace is ignored
/// and an empty field reads as zero. Anything other than `0..=7` is rejected.
///
/// A field whose first byte has the high bit set holds a GNU base-256 big-endian number,
/// which is how GNU tar stores sizes of 8 GiB and above.
pub fn parse_octal(bytes: &[u8]) -> Result<u64, ParseOctalError> {
  if let Some((&first, rest)) = bytes.split_first() {
    if first & 0x80 != 0 {
      return parse_base256(first, rest);
    }
  }

  let field = null_terminated_bytes(bytes);
  let offset = field.len() - field.trim_ascii_start().len();
  let digits = field.trim_ascii();

  digits
    .iter()
    .enumerate()
    .try_fold(0_u64, |value, (index, &digit)| {
      if !(b'0'..=b'7').contains(&digit) {
        return Err(ParseOctalError::InvalidDigit {
          digit,
          index: offset + index,
        });
      }
      value
        .checked_mul(8)
        .and_then(|value| value.checked_add(u64::from(digit - b'0')))
        .ok_or(ParseOctalError::Overflow)
    })
}

fn parse_base256(first: u8, rest: &[u8]) -> Result<u64, ParseOctalError> {
  // 0xff marks a negative number, which no size or id can be
  if first == 0xff {
    return Err(ParseOctalError::Overflow);
  }
  let initial = u64::from(first & 0x7f);
  rest.iter().try_fold(initial, |value, &byte| {
    value
      .checked_mul(256)
      .map(|value| value | u64::from(byte))
      .ok_or(ParseOctalError::Overflow)
  })
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeFieldError {
  #[error("Value needs {needed} bytes but the field only holds {capacity}")]
  FieldTooSmall { needed: usize, capacity: usize },
}

/// Writes `value` as zero-padded octal followed by a NUL, the way tar writers fill numeric fields.
pub fn encode_octal(field: &mut [u8], value: u64) -> Result<(), EncodeFieldError> {
  let digits_capacity = field.len().saturating_sub(1);
  let digits_needed = if value == 0 {
    1
  } else {
    (64 - value.leading_zeros() as usize).div_ceil(3)
  };
  if field.is_empty() || digits_needed > digits_capacity {
    return Err(EncodeFieldError::FieldTooSmall {
      needed: digits_needed + 1,
      capacity: field.len(),
    });
  }

  let mut remaining = value;
  for slot in field[..digits_capacity].iter_mut().rev() {
    *slot = b'0' + (remaining & 0o7) as u8;
    remaining >>= 3;
  }
  field[digits_capacity] = b'\0';
  Ok(())
}

/// Copies `bytes` into a NUL-padded field; the value may fill the field completely.
pub fn encode_bytes(field: &mut [u8], bytes: &[u8]) -> Result<(), EncodeFieldError> {
  if bytes.len() > field.len() {
    return Err(EncodeFieldError::FieldTooSmall {
      needed: bytes.len(),
      capacity: field.len(),
    });
  }
  field[..bytes.len()].copy_from_slice(bytes);
  field[bytes.len()..].fill(0);
  Ok(())
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TarHeaderChecksumError {
  #[error("Corrupt header: Invalid checksum expected {expected:?} but got {actual:?}")]
  WrongChecksum { expected: u64, actual: u64 },
  #[error("Failed to parse octal number from checksum field: {0}")]
  ParseOctalError(#[from] ParseOctalError),
}

/// A typed view over one 512 byte ustar header block.
///
/// The struct consists of byte arrays only, so it has an alignment of one and can be
/// viewed in place over any block of the workspace without copying.
/// See [`field_ranges`] for the offset of every field.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Clone)]
#[repr(C)]
pub struct TarHeader {
  /// File name, null-terminated
  pub name: [u8; 100],
  /// File mode (octal), stored as ASCII bytes
  pub mode: [u8; 8],
  /// User ID of file owner (octal), stored as ASCII bytes
  pub uid: [u8; 8],
  /// Group ID of file owner (octal), stored as ASCII bytes
  pub gid: [u8; 8],
  /// File size in bytes (octal), stored as ASCII bytes
  ///
  /// After the header block, not including the header itself.
  pub size: [u8; 12],
  /// Modification time (epoch seconds, octal), stored as ASCII bytes
  pub mtime: [u8; 12],
  /// Header checksum (space-padded), stored as ASCII bytes
  pub checksum: [u8; 8],
  /// File type flag (e.g., 0 = file, 5 = directory)
  pub typeflag: u8,
  /// Target name of a link, null-terminated
  pub linkname: [u8; 100],
  pub magic: [u8; 6],
  pub version: [u8; 2],
  /// User name, null-terminated
  pub uname: [u8; 32],
  /// Group name, null-terminated
  pub gname: [u8; 32],
  /// Major device number (octal), stored as ASCII bytes
  pub dev_major: [u8; 8],
  /// Minor device number (octal), stored as ASCII bytes
  pub dev_minor: [u8; 8],
  /// Path prefix for names longer than 100 bytes, null-terminated.
  ///
  /// Never joined with `name` by the stream parser.
  pub prefix: [u8; 155],
  pub padding: [u8; 12],
}

impl TarHeader {
  /// Used by the old `v7` format.
  pub const MAGIC_VERSION_V7: &[u8; 8] = b"\0\0\0\0\0\0\0\0";
  /// Shared by `ustar`, `pax` and `posix` formats.
  pub const MAGIC_VERSION_USTAR: &[u8; 8] = b"ustar\x0000";
  /// Used by the GNU format.
  pub const MAGIC_VERSION_GNU: &[u8; 8] = b"ustar  \0";

  /// Views a block as a header without copying it.
  #[must_use]
  pub fn from_block(block: &[u8; BLOCK_SIZE]) -> &Self {
    zerocopy::transmute_ref!(block)
  }

  /// An all-zero header, the starting point for encoding.
  #[must_use]
  pub fn new_empty() -> Self {
    Self::new_zeroed()
  }

  /// Builds a ustar header with a valid checksum.
  pub fn new_ustar(
    name: &str,
    size: u64,
    typeflag: TarTypeFlag,
  ) -> Result<Self, EncodeFieldError> {
    let mut header = Self::new_empty();
    header.set_name(name)?;
    header.set_mode(if typeflag == TarTypeFlag::Directory {
      0o755
    } else {
      0o644
    })?;
    encode_octal(&mut header.uid, 0)?;
    encode_octal(&mut header.gid, 0)?;
    header.set_size(size)?;
    header.set_mtime(0)?;
    header.set_typeflag(typeflag);
    header.set_ustar_magic();
    header.update_checksum();
    Ok(header)
  }

  #[must_use]
  pub fn as_block(&self) -> &[u8; BLOCK_SIZE] {
    zerocopy::transmute_ref!(self)
  }

  #[must_use]
  pub fn is_empty_block(&self) -> bool {
    self.as_block() == &TAR_ZERO_HEADER
  }

  #[must_use]
  pub fn header_format(&self) -> HeaderFormat {
    let mut magic_version = [0_u8; 8];
    magic_version[..6].copy_from_slice(&self.magic);
    magic_version[6..].copy_from_slice(&self.version);
    match &magic_version {
      Self::MAGIC_VERSION_V7 => HeaderFormat::V7,
      Self::MAGIC_VERSION_USTAR => HeaderFormat::Ustar,
      Self::MAGIC_VERSION_GNU => HeaderFormat::Gnu,
      _ => HeaderFormat::Unknown,
    }
  }

  /// The raw name bytes up to the first NUL.
  #[must_use]
  pub fn name_bytes(&self) -> &[u8] {
    null_terminated_bytes(&self.name)
  }

  pub fn parse_name(&self) -> Result<&str, Utf8Error> {
    parse_null_terminated_string(&self.name)
  }

  pub fn parse_mode(&self) -> Result<u32, ParseOctalError> {
    let mode = parse_octal(&self.mode)?;
    u32::try_from(mode).map_err(|_| ParseOctalError::Overflow)
  }

  pub fn parse_uid(&self) -> Result<u64, ParseOctalError> {
    parse_octal(&self.uid)
  }

  pub fn parse_gid(&self) -> Result<u64, ParseOctalError> {
    parse_octal(&self.gid)
  }

  pub fn parse_size(&self) -> Result<u64, ParseOctalError> {
    parse_octal(&self.size)
  }

  /// Seconds since the epoch.
  pub fn parse_mtime(&self) -> Result<u64, ParseOctalError> {
    parse_octal(&self.mtime)
  }

  #[must_use]
  pub fn parse_typeflag(&self) -> TarTypeFlag {
    self.typeflag.into()
  }

  pub fn parse_linkname(&self) -> Result<&str, Utf8Error> {
    parse_null_terminated_string(&self.linkname)
  }

  pub fn parse_uname(&self) -> Result<&str, Utf8Error> {
    parse_null_terminated_string(&self.uname)
  }

  pub fn parse_gname(&self) -> Result<&str, Utf8Error> {
    parse_null_terminated_string(&self.gname)
  }

  pub fn parse_dev_major(&self) -> Result<u64, ParseOctalError> {
    parse_octal(&self.dev_major)
  }

  pub fn parse_dev_minor(&self) -> Result<u64, ParseOctalError> {
    parse_octal(&self.dev_minor)
  }

  pub fn parse_prefix(&self) -> Result<&str, Utf8Error> {
    parse_null_terminated_string(&self.prefix)
  }

  /// A regular file is delivered unless its name ends with the path separator.
  #[must_use]
  pub fn entry_kind(&self) -> EntryKind {
    let is_regular = self.parse_typeflag() == TarTypeFlag::RegularFile;
    if is_regular && !self.name_bytes().ends_with(b"/") {
      EntryKind::File
    } else {
      EntryKind::Skip
    }
  }

  /// Computes the checksum of a TAR header as defined by the ustar format.
  /// The checksum field (offsets 148..156) must be treated as if it were filled with ASCII spaces (0x20).
  #[must_use]
  pub fn compute_header_checksum(&self) -> u64 {
    self
      .as_bytes()
      .iter()
      .enumerate()
      .map(|(i, &byte)| {
        if CHECKSUM_RANGE.contains(&i) {
          u64::from(b' ')
        } else {
          u64::from(byte)
        }
      })
      .sum()
  }

  pub fn verify_checksum(&self) -> Result<u64, TarHeaderChecksumError> {
    let checksum = self.compute_header_checksum();
    let expected_checksum = parse_octal(&self.checksum)?;

    if checksum == expected_checksum {
      Ok(checksum)
    } else {
      Err(TarHeaderChecksumError::WrongChecksum {
        expected: expected_checksum,
        actual: checksum,
      })
    }
  }

  pub fn set_name(&mut self, name: &str) -> Result<(), EncodeFieldError> {
    encode_bytes(&mut self.name, name.as_bytes())
  }

  pub fn set_mode(&mut self, mode: u32) -> Result<(), EncodeFieldError> {
    encode_octal(&mut self.mode, u64::from(mode))
  }

  pub fn set_size(&mut self, size: u64) -> Result<(), EncodeFieldError> {
    encode_octal(&mut self.size, size)
  }

  pub fn set_mtime(&mut self, mtime: u64) -> Result<(), EncodeFieldError> {
    encode_octal(&mut self.mtime, mtime)
  }

  pub fn set_typeflag(&mut self, typeflag: TarTypeFlag) {
    self.typeflag = typeflag.into();
  }

  pub fn set_ustar_magic(&mut self) {
    self.magic.copy_from_slice(&Self::MAGIC_VERSION_USTAR[..6]);
    self.version.copy_from_slice(&Self::MAGIC_VERSION_USTAR[6..]);
  }

  /// Stores the checksum of the current contents as six octal digits, a NUL and a space.
  ///
  /// Must be called after the last field change.
  pub fn update_checksum(&mut self) {
    let checksum = self.compute_header_checksum();
    // the largest possible sum (512 * 255) needs six octal digits
    let field = &mut self.checksum;
    let mut remaining = checksum;
    for slot in field[..6].iter_mut().rev() {
      *slot = b'0' + (remaining & 0o7) as u8;
      remaining >>= 3;
    }
    field[6] = b'\0';
    field[7] = b' ';
  }
}
