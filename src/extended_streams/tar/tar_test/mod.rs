use alloc::{string::String, vec, vec::Vec};

use crate::{
  extended_streams::tar::{
    tar_constants::TarHeader, AuditTarViolationHandler, CollectedFile, CollectingHandler,
    FeedStatus, Flow, FnEntryHandler, ParserState, TarEntryHandler, TarParserErrorKind,
    TarParserOptions, TarStreamParser, TarTypeFlag, BLOCK_SIZE,
  },
  BytewiseWriter, ChunkedWriter, Copy as _, Write, WriteAll as _,
};

const TEST_V7: &[u8] = include_bytes!("test-v7.tar");
const TEST_USTAR: &[u8] = include_bytes!("test-ustar.tar");
const TEST_GNU: &[u8] = include_bytes!("test-gnu.tar");
const TEST_PAX: &[u8] = include_bytes!("test-pax.tar");

const LOREM: &[u8] = include_bytes!("test-archive/lorem.txt");
const MY_FILE: &[u8] = include_bytes!("test-archive/subfolder/my_file.txt");
const TEST_FILE: &[u8] = include_bytes!("test-archive/test_file.txt");

const WORKSPACE_SIZES: [usize; 4] = [BLOCK_SIZE, BLOCK_SIZE + 1, 1024, 4096];

fn expected_files() -> Vec<CollectedFile> {
  vec![
    CollectedFile {
      name: "test-archive/lorem.txt".into(),
      data: LOREM.to_vec(),
    },
    CollectedFile {
      name: "test-archive/subfolder/my_file.txt".into(),
      data: MY_FILE.to_vec(),
    },
    CollectedFile {
      name: "test-archive/test_file.txt".into(),
      data: TEST_FILE.to_vec(),
    },
  ]
}

/// Feeds `archive` in chunks of `chunk_size` bytes, zero meaning all at once.
fn collect(archive: &[u8], workspace_size: usize, chunk_size: usize) -> Vec<CollectedFile> {
  let mut workspace = vec![0_u8; workspace_size];
  let mut parser = TarStreamParser::new(&mut workspace[..], CollectingHandler::new()).unwrap();
  if chunk_size == 0 {
    assert_eq!(parser.feed(archive), Ok(FeedStatus::ArchiveEnd));
  } else {
    ChunkedWriter::new(&mut parser, chunk_size)
      .write_all(archive, false)
      .unwrap();
  }
  assert_eq!(parser.state(), ParserState::End);
  assert_eq!(parser.finish(), Ok(FeedStatus::ArchiveEnd));
  parser.into_parts().1.into_files()
}

#[test]
fn test_fixture_archives_all_formats() {
  for (format, archive) in [
    ("v7", TEST_V7),
    ("ustar", TEST_USTAR),
    ("gnu", TEST_GNU),
    ("pax", TEST_PAX),
  ] {
    for workspace_size in WORKSPACE_SIZES {
      for chunk_size in [0, 1, 7, 511, 512, 513, 4096] {
        assert_eq!(
          collect(archive, workspace_size, chunk_size),
          expected_files(),
          "format {format}, workspace {workspace_size}, chunk {chunk_size}"
        );
      }
    }
  }
}

#[test]
fn test_fixture_stats() {
  let mut workspace = [0_u8; BLOCK_SIZE];
  let mut parser = TarStreamParser::new(&mut workspace[..], CollectingHandler::new()).unwrap();
  assert_eq!(parser.feed(TEST_USTAR), Ok(FeedStatus::ArchiveEnd));
  let stats = parser.stats();
  assert_eq!(stats.headers, 5);
  assert_eq!(stats.files, 3);
  assert_eq!(stats.skipped_entries, 2);
  assert_eq!(stats.empty_blocks, 2);
  assert_eq!(stats.bytes_delivered, 3002 + 26 + 19);
  // GNU tar pads the archive to a full record of 20 blocks
  assert_eq!(stats.trailing_bytes, 10240 - 6656 - 2 * 512);

  let mut workspace = [0_u8; BLOCK_SIZE];
  let mut parser = TarStreamParser::new(&mut workspace[..], CollectingHandler::new()).unwrap();
  assert_eq!(parser.feed(TEST_PAX), Ok(FeedStatus::ArchiveEnd));
  // the extended headers are skipped like directories
  assert_eq!(parser.stats().skipped_entries, 7);
  assert_eq!(parser.stats().files, 3);
}

#[test]
fn test_pax_headers_reach_on_entry_skipped() {
  #[derive(Default)]
  struct SkipRecorder(Vec<(String, TarTypeFlag, u64)>);

  impl TarEntryHandler for SkipRecorder {
    fn on_file_start(&mut self, _name: &[u8], _size: u64) -> Flow {
      Flow::Continue
    }

    fn on_data(&mut self, _data: &[u8]) -> Flow {
      Flow::Continue
    }

    fn on_entry_skipped(&mut self, name: &[u8], typeflag: TarTypeFlag, size: u64) -> Flow {
      let name = String::from_utf8_lossy(name).into_owned();
      self.0.push((name, typeflag, size));
      Flow::Continue
    }
  }

  let mut workspace = [0_u8; BLOCK_SIZE];
  let mut parser = TarStreamParser::new(&mut workspace[..], SkipRecorder::default()).unwrap();
  assert_eq!(parser.feed(TEST_PAX), Ok(FeedStatus::ArchiveEnd));
  let skipped = &parser.handler().0;
  assert_eq!(skipped.len(), 7);
  assert_eq!(
    skipped[0],
    (
      String::from("./PaxHeaders/test-archive"),
      TarTypeFlag::PaxExtendedHeader,
      60
    )
  );
  assert_eq!(
    skipped[1],
    (String::from("test-archive/"), TarTypeFlag::Directory, 0)
  );
}

#[test]
fn test_bytewise_feeding() {
  let mut workspace = [0_u8; BLOCK_SIZE];
  let mut parser = TarStreamParser::new(&mut workspace[..], CollectingHandler::new()).unwrap();
  BytewiseWriter::new(&mut parser)
    .write_all(TEST_GNU, false)
    .unwrap();
  assert_eq!(parser.state(), ParserState::End);
  assert_eq!(parser.into_parts().1.into_files(), expected_files());
}

#[test]
fn test_copy_from_reader() {
  let mut workspace = [0_u8; 1024];
  let mut parser = TarStreamParser::new(&mut workspace[..], CollectingHandler::new()).unwrap();
  let mut source = TEST_V7;
  let mut transfer_buffer = [0_u8; 300];
  let copied = source.copy(&mut parser, &mut transfer_buffer, false);
  assert_eq!(copied, Ok(TEST_V7.len()));
  parser.flush().unwrap();
  assert_eq!(parser.into_parts().1.into_files(), expected_files());
}

#[test]
fn test_fn_handler_with_fixture() {
  let handler = FnEntryHandler::new(
    (Vec::<String>::new(), 0_u64),
    |(names, _): &mut (Vec<String>, u64), name: &[u8], _size: u64| {
      names.push(String::from_utf8_lossy(name).into_owned());
      Flow::Continue
    },
    |(_, total): &mut (Vec<String>, u64), data: &[u8]| {
      *total += data.len() as u64;
      Flow::Continue
    },
  );
  let mut workspace = [0_u8; 2048];
  let mut parser = TarStreamParser::new(&mut workspace[..], handler).unwrap();
  assert_eq!(parser.feed(TEST_USTAR), Ok(FeedStatus::ArchiveEnd));
  let (names, total) = parser.into_parts().1.into_context();
  assert_eq!(
    names,
    [
      "test-archive/lorem.txt",
      "test-archive/subfolder/my_file.txt",
      "test-archive/test_file.txt"
    ]
  );
  assert_eq!(total, 3002 + 26 + 19);
}

#[test]
fn test_v7_headers_raise_no_violations() {
  let mut workspace = [0_u8; BLOCK_SIZE];
  let mut parser = TarStreamParser::with_options(
    &mut workspace[..],
    CollectingHandler::new(),
    TarParserOptions::default(),
    AuditTarViolationHandler::new(),
  )
  .unwrap();
  assert_eq!(parser.feed(TEST_V7), Ok(FeedStatus::ArchiveEnd));
  assert!(parser.violation_handler().violations.is_empty());
}

#[test]
fn test_truncated_fixture() {
  for cut in [100, BLOCK_SIZE + 1000, 4096 + 100, 5000] {
    let mut workspace = [0_u8; BLOCK_SIZE];
    let mut parser = TarStreamParser::new(&mut workspace[..], CollectingHandler::new()).unwrap();
    assert_eq!(parser.feed(&TEST_USTAR[..cut]), Ok(FeedStatus::Continue));
    let error = parser.finish().unwrap_err();
    assert!(
      matches!(error.kind, TarParserErrorKind::UnexpectedEndOfInput { .. }),
      "cut at {cut}: {error}"
    );
  }
}

#[test]
fn test_corrupted_fixture_aborts_at_the_damaged_header() {
  let mut archive = TEST_USTAR.to_vec();
  // first byte of the my_file.txt header name
  archive[4608] ^= 0x20;

  let mut workspace = [0_u8; BLOCK_SIZE];
  let mut parser = TarStreamParser::new(&mut workspace[..], CollectingHandler::new()).unwrap();
  let error = parser.feed(&archive).unwrap_err();
  assert!(error.is_fatal());
  assert_eq!(parser.state(), ParserState::Abort);
  let files = parser.into_parts().1.into_files();
  assert_eq!(files, expected_files()[..1]);
}

/// Two files, a directory and a symlink with sizes that cross block boundaries.
fn synthetic_archive() -> (Vec<u8>, Vec<CollectedFile>) {
  let members: [(&str, TarTypeFlag, Vec<u8>); 5] = [
    ("dir/", TarTypeFlag::Directory, Vec::new()),
    (
      "dir/one.bin",
      TarTypeFlag::RegularFile,
      (0..700_u32).map(|i| (i * 7) as u8).collect(),
    ),
    ("dir/link", TarTypeFlag::SymbolicLink, Vec::new()),
    ("empty", TarTypeFlag::RegularFile, Vec::new()),
    ("two.txt", TarTypeFlag::RegularFile, b"exactly one block? no".to_vec()),
  ];

  let mut archive = Vec::new();
  let mut expected = Vec::new();
  for (name, typeflag, content) in members {
    let header = TarHeader::new_ustar(name, content.len() as u64, typeflag).unwrap();
    archive.extend_from_slice(header.as_block());
    archive.extend_from_slice(&content);
    archive.resize(archive.len().next_multiple_of(BLOCK_SIZE), 0);
    if typeflag == TarTypeFlag::RegularFile {
      expected.push(CollectedFile {
        name: name.into(),
        data: content,
      });
    }
  }
  archive.extend_from_slice(&[0; 2 * BLOCK_SIZE]);
  (archive, expected)
}

#[test]
fn test_every_chunk_size_gives_the_same_result() {
  let (archive, expected) = synthetic_archive();
  for chunk_size in 1..=archive.len() {
    let mut workspace = [0_u8; BLOCK_SIZE];
    let mut parser = TarStreamParser::new(&mut workspace[..], CollectingHandler::new()).unwrap();
    let mut status = FeedStatus::Continue;
    for chunk in archive.chunks(chunk_size) {
      status = parser.feed(chunk).unwrap();
    }
    assert_eq!(status, FeedStatus::ArchiveEnd, "chunk size {chunk_size}");
    assert_eq!(
      parser.into_parts().1.into_files(),
      expected,
      "chunk size {chunk_size}"
    );
  }
}

#[test]
fn test_reset_parses_a_second_archive() {
  let mut workspace = [0_u8; BLOCK_SIZE];
  let mut parser = TarStreamParser::new(&mut workspace[..], CollectingHandler::new()).unwrap();
  assert_eq!(parser.feed(&TEST_GNU[..5000]), Ok(FeedStatus::Continue));
  parser.reset();
  assert_eq!(parser.state(), ParserState::Header);
  assert_eq!(parser.stats().headers, 0);

  let handler = parser.handler_mut();
  *handler = CollectingHandler::new();
  assert_eq!(parser.feed(TEST_PAX), Ok(FeedStatus::ArchiveEnd));
  assert_eq!(parser.into_parts().1.into_files(), expected_files());
}

#[test]
fn test_collected_byte_limit_stops_the_parser() {
  let mut workspace = [0_u8; BLOCK_SIZE];
  let handler = CollectingHandler::new().with_max_total_bytes(1000);
  let mut parser = TarStreamParser::new(&mut workspace[..], handler).unwrap();
  let error = parser.feed(TEST_USTAR).unwrap_err();
  assert!(error.is_stopped_by_handler());
  assert_eq!(parser.state(), ParserState::Abort);
}

#[test]
fn test_latin1_file_name_keeps_its_data() {
  let mut header = TarHeader::new_ustar("placeholder", 3, TarTypeFlag::RegularFile).unwrap();
  header.name = [0; 100];
  header.name[..4].copy_from_slice(b"caf\xe9");
  header.update_checksum();
  let mut archive = header.as_block().to_vec();
  archive.extend_from_slice(b"abc");
  archive.resize(2 * BLOCK_SIZE, 0);
  archive.extend_from_slice(&[0; 2 * BLOCK_SIZE]);

  let mut parser = TarStreamParser::new([0_u8; BLOCK_SIZE], CollectingHandler::new()).unwrap();
  assert_eq!(parser.feed(&archive), Ok(FeedStatus::ArchiveEnd));
  let handler = parser.into_parts().1;
  assert_eq!(
    handler.into_files(),
    [CollectedFile {
      name: b"caf\xe9".to_vec(),
      data: b"abc".to_vec(),
    }]
  );
}
