use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use chrono::{DateTime, Local};
use streamzip::zip::{DosDateTime, EndOfCentralDirectory};
use streamzip::{ByteSink, FileSink, LocalFs, MemorySink, ZipBuilder, ZipStreamWriter};
use tempfile::TempDir;

const LOREM: &[u8] = b"Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do \
eiusmod tempor incididunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, \
quis nostrud exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat.\n";

/// project/
///   README.md
///   src/
///     lib.rs
///     data/
///       big.bin
///       empty
fn fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("project");
    fs::create_dir_all(root.join("src/data")).unwrap();
    fs::write(root.join("README.md"), LOREM.repeat(3)).unwrap();
    fs::write(root.join("src/lib.rs"), b"pub fn answer() -> u32 { 42 }\n").unwrap();
    let big: Vec<u8> = (0..200_000u32).map(|i| (i * 31 % 253) as u8).collect();
    fs::write(root.join("src/data/big.bin"), big).unwrap();
    fs::write(root.join("src/data/empty"), b"").unwrap();
    dir
}

fn read_all(archive: &mut zip::ZipArchive<Cursor<Vec<u8>>>, name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    archive
        .by_name(name)
        .expect("entry present")
        .read_to_end(&mut out)
        .expect("entry decompresses");
    out
}

#[tokio::test]
async fn folder_tree_round_trip() {
    let dir = fixture();
    let mut writer =
        ZipStreamWriter::new(MemorySink::new(), LocalFs::with_chunk_size(1000)).with_root(dir.path());

    writer.add_folder(Path::new("project")).await.unwrap();
    writer.close().await.unwrap();

    let names: Vec<_> = writer.entries().iter().map(|e| e.name.clone()).collect();
    assert_eq!(
        names,
        [
            "project/",
            "project/README.md",
            "project/src/",
            "project/src/data/",
            "project/src/data/big.bin",
            "project/src/data/empty",
            "project/src/lib.rs",
        ]
    );

    let bytes = writer.into_inner().into_inner();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(archive.len(), 7);

    let project = dir.path().join("project");
    for name in ["README.md", "src/lib.rs", "src/data/big.bin", "src/data/empty"] {
        let expected = fs::read(project.join(name)).unwrap();
        let actual = read_all(&mut archive, &format!("project/{name}"));
        assert_eq!(actual, expected, "{name}");
    }
    assert!(archive.by_name("project/src/data/").unwrap().is_dir());
}

#[tokio::test]
async fn central_directory_follows_last_descriptor() {
    let dir = fixture();
    let mut writer = ZipStreamWriter::new(MemorySink::new(), LocalFs::new()).with_root(dir.path());

    writer.add_file(Path::new("project/README.md")).await.unwrap();
    writer.add_folder(Path::new("project/src")).await.unwrap();
    let before_close = writer.bytes_written();
    let entries = writer.entries().len();
    writer.close().await.unwrap();

    let bytes = writer.into_inner().into_inner();
    let eocd =
        EndOfCentralDirectory::from_bytes(&bytes[bytes.len() - EndOfCentralDirectory::SIZE..])
            .unwrap();

    assert_eq!(eocd.cd_offset as u64, before_close);
    assert_eq!(eocd.total_entries as usize, entries);
    assert_eq!(eocd.disk_entries, eocd.total_entries);
    assert_eq!(
        before_close + eocd.cd_size as u64 + EndOfCentralDirectory::SIZE as u64,
        bytes.len() as u64
    );

    let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(archive.len(), entries);
}

#[tokio::test]
async fn crc_and_sizes_match_content() {
    let dir = fixture();
    let path = dir.path().join("project/src/data/big.bin");
    let content = fs::read(&path).unwrap();

    let mut writer = ZipStreamWriter::new(MemorySink::new(), LocalFs::with_chunk_size(4096));
    writer.add_file(&path).await.unwrap();

    let entry = &writer.entries()[0];
    let mut crc = flate2::Crc::new();
    crc.update(&content);
    assert_eq!(entry.crc32, crc.sum());
    assert_eq!(entry.uncompressed_size as usize, content.len());
    assert!(entry.compressed_size < entry.uncompressed_size);

    // without a root the name is the path itself
    assert!(entry.name.ends_with("project/src/data/big.bin"));
    assert!(!entry.name.starts_with('/'));
}

#[tokio::test]
async fn timestamps_come_from_file_metadata() {
    let dir = fixture();
    let mut writer = ZipStreamWriter::new(MemorySink::new(), LocalFs::new()).with_root(dir.path());
    writer.add_file(Path::new("project/README.md")).await.unwrap();
    writer.close().await.unwrap();

    let modified = fs::metadata(dir.path().join("project/README.md"))
        .unwrap()
        .modified()
        .unwrap();
    let expected = DosDateTime::from_datetime(&DateTime::<Local>::from(modified).naive_local());

    let bytes = writer.into_inner().into_inner();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let file = archive.by_index(0).unwrap();
    let stamp = file.last_modified();

    let (year, month, day) = expected.date_parts();
    let (hour, minute, second) = expected.time_parts();
    assert_eq!((stamp.year(), stamp.month(), stamp.day()), (year, month, day));
    assert_eq!((stamp.hour(), stamp.minute(), stamp.second()), (hour, minute, second));
}

#[tokio::test]
async fn writes_to_file_sink() {
    let dir = fixture();
    let out = dir.path().join("out.zip");

    let sink = FileSink::create(&out).await.unwrap();
    let mut writer = ZipStreamWriter::new(sink, LocalFs::new()).with_root(dir.path().join("project"));
    writer.add_path(Path::new("src")).await.unwrap();
    writer.add_path(Path::new("README.md")).await.unwrap();
    writer.close().await.unwrap();

    let written = writer.sink().bytes_written();
    let bytes = fs::read(&out).unwrap();
    assert_eq!(bytes.len() as u64, written);

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(archive.len(), 6);
    assert_eq!(read_all(&mut archive, "README.md"), LOREM.repeat(3));
    assert_eq!(read_all(&mut archive, "src/lib.rs"), b"pub fn answer() -> u32 { 42 }\n");
}

#[tokio::test]
async fn streaming_and_buffered_agree_on_content() {
    let dir = fixture();
    let project = dir.path().join("project");

    let mut streamed = ZipStreamWriter::new(MemorySink::new(), LocalFs::new()).with_root(&project);
    streamed.add_file(Path::new("README.md")).await.unwrap();
    streamed.close().await.unwrap();

    let mut buffered = ZipBuilder::new();
    buffered
        .add_file("README.md", &fs::read(project.join("README.md")).unwrap())
        .unwrap();

    assert_eq!(streamed.entries()[0].crc32, buffered.entries()[0].crc32);
    assert_eq!(
        streamed.entries()[0].uncompressed_size,
        buffered.entries()[0].uncompressed_size
    );

    let mut from_stream =
        zip::ZipArchive::new(Cursor::new(streamed.into_inner().into_inner())).unwrap();
    let mut from_buffer = zip::ZipArchive::new(Cursor::new(buffered.finalize().unwrap())).unwrap();
    assert_eq!(
        read_all(&mut from_stream, "README.md"),
        read_all(&mut from_buffer, "README.md")
    );
}

#[tokio::test]
async fn archive_inside_archived_folder_is_skipped() {
    let dir = fixture();
    let project = dir.path().join("project");
    let out = project.join("out.zip");

    let sink = FileSink::create(&out).await.unwrap();
    let mut writer = ZipStreamWriter::new(sink, LocalFs::with_chunk_size(1024))
        .with_root(&project)
        .with_exclude(fs::canonicalize(&out).unwrap());
    writer.add_path(Path::new(".")).await.unwrap();
    writer.close().await.unwrap();

    let names: Vec<_> = writer.entries().iter().map(|e| e.name.clone()).collect();
    assert!(!names.iter().any(|n| n == "out.zip"));
    assert_eq!(names.len(), 6);

    let bytes = fs::read(&out).unwrap();
    assert_eq!(bytes.len() as u64, writer.bytes_written());
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(read_all(&mut archive, "README.md"), LOREM.repeat(3));
}

#[cfg(unix)]
#[tokio::test]
async fn links_to_files_are_followed_and_links_to_folders_skipped() {
    use std::os::unix::fs::symlink;

    let dir = fixture();
    let project = dir.path().join("project");
    symlink(project.join("README.md"), project.join("readme-link")).unwrap();
    symlink(project.join("src"), project.join("src-link")).unwrap();
    symlink(project.join("gone"), project.join("dangling")).unwrap();

    let mut writer = ZipStreamWriter::new(MemorySink::new(), LocalFs::new()).with_root(dir.path());
    writer.add_folder(Path::new("project")).await.unwrap();
    writer.close().await.unwrap();

    let names: Vec<_> = writer.entries().iter().map(|e| e.name.clone()).collect();
    assert!(names.iter().any(|n| n == "project/readme-link"));
    assert!(!names.iter().any(|n| n.starts_with("project/src-link")));
    assert!(!names.iter().any(|n| n == "project/dangling"));

    let bytes = writer.into_inner().into_inner();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(read_all(&mut archive, "project/readme-link"), LOREM.repeat(3));
}
