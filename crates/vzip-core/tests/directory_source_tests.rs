mod support;

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use vzip_core::{
    ArchiveReader, DirectorySource, DirectorySourceOptions, FrameId, FramePipeline, FrameSource,
    PipelineConfig, VzipError,
};

use support::frame_bytes;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn write_frames(dir: &Path, names: &[(&str, usize)]) -> std::io::Result<()> {
    for (index, (name, len)) in names.iter().enumerate() {
        fs::write(dir.join(name), frame_bytes(index, *len))?;
    }
    Ok(())
}

#[test]
fn lists_matching_files_sorted_by_name() -> TestResult {
    let dir = tempfile::tempdir()?;
    write_frames(
        dir.path(),
        &[
            ("frame_010.ppm", 30),
            ("frame_002.ppm", 20),
            ("frame_001.PPM", 10),
            ("notes.txt", 5),
            ("frame_003.ppm.bak", 5),
        ],
    )?;
    fs::create_dir(dir.path().join("nested.ppm"))?;
    fs::write(dir.path().join("nested.ppm").join("inner.ppm"), b"skip")?;

    let source = DirectorySource::open(dir.path())?;
    assert_eq!(source.frame_count(), 3);

    let names: Vec<String> = source
        .list()
        .into_iter()
        .filter_map(|frame| source.path(frame))
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["frame_001.PPM", "frame_002.ppm", "frame_010.ppm"]);
    assert_eq!(source.size_hint(FrameId(2)), Some(30));
    assert_eq!(source.total_bytes(), 60);
    Ok(())
}

#[test]
fn all_files_option_accepts_any_extension() -> TestResult {
    let dir = tempfile::tempdir()?;
    write_frames(dir.path(), &[("b.raw", 4), ("a.ppm", 4), (".hidden", 4)])?;

    let options = DirectorySourceOptions { extension: None };
    let source = DirectorySource::with_options(dir.path(), &options)?;
    assert_eq!(source.frame_count(), 3);
    assert!(
        source
            .frame_label(FrameId(0))
            .ends_with(".hidden")
    );
    Ok(())
}

#[test]
fn reads_are_bounded_by_the_limit() -> TestResult {
    let dir = tempfile::tempdir()?;
    write_frames(dir.path(), &[("a.ppm", 100)])?;
    let source = DirectorySource::open(dir.path())?;

    let mut full = Vec::new();
    source.read_frame(FrameId(0), 1000, &mut full)?;
    assert_eq!(full, frame_bytes(0, 100));

    let mut partial = Vec::new();
    source.read_frame(FrameId(0), 11, &mut partial)?;
    assert_eq!(partial.len(), 11);

    assert!(source.read_frame(FrameId(1), 10, &mut partial).is_err());
    Ok(())
}

#[test]
fn missing_directory_is_an_io_error() -> TestResult {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("nope");

    let error = DirectorySource::open(&missing).expect_err("missing directory");
    match error.root() {
        VzipError::Io(io) => assert_eq!(io.kind(), ErrorKind::NotFound),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(error.to_string().contains("nope"), "{error}");
    Ok(())
}

#[test]
fn regular_file_is_not_a_frame_directory() -> TestResult {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("frame.ppm");
    fs::write(&file, b"P6")?;

    let error = DirectorySource::open(&file).expect_err("not a directory");
    match error.root() {
        VzipError::Io(io) => assert_eq!(io.kind(), ErrorKind::NotADirectory),
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

#[test]
fn archives_a_directory_to_a_file() -> TestResult {
    let frames_dir = tempfile::tempdir()?;
    write_frames(
        frames_dir.path(),
        &[("f0.ppm", 10), ("f1.ppm", 0), ("f2.ppm", 500_000)],
    )?;
    let out_dir = tempfile::tempdir()?;
    let archive_path = out_dir.path().join("video.vzip");

    let source = DirectorySource::open(frames_dir.path())?;
    let pipeline = FramePipeline::new(PipelineConfig::with_workers(4))?;
    let stats = pipeline.archive_to_path(Arc::new(source), &archive_path)?;

    let bytes = fs::read(&archive_path)?;
    assert_eq!(bytes.len() as u64, stats.archive.bytes);
    assert_eq!(crc32fast::hash(&bytes), stats.archive.crc32);
    assert_eq!(stats.total_in(), 500_010);

    let records = ArchiveReader::new(bytes.as_slice()).collect::<Result<Vec<_>, _>>()?;
    assert_eq!(records.len(), 3);

    // Only the archive itself is left in the output directory.
    assert_eq!(fs::read_dir(out_dir.path())?.count(), 1);
    Ok(())
}

#[test]
fn oversized_frame_leaves_no_archive_behind() -> TestResult {
    let frames_dir = tempfile::tempdir()?;
    write_frames(
        frames_dir.path(),
        &[("f0.ppm", 10), ("f1.ppm", 2048), ("f2.ppm", 10)],
    )?;
    let out_dir = tempfile::tempdir()?;
    let archive_path = out_dir.path().join("video.vzip");

    let config = PipelineConfig {
        max_frame_size: 1024,
        ..PipelineConfig::with_workers(2)
    };
    let source = DirectorySource::open(frames_dir.path())?;
    let error = FramePipeline::new(config)?
        .archive_to_path(Arc::new(source), &archive_path)
        .expect_err("oversized frame");

    assert!(matches!(
        error.root(),
        VzipError::FrameTooLarge {
            frame: FrameId(1),
            size: 2048,
            ..
        }
    ));
    assert!(!archive_path.exists());
    assert_eq!(fs::read_dir(out_dir.path())?.count(), 0);
    Ok(())
}

#[test]
fn failed_run_removes_the_staging_file() -> TestResult {
    let frames_dir = tempfile::tempdir()?;
    write_frames(frames_dir.path(), &[("f0.ppm", 10), ("f1.ppm", 10)])?;
    let out_dir = tempfile::tempdir()?;
    let archive_path = out_dir.path().join("video.vzip");

    let source = DirectorySource::open(frames_dir.path())?;
    // The frame vanishes between listing and reading.
    fs::remove_file(frames_dir.path().join("f1.ppm"))?;

    let error = FramePipeline::new(PipelineConfig::with_workers(2))?
        .archive_to_path(Arc::new(source), &archive_path)
        .expect_err("missing frame");

    assert!(matches!(error.root(), VzipError::Io(_)));
    assert_eq!(fs::read_dir(out_dir.path())?.count(), 0);
    Ok(())
}
