use std::time::Duration;

use vzip_core::{FrameId, VzipError};

#[test]
fn converts_io_error() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    let error: VzipError = io_error.into();

    match error {
        VzipError::Io(err) => assert_eq!(err.kind(), std::io::ErrorKind::NotFound),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn converts_anyhow_error() {
    let anyhow_error = anyhow::anyhow!("boom");
    let error: VzipError = anyhow_error.into();

    match error {
        VzipError::Other(err) => assert_eq!(err.to_string(), "boom"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn attaches_context_and_finds_root() {
    let err = VzipError::FrameFailed { frame: FrameId(4) }
        .with_context("draining slots")
        .with_context("archiving frames");

    assert_eq!(
        err.to_string(),
        "archiving frames: draining slots: frame #4 failed; archive aborted"
    );
    assert!(matches!(
        err.root(),
        VzipError::FrameFailed { frame: FrameId(4) }
    ));
}

#[test]
fn frame_errors_name_frame_and_limit() {
    let too_large = VzipError::FrameTooLarge {
        frame: FrameId(2),
        size: 2_000_000,
        limit: 1_048_576,
    };
    assert_eq!(
        too_large.to_string(),
        "frame #2 is 2000000 bytes, exceeding the 1048576 byte frame limit"
    );

    let timeout = VzipError::SlotTimeout {
        frame: FrameId(0),
        waited: Duration::from_millis(25),
    };
    assert!(timeout.to_string().contains("frame #0"));
}
