use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;

use jwalk::WalkDir;
use rayon::prelude::*;

use crate::VzipError;
use crate::telemetry::{self, tags};
use crate::types::{FrameId, Result, duration_to_us};

use super::FrameSource;

/// Default extension for frame files.
pub const DEFAULT_FRAME_EXTENSION: &str = "ppm";

const PARALLEL_METADATA_THRESHOLD: usize = 256;

/// Options controlling which directory entries become frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySourceOptions {
    /// Case-insensitive extension filter without the dot; `None` accepts every regular file.
    pub extension: Option<String>,
}

impl Default for DirectorySourceOptions {
    fn default() -> Self {
        Self {
            extension: Some(DEFAULT_FRAME_EXTENSION.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
struct FrameFile {
    path: PathBuf,
    size: u64,
}

/// Frames stored as files directly inside one directory.
///
/// Files are ordered by file name (byte-wise), subdirectories are ignored.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    files: Vec<FrameFile>,
}

impl DirectorySource {
    /// Lists `root` with the default `.ppm` filter.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(root, &DirectorySourceOptions::default())
    }

    pub fn with_options(root: impl AsRef<Path>, options: &DirectorySourceOptions) -> Result<Self> {
        let root = root.as_ref();
        let started_at = Instant::now();
        let context = || format!("opening frame directory {}", root.display());
        let metadata =
            fs::metadata(root).map_err(|error| VzipError::from(error).with_context(context()))?;
        if !metadata.is_dir() {
            let error = io::Error::new(io::ErrorKind::NotADirectory, "not a directory");
            return Err(VzipError::from(error).with_context(context()));
        }

        let mut candidates = Vec::<(OsString, PathBuf)>::new();
        let walker = WalkDir::new(root)
            .skip_hidden(false)
            .min_depth(1)
            .max_depth(1);
        for entry in walker {
            let entry = entry.map_err(anyhow::Error::from)?;
            let path = entry.path();
            if !Self::matches_extension(&path, options.extension.as_deref()) {
                continue;
            }
            candidates.push((entry.file_name().to_os_string(), path));
        }
        candidates.sort_by(|left, right| left.0.cmp(&right.0));

        let stat = |(_, path): (OsString, PathBuf)| -> Result<Option<FrameFile>> {
            let metadata = fs::metadata(&path)
                .map_err(|error| VzipError::from(error).with_context(path.display().to_string()))?;
            Ok(metadata.is_file().then_some(FrameFile {
                path,
                size: metadata.len(),
            }))
        };

        let stats: Vec<Option<FrameFile>> = if candidates.len() >= PARALLEL_METADATA_THRESHOLD {
            candidates
                .into_par_iter()
                .map(stat)
                .collect::<Result<_>>()?
        } else {
            candidates.into_iter().map(stat).collect::<Result<_>>()?
        };
        let files: Vec<FrameFile> = stats.into_iter().flatten().collect();

        tracing::debug!(
            target: tags::TARGET_SOURCE,
            root = %root.display(),
            frames = files.len(),
            elapsed_us = duration_to_us(started_at.elapsed()),
            "listed frame directory"
        );

        Ok(Self {
            root: root.to_path_buf(),
            files,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a frame file.
    pub fn path(&self, frame: FrameId) -> Option<&Path> {
        self.files.get(frame.index()).map(|file| file.path.as_path())
    }

    /// Total bytes across all frames at listing time.
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|file| file.size).sum()
    }

    fn matches_extension(path: &Path, extension: Option<&str>) -> bool {
        match extension {
            None => true,
            Some(wanted) => path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted)),
        }
    }

    fn file(&self, frame: FrameId) -> Result<&FrameFile> {
        self.files
            .get(frame.index())
            .ok_or(VzipError::InvalidFormat("frame id out of range"))
    }
}

impl FrameSource for DirectorySource {
    fn frame_count(&self) -> usize {
        self.files.len()
    }

    fn frame_label(&self, frame: FrameId) -> String {
        match self.path(frame) {
            Some(path) => path.display().to_string(),
            None => frame.to_string(),
        }
    }

    fn size_hint(&self, frame: FrameId) -> Option<u64> {
        self.files.get(frame.index()).map(|file| file.size)
    }

    fn read_frame(&self, frame: FrameId, limit: usize, out: &mut Vec<u8>) -> Result<()> {
        let started_at = Instant::now();
        let file = self.file(frame)?;
        let read = File::open(&file.path)
            .and_then(|handle| handle.take(limit as u64).read_to_end(out))
            .map_err(|error| {
                VzipError::from(error).with_context(format!("reading {}", file.path.display()))
            })?;

        telemetry::increment_counter(tags::METRIC_SOURCE_READ_COUNT, 1);
        telemetry::record_histogram(tags::METRIC_SOURCE_READ_BYTES, read as u64);
        telemetry::record_histogram(
            tags::METRIC_SOURCE_READ_LATENCY_US,
            duration_to_us(started_at.elapsed()),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_filter_is_case_insensitive() {
        assert!(DirectorySource::matches_extension(
            Path::new("a/frame.PPM"),
            Some("ppm")
        ));
        assert!(!DirectorySource::matches_extension(
            Path::new("a/frame.ppm.bak"),
            Some("ppm")
        ));
        assert!(!DirectorySource::matches_extension(
            Path::new("a/ppm"),
            Some("ppm")
        ));
        assert!(DirectorySource::matches_extension(Path::new("a/notes"), None));
    }
}
