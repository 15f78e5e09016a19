//! Moves a downloaded file from the download folder to the library.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum RelocateError {
    #[error("{filename} doesn't exist inside {root:?}")]
    NotFound { filename: String, root: PathBuf },

    #[error("couldn't read download folder {root:?}: {source}")]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("couldn't open source file {path:?}: {source}")]
    OpenSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("couldn't create destination file in {dir:?}: {source}")]
    CreateDestination {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("writing to {path:?} failed: {source}")]
    Copy {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The destination is complete, but the source is still in place.
    #[error("copied to {destination:?} but failed removing original file {source_path:?}: {source}")]
    SourceNotRemoved {
        source_path: PathBuf,
        destination: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Finds downloaded files under the download root and moves them into the
/// library.
#[derive(Debug, Clone)]
pub struct FileRelocator {
    download_root: PathBuf,
}

impl FileRelocator {
    pub fn new(download_root: impl Into<PathBuf>) -> Self {
        Self {
            download_root: download_root.into(),
        }
    }

    pub fn download_root(&self) -> &Path {
        &self.download_root
    }

    /// Path of the file under the download root named `filename`.
    ///
    /// A file whose full name equals `filename` wins, wherever it is in the
    /// tree. Status messages often drop the extension, so otherwise a file
    /// whose stem equals `filename` is taken. Among those, video files beat
    /// sidecars (cover art, `.nfo`, subtitles), then the largest file wins.
    /// Ties go to the first one in name order.
    pub fn locate(&self, filename: &str) -> Result<PathBuf, RelocateError> {
        let mut best: Option<(StemCandidate, PathBuf)> = None;

        for entry in WalkDir::new(&self.download_root).sort_by_file_name() {
            let entry = entry.map_err(|source| RelocateError::Walk {
                root: self.download_root.clone(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if entry.file_name().to_str() == Some(filename) {
                debug!("Found {} at {:?}", filename, path);
                return Ok(path.to_path_buf());
            }
            if path.file_stem().and_then(|s| s.to_str()) != Some(filename) {
                continue;
            }

            let candidate = StemCandidate {
                is_video: has_video_extension(path),
                size: entry.metadata().map(|m| m.len()).unwrap_or(0),
            };
            debug!("Candidate for {} at {:?}: {:?}", filename, path, candidate);
            if best.as_ref().map_or(true, |(current, _)| candidate > *current) {
                best = Some((candidate, path.to_path_buf()));
            }
        }

        match best {
            Some((_, path)) => {
                debug!("Found {} at {:?}", filename, path);
                Ok(path)
            }
            None => Err(RelocateError::NotFound {
                filename: filename.to_string(),
                root: self.download_root.clone(),
            }),
        }
    }

    /// Move the file named `filename` into `destination_dir` as `final_name`,
    /// keeping the original extension. Returns the new path.
    pub fn relocate(
        &self,
        filename: &str,
        destination_dir: &Path,
        final_name: &str,
    ) -> Result<PathBuf, RelocateError> {
        let source = self.locate(filename)?;
        let destination = destination_path(&source, destination_dir, final_name);
        info!("Renaming {:?} to {:?}", source, destination);
        move_file(&source, &destination)?;
        Ok(destination)
    }
}

const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "m4v", "mov", "wmv", "mpg", "mpeg", "ts", "m2ts", "webm", "flv",
];

/// Ranking of a file matched by stem only. Field order is comparison order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct StemCandidate {
    is_video: bool,
    size: u64,
}

fn has_video_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |ext| {
            VIDEO_EXTENSIONS.iter().any(|v| v.eq_ignore_ascii_case(ext))
        })
}

/// `<dir>/<final_name>.<source extension>`
pub fn destination_path(source: &Path, destination_dir: &Path, final_name: &str) -> PathBuf {
    let file_name = match source.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}.{}", final_name, ext),
        None => final_name.to_string(),
    };
    destination_dir.join(file_name)
}

/// Copy `source` to `destination`, then delete `source`.
///
/// Content is written to a temporary file next to the destination and renamed
/// into place, so `destination` is never left half written. Directories are
/// not created.
pub fn move_file(source: &Path, destination: &Path) -> Result<(), RelocateError> {
    let mut input = File::open(source).map_err(|e| RelocateError::OpenSource {
        path: source.to_path_buf(),
        source: e,
    })?;

    let dir = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut staged = NamedTempFile::new_in(dir).map_err(|e| RelocateError::CreateDestination {
        dir: dir.to_path_buf(),
        source: e,
    })?;

    let copy_error = |e: io::Error| RelocateError::Copy {
        path: destination.to_path_buf(),
        source: e,
    };
    io::copy(&mut input, staged.as_file_mut()).map_err(copy_error)?;
    staged.as_file().sync_all().map_err(copy_error)?;
    drop(input);

    staged
        .persist(destination)
        .map_err(|e| copy_error(e.error))?;

    std::fs::remove_file(source).map_err(|e| RelocateError::SourceNotRemoved {
        source_path: source.to_path_buf(),
        destination: destination.to_path_buf(),
        source: e,
    })
}
