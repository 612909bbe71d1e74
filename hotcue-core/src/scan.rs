//! Whole-file collection scans
//!
//! These read the entire export into memory and are only meant for display.
//! [`CollectionScan`] reports failures; the free functions swallow them and
//! fall back to `false` / `0`.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Serialize;
use tracing::warn;

use crate::cue::CueMarker;
use crate::error::{Error, Result};
use crate::segment::Encoding;

/// Present in every rekordbox XML export
pub const PRODUCT_MARKER: &str = "<PRODUCT Name=\"rekordbox\"";
pub const COLLECTION_MARKER: &str = "<COLLECTION";
/// One per track entry
pub const TRACK_END_MARKER: &str = "</TRACK>";

/// Summary shown before converting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CollectionStats {
    pub is_collection: bool,
    pub songs: usize,
    pub hot_cues: usize,
    pub memory_cues: usize,
}

/// Contents of a collection file loaded for counting
pub struct CollectionScan {
    contents: String,
}

impl CollectionScan {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => Error::open(path, e),
            _ => Error::from(e),
        })?;

        let contents = String::from_utf8(bytes).map_err(|e| Error::Decode {
            offset: e.utf8_error().valid_up_to() as u64,
            encoding: Encoding::Utf8,
        })?;
        Ok(Self { contents })
    }

    pub fn from_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: contents.into(),
        }
    }

    pub fn is_collection(&self) -> bool {
        self.contents.contains(PRODUCT_MARKER) && self.contents.contains(COLLECTION_MARKER)
    }

    pub fn song_count(&self) -> usize {
        self.contents.matches(TRACK_END_MARKER).count()
    }

    pub fn hot_cue_count(&self) -> usize {
        CueMarker::find_all(&self.contents)
            .filter(|m| m.is_hot_cue())
            .count()
    }

    pub fn memory_cue_count(&self) -> usize {
        CueMarker::find_all(&self.contents)
            .filter(|m| m.is_memory_cue())
            .count()
    }

    pub fn stats(&self) -> CollectionStats {
        let mut stats = CollectionStats {
            is_collection: self.is_collection(),
            songs: self.song_count(),
            ..CollectionStats::default()
        };
        for marker in CueMarker::find_all(&self.contents) {
            if marker.is_hot_cue() {
                stats.hot_cues += 1;
            } else if marker.is_memory_cue() {
                stats.memory_cues += 1;
            }
        }
        stats
    }
}

fn scan_or<T, P, F>(path: P, default: T, f: F) -> T
where
    P: AsRef<Path>,
    F: FnOnce(&CollectionScan) -> T,
{
    match CollectionScan::load(&path) {
        Ok(scan) => f(&scan),
        Err(e) => {
            warn!("Failed to scan {:?}: {}", path.as_ref(), e);
            default
        }
    }
}

/// `false` when the file cannot be read
pub fn is_collection<P: AsRef<Path>>(path: P) -> bool {
    scan_or(path, false, CollectionScan::is_collection)
}

/// `0` when the file cannot be read
pub fn song_count<P: AsRef<Path>>(path: P) -> usize {
    scan_or(path, 0, CollectionScan::song_count)
}

/// `0` when the file cannot be read
pub fn hot_cue_count<P: AsRef<Path>>(path: P) -> usize {
    scan_or(path, 0, CollectionScan::hot_cue_count)
}

/// `0` when the file cannot be read
pub fn memory_cue_count<P: AsRef<Path>>(path: P) -> usize {
    scan_or(path, 0, CollectionScan::memory_cue_count)
}
