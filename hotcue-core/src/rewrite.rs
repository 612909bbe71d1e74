//! Hot cue duplication pass
//!
//! Streams a collection export segment by segment and emits, right after
//! every segment holding a hot cue, a copy of that `POSITION_MARK` tag with
//! `Num="-1"` so the cue also shows up as a memory cue. The full output is
//! built in memory and written back to the same path in one atomic step.
//!
//! Running the pass twice duplicates the hot cues again: it only looks at
//! `Num >= 0` tags and never at the memory cues that already exist.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::cue::CueMarker;
use crate::error::{Error, Result};
use crate::segment::{Encoding, ReaderOptions, SegmentReader};

/// Joins output segments. Segments already end with their delimiter, so
/// every segment boundary gains one newline in the rewritten file.
pub const SEGMENT_SEPARATOR: &str = "\n";

/// How many hot cue markers are taken from one segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerScan {
    /// First hot cue only. With the default `>` delimiter a segment never
    /// holds more than one complete tag.
    #[default]
    First,
    /// Every hot cue in the segment, in order
    All,
}

#[derive(Debug, Clone, Default)]
pub struct RewriteOptions {
    pub reader: ReaderOptions,
    pub scan: MarkerScan,
}

/// Result of a successful pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RewriteSummary {
    /// Segments read from the source
    pub segments: usize,
    /// Memory cue copies inserted
    pub duplicated: usize,
    pub bytes_written: usize,
}

/// Output segments of a pass, before they are joined
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteOutput {
    pub segments: Vec<String>,
    pub duplicated: usize,
}

impl RewriteOutput {
    pub fn contents(&self) -> String {
        self.segments.join(SEGMENT_SEPARATOR)
    }
}

/// Duplicate hot cues of the file at `path` with default options
///
/// `on_progress` is called once per inserted copy with the running count,
/// starting at 1.
pub fn rewrite<P, F>(path: P, on_progress: F) -> Result<RewriteSummary>
where
    P: AsRef<Path>,
    F: FnMut(usize),
{
    rewrite_with(path, &RewriteOptions::default(), on_progress)
}

/// Like [`rewrite`]; the file is read and written back in `options.reader.encoding`
pub fn rewrite_with<P, F>(
    path: P,
    options: &RewriteOptions,
    on_progress: F,
) -> Result<RewriteSummary>
where
    P: AsRef<Path>,
    F: FnMut(usize),
{
    let path = path.as_ref();
    let mut reader = SegmentReader::open_with(path, &options.reader)?;

    let output = rewrite_segments(&mut reader, options.scan, on_progress);
    reader.close();
    let output = output?;

    let contents = encode_contents(&output.contents(), options.reader.encoding)?;
    write_atomic(path, &contents)?;

    let summary = RewriteSummary {
        segments: output.segments.len() - output.duplicated,
        duplicated: output.duplicated,
        bytes_written: contents.len(),
    };
    info!(
        "Duplicated {} hot cues as memory cues in {:?} ({} segments, {} bytes)",
        summary.duplicated, path, summary.segments, summary.bytes_written
    );
    Ok(summary)
}

/// Fold a segment stream into the rewritten segment list
///
/// Stops at the first error; nothing is returned for a partial stream.
pub fn rewrite_segments<I, F>(
    segments: I,
    scan: MarkerScan,
    mut on_progress: F,
) -> Result<RewriteOutput>
where
    I: IntoIterator<Item = Result<String>>,
    F: FnMut(usize),
{
    segments
        .into_iter()
        .try_fold(RewriteOutput::default(), |mut output, segment| {
            let segment = segment?;
            let copies = memory_cue_copies(&segment, scan);
            output.segments.push(segment);

            for copy in copies {
                debug!("Hot cue copied as memory cue: {}", copy);
                output.segments.push(copy);
                output.duplicated += 1;
                on_progress(output.duplicated);
            }
            Ok(output)
        })
}

/// Memory cue copies for the hot cues found in one segment
pub fn memory_cue_copies(segment: &str, scan: MarkerScan) -> Vec<String> {
    let mut copies = CueMarker::find_all(segment).filter_map(|marker| marker.to_memory_cue());
    match scan {
        MarkerScan::First => copies.next().into_iter().collect(),
        MarkerScan::All => copies.collect(),
    }
}

/// Output text in the encoding the source was read with
fn encode_contents(contents: &str, encoding: Encoding) -> Result<Vec<u8>> {
    encoding
        .encode_checked(contents)
        .map_err(|ch| Error::Encode { ch, encoding })
}

/// Replace `path` with `contents` via a temp file in the same directory
///
/// The target holds either the old or the new content, never a mix.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::write(path, e))?;

    // Temp files are created 0600
    if let Ok(metadata) = fs::metadata(path) {
        tmp.as_file()
            .set_permissions(metadata.permissions())
            .map_err(|e| Error::write(path, e))?;
    }

    tmp.write_all(contents).map_err(|e| Error::write(path, e))?;
    tmp.as_file().sync_all().map_err(|e| Error::write(path, e))?;
    tmp.persist(path).map_err(|e| Error::write(path, e.error))?;

    Ok(())
}
