//! hotcue-core: copy rekordbox hot cues into memory cues
//!
//! Works directly on a rekordbox XML collection export:
//! - `segment`: streaming `>`-delimited segment reader with bounded memory
//! - `cue`: `POSITION_MARK` detection and hot/memory classification
//! - `rewrite`: the duplication pass and atomic write-back
//! - `scan`: whole-file collection checks and cue counts
//!
//! No XML parsing happens here; the file is treated as a sequence of tag
//! segments and only the `Num` attribute of `POSITION_MARK` is touched.

pub mod cue;
pub mod error;
pub mod rewrite;
pub mod scan;
pub mod segment;

pub use cue::{CueKind, CueMarker};
pub use error::{Error, Result};
pub use rewrite::{rewrite, rewrite_with, MarkerScan, RewriteOptions, RewriteSummary};
pub use scan::{CollectionScan, CollectionStats};
pub use segment::{Encoding, ReaderOptions, SegmentReader};
