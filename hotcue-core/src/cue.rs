//! POSITION_MARK cue detection
//!
//! rekordbox XML stores every cue of a track as a tag like
//! `<POSITION_MARK Name="" Type="0" Start="12.345" Num="0" Red="40" .../>`.
//! `Num="-1"` marks a memory cue, `Num="0"`..`Num="7"` a hot cue slot (A-H).
//! Attribute order is not fixed, only the presence of `Num` is required.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<POSITION_MARK\b[^>]*\bNum="(?P<num>-?\d+)"[^>]*>"#)
        .expect("valid marker pattern")
});

/// Num value of a memory cue
pub const MEMORY_CUE_NUM: i64 = -1;

/// Cue classification by `Num`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueKind {
    Memory,
    /// Hot cue slot index
    Hot(u64),
}

/// One matched `<POSITION_MARK ...>` tag borrowed from the scanned text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueMarker<'a> {
    tag: &'a str,
    /// Position of the `Num` value digits inside `tag`
    num: Range<usize>,
}

impl<'a> CueMarker<'a> {
    /// First marker in `text`
    pub fn find(text: &'a str) -> Option<Self> {
        MARKER_RE.captures(text).and_then(|caps| Self::from_captures(&caps))
    }

    /// Every marker in `text`, in order
    pub fn find_all(text: &'a str) -> impl Iterator<Item = CueMarker<'a>> + 'a {
        MARKER_RE
            .captures_iter(text)
            .filter_map(|caps| Self::from_captures(&caps))
    }

    fn from_captures(caps: &regex::Captures<'a>) -> Option<Self> {
        let whole = caps.get(0)?;
        let num = caps.name("num")?;
        Some(Self {
            tag: whole.as_str(),
            num: num.start() - whole.start()..num.end() - whole.start(),
        })
    }

    /// Full tag text, `<` through `>`
    pub fn tag(&self) -> &'a str {
        self.tag
    }

    /// Raw `Num` attribute value
    pub fn num(&self) -> &'a str {
        &self.tag[self.num.clone()]
    }

    /// `None` for values that are neither -1 nor a non-negative `i64`
    pub fn kind(&self) -> Option<CueKind> {
        match self.num().parse::<i64>() {
            Ok(MEMORY_CUE_NUM) => Some(CueKind::Memory),
            Ok(n) => u64::try_from(n).ok().map(CueKind::Hot),
            Err(_) => None,
        }
    }

    pub fn is_hot_cue(&self) -> bool {
        matches!(self.kind(), Some(CueKind::Hot(_)))
    }

    pub fn is_memory_cue(&self) -> bool {
        matches!(self.kind(), Some(CueKind::Memory))
    }

    /// Copy of a hot cue tag with `Num="-1"`, other attributes untouched
    pub fn to_memory_cue(&self) -> Option<String> {
        if !self.is_hot_cue() {
            return None;
        }

        let mut tag = String::with_capacity(self.tag.len() + 2);
        tag.push_str(&self.tag[..self.num.start]);
        tag.push_str(&MEMORY_CUE_NUM.to_string());
        tag.push_str(&self.tag[self.num.end..]);
        Some(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hot_cue() {
        let segment = "\n      <POSITION_MARK Name=\"a\" Num=\"0\" Red=\"255\"/>";
        let marker = CueMarker::find(segment).unwrap();

        assert_eq!(marker.tag(), "<POSITION_MARK Name=\"a\" Num=\"0\" Red=\"255\"/>");
        assert_eq!(marker.num(), "0");
        assert_eq!(marker.kind(), Some(CueKind::Hot(0)));
        assert_eq!(
            marker.to_memory_cue().as_deref(),
            Some("<POSITION_MARK Name=\"a\" Num=\"-1\" Red=\"255\"/>")
        );
    }

    #[test]
    fn test_memory_cue_not_duplicated() {
        let marker = CueMarker::find("<POSITION_MARK Name=\"a\" Num=\"-1\" Red=\"255\"/>").unwrap();
        assert_eq!(marker.kind(), Some(CueKind::Memory));
        assert!(marker.is_memory_cue());
        assert!(marker.to_memory_cue().is_none());
    }

    #[test]
    fn test_attribute_order() {
        let tag = "<POSITION_MARK Num=\"3\" Name=\"drop\" Type=\"0\" Start=\"61.2\">";
        let marker = CueMarker::find(tag).unwrap();
        assert_eq!(marker.kind(), Some(CueKind::Hot(3)));
        assert_eq!(
            marker.to_memory_cue().unwrap(),
            "<POSITION_MARK Num=\"-1\" Name=\"drop\" Type=\"0\" Start=\"61.2\">"
        );
    }

    #[test]
    fn test_similar_attribute_names_ignored() {
        let marker = CueMarker::find("<POSITION_MARK HotNum=\"5\" Num=\"1\"/>").unwrap();
        assert_eq!(marker.num(), "1");

        let marker = CueMarker::find("<POSITION_MARK Num=\"2\" HotNum=\"5\"/>").unwrap();
        assert_eq!(marker.num(), "2");

        assert!(CueMarker::find("<POSITION_MARK HotNum=\"5\"/>").is_none());
        assert!(CueMarker::find("<POSITION_MARKER Num=\"5\"/>").is_none());
    }

    #[test]
    fn test_malformed_num() {
        assert!(CueMarker::find("<POSITION_MARK Name=\"a\" Num=\"x1\"/>").is_none());
        assert!(CueMarker::find("<POSITION_MARK Name=\"a\"/>").is_none());
        assert!(CueMarker::find("<TEMPO Inizio=\"0.0\" Bpm=\"128.00\"/>").is_none());

        let overflow = CueMarker::find("<POSITION_MARK Num=\"99999999999999999999\"/>").unwrap();
        assert!(overflow.kind().is_none());
        assert!(overflow.to_memory_cue().is_none());

        let other_negative = CueMarker::find("<POSITION_MARK Num=\"-2\"/>").unwrap();
        assert!(other_negative.kind().is_none());
    }

    #[test]
    fn test_slot_beyond_u32() {
        let marker = CueMarker::find("<POSITION_MARK Name=\"far\" Num=\"5000000000\"/>").unwrap();
        assert_eq!(marker.kind(), Some(CueKind::Hot(5_000_000_000)));
        assert_eq!(
            marker.to_memory_cue().unwrap(),
            "<POSITION_MARK Name=\"far\" Num=\"-1\"/>"
        );

        let max = CueMarker::find("<POSITION_MARK Num=\"9223372036854775807\"/>").unwrap();
        assert_eq!(max.kind(), Some(CueKind::Hot(i64::MAX as u64)));
    }

    #[test]
    fn test_leading_zeros() {
        let marker = CueMarker::find("<POSITION_MARK Num=\"007\"/>").unwrap();
        assert_eq!(marker.kind(), Some(CueKind::Hot(7)));
        assert_eq!(marker.to_memory_cue().unwrap(), "<POSITION_MARK Num=\"-1\"/>");
    }

    #[test]
    fn test_find_all() {
        let text = "<POSITION_MARK Num=\"0\"/><POSITION_MARK Num=\"-1\"/>\n\
                    <POSITION_MARK Num=\"4\"/>";
        let kinds: Vec<_> = CueMarker::find_all(text).map(|m| m.kind()).collect();
        assert_eq!(
            kinds,
            vec![Some(CueKind::Hot(0)), Some(CueKind::Memory), Some(CueKind::Hot(4))]
        );
    }
}
