//! Accept header parsing and content negotiation.
//!
//! An [`Accept`] holds its [`MediaRange`]s sorted from least to most
//! preferred: the last range is the one the client wants most.
//!
//! # Example
//! ```
//! use jbweb::content::{Accept, Range};
//!
//! let accept = Accept::from_header(Some("text/*;q=0.3, text/html, */*;q=0.5")).unwrap();
//! let best = accept.preferred();
//! assert_eq!(best.media_type, Range::exact("text"));
//! assert_eq!(best.subtype, Range::exact("html"));
//! assert_eq!(accept.quality_of("image", "png"), 0.5);
//! ```
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use thiserror::Error;

pub mod mediatypes;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("error parsing header '{header}': {reason}")]
pub struct InvalidHeader {
    header: String,
    reason: String,
}

impl InvalidHeader {
    pub fn new(header: &str, reason: &str) -> Self {
        Self {
            header: header.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Add new content-types by implementing this trait.
///
/// # Example
///
/// Using the `media_type!` macro:
/// ```
/// use jbweb::media_type;
///
/// media_type!(ApplicationMsWord, "application", "msword");
/// ```
pub trait MediaType {
    fn mime_type() -> String;
    fn mime_subtype() -> String;
    fn media_type() -> String {
        format!("{}/{}", Self::mime_type(), Self::mime_subtype())
    }
}

/// One side of a media range: a literal token or the open `*` range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Range {
    Any,
    Exact(String),
}

impl Range {
    pub fn exact(token: &str) -> Self {
        Self::Exact(token.to_ascii_lowercase())
    }

    fn parse(token: &str) -> Self {
        match token {
            "*" | "" => Self::Any,
            token => Self::exact(token),
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    pub fn matches(&self, token: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(t) => t.eq_ignore_ascii_case(token),
        }
    }

    // Open ranges rank below concrete ones.
    fn specificity(&self) -> u8 {
        match self {
            Self::Any => 0,
            Self::Exact(_) => 1,
        }
    }
}

impl Default for Range {
    fn default() -> Self {
        Self::Any
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Exact(t) => f.write_str(t),
        }
    }
}

/// A single range from an Accept header, e.g. `text/html;level=1;q=0.7`.
#[derive(Debug, Clone)]
pub struct MediaRange {
    pub media_type: Range,
    pub subtype: Range,
    pub parameters: BTreeMap<String, String>,
    pub quality: f32,
}

impl Default for MediaRange {
    fn default() -> Self {
        Self {
            media_type: Range::Any,
            subtype: Range::Any,
            parameters: BTreeMap::new(),
            quality: 1.0,
        }
    }
}

impl MediaRange {
    pub fn new(media_type: Range, subtype: Range) -> Self {
        Self {
            media_type,
            subtype,
            ..Self::default()
        }
    }

    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_parameter(mut self, key: &str, value: &str) -> Self {
        self.parameters.insert(key.to_string(), value.to_string());
        self
    }

    pub fn matches(&self, mime_type: &str, mime_subtype: &str) -> bool {
        self.media_type.matches(mime_type) && (self.media_type.is_any() || self.subtype.matches(mime_subtype))
    }

    pub fn matches_media_type<M: MediaType>(&self) -> bool {
        self.matches(&M::mime_type(), &M::mime_subtype())
    }

    /// Ranking used to sort an Accept header: lower quality first, then
    /// open types before concrete ones, open subtypes before concrete ones,
    /// then fewer (and lexicographically smaller) parameter keys first.
    ///
    /// Two ranges that differ only in their concrete type or subtype tokens
    /// rank equal; sorting keeps them in header order.
    pub fn precedence(&self, other: &Self) -> Ordering {
        self.quality
            .total_cmp(&other.quality)
            .then_with(|| {
                self.media_type
                    .specificity()
                    .cmp(&other.media_type.specificity())
            })
            .then_with(|| self.subtype.specificity().cmp(&other.subtype.specificity()))
            .then_with(|| self.parameters.len().cmp(&other.parameters.len()))
            .then_with(|| self.parameters.keys().cmp(other.parameters.keys()))
    }

    fn parse(range: &str) -> Result<Self, InvalidHeader> {
        let mut parts = range.split(';');
        let raw_range = parts.next().unwrap_or("").trim();
        let (raw_type, raw_subtype) = match raw_range.split_once('/') {
            Some((t, s)) => (t.trim(), s.trim()),
            None => (raw_range, ""),
        };
        let mut media_range = Self::new(Range::parse(raw_type), Range::parse(raw_subtype));
        for raw_parameter in parts {
            let (key, value) = match raw_parameter.split_once('=') {
                Some((key, value)) => (key.trim(), value.trim()),
                None => (raw_parameter.trim(), ""),
            };
            if key == "q" {
                media_range.quality = parse_quality(value)?;
            } else if !key.is_empty() {
                media_range.parameters.insert(key.to_string(), value.to_string());
            }
        }
        Ok(media_range)
    }
}

fn parse_quality(value: &str) -> Result<f32, InvalidHeader> {
    match value.parse::<f32>() {
        Ok(q) if (0.0..=1.0).contains(&q) => Ok(q),
        Ok(_) => Err(InvalidHeader::new("Accept", "q value out of range")),
        Err(_) => Err(InvalidHeader::new("Accept", "invalid q value")),
    }
}

impl PartialEq for MediaRange {
    fn eq(&self, other: &Self) -> bool {
        self.media_type == other.media_type
            && self.subtype == other.subtype
            && self.parameters == other.parameters
            && self.quality == other.quality
    }
}

// Qualities are validated to lie in [0, 1], so they are never NaN.
impl Eq for MediaRange {}

impl Hash for MediaRange {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.media_type.hash(state);
        self.subtype.hash(state);
        self.parameters.hash(state);
        self.quality.to_bits().hash(state);
    }
}

/// Only ranges that are ranked apart compare as less or greater; ranges that
/// rank equal but differ are unordered.
impl PartialOrd for MediaRange {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.precedence(other) {
            Ordering::Equal if self != other => None,
            ordering => Some(ordering),
        }
    }
}

impl fmt::Display for MediaRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.media_type, self.subtype)?;
        for (key, value) in &self.parameters {
            write!(f, ";{}={}", key, value)?;
        }
        if self.quality < 1.0 {
            write!(f, ";q={}", self.quality)?;
        }
        Ok(())
    }
}

/// A parsed Accept header.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Accept {
    media_types: Vec<MediaRange>,
}

impl Accept {
    /// Accept anything: a single `*/*` range with quality 1.
    pub fn all() -> Self {
        Self {
            media_types: vec![MediaRange::default()],
        }
    }

    /// Build from ranges, ranking them. No ranges at all accepts anything.
    pub fn new(mut media_types: Vec<MediaRange>) -> Self {
        if media_types.is_empty() {
            return Self::all();
        }
        // Stable, so equally ranked ranges keep their header order.
        media_types.sort_by(MediaRange::precedence);
        Self { media_types }
    }

    /// Parse an Accept header value; a missing header accepts anything.
    pub fn from_header(header: Option<&str>) -> Result<Self, InvalidHeader> {
        let header = match header {
            Some(header) => header,
            None => return Ok(Self::all()),
        };
        let media_types = header
            .split(',')
            .filter(|range| !range.trim().is_empty())
            .map(MediaRange::parse)
            .collect::<Result<Vec<_>, _>>()?;
        if media_types.is_empty() {
            return Ok(Self::all());
        }
        Ok(Self::new(media_types))
    }

    /// Ranges from least to most preferred.
    pub fn media_types(&self) -> &[MediaRange] {
        &self.media_types
    }

    pub fn iter(&self) -> std::slice::Iter<MediaRange> {
        self.media_types.iter()
    }

    /// The most preferred range.
    pub fn preferred(&self) -> &MediaRange {
        // Never empty, every constructor yields at least one range.
        &self.media_types[self.media_types.len() - 1]
    }

    /// The most specific range matching the given media type, if any.
    ///
    /// A concrete type beats `*`, then a concrete subtype beats `*`. Since
    /// the media type carries no parameters, a range without parameters
    /// beats one with them. Among equally specific ranges the most
    /// preferred wins.
    pub fn best_match(&self, mime_type: &str, mime_subtype: &str) -> Option<&MediaRange> {
        self.media_types
            .iter()
            .filter(|range| range.matches(mime_type, mime_subtype))
            .max_by_key(|range| {
                (
                    range.media_type.specificity(),
                    range.subtype.specificity(),
                    range.parameters.is_empty(),
                )
            })
    }

    /// Quality the client gives to a media type, 0 if it is not acceptable.
    pub fn quality_of(&self, mime_type: &str, mime_subtype: &str) -> f32 {
        self.best_match(mime_type, mime_subtype)
            .map_or(0.0, |range| range.quality)
    }

    pub fn accepts<M: MediaType>(&self) -> bool {
        self.quality_of(&M::mime_type(), &M::mime_subtype()) > 0.0
    }
}

impl Default for Accept {
    fn default() -> Self {
        Self::all()
    }
}

/// Define a new unit struct implementing MediaType.
#[macro_export]
macro_rules! media_type {
    ( $i:ident, $t:literal, $s:literal ) => {
        pub struct $i;

        impl $crate::content::MediaType for $i {
            fn mime_type() -> String {
                $t.to_string()
            }
            fn mime_subtype() -> String {
                $s.to_string()
            }
        }
    };
}

#[cfg(test)]
mod test {
    use super::mediatypes::{ApplicationJson, TextHtml};
    use super::*;

    fn range(t: &str, s: &str) -> MediaRange {
        MediaRange::new(Range::parse(t), Range::parse(s))
    }

    fn accept(header: &str) -> Accept {
        Accept::from_header(Some(header)).unwrap()
    }

    #[test]
    fn test_basic() {
        assert_eq!(accept("application/json"), Accept::new(vec![range("application", "json")]));
    }

    #[test]
    fn test_multiple() {
        assert_eq!(
            accept("audio/*; q=0.2, audio/basic").media_types(),
            &[range("audio", "*").with_quality(0.2), range("audio", "basic")][..]
        );
    }

    #[test]
    fn test_strips_spaces() {
        assert_eq!(
            accept(" text/* ; q=0.2 ,  text/foo").media_types(),
            &[range("text", "*").with_quality(0.2), range("text", "foo")][..]
        );
    }

    #[test]
    fn test_more_elaborate() {
        assert_eq!(
            accept("text/plain; q=0.5, text/html, text/x-dvi; q=0.8, text/x-c").media_types(),
            &[
                range("text", "plain").with_quality(0.5),
                range("text", "x-dvi").with_quality(0.8),
                range("text", "html"),
                range("text", "x-c"),
            ][..]
        );
    }

    #[test]
    fn test_override_with_more_specific_type() {
        assert_eq!(
            accept("text/*, text/plain, text/plain;format=flowed, */*").media_types(),
            &[
                range("*", "*"),
                range("text", "*"),
                range("text", "plain"),
                range("text", "plain").with_parameter("format", "flowed"),
            ][..]
        );
    }

    #[test]
    fn test_quality_factors() {
        let parsed = accept(
            "text/*;q=0.3, text/html;q=0.7, text/html;level=1, text/html;level=2;q=0.4, */*;q=0.5",
        );
        assert_eq!(
            parsed.media_types(),
            &[
                range("text", "*").with_quality(0.3),
                range("text", "html")
                    .with_parameter("level", "2")
                    .with_quality(0.4),
                range("*", "*").with_quality(0.5),
                range("text", "html").with_quality(0.7),
                range("text", "html").with_parameter("level", "1"),
            ][..]
        );
        assert_eq!(parsed.preferred(), &range("text", "html").with_parameter("level", "1"));
    }

    #[test]
    fn test_no_header() {
        assert_eq!(Accept::from_header(None).unwrap(), Accept::all());
        assert_eq!(Accept::all().media_types(), &[MediaRange::default()][..]);
    }

    #[test]
    fn test_invalid_quality() {
        assert!(Accept::from_header(Some("text/html;q=abc")).is_err());
        assert!(Accept::from_header(Some("text/html;q=1.5")).is_err());
    }

    #[test]
    fn test_lt() {
        assert!(range("text", "plain").with_quality(0.5) < range("text", "plain").with_quality(0.8));
        assert!(range("text", "*") < range("text", "plain"));
        assert!(MediaRange::default() < range("text", "*"));
        assert!(range("text", "*").with_quality(0.3) < MediaRange::default().with_quality(0.5));
        assert!(
            range("application", "json").with_quality(0.5) < range("text", "plain").with_quality(0.8)
        );
        assert!(range("bar", "foo") < range("bar", "foo").with_parameter("a", "b"));
    }

    #[test]
    fn test_not_lt() {
        assert!(!(range("text", "plain").with_quality(0.8) < range("text", "plain").with_quality(0.5)));
        assert!(!(range("application", "json") < range("text", "plain")));
        assert!(!(range("bar", "foo").with_parameter("a", "b") < range("bar", "foo")));
        assert!(!(range("text", "plain") < range("text", "*")));
        assert!(!(MediaRange::default().with_quality(0.5) < range("text", "*").with_quality(0.3)));
        assert!(!(MediaRange::default() < MediaRange::default()));
    }

    #[test]
    fn test_eq_and_hash() {
        use std::collections::HashSet;

        assert_eq!(
            range("text", "plain").with_quality(0.5),
            range("text", "plain").with_quality(0.5)
        );
        assert_ne!(range("text", "plain"), range("foo", "plain"));
        assert_ne!(range("text", "plain"), range("text", "other"));
        assert_ne!(
            range("text", "*").with_parameter("a", "b"),
            range("text", "*").with_parameter("a", "c")
        );
        let set: HashSet<MediaRange> = vec![
            range("a", "*").with_parameter("a", "b"),
            range("a", "*").with_parameter("a", "b"),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_quality_of() {
        let parsed = accept("text/*;q=0.3, text/html;q=0.7, */*;q=0.1");
        assert_eq!(parsed.quality_of("text", "html"), 0.7);
        assert_eq!(parsed.quality_of("text", "plain"), 0.3);
        assert_eq!(parsed.quality_of("image", "png"), 0.1);
        assert!(parsed.accepts::<TextHtml>());
        assert_eq!(accept("text/html").quality_of("application", "json"), 0.0);
        assert!(!accept("text/html").accepts::<ApplicationJson>());
    }

    #[test]
    fn test_quality_of_most_specific_range() {
        let parsed = accept("text/html;q=0.1, */*");
        assert_eq!(parsed.quality_of("text", "html"), 0.1);
        assert_eq!(parsed.quality_of("text", "plain"), 1.0);
        assert_eq!(parsed.preferred(), &MediaRange::default());

        let parsed = accept(
            "text/*;q=0.3, text/html;q=0.7, text/html;level=1, text/html;level=2;q=0.4, */*;q=0.5",
        );
        assert_eq!(parsed.quality_of("text", "html"), 0.7);
        assert_eq!(parsed.quality_of("text", "plain"), 0.3);
        assert_eq!(parsed.quality_of("image", "jpeg"), 0.5);
        assert_eq!(
            parsed.best_match("text", "html"),
            Some(&range("text", "html").with_quality(0.7))
        );

        let parsed = accept("text/*;q=0, */*");
        assert_eq!(parsed.quality_of("text", "csv"), 0.0);
        assert!(!parsed.accepts::<TextHtml>());
        assert!(parsed.accepts::<ApplicationJson>());
    }
}
