use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Numeric(String),
    Alpha(String),
}

impl Segment {
    fn numeric(digits: &str) -> Self {
        let trimmed = digits.trim_start_matches('0');
        Segment::Numeric(if trimmed.is_empty() { "0" } else { trimmed }.into())
    }
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            // leading zeros are stripped, so a longer run is a larger number
            (Segment::Numeric(a), Segment::Numeric(b)) => a.len().cmp(&b.len()).then(a.cmp(b)),
            (Segment::Alpha(a), Segment::Alpha(b)) => a.cmp(b),
            (Segment::Numeric(_), Segment::Alpha(_)) => Ordering::Less,
            (Segment::Alpha(_), Segment::Numeric(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A version string compared segment by segment.
///
/// The string is split into runs of ASCII digits and runs of letters; every
/// other character only separates runs. Numeric runs compare as numbers,
/// letter runs compare lexically, and a numeric run sorts before a letter run.
/// Segment lists compare lexicographically, so a version that is a strict
/// prefix of another is smaller: `1.2 < 1.2.0 < 1.2a < 1.10`.
///
/// This is deliberately not semantic versioning; pkg-config and Boost
/// versions routinely carry extra segments and letters.
#[derive(Debug, Clone)]
pub struct LooseVersion {
    original: String,
    segments: Vec<Segment>,
}

impl LooseVersion {
    pub fn parse(version: impl AsRef<str>) -> Self {
        let original = version.as_ref();
        let mut segments = Vec::new();
        let mut rest = original;

        while let Some(start) = rest.find(|c: char| c.is_ascii_alphanumeric()) {
            rest = &rest[start..];
            let numeric = rest.starts_with(|c: char| c.is_ascii_digit());
            let end = rest
                .find(|c: char| {
                    if numeric {
                        !c.is_ascii_digit()
                    } else {
                        !c.is_ascii_alphabetic()
                    }
                })
                .unwrap_or(rest.len());
            let run = &rest[..end];
            segments.push(if numeric {
                Segment::numeric(run)
            } else {
                Segment::Alpha(run.into())
            });
            rest = &rest[end..];
        }

        Self {
            original: original.into(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }
}

impl fmt::Display for LooseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

impl PartialEq for LooseVersion {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl Eq for LooseVersion {}

impl Ord for LooseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.segments.cmp(&other.segments)
    }
}

impl PartialOrd for LooseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
