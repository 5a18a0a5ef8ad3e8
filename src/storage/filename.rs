//! Filename assignment and sanitization for stored images.
//!
//! Every stored file gets the fixed `.jpg` extension. Two naming policies are
//! available; [`FilenamePolicy::Sequential`] is the default.

use std::fmt;
use std::path::{Component, Path};
use std::str::FromStr;

use url::Url;

/// Extension given to every stored file.
pub const FILE_EXTENSION: &str = ".jpg";

/// How a stored file's name is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilenamePolicy {
    /// `<n>.jpg`, where `n` is the item's 1-based position in the listing.
    ///
    /// Names are unique within a run; a later run with the same query
    /// overwrites earlier files.
    #[default]
    Sequential,
    /// `<stem>.jpg`, where `stem` is the decoded last path segment of the
    /// direct-download URL with its extension removed. Falls back to the
    /// sequential name when the URL has no usable segment.
    UrlBasename,
}

impl FilenamePolicy {
    /// Assigns a filename for the item at 1-based `position` whose image lives
    /// at `direct_url`.
    #[must_use]
    pub fn filename_for(self, position: usize, direct_url: &str) -> String {
        match self {
            Self::Sequential => sequential_name(position),
            Self::UrlBasename => {
                basename_stem(direct_url).map_or_else(|| sequential_name(position), |stem| {
                    format!("{stem}{FILE_EXTENSION}")
                })
            }
        }
    }
}

impl fmt::Display for FilenamePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => f.write_str("sequential"),
            Self::UrlBasename => f.write_str("basename"),
        }
    }
}

impl FromStr for FilenamePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sequential" | "index" => Ok(Self::Sequential),
            "basename" | "url" => Ok(Self::UrlBasename),
            other => Err(format!(
                "unknown naming policy '{other}' (expected 'sequential' or 'basename')"
            )),
        }
    }
}

fn sequential_name(position: usize) -> String {
    format!("{position}{FILE_EXTENSION}")
}

fn basename_stem(direct_url: &str) -> Option<String> {
    let parsed = Url::parse(direct_url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    let decoded = urlencoding::decode(last).ok()?;
    let stem = match decoded.rfind('.') {
        Some(pos) if pos > 0 => &decoded[..pos],
        _ => decoded.as_ref(),
    };
    let sanitized = sanitize_filename(stem);
    (!sanitized.trim_matches('_').is_empty()).then_some(sanitized)
}

/// Sanitizes a filename for filesystem safety.
///
/// Replaces characters that are invalid on common filesystems
/// (`/ \ : * ? " < > |`) and control characters with `_`, and rewrites
/// `.`/`..` so the result can never escape the destination directory.
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}
