//! Migration locations.
//!
//! A [`Location`] is parsed from a descriptor such as `classpath:db/migration`
//! or `filesystem:/srv/sql/**/*.sql`. Paths containing `*` or `?` are split
//! into a literal root path (everything before the first wildcarded segment)
//! and an anchored matcher for the remainder. All derived fields are computed
//! once at construction; a `Location` is immutable afterwards.
//!
//! Supported wildcards:
//! - `**` matches zero or more whole directories
//! - `*` matches a non-empty run of non-separator characters
//! - `?` matches a single non-separator character

use crate::error::{CoreError, CoreResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf, MAIN_SEPARATOR_STR};
use std::str::FromStr;

/// Name of the capture group holding the path below a wildcard location.
const RELPATH_GROUP: &str = "relpath";

/// Storage scheme of a location, selected by the descriptor prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LocationScheme {
    /// `classpath:` (the default when the descriptor has no prefix)
    ClassPath,
    /// `filesystem:`
    FileSystem,
    /// `s3:`
    AwsS3,
    /// `gcs:`
    Gcs,
}

impl LocationScheme {
    /// The descriptor prefix for this scheme, including the trailing colon.
    pub fn prefix(self) -> &'static str {
        match self {
            LocationScheme::ClassPath => "classpath:",
            LocationScheme::FileSystem => "filesystem:",
            LocationScheme::AwsS3 => "s3:",
            LocationScheme::Gcs => "gcs:",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "classpath:" => Some(LocationScheme::ClassPath),
            "filesystem:" => Some(LocationScheme::FileSystem),
            "s3:" => Some(LocationScheme::AwsS3),
            "gcs:" => Some(LocationScheme::Gcs),
            _ => None,
        }
    }

    /// Path separator used when joining segments for this scheme.
    pub fn separator(self) -> &'static str {
        match self {
            LocationScheme::FileSystem => MAIN_SEPARATOR_STR,
            _ => "/",
        }
    }
}

/// A location to load migrations from.
///
/// Equality, ordering and hashing use the descriptor (`prefix + path`) only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Location {
    scheme: LocationScheme,
    raw_path: String,
    root_path: String,
    descriptor: String,
    pattern: Option<Regex>,
}

impl Location {
    /// Parse a location descriptor.
    ///
    /// The scheme is everything up to and including the first `:`; without a
    /// colon the location is a classpath location.
    pub fn new(descriptor: &str) -> CoreResult<Self> {
        let normalized = descriptor.trim();

        let (prefix, path) = match normalized.find(':') {
            Some(idx) => (&normalized[..=idx], &normalized[idx + 1..]),
            None => (LocationScheme::ClassPath.prefix(), normalized),
        };
        let scheme =
            LocationScheme::from_prefix(prefix).ok_or_else(|| CoreError::UnknownLocationPrefix {
                descriptor: normalized.to_string(),
            })?;

        let path = match scheme {
            LocationScheme::ClassPath => path.strip_prefix('/').unwrap_or(path),
            _ => path,
        };
        let mut raw_path = path.strip_suffix(['/', '\\']).unwrap_or(path).to_string();

        let (root_path, pattern) = match compile_wildcards(scheme, &raw_path) {
            Some(compiled) => {
                let regex = Regex::new(&compiled.pattern).map_err(|e| {
                    CoreError::InvalidLocationPattern {
                        descriptor: normalized.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                (compiled.root_path, Some(regex))
            }
            None => {
                if scheme == LocationScheme::FileSystem {
                    raw_path = normalize_fs_path(&raw_path);
                }
                (raw_path.clone(), None)
            }
        };

        let root_path = match root_path.strip_suffix(['/', '\\']) {
            Some(stripped) => stripped.to_string(),
            None => root_path,
        };

        let descriptor = format!("{}{}", scheme.prefix(), raw_path);
        Ok(Self {
            scheme,
            raw_path,
            root_path,
            descriptor,
            pattern,
        })
    }

    /// The scheme this location was declared with.
    pub fn scheme(&self) -> LocationScheme {
        self.scheme
    }

    /// The prefix part of the location, e.g. `classpath:`.
    pub fn prefix(&self) -> &'static str {
        self.scheme.prefix()
    }

    /// The normalized path part of the location.
    pub fn path(&self) -> &str {
        &self.raw_path
    }

    /// The literal part of the path before the first wildcard segment.
    ///
    /// Equals [`path`](Self::path) when the location has no wildcards.
    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    /// The complete location descriptor.
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// The compiled wildcard matcher, if the path contained wildcards.
    pub fn path_pattern(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }

    /// Whether `path` is matched by this location.
    ///
    /// Always `true` for locations without wildcards.
    pub fn matches_path(&self, path: &str) -> bool {
        match &self.pattern {
            Some(pattern) => pattern.is_match(path),
            None => true,
        }
    }

    /// Return `path` relative to this location.
    ///
    /// For wildcard locations ending in a directory pattern this is whatever
    /// the pattern matched below its last segment. Otherwise the root path and
    /// one separator are stripped from the front. Paths outside the root are
    /// returned unchanged.
    pub fn path_relative_to_this<'p>(&self, path: &'p str) -> &'p str {
        if let Some(pattern) = &self.pattern {
            let relpath = pattern
                .captures(path)
                .and_then(|caps| caps.name(RELPATH_GROUP))
                .map(|m| m.as_str())
                .filter(|rel| !rel.is_empty());
            if let Some(rel) = relpath {
                return rel;
            }
        }

        if self.root_path.is_empty() {
            return path;
        }
        path.strip_prefix(self.root_path.as_str())
            .and_then(|rest| rest.strip_prefix(['/', '\\']))
            .unwrap_or(path)
    }

    /// Whether this denotes a location on the classpath.
    pub fn is_class_path(&self) -> bool {
        self.scheme == LocationScheme::ClassPath
    }

    /// Whether this denotes a location on the filesystem.
    pub fn is_file_system(&self) -> bool {
        self.scheme == LocationScheme::FileSystem
    }

    /// Whether this denotes a location in AWS S3.
    pub fn is_aws_s3(&self) -> bool {
        self.scheme == LocationScheme::AwsS3
    }

    /// Whether this denotes a location in Google Cloud Storage.
    pub fn is_gcs(&self) -> bool {
        self.scheme == LocationScheme::Gcs
    }

    /// Whether this location is a parent of `other`.
    ///
    /// Wildcard locations are never parents nor children. Only
    /// classpath/classpath and filesystem/filesystem pairs are compared.
    pub fn is_parent_of(&self, other: &Location) -> bool {
        if self.pattern.is_some() || other.pattern.is_some() {
            return false;
        }
        let separator = match (self.scheme, other.scheme) {
            (LocationScheme::ClassPath, LocationScheme::ClassPath) => "/",
            (LocationScheme::FileSystem, LocationScheme::FileSystem) => MAIN_SEPARATOR_STR,
            _ => return false,
        };
        format!("{}{separator}", other.descriptor)
            .starts_with(&format!("{}{separator}", self.descriptor))
    }
}

/// Root path and regex source produced from a wildcard path.
struct CompiledWildcards {
    root_path: String,
    pattern: String,
}

/// Split a wildcard path into its literal root and an anchored regex.
///
/// Returns `None` when the path contains no `*` or `?`.
fn compile_wildcards(scheme: LocationScheme, raw_path: &str) -> Option<CompiledWildcards> {
    if !raw_path.contains(['*', '?']) {
        return None;
    }

    let separator = scheme.separator();
    let escaped_separator = regex::escape(separator);
    let not_separator = format!("[^{escaped_separator}]");

    let mut root_parts: Vec<&str> = Vec::new();
    let mut pattern = String::new();
    let mut in_pattern = false;
    let mut skip_separator = true;
    let mut ends_in_file = false;

    for segment in raw_path.split(['/', '\\']) {
        ends_in_file = false;
        if segment.contains(['*', '?']) {
            in_pattern = true;
        }
        if !in_pattern {
            root_parts.push(segment);
            continue;
        }

        if !skip_separator {
            pattern.push_str(&escaped_separator);
        }
        skip_separator = false;

        if segment == "**" {
            // Consumes its own trailing separator.
            pattern.push_str(&format!("(?:{not_separator}+{escaped_separator})*?"));
            skip_separator = true;
        } else {
            ends_in_file = segment.contains('.');
            pattern.push_str(&segment_to_regex(segment, &not_separator));
        }
    }

    let mut root_path = root_parts.join(separator);
    if scheme == LocationScheme::FileSystem {
        root_path = normalize_fs_path(&root_path);
    }

    let mut full = if root_parts.is_empty() {
        pattern
    } else {
        format!("{}{escaped_separator}{pattern}", regex::escape(&root_path))
    };

    if !ends_in_file {
        if !skip_separator {
            full.push_str(&escaped_separator);
        }
        full.push_str(&format!("(?P<{RELPATH_GROUP}>.*)"));
    }

    Some(CompiledWildcards {
        root_path,
        pattern: format!("^(?:{full})$"),
    })
}

/// Translate one wildcard segment into regex source.
fn segment_to_regex(segment: &str, not_separator: &str) -> String {
    let mut out = String::with_capacity(segment.len() * 2);
    let mut buf = [0u8; 4];
    for c in segment.chars() {
        match c {
            '?' => out.push_str(not_separator),
            '*' => {
                out.push_str(not_separator);
                out.push_str("+?");
            }
            _ => out.push_str(&regex::escape(c.encode_utf8(&mut buf))),
        }
    }
    out
}

/// Collapse repeated separators and `.` components the way the OS path type does.
fn normalize_fs_path(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    let normalized: PathBuf = Path::new(path).components().collect();
    normalized.to_string_lossy().into_owned()
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor == other.descriptor
    }
}

impl Eq for Location {}

impl Hash for Location {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.descriptor.hash(state);
    }
}

impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Location {
    fn cmp(&self, other: &Self) -> Ordering {
        self.descriptor.cmp(&other.descriptor)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.descriptor)
    }
}

impl FromStr for Location {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Location::new(s)
    }
}

impl TryFrom<String> for Location {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Location::new(&s)
    }
}

impl From<Location> for String {
    fn from(location: Location) -> Self {
        location.descriptor
    }
}

#[cfg(test)]
#[path = "location_test.rs"]
mod tests;
