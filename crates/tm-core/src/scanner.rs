//! Filesystem discovery of migration resources below a location.

use crate::error::{CoreError, CoreResult};
use crate::location::Location;
use std::path::{Path, PathBuf};

/// A file found below a filesystem location.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScannedResource {
    /// Path as found on disk, rooted at the location's root path
    pub absolute_path: PathBuf,
    /// Path relative to the location, as reported by
    /// [`Location::path_relative_to_this`]
    pub relative_path: String,
}

/// List every file below a filesystem location that the location matches.
///
/// Non-filesystem locations and missing roots yield an empty list; the latter
/// is logged since it usually means a typo in configuration. Results are
/// sorted by relative path.
pub fn scan_filesystem(location: &Location) -> CoreResult<Vec<ScannedResource>> {
    if !location.is_file_system() {
        log::debug!("Skipping non-filesystem location {location}");
        return Ok(Vec::new());
    }

    // A pattern that starts with a wildcard is rooted at the working directory.
    let root = match location.root_path() {
        "" => Path::new("."),
        root => Path::new(root),
    };
    if !root.is_dir() {
        log::warn!(
            "Unable to resolve location {location}: '{}' is not a directory",
            root.display()
        );
        return Ok(Vec::new());
    }

    let mut resources = Vec::new();
    scan_recursive(root, location, &mut resources)?;
    resources.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    log::debug!("Found {} resource(s) in {location}", resources.len());
    Ok(resources)
}

fn scan_recursive(
    dir: &Path,
    location: &Location,
    resources: &mut Vec<ScannedResource>,
) -> CoreResult<()> {
    let io_err = |e| CoreError::IoWithPath {
        path: dir.display().to_string(),
        source: e,
    };

    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_dir() {
            scan_recursive(&path, location, resources)?;
            continue;
        }

        // Paths under the working directory are matched without the `./`.
        let Some(path_str) = path.strip_prefix(".").unwrap_or(&path).to_str() else {
            log::warn!("Skipping non UTF-8 path {}", path.display());
            continue;
        };
        if !location.matches_path(path_str) {
            continue;
        }

        resources.push(ScannedResource {
            relative_path: location.path_relative_to_this(path_str).to_string(),
            absolute_path: path.clone(),
        });
    }
    Ok(())
}
