use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::SystemTime,
};

use tracing::warn;

use crate::{
    error::Result,
    recipe::{RecipeId, SourceFormat},
};

/// A recipe source file found in the library directory.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub id: RecipeId,
    pub format: SourceFormat,
    pub path: PathBuf,
    /// Last modification time as seconds since the Unix epoch.
    pub mtime: u64,
    /// File size in bytes.
    pub size: u64,
}

/// List every recognized source file in the library directory.
///
/// The library is flat: subdirectories and hidden files are skipped, as are
/// files whose extension is not a known recipe format. Failing to read the
/// directory itself is an error; a file that cannot be stat'ed is logged and
/// skipped.
pub fn discover_files(root: &Path) -> Result<Vec<DiscoveredFile>> {
    let mut results = Vec::new();

    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();

        // Skip hidden files.
        if name.starts_with('.') {
            continue;
        }

        let Some((id, format)) = RecipeId::from_file_name(&name) else {
            continue;
        };

        let path = entry.path();
        let metadata = match std::fs::metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "cannot stat recipe file"
                );
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        results.push(DiscoveredFile {
            id,
            format,
            path,
            mtime: mtime_of(&metadata),
            size: metadata.len(),
        });
    }

    results.sort_by(|a, b| {
        a.id.cmp(&b.id).then(a.format.rank().cmp(&b.format.rank()))
    });
    Ok(results)
}

/// Reduce a file listing to one authoritative file per id.
///
/// When both formats exist for an id, the structured file wins.
pub fn authoritative(files: &[DiscoveredFile]) -> Vec<DiscoveredFile> {
    let mut by_id: BTreeMap<&RecipeId, &DiscoveredFile> = BTreeMap::new();
    for file in files {
        by_id
            .entry(&file.id)
            .and_modify(|current| {
                if file.format.rank() < current.format.rank() {
                    *current = file;
                }
            })
            .or_insert(file);
    }
    by_id.into_values().cloned().collect()
}

pub(crate) fn mtime_of(metadata: &std::fs::Metadata) -> u64 {
    metadata
        .modified()
        .unwrap_or(SystemTime::UNIX_EPOCH)
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
