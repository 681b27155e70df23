//! Modification-time bookkeeping for the index and the render cache.
//!
//! Index staleness is judged against one global watermark: the mtime of a
//! zero-byte marker file touched after every build. Render staleness compares
//! a cached HTML file against its source and against the newest presentation
//! template.

use std::{
    collections::HashSet,
    fs::OpenOptions,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::OnceLock,
    time::SystemTime,
};

use tracing::debug;

use crate::{error::Result, recipe::RecipeId, walker::DiscoveredFile};

/// Modification time of `path` in seconds since the Unix epoch.
pub fn mtime(path: &Path) -> std::io::Result<u64> {
    Ok(crate::walker::mtime_of(&std::fs::metadata(path)?))
}

/// Set the mtime of `path` to now, creating it empty if needed.
pub fn touch(path: &Path) -> std::io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    file.set_modified(SystemTime::now())
}

/// The global "last indexed" timestamp.
#[derive(Debug, Clone)]
pub struct Watermark {
    path: PathBuf,
}

impl Watermark {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the watermark.
    ///
    /// `None` means no build has completed yet. Any error other than a
    /// missing marker is returned so the build can abort.
    pub fn read(&self) -> Result<Option<u64>> {
        match mtime(&self.path) {
            Ok(secs) => Ok(Some(secs)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Move the watermark to the current time.
    pub fn advance(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        touch(&self.path)?;
        Ok(())
    }
}

/// Newest modification time across the presentation templates.
///
/// Computed once, on first use, and then fixed for the lifetime of the
/// clock. Create a new clock for every run so template edits between runs are
/// picked up.
#[derive(Debug)]
pub struct TemplateClock {
    files: Vec<PathBuf>,
    newest: OnceLock<u64>,
}

impl TemplateClock {
    pub fn new(dir: &Path, names: &[String]) -> Self {
        Self {
            files: names.iter().map(|name| dir.join(name)).collect(),
            newest: OnceLock::new(),
        }
    }

    /// Missing templates are ignored; with none present this is 0.
    pub fn newest(&self) -> u64 {
        *self.newest.get_or_init(|| {
            let newest = self
                .files
                .iter()
                .filter_map(|path| mtime(path).ok())
                .max()
                .unwrap_or(0);
            debug!(newest, "computed template mtime");
            newest
        })
    }
}

/// Whether a cached rendering can be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    /// The cache is newer than both the source and the templates.
    Fresh,
    /// The cache is missing or outdated.
    Stale,
    /// There is no source file, so there is nothing to render.
    SourceMissing,
}

/// Decide whether the cache file for a recipe must be regenerated.
pub fn render_state(
    cache: &Path,
    source: Option<&Path>,
    templates: &TemplateClock,
) -> RenderState {
    let Some(source) = source else {
        return RenderState::SourceMissing;
    };
    let source_mtime = match mtime(source) {
        Ok(secs) => secs,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return RenderState::SourceMissing;
        }
        Err(_) => return RenderState::Stale,
    };
    let Ok(cache_mtime) = mtime(cache) else {
        return RenderState::Stale;
    };

    if cache_mtime > templates.newest() && cache_mtime > source_mtime {
        RenderState::Fresh
    } else {
        RenderState::Stale
    }
}

/// Which documents an index build has to touch.
#[derive(Debug, Default)]
pub struct IndexPlan {
    /// Files to (re)index.
    pub stale: Vec<DiscoveredFile>,
    /// Files older than the watermark that are already indexed.
    pub unchanged: usize,
    /// Ids in the index without a source file.
    pub deleted: Vec<RecipeId>,
}

/// Compare the library listing against the watermark and the index contents.
///
/// A fresh index or a missing watermark makes every file stale. Otherwise a
/// file is stale when it was modified at or after the watermark, or when the
/// index has no entry for it yet.
pub fn plan_index_update(
    discovered: &[DiscoveredFile],
    watermark: Option<u64>,
    fresh_index: bool,
    indexed: &HashSet<RecipeId>,
) -> IndexPlan {
    let mut plan = IndexPlan::default();
    let mut seen = HashSet::new();

    for file in discovered {
        seen.insert(&file.id);
        let stale = match watermark {
            _ if fresh_index => true,
            None => true,
            Some(mark) => file.mtime >= mark || !indexed.contains(&file.id),
        };
        if stale {
            plan.stale.push(file.clone());
        } else {
            plan.unchanged += 1;
        }
    }

    plan.deleted = indexed
        .iter()
        .filter(|id| !seen.contains(id))
        .cloned()
        .collect();
    plan.deleted.sort();

    plan
}
