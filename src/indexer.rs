//! Keeps the full-text index in step with the recipe library.
//!
//! The library directory is the source of truth. The index may lag behind it
//! between builds, but search results are always checked against the files
//! on disk before they are returned, and entries whose file has gone are
//! pruned on the way.

use std::{collections::HashSet, path::PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    error::{Error, Result},
    query,
    recipe::{Recipe, RecipeId},
    staleness::{Watermark, plan_index_update},
    store::{SourceFile, SourceStore},
    tantivy_index::RecipeIndex,
    walker,
};

/// Default index writer memory budget in bytes.
pub const DEFAULT_WRITER_MEMORY: usize = 15_000_000;

/// Default cap on the number of search hits.
pub const DEFAULT_MAX_RESULTS: usize = 1000;

/// Outcome of an index build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// The index did not exist and was created by this build.
    pub created: bool,
    pub indexed: usize,
    pub unchanged: usize,
    /// Documents that could not be read or parsed.
    pub failed: usize,
    /// Index entries removed because their source file is gone.
    pub pruned: usize,
}

/// Search hits re-parsed from their current source files.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub recipes: Vec<Recipe>,
    /// Matches overall, excluding hits dropped during reconciliation. Can
    /// exceed `recipes.len()` when the result cap was hit.
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub count: usize,
    pub total_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct Indexer {
    store: SourceStore,
    index_dir: PathBuf,
    watermark: Watermark,
    max_results: usize,
    writer_memory: usize,
}

impl Indexer {
    pub fn new(
        store: SourceStore,
        index_dir: impl Into<PathBuf>,
        watermark: Watermark,
    ) -> Self {
        Self {
            store,
            index_dir: index_dir.into(),
            watermark,
            max_results: DEFAULT_MAX_RESULTS,
            writer_memory: DEFAULT_WRITER_MEMORY,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    pub fn with_writer_memory(mut self, writer_memory: usize) -> Self {
        self.writer_memory = writer_memory;
        self
    }

    pub fn store(&self) -> &SourceStore {
        &self.store
    }

    /// Create or update the index from the library directory.
    ///
    /// Only files modified since the last build are re-parsed, unless the
    /// index is new. Parse failures are logged and skipped. All changes are
    /// committed at once, then the watermark is advanced.
    pub fn build_index(&self) -> Result<BuildReport> {
        let watermark = self.watermark.read()?;
        let index = RecipeIndex::open_or_create(&self.index_dir)?;
        let files = self.store.list()?;

        let indexed: HashSet<RecipeId> = if index.was_created() {
            HashSet::new()
        } else {
            index
                .indexed_ids()?
                .into_iter()
                .filter_map(|id| RecipeId::new(id).ok())
                .collect()
        };

        let plan =
            plan_index_update(&files, watermark, index.was_created(), &indexed);
        debug!(
            stale = plan.stale.len(),
            unchanged = plan.unchanged,
            deleted = plan.deleted.len(),
            "planned index update"
        );

        // Parse in parallel, then stage sequentially on the single writer.
        let parsed: Vec<(RecipeId, Result<Recipe>)> = plan
            .stale
            .par_iter()
            .map(|file| (file.id.clone(), SourceFile::from(file).parse()))
            .collect();

        let mut report = BuildReport {
            created: index.was_created(),
            unchanged: plan.unchanged,
            ..BuildReport::default()
        };

        let mut writer = index.writer(self.writer_memory)?;
        for (id, parsed) in parsed {
            match parsed {
                Ok(recipe) => {
                    index.add_recipe(&writer, &recipe)?;
                    report.indexed += 1;
                }
                Err(e) if e.is_not_found() => {
                    debug!(%id, "recipe vanished during build");
                    index.delete_recipe(&writer, &id);
                    report.pruned += 1;
                }
                Err(e) => {
                    warn!(%id, error = %e, "skipping recipe");
                    report.failed += 1;
                }
            }
        }
        for id in &plan.deleted {
            index.delete_recipe(&writer, id);
        }
        report.pruned += plan.deleted.len();
        writer.commit()?;

        self.watermark.advance()?;

        info!(
            indexed = report.indexed,
            unchanged = report.unchanged,
            failed = report.failed,
            pruned = report.pruned,
            "index updated"
        );
        Ok(report)
    }

    /// Delete one recipe from the index. Without an index this is a no-op.
    pub fn remove_from_index(&self, id: &RecipeId) -> Result<()> {
        self.remove_many(std::slice::from_ref(id))
    }

    /// Delete several recipes from the index in one commit.
    pub fn remove_many(&self, ids: &[RecipeId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let Some(index) = RecipeIndex::open_existing(&self.index_dir)? else {
            return Ok(());
        };
        prune(&index, ids, self.writer_memory)
    }

    /// Search with the configured result cap.
    pub fn search(&self, query_text: &str) -> Result<SearchResults> {
        self.search_with_limit(query_text, self.max_results)
    }

    /// Search the index and re-parse every hit from the library.
    ///
    /// Hits whose source file no longer exists are dropped and removed from
    /// the index before returning. The total is corrected accordingly.
    pub fn search_with_limit(
        &self,
        query_text: &str,
        limit: usize,
    ) -> Result<SearchResults> {
        let normalized = query::normalize(query_text);
        if normalized.is_empty() {
            return Ok(SearchResults::default());
        }

        let index = RecipeIndex::open_existing(&self.index_dir)?.ok_or_else(
            || Error::NotFound {
                kind: "index",
                name: self.index_dir.display().to_string(),
            },
        )?;
        let hits = index.search(&normalized, limit)?;

        let mut recipes = Vec::with_capacity(hits.hits.len());
        let mut vanished = Vec::new();
        let mut unreadable = 0;

        for hit in hits.hits {
            let Ok(id) = RecipeId::new(hit.id.as_str()) else {
                warn!(id = %hit.id, "index holds an invalid recipe id");
                unreadable += 1;
                continue;
            };
            match self.store.load(&id) {
                Ok(recipe) => recipes.push(recipe),
                Err(e) if e.is_not_found() => vanished.push(id),
                Err(e) => {
                    warn!(%id, error = %e, "cannot load search hit");
                    unreadable += 1;
                }
            }
        }

        if !vanished.is_empty() {
            // A failed prune only delays cleanup; the results are already
            // filtered.
            if let Err(e) = prune(&index, &vanished, self.writer_memory) {
                warn!(error = %e, "cannot prune vanished recipes");
            }
        }

        let total = hits.total.saturating_sub(vanished.len() + unreadable);
        debug!(
            query = %normalized,
            returned = recipes.len(),
            total,
            "search finished"
        );
        Ok(SearchResults { recipes, total })
    }

    /// Count recipes and sum up the size of their source files.
    ///
    /// The count comes from the index when there is one, otherwise from the
    /// library listing.
    pub fn compute_statistics(&self) -> Result<Statistics> {
        let files = self.store.list_files()?;
        let total_bytes = files.iter().map(|file| file.size).sum();

        let indexed = match RecipeIndex::open_existing(&self.index_dir) {
            Ok(Some(index)) => match index.num_docs() {
                Ok(n) => Some(n as usize),
                Err(e) => {
                    warn!(error = %e, "cannot count indexed recipes");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "cannot open index");
                None
            }
        };
        let count =
            indexed.unwrap_or_else(|| walker::authoritative(&files).len());

        Ok(Statistics { count, total_bytes })
    }
}

fn prune(
    index: &RecipeIndex,
    ids: &[RecipeId],
    writer_memory: usize,
) -> Result<()> {
    let mut writer = index.writer(writer_memory)?;
    for id in ids {
        index.delete_recipe(&writer, id);
    }
    writer.commit()?;
    info!(count = ids.len(), "removed recipes from index");
    Ok(())
}
