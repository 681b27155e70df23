//! HTML rendering of recipe bodies into the cache directory.
//!
//! Each recipe renders to `<cache>/<id>.html`. A cached file is reused while
//! it is newer than both its source and the newest presentation template.

use std::{path::PathBuf, sync::Arc};

use serde::Serialize;
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{debug, error, info, warn};

use crate::{
    error::{Error, Result},
    indexer::Indexer,
    markdown,
    recipe::RecipeId,
    staleness::{RenderState, TemplateClock, render_state},
    store::SourceStore,
};

/// What happened to a single recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderOutcome {
    Written,
    UpToDate,
    /// No source file exists for the id.
    Missing,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderSummary {
    pub rendered: usize,
    pub up_to_date: usize,
    pub missing: usize,
    pub failed: usize,
}

impl RenderSummary {
    /// Documents that have a valid cache entry after the run.
    pub fn processed(&self) -> usize {
        self.rendered + self.up_to_date
    }
}

/// Renders recipes with a bounded number of concurrent workers.
///
/// The template clock is computed once per renderer. Build a new renderer
/// for every run to pick up template edits.
#[derive(Debug)]
pub struct Renderer {
    indexer: Indexer,
    cache_dir: PathBuf,
    templates: TemplateClock,
    max_workers: usize,
    #[cfg(test)]
    in_flight: Option<Arc<tests::InFlight>>,
}

impl Renderer {
    pub fn new(
        indexer: Indexer,
        cache_dir: impl Into<PathBuf>,
        templates: TemplateClock,
        max_workers: usize,
    ) -> Self {
        Self {
            indexer,
            cache_dir: cache_dir.into(),
            templates,
            max_workers: max_workers.max(1),
            #[cfg(test)]
            in_flight: None,
        }
    }

    fn store(&self) -> &SourceStore {
        self.indexer.store()
    }

    pub fn cache_path(&self, id: &RecipeId) -> PathBuf {
        self.cache_dir.join(format!("{id}.html"))
    }

    /// Render one recipe if its cache entry is stale.
    ///
    /// A recipe without a source file is removed from the index and
    /// reported as not found.
    pub fn render(&self, id: &RecipeId) -> Result<RenderOutcome> {
        match self.render_one(id)? {
            RenderOutcome::Missing => {
                if let Err(e) = self.indexer.remove_from_index(id) {
                    warn!(
                        %id,
                        error = %e,
                        "cannot remove missing recipe from index"
                    );
                }
                Err(Error::recipe_not_found(id.as_str()))
            }
            outcome => Ok(outcome),
        }
    }

    /// Render every recipe in the library.
    pub fn render_all(self: Arc<Self>) -> Result<RenderSummary> {
        let ids = self
            .store()
            .list()?
            .into_iter()
            .map(|file| file.id)
            .collect();
        self.render_many(ids)
    }

    /// Render the given recipes concurrently and wait for all of them.
    ///
    /// Failures are logged and counted without stopping other renders.
    /// Missing recipes are removed from the index in one batch afterwards.
    pub fn render_many(
        self: Arc<Self>,
        ids: Vec<RecipeId>,
    ) -> Result<RenderSummary> {
        // Settle the template clock before any worker reads it.
        let newest_template = self.templates.newest();
        debug!(
            count = ids.len(),
            workers = self.max_workers,
            newest_template,
            "rendering recipes"
        );

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let (summary, missing) =
            runtime.block_on(Arc::clone(&self).render_concurrently(ids));

        if let Err(e) = self.indexer.remove_many(&missing) {
            warn!(error = %e, "cannot remove missing recipes from index");
        }

        info!(
            rendered = summary.rendered,
            up_to_date = summary.up_to_date,
            missing = summary.missing,
            failed = summary.failed,
            "render finished"
        );
        Ok(summary)
    }

    async fn render_concurrently(
        self: Arc<Self>,
        ids: Vec<RecipeId>,
    ) -> (RenderSummary, Vec<RecipeId>) {
        let slots = Arc::new(Semaphore::new(self.max_workers));
        let mut tasks = JoinSet::new();

        for id in ids {
            // The semaphore is never closed.
            let Ok(permit) = Arc::clone(&slots).acquire_owned().await else {
                break;
            };
            let renderer = Arc::clone(&self);
            tasks.spawn_blocking(move || {
                let outcome = renderer.render_one(&id);
                drop(permit);
                (id, outcome)
            });
        }

        let mut summary = RenderSummary::default();
        let mut missing = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(RenderOutcome::Written))) => summary.rendered += 1,
                Ok((_, Ok(RenderOutcome::UpToDate))) => summary.up_to_date += 1,
                Ok((id, Ok(RenderOutcome::Missing))) => {
                    debug!(%id, "recipe vanished before rendering");
                    summary.missing += 1;
                    missing.push(id);
                }
                Ok((id, Err(e))) => {
                    error!(%id, error = %e, "failed to render recipe");
                    summary.failed += 1;
                }
                Err(e) => {
                    error!(error = %e, "render task panicked");
                    summary.failed += 1;
                }
            }
        }
        (summary, missing)
    }

    fn render_one(&self, id: &RecipeId) -> Result<RenderOutcome> {
        #[cfg(test)]
        let _active = self.in_flight.as_deref().map(tests::InFlight::enter);

        let source = self.store().locate(id);
        let cache = self.cache_path(id);

        match render_state(
            &cache,
            source.as_ref().map(|file| file.path.as_path()),
            &self.templates,
        ) {
            RenderState::Fresh => return Ok(RenderOutcome::UpToDate),
            RenderState::SourceMissing => return Ok(RenderOutcome::Missing),
            RenderState::Stale => {}
        }
        let Some(source) = source else {
            return Ok(RenderOutcome::Missing);
        };

        let recipe = match source.parse() {
            Err(e) if e.is_not_found() => return Ok(RenderOutcome::Missing),
            parsed => parsed?,
        };
        recipe.require_steps()?;

        let html = markdown::render_html(&recipe.body());
        std::fs::create_dir_all(&self.cache_dir)?;
        std::fs::write(&cache, html)?;
        debug!(%id, path = %cache.display(), "rendered recipe");
        Ok(RenderOutcome::Written)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        path::Path,
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use super::*;
    use crate::staleness::{Watermark, tests::set_mtime};

    /// Counts renders that are running at the same time.
    #[derive(Debug, Default)]
    pub(crate) struct InFlight {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl InFlight {
        /// Holds the render open long enough for workers to overlap.
        pub(crate) fn enter(&self) -> InFlightGuard<'_> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            InFlightGuard(self)
        }

        fn peak(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }
    }

    pub(crate) struct InFlightGuard<'a>(&'a InFlight);

    impl Drop for InFlightGuard<'_> {
        fn drop(&mut self) {
            self.0.current.fetch_sub(1, Ordering::SeqCst);
        }
    }

    struct Fixture {
        tmp: tempfile::TempDir,
        library: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = tempfile::tempdir().unwrap();
            let library = tmp.path().join("library");
            std::fs::create_dir(&library).unwrap();
            std::fs::create_dir(tmp.path().join("templates")).unwrap();
            Self { tmp, library }
        }

        fn indexer(&self) -> Indexer {
            Indexer::new(
                SourceStore::new(&self.library),
                self.tmp.path().join("index"),
                Watermark::new(self.tmp.path().join("index_updated")),
            )
        }

        fn renderer(&self, workers: usize) -> Arc<Renderer> {
            let templates = TemplateClock::new(
                &self.tmp.path().join("templates"),
                &["header.html".to_string()],
            );
            Arc::new(Renderer::new(
                self.indexer(),
                self.tmp.path().join("cache"),
                templates,
                workers,
            ))
        }

        fn write(&self, name: &str, content: &str) -> PathBuf {
            let path = self.library.join(name);
            std::fs::write(&path, content).unwrap();
            path
        }

        fn cache(&self, id: &str) -> PathBuf {
            self.tmp.path().join("cache").join(format!("{id}.html"))
        }
    }

    fn id(s: &str) -> RecipeId {
        RecipeId::new(s).unwrap()
    }

    fn read(path: &Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[test]
    fn renders_body_to_cache() {
        let fx = Fixture::new();
        fx.write("soup.md", "# Soup\n* water\nBoil *gently*.");

        let outcome = fx.renderer(1).render(&id("soup")).unwrap();
        assert_eq!(outcome, RenderOutcome::Written);
        assert_eq!(read(&fx.cache("soup")), "<p>Boil <em>gently</em>.</p>\n");
    }

    #[test]
    fn fresh_cache_is_reused() {
        let fx = Fixture::new();
        let source = fx.write("soup.md", "# Soup\nBoil.");
        set_mtime(&source, 100);
        let renderer = fx.renderer(1);
        renderer.render(&id("soup")).unwrap();
        set_mtime(&fx.cache("soup"), 200);

        assert_eq!(renderer.render(&id("soup")).unwrap(), RenderOutcome::UpToDate);
    }

    #[test]
    fn touched_source_is_rerendered() {
        let fx = Fixture::new();
        let source = fx.write("soup.md", "# Soup\nBoil.");
        set_mtime(&source, 100);
        fx.renderer(1).render(&id("soup")).unwrap();
        set_mtime(&fx.cache("soup"), 200);

        fx.write("soup.md", "# Soup\nSimmer.");
        set_mtime(&source, 300);
        assert_eq!(
            fx.renderer(1).render(&id("soup")).unwrap(),
            RenderOutcome::Written
        );
        assert_eq!(read(&fx.cache("soup")), "<p>Simmer.</p>\n");
    }

    #[test]
    fn newer_template_forces_rerender() {
        let fx = Fixture::new();
        let source = fx.write("soup.md", "# Soup\nBoil.");
        set_mtime(&source, 100);
        fx.renderer(1).render(&id("soup")).unwrap();
        set_mtime(&fx.cache("soup"), 200);

        let template = fx.tmp.path().join("templates").join("header.html");
        std::fs::write(&template, "<html>").unwrap();
        set_mtime(&template, 300);

        assert_eq!(
            fx.renderer(1).render(&id("soup")).unwrap(),
            RenderOutcome::Written
        );
    }

    #[test]
    fn missing_recipe_is_not_found_and_pruned() {
        let fx = Fixture::new();
        fx.write("soup.md", "# Soup\nBoil.");
        let indexer = fx.indexer();
        indexer.build_index().unwrap();
        std::fs::remove_file(fx.library.join("soup.md")).unwrap();

        let err = fx.renderer(1).render(&id("soup")).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(indexer.compute_statistics().unwrap().count, 0);
        assert!(!fx.cache("soup").exists());
    }

    #[test]
    fn recipe_without_steps_fails() {
        let fx = Fixture::new();
        fx.write("empty.yaml", "title: Nothing here");

        let err = fx.renderer(1).render(&id("empty")).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn render_all_counts_outcomes() {
        let fx = Fixture::new();
        for name in ["a", "b", "c", "d", "e"] {
            fx.write(&format!("{name}.md"), &format!("# {name}\nCook {name}."));
        }
        fx.write("broken.yaml", "title: Broken");

        let summary = fx.renderer(2).render_all().unwrap();
        assert_eq!(summary.rendered, 5);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.processed(), 5);
        for name in ["a", "b", "c", "d", "e"] {
            assert!(fx.cache(name).exists());
        }
    }

    #[test]
    fn render_many_reports_missing_ids() {
        let fx = Fixture::new();
        fx.write("soup.md", "# Soup\nBoil.");

        let summary = fx
            .renderer(4)
            .render_many(vec![id("soup"), id("ghost")])
            .unwrap();
        assert_eq!(summary.rendered, 1);
        assert_eq!(summary.missing, 1);
        assert_eq!(summary.failed, 0);
    }

    #[test]
    fn concurrent_renders_stay_within_worker_limit() {
        let fx = Fixture::new();
        for i in 0..12 {
            fx.write(&format!("r{i}.md"), "# R\nStir.");
        }
        let in_flight = Arc::new(InFlight::default());
        let mut renderer = Renderer::new(
            fx.indexer(),
            fx.tmp.path().join("cache"),
            TemplateClock::new(&fx.tmp.path().join("templates"), &[]),
            3,
        );
        renderer.in_flight = Some(Arc::clone(&in_flight));

        let summary = Arc::new(renderer).render_all().unwrap();
        assert_eq!(summary.rendered, 12);
        assert!(in_flight.peak() <= 3, "peak was {}", in_flight.peak());
        assert!(in_flight.peak() > 1, "renders never overlapped");
    }

    #[test]
    fn single_worker_renders_everything() {
        let fx = Fixture::new();
        for i in 0..8 {
            fx.write(&format!("r{i}.md"), "# R\nStir.");
        }
        let summary = fx.renderer(1).render_all().unwrap();
        assert_eq!(summary.rendered, 8);
    }
}
