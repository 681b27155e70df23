use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::{
    config::Settings,
    data_dir::DataDir,
    error::Result,
    indexer::{BuildReport, Indexer, SearchResults, Statistics},
    recipe::{Recipe, RecipeId, SourceFormat},
    render::{RenderOutcome, RenderSummary, Renderer},
    staleness::{TemplateClock, Watermark},
    store::{SourceFile, SourceStore},
    structured,
};

/// A recipe library rooted in a data directory, together with its index and
/// render cache.
#[derive(Debug, Clone)]
pub struct Library {
    data_dir: DataDir,
    settings: Settings,
    indexer: Indexer,
}

/// Result of converting one legacy recipe to the structured format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Conversion {
    Converted { id: RecipeId, yaml: String },
    /// Recipes without a plain ingredient list, such as multi-part
    /// documents, cannot be converted automatically.
    NoIngredients { id: RecipeId },
}

impl Library {
    /// Open the library in `data_dir`, reading `config.toml` if present.
    ///
    /// The library directory is created when missing.
    pub fn open(data_dir: DataDir) -> Result<Self> {
        std::fs::create_dir_all(data_dir.library_dir())?;
        let settings = Settings::load_from(&data_dir.config_file())?;
        Ok(Self::with_settings(data_dir, settings))
    }

    pub fn with_settings(data_dir: DataDir, settings: Settings) -> Self {
        let indexer = Indexer::new(
            SourceStore::new(data_dir.library_dir()),
            data_dir.index_dir(),
            Watermark::new(data_dir.watermark()),
        )
        .with_max_results(settings.max_results)
        .with_writer_memory(settings.writer_memory);

        Self {
            data_dir,
            settings,
            indexer,
        }
    }

    pub fn data_dir(&self) -> &DataDir {
        &self.data_dir
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &SourceStore {
        self.indexer.store()
    }

    pub fn build_index(&self) -> Result<BuildReport> {
        self.indexer.build_index()
    }

    pub fn search(&self, query: &str) -> Result<SearchResults> {
        self.indexer.search(query)
    }

    pub fn search_with_limit(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<SearchResults> {
        self.indexer.search_with_limit(query, limit)
    }

    pub fn compute_statistics(&self) -> Result<Statistics> {
        self.indexer.compute_statistics()
    }

    pub fn remove_from_index(&self, id: &RecipeId) -> Result<()> {
        self.indexer.remove_from_index(id)
    }

    /// Parse a recipe straight from its source file.
    pub fn show(&self, id: &RecipeId) -> Result<Recipe> {
        self.store().load(id)
    }

    /// A renderer with a freshly computed template clock.
    pub fn renderer(&self) -> Renderer {
        let templates = TemplateClock::new(
            &self.data_dir.template_dir(),
            &self.settings.templates,
        );
        Renderer::new(
            self.indexer.clone(),
            self.data_dir.cache_dir(),
            templates,
            self.settings.max_workers,
        )
    }

    pub fn render(&self, id: &RecipeId) -> Result<RenderOutcome> {
        self.renderer().render(id)
    }

    pub fn render_all(&self) -> Result<RenderSummary> {
        Arc::new(self.renderer()).render_all()
    }

    pub fn render_many(&self, ids: Vec<RecipeId>) -> Result<RenderSummary> {
        Arc::new(self.renderer()).render_many(ids)
    }

    /// Convert every legacy-only recipe to the structured format.
    ///
    /// With `write` set, `<id>.yaml` is written next to the legacy file and
    /// takes precedence over it from then on.
    pub fn convert(&self, write: bool) -> Result<Vec<Conversion>> {
        let mut conversions = Vec::new();

        for file in self.store().list()? {
            if file.format != SourceFormat::Legacy {
                continue;
            }
            let recipe = match SourceFile::from(&file).parse() {
                Ok(recipe) => recipe,
                Err(e) => {
                    warn!(id = %file.id, error = %e, "skipping recipe");
                    continue;
                }
            };
            if recipe.ingredients().next().is_none() {
                conversions.push(Conversion::NoIngredients { id: file.id });
                continue;
            }

            let yaml = structured::to_yaml(&recipe)?;
            if write {
                let target =
                    self.store().path_for(&file.id, SourceFormat::Structured);
                std::fs::write(&target, &yaml)?;
                info!(
                    id = %file.id,
                    path = %target.display(),
                    "converted recipe"
                );
            }
            conversions.push(Conversion::Converted { id: file.id, yaml });
        }

        Ok(conversions)
    }
}
