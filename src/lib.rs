//! larder - full-text search and HTML rendering for a personal recipe library.
//!
//! Recipes live as individual files in a library directory, either as
//! line-oriented legacy text (`.md`) or as structured YAML (`.yaml`). The
//! library directory is the single source of truth: the
//! [Tantivy](https://github.com/quickwit-oss/tantivy) search index and the
//! rendered HTML cache are both derived from it and can be rebuilt at any
//! time.
//!
//! # Quick start
//!
//! ```no_run
//! use larder::{DataDir, Library};
//!
//! let data_dir = DataDir::resolve(None).unwrap();
//! let library = Library::open(data_dir).unwrap();
//!
//! library.build_index().unwrap();
//! let results = library.search("tomato -garlic").unwrap();
//! for recipe in &results.recipes {
//!     println!("{}: {}", recipe.id, recipe.title);
//! }
//!
//! let summary = library.render_all().unwrap();
//! println!("{} recipe(s) rendered", summary.processed());
//! ```

pub mod config;
pub mod data_dir;
pub mod error;
pub mod indexer;
pub mod legacy;
pub mod library;
pub mod markdown;
pub mod query;
pub mod recipe;
pub mod render;
pub mod staleness;
pub mod store;
pub mod structured;
pub mod tantivy_index;
pub mod walker;

pub use config::Settings;
pub use data_dir::DataDir;
pub use error::{Error, Result};
pub use indexer::{BuildReport, SearchResults, Statistics};
pub use library::Library;
pub use recipe::{Recipe, RecipeId};
pub use render::RenderSummary;
pub use tantivy_index::RecipeIndex;
