use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Root of all persisted state: the recipe library and the artifacts
/// derived from it.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Resolve the data directory from, in order of priority:
    /// 1. An explicit path (from --data-dir)
    /// 2. The LARDER_DATA_DIR environment variable
    /// 3. The XDG data directory (~/.local/share/larder/)
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let root = if let Some(path) = explicit {
            path.to_path_buf()
        } else if let Ok(val) = std::env::var("LARDER_DATA_DIR") {
            PathBuf::from(val)
        } else {
            xdg::BaseDirectories::with_prefix("larder")
                .get_data_home()
                .ok_or_else(|| {
                    Error::Config(
                        "could not determine XDG data home directory".into(),
                    )
                })?
        };

        std::fs::create_dir_all(&root)
            .map_err(|_| Error::DataDir(root.clone()))?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// One source file per recipe.
    pub fn library_dir(&self) -> PathBuf {
        self.root.join("library")
    }

    /// Rendered HTML snippets, one per recipe.
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    pub fn template_dir(&self) -> PathBuf {
        self.root.join("templates")
    }

    /// Storage owned entirely by the index engine.
    pub fn index_dir(&self) -> PathBuf {
        self.root.join("index")
    }

    /// Zero-byte marker whose mtime is the index build watermark.
    pub fn watermark(&self) -> PathBuf {
        self.root.join("index_updated")
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }
}
