//! Settings loaded from `config.toml` in the data directory.
//!
//! ```toml
//! max_workers = 4
//! max_results = 1000
//! writer_memory = 15000000
//! templates = ["header.html", "footer.html"]
//! ```
//!
//! Every key is optional.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Maximum number of recipes rendered at the same time.
    pub max_workers: usize,
    /// Maximum number of hits a search returns.
    pub max_results: usize,
    /// Memory budget of the index writer in bytes.
    pub writer_memory: usize,
    /// Presentation templates whose changes invalidate the render cache.
    pub templates: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_workers: 4,
            max_results: 1000,
            writer_memory: 15_000_000,
            templates: vec!["header.html".into(), "footer.html".into()],
        }
    }
}

impl Settings {
    /// Load settings from `path`, falling back to defaults when the file
    /// does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            Error::Config(format!("cannot parse {}: {e}", path.display()))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(Error::Config("max_workers must be at least 1".into()));
        }
        if self.max_results == 0 {
            return Err(Error::Config("max_results must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&tmp.path().join("config.toml"))
            .unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "max_workers = 8\n").unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.max_workers, 8);
        assert_eq!(settings.max_results, 1000);
        assert_eq!(settings.templates, vec!["header.html", "footer.html"]);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "max_workers = 0\n").unwrap();

        assert!(matches!(Settings::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "max_workers = \"many\"\n").unwrap();

        assert!(matches!(Settings::load_from(&path), Err(Error::Config(_))));
    }
}
