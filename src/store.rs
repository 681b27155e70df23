//! Filesystem-backed recipe lookup.
//!
//! Given an id, the store decides which file is authoritative by trying the
//! known extensions in [`SourceFormat::PRIORITY`] order and parses it with
//! the matching parser. Both formats are never merged.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::{
    error::{Error, Result},
    legacy,
    recipe::{Recipe, RecipeId, SourceFormat},
    structured,
    walker::{self, DiscoveredFile},
};

/// The file a recipe id resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub id: RecipeId,
    pub format: SourceFormat,
    pub path: PathBuf,
}

impl SourceFile {
    /// Read and parse this file.
    ///
    /// Legacy files are decoded leniently: bytes that are not valid UTF-8,
    /// such as Latin-1 umlauts, become replacement characters. Structured
    /// files must be valid UTF-8.
    pub fn parse(&self) -> Result<Recipe> {
        let bytes = std::fs::read(&self.path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::recipe_not_found(self.id.as_str())
            } else {
                Error::Io(e)
            }
        })?;

        match self.format {
            SourceFormat::Structured => {
                let content =
                    String::from_utf8(bytes).map_err(|e| Error::Parse {
                        id: self.id.to_string(),
                        reason: e.to_string(),
                    })?;
                structured::parse(self.id.clone(), &content)
            }
            SourceFormat::Legacy => {
                let content = String::from_utf8_lossy(&bytes);
                Ok(legacy::parse(self.id.clone(), &content))
            }
        }
    }
}

impl From<&DiscoveredFile> for SourceFile {
    fn from(file: &DiscoveredFile) -> Self {
        Self {
            id: file.id.clone(),
            format: file.format,
            path: file.path.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceStore {
    root: PathBuf,
}

impl SourceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file for `id` in the given format, whether or not it
    /// exists.
    pub fn path_for(&self, id: &RecipeId, format: SourceFormat) -> PathBuf {
        self.root.join(id.file_name(format))
    }

    /// Find the authoritative source file for `id`, if any.
    pub fn locate(&self, id: &RecipeId) -> Option<SourceFile> {
        SourceFormat::PRIORITY.into_iter().find_map(|format| {
            let path = self.path_for(id, format);
            path.is_file().then(|| SourceFile {
                id: id.clone(),
                format,
                path,
            })
        })
    }

    /// Parse the recipe with the given id.
    ///
    /// Fails with a not-found error (see [`Error::is_not_found`]) when no
    /// source file exists for it.
    pub fn load(&self, id: &RecipeId) -> Result<Recipe> {
        self.locate(id)
            .ok_or_else(|| Error::recipe_not_found(id.as_str()))?
            .parse()
    }

    /// Every recognized source file, including shadowed ones.
    pub fn list_files(&self) -> Result<Vec<DiscoveredFile>> {
        walker::discover_files(&self.root)
    }

    /// One authoritative file per recipe id.
    pub fn list(&self) -> Result<Vec<DiscoveredFile>> {
        Ok(walker::authoritative(&self.list_files()?))
    }
}
