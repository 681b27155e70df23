//! Canonical in-memory representation of a recipe.
//!
//! A [`Recipe`] is never stored on its own. It is re-derived from its source
//! file every time it is needed; the library directory is the single source
//! of truth.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

/// On-disk representation of a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Declarative YAML document with explicit steps.
    Structured,
    /// Line-oriented text with inline `Key: value` metadata.
    Legacy,
}

impl SourceFormat {
    /// Formats in resolution priority order. The first existing file wins.
    pub const PRIORITY: [SourceFormat; 2] =
        [SourceFormat::Structured, SourceFormat::Legacy];

    pub fn extension(self) -> &'static str {
        match self {
            SourceFormat::Structured => "yaml",
            SourceFormat::Legacy => "md",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::PRIORITY
            .into_iter()
            .find(|format| format.extension() == ext)
    }

    /// Lower value means higher priority.
    pub fn rank(self) -> usize {
        match self {
            SourceFormat::Structured => 0,
            SourceFormat::Legacy => 1,
        }
    }
}

/// Identifier of a recipe: its source file name without the extension.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RecipeId(String);

impl RecipeId {
    /// Validate and wrap an identifier.
    ///
    /// Identifiers must map to exactly one file inside the library
    /// directory, so path separators, `.`/`..` and hidden names are
    /// rejected.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let valid = !id.is_empty()
            && !id.starts_with('.')
            && !id.contains(['/', '\\', '\0']);
        if valid { Ok(Self(id)) } else { Err(Error::InvalidId(id)) }
    }

    /// Split a library file name into its id and format.
    ///
    /// Returns `None` for unrecognized extensions and invalid ids.
    ///
    /// ```
    /// use larder::recipe::{RecipeId, SourceFormat};
    ///
    /// let (id, format) = RecipeId::from_file_name("soup.md").unwrap();
    /// assert_eq!(id.as_str(), "soup");
    /// assert_eq!(format, SourceFormat::Legacy);
    /// assert!(RecipeId::from_file_name("soup.txt").is_none());
    /// ```
    pub fn from_file_name(name: &str) -> Option<(Self, SourceFormat)> {
        let (stem, ext) = name.rsplit_once('.')?;
        let format = SourceFormat::from_extension(ext)?;
        let id = Self::new(stem).ok()?;
        Some((id, format))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of this recipe in the given format.
    pub fn file_name(&self, format: SourceFormat) -> String {
        format!("{}.{}", self.0, format.extension())
    }
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Named metadata fields recognized in legacy documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataField {
    Source,
    Tags,
    Portions,
    PreparationTime,
    CookingTime,
    BakingTime,
    WaitingTime,
    TotalTime,
    Temperature,
}

impl MetadataField {
    pub const ALL: [MetadataField; 9] = [
        MetadataField::Source,
        MetadataField::Tags,
        MetadataField::Portions,
        MetadataField::PreparationTime,
        MetadataField::CookingTime,
        MetadataField::BakingTime,
        MetadataField::WaitingTime,
        MetadataField::TotalTime,
        MetadataField::Temperature,
    ];

    /// Canonical (lowercase) key as written in a legacy document.
    pub fn key(self) -> &'static str {
        match self {
            MetadataField::Source => "source",
            MetadataField::Tags => "tags",
            MetadataField::Portions => "portions",
            MetadataField::PreparationTime => "preparation time",
            MetadataField::CookingTime => "cooking time",
            MetadataField::BakingTime => "baking time",
            MetadataField::WaitingTime => "waiting time",
            MetadataField::TotalTime => "total time",
            MetadataField::Temperature => "temperature",
        }
    }

    /// Case-insensitive lookup of a trimmed key.
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim();
        Self::ALL
            .into_iter()
            .find(|field| field.key().eq_ignore_ascii_case(key))
    }
}

/// Optional free-text metadata. Absent values are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub source: String,
    pub portions: String,
    pub preparation_time: String,
    pub cooking_time: String,
    pub baking_time: String,
    pub waiting_time: String,
    pub total_time: String,
    pub temperature: String,
}

impl Metadata {
    /// Mutable access to the slot for a field. `Tags` has no slot here;
    /// tags live on [`Recipe::tags`].
    pub fn slot_mut(&mut self, field: MetadataField) -> Option<&mut String> {
        let slot = match field {
            MetadataField::Source => &mut self.source,
            MetadataField::Portions => &mut self.portions,
            MetadataField::PreparationTime => &mut self.preparation_time,
            MetadataField::CookingTime => &mut self.cooking_time,
            MetadataField::BakingTime => &mut self.baking_time,
            MetadataField::WaitingTime => &mut self.waiting_time,
            MetadataField::TotalTime => &mut self.total_time,
            MetadataField::Temperature => &mut self.temperature,
            MetadataField::Tags => return None,
        };
        Some(slot)
    }

    pub fn get(&self, field: MetadataField) -> Option<&str> {
        let value = match field {
            MetadataField::Source => &self.source,
            MetadataField::Portions => &self.portions,
            MetadataField::PreparationTime => &self.preparation_time,
            MetadataField::CookingTime => &self.cooking_time,
            MetadataField::BakingTime => &self.baking_time,
            MetadataField::WaitingTime => &self.waiting_time,
            MetadataField::TotalTime => &self.total_time,
            MetadataField::Temperature => &self.temperature,
            MetadataField::Tags => return None,
        };
        Some(value)
    }
}

/// One step of a recipe: instructions and the ingredients they need.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Step {
    pub instructions: String,
    pub ingredients: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub format: SourceFormat,
    pub title: String,
    pub metadata: Metadata,
    pub tags: Vec<String>,
    /// Legacy documents always produce exactly one step.
    pub steps: Vec<Step>,
}

impl Recipe {
    /// Free-text body that gets rendered to HTML.
    pub fn body(&self) -> String {
        let parts: Vec<&str> = self
            .steps
            .iter()
            .map(|step| step.instructions.trim())
            .filter(|text| !text.is_empty())
            .collect();
        parts.join("\n\n")
    }

    /// All ingredients across steps, in order.
    pub fn ingredients(&self) -> impl Iterator<Item = &str> {
        self.steps
            .iter()
            .flat_map(|step| step.ingredients.iter().map(String::as_str))
    }

    /// Fail with a parse error when the recipe has no steps.
    pub fn require_steps(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(Error::Parse {
                id: self.id.to_string(),
                reason: "recipe has no steps".into(),
            });
        }
        Ok(())
    }
}

/// Parse a comma separated list of tags, dropping empty entries.
pub fn parse_tags(line: &str) -> Vec<String> {
    line.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}
