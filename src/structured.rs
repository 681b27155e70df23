//! Parser for the structured YAML recipe format.
//!
//! ```yaml
//! title: Pancakes
//! portions: 4
//! source: https://example.com/pancakes
//! tags: [breakfast, sweet]
//! steps:
//!   - ingredients: [flour, milk, egg]
//!     instructions: |
//!       Whisk everything together.
//! ```
//!
//! Decoding is purely structural: unknown fields are ignored and absent
//! fields default to empty. A document without steps decodes fine; consumers
//! that need a body reject it later.

use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    error::{Error, Result},
    recipe::{Metadata, Recipe, RecipeId, SourceFormat, Step},
};

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
struct StructuredDocument {
    #[serde(deserialize_with = "scalar_string")]
    title: String,
    #[serde(deserialize_with = "scalar_string")]
    portions: String,
    #[serde(deserialize_with = "scalar_string")]
    source: String,
    #[serde(deserialize_with = "scalar_list")]
    tags: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    steps: Vec<StructuredStep>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
struct StructuredStep {
    #[serde(deserialize_with = "scalar_list")]
    ingredients: Vec<String>,
    #[serde(deserialize_with = "scalar_string")]
    instructions: String,
}

/// Any YAML scalar, so that `portions: 4` reads the same as `portions: "4"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl From<Scalar> for String {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Text(s) => s,
            Scalar::Integer(n) => n.to_string(),
            Scalar::Float(n) => n.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Scalar>::deserialize(deserializer)?;
    Ok(value.map(String::from).unwrap_or_default())
}

fn scalar_list<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Vec<Option<Scalar>>>::deserialize(deserializer)?;
    Ok(value
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .map(String::from)
        .collect())
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode a structured document.
pub fn parse(id: RecipeId, doc: &str) -> Result<Recipe> {
    // An empty file is an empty mapping, not an error.
    let document: StructuredDocument = if doc.trim().is_empty() {
        StructuredDocument::default()
    } else {
        serde_norway::from_str(doc).map_err(|e| Error::Parse {
            id: id.to_string(),
            reason: e.to_string(),
        })?
    };

    Ok(Recipe {
        id,
        format: SourceFormat::Structured,
        title: document.title.trim().to_string(),
        metadata: Metadata {
            source: document.source,
            portions: document.portions,
            ..Metadata::default()
        },
        tags: document
            .tags
            .into_iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect(),
        steps: document
            .steps
            .into_iter()
            .map(|step| Step {
                instructions: step.instructions,
                ingredients: step.ingredients,
            })
            .collect(),
    })
}

/// Encode a recipe as a structured document.
///
/// Only the fields the structured format knows about are written; legacy
/// durations and temperatures have no structured counterpart.
pub fn to_yaml(recipe: &Recipe) -> Result<String> {
    let document = StructuredDocument {
        title: recipe.title.clone(),
        portions: recipe.metadata.portions.clone(),
        source: recipe.metadata.source.clone(),
        tags: recipe.tags.clone(),
        steps: recipe
            .steps
            .iter()
            .map(|step| StructuredStep {
                ingredients: step.ingredients.clone(),
                instructions: step.instructions.clone(),
            })
            .collect(),
    };
    serde_norway::to_string(&document).map_err(|e| Error::Parse {
        id: recipe.id.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> RecipeId {
        RecipeId::new(s).unwrap()
    }

    #[test]
    fn parses_full_document() {
        let doc = "\
title: Pancakes
portions: 4
source: https://example.com
tags:
  - breakfast
  - sweet
steps:
  - ingredients:
      - flour
      - milk
    instructions: |
      Whisk.
  - ingredients: [butter]
    instructions: Fry.
";
        let recipe = parse(id("pancakes"), doc).unwrap();

        assert_eq!(recipe.format, SourceFormat::Structured);
        assert_eq!(recipe.title, "Pancakes");
        assert_eq!(recipe.metadata.portions, "4");
        assert_eq!(recipe.metadata.source, "https://example.com");
        assert_eq!(recipe.tags, vec!["breakfast", "sweet"]);
        assert_eq!(recipe.steps.len(), 2);
        assert_eq!(recipe.steps[0].ingredients, vec!["flour", "milk"]);
        assert_eq!(recipe.steps[0].instructions, "Whisk.\n");
        assert_eq!(recipe.body(), "Whisk.\n\nFry.");
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let doc = "title: X\nlanguage: de\nsteps:\n  - instructions: Go.\n    duration: 5";
        let recipe = parse(id("x"), doc).unwrap();
        assert_eq!(recipe.title, "X");
        assert_eq!(recipe.steps.len(), 1);
        assert!(recipe.steps[0].ingredients.is_empty());
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let recipe = parse(id("x"), "title: Only a title").unwrap();
        assert_eq!(recipe.metadata, Metadata::default());
        assert!(recipe.tags.is_empty());
        assert!(recipe.steps.is_empty());
    }

    #[test]
    fn null_fields_default_to_empty() {
        let doc = "title:\ntags:\nsteps:\nportions: ~";
        let recipe = parse(id("x"), doc).unwrap();
        assert_eq!(recipe.title, "");
        assert!(recipe.tags.is_empty());
        assert!(recipe.steps.is_empty());
        assert_eq!(recipe.metadata.portions, "");
    }

    #[test]
    fn empty_document_has_no_steps() {
        let recipe = parse(id("x"), "").unwrap();
        assert!(recipe.steps.is_empty());
        assert!(recipe.require_steps().is_err());
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let err = parse(id("bad"), "title: [unclosed").unwrap_err();
        assert!(matches!(err, Error::Parse { ref id, .. } if id == "bad"));
    }

    #[test]
    fn yaml_export_parses_back() {
        let legacy = crate::legacy::parse(
            id("soup"),
            "# Soup\nSource: http://x\nPortions: 2\nTags: easy, warm\n* water\n* salt\nBoil it.",
        );
        let yaml = to_yaml(&legacy).unwrap();
        let structured = parse(id("soup"), &yaml).unwrap();

        assert_eq!(structured.title, legacy.title);
        assert_eq!(structured.tags, legacy.tags);
        assert_eq!(structured.metadata.portions, "2");
        assert_eq!(structured.metadata.source, "http://x");
        assert_eq!(structured.steps, legacy.steps);
    }
}
