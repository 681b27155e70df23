//! Parser for the line-oriented legacy recipe format.
//!
//! ```text
//! # Soup
//! Source: http://example.com
//! Tags: easy, warm
//! Portions: 4
//! Ingredients:
//! * water
//! * salt
//! Boil it.
//! ```
//!
//! The first line is the title. Lines of the form `Key: value` whose key is a
//! known [`MetadataField`] become metadata, a contiguous run of `* ` bullets
//! becomes the ingredient list, and everything else is the body.
//!
//! Documents split into `##` subsections are not supported: they parse with
//! an empty ingredient list and an un-split body.

use tracing::debug;

use crate::recipe::{
    Metadata,
    MetadataField,
    Recipe,
    RecipeId,
    SourceFormat,
    Step,
    parse_tags,
};

const BULLET: &str = "* ";
const SUBSECTION: &str = "##";
const INGREDIENTS_KEY: &str = "ingredients";

/// Ingredient block found in the body of a legacy document.
#[derive(Debug, Default, PartialEq, Eq)]
struct IngredientBlock {
    ingredients: Vec<String>,
    /// Index of the last bulleted line; `None` when there is no block or the
    /// document is multi-part.
    last_line: Option<usize>,
    /// Index of the first bulleted line.
    first_line: Option<usize>,
}

/// Parse a legacy document into a single-step recipe.
pub fn parse(id: RecipeId, doc: &str) -> Recipe {
    let mut lines = doc.split('\n');
    let title = lines
        .next()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix('#').unwrap_or(line).trim().to_string()
        })
        .unwrap_or_default();

    let mut metadata = Metadata::default();
    let mut raw_tags = String::new();
    let mut body: Vec<&str> = Vec::new();

    for line in lines.map(str::trim) {
        if let Some((key, value)) = line.split_once(':') {
            let value = value.trim();
            let is_marker = key.trim().eq_ignore_ascii_case(INGREDIENTS_KEY);
            if is_marker && value.is_empty() {
                continue;
            }
            if let Some(field) = MetadataField::from_key(key) {
                // Repeated fields are concatenated, not replaced.
                match metadata.slot_mut(field) {
                    Some(slot) => slot.push_str(value),
                    None => raw_tags.push_str(value),
                }
                continue;
            }
        }
        body.push(line);
    }

    let leading = body
        .iter()
        .take_while(|line| {
            line.is_empty() || line.eq_ignore_ascii_case("ingredients:")
        })
        .count();
    let body = &body[leading..];

    let block = scan_ingredients(body);
    let content = match (block.first_line, block.last_line) {
        (Some(first), Some(last)) => {
            let mut kept: Vec<&str> = body[..first].to_vec();
            kept.extend_from_slice(&body[last + 1..]);
            kept.join("\n")
        }
        _ => body.join("\n"),
    };

    Recipe {
        id,
        format: SourceFormat::Legacy,
        title,
        metadata,
        tags: parse_tags(&raw_tags),
        steps: vec![Step {
            instructions: content.trim().to_string(),
            ingredients: block.ingredients,
        }],
    }
}

/// Find the contiguous run of `* ` bullets in the body.
///
/// A `##` subsection marker ahead of the first bullet makes this a
/// multi-part document, which yields an empty block. Headings after the
/// ingredient run are ordinary body text.
fn scan_ingredients(body: &[&str]) -> IngredientBlock {
    let first = body.iter().position(|line| line.starts_with(BULLET));
    let scanned = &body[..first.unwrap_or(body.len())];
    if scanned.iter().any(|line| line.starts_with(SUBSECTION)) {
        debug!("multi-part legacy recipe, ingredients not extracted");
        return IngredientBlock::default();
    }

    let Some(first) = first else {
        return IngredientBlock::default();
    };

    let ingredients: Vec<String> = body[first..]
        .iter()
        .map_while(|line| line.strip_prefix(BULLET))
        .map(|item| item.trim().to_string())
        .collect();
    let last = first + ingredients.len() - 1;

    IngredientBlock {
        ingredients,
        last_line: Some(last),
        first_line: Some(first),
    }
}

/// Write a recipe back out in the legacy format.
///
/// Only single-step recipes round-trip; further steps are appended to the
/// body.
pub fn render(recipe: &Recipe) -> String {
    let mut out = format!("# {}\n", recipe.title);
    for field in MetadataField::ALL {
        let value = match field {
            MetadataField::Tags => recipe.tags.join(", "),
            _ => recipe.metadata.get(field).unwrap_or_default().to_string(),
        };
        if !value.is_empty() {
            out.push_str(&format!("{}: {value}\n", capitalize(field.key())));
        }
    }
    for ingredient in recipe.ingredients() {
        out.push_str(&format!("{BULLET}{ingredient}\n"));
    }
    let body = recipe.body();
    if !body.is_empty() {
        out.push_str(&body);
        out.push('\n');
    }
    out
}

fn capitalize(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
