use std::{collections::HashSet, path::Path};

use tantivy::{
    Index,
    IndexReader,
    IndexWriter,
    TantivyDocument,
    collector::{Count, DocSetCollector, TopDocs},
    query::{AllQuery, QueryParser},
    schema::*,
    tokenizer::{
        LowerCaser,
        RemoveLongFilter,
        SimpleTokenizer,
        Stemmer,
        TextAnalyzer,
    },
};

use crate::{
    error::{Error, Result},
    recipe::{Recipe, RecipeId},
};

/// Field names used in the schema.
pub mod fields {
    pub const ID: &str = "id";
    pub const TITLE: &str = "title";
    pub const BODY: &str = "body";
    pub const INGREDIENTS: &str = "ingredients";
    pub const TAGS: &str = "tags";
    pub const SOURCE: &str = "source";
}

/// Full-text index over the recipe library.
///
/// The index only holds what is needed for ranking. Hits are re-parsed from
/// their source files by the caller.
pub struct RecipeIndex {
    index: Index,
    reader: IndexReader,
    fields: SchemaFields,
    created: bool,
}

/// Resolved field handles for the schema.
#[derive(Clone, Copy)]
pub struct SchemaFields {
    pub id: Field,
    pub title: Field,
    pub body: Field,
    pub ingredients: Field,
    pub tags: Field,
    pub source: Field,
}

/// A ranked hit.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub score: f32,
    pub id: String,
}

/// Ranked hits plus the number of documents matching overall.
#[derive(Debug, Clone, Default)]
pub struct SearchHits {
    pub hits: Vec<SearchHit>,
    pub total: usize,
}

fn en_text() -> TextOptions {
    TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer("en_stem")
            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
    )
}

fn simple_text() -> TextOptions {
    TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer("default")
            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
    )
}

fn build_schema() -> (Schema, SchemaFields) {
    let mut builder = Schema::builder();

    let id = builder.add_text_field(fields::ID, STRING | STORED);
    let title = builder.add_text_field(fields::TITLE, en_text().set_stored());
    let body = builder.add_text_field(fields::BODY, en_text());
    let ingredients = builder.add_text_field(fields::INGREDIENTS, en_text());
    let tags = builder.add_text_field(fields::TAGS, simple_text());
    let source = builder.add_text_field(fields::SOURCE, simple_text());

    let schema = builder.build();
    let fields = SchemaFields {
        id,
        title,
        body,
        ingredients,
        tags,
        source,
    };

    (schema, fields)
}

fn resolve_fields(schema: &Schema) -> Result<SchemaFields> {
    let f = |name: &str| {
        schema.get_field(name).map_err(|_| {
            Error::Config(format!("index schema lacks field '{name}'"))
        })
    };
    Ok(SchemaFields {
        id: f(fields::ID)?,
        title: f(fields::TITLE)?,
        body: f(fields::BODY)?,
        ingredients: f(fields::INGREDIENTS)?,
        tags: f(fields::TAGS)?,
        source: f(fields::SOURCE)?,
    })
}

fn register_tokenizers(index: &Index) {
    let en_stem = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(40))
        .filter(LowerCaser)
        .filter(Stemmer::new(tantivy::tokenizer::Language::English))
        .build();
    index.tokenizers().register("en_stem", en_stem);
}

fn mmap_directory(dir: &Path) -> Result<tantivy::directory::MmapDirectory> {
    tantivy::directory::MmapDirectory::open(dir).map_err(|e| {
        Error::Tantivy(tantivy::TantivyError::SystemError(e.to_string()))
    })
}

impl RecipeIndex {
    /// Open the index at `dir`, creating it with the recipe schema if none
    /// exists yet.
    pub fn open_or_create(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let mmap_dir = mmap_directory(dir)?;
        let exists = Index::exists(&mmap_dir)
            .map_err(|e| tantivy::TantivyError::SystemError(e.to_string()))?;

        let index = if exists {
            Index::open(mmap_dir)?
        } else {
            let (schema, _) = build_schema();
            Index::create(mmap_dir, schema, tantivy::IndexSettings::default())?
        };

        Self::from_index(index, !exists)
    }

    /// Open the index at `dir` only if one has been created before.
    pub fn open_existing(dir: &Path) -> Result<Option<Self>> {
        if !dir.is_dir() {
            return Ok(None);
        }
        let mmap_dir = mmap_directory(dir)?;
        let exists = Index::exists(&mmap_dir)
            .map_err(|e| tantivy::TantivyError::SystemError(e.to_string()))?;
        if !exists {
            return Ok(None);
        }
        Ok(Some(Self::from_index(Index::open(mmap_dir)?, false)?))
    }

    /// Create an in-memory index (for testing).
    pub fn open_in_ram() -> Result<Self> {
        let (schema, _) = build_schema();
        Self::from_index(Index::create_in_ram(schema), true)
    }

    fn from_index(index: Index, created: bool) -> Result<Self> {
        register_tokenizers(&index);
        let fields = resolve_fields(&index.schema())?;
        let reader = index.reader()?;
        Ok(Self {
            index,
            reader,
            fields,
            created,
        })
    }

    /// Whether this handle created the index rather than opening it.
    pub fn was_created(&self) -> bool {
        self.created
    }

    pub fn fields(&self) -> SchemaFields {
        self.fields
    }

    /// Create a writer with the given memory budget (in bytes).
    pub fn writer(&self, memory_budget: usize) -> Result<IndexWriter> {
        Ok(self.index.writer(memory_budget)?)
    }

    /// Stage a recipe, replacing any existing entry with the same id.
    pub fn add_recipe(
        &self,
        writer: &IndexWriter,
        recipe: &Recipe,
    ) -> Result<()> {
        let f = self.fields;
        self.delete_recipe(writer, &recipe.id);

        let mut doc = TantivyDocument::default();
        doc.add_text(f.id, recipe.id.as_str());
        doc.add_text(f.title, &recipe.title);
        doc.add_text(f.body, recipe.body());
        for ingredient in recipe.ingredients() {
            doc.add_text(f.ingredients, ingredient);
        }
        for tag in &recipe.tags {
            doc.add_text(f.tags, tag);
        }
        doc.add_text(f.source, &recipe.metadata.source);

        writer.add_document(doc)?;
        Ok(())
    }

    /// Stage the deletion of a single recipe.
    pub fn delete_recipe(&self, writer: &IndexWriter, id: &RecipeId) {
        let term = tantivy::Term::from_field_text(self.fields.id, id.as_str());
        writer.delete_term(term);
    }

    /// Run a query in the engine's query syntax.
    ///
    /// Parsing is strict: syntax errors and unknown fields are reported as
    /// [`Error::InvalidQuery`]. The `title` field is boosted 2x.
    pub fn search(&self, query_str: &str, limit: usize) -> Result<SearchHits> {
        let f = self.fields;
        self.reader.reload()?;
        let searcher = self.reader.searcher();

        let mut parser = QueryParser::for_index(
            &self.index,
            vec![f.title, f.body, f.ingredients, f.tags, f.source],
        );
        parser.set_field_boost(f.title, 2.0);

        let query = parser.parse_query(query_str).map_err(|source| {
            Error::InvalidQuery {
                query: query_str.to_string(),
                source,
            }
        })?;
        let (top_docs, total) = searcher
            .search(&query, &(TopDocs::with_limit(limit.max(1)), Count))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher.doc(doc_address)?;
            hits.push(SearchHit {
                score,
                id: extract_text(&doc, f.id),
            });
        }

        Ok(SearchHits { hits, total })
    }

    /// Ids of every indexed recipe.
    pub fn indexed_ids(&self) -> Result<HashSet<String>> {
        self.reader.reload()?;
        let searcher = self.reader.searcher();
        let addresses = searcher.search(&AllQuery, &DocSetCollector)?;

        let mut ids = HashSet::with_capacity(addresses.len());
        for address in addresses {
            let doc: TantivyDocument = searcher.doc(address)?;
            ids.insert(extract_text(&doc, self.fields.id));
        }
        Ok(ids)
    }

    /// Number of live documents.
    pub fn num_docs(&self) -> Result<u64> {
        self.reader.reload()?;
        Ok(self.reader.searcher().num_docs())
    }
}

impl std::fmt::Debug for RecipeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecipeIndex")
            .field("created", &self.created)
            .finish_non_exhaustive()
    }
}

fn extract_text(doc: &TantivyDocument, field: Field) -> String {
    doc.get_first(field)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{legacy, recipe::RecipeId};

    fn recipe(id: &str, doc: &str) -> Recipe {
        legacy::parse(RecipeId::new(id).unwrap(), doc)
    }

    fn ids(hits: &SearchHits) -> Vec<&str> {
        hits.hits.iter().map(|h| h.id.as_str()).collect()
    }

    fn sample_index() -> RecipeIndex {
        let idx = RecipeIndex::open_in_ram().unwrap();
        let mut writer = idx.writer(15_000_000).unwrap();
        idx.add_recipe(
            &writer,
            &recipe(
                "soup",
                "# Tomato Soup\nTags: easy, warm\n* tomatoes\n* salt\nSimmer gently.",
            ),
        )
        .unwrap();
        idx.add_recipe(
            &writer,
            &recipe(
                "cake",
                "# Chocolate Cake\nTags: sweet\n* flour\n* chocolate\nBake for an hour.",
            ),
        )
        .unwrap();
        writer.commit().unwrap();
        idx
    }

    #[test]
    fn create_and_search() {
        let idx = sample_index();
        let results = idx.search("tomato", 10).unwrap();
        assert_eq!(ids(&results), vec!["soup"]);
        assert_eq!(results.total, 1);
    }

    #[test]
    fn searches_ingredients_and_tags() {
        let idx = sample_index();
        assert_eq!(ids(&idx.search("flour", 10).unwrap()), vec!["cake"]);
        assert_eq!(ids(&idx.search("warm", 10).unwrap()), vec!["soup"]);
    }

    #[test]
    fn required_and_excluded_terms() {
        let idx = sample_index();
        let both = idx.search("+salt +flour", 10).unwrap();
        assert!(both.hits.is_empty());

        let excluded = idx.search("+bake -tomato", 10).unwrap();
        assert_eq!(ids(&excluded), vec!["cake"]);
    }

    #[test]
    fn stemming_works() {
        let idx = sample_index();
        // "simmering" and "simmer" share a stem.
        let results = idx.search("simmering", 10).unwrap();
        assert_eq!(ids(&results), vec!["soup"]);
    }

    #[test]
    fn limit_caps_hits_but_not_total() {
        let idx = sample_index();
        let results = idx.search("easy sweet", 1).unwrap();
        assert_eq!(results.hits.len(), 1);
        assert_eq!(results.total, 2);
    }

    #[test]
    fn unknown_field_is_invalid_query() {
        let idx = sample_index();
        let err = idx.search("+nosuchfield:x", 10).unwrap_err();
        assert!(matches!(err, Error::InvalidQuery { .. }));
    }

    #[test]
    fn delete_recipe() {
        let idx = sample_index();
        let mut writer = idx.writer(15_000_000).unwrap();
        idx.delete_recipe(&writer, &RecipeId::new("soup").unwrap());
        writer.commit().unwrap();

        assert!(idx.search("tomato", 10).unwrap().hits.is_empty());
        assert_eq!(idx.num_docs().unwrap(), 1);
    }

    #[test]
    fn update_replaces_existing_entry() {
        let idx = sample_index();
        let mut writer = idx.writer(15_000_000).unwrap();
        idx.add_recipe(&writer, &recipe("soup", "# Pea Soup\n* peas\nBlend."))
            .unwrap();
        writer.commit().unwrap();

        assert!(idx.search("tomato", 10).unwrap().hits.is_empty());
        assert_eq!(ids(&idx.search("peas", 10).unwrap()), vec!["soup"]);
        assert_eq!(idx.num_docs().unwrap(), 2);
    }

    #[test]
    fn lists_indexed_ids() {
        let idx = sample_index();
        let listed = idx.indexed_ids().unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.contains("soup"));
        assert!(listed.contains("cake"));
    }

    #[test]
    fn disk_persistence() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("index");

        assert!(RecipeIndex::open_existing(&dir).unwrap().is_none());

        {
            let idx = RecipeIndex::open_or_create(&dir).unwrap();
            assert!(idx.was_created());
            let mut writer = idx.writer(15_000_000).unwrap();
            idx.add_recipe(&writer, &recipe("bread", "# Bread\nKnead."))
                .unwrap();
            writer.commit().unwrap();
        }

        {
            let idx = RecipeIndex::open_or_create(&dir).unwrap();
            assert!(!idx.was_created());
            assert_eq!(ids(&idx.search("bread", 10).unwrap()), vec!["bread"]);
        }

        let existing = RecipeIndex::open_existing(&dir).unwrap().unwrap();
        assert_eq!(existing.num_docs().unwrap(), 1);
    }
}
