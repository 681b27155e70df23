use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("index error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid query '{query}': {source}")]
    InvalidQuery {
        query: String,
        #[source]
        source: tantivy::query::QueryParserError,
    },

    #[error("cannot parse recipe '{id}': {reason}")]
    Parse { id: String, reason: String },

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("invalid recipe id: {0:?}")]
    InvalidId(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("data directory does not exist and could not be created: {0}")]
    DataDir(PathBuf),
}

impl Error {
    pub(crate) fn recipe_not_found(id: impl Into<String>) -> Self {
        Error::NotFound {
            kind: "recipe",
            name: id.into(),
        }
    }

    /// Whether this is the recoverable "no such recipe" condition.
    ///
    /// Callers use it to prune index entries instead of failing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { kind: "recipe", .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipe_not_found_is_recognized() {
        let err = Error::recipe_not_found("soup");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "recipe not found: soup");
    }

    #[test]
    fn json_failures_have_their_own_variant() {
        let err: Error = serde_json::from_str::<u32>("{").unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));
        assert!(err.to_string().starts_with("JSON error: "));
    }

    #[test]
    fn runtime_startup_failures_are_io_errors() {
        let err: Error = std::io::Error::other("no threads").into();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_not_found());
    }

    #[test]
    fn other_errors_are_not_not_found() {
        let err = Error::Parse {
            id: "soup".into(),
            reason: "bad".into(),
        };
        assert!(!err.is_not_found());

        let io = Error::from(std::io::Error::from(
            std::io::ErrorKind::NotFound,
        ));
        assert!(!io.is_not_found());
    }
}
