/// Rewrite a free-text query into the index's term syntax.
///
/// Each whitespace-separated token is handled on its own:
///
/// - `+term` and `-term` are kept as they are,
/// - `~term` becomes `term`, an optional term,
/// - any other token becomes `+term`, so plain queries match all terms.
///
/// ```
/// use larder::query::normalize;
///
/// assert_eq!(normalize("foo -bar ~baz"), "+foo -bar baz");
/// ```
pub fn normalize(query: &str) -> String {
    query
        .split_whitespace()
        .filter_map(|token| {
            if token.starts_with(['+', '-']) {
                Some(token.to_string())
            } else if let Some(optional) = token.strip_prefix('~') {
                (!optional.is_empty()).then(|| optional.to_string())
            } else {
                Some(format!("+{token}"))
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_prefixes() {
        assert_eq!(normalize("foo -bar ~baz"), "+foo -bar baz");
    }

    #[test]
    fn explicit_prefixes_pass_through() {
        assert_eq!(normalize("+a -b"), "+a -b");
    }

    #[test]
    fn extra_whitespace_collapses() {
        assert_eq!(normalize("  soup \t  tomato\n"), "+soup +tomato");
    }

    #[test]
    fn lone_tilde_is_dropped() {
        assert_eq!(normalize("soup ~"), "+soup");
    }

    #[test]
    fn empty_query() {
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn field_syntax_is_preserved() {
        assert_eq!(normalize("tags:easy ~title:soup"), "+tags:easy title:soup");
    }
}
