//! Method vocabulary: HTTP methods plus GraphQL operation types.

/// Marker for declarations that accept every method.
pub const ANY: &str = "ANY";

/// Methods recognised in verb tokens and method arguments.
pub const METHODS: &[&str] = &[
    "GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS", "TRACE", "CONNECT",
];

/// GraphQL operation types, used as the method of resolver fields.
pub const OPERATIONS: &[&str] = &["QUERY", "MUTATION", "SUBSCRIPTION"];

/// Canonical upper-case method for a verb spelling, if it names one.
///
/// Matching is case-insensitive. `all`, `any` and `*` map to [`ANY`].
pub fn canonical_method(word: &str) -> Option<&'static str> {
    let word = word.trim();
    if word == "*" || word.eq_ignore_ascii_case("all") || word.eq_ignore_ascii_case("any") {
        return Some(ANY);
    }
    METHODS.iter().copied().find(|m| m.eq_ignore_ascii_case(word))
}

/// Like [`canonical_method`], but also accepts an operation type. Only
/// profile tables can map a token to an operation; arguments never do.
pub fn canonical_verb(word: &str) -> Option<&'static str> {
    canonical_method(word).or_else(|| {
        let word = word.trim();
        OPERATIONS.iter().copied().find(|m| m.eq_ignore_ascii_case(word))
    })
}
