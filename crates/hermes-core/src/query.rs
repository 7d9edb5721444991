//! Query-string parsing.
//!
//! Parsing is all-or-nothing: one malformed pair empties the whole map.

use std::collections::HashMap;

/// Parses a raw query string into a parameter map.
///
/// - pairs are separated by `&`; the value is everything after the first `=`
/// - a pair without `=` maps to an empty value
/// - keys and values are percent-decoded
/// - an empty pair, an empty key or a bad percent escape makes the whole
///   query malformed, and an empty map is returned
/// - a later duplicate key overwrites an earlier one
///
/// # Example
///
/// ```
/// use hermes_core::query::parse_query;
///
/// let params = parse_query(Some("a=1&b=2"));
/// assert_eq!(params["a"], "1");
/// assert_eq!(params["b"], "2");
///
/// assert_eq!(parse_query(Some("a"))["a"], "");
/// assert!(parse_query(Some("a=1&&")).is_empty());
/// ```
#[must_use]
pub fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return HashMap::new();
    };
    try_parse(query).unwrap_or_default()
}

fn try_parse(query: &str) -> Option<HashMap<String, String>> {
    let mut params = HashMap::new();
    for pair in query.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key.is_empty() {
            return None;
        }
        let key = urlencoding::decode(key).ok()?;
        let value = urlencoding::decode(value).ok()?;
        params.insert(key.into_owned(), value.into_owned());
    }
    Some(params)
}
