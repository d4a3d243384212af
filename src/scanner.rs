use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // require ( "..." ) or require ( '...' ), whitespace allowed between tokens
    static ref REQUIRE_CALL: Regex =
        Regex::new(r#"\brequire\s*\(\s*(?:"([^"]*)"|'([^']*)')\s*\)"#).unwrap();
}

/// Returns the literal argument of every `require("...")` call in `source`,
/// in order of appearance, duplicates included.
///
/// This is a textual scan, not a parse: calls inside comments and strings are
/// reported too, and calls with a non-literal argument are missed.
pub fn scan_requires(source: &str) -> Vec<String> {
    REQUIRE_CALL
        .captures_iter(source)
        .filter_map(|captures| captures.get(1).or_else(|| captures.get(2)))
        .map(|request| request.as_str().to_string())
        .collect()
}
