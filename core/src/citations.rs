use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::types::SearchResult;

lazy_static! {
    static ref CITATION_RE: Regex = Regex::new(r"\[(\d+)\]").expect("citation marker regex is valid");
}

/// Turns `[n]` citation markers into markdown links pointing at `results[n-1]`.
///
/// Markers that are zero, out of range or too large to parse are left as they are,
/// as is the whole text when `results` is empty.
pub fn linkify_citations(text: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return text.to_string();
    }

    CITATION_RE
        .replace_all(text, |caps: &Captures| {
            let marker = &caps[0];
            let result = caps[1]
                .parse::<usize>()
                .ok()
                .filter(|n| *n >= 1)
                .and_then(|n| results.get(n - 1));

            match result {
                Some(result) => format!(
                    "{}({} \"{}\")",
                    marker,
                    result.url,
                    result.display_title().replace('"', "\\\"")
                ),
                None => marker.to_string(),
            }
        })
        .into_owned()
}
