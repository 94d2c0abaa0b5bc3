//! Plain-text rendering of search results for LLM consumption.

use crate::SearchResult;
use std::fmt::Write as _;

pub const HEADER: &str = "Search results:\n";
pub const SEPARATOR: &str = "----\n";

/// Render results as a single text block.
///
/// Field values are inserted verbatim. The relevance line shows the reranker score when
/// one is attached, otherwise the engine score, always with a decimal point (`1.0`, not `1`).
pub fn format_results(results: &[SearchResult]) -> String {
    let mut out = String::with_capacity(HEADER.len() + SEPARATOR.len() + results.len() * 256);
    out.push_str(HEADER);
    out.push_str(SEPARATOR);
    for r in results {
        let relevance = r.relevance_score.unwrap_or(r.score);
        // Writing into a String cannot fail.
        let _ = write!(
            out,
            "Url: {}\nRelevance: {:?}\nTitle: {}\nContent: {}\n{}",
            r.url, relevance, r.title, r.content, SEPARATOR
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn result(url: &str, title: &str, content: &str, score: f64) -> SearchResult {
        SearchResult {
            url: url.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            score,
            relevance_score: None,
        }
    }

    #[test]
    fn empty_input_is_header_only() {
        assert_eq!(format_results(&[]), "Search results:\n----\n");
    }

    #[test]
    fn single_result_layout() {
        let s = format_results(&[result("a.com", "Paris", "Paris is the capital...", 0.9)]);
        assert_eq!(
            s,
            "Search results:\n----\nUrl: a.com\nRelevance: 0.9\nTitle: Paris\nContent: Paris is the capital...\n----\n"
        );
    }

    #[test]
    fn reranked_score_wins_over_engine_score() {
        let mut r = result("a.com", "A", "alpha", 0.1);
        r.relevance_score = Some(0.75);
        let s = format_results(&[r]);
        assert!(s.contains("Relevance: 0.75\n"));
        assert!(!s.contains("Relevance: 0.1\n"));
    }

    #[test]
    fn whole_number_scores_keep_a_decimal_point() {
        let mut r = result("a.com", "A", "alpha", 2.0);
        let s = format_results(&[r.clone()]);
        assert!(s.contains("Relevance: 2.0\n"), "got: {s}");

        r.relevance_score = Some(1.0);
        assert!(format_results(&[r]).contains("Relevance: 1.0\n"));
    }

    #[test]
    fn values_are_not_escaped() {
        let s = format_results(&[result("a.com/?q=<x>&y", "T\"itle", "line1\nline2", 1.0)]);
        assert!(s.contains("Url: a.com/?q=<x>&y\n"));
        assert!(s.contains("Title: T\"itle\n"));
        assert!(s.contains("Content: line1\nline2\n"));
    }

    proptest! {
        #[test]
        fn one_record_per_result_in_input_order(
            rows in proptest::collection::vec(("[a-z]{1,12}", "[A-Za-z ]{0,20}", "[a-z ]{0,40}", 0.0f64..1.0), 0..12)
        ) {
            let results: Vec<SearchResult> = rows
                .iter()
                .enumerate()
                .map(|(i, (u, t, c, s))| result(&format!("{u}{i}.example"), t, c, *s))
                .collect();
            let out = format_results(&results);
            prop_assert!(out.starts_with("Search results:\n----\n"));

            let body = &out[HEADER.len() + SEPARATOR.len()..];
            let records: Vec<&str> = body
                .split(SEPARATOR)
                .filter(|r| !r.is_empty())
                .collect();
            prop_assert_eq!(records.len(), results.len());
            for (rec, r) in records.iter().zip(&results) {
                let url_line = format!("Url: {}\n", r.url);
                let title_line = format!("Title: {}\n", r.title);
                let content_line = format!("Content: {}\n", r.content);
                let relevance_line = format!("Relevance: {:?}\n", r.score);
                prop_assert!(rec.starts_with(&url_line));
                prop_assert!(rec.contains(&relevance_line));
                prop_assert!(rec.contains(&title_line));
                prop_assert!(rec.ends_with(&content_line));
            }
        }
    }
}
