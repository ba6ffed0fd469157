use std::sync::LazyLock;

use plyt_config::DEFAULT_QUALIFIERS;
use plyt_core::{SearchQuery, Track};
use regex::Regex;

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*(?:\([^)]*\)|\[[^\]]*\])").expect("static regex"));
static DASH_ANNOTATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+-\s+[^-]*\b(?:remaster(?:ed)?|remix|live|version|edit|mix|mono|stereo|acoustic)\b.*$")
        .expect("static regex")
});
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

/// Turns track metadata into an ordered list of search queries.
///
/// Order: `"<artist> <clean title> <qualifier>"` for every qualifier, then
/// `"<artist> <clean title>"`, then `"<artist> <title>"` untouched. The clean
/// title has bracketed annotations and ` - ... Remaster` style suffixes removed.
/// Repeats collapse onto their first occurrence.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    qualifiers: Vec<String>,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_QUALIFIERS.iter().map(|s| s.to_string()).collect())
    }
}

impl QueryBuilder {
    pub fn new(qualifiers: Vec<String>) -> Self {
        let qualifiers = qualifiers
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();
        Self { qualifiers }
    }

    pub fn build(&self, track: &Track) -> Vec<SearchQuery> {
        let artist = track.primary_artist.trim();
        let title = track.title.trim();
        let clean_title = strip_annotations(title);
        let clean_title = if clean_title.is_empty() {
            title.to_string()
        } else {
            clean_title
        };

        let clean_base = join_words(&[artist, &clean_title]);
        let bare_base = join_words(&[artist, title]);

        // qualifiers alone would match arbitrary videos
        let mut texts: Vec<String> = if clean_base.is_empty() {
            Vec::new()
        } else {
            self.qualifiers
                .iter()
                .map(|qualifier| join_words(&[&clean_base, qualifier]))
                .collect()
        };
        texts.push(clean_base);
        texts.push(bare_base);

        let mut queries: Vec<SearchQuery> = Vec::with_capacity(texts.len());
        for text in texts {
            if queries.iter().any(|q| q.text == text) {
                continue;
            }
            queries.push(SearchQuery {
                text,
                priority_rank: queries.len() as u32,
            });
        }
        queries
    }
}

/// Query list for `track` with the default qualifiers.
pub fn build_queries(track: &Track) -> Vec<SearchQuery> {
    QueryBuilder::default().build(track)
}

fn strip_annotations(title: &str) -> String {
    let without_brackets = BRACKETED.replace_all(title, "");
    let without_suffix = DASH_ANNOTATION.replace(&without_brackets, "");
    WHITESPACE_RUN
        .replace_all(without_suffix.trim(), " ")
        .into_owned()
}

fn join_words(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
