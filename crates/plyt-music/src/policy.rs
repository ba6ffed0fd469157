use plyt_config::DEFAULT_DENYLIST;
use plyt_core::{CandidateMatch, SearchQuery};
use regex::Regex;
use tracing::warn;

/// Decides whether a search hit counts as a match for the query that found it.
pub trait AcceptancePolicy: Send + Sync {
    fn accept(&self, query: &SearchQuery, candidate: &CandidateMatch) -> bool;
}

/// Accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl AcceptancePolicy for AcceptAll {
    fn accept(&self, _query: &SearchQuery, _candidate: &CandidateMatch) -> bool {
        true
    }
}

/// Rejects candidates whose title or channel contains a denylisted keyword as
/// a whole word, case-insensitively. A keyword the query itself contains is
/// not held against candidates of that query.
#[derive(Debug, Clone)]
pub struct KeywordDenylist {
    keywords: Vec<(String, Regex)>,
}

impl Default for KeywordDenylist {
    fn default() -> Self {
        Self::new(DEFAULT_DENYLIST.iter().copied())
    }
}

impl KeywordDenylist {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .filter_map(|keyword| {
                let keyword = keyword.as_ref().trim().to_lowercase();
                if keyword.is_empty() {
                    return None;
                }
                let pattern = format!(r"(?i)\b{}\b", regex::escape(&keyword));
                match Regex::new(&pattern) {
                    Ok(regex) => Some((keyword, regex)),
                    Err(err) => {
                        warn!(%keyword, %err, "ignoring unusable denylist keyword");
                        None
                    }
                }
            })
            .collect();
        Self { keywords }
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(|(keyword, _)| keyword.as_str())
    }
}

impl AcceptancePolicy for KeywordDenylist {
    fn accept(&self, query: &SearchQuery, candidate: &CandidateMatch) -> bool {
        !self.keywords.iter().any(|(_, regex)| {
            !regex.is_match(&query.text)
                && (regex.is_match(&candidate.title)
                    || regex.is_match(&candidate.channel_or_uploader))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(text: &str) -> SearchQuery {
        SearchQuery {
            text: text.to_string(),
            priority_rank: 0,
        }
    }

    fn candidate(title: &str, channel: &str) -> CandidateMatch {
        CandidateMatch {
            item_id: "vid".to_string(),
            title: title.to_string(),
            channel_or_uploader: channel.to_string(),
            rank: 0,
        }
    }

    #[test]
    fn default_denylist_is_pinned() {
        let policy = KeywordDenylist::default();
        let keywords: Vec<&str> = policy.keywords().collect();
        assert_eq!(
            keywords,
            vec![
                "cover",
                "karaoke",
                "instrumental",
                "nightcore",
                "reaction",
                "tutorial",
                "remake"
            ]
        );
    }

    #[test]
    fn rejects_covers_and_karaoke_in_title() {
        let policy = KeywordDenylist::default();
        let q = query("Queen Bohemian Rhapsody official audio");
        assert!(!policy.accept(&q, &candidate("Bohemian Rhapsody (Piano Cover)", "Someone")));
        assert!(!policy.accept(&q, &candidate("Bohemian Rhapsody KARAOKE", "Sing King")));
        assert!(policy.accept(
            &q,
            &candidate("Queen - Bohemian Rhapsody (Official Video)", "Queen Official")
        ));
    }

    #[test]
    fn rejects_on_channel_name() {
        let policy = KeywordDenylist::default();
        let q = query("Artist Song");
        assert!(!policy.accept(&q, &candidate("Song", "Karaoke Hits Channel")));
    }

    #[test]
    fn matches_whole_words_only() {
        let policy = KeywordDenylist::default();
        let q = query("Artist Discovery");
        assert!(policy.accept(&q, &candidate("Discovery (Full Album)", "Artist")));
        assert!(policy.accept(&q, &candidate("Uncovered", "Artist")));
    }

    #[test]
    fn keyword_in_query_is_not_held_against_candidates() {
        let policy = KeywordDenylist::default();
        let q = query("Zac Brown Band Cover Me Up");
        assert!(policy.accept(&q, &candidate("Cover Me Up", "Zac Brown Band")));
        // other keywords still apply
        assert!(!policy.accept(&q, &candidate("Cover Me Up karaoke", "Sing King")));
    }

    #[test]
    fn custom_denylist_replaces_default() {
        let policy = KeywordDenylist::new(["8d audio", " "]);
        let q = query("Artist Song");
        assert_eq!(policy.keywords().count(), 1);
        assert!(!policy.accept(&q, &candidate("Song (8D Audio)", "x")));
        assert!(policy.accept(&q, &candidate("Song (cover)", "x")));
    }

    #[test]
    fn accept_all_accepts() {
        assert!(AcceptAll.accept(&query("a"), &candidate("karaoke cover", "x")));
    }
}
