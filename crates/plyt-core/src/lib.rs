mod error;
mod model;

use std::sync::LazyLock;

use regex::Regex;

pub use error::{PlytError, PlytResult};
pub use model::{
    AddOutcome, AddStatus, CandidateMatch, MatchStatus, PlaylistCreationResult, PlaylistSpec,
    Privacy, RunState, SearchQuery, Track, TransferReport, TransferResult, TransferSummary,
};

/// YouTube rejects overly long titles; stay well under its limit.
pub const MAX_PLAYLIST_TITLE_CHARS: usize = 100;

static TITLE_DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s\-()]").expect("static regex"));
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

pub fn validate_url(url: &str) -> PlytResult<()> {
    url::Url::parse(url).map_err(|err| PlytError::InvalidInput(format!("invalid url: {err}")))?;
    Ok(())
}

/// Keeps word characters, whitespace, `-` and parentheses, collapses
/// whitespace and truncates to [`MAX_PLAYLIST_TITLE_CHARS`].
pub fn sanitize_playlist_title(name: &str) -> String {
    let stripped = TITLE_DISALLOWED.replace_all(name, "");
    let collapsed = WHITESPACE_RUN.replace_all(&stripped, " ");
    collapsed
        .trim()
        .chars()
        .take(MAX_PLAYLIST_TITLE_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::{sanitize_playlist_title, validate_url};
    use crate::PlytError;

    #[test]
    fn test_validate_url_valid_https() {
        assert!(validate_url("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M").is_ok());
    }

    #[test]
    fn test_validate_url_invalid() {
        let result = validate_url("not-a-url");
        assert!(matches!(result, Err(PlytError::InvalidInput(_))));
    }

    #[test]
    fn test_validate_url_error_message() {
        let result = validate_url("://no-scheme");
        match result {
            Err(PlytError::InvalidInput(msg)) => assert!(msg.contains("invalid url")),
            _ => panic!("Expected InvalidInput error"),
        }
    }

    #[test]
    fn sanitize_strips_punctuation_and_spaces() {
        assert_eq!(
            sanitize_playlist_title("My Awesome! Playlist*"),
            "My Awesome Playlist"
        );
        assert_eq!(sanitize_playlist_title("  Extra   Spaces  "), "Extra Spaces");
        assert_eq!(
            sanitize_playlist_title("Road Trip (on YouTube)"),
            "Road Trip (on YouTube)"
        );
    }

    #[test]
    fn sanitize_caps_length() {
        let long = "a".repeat(250);
        assert_eq!(sanitize_playlist_title(&long).chars().count(), 100);
    }
}
