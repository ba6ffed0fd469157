use std::sync::LazyLock;

use regex::Regex;

static PLAYLIST_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:playlist/|playlist:)([A-Za-z0-9]{22})").expect("static regex")
});
static BARE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{22}$").expect("static regex"));

/// Accepts `https://open.spotify.com/playlist/<id>`, `spotify:playlist:<id>`
/// or the bare 22-character id.
pub fn parse_spotify_playlist_id(input: &str) -> Option<String> {
    let input = input.trim();
    if let Some(captures) = PLAYLIST_REF.captures(input) {
        return captures.get(1).map(|m| m.as_str().to_string());
    }
    if BARE_ID.is_match(input) {
        return Some(input.to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::parse_spotify_playlist_id;

    #[test]
    fn parses_playlist_url() {
        let url = "https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M";
        assert_eq!(
            parse_spotify_playlist_id(url),
            Some("37i9dQZF1DXcBWIGoYBM5M".to_string())
        );
    }

    #[test]
    fn parses_playlist_url_with_query_and_user_path() {
        let url = "https://open.spotify.com/user/spotify/playlist/37i9dQZF1DXcBWIGoYBM5M?si=qwerty";
        assert_eq!(
            parse_spotify_playlist_id(url),
            Some("37i9dQZF1DXcBWIGoYBM5M".to_string())
        );
    }

    #[test]
    fn parses_uri_and_bare_id() {
        assert_eq!(
            parse_spotify_playlist_id("spotify:playlist:37i9dQZF1DXcBWIGoYBM5M"),
            Some("37i9dQZF1DXcBWIGoYBM5M".to_string())
        );
        assert_eq!(
            parse_spotify_playlist_id("37i9dQZF1DXcBWIGoYBM5M"),
            Some("37i9dQZF1DXcBWIGoYBM5M".to_string())
        );
    }

    #[test]
    fn rejects_albums_and_garbage() {
        assert_eq!(
            parse_spotify_playlist_id("https://open.spotify.com/album/0sNOF9WDwhWunNAHPD3qjc"),
            None
        );
        assert_eq!(parse_spotify_playlist_id("invalid_url_string"), None);
    }
}
