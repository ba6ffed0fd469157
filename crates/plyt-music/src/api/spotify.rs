use std::time::Duration;

use async_trait::async_trait;
use plyt_core::{PlytError, PlytResult, Track};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::api::{http_client, is_transient_status, request_error};
use crate::auth::{AccessToken, TokenCache, TokenRefresher};
use crate::backend::TrackSource;
use crate::retry::RetryPolicy;

const API_BASE: &str = "https://api.spotify.com/v1";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const PAGE_SIZE: &str = "100";

/// Client-credentials grant; only public playlists are readable with it.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl ClientCredentials {
    pub fn new(
        client: Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

#[async_trait]
impl TokenRefresher for ClientCredentials {
    async fn refresh(&self) -> PlytResult<AccessToken> {
        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|err| request_error("spotify token", err))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            if is_transient_status(status) {
                return Err(PlytError::TransientUpstream(format!(
                    "spotify token endpoint: status={status}"
                )));
            }
            return Err(PlytError::Config(format!(
                "spotify rejected the client credentials (status={status}): {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| PlytError::Parse(format!("spotify token response: {err}")))?;
        Ok(AccessToken::new(
            token.access_token,
            token.expires_in.map(Duration::from_secs),
        ))
    }
}

#[derive(Debug)]
pub struct SpotifyClient {
    client: Client,
    api_base: String,
    tokens: TokenCache,
    retry: RetryPolicy,
}

impl SpotifyClient {
    pub fn new(client_id: &str, client_secret: &str) -> PlytResult<Self> {
        let client = http_client()?;
        let credentials =
            ClientCredentials::new(client.clone(), TOKEN_URL, client_id, client_secret);
        Ok(Self::with_endpoints(client, API_BASE, credentials))
    }

    pub fn with_endpoints(
        client: Client,
        api_base: impl Into<String>,
        refresher: impl TokenRefresher + 'static,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            tokens: TokenCache::new("spotify", refresher),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> PlytResult<T> {
        let token = self.tokens.access_token().await?;
        debug!(%url, "spotify GET");
        let response = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|err| request_error("spotify", err))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%url, status, "spotify api error");
            return Err(match status {
                401 => {
                    // expired client-credentials token; the retry picks up a new one
                    self.tokens.invalidate(&token).await;
                    PlytError::TransientUpstream("spotify token rejected".to_string())
                }
                400 | 404 => PlytError::NotFound(format!(
                    "spotify playlist not found or not public (status={status})"
                )),
                s if is_transient_status(s) => {
                    PlytError::TransientUpstream(format!("spotify status={status}"))
                }
                _ => PlytError::Api(format!("spotify error: status={status} body={body}")),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|err| PlytError::Parse(format!("spotify response parse failed: {err}")))
    }

    async fn get_with_retry<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
        query: &[(&str, &str)],
    ) -> PlytResult<T> {
        self.retry
            .run(operation, move || self.get_json::<T>(url, query))
            .await
    }
}

#[derive(Debug, Deserialize)]
struct TracksPage {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    #[serde(default)]
    is_local: bool,
    track: Option<TrackObject>,
}

#[derive(Debug, Deserialize)]
struct TrackObject {
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    artists: Vec<ArtistObject>,
    duration_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ArtistObject {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistObject {
    name: Option<String>,
}

impl PlaylistItem {
    /// `None` for episodes and removed tracks.
    fn into_track(self) -> Option<Track> {
        let track = self.track?;
        if track.kind.as_deref().is_some_and(|kind| kind != "track") {
            return None;
        }
        let title = track.name.filter(|name| !name.trim().is_empty())?;
        let mut artists = track
            .artists
            .into_iter()
            .filter_map(|artist| artist.name)
            .filter(|name| !name.trim().is_empty());
        let primary_artist = artists.next().unwrap_or_default();
        Some(Track {
            title,
            primary_artist,
            additional_artists: artists.collect(),
            is_local: self.is_local,
            duration_ms: track.duration_ms,
        })
    }
}

#[async_trait]
impl TrackSource for SpotifyClient {
    async fn list_tracks(&self, playlist_id: &str) -> PlytResult<Vec<Track>> {
        let first = format!("{}/playlists/{playlist_id}/tracks", self.api_base);
        let first_query = [("offset", "0"), ("limit", PAGE_SIZE)];

        let mut tracks = Vec::new();
        let mut page: TracksPage = self
            .get_with_retry("spotify_tracks", &first, &first_query)
            .await?;
        loop {
            let received = page.items.len();
            tracks.extend(page.items.into_iter().filter_map(PlaylistItem::into_track));
            debug!(%playlist_id, received, total = tracks.len(), "spotify page");

            match page.next {
                // `next` already carries offset and limit
                Some(next) => page = self.get_with_retry("spotify_tracks", &next, &[]).await?,
                None => break,
            }
        }
        Ok(tracks)
    }

    async fn playlist_name(&self, playlist_id: &str) -> PlytResult<Option<String>> {
        let url = format!("{}/playlists/{playlist_id}", self.api_base);
        let playlist: PlaylistObject = self
            .get_with_retry("spotify_playlist", &url, &[("fields", "name")])
            .await?;
        Ok(playlist.name.filter(|name| !name.trim().is_empty()))
    }
}
