use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use plyt_core::{AddStatus, CandidateMatch, PlaylistCreationResult, PlytError, PlytResult, Privacy};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::api::{http_client, is_transient_status, request_error};
use crate::auth::{AccessToken, StaticToken, TokenCache, TokenRefresher};
use crate::backend::Destination;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const MUSIC_CATEGORY_ID: &str = "10";

const QUOTA_REASONS: &[&str] = &["quotaExceeded", "dailyLimitExceeded"];
const TRANSIENT_REASONS: &[&str] = &["rateLimitExceeded", "userRateLimitExceeded", "backendError"];
const NOT_FOUND_REASONS: &[&str] = &["videoNotFound", "playlistNotFound"];
const DUPLICATE_REASONS: &[&str] = &["videoAlreadyInPlaylist"];

/// How a non-success response should be treated.
#[derive(Debug)]
pub(crate) enum Rejection {
    /// The item is already in the playlist.
    Duplicate,
    Error(PlytError),
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    reason: Option<String>,
}

pub(crate) fn classify_error(status: u16, body: &str) -> Rejection {
    let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap_or_default();
    let error = envelope.error.unwrap_or_default();
    let reasons: Vec<&str> = error
        .errors
        .iter()
        .filter_map(|detail| detail.reason.as_deref())
        .collect();
    let has = |wanted: &[&str]| reasons.iter().any(|reason| wanted.contains(reason));
    let message = error
        .message
        .unwrap_or_else(|| format!("status={status}"));

    if has(QUOTA_REASONS) {
        return Rejection::Error(PlytError::QuotaExceeded(message));
    }
    if has(DUPLICATE_REASONS) || status == 409 {
        return Rejection::Duplicate;
    }
    let err = match status {
        401 => PlytError::AuthRequired(message),
        _ if has(TRANSIENT_REASONS) || is_transient_status(status) => {
            PlytError::TransientUpstream(message)
        }
        _ if status == 404 || has(NOT_FOUND_REASONS) => PlytError::NotFound(message),
        _ => PlytError::Api(format!("youtube error: status={status} {message}")),
    };
    Rejection::Error(err)
}

impl From<Rejection> for PlytError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::Duplicate => PlytError::Api("item already in playlist".to_string()),
            Rejection::Error(err) => err,
        }
    }
}

/// YouTube Data API v3 client acting for one authorized user.
#[derive(Debug, Clone)]
pub struct YoutubeClient {
    client: Client,
    api_base: String,
    tokens: Arc<TokenCache>,
}

impl YoutubeClient {
    pub fn new(tokens: Arc<TokenCache>) -> PlytResult<Self> {
        Ok(Self::with_endpoint(http_client()?, API_BASE, tokens))
    }

    pub fn with_endpoint(
        client: Client,
        api_base: impl Into<String>,
        tokens: Arc<TokenCache>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    /// Sends the request built by `build`. A 401 drops the cached token and
    /// tries once more with a fresh one.
    async fn send<T, F>(&self, context: &str, build: F) -> Result<T, Rejection>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let mut reauthorized = false;
        loop {
            let token = self.tokens.access_token().await.map_err(Rejection::Error)?;
            let response = build()
                .bearer_auth(&token)
                .send()
                .await
                .map_err(|err| Rejection::Error(request_error(context, err)))?;

            let status = response.status().as_u16();
            if response.status().is_success() {
                return response.json::<T>().await.map_err(|err| {
                    Rejection::Error(PlytError::Parse(format!(
                        "youtube {context} response parse failed: {err}"
                    )))
                });
            }

            let body = response.text().await.unwrap_or_default();
            if status == 401 {
                self.tokens.invalidate(&token).await;
                if !reauthorized {
                    reauthorized = true;
                    debug!(context, "youtube rejected the token, retrying with a fresh one");
                    continue;
                }
            }
            let rejection = classify_error(status, &body);
            if let Rejection::Error(err) = &rejection {
                warn!(context, status, error = %err, "youtube api error");
            }
            return Err(rejection);
        }
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/{resource}", self.api_base)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchId,
    snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
struct SearchId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: Option<String>,
    #[serde(rename = "channelTitle")]
    channel_title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InsertedResource {
    id: String,
}

/// Snippet titles come back HTML-escaped. Undecodable text is kept as is.
fn unescape_html(text: &str) -> String {
    htmlescape::decode_html(text).unwrap_or_else(|_| {
        debug!(text, "could not decode html entities");
        text.to_string()
    })
}

#[async_trait]
impl Destination for YoutubeClient {
    async fn search(&self, query: &str, max_results: u32) -> PlytResult<Vec<CandidateMatch>> {
        let url = self.url("search");
        let max_results = max_results.to_string();
        let response: SearchResponse = self
            .send("search", || {
                self.client.get(&url).query(&[
                    ("part", "snippet"),
                    ("q", query),
                    ("type", "video"),
                    ("maxResults", max_results.as_str()),
                    ("videoCategoryId", MUSIC_CATEGORY_ID),
                ])
            })
            .await?;

        let candidates: Vec<CandidateMatch> = response
            .items
            .into_iter()
            .filter_map(|item| {
                let item_id = item.id.video_id?;
                let snippet = item.snippet;
                let title = snippet
                    .as_ref()
                    .and_then(|s| s.title.as_deref())
                    .map(unescape_html)
                    .unwrap_or_default();
                let channel = snippet
                    .as_ref()
                    .and_then(|s| s.channel_title.as_deref())
                    .map(unescape_html)
                    .unwrap_or_default();
                Some((item_id, title, channel))
            })
            .enumerate()
            .map(|(rank, (item_id, title, channel_or_uploader))| CandidateMatch {
                item_id,
                title,
                channel_or_uploader,
                rank,
            })
            .collect();
        debug!(%query, hits = candidates.len(), "youtube search");
        Ok(candidates)
    }

    async fn create_playlist(
        &self,
        name: &str,
        privacy: Privacy,
        description: &str,
    ) -> PlytResult<PlaylistCreationResult> {
        let url = self.url("playlists");
        let body = json!({
            "snippet": { "title": name, "description": description },
            "status": { "privacyStatus": privacy.as_str() },
        });
        let created: InsertedResource = self
            .send("playlists.insert", || {
                self.client
                    .post(&url)
                    .query(&[("part", "snippet,status")])
                    .json(&body)
            })
            .await?;
        info!(playlist_id = %created.id, "youtube playlist created");
        Ok(PlaylistCreationResult::from_id(created.id))
    }

    async fn add_item(&self, playlist_id: &str, item_id: &str) -> PlytResult<AddStatus> {
        let url = self.url("playlistItems");
        let body = json!({
            "snippet": {
                "playlistId": playlist_id,
                "resourceId": { "kind": "youtube#video", "videoId": item_id },
            },
        });
        let result: Result<Value, Rejection> = self
            .send("playlistItems.insert", || {
                self.client
                    .post(&url)
                    .query(&[("part", "snippet")])
                    .json(&body)
            })
            .await;
        match result {
            Ok(_) => Ok(AddStatus::Added),
            Err(Rejection::Duplicate) => Ok(AddStatus::SkippedDuplicate),
            Err(Rejection::Error(err)) => Err(err),
        }
    }
}

/// On-disk OAuth token. Also reads the `token` key written by Google's own
/// client libraries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredToken {
    #[serde(alias = "token")]
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Unix seconds.
    pub expires_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl StoredToken {
    pub fn load(path: &Path) -> PlytResult<Self> {
        let content = fs::read_to_string(path).map_err(|err| {
            PlytError::AuthRequired(format!(
                "no YouTube authorization at {} ({err}); authorize and save the token there",
                path.display()
            ))
        })?;
        serde_json::from_str(&content).map_err(|err| {
            PlytError::AuthRequired(format!("unreadable token file {}: {err}", path.display()))
        })
    }

    pub fn save(&self, path: &Path) -> PlytResult<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|err| PlytError::Parse(format!("token serialize failed: {err}")))?;
        fs::write(path, content)
            .map_err(|err| PlytError::Config(format!("failed to write {}: {err}", path.display())))
    }

    /// The stored access token, if it carries a known expiry.
    pub fn access_token(&self) -> Option<AccessToken> {
        let secret = self.access_token.clone()?;
        let expires_at = UNIX_EPOCH + Duration::from_secs(self.expires_at?);
        Some(AccessToken {
            secret,
            expires_at: Some(expires_at),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

#[derive(Debug, Clone, Deserialize)]
struct ClientSecrets {
    client_id: String,
    client_secret: String,
}

fn read_client_secrets(path: &Path) -> PlytResult<ClientSecrets> {
    let content = fs::read_to_string(path)
        .map_err(|err| PlytError::Config(format!("failed to read {}: {err}", path.display())))?;
    let file: ClientSecretsFile = serde_json::from_str(&content).map_err(|err| {
        PlytError::Config(format!("invalid client secrets {}: {err}", path.display()))
    })?;
    file.installed.or(file.web).ok_or_else(|| {
        PlytError::Config(format!(
            "{} has neither an \"installed\" nor a \"web\" client",
            path.display()
        ))
    })
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: Option<u64>,
}

/// Refresh-token grant against Google's OAuth endpoint. New tokens are
/// written back to the token file.
#[derive(Debug, Clone)]
pub struct GoogleRefresher {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    token_file: Option<PathBuf>,
    /// Client id and secret live in the token file and must be written back.
    stores_client: bool,
}

impl GoogleRefresher {
    pub fn new(
        client: Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            token_file: None,
            stores_client: false,
        }
    }

    pub fn persist_to(mut self, token_file: impl Into<PathBuf>) -> Self {
        self.token_file = Some(token_file.into());
        self
    }

    /// Builds a refresher from a stored token plus the client id and secret,
    /// taken from the token itself or from `client_secrets`.
    pub fn from_stored(
        client: Client,
        stored: &StoredToken,
        client_secrets: Option<&Path>,
    ) -> PlytResult<Self> {
        let refresh_token = stored
            .refresh_token
            .clone()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                PlytError::AuthRequired("stored YouTube token has no refresh token".to_string())
            })?;
        let embedded = stored.client_id.clone().zip(stored.client_secret.clone());
        let (client_id, client_secret, stores_client) = match embedded {
            Some((id, secret)) => (id, secret, true),
            None => {
                let path = client_secrets.ok_or_else(|| {
                    PlytError::Config(
                        "YouTube client secrets file is not configured (youtube.client_secrets_file)"
                            .to_string(),
                    )
                })?;
                let secrets = read_client_secrets(path)?;
                (secrets.client_id, secrets.client_secret, false)
            }
        };
        let mut refresher = Self::new(
            client,
            GOOGLE_TOKEN_URL,
            client_id,
            client_secret,
            refresh_token,
        );
        refresher.stores_client = stores_client;
        Ok(refresher)
    }

    fn persist(&self, token: &AccessToken) {
        let Some(path) = &self.token_file else {
            return;
        };
        let stored = StoredToken {
            access_token: Some(token.secret.clone()),
            refresh_token: Some(self.refresh_token.clone()),
            expires_at: token
                .expires_at
                .and_then(|at| at.duration_since(UNIX_EPOCH).ok())
                .map(|since| since.as_secs()),
            client_id: self.stores_client.then(|| self.client_id.clone()),
            client_secret: self.stores_client.then(|| self.client_secret.clone()),
        };
        if let Err(err) = stored.save(path) {
            warn!(path = %path.display(), error = %err, "could not save refreshed token");
        }
    }
}

#[async_trait]
impl TokenRefresher for GoogleRefresher {
    async fn refresh(&self) -> PlytResult<AccessToken> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.refresh_token.as_str()),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|err| request_error("google token", err))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            if is_transient_status(status) {
                return Err(PlytError::TransientUpstream(format!(
                    "google token endpoint: status={status}"
                )));
            }
            return Err(PlytError::AuthRequired(format!(
                "YouTube refresh token was rejected (status={status}): {body}"
            )));
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|err| PlytError::Parse(format!("google token response: {err}")))?;
        let token = AccessToken::new(
            refreshed.access_token,
            refreshed.expires_in.map(Duration::from_secs),
        );
        self.persist(&token);
        Ok(token)
    }
}

/// Shared token cache for the YouTube client. A pre-issued access token
/// wins over the token file.
pub fn youtube_token_cache(
    access_token: Option<String>,
    token_file: Option<&Path>,
    client_secrets: Option<&Path>,
) -> PlytResult<TokenCache> {
    if let Some(token) = access_token.filter(|token| !token.trim().is_empty()) {
        return Ok(TokenCache::new("youtube", StaticToken(token)));
    }
    let token_file = token_file.ok_or_else(|| {
        PlytError::AuthRequired("no YouTube token file configured (youtube.token_file)".to_string())
    })?;
    let stored = StoredToken::load(token_file)?;
    let refresher = GoogleRefresher::from_stored(http_client()?, &stored, client_secrets)?
        .persist_to(token_file);
    let cache = TokenCache::new("youtube", refresher);
    Ok(match stored.access_token() {
        Some(token) if token.is_fresh_at(SystemTime::now()) => cache.with_token(token),
        _ => cache,
    })
}
