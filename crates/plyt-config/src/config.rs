use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct YoutubeConfig {
    /// JSON file holding `access_token`, `refresh_token`, `expires_at`.
    pub token_file: Option<String>,
    /// Google installed-app `client_secret.json`, needed to refresh tokens.
    pub client_secrets_file: Option<String>,
    /// Static bearer token, bypasses the token file entirely.
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    pub privacy: Option<String>,
    pub max_results: u32,
    pub max_attempts: u32,
    pub backoff_ms: u64,
    pub throttle_ms: u64,
    pub qualifiers: Vec<String>,
    pub denylist: Vec<String>,
}

pub const DEFAULT_QUALIFIERS: &[&str] = &["official audio", "official video", "lyrics"];
pub const DEFAULT_DENYLIST: &[&str] = &[
    "cover",
    "karaoke",
    "instrumental",
    "nightcore",
    "reaction",
    "tutorial",
    "remake",
];

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            privacy: None,
            max_results: 5,
            max_attempts: 4,
            backoff_ms: 1000,
            throttle_ms: 500,
            qualifiers: DEFAULT_QUALIFIERS.iter().map(|s| s.to_string()).collect(),
            denylist: DEFAULT_DENYLIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    pub simple: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlytConfig {
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub youtube: YoutubeConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub output: OutputConfig,
}
