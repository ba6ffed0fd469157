mod config;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::PlytConfig;
use plyt_core::{PlytError, PlytResult, Privacy};
use tracing::{debug, warn};

pub use config::{
    DEFAULT_DENYLIST, DEFAULT_QUALIFIERS, OutputConfig, PlytConfig as PlytConfigData,
    SpotifyConfig, TransferConfig, YoutubeConfig,
};

const LIST_KEYS: &[&str] = &["transfer.qualifiers", "transfer.denylist"];

pub fn config_path() -> PlytResult<PathBuf> {
    if let Some(dir) = env_value("PLYT_CONFIG_DIR") {
        return Ok(PathBuf::from(dir).join("config.toml"));
    }
    let home = dirs::home_dir()
        .ok_or_else(|| PlytError::Config("home directory not found".to_string()))?;
    Ok(home.join(".plyt").join("config.toml"))
}

pub fn load_config() -> PlytResult<PlytConfig> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> PlytResult<PlytConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(PlytConfig::default());
    }
    let content = fs::read_to_string(path)
        .map_err(|err| PlytError::Config(format!("failed to read config: {err}")))?;
    let config = toml::from_str(&content)
        .map_err(|err| PlytError::Config(format!("failed to parse config: {err}")))?;
    Ok(config)
}

pub fn save_config(config: &PlytConfig) -> PlytResult<()> {
    save_config_to(config, &config_path()?)
}

pub fn save_config_to(config: &PlytConfig, path: &Path) -> PlytResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| PlytError::Config(format!("failed to create config dir: {err}")))?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|err| PlytError::Config(format!("failed to serialize config: {err}")))?;
    fs::write(path, content)
        .map_err(|err| PlytError::Config(format!("failed to write config: {err}")))?;
    Ok(())
}

pub fn config_exists() -> PlytResult<bool> {
    let path = config_path()?;
    Ok(path.exists())
}

fn env_value(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn first_env(keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| env_value(key))
}

pub fn resolve_spotify_credentials(config: &PlytConfig) -> Option<(String, String)> {
    let id = first_env(&["PLYT_SPOTIFY_CLIENT_ID", "SPOTIPY_CLIENT_ID"])
        .or_else(|| config.spotify.client_id.clone())?;
    let secret = first_env(&["PLYT_SPOTIFY_CLIENT_SECRET", "SPOTIPY_CLIENT_SECRET"])
        .or_else(|| config.spotify.client_secret.clone())?;
    if id.trim().is_empty() || secret.trim().is_empty() {
        return None;
    }
    Some((id, secret))
}

pub fn resolve_youtube_token_file(config: &PlytConfig) -> Option<PathBuf> {
    if let Some(value) = env_value("PLYT_YOUTUBE_TOKEN_FILE") {
        return Some(PathBuf::from(value));
    }
    if let Some(value) = &config.youtube.token_file {
        return Some(PathBuf::from(value));
    }
    config_path()
        .ok()
        .and_then(|path| path.parent().map(|dir| dir.join("token.json")))
}

pub fn resolve_youtube_client_secrets(config: &PlytConfig) -> Option<PathBuf> {
    first_env(&[
        "PLYT_YOUTUBE_CLIENT_SECRETS_FILE",
        "YOUTUBE_CLIENT_SECRETS_FILE",
    ])
    .or_else(|| config.youtube.client_secrets_file.clone())
    .map(PathBuf::from)
}

pub fn resolve_youtube_access_token(config: &PlytConfig) -> Option<String> {
    env_value("PLYT_YOUTUBE_ACCESS_TOKEN").or_else(|| config.youtube.access_token.clone())
}

pub fn resolve_privacy(config: &PlytConfig, explicit: Option<&str>) -> Privacy {
    let raw = explicit
        .map(str::to_string)
        .or_else(|| config.transfer.privacy.clone());
    match raw {
        None => Privacy::default(),
        Some(raw) => raw.parse().unwrap_or_else(|err| {
            warn!(%err, "falling back to private playlist");
            Privacy::Private
        }),
    }
}

pub fn resolve_simple_output(config: &PlytConfig) -> Option<bool> {
    if let Ok(value) = env::var("PLYT_OUTPUT_SIMPLE") {
        let normalized = value.to_lowercase();
        return Some(normalized == "1" || normalized == "true" || normalized == "yes");
    }
    config.output.simple
}

/// Parses a command-line value into the TOML type it most likely means.
fn typed_value(key_path: &str, value: &str) -> toml_edit::Item {
    if LIST_KEYS.contains(&key_path) {
        let mut array = toml_edit::Array::new();
        for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            array.push(part);
        }
        return toml_edit::value(array);
    }
    if let Ok(flag) = value.parse::<bool>() {
        return toml_edit::value(flag);
    }
    if let Ok(number) = value.parse::<i64>() {
        return toml_edit::value(number);
    }
    toml_edit::value(value)
}

pub fn set_config_value(key_path: &str, value: &str) -> PlytResult<()> {
    set_config_value_at(&config_path()?, key_path, value)
}

pub fn set_config_value_at(path: &Path, key_path: &str, value: &str) -> PlytResult<()> {
    let content = if path.exists() {
        fs::read_to_string(path)
            .map_err(|err| PlytError::Config(format!("failed to read config: {err}")))?
    } else {
        String::new()
    };

    let mut doc = content
        .parse::<toml_edit::DocumentMut>()
        .unwrap_or_default();

    let parts: Vec<&str> = key_path.split('.').collect();
    let Some((last_part, parents)) = parts.split_last().filter(|_| parts.len() >= 2) else {
        return Err(PlytError::Config(
            "key path must have at least 2 parts (e.g., 'spotify.client_id')".to_string(),
        ));
    };

    let mut current = doc.as_table_mut();
    for part in parents {
        current = current
            .entry(part)
            .or_insert(toml_edit::Item::Table(Default::default()))
            .as_table_mut()
            .ok_or_else(|| {
                PlytError::Config(format!("cannot set nested value in '{}'", key_path))
            })?;
    }

    current[*last_part] = typed_value(key_path, value);

    // Reject edits that would leave the file unloadable.
    let content = doc.to_string();
    toml::from_str::<PlytConfig>(&content)
        .map_err(|err| PlytError::Config(format!("invalid value for '{key_path}': {err}")))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| PlytError::Config(format!("failed to create config dir: {err}")))?;
    }
    fs::write(path, content)
        .map_err(|err| PlytError::Config(format!("failed to write config: {err}")))?;

    Ok(())
}

pub fn open_in_editor() -> PlytResult<()> {
    let path = config_path()?;
    if !path.exists() {
        save_config(&PlytConfig::default())?;
    }

    let editor = env::var("EDITOR").unwrap_or_else(|_| {
        if cfg!(target_os = "macos") {
            "vim".to_string()
        } else if cfg!(target_os = "windows") {
            "notepad".to_string()
        } else {
            "nano".to_string()
        }
    });

    let status = Command::new(&editor)
        .arg(&path)
        .status()
        .map_err(|err| PlytError::Config(format!("failed to open editor '{}': {}", editor, err)))?;

    if !status.success() {
        return Err(PlytError::Config(format!(
            "editor exited with status: {}",
            status
        )));
    }

    Ok(())
}
