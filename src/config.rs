use crate::error::MigrateError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Secret references resolved through 1Password (`op://vault/item/field`).
#[derive(Debug, Deserialize, Clone, Default)]
struct RawSecretRefs {
    #[serde(default)]
    youtube_oauth_client_id: Option<String>,
    #[serde(default)]
    youtube_oauth_client_secret: Option<String>,
    #[serde(default)]
    youtube_api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
struct RawPlaylists {
    #[serde(default)]
    watch_later_id: Option<String>,
    #[serde(default)]
    target_unlisted_id: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
struct RawConfig {
    #[serde(default, rename = "1password")]
    onepassword: RawSecretRefs,
    #[serde(default)]
    playlists: RawPlaylists,
    #[serde(default)]
    token_path: Option<PathBuf>,
    #[serde(default)]
    log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRefs {
    pub oauth_client_id: String,
    pub oauth_client_secret: String,
    pub api_key: Option<String>,
}

/// Validated configuration. Every required field is present and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub secrets: SecretRefs,
    pub watch_later_id: String,
    pub target_unlisted_id: String,
    pub token_path: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

fn required(value: Option<String>, key: &str, missing: &mut Vec<String>) -> String {
    match value.map(|s| s.trim().to_string()) {
        Some(s) if !s.is_empty() => s,
        _ => {
            missing.push(key.to_string());
            String::new()
        }
    }
}

impl Config {
    pub fn from_path(path: &Path) -> Result<Self, MigrateError> {
        let s = std::fs::read_to_string(path).map_err(|e| {
            MigrateError::Config(format!("reading {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&s)
    }

    pub fn from_json_str(s: &str) -> Result<Self, MigrateError> {
        let raw: RawConfig = serde_json::from_str(s)
            .map_err(|e| MigrateError::Config(format!("invalid config JSON: {}", e)))?;

        let mut missing = Vec::new();
        let oauth_client_id = required(
            raw.onepassword.youtube_oauth_client_id,
            "1password.youtube_oauth_client_id",
            &mut missing,
        );
        let oauth_client_secret = required(
            raw.onepassword.youtube_oauth_client_secret,
            "1password.youtube_oauth_client_secret",
            &mut missing,
        );
        let watch_later_id = required(
            raw.playlists.watch_later_id,
            "playlists.watch_later_id",
            &mut missing,
        );
        let target_unlisted_id = required(
            raw.playlists.target_unlisted_id,
            "playlists.target_unlisted_id",
            &mut missing,
        );
        if !missing.is_empty() {
            return Err(MigrateError::Config(format!(
                "missing required key(s): {}",
                missing.join(", ")
            )));
        }
        if watch_later_id == target_unlisted_id {
            return Err(MigrateError::Config(
                "playlists.watch_later_id and playlists.target_unlisted_id must differ".into(),
            ));
        }

        let api_key = raw
            .onepassword
            .youtube_api_key
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Config {
            secrets: SecretRefs {
                oauth_client_id,
                oauth_client_secret,
                api_key,
            },
            watch_later_id,
            target_unlisted_id,
            token_path: raw.token_path,
            log_dir: raw.log_dir,
        })
    }
}

/// Resolve the config path: an explicit path wins, otherwise prefer the
/// per-user config dir and fall back to the in-repo location.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    if let Some(dir) = dirs::config_dir() {
        let user_path = dir.join("youtube-playlist-tools").join("config.json");
        if user_path.exists() {
            return user_path;
        }
    }
    PathBuf::from("youtube_playlist_tools/config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "1password": {
            "youtube_oauth_client_id": "op://Private/YouTube/client_id",
            "youtube_oauth_client_secret": "op://Private/YouTube/client_secret"
        },
        "playlists": {
            "watch_later_id": "WL",
            "target_unlisted_id": "PLtarget"
        }
    }"#;

    #[test]
    fn parses_required_keys() {
        let cfg = Config::from_json_str(FULL).unwrap();
        assert_eq!(cfg.watch_later_id, "WL");
        assert_eq!(cfg.target_unlisted_id, "PLtarget");
        assert_eq!(cfg.secrets.oauth_client_id, "op://Private/YouTube/client_id");
        assert!(cfg.secrets.api_key.is_none());
        assert!(cfg.token_path.is_none());
    }

    #[test]
    fn reports_every_missing_key() {
        let err = Config::from_json_str(r#"{"playlists": {"watch_later_id": "WL"}}"#).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("1password.youtube_oauth_client_id"));
        assert!(msg.contains("1password.youtube_oauth_client_secret"));
        assert!(msg.contains("playlists.target_unlisted_id"));
        assert!(!msg.contains("watch_later_id"));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let json = FULL.replace("PLtarget", "   ");
        let err = Config::from_json_str(&json).unwrap_err();
        assert!(matches!(err, MigrateError::Config(_)));
    }

    #[test]
    fn same_source_and_target_rejected() {
        let json = FULL.replace("PLtarget", "WL");
        assert!(Config::from_json_str(&json).is_err());
    }

    #[test]
    fn explicit_path_wins() {
        let p = resolve_config_path(Some(Path::new("/tmp/custom.json")));
        assert_eq!(p, PathBuf::from("/tmp/custom.json"));
    }
}
