use std::fs::File;
use std::io::Write;
use tempfile::tempdir;

use youtube_playlist_tools::config::Config;
use youtube_playlist_tools::error::MigrateError;

#[test]
fn config_from_path_parses_json() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("config.json");
    let mut f = File::create(&cfg_path).unwrap();
    let json = r#"{
    "1password": {
        "youtube_oauth_client_id": "op://Private/YouTube OAuth/client_id",
        "youtube_oauth_client_secret": "op://Private/YouTube OAuth/client_secret",
        "youtube_api_key": "op://Private/YouTube API/credential"
    },
    "playlists": {
        "watch_later_id": "WL",
        "target_unlisted_id": "PLwZYPD7MtnnyI36r-3Z6RbJQ__obH7FGu"
    },
    "token_path": "/tmp/yt-token.json",
    "log_dir": "/tmp"
}"#;
    f.write_all(json.as_bytes()).unwrap();
    let cfg = Config::from_path(&cfg_path).expect("parse config");
    assert_eq!(cfg.watch_later_id, "WL");
    assert_eq!(cfg.target_unlisted_id, "PLwZYPD7MtnnyI36r-3Z6RbJQ__obH7FGu");
    assert_eq!(
        cfg.secrets.api_key.as_deref(),
        Some("op://Private/YouTube API/credential")
    );
    assert_eq!(cfg.token_path.unwrap().to_str().unwrap(), "/tmp/yt-token.json");
    assert_eq!(cfg.log_dir.unwrap().to_str().unwrap(), "/tmp");
}

#[test]
fn missing_file_is_a_config_error() {
    let td = tempdir().unwrap();
    let err = Config::from_path(&td.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, MigrateError::Config(_)));
}

#[test]
fn malformed_json_is_a_config_error() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("config.json");
    std::fs::write(&cfg_path, "{ not json").unwrap();
    let err = Config::from_path(&cfg_path).unwrap_err();
    assert!(err.to_string().contains("invalid config JSON"));
}
