use thiserror::Error;

/// Errors that abort a run. Per-item insert/delete problems are not errors at
/// this level; they are recorded in [`crate::models::MigrationResult`].
#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("config error: {0}")]
    Config(String),

    #[error("auth error: {0:#}")]
    Auth(anyhow::Error),

    #[error("listing playlist {playlist_id} failed: {cause:#}")]
    Listing {
        playlist_id: String,
        cause: anyhow::Error,
    },
}

impl MigrateError {
    pub fn listing(playlist_id: &str, cause: anyhow::Error) -> Self {
        Self::Listing {
            playlist_id: playlist_id.to_string(),
            cause,
        }
    }
}

pub type Result<T, E = MigrateError> = std::result::Result<T, E>;
