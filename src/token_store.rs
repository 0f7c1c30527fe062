use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// OAuth token pair persisted across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_at: i64, // epoch seconds
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".into()
}

impl StoredToken {
    /// True when the access token expires within `margin_secs`.
    pub fn expires_within(&self, margin_secs: i64) -> bool {
        Utc::now().timestamp() + margin_secs >= self.expires_at
    }
}

/// Persists the OAuth token. `load` and `save` are the only operations.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<StoredToken>>;
    fn save(&self, token: &StoredToken) -> Result<()>;
}

/// JSON file in the user's home directory.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
        Ok(home.join(".youtube-playlist-tools").join("token.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<StoredToken>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let s = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading token file {}", self.path.display()))?;
        let token: StoredToken = serde_json::from_str(&s)
            .with_context(|| format!("parsing token file {}", self.path.display()))?;
        Ok(Some(token))
    }

    fn save(&self, token: &StoredToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let s = serde_json::to_string_pretty(token)?;
        std::fs::write(&self.path, s)
            .with_context(|| format!("writing token file {}", self.path.display()))?;

        // owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("setting permissions on {}", self.path.display()))?;
        }
        Ok(())
    }
}

/// Token store kept in memory; nothing survives the process.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<StoredToken>>,
}

impl MemoryTokenStore {
    pub fn new(token: Option<StoredToken>) -> Self {
        Self {
            token: Mutex::new(token),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<StoredToken>> {
        let g = self.token.lock().map_err(|_| anyhow!("token lock poisoned"))?;
        Ok(g.clone())
    }

    fn save(&self, token: &StoredToken) -> Result<()> {
        let mut g = self.token.lock().map_err(|_| anyhow!("token lock poisoned"))?;
        *g = Some(token.clone());
        Ok(())
    }
}
