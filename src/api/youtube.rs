use super::PlaylistClient;
use crate::models::{ItemPage, PlaylistItemRef};
use crate::secrets::ResolvedCredentials;
use crate::token_store::{StoredToken, TokenStore};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::json;
use std::env;
use std::sync::Arc;

/// Page size used for playlistItems.list (API maximum).
const PAGE_SIZE: &str = "50";
/// Refresh when the access token expires within this many seconds.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Client for the YouTube Data API v3 playlistItems endpoints.
/// The token is read from the token store and refreshed tokens are written back.
/// Endpoints default to YOUTUBE_API_BASE / GOOGLE_AUTH_BASE env vars when set.
pub struct YouTubeClient {
    client: Client,
    client_id: String,
    client_secret: String,
    api_key: Option<String>,
    api_base: String,
    auth_base: String,
    store: Arc<dyn TokenStore>,
    token: tokio::sync::Mutex<Option<StoredToken>>,
}

impl YouTubeClient {
    pub fn new(creds: ResolvedCredentials, store: Arc<dyn TokenStore>) -> Self {
        Self {
            client: Client::new(),
            client_id: creds.client_id,
            client_secret: creds.client_secret,
            api_key: creds.api_key,
            api_base: Self::default_api_base(),
            auth_base: Self::default_auth_base(),
            store,
            token: tokio::sync::Mutex::new(None),
        }
    }

    /// Point the client at other endpoints (e.g. a mock server).
    pub fn with_endpoints(mut self, api_base: &str, auth_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self.auth_base = auth_base.trim_end_matches('/').to_string();
        self
    }

    fn default_api_base() -> String {
        env::var("YOUTUBE_API_BASE").unwrap_or_else(|_| "https://www.googleapis.com/youtube/v3".into())
    }

    pub fn default_auth_base() -> String {
        env::var("GOOGLE_AUTH_BASE").unwrap_or_else(|_| "https://oauth2.googleapis.com".into())
    }

    async fn load_token_from_store(&self) -> Result<Option<StoredToken>> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.load()).await?
    }

    async fn persist_token(&self, st: &StoredToken) -> Result<()> {
        let store = self.store.clone();
        let st = st.clone();
        tokio::task::spawn_blocking(move || store.save(&st)).await??;
        Ok(())
    }

    /// Load the token if needed and refresh it when close to expiry,
    /// or unconditionally when `force` is set.
    async fn ensure_token(&self, force: bool) -> Result<()> {
        let mut lock = self.token.lock().await;
        if lock.is_none() {
            *lock = self.load_token_from_store().await?;
        }
        let st = lock.as_ref().ok_or_else(|| {
            anyhow!("no stored OAuth token; run the `auth` subcommand first")
        })?;
        if force || st.expires_within(EXPIRY_MARGIN_SECS) {
            debug!("YouTube access token is near expiry or rejected, refreshing");
            let mut cur = st.clone();
            self.refresh_token_internal(&mut cur).await?;
            *lock = Some(cur);
        }
        Ok(())
    }

    async fn refresh_token_internal(&self, cur: &mut StoredToken) -> Result<()> {
        let refresh_token = cur
            .refresh_token
            .clone()
            .ok_or_else(|| anyhow!("no refresh token"))?;
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];
        let url = format!("{}/token", self.auth_base);
        let resp = self.client.post(&url).form(&params).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Failed to refresh token: {} - {}", status, body));
        }
        let j: serde_json::Value = resp.json().await?;
        let access_token = j["access_token"]
            .as_str()
            .ok_or_else(|| anyhow!("no access_token"))?
            .to_string();
        let expires_in = j["expires_in"].as_i64().unwrap_or(3600);
        cur.access_token = access_token;
        cur.token_type = j["token_type"].as_str().unwrap_or("Bearer").to_string();
        cur.expires_at = Utc::now().timestamp() + expires_in;
        // Google only rotates the refresh token occasionally.
        if let Some(r) = j["refresh_token"].as_str() {
            cur.refresh_token = Some(r.to_string());
        }
        if let Some(s) = j["scope"].as_str() {
            cur.scope = Some(s.to_string());
        }
        self.persist_token(cur).await?;
        Ok(())
    }

    pub async fn get_bearer(&self) -> Result<String> {
        self.ensure_token(false).await?;
        let lock = self.token.lock().await;
        let st = lock.as_ref().ok_or_else(|| anyhow!("no token loaded"))?;
        Ok(format!("Bearer {}", st.access_token))
    }

    fn with_key(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(k) => req.query(&[("key", k.as_str())]),
            None => req,
        }
    }

    /// Send an authorized request; on 401 refresh once and retry.
    async fn send_authorized<F>(&self, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let bearer = self.get_bearer().await?;
        let resp = self
            .with_key(build())
            .header(AUTHORIZATION, &bearer)
            .send()
            .await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }
        warn!("Got 401 from YouTube API; attempting token refresh");
        self.ensure_token(true).await?;
        let bearer2 = self.get_bearer().await?;
        Ok(self
            .with_key(build())
            .header(AUTHORIZATION, &bearer2)
            .send()
            .await?)
    }

    async fn check_status(resp: Response, what: &str) -> Result<Response> {
        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(anyhow!("{}: rate_limited: retry_after={:?}", what, retry_after));
        }
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!("{} failed: {} => {}", what, status, txt));
        }
        Ok(resp)
    }

    fn parse_item(it: &serde_json::Value) -> Option<PlaylistItemRef> {
        let item_id = it["id"].as_str()?;
        let video_id = it["contentDetails"]["videoId"]
            .as_str()
            .or_else(|| it["snippet"]["resourceId"]["videoId"].as_str())?;
        Some(PlaylistItemRef {
            item_id: item_id.to_string(),
            video_id: video_id.to_string(),
            title: it["snippet"]["title"].as_str().unwrap_or("").to_string(),
        })
    }
}

#[async_trait]
impl PlaylistClient for YouTubeClient {
    fn name(&self) -> &str {
        "youtube"
    }

    async fn authenticate(&self) -> Result<()> {
        self.ensure_token(false).await
    }

    async fn list_page(&self, playlist_id: &str, page_token: Option<&str>) -> Result<ItemPage> {
        let url = format!("{}/playlistItems", self.api_base);
        let resp = self
            .send_authorized(|| {
                let mut req = self.client.get(&url).query(&[
                    ("part", "snippet,contentDetails"),
                    ("playlistId", playlist_id),
                    ("maxResults", PAGE_SIZE),
                ]);
                if let Some(t) = page_token {
                    req = req.query(&[("pageToken", t)]);
                }
                req
            })
            .await?;
        match resp.status() {
            StatusCode::NOT_FOUND => {
                return Err(anyhow!("playlist not found (id: {})", playlist_id));
            }
            StatusCode::FORBIDDEN => {
                let txt = resp.text().await.unwrap_or_default();
                return Err(anyhow!(
                    "access forbidden to playlist (id: {}): {}",
                    playlist_id,
                    txt
                ));
            }
            _ => {}
        }
        let resp = Self::check_status(resp, "list playlist items").await?;
        let j: serde_json::Value = resp.json().await?;
        let mut page = ItemPage::default();
        if let Some(items) = j["items"].as_array() {
            for it in items {
                match Self::parse_item(it) {
                    Some(item) => page.items.push(item),
                    None => warn!(
                        "Skipping malformed playlist item in {}: {}",
                        playlist_id,
                        it["id"].as_str().unwrap_or("<no id>")
                    ),
                }
            }
        }
        page.next_page_token = j["nextPageToken"]
            .as_str()
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());
        Ok(page)
    }

    async fn insert_item(&self, playlist_id: &str, video_id: &str) -> Result<PlaylistItemRef> {
        let url = format!("{}/playlistItems", self.api_base);
        let body = json!({
            "snippet": {
                "playlistId": playlist_id,
                "resourceId": {
                    "kind": "youtube#video",
                    "videoId": video_id
                }
            }
        });
        let resp = self
            .send_authorized(|| self.client.post(&url).query(&[("part", "snippet")]).json(&body))
            .await?;
        let resp = Self::check_status(resp, "insert playlist item").await?;
        let j: serde_json::Value = resp.json().await?;
        let item_id = j["id"]
            .as_str()
            .ok_or_else(|| anyhow!("no id in insert response"))?
            .to_string();
        Ok(PlaylistItemRef {
            item_id,
            video_id: video_id.to_string(),
            title: j["snippet"]["title"].as_str().unwrap_or("").to_string(),
        })
    }

    async fn delete_item(&self, _playlist_id: &str, item_id: &str) -> Result<()> {
        let url = format!("{}/playlistItems", self.api_base);
        let resp = self
            .send_authorized(|| self.client.delete(&url).query(&[("id", item_id)]))
            .await?;
        Self::check_status(resp, "delete playlist item").await?;
        Ok(())
    }
}
