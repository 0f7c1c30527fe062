pub mod mock;
pub mod youtube;
pub mod youtube_auth;

use crate::models::{ItemPage, PlaylistItemRef};
use anyhow::Result;

/// Playlist operations the migration needs from the video platform.
/// Implementations: youtube::YouTubeClient and mock::MockPlaylistClient.
#[async_trait::async_trait]
pub trait PlaylistClient: Send + Sync {
    /// Make sure a usable access token exists. Called once before any listing.
    async fn authenticate(&self) -> Result<()>;

    /// Fetch one page of a playlist. `page_token` is the cursor from the previous page.
    async fn list_page(&self, playlist_id: &str, page_token: Option<&str>) -> Result<ItemPage>;

    /// Append a video to a playlist and return the new entry.
    async fn insert_item(&self, playlist_id: &str, video_id: &str) -> Result<PlaylistItemRef>;

    /// Remove one entry (by its playlist-item id) from a playlist.
    async fn delete_item(&self, playlist_id: &str, item_id: &str) -> Result<()>;

    /// Return the client's name (for logging)
    fn name(&self) -> &str;
}
