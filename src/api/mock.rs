use super::PlaylistClient;
use crate::models::{ItemPage, PlaylistItemRef};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use tracing::info;

/// A call observed by [`MockPlaylistClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List {
        playlist_id: String,
        page_token: Option<String>,
    },
    Insert {
        playlist_id: String,
        video_id: String,
    },
    Delete {
        playlist_id: String,
        item_id: String,
    },
}

#[derive(Default)]
struct MockState {
    playlists: HashMap<String, Vec<PlaylistItemRef>>,
    next_item: u64,
    fail_insert: HashSet<String>,
    fail_delete: HashSet<String>,
    // (playlist id, zero-based page index)
    fail_list: HashSet<(String, usize)>,
    auth_error: Option<String>,
    calls: Vec<Call>,
}

/// In-memory playlists with deterministic ids and per-video failure injection.
/// Pages are `page_size` items long and page tokens are plain offsets.
pub struct MockPlaylistClient {
    page_size: usize,
    state: Mutex<MockState>,
}

impl MockPlaylistClient {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            state: Mutex::new(MockState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // a poisoned lock only happens after a panicking test
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn with_playlist(self, playlist_id: &str, video_ids: &[&str]) -> Self {
        {
            let mut st = self.state();
            let mut items = Vec::with_capacity(video_ids.len());
            for v in video_ids {
                st.next_item += 1;
                items.push(PlaylistItemRef {
                    item_id: format!("{}-item-{}", playlist_id, st.next_item),
                    video_id: v.to_string(),
                    title: format!("Video {}", v),
                });
            }
            st.playlists.insert(playlist_id.to_string(), items);
        }
        self
    }

    pub fn fail_insert_of(self, video_id: &str) -> Self {
        self.state().fail_insert.insert(video_id.to_string());
        self
    }

    pub fn fail_delete_of(self, video_id: &str) -> Self {
        self.state().fail_delete.insert(video_id.to_string());
        self
    }

    pub fn fail_listing_page(self, playlist_id: &str, page_index: usize) -> Self {
        self.state()
            .fail_list
            .insert((playlist_id.to_string(), page_index));
        self
    }

    pub fn fail_auth(self, reason: &str) -> Self {
        self.state().auth_error = Some(reason.to_string());
        self
    }

    /// Video ids currently in a playlist, in order.
    pub fn video_ids(&self, playlist_id: &str) -> Vec<String> {
        self.state()
            .playlists
            .get(playlist_id)
            .map(|items| items.iter().map(|i| i.video_id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| !matches!(c, Call::List { .. }))
            .count()
    }
}

#[async_trait]
impl PlaylistClient for MockPlaylistClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn authenticate(&self) -> Result<()> {
        match &self.state().auth_error {
            Some(reason) => Err(anyhow!("{}", reason)),
            None => Ok(()),
        }
    }

    async fn list_page(&self, playlist_id: &str, page_token: Option<&str>) -> Result<ItemPage> {
        let mut st = self.state();
        st.calls.push(Call::List {
            playlist_id: playlist_id.to_string(),
            page_token: page_token.map(String::from),
        });
        let offset = match page_token {
            Some(t) => t
                .parse::<usize>()
                .map_err(|_| anyhow!("invalid page token {}", t))?,
            None => 0,
        };
        if st.fail_list.contains(&(playlist_id.to_string(), offset / self.page_size)) {
            return Err(anyhow!("list playlist items failed: 500 Internal Server Error"));
        }
        let items = st
            .playlists
            .get(playlist_id)
            .ok_or_else(|| anyhow!("playlist not found (id: {})", playlist_id))?;
        let end = (offset + self.page_size).min(items.len());
        let page_items = items.get(offset..end).map(|s| s.to_vec()).unwrap_or_default();
        Ok(ItemPage {
            items: page_items,
            next_page_token: (end < items.len()).then(|| end.to_string()),
        })
    }

    async fn insert_item(&self, playlist_id: &str, video_id: &str) -> Result<PlaylistItemRef> {
        info!("MockPlaylistClient: insert {} -> {}", video_id, playlist_id);
        let mut st = self.state();
        st.calls.push(Call::Insert {
            playlist_id: playlist_id.to_string(),
            video_id: video_id.to_string(),
        });
        if st.fail_insert.contains(video_id) {
            return Err(anyhow!("insert playlist item failed: 403 Forbidden"));
        }
        st.next_item += 1;
        let item = PlaylistItemRef {
            item_id: format!("{}-item-{}", playlist_id, st.next_item),
            video_id: video_id.to_string(),
            title: format!("Video {}", video_id),
        };
        st.playlists
            .get_mut(playlist_id)
            .ok_or_else(|| anyhow!("playlist not found (id: {})", playlist_id))?
            .push(item.clone());
        Ok(item)
    }

    async fn delete_item(&self, playlist_id: &str, item_id: &str) -> Result<()> {
        info!("MockPlaylistClient: delete {} from {}", item_id, playlist_id);
        let mut st = self.state();
        st.calls.push(Call::Delete {
            playlist_id: playlist_id.to_string(),
            item_id: item_id.to_string(),
        });
        let fail_delete = st.fail_delete.clone();
        let items = st
            .playlists
            .get_mut(playlist_id)
            .ok_or_else(|| anyhow!("playlist not found (id: {})", playlist_id))?;
        let pos = items
            .iter()
            .position(|i| i.item_id == item_id)
            .ok_or_else(|| anyhow!("playlist item not found (id: {})", item_id))?;
        if fail_delete.contains(&items[pos].video_id) {
            return Err(anyhow!("delete playlist item failed: 409 Conflict"));
        }
        items.remove(pos);
        Ok(())
    }
}
