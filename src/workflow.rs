use crate::api::PlaylistClient;
use crate::error::{MigrateError, Result};
use crate::models::{FailureKind, MigrationPlan, MigrationResult, PlaylistItemRef};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Log listing progress every this many pages.
const PROGRESS_EVERY_PAGES: usize = 5;

/// Read a whole playlist by following page tokens until none is returned.
/// Any page failure fails the listing; no partial result is returned.
pub async fn list_all(client: &dyn PlaylistClient, playlist_id: &str) -> Result<Vec<PlaylistItemRef>> {
    let mut items = Vec::new();
    let mut page_token: Option<String> = None;
    let mut seen_tokens: HashSet<String> = HashSet::new();
    let mut pages = 0usize;
    loop {
        let page = client
            .list_page(playlist_id, page_token.as_deref())
            .await
            .map_err(|e| MigrateError::listing(playlist_id, e))?;
        pages += 1;
        items.extend(page.items);
        if pages % PROGRESS_EVERY_PAGES == 0 {
            info!("Retrieved {} videos so far from {}", items.len(), playlist_id);
        }
        match page.next_page_token {
            Some(t) => {
                // a token seen before means the platform is cycling
                if !seen_tokens.insert(t.clone()) {
                    return Err(MigrateError::listing(
                        playlist_id,
                        anyhow::anyhow!("page token {} repeated", t),
                    ));
                }
                page_token = Some(t);
            }
            None => break,
        }
    }
    debug!("Listed {} items in {} page(s) from {}", items.len(), pages, playlist_id);
    Ok(items)
}

impl MigrationPlan {
    pub async fn fetch(client: &dyn PlaylistClient, source_playlist_id: &str) -> Result<Self> {
        Ok(Self {
            source_playlist_id: source_playlist_id.to_string(),
            items: list_all(client, source_playlist_id).await?,
        })
    }
}

/// Moves every entry of a source playlist into a destination playlist and
/// removes it from the source once it is known to be in the destination.
pub struct Migration<'a> {
    client: &'a dyn PlaylistClient,
    source_id: String,
    target_id: String,
}

impl<'a> Migration<'a> {
    pub fn new(client: &'a dyn PlaylistClient, source_id: &str, target_id: &str) -> Self {
        Self {
            client,
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
        }
    }

    pub async fn run(&self, dry_run: bool) -> Result<MigrationResult> {
        self.client.authenticate().await.map_err(MigrateError::Auth)?;

        let plan = MigrationPlan::fetch(self.client, &self.source_id).await?;
        info!(
            "Found {} videos in source playlist {} via {}",
            plan.len(),
            plan.source_playlist_id,
            self.client.name()
        );

        // Snapshot of the destination before any insert.
        let mut present: HashSet<String> = list_all(self.client, &self.target_id)
            .await?
            .into_iter()
            .map(|i| i.video_id)
            .collect();
        info!("Found {} videos in target playlist {}", present.len(), self.target_id);

        let mut result = MigrationResult::new(plan.len(), dry_run);
        for (idx, item) in plan.items.iter().enumerate() {
            let step = format!("[{}/{}]", idx + 1, plan.len());
            let duplicate = present.contains(&item.video_id);

            if dry_run {
                if duplicate {
                    info!("{} would skip {} ({}): already in target", step, item.video_id, item.title);
                    result.would_skip.push(item.video_id.clone());
                } else {
                    info!("{} would add {} ({})", step, item.video_id, item.title);
                    result.would_add.push(item.video_id.clone());
                    present.insert(item.video_id.clone());
                }
                continue;
            }

            if duplicate {
                info!("{} {} ({}) already in target", step, item.video_id, item.title);
                result.skipped_duplicate.push(item.video_id.clone());
            } else {
                match self.client.insert_item(&self.target_id, &item.video_id).await {
                    Ok(_) => {
                        info!("{} added {} ({})", step, item.video_id, item.title);
                        result.added.push(item.video_id.clone());
                        present.insert(item.video_id.clone());
                    }
                    Err(e) => {
                        warn!("Error adding video {} ({}): {:#}", item.video_id, item.title, e);
                        result.record_failure(item, FailureKind::Insert, format!("{:#}", e));
                        continue;
                    }
                }
            }

            match self.client.delete_item(&self.source_id, &item.item_id).await {
                Ok(()) => {
                    info!("{} removed {} from {}", step, item.video_id, self.source_id);
                    result.removed.push(item.video_id.clone());
                }
                Err(e) => {
                    warn!(
                        "Error removing video {} ({}) from {}: {:#}",
                        item.video_id, item.title, self.source_id, e
                    );
                    result.record_failure(item, FailureKind::Delete, format!("{:#}", e));
                }
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{Call, MockPlaylistClient};

    #[tokio::test]
    async fn list_all_follows_page_tokens_in_order() {
        let client = MockPlaylistClient::new(2).with_playlist("WL", &["a", "b", "c", "d", "e"]);
        let items = list_all(&client, "WL").await.unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.video_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d", "e"]);
        let lists = client
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::List { .. }))
            .count();
        assert_eq!(lists, 3);
    }

    #[tokio::test]
    async fn list_all_fails_whole_listing_on_later_page() {
        let client = MockPlaylistClient::new(2)
            .with_playlist("WL", &["a", "b", "c"])
            .fail_listing_page("WL", 1);
        let err = list_all(&client, "WL").await.unwrap_err();
        match err {
            MigrateError::Listing { playlist_id, .. } => assert_eq!(playlist_id, "WL"),
            other => panic!("unexpected error {other}"),
        }
    }

    /// Hands out page tokens that cycle A -> B -> A forever.
    struct CyclingTokens {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl PlaylistClient for CyclingTokens {
        async fn authenticate(&self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn list_page(
            &self,
            _playlist_id: &str,
            page_token: Option<&str>,
        ) -> anyhow::Result<crate::models::ItemPage> {
            let n = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if n > 10 {
                anyhow::bail!("listing never stopped");
            }
            let next = if page_token == Some("A") { "B" } else { "A" };
            Ok(crate::models::ItemPage {
                items: vec![PlaylistItemRef {
                    item_id: format!("item-{}", n),
                    video_id: format!("v{}", n),
                    title: String::new(),
                }],
                next_page_token: Some(next.to_string()),
            })
        }

        async fn insert_item(&self, _: &str, _: &str) -> anyhow::Result<PlaylistItemRef> {
            anyhow::bail!("not used")
        }

        async fn delete_item(&self, _: &str, _: &str) -> anyhow::Result<()> {
            anyhow::bail!("not used")
        }

        fn name(&self) -> &str {
            "cycling"
        }
    }

    #[tokio::test]
    async fn list_all_rejects_cycling_page_tokens() {
        let client = CyclingTokens {
            calls: std::sync::atomic::AtomicUsize::new(0),
        };
        let err = list_all(&client, "WL").await.unwrap_err();
        assert!(err.to_string().contains("page token A repeated"), "{}", err);
        assert_eq!(client.calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn plan_remembers_source_playlist() {
        let client = MockPlaylistClient::new(1).with_playlist("WL", &["a", "b"]);
        let plan = MigrationPlan::fetch(&client, "WL").await.unwrap();
        assert_eq!(plan.source_playlist_id, "WL");
        assert_eq!(plan.len(), 2);
        assert_eq!(client.name(), "mock");
    }

    #[tokio::test]
    async fn empty_playlist_lists_nothing() {
        let client = MockPlaylistClient::new(50).with_playlist("WL", &[]);
        assert!(list_all(&client, "WL").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn repeated_source_video_is_inserted_once() {
        let client = MockPlaylistClient::new(50)
            .with_playlist("WL", &["a", "a"])
            .with_playlist("PL", &[]);
        let result = Migration::new(&client, "WL", "PL").run(false).await.unwrap();
        assert_eq!(result.added, vec!["a"]);
        assert_eq!(result.skipped_duplicate, vec!["a"]);
        assert_eq!(result.removed, vec!["a", "a"]);
        assert_eq!(client.video_ids("PL"), vec!["a"]);
        assert!(client.video_ids("WL").is_empty());
    }

    #[tokio::test]
    async fn auth_failure_happens_before_listing() {
        let client = MockPlaylistClient::new(50)
            .with_playlist("WL", &["a"])
            .with_playlist("PL", &[])
            .fail_auth("no stored OAuth token");
        let err = Migration::new(&client, "WL", "PL").run(false).await.unwrap_err();
        assert!(matches!(err, MigrateError::Auth(_)));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn target_listing_failure_aborts_before_mutations() {
        let client = MockPlaylistClient::new(50)
            .with_playlist("WL", &["a"])
            .with_playlist("PL", &[])
            .fail_listing_page("PL", 0);
        let err = Migration::new(&client, "WL", "PL").run(false).await.unwrap_err();
        assert!(matches!(err, MigrateError::Listing { .. }));
        assert_eq!(client.mutation_count(), 0);
        assert_eq!(client.video_ids("WL"), vec!["a"]);
    }
}
