//! The parent-approved playlist.

use crate::error::StorageError;
use crate::metadata::VideoMetadata;
use crate::store::KeyValueStore;
use std::sync::Arc;

/// Storage key for the approved list.
pub const APPROVED_KEY: &str = "approvedVideos";

/// Ordered approval list kept in a `KeyValueStore`.
#[derive(Clone)]
pub struct ApprovedVideos {
    store: Arc<dyn KeyValueStore>,
}

impl ApprovedVideos {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The approved list, or `None` if nothing was ever saved.
    pub async fn playlist(&self) -> Result<Option<Vec<VideoMetadata>>, StorageError> {
        let Some(value) = self.store.get(APPROVED_KEY).await? else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|err| StorageError::Corrupt {
                key: APPROVED_KEY.to_string(),
                message: err.to_string(),
            })
    }

    pub async fn is_approved(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self
            .playlist()
            .await?
            .map_or(false, |list| list.iter().any(|v| v.id == id)))
    }

    /// Append, or replace in place if already approved.
    pub async fn approve(&self, video: VideoMetadata) -> Result<(), StorageError> {
        let mut list = self.playlist().await?.unwrap_or_default();
        match list.iter_mut().find(|v| v.id == video.id) {
            Some(existing) => *existing = video,
            None => list.push(video),
        }
        self.save(&list).await
    }

    /// Returns whether anything was removed.
    pub async fn remove(&self, ids: &[&str]) -> Result<bool, StorageError> {
        let Some(mut list) = self.playlist().await? else {
            return Ok(false);
        };
        let before = list.len();
        list.retain(|v| !ids.contains(&v.id.as_str()));
        if list.len() == before {
            return Ok(false);
        }
        tracing::info!("removed {} approved videos", before - list.len());
        self.save(&list).await?;
        Ok(true)
    }

    async fn save(&self, list: &[VideoMetadata]) -> Result<(), StorageError> {
        let value = serde_json::to_value(list).map_err(|err| StorageError::Corrupt {
            key: APPROVED_KEY.to_string(),
            message: err.to_string(),
        })?;
        self.store.put(APPROVED_KEY, value).await
    }
}

impl std::fmt::Debug for ApprovedVideos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovedVideos").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn approved() -> (Arc<MemoryStore>, ApprovedVideos) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), ApprovedVideos::new(store))
    }

    #[tokio::test]
    async fn test_empty_store_has_no_playlist() {
        let (_, approved) = approved();
        assert_eq!(approved.playlist().await.unwrap(), None);
        assert!(!approved.is_approved("abc12345678").await.unwrap());
    }

    #[tokio::test]
    async fn test_approve_keeps_order_and_dedupes() {
        let (_, approved) = approved();
        approved.approve(VideoMetadata::new("aaaaaaaaaaa", "First")).await.unwrap();
        approved.approve(VideoMetadata::new("bbbbbbbbbbb", "Second")).await.unwrap();
        approved.approve(VideoMetadata::new("aaaaaaaaaaa", "First, renamed")).await.unwrap();

        let list = approved.playlist().await.unwrap().unwrap();
        let titles: Vec<_> = list.iter().map(|v| v.title.as_str()).collect();
        assert_eq!(titles, vec!["First, renamed", "Second"]);
    }

    #[tokio::test]
    async fn test_remove() {
        let (_, approved) = approved();
        approved.approve(VideoMetadata::new("aaaaaaaaaaa", "First")).await.unwrap();
        assert!(approved.remove(&["aaaaaaaaaaa"]).await.unwrap());
        assert!(!approved.remove(&["aaaaaaaaaaa"]).await.unwrap());
        assert_eq!(approved.playlist().await.unwrap(), Some(vec![]));
    }

    #[tokio::test]
    async fn test_corrupt_list() {
        let (store, approved) = approved();
        store.put(APPROVED_KEY, json!("not a list")).await.unwrap();
        assert!(matches!(
            approved.playlist().await,
            Err(StorageError::Corrupt { .. })
        ));
    }
}
