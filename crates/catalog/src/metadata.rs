//! Video metadata and its source.

use crate::error::MetadataError;
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// What the browsing layer knows about one video.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    pub thumbnail_url: String,
    pub duration_formatted: String,
    pub owner_channel_id: String,
    pub owner_channel_title: String,
}

impl VideoMetadata {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            thumbnail_url: format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", id),
            id,
            title: title.into(),
            duration_formatted: String::new(),
            owner_channel_id: String::new(),
            owner_channel_title: String::new(),
        }
    }

    pub fn with_duration(mut self, duration_formatted: impl Into<String>) -> Self {
        self.duration_formatted = duration_formatted.into();
        self
    }

    pub fn with_channel(mut self, id: impl Into<String>, title: impl Into<String>) -> Self {
        self.owner_channel_id = id.into();
        self.owner_channel_title = title.into();
        self
    }
}

/// Looks up metadata by video id.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch_video_metadata(&self, id: &str) -> Result<VideoMetadata, MetadataError>;
}

/// Fixed in-memory metadata.
#[derive(Debug, Default)]
pub struct StaticMetadata {
    videos: RwLock<IndexMap<String, VideoMetadata>>,
    offline: RwLock<bool>,
}

impl StaticMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, video: VideoMetadata) {
        self.videos.write().insert(video.id.clone(), video);
    }

    /// Every lookup fails with an upstream error while set.
    pub fn set_offline(&self, offline: bool) {
        *self.offline.write() = offline;
    }

    pub fn len(&self) -> usize {
        self.videos.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.read().is_empty()
    }
}

#[async_trait]
impl MetadataSource for StaticMetadata {
    async fn fetch_video_metadata(&self, id: &str) -> Result<VideoMetadata, MetadataError> {
        if *self.offline.read() {
            return Err(MetadataError::Upstream("metadata service unreachable".to_string()));
        }
        self.videos
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| MetadataError::NotFound(id.to_string()))
    }
}
