//! Remote Library Backend Abstraction
//!
//! Contract between the sync coordinator and the backend that stores the
//! user's songs and their tags. The snapshot types double as the push payload
//! and the pull result; they are projections of backend state and are never
//! persisted locally as-is.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A tag as known by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTagSyncInfo {
    pub name: String,
    /// Tag type, `"system"` or `"user"`
    #[serde(rename = "type")]
    pub kind: String,
    /// `#RRGGBB` color, if the backend stored one
    #[serde(default)]
    pub color: Option<String>,
}

impl RemoteTagSyncInfo {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            color: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// A song as known by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSongSyncInfo {
    /// Stable song identifier shared with the local library
    pub id: String,
    /// External catalog identifier (e.g. a streaming catalog id)
    #[serde(default)]
    pub catalog_id: Option<String>,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub artwork_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<RemoteTagSyncInfo>,
}

/// Remote sync client trait
///
/// All three calls are boundary calls: retry and backoff policy lives in the
/// implementation, not in the core. Failures should be reported as
/// [`BridgeError::Transport`](crate::error::BridgeError::Transport) so the
/// coordinator leaves the song's status untouched and retries on the next
/// sync.
///
/// `push_song` and `delete_song_remote` must be idempotent on the backend:
/// the core may replay them after a lost acknowledgment.
#[async_trait::async_trait]
pub trait RemoteSyncClient: Send + Sync {
    /// Create or replace the song and its full tag set on the backend.
    async fn push_song(&self, song: &RemoteSongSyncInfo) -> Result<()>;

    /// Delete the song on the backend.
    async fn delete_song_remote(&self, song_id: &str) -> Result<()>;

    /// Fetch every song the backend knows for the current user.
    async fn fetch_all_remote(&self) -> Result<Vec<RemoteSongSyncInfo>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_song_deserializes_backend_payload() {
        let payload = r##"{
            "id": "USUM71703861",
            "title": "Midnight City",
            "artist": "M83",
            "tags": [
                {"name": "energetic", "type": "system", "color": "#FF8800"},
                {"name": "night drive", "type": "user"}
            ]
        }"##;

        let song: RemoteSongSyncInfo = serde_json::from_str(payload).unwrap();
        assert_eq!(song.id, "USUM71703861");
        assert!(song.catalog_id.is_none());
        assert_eq!(song.tags.len(), 2);
        assert_eq!(song.tags[0].color.as_deref(), Some("#FF8800"));
        assert_eq!(song.tags[1], RemoteTagSyncInfo::new("night drive", "user"));
    }

    #[test]
    fn test_remote_tag_serializes_kind_as_type() {
        let tag = RemoteTagSyncInfo::new("chill", "system").with_color("#00AAFF");
        let json = serde_json::to_value(&tag).unwrap();
        assert_eq!(json["type"], "system");
        assert_eq!(json["color"], "#00AAFF");
    }
}
