//! Domain models for the tagged music library
//!
//! Songs and tags are independent collections; the relationship between them
//! is a join of song ids to tag ids owned by the store.

use crate::error::{LibraryError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// =============================================================================
// ID Types
// =============================================================================

/// Stable external identifier of a song (catalog or ISRC id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongId(String);

impl SongId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SongId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SongId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SongId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Unique identifier for a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(pub Uuid);

impl TagId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> std::result::Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for TagId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Value Types
// =============================================================================

const TAG_PALETTE: &[&str] = &[
    "#E57373", "#F06292", "#BA68C8", "#7986CB", "#4FC3F7", "#4DB6AC", "#AED581", "#FFB74D",
    "#A1887F", "#90A4AE",
];

/// Display color of a tag, always `#RRGGBB` with uppercase hex digits
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagColor(String);

impl TagColor {
    /// Parse a `#RRGGBB` (or `RRGGBB`) hex color.
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);

        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(LibraryError::invalid_input(
                "color",
                format!("'{}' is not a #RRGGBB color", value),
            ));
        }

        Ok(Self(format!("#{}", hex.to_ascii_uppercase())))
    }

    /// Deterministic palette color for a tag name.
    pub fn for_name(name: &str) -> Self {
        // FNV-1a keeps the mapping stable across builds.
        let hash = name.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |acc, byte| {
            (acc ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
        });
        let index = (hash % TAG_PALETTE.len() as u64) as usize;
        Self(TAG_PALETTE[index].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TagColor {
    type Error = LibraryError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<TagColor> for String {
    fn from(color: TagColor) -> Self {
        color.0
    }
}

/// Who created a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    /// Provided by the system or the AI classifier
    System,
    /// Created by the user
    User,
}

impl TagKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagKind::System => "system",
            TagKind::User => "user",
        }
    }
}

impl FromStr for TagKind {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "system" => Ok(TagKind::System),
            "user" => Ok(TagKind::User),
            _ => Err(LibraryError::invalid_input(
                "kind",
                format!("unknown tag kind '{}'", s),
            )),
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-song divergence between local and remote state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Local state matches the last known remote snapshot
    Synced,
    /// A local change has not been acknowledged by the remote yet
    PendingUpload,
    /// Removed locally; the remote copy still has to be deleted
    PendingDelete,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Synced => "synced",
            SyncStatus::PendingUpload => "pending_upload",
            SyncStatus::PendingDelete => "pending_delete",
        }
    }

    pub fn is_pending(&self) -> bool {
        !matches!(self, SyncStatus::Synced)
    }
}

impl FromStr for SyncStatus {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "synced" => Ok(SyncStatus::Synced),
            "pending_upload" => Ok(SyncStatus::PendingUpload),
            "pending_delete" => Ok(SyncStatus::PendingDelete),
            _ => Err(LibraryError::InvalidStatus(s.to_string())),
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Domain Models
// =============================================================================

/// Song metadata owned by the library store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: SongId,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub genre: Option<String>,
    /// Identifier in the external music catalog
    pub catalog_id: Option<String>,
    pub artwork_url: Option<String>,
    /// Unix timestamp (seconds) when the song entered the library
    pub date_added: i64,
}

impl Song {
    pub fn new(id: impl Into<SongId>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            album: None,
            genre: None,
            catalog_id: None,
            artwork_url: None,
            date_added: chrono::Utc::now().timestamp(),
        }
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn with_catalog_id(mut self, catalog_id: impl Into<String>) -> Self {
        self.catalog_id = Some(catalog_id.into());
        self
    }

    pub fn with_artwork_url(mut self, url: impl Into<String>) -> Self {
        self.artwork_url = Some(url.into());
        self
    }

    pub fn with_date_added(mut self, timestamp: i64) -> Self {
        self.date_added = timestamp;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.as_str().trim().is_empty() {
            return Err(LibraryError::invalid_input("id", "song id cannot be empty"));
        }

        if self.title.trim().is_empty() {
            return Err(LibraryError::invalid_input(
                "title",
                format!("song {} has an empty title", self.id),
            ));
        }

        Ok(())
    }
}

/// Mood/vibe label shared by many songs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    /// Unique, case-sensitive
    pub name: String,
    pub color: TagColor,
    pub kind: TagKind,
}

impl Tag {
    pub fn new(name: impl Into<String>, kind: TagKind) -> Self {
        let name = name.into();
        Self {
            id: TagId::new(),
            color: TagColor::for_name(&name),
            name,
            kind,
        }
    }

    pub fn user(name: impl Into<String>) -> Self {
        Self::new(name, TagKind::User)
    }

    pub fn system(name: impl Into<String>) -> Self {
        Self::new(name, TagKind::System)
    }

    pub fn with_color(mut self, color: TagColor) -> Self {
        self.color = color;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LibraryError::invalid_input("name", "tag name cannot be empty"));
        }
        Ok(())
    }
}

/// Read view of one song: metadata, resolved tags and sync bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibrarySong {
    pub song: Song,
    pub tags: Vec<Tag>,
    pub status: SyncStatus,
    /// Local mutation counter, used to acknowledge uploads safely
    pub revision: u64,
}

impl LibrarySong {
    pub fn id(&self) -> &SongId {
        &self.song.id
    }

    pub fn tag_names(&self) -> HashSet<&str> {
        self.tags.iter().map(|tag| tag.name.as_str()).collect()
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|tag| tag.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_status_round_trip() {
        for status in [
            SyncStatus::Synced,
            SyncStatus::PendingUpload,
            SyncStatus::PendingDelete,
        ] {
            assert_eq!(status.as_str().parse::<SyncStatus>().unwrap(), status);
            assert_eq!(status.to_string(), status.as_str());
        }

        assert!(matches!(
            "uploaded".parse::<SyncStatus>(),
            Err(LibraryError::InvalidStatus(s)) if s == "uploaded"
        ));
        assert!(!SyncStatus::Synced.is_pending());
        assert!(SyncStatus::PendingDelete.is_pending());
    }

    #[test]
    fn test_tag_kind_parse_is_case_insensitive() {
        assert_eq!("System".parse::<TagKind>().unwrap(), TagKind::System);
        assert_eq!(" user ".parse::<TagKind>().unwrap(), TagKind::User);
        assert!("robot".parse::<TagKind>().is_err());
    }

    #[test]
    fn test_tag_color_parse() {
        assert_eq!(TagColor::parse("#a1b2c3").unwrap().as_str(), "#A1B2C3");
        assert_eq!(TagColor::parse("FFB74D").unwrap().as_str(), "#FFB74D");
        assert!(TagColor::parse("#12345").is_err());
        assert!(TagColor::parse("#GGGGGG").is_err());
        assert!(TagColor::parse("").is_err());
    }

    #[test]
    fn test_tag_color_for_name_is_stable() {
        let first = TagColor::for_name("chill");
        let second = TagColor::for_name("chill");
        assert_eq!(first, second);
        assert!(TAG_PALETTE.contains(&first.as_str()));
    }

    #[test]
    fn test_tag_color_serde_validates() {
        let color: TagColor = serde_json::from_str("\"#00ff00\"").unwrap();
        assert_eq!(color.as_str(), "#00FF00");
        assert!(serde_json::from_str::<TagColor>("\"green\"").is_err());
    }

    #[test]
    fn test_song_builder_and_validation() {
        let song = Song::new("isrc-1", "So What", "Miles Davis")
            .with_album("Kind of Blue")
            .with_genre("Jazz")
            .with_catalog_id("cat-99")
            .with_artwork_url("https://img.example/1.jpg")
            .with_date_added(1_700_000_000);

        assert_eq!(song.id.as_str(), "isrc-1");
        assert_eq!(song.album.as_deref(), Some("Kind of Blue"));
        assert_eq!(song.date_added, 1_700_000_000);
        assert!(song.validate().is_ok());

        let untitled = Song::new("isrc-2", "  ", "Nobody");
        assert!(matches!(
            untitled.validate(),
            Err(LibraryError::InvalidInput { field, .. }) if field == "title"
        ));
        assert!(Song::new("", "Title", "Artist").validate().is_err());
    }

    #[test]
    fn test_tag_constructors() {
        let tag = Tag::system("melancholic");
        assert_eq!(tag.kind, TagKind::System);
        assert_eq!(tag.color, TagColor::for_name("melancholic"));
        assert!(tag.validate().is_ok());

        let custom = Tag::user("road trip").with_color(TagColor::parse("#123456").unwrap());
        assert_eq!(custom.kind, TagKind::User);
        assert_eq!(custom.color.as_str(), "#123456");

        assert!(Tag::user(" ").validate().is_err());
    }

    #[test]
    fn test_tag_id_from_string() {
        let id = TagId::new();
        assert_eq!(TagId::from_string(&id.to_string()).unwrap(), id);
        assert!(TagId::from_string("not-a-uuid").is_err());
    }
}
