//! Library repository trait and SQLite implementation

use crate::error::{LibraryError, Result};
use crate::models::{Song, SongId, SyncStatus, Tag, TagColor, TagId, TagKind};
use async_trait::async_trait;
use sqlx::{query, query_as, FromRow, Sqlite, SqlitePool, Transaction};
use std::collections::HashMap;

/// A song as persisted: metadata, status and the ids of its tags in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSong {
    pub song: Song,
    pub status: SyncStatus,
    pub tag_ids: Vec<TagId>,
}

/// Everything needed to rebuild the in-memory store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibrarySnapshot {
    pub songs: Vec<StoredSong>,
    pub tags: Vec<Tag>,
}

/// Write-through persistence used by `LibraryStore`
#[async_trait]
pub trait LibraryRepository: Send + Sync {
    /// Load every song (ordered by `date_added`, then id) and every tag.
    ///
    /// # Errors
    /// Returns [`LibraryError::CorruptRecord`] if a stored row cannot be
    /// turned back into a domain value.
    async fn load_snapshot(&self) -> Result<LibrarySnapshot>;

    /// Insert or replace a song together with its tag join rows.
    ///
    /// `new_tags` are written in the same transaction, so either the song and
    /// its new tags are all stored or none are. Every other referenced tag
    /// must already exist.
    async fn save_song(&self, song: &StoredSong, new_tags: &[Tag]) -> Result<()>;

    /// Remove a song and its join rows; tags are kept.
    ///
    /// # Returns
    /// - `Ok(true)` if the song existed
    /// - `Ok(false)` otherwise
    async fn delete_song(&self, id: &SongId) -> Result<bool>;
}

#[derive(Debug, FromRow)]
struct SongRow {
    id: String,
    title: String,
    artist: String,
    album: Option<String>,
    genre: Option<String>,
    catalog_id: Option<String>,
    artwork_url: Option<String>,
    date_added: i64,
    sync_status: String,
}

impl SongRow {
    fn into_stored(self, tag_ids: Vec<TagId>) -> Result<StoredSong> {
        let status = self
            .sync_status
            .parse::<SyncStatus>()
            .map_err(|e| LibraryError::CorruptRecord {
                entity: "song",
                id: self.id.clone(),
                message: e.to_string(),
            })?;

        Ok(StoredSong {
            song: Song {
                id: SongId::new(self.id),
                title: self.title,
                artist: self.artist,
                album: self.album,
                genre: self.genre,
                catalog_id: self.catalog_id,
                artwork_url: self.artwork_url,
                date_added: self.date_added,
            },
            status,
            tag_ids,
        })
    }
}

#[derive(Debug, FromRow)]
struct TagRow {
    id: String,
    name: String,
    color: String,
    kind: String,
}

impl TryFrom<TagRow> for Tag {
    type Error = LibraryError;

    fn try_from(row: TagRow) -> Result<Self> {
        let corrupt = |message: String| LibraryError::CorruptRecord {
            entity: "tag",
            id: row.id.clone(),
            message,
        };

        let id = TagId::from_string(&row.id).map_err(|e| corrupt(e.to_string()))?;
        let color = TagColor::parse(&row.color).map_err(|e| corrupt(e.to_string()))?;
        let kind = row
            .kind
            .parse::<TagKind>()
            .map_err(|e| corrupt(e.to_string()))?;

        Ok(Tag {
            id,
            name: row.name,
            color,
            kind,
        })
    }
}

/// SQLite implementation of LibraryRepository
pub struct SqliteLibraryRepository {
    pool: SqlitePool,
}

impl SqliteLibraryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn insert_tag(tx: &mut Transaction<'_, Sqlite>, tag: &Tag) -> Result<()> {
        tag.validate()?;

        query(
            r#"
            INSERT INTO tags (id, name, color, kind, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                color = excluded.color,
                kind = excluded.kind
            "#,
        )
        .bind(tag.id.to_string())
        .bind(&tag.name)
        .bind(tag.color.as_str())
        .bind(tag.kind.as_str())
        .bind(chrono::Utc::now().timestamp())
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl LibraryRepository for SqliteLibraryRepository {
    async fn load_snapshot(&self) -> Result<LibrarySnapshot> {
        let tags = query_as::<_, TagRow>("SELECT id, name, color, kind FROM tags ORDER BY name")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Tag::try_from)
            .collect::<Result<Vec<_>>>()?;

        let joins: Vec<(String, String)> =
            query_as("SELECT song_id, tag_id FROM song_tags ORDER BY song_id, position")
                .fetch_all(&self.pool)
                .await?;

        let mut tags_by_song: HashMap<String, Vec<TagId>> = HashMap::new();
        for (song_id, tag_id) in joins {
            let parsed = TagId::from_string(&tag_id).map_err(|e| LibraryError::CorruptRecord {
                entity: "song_tag",
                id: format!("{}/{}", song_id, tag_id),
                message: e.to_string(),
            })?;
            tags_by_song.entry(song_id).or_default().push(parsed);
        }

        let songs = query_as::<_, SongRow>(
            r#"
            SELECT id, title, artist, album, genre, catalog_id, artwork_url,
                   date_added, sync_status
            FROM songs
            ORDER BY date_added, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| {
            let tag_ids = tags_by_song.remove(&row.id).unwrap_or_default();
            row.into_stored(tag_ids)
        })
        .collect::<Result<Vec<_>>>()?;

        Ok(LibrarySnapshot { songs, tags })
    }

    async fn save_song(&self, stored: &StoredSong, new_tags: &[Tag]) -> Result<()> {
        let song = &stored.song;
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for tag in new_tags {
            Self::insert_tag(&mut tx, tag).await?;
        }

        query(
            r#"
            INSERT INTO songs (
                id, title, artist, album, genre, catalog_id, artwork_url,
                date_added, sync_status, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                artist = excluded.artist,
                album = excluded.album,
                genre = excluded.genre,
                catalog_id = excluded.catalog_id,
                artwork_url = excluded.artwork_url,
                date_added = excluded.date_added,
                sync_status = excluded.sync_status,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(song.id.as_str())
        .bind(&song.title)
        .bind(&song.artist)
        .bind(&song.album)
        .bind(&song.genre)
        .bind(&song.catalog_id)
        .bind(&song.artwork_url)
        .bind(song.date_added)
        .bind(stored.status.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        query("DELETE FROM song_tags WHERE song_id = ?")
            .bind(song.id.as_str())
            .execute(&mut *tx)
            .await?;

        for (position, tag_id) in stored.tag_ids.iter().enumerate() {
            query("INSERT INTO song_tags (song_id, tag_id, position) VALUES (?, ?, ?)")
                .bind(song.id.as_str())
                .bind(tag_id.to_string())
                .bind(position as i64)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_song(&self, id: &SongId) -> Result<bool> {
        // song_tags rows go with the song through ON DELETE CASCADE.
        let result = query("DELETE FROM songs WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
