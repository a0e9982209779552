//! # Local Library Store
//!
//! Authoritative on-device state of songs, tags and per-song sync status.
//!
//! All state sits behind one `tokio::sync::RwLock`: mutations are serialized
//! and reads run concurrently. When a [`LibraryRepository`] is attached every
//! mutation is persisted while the write lock is held and only then committed
//! to memory, so a failed write leaves the previous state intact.
//!
//! Unknown song ids are never errors: mutating one is a no-op so replayed
//! calls stay idempotent.

use crate::dedup::dedup_by_name;
use crate::error::Result;
use crate::models::{LibrarySong, Song, SongId, SyncStatus, Tag, TagId};
use crate::repositories::{LibraryRepository, StoredSong};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// Result of merging one remote snapshot into the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteApplyOutcome {
    /// Song was absent locally and has been created as `Synced`
    Created,
    /// Local `Synced` copy was overwritten by remote data
    Replaced,
    /// Local `Synced` copy already matched
    Unchanged,
    /// Local copy has pending intent; remote data was ignored
    SkippedPending,
}

#[derive(Debug, Clone)]
struct SongRecord {
    song: Song,
    status: SyncStatus,
    revision: u64,
    tag_ids: Vec<TagId>,
}

impl SongRecord {
    fn to_stored(&self) -> StoredSong {
        StoredSong {
            song: self.song.clone(),
            status: self.status,
            tag_ids: self.tag_ids.clone(),
        }
    }

    fn tag_set(&self) -> HashSet<TagId> {
        self.tag_ids.iter().copied().collect()
    }
}

#[derive(Debug, Default)]
struct LibraryState {
    songs: HashMap<SongId, SongRecord>,
    tags: HashMap<TagId, Tag>,
    tag_ids_by_name: HashMap<String, TagId>,
}

/// Incoming tags resolved against the tag collection.
struct ResolvedTags {
    ids: Vec<TagId>,
    /// Tags whose names were not known yet
    created: Vec<Tag>,
}

impl LibraryState {
    fn view(&self, record: &SongRecord) -> LibrarySong {
        LibrarySong {
            song: record.song.clone(),
            tags: record
                .tag_ids
                .iter()
                .filter_map(|id| self.tags.get(id).cloned())
                .collect(),
            status: record.status,
            revision: record.revision,
        }
    }

    fn collect<F>(&self, predicate: F) -> Vec<LibrarySong>
    where
        F: Fn(&SongRecord) -> bool,
    {
        let mut records: Vec<&SongRecord> =
            self.songs.values().filter(|record| predicate(*record)).collect();
        records.sort_by(|a, b| {
            a.song
                .date_added
                .cmp(&b.song.date_added)
                .then_with(|| a.song.id.cmp(&b.song.id))
        });
        records.into_iter().map(|record| self.view(record)).collect()
    }

    /// Map incoming tags onto existing tags by name, minting the rest.
    fn resolve(&self, incoming: Vec<Tag>) -> Result<ResolvedTags> {
        let mut resolved = ResolvedTags {
            ids: Vec::new(),
            created: Vec::new(),
        };

        for mut tag in dedup_by_name(incoming) {
            tag.validate()?;

            if let Some(existing) = self.tag_ids_by_name.get(&tag.name) {
                resolved.ids.push(*existing);
                continue;
            }

            if self.tags.contains_key(&tag.id) {
                tag.id = TagId::new();
            }
            resolved.ids.push(tag.id);
            resolved.created.push(tag);
        }

        Ok(resolved)
    }

    fn insert_tags(&mut self, tags: Vec<Tag>) {
        for tag in tags {
            self.tag_ids_by_name.insert(tag.name.clone(), tag.id);
            self.tags.insert(tag.id, tag);
        }
    }
}

/// Authoritative library state with optional write-through persistence.
pub struct LibraryStore {
    state: RwLock<LibraryState>,
    repository: Option<Arc<dyn LibraryRepository>>,
}

impl std::fmt::Debug for LibraryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryStore")
            .field("persistent", &self.repository.is_some())
            .finish()
    }
}

impl LibraryStore {
    /// Store without persistence.
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(LibraryState::default()),
            repository: None,
        }
    }

    /// Load the persisted library and write every later mutation through
    /// `repository`.
    ///
    /// # Errors
    /// Fails if the snapshot cannot be read or references unknown tags.
    pub async fn open(repository: Arc<dyn LibraryRepository>) -> Result<Self> {
        let snapshot = repository.load_snapshot().await?;
        let mut state = LibraryState::default();

        for tag in snapshot.tags {
            if state.tag_ids_by_name.contains_key(&tag.name) {
                return Err(crate::LibraryError::CorruptRecord {
                    entity: "tag",
                    id: tag.id.to_string(),
                    message: format!("duplicate tag name '{}'", tag.name),
                });
            }
            state.insert_tags(vec![tag]);
        }

        for stored in snapshot.songs {
            if let Some(missing) = stored.tag_ids.iter().find(|id| !state.tags.contains_key(*id)) {
                return Err(crate::LibraryError::CorruptRecord {
                    entity: "song",
                    id: stored.song.id.to_string(),
                    message: format!("references unknown tag {}", missing),
                });
            }

            state.songs.insert(
                stored.song.id.clone(),
                SongRecord {
                    song: stored.song,
                    status: stored.status,
                    revision: 0,
                    tag_ids: stored.tag_ids,
                },
            );
        }

        info!(
            songs = state.songs.len(),
            tags = state.tags.len(),
            "Library loaded"
        );

        Ok(Self {
            state: RwLock::new(state),
            repository: Some(repository),
        })
    }

    /// Persist the song record and the tags it introduces as one write.
    async fn persist(&self, created: &[Tag], record: &SongRecord) -> Result<()> {
        match &self.repository {
            Some(repository) => repository.save_song(&record.to_stored(), created).await,
            None => Ok(()),
        }
    }

    async fn commit(
        &self,
        state: &mut LibraryState,
        created: Vec<Tag>,
        record: SongRecord,
    ) -> Result<LibrarySong> {
        self.persist(&created, &record).await?;
        state.insert_tags(created);
        let view = state.view(&record);
        state.songs.insert(record.song.id.clone(), record);
        Ok(view)
    }

    // -------------------------------------------------------------------------
    // Local mutations
    // -------------------------------------------------------------------------

    /// Insert or update a song and replace its tag set.
    ///
    /// New songs and re-added `PendingDelete` songs become `PendingUpload`. A
    /// `Synced` song becomes `PendingUpload` only when its tag set changed.
    /// The original `date_added` of an existing song is kept.
    #[instrument(skip(self, song, tags), fields(song_id = %song.id))]
    pub async fn upsert_song(&self, mut song: Song, tags: Vec<Tag>) -> Result<LibrarySong> {
        song.validate()?;
        let mut state = self.state.write().await;
        let resolved = state.resolve(tags)?;

        let record = match state.songs.get(&song.id) {
            None => {
                debug!("Adding new song");
                SongRecord {
                    song,
                    status: SyncStatus::PendingUpload,
                    revision: 0,
                    tag_ids: resolved.ids,
                }
            }
            Some(existing) => {
                song.date_added = existing.song.date_added;
                let tags_changed =
                    existing.tag_set() != resolved.ids.iter().copied().collect::<HashSet<_>>();

                if !tags_changed && existing.song == song && existing.status != SyncStatus::PendingDelete
                {
                    return Ok(state.view(existing));
                }

                let status = match existing.status {
                    SyncStatus::Synced if !tags_changed => SyncStatus::Synced,
                    _ => SyncStatus::PendingUpload,
                };
                debug!(from = %existing.status, to = %status, tags_changed, "Updating song");

                SongRecord {
                    song,
                    status,
                    revision: existing.revision + 1,
                    tag_ids: resolved.ids,
                }
            }
        };

        self.commit(&mut state, resolved.created, record).await
    }

    /// Soft-delete a song.
    ///
    /// Returns `true` when the song moved to `PendingDelete`; unknown and
    /// already-deleted songs are left alone.
    #[instrument(skip(self), fields(song_id = %id))]
    pub async fn delete_song(&self, id: &SongId) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(existing) = state.songs.get(id) else {
            return Ok(false);
        };
        if existing.status == SyncStatus::PendingDelete {
            return Ok(false);
        }

        let mut record = existing.clone();
        record.status = SyncStatus::PendingDelete;
        record.revision += 1;
        debug!(from = %existing.status, "Marking song for deletion");

        self.commit(&mut state, Vec::new(), record).await?;
        Ok(true)
    }

    /// Union `tags` into a song's tag set.
    ///
    /// Returns `true` if at least one tag was added; a `Synced` song then
    /// becomes `PendingUpload`. No-op for unknown and `PendingDelete` songs.
    #[instrument(skip(self, tags), fields(song_id = %id, incoming = tags.len()))]
    pub async fn attach_tags(&self, id: &SongId, tags: Vec<Tag>) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(existing) = state.songs.get(id) else {
            return Ok(false);
        };
        if existing.status == SyncStatus::PendingDelete {
            return Ok(false);
        }

        let resolved = state.resolve(tags)?;
        let current = existing.tag_set();
        let added: Vec<TagId> = resolved
            .ids
            .into_iter()
            .filter(|tag_id| !current.contains(tag_id))
            .collect();

        if added.is_empty() {
            return Ok(false);
        }

        let mut record = existing.clone();
        record.tag_ids.extend(added.iter().copied());
        record.status = SyncStatus::PendingUpload;
        record.revision += 1;

        debug!(added = added.len(), "Attached tags");
        self.commit(&mut state, resolved.created, record).await?;
        Ok(true)
    }

    /// Remove tags by name from a song.
    ///
    /// Returns `true` if the tag set shrank; a `Synced` song then becomes
    /// `PendingUpload`. No-op for unknown and `PendingDelete` songs.
    #[instrument(skip(self, names), fields(song_id = %id))]
    pub async fn detach_tags(&self, id: &SongId, names: &[&str]) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(existing) = state.songs.get(id) else {
            return Ok(false);
        };
        if existing.status == SyncStatus::PendingDelete {
            return Ok(false);
        }

        let doomed: HashSet<TagId> = names
            .iter()
            .filter_map(|name| state.tag_ids_by_name.get(*name).copied())
            .collect();

        let mut record = existing.clone();
        record.tag_ids.retain(|tag_id| !doomed.contains(tag_id));
        if record.tag_ids.len() == existing.tag_ids.len() {
            return Ok(false);
        }

        record.status = SyncStatus::PendingUpload;
        record.revision += 1;

        self.commit(&mut state, Vec::new(), record).await?;
        Ok(true)
    }

    // -------------------------------------------------------------------------
    // Sync acknowledgments
    // -------------------------------------------------------------------------

    /// Mark a pushed song `Synced` if it was not mutated since `revision`.
    ///
    /// Returns whether the acknowledgment applied.
    #[instrument(skip(self), fields(song_id = %id))]
    pub async fn acknowledge_upload(&self, id: &SongId, revision: u64) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(existing) = state.songs.get(id) else {
            return Ok(false);
        };

        if existing.status != SyncStatus::PendingUpload || existing.revision != revision {
            debug!(
                status = %existing.status,
                pushed_revision = revision,
                current_revision = existing.revision,
                "Upload acknowledgment is stale"
            );
            return Ok(false);
        }

        let mut record = existing.clone();
        record.status = SyncStatus::Synced;

        self.commit(&mut state, Vec::new(), record).await?;
        Ok(true)
    }

    /// Purge a song whose remote deletion was confirmed.
    ///
    /// Only songs still in `PendingDelete` are removed; their tags are kept.
    #[instrument(skip(self), fields(song_id = %id))]
    pub async fn acknowledge_delete(&self, id: &SongId) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.songs.get(id) {
            Some(existing) if existing.status == SyncStatus::PendingDelete => {}
            _ => return Ok(false),
        }

        if let Some(repository) = &self.repository {
            repository.delete_song(id).await?;
        }
        state.songs.remove(id);
        debug!("Song purged");
        Ok(true)
    }

    /// Merge one remote snapshot under last-writer-wins.
    ///
    /// Local pending intent always wins over remote data. For a `Synced` song
    /// the tag set and the fields the remote owns (title, artist, catalog id,
    /// artwork url) are replaced.
    #[instrument(skip(self, song, tags), fields(song_id = %song.id))]
    pub async fn apply_remote_song(&self, song: Song, tags: Vec<Tag>) -> Result<RemoteApplyOutcome> {
        song.validate()?;
        let mut state = self.state.write().await;

        let (record, created, outcome) = match state.songs.get(&song.id) {
            Some(existing) if existing.status.is_pending() => {
                return Ok(RemoteApplyOutcome::SkippedPending);
            }
            None => {
                let resolved = state.resolve(tags)?;
                let record = SongRecord {
                    song,
                    status: SyncStatus::Synced,
                    revision: 0,
                    tag_ids: resolved.ids,
                };
                (record, resolved.created, RemoteApplyOutcome::Created)
            }
            Some(existing) => {
                let resolved = state.resolve(tags)?;
                let mut merged = existing.song.clone();
                merged.title = song.title;
                merged.artist = song.artist;
                merged.catalog_id = song.catalog_id;
                merged.artwork_url = song.artwork_url;

                let same_tags =
                    existing.tag_set() == resolved.ids.iter().copied().collect::<HashSet<_>>();
                if merged == existing.song && same_tags {
                    return Ok(RemoteApplyOutcome::Unchanged);
                }

                let record = SongRecord {
                    song: merged,
                    status: SyncStatus::Synced,
                    revision: existing.revision + 1,
                    tag_ids: resolved.ids,
                };
                (record, resolved.created, RemoteApplyOutcome::Replaced)
            }
        };

        self.commit(&mut state, created, record).await?;
        Ok(outcome)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Any song by id, including ones pending deletion.
    pub async fn song(&self, id: &SongId) -> Option<LibrarySong> {
        let state = self.state.read().await;
        state.songs.get(id).map(|record| state.view(record))
    }

    /// Library songs, excluding those pending deletion.
    pub async fn songs(&self) -> Vec<LibrarySong> {
        self.state
            .read()
            .await
            .collect(|record| record.status != SyncStatus::PendingDelete)
    }

    /// Songs whose status is not `Synced`, derived from the current state.
    pub async fn songs_needing_sync(&self) -> Vec<LibrarySong> {
        self.state
            .read()
            .await
            .collect(|record| record.status.is_pending())
    }

    /// Songs without any tag, excluding those pending deletion.
    pub async fn unanalyzed_songs(&self) -> Vec<LibrarySong> {
        self.state.read().await.collect(|record| {
            record.tag_ids.is_empty() && record.status != SyncStatus::PendingDelete
        })
    }

    /// Library songs carrying at least one of `names`.
    pub async fn songs_with_any_tag(&self, names: &[String]) -> Vec<LibrarySong> {
        let state = self.state.read().await;
        let wanted: HashSet<TagId> = names
            .iter()
            .filter_map(|name| state.tag_ids_by_name.get(name).copied())
            .collect();

        state.collect(|record| {
            record.status != SyncStatus::PendingDelete
                && record.tag_ids.iter().any(|id| wanted.contains(id))
        })
    }

    /// All tags, sorted by name.
    pub async fn tags(&self) -> Vec<Tag> {
        let state = self.state.read().await;
        let mut tags: Vec<Tag> = state.tags.values().cloned().collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        tags
    }

    pub async fn tag_by_name(&self, name: &str) -> Option<Tag> {
        let state = self.state.read().await;
        state
            .tag_ids_by_name
            .get(name)
            .and_then(|id| state.tags.get(id))
            .cloned()
    }

    /// Number of song records, including those pending deletion.
    pub async fn len(&self) -> usize {
        self.state.read().await.songs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
