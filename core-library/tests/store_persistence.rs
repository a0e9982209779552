//! LibraryStore backed by the SQLite repository.

use async_trait::async_trait;
use core_library::db::create_test_pool;
use core_library::repositories::{LibrarySnapshot, StoredSong};
use core_library::{
    LibraryRepository, LibraryStore, Song, SongId, SqliteLibraryRepository, SyncStatus, Tag,
    TagId,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// SQLite repository whose next song write fails part-way through its
/// transaction, after the new tags have been inserted.
struct InterruptedRepo {
    inner: SqliteLibraryRepository,
    fail_next: AtomicBool,
}

impl InterruptedRepo {
    fn new(inner: SqliteLibraryRepository) -> Self {
        Self {
            inner,
            fail_next: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl LibraryRepository for InterruptedRepo {
    async fn load_snapshot(&self) -> core_library::Result<LibrarySnapshot> {
        self.inner.load_snapshot().await
    }

    async fn save_song(&self, song: &StoredSong, new_tags: &[Tag]) -> core_library::Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            // A dangling join row trips the foreign key after the tag inserts.
            let mut broken = song.clone();
            broken.tag_ids.push(TagId::new());
            return self.inner.save_song(&broken, new_tags).await;
        }
        self.inner.save_song(song, new_tags).await
    }

    async fn delete_song(&self, id: &SongId) -> core_library::Result<bool> {
        self.inner.delete_song(id).await
    }
}

async fn persistent_store() -> (Arc<SqliteLibraryRepository>, LibraryStore) {
    let pool = create_test_pool().await.unwrap();
    let repo = Arc::new(SqliteLibraryRepository::new(pool));
    let store = LibraryStore::open(repo.clone()).await.unwrap();
    (repo, store)
}

#[tokio::test]
async fn test_reopened_store_matches_previous_state() {
    let (repo, store) = persistent_store().await;

    store
        .upsert_song(
            Song::new("isrc-1", "Teardrop", "Massive Attack").with_date_added(10),
            vec![Tag::system("moody")],
        )
        .await
        .unwrap();
    store
        .apply_remote_song(
            Song::new("isrc-2", "Windowlicker", "Aphex Twin").with_date_added(20),
            vec![Tag::system("moody"), Tag::user("weird")],
        )
        .await
        .unwrap();
    store
        .apply_remote_song(
            Song::new("isrc-3", "Hyperballad", "Björk").with_date_added(30),
            vec![],
        )
        .await
        .unwrap();
    store.delete_song(&SongId::from("isrc-3")).await.unwrap();

    let reopened = LibraryStore::open(repo).await.unwrap();

    let summarize = |songs: Vec<core_library::LibrarySong>| {
        songs
            .into_iter()
            .map(|s| {
                let mut names: Vec<String> = s.tags.into_iter().map(|t| t.name).collect();
                names.sort();
                (s.song, s.status, names)
            })
            .collect::<Vec<_>>()
    };

    assert_eq!(
        summarize(reopened.songs_needing_sync().await),
        summarize(store.songs_needing_sync().await)
    );
    assert_eq!(summarize(reopened.songs().await), summarize(store.songs().await));
    assert_eq!(reopened.tags().await, store.tags().await);
    assert_eq!(reopened.len().await, 3);

    let deleted = reopened.song(&SongId::from("isrc-3")).await.unwrap();
    assert_eq!(deleted.status, SyncStatus::PendingDelete);
}

#[tokio::test]
async fn test_purge_survives_reopen_and_keeps_tags() {
    let (repo, store) = persistent_store().await;
    let id = SongId::from("isrc-9");

    store
        .apply_remote_song(Song::new("isrc-9", "Roygbiv", "Boards of Canada"), vec![Tag::system("hazy")])
        .await
        .unwrap();
    store.delete_song(&id).await.unwrap();
    assert!(store.acknowledge_delete(&id).await.unwrap());

    let reopened = LibraryStore::open(repo).await.unwrap();
    assert!(reopened.is_empty().await);
    assert!(reopened.tag_by_name("hazy").await.is_some());
}

#[tokio::test]
async fn test_acknowledged_upload_is_persisted() {
    let (repo, store) = persistent_store().await;

    let view = store
        .upsert_song(Song::new("isrc-5", "Svefn-g-englar", "Sigur Rós"), vec![])
        .await
        .unwrap();
    store
        .attach_tags(view.id(), vec![Tag::system("ethereal"), Tag::system("slow")])
        .await
        .unwrap();
    let current = store.song(view.id()).await.unwrap();
    assert!(store
        .acknowledge_upload(current.id(), current.revision)
        .await
        .unwrap());

    let reopened = LibraryStore::open(repo).await.unwrap();
    let song = reopened.song(view.id()).await.unwrap();
    assert_eq!(song.status, SyncStatus::Synced);
    assert_eq!(song.tag_names(), HashSet::from(["ethereal", "slow"]));
    assert!(reopened.songs_needing_sync().await.is_empty());
}

#[tokio::test]
async fn test_interrupted_write_leaves_tag_name_usable() {
    let pool = create_test_pool().await.unwrap();
    let repo = Arc::new(InterruptedRepo::new(SqliteLibraryRepository::new(pool)));
    let store = LibraryStore::open(repo.clone()).await.unwrap();

    let s1 = SongId::from("s1");
    let s2 = SongId::from("s2");
    store
        .upsert_song(Song::new("s1", "Aerial Boundaries", "Michael Hedges").with_date_added(1), vec![])
        .await
        .unwrap();
    store
        .upsert_song(Song::new("s2", "Breathe", "Télépopmusik").with_date_added(2), vec![])
        .await
        .unwrap();

    repo.fail_next.store(true, Ordering::SeqCst);
    assert!(store.attach_tags(&s1, vec![Tag::system("chill")]).await.is_err());
    assert!(store.song(&s1).await.unwrap().tags.is_empty());
    assert!(store.tag_by_name("chill").await.is_none());

    assert!(store.attach_tags(&s1, vec![Tag::system("chill")]).await.unwrap());
    assert!(store.attach_tags(&s2, vec![Tag::system("chill")]).await.unwrap());

    let first = store.song(&s1).await.unwrap();
    let second = store.song(&s2).await.unwrap();
    assert_eq!(first.tags, second.tags);

    let reopened = LibraryStore::open(repo).await.unwrap();
    assert_eq!(reopened.tags().await.len(), 1);
    assert!(reopened.song(&s1).await.unwrap().has_tag("chill"));
    assert!(reopened.song(&s2).await.unwrap().has_tag("chill"));
}
