//! End-to-end flow through the façade: edit, analyze, sync, reopen.

use async_trait::async_trait;
use bridge_traits::{AnalyzedTag, RemoteSongSyncInfo, RemoteSyncClient, VibeClassifier};
use core_service::{CoreConfig, CoreEvent, Song, SongId, SyncStatus, VibeCore};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default)]
struct RecordingRemote {
    pushed: Mutex<Vec<RemoteSongSyncInfo>>,
}

#[async_trait]
impl RemoteSyncClient for RecordingRemote {
    async fn push_song(&self, song: &RemoteSongSyncInfo) -> bridge_traits::error::Result<()> {
        self.pushed.lock().await.push(song.clone());
        Ok(())
    }

    async fn delete_song_remote(&self, _song_id: &str) -> bridge_traits::error::Result<()> {
        Ok(())
    }

    async fn fetch_all_remote(&self) -> bridge_traits::error::Result<Vec<RemoteSongSyncInfo>> {
        Ok(self.pushed.lock().await.clone())
    }
}

struct MoodClassifier;

#[async_trait]
impl VibeClassifier for MoodClassifier {
    async fn get_vibes_for_song(
        &self,
        _title: &str,
        _artist: &str,
        _album: Option<&str>,
        _genre: Option<&str>,
    ) -> bridge_traits::error::Result<Vec<AnalyzedTag>> {
        Ok(vec![
            AnalyzedTag::new("dreamy").with_description("Hazy synth pads"),
            AnalyzedTag::new("dreamy"),
        ])
    }

    async fn analyze_user_sentiment(&self, _prompt: &str) -> bridge_traits::error::Result<Vec<String>> {
        Ok(vec!["dreamy".to_string()])
    }
}

fn config(remote: Arc<RecordingRemote>) -> core_service::Result<CoreConfig> {
    Ok(CoreConfig::builder()
        .remote_client(remote)
        .classifier(Arc::new(MoodClassifier))
        .build()?)
}

#[tokio::test]
async fn test_analyze_then_sync_pushes_new_tags() {
    let remote = Arc::new(RecordingRemote::default());
    let core = VibeCore::bootstrap(config(remote.clone()).unwrap()).await.unwrap();
    let mut events = core.events().subscribe();

    core.library()
        .upsert_song(Song::new("s1", "Space Song", "Beach House"), Vec::new())
        .await
        .unwrap();

    let summary = core.analysis().analyze_library().await.unwrap();
    assert_eq!(summary.analyzed, vec![SongId::from("s1")]);

    let report = core.sync().synchronize().await.unwrap();
    assert_eq!(report.push.pushed, vec![SongId::from("s1")]);
    assert_eq!(report.pull.unwrap().unchanged, 1);

    let pushed = remote.pushed.lock().await;
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0].tags.len(), 1);
    assert_eq!(pushed[0].tags[0].name, "dreamy");
    assert_eq!(pushed[0].tags[0].kind, "system");
    drop(pushed);

    let song = core.library().song(&SongId::from("s1")).await.unwrap();
    assert_eq!(song.status, SyncStatus::Synced);

    let matches = core.analysis().songs_for_mood("something hazy").await.unwrap();
    assert_eq!(matches.len(), 1);

    let mut saw_sync = false;
    let mut saw_analysis = false;
    while let Ok(event) = events.try_recv() {
        match event {
            CoreEvent::Sync(_) => saw_sync = true,
            CoreEvent::Analysis(_) => saw_analysis = true,
        }
    }
    assert!(saw_sync && saw_analysis);
}

#[tokio::test]
async fn test_library_survives_restart() {
    let path = std::env::temp_dir().join(format!("vibetag-core-{}.db", uuid::Uuid::new_v4()));
    let remote = Arc::new(RecordingRemote::default());

    {
        let mut cfg = config(remote.clone()).unwrap();
        cfg.database_path = Some(path.clone());
        let core = VibeCore::bootstrap(cfg).await.unwrap();
        core.library()
            .upsert_song(Song::new("s1", "Myth", "Beach House"), Vec::new())
            .await
            .unwrap();
        core.analysis().analyze_library().await.unwrap();
        core.sync().sync_pending_changes().await.unwrap();
    }

    let mut cfg = config(remote).unwrap();
    cfg.database_path = Some(path.clone());
    let core = VibeCore::bootstrap(cfg).await.unwrap();

    let song = core.library().song(&SongId::from("s1")).await.unwrap();
    assert_eq!(song.status, SyncStatus::Synced);
    assert!(song.has_tag("dreamy"));
    assert!(core.library().unanalyzed_songs().await.is_empty());

    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
    }
}

#[tokio::test]
async fn test_invalid_settings_are_rejected_at_bootstrap() {
    let mut cfg = config(Arc::new(RecordingRemote::default())).unwrap();
    cfg.event_buffer_size = 0;

    let result = VibeCore::bootstrap(cfg).await;
    assert!(matches!(
        result,
        Err(core_service::CoreError::Runtime(core_runtime::Error::InvalidSetting { .. }))
    ));
}
