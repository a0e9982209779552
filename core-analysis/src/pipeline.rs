//! # Analysis Pipeline
//!
//! Tags every song that has no tags yet with vibes proposed by the classifier.
//!
//! Songs are processed one at a time so progress stays monotonic and at most
//! one classifier call is in flight. The store lock is only taken to read the
//! batch and to attach results, never across a classifier call.
//!
//! Cancellation is cooperative: the token is checked before each song, so an
//! in-flight classification finishes and its tags are still applied. Dropping
//! the `analyze_library` future ends the run as well; the active slot is
//! released and the state reset by [`ActiveRun`] on drop.

use crate::error::{AnalysisError, Result};
use crate::state::{
    AnalysisFailure, AnalysisState, AnalysisSummary, SongAnalysisResult, STATUS_CANCELLED,
    STATUS_COMPLETE,
};
use async_trait::async_trait;
use bridge_traits::{TextSanitizer, VibeClassifier};
use core_library::{dedup_by_name, LibrarySong, LibraryStore};
use core_runtime::config::AnalysisSettings;
use core_runtime::events::{AnalysisEvent, CoreEvent, EventBus};
use core_runtime::logging::truncate_for_log;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Library-wide tagging actions.
#[async_trait]
pub trait LibraryActionService: Send + Sync {
    /// Classify and tag every unanalyzed song.
    ///
    /// An empty batch returns immediately without touching the state.
    ///
    /// # Errors
    /// [`AnalysisError::AlreadyRunning`] if a batch is in progress. Per-song
    /// failures are reported in the summary and the state, not returned.
    async fn analyze_library(&self) -> Result<AnalysisSummary>;

    /// Ask the running batch to stop before its next song.
    ///
    /// Returns `false` when no batch is running.
    async fn cancel_analysis(&self) -> bool;

    fn state(&self) -> AnalysisState;

    fn subscribe(&self) -> watch::Receiver<AnalysisState>;

    /// Library songs matching the mood described by `prompt`.
    async fn songs_for_mood(&self, prompt: &str) -> Result<Vec<LibrarySong>>;
}

/// Holds the active-run slot for one batch and releases it on drop.
struct ActiveRun<'a> {
    pipeline: &'a AnalysisPipeline,
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        *self.pipeline.active_slot() = None;

        let interrupted = self.pipeline.state.send_if_modified(|state| {
            if !state.is_analyzing {
                return false;
            }
            *state = AnalysisState {
                analysis_status: STATUS_CANCELLED.to_string(),
                error_message: state.error_message.take(),
                ..AnalysisState::default()
            };
            true
        });
        if interrupted {
            warn!("Library analysis dropped before completion");
        }
    }
}

pub struct AnalysisPipeline {
    store: Arc<LibraryStore>,
    classifier: Arc<dyn VibeClassifier>,
    sanitizer: Arc<dyn TextSanitizer>,
    event_bus: EventBus,
    settings: AnalysisSettings,
    state: watch::Sender<AnalysisState>,
    active: Mutex<Option<CancellationToken>>,
}

impl AnalysisPipeline {
    pub fn new(
        store: Arc<LibraryStore>,
        classifier: Arc<dyn VibeClassifier>,
        sanitizer: Arc<dyn TextSanitizer>,
        event_bus: EventBus,
        settings: AnalysisSettings,
    ) -> Self {
        let (state, _) = watch::channel(AnalysisState::default());
        Self {
            store,
            classifier,
            sanitizer,
            event_bus,
            settings,
            state,
            active: Mutex::new(None),
        }
    }

    fn emit(&self, event: AnalysisEvent) {
        self.event_bus.emit(CoreEvent::Analysis(event)).ok();
    }

    fn active_slot(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the active-run slot, or `None` if a batch already holds it.
    fn begin_run(&self) -> Option<(ActiveRun<'_>, CancellationToken)> {
        let mut active = self.active_slot();
        if active.is_some() {
            return None;
        }
        let token = CancellationToken::new();
        *active = Some(token.clone());
        Some((ActiveRun { pipeline: self }, token))
    }

    /// Proposals for one song: deduplicated, capped, non-blank.
    async fn propose_tags(&self, entry: &LibrarySong) -> Result<SongAnalysisResult> {
        let song = &entry.song;
        let title = self.sanitizer.sanitize(&song.title);
        let artist = self.sanitizer.sanitize(&song.artist);
        let album = song.album.as_deref().map(|album| self.sanitizer.sanitize(album));
        let genre = song.genre.as_deref().map(|genre| self.sanitizer.sanitize(genre));

        let proposals = self
            .classifier
            .get_vibes_for_song(&title, &artist, album.as_deref(), genre.as_deref())
            .await?;

        let tags = dedup_by_name(proposals)
            .into_iter()
            .filter(|tag| !tag.name.trim().is_empty())
            .take(self.settings.max_tags_per_song)
            .collect();

        Ok(SongAnalysisResult {
            song_id: entry.id().clone(),
            tags,
        })
    }

    async fn analyze_song(&self, entry: &LibrarySong) -> Result<()> {
        let result = self.propose_tags(entry).await?;
        if result.tags.is_empty() {
            debug!(song_id = %entry.id(), "Classifier proposed no tags");
            return Ok(());
        }

        let count = result.tags.len();
        let song_id = result.song_id.clone();
        let attached = self.store.attach_tags(&song_id, result.into_tags()).await?;
        debug!(song_id = %entry.id(), count, attached, "Vibes applied");
        Ok(())
    }

    async fn run_batch(&self, batch: Vec<LibrarySong>, token: CancellationToken) -> AnalysisSummary {
        let total = batch.len();
        let mut summary = AnalysisSummary {
            total,
            ..AnalysisSummary::default()
        };

        info!(total, "Starting library analysis");
        self.state.send_modify(|state| {
            *state = AnalysisState {
                is_analyzing: true,
                total_to_analyze_count: total,
                analysis_status: format!("Analyzing 0 of {}", total),
                ..AnalysisState::default()
            };
        });
        self.emit(AnalysisEvent::Started { total: total as u64 });

        for (index, entry) in batch.iter().enumerate() {
            if token.is_cancelled() {
                summary.cancelled = true;
                summary.remaining = total - index;
                break;
            }

            let outcome = self.analyze_song(entry).await;
            let mut snapshot = AnalysisState::default();
            self.state.send_modify(|state| {
                match &outcome {
                    Ok(()) => state.current_analyzed_count += 1,
                    Err(e) => {
                        state.failed_count += 1;
                        state.error_message = Some(format!("{}: {}", entry.song.title, e));
                    }
                }
                state.analysis_status = format!("Analyzing {} of {}", state.processed_count(), total);
                snapshot = state.clone();
            });

            match outcome {
                Ok(()) => summary.analyzed.push(entry.id().clone()),
                Err(e) => {
                    warn!(song_id = %entry.id(), error = %e, "Song analysis failed");
                    self.emit(AnalysisEvent::SongFailed {
                        song_id: entry.id().to_string(),
                        message: e.to_string(),
                    });
                    summary.failures.push(AnalysisFailure {
                        song_id: entry.id().clone(),
                        message: e.to_string(),
                    });
                }
            }

            self.emit(AnalysisEvent::Progress {
                analyzed: snapshot.current_analyzed_count as u64,
                total: total as u64,
                percent: snapshot.processed_percent(),
            });
        }

        let status = if summary.cancelled {
            STATUS_CANCELLED
        } else {
            STATUS_COMPLETE
        };
        self.state.send_modify(|state| {
            state.is_analyzing = false;
            state.current_analyzed_count = 0;
            state.total_to_analyze_count = 0;
            state.failed_count = 0;
            state.analysis_status = status.to_string();
        });

        if summary.cancelled {
            info!(
                analyzed = summary.analyzed.len(),
                remaining = summary.remaining,
                "Library analysis cancelled"
            );
            self.emit(AnalysisEvent::Cancelled {
                analyzed: summary.analyzed.len() as u64,
                remaining: summary.remaining as u64,
            });
        } else {
            info!(
                analyzed = summary.analyzed.len(),
                failed = summary.failures.len(),
                "Library analysis complete"
            );
            self.emit(AnalysisEvent::Completed {
                analyzed: summary.analyzed.len() as u64,
                failed: summary.failures.len() as u64,
            });
        }

        summary
    }
}

#[async_trait]
impl LibraryActionService for AnalysisPipeline {
    #[instrument(skip(self))]
    async fn analyze_library(&self) -> Result<AnalysisSummary> {
        let Some((_run, token)) = self.begin_run() else {
            return Err(AnalysisError::AlreadyRunning);
        };

        let batch = self.store.unanalyzed_songs().await;
        if batch.is_empty() {
            debug!("No unanalyzed songs");
            return Ok(AnalysisSummary::default());
        }

        Ok(self.run_batch(batch, token).await)
    }

    async fn cancel_analysis(&self) -> bool {
        match self.active_slot().as_ref() {
            Some(token) => {
                info!("Cancelling library analysis");
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn state(&self) -> AnalysisState {
        self.state.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<AnalysisState> {
        self.state.subscribe()
    }

    #[instrument(skip(self, prompt))]
    async fn songs_for_mood(&self, prompt: &str) -> Result<Vec<LibrarySong>> {
        let prompt = self.sanitizer.sanitize(prompt);
        if prompt.is_empty() {
            return Ok(Vec::new());
        }
        debug!(prompt = %truncate_for_log(&prompt, 80), "Resolving mood prompt");

        let names = dedup_by_name(self.classifier.analyze_user_sentiment(&prompt).await?);
        let songs = self.store.songs_with_any_tag(&names).await;
        debug!(tags = names.len(), matches = songs.len(), "Mood resolved");
        Ok(songs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PromptSanitizer;
    use bridge_traits::error::BridgeError;
    use bridge_traits::{AnalyzedTag, IdentitySanitizer};
    use core_library::{Song, SongId, SyncStatus, Tag};

    /// Returns the same answers for every call and records mood prompts.
    struct StaticClassifier {
        vibes: Vec<AnalyzedTag>,
        moods: std::result::Result<Vec<String>, String>,
        prompts: std::sync::Mutex<Vec<String>>,
    }

    impl StaticClassifier {
        fn new(vibes: Vec<AnalyzedTag>) -> Self {
            Self {
                vibes,
                moods: Ok(Vec::new()),
                prompts: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn with_moods(mut self, moods: std::result::Result<Vec<String>, String>) -> Self {
            self.moods = moods;
            self
        }
    }

    #[async_trait]
    impl VibeClassifier for StaticClassifier {
        async fn get_vibes_for_song(
            &self,
            _title: &str,
            _artist: &str,
            _album: Option<&str>,
            _genre: Option<&str>,
        ) -> bridge_traits::error::Result<Vec<AnalyzedTag>> {
            Ok(self.vibes.clone())
        }

        async fn analyze_user_sentiment(&self, prompt: &str) -> bridge_traits::error::Result<Vec<String>> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.moods.clone().map_err(BridgeError::MalformedResponse)
        }
    }

    fn pipeline(store: Arc<LibraryStore>, classifier: Arc<StaticClassifier>) -> AnalysisPipeline {
        AnalysisPipeline::new(
            store,
            classifier,
            Arc::new(PromptSanitizer::new(100)),
            EventBus::new(32),
            AnalysisSettings::default().with_max_tags_per_song(2),
        )
    }

    #[tokio::test]
    async fn test_proposals_are_deduplicated_and_capped() {
        let store = Arc::new(LibraryStore::in_memory());
        store
            .upsert_song(Song::new("s1", "Windowlicker", "Aphex Twin"), Vec::new())
            .await
            .unwrap();

        let classifier = Arc::new(StaticClassifier::new(vec![
            AnalyzedTag::new("weird"),
            AnalyzedTag::new(" "),
            AnalyzedTag::new("weird"),
            AnalyzedTag::new("glitchy"),
            AnalyzedTag::new("dark"),
        ]));

        let summary = pipeline(store.clone(), classifier).analyze_library().await.unwrap();
        assert_eq!(summary.analyzed, vec![SongId::from("s1")]);

        let song = store.song(&SongId::from("s1")).await.unwrap();
        let names: Vec<&str> = song.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["weird", "glitchy"]);
        assert!(song.tags.iter().all(|t| t.kind == core_library::TagKind::System));
        assert_eq!(song.status, SyncStatus::PendingUpload);
    }

    #[tokio::test]
    async fn test_song_without_proposals_stays_unanalyzed() {
        let store = Arc::new(LibraryStore::in_memory());
        store
            .upsert_song(Song::new("s1", "4'33\"", "John Cage"), Vec::new())
            .await
            .unwrap();

        let summary = pipeline(store.clone(), Arc::new(StaticClassifier::new(Vec::new())))
            .analyze_library()
            .await
            .unwrap();

        assert_eq!(summary.analyzed.len(), 1);
        assert_eq!(store.unanalyzed_songs().await.len(), 1);
    }

    #[tokio::test]
    async fn test_mood_prompt_is_sanitized_and_matched() {
        let store = Arc::new(LibraryStore::in_memory());
        store
            .upsert_song(Song::new("s1", "Intro", "The xx"), vec![Tag::system("calm")])
            .await
            .unwrap();
        store
            .upsert_song(Song::new("s2", "Sabotage", "Beastie Boys"), vec![Tag::system("loud")])
            .await
            .unwrap();

        let classifier = Arc::new(
            StaticClassifier::new(Vec::new())
                .with_moods(Ok(vec!["calm".to_string(), "calm".to_string()])),
        );
        let pipeline = pipeline(store, classifier.clone());

        let songs = pipeline.songs_for_mood("  something   calm ").await.unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].id(), &SongId::from("s1"));
        assert_eq!(*classifier.prompts.lock().unwrap(), vec!["something calm".to_string()]);
    }

    #[tokio::test]
    async fn test_mood_classifier_failure_is_returned() {
        let classifier = Arc::new(
            StaticClassifier::new(Vec::new()).with_moods(Err("not json".to_string())),
        );

        let result = pipeline(Arc::new(LibraryStore::in_memory()), classifier)
            .songs_for_mood("happy")
            .await;
        assert!(matches!(
            result,
            Err(AnalysisError::Classifier(BridgeError::MalformedResponse(_)))
        ));
    }

    #[tokio::test]
    async fn test_blank_mood_prompt_skips_classifier() {
        let classifier = Arc::new(StaticClassifier::new(Vec::new()));
        let songs = pipeline(Arc::new(LibraryStore::in_memory()), classifier.clone())
            .songs_for_mood(" \n\t ")
            .await
            .unwrap();

        assert!(songs.is_empty());
        assert!(classifier.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_identity_sanitizer_passes_raw_text() {
        let classifier = Arc::new(
            StaticClassifier::new(Vec::new()).with_moods(Ok(Vec::new())),
        );
        let pipeline = AnalysisPipeline::new(
            Arc::new(LibraryStore::in_memory()),
            classifier.clone(),
            Arc::new(IdentitySanitizer),
            EventBus::new(8),
            AnalysisSettings::default(),
        );

        pipeline.songs_for_mood("  \"quoted\"  ").await.unwrap();
        assert_eq!(*classifier.prompts.lock().unwrap(), vec!["  \"quoted\"  ".to_string()]);
    }
}
