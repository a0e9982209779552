//! Observable analysis status and run summaries.

use bridge_traits::AnalyzedTag;
use core_library::{SongId, Tag};
use serde::Serialize;

pub const STATUS_IDLE: &str = "Idle";
pub const STATUS_COMPLETE: &str = "Analysis complete";
pub const STATUS_CANCELLED: &str = "Analysis cancelled";

/// Status record published on every change of a running batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisState {
    pub is_analyzing: bool,
    /// Songs tagged successfully in the current batch
    pub current_analyzed_count: usize,
    pub total_to_analyze_count: usize,
    /// Songs whose classification or tagging failed in the current batch
    pub failed_count: usize,
    /// Human-readable phase label
    pub analysis_status: String,
    /// Last non-fatal failure; cleared when a new batch starts
    pub error_message: Option<String>,
}

impl Default for AnalysisState {
    fn default() -> Self {
        Self {
            is_analyzing: false,
            current_analyzed_count: 0,
            total_to_analyze_count: 0,
            failed_count: 0,
            analysis_status: STATUS_IDLE.to_string(),
            error_message: None,
        }
    }
}

impl AnalysisState {
    /// Fraction of the batch analyzed, `0.0` when nothing is queued.
    pub fn analysis_progress(&self) -> f64 {
        if self.total_to_analyze_count == 0 {
            return 0.0;
        }
        self.current_analyzed_count as f64 / self.total_to_analyze_count as f64
    }

    /// Songs attempted so far, successful or not.
    pub fn processed_count(&self) -> usize {
        self.current_analyzed_count + self.failed_count
    }

    pub(crate) fn processed_percent(&self) -> u8 {
        if self.total_to_analyze_count == 0 {
            return 0;
        }
        let percent = self.processed_count() * 100 / self.total_to_analyze_count;
        percent.min(100) as u8
    }
}

/// Classifier proposals for one song, deduplicated and capped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongAnalysisResult {
    pub song_id: SongId,
    pub tags: Vec<AnalyzedTag>,
}

impl SongAnalysisResult {
    /// System tags colored from the palette by name.
    pub fn into_tags(self) -> Vec<Tag> {
        self.tags.into_iter().map(|tag| Tag::system(tag.name)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisFailure {
    pub song_id: SongId,
    pub message: String,
}

/// Outcome of one `analyze_library` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisSummary {
    /// Batch size
    pub total: usize,
    pub analyzed: Vec<SongId>,
    pub failures: Vec<AnalysisFailure>,
    /// Songs never attempted because the run was cancelled
    pub remaining: usize,
    pub cancelled: bool,
}

impl AnalysisSummary {
    pub fn is_noop(&self) -> bool {
        self.total == 0
    }
}
