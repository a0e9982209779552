//! # Library Analysis
//!
//! Batch tagging of untagged songs with vibes from an external classifier,
//! plus mood-prompt lookups over the tagged library.
//!
//! - [`AnalysisPipeline`] implements [`LibraryActionService`]
//! - [`AnalysisState`] is published on a `tokio::sync::watch` channel
//! - [`PromptSanitizer`] is the default [`TextSanitizer`](bridge_traits::TextSanitizer)

pub mod error;
pub mod pipeline;
pub mod sanitize;
pub mod state;

pub use error::{AnalysisError, Result};
pub use pipeline::{AnalysisPipeline, LibraryActionService};
pub use sanitize::PromptSanitizer;
pub use state::{AnalysisFailure, AnalysisState, AnalysisSummary, SongAnalysisResult};
