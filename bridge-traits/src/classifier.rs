//! AI Vibe Classifier Abstraction
//!
//! The classifier proposes mood/vibe tags for a song and extracts tag names
//! from a free-text mood prompt. It is network-bound and owns its own
//! timeouts; the core only sees the outcome.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A tag proposed by the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzedTag {
    /// Tag name, the identity used for deduplication
    pub name: String,
    /// Optional human-readable explanation of why the tag fits
    #[serde(default)]
    pub description: Option<String>,
}

impl AnalyzedTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Vibe classifier trait
///
/// Implementations call an upstream model. They must return
/// [`BridgeError::Classification`](crate::error::BridgeError::Classification)
/// when the upstream call fails and
/// [`BridgeError::MalformedResponse`](crate::error::BridgeError::MalformedResponse)
/// when the reply cannot be parsed into tags.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::classifier::VibeClassifier;
///
/// async fn tag(classifier: &dyn VibeClassifier) -> bridge_traits::error::Result<usize> {
///     let tags = classifier
///         .get_vibes_for_song("Teardrop", "Massive Attack", Some("Mezzanine"), None)
///         .await?;
///     Ok(tags.len())
/// }
/// ```
#[async_trait::async_trait]
pub trait VibeClassifier: Send + Sync {
    /// Propose vibe tags for a single song.
    async fn get_vibes_for_song(
        &self,
        title: &str,
        artist: &str,
        album: Option<&str>,
        genre: Option<&str>,
    ) -> Result<Vec<AnalyzedTag>>;

    /// Extract tag names matching the mood described by `prompt`.
    async fn analyze_user_sentiment(&self, prompt: &str) -> Result<Vec<String>>;
}
