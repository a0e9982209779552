//! Text Sanitizer Abstraction
//!
//! Free text (song titles, user prompts) is escaped and normalized before it
//! is embedded in a prompt sent to the classifier. The sanitizer is applied at
//! that boundary only; merge logic always works on the raw library values.

/// Text sanitizer trait
///
/// Implementations must be pure: the same input always yields the same
/// output.
pub trait TextSanitizer: Send + Sync {
    fn sanitize(&self, text: &str) -> String;
}

/// Sanitizer that passes text through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentitySanitizer;

impl TextSanitizer for IdentitySanitizer {
    fn sanitize(&self, text: &str) -> String {
        text.to_string()
    }
}
