//! Prompt text normalization applied before text reaches the classifier.

use bridge_traits::TextSanitizer;
use core_runtime::config::AnalysisSettings;

/// Default [`TextSanitizer`] for classifier prompts.
///
/// Trims the input, drops control characters, collapses whitespace runs into
/// one space, backslash-escapes `"` and `\`, and keeps at most `max_chars`
/// characters of output. An escape sequence is never split by truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptSanitizer {
    max_chars: usize,
}

impl PromptSanitizer {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    pub fn from_settings(settings: &AnalysisSettings) -> Self {
        Self::new(settings.max_prompt_chars)
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }
}

impl Default for PromptSanitizer {
    fn default() -> Self {
        Self::from_settings(&AnalysisSettings::default())
    }
}

impl TextSanitizer for PromptSanitizer {
    fn sanitize(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len().min(self.max_chars));
        let mut used = 0usize;
        let mut pending_space = false;

        for ch in text.chars() {
            if ch.is_whitespace() {
                pending_space = used > 0;
                continue;
            }
            if ch.is_control() {
                continue;
            }

            let escaped = matches!(ch, '"' | '\\');
            let needed = usize::from(pending_space) + usize::from(escaped) + 1;
            if used + needed > self.max_chars {
                break;
            }

            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            if escaped {
                out.push('\\');
            }
            out.push(ch);
            used += needed;
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_and_collapses_whitespace() {
        let sanitizer = PromptSanitizer::new(100);
        assert_eq!(
            sanitizer.sanitize("  rainy \t\n  sunday   morning  "),
            "rainy sunday morning"
        );
    }

    #[test]
    fn test_strips_control_characters() {
        let sanitizer = PromptSanitizer::new(100);
        assert_eq!(sanitizer.sanitize("calm\u{0007}\u{001b}ness"), "calmness");
    }

    #[test]
    fn test_escapes_quotes_and_backslashes() {
        let sanitizer = PromptSanitizer::new(100);
        assert_eq!(
            sanitizer.sanitize(r#"say "hi" \o/"#),
            r#"say \"hi\" \\o/"#
        );
    }

    #[test]
    fn test_truncates_by_characters() {
        let sanitizer = PromptSanitizer::new(5);
        assert_eq!(sanitizer.sanitize("abcdefg"), "abcde");
        assert_eq!(sanitizer.sanitize("ééééééé"), "ééééé");
    }

    #[test]
    fn test_truncation_keeps_escapes_whole() {
        let sanitizer = PromptSanitizer::new(2);
        assert_eq!(sanitizer.sanitize("a\"b"), "a");
    }

    #[test]
    fn test_blank_input() {
        let sanitizer = PromptSanitizer::default();
        assert_eq!(sanitizer.max_chars(), 500);
        assert_eq!(sanitizer.sanitize(" \n\t "), "");
    }
}
