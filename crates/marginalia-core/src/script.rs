//! Unicode script detection for anchor context sizing.
//!
//! Logographic scripts pack a word into one or two characters and do not
//! separate words with spaces, so a fixed-width context window carries more
//! ambiguity there. The builder widens the window when the surrounding text is
//! logographic.
//!
//! The detector performs a single O(n) pass through the input and classifies
//! it by the proportion of characters belonging to each script.

use std::collections::HashMap;
use unicode_script::{Script, UnicodeScript};

/// Detected script category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectedScript {
    /// Latin alphabet (English, French, German, etc.)
    Latin,
    /// CJK scripts: Han (Chinese), Hiragana, Katakana (Japanese), Hangul (Korean)
    Cjk,
    /// Arabic script
    Arabic,
    /// Cyrillic script (Russian, Ukrainian, etc.)
    Cyrillic,
    /// Greek script
    Greek,
    /// Hebrew script
    Hebrew,
    /// Devanagari script (Hindi, Sanskrit, etc.)
    Devanagari,
    /// Thai script (no word spacing, treated like CJK for context sizing)
    Thai,
    /// Multiple scripts detected with significant presence
    Mixed,
    /// Unknown or unclassified script
    Unknown,
}

/// Result of script detection analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptDetection {
    /// Primary (most common) script detected
    pub primary: DetectedScript,
    /// Proportion of classified characters belonging to the primary script
    pub confidence: f32,
    /// Proportion of classified characters that are logographic or unspaced
    pub logographic_ratio: f32,
}

fn map_unicode_script(script: Script) -> DetectedScript {
    match script {
        Script::Latin => DetectedScript::Latin,
        Script::Han | Script::Hiragana | Script::Katakana | Script::Hangul => DetectedScript::Cjk,
        Script::Arabic => DetectedScript::Arabic,
        Script::Cyrillic => DetectedScript::Cyrillic,
        Script::Greek => DetectedScript::Greek,
        Script::Hebrew => DetectedScript::Hebrew,
        Script::Devanagari => DetectedScript::Devanagari,
        Script::Thai => DetectedScript::Thai,
        _ => DetectedScript::Unknown,
    }
}

/// Detects the script(s) used in the input text.
///
/// Whitespace, punctuation and digits are skipped. When two scripts each hold
/// more than 20% of the classified characters the primary is `Mixed`.
///
/// # Examples
///
/// ```
/// use marginalia_core::script::{detect_script, DetectedScript};
///
/// assert_eq!(detect_script("Hello world").primary, DetectedScript::Latin);
/// assert_eq!(detect_script("東京は晴れです").primary, DetectedScript::Cjk);
/// ```
pub fn detect_script(text: &str) -> ScriptDetection {
    let mut counts: HashMap<DetectedScript, usize> = HashMap::new();
    let mut total = 0usize;

    for ch in text.chars() {
        if ch.is_whitespace() || ch.is_ascii_punctuation() || ch.is_ascii_digit() {
            continue;
        }
        let detected = map_unicode_script(ch.script());
        if detected == DetectedScript::Unknown {
            continue;
        }
        *counts.entry(detected).or_insert(0) += 1;
        total += 1;
    }

    if total == 0 {
        return ScriptDetection {
            primary: DetectedScript::Unknown,
            confidence: 0.0,
            logographic_ratio: 0.0,
        };
    }

    let (primary, primary_count) = counts
        .iter()
        .max_by_key(|(script, count)| (**count, std::cmp::Reverse(format!("{:?}", script))))
        .map(|(script, count)| (*script, *count))
        .unwrap_or((DetectedScript::Unknown, 0));

    let logographic = counts.get(&DetectedScript::Cjk).copied().unwrap_or(0)
        + counts.get(&DetectedScript::Thai).copied().unwrap_or(0);

    let mixed_threshold = (total as f32 * 0.20).ceil() as usize;
    let significant = counts.values().filter(|c| **c >= mixed_threshold).count();

    ScriptDetection {
        primary: if significant > 1 {
            DetectedScript::Mixed
        } else {
            primary
        },
        confidence: primary_count as f32 / total as f32,
        logographic_ratio: logographic as f32 / total as f32,
    }
}

/// True when at least half of the classified characters are logographic.
pub fn is_logographic(text: &str) -> bool {
    detect_script(text).logographic_ratio >= 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin_text() {
        let result = detect_script("the quick brown fox");
        assert_eq!(result.primary, DetectedScript::Latin);
        assert!(result.confidence > 0.99);
        assert_eq!(result.logographic_ratio, 0.0);
        assert!(!is_logographic("the quick brown fox"));
    }

    #[test]
    fn test_japanese_text() {
        let text = "吾輩は猫である。名前はまだ無い。";
        assert_eq!(detect_script(text).primary, DetectedScript::Cjk);
        assert!(is_logographic(text));
    }

    #[test]
    fn test_korean_text() {
        assert!(is_logographic("안녕하세요 세계"));
    }

    #[test]
    fn test_mixed_text() {
        let result = detect_script("Rust 编程语言 guide book");
        assert_eq!(result.primary, DetectedScript::Mixed);
    }

    #[test]
    fn test_empty_and_punctuation_only() {
        assert_eq!(detect_script("").primary, DetectedScript::Unknown);
        assert_eq!(detect_script("... 123 !!").primary, DetectedScript::Unknown);
        assert!(!is_logographic(""));
    }

    #[test]
    fn test_cyrillic_text() {
        assert_eq!(detect_script("привет мир").primary, DetectedScript::Cyrillic);
    }
}
