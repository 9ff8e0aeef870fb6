//! Submission notes validation
//!
//! Runs before any persistence attempt. Length-bounds the free text, rejects
//! all-caps shouting, and matches a small denylist of profanity patterns
//! that tolerate character-separator obfuscation ("f.u.c.k").

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum notes length in characters
pub const MAX_NOTES_LEN: usize = 500;

/// Letters must exceed this count before the shouting check applies
const SHOUTING_MIN_LETTERS: usize = 10;

/// Uppercase ratio above which notes count as shouting
const SHOUTING_RATIO: f64 = 0.7;

/// Why a notes value was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotesRejection {
    TooLong,
    Inappropriate,
    Shouting,
}

impl NotesRejection {
    /// User-displayable rejection reason
    pub fn message(&self) -> &'static str {
        match self {
            NotesRejection::TooLong => "Notes are too long (maximum 500 characters)",
            NotesRejection::Inappropriate => "Please keep comments appropriate and professional",
            NotesRejection::Shouting => "Please avoid excessive use of capital letters",
        }
    }
}

/// Denylist with separator tolerance: each letter may repeat and may be
/// followed by any run of non-word characters or underscores.
static PROFANITY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\bf+[\W_]*u+[\W_]*c+[\W_]*k+",
        r"\bs+[\W_]*h+[\W_]*i+[\W_]*t+",
        r"\bb+[\W_]*i+[\W_]*t+[\W_]*c+[\W_]*h+",
        r"\ba+[\W_]*s+[\W_]*s+[\W_]*h+[\W_]*o+[\W_]*l+[\W_]*e+",
        r"\bd+[\W_]*a+[\W_]*m+[\W_]*n+",
        r"\bh+[\W_]*e+[\W_]*l+[\W_]*l+",
        r"\bc+[\W_]*r+[\W_]*a+[\W_]*p+",
    ]
    .iter()
    .map(|pattern| {
        Regex::new(&format!("(?i){pattern}")).expect("denylist patterns are static and valid")
    })
    .collect()
});

/// Validate submission notes. Empty or whitespace-only notes are fine.
pub fn validate_notes(notes: &str) -> Result<(), NotesRejection> {
    let text = notes.trim();
    if text.is_empty() {
        return Ok(());
    }

    if text.chars().count() > MAX_NOTES_LEN {
        return Err(NotesRejection::TooLong);
    }

    if PROFANITY_PATTERNS.iter().any(|p| p.is_match(text)) {
        return Err(NotesRejection::Inappropriate);
    }

    let letters = text.chars().filter(|c| c.is_ascii_alphabetic()).count();
    let upper = text.chars().filter(|c| c.is_ascii_uppercase()).count();
    if letters > SHOUTING_MIN_LETTERS && upper as f64 / letters as f64 > SHOUTING_RATIO {
        return Err(NotesRejection::Shouting);
    }

    Ok(())
}
