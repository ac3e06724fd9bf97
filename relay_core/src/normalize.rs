//! Speech-safe text cleanup.
//!
//! Markdown produced by chat models reads badly when spoken: the provider
//! pronounces asterisks, hashes and link targets. [`normalize`] strips those
//! artifacts and collapses whitespace before the text is segmented.

use std::sync::LazyLock;

use regex::Regex;

static EMPHASIS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*+").expect("static regex"));
static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#+\s*").expect("static regex"));
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`+").expect("static regex"));
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("static regex"));
static UNDERSCORES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_{2,}").expect("static regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));
static SENTENCE_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.!?])\s*([A-Z])").expect("static regex"));

/// Clean `text` for speech synthesis.
///
/// Never fails; text without markup comes back trimmed with its whitespace
/// collapsed. Passes repeat until nothing changes, since removing one piece
/// of markup can expose another (`[[x](y)](z)`).
pub fn normalize(text: &str) -> String {
    let mut current = clean_once(text);
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

// Each pass that changes non-whitespace text removes characters, so the loop
// in `normalize` terminates.
fn clean_once(text: &str) -> String {
    let cleaned = EMPHASIS.replace_all(text, "");
    let cleaned = HEADING.replace_all(&cleaned, "");
    let cleaned = INLINE_CODE.replace_all(&cleaned, "");
    let cleaned = UNDERSCORES.replace_all(&cleaned, "");
    let cleaned = LINK.replace_all(&cleaned, "${1}");

    let cleaned = WHITESPACE.replace_all(&cleaned, " ");
    let cleaned = SENTENCE_GAP.replace_all(&cleaned, "${1} ${2}");

    cleaned.trim().to_string()
}
