//! Degenerate-text heuristics.
//!
//! Five independent checks over a completion; each is a cheap proxy for
//! garbled or unnatural output and none of them looks at token ids.

use crate::models::{Oddity, OddityFlags};
use regex::Regex;
use std::sync::LazyLock;

/// Disfluency markers checked against the lower-cased text.
pub const FILLER_PREFIXES: [&str; 5] = ["uh ", "um ", "er ", "ah ", "like "];

/// Share of all-caps words above which text counts as shouting.
pub const CAPS_RATIO_LIMIT: f64 = 0.4;

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z]+").expect("word pattern is valid"));

static NUMBER_CORRUPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,3}(?:\D\d{1,3}){3,}").expect("number pattern is valid")
});

static REPEATED_PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[!?]{3,}").expect("punctuation pattern is valid"));

fn has_mixed_script(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii()) && text.chars().any(|c| !c.is_ascii())
}

fn caps_weirdness(text: &str) -> bool {
    let (words, upper) = WORD_RE
        .find_iter(text)
        .fold((0usize, 0usize), |(words, upper), m| {
            let is_upper = m.as_str().chars().all(|c| c.is_ascii_uppercase());
            (words + 1, upper + usize::from(is_upper))
        });
    if words == 0 {
        return false;
    }
    upper as f64 / words as f64 > CAPS_RATIO_LIMIT
}

fn filler_prefix(text: &str) -> bool {
    let lowered = text.to_lowercase();
    FILLER_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
}

/// Compute all oddity flags for `text`.
pub fn detect_oddities(text: &str) -> OddityFlags {
    OddityFlags {
        caps_weirdness: caps_weirdness(text),
        filler_prefix: filler_prefix(text),
        mixed_script: has_mixed_script(text),
        number_corruption: NUMBER_CORRUPTION_RE.is_match(text),
        repeated_punct: REPEATED_PUNCT_RE.is_match(text),
    }
}

/// Number of flags set, as a penalty (0.0 - 5.0).
pub fn oddity_score(flags: &OddityFlags) -> f64 {
    flags.iter().filter(|(_, set)| *set).count() as f64
}

/// True if any flag outside `allowed` is set.
pub fn any_oddities(flags: &OddityFlags, allowed: &[Oddity]) -> bool {
    flags
        .iter()
        .any(|(oddity, set)| set && !allowed.contains(&oddity))
}
