//! Phrase normalization, structural signatures, and similarity scoring
//! for medication phrases.
//!
//! The signature abstracts a phrase to its token classes, so
//! "ibuprofeno x 6 dias cada 8 horas" and "paracetamol x 3 dias cada 12
//! horas" collapse to the same `MED_CONN_NUM_TIME_FREQ_NUM_TIME` shape
//! and match structurally even though the literal values differ.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::{LearnedMedicationPattern, PatternMatch};

/// Tuning constants for the adaptive matching model.
pub mod tuning {
    /// Confidence assigned before any validation exists.
    pub const NEUTRAL_CONFIDENCE: f64 = 0.5;
    /// Validation-volume bonus cap (reached at 20 validations).
    pub const VOLUME_BONUS_CAP: f64 = 0.2;
    /// Validations per unit of volume bonus.
    pub const VOLUME_BONUS_SCALE: f64 = 100.0;
    /// Threshold at zero confidence: accepts loose variations.
    pub const THRESHOLD_BASE: f64 = 0.70;
    /// Threshold growth over the confidence range: caps at 0.90.
    pub const THRESHOLD_RANGE: f64 = 0.20;
    /// Threshold for a freshly created pattern, pending recomputation.
    pub const INITIAL_THRESHOLD: f64 = 0.75;
    /// Similarity multiplier when the structural signatures match.
    pub const SIGNATURE_BONUS: f64 = 1.10;
    /// Patterns above this confidence count as reliable in analytics.
    pub const RELIABLE_CONFIDENCE: f64 = 0.70;
}

static NUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());
static TIME_UNIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(hora|horas|dia|dias|semana|semanas|mes|meses)$").unwrap());
static FREQUENCY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(cada|por|durante|vez|veces|al)$").unwrap());
static CONNECTOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(x|de|en|con|sin|y|o)$").unwrap());
static DOSE_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(mg|ml|g|gramo|tableta|capsula|comprimido|gota)$").unwrap()
});

/// Lowercase, strip diacritics (NFD decomposition, combining marks
/// dropped), collapse runs of whitespace, trim.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split on whitespace, dropping empties.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

fn token_class(token: &str) -> &'static str {
    if NUM.is_match(token) {
        "NUM"
    } else if TIME_UNIT.is_match(token) {
        "TIME"
    } else if FREQUENCY.is_match(token) {
        "FREQ"
    } else if CONNECTOR.is_match(token) {
        "CONN"
    } else if DOSE_UNIT.is_match(token) {
        "DOSE"
    } else if token.chars().count() > 4 {
        // Long unclassified word: probably the medication name.
        "MED"
    } else {
        "WORD"
    }
}

/// Structural signature of a token list, e.g.
/// `["ibuprofeno","x","6","dias"]` → `"MED_CONN_NUM_TIME"`.
pub fn signature(tokens: &[String]) -> String {
    tokens
        .iter()
        .map(|t| token_class(t))
        .collect::<Vec<_>>()
        .join("_")
}

/// Edit distance over characters, unit cost for insert/delete/substitute.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Similarity of two phrases after normalization: 1.0 when identical,
/// 0.0 when either is empty, otherwise `1 − distance / max_len`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);

    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let distance = levenshtein(&a, &b);
    let max_len = a.chars().count().max(b.chars().count());
    1.0 - distance as f64 / max_len as f64
}

/// Confidence from validation history: neutral 0.5 with no data, else the
/// confirmation ratio plus a volume bonus of up to +0.2, capped at 1.0.
pub fn confidence(confirmations: u32, corrections: u32) -> f64 {
    let total = confirmations + corrections;
    if total == 0 {
        return tuning::NEUTRAL_CONFIDENCE;
    }

    let ratio = f64::from(confirmations) / f64::from(total);
    let volume_bonus = (f64::from(total) / tuning::VOLUME_BONUS_SCALE).min(tuning::VOLUME_BONUS_CAP);
    (ratio + volume_bonus).min(1.0)
}

/// Adaptive similarity threshold: higher trust demands stricter matches.
/// Bounded to [0.70, 0.90] over the confidence range.
pub fn threshold(confidence: f64) -> f64 {
    tuning::THRESHOLD_BASE + confidence * tuning::THRESHOLD_RANGE
}

/// Find the learned pattern that best matches a phrase, if any clears its
/// own threshold. A signature match multiplies similarity by 1.10 before
/// the threshold check; ties keep the first candidate in iteration order.
pub fn find_best_match(
    phrase: &str,
    patterns: &[LearnedMedicationPattern],
) -> Option<PatternMatch> {
    if phrase.is_empty() || patterns.is_empty() {
        return None;
    }

    let normalized = normalize(phrase);
    let tokens = tokenize(&normalized);
    let query_signature = signature(&tokens);

    let mut best: Option<PatternMatch> = None;
    let mut best_similarity = 0.0;

    for pattern in patterns {
        let base = similarity(&normalized, &pattern.normalized_phrase);
        let boosted = if pattern.pattern_signature == query_signature {
            base * tuning::SIGNATURE_BONUS
        } else {
            base
        };

        if boosted >= pattern.similarity_threshold && boosted > best_similarity {
            best = Some(PatternMatch {
                pattern: pattern.clone(),
                similarity: boosted.min(1.0),
                is_reliable: true,
            });
            best_similarity = boosted;
        }
    }

    best
}
