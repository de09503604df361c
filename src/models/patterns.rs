//! Learned medication pattern model.
//!
//! Patterns are created the first time a user validates a novel phrase and
//! mutated in place on repeat validations. They are never deleted
//! automatically — only by explicit delete/clear.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Values extracted from a medication phrase and validated by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedMedicationValues {
    /// "Ibuprofeno"
    pub medication_name: String,
    /// 8 for "cada 8 horas".
    pub frequency_hours: f64,
    /// 6 for "por 6 dias".
    pub duration_days: u32,
    /// "500 mg"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    /// "oral"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub administration: Option<String>,
}

impl ExtractedMedicationValues {
    /// Field-wise change detection: did the user correct anything?
    pub fn differs_from(&self, other: &ExtractedMedicationValues) -> bool {
        self.medication_name != other.medication_name
            || self.frequency_hours != other.frequency_hours
            || self.duration_days != other.duration_days
            || self.dosage != other.dosage
            || self.administration != other.administration
    }
}

/// Validation history of one pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningMetadata {
    /// Times the user confirmed the extraction unchanged.
    pub confirmations: u32,
    /// Times the user corrected at least one value.
    pub corrections: u32,
    /// 0–1, recomputed on every validation.
    pub confidence: f64,
    pub first_seen: DateTime<Utc>,
    pub last_validated: DateTime<Utc>,
}

impl LearningMetadata {
    pub fn total_validations(&self) -> u32 {
        self.confirmations + self.corrections
    }
}

/// A medication phrase the system has learned to recognize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedMedicationPattern {
    pub id: Uuid,

    /// Phrase exactly as captured: "Ibuprofeno x 6 días cada 8 horas".
    pub raw_phrase: String,
    /// Lowercased, diacritics stripped, whitespace collapsed.
    pub normalized_phrase: String,
    pub tokens: Vec<String>,

    /// Latest user-validated values for this phrase.
    pub extracted: ExtractedMedicationValues,
    pub learning: LearningMetadata,

    /// Structural abstraction of the token classes, e.g.
    /// `MED_CONN_NUM_TIME_FREQ_NUM_TIME`.
    pub pattern_signature: String,
    /// Adaptive match strictness, 0.70–0.90.
    pub similarity_threshold: f64,
}

/// Result of matching a phrase against the learned patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub pattern: LearnedMedicationPattern,
    /// 0–1, including any structural-match bonus, capped at 1.0.
    pub similarity: f64,
    /// Always true for returned matches: the similarity cleared the
    /// pattern's own threshold.
    pub is_reliable: bool,
}

/// Aggregate view of the learning system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningStats {
    pub total_patterns: usize,
    pub total_validations: u64,
    pub avg_confidence: f64,
    pub most_reliable_patterns: Vec<LearnedMedicationPattern>,
    /// Patterns validated in the last 7 days.
    pub recent_validations: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values() -> ExtractedMedicationValues {
        ExtractedMedicationValues {
            medication_name: "Ibuprofeno".into(),
            frequency_hours: 8.0,
            duration_days: 6,
            dosage: Some("500 mg".into()),
            administration: None,
        }
    }

    #[test]
    fn identical_values_do_not_differ() {
        assert!(!values().differs_from(&values()));
    }

    #[test]
    fn changed_frequency_detected() {
        let mut corrected = values();
        corrected.frequency_hours = 12.0;
        assert!(values().differs_from(&corrected));
    }

    #[test]
    fn changed_dosage_detected() {
        let mut corrected = values();
        corrected.dosage = None;
        assert!(values().differs_from(&corrected));
    }
}
