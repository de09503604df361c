//! Learned pattern store: applies user validations, answers match
//! queries, and round-trips losslessly through JSON.
//!
//! Single-writer by design. The store is a plain value owned by the
//! caller; a concurrent host must wrap `save_validation` in one critical
//! section per store since it is a find-or-create-then-update sequence.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LearningError;
use crate::learning::matcher;
use crate::models::{
    ExtractedMedicationValues, LearnedMedicationPattern, LearningMetadata, LearningStats,
    PatternMatch,
};

/// Format tag written into exports.
const EXPORT_VERSION: &str = "1.0.0";
/// Window for the "recent validations" statistic.
const RECENT_DAYS: i64 = 7;
/// How many patterns `stats` reports as most reliable.
const STATS_TOP_PATTERNS: usize = 5;

/// Counters persisted alongside the pattern array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StoreMetadata {
    pub total_validations: u64,
}

/// Serialized form of the whole store, for backup and sync.
#[derive(Debug, Clone, Serialize)]
pub struct PatternExport {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub patterns: Vec<LearnedMedicationPattern>,
    pub metadata: StoreMetadata,
}

/// Import accepts any payload carrying a pattern array; counters and the
/// envelope fields are optional.
#[derive(Debug, Deserialize)]
struct ImportPayload {
    patterns: Vec<LearnedMedicationPattern>,
    #[serde(default)]
    metadata: StoreMetadata,
}

/// In-memory set of learned medication patterns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LearningStore {
    patterns: Vec<LearnedMedicationPattern>,
    metadata: StoreMetadata,
}

impl LearningStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from previously persisted parts.
    pub fn from_parts(patterns: Vec<LearnedMedicationPattern>, total_validations: u64) -> Self {
        Self {
            patterns,
            metadata: StoreMetadata { total_validations },
        }
    }

    pub fn patterns(&self) -> &[LearnedMedicationPattern] {
        &self.patterns
    }

    pub fn total_validations(&self) -> u64 {
        self.metadata.total_validations
    }

    /// Record a user validation of `phrase`, stamped with the current
    /// wall clock.
    pub fn save_validation(
        &mut self,
        phrase: &str,
        extracted: ExtractedMedicationValues,
        was_confirmed: bool,
    ) {
        self.save_validation_at(phrase, extracted, was_confirmed, Utc::now());
    }

    /// Record a user validation at an explicit instant.
    ///
    /// An existing pattern with the identical normalized phrase is
    /// updated in place: counters bump, confidence and threshold are
    /// recomputed, and `extracted` is overwritten — the user's latest
    /// input is ground truth. A novel phrase creates a fresh pattern.
    pub fn save_validation_at(
        &mut self,
        phrase: &str,
        extracted: ExtractedMedicationValues,
        was_confirmed: bool,
        now: DateTime<Utc>,
    ) {
        let normalized = matcher::normalize(phrase);

        if let Some(existing) = self
            .patterns
            .iter_mut()
            .find(|p| p.normalized_phrase == normalized)
        {
            if was_confirmed {
                existing.learning.confirmations += 1;
            } else {
                existing.learning.corrections += 1;
            }
            let confidence = matcher::confidence(
                existing.learning.confirmations,
                existing.learning.corrections,
            );
            existing.learning.confidence = confidence;
            existing.learning.last_validated = now;
            existing.similarity_threshold = matcher::threshold(confidence);
            existing.extracted = extracted;

            tracing::info!(
                medication = %existing.extracted.medication_name,
                confidence,
                validations = existing.learning.total_validations(),
                "pattern updated"
            );
        } else {
            let tokens = matcher::tokenize(&normalized);
            let pattern_signature = matcher::signature(&tokens);
            let confirmations = u32::from(was_confirmed);
            let corrections = u32::from(!was_confirmed);

            tracing::info!(
                medication = %extracted.medication_name,
                signature = %pattern_signature,
                "new pattern learned"
            );

            self.patterns.push(LearnedMedicationPattern {
                id: Uuid::new_v4(),
                raw_phrase: phrase.to_string(),
                normalized_phrase: normalized,
                tokens,
                extracted,
                learning: LearningMetadata {
                    confirmations,
                    corrections,
                    confidence: matcher::confidence(confirmations, corrections),
                    first_seen: now,
                    last_validated: now,
                },
                pattern_signature,
                similarity_threshold: matcher::tuning::INITIAL_THRESHOLD,
            });
        }

        self.metadata.total_validations += 1;
    }

    /// Record a review outcome, deriving confirmed/corrected from a
    /// field-wise comparison of the original and validated values.
    /// Returns whether the review counted as a confirmation.
    pub fn record_review_at(
        &mut self,
        phrase: &str,
        original: &ExtractedMedicationValues,
        validated: ExtractedMedicationValues,
        now: DateTime<Utc>,
    ) -> bool {
        let was_confirmed = !original.differs_from(&validated);
        self.save_validation_at(phrase, validated, was_confirmed, now);
        was_confirmed
    }

    /// Best learned pattern matching `phrase`, if any clears its own
    /// similarity threshold.
    pub fn find_match(&self, phrase: &str) -> Option<PatternMatch> {
        matcher::find_best_match(phrase, &self.patterns)
    }

    pub fn pattern_by_id(&self, id: Uuid) -> Option<&LearnedMedicationPattern> {
        self.patterns.iter().find(|p| p.id == id)
    }

    /// Delete one pattern. Returns whether anything was removed.
    pub fn delete_pattern(&mut self, id: Uuid) -> bool {
        let before = self.patterns.len();
        self.patterns.retain(|p| p.id != id);
        self.patterns.len() < before
    }

    /// Drop every pattern and reset the validation counter.
    pub fn clear(&mut self) {
        self.patterns.clear();
        self.metadata = StoreMetadata::default();
    }

    /// Mean confidence across all patterns; 0.0 for an empty store.
    pub fn avg_confidence(&self) -> f64 {
        if self.patterns.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.patterns.iter().map(|p| p.learning.confidence).sum();
        sum / self.patterns.len() as f64
    }

    /// Patterns with confidence above 0.70, most trusted first; equal
    /// confidence ranks by validation volume.
    pub fn most_reliable_patterns(&self, limit: usize) -> Vec<LearnedMedicationPattern> {
        let mut reliable: Vec<&LearnedMedicationPattern> = self
            .patterns
            .iter()
            .filter(|p| p.learning.confidence > matcher::tuning::RELIABLE_CONFIDENCE)
            .collect();
        reliable.sort_by(|a, b| {
            b.learning
                .confidence
                .partial_cmp(&a.learning.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    b.learning
                        .total_validations()
                        .cmp(&a.learning.total_validations())
                })
        });
        reliable.into_iter().take(limit).cloned().collect()
    }

    /// Patterns validated within the last `days`, newest first.
    pub fn recent_validations_at(
        &self,
        days: i64,
        now: DateTime<Utc>,
    ) -> Vec<&LearnedMedicationPattern> {
        let cutoff = now - Duration::days(days);
        let mut recent: Vec<&LearnedMedicationPattern> = self
            .patterns
            .iter()
            .filter(|p| p.learning.last_validated >= cutoff)
            .collect();
        recent.sort_by(|a, b| b.learning.last_validated.cmp(&a.learning.last_validated));
        recent
    }

    /// Aggregate analytics snapshot.
    pub fn stats_at(&self, now: DateTime<Utc>) -> LearningStats {
        LearningStats {
            total_patterns: self.patterns.len(),
            total_validations: self.metadata.total_validations,
            avg_confidence: self.avg_confidence(),
            most_reliable_patterns: self.most_reliable_patterns(STATS_TOP_PATTERNS),
            recent_validations: self.recent_validations_at(RECENT_DAYS, now).len(),
        }
    }

    /// Serialize the full store for backup or sync.
    pub fn export_json(&self, now: DateTime<Utc>) -> Result<String, LearningError> {
        let export = PatternExport {
            version: EXPORT_VERSION.to_string(),
            exported_at: now,
            patterns: self.patterns.clone(),
            metadata: self.metadata.clone(),
        };
        serde_json::to_string_pretty(&export).map_err(LearningError::Export)
    }

    /// Replace the store's contents from an export payload. A payload
    /// that fails to parse is logged and leaves the store untouched.
    pub fn import_json(&mut self, json: &str) -> Result<usize, LearningError> {
        let payload: ImportPayload = match serde_json::from_str(json) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "pattern import failed, keeping existing state");
                return Err(LearningError::Import(e));
            }
        };

        let count = payload.patterns.len();
        self.patterns = payload.patterns;
        self.metadata = payload.metadata;
        tracing::info!(count, "patterns imported");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn values(name: &str) -> ExtractedMedicationValues {
        ExtractedMedicationValues {
            medication_name: name.into(),
            frequency_hours: 8.0,
            duration_days: 6,
            dosage: Some("500 mg".into()),
            administration: None,
        }
    }

    fn now() -> DateTime<Utc> {
        utc("2025-06-01T12:00:00Z")
    }

    #[test]
    fn first_validation_creates_pattern() {
        let mut store = LearningStore::new();
        store.save_validation_at(
            "Ibuprofeno x 6 días cada 8 horas",
            values("Ibuprofeno"),
            true,
            now(),
        );

        assert_eq!(store.patterns().len(), 1);
        assert_eq!(store.total_validations(), 1);
        let pattern = &store.patterns()[0];
        assert_eq!(pattern.normalized_phrase, "ibuprofeno x 6 dias cada 8 horas");
        assert_eq!(pattern.learning.confirmations, 1);
        assert_eq!(pattern.learning.corrections, 0);
        assert_eq!(pattern.similarity_threshold, 0.75);
        assert_eq!(pattern.learning.first_seen, now());
    }

    #[test]
    fn repeat_validation_updates_in_place() {
        let mut store = LearningStore::new();
        let phrase = "ibuprofeno x 6 dias cada 8 horas";
        store.save_validation_at(phrase, values("Ibuprofeno"), true, now());
        // Same phrase, different accents/case: still the same pattern.
        store.save_validation_at(
            "IBUPROFENO x 6 DÍAS cada 8 horas",
            values("Ibuprofeno corregido"),
            false,
            now() + Duration::hours(1),
        );

        assert_eq!(store.patterns().len(), 1);
        assert_eq!(store.total_validations(), 2);
        let pattern = &store.patterns()[0];
        assert_eq!(pattern.learning.confirmations, 1);
        assert_eq!(pattern.learning.corrections, 1);
        // Latest validated values win.
        assert_eq!(pattern.extracted.medication_name, "Ibuprofeno corregido");
        // confidence(1, 1) = 0.5 + 0.02 = 0.52; threshold = 0.70 + 0.104.
        assert!((pattern.learning.confidence - 0.52).abs() < 1e-9);
        assert!((pattern.similarity_threshold - 0.804).abs() < 1e-9);
        assert_eq!(pattern.learning.last_validated, now() + Duration::hours(1));
        assert_eq!(pattern.learning.first_seen, now());
    }

    #[test]
    fn validation_then_match_round_trips() {
        let mut store = LearningStore::new();
        let phrase = "amoxicilina 500mg cada 8 horas por 7 dias";
        let extracted = values("Amoxicilina");
        store.save_validation_at(phrase, extracted.clone(), true, now());

        let found = store.find_match(phrase).expect("exact phrase must match");
        assert_eq!(found.similarity, 1.0);
        assert!(found.is_reliable);
        assert_eq!(found.pattern.extracted, extracted);
    }

    #[test]
    fn record_review_detects_corrections() {
        let mut store = LearningStore::new();
        let original = values("Ibuprofeno");
        let mut corrected = original.clone();
        corrected.frequency_hours = 12.0;

        let confirmed = store.record_review_at("ibuprofeno cada 8 horas", &original, corrected, now());
        assert!(!confirmed);
        assert_eq!(store.patterns()[0].learning.corrections, 1);

        let confirmed =
            store.record_review_at("paracetamol cada 6 horas", &original, original.clone(), now());
        assert!(confirmed);
    }

    #[test]
    fn delete_and_clear() {
        let mut store = LearningStore::new();
        store.save_validation_at("ibuprofeno cada 8 horas", values("Ibuprofeno"), true, now());
        store.save_validation_at("paracetamol cada 6 horas", values("Paracetamol"), true, now());

        let id = store.patterns()[0].id;
        assert!(store.delete_pattern(id));
        assert!(!store.delete_pattern(id), "second delete finds nothing");
        assert_eq!(store.patterns().len(), 1);
        assert!(store.pattern_by_id(id).is_none());

        store.clear();
        assert!(store.patterns().is_empty());
        assert_eq!(store.total_validations(), 0);
    }

    #[test]
    fn stats_reflect_store_contents() {
        let mut store = LearningStore::new();
        assert_eq!(store.stats_at(now()).avg_confidence, 0.0);

        // Reliable pattern: confirmed many times.
        for _ in 0..10 {
            store.save_validation_at("ibuprofeno cada 8 horas", values("Ibuprofeno"), true, now());
        }
        // Unreliable pattern: corrected, validated long ago.
        store.save_validation_at(
            "jarabe raro 3 veces",
            values("Jarabe"),
            false,
            now() - Duration::days(30),
        );

        let stats = store.stats_at(now());
        assert_eq!(stats.total_patterns, 2);
        assert_eq!(stats.total_validations, 11);
        assert_eq!(stats.recent_validations, 1);
        assert_eq!(stats.most_reliable_patterns.len(), 1);
        assert_eq!(
            stats.most_reliable_patterns[0].extracted.medication_name,
            "Ibuprofeno"
        );
        assert!(stats.avg_confidence > 0.0);
    }

    #[test]
    fn most_reliable_sorts_by_confidence_then_volume() {
        let mut store = LearningStore::new();
        // Both end at confidence 1.0; the second has more validations.
        for _ in 0..5 {
            store.save_validation_at("ibuprofeno cada 8 horas", values("Ibuprofeno"), true, now());
        }
        for _ in 0..20 {
            store.save_validation_at("paracetamol cada 6 horas", values("Paracetamol"), true, now());
        }

        let top = store.most_reliable_patterns(10);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].extracted.medication_name, "Paracetamol");
        assert_eq!(top[1].extracted.medication_name, "Ibuprofeno");
    }

    #[test]
    fn export_import_round_trip_is_lossless() {
        let mut store = LearningStore::new();
        store.save_validation_at("ibuprofeno cada 8 horas", values("Ibuprofeno"), true, now());
        store.save_validation_at("paracetamol cada 6 horas", values("Paracetamol"), false, now());

        let json = store.export_json(now()).unwrap();
        let mut restored = LearningStore::new();
        let count = restored.import_json(&json).unwrap();

        assert_eq!(count, 2);
        assert_eq!(restored, store);
    }

    #[test]
    fn import_replaces_wholesale() {
        let mut store = LearningStore::new();
        store.save_validation_at("ibuprofeno cada 8 horas", values("Ibuprofeno"), true, now());
        let exported = store.export_json(now()).unwrap();

        store.clear();
        store.save_validation_at("otra cosa cada 12 horas", values("Otra"), true, now());
        store.import_json(&exported).unwrap();

        assert_eq!(store.patterns().len(), 1);
        assert_eq!(store.patterns()[0].extracted.medication_name, "Ibuprofeno");
        assert_eq!(store.total_validations(), 1);
    }

    #[test]
    fn corrupt_import_is_a_noop() {
        let mut store = LearningStore::new();
        store.save_validation_at("ibuprofeno cada 8 horas", values("Ibuprofeno"), true, now());
        let before = store.clone();

        assert!(store.import_json("{not json").is_err());
        assert!(store.import_json("{\"patterns\": 42}").is_err());
        assert_eq!(store, before);
    }
}
