//! Response normalizer
//!
//! Turns the free-form reply of the vision model into a fully populated
//! [`CoinRecord`]. Structured extraction is attempted first; a keyword scan of
//! the raw text fills whatever is still unknown. The normalizer is pure: it
//! holds only immutable configuration and can be shared across requests.

pub mod extract;
pub mod fallback;
pub mod fields;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schemas::coin::{CoinField, CoinRecord};
use crate::utils::preview;

pub use extract::{first_brace_span, parse_object, Extraction, ExtractionStrategy, Extractor, StructuredMap};
pub use fallback::{merge_fallback, FallbackFields, TextMatcher, Vocabulary, VocabularyEntry};
pub use fields::{build_record, resolve_coin_field, resolve_field, AliasTable};

/// Default fraction of unknown fields above which the text fallback runs
pub const DEFAULT_UNKNOWN_THRESHOLD: f64 = 0.5;

/// Default number of characters of a reply included in log events
pub const DEFAULT_LOG_PREVIEW_CHARS: usize = 1000;

/// Errors surfaced by [`Normalizer::normalize`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("Model returned an empty reply")]
    EmptyReply,
}

/// Normalizer configuration, built once at startup
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    pub aliases: AliasTable,
    pub vocabulary: Vocabulary,
    /// Fraction of unknown fields (0.0 to 1.0) above which the text fallback
    /// runs and the result is flagged as low confidence
    pub unknown_threshold: f64,
    pub log_preview_chars: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            aliases: AliasTable::default(),
            vocabulary: Vocabulary::default(),
            unknown_threshold: DEFAULT_UNKNOWN_THRESHOLD,
            log_preview_chars: DEFAULT_LOG_PREVIEW_CHARS,
        }
    }
}

impl NormalizerConfig {
    pub fn with_unknown_threshold(mut self, threshold: f64) -> Self {
        self.unknown_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_log_preview_chars(mut self, chars: usize) -> Self {
        self.log_preview_chars = chars;
        self
    }

    pub fn with_aliases(mut self, aliases: AliasTable) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn with_vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }
}

/// How a record was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationDiagnostics {
    /// Whether any structured extraction strategy succeeded
    pub structured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<ExtractionStrategy>,
    pub fallback_applied: bool,
    /// Fields the text fallback filled
    pub fallback_fields: usize,
    pub unknown_fields: usize,
    pub total_fields: usize,
    /// Unknown fraction still above the threshold after the fallback
    pub low_confidence: bool,
}

/// A normalized record with its diagnostics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Normalized {
    pub record: CoinRecord,
    pub diagnostics: NormalizationDiagnostics,
}

/// Converts raw model replies into [`CoinRecord`]s
#[derive(Debug, Clone)]
pub struct Normalizer {
    config: NormalizerConfig,
    extractor: Extractor,
    matcher: TextMatcher,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Result<Self, regex::Error> {
        let extractor = Extractor::new(config.log_preview_chars)?;
        let matcher = TextMatcher::new(&config.vocabulary)?;

        Ok(Self {
            config,
            extractor,
            matcher,
        })
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    pub fn extract_structured(&self, text: &str) -> Option<Extraction> {
        self.extractor.extract_structured(text)
    }

    pub fn build_record(&self, map: &StructuredMap) -> CoinRecord {
        build_record(map, &self.config.aliases)
    }

    pub fn text_fallback(&self, raw_text: &str) -> FallbackFields {
        self.matcher.text_fallback(raw_text)
    }

    fn exceeds_threshold(&self, unknown: usize) -> bool {
        let total = CoinField::ALL.len();
        (unknown as f64 / total as f64) > self.config.unknown_threshold
    }

    /// Normalize one raw reply
    ///
    /// Only an empty reply is an error. Every other input, however malformed,
    /// yields a fully populated record.
    pub fn normalize(&self, raw_text: &str) -> Result<Normalized, NormalizeError> {
        if raw_text.trim().is_empty() {
            return Err(NormalizeError::EmptyReply);
        }

        let extraction = self.extract_structured(raw_text);
        let strategy = extraction.as_ref().map(|e| e.strategy);
        let mut record = match &extraction {
            Some(extraction) => self.build_record(&extraction.map),
            None => {
                tracing::warn!(
                    raw_text = %preview(raw_text, self.config.log_preview_chars),
                    "No structured data found in model reply, using text fallback"
                );
                CoinRecord::default()
            }
        };

        let mut fallback_applied = false;
        let mut fallback_fields = 0;
        if extraction.is_none() || self.exceeds_threshold(record.unknown_count()) {
            if extraction.is_some() {
                tracing::warn!(
                    unknown_fields = record.unknown_count(),
                    "Most fields are unknown, attempting to extract info from raw text"
                );
            }
            let fields = self.text_fallback(raw_text);
            fallback_fields = merge_fallback(&mut record, &fields);
            fallback_applied = true;
        }

        let unknown_fields = record.unknown_count();
        let low_confidence = self.exceeds_threshold(unknown_fields);
        if low_confidence {
            tracing::warn!(
                unknown_fields,
                total_fields = CoinField::ALL.len(),
                structured = strategy.is_some(),
                "Low confidence coin analysis"
            );
        }

        Ok(Normalized {
            record,
            diagnostics: NormalizationDiagnostics {
                structured: strategy.is_some(),
                strategy,
                fallback_applied,
                fallback_fields,
                unknown_fields,
                total_fields: CoinField::ALL.len(),
                low_confidence,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::coin::UNKNOWN;

    fn normalizer() -> Normalizer {
        Normalizer::new(NormalizerConfig::default()).unwrap()
    }

    #[test]
    fn test_fenced_nested_country() {
        let text = "```json\n{\"basic_info\": {\"country\": \"France\"}}\n```";
        let normalizer = normalizer();

        let extraction = normalizer.extract_structured(text).unwrap();
        assert_eq!(extraction.strategy, ExtractionStrategy::JsonFence);
        let record = normalizer.build_record(&extraction.map);
        assert_eq!(record.basic_info.country, "France");

        let normalized = normalizer.normalize(text).unwrap();
        assert_eq!(normalized.record.basic_info.country, "France");
        assert!(normalized.diagnostics.structured);
    }

    #[test]
    fn test_complete_reply_skips_fallback() {
        let text = r#"{
            "basic_info": {"released_year": "1964", "country": "United States", "denomination": "50 cents", "composition": "90% silver"},
            "value_assessment": {"collector_value": "$12", "rarity": "common"},
            "description": "Kennedy half dollar",
            "historical_context": "First struck in 1964",
            "technical_details": {"mint_mark": "D", "diameter_mm": "30.6", "composition": "silver"}
        }"#;

        let normalized = normalizer().normalize(text).unwrap();
        assert!(!normalized.diagnostics.fallback_applied);
        assert_eq!(normalized.diagnostics.unknown_fields, 0);
        assert!(!normalized.diagnostics.low_confidence);
    }

    #[test]
    fn test_plain_prose_uses_fallback() {
        let normalized = normalizer()
            .normalize("This is a 1964 Kennedy Half Dollar made of silver")
            .unwrap();

        let record = &normalized.record;
        assert_eq!(record.basic_info.composition, "Silver");
        assert_eq!(record.basic_info.country, "United States");
        assert_eq!(record.basic_info.released_year, UNKNOWN);
        assert_eq!(record.value_assessment.rarity, UNKNOWN);
        assert_eq!(record.technical_details.mint_mark, UNKNOWN);
        assert!(!normalized.diagnostics.structured);
        assert!(normalized.diagnostics.fallback_applied);
        assert!(normalized.diagnostics.low_confidence);
    }

    #[test]
    fn test_malformed_fenced_json_falls_through() {
        let normalized = normalizer()
            .normalize("```json\n{\"country\": \"France\", }\n```")
            .unwrap();
        assert!(!normalized.diagnostics.structured);
        assert!(normalized.diagnostics.fallback_applied);
        assert_eq!(normalized.record.basic_info.country, "France");
    }

    #[test]
    fn test_sparse_structured_reply_is_enriched_without_overwriting() {
        let text = "The coin looks British but I'm not sure. ```json\n{\"country\": \"Ireland\", \"composition\": \"unknown\"}\n``` It is bronze.";
        let normalized = normalizer().normalize(text).unwrap();

        assert!(normalized.diagnostics.structured);
        assert!(normalized.diagnostics.fallback_applied);
        assert_eq!(normalized.record.basic_info.country, "Ireland");
        assert_eq!(normalized.record.basic_info.composition, "Bronze");
    }

    #[test]
    fn test_threshold_one_disables_fallback_for_structured_replies() {
        let normalizer =
            Normalizer::new(NormalizerConfig::default().with_unknown_threshold(1.0)).unwrap();
        let normalized = normalizer
            .normalize("{\"country\": \"Ireland\"} made of silver")
            .unwrap();
        assert!(!normalized.diagnostics.fallback_applied);
        assert_eq!(normalized.record.basic_info.composition, UNKNOWN);
    }

    #[test]
    fn test_empty_reply() {
        assert_eq!(normalizer().normalize("").unwrap_err(), NormalizeError::EmptyReply);
        assert_eq!(
            normalizer().normalize("  \n\t ").unwrap_err(),
            NormalizeError::EmptyReply
        );
    }

    #[test]
    fn test_every_leaf_is_populated() {
        let inputs = [
            "garbage",
            "{",
            "}{",
            "```",
            "[\"a\"]",
            "{\"basic_info\": 5}",
            "{\"technical_details\": [1, 2]}",
        ];
        for input in inputs {
            let normalized = normalizer().normalize(input).unwrap();
            for field in CoinField::ALL {
                assert!(!normalized.record.get(field).is_empty(), "{} empty for {:?}", field.path(), input);
            }
        }
    }

    #[test]
    fn test_idempotent() {
        let normalizer = normalizer();
        let text = "Probably a French 1 euro coin, bimetallic nickel and brass.";
        let first = normalizer.normalize(text).unwrap();
        let second = normalizer.normalize(text).unwrap();
        assert_eq!(first.record, second.record);
        assert_eq!(first.diagnostics, second.diagnostics);
    }
}
