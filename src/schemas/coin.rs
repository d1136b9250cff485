//! Coin analysis schema definitions
//!
//! This module defines the fixed-shape record returned to the iOS client
//! and the envelope it is wrapped in.

use serde::{Deserialize, Serialize};

use crate::normalizer::NormalizationDiagnostics;

/// Sentinel used for every field the analysis could not resolve
pub const UNKNOWN: &str = "unknown";

/// Check whether a value counts as unresolved
///
/// Empty strings and any casing of `unknown` are treated as unresolved.
pub fn is_unknown(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(UNKNOWN)
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

// ============================================================================
// Field addressing
// ============================================================================

/// Nested group a leaf field belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    BasicInfo,
    ValueAssessment,
    TechnicalDetails,
}

impl Section {
    pub fn key(self) -> &'static str {
        match self {
            Section::BasicInfo => "basic_info",
            Section::ValueAssessment => "value_assessment",
            Section::TechnicalDetails => "technical_details",
        }
    }
}

/// Every leaf of a [`CoinRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinField {
    ReleasedYear,
    Country,
    Denomination,
    Composition,
    CollectorValue,
    Rarity,
    Description,
    HistoricalContext,
    MintMark,
    DiameterMm,
    TechnicalComposition,
}

impl CoinField {
    /// All leaves in record order
    pub const ALL: [CoinField; 11] = [
        CoinField::ReleasedYear,
        CoinField::Country,
        CoinField::Denomination,
        CoinField::Composition,
        CoinField::CollectorValue,
        CoinField::Rarity,
        CoinField::Description,
        CoinField::HistoricalContext,
        CoinField::MintMark,
        CoinField::DiameterMm,
        CoinField::TechnicalComposition,
    ];

    /// Canonical key of the field inside its group
    pub fn key(self) -> &'static str {
        match self {
            CoinField::ReleasedYear => "released_year",
            CoinField::Country => "country",
            CoinField::Denomination => "denomination",
            CoinField::Composition | CoinField::TechnicalComposition => "composition",
            CoinField::CollectorValue => "collector_value",
            CoinField::Rarity => "rarity",
            CoinField::Description => "description",
            CoinField::HistoricalContext => "historical_context",
            CoinField::MintMark => "mint_mark",
            CoinField::DiameterMm => "diameter_mm",
        }
    }

    /// Group the field is nested under, `None` for top-level fields
    pub fn section(self) -> Option<Section> {
        match self {
            CoinField::ReleasedYear
            | CoinField::Country
            | CoinField::Denomination
            | CoinField::Composition => Some(Section::BasicInfo),
            CoinField::CollectorValue | CoinField::Rarity => Some(Section::ValueAssessment),
            CoinField::Description | CoinField::HistoricalContext => None,
            CoinField::MintMark | CoinField::DiameterMm | CoinField::TechnicalComposition => {
                Some(Section::TechnicalDetails)
            }
        }
    }

    /// Dotted path of the field in the serialized record
    pub fn path(self) -> String {
        match self.section() {
            Some(section) => format!("{}.{}", section.key(), self.key()),
            None => self.key().to_string(),
        }
    }
}

// ============================================================================
// Record
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicInfo {
    pub released_year: String,
    pub country: String,
    pub denomination: String,
    pub composition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueAssessment {
    pub collector_value: String,
    pub rarity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicalDetails {
    pub mint_mark: String,
    pub diameter_mm: String,
    pub composition: String,
}

/// Fixed-shape analysis result
///
/// Every leaf is always present; unresolved leaves hold [`UNKNOWN`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinRecord {
    pub basic_info: BasicInfo,
    pub value_assessment: ValueAssessment,
    pub description: String,
    pub historical_context: String,
    pub technical_details: TechnicalDetails,
}

impl Default for CoinRecord {
    fn default() -> Self {
        Self {
            basic_info: BasicInfo {
                released_year: unknown(),
                country: unknown(),
                denomination: unknown(),
                composition: unknown(),
            },
            value_assessment: ValueAssessment {
                collector_value: unknown(),
                rarity: unknown(),
            },
            description: unknown(),
            historical_context: unknown(),
            technical_details: TechnicalDetails {
                mint_mark: unknown(),
                diameter_mm: unknown(),
                composition: unknown(),
            },
        }
    }
}

impl CoinRecord {
    /// Read a leaf
    pub fn get(&self, field: CoinField) -> &str {
        match field {
            CoinField::ReleasedYear => &self.basic_info.released_year,
            CoinField::Country => &self.basic_info.country,
            CoinField::Denomination => &self.basic_info.denomination,
            CoinField::Composition => &self.basic_info.composition,
            CoinField::CollectorValue => &self.value_assessment.collector_value,
            CoinField::Rarity => &self.value_assessment.rarity,
            CoinField::Description => &self.description,
            CoinField::HistoricalContext => &self.historical_context,
            CoinField::MintMark => &self.technical_details.mint_mark,
            CoinField::DiameterMm => &self.technical_details.diameter_mm,
            CoinField::TechnicalComposition => &self.technical_details.composition,
        }
    }

    fn slot(&mut self, field: CoinField) -> &mut String {
        match field {
            CoinField::ReleasedYear => &mut self.basic_info.released_year,
            CoinField::Country => &mut self.basic_info.country,
            CoinField::Denomination => &mut self.basic_info.denomination,
            CoinField::Composition => &mut self.basic_info.composition,
            CoinField::CollectorValue => &mut self.value_assessment.collector_value,
            CoinField::Rarity => &mut self.value_assessment.rarity,
            CoinField::Description => &mut self.description,
            CoinField::HistoricalContext => &mut self.historical_context,
            CoinField::MintMark => &mut self.technical_details.mint_mark,
            CoinField::DiameterMm => &mut self.technical_details.diameter_mm,
            CoinField::TechnicalComposition => &mut self.technical_details.composition,
        }
    }

    /// Overwrite a leaf
    pub fn set(&mut self, field: CoinField, value: impl Into<String>) {
        *self.slot(field) = value.into();
    }

    /// Fill a leaf only if it is still unresolved
    ///
    /// Returns true if the value was written.
    pub fn fill_if_unknown(&mut self, field: CoinField, value: &str) -> bool {
        if is_unknown(value) || !is_unknown(self.get(field)) {
            return false;
        }
        self.set(field, value);
        true
    }

    /// Leaves that are still unresolved
    pub fn unknown_fields(&self) -> Vec<CoinField> {
        CoinField::ALL
            .into_iter()
            .filter(|field| is_unknown(self.get(*field)))
            .collect()
    }

    pub fn unknown_count(&self) -> usize {
        self.unknown_fields().len()
    }
}

// ============================================================================
// Response envelope
// ============================================================================

/// Successful response of `POST /analyze`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub success: bool,
    /// RFC 3339 timestamp of when the response was built
    pub timestamp: String,
    pub coin_analysis: CoinRecord,
    pub metadata: AnalysisMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub model_used: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_filename: Option<String>,
    pub image_size_bytes: usize,
    pub processing_time_ms: u64,
    pub parsing: NormalizationDiagnostics,
}
