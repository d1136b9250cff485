//! Field resolution against extracted JSON
//!
//! Models rarely use the exact key names they were asked for. Each
//! [`CoinField`] therefore has an ordered alias list and a list of sub-maps
//! it may be nested under. Both are plain data held in an [`AliasTable`].

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::schemas::coin::{is_unknown, CoinField, CoinRecord, UNKNOWN};

/// Sub-map name the provider prompt historically used for technical fields
pub const OTHER_DETAILS: &str = "other_details";

/// Alias and nesting rules per field
#[derive(Debug, Clone)]
pub struct AliasTable {
    aliases: HashMap<CoinField, Vec<String>>,
    sections: HashMap<CoinField, Vec<String>>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for AliasTable {
    fn default() -> Self {
        let aliases = HashMap::from([
            (
                CoinField::ReleasedYear,
                strings(&[
                    "year first released",
                    "year_first_released",
                    "year",
                    "release_year",
                    "mint_year",
                    "first_released",
                    "issued_year",
                ]),
            ),
            (
                CoinField::Country,
                strings(&["origin_country", "nation", "origin", "issuing_country"]),
            ),
            (
                CoinField::Denomination,
                strings(&["face_value", "value", "coin_value", "monetary_value"]),
            ),
            (
                CoinField::Composition,
                strings(&["material", "metal", "alloy", "composition_material"]),
            ),
            (
                CoinField::CollectorValue,
                strings(&["market_value", "estimated_value", "worth", "value"]),
            ),
            (
                CoinField::Rarity,
                strings(&["scarcity", "availability", "rarity_level"]),
            ),
            (
                CoinField::Description,
                strings(&["description_text", "coin_description", "details"]),
            ),
            (
                CoinField::HistoricalContext,
                strings(&["history", "historical_background", "context"]),
            ),
            (CoinField::MintMark, strings(&["mintmark", "mint"])),
            (CoinField::DiameterMm, strings(&["diameter", "size_mm"])),
            (
                CoinField::TechnicalComposition,
                strings(&["material", "metal", "alloy"]),
            ),
        ]);

        let mut sections = HashMap::new();
        for field in CoinField::ALL {
            let mut names = Vec::new();
            if let Some(section) = field.section() {
                names.push(section.key().to_string());
            }
            match field {
                CoinField::MintMark | CoinField::DiameterMm | CoinField::TechnicalComposition => {
                    names.push(OTHER_DETAILS.to_string());
                }
                CoinField::Rarity => {
                    names.push(OTHER_DETAILS.to_string());
                    names.push("technical_details".to_string());
                }
                _ => {}
            }
            sections.insert(field, names);
        }

        Self { aliases, sections }
    }
}

impl AliasTable {
    /// Alternative key names for a field, in lookup order
    pub fn aliases(&self, field: CoinField) -> &[String] {
        self.aliases.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sub-maps checked before the top level, in lookup order
    pub fn sections(&self, field: CoinField) -> &[String] {
        self.sections.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replace the alias list of a field
    pub fn with_aliases(mut self, field: CoinField, aliases: Vec<String>) -> Self {
        self.aliases.insert(field, aliases);
        self
    }

    /// Replace the sub-map list of a field
    pub fn with_sections(mut self, field: CoinField, sections: Vec<String>) -> Self {
        self.sections.insert(field, sections);
        self
    }
}

/// Render a JSON value as a field value
///
/// Objects and null never qualify. Arrays qualify when they hold scalars.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter(|item| !item.is_array() && !item.is_object())
                .filter_map(value_text)
                .filter(|s| !is_unknown(s))
                .collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Null | Value::Object(_) => None,
    }
}

/// Look up a field by its canonical name, then by each alias in order
///
/// The first non-empty value that is not `unknown` (any casing) wins.
/// Returns [`UNKNOWN`] if no candidate qualifies.
pub fn resolve_field<S: AsRef<str>>(
    map: &Map<String, Value>,
    canonical_name: &str,
    aliases: &[S],
) -> String {
    std::iter::once(canonical_name)
        .chain(aliases.iter().map(AsRef::as_ref))
        .filter_map(|name| map.get(name))
        .filter_map(value_text)
        .find(|text| !is_unknown(text))
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Resolve one field, checking its sub-maps before the top level
pub fn resolve_coin_field(
    map: &Map<String, Value>,
    field: CoinField,
    table: &AliasTable,
) -> String {
    let aliases = table.aliases(field);

    for section in table.sections(field) {
        if let Some(sub_map) = map.get(section).and_then(Value::as_object) {
            let value = resolve_field(sub_map, field.key(), aliases);
            if !is_unknown(&value) {
                return value;
            }
        }
    }

    resolve_field(map, field.key(), aliases)
}

/// Build a fully populated record from an extracted map
pub fn build_record(map: &Map<String, Value>, table: &AliasTable) -> CoinRecord {
    let mut record = CoinRecord::default();
    for field in CoinField::ALL {
        record.set(field, resolve_coin_field(map, field, table));
    }
    record
}
