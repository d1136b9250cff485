//! Keyword fallback for replies without usable JSON
//!
//! Scans the raw reply for fixed vocabularies of country names,
//! denominations and metals. This favours recall over precision: a stray
//! match is preferred to another `unknown`.

use std::collections::HashMap;

use regex::Regex;

use crate::schemas::coin::{CoinField, CoinRecord};

/// Fields recovered by the fallback
pub type FallbackFields = HashMap<CoinField, String>;

/// One canonical value and the phrases that select it
#[derive(Debug, Clone)]
pub struct VocabularyEntry {
    pub canonical: String,
    pub phrases: Vec<String>,
}

impl VocabularyEntry {
    pub fn new(canonical: &str, phrases: &[&str]) -> Self {
        Self {
            canonical: canonical.to_string(),
            phrases: phrases.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Word lists used by the text fallback
///
/// Entry order matters: the first country and the first denomination with a
/// hit win, so more specific phrases are listed first.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    pub countries: Vec<VocabularyEntry>,
    pub denominations: Vec<VocabularyEntry>,
    pub compositions: Vec<VocabularyEntry>,
    /// Currency units accepted after a number, e.g. `5 francs`
    pub denomination_units: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        let countries = vec![
            VocabularyEntry::new(
                "France",
                &["france", "french", "republique francaise", "république française"],
            ),
            VocabularyEntry::new(
                "United States",
                &[
                    "united states",
                    "united states of america",
                    "usa",
                    "u.s.a.",
                    "u.s.",
                    "american",
                    "e pluribus unum",
                    "in god we trust",
                    "kennedy",
                    "lincoln",
                    "half dollar",
                ],
            ),
            VocabularyEntry::new(
                "United Kingdom",
                &["united kingdom", "uk", "u.k.", "great britain", "britain", "british", "england"],
            ),
            VocabularyEntry::new("Germany", &["germany", "german", "deutschland"]),
            VocabularyEntry::new("Italy", &["italy", "italian", "italia"]),
            VocabularyEntry::new("Spain", &["spain", "spanish", "españa", "espana"]),
            VocabularyEntry::new("Canada", &["canada", "canadian"]),
            VocabularyEntry::new("Australia", &["australia", "australian"]),
            VocabularyEntry::new("Japan", &["japan", "japanese", "nihon"]),
            VocabularyEntry::new("China", &["china", "chinese", "zhongguo"]),
        ];

        let denominations = vec![
            VocabularyEntry::new("50 cents", &["50 cents", "50 cent", "fifty cents", "half dollar"]),
            VocabularyEntry::new(
                "25 cents",
                &["25 cents", "25 cent", "twenty-five cents", "twenty five cents", "quarter"],
            ),
            VocabularyEntry::new("10 cents", &["10 cents", "10 cent", "ten cents", "dime"]),
            VocabularyEntry::new("5 cents", &["5 cents", "5 cent", "five cents", "nickel"]),
            VocabularyEntry::new("1 cent", &["1 cent", "one cent", "penny"]),
            VocabularyEntry::new("1 dollar", &["1 dollar", "one dollar", "dollar coin", "silver dollar"]),
            VocabularyEntry::new("50 euro cents", &["50 euro cents", "50 euro cent"]),
            VocabularyEntry::new("20 euro cents", &["20 euro cents", "20 euro cent"]),
            VocabularyEntry::new("10 euro cents", &["10 euro cents", "10 euro cent"]),
            VocabularyEntry::new("5 euro cents", &["5 euro cents", "5 euro cent"]),
            VocabularyEntry::new("2 euros", &["2 euros", "2 euro", "two euros"]),
            VocabularyEntry::new("1 euro", &["1 euro", "one euro"]),
            VocabularyEntry::new("2 pounds", &["2 pounds", "two pounds"]),
            VocabularyEntry::new("1 pound", &["1 pound", "one pound", "pound sterling"]),
            VocabularyEntry::new("50 pence", &["50 pence", "50p", "fifty pence"]),
            VocabularyEntry::new("100 yen", &["100 yen", "hundred yen"]),
            VocabularyEntry::new("50 yen", &["50 yen", "fifty yen"]),
            VocabularyEntry::new("10 yen", &["10 yen", "ten yen"]),
            VocabularyEntry::new("5 yen", &["5 yen", "five yen"]),
            VocabularyEntry::new("1 yen", &["1 yen", "one yen"]),
        ];

        let compositions = vec![
            VocabularyEntry::new("Copper", &["copper"]),
            VocabularyEntry::new("Bronze", &["bronze"]),
            VocabularyEntry::new("Brass", &["brass"]),
            VocabularyEntry::new("Silver", &["silver"]),
            VocabularyEntry::new("Gold", &["gold"]),
            VocabularyEntry::new("Nickel", &["nickel", "cupronickel"]),
            VocabularyEntry::new("Zinc", &["zinc"]),
            VocabularyEntry::new("Aluminum", &["aluminum", "aluminium"]),
            VocabularyEntry::new("Steel", &["steel", "iron"]),
        ];

        let denomination_units = [
            "cents", "cent", "centimes", "centime", "euros", "euro", "pence", "pounds", "pound",
            "yen", "francs", "franc", "marks", "mark", "pesos", "peso", "rupees", "rupee",
            "dollars", "dollar", "kopeks", "kopek", "lire", "lira", "yuan",
        ]
        .iter()
        .map(|u| u.to_string())
        .collect();

        Self {
            countries,
            denominations,
            compositions,
            denomination_units,
        }
    }
}

/// Compiled form of a [`Vocabulary`]
#[derive(Debug, Clone)]
pub struct TextMatcher {
    countries: Vec<(String, Regex)>,
    denominations: Vec<(String, Regex)>,
    compositions: Vec<(String, Regex)>,
    numeric_denomination: Option<Regex>,
}

/// Build a case-insensitive matcher for whole phrases
///
/// A phrase only matches when it is not glued to a neighbouring letter or
/// digit. Runs of whitespace inside a phrase match any whitespace.
fn phrase_pattern(phrases: &[String]) -> Result<Regex, regex::Error> {
    let alternatives: Vec<String> = phrases
        .iter()
        .map(|phrase| {
            phrase
                .split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"[\s-]+")
        })
        .filter(|alternative| !alternative.is_empty())
        .collect();

    Regex::new(&format!(
        r"(?i)(?:^|[^\p{{L}}\p{{N}}])(?:{})(?:[^\p{{L}}\p{{N}}]|$)",
        alternatives.join("|")
    ))
}

fn compile_entries(entries: &[VocabularyEntry]) -> Result<Vec<(String, Regex)>, regex::Error> {
    entries
        .iter()
        .filter(|entry| !entry.phrases.is_empty())
        .map(|entry| Ok((entry.canonical.clone(), phrase_pattern(&entry.phrases)?)))
        .collect()
}

impl TextMatcher {
    pub fn new(vocabulary: &Vocabulary) -> Result<Self, regex::Error> {
        let numeric_denomination = if vocabulary.denomination_units.is_empty() {
            None
        } else {
            let units: Vec<String> = vocabulary
                .denomination_units
                .iter()
                .map(|unit| regex::escape(unit))
                .collect();
            Some(Regex::new(&format!(
                r"(?i)(?:^|[^\p{{L}}\p{{N}}.,])(\d{{1,4}})\s*({})(?:[^\p{{L}}\p{{N}}]|$)",
                units.join("|")
            ))?)
        };

        Ok(Self {
            countries: compile_entries(&vocabulary.countries)?,
            denominations: compile_entries(&vocabulary.denominations)?,
            compositions: compile_entries(&vocabulary.compositions)?,
            numeric_denomination,
        })
    }

    /// Recover what the vocabularies can find in a raw reply
    ///
    /// Only fields with a hit are present in the result.
    pub fn text_fallback(&self, raw_text: &str) -> FallbackFields {
        let mut fields = FallbackFields::new();

        if let Some(country) = first_hit(&self.countries, raw_text) {
            fields.insert(CoinField::Country, country);
        }

        if let Some(denomination) = first_hit(&self.denominations, raw_text)
            .or_else(|| self.numeric_denomination(raw_text))
        {
            fields.insert(CoinField::Denomination, denomination);
        }

        let metals: Vec<&str> = self
            .compositions
            .iter()
            .filter(|(_, pattern)| pattern.is_match(raw_text))
            .map(|(canonical, _)| canonical.as_str())
            .collect();
        if !metals.is_empty() {
            fields.insert(CoinField::Composition, metals.join(", "));
        }

        fields
    }

    fn numeric_denomination(&self, raw_text: &str) -> Option<String> {
        let captures = self.numeric_denomination.as_ref()?.captures(raw_text)?;
        let amount = captures.get(1)?.as_str();
        let unit = captures.get(2)?.as_str().to_lowercase();
        Some(format!("{} {}", amount, unit))
    }
}

fn first_hit(entries: &[(String, Regex)], text: &str) -> Option<String> {
    entries
        .iter()
        .find(|(_, pattern)| pattern.is_match(text))
        .map(|(canonical, _)| canonical.clone())
}

/// Merge fallback fields into a record
///
/// Values already resolved in the record are kept. Returns the number of
/// fields filled.
pub fn merge_fallback(record: &mut CoinRecord, fields: &FallbackFields) -> usize {
    CoinField::ALL
        .into_iter()
        .filter(|field| {
            fields
                .get(field)
                .map(|value| record.fill_if_unknown(*field, value))
                .unwrap_or(false)
        })
        .count()
}
