//! Brand recognition from free-text camera model names
//!
//! A single keyword table backs both the serving-time classifier and the
//! training-time brand extraction, so the two can never drift apart.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label used when no brand can be recognized
pub const UNKNOWN_BRAND: &str = "Unknown";

/// Canonical camera manufacturers recognized by the keyword table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BrandCategory {
    Canon,
    Sony,
    Nikon,
    Fujifilm,
    Olympus,
    Casio,
    Pentax,
    Panasonic,
    Samsung,
    Kodak,
    Agfa,
    Toshiba,
    Ricoh,
    Konica,
    Minolta,
    Sanyo,
    Epson,
    #[serde(rename = "HP")]
    Hp,
    Leica,
    #[serde(rename = "JVC")]
    Jvc,
    Contax,
    Sigma,
    Kyocera,
    Unknown,
}

/// Keyword table in priority order. The first category with a matching
/// keyword wins.
pub const KEYWORD_TABLE: &[(BrandCategory, &[&str])] = &[
    (BrandCategory::Canon, &["canon", "powershot", "eos", "ixus"]),
    (BrandCategory::Sony, &["sony", "cyber-shot", "dsc"]),
    (BrandCategory::Nikon, &["nikon", "coolpix"]),
    (BrandCategory::Fujifilm, &["fuji", "finepix", "fujifilm"]),
    (BrandCategory::Olympus, &["olympus"]),
    (BrandCategory::Casio, &["casio"]),
    (BrandCategory::Pentax, &["pentax"]),
    (BrandCategory::Panasonic, &["panasonic", "lumix"]),
    (BrandCategory::Samsung, &["samsung"]),
    (BrandCategory::Kodak, &["kodak"]),
    (BrandCategory::Agfa, &["agfa"]),
    (BrandCategory::Toshiba, &["toshiba"]),
    (BrandCategory::Ricoh, &["ricoh"]),
    (BrandCategory::Konica, &["konica"]),
    (BrandCategory::Minolta, &["minolta"]),
    (BrandCategory::Sanyo, &["sanyo"]),
    (BrandCategory::Epson, &["epson"]),
    (BrandCategory::Hp, &["hp"]),
    (BrandCategory::Leica, &["leica"]),
    (BrandCategory::Jvc, &["jvc"]),
    (BrandCategory::Contax, &["contax"]),
    (BrandCategory::Sigma, &["sigma"]),
    (BrandCategory::Kyocera, &["kyocera"]),
];

impl BrandCategory {
    /// Canonical label, as stored in the category encoder
    pub fn as_str(&self) -> &'static str {
        match self {
            BrandCategory::Canon => "Canon",
            BrandCategory::Sony => "Sony",
            BrandCategory::Nikon => "Nikon",
            BrandCategory::Fujifilm => "Fujifilm",
            BrandCategory::Olympus => "Olympus",
            BrandCategory::Casio => "Casio",
            BrandCategory::Pentax => "Pentax",
            BrandCategory::Panasonic => "Panasonic",
            BrandCategory::Samsung => "Samsung",
            BrandCategory::Kodak => "Kodak",
            BrandCategory::Agfa => "Agfa",
            BrandCategory::Toshiba => "Toshiba",
            BrandCategory::Ricoh => "Ricoh",
            BrandCategory::Konica => "Konica",
            BrandCategory::Minolta => "Minolta",
            BrandCategory::Sanyo => "Sanyo",
            BrandCategory::Epson => "Epson",
            BrandCategory::Hp => "HP",
            BrandCategory::Leica => "Leica",
            BrandCategory::Jvc => "JVC",
            BrandCategory::Contax => "Contax",
            BrandCategory::Sigma => "Sigma",
            BrandCategory::Kyocera => "Kyocera",
            BrandCategory::Unknown => UNKNOWN_BRAND,
        }
    }

    pub fn is_known(&self) -> bool {
        *self != BrandCategory::Unknown
    }

    /// Keywords recognizing this category (empty for `Unknown`)
    pub fn keywords(&self) -> &'static [&'static str] {
        KEYWORD_TABLE
            .iter()
            .find(|(brand, _)| brand == self)
            .map(|(_, keywords)| *keywords)
            .unwrap_or(&[])
    }
}

impl fmt::Display for BrandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify free text into a brand category by substring keyword matching
pub fn classify(text: Option<&str>) -> BrandCategory {
    let Some(text) = text.filter(|t| !t.is_empty()) else {
        return BrandCategory::Unknown;
    };

    let lower = text.to_lowercase();
    KEYWORD_TABLE
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(brand, _)| *brand)
        .unwrap_or(BrandCategory::Unknown)
}

/// Derive the brand label for a training row.
///
/// Keyword table first; otherwise the first whitespace-delimited token of
/// the model name becomes an ad-hoc label outside the canonical set.
pub fn extract_training_brand(model_name: Option<&str>) -> String {
    let Some(name) = model_name else {
        return UNKNOWN_BRAND.to_string();
    };

    let category = classify(Some(name));
    if category.is_known() {
        return category.as_str().to_string();
    }

    name.split_whitespace()
        .next()
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_BRAND.to_string())
}
