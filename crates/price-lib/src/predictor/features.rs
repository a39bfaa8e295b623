//! Request parsing and feature vector assembly
//!
//! Two request shapes are accepted and resolved by key presence, in order:
//!
//! - friendly (mode 1): `Brand` plus pixel count, weight and optional
//!   dimension volume. A textual brand is resolved through the category
//!   encoder and, failing that, the keyword classifier. A numeric brand is
//!   used as the code directly.
//! - raw (mode 2): the exact training-time columns `brand_id`,
//!   `Effective pixels`, `Weight (inc. batteries)` and `dimension_volume`.

use crate::brand::{classify, UNKNOWN_BRAND};
use crate::encoder::CategoryEncoder;
use crate::error::PredictError;
use crate::models::FeatureVector;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// `Brand` values that request keyword detection from `Model`
pub const AUTO_DETECT_SENTINELS: [&str; 3] = ["auto", "detect", ""];

/// Dimension volume used when a friendly request omits it
pub const DEFAULT_DIMENSION_VOLUME: f64 = 100.0;

const BRAND_KEY: &str = "Brand";
const RAW_KEYS: [&str; 4] = [
    "brand_id",
    "Effective pixels",
    "Weight (inc. batteries)",
    "dimension_volume",
];

/// What to do when a friendly request's brand cannot be encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedBrandPolicy {
    /// Use code 0 and keep going (legacy behavior)
    #[default]
    DefaultToFirstCode,
    /// Fail the request with `InvalidInput`
    Reject,
}

/// A finite number, accepted either as a JSON number or a numeric string
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Numeric(pub f64);

impl<'de> Deserialize<'de> for Numeric {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NumericVisitor;

        impl<'de> Visitor<'de> for NumericVisitor {
            type Value = Numeric;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a finite number or numeric string")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Numeric, E> {
                if v.is_finite() {
                    Ok(Numeric(v))
                } else {
                    Err(E::invalid_value(de::Unexpected::Float(v), &self))
                }
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Numeric, E> {
                Ok(Numeric(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Numeric, E> {
                Ok(Numeric(v as f64))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Numeric, E> {
                match v.trim().parse::<f64>() {
                    Ok(parsed) if parsed.is_finite() => Ok(Numeric(parsed)),
                    _ => Err(E::invalid_value(de::Unexpected::Str(v), &self)),
                }
            }
        }

        deserializer.deserialize_any(NumericVisitor)
    }
}

/// `Brand` of a mode 1 request: a name or free text, or a bare brand code
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BrandField {
    Name(String),
    Code(Numeric),
}

impl<'de> Deserialize<'de> for BrandField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BrandFieldVisitor;

        impl<'de> Visitor<'de> for BrandFieldVisitor {
            type Value = BrandField;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a brand name or a numeric brand code")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<BrandField, E> {
                Ok(BrandField::Name(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<BrandField, E> {
                if v.is_finite() {
                    Ok(BrandField::Code(Numeric(v)))
                } else {
                    Err(E::invalid_value(de::Unexpected::Float(v), &self))
                }
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<BrandField, E> {
                Ok(BrandField::Code(Numeric(v as f64)))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<BrandField, E> {
                Ok(BrandField::Code(Numeric(v as f64)))
            }
        }

        deserializer.deserialize_any(BrandFieldVisitor)
    }
}

/// Mode 1 request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FriendlyRequest {
    #[serde(rename = "Brand")]
    pub brand: BrandField,
    #[serde(rename = "Model", default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(
        rename = "Effective pixels",
        alias = "Megapixel",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub effective_pixels: Option<Numeric>,
    #[serde(
        rename = "Weight",
        alias = "Weight (inc. batteries)",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub weight: Option<Numeric>,
    #[serde(
        rename = "Dimensions",
        alias = "dimension_volume",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub dimensions: Option<Numeric>,
}

/// Mode 2 request, keyed exactly like the training columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRequest {
    pub brand_id: Numeric,
    #[serde(rename = "Effective pixels")]
    pub effective_pixels: Numeric,
    #[serde(rename = "Weight (inc. batteries)")]
    pub weight: Numeric,
    pub dimension_volume: Numeric,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PredictRequest {
    Friendly(FriendlyRequest),
    Raw(RawRequest),
}

impl PredictRequest {
    /// Pick the request shape by key presence and parse it strictly
    pub fn from_json(value: &Value) -> Result<Self, PredictError> {
        let Some(object) = value.as_object() else {
            return Err(no_matching_mode());
        };

        if object.contains_key(BRAND_KEY) {
            FriendlyRequest::deserialize(value)
                .map(PredictRequest::Friendly)
                .map_err(|e| PredictError::invalid(format!("invalid mode 1 request: {}", e)))
        } else if RAW_KEYS.iter().all(|key| object.contains_key(*key)) {
            RawRequest::deserialize(value)
                .map(PredictRequest::Raw)
                .map_err(|e| PredictError::invalid(format!("invalid mode 2 request: {}", e)))
        } else {
            Err(no_matching_mode())
        }
    }
}

/// Worked examples of both accepted request shapes
pub fn request_examples() -> Value {
    json!({
        "mode_1_example": {
            "Brand": "Canon",
            "Model": "Canon PowerShot A100",
            "Effective pixels": 10.0,
            "Weight": 200.0,
            "Dimensions": 100.0
        },
        "mode_2_example": {
            "brand_id": 2,
            "Effective pixels": 5.0,
            "Weight (inc. batteries)": 300.0,
            "dimension_volume": 150.0
        }
    })
}

fn no_matching_mode() -> PredictError {
    PredictError::InvalidInput {
        message: "Invalid input format. Use mode 1 (Brand, Effective pixels, Weight, Dimensions) \
                  or mode 2 (brand_id, Effective pixels, Weight (inc. batteries), dimension_volume)"
            .to_string(),
        examples: Some(request_examples()),
    }
}

/// How the brand code of a request was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrandResolution {
    /// `Brand` matched an encoder label exactly
    Direct,
    /// `Brand` was run through the keyword classifier
    Classified,
    /// `Brand` asked for detection from `Model`
    AutoDetected,
    /// `Brand` was a numeric code, taken as given
    Code,
    /// Nothing matched and the default-to-first-code policy applied
    DefaultedToFirstCode,
    /// Raw request, code taken as given
    Raw,
}

/// Model input plus the values echoed back to the caller
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFeatures {
    pub vector: FeatureVector,
    pub brand: String,
    pub resolution: BrandResolution,
    /// Free text the brand was resolved from (`Brand` or `Model`)
    pub source_text: Option<String>,
}

/// Turns requests into feature vectors against a fitted encoder
#[derive(Debug, Clone, Default)]
pub struct FeatureVectorizer {
    policy: UnresolvedBrandPolicy,
}

impl FeatureVectorizer {
    pub fn new(policy: UnresolvedBrandPolicy) -> Self {
        Self { policy }
    }

    pub fn vectorize(
        &self,
        encoder: &CategoryEncoder,
        request: &Value,
    ) -> Result<ResolvedFeatures, PredictError> {
        match PredictRequest::from_json(request)? {
            PredictRequest::Friendly(req) => self.resolve_friendly(encoder, &req),
            PredictRequest::Raw(req) => resolve_raw(encoder, &req),
        }
    }

    fn resolve_friendly(
        &self,
        encoder: &CategoryEncoder,
        req: &FriendlyRequest,
    ) -> Result<ResolvedFeatures, PredictError> {
        let effective_pixels = required_positive(req.effective_pixels, "Effective pixels")?;
        let weight = required_positive(req.weight, "Weight")?;
        let dimension_volume = match req.dimensions {
            Some(value) => positive(value.0, "Dimensions")?,
            None => DEFAULT_DIMENSION_VOLUME,
        };

        let (brand_code, brand, resolution, source_text) = match &req.brand {
            BrandField::Code(code) => (
                code.0,
                label_for_code(encoder, code.0).to_string(),
                BrandResolution::Code,
                None,
            ),
            BrandField::Name(name) if is_auto_detect(name) => {
                let model = req
                    .model
                    .as_deref()
                    .ok_or_else(|| PredictError::invalid("need Model for auto-detect"))?;
                let (code, brand, resolution) =
                    self.resolve_category(encoder, model, BrandResolution::AutoDetected)?;
                (code as f64, brand, resolution, Some(model.to_string()))
            }
            BrandField::Name(name) => {
                let (code, brand, resolution) = match encoder.encode(name) {
                    Ok(code) => (code, name.clone(), BrandResolution::Direct),
                    Err(_) => self.resolve_category(encoder, name, BrandResolution::Classified)?,
                };
                (code as f64, brand, resolution, Some(name.clone()))
            }
        };

        Ok(ResolvedFeatures {
            vector: FeatureVector {
                brand_code,
                effective_pixels,
                weight,
                dimension_volume,
            },
            brand,
            resolution,
            source_text,
        })
    }

    /// Classify free text and encode the category. `Unknown` never counts
    /// as resolved, even when the encoder carries it as a label.
    fn resolve_category(
        &self,
        encoder: &CategoryEncoder,
        text: &str,
        resolution: BrandResolution,
    ) -> Result<(usize, String, BrandResolution), PredictError> {
        let category = classify(Some(text));
        if category.is_known() {
            if let Ok(code) = encoder.encode(category.as_str()) {
                return Ok((code, category.as_str().to_string(), resolution));
            }
        }
        self.unresolved(encoder, text)
    }

    fn unresolved(
        &self,
        encoder: &CategoryEncoder,
        text: &str,
    ) -> Result<(usize, String, BrandResolution), PredictError> {
        match self.policy {
            UnresolvedBrandPolicy::DefaultToFirstCode => {
                let label = encoder.decode(0).unwrap_or(UNKNOWN_BRAND).to_string();
                Ok((0, label, BrandResolution::DefaultedToFirstCode))
            }
            UnresolvedBrandPolicy::Reject => Err(PredictError::invalid(format!(
                "could not resolve brand from {:?}; known brands: {}",
                text,
                encoder.classes().join(", ")
            ))),
        }
    }
}

fn resolve_raw(
    encoder: &CategoryEncoder,
    req: &RawRequest,
) -> Result<ResolvedFeatures, PredictError> {
    let brand_code = req.brand_id.0;

    Ok(ResolvedFeatures {
        vector: FeatureVector {
            brand_code,
            effective_pixels: positive(req.effective_pixels.0, "Effective pixels")?,
            weight: positive(req.weight.0, "Weight (inc. batteries)")?,
            dimension_volume: positive(req.dimension_volume.0, "dimension_volume")?,
        },
        brand: label_for_code(encoder, brand_code).to_string(),
        resolution: BrandResolution::Raw,
        source_text: None,
    })
}

/// Label of an integral in-range code, "Unknown" for anything else
fn label_for_code(encoder: &CategoryEncoder, code: f64) -> &str {
    if code.fract() == 0.0 {
        encoder.decode(code as i64).unwrap_or(UNKNOWN_BRAND)
    } else {
        UNKNOWN_BRAND
    }
}

fn is_auto_detect(brand: &str) -> bool {
    AUTO_DETECT_SENTINELS.contains(&brand.trim().to_lowercase().as_str())
}

fn required_positive(value: Option<Numeric>, field: &str) -> Result<f64, PredictError> {
    let value = value
        .ok_or_else(|| PredictError::invalid(format!("missing required field {:?}", field)))?;
    positive(value.0, field)
}

fn positive(value: f64, field: &str) -> Result<f64, PredictError> {
    if value > 0.0 {
        Ok(value)
    } else {
        Err(PredictError::invalid(format!(
            "field {:?} must be greater than 0, got {}",
            field, value
        )))
    }
}
