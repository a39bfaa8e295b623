//! Core data models for the camera price predictor

use serde::{Deserialize, Serialize};

/// Feature names in the positional order the price model was trained on
pub const FEATURE_NAMES: [&str; 4] = [
    "brand_id",
    "Effective pixels",
    "Weight (inc. batteries)",
    "dimension_volume",
];

/// Number of input features expected by the model
pub const NUM_FEATURES: usize = FEATURE_NAMES.len();

/// Fixed-order model input
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub brand_code: f64,
    pub effective_pixels: f64,
    pub weight: f64,
    pub dimension_volume: f64,
}

impl FeatureVector {
    pub fn to_array(&self) -> [f64; NUM_FEATURES] {
        [
            self.brand_code,
            self.effective_pixels,
            self.weight,
            self.dimension_volume,
        ]
    }
}

/// Held-out evaluation metrics recorded at training time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    pub rmse: f64,
    pub r2: f64,
}

/// Brand code as echoed back to callers: integral codes stay integers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BrandId {
    Code(i64),
    Raw(f64),
}

impl BrandId {
    pub fn from_value(value: f64) -> Self {
        if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            BrandId::Code(value as i64)
        } else {
            BrandId::Raw(value)
        }
    }
}

/// Successful prediction payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub price: f64,
    pub brand: String,
    pub brand_id: BrandId,
    pub effective_pixels: f64,
    pub weight: f64,
    pub dimension_volume: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_order() {
        let v = FeatureVector {
            brand_code: 2.0,
            effective_pixels: 5.0,
            weight: 300.0,
            dimension_volume: 150.0,
        };
        assert_eq!(v.to_array(), [2.0, 5.0, 300.0, 150.0]);
    }

    #[test]
    fn test_brand_id_serialization() {
        assert_eq!(serde_json::to_string(&BrandId::from_value(2.0)).unwrap(), "2");
        assert_eq!(serde_json::to_string(&BrandId::from_value(2.5)).unwrap(), "2.5");
    }
}
