//! Prediction output post-processing

use super::features::ResolvedFeatures;
use crate::models::{BrandId, PredictionResponse};

/// Decimal places kept in returned prices
pub const PRICE_DECIMALS: i32 = 2;

/// Round a raw model output to cents
pub fn round_price(raw: f64) -> f64 {
    let scale = 10f64.powi(PRICE_DECIMALS);
    (raw * scale).round() / scale
}

/// Build the response payload echoing what was fed to the model
pub fn format_response(resolved: &ResolvedFeatures, raw_price: f64) -> PredictionResponse {
    let vector = &resolved.vector;
    PredictionResponse {
        price: round_price(raw_price),
        brand: resolved.brand.clone(),
        brand_id: BrandId::from_value(vector.brand_code),
        effective_pixels: vector.effective_pixels,
        weight: vector.weight,
        dimension_volume: vector.dimension_volume,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeatureVector;
    use crate::predictor::BrandResolution;

    #[test]
    fn test_round_price() {
        assert_eq!(round_price(123.456), 123.46);
        assert_eq!(round_price(99.994), 99.99);
        assert_eq!(round_price(-0.001), -0.0);
        assert_eq!(round_price(42.0), 42.0);
    }

    #[test]
    fn test_format_response_echoes_inputs() {
        let resolved = ResolvedFeatures {
            vector: FeatureVector {
                brand_code: 2.0,
                effective_pixels: 12.0,
                weight: 150.0,
                dimension_volume: 90.0,
            },
            brand: "Nikon".to_string(),
            resolution: BrandResolution::AutoDetected,
            source_text: Some("Nikon Coolpix S3000".to_string()),
        };
        let response = format_response(&resolved, 187.126);
        assert_eq!(response.price, 187.13);
        assert_eq!(response.brand, "Nikon");
        assert_eq!(response.brand_id, BrandId::Code(2));
        assert_eq!(response.effective_pixels, 12.0);
        assert_eq!(response.weight, 150.0);
        assert_eq!(response.dimension_volume, 90.0);
    }
}
