//! Commands that query a running price server

use anyhow::{bail, Result};
use colored::Colorize;
use price_lib::predictor::{BrandField, FriendlyRequest, Numeric, RawRequest};
use serde_json::Value;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_r2, color_status, format_currency, print_heading, print_json, print_table,
    print_warning, OutputFormat,
};

/// Request fields collected from the command line
#[derive(Debug, Clone, Default)]
pub struct PredictArgs {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub brand_id: Option<f64>,
    pub pixels: f64,
    pub weight: f64,
    pub dimensions: Option<f64>,
}

impl PredictArgs {
    /// Mode 2 when a brand code is given, Mode 1 otherwise
    pub fn to_request(&self) -> Result<Value> {
        let value = match (self.brand_id, &self.brand) {
            (Some(brand_id), _) => {
                let Some(dimensions) = self.dimensions else {
                    bail!("--dimensions is required together with --brand-id");
                };
                serde_json::to_value(RawRequest {
                    brand_id: Numeric(brand_id),
                    effective_pixels: Numeric(self.pixels),
                    weight: Numeric(self.weight),
                    dimension_volume: Numeric(dimensions),
                })?
            }
            (None, Some(brand)) => serde_json::to_value(FriendlyRequest {
                brand: BrandField::Name(brand.clone()),
                model: self.model.clone(),
                effective_pixels: Some(Numeric(self.pixels)),
                weight: Some(Numeric(self.weight)),
                dimensions: self.dimensions.map(Numeric),
            })?,
            (None, None) => bail!("either --brand or --brand-id is required"),
        };
        Ok(value)
    }
}

#[derive(Tabled)]
struct BrandRow {
    #[tabled(rename = "Code")]
    code: usize,
    #[tabled(rename = "Brand")]
    brand: String,
}

/// Ask the server for a price
pub async fn predict(client: &ApiClient, args: &PredictArgs, format: OutputFormat) -> Result<()> {
    let request = args.to_request()?;
    let result = client.predict(&request).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            print_heading("Price Prediction");
            println!(
                "Brand:                  {} (id:{})",
                result.brand.cyan(),
                serde_json::to_string(&result.brand_id)?
            );
            println!("Effective pixels:       {}", result.effective_pixels);
            println!("Weight:                 {}g", result.weight);
            println!("Volume:                 {:.0}mm³", result.dimension_volume);
            println!();
            println!(
                "{} {}",
                "Predicted Price:".bold(),
                format_currency(result.price).green().bold()
            );
        }
    }

    Ok(())
}

/// List the brand codes the server's model knows
pub async fn list_brands(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result = client.brands().await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            let mut rows: Vec<BrandRow> = result
                .brands
                .iter()
                .map(|(brand, code)| BrandRow {
                    code: *code,
                    brand: brand.clone(),
                })
                .collect();
            rows.sort_by_key(|r| r.code);
            print_table(&rows);
            println!("Total: {}", result.total);
            println!("Features: {}", result.features_used.join(", "));
        }
    }

    Ok(())
}

/// Show server health and training metrics
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            let status = serde_json::to_value(result.status)?;
            print_heading("Server Health");
            println!(
                "Status:                 {}",
                color_status(status.as_str().unwrap_or_default())
            );
            println!("Model loaded:           {}", result.model_loaded);
            println!("Brands:                 {}", result.brands_count);
            println!("Trained at:             {}", result.trained_at);
            println!("RMSE:                   {}", format_currency(result.performance.rmse));
            println!("R² Score:               {}", color_r2(result.performance.r2));
            if let Some(message) = &result.message {
                println!();
                print_warning(message);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args() -> PredictArgs {
        PredictArgs {
            pixels: 12.0,
            weight: 150.0,
            ..PredictArgs::default()
        }
    }

    #[test]
    fn test_friendly_request_body() {
        let request = PredictArgs {
            brand: Some("auto".to_string()),
            model: Some("Nikon Coolpix S3000".to_string()),
            dimensions: Some(90.0),
            ..args()
        }
        .to_request()
        .unwrap();

        assert_eq!(
            request,
            json!({
                "Brand": "auto",
                "Model": "Nikon Coolpix S3000",
                "Effective pixels": 12.0,
                "Weight": 150.0,
                "Dimensions": 90.0
            })
        );
    }

    #[test]
    fn test_friendly_request_omits_absent_fields() {
        let request = PredictArgs {
            brand: Some("Canon".to_string()),
            ..args()
        }
        .to_request()
        .unwrap();
        assert_eq!(
            request,
            json!({"Brand": "Canon", "Effective pixels": 12.0, "Weight": 150.0})
        );
    }

    #[test]
    fn test_raw_request_body() {
        let request = PredictArgs {
            brand_id: Some(2.0),
            dimensions: Some(150.0),
            ..args()
        }
        .to_request()
        .unwrap();

        assert_eq!(
            request,
            json!({
                "brand_id": 2.0,
                "Effective pixels": 12.0,
                "Weight (inc. batteries)": 150.0,
                "dimension_volume": 150.0
            })
        );
    }

    #[test]
    fn test_raw_request_needs_dimensions() {
        let err = PredictArgs {
            brand_id: Some(2.0),
            ..args()
        }
        .to_request()
        .unwrap_err();
        assert!(err.to_string().contains("--dimensions"));
    }

    #[test]
    fn test_brand_or_code_required() {
        assert!(args().to_request().is_err());
    }
}
