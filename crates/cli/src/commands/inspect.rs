//! Offline bundle inspection

use anyhow::{Context, Result};
use colored::Colorize;
use price_lib::{ModelBundle, Performance, FEATURE_NAMES};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tabled::Tabled;

use crate::output::{
    color_r2, format_currency, print_heading, print_json, print_table, OutputFormat,
};

#[derive(Tabled)]
struct BrandRow {
    #[tabled(rename = "Code")]
    code: usize,
    #[tabled(rename = "Brand")]
    brand: String,
}

#[derive(Debug, Serialize)]
struct BundleSummary {
    path: String,
    trained_at: String,
    trees: usize,
    learning_rate: f64,
    max_depth: usize,
    features: Vec<String>,
    feature_importances: BTreeMap<String, f64>,
    performance: Performance,
    brands: BTreeMap<String, usize>,
}

impl BundleSummary {
    fn new(path: &Path, bundle: &ModelBundle) -> Self {
        Self {
            path: path.display().to_string(),
            trained_at: bundle.trained_at.clone(),
            trees: bundle.model.n_trees(),
            learning_rate: bundle.model.learning_rate(),
            max_depth: bundle.model.max_depth(),
            features: bundle.feature_names.clone(),
            feature_importances: FEATURE_NAMES
                .iter()
                .zip(bundle.model.feature_importances())
                .map(|(name, imp)| (name.to_string(), *imp))
                .collect(),
            performance: bundle.performance,
            brands: bundle
                .encoder
                .entries()
                .map(|(label, code)| (label.to_string(), code))
                .collect(),
        }
    }
}

/// Dump a bundle without starting a server
pub fn inspect_bundle(path: &Path, format: OutputFormat) -> Result<()> {
    let bundle = ModelBundle::load(path)
        .with_context(|| format!("Failed to load bundle {}", path.display()))?;
    let summary = BundleSummary::new(path, &bundle);

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => {
            print_heading("Model Bundle");
            println!("Path:                   {}", summary.path.cyan());
            println!("Trained at:             {}", summary.trained_at);
            println!("Trees:                  {}", summary.trees);
            println!("Learning rate:          {}", summary.learning_rate);
            println!("Max depth:              {}", summary.max_depth);
            println!("Features:               {}", summary.features.join(", "));
            println!();

            println!("{}", "Held-out Performance".bold());
            println!("{}", "-".repeat(50));
            println!("RMSE:                   {}", format_currency(summary.performance.rmse));
            println!("R² Score:               {}", color_r2(summary.performance.r2));
            println!();

            println!("{} ({})", "Brands".bold(), bundle.encoder.len());
            let rows: Vec<BrandRow> = bundle
                .encoder
                .entries()
                .map(|(brand, code)| BrandRow {
                    code,
                    brand: brand.to_string(),
                })
                .collect();
            print_table(&rows);
        }
    }

    Ok(())
}
