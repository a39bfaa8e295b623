//! Offline model training

use anyhow::{Context, Result};
use colored::Colorize;
use price_lib::training::{self, TrainingConfig, TrainingReport};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use crate::output::{
    color_r2, format_currency, print_heading, print_info, print_json, print_success, print_table,
    OutputFormat,
};

#[derive(Tabled)]
struct BrandRow {
    #[tabled(rename = "Brand")]
    brand: String,
    #[tabled(rename = "Code")]
    code: usize,
    #[tabled(rename = "Cameras")]
    count: usize,
}

#[derive(Tabled)]
struct ImportanceRow {
    #[tabled(rename = "Feature")]
    feature: String,
    #[tabled(rename = "Importance")]
    importance: String,
}

#[derive(Tabled)]
struct SampleRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Brand")]
    brand: String,
    #[tabled(rename = "MP")]
    pixels: f64,
    #[tabled(rename = "Weight (g)")]
    weight: f64,
    #[tabled(rename = "Volume (mm³)")]
    volume: String,
    #[tabled(rename = "Actual")]
    actual: String,
    #[tabled(rename = "Predicted")]
    predicted: String,
    #[tabled(rename = "Error")]
    error: String,
}

#[derive(Serialize)]
struct TrainOutput<'a> {
    bundle: String,
    #[serde(flatten)]
    report: &'a TrainingReport,
}

/// Train a model from a CSV dataset and write the bundle
pub fn run_training(
    data: &Path,
    output: &Path,
    config: &TrainingConfig,
    format: OutputFormat,
) -> Result<()> {
    let (bundle, report) = training::train(data, config)
        .with_context(|| format!("Training on {} failed", data.display()))?;

    bundle
        .save(output)
        .with_context(|| format!("Failed to write bundle to {}", output.display()))?;

    match format {
        OutputFormat::Json => print_json(&TrainOutput {
            bundle: output.display().to_string(),
            report: &report,
        })?,
        OutputFormat::Table => print_report(&report, output),
    }

    Ok(())
}

fn print_report(report: &TrainingReport, output: &Path) {
    print_heading("Camera Price Model Training");
    println!("Dataset rows:           {}", report.dataset_size);
    println!("After cleaning:         {}", report.cleaned_size);
    println!(
        "Train / test:           {} / {}",
        report.train_size, report.test_size
    );
    println!();

    println!("{}", "Brand Distribution".bold());
    let rows: Vec<BrandRow> = report
        .brand_distribution
        .iter()
        .map(|b| BrandRow {
            brand: b.brand.clone(),
            code: b.code,
            count: b.count,
        })
        .collect();
    print_table(&rows);
    println!();

    if let Some(stats) = &report.volume_stats {
        println!("{}", "Dimension Volume".bold());
        println!("{}", "-".repeat(50));
        println!("Min:                    {}", stats.min);
        println!("Max:                    {}", stats.max);
        println!("Mean:                   {:.2}", stats.mean);
        println!();
    }

    println!("{}", "Model Performance".bold());
    println!("{}", "-".repeat(50));
    println!("RMSE:                   {}", format_currency(report.performance.rmse));
    println!("R² Score:               {}", color_r2(report.performance.r2));
    println!();

    println!("{}", "Feature Importance".bold());
    let rows: Vec<ImportanceRow> = report
        .feature_importances
        .iter()
        .map(|(feature, importance)| ImportanceRow {
            feature: feature.clone(),
            importance: format!("{:.4}", importance),
        })
        .collect();
    print_table(&rows);
    println!();

    if !report.samples.is_empty() {
        println!("{}", "Sample Predictions (Test Set)".bold());
        let rows: Vec<SampleRow> = report
            .samples
            .iter()
            .map(|s| SampleRow {
                index: s.index + 1,
                brand: format!("{} (id:{})", s.brand, s.brand_id),
                pixels: s.effective_pixels,
                weight: s.weight,
                volume: format!("{:.0}", s.dimension_volume),
                actual: format_currency(s.actual),
                predicted: format_currency(s.predicted),
                error: format_currency(s.error()),
            })
            .collect();
        print_table(&rows);
        println!();
    } else {
        print_info("Test split too small for sample predictions");
    }

    print_success(&format!("Model bundle saved to {}", output.display()));
}
