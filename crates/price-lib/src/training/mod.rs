//! Offline training pipeline
//!
//! CSV -> brand extraction -> encoder -> cleaning -> seeded split ->
//! gradient boosting -> held-out metrics -> [`ModelBundle`].

pub mod dataset;
pub mod metrics;

pub use dataset::{clean, load_csv, load_reader, CameraRecord, CleanRecord};
pub use metrics::{r2_score, rmse, train_test_split};

use crate::brand::extract_training_brand;
use crate::bundle::ModelBundle;
use crate::encoder::CategoryEncoder;
use crate::error::{DatasetError, TrainingError};
use crate::models::{Performance, FEATURE_NAMES, NUM_FEATURES};
use crate::predictor::GradientBoostingRegressor;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Test-set positions echoed in the training report
pub const SAMPLE_INDICES: [usize; 5] = [0, 5, 10, 15, 20];

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Fraction of training rows drawn for each tree
    pub subsample: f64,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub test_size: f64,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            learning_rate: 0.1,
            max_depth: 5,
            subsample: 0.8,
            min_samples_split: 5,
            min_samples_leaf: 3,
            test_size: 0.2,
            seed: 42,
        }
    }
}

impl TrainingConfig {
    fn regressor(&self) -> GradientBoostingRegressor {
        GradientBoostingRegressor::new()
            .with_n_estimators(self.n_estimators)
            .with_learning_rate(self.learning_rate)
            .with_max_depth(self.max_depth)
            .with_subsample(self.subsample)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_random_state(self.seed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrandCount {
    pub brand: String,
    pub code: usize,
    pub count: usize,
}

/// Dimension volume summary over all rows with a value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VolumeStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplePrediction {
    pub index: usize,
    pub brand: String,
    pub brand_id: usize,
    pub effective_pixels: f64,
    pub weight: f64,
    pub dimension_volume: f64,
    pub actual: f64,
    pub predicted: f64,
}

impl SamplePrediction {
    pub fn error(&self) -> f64 {
        (self.actual - self.predicted).abs()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub dataset_size: usize,
    pub cleaned_size: usize,
    pub train_size: usize,
    pub test_size: usize,
    /// Most frequent brand first
    pub brand_distribution: Vec<BrandCount>,
    pub volume_stats: Option<VolumeStats>,
    pub performance: Performance,
    /// (feature, importance), most important first
    pub feature_importances: Vec<(String, f64)>,
    pub samples: Vec<SamplePrediction>,
}

/// Train from a CSV file on disk
pub fn train(
    path: &Path,
    config: &TrainingConfig,
) -> Result<(ModelBundle, TrainingReport), TrainingError> {
    let records = load_csv(path)?;
    info!(path = %path.display(), rows = records.len(), "Dataset loaded");
    train_records(&records, config)
}

/// Train from already-loaded dataset rows
pub fn train_records(
    records: &[CameraRecord],
    config: &TrainingConfig,
) -> Result<(ModelBundle, TrainingReport), TrainingError> {
    let brands: Vec<String> = records
        .iter()
        .map(|r| extract_training_brand(r.model.as_deref()))
        .collect();

    // Vocabulary covers every row, including ones cleaning drops
    let encoder = CategoryEncoder::fit(&brands);
    let brand_distribution = brand_distribution(&brands, &encoder);
    let volume_stats = volume_stats(records);

    let cleaned = clean(records, &brands);
    if cleaned.len() < 2 {
        return Err(DatasetError::TooFewRows(cleaned.len()).into());
    }

    let mut x = Vec::with_capacity(cleaned.len());
    let mut y = Vec::with_capacity(cleaned.len());
    for record in &cleaned {
        let code = encoder.encode(&record.brand)?;
        x.push([
            code as f64,
            record.effective_pixels,
            record.weight,
            record.dimension_volume,
        ]);
        y.push(record.price);
    }

    let (train_idx, test_idx) = train_test_split(cleaned.len(), config.test_size, config.seed);
    let x_train: Vec<[f64; NUM_FEATURES]> = train_idx.iter().map(|&i| x[i]).collect();
    let y_train: Vec<f64> = train_idx.iter().map(|&i| y[i]).collect();

    info!(
        train = train_idx.len(),
        test = test_idx.len(),
        n_estimators = config.n_estimators,
        "Fitting gradient boosting model"
    );
    let mut model = config.regressor();
    model.fit(&x_train, &y_train)?;

    let y_test: Vec<f64> = test_idx.iter().map(|&i| y[i]).collect();
    let test_predictions = test_idx
        .iter()
        .map(|&i| model.predict_row(&x[i]))
        .collect::<Result<Vec<f64>, _>>()?;

    let performance = Performance {
        rmse: rmse(&y_test, &test_predictions),
        r2: r2_score(&y_test, &test_predictions),
    };
    info!(rmse = performance.rmse, r2 = performance.r2, "Model evaluated");

    let samples = SAMPLE_INDICES
        .iter()
        .filter(|&&pos| pos < test_idx.len())
        .map(|&pos| {
            let row = &cleaned[test_idx[pos]];
            let features = &x[test_idx[pos]];
            SamplePrediction {
                index: pos,
                brand: row.brand.clone(),
                brand_id: features[0] as usize,
                effective_pixels: row.effective_pixels,
                weight: row.weight,
                dimension_volume: row.dimension_volume,
                actual: row.price,
                predicted: test_predictions[pos],
            }
        })
        .collect();

    let mut feature_importances: Vec<(String, f64)> = FEATURE_NAMES
        .iter()
        .zip(model.feature_importances())
        .map(|(name, imp)| (name.to_string(), *imp))
        .collect();
    feature_importances.sort_by(|a, b| b.1.total_cmp(&a.1));

    let report = TrainingReport {
        dataset_size: records.len(),
        cleaned_size: cleaned.len(),
        train_size: train_idx.len(),
        test_size: test_idx.len(),
        brand_distribution,
        volume_stats,
        performance,
        feature_importances,
        samples,
    };

    Ok((ModelBundle::new(model, encoder, performance), report))
}

fn brand_distribution(brands: &[String], encoder: &CategoryEncoder) -> Vec<BrandCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for brand in brands {
        *counts.entry(brand.as_str()).or_default() += 1;
    }

    let mut distribution: Vec<BrandCount> = encoder
        .entries()
        .map(|(brand, code)| BrandCount {
            brand: brand.to_string(),
            code,
            count: counts.get(brand).copied().unwrap_or_default(),
        })
        .collect();
    distribution.sort_by(|a, b| b.count.cmp(&a.count).then(a.code.cmp(&b.code)));
    distribution
}

fn volume_stats(records: &[CameraRecord]) -> Option<VolumeStats> {
    let volumes: Vec<f64> = records.iter().filter_map(|r| r.dimensions).collect();
    if volumes.is_empty() {
        return None;
    }
    Some(VolumeStats {
        min: volumes.iter().copied().fold(f64::INFINITY, f64::min),
        max: volumes.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        mean: volumes.iter().sum::<f64>() / volumes.len() as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeatureVector;
    use crate::predictor::PriceModel;
    use std::io::Write;

    /// 40 rows over three brands plus one ad-hoc label and some dirty rows
    fn dataset_csv() -> String {
        let mut csv = String::from(
            "Model,Release date,Max resolution,Effective pixels,Weight (inc. batteries),Dimensions,Price\n",
        );
        let names = ["Canon PowerShot", "Nikon Coolpix", "Sony Cyber-shot", "Zorki 4K"];
        for i in 0..40 {
            let pixels = 2 + i % 10;
            let weight = 120 + i * 7;
            let volume = 80 + (i % 5) * 30;
            let price = 80 + (i % 4) * 60 + pixels * 25;
            csv.push_str(&format!(
                "{} {},2005,1024,{},{},{},{}\n",
                names[i % 4],
                i,
                pixels,
                weight,
                volume,
                price
            ));
        }
        csv.push_str("Leica M8,2006,3000,10,,150,4999\n");
        csv.push_str("Kodak EasyShare,2004,1600,0,200,90,99\n");
        csv
    }

    fn small_config() -> TrainingConfig {
        TrainingConfig {
            n_estimators: 30,
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn test_default_config_matches_default_regressor() {
        assert_eq!(TrainingConfig::default().regressor(), GradientBoostingRegressor::new());
    }

    #[test]
    fn test_tree_shape_settings_reach_the_model() {
        let records = load_reader(dataset_csv().as_bytes()).unwrap();

        // No tree may split, so every prediction is the training mean
        let stumps = TrainingConfig {
            min_samples_leaf: 1000,
            ..small_config()
        };
        let (_, report) = train_records(&records, &stumps).unwrap();
        let first = report.samples[0].predicted;
        assert!(report.samples.iter().all(|s| s.predicted == first));

        let (full_rows, _) = train_records(
            &records,
            &TrainingConfig {
                subsample: 1.0,
                ..small_config()
            },
        )
        .unwrap();
        let (half_rows, _) = train_records(
            &records,
            &TrainingConfig {
                subsample: 0.5,
                ..small_config()
            },
        )
        .unwrap();
        assert_ne!(full_rows.model, half_rows.model);
    }

    #[test]
    fn test_train_builds_consistent_bundle() {
        let records = load_reader(dataset_csv().as_bytes()).unwrap();
        let (bundle, report) = train_records(&records, &small_config()).unwrap();

        assert_eq!(report.dataset_size, 42);
        assert_eq!(report.cleaned_size, 40);
        assert_eq!(report.train_size + report.test_size, 40);
        assert_eq!(report.test_size, 8);

        // Dropped rows still contribute their brands
        let classes = bundle.encoder.classes();
        assert_eq!(classes, &["Canon", "Kodak", "Leica", "Nikon", "Sony", "Zorki"]);
        assert_eq!(bundle.model.n_trees(), 30);
        assert_eq!(bundle.performance, report.performance);
        assert!(report.performance.rmse.is_finite());
    }

    #[test]
    fn test_report_details() {
        let records = load_reader(dataset_csv().as_bytes()).unwrap();
        let (bundle, report) = train_records(&records, &small_config()).unwrap();

        assert_eq!(report.brand_distribution[0].count, 10);
        let leica = report
            .brand_distribution
            .iter()
            .find(|b| b.brand == "Leica")
            .unwrap();
        assert_eq!((leica.code, leica.count), (2, 1));

        let stats = report.volume_stats.unwrap();
        assert_eq!(stats.min, 80.0);
        assert_eq!(stats.max, 200.0);

        let total: f64 = report.feature_importances.iter().map(|(_, v)| v).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(report.feature_importances[0].1 >= report.feature_importances[1].1);

        // Test split has 8 rows, so only positions 0 and 5 are sampled
        let positions: Vec<usize> = report.samples.iter().map(|s| s.index).collect();
        assert_eq!(positions, vec![0, 5]);
        for sample in &report.samples {
            let direct = bundle
                .model
                .predict(&FeatureVector {
                    brand_code: sample.brand_id as f64,
                    effective_pixels: sample.effective_pixels,
                    weight: sample.weight,
                    dimension_volume: sample.dimension_volume,
                })
                .unwrap();
            assert_eq!(direct, sample.predicted);
            assert_eq!(bundle.encoder.decode(sample.brand_id as i64).unwrap(), sample.brand);
        }
    }

    #[test]
    fn test_training_is_deterministic() {
        let records = load_reader(dataset_csv().as_bytes()).unwrap();
        let (first, _) = train_records(&records, &small_config()).unwrap();
        let (second, _) = train_records(&records, &small_config()).unwrap();
        assert_eq!(first.model, second.model);
        assert_eq!(first.performance, second.performance);
    }

    #[test]
    fn test_too_few_clean_rows() {
        let csv = "Model,Effective pixels,Weight (inc. batteries),Dimensions,Price\n\
                   Canon A,5,200,90,150\n\
                   Nikon B,0,200,90,150\n";
        let records = load_reader(csv.as_bytes()).unwrap();
        let err = train_records(&records, &small_config()).unwrap_err();
        assert!(matches!(err, TrainingError::Dataset(DatasetError::TooFewRows(1))));
    }

    #[test]
    fn test_train_from_file_round_trips_through_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("camera_dataset.csv");
        std::fs::File::create(&csv_path)
            .unwrap()
            .write_all(dataset_csv().as_bytes())
            .unwrap();

        let (bundle, _) = train(&csv_path, &small_config()).unwrap();
        let bundle_path = dir.path().join("bundle.bin");
        bundle.save(&bundle_path).unwrap();
        assert_eq!(ModelBundle::load(&bundle_path).unwrap(), bundle);
    }
}
