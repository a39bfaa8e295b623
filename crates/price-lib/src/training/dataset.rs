//! Camera dataset loading and cleaning

use crate::error::DatasetError;
use csv::StringRecord;
use std::io::Read;
use std::path::Path;

pub const MODEL_COLUMN: &str = "Model";
pub const PIXELS_COLUMN: &str = "Effective pixels";
pub const WEIGHT_COLUMN: &str = "Weight (inc. batteries)";
pub const DIMENSIONS_COLUMN: &str = "Dimensions";
pub const PRICE_COLUMN: &str = "Price";

const REQUIRED_COLUMNS: [&str; 5] = [
    MODEL_COLUMN,
    PIXELS_COLUMN,
    WEIGHT_COLUMN,
    DIMENSIONS_COLUMN,
    PRICE_COLUMN,
];

/// One raw dataset row. Numeric cells that are empty or unparsable are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraRecord {
    pub model: Option<String>,
    pub effective_pixels: Option<f64>,
    pub weight: Option<f64>,
    /// Already a volume in mm³
    pub dimensions: Option<f64>,
    pub price: Option<f64>,
}

/// A row that survived cleaning
#[derive(Debug, Clone, PartialEq)]
pub struct CleanRecord {
    pub brand: String,
    pub effective_pixels: f64,
    pub weight: f64,
    pub dimension_volume: f64,
    pub price: f64,
}

struct ColumnIndex {
    model: usize,
    pixels: usize,
    weight: usize,
    dimensions: usize,
    price: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Result<Self, DatasetError> {
        let find = |name: &'static str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or(DatasetError::MissingColumn(name))
        };
        for column in REQUIRED_COLUMNS {
            find(column)?;
        }
        Ok(Self {
            model: find(MODEL_COLUMN)?,
            pixels: find(PIXELS_COLUMN)?,
            weight: find(WEIGHT_COLUMN)?,
            dimensions: find(DIMENSIONS_COLUMN)?,
            price: find(PRICE_COLUMN)?,
        })
    }
}

/// Load all rows of a camera CSV file
pub fn load_csv(path: &Path) -> Result<Vec<CameraRecord>, DatasetError> {
    let csv_err = |source| DatasetError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;
    read_records(reader).map_err(|e| match e {
        ReadError::Csv(source) => csv_err(source),
        ReadError::Dataset(e) => e,
    })
}

/// Load rows from any CSV source with a header line
pub fn load_reader<R: Read>(source: R) -> Result<Vec<CameraRecord>, DatasetError> {
    let reader = csv::ReaderBuilder::new().flexible(true).from_reader(source);
    read_records(reader).map_err(|e| match e {
        ReadError::Csv(source) => DatasetError::Csv {
            path: "<reader>".into(),
            source,
        },
        ReadError::Dataset(e) => e,
    })
}

enum ReadError {
    Csv(csv::Error),
    Dataset(DatasetError),
}

fn read_records<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<CameraRecord>, ReadError> {
    let headers = reader.headers().map_err(ReadError::Csv)?.clone();
    let columns = ColumnIndex::from_headers(&headers).map_err(ReadError::Dataset)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(ReadError::Csv)?;
        records.push(CameraRecord {
            model: row
                .get(columns.model)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            effective_pixels: parse_number(row.get(columns.pixels)),
            weight: parse_number(row.get(columns.weight)),
            dimensions: parse_number(row.get(columns.dimensions)),
            price: parse_number(row.get(columns.price)),
        });
    }
    Ok(records)
}

fn parse_number(cell: Option<&str>) -> Option<f64> {
    cell.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Drop rows with missing numeric fields or non-positive pixels, weight or
/// volume. `brands` holds the derived brand of each record, index-aligned.
pub fn clean(records: &[CameraRecord], brands: &[String]) -> Vec<CleanRecord> {
    records
        .iter()
        .zip(brands)
        .filter_map(|(record, brand)| {
            let effective_pixels = record.effective_pixels?;
            let weight = record.weight?;
            let dimension_volume = record.dimensions?;
            let price = record.price?;
            if effective_pixels <= 0.0 || weight <= 0.0 || dimension_volume <= 0.0 {
                return None;
            }
            Some(CleanRecord {
                brand: brand.clone(),
                effective_pixels,
                weight,
                dimension_volume,
                price,
            })
        })
        .collect()
}
