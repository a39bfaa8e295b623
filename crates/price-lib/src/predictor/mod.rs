//! Price prediction engine

mod features;
mod gbr;
mod output;
mod tree;

pub use features::{
    request_examples, BrandField, BrandResolution, FeatureVectorizer, FriendlyRequest, Numeric,
    PredictRequest, RawRequest, ResolvedFeatures, UnresolvedBrandPolicy, AUTO_DETECT_SENTINELS,
    DEFAULT_DIMENSION_VOLUME,
};
pub use gbr::GradientBoostingRegressor;
pub use output::{format_response, round_price, PRICE_DECIMALS};
pub use tree::{RegressionTree, TreeNode, TreeParams};

use crate::error::ModelError;
use crate::models::FeatureVector;

/// Trait for fitted price models
pub trait PriceModel: Send + Sync {
    /// Raw (unrounded) price for a feature vector
    fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError>;
}
