//! Bidirectional brand label <-> integer code mapping
//!
//! Built once from the training vocabulary and persisted inside the model
//! bundle. Codes are assigned in lexicographic label order and form the
//! contiguous range `0..len()`.

use crate::error::EncoderError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CategoryEncoder {
    classes: Vec<String>,
    codes: HashMap<String, usize>,
}

impl CategoryEncoder {
    /// Fit the encoder on the labels observed in training data
    pub fn fit<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let classes: BTreeSet<String> = labels.into_iter().map(Into::into).collect();
        Self::from_sorted(classes.into_iter().collect())
    }

    fn from_sorted(classes: Vec<String>) -> Self {
        let codes = classes
            .iter()
            .enumerate()
            .map(|(code, label)| (label.clone(), code))
            .collect();
        Self { classes, codes }
    }

    /// Look up the code of a label seen during training
    pub fn encode(&self, label: &str) -> Result<usize, EncoderError> {
        self.codes
            .get(label)
            .copied()
            .ok_or_else(|| EncoderError::UnknownCategory(label.to_string()))
    }

    /// Look up the label for a code
    pub fn decode(&self, code: i64) -> Result<&str, EncoderError> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| self.classes.get(idx))
            .map(String::as_str)
            .ok_or(EncoderError::InvalidCode {
                code,
                size: self.classes.len(),
            })
    }

    /// Number of distinct labels (`K`)
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// `(label, code)` pairs in code order
    pub fn entries(&self) -> impl Iterator<Item = (&str, usize)> {
        self.classes
            .iter()
            .enumerate()
            .map(|(code, label)| (label.as_str(), code))
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

impl TryFrom<Vec<String>> for CategoryEncoder {
    type Error = String;

    fn try_from(classes: Vec<String>) -> Result<Self, Self::Error> {
        if classes.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err("encoder classes must be sorted and unique".to_string());
        }
        Ok(Self::from_sorted(classes))
    }
}

impl From<CategoryEncoder> for Vec<String> {
    fn from(encoder: CategoryEncoder) -> Self {
        encoder.classes
    }
}
