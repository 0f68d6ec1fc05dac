//! Label encoder between crop names and class indices

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::LabelDecoder;
use crate::utils::{CropAdvisorError, Result};

/// Sorted, de-duplicated class names. Index `i` is class `i` of every classifier
/// trained alongside this encoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    /// Build from an explicit class list, sorting and de-duplicating it
    pub fn new(classes: Vec<String>) -> Self {
        let set: BTreeSet<String> = classes.into_iter().collect();
        Self {
            classes: set.into_iter().collect(),
        }
    }

    /// Fit on observed labels
    pub fn fit<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self::new(labels.into_iter().map(str::to_string).collect())
    }

    /// Class index of a label
    pub fn transform(&self, label: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .ok()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.classes.is_empty() {
            return Err(CropAdvisorError::Artifact("label encoder has no classes".into()));
        }
        if self.classes.windows(2).any(|w| w[0] >= w[1]) {
            return Err(CropAdvisorError::Artifact(
                "label encoder classes must be sorted and unique".into(),
            ));
        }
        Ok(())
    }
}

impl LabelDecoder for LabelEncoder {
    fn inverse_transform(&self, index: usize) -> Result<String> {
        self.classes.get(index).cloned().ok_or_else(|| {
            CropAdvisorError::Artifact(format!(
                "class index {} outside encoder range 0..{}",
                index,
                self.classes.len()
            ))
        })
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }
}
