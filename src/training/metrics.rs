//! Held-out evaluation metrics for trained classifiers

use serde::{Deserialize, Serialize};

/// Confusion Matrix for multi-class classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Number of classes
    pub num_classes: usize,

    /// Matrix data (row = actual, column = predicted), row-major
    pub matrix: Vec<usize>,
}

impl ConfusionMatrix {
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            matrix: vec![0; num_classes * num_classes],
        }
    }

    /// Create confusion matrix from predictions and ground truth
    pub fn from_predictions(
        predictions: &[usize],
        ground_truth: &[usize],
        num_classes: usize,
    ) -> Self {
        let mut cm = Self::new(num_classes);

        for (&pred, &actual) in predictions.iter().zip(ground_truth.iter()) {
            cm.add(actual, pred);
        }

        cm
    }

    /// Add a single prediction to the matrix
    pub fn add(&mut self, actual: usize, predicted: usize) {
        if actual < self.num_classes && predicted < self.num_classes {
            let idx = actual * self.num_classes + predicted;
            self.matrix[idx] += 1;
        }
    }

    /// Count at (actual, predicted)
    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        if actual < self.num_classes && predicted < self.num_classes {
            self.matrix[actual * self.num_classes + predicted]
        } else {
            0
        }
    }

    pub fn total(&self) -> usize {
        self.matrix.iter().sum()
    }

    /// Number of correct predictions (diagonal sum)
    pub fn correct(&self) -> usize {
        (0..self.num_classes).map(|i| self.get(i, i)).sum()
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total > 0 {
            self.correct() as f64 / total as f64
        } else {
            0.0
        }
    }

    /// F1 for one class; 0 when the class is never predicted or never present
    pub fn f1(&self, class_idx: usize) -> f64 {
        let tp = self.get(class_idx, class_idx);
        let predicted: usize = (0..self.num_classes).map(|i| self.get(i, class_idx)).sum();
        let actual: usize = (0..self.num_classes).map(|i| self.get(class_idx, i)).sum();

        let precision = if predicted > 0 {
            tp as f64 / predicted as f64
        } else {
            0.0
        };
        let recall = if actual > 0 {
            tp as f64 / actual as f64
        } else {
            0.0
        };

        if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        }
    }

    /// Unweighted mean F1 over classes that appear as actual or predicted labels
    pub fn macro_f1(&self) -> f64 {
        let seen: Vec<usize> = (0..self.num_classes)
            .filter(|&c| {
                (0..self.num_classes).any(|i| self.get(c, i) > 0 || self.get(i, c) > 0)
            })
            .collect();

        if seen.is_empty() {
            return 0.0;
        }
        seen.iter().map(|&c| self.f1(c)).sum::<f64>() / seen.len() as f64
    }
}
