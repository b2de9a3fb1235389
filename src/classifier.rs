//! Multiclass classification over sparse binary feature vectors.
//!
//! The parser only needs `predict(vector) -> class id` and `fit(vectors,
//! labels)` from a classifier; [`Classifier`] captures that seam so the
//! concrete model can be swapped without touching the transition system.
//! [`LinearSvm`] is the reference implementation.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Binary vector stored as its sorted set of active columns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SparseVector {
    dim: usize,
    indices: Vec<usize>,
}

impl SparseVector {
    /// Build a vector of dimension `dim`; out-of-range and repeated columns
    /// are dropped.
    pub fn new(dim: usize, mut indices: Vec<usize>) -> Self {
        indices.retain(|&idx| idx < dim);
        indices.sort_unstable();
        indices.dedup();
        Self { dim, indices }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Active columns in ascending order.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// A trained (or trainable) multiclass classifier.
///
/// Implementations are shared read-only across parsing threads once
/// fitted.
pub trait Classifier: Send + Sync {
    /// Batch fit on paired vectors and class ids in `0..n_classes`.
    fn fit(
        &mut self,
        vectors: &[SparseVector],
        labels: &[usize],
        n_features: usize,
        n_classes: usize,
    ) -> Result<(), ModelError>;

    /// One score per class; higher is more confident.
    fn decision_function(&self, vector: &SparseVector) -> Vec<f64>;

    fn n_classes(&self) -> usize;

    fn n_features(&self) -> usize;

    /// Check that the fitted parameters agree with each other.
    ///
    /// Run when a model is assembled from stored parts.
    fn validate(&self) -> Result<(), ModelError> {
        Ok(())
    }

    /// Highest scoring class id. Ties go to the lowest id.
    fn predict(&self, vector: &SparseVector) -> usize {
        self.ranked_classes(vector).first().copied().unwrap_or(0)
    }

    /// All class ids ordered by descending score, lowest id first on ties.
    fn ranked_classes(&self, vector: &SparseVector) -> Vec<usize> {
        let scores = self.decision_function(vector);
        let mut ranked: Vec<usize> = (0..scores.len()).collect();
        ranked.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(Ordering::Equal)
                .then(a.cmp(&b))
        });
        ranked
    }
}

/// Hyper-parameters for [`LinearSvm`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearSvmParams {
    /// L2 regularization strength
    pub lambda: f64,
    /// Passes over the training data
    pub epochs: usize,
}

impl Default for LinearSvmParams {
    fn default() -> Self {
        Self {
            lambda: 1e-4,
            epochs: 10,
        }
    }
}

/// One-vs-rest linear margin classifier.
///
/// Each class gets a hinge-loss binary separator trained with
/// Pegasos-style sub-gradient steps. Samples are visited in input order,
/// so training is fully deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearSvm {
    params: LinearSvmParams,
    n_features: usize,
    /// Class-major weight rows
    weights: Vec<Vec<f64>>,
    biases: Vec<f64>,
}

impl Default for LinearSvm {
    fn default() -> Self {
        Self::new(LinearSvmParams::default())
    }
}

impl LinearSvm {
    pub fn new(params: LinearSvmParams) -> Self {
        Self {
            params,
            n_features: 0,
            weights: Vec::new(),
            biases: Vec::new(),
        }
    }

    pub fn params(&self) -> LinearSvmParams {
        self.params
    }

    fn fit_binary(
        &self,
        vectors: &[SparseVector],
        labels: &[usize],
        class: usize,
    ) -> (Vec<f64>, f64) {
        let lambda = self.params.lambda;
        // w = scale * v keeps the shrink step O(1)
        let mut v = vec![0.0; self.n_features];
        let mut scale = 1.0_f64;
        let mut bias = 0.0_f64;
        let mut step = 0usize;

        for _ in 0..self.params.epochs {
            for (vector, &label) in vectors.iter().zip(labels) {
                step += 1;
                let eta = 1.0 / (lambda * (step + 1) as f64);
                let y = if label == class { 1.0 } else { -1.0 };
                let dot: f64 = vector.indices().iter().map(|&idx| v[idx]).sum();
                let margin = y * (scale * dot + bias);

                scale *= 1.0 - eta * lambda;
                if margin < 1.0 {
                    let delta = eta * y / scale;
                    for &idx in vector.indices() {
                        v[idx] += delta;
                    }
                    bias += eta * y * lambda;
                }

                if scale < 1e-9 {
                    v.iter_mut().for_each(|w| *w *= scale);
                    scale = 1.0;
                }
            }
        }

        v.iter_mut().for_each(|w| *w *= scale);
        (v, bias)
    }
}

impl Classifier for LinearSvm {
    fn fit(
        &mut self,
        vectors: &[SparseVector],
        labels: &[usize],
        n_features: usize,
        n_classes: usize,
    ) -> Result<(), ModelError> {
        if vectors.len() != labels.len() {
            return Err(ModelError::LengthMismatch {
                vectors: vectors.len(),
                labels: labels.len(),
            });
        }
        if vectors.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if let Some(&class) = labels.iter().find(|&&label| label >= n_classes) {
            return Err(ModelError::UnknownClass {
                class,
                labels: n_classes,
            });
        }

        self.n_features = n_features;
        let (weights, biases) = (0..n_classes)
            .map(|class| self.fit_binary(vectors, labels, class))
            .unzip();
        self.weights = weights;
        self.biases = biases;
        tracing::debug!(
            samples = vectors.len(),
            features = n_features,
            classes = n_classes,
            "fitted one-vs-rest linear classifier"
        );
        Ok(())
    }

    fn decision_function(&self, vector: &SparseVector) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.biases)
            .map(|(row, bias)| {
                bias + vector
                    .indices()
                    .iter()
                    .filter_map(|&idx| row.get(idx))
                    .sum::<f64>()
            })
            .collect()
    }

    fn n_classes(&self) -> usize {
        self.weights.len()
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.biases.len() != self.weights.len() {
            return Err(ModelError::Corrupt {
                message: format!(
                    "classifier has {} weight rows but {} biases",
                    self.weights.len(),
                    self.biases.len()
                ),
            });
        }
        if let Some((class, row)) = self
            .weights
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != self.n_features)
        {
            return Err(ModelError::Corrupt {
                message: format!(
                    "weight row {} has {} entries, expected {}",
                    class,
                    row.len(),
                    self.n_features
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_data() -> (Vec<SparseVector>, Vec<usize>) {
        // class = which of the first three columns is active; column 3 is noise
        let vectors = vec![
            SparseVector::new(4, vec![0]),
            SparseVector::new(4, vec![1, 3]),
            SparseVector::new(4, vec![2]),
            SparseVector::new(4, vec![0, 3]),
            SparseVector::new(4, vec![1]),
            SparseVector::new(4, vec![2, 3]),
        ];
        (vectors, vec![0, 1, 2, 0, 1, 2])
    }

    #[test]
    fn test_sparse_vector_normalizes_indices() {
        let vector = SparseVector::new(5, vec![3, 1, 3, 9]);
        assert_eq!(vector.indices(), &[1, 3]);
        assert_eq!(vector.nnz(), 2);
        assert_eq!(vector.dim(), 5);
    }

    #[test]
    fn test_fit_separable_data() {
        let (vectors, labels) = toy_data();
        let mut svm = LinearSvm::new(LinearSvmParams {
            lambda: 0.01,
            epochs: 50,
        });
        svm.fit(&vectors, &labels, 4, 3).unwrap();
        assert_eq!(svm.n_classes(), 3);
        assert_eq!(svm.n_features(), 4);
        for (vector, &label) in vectors.iter().zip(&labels) {
            assert_eq!(svm.predict(vector), label);
        }
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (vectors, labels) = toy_data();
        let mut a = LinearSvm::default();
        let mut b = LinearSvm::default();
        a.fit(&vectors, &labels, 4, 3).unwrap();
        b.fit(&vectors, &labels, 4, 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_ranked_classes_orders_by_score() {
        let svm = LinearSvm {
            params: LinearSvmParams::default(),
            n_features: 2,
            weights: vec![vec![0.5, 0.0], vec![1.0, 0.0], vec![0.5, 0.0]],
            biases: vec![0.0, 0.0, 0.0],
        };
        let vector = SparseVector::new(2, vec![0]);
        assert_eq!(svm.ranked_classes(&vector), vec![1, 0, 2]);
        assert_eq!(svm.predict(&vector), 1);
    }

    #[test]
    fn test_validate_checks_parameter_shapes() {
        let (vectors, labels) = toy_data();
        let mut svm = LinearSvm::default();
        svm.fit(&vectors, &labels, 4, 3).unwrap();
        assert!(svm.validate().is_ok());

        let mut short_biases = svm.clone();
        short_biases.biases.pop();
        assert!(matches!(short_biases.validate(), Err(ModelError::Corrupt { .. })));

        let mut short_row = svm.clone();
        short_row.weights[1].truncate(2);
        assert!(matches!(short_row.validate(), Err(ModelError::Corrupt { .. })));
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        let mut svm = LinearSvm::default();
        assert!(matches!(svm.fit(&[], &[], 3, 2), Err(ModelError::EmptyTrainingSet)));
        assert!(matches!(
            svm.fit(&[SparseVector::new(3, vec![0])], &[0, 1], 3, 2),
            Err(ModelError::LengthMismatch { vectors: 1, labels: 2 })
        ));
        assert!(matches!(
            svm.fit(&[SparseVector::new(3, vec![0])], &[5], 3, 2),
            Err(ModelError::UnknownClass { class: 5, labels: 2 })
        ));
    }
}
