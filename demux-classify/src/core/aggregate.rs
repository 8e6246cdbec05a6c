use ndarray::{Array2, ArrayView2, Axis, Zip};

use crate::model::ModelError;

/// Per-class scores of one read, summing to 1 once aggregated
pub type ProbabilityVector = Vec<f64>;

/// Running element-wise maximum of window scores, one row per read
#[derive(Debug, Clone)]
pub struct MaxAccumulator {
    scores: Array2<f32>,
}

impl MaxAccumulator {
    pub fn new(reads: usize, classes: usize) -> Self {
        Self {
            scores: Array2::zeros((reads, classes)),
        }
    }

    /// Fold one scan step into the accumulator
    ///
    /// Row `i` of `step` must belong to the same read as row `i` of
    /// every previous step.
    pub fn update(&mut self, step: ArrayView2<'_, f32>) -> Result<(), ModelError> {
        if step.dim() != self.scores.dim() {
            return Err(ModelError::OutputShape {
                expected: self.scores.dim(),
                got: step.dim(),
            });
        }

        Zip::from(&mut self.scores)
            .and(&step)
            .for_each(|acc, &score| *acc = acc.max(score));

        Ok(())
    }

    /// Renormalise every read's maxima into a distribution
    ///
    /// Maxima are widened to f64 before dividing so the margin test
    /// downstream sees double-precision values.
    ///
    /// A read whose maxima sum to zero (or to something non-finite)
    /// gets a uniform vector, which the decision rule always
    /// resolves to "none".
    pub fn finish(self) -> Vec<ProbabilityVector> {
        let mut degenerate = 0usize;

        let probabilities = self
            .scores
            .axis_iter(Axis(0))
            .map(|row| {
                let total = row.iter().map(|&x| f64::from(x)).sum::<f64>();
                if total > 0.0 && total.is_finite() {
                    row.iter().map(|&x| f64::from(x) / total).collect()
                } else {
                    degenerate += 1;
                    vec![1.0 / row.len() as f64; row.len()]
                }
            })
            .collect();

        if degenerate > 0 {
            log::warn!(
                "{} reads had all-zero class scores and were set to a uniform distribution",
                degenerate
            );
        }

        probabilities
    }
}
