//! Inference adapter
//!
//! The demultiplexer only needs "windows in, per-class scores out".
//! [`Classifier`] is that seam; the ONNX Runtime backend behind the
//! `onnx` feature is one implementation and tests plug in their own.

use std::path::{Path, PathBuf};

use config::MIN_MODEL_INPUT_SIZE;
use log::info;
use ndarray::{Array2, ArrayView2};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{0:?} does not exist")]
    Missing(PathBuf),
    #[error("model input has incorrect shape ({reason}) - are you sure that {path:?} is a valid model file?")]
    Shape { path: PathBuf, reason: String },
    #[error("two models have different number of barcode classes: {start} and {end}")]
    ClassMismatch { start: usize, end: usize },
    #[error("classifier returned scores of shape {got:?}, expected {expected:?}")]
    OutputShape {
        expected: (usize, usize),
        got: (usize, usize),
    },
    #[error("inference backend error: {0}")]
    Backend(String),
    #[error("{0}")]
    Unsupported(String),
}

/// A loaded barcode classifier
///
/// `predict` gets one row per window, each `input_size` samples
/// long, and must return one row of `output_size` scores per
/// window in the same order. Class 0 is the background class.
pub trait Classifier {
    fn input_size(&self) -> usize;

    fn output_size(&self) -> usize;

    fn predict(
        &self,
        windows: ArrayView2<'_, f32>,
        batch_size: usize,
    ) -> Result<Array2<f32>, ModelError>;
}

/// Check a model's tensor layout and return `(input_size, output_size)`
///
/// The model must take exactly one input shaped
/// `[batch, input_size, 1]` with `input_size > MIN_MODEL_INPUT_SIZE`
/// and produce `[batch, classes]` with at least one class.
pub fn validate_shape(
    path: &Path,
    input_count: usize,
    input_dims: &[i64],
    output_dims: &[i64],
) -> Result<(usize, usize), ModelError> {
    let shape_err = |reason: String| ModelError::Shape {
        path: path.to_path_buf(),
        reason,
    };

    if input_count != 1 {
        return Err(shape_err(format!("expected 1 input, found {}", input_count)));
    }
    if input_dims.len() < 3 {
        return Err(shape_err(format!("input dimensions {:?}", input_dims)));
    }
    if output_dims.len() < 2 {
        return Err(shape_err(format!("output dimensions {:?}", output_dims)));
    }

    let input_size = usize::try_from(input_dims[1]).unwrap_or(0);
    if input_size <= MIN_MODEL_INPUT_SIZE {
        return Err(shape_err(format!(
            "input window of {} samples",
            input_dims[1]
        )));
    }
    if input_dims[2] != 1 {
        return Err(shape_err(format!(
            "input channel dimension is {}, expected 1",
            input_dims[2]
        )));
    }

    let output_size = usize::try_from(output_dims[1]).unwrap_or(0);
    if output_size == 0 {
        return Err(shape_err(format!("{} output classes", output_dims[1])));
    }

    Ok((input_size, output_size))
}

/// Both sides of a dual-model run must agree on the class count
pub fn check_pair(start: &dyn Classifier, end: &dyn Classifier) -> Result<(), ModelError> {
    if start.output_size() != end.output_size() {
        return Err(ModelError::ClassMismatch {
            start: start.output_size(),
            end: end.output_size(),
        });
    }

    Ok(())
}

/// Load and validate a classifier from disk
pub fn load_classifier<P: AsRef<Path>>(path: P) -> Result<Box<dyn Classifier>, ModelError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(ModelError::Missing(path.to_path_buf()));
    }

    info!("Loading {:?} neural network...", path);
    let classifier = open_backend(path)?;
    info!(
        "Loaded {:?}: input size {}, {} classes",
        path,
        classifier.input_size(),
        classifier.output_size()
    );

    Ok(classifier)
}

#[cfg(feature = "onnx")]
fn open_backend(path: &Path) -> Result<Box<dyn Classifier>, ModelError> {
    Ok(Box::new(onnx::OnnxClassifier::load(path)?))
}

#[cfg(not(feature = "onnx"))]
fn open_backend(path: &Path) -> Result<Box<dyn Classifier>, ModelError> {
    Err(ModelError::Unsupported(format!(
        "cannot load {:?}: built without an inference backend (enable the `onnx` feature)",
        path
    )))
}

#[cfg(feature = "onnx")]
pub mod onnx {
    use std::path::Path;

    use ndarray::{concatenate, Array2, ArrayView2, Axis, Ix2};
    use ort::session::{builder::GraphOptimizationLevel, Session};
    use ort::value::{Tensor, ValueType};

    use super::{validate_shape, Classifier, ModelError};

    fn backend<E: std::fmt::Display>(e: E) -> ModelError {
        ModelError::Backend(e.to_string())
    }

    fn tensor_dims(value_type: &ValueType) -> Vec<i64> {
        match value_type {
            ValueType::Tensor { dimensions, .. } => dimensions.clone(),
            _ => Vec::new(),
        }
    }

    /// ONNX Runtime session wrapping an exported barcode model
    pub struct OnnxClassifier {
        session: Session,
        input_size: usize,
        output_size: usize,
    }

    impl OnnxClassifier {
        pub fn load(path: &Path) -> Result<Self, ModelError> {
            let session = Session::builder()
                .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
                .and_then(|b| b.commit_from_file(path))
                .map_err(backend)?;

            let input_dims = session
                .inputs
                .first()
                .map(|input| tensor_dims(&input.input_type))
                .unwrap_or_default();
            let output_dims = session
                .outputs
                .first()
                .map(|output| tensor_dims(&output.output_type))
                .unwrap_or_default();

            let (input_size, output_size) =
                validate_shape(path, session.inputs.len(), &input_dims, &output_dims)?;

            Ok(Self {
                session,
                input_size,
                output_size,
            })
        }
    }

    impl Classifier for OnnxClassifier {
        fn input_size(&self) -> usize {
            self.input_size
        }

        fn output_size(&self) -> usize {
            self.output_size
        }

        fn predict(
            &self,
            windows: ArrayView2<'_, f32>,
            batch_size: usize,
        ) -> Result<Array2<f32>, ModelError> {
            if windows.nrows() == 0 {
                return Ok(Array2::zeros((0, self.output_size)));
            }

            let mut chunks = Vec::new();
            for chunk in windows.axis_chunks_iter(Axis(0), batch_size.max(1)) {
                let tensor = Tensor::from_array(chunk.insert_axis(Axis(2)).to_owned())
                    .map_err(backend)?;
                let outputs = self
                    .session
                    .run(ort::inputs![tensor].map_err(backend)?)
                    .map_err(backend)?;

                let scores = outputs[0]
                    .try_extract_tensor::<f32>()
                    .map_err(backend)?
                    .into_dimensionality::<Ix2>()
                    .map_err(backend)?
                    .to_owned();
                chunks.push(scores);
            }

            let views = chunks.iter().map(|c| c.view()).collect::<Vec<_>>();
            concatenate(Axis(0), &views).map_err(backend)
        }
    }
}
