use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for silo detection.
///
/// Numeric failures of the inference pipeline (`DegenerateInput`, `ShapeMismatch`)
/// are kept apart from the I/O and runtime failures of the surrounding glue so that
/// callers can reject a bad tile without parsing error strings.
#[derive(Error, Debug)]
pub enum SiloError {
    #[error("Degenerate input: every sample equals {min}, cannot rescale to [0, 1]")]
    DegenerateInput { min: f64 },

    #[error("Shape mismatch in {context}: expected {expected}, got {actual:?}")]
    ShapeMismatch {
        context: String,
        expected: String,
        actual: Vec<usize>,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image processing error: {operation} failed (file: {path})")]
    ImageProcessing {
        path: String,
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Model error: {operation} failed")]
    Model {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {field} {reason}")]
    Validation { field: String, reason: String },
}

pub type Result<T> = std::result::Result<T, SiloError>;

impl SiloError {
    pub(crate) fn shape_mismatch(
        context: impl Into<String>,
        expected: impl Into<String>,
        actual: &[usize],
    ) -> Self {
        Self::ShapeMismatch {
            context: context.into(),
            expected: expected.into(),
            actual: actual.to_vec(),
        }
    }
}

/// Convert I/O errors to filesystem errors.
///
/// Code that knows the path and operation should build `SiloError::FileSystem`
/// directly; this is only the fallback for bare `?`.
impl From<std::io::Error> for SiloError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

impl From<image::ImageError> for SiloError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageProcessing {
            path: "unknown".to_string(),
            operation: "image processing".to_string(),
            source: Box::new(err),
        }
    }
}

impl From<ort::Error> for SiloError {
    fn from(err: ort::Error) -> Self {
        Self::Model {
            operation: "ort operation".to_string(),
            source: Box::new(err),
        }
    }
}

/// Shape errors from ndarray only arise while reshaping tensors, so they are
/// reported as shape mismatches rather than model failures.
impl From<ndarray::ShapeError> for SiloError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::ShapeMismatch {
            context: format!("tensor shape conversion ({err})"),
            expected: "compatible shape".to_string(),
            actual: Vec::new(),
        }
    }
}
