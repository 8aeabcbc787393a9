use std::path::PathBuf;
use thiserror::Error;

use crate::validation::ValidationReport;

/// The main error type for labelprep operations.
///
/// Only run-level failures live here. Problems confined to a single file of
/// a corpus walk are collected into the relevant report instead.
#[derive(Debug, Error)]
pub enum LabelprepError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid geometry: image size {width}x{height} must be positive")]
    InvalidGeometry { width: f64, height: f64 },

    #[error("Malformed annotation {path}: {message}")]
    MalformedAnnotation { path: PathBuf, message: String },

    #[error("Failed to parse XML {path}: {message}")]
    XmlParse { path: PathBuf, message: String },

    #[error("Input directory does not exist: {path}")]
    InputDirMissing { path: PathBuf },

    #[error("Number of image directories ({images}) must match number of label directories ({labels})")]
    DirPairMismatch { images: usize, labels: usize },

    #[error("No class source given: provide a class list, a class config, or request a frequency scan")]
    MissingClassSource,

    #[error("Invalid class list: {message}")]
    InvalidClassList { message: String },

    #[error("Failed to parse class file {path}: {source}")]
    ClassConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid class file {path}: {message}")]
    ClassFileInvalid { path: PathBuf, message: String },

    #[error("Failed to probe image {path}: {source}")]
    ImageProbe {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Invalid split parameters: {message}")]
    InvalidSplitParams { message: String },

    #[error("No image files found in any of the specified directories")]
    NoImagesFound,

    #[error("Analysis failed: {message}")]
    AnalysisFailed { message: String },

    #[error("Failed to serialize report: {source}")]
    ReportSerialize {
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to traverse {path}: {message}")]
    Traverse { path: PathBuf, message: String },

    #[error("Validation failed with {error_count} error(s) and {warning_count} warning(s)")]
    ValidationFailed {
        error_count: usize,
        warning_count: usize,
        report: Box<ValidationReport>,
    },

    #[error("Conversion finished with {failed} failed file(s) out of {total}")]
    ConversionFailed { failed: usize, total: usize },
}
