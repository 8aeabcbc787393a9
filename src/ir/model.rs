//! Annotation model shared by the XML and label-file readers.
//!
//! An [`AnnotatedImage`] lives only for the duration of one file's
//! conversion: it is parsed, translated to the target format and dropped.

use std::collections::BTreeMap;
use std::path::Path;

use super::bbox::{BBoxXYXY, ImageSize, Pixel};

/// One object instance: a class name and its pixel-space box.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    /// Raw class name as written in the annotation file.
    pub name: String,

    /// Bounding box in pixel coordinates.
    pub bbox: BBoxXYXY<Pixel>,

    /// Optional per-object fields carried through XML (pose, truncated, difficult).
    pub attributes: BTreeMap<String, String>,
}

impl Annotation {
    pub fn new(name: impl Into<String>, bbox: BBoxXYXY<Pixel>) -> Self {
        Self {
            name: name.into(),
            bbox,
            attributes: BTreeMap::new(),
        }
    }
}

/// The full annotation set of one source image.
///
/// `stem` is the join key across the pipeline: the file name with its
/// directory and extension stripped, compared case-sensitively.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotatedImage {
    /// Basename shared by the image asset and its annotation file.
    pub stem: String,

    /// Image file name as recorded in `<filename>`, if any.
    pub file_name: Option<String>,

    /// Image folder as recorded in `<folder>`, if any.
    pub folder: Option<String>,

    /// Image path as recorded in `<path>`, if any.
    pub path: Option<String>,

    pub size: ImageSize,

    /// Channel count, if known.
    pub depth: Option<u32>,

    /// Objects in document order.
    pub annotations: Vec<Annotation>,
}

impl AnnotatedImage {
    pub fn new(stem: impl Into<String>, size: ImageSize) -> Self {
        Self {
            stem: stem.into(),
            file_name: None,
            folder: None,
            path: None,
            size,
            depth: None,
            annotations: Vec::new(),
        }
    }
}

/// Returns the join-key basename of `path`: file name without directory or extension.
pub fn stem_of(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(ToOwned::to_owned)
}
