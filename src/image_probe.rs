//! Image probing and decode checks, backed by the `image` crate.

use std::path::Path;

use image::{ImageDecoder, ImageReader};

use crate::error::LabelprepError;
use crate::ir::ImageSize;

/// Header facts about an image file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    /// Channel count.
    pub depth: u32,
}

impl ImageInfo {
    pub fn size(&self) -> ImageSize {
        ImageSize::from((self.width, self.height))
    }
}

/// Read dimensions and channel count without decoding pixel data.
///
/// The format is guessed from the file contents, not the extension.
pub fn probe(path: &Path) -> Result<ImageInfo, LabelprepError> {
    let decoder = ImageReader::open(path)
        .map_err(LabelprepError::Io)?
        .with_guessed_format()
        .map_err(LabelprepError::Io)?
        .into_decoder()
        .map_err(|source| LabelprepError::ImageProbe {
            path: path.to_path_buf(),
            source,
        })?;

    let (width, height) = decoder.dimensions();
    Ok(ImageInfo {
        width,
        height,
        depth: u32::from(decoder.color_type().channel_count()),
    })
}

/// Fully decode an image, failing if any part of it is unreadable.
pub fn check_decodes(path: &Path) -> Result<(), LabelprepError> {
    ImageReader::open(path)
        .map_err(LabelprepError::Io)?
        .with_guessed_format()
        .map_err(LabelprepError::Io)?
        .decode()
        .map(|_| ())
        .map_err(|source| LabelprepError::ImageProbe {
            path: path.to_path_buf(),
            source,
        })
}
