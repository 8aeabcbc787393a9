//! Conversion between pixel corner boxes and normalized center boxes.

use super::bbox::{BBoxXYXY, ImageSize, Pixel, YoloBox};
use crate::error::LabelprepError;

/// How normalized boxes are mapped back to pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DenormalizeMode {
    /// Exact inverse of [`normalize`].
    #[default]
    Clean,
    /// Reproduces older XML exports: shifts the center by +1 pixel and
    /// truncates every corner towards zero.
    Legacy,
}

/// Converts a pixel box to normalized center form.
///
/// `cx = ((xmin + xmax) / 2) / width`, `w = (xmax - xmin) / width`, and the
/// same along y.
pub fn normalize(bbox: &BBoxXYXY<Pixel>, size: ImageSize) -> Result<YoloBox, LabelprepError> {
    check_size(size)?;

    Ok(YoloBox::from_cxcywh(
        (bbox.xmin + bbox.xmax) / 2.0 / size.width,
        (bbox.ymin + bbox.ymax) / 2.0 / size.height,
        bbox.width() / size.width,
        bbox.height() / size.height,
    ))
}

/// Converts a normalized center box back to pixel corners.
pub fn denormalize(
    bbox: &YoloBox,
    size: ImageSize,
    mode: DenormalizeMode,
) -> Result<BBoxXYXY<Pixel>, LabelprepError> {
    check_size(size)?;

    let cx = bbox.cx * size.width;
    let cy = bbox.cy * size.height;
    let half_w = bbox.w * 0.5 * size.width;
    let half_h = bbox.h * 0.5 * size.height;

    Ok(match mode {
        DenormalizeMode::Clean => {
            BBoxXYXY::from_xyxy(cx - half_w, cy - half_h, cx + half_w, cy + half_h)
        }
        DenormalizeMode::Legacy => BBoxXYXY::from_xyxy(
            ((cx + 1.0) - half_w).trunc(),
            ((cy + 1.0) - half_h).trunc(),
            ((cx + 1.0) + half_w).trunc(),
            ((cy + 1.0) + half_h).trunc(),
        ),
    })
}

fn check_size(size: ImageSize) -> Result<(), LabelprepError> {
    if size.is_valid() {
        Ok(())
    } else {
        Err(LabelprepError::InvalidGeometry {
            width: size.width,
            height: size.height,
        })
    }
}
