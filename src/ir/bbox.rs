//! Bounding box types: corner form (XYXY) and center form (CXCYWH).
//!
//! The coordinate space is a type parameter, so pixel boxes read from XML
//! cannot be written out as label geometry without going through
//! [`super::normalize`].

use std::marker::PhantomData;

/// Absolute pixel coordinates, origin at the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Fractions of the image width and height.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Normalized {}

/// An axis-aligned bounding box in corner form (xmin, ymin, xmax, ymax).
///
/// The constructor does not enforce `min < max`: boxes read from annotation
/// files are represented as written so that checks can report them.
#[derive(Clone, Copy, PartialEq)]
pub struct BBoxXYXY<TSpace> {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> BBoxXYXY<TSpace> {
    /// Creates a new bounding box from explicit corner coordinates.
    #[inline]
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
            _space: PhantomData,
        }
    }

    /// Returns the width of the bounding box.
    ///
    /// May be negative if the box is malformed (xmax < xmin).
    #[inline]
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// Returns the height of the bounding box.
    ///
    /// May be negative if the box is malformed (ymax < ymin).
    #[inline]
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Returns true if the box is properly ordered (min <= max for both axes).
    #[inline]
    pub fn is_ordered(&self) -> bool {
        self.xmin <= self.xmax && self.ymin <= self.ymax
    }
}

impl<TSpace> std::fmt::Debug for BBoxXYXY<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BBoxXYXY")
            .field("xmin", &self.xmin)
            .field("ymin", &self.ymin)
            .field("xmax", &self.xmax)
            .field("ymax", &self.ymax)
            .finish()
    }
}

impl<TSpace> Default for BBoxXYXY<TSpace> {
    fn default() -> Self {
        Self::from_xyxy(0.0, 0.0, 0.0, 0.0)
    }
}

/// An axis-aligned bounding box in center form (cx, cy, w, h).
#[derive(Clone, Copy, PartialEq)]
pub struct BBoxCxCyWh<TSpace> {
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
    pub h: f64,
    _space: PhantomData<TSpace>,
}

/// A normalized, center-relative box as stored in YOLO label files.
pub type YoloBox = BBoxCxCyWh<Normalized>;

impl<TSpace> BBoxCxCyWh<TSpace> {
    #[inline]
    pub fn from_cxcywh(cx: f64, cy: f64, w: f64, h: f64) -> Self {
        Self {
            cx,
            cy,
            w,
            h,
            _space: PhantomData,
        }
    }

    /// Returns the four fields in label-file order.
    #[inline]
    pub fn to_tuple(&self) -> (f64, f64, f64, f64) {
        (self.cx, self.cy, self.w, self.h)
    }
}

impl BBoxCxCyWh<Normalized> {
    /// Returns true if every field lies in the closed unit interval.
    ///
    /// NaN fields are never in range.
    pub fn is_in_unit_range(&self) -> bool {
        [self.cx, self.cy, self.w, self.h]
            .iter()
            .all(|v| (0.0..=1.0).contains(v))
    }
}

impl<TSpace> std::fmt::Debug for BBoxCxCyWh<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BBoxCxCyWh")
            .field("cx", &self.cx)
            .field("cy", &self.cy)
            .field("w", &self.w)
            .field("h", &self.h)
            .finish()
    }
}

/// Image dimensions in pixels.
///
/// Stored as floats so that zero or negative sizes coming from malformed
/// annotation files can be represented and rejected by [`super::normalize`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageSize {
    pub width: f64,
    pub height: f64,
}

impl ImageSize {
    #[inline]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Returns true if both dimensions are finite and strictly positive.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

impl From<(u32, u32)> for ImageSize {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width as f64, height as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_from_xyxy() {
        let bbox: BBoxXYXY<Pixel> = BBoxXYXY::from_xyxy(10.0, 20.0, 100.0, 80.0);
        assert_eq!(bbox.xmin, 10.0);
        assert_eq!(bbox.ymin, 20.0);
        assert_eq!(bbox.xmax, 100.0);
        assert_eq!(bbox.ymax, 80.0);
        assert_eq!(bbox.width(), 90.0);
        assert_eq!(bbox.height(), 60.0);
    }

    #[test]
    fn test_bbox_ordering() {
        let ordered: BBoxXYXY<Pixel> = BBoxXYXY::from_xyxy(10.0, 20.0, 100.0, 80.0);
        assert!(ordered.is_ordered());

        let unordered: BBoxXYXY<Pixel> = BBoxXYXY::from_xyxy(100.0, 80.0, 10.0, 20.0);
        assert!(!unordered.is_ordered());
    }

    #[test]
    fn test_yolo_box_unit_range() {
        assert!(YoloBox::from_cxcywh(0.5, 0.5, 1.0, 0.0).is_in_unit_range());
        assert!(!YoloBox::from_cxcywh(0.5, 0.5, 1.5, 0.2).is_in_unit_range());
        assert!(!YoloBox::from_cxcywh(f64::NAN, 0.5, 0.5, 0.5).is_in_unit_range());
    }

    #[test]
    fn test_image_size_validity() {
        assert!(ImageSize::new(640.0, 480.0).is_valid());
        assert!(!ImageSize::new(0.0, 480.0).is_valid());
        assert!(!ImageSize::new(640.0, -1.0).is_valid());
    }
}
