//! Annotation model and file formats for labelprep.
//!
//! Two on-disk formats meet here: per-image XML documents with pixel corner
//! boxes and per-image label files with normalized center boxes. Both are
//! read into the types below, and [`normalize`] moves geometry between the
//! two coordinate spaces.
//!
//! # Design Principles
//!
//! 1. **Type Safety**: Marker types keep pixel and normalized geometry apart
//!    at compile time.
//!
//! 2. **Permissive Construction**: Boxes may hold out-of-range or inverted
//!    coordinates, so that the validator can report them instead of the
//!    readers failing.
//!
//! # Example
//!
//! ```
//! use labelprep::ir::{normalize, BBoxXYXY, ImageSize, Pixel};
//!
//! let bbox = BBoxXYXY::<Pixel>::from_xyxy(20.0, 10.0, 60.0, 50.0);
//! let yolo = normalize(&bbox, ImageSize::new(200.0, 100.0)).unwrap();
//! assert!((yolo.cx - 0.2).abs() < 1e-12);
//! ```

mod bbox;
mod ids;
pub mod io_voc_xml;
pub mod io_yolo;
mod model;
mod normalize;

pub use bbox::{BBoxCxCyWh, BBoxXYXY, ImageSize, Normalized, Pixel, YoloBox};
pub use ids::ClassId;
pub use model::{stem_of, AnnotatedImage, Annotation};
pub use normalize::{denormalize, normalize, DenormalizeMode};
