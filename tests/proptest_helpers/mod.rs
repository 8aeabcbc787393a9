#![allow(dead_code)]

use labelprep::ir::io_yolo::LabelRow;
use labelprep::ir::{BBoxXYXY, ImageSize, Pixel, YoloBox};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

/// Label files keep six decimals.
pub const EPS_LABEL: f64 = 5e-7;

pub fn eps_pixel(size: ImageSize) -> f64 {
    size.width.max(size.height) * 1e-9
}

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

pub fn arb_image_dims() -> BoxedStrategy<(u32, u32)> {
    (2u32..=4096, 2u32..=4096).boxed()
}

/// An integer-cornered box inside a `width x height` image.
pub fn arb_bbox_within(width: u32, height: u32) -> BoxedStrategy<BBoxXYXY<Pixel>> {
    prop::num::u32::ANY
        .prop_map(move |seed| {
            bbox_from_seed(
                width,
                height,
                seed,
                seed.rotate_left(3),
                seed.rotate_left(7),
                seed.rotate_left(11),
            )
        })
        .boxed()
}

/// An image size with one box inside it.
pub fn arb_sized_bbox() -> BoxedStrategy<(ImageSize, BBoxXYXY<Pixel>)> {
    arb_image_dims()
        .prop_flat_map(|(width, height)| {
            arb_bbox_within(width, height)
                .prop_map(move |bbox| (ImageSize::from((width, height)), bbox))
        })
        .boxed()
}

pub fn arb_label_row(max_class: usize) -> BoxedStrategy<LabelRow> {
    (0..=max_class, 0.0f64..=1.0, 0.0f64..=1.0, 0.0f64..=1.0, 0.0f64..=1.0)
        .prop_map(|(class_id, cx, cy, w, h)| {
            LabelRow::new(class_id, YoloBox::from_cxcywh(cx, cy, w, h))
        })
        .boxed()
}

pub fn arb_label_rows(max_rows: usize) -> BoxedStrategy<Vec<LabelRow>> {
    proptest::collection::vec(arb_label_row(79), 0..=max_rows).boxed()
}

pub fn rows_equivalent(a: &[LabelRow], b: &[LabelRow], eps: f64) -> Result<(), String> {
    if a.len() != b.len() {
        return Err(format!("row count mismatch: left={} right={}", a.len(), b.len()));
    }
    for (idx, (left, right)) in a.iter().zip(b).enumerate() {
        if left.class_id != right.class_id {
            return Err(format!(
                "row {idx}: class id {} != {}",
                left.class_id, right.class_id
            ));
        }
        let l = left.bbox.to_tuple();
        let r = right.bbox.to_tuple();
        let close = [(l.0, r.0), (l.1, r.1), (l.2, r.2), (l.3, r.3)]
            .iter()
            .all(|(x, y)| (x - y).abs() <= eps);
        if !close {
            return Err(format!("row {idx}: {l:?} != {r:?} (eps={eps})"));
        }
    }
    Ok(())
}

fn bbox_from_seed(width: u32, height: u32, sx: u32, sy: u32, sw: u32, sh: u32) -> BBoxXYXY<Pixel> {
    let xmin = sx % (width - 1);
    let ymin = sy % (height - 1);
    let xmax = xmin + 1 + (sw % (width - xmin));
    let ymax = ymin + 1 + (sh % (height - ymin));

    BBoxXYXY::from_xyxy(xmin as f64, ymin as f64, xmax as f64, ymax as f64)
}
