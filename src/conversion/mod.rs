//! Corpus conversion between XML annotations and normalized label files.
//!
//! Both directions walk a closed set of input files and write exactly one
//! output file per input. A file that cannot be converted is recorded in
//! the [`ConversionSummary`] and the walk moves on.

pub mod report;

pub use report::{ConversionIssue, ConversionIssueCode, ConversionSeverity, ConversionSummary};

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::classes::ClassRegistry;
use crate::error::LabelprepError;
use crate::image_probe;
use crate::ir::io_voc_xml::{collect_xml_files, read_voc_xml, write_voc_xml, VOC_XML_EXTENSION};
use crate::ir::io_yolo::{
    collect_label_files, read_label_file, write_label_file, LabelRow, WriteMode, LABEL_EXTENSION,
};
use crate::ir::{
    denormalize, normalize, stem_of, AnnotatedImage, Annotation, DenormalizeMode,
};

/// Image extensions tried, in order, when looking up a label's image.
pub const VOC_IMAGE_EXTENSIONS: &[&str] = &["jpg", "png", "jpeg", "bmp"];

const FORMAT_VOC: &str = "voc-xml";
const FORMAT_YOLO: &str = "yolo";

/// Convert every `.xml` file under `input_dir` into a label file in
/// `output_dir`.
///
/// Object names go through `class_map` (when given) and then the registry;
/// objects whose class does not resolve are skipped and tallied. Output
/// files keep the XML file's stem, so two inputs with the same stem in
/// different subdirectories collide; the second one is reported and not
/// written.
pub fn convert_corpus(
    input_dir: &Path,
    output_dir: &Path,
    registry: &ClassRegistry,
    class_map: Option<&BTreeMap<String, String>>,
) -> Result<ConversionSummary, LabelprepError> {
    let files = collect_xml_files(input_dir)?;
    fs::create_dir_all(output_dir).map_err(LabelprepError::Io)?;
    info!(
        "Converting {} XML file(s) from {} into {}",
        files.len(),
        input_dir.display(),
        output_dir.display()
    );

    let mut summary = ConversionSummary::new(FORMAT_VOC, FORMAT_YOLO);
    summary.files_total = files.len();
    let mut claimed: HashMap<String, PathBuf> = HashMap::new();

    for path in &files {
        let Some(stem) = stem_of(path) else {
            summary.add(ConversionIssue::error(
                ConversionIssueCode::UnreadableInput,
                path.clone(),
                "file name is not valid UTF-8",
            ));
            continue;
        };
        if let Some(first) = claimed.get(&stem) {
            summary.add(ConversionIssue::error(
                ConversionIssueCode::OutputCollision,
                path.clone(),
                format!(
                    "output {stem}.{LABEL_EXTENSION} already written from {}",
                    first.display()
                ),
            ));
            continue;
        }

        let document = match read_voc_xml(path) {
            Ok(document) => document,
            Err(err) => {
                warn!("{}: {}", path.display(), err);
                summary.add(ConversionIssue::error(
                    ConversionIssueCode::UnreadableInput,
                    path.clone(),
                    err.to_string(),
                ));
                continue;
            }
        };

        if document.objects_without_bbox > 0 {
            summary.objects_without_bbox += document.objects_without_bbox;
            summary.add(ConversionIssue::warning(
                ConversionIssueCode::MissingBoundingBox,
                Some(path.clone()),
                format!(
                    "{} object(s) without <bndbox> skipped",
                    document.objects_without_bbox
                ),
            ));
        }

        let image = document.image;
        summary.objects_read += image.annotations.len();

        let mut rows = Vec::with_capacity(image.annotations.len());
        let mut geometry_error = None;
        for annotation in &image.annotations {
            let name = class_map
                .and_then(|map| map.get(annotation.name.as_str()))
                .map(String::as_str)
                .unwrap_or(annotation.name.as_str());

            let Some(class_id) = registry.resolve(name) else {
                *summary
                    .unresolved_classes
                    .entry(annotation.name.clone())
                    .or_insert(0) += 1;
                continue;
            };

            match normalize(&annotation.bbox, image.size) {
                Ok(bbox) => rows.push(LabelRow::new(class_id, bbox)),
                Err(err) => {
                    geometry_error = Some(err);
                    break;
                }
            }
        }

        if let Some(err) = geometry_error {
            summary.add(ConversionIssue::error(
                ConversionIssueCode::InvalidGeometry,
                path.clone(),
                err.to_string(),
            ));
            continue;
        }

        let target = output_dir.join(format!("{stem}.{LABEL_EXTENSION}"));
        if let Err(err) = write_label_file(&target, &rows, WriteMode::Overwrite) {
            summary.add(ConversionIssue::error(
                ConversionIssueCode::WriteFailed,
                target,
                err.to_string(),
            ));
            continue;
        }

        claimed.insert(stem, path.clone());
        summary.files_converted += 1;
        summary.objects_written += rows.len();
    }

    let unresolved: Vec<(String, usize)> = summary
        .unresolved_classes
        .iter()
        .map(|(name, count)| (name.clone(), *count))
        .collect();
    for (name, count) in unresolved {
        warn!("Class '{name}' is not in the registry; skipped {count} object(s)");
        summary.add(ConversionIssue::warning(
            ConversionIssueCode::UnresolvedClass,
            None,
            format!("class '{name}' is not in the registry; {count} object(s) skipped"),
        ));
    }

    info!(
        "Converted {}/{} file(s), {} object(s) written",
        summary.files_converted, summary.files_total, summary.objects_written
    );
    Ok(summary)
}

/// Convert every label file directly inside `labels_dir` into an XML
/// document in `xml_dir`.
///
/// Each label is paired with the image of the same stem in `images_dir`
/// (extensions tried in [`VOC_IMAGE_EXTENSIONS`] order), whose header gives
/// the image size used for denormalization. Class ids are named through
/// `registry`; ids it does not know are skipped and reported.
pub fn convert_labels_to_voc(
    labels_dir: &Path,
    images_dir: &Path,
    xml_dir: &Path,
    registry: &ClassRegistry,
    mode: DenormalizeMode,
) -> Result<ConversionSummary, LabelprepError> {
    if !images_dir.is_dir() {
        return Err(LabelprepError::InputDirMissing {
            path: images_dir.to_path_buf(),
        });
    }
    let files = collect_label_files(labels_dir, false)?;
    fs::create_dir_all(xml_dir).map_err(LabelprepError::Io)?;
    info!(
        "Converting {} label file(s) from {} into {}",
        files.len(),
        labels_dir.display(),
        xml_dir.display()
    );

    let mut summary = ConversionSummary::new(FORMAT_YOLO, FORMAT_VOC);
    summary.files_total = files.len();
    let folder = images_dir
        .file_name()
        .and_then(|name| name.to_str())
        .map(ToOwned::to_owned);

    for path in &files {
        let Some(stem) = stem_of(path) else {
            summary.add(ConversionIssue::error(
                ConversionIssueCode::UnreadableInput,
                path.clone(),
                "file name is not valid UTF-8",
            ));
            continue;
        };

        let Some(image_path) = find_image(images_dir, &stem) else {
            summary.add(ConversionIssue::error(
                ConversionIssueCode::MissingImage,
                path.clone(),
                format!("no image named {stem} in {}", images_dir.display()),
            ));
            continue;
        };

        let info = match image_probe::probe(&image_path) {
            Ok(info) => info,
            Err(err) => {
                summary.add(ConversionIssue::error(
                    ConversionIssueCode::ImageProbeFailed,
                    image_path,
                    err.to_string(),
                ));
                continue;
            }
        };

        let labels = match read_label_file(path) {
            Ok(labels) => labels,
            Err(err) => {
                summary.add(ConversionIssue::error(
                    ConversionIssueCode::UnreadableInput,
                    path.clone(),
                    err.to_string(),
                ));
                continue;
            }
        };

        for bad in &labels.malformed {
            summary.add(ConversionIssue::warning(
                ConversionIssueCode::MalformedLine,
                Some(path.clone()),
                format!("line {}: {} ('{}')", bad.line, bad.message, bad.raw),
            ));
        }
        if labels.rows.is_empty() && labels.malformed.is_empty() {
            summary.empty_label_files.push(path.clone());
            summary.add(ConversionIssue::info(
                ConversionIssueCode::EmptyLabelFile,
                path.clone(),
                "label file holds no objects; writing XML without objects",
            ));
        }
        summary.objects_read += labels.rows.len();

        let mut image = AnnotatedImage::new(stem.clone(), info.size());
        image.depth = Some(info.depth);
        image.folder = folder.clone();
        image.file_name = image_path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned);
        image.path = Some(image_path.display().to_string());

        let mut geometry_error = None;
        for (row_idx, row) in labels.rows.iter().enumerate() {
            let Some(name) = registry.name(row.class_id) else {
                summary.add(ConversionIssue::warning(
                    ConversionIssueCode::ClassIdOutOfRange,
                    Some(path.clone()),
                    format!(
                        "object {}: class id {} has no name ({} class(es) known)",
                        row_idx + 1,
                        row.class_id,
                        registry.id_count()
                    ),
                ));
                continue;
            };

            match denormalize(&row.bbox, image.size, mode) {
                Ok(bbox) => image.annotations.push(Annotation::new(name, bbox)),
                Err(err) => {
                    geometry_error = Some(err);
                    break;
                }
            }
        }

        if let Some(err) = geometry_error {
            summary.add(ConversionIssue::error(
                ConversionIssueCode::InvalidGeometry,
                image_path,
                err.to_string(),
            ));
            continue;
        }

        let target = xml_dir.join(format!("{stem}.{VOC_XML_EXTENSION}"));
        if let Err(err) = write_voc_xml(&image, &target, false) {
            summary.add(ConversionIssue::error(
                ConversionIssueCode::WriteFailed,
                target,
                err.to_string(),
            ));
            continue;
        }

        summary.files_converted += 1;
        summary.objects_written += image.annotations.len();
    }

    info!(
        "Converted {}/{} file(s), {} object(s) written",
        summary.files_converted, summary.files_total, summary.objects_written
    );
    Ok(summary)
}

fn find_image(images_dir: &Path, stem: &str) -> Option<PathBuf> {
    VOC_IMAGE_EXTENSIONS
        .iter()
        .map(|ext| images_dir.join(format!("{stem}.{ext}")))
        .find(|candidate| candidate.is_file())
}
