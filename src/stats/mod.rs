//! Label distribution analysis.
//!
//! Every label file is tallied on its own and the tallies are folded into
//! one accumulator, so per-file parsing stays free of shared state.

mod report;

pub use report::{ClassShare, DistributionReport, ANALYSIS_REPORT_FILE_NAME};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::classes::{discover_class_file, load_class_names, ClassRegistry};
use crate::error::LabelprepError;
use crate::ir::io_yolo::{collect_label_files, read_label_file, MalformedLine};
use crate::ir::ClassId;

/// Object counts from one label file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileTally {
    pub objects: usize,
    pub per_class: BTreeMap<ClassId, usize>,
    pub malformed: Vec<MalformedLine>,
}

/// Tally one label file. Malformed lines are kept aside, not counted.
pub fn tally_label_file(path: &Path) -> Result<FileTally, LabelprepError> {
    let parsed = read_label_file(path)?;
    let mut tally = FileTally {
        objects: parsed.rows.len(),
        malformed: parsed.malformed,
        ..Default::default()
    };
    for row in &parsed.rows {
        *tally.per_class.entry(row.class_id).or_insert(0) += 1;
    }
    Ok(tally)
}

/// Running totals over many [`FileTally`] values.
#[derive(Clone, Debug, Default)]
pub struct DistributionAccumulator {
    files: usize,
    class_counts: BTreeMap<ClassId, usize>,
    objects_per_image: BTreeMap<usize, usize>,
    class_objects_per_image: BTreeMap<ClassId, BTreeMap<usize, usize>>,
    malformed: Vec<MalformedLine>,
    unreadable: Vec<(PathBuf, String)>,
}

impl DistributionAccumulator {
    pub fn merge(&mut self, tally: FileTally) {
        self.files += 1;
        *self.objects_per_image.entry(tally.objects).or_insert(0) += 1;
        for (class_id, count) in tally.per_class {
            *self.class_counts.entry(class_id).or_insert(0) += count;
            *self
                .class_objects_per_image
                .entry(class_id)
                .or_default()
                .entry(count)
                .or_insert(0) += 1;
        }
        self.malformed.extend(tally.malformed);
    }

    pub fn record_unreadable(&mut self, path: PathBuf, reason: String) {
        self.unreadable.push((path, reason));
    }

    /// Turn the totals into a report, naming classes through `registry`.
    ///
    /// Fails when no file or no object was seen, since every percentage
    /// would divide by zero.
    pub fn finish(
        self,
        labels_dir: &Path,
        registry: Option<&ClassRegistry>,
        class_file: Option<PathBuf>,
    ) -> Result<DistributionReport, LabelprepError> {
        if self.files == 0 {
            return Err(LabelprepError::AnalysisFailed {
                message: format!("no label files found in {}", labels_dir.display()),
            });
        }
        let total_objects: usize = self.class_counts.values().sum();
        if total_objects == 0 {
            return Err(LabelprepError::AnalysisFailed {
                message: format!(
                    "no objects found in {} label file(s) under {}",
                    self.files,
                    labels_dir.display()
                ),
            });
        }

        let classes = self
            .class_counts
            .iter()
            .map(|(&id, &count)| ClassShare {
                id,
                name: registry
                    .and_then(|registry| registry.name(id))
                    .map(ToOwned::to_owned)
                    .unwrap_or_else(|| format!("Class_{}", id)),
                count,
                percent: count as f64 / total_objects as f64 * 100.0,
            })
            .collect();

        Ok(DistributionReport {
            labels_dir: labels_dir.to_path_buf(),
            class_file,
            generated_at: chrono::Local::now()
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            total_label_files: self.files,
            total_objects,
            classes,
            objects_per_image: self.objects_per_image,
            class_objects_per_image: self.class_objects_per_image,
            malformed_lines: self.malformed,
            unreadable_files: self.unreadable,
        })
    }
}

/// Analyze every label file under `labels_dir` (recursively, list files
/// excluded).
///
/// Class names come from `class_file` when given; otherwise the labels
/// directory is searched for a YAML names file or `classes.txt`. Without
/// either, classes are named `Class_<id>`.
pub fn analyze_labels(
    labels_dir: &Path,
    class_file: Option<&Path>,
) -> Result<DistributionReport, LabelprepError> {
    let files = collect_label_files(labels_dir, true)?;
    info!(
        "Analyzing {} label file(s) under {}",
        files.len(),
        labels_dir.display()
    );

    // an explicit class file must load; a discovered one may be ignored
    let (class_file, registry) = match class_file {
        Some(path) => (Some(path.to_path_buf()), Some(load_registry(path)?)),
        None => match discover_class_file(labels_dir) {
            Some(path) => match load_registry(&path) {
                Ok(registry) => (Some(path), Some(registry)),
                Err(err) => {
                    warn!("Ignoring class file {}: {}", path.display(), err);
                    (None, None)
                }
            },
            None => {
                info!("No class file found; using class ids as names");
                (None, None)
            }
        },
    };

    let mut acc = DistributionAccumulator::default();
    for path in files {
        match tally_label_file(&path) {
            Ok(tally) => acc.merge(tally),
            Err(err) => {
                warn!("{}: {}", path.display(), err);
                acc.record_unreadable(path, err.to_string());
            }
        }
    }

    acc.finish(labels_dir, registry.as_ref(), class_file)
}

fn load_registry(path: &Path) -> Result<ClassRegistry, LabelprepError> {
    info!("Using class names from {}", path.display());
    ClassRegistry::from_list(load_class_names(path)?)
}
