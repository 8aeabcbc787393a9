//! Multi-root image/label corpora.
//!
//! A corpus is one or more `(images_dir, labels_dir)` pairs flattened into a
//! single ordered list of entries. Images and labels are joined by stem:
//! `images/cat_01.jpg` pairs with `labels/cat_01.txt`.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::LabelprepError;
use crate::ir::io_yolo::LABEL_EXTENSION;
use crate::ir::stem_of;

/// Image extensions collected by the splitter.
pub const SPLIT_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif"];

/// One images directory and the directory holding its labels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirPair {
    pub images_dir: PathBuf,
    pub labels_dir: PathBuf,
}

impl DirPair {
    /// Zip image and label directories into pairs.
    ///
    /// With no label directories, each images directory doubles as its own
    /// labels directory.
    pub fn zip(images: &[PathBuf], labels: &[PathBuf]) -> Result<Vec<DirPair>, LabelprepError> {
        if labels.is_empty() {
            return Ok(images
                .iter()
                .map(|dir| DirPair {
                    images_dir: dir.clone(),
                    labels_dir: dir.clone(),
                })
                .collect());
        }

        if images.len() != labels.len() {
            return Err(LabelprepError::DirPairMismatch {
                images: images.len(),
                labels: labels.len(),
            });
        }

        Ok(images
            .iter()
            .zip(labels)
            .map(|(images_dir, labels_dir)| DirPair {
                images_dir: images_dir.clone(),
                labels_dir: labels_dir.clone(),
            })
            .collect())
    }
}

/// One image file and where it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorpusEntry {
    /// File name including extension.
    pub image_file: String,
    pub image_dir: PathBuf,
    pub label_dir: PathBuf,
}

impl CorpusEntry {
    pub fn image_path(&self) -> PathBuf {
        self.image_dir.join(&self.image_file)
    }

    pub fn stem(&self) -> String {
        stem_of(Path::new(&self.image_file)).unwrap_or_else(|| self.image_file.clone())
    }

    pub fn label_path(&self) -> PathBuf {
        self.label_dir
            .join(format!("{}.{}", self.stem(), LABEL_EXTENSION))
    }

    pub fn has_label(&self) -> bool {
        self.label_path().is_file()
    }
}

/// Flattened multi-root corpus.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DatasetCorpus {
    pub pairs: Vec<DirPair>,
    pub entries: Vec<CorpusEntry>,
}

impl DatasetCorpus {
    /// Collect image files from every pair.
    ///
    /// Each images directory is listed non-recursively and sorted by name.
    /// A missing images directory aborts; a missing labels directory is
    /// only warned about. With non-empty `search_strings`, only image files
    /// whose name contains at least one of them are kept.
    pub fn scan(
        pairs: Vec<DirPair>,
        extensions: &[&str],
        search_strings: &[String],
    ) -> Result<Self, LabelprepError> {
        let mut entries = Vec::new();

        for pair in &pairs {
            if !pair.images_dir.is_dir() {
                return Err(LabelprepError::InputDirMissing {
                    path: pair.images_dir.clone(),
                });
            }
            if !pair.labels_dir.is_dir() {
                warn!(
                    "Label directory does not exist: {}",
                    pair.labels_dir.display()
                );
            }

            let before = entries.len();
            for path in list_files_with_extensions(&pair.images_dir, extensions)? {
                let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                    warn!("Skipping non UTF-8 file name: {}", path.display());
                    continue;
                };
                if !matches_search(file_name, search_strings) {
                    continue;
                }
                entries.push(CorpusEntry {
                    image_file: file_name.to_string(),
                    image_dir: pair.images_dir.clone(),
                    label_dir: pair.labels_dir.clone(),
                });
            }

            info!(
                "Found {} image(s) in {}",
                entries.len() - before,
                pair.images_dir.display()
            );
        }

        Ok(Self { pairs, entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn matches_search(file_name: &str, search_strings: &[String]) -> bool {
    search_strings.is_empty() || search_strings.iter().any(|s| file_name.contains(s.as_str()))
}

/// List regular files directly inside `dir` with one of `extensions`
/// (case-insensitive), sorted by path.
pub fn list_files_with_extensions(
    dir: &Path,
    extensions: &[&str],
) -> Result<Vec<PathBuf>, LabelprepError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(LabelprepError::Io)? {
        let path = entry.map_err(LabelprepError::Io)?.path();
        if path.is_file() && has_extension(&path, extensions) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Returns true if `path` has one of `extensions`, compared case-insensitively.
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Shuffle in place, reproducibly when a seed is given.
pub fn shuffle_seeded<T>(items: &mut [T], seed: Option<u64>) {
    if let Some(seed) = seed {
        let mut rng = StdRng::seed_from_u64(seed);
        items.shuffle(&mut rng);
    } else {
        let mut rng = rand::rng();
        items.shuffle(&mut rng);
    }
}
