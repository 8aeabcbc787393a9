//! Train/val/test partitioning of a multi-root image corpus.
//!
//! The corpus is split in two stages: all items into `trainval` and `test`
//! by `trainval_percent`, then `trainval` into `train` and `val` by
//! `train_percent`. Counts are floored. With a seed the partition is
//! reproducible.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Serialize;

use crate::corpus::{
    shuffle_seeded, CorpusEntry, DatasetCorpus, DirPair, SPLIT_IMAGE_EXTENSIONS,
};
use crate::error::LabelprepError;
use crate::fsutil::write_atomic;

/// What to do with images that have no label file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelPolicy {
    /// Drop unlabeled images before splitting.
    #[default]
    KeepLabeledOnly,
    /// Split every image, labeled or not.
    KeepAll,
}

/// How paths are written into the list files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStyle {
    #[default]
    Absolute,
    /// Directory as given, joined with the file name.
    AsGiven,
}

/// Splitting options.
#[derive(Clone, Debug)]
pub struct SplitOptions {
    /// Share of all items going to train+val, in `[0, 1]`.
    pub trainval_percent: f64,
    /// Share of train+val going to train, in `[0, 1]`.
    pub train_percent: f64,
    pub seed: Option<u64>,
    pub label_policy: LabelPolicy,
    pub path_style: PathStyle,
    /// Also write `{split}_labels.txt` with the label paths.
    pub label_lists: bool,
    /// Keep only image files whose name contains one of these.
    pub search_strings: Vec<String>,
    /// Defaults to `<first images dir>/../Main`.
    pub output_dir: Option<PathBuf>,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            trainval_percent: 0.9,
            train_percent: 0.9,
            seed: None,
            label_policy: LabelPolicy::default(),
            path_style: PathStyle::default(),
            label_lists: false,
            search_strings: Vec::new(),
            output_dir: None,
        }
    }
}

/// Indices into the corpus entries, per split.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub train: Vec<usize>,
    pub val: Vec<usize>,
    pub test: Vec<usize>,
    pub trainval: Vec<usize>,
}

/// What a split run produced.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SplitSummary {
    pub total: usize,
    pub train: usize,
    pub val: usize,
    pub test: usize,
    pub trainval: usize,
    /// Images collected that had no label file.
    pub unlabeled: usize,
    /// Images dropped for having no label file.
    pub dropped_unlabeled: usize,
    pub output_dir: PathBuf,
    pub files_written: Vec<PathBuf>,
}

impl std::fmt::Display for SplitSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Dataset split summary:")?;
        writeln!(f, "  Total: {}", self.total)?;
        writeln!(f, "  Train: {}", self.train)?;
        writeln!(f, "  Val: {}", self.val)?;
        writeln!(f, "  Test: {}", self.test)?;
        writeln!(
            f,
            "  Train:Val:Test = {}:{}:{}",
            self.train, self.val, self.test
        )?;
        if self.unlabeled > 0 {
            writeln!(
                f,
                "  Images without labels: {} ({} dropped)",
                self.unlabeled, self.dropped_unlabeled
            )?;
        }
        writeln!(f, "Files saved to: {}", self.output_dir.display())
    }
}

/// Validate splitting options before running.
pub fn validate_split_options(opts: &SplitOptions) -> Result<(), LabelprepError> {
    for (name, value) in [
        ("trainval_percent", opts.trainval_percent),
        ("train_percent", opts.train_percent),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(LabelprepError::InvalidSplitParams {
                message: format!("{name} must be in the interval [0.0, 1.0], got {value}"),
            });
        }
    }
    Ok(())
}

/// Partition `total` items.
///
/// `trainval` takes the first `floor(total * trainval_percent)` indices of a
/// shuffle and `train` the first `floor(|trainval| * train_percent)` of
/// those. Every list is returned in ascending order.
pub fn partition(
    total: usize,
    trainval_percent: f64,
    train_percent: f64,
    seed: Option<u64>,
) -> Partition {
    let num_trainval = ((total as f64) * trainval_percent).floor() as usize;
    let num_trainval = num_trainval.min(total);
    let num_train = (((num_trainval as f64) * train_percent).floor() as usize).min(num_trainval);

    let mut indices: Vec<usize> = (0..total).collect();
    shuffle_seeded(&mut indices, seed);
    let mut test = indices.split_off(num_trainval);
    let mut trainval = indices;

    // trainval is still in shuffled order, so its prefix is a uniform sample
    let mut train = trainval.clone();
    let mut val = train.split_off(num_train);

    for list in [&mut train, &mut val, &mut test, &mut trainval] {
        list.sort_unstable();
    }

    Partition {
        train,
        val,
        test,
        trainval,
    }
}

/// Split one or more image/label directory pairs and write the list files.
pub fn split_dataset(
    images_dirs: &[PathBuf],
    labels_dirs: &[PathBuf],
    opts: &SplitOptions,
) -> Result<SplitSummary, LabelprepError> {
    validate_split_options(opts)?;
    if images_dirs.is_empty() {
        return Err(LabelprepError::InvalidSplitParams {
            message: "at least one images directory is required".to_string(),
        });
    }

    let pairs = DirPair::zip(images_dirs, labels_dirs)?;
    info!("Collecting files from {} directory pair(s)", pairs.len());
    let corpus = DatasetCorpus::scan(pairs, SPLIT_IMAGE_EXTENSIONS, &opts.search_strings)?;
    if corpus.is_empty() {
        return Err(LabelprepError::NoImagesFound);
    }

    let (labeled, unlabeled): (Vec<CorpusEntry>, Vec<CorpusEntry>) =
        corpus.entries.into_iter().partition(CorpusEntry::has_label);
    let unlabeled_count = unlabeled.len();
    if unlabeled_count > 0 {
        warn!("{} image(s) have no label file", unlabeled_count);
        for entry in unlabeled.iter().take(5) {
            warn!(
                "  - {} (from {})",
                entry.image_file,
                entry.image_dir.display()
            );
        }
    }

    let (entries, dropped_unlabeled) = match opts.label_policy {
        LabelPolicy::KeepLabeledOnly => (labeled, unlabeled_count),
        LabelPolicy::KeepAll => {
            let mut all = labeled;
            all.extend(unlabeled);
            sort_by_origin(&mut all, images_dirs);
            (all, 0)
        }
    };

    let output_dir = opts
        .output_dir
        .clone()
        .unwrap_or_else(|| images_dirs[0].join("..").join("Main"));
    fs::create_dir_all(&output_dir).map_err(LabelprepError::Io)?;

    let parts = partition(
        entries.len(),
        opts.trainval_percent,
        opts.train_percent,
        opts.seed,
    );

    let mut files_written = Vec::new();
    for (name, indices) in [
        ("train", &parts.train),
        ("val", &parts.val),
        ("test", &parts.test),
        ("trainval", &parts.trainval),
    ] {
        let images: Vec<PathBuf> = indices.iter().map(|&i| entries[i].image_path()).collect();
        let path = output_dir.join(format!("{name}.txt"));
        write_path_list(&path, &images, opts.path_style)?;
        info!("Generated {} with {} entries", path.display(), images.len());
        files_written.push(path);

        if opts.label_lists {
            let labels: Vec<PathBuf> = indices.iter().map(|&i| entries[i].label_path()).collect();
            let path = output_dir.join(format!("{name}_labels.txt"));
            write_path_list(&path, &labels, opts.path_style)?;
            info!("Generated {} with {} entries", path.display(), labels.len());
            files_written.push(path);
        }
    }

    Ok(SplitSummary {
        total: entries.len(),
        train: parts.train.len(),
        val: parts.val.len(),
        test: parts.test.len(),
        trainval: parts.trainval.len(),
        unlabeled: unlabeled_count,
        dropped_unlabeled,
        output_dir,
        files_written,
    })
}

// restore corpus order after labeled/unlabeled were separated
fn sort_by_origin(entries: &mut [CorpusEntry], images_dirs: &[PathBuf]) {
    entries.sort_by_key(|entry| {
        let dir_rank = images_dirs
            .iter()
            .position(|dir| *dir == entry.image_dir)
            .unwrap_or(usize::MAX);
        (dir_rank, entry.image_file.clone())
    });
}

fn write_path_list(path: &Path, paths: &[PathBuf], style: PathStyle) -> Result<(), LabelprepError> {
    let mut content = String::new();
    for item in paths {
        let rendered = match style {
            PathStyle::Absolute => std::path::absolute(item).map_err(LabelprepError::Io)?,
            PathStyle::AsGiven => item.clone(),
        };
        content.push_str(&rendered.to_string_lossy());
        content.push('\n');
    }
    write_atomic(path, content.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn partition_counts_are_floored() {
        let parts = partition(100, 0.8, 0.75, Some(42));
        assert_eq!(parts.trainval.len(), 80);
        assert_eq!(parts.train.len(), 60);
        assert_eq!(parts.val.len(), 20);
        assert_eq!(parts.test.len(), 20);

        let parts = partition(7, 0.5, 0.5, Some(1));
        assert_eq!(parts.trainval.len(), 3);
        assert_eq!(parts.train.len(), 1);
        assert_eq!(parts.val.len(), 2);
        assert_eq!(parts.test.len(), 4);
    }

    #[test]
    fn partition_is_disjoint_and_complete() {
        let parts = partition(50, 0.7, 0.6, Some(9));
        let train: BTreeSet<usize> = parts.train.iter().copied().collect();
        let val: BTreeSet<usize> = parts.val.iter().copied().collect();
        let test: BTreeSet<usize> = parts.test.iter().copied().collect();
        let trainval: BTreeSet<usize> = parts.trainval.iter().copied().collect();

        assert!(train.is_disjoint(&val));
        assert!(trainval.is_disjoint(&test));
        assert_eq!(train.union(&val).copied().collect::<BTreeSet<_>>(), trainval);
        assert_eq!(trainval.len() + test.len(), 50);
    }

    #[test]
    fn partition_is_reproducible_with_seed() {
        assert_eq!(partition(100, 0.8, 0.75, Some(42)), partition(100, 0.8, 0.75, Some(42)));
    }

    #[test]
    fn partition_edges() {
        let all_test = partition(10, 0.0, 1.0, Some(3));
        assert_eq!(all_test.test.len(), 10);
        assert!(all_test.trainval.is_empty());

        let all_train = partition(10, 1.0, 1.0, None);
        assert_eq!(all_train.train, (0..10).collect::<Vec<_>>());
        assert!(all_train.val.is_empty());
    }

    #[test]
    fn options_reject_out_of_range_percentages() {
        let opts = SplitOptions {
            trainval_percent: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            validate_split_options(&opts),
            Err(LabelprepError::InvalidSplitParams { .. })
        ));
        let opts = SplitOptions {
            train_percent: f64::NAN,
            ..Default::default()
        };
        assert!(validate_split_options(&opts).is_err());
    }
}
