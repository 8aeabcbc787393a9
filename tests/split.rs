//! Integration tests for train/val/test splitting.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use labelprep::split::{split_dataset, LabelPolicy, PathStyle, SplitOptions};
use labelprep::LabelprepError;

mod common;

fn make_pair(root: &Path, name: &str, count: usize, labeled: usize) -> (PathBuf, PathBuf) {
    let images = root.join(name).join("images");
    let labels = root.join(name).join("labels");
    fs::create_dir_all(&images).expect("create images dir");
    fs::create_dir_all(&labels).expect("create labels dir");
    for idx in 0..count {
        fs::write(images.join(format!("{name}_{idx:03}.jpg")), b"").expect("write image");
        if idx < labeled {
            common::write_text(
                &labels.join(format!("{name}_{idx:03}.txt")),
                "0 0.5 0.5 0.1 0.1\n",
            );
        }
    }
    (images, labels)
}

fn read_list(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("read list")
        .lines()
        .map(ToOwned::to_owned)
        .collect()
}

#[test]
fn writes_floored_splits_to_default_main_dir() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let (images, labels) = make_pair(temp.path(), "set", 100, 100);

    let opts = SplitOptions {
        trainval_percent: 0.8,
        train_percent: 0.75,
        seed: Some(42),
        ..Default::default()
    };
    let summary = split_dataset(&[images.clone()], &[labels], &opts).expect("split");

    assert_eq!((summary.train, summary.val, summary.test), (60, 20, 20));
    assert_eq!(summary.trainval, 80);
    let main = images.join("..").join("Main");
    assert_eq!(summary.output_dir, main);

    let train = read_list(&main.join("train.txt"));
    let val = read_list(&main.join("val.txt"));
    let test = read_list(&main.join("test.txt"));
    let trainval = read_list(&main.join("trainval.txt"));
    assert_eq!(train.len(), 60);
    assert!(train.iter().all(|line| Path::new(line).is_absolute()));

    let train_set: BTreeSet<&String> = train.iter().collect();
    let val_set: BTreeSet<&String> = val.iter().collect();
    let test_set: BTreeSet<&String> = test.iter().collect();
    let trainval_set: BTreeSet<&String> = trainval.iter().collect();
    assert!(train_set.is_disjoint(&val_set));
    assert!(trainval_set.is_disjoint(&test_set));
    assert_eq!(
        train_set.union(&val_set).copied().collect::<BTreeSet<_>>(),
        trainval_set
    );
}

#[test]
fn seeded_runs_are_reproducible() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let (images, labels) = make_pair(temp.path(), "set", 30, 30);

    let run = |out: &str| {
        let opts = SplitOptions {
            seed: Some(5),
            output_dir: Some(temp.path().join(out)),
            ..Default::default()
        };
        split_dataset(&[images.clone()], &[labels.clone()], &opts).expect("split");
        read_list(&temp.path().join(out).join("train.txt"))
    };

    assert_eq!(run("first"), run("second"));
}

#[test]
fn unlabeled_images_follow_the_policy() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let (images, labels) = make_pair(temp.path(), "set", 10, 6);

    let opts = SplitOptions {
        trainval_percent: 1.0,
        train_percent: 1.0,
        output_dir: Some(temp.path().join("only_labeled")),
        ..Default::default()
    };
    let summary = split_dataset(&[images.clone()], &[labels.clone()], &opts).expect("split");
    assert_eq!(summary.total, 6);
    assert_eq!(summary.unlabeled, 4);
    assert_eq!(summary.dropped_unlabeled, 4);

    let opts = SplitOptions {
        label_policy: LabelPolicy::KeepAll,
        output_dir: Some(temp.path().join("all")),
        ..opts
    };
    let summary = split_dataset(&[images], &[labels], &opts).expect("split");
    assert_eq!(summary.total, 10);
    assert_eq!(summary.dropped_unlabeled, 0);
    assert_eq!(read_list(&temp.path().join("all").join("train.txt")).len(), 10);
}

#[test]
fn multiple_roots_search_filter_and_label_lists() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let (images_a, labels_a) = make_pair(temp.path(), "day", 4, 4);
    let (images_b, labels_b) = make_pair(temp.path(), "night", 4, 4);
    let out = temp.path().join("lists");

    let opts = SplitOptions {
        trainval_percent: 1.0,
        train_percent: 1.0,
        path_style: PathStyle::AsGiven,
        label_lists: true,
        search_strings: vec!["_001".to_string(), "_002".to_string()],
        output_dir: Some(out.clone()),
        ..Default::default()
    };
    let summary =
        split_dataset(&[images_a.clone(), images_b], &[labels_a.clone(), labels_b], &opts)
            .expect("split");

    assert_eq!(summary.total, 4);
    assert_eq!(summary.files_written.len(), 8);

    let train = read_list(&out.join("train.txt"));
    assert_eq!(train[0], images_a.join("day_001.jpg").to_string_lossy());
    let train_labels = read_list(&out.join("train_labels.txt"));
    assert_eq!(train_labels[0], labels_a.join("day_001.txt").to_string_lossy());
    assert!(read_list(&out.join("val_labels.txt")).is_empty());
}

#[test]
fn labels_next_to_images_when_no_label_dirs() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let images = temp.path().join("flat");
    fs::create_dir_all(&images).expect("create dir");
    for idx in 0..3 {
        fs::write(images.join(format!("{idx}.png")), b"").expect("write image");
        common::write_text(&images.join(format!("{idx}.txt")), "0 0.5 0.5 0.1 0.1\n");
    }

    let opts = SplitOptions {
        output_dir: Some(temp.path().join("out")),
        ..Default::default()
    };
    let summary = split_dataset(&[images], &[], &opts).expect("split");
    assert_eq!(summary.total, 3);
    assert_eq!(summary.unlabeled, 0);
}

#[test]
fn configuration_errors_abort() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let (images, labels) = make_pair(temp.path(), "set", 2, 2);

    let err = split_dataset(
        &[images.clone(), images.clone()],
        &[labels],
        &SplitOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        LabelprepError::DirPairMismatch {
            images: 2,
            labels: 1
        }
    ));

    let empty = temp.path().join("empty");
    fs::create_dir_all(&empty).expect("create dir");
    assert!(matches!(
        split_dataset(&[empty], &[], &SplitOptions::default()),
        Err(LabelprepError::NoImagesFound)
    ));

    assert!(matches!(
        split_dataset(&[temp.path().join("absent")], &[], &SplitOptions::default()),
        Err(LabelprepError::InputDirMissing { .. })
    ));
}
