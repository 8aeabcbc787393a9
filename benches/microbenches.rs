//! Criterion microbenches for labelprep parsing and writing.
//!
//! Run with: `cargo bench`
//!
//! These benchmarks measure the performance of:
//! - label-file parsing (parse_label_line, parse_label_str)
//! - VOC XML parsing and writing (parse_voc_xml_str, to_voc_xml_string)

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;
use std::path::Path;

use labelprep::ir::io_voc_xml::{parse_voc_xml_str, to_voc_xml_string};
use labelprep::ir::io_yolo::{parse_label_line, parse_label_str};

const LABEL_FIXTURE: &str = "0 0.500000 0.500000 0.250000 0.400000
1 0.125000 0.300000 0.100000 0.200000
2 0.812500 0.640000 0.310000 0.500000
0 0.050000 0.950000 0.090000 0.080000
3 0.333333 0.666667 0.200000 0.150000
";

const VOC_FIXTURE: &str = r#"<annotation>
  <folder>images</folder>
  <filename>000001.jpg</filename>
  <size><width>640</width><height>480</height><depth>3</depth></size>
  <segmented>0</segmented>
  <object>
    <name>person</name><pose>Unspecified</pose><truncated>0</truncated><difficult>0</difficult>
    <bndbox><xmin>48</xmin><ymin>240</ymin><xmax>195</xmax><ymax>371</ymax></bndbox>
  </object>
  <object>
    <name>car</name><pose>Left</pose><truncated>1</truncated><difficult>0</difficult>
    <bndbox><xmin>8</xmin><ymin>12</ymin><xmax>352</xmax><ymax>298</ymax></bndbox>
  </object>
  <object>
    <name>dog</name><pose>Unspecified</pose><truncated>0</truncated><difficult>1</difficult>
    <bndbox><xmin>400</xmin><ymin>100</ymin><xmax>620</xmax><ymax>470</ymax></bndbox>
  </object>
</annotation>
"#;

/// Benchmark a single label line.
fn bench_label_line(c: &mut Criterion) {
    let line = "2 0.812500 0.640000 0.310000 0.500000";
    let mut group = c.benchmark_group("label_parse");
    group.throughput(Throughput::Bytes(line.len() as u64));

    group.bench_function("parse_label_line", |b| {
        b.iter(|| {
            let row = parse_label_line(black_box(line)).unwrap();
            black_box(row)
        })
    });

    group.finish();
}

/// Benchmark a whole label file.
fn bench_label_file(c: &mut Criterion) {
    let path = Path::new("bench.txt");
    let mut group = c.benchmark_group("label_parse");
    group.throughput(Throughput::Bytes(LABEL_FIXTURE.len() as u64));

    group.bench_function("parse_label_str", |b| {
        b.iter(|| {
            let parsed = parse_label_str(black_box(LABEL_FIXTURE), path);
            black_box(parsed)
        })
    });

    group.finish();
}

fn bench_voc_parse(c: &mut Criterion) {
    let path = Path::new("000001.xml");
    let mut group = c.benchmark_group("voc_parse");
    group.throughput(Throughput::Bytes(VOC_FIXTURE.len() as u64));

    group.bench_function("parse_voc_xml_str", |b| {
        b.iter(|| {
            let doc = parse_voc_xml_str(black_box(VOC_FIXTURE), path).unwrap();
            black_box(doc)
        })
    });

    group.finish();
}

/// Benchmark VOC XML writing.
///
/// The fixture is parsed once outside the timed region.
fn bench_voc_write(c: &mut Criterion) {
    let doc = parse_voc_xml_str(VOC_FIXTURE, Path::new("000001.xml"))
        .expect("Failed to parse VOC fixture");

    let mut group = c.benchmark_group("voc_write");
    group.throughput(Throughput::Elements(doc.image.annotations.len() as u64));

    group.bench_function("to_voc_xml_string", |b| {
        b.iter(|| {
            let xml = to_voc_xml_string(black_box(&doc.image));
            black_box(xml)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_label_line,
    bench_label_file,
    bench_voc_parse,
    bench_voc_write,
);
criterion_main!(benches);
