//! Benchmarks for path selection and content decoding
//!
//! Run with: `cargo bench --bench selection`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use codebundle::core::selector::compile_operations;
use codebundle::core::walker::sort_paths;
use codebundle::{ContentCodec, PathEntry, PathSelector, Result, SelectionOp, TreeSource};
use std::path::Path;

// =============================================================================
// Benchmark Data
// =============================================================================

/// In-memory tree: `dirs` directories with `files` sources each, plus a build tree
struct SyntheticTree {
    entries: Vec<PathEntry>,
}

impl SyntheticTree {
    fn new(dirs: usize, files: usize) -> Self {
        let mut entries = Vec::new();
        for d in 0..dirs {
            entries.push(PathEntry::dir(format!("src/mod{}", d)));
            entries.push(PathEntry::dir(format!("build/mod{}", d)));
            for f in 0..files {
                entries.push(PathEntry::file(format!("src/mod{}/file{}.cpp", d, f)));
                entries.push(PathEntry::file(format!("src/mod{}/file{}.h", d, f)));
                entries.push(PathEntry::file(format!("build/mod{}/file{}.o", d, f)));
            }
        }
        entries.push(PathEntry::dir("src"));
        entries.push(PathEntry::dir("build"));
        Self { entries }
    }
}

impl TreeSource for SyntheticTree {
    fn enumerate(&self, _root: &Path) -> Result<Vec<PathEntry>> {
        Ok(self.entries.clone())
    }
}

const LEGACY_TEXT: &str = "Широкая электрификация южных губерний даст мощный толчок подъёму \
    сельского хозяйства. Съешь же ещё этих мягких французских булок, да выпей чаю.\r\n";

// =============================================================================
// Selection Benchmarks
// =============================================================================

fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("select");
    let ops = compile_operations(&[
        SelectionOp::include("*.cpp,*.h,build/"),
        SelectionOp::exclude("build/,file1*.h"),
        SelectionOp::include("build/mod0/"),
    ])
    .unwrap();

    for size in [10usize, 100] {
        let tree = SyntheticTree::new(size, size);
        group.bench_with_input(BenchmarkId::from_parameter(size * size * 3), &tree, |b, tree| {
            b.iter(|| {
                let selector = PathSelector::new(Path::new("/bench"), tree);
                selector.select(black_box(&ops)).unwrap()
            })
        });
    }
    group.finish();
}

fn bench_sort_paths(c: &mut Criterion) {
    let tree = SyntheticTree::new(50, 50);
    c.bench_function("sort_paths", |b| {
        b.iter(|| {
            let mut entries = tree.entries.clone();
            sort_paths(black_box(&mut entries));
            entries
        })
    });
}

// =============================================================================
// Codec Benchmarks
// =============================================================================

fn bench_codec(c: &mut Criterion) {
    let codec = ContentCodec::new();
    let utf8 = LEGACY_TEXT.repeat(64).into_bytes();
    let legacy = encoding_rs::WINDOWS_1251
        .encode(&LEGACY_TEXT.repeat(64))
        .0
        .into_owned();

    c.bench_function("codec_utf8_detected", |b| {
        b.iter(|| codec.process_bytes(black_box(utf8.clone()), None))
    });
    c.bench_function("codec_legacy_detected", |b| {
        b.iter(|| codec.process_bytes(black_box(legacy.clone()), None))
    });
    c.bench_function("codec_legacy_explicit", |b| {
        b.iter(|| codec.process_bytes(black_box(legacy.clone()), Some("cp1251")))
    });
}

criterion_group!(benches, bench_select, bench_sort_paths, bench_codec);
criterion_main!(benches);
