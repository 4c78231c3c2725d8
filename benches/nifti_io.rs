//! Criterion benchmarks for NIfTI I/O and voxel access.
//!
//! Run with: cargo bench --bench nifti_io

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use niftikit::nifti::{self, NiftiImage, SaveOptions};
use tempfile::tempdir;

/// Create a test NIfTI image with given shape
fn create_test_image(shape: [usize; 3]) -> NiftiImage {
    let [nx, ny, nz] = shape;
    let mut img = NiftiImage::build(nx, ny, nz, 1).unwrap();
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                img.set(x, y, z, 0, ((x + y + z) % 256) as f32).unwrap();
            }
        }
    }
    img
}

fn label(shape: [usize; 3]) -> String {
    format!("{}x{}x{}", shape[0], shape[1], shape[2])
}

/// Benchmark load() for uncompressed and gzipped files
fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("load");
    let dir = tempdir().unwrap();

    for shape in [[64, 64, 64], [128, 128, 64]] {
        let img = create_test_image(shape);
        let raw = dir.path().join(format!("{}.nii", label(shape)));
        let gz = dir.path().join(format!("{}.nii.gz", label(shape)));
        nifti::save_with(&img, &raw, &SaveOptions::uncompressed()).unwrap();
        nifti::save(&img, &gz).unwrap();

        group.throughput(Throughput::Bytes(
            (shape.iter().product::<usize>() * 4) as u64,
        ));
        group.bench_with_input(BenchmarkId::new("raw", label(shape)), &raw, |b, path| {
            b.iter(|| black_box(nifti::load(black_box(path), true).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("gzip", label(shape)), &gz, |b, path| {
            b.iter(|| black_box(nifti::load(black_box(path), true).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark save() with and without compression
fn bench_save(c: &mut Criterion) {
    let mut group = c.benchmark_group("save");
    let dir = tempdir().unwrap();

    let shape = [128, 128, 64];
    let img = create_test_image(shape);
    let raw = dir.path().join("out.nii");
    let gz = dir.path().join("out.nii.gz");

    group.bench_function(BenchmarkId::new("raw", label(shape)), |b| {
        b.iter(|| nifti::save_with(black_box(&img), &raw, &SaveOptions::uncompressed()).unwrap())
    });
    group.bench_function(BenchmarkId::new("gzip", label(shape)), |b| {
        b.iter(|| nifti::save(black_box(&img), &gz).unwrap())
    });

    group.finish();
}

/// Benchmark slice and time-series extraction
fn bench_access(c: &mut Criterion) {
    let mut group = c.benchmark_group("access");
    let img = create_test_image([197, 233, 189]);

    group.bench_function("slice", |b| {
        b.iter(|| black_box(img.slice(black_box(94), 0).unwrap()))
    });
    group.bench_function("get", |b| {
        b.iter(|| black_box(img.get(black_box(98), black_box(116), black_box(94), 0).unwrap()))
    });

    let mut series = NiftiImage::build(64, 64, 32, 200).unwrap();
    series.set(10, 10, 10, 199, 1.0).unwrap();
    group.bench_function("time_series", |b| {
        b.iter(|| black_box(series.time_series(black_box(10), 10, 10).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, bench_load, bench_save, bench_access);
criterion_main!(benches);
