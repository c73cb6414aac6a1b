use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use spillpatch::patch_pipeline::{
    GridSpec, Mask, PatchExtractor, Raster, SarImage, WorkerAssignment,
    stats::patch_stats,
};

fn generate_scene(size: usize) -> (SarImage, Mask) {
    let image = Raster::from_fn(size, size, |x, y| ((x * 7 + y * 13) % 251) as f32);
    let mask = Raster::from_fn(size, size, |x, y| u8::from((x + y) % 5 == 0 || x > size / 2));
    (image, mask)
}

fn benchmark_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_by_size");

    for size in [1000usize, 5000, 20000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let spec = GridSpec::new(black_box(size), black_box(size), 224, 1).unwrap();
                spec.cells().count()
            });
        });
    }

    group.finish();
}

fn benchmark_partition(c: &mut Criterion) {
    c.bench_function("partition_10k_over_64", |b| {
        b.iter(|| {
            (0..64)
                .map(|id| WorkerAssignment::new(64, id).unwrap().shard(black_box(10_000)).len())
                .sum::<usize>()
        });
    });
}

fn benchmark_extract_and_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_and_count");

    for size in [448usize, 1120] {
        let (image, mask) = generate_scene(size);
        let spec = GridSpec::new(size, size, 224, 1).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), &spec, |b, spec| {
            let extractor = PatchExtractor::new("bench", &image, &mask).unwrap();
            b.iter(|| {
                spec.cells()
                    .map(|cell| patch_stats(&extractor.extract(&cell).unwrap()).unwrap().oil_pixels)
                    .sum::<u64>()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_grid, benchmark_partition, benchmark_extract_and_count);
criterion_main!(benches);
