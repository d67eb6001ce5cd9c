//! Log directory benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use datalog_bench::random_data;
use datalog_storage::{FileDirectory, InMemoryDirectory, LogDirectory};
use tempfile::TempDir;

/// Benchmark InMemoryDirectory append operations.
fn bench_inmemory_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("inmemory_dir_append");

    for size in [64, 256, 1024, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let dir = InMemoryDirectory::new();
            dir.create("bench_0.log").unwrap();
            let data = random_data(size);

            b.iter(|| {
                let offset = dir.append("bench_0.log", black_box(&data)).unwrap();
                black_box(offset);
            });
        });
    }

    group.finish();
}

/// Benchmark FileDirectory append operations without sync.
fn bench_file_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_dir_append");
    group.sample_size(50);

    for size in [256, 1024, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let temp_dir = TempDir::new().unwrap();
            let dir = FileDirectory::open(temp_dir.path(), true).unwrap();
            dir.create("bench_0.log").unwrap();
            let data = random_data(size);

            b.iter(|| {
                let offset = dir.append("bench_0.log", black_box(&data)).unwrap();
                black_box(offset);
            });
        });
    }

    group.finish();
}

/// Benchmark FileDirectory positioned reads.
fn bench_file_read_at(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let dir = FileDirectory::open(temp_dir.path(), true).unwrap();
    dir.create("bench_0.log").unwrap();
    dir.append("bench_0.log", &random_data(64 * 1024)).unwrap();

    c.bench_function("file_dir_read_at_4", |b| {
        let mut offset = 0u64;
        b.iter(|| {
            let record = dir.read_at("bench_0.log", black_box(offset), 4).unwrap();
            offset = (offset + 4) % (64 * 1024);
            black_box(record);
        });
    });
}

/// Benchmark atomic text replacement, as used for the log index.
fn bench_write_string(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let dir = FileDirectory::open(temp_dir.path(), true).unwrap();

    c.bench_function("file_dir_write_string", |b| {
        let mut index = 0u64;
        b.iter(|| {
            index += 1;
            dir.write_string("bench.idx", black_box(&index.to_string()))
                .unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_inmemory_append,
    bench_file_append,
    bench_file_read_at,
    bench_write_string,
);
criterion_main!(benches);
