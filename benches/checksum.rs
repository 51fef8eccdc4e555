//! Benchmarks for cell sealing and verification

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use scada_cells::core::cell::checksum;
use scada_cells::{Cell, CellId, FileTime, Information};

fn benchmark_compute(c: &mut Criterion) {
    let mut record = [0u8; 64];
    for (i, byte) in record.iter_mut().enumerate() {
        *byte = i as u8;
    }

    c.bench_function("checksum_compute", |b| {
        b.iter(|| black_box(checksum::compute(black_box(&record))));
    });
    c.bench_function("checksum_compute_wire", |b| {
        b.iter(|| black_box(checksum::compute_wire(black_box(&record))));
    });
}

fn benchmark_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("cell_commit");
    let cell = Cell::new();
    let info = Information::from_value(&[1.5f64, 2.5, 3.5, 4.5][..]).unwrap();

    group.bench_function("set_and_commit", |b| {
        b.iter(|| {
            let mut guard = cell.acquire();
            guard.set_information(black_box(&info));
            guard.commit();
        });
    });

    let time = FileTime(133_000_000_000_000_000);
    group.bench_function("commit_precomputed", |b| {
        let checksum = cell.precompute_checksum(time, &info);
        b.iter(|| {
            let mut guard = cell.acquire();
            guard.set_information(black_box(&info));
            guard.commit_precomputed(time, checksum);
        });
    });

    group.finish();
}

fn benchmark_verify(c: &mut Criterion) {
    let mut group = c.benchmark_group("cell_verify");

    for cells in [1usize, 64, 4096].iter() {
        let store: Vec<Cell> = (0..*cells)
            .map(|i| Cell::with_information(&Information::from_value(i as u32).unwrap()))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(cells), cells, |b, _| {
            b.iter(|| store.iter().filter(|cell| cell.verify_checksum()).count());
        });
    }

    let wire = Cell::with_information(&Information::from_value("pump1").unwrap()).snapshot(CellId::new(1, 1));
    group.bench_function("wire", |b| {
        b.iter(|| black_box(&wire).verify_checksum());
    });

    group.finish();
}

criterion_group!(benches, benchmark_compute, benchmark_commit, benchmark_verify);
criterion_main!(benches);
