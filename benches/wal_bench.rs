//! Benchmarks for EmberKV log operations

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use emberkv::wal::{Record, WalRecovery};
use emberkv::Log;
use tempfile::TempDir;

fn record_benchmarks(c: &mut Criterion) {
    c.bench_function("record_parse", |b| {
        b.iter(|| Record::parse(black_box("SET user:1024 some-value-here\r\n")))
    });

    let record = Record::set("user:1024", "some-value-here").unwrap();
    c.bench_function("record_encode", |b| b.iter(|| black_box(&record).encode()));
}

fn replay_benchmarks(c: &mut Criterion) {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("logfile.log");

    let mut contents = String::new();
    for i in 0..10_000 {
        contents.push_str(&format!("SET key{} value{}\r\n", i % 1000, i));
    }
    std::fs::write(&path, contents).unwrap();

    c.bench_function("replay_10k_records", |b| {
        b.iter(|| WalRecovery::verify(black_box(&path)).unwrap())
    });

    c.bench_function("open_log_10k_records", |b| {
        b.iter(|| Log::open(black_box(&path)).unwrap().len())
    });
}

fn append_benchmarks(c: &mut Criterion) {
    let temp = TempDir::new().unwrap();
    let mut log = Log::open(&temp.path().join("logfile.log")).unwrap();
    let mut i = 0u64;

    // One fsync per iteration: this is the server's throughput ceiling
    c.bench_function("durable_set", |b| {
        b.iter(|| {
            i += 1;
            log.set("bench", &i.to_string()).unwrap()
        })
    });
}

criterion_group!(benches, record_benchmarks, replay_benchmarks, append_benchmarks);
criterion_main!(benches);
