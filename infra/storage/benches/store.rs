use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use sos_store::{AsyncObjectStore, ObjectStore};
use std::hint::black_box;
use std::time::Duration;
use tempfile::TempDir;

// ============================================================================
// Benchmark: Key Resolution
// ============================================================================

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");

    let temp = TempDir::new().unwrap();
    let store = ObjectStore::open(temp.path().join("objects")).unwrap();

    group.bench_function("short_key", |b| {
        b.iter(|| black_box(store.resolve("user:42")));
    });

    let long_key = "k".repeat(4096);
    group.bench_function("long_key", |b| {
        b.iter(|| black_box(store.resolve(&long_key)));
    });

    group.finish();
}

// ============================================================================
// Benchmark: Store / Get / Delete
// ============================================================================

fn bench_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("operations");
    group.measurement_time(Duration::from_secs(10));

    let temp = TempDir::new().unwrap();
    let sizes = [("1KB", 1024), ("64KB", 64 * 1024), ("1MB", 1024 * 1024)];

    for (name, size) in sizes {
        let data: Vec<u8> = (0..size).map(|i| u8::try_from(i % 256).unwrap()).collect();
        group.throughput(Throughput::Bytes(u64::try_from(size).unwrap_or(u64::MAX)));

        // Without fsync this measures the protocol, not the disk.
        let store = ObjectStore::builder()
            .root(temp.path().join("nosync"))
            .sync(false)
            .connect()
            .unwrap();

        group.bench_with_input(BenchmarkId::new("store", name), &data, |b, data| {
            b.iter(|| store.store_bytes(format!("bench_{name}"), data).unwrap());
        });

        store.store_bytes(format!("read_{name}"), &data).unwrap();
        group.bench_function(BenchmarkId::new("get", name), |b| {
            b.iter(|| black_box(store.get_bytes(format!("read_{name}")).unwrap()));
        });

        let synced = ObjectStore::open(temp.path().join("sync")).unwrap();
        group.bench_with_input(BenchmarkId::new("store_synced", name), &data, |b, data| {
            b.iter(|| synced.store_bytes(format!("bench_{name}"), data).unwrap());
        });
    }

    let store = ObjectStore::builder().root(temp.path().join("churn")).sync(false).connect().unwrap();
    let data = vec![42u8; 1024];
    group.throughput(Throughput::Elements(1));
    group.bench_function("store_then_delete", |b| {
        b.iter(|| {
            store.store_bytes("churn", &data).unwrap();
            store.delete("churn").unwrap();
        });
    });

    group.finish();
}

// ============================================================================
// Benchmark: Async Facade
// ============================================================================

fn bench_async(c: &mut Criterion) {
    let mut group = c.benchmark_group("async");

    let temp = TempDir::new().unwrap();
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = AsyncObjectStore::from(
        ObjectStore::builder().root(temp.path().join("objects")).sync(false).connect().unwrap(),
    );
    let data = vec![42u8; 10 * 1024];

    group.bench_function("store_10KB", |b| {
        b.to_async(&rt).iter(|| async { store.store("async", data.clone()).await.unwrap() });
    });

    rt.block_on(async { store.store("async_read", data.clone()).await.unwrap() });
    group.bench_function("get_10KB", |b| {
        b.to_async(&rt).iter(|| async { black_box(store.get("async_read").await.unwrap()) });
    });

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(benches, bench_resolve, bench_operations, bench_async);

criterion_main!(benches);
