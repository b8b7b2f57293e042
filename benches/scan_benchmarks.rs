use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dupescan::controller::{ScanController, ScanRequest, ScanSettings};
use dupescan::duplicates::{ClaimedSet, DuplicateFinder, FinderConfig, FuzzyMatcher};
use dupescan::scanner::{FileRecord, Hasher, Walker, WalkerConfig};
use dupescan::signal::{CancelHandle, StopCondition};
use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;
use tempfile::TempDir;

// Helper to create a test directory with a specific structure
fn setup_test_dir(depth: usize, files_per_dir: usize) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    create_dir_recursive(temp_dir.path().to_path_buf(), depth, files_per_dir);
    temp_dir
}

fn create_dir_recursive(path: PathBuf, depth: usize, files_per_dir: usize) {
    if depth == 0 {
        return;
    }

    if !path.exists() {
        fs::create_dir_all(&path).expect("Failed to create dir");
    }

    for i in 0..files_per_dir {
        let file_path = path.join(format!("file_{}.txt", i));
        fs::write(file_path, format!("content of file {} at depth {}", i, depth))
            .expect("Failed to write file");
    }

    if depth > 1 {
        for i in 0..2 {
            // 2 subdirectories per level
            let sub_dir = path.join(format!("dir_{}", i));
            create_dir_recursive(sub_dir, depth - 1, files_per_dir);
        }
    }
}

// 1. Directory Walking Benchmarks
fn bench_walker(c: &mut Criterion) {
    let temp_dir = setup_test_dir(4, 10); // depth 4, 10 files per dir -> roughly 150 files
    let config = WalkerConfig::default();

    c.bench_function("walker_150_files", |b| {
        b.iter(|| {
            let outcome = Walker::new(temp_dir.path(), config.clone()).walk();
            black_box(outcome.files);
        })
    });
}

// 2. Hashing Benchmarks
fn bench_hasher(c: &mut Criterion) {
    let mut group = c.benchmark_group("hasher");
    let hasher = Hasher::new();

    for size_kb in [1, 1024, 10240] {
        // 1KB, 1MB, 10MB
        let data = vec![b'a'; size_kb * 1024];
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("bench_file.dat");
        fs::write(&file_path, &data).expect("Failed to write bench file");

        group.bench_with_input(format!("blake3_{}KB", size_kb), &file_path, |b, path| {
            b.iter(|| {
                let hash = hasher.full_hash(path).unwrap();
                black_box(hash);
            });
        });
        group.bench_with_input(format!("prehash_{}KB", size_kb), &file_path, |b, path| {
            b.iter(|| {
                let hash = hasher.prehash(path).unwrap();
                black_box(hash);
            });
        });
    }
    group.finish();
}

// 3. Fuzzy Name Matching
fn bench_fuzzy(c: &mut Criterion) {
    let files: Vec<FileRecord> = (0..500)
        .map(|i| {
            FileRecord::new(
                PathBuf::from(format!("/bench/dir_{}/report_{:03}.pdf", i % 7, i)),
                i as u64 + 1,
                SystemTime::now(),
            )
        })
        .collect();
    let matcher = FuzzyMatcher::default();
    let claimed = ClaimedSet::new();
    let stop = StopCondition::never();

    c.bench_function("fuzzy_500_candidates", |b| {
        b.iter(|| {
            let outcome = matcher.find_pairs(&files, &claimed, &stop, None);
            black_box(outcome.pairs);
        })
    });
}

// 4. Grouping Engine Benchmark
fn bench_finder(c: &mut Criterion) {
    let temp_dir = setup_test_dir(3, 10); // ~70 files
                                          // Create some duplicates
    let src = temp_dir.path().join("file_0.txt");
    for i in 1..10 {
        let dst = temp_dir.path().join(format!("dup_{}.txt", i));
        fs::copy(&src, &dst).expect("Failed to copy duplicate");
    }

    let files = Walker::new(temp_dir.path(), WalkerConfig::default()).walk().files;
    let finder = DuplicateFinder::new(FinderConfig::default());
    let stop = StopCondition::never();

    c.bench_function("finder_approx_80_files", |b| {
        b.iter(|| {
            let (groups, stats) = finder.find_groups(files.clone(), &stop);
            black_box((groups, stats));
        })
    });
}

// 5. Full Scan Benchmark
fn bench_scan(c: &mut Criterion) {
    let temp_dir = setup_test_dir(3, 10);
    let request = ScanRequest::new(temp_dir.path());

    c.bench_function("scan_approx_70_files", |b| {
        b.iter(|| {
            let mut controller = ScanController::new(ScanSettings::default());
            let result = controller.scan(&request, &CancelHandle::new()).unwrap();
            black_box(result);
        })
    });
}

criterion_group!(
    benches,
    bench_walker,
    bench_hasher,
    bench_fuzzy,
    bench_finder,
    bench_scan
);
criterion_main!(benches);
