use dupescan::controller::{scan, ScanController, ScanPhase, ScanRequest, ScanSettings};
use dupescan::duplicates::MatchType;
use dupescan::progress::{phase, ProgressCallback};
use dupescan::signal::{CancelHandle, StopReason};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

fn build_tree(root: &Path) {
    for (dir, name, content) in [
        ("a", "report.txt", "quarterly"),
        ("b", "report.txt", "quarterly"),
        ("a", "big.bin", "0123456789abcdef"),
        ("c", "big.bin", "0123456789abcdef"),
        ("x", "notes.md", "aaaa"),
        ("y", "notes.md", "bbbb"),
        ("", "draft1.doc", "1"),
        ("", "draft2.doc", "22"),
    ] {
        let dir = root.join(dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(name), content).unwrap();
    }
}

/// Cancels the scan when a given phase starts.
struct CancelAtPhase {
    handle: CancelHandle,
    phase: &'static str,
}

impl ProgressCallback for CancelAtPhase {
    fn on_phase_start(&self, phase: &str, _total: usize) {
        if phase == self.phase {
            self.handle.cancel();
        }
    }

    fn on_progress(&self, _current: usize, _path: &str) {}

    fn on_phase_end(&self, _phase: &str) {}
}

fn scan_cancelling_at(root: &Path, phase: &'static str) -> dupescan::controller::ScanResult {
    let handle = CancelHandle::new();
    let callback = Arc::new(CancelAtPhase {
        handle: handle.clone(),
        phase,
    });
    let mut controller = ScanController::new(ScanSettings::default()).with_progress_callback(callback);
    let result = controller.scan(&ScanRequest::new(root), &handle).unwrap();
    assert_eq!(controller.phase(), ScanPhase::Done);
    result
}

#[test]
fn test_zero_timeout_returns_partial_success() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());

    let request = ScanRequest::new(dir.path()).with_timeout(Duration::ZERO);
    let result = scan(&request, &CancelHandle::new()).unwrap();

    assert!(result.stats.timed_out);
    assert!(result.groups.is_empty());
    assert_eq!(result.stop_reason, Some(StopReason::DeadlineExceeded));
}

#[test]
fn test_tiny_timeouts_yield_subset_of_full_result() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());

    let full = scan(&ScanRequest::new(dir.path()), &CancelHandle::new()).unwrap();
    assert!(!full.stats.timed_out);
    assert!(!full.groups.is_empty());

    for micros in [0u64, 1, 50, 500, 5_000] {
        let request = ScanRequest::new(dir.path()).with_timeout(Duration::from_micros(micros));
        let partial = scan(&request, &CancelHandle::new()).unwrap();

        for group in &partial.groups {
            assert!(
                full.groups.contains(group),
                "group {:?} missing from untimed result",
                group.hash
            );
        }
        if !partial.stats.timed_out {
            assert_eq!(partial.groups, full.groups);
        }
    }
}

#[test]
fn test_cancelled_handle_before_scan() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());

    let handle = CancelHandle::new();
    handle.cancel();
    let result = scan(&ScanRequest::new(dir.path()), &handle).unwrap();

    assert!(result.stats.timed_out);
    assert!(result.groups.is_empty());
    assert_eq!(result.stop_reason, Some(StopReason::Cancelled));
}

#[test]
fn test_cancel_during_walk_skips_grouping() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());

    let result = scan_cancelling_at(dir.path(), phase::WALKING);

    assert!(result.stats.timed_out);
    assert!(result.groups.is_empty());
}

#[test]
fn test_cancel_before_full_hash_drops_unfinished_buckets() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());

    let result = scan_cancelling_at(dir.path(), phase::FULLHASH);

    assert!(result.stats.timed_out);
    assert!(result.groups.is_empty());
    assert_eq!(result.stop_reason, Some(StopReason::Cancelled));
}

#[test]
fn test_cancel_during_fuzzy_stage_keeps_resolved_groups() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());

    let full = scan(&ScanRequest::new(dir.path()), &CancelHandle::new()).unwrap();
    let result = scan_cancelling_at(dir.path(), phase::FUZZY);

    assert!(result.stats.timed_out);
    assert_eq!(result.groups.len(), 3);
    assert!(result
        .groups
        .iter()
        .all(|g| g.match_type != MatchType::FuzzyName));
    assert!(result.groups.iter().all(|g| full.groups.contains(g)));
    assert_eq!(result.stats.total_duplicates, 3);
    assert!(full
        .groups
        .iter()
        .any(|g| g.match_type == MatchType::FuzzyName));
}

#[test]
fn test_each_scan_has_its_own_handle() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());

    let cancelled = CancelHandle::new();
    cancelled.cancel();
    let first = scan(&ScanRequest::new(dir.path()), &cancelled).unwrap();
    let second = scan(&ScanRequest::new(dir.path()), &CancelHandle::new()).unwrap();

    assert!(first.stats.timed_out);
    assert!(!second.stats.timed_out);
    assert!(!second.groups.is_empty());
}
