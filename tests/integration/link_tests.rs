use dupescan::controller::{scan, ScanController, ScanRequest, ScanSettings};
use dupescan::duplicates::MatchType;
use dupescan::signal::CancelHandle;
use std::fs;
use tempfile::tempdir;

#[test]
#[cfg(unix)]
fn test_hard_links_are_not_exact_duplicates() {
    let dir = tempdir().unwrap();
    let original = dir.path().join("original.txt");
    fs::write(&original, b"identical content").unwrap();
    fs::hard_link(&original, dir.path().join("link.txt")).unwrap();

    let result = scan(&ScanRequest::new(dir.path()), &CancelHandle::new()).unwrap();

    assert!(result
        .groups
        .iter()
        .all(|g| g.match_type != MatchType::Exact));
    assert_eq!(result.stats.scanned, 2);
}

#[test]
#[cfg(unix)]
fn test_hard_link_beside_real_copy_counts_once() {
    let dir = tempdir().unwrap();
    let original = dir.path().join("a.dat");
    fs::write(&original, b"payload bytes").unwrap();
    fs::write(dir.path().join("b.dat"), b"payload bytes").unwrap();
    fs::hard_link(&original, dir.path().join("c.dat")).unwrap();

    let result = scan(&ScanRequest::new(dir.path()), &CancelHandle::new()).unwrap();

    assert_eq!(result.groups.len(), 1);
    let group = &result.groups[0];
    assert_eq!(group.match_type, MatchType::Exact);
    assert_eq!(group.files.len(), 2);
    let ids: std::collections::HashSet<_> = group
        .files
        .iter()
        .map(|f| {
            use std::os::unix::fs::MetadataExt;
            fs::metadata(&f.path).unwrap().ino()
        })
        .collect();
    assert_eq!(ids.len(), 2);
}

#[test]
#[cfg(unix)]
fn test_symlinks_not_followed_by_default() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("real.txt");
    fs::write(&target, b"content").unwrap();
    std::os::unix::fs::symlink(&target, dir.path().join("alias.txt")).unwrap();

    let result = scan(&ScanRequest::new(dir.path()), &CancelHandle::new()).unwrap();

    assert!(result.groups.is_empty());
    assert_eq!(result.stats.scanned, 2);
}

#[test]
#[cfg(unix)]
fn test_symlink_cycle_terminates_when_following() {
    let dir = tempdir().unwrap();
    let inner = dir.path().join("inner");
    fs::create_dir(&inner).unwrap();
    fs::write(inner.join("a.txt"), b"same").unwrap();
    fs::write(dir.path().join("b.txt"), b"same").unwrap();
    std::os::unix::fs::symlink(dir.path(), inner.join("back")).unwrap();

    let settings = ScanSettings {
        follow_symlinks: true,
        ..ScanSettings::default()
    };
    let result = ScanController::new(settings)
        .scan(&ScanRequest::new(dir.path()), &CancelHandle::new())
        .unwrap();

    assert!(!result.stats.timed_out);
    assert_eq!(result.walk_errors, 1);
    assert_eq!(result.groups.len(), 1);
    assert_eq!(result.groups[0].files.len(), 2);
}

#[test]
#[cfg(unix)]
fn test_unreadable_file_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"shared").unwrap();
    fs::write(dir.path().join("b.txt"), b"shared").unwrap();
    let locked = dir.path().join("c.txt");
    fs::write(&locked, b"shared").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root ignores permission bits, so the file may still be readable.
    let readable = fs::File::open(&locked).is_ok();

    let result = scan(&ScanRequest::new(dir.path()), &CancelHandle::new()).unwrap();

    assert_eq!(result.groups.len(), 1);
    let expected = if readable { 3 } else { 2 };
    assert_eq!(result.groups[0].files.len(), expected);
    assert_eq!(result.stats.scanned, 3);

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
}

#[test]
#[cfg(unix)]
fn test_dangling_link_counted_whether_followed_or_not() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"content").unwrap();
    std::os::unix::fs::symlink(dir.path().join("gone.txt"), dir.path().join("dangling")).unwrap();

    let plain = scan(&ScanRequest::new(dir.path()), &CancelHandle::new()).unwrap();
    let settings = ScanSettings {
        follow_symlinks: true,
        ..ScanSettings::default()
    };
    let following = ScanController::new(settings)
        .scan(&ScanRequest::new(dir.path()), &CancelHandle::new())
        .unwrap();

    assert_eq!(plain.stats.scanned, 2);
    assert_eq!(plain.walk_errors, 0);
    assert_eq!(following.stats.scanned, 2);
    assert_eq!(following.walk_errors, 1);
}
