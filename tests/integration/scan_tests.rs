use dupescan::controller::{scan, ScanRequest};
use dupescan::duplicates::{name_distance, MatchType};
use dupescan::output::JsonOutput;
use dupescan::signal::CancelHandle;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write(root: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn run(root: &Path) -> dupescan::controller::ScanResult {
    scan(&ScanRequest::new(root), &CancelHandle::new()).unwrap()
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let result = run(dir.path());

    assert!(result.groups.is_empty());
    assert_eq!(result.stats.scanned, 0);
    assert_eq!(result.stats.groups, 0);
    assert!(!result.stats.timed_out);
}

#[test]
fn test_identical_content_forms_one_exact_group() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.txt", b"hello");
    write(dir.path(), "b.txt", b"hello");
    write(dir.path(), "c.txt", b"world");

    let result = run(dir.path());

    assert_eq!(result.groups.len(), 1);
    let group = &result.groups[0];
    assert_eq!(group.match_type, MatchType::Exact);
    let names: Vec<_> = group.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "b.txt"]);
    assert_eq!(group.hash, blake3::hash(b"hello").to_hex().to_string());
    assert_eq!(result.stats.scanned, 3);
    assert_eq!(result.stats.matched, 2);
    assert_eq!(result.stats.total_duplicates, 1);
}

#[test]
fn test_same_name_different_size_is_not_grouped() {
    let dir = tempdir().unwrap();
    write(dir.path(), "X/report.txt", b"0123456789");
    write(dir.path(), "Y/report.txt", b"abcdefghijkl");

    let result = run(dir.path());

    assert!(result.groups.is_empty());
    assert_eq!(result.stats.scanned, 4);
}

#[test]
fn test_near_names_form_fuzzy_pair() {
    let dir = tempdir().unwrap();
    write(dir.path(), "invoice1.pdf", b"first invoice");
    write(dir.path(), "invoice2.pdf", b"the second invoice body");

    let result = run(dir.path());

    assert_eq!(result.groups.len(), 1);
    let group = &result.groups[0];
    assert_eq!(group.match_type, MatchType::FuzzyName);
    assert_eq!(group.hash, "fuzzy");
    assert_eq!(group.files.len(), 2);
    assert_eq!(group.files[0].name, "invoice1.pdf");
    assert_eq!(group.files[1].name, "invoice2.pdf");
}

#[test]
fn test_same_name_and_size_in_two_folders_is_metadata_group() {
    let dir = tempdir().unwrap();
    let long_a = "a".repeat(5000);
    let mut long_b = "a".repeat(4999);
    long_b.push('b');
    write(dir.path(), "left/photo.jpg", long_a.as_bytes());
    write(dir.path(), "right/PHOTO.JPG", long_b.as_bytes());

    let result = run(dir.path());

    assert_eq!(result.groups.len(), 1);
    assert_eq!(result.groups[0].match_type, MatchType::Metadata);
    assert_eq!(result.groups[0].hash, "metadata");
}

#[test]
fn test_group_invariants_on_mixed_tree() {
    let dir = tempdir().unwrap();
    write(dir.path(), "docs/report.txt", b"quarterly numbers");
    write(dir.path(), "backup/report.txt", b"quarterly numbers");
    write(dir.path(), "backup/report2.txt", b"quarterly numbers");
    write(dir.path(), "x/notes.md", b"aaaa");
    write(dir.path(), "y/notes.md", b"bbbb");
    write(dir.path(), "img1.png", b"1");
    write(dir.path(), "img2.png", b"22");
    write(dir.path(), "img3.png", b"333");
    write(dir.path(), "unique.bin", b"nothing like it");

    let result = run(dir.path());
    assert!(!result.groups.is_empty());

    let mut claimed: HashSet<PathBuf> = HashSet::new();
    for group in &result.groups {
        assert!(group.files.len() >= 2);
        match group.match_type {
            MatchType::Exact => {
                let digests: BTreeSet<_> = group
                    .files
                    .iter()
                    .map(|f| blake3::hash(&fs::read(&f.path).unwrap()).to_hex().to_string())
                    .collect();
                assert_eq!(digests.len(), 1);
                assert_eq!(digests.iter().next().unwrap(), &group.hash);
            }
            MatchType::Metadata => {
                let keys: BTreeSet<_> = group
                    .files
                    .iter()
                    .map(|f| (f.name.to_lowercase(), f.size))
                    .collect();
                assert_eq!(keys.len(), 1);
                let parents: BTreeSet<_> = group.files.iter().map(|f| f.path.parent()).collect();
                assert!(parents.len() >= 2);
            }
            MatchType::FuzzyName => {
                assert_eq!(group.files.len(), 2);
                let d = name_distance(
                    &group.files[0].name.to_lowercase(),
                    &group.files[1].name.to_lowercase(),
                );
                assert!((1..=3).contains(&d));
            }
        }
        if group.match_type != MatchType::FuzzyName {
            for file in &group.files {
                assert!(claimed.insert(file.path.clone()), "file in two groups");
            }
        }
    }
    for group in result
        .groups
        .iter()
        .filter(|g| g.match_type == MatchType::FuzzyName)
    {
        assert!(group.files.iter().all(|f| !claimed.contains(&f.path)));
    }

    let exact = &result.groups[0];
    assert_eq!(exact.match_type, MatchType::Exact);
    assert_eq!(exact.files.len(), 3);
}

#[test]
fn test_unique_size_never_in_exact_or_metadata_group() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a/same.txt", b"12345");
    write(dir.path(), "b/same.txt", b"12345");
    let lonely = write(dir.path(), "c/same.txt", b"1234567");

    let result = run(dir.path());

    for group in result
        .groups
        .iter()
        .filter(|g| g.match_type != MatchType::FuzzyName)
    {
        assert!(!group.contains(&lonely));
    }
}

#[test]
fn test_scan_is_idempotent() {
    let dir = tempdir().unwrap();
    write(dir.path(), "one/a.txt", b"dup");
    write(dir.path(), "two/a.txt", b"dup");
    write(dir.path(), "draft1.doc", b"x");
    write(dir.path(), "draft2.doc", b"yy");

    let first = run(dir.path());
    let second = run(dir.path());

    assert_eq!(first.groups, second.groups);
    assert_eq!(first.stats.scanned, second.stats.scanned);
}

#[test]
fn test_filters_restrict_candidates() {
    let dir = tempdir().unwrap();
    write(dir.path(), "Invoice_A.pdf", b"same");
    write(dir.path(), "invoice_b.PDF", b"same");
    write(dir.path(), "invoice_c.txt", b"same");
    write(dir.path(), "receipt.pdf", b"same");

    let request = ScanRequest::new(dir.path())
        .with_name_filter(Some("INVOICE".to_string()))
        .with_extension_filter(Some(".pdf".to_string()));
    let result = scan(&request, &CancelHandle::new()).unwrap();

    assert_eq!(result.groups.len(), 1);
    let names: Vec<_> = result.groups[0].files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Invoice_A.pdf", "invoice_b.PDF"]);
    assert_eq!(result.stats.scanned, 4);
}

#[test]
fn test_content_filter_keeps_matching_groups() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a1.log", b"ERROR: disk full");
    write(dir.path(), "a2.log", b"ERROR: disk full");
    write(dir.path(), "b1.dat", b"just some bytes!");
    write(dir.path(), "b2.dat", b"just some bytes!");

    let request = ScanRequest::new(dir.path()).with_content_filter(Some("ERROR".to_string()));
    let result = scan(&request, &CancelHandle::new()).unwrap();

    let exact: Vec<_> = result
        .groups
        .iter()
        .filter(|g| g.match_type == MatchType::Exact)
        .collect();
    assert_eq!(exact.len(), 1);
    assert_eq!(exact[0].files[0].name, "a1.log");
}

#[test]
fn test_depth_limit() {
    let dir = tempdir().unwrap();
    write(dir.path(), "top.txt", b"same");
    write(dir.path(), "l1/mid.txt", b"same");
    write(dir.path(), "l1/l2/deep.txt", b"same");

    let request = ScanRequest::new(dir.path()).with_max_depth(1);
    let result = scan(&request, &CancelHandle::new()).unwrap();

    assert_eq!(result.groups.len(), 1);
    assert_eq!(result.groups[0].files.len(), 2);
    assert!(result.groups[0].files.iter().all(|f| f.name != "deep.txt"));
}

#[test]
fn test_max_files_limit() {
    let dir = tempdir().unwrap();
    for i in 0..10 {
        write(dir.path(), &format!("f{:02}.txt", i), b"same content");
    }

    let request = ScanRequest::new(dir.path()).with_max_files(3);
    let result = scan(&request, &CancelHandle::new()).unwrap();

    assert!(result.limit_reached);
    assert!(!result.stats.timed_out);
    assert_eq!(result.groups.len(), 1);
    assert_eq!(result.groups[0].files.len(), 3);
}

#[test]
fn test_version_control_directories_skipped() {
    let dir = tempdir().unwrap();
    write(dir.path(), ".git/objects/blob", b"same");
    write(dir.path(), "node_modules/pkg/index.js", b"same");
    write(dir.path(), "src/index.js", b"other");

    let result = run(dir.path());

    assert!(result.groups.is_empty());
    assert_eq!(result.stats.scanned, 4);
}

#[test]
fn test_missing_root_is_configuration_error() {
    let dir = tempdir().unwrap();
    let err = scan(&ScanRequest::new(dir.path().join("gone")), &CancelHandle::new()).unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[test]
fn test_json_output_of_scan() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.txt", b"hello");
    write(dir.path(), "b.txt", b"hello");

    let result = run(dir.path());
    let json: serde_json::Value =
        serde_json::from_str(&JsonOutput::new(&result).to_json().unwrap()).unwrap();

    assert_eq!(json["success"], true);
    assert_eq!(json["groups"][0]["matchType"], "exact");
    assert_eq!(json["groups"][0]["files"][0]["name"], "a.txt");
    assert!(json["groups"][0]["files"][0]["mtime"].as_u64().unwrap() > 0);
    assert_eq!(json["stats"]["groups"], 1);
    assert_eq!(json["stats"]["timedOut"], false);
}
