//! Metadata duplicates (stage 4).
//!
//! Files that escaped the exact stage are bucketed by lowercased base name
//! and size. Content is never read, so a metadata group means "looks the
//! same, unverified".

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use super::groups::{ClaimedSet, DuplicateGroup};
use crate::scanner::{collapse_hardlinks, FileRecord};

/// Build metadata groups from the unclaimed files in `files`.
///
/// A bucket becomes a group only if, after hard links are collapsed, it
/// still holds two or more files spread over at least two parent
/// directories. Every member of an emitted bucket is claimed, including
/// collapsed links. Groups come out ordered by (name, size).
pub fn find_metadata_groups(files: &[FileRecord], claimed: &mut ClaimedSet) -> Vec<DuplicateGroup> {
    let mut buckets: BTreeMap<(String, u64), Vec<FileRecord>> = BTreeMap::new();
    for file in files {
        if claimed.is_claimed(file) {
            continue;
        }
        buckets
            .entry((file.name_key(), file.size))
            .or_default()
            .push(file.clone());
    }

    let mut groups = Vec::new();
    for ((name, size), members) in buckets {
        if members.len() < 2 {
            continue;
        }

        let (kept, collapsed) = collapse_hardlinks(members);
        if kept.len() < 2 {
            log::debug!(
                "Metadata bucket '{}' ({} bytes) is a single file behind hard links",
                name,
                size
            );
            continue;
        }

        let parents: HashSet<&Path> = kept.iter().filter_map(FileRecord::parent).collect();
        if parents.len() < 2 {
            log::debug!(
                "Metadata bucket '{}' ({} bytes) lives in one directory",
                name,
                size
            );
            continue;
        }

        log::debug!(
            "Metadata group '{}' ({} bytes): {} files",
            name,
            size,
            kept.len()
        );
        claimed.claim_all(kept.iter().chain(&collapsed));
        if let Some(group) = DuplicateGroup::metadata(kept) {
            groups.push(group);
        }
    }

    groups
}
