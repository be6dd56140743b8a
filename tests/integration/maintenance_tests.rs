use chrono::{Duration, Utc};
use find_dups::cache::{CacheEntry, CacheMaintainer, SignatureCache, UpdateMode};
use find_dups::duplicates::DuplicateFinder;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn aged_entry(age: Duration) -> CacheEntry {
    CacheEntry {
        signature: "abcd".to_string(),
        size: 4,
        saved_at: Utc::now() - age,
    }
}

#[test]
fn test_cleanup_removes_only_entries_older_than_retention() {
    let dir = tempdir().unwrap();
    let mut cache = SignatureCache::new(dir.path().join("sweep.cache"));
    let now = Utc::now();

    let young = Path::new("/keep/young");
    let boundary = Path::new("/keep/boundary");
    let old = Path::new("/drop/old");

    let at = |age: Duration| CacheEntry {
        signature: "abcd".to_string(),
        size: 4,
        saved_at: now - age,
    };
    cache.insert(young, &at(Duration::days(3))).unwrap();
    cache.insert(boundary, &at(Duration::days(90))).unwrap();
    cache.insert(old, &at(Duration::days(90) + Duration::hours(1))).unwrap();

    let summary = CacheMaintainer::new(&mut cache).cleanup_at(now).unwrap();

    assert_eq!(summary.scanned, 3);
    assert_eq!(summary.expired, 1);
    assert_eq!(summary.deleted, 1);
    assert!(cache.get(young, 4).unwrap().is_some());
    assert!(cache.get(boundary, 4).unwrap().is_some());
    assert!(cache.get(old, 4).unwrap().is_none());
}

#[test]
fn test_cleanup_twice_is_a_no_op() {
    let mut cache = SignatureCache::in_memory();
    cache
        .insert(Path::new("/stale"), &aged_entry(Duration::days(200)))
        .unwrap();

    let first = CacheMaintainer::new(&mut cache).cleanup().unwrap();
    let second = CacheMaintainer::new(&mut cache).cleanup().unwrap();

    assert_eq!(first.deleted, 1);
    assert_eq!(second.scanned, 0);
    assert_eq!(second.deleted, 0);
}

#[test]
fn test_update_then_scan_hits_cache() {
    let data = tempdir().unwrap();
    fs::write(data.path().join("a"), b"abcd").unwrap();
    fs::write(data.path().join("b"), b"abcd").unwrap();
    fs::write(data.path().join("c"), b"xyz").unwrap();

    let store = tempdir().unwrap();
    let cache_path = store.path().join("update.cache");

    let mut cache = SignatureCache::new(&cache_path);
    let update = CacheMaintainer::new(&mut cache)
        .update(data.path(), UpdateMode::Incremental)
        .unwrap();
    cache.close().unwrap();

    // Every file is cached, not just size candidates
    assert_eq!(update.files_seen, 3);
    assert_eq!(update.inserted, 3);
    assert!(!update.is_partial());

    let mut cache = SignatureCache::new(&cache_path);
    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(data.path(), Some(&mut cache))
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(summary.cache_hits, 2);
    assert_eq!(summary.cache_stats.unwrap().writes, 0);
}

#[test]
fn test_incremental_update_reuses_and_full_update_rehashes() {
    let data = tempdir().unwrap();
    fs::write(data.path().join("one"), b"first file").unwrap();
    fs::write(data.path().join("two"), b"second file").unwrap();

    let mut cache = SignatureCache::in_memory();
    CacheMaintainer::new(&mut cache)
        .update(data.path(), UpdateMode::Incremental)
        .unwrap();

    let incremental = CacheMaintainer::new(&mut cache)
        .update(data.path(), UpdateMode::Incremental)
        .unwrap();
    assert_eq!(incremental.reused, 2);
    assert_eq!(incremental.inserted, 0);

    let full = CacheMaintainer::new(&mut cache)
        .update(data.path(), UpdateMode::Full)
        .unwrap();
    assert_eq!(full.reused, 0);
    assert_eq!(full.inserted, 2);
    assert_eq!(cache.len().unwrap(), 2);
}

#[test]
fn test_update_sweeps_expired_entries_outside_root() {
    let data = tempdir().unwrap();
    fs::write(data.path().join("fresh"), b"fresh").unwrap();

    let mut cache = SignatureCache::in_memory();
    cache
        .insert(Path::new("/elsewhere/stale"), &aged_entry(Duration::days(91)))
        .unwrap();
    cache
        .insert(Path::new("/elsewhere/recent"), &aged_entry(Duration::days(10)))
        .unwrap();

    let summary = CacheMaintainer::new(&mut cache)
        .update(data.path(), UpdateMode::Incremental)
        .unwrap();

    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.cleanup.expired, 1);
    assert_eq!(cache.len().unwrap(), 2);
    assert!(cache.get(Path::new("/elsewhere/recent"), 4).unwrap().is_some());
}

#[test]
fn test_update_rejects_missing_root() {
    let mut cache = SignatureCache::in_memory();
    let result = CacheMaintainer::new(&mut cache)
        .update(Path::new("/no/such/root/for/find_dups"), UpdateMode::Incremental);

    assert!(result.is_err());
    assert!(!cache.is_open());
}
