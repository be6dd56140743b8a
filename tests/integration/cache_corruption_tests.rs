use find_dups::cache::{CacheError, CacheMaintainer, SignatureCache};
use find_dups::duplicates::{DuplicateFinder, FinderError};
use std::fs;
use std::path::Path;
use tempfile::{tempdir, NamedTempFile};

fn seed_raw(path: &Path, rows: &[(&str, &str)]) {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS signatures (path TEXT PRIMARY KEY NOT NULL, value TEXT NOT NULL)",
    )
    .unwrap();
    for (key, value) in rows {
        conn.execute(
            "INSERT OR REPLACE INTO signatures (path, value) VALUES (?1, ?2)",
            rusqlite::params![key, value],
        )
        .unwrap();
    }
}

fn garbage() -> Vec<u8> {
    b"not a sqlite database ".repeat(200)
}

#[test]
fn test_open_corrupted_database() {
    let temp_file = NamedTempFile::new().unwrap();
    fs::write(temp_file.path(), garbage()).unwrap();

    let mut cache = SignatureCache::new(temp_file.path());
    let err = cache.open().unwrap_err();

    assert!(matches!(err, CacheError::Open { .. }));
    assert!(err.is_fatal());
    assert!(!cache.is_open());
}

#[test]
fn test_scan_with_corrupted_cache_fails() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"dup").unwrap();
    fs::write(dir.path().join("b"), b"dup").unwrap();

    let temp_file = NamedTempFile::new().unwrap();
    fs::write(temp_file.path(), garbage()).unwrap();

    let mut cache = SignatureCache::new(temp_file.path());
    let result = DuplicateFinder::with_defaults().find_duplicates(dir.path(), Some(&mut cache));

    assert!(matches!(result, Err(FinderError::Cache(CacheError::Open { .. }))));
}

#[test]
fn test_recovery_after_removing_corrupted_file() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_path_buf();
    fs::write(&path, garbage()).unwrap();

    assert!(SignatureCache::new(&path).open().is_err());

    fs::remove_file(&path).unwrap();
    let mut cache = SignatureCache::new(&path);
    cache.open().unwrap();
    assert!(cache.is_empty().unwrap());
}

#[test]
fn test_malformed_value_on_lookup_is_reported() {
    let temp_file = NamedTempFile::new().unwrap();
    seed_raw(temp_file.path(), &[("/data/bad", "this is not a record")]);

    let mut cache = SignatureCache::new(temp_file.path());
    let err = cache.get(Path::new("/data/bad"), 10).unwrap_err();

    assert!(matches!(err, CacheError::Malformed { ref key, .. } if key == "/data/bad"));
    assert!(!err.is_fatal());
    assert_eq!(cache.stats().malformed, 1);
}

#[test]
fn test_malformed_value_is_recomputed_during_scan() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    fs::write(&a, b"abcd").unwrap();
    fs::write(&b, b"abcd").unwrap();

    let temp_file = NamedTempFile::new().unwrap();
    seed_raw(
        temp_file.path(),
        &[(a.to_str().unwrap(), "zzzz|not-a-size|yesterday")],
    );

    let mut cache = SignatureCache::new(temp_file.path());
    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path(), Some(&mut cache))
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].paths(), vec![a.clone(), b]);
    assert_eq!(summary.cache_hits, 0);
    // The bad value was replaced with a fresh record
    assert_eq!(cache.get(&a, 4).unwrap().unwrap().signature, groups[0].signature);
}

#[test]
fn test_cleanup_purges_every_malformed_shape() {
    let temp_file = NamedTempFile::new().unwrap();
    seed_raw(
        temp_file.path(),
        &[
            ("/garbage/plain", "garbage"),
            ("/garbage/fields", "a|b"),
            ("/garbage/size", "abcd|-1|2026-01-01T00:00:00+00:00"),
            ("/garbage/time", "abcd|4|last tuesday"),
            ("/garbage/json", "{\"v\":1,\"sig\":\"abcd\"}"),
            ("/garbage/version", "{\"v\":9,\"sig\":\"abcd\",\"size\":4,\"saved_at\":\"2026-01-01T00:00:00Z\"}"),
        ],
    );

    let mut cache = SignatureCache::new(temp_file.path());
    cache.put(Path::new("/fine"), "abcd", 4).unwrap();

    let summary = CacheMaintainer::new(&mut cache).cleanup().unwrap();

    assert_eq!(summary.scanned, 7);
    assert_eq!(summary.malformed, 6);
    assert_eq!(summary.expired, 0);
    assert_eq!(summary.deleted, 6);
    assert_eq!(cache.len().unwrap(), 1);
    assert!(cache.get(Path::new("/fine"), 4).unwrap().is_some());
}

#[cfg(unix)]
#[test]
fn test_cache_in_unwritable_directory_fails_to_open() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let locked = dir.path().join("locked");
    fs::create_dir(&locked).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

    // Root can write anywhere
    if fs::write(locked.join("probe"), b"").is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let mut cache = SignatureCache::new(locked.join("sigs.cache"));
    let result = cache.open();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert!(matches!(result, Err(CacheError::Open { .. })));
}
