use find_dups::cache::SignatureCache;
use find_dups::duplicates::{DuplicateFinder, FinderConfig, FinderError};
use find_dups::scanner::{CachePolicy, Hasher};
use std::fs::{self, File};
use std::io::Write;
use tempfile::tempdir;

fn write_file(path: &std::path::Path, content: &[u8]) {
    File::create(path).unwrap().write_all(content).unwrap();
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let finder = DuplicateFinder::with_defaults();

    let (groups, summary) = finder.find_duplicates(dir.path(), None).unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 0);
    assert_eq!(summary.duplicate_groups, 0);
}

#[test]
fn test_scan_unique_files() {
    let dir = tempdir().unwrap();

    write_file(&dir.path().join("a.txt"), b"content a");
    write_file(&dir.path().join("b.txt"), b"content bb");
    write_file(&dir.path().join("c.txt"), b"content ccc");

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path(), None)
        .unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.eliminated_by_size, 3);
    assert_eq!(summary.files_hashed, 0);
}

#[test]
fn test_scan_two_identical_one_different() {
    let dir = tempdir().unwrap();

    write_file(&dir.path().join("a"), b"abcd");
    write_file(&dir.path().join("b"), b"abcd");
    write_file(&dir.path().join("c"), b"xyz");

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path(), None)
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].size, 4);
    assert_eq!(groups[0].size_display(), "4 B");
    assert_eq!(
        groups[0].paths(),
        vec![dir.path().join("a"), dir.path().join("b")]
    );
    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.duplicate_files, 1);
    assert_eq!(summary.reclaimable_space, 4);
}

#[test]
fn test_same_size_different_content_is_not_duplicate() {
    let dir = tempdir().unwrap();

    write_file(&dir.path().join("x"), &[b'x'; 10]);
    write_file(&dir.path().join("y"), &[b'y'; 10]);
    write_file(&dir.path().join("z"), &[b'z'; 20]);

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path(), None)
        .unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.files_hashed, 2);
}

#[test]
fn test_scan_nested_directories() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("subdir").join("deeper");
    fs::create_dir_all(&sub).unwrap();

    write_file(&dir.path().join("top.bin"), b"nested duplicate");
    write_file(&sub.join("bottom.bin"), b"nested duplicate");

    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path(), None)
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
    assert!(groups[0].paths().contains(&sub.join("bottom.bin")));
}

#[test]
fn test_groups_reported_largest_first() {
    let dir = tempdir().unwrap();

    write_file(&dir.path().join("s1"), b"tiny");
    write_file(&dir.path().join("s2"), b"tiny");
    write_file(&dir.path().join("l1"), &[7u8; 4096]);
    write_file(&dir.path().join("l2"), &[7u8; 4096]);
    write_file(&dir.path().join("m1"), &[3u8; 100]);
    write_file(&dir.path().join("m2"), &[3u8; 100]);

    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path(), None)
        .unwrap();

    let sizes: Vec<u64> = groups.iter().map(|g| g.size).collect();
    assert_eq!(sizes, vec![4096, 100, 4]);
}

#[test]
fn test_large_group_with_mmap_hashing() {
    let dir = tempdir().unwrap();
    let content = vec![0x5Au8; 256 * 1024];

    for name in ["one", "two", "three"] {
        write_file(&dir.path().join(name), &content);
    }

    let finder = DuplicateFinder::new(
        FinderConfig::default().with_hasher(Hasher::new().with_mmap_threshold(1024)),
    );
    let (groups, _) = finder.find_duplicates(dir.path(), None).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 3);
    assert_eq!(groups[0].duplicate_count(), 2);

    // Streaming and mapping agree on the signature
    let (streamed, _) = DuplicateFinder::new(
        FinderConfig::default().with_hasher(Hasher::new().with_mmap(false)),
    )
    .find_duplicates(dir.path(), None)
    .unwrap();
    assert_eq!(streamed[0].signature, groups[0].signature);
}

#[test]
fn test_rescan_with_cache_is_identical() {
    let dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    let cache_path = cache_dir.path().join("sigs.cache");

    write_file(&dir.path().join("a"), b"abcd");
    write_file(&dir.path().join("b"), b"abcd");
    write_file(&dir.path().join("c"), b"xyz");

    let finder = DuplicateFinder::with_defaults();

    let mut cache = SignatureCache::new(&cache_path);
    let (first, first_summary) = finder.find_duplicates(dir.path(), Some(&mut cache)).unwrap();
    cache.close().unwrap();
    assert_eq!(first_summary.cache_hits, 0);

    let mut cache = SignatureCache::new(&cache_path);
    let (second, second_summary) = finder
        .find_duplicates(dir.path(), Some(&mut cache))
        .unwrap();
    cache.close().unwrap();

    assert_eq!(first, second);
    assert_eq!(second_summary.cache_hits, 2);
    let stats = second_summary.cache_stats.unwrap();
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.writes, 0);
}

#[test]
fn test_disabled_policy_ignores_given_cache() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("a"), b"same");
    write_file(&dir.path().join("b"), b"same");

    let mut cache = SignatureCache::in_memory();
    let finder =
        DuplicateFinder::new(FinderConfig::default().with_cache_policy(CachePolicy::DISABLED));
    let (groups, summary) = finder.find_duplicates(dir.path(), Some(&mut cache)).unwrap();

    assert_eq!(groups.len(), 1);
    assert!(summary.cache_stats.is_none());
    assert!(!cache.is_open());
}

#[test]
fn test_scan_non_existent_path() {
    let result = DuplicateFinder::with_defaults()
        .find_duplicates(std::path::Path::new("/non/existent/path/12345"), None);

    match result {
        Err(FinderError::PathNotFound(path)) => {
            assert!(path.to_string_lossy().contains("non/existent/path/12345"));
        }
        other => panic!("Expected PathNotFound error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_scan_file_instead_of_directory() {
    let dir = tempdir().unwrap();
    let file_path = dir.path().join("file.txt");
    File::create(&file_path).unwrap();

    let result = DuplicateFinder::with_defaults().find_duplicates(&file_path, None);

    match result {
        Err(FinderError::NotADirectory(path)) => {
            assert!(path.to_string_lossy().contains("file.txt"));
        }
        other => panic!("Expected NotADirectory error, got {:?}", other.map(|_| ())),
    }
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_not_followed() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("target.bin");
    write_file(&target, b"linked content");
    std::os::unix::fs::symlink(&target, dir.path().join("link.bin")).unwrap();

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path(), None)
        .unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 1);
}

#[cfg(unix)]
#[test]
fn test_unreadable_subdirectory_is_partial() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let locked = dir.path().join("locked");
    fs::create_dir(&locked).unwrap();
    write_file(&locked.join("hidden"), b"dup");
    write_file(&dir.path().join("a"), b"dup");
    write_file(&dir.path().join("b"), b"dup");

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    // Root ignores directory permissions
    let readable = fs::read_dir(&locked).is_ok();

    let result = DuplicateFinder::with_defaults().find_duplicates(dir.path(), None);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    let (groups, summary) = result.unwrap();
    if readable {
        assert_eq!(groups[0].len(), 3);
    } else {
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
        assert!(summary.traversal_errors >= 1);
        assert!(summary.is_partial());
    }
}

#[test]
fn test_walker_reports_modification_time() {
    use filetime::{set_file_mtime, FileTime};
    use find_dups::scanner::Walker;
    use std::time::{Duration, SystemTime};

    let dir = tempdir().unwrap();
    let path = dir.path().join("dated.txt");
    write_file(&path, b"dated");
    set_file_mtime(&path, FileTime::from_unix_time(1_600_000_000, 0)).unwrap();

    let records: Vec<_> = Walker::new(dir.path()).walk().map(Result::unwrap).collect();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].size, 5);
    assert_eq!(
        records[0].modified,
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000)
    );
}

#[test]
fn test_modification_time_does_not_affect_grouping() {
    use filetime::{set_file_mtime, FileTime};

    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    write_file(&a, b"same bytes");
    write_file(&b, b"same bytes");
    set_file_mtime(&a, FileTime::from_unix_time(1_000_000_000, 0)).unwrap();

    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path(), None)
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert_ne!(groups[0].files[0].modified, groups[0].files[1].modified);
}
