#![cfg(unix)]

use archive_indexer::config::AppConfig;
use archive_indexer::hasher::HashAlgo;
use archive_indexer::storage::{CsvSink, MemoryCatalog};
use archive_indexer::{CatalogBuilder, SilentReporter};
use std::collections::BTreeSet;
use std::fs;
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::Path;
use std::process::Command;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const SCENARIO_LISTING: &str = "\
Path = readme.txt
Size = 42
Attributes = A

Path = sub/
Size = 0
Attributes = D

";

/// Writes an executable shell script standing in for the archive listing tool.
fn fake_lister(dir: &Path, body: &str) -> String {
    let path = dir.join("fake-7z");
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

fn lister_printing(dir: &Path, listing: &str) -> String {
    fake_lister(dir, &format!("cat <<'EOF'\n{}EOF", listing))
}

fn scenario_tree() -> TempDir {
    let root = tempfile::tempdir().unwrap();
    fs::write(root.path().join("a.txt"), "0123456789").unwrap();
    fs::write(root.path().join("b.zip"), b"PK\x03\x04not really a zip").unwrap();
    root
}

fn config_for(root: &Path, lister: &str) -> AppConfig {
    let mut config = AppConfig::with_root(root);
    config.archive_lister_path = lister.to_string();
    config.workers = 2;
    config
}

fn read_csv_lines(path: &Path) -> Vec<String> {
    let bytes = fs::read(path).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    text.trim_start_matches('\u{feff}')
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_archive_members_are_cataloged_without_directories() {
    let root = scenario_tree();
    let tools = tempfile::tempdir().unwrap();
    let lister = lister_printing(tools.path(), SCENARIO_LISTING);

    let builder = CatalogBuilder::new(config_for(root.path(), &lister)).unwrap();
    let mut catalog = MemoryCatalog::new();
    let summary = builder.run(&mut catalog, &SilentReporter).unwrap();

    assert_eq!(summary.plain_files, 1);
    assert_eq!(summary.archives, 1);
    assert_eq!(summary.members, 1);
    assert_eq!(summary.errors, 0);

    let entries = catalog.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name, "a.txt");
    assert_eq!(entries[0].size_bytes, Some(10));
    assert!(!entries[0].is_archive);
    assert_eq!(entries[1].name, "b.zip");
    assert_eq!(entries[1].ext, "zip");
    assert!(entries[1].is_archive);

    let members = catalog.members();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].member_path, "readme.txt");
    assert_eq!(members[0].member_size, 42);
    assert_eq!(members[0].archive_full_path, entries[1].full_path);
    assert_eq!(catalog.reconcile(), vec![(0, Some(1))]);
}

#[test]
fn test_header_blocks_before_separator_are_ignored() {
    let root = scenario_tree();
    let tools = tempfile::tempdir().unwrap();
    let listing = "\
7-Zip 23.01 (x64) : Copyright (c) 1999-2023 Igor Pavlov

Listing archive: b.zip

--
Path = b.zip
Type = zip
Physical Size = 24

----------
Path = docs/notes.md
Size = 7
Modified = 2023-06-15 08:00:00
Attributes = A
Method = Deflate

";
    let lister = lister_printing(tools.path(), listing);
    let builder = CatalogBuilder::new(config_for(root.path(), &lister)).unwrap();
    let mut catalog = MemoryCatalog::new();
    builder.run(&mut catalog, &SilentReporter).unwrap();

    let members = catalog.members();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].member_path, "docs/notes.md");
    assert_eq!(members[0].member_mtime.as_deref(), Some("2023-06-15T08:00:00"));
    assert_eq!(members[0].compression_method, "Deflate");
}

#[test]
fn test_missing_listing_tool_counts_one_error_per_archive() {
    let root = scenario_tree();
    fs::write(root.path().join("c.7z"), "7z").unwrap();
    let tools = tempfile::tempdir().unwrap();
    let missing = tools.path().join("no-such-7z");

    let builder =
        CatalogBuilder::new(config_for(root.path(), &missing.to_string_lossy())).unwrap();
    let mut catalog = MemoryCatalog::new();
    let summary = builder.run(&mut catalog, &SilentReporter).unwrap();

    assert_eq!(catalog.entries().len(), 3);
    assert!(catalog.members().is_empty());
    assert_eq!(summary.archives, 2);
    assert_eq!(summary.errors, 2);
}

#[test]
fn test_failing_listing_tool_keeps_archive_entry() {
    let root = scenario_tree();
    let tools = tempfile::tempdir().unwrap();
    let lister = fake_lister(tools.path(), "echo 'ERROR: b.zip : Can not open' >&2\nexit 2");

    let builder = CatalogBuilder::new(config_for(root.path(), &lister)).unwrap();
    let mut catalog = MemoryCatalog::new();
    let summary = builder.run(&mut catalog, &SilentReporter).unwrap();

    assert_eq!(catalog.entries().len(), 2);
    assert!(catalog.members().is_empty());
    assert_eq!(summary.errors, 1);
}

#[test]
fn test_hung_listing_tool_times_out() {
    let root = scenario_tree();
    let tools = tempfile::tempdir().unwrap();
    let lister = fake_lister(tools.path(), "exec sleep 30");

    let mut config = config_for(root.path(), &lister);
    config.listing_timeout_secs = 1;
    let builder = CatalogBuilder::new(config).unwrap();
    let mut catalog = MemoryCatalog::new();
    let summary = builder.run(&mut catalog, &SilentReporter).unwrap();

    assert_eq!(summary.errors, 1);
    assert!(summary.duration.as_secs() < 10);
    assert_eq!(catalog.entries().len(), 2);
}

#[test]
fn test_repeated_csv_scans_are_byte_identical() {
    let root = scenario_tree();
    fs::create_dir_all(root.path().join("nested/deeper")).unwrap();
    for i in 0..150 {
        fs::write(
            root.path().join(format!("nested/file-{:03}.dat", i)),
            format!("payload {}", i),
        )
        .unwrap();
    }
    fs::write(root.path().join("nested/deeper/pack.tar.gz"), "gz").unwrap();
    let tools = tempfile::tempdir().unwrap();
    let lister = lister_printing(tools.path(), SCENARIO_LISTING);
    let out = tempfile::tempdir().unwrap();

    let mut runs = Vec::new();
    for run in 0..2 {
        let mut config = config_for(root.path(), &lister);
        config.hash = "sha256".to_string();
        config.workers = 4;
        let entries_out = out.path().join(format!("run{}/entries.csv", run));
        let archives_out = out.path().join(format!("run{}/archives.csv", run));
        let builder = CatalogBuilder::new(config).unwrap();
        let mut sink = CsvSink::create(&entries_out, &archives_out).unwrap();
        let summary = builder.run(&mut sink, &SilentReporter).unwrap();
        drop(sink);
        assert_eq!(summary.plain_files, 151);
        assert_eq!(summary.archives, 2);
        runs.push((fs::read(&entries_out).unwrap(), fs::read(&archives_out).unwrap()));
    }
    assert_eq!(runs[0], runs[1]);

    let lines = read_csv_lines(&out.path().join("run0/entries.csv"));
    // header + one row per file, each path exactly once
    assert_eq!(lines.len(), 154);
    let paths: BTreeSet<&str> = lines[1..]
        .iter()
        .map(|l| l.split(',').nth(1).unwrap())
        .collect();
    assert_eq!(paths.len(), 153);
    assert!(lines
        .iter()
        .any(|l| l.contains("pack.tar.gz,tar.gz,0,1,2,")));
}

#[test]
fn test_identical_files_share_a_hash() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir_all(root.path().join("copy")).unwrap();
    fs::write(root.path().join("original.bin"), vec![7u8; 4096]).unwrap();
    fs::write(root.path().join("copy/original.bin"), vec![7u8; 4096]).unwrap();
    fs::write(root.path().join("different.bin"), vec![8u8; 4096]).unwrap();

    let mut config = AppConfig::with_root(root.path());
    config.hash = "blake3".to_string();
    let builder = CatalogBuilder::new(config).unwrap();
    assert_eq!(builder.hash_algo(), Some(HashAlgo::Blake3));
    let mut catalog = MemoryCatalog::new();
    builder.run(&mut catalog, &SilentReporter).unwrap();

    let hash_of = |rel: &str| {
        let full = builder.root().join(rel).to_string_lossy().into_owned();
        catalog
            .entries()
            .iter()
            .find(|e| e.full_path == full)
            .and_then(|e| e.hash_value.clone())
            .unwrap()
    };
    assert_eq!(hash_of("original.bin"), hash_of("copy/original.bin"));
    assert_ne!(hash_of("original.bin"), hash_of("different.bin"));
    assert_eq!(hash_of("original.bin").len(), 64);
}

#[test]
fn test_no_hash_leaves_hash_columns_empty() {
    let root = scenario_tree();
    let tools = tempfile::tempdir().unwrap();
    let lister = lister_printing(tools.path(), SCENARIO_LISTING);
    let out = tempfile::tempdir().unwrap();
    let entries_out = out.path().join("entries.csv");
    let archives_out = out.path().join("archives.csv");

    let builder = CatalogBuilder::new(config_for(root.path(), &lister)).unwrap();
    let mut sink = CsvSink::create(&entries_out, &archives_out).unwrap();
    builder.run(&mut sink, &SilentReporter).unwrap();
    drop(sink);

    for line in read_csv_lines(&entries_out).iter().skip(1) {
        assert!(line.ends_with(",,"), "unexpected hash columns in {}", line);
    }
    let members = read_csv_lines(&archives_out);
    assert_eq!(members.len(), 2);
    assert!(members[1].ends_with(",readme.txt,42,,,"));
}

#[test]
fn test_ignore_patterns_prune_the_walk() {
    let root = scenario_tree();
    fs::create_dir_all(root.path().join("cache")).unwrap();
    fs::write(root.path().join("cache/blob.zip"), "zip").unwrap();
    fs::write(root.path().join("scratch.tmp"), "tmp").unwrap();
    let tools = tempfile::tempdir().unwrap();
    let lister = lister_printing(tools.path(), SCENARIO_LISTING);

    let mut config = config_for(root.path(), &lister);
    config.ignore_patterns = vec!["*/cache".to_string(), "*.tmp".to_string()];
    let builder = CatalogBuilder::new(config).unwrap();
    let mut catalog = MemoryCatalog::new();
    let summary = builder.run(&mut catalog, &SilentReporter).unwrap();

    let names: Vec<&str> = catalog.entries().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "b.zip"]);
    assert_eq!(summary.archives, 1);
}

#[test]
fn test_special_files_are_skipped() {
    let root = tempfile::tempdir().unwrap();
    fs::write(root.path().join("a.txt"), "0123456789").unwrap();
    for name in ["pipe", "pack.zip"] {
        let status = Command::new("mkfifo")
            .arg(root.path().join(name))
            .status()
            .unwrap();
        assert!(status.success());
    }
    let tools = tempfile::tempdir().unwrap();
    let lister = lister_printing(tools.path(), SCENARIO_LISTING);

    let mut config = config_for(root.path(), &lister);
    config.hash = "md5".to_string();
    let builder = CatalogBuilder::new(config).unwrap();

    // a blocked reader would hang the scan, so run it where the wait can be bounded
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut catalog = MemoryCatalog::new();
        let summary = builder.run(&mut catalog, &SilentReporter).unwrap();
        let _ = tx.send((summary, catalog));
    });
    let (summary, catalog) = rx.recv_timeout(Duration::from_secs(20)).unwrap();

    let names: Vec<&str> = catalog.entries().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["a.txt"]);
    assert_eq!(summary.plain_files, 1);
    assert_eq!(summary.archives, 0);
    assert_eq!(summary.errors, 0);
    assert!(catalog.members().is_empty());
}

#[test]
fn test_unreadable_objects_are_counted_and_skipped() {
    let root = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir().unwrap();
    fs::create_dir_all(outside.path().join("linked")).unwrap();
    fs::write(outside.path().join("linked/inside.txt"), "inside").unwrap();

    fs::write(root.path().join("a.txt"), "0123456789").unwrap();
    symlink(root.path().join("missing-target"), root.path().join("dangling")).unwrap();
    symlink(outside.path().join("linked"), root.path().join("linked-dir")).unwrap();
    fs::write(root.path().join("z.txt"), "zz").unwrap();

    let mut config = AppConfig::with_root(root.path());
    config.hash = "sha1".to_string();
    let builder = CatalogBuilder::new(config).unwrap();
    let mut catalog = MemoryCatalog::new();
    let summary = builder.run(&mut catalog, &SilentReporter).unwrap();

    assert_eq!(summary.errors, 1);
    assert_eq!(summary.plain_files, 2);
    let names: Vec<&str> = catalog.entries().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "z.txt"]);
    assert!(catalog
        .entries()
        .iter()
        .all(|e| !e.full_path.contains("linked") && e.hash_value.is_some()));
}
