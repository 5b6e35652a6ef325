//! Behavioral specs for the run store.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::prelude::*;

fn run(id: &str, day: u32) -> TestRunResult {
    TestRunResult::new(id, at(day, 12))
}

#[test]
fn records_are_loaded_oldest_first() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());
    for (id, day) in [("c", 3), ("a", 1), ("b", 2)] {
        store.write(&run(id, day)).unwrap();
    }

    let ids: Vec<String> = store
        .load_runs(&LoadOptions::all())
        .unwrap()
        .into_iter()
        .map(|r| r.run_id)
        .collect();
    assert_eq!(ids, ["a", "b", "c"]);
}

#[test]
fn limit_keeps_the_newest_runs() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());
    for day in 1..=5 {
        store.write(&run(&format!("r{day}"), day)).unwrap();
    }

    let runs = store.load_runs(&LoadOptions::all().with_limit(2)).unwrap();
    let ids: Vec<&str> = runs.iter().map(|r| r.run_id.as_str()).collect();
    assert_eq!(ids, ["r4", "r5"]);

    let runs = store.load_runs(&LoadOptions::all().with_since(at(3, 0))).unwrap();
    assert_eq!(runs.len(), 3);
}

#[test]
fn uncommitted_and_foreign_files_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());
    store.write(&run("kept", 1)).unwrap();

    write(dir.path(), ".20240602T120000000Z_partial.json.4242.tmp", "{");
    write(dir.path(), "notes.txt", "not a record");
    std::fs::create_dir(dir.path().join("20240603T120000000Z_dir.json")).unwrap();

    let runs = store.load_runs(&LoadOptions::all()).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run_id, "kept");
}

#[test]
fn corrupt_record_fails_the_load() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());
    store.write(&run("good", 1)).unwrap();
    write(dir.path(), "20240602T120000000Z_bad.json", "{\"version\": 1");

    let err = store.load_runs(&LoadOptions::all()).unwrap_err();
    assert!(matches!(err, Error::Storage { .. }), "expected Storage, got {err:?}");
    assert!(err.to_string().contains("corrupt record"));
}

#[test]
fn missing_root_is_an_empty_history() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path().join("never-written"));
    assert!(store.load_runs(&LoadOptions::all()).unwrap().is_empty());
}
