//! Multi-process counter behavior, exercised with one connection per
//! thread against a shared database file.

#![allow(clippy::cast_possible_wrap)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread;

use tempfile::TempDir;

use burrow::SqliteStorage;
use burrow::model::Issue;

fn shared_db(flat: bool) -> (TempDir, std::path::PathBuf) {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("burrow.db");
    let mut storage = SqliteStorage::open(&path).unwrap();
    storage.set_config("issue_prefix", "bw").unwrap();
    if flat {
        storage.set_config("id_mode", "flat").unwrap();
    }
    (tmp, path)
}

#[test]
fn concurrent_flat_creates_never_collide() {
    let (_tmp, path) = shared_db(true);

    const THREADS: usize = 8;
    const PER_THREAD: usize = 25;

    let ids = Arc::new(Mutex::new(Vec::new()));
    let mut handles = Vec::new();
    for t in 0..THREADS {
        let path = path.clone();
        let ids = Arc::clone(&ids);
        handles.push(thread::spawn(move || {
            let mut storage = SqliteStorage::open(&path).unwrap();
            for i in 0..PER_THREAD {
                let mut issue = Issue::new(format!("task {t}-{i}"));
                let id = storage.create_issue(&mut issue, "worker").unwrap();
                ids.lock().unwrap().push(id);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let ids = ids.lock().unwrap();
    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), THREADS * PER_THREAD, "duplicate IDs minted");

    // Flat IDs form the exact range 1..=N with no gaps.
    let mut numbers: Vec<i64> = ids
        .iter()
        .map(|id| id.strip_prefix("bw-").unwrap().parse().unwrap())
        .collect();
    numbers.sort_unstable();
    let expected: Vec<i64> = (1..=(THREADS * PER_THREAD) as i64).collect();
    assert_eq!(numbers, expected);
}

#[test]
fn concurrent_hash_creates_never_collide() {
    let (_tmp, path) = shared_db(false);

    const THREADS: usize = 4;
    const PER_THREAD: usize = 10;

    let mut handles = Vec::new();
    for t in 0..THREADS {
        let path = path.clone();
        handles.push(thread::spawn(move || {
            let mut storage = SqliteStorage::open(&path).unwrap();
            let mut ids = Vec::new();
            for i in 0..PER_THREAD {
                // Identical titles across threads force the nonce/timestamp
                // disambiguation paths.
                let mut issue = Issue::new(format!("task {i}"));
                ids.push(storage.create_issue(&mut issue, &format!("worker-{t}")).unwrap());
            }
            ids
        }));
    }

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.join().unwrap());
    }
    let unique: HashSet<_> = all.iter().collect();
    assert_eq!(unique.len(), THREADS * PER_THREAD);
}

#[test]
fn concurrent_child_ordinals_are_distinct() {
    let (_tmp, path) = shared_db(false);

    let parent_id = {
        let mut storage = SqliteStorage::open(&path).unwrap();
        let mut parent = Issue::new("parent epic");
        storage.create_issue(&mut parent, "setup").unwrap()
    };

    const THREADS: usize = 6;
    const PER_THREAD: usize = 5;

    let mut handles = Vec::new();
    for _ in 0..THREADS {
        let path = path.clone();
        let parent_id = parent_id.clone();
        handles.push(thread::spawn(move || {
            let mut storage = SqliteStorage::open(&path).unwrap();
            let mut ids = Vec::new();
            for i in 0..PER_THREAD {
                let mut child = Issue::new(format!("child {i}"));
                ids.push(
                    storage
                        .create_child_issue(&parent_id, &mut child, "worker")
                        .unwrap(),
                );
            }
            ids
        }));
    }

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.join().unwrap());
    }

    let mut ordinals: Vec<i64> = all
        .iter()
        .map(|id| {
            id.strip_prefix(&format!("{parent_id}."))
                .unwrap()
                .parse()
                .unwrap()
        })
        .collect();
    ordinals.sort_unstable();
    let expected: Vec<i64> = (1..=(THREADS * PER_THREAD) as i64).collect();
    assert_eq!(ordinals, expected);
}

#[test]
fn hierarchy_depth_is_capped() {
    let (_tmp, path) = shared_db(false);
    let mut storage = SqliteStorage::open(&path).unwrap();

    let mut issue = Issue::new("root");
    let mut id = storage.create_issue(&mut issue, "tester").unwrap();
    for _ in 0..3 {
        let mut child = Issue::new("deeper");
        id = storage.create_child_issue(&id, &mut child, "tester").unwrap();
    }
    assert_eq!(id.matches('.').count(), 3);

    let mut too_deep = Issue::new("too deep");
    let err = storage
        .create_child_issue(&id, &mut too_deep, "tester")
        .unwrap_err();
    assert!(matches!(err, burrow::BurrowError::DepthExceeded { max_depth: 3, .. }));
}

#[test]
fn resync_follows_the_corpus() {
    let (_tmp, path) = shared_db(true);
    let mut storage = SqliteStorage::open(&path).unwrap();

    for i in 1..=3 {
        let mut issue = Issue::new(format!("task {i}"));
        storage.create_issue(&mut issue, "tester").unwrap();
    }
    storage.delete_issue("bw-3", "tester").unwrap();

    let synced = storage.resync_counters("tester").unwrap();
    assert_eq!(synced, 1);
    assert_eq!(storage.get_counters().unwrap(), vec![("bw".to_string(), 2)]);

    // The freed number is minted again.
    let mut issue = Issue::new("replacement");
    assert_eq!(storage.create_issue(&mut issue, "tester").unwrap(), "bw-3");

    // Resync with no drift is a no-op.
    storage.resync_counters("tester").unwrap();
    assert_eq!(storage.get_counters().unwrap(), vec![("bw".to_string(), 3)]);
}
