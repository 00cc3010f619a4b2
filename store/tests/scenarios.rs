//! Store contract tests, exercised on both backends.

mod common;

use std::collections::BTreeMap;
use std::sync::mpsc;
use std::thread;

use common::*;
use forkmap_store::{BackendKind, StoreError};

// ── Commit / reload round-trip ──

#[test]
fn test_round_trip_reproduces_mutations() {
    for store in both_backends() {
        let mut model: BTreeMap<String, i32> = BTreeMap::new();
        let mut map = store.create_map();
        for i in 0..60 {
            let k = key(i % 20);
            let v = (i as i32 * 7) % 5;
            map.put(k.clone(), v);
            if v == 0 {
                model.remove(&k);
            } else {
                model.insert(k, v);
            }
        }
        let version = map.commit().unwrap();

        let reloaded = store.create_map_at(version).unwrap();
        assert_eq!(reloaded.len(), model.len());
        for i in 0..20 {
            let k = key(i);
            assert_eq!(reloaded.get(&k), model.get(&k).copied().unwrap_or(0));
        }
        // Keys never written read as the default value.
        assert_eq!(reloaded.get(&"untouched".to_string()), 0);
    }
}

// ── Concrete scenario from the store contract ──

#[test]
fn test_concrete_scenario() {
    for store in both_backends() {
        let mut map = store.create_map();
        map.put("a".to_string(), 1);
        let v0 = map.commit().unwrap();
        assert_eq!(v0, 0);
        map.put("b".to_string(), 2);
        let v1 = map.commit().unwrap();
        assert_eq!(v1, 1);

        assert_eq!(diff_triples(&store, 0, 1), vec![("b".to_string(), 0, 2)]);
        assert_eq!(store.create_map_at(0).unwrap().get(&"b".to_string()), 0);
    }
}

// ── Branching scenario ──

#[test]
fn test_branching_scenario() {
    for store in both_backends() {
        let mut map = store.create_map();
        map.put("a".to_string(), 1);
        map.commit().unwrap();
        map.put("b".to_string(), 2);
        let v1 = map.commit().unwrap();

        let mut fork_a = store.create_map_at(v1).unwrap();
        let mut fork_b = store.create_map_at(v1).unwrap();
        fork_a.put("a".to_string(), 9);
        let v2 = fork_a.commit().unwrap();
        fork_b.put("a".to_string(), 5);
        let v3 = fork_b.commit().unwrap();
        assert_eq!((v2, v3), (2, 3));

        assert_eq!(diff_triples(&store, v2, v3), vec![("a".to_string(), 9, 5)]);
        assert_eq!(store.create_map_at(v2).unwrap().get(&"b".to_string()), 2);
        assert_eq!(store.create_map_at(v3).unwrap().get(&"b".to_string()), 2);
    }
}

// ── Diff of a version with itself ──

#[test]
fn test_diff_of_version_with_itself_is_empty() {
    for store in both_backends() {
        let mut map = store.create_map();
        for i in 0..10 {
            map.put(key(i), i as i32 + 1);
        }
        let v0 = map.commit().unwrap();
        map.put(key(3), 77);
        let v1 = map.commit().unwrap();

        for v in [v0, v1] {
            assert!(diff_triples(&store, v, v).is_empty());
        }
    }
}

// ── Diff direction ──

#[test]
fn test_diff_is_directional() {
    for store in both_backends() {
        let mut map = store.create_map();
        map.put("a".to_string(), 1);
        let v0 = map.commit().unwrap();
        map.put("a".to_string(), 2);
        map.put("b".to_string(), 3);
        let v1 = map.commit().unwrap();

        let mut forward = diff_triples(&store, v0, v1);
        forward.sort();
        assert_eq!(
            forward,
            vec![("a".to_string(), 1, 2), ("b".to_string(), 0, 3)]
        );

        let mut backward = diff_triples(&store, v1, v0);
        backward.sort();
        assert_eq!(
            backward,
            vec![("a".to_string(), 2, 1), ("b".to_string(), 3, 0)]
        );
    }
}

// ── Version monotonicity and getStates ──

#[test]
fn test_versions_increase_and_states_is_complete() {
    for store in both_backends() {
        let mut map = store.create_map();
        let mut committed = Vec::new();
        for i in 0..10 {
            map.put(key(i), i as i32 + 1);
            committed.push(map.commit().unwrap());
        }
        for pair in committed.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(
            store.states().into_iter().collect::<Vec<_>>(),
            committed
        );
    }
}

// ── Unknown versions ──

#[test]
fn test_unknown_version_is_reported_with_known_set() {
    for store in both_backends() {
        let mut map = store.create_map();
        map.put("a".to_string(), 1);
        map.commit().unwrap();
        map.put("a".to_string(), 2);
        map.commit().unwrap();

        let expected = StoreError::UnknownVersion {
            requested: 5,
            known: vec![0, 1],
        };
        assert_eq!(store.create_map_at(5).unwrap_err(), expected);
        assert_eq!(store.diff_cursor(0, 5).unwrap_err(), expected);
        assert_eq!(store.diff_cursor(5, 0).unwrap_err(), expected);
        assert_eq!(map.restore(5).unwrap_err(), expected);
    }
}

// ── Zero-change commits ──

#[test]
fn test_zero_change_commit_registers_equivalent_version() {
    for store in both_backends() {
        let mut map = store.create_map();
        map.put("a".to_string(), 1);
        let v0 = map.commit().unwrap();
        let v1 = map.commit().unwrap();
        assert!(v1 > v0);

        assert!(diff_triples(&store, v0, v1).is_empty());
        assert_eq!(store.create_map_at(v1).unwrap().get(&"a".to_string()), 1);
        assert!(store.states().contains(&v1));
    }
}

// ── Restore ──

#[test]
fn test_restore_moves_working_copy_between_branches() {
    for store in both_backends() {
        let mut map = store.create_map();
        map.put("base".to_string(), 1);
        let v0 = map.commit().unwrap();

        map.put("left".to_string(), 10);
        let v_left = map.commit().unwrap();

        map.restore(v0).unwrap();
        assert_eq!(map.get(&"left".to_string()), 0);
        map.put("right".to_string(), 20);
        let v_right = map.commit().unwrap();

        map.restore(v_left).unwrap();
        assert_eq!(map.get(&"left".to_string()), 10);
        assert_eq!(map.get(&"right".to_string()), 0);
        assert_eq!(map.version(), Some(v_left));

        map.restore(v_right).unwrap();
        assert_eq!(map.get(&"left".to_string()), 0);
        assert_eq!(map.get(&"right".to_string()), 20);
        assert_eq!(map.get(&"base".to_string()), 1);
    }
}

#[test]
fn test_restore_discards_uncommitted_changes() {
    for store in both_backends() {
        let mut map = store.create_map();
        map.put("a".to_string(), 1);
        let v0 = map.commit().unwrap();

        map.put("a".to_string(), 99);
        map.put("b".to_string(), 2);
        map.restore(v0).unwrap();
        assert_eq!(map.get(&"a".to_string()), 1);
        assert_eq!(map.get(&"b".to_string()), 0);
        assert_eq!(map.len(), 1);
    }
}

// ── Working copies are independent until committed ──

#[test]
fn test_discarded_working_copy_leaves_no_trace() {
    for store in both_backends() {
        let mut map = store.create_map();
        map.put("a".to_string(), 1);
        let v0 = map.commit().unwrap();

        {
            let mut scratch = store.create_map_at(v0).unwrap();
            scratch.put("a".to_string(), 42);
            scratch.put("z".to_string(), 9);
            // Dropped without commit.
        }
        assert_eq!(store.states().len(), 1);
        assert_eq!(store.create_map_at(v0).unwrap().get(&"a".to_string()), 1);
    }
}

// ── Change notifications ──

#[test]
fn test_listener_observes_effective_transitions() {
    for store in both_backends() {
        let (sender, receiver) = mpsc::channel();
        let mut map = store.create_map();
        map.set_listener(move |key: &String, inserted: bool| {
            sender.send((key.clone(), inserted)).unwrap();
        });

        map.put("a".to_string(), 1); // default → 1: inserted
        map.put("a".to_string(), 2); // 1 → 2: removed then inserted
        map.put("a".to_string(), 2); // no effective change
        map.put("a".to_string(), 0); // 2 → default: removed
        map.put("b".to_string(), 0); // default → default: nothing

        let events: Vec<_> = receiver.try_iter().collect();
        assert_eq!(
            events,
            vec![
                ("a".to_string(), true),
                ("a".to_string(), false),
                ("a".to_string(), true),
                ("a".to_string(), false),
            ]
        );
    }
}

#[test]
fn test_cleared_listener_stays_silent() {
    for store in both_backends() {
        let (sender, receiver) = mpsc::channel();
        let mut map = store.create_map();
        map.set_listener(move |key: &String, inserted: bool| {
            sender.send((key.clone(), inserted)).unwrap();
        });
        map.put("a".to_string(), 1);
        map.clear_listener();
        map.put("b".to_string(), 2);

        let events: Vec<_> = receiver.try_iter().collect();
        assert_eq!(events, vec![("a".to_string(), true)]);
    }
}

// ── Concurrent commits ──

#[test]
fn test_concurrent_commits_get_distinct_versions() {
    for store in both_backends() {
        let (sender, receiver) = mpsc::channel();
        let threads: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                let sender = sender.clone();
                thread::spawn(move || {
                    let mut map = store.create_map();
                    for i in 0..10 {
                        map.put(key(t * 100 + i), i as i32 + 1);
                        sender.send(map.commit().unwrap()).unwrap();
                    }
                })
            })
            .collect();
        drop(sender);
        for handle in threads {
            handle.join().unwrap();
        }

        let versions: Vec<_> = receiver.iter().collect();
        assert_eq!(versions.len(), 80);
        let unique: std::collections::BTreeSet<_> = versions.iter().copied().collect();
        assert_eq!(unique.len(), 80, "every commit gets its own version");
        assert_eq!(store.states(), unique);
    }
}

// ── Backend selection ──

#[test]
fn test_backend_kinds_are_reported() {
    assert_eq!(store(BackendKind::Tree).backend(), BackendKind::Tree);
    assert_eq!(store(BackendKind::Delta).backend(), BackendKind::Delta);
}
