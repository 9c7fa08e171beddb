//! Striped and arena hash table behaviour

use joinadapt_core::RowPtr;
use joinadapt_hashtable::striped::BUCKET_CNT;
use joinadapt_hashtable::{ArenaMap, ConcurrentInsert, HashTable, StripedMap};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

#[test]
fn test_striped_sizing_from_hint() {
    assert_eq!(StripedMap::new(0).bucket_bits(), 0);
    assert_eq!(StripedMap::new(0).num_chains(), 1);
    // 2^3 * 20 = 160 >= 150 > 2^2 * 20
    assert_eq!(StripedMap::new(150).bucket_bits(), 3);
    assert_eq!(StripedMap::new(150).num_chains(), 8);
}

#[test]
fn test_striped_missing_key_is_empty() {
    let mut m = StripedMap::new(100);
    m.put(7, RowPtr::new(0, 0)).unwrap();
    assert!(m.get(8).unwrap().is_empty());
    assert_eq!(m.get(7).unwrap(), vec![RowPtr::new(0, 0)]);
}

#[test]
fn test_striped_values_keep_insertion_order() {
    let mut m = StripedMap::new(0);
    for i in 0..9 {
        m.put(42, RowPtr::new(1, i)).unwrap();
    }
    let rows: Vec<u32> = m.get(42).unwrap().iter().map(|p| p.row_idx).collect();
    assert_eq!(rows, (0..9).collect::<Vec<_>>());
    assert_eq!(m.len(), 9);
    // Nine values under one key occupy a single slot.
    assert_eq!(m.overflow_buckets(), 0);
}

#[test]
fn test_striped_forced_collisions_keep_every_key() {
    // Every key lands in chain 0 with tag 0; only full-key comparison
    // tells them apart.
    let mut m = StripedMap::with_hasher(1000, |_| 0);
    let keys = (BUCKET_CNT as u64) * 5 + 3;
    for k in 0..keys {
        m.put(k, RowPtr::new(0, k as u32)).unwrap();
        m.put(k, RowPtr::new(1, k as u32)).unwrap();
    }
    assert_eq!(m.len(), keys as usize * 2);
    assert_eq!(m.overflow_buckets(), 5);
    for k in 0..keys {
        assert_eq!(
            m.get(k).unwrap(),
            vec![RowPtr::new(0, k as u32), RowPtr::new(1, k as u32)],
            "key {} lost values",
            k
        );
    }
}

#[test]
fn test_striped_concurrent_inserts_have_no_false_negatives() {
    let map = Arc::new(StripedMap::new(4000));
    let threads = 8;
    let per_thread = 500u32;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                let shared = map.concurrent().expect("striped map is multi-writer");
                for i in 0..per_thread {
                    // Half the keys are shared across threads, half are private.
                    let key = if i % 2 == 0 {
                        i as u64
                    } else {
                        1_000_000 + (t * per_thread + i) as u64
                    };
                    shared.put_shared(key, RowPtr::new(t, i)).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().expect("writer panicked");
    }

    assert_eq!(map.len(), (threads * per_thread) as usize);
    for t in 0..threads {
        for i in 0..per_thread {
            let key = if i % 2 == 0 {
                i as u64
            } else {
                1_000_000 + (t * per_thread + i) as u64
            };
            let found = map.get(key).unwrap();
            assert!(
                found.contains(&RowPtr::new(t, i)),
                "row ({}, {}) missing under key {}",
                t,
                i,
                key
            );
        }
    }
    // Shared keys collected one value per thread, each exactly once.
    let shared: BTreeSet<RowPtr> = map.get(0).unwrap().into_iter().collect();
    assert_eq!(shared.len(), threads as usize);
}

#[test]
fn test_arena_returns_values_in_insertion_order() {
    let mut m = ArenaMap::new(0);
    m.put(5, RowPtr::new(0, 1)).unwrap();
    m.put(9, RowPtr::new(0, 2)).unwrap();
    m.put(5, RowPtr::new(0, 3)).unwrap();
    m.put(5, RowPtr::new(2, 0)).unwrap();

    assert_eq!(
        m.get(5).unwrap(),
        vec![RowPtr::new(0, 1), RowPtr::new(0, 3), RowPtr::new(2, 0)]
    );
    assert_eq!(m.get(9).unwrap(), vec![RowPtr::new(0, 2)]);
    assert!(m.get(1).unwrap().is_empty());
    assert_eq!(m.len(), 4);
    assert_eq!(m.num_keys(), 2);
}

#[test]
fn test_arena_is_single_writer() {
    assert!(ArenaMap::new(0).concurrent().is_none());
    assert!(StripedMap::new(0).concurrent().is_some());
}

#[test]
fn test_arena_survives_many_slices() {
    let mut m = ArenaMap::new(0);
    let n = 64 + 128 + 256 + 10;
    for i in 0..n {
        m.put(i % 3, RowPtr::new(0, i as u32)).unwrap();
    }
    assert_eq!(m.num_slices(), 4);
    let zeros = m.get(0).unwrap();
    assert_eq!(zeros.len(), (0..n).filter(|i| i % 3 == 0).count());
    assert!(zeros.windows(2).all(|w| w[0].row_idx < w[1].row_idx));
}
