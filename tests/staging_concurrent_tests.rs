// Staging map: blocking consumers and many-thread producer/consumer runs.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use staging_map::{Ordered, StagingMap};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// =============================================================================
// Test 1: pop on an empty map blocks until another thread puts the key
// =============================================================================
#[test]
fn blocking_pop_wakes_on_put() {
    init_tracing();
    let map: Arc<StagingMap<&str, String>> = Arc::new(StagingMap::new(2, 0, 0));

    let (tx, rx) = mpsc::channel();
    let consumer = {
        let map = Arc::clone(&map);
        thread::spawn(move || {
            let _ = tx.send(map.pop(&"k"));
        })
    };

    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

    map.put("k", &[1, 0], vec!["v1".to_string(), "v0".to_string()])
        .unwrap();

    let tuple = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(tuple, vec!["v0".to_string(), "v1".to_string()]);
    consumer.join().unwrap();
    assert_eq!(map.size(), 0);
}

// =============================================================================
// Test 2: keyed waiters are not starved by puts for other keys
// =============================================================================
#[test]
fn keyed_waiters_each_get_their_key() {
    init_tracing();
    let map: Arc<StagingMap<u64, Vec<u8>>> = Arc::new(StagingMap::new(1, 0, 0));

    let consumers: Vec<_> = (0..8u64)
        .map(|key| {
            let map = Arc::clone(&map);
            thread::spawn(move || map.get(&key))
        })
        .collect();

    // Let them park, then satisfy them in reverse
    thread::sleep(Duration::from_millis(50));
    for key in (0..8u64).rev() {
        map.put(key, &[0], vec![vec![key as u8]]).unwrap();
    }

    for (key, handle) in consumers.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), vec![vec![key as u8]]);
    }
    assert_eq!(map.size(), 0);
}

// =============================================================================
// Test 3: a key assembled by two threads wakes its consumer
// =============================================================================
#[test]
fn partial_puts_from_two_threads() {
    init_tracing();
    let map: Arc<StagingMap<u64, Vec<u8>>> = Arc::new(StagingMap::new(2, 0, 0));

    let consumer = {
        let map = Arc::clone(&map);
        thread::spawn(move || map.pop(&7))
    };

    let producers: Vec<_> = [1usize, 0]
        .into_iter()
        .map(|slot| {
            let map = Arc::clone(&map);
            thread::spawn(move || map.put(7, &[slot], vec![vec![slot as u8]]))
        })
        .collect();
    for p in producers {
        p.join().unwrap().unwrap();
    }

    assert_eq!(consumer.join().unwrap(), vec![vec![0], vec![1]]);
    assert_eq!(map.incomplete_size(), 0);
}

// =============================================================================
// Test 4: bounded pipeline, many producers, popitem consumers
// =============================================================================
#[test]
fn bounded_pipeline_delivers_everything_once() {
    init_tracing();
    const PRODUCERS: u64 = 4;
    const PER_PRODUCER: u64 = 250;
    const CONSUMERS: u64 = 4;
    let total = PRODUCERS * PER_PRODUCER;

    let map: Arc<StagingMap<u64, Vec<u8>, Ordered>> =
        Arc::new(StagingMap::new(2, 8, 256));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    let key = p * PER_PRODUCER + i;
                    // Alternate complete and two-step partial puts
                    if key % 2 == 0 {
                        map.put(key, &[1, 0], vec![vec![1; 8], vec![0; 8]]).unwrap();
                    } else {
                        map.put(key, &[0], vec![vec![0; 8]]).unwrap();
                        map.put(key, &[1], vec![vec![1; 8]]).unwrap();
                    }
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                let mut seen = Vec::new();
                for _ in 0..total / CONSUMERS {
                    let (key, tuple) = map.popitem();
                    assert_eq!(tuple, vec![vec![0; 8], vec![1; 8]]);
                    seen.push(key);
                }
                seen
            })
        })
        .collect();

    for p in producers {
        p.join().unwrap();
    }
    let mut all = HashSet::new();
    for c in consumers {
        for key in c.join().unwrap() {
            assert!(all.insert(key), "key {key} delivered twice");
        }
    }

    assert_eq!(all.len() as u64, total);
    assert_eq!(map.size(), 0);
    assert_eq!(map.incomplete_size(), 0);
    assert_eq!(map.current_bytes(), 0);
}

// =============================================================================
// Test 5: concurrent readers of size() never block on a full map
// =============================================================================
#[test]
fn size_reads_do_not_block() {
    let map: Arc<StagingMap<u64, Vec<u8>>> = Arc::new(StagingMap::new(1, 1, 0));
    map.put(0, &[0], vec![vec![0]]).unwrap();

    let readers: Vec<_> = (0..8)
        .map(|_| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                for _ in 0..100 {
                    assert_eq!(map.size(), 1);
                    assert_eq!(map.incomplete_size(), 0);
                }
            })
        })
        .collect();

    for r in readers {
        r.join().unwrap();
    }
}
