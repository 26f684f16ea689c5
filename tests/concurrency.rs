//! A shared set updated and merged from many threads at once.

use std::sync::{Arc, Barrier};
use std::thread;

use lww_element_set::{Bias, LwwElementSet, SharedLwwElementSet, Timestamp};

const THREADS: usize = 8;
const OPERATIONS: Timestamp = 200;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

#[test]
fn concurrent_writers_agree_with_sequential_replay() {
    init_logging();
    let shared = Arc::new(SharedLwwElementSet::new(Bias::Remove));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS).map(|thread_id| {
        let shared = Arc::clone(&shared);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for timestamp in 0..OPERATIONS {
                let element = (timestamp % 16) as u32;
                if (timestamp as usize + thread_id) % 3 == 0 {
                    shared.remove(element, timestamp);
                } else {
                    shared.add(element, timestamp);
                }
            }
        })
    }).collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut expected = LwwElementSet::new(Bias::Remove);
    for thread_id in 0..THREADS {
        for timestamp in 0..OPERATIONS {
            let element = (timestamp % 16) as u32;
            if (timestamp as usize + thread_id) % 3 == 0 {
                expected.remove(element, timestamp);
            } else {
                expected.add(element, timestamp);
            }
        }
    }

    assert_eq!(expected, shared.snapshot());
}

#[test]
fn opposing_merges_do_not_deadlock() {
    init_logging();
    let left = Arc::new(SharedLwwElementSet::new(Bias::Add));
    let right = Arc::new(SharedLwwElementSet::new(Bias::Add));
    let barrier = Arc::new(Barrier::new(2));

    let spawn = |from: Arc<SharedLwwElementSet<u32>>, into: Arc<SharedLwwElementSet<u32>>, offset: u32| {
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for round in 0..500u32 {
                into.add(offset + round % 10, Timestamp::from(round));
                into.merge(&from).unwrap();
            }
        })
    };
    let forward = spawn(Arc::clone(&left), Arc::clone(&right), 0);
    let backward = spawn(Arc::clone(&right), Arc::clone(&left), 100);
    forward.join().unwrap();
    backward.join().unwrap();

    left.merge(&right).unwrap();
    right.merge(&left).unwrap();
    assert_eq!(left.snapshot(), right.snapshot());
    assert_eq!(20, left.len());
}

#[test]
fn readers_never_see_a_torn_merge() {
    init_logging();
    // Every element is added and removed at the same timestamp in the donor,
    // so with a remove bias no element may ever appear as a member.
    let mut donor = LwwElementSet::new(Bias::Remove);
    for element in 0..1000u32 {
        donor.add(element, 1);
        donor.remove(element, 1);
    }
    let donor = Arc::new(donor);
    let shared = Arc::new(SharedLwwElementSet::new(Bias::Remove));

    let writer = {
        let (donor, shared) = (Arc::clone(&donor), Arc::clone(&shared));
        thread::spawn(move || shared.merge_snapshot(&donor).unwrap())
    };
    let reader = {
        let shared = Arc::clone(&shared);
        thread::spawn(move || {
            for _ in 0..200 {
                assert!(shared.elements().is_empty());
                assert_eq!(0, shared.len());
            }
        })
    };
    writer.join().unwrap();
    reader.join().unwrap();

    assert!(shared.is_empty());
    assert_eq!(1000, shared.snapshot().removes().len());
}
