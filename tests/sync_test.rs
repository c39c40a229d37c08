use lazymemo::concurrency::sync::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

#[test]
fn test_mutex_guards_map_across_threads() {
    let map = Arc::new(Mutex::new(HashMap::new()));
    let mut handles = Vec::new();

    for t in 0..4u32 {
        let m = map.clone();
        handles.push(thread::spawn(move || {
            for i in 0..250u32 {
                m.lock().insert(t * 1_000 + i, i);
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(map.lock().len(), 1_000);
}

#[test]
fn test_mutex_try_lock_while_held_elsewhere() {
    let mutex = Mutex::new(0u8);
    let guard = mutex.lock();

    thread::scope(|s| {
        s.spawn(|| assert!(mutex.try_lock().is_none()));
    });

    drop(guard);
    assert!(mutex.try_lock().is_some());
}

#[test]
fn test_mutex_get_mut_and_into_inner() {
    let mut mutex = Mutex::new(vec![1]);
    mutex.get_mut().push(2);
    assert_eq!(mutex.into_inner(), vec![1, 2]);
}
