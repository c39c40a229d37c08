use lazymemo::{MemoError, MemoizingCache};
use proptest::prelude::*;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

fn hex(key: &i64) -> Result<String, Infallible> {
    Ok(format!("{key:x}"))
}

#[test]
fn test_hex_cache_from_fn_item() {
    let cache = MemoizingCache::new(hex);
    assert_eq!(cache.get(27).unwrap(), "1b");
    assert_eq!(cache.get(-97).unwrap(), "ffffffffffffff9f");
    assert_eq!(cache.find_or_create(27).unwrap(), "1b");
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_cache_shared_across_threads() {
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = {
        let calls = Arc::clone(&calls);
        Arc::new(MemoizingCache::new(move |key: &u16| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>(u32::from(*key) * 3)
        }))
    };

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for key in 0..64u16 {
                    assert_eq!(cache.get(key), Ok(&(u32::from(key) * 3)));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(cache.len(), 64);
    assert_eq!(calls.load(Ordering::SeqCst), 64);
}

#[test]
fn test_empty_value_then_corrected_compute() {
    let attempts = AtomicUsize::new(0);
    let cache = MemoizingCache::with_partial(|key: &&str| {
        // The first attempt violates the contract; later ones are fixed.
        if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok::<Option<usize>, Infallible>(None)
        } else {
            Ok(Some(key.len()))
        }
    });

    let err = cache.get("absent").unwrap_err();
    assert_eq!(err, MemoError::EmptyComputedValue);
    assert_eq!(err.to_string(), "compute function returned no value");
    assert!(!cache.contains_key("absent"));

    assert_eq!(cache.get("absent"), Ok(&6));
    assert!(cache.contains_key("absent"));
}

#[derive(Debug, Clone)]
enum Op {
    Get(u8),
    Ensure(u8),
    Peek(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<u8>().prop_map(Op::Get),
        any::<u8>().prop_map(Op::Ensure),
        any::<u8>().prop_map(Op::Peek),
    ]
}

proptest! {
    #[test]
    fn test_cache_matches_direct_computation(ops in proptest::collection::vec(op(), 1..200)) {
        let calls = AtomicUsize::new(0);
        // Odd keys fail, multiples of 5 yield no value.
        let cache = MemoizingCache::with_partial(|key: &u8| {
            calls.fetch_add(1, Ordering::SeqCst);
            if key % 2 == 1 {
                Err(*key)
            } else if key % 5 == 0 {
                Ok(None)
            } else {
                Ok(Some(u32::from(*key) * u32::from(*key)))
            }
        });

        let mut model: HashMap<u8, u32> = HashMap::new();
        let mut expected_calls = 0usize;

        for op in ops {
            match op {
                Op::Get(k) | Op::Ensure(k) => {
                    if !model.contains_key(&k) {
                        expected_calls += 1;
                    }
                    let want = if k % 2 == 1 {
                        Err(MemoError::ComputationFailed(k))
                    } else if k % 5 == 0 {
                        Err(MemoError::EmptyComputedValue)
                    } else {
                        Ok(u32::from(k) * u32::from(k))
                    };
                    if let Ok(v) = want {
                        model.insert(k, v);
                    }
                    if matches!(op, Op::Get(_)) {
                        prop_assert_eq!(cache.get(k).map(|v| *v), want, "key {}", k);
                    } else {
                        prop_assert_eq!(cache.ensure(k), want.map(|_| ()), "key {}", k);
                    }
                }
                Op::Peek(k) => {
                    prop_assert_eq!(cache.peek(&k).copied(), model.get(&k).copied());
                }
            }
        }

        prop_assert_eq!(cache.len(), model.len());
        prop_assert_eq!(calls.load(Ordering::SeqCst), expected_calls);
    }
}
