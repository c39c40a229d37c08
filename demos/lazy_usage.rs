//! LazyCell / MemoizingCache Usage Examples
//!
//! Demonstrates single-value and keyed memoization across threads.

use lazymemo::{LazyCell, MemoError, MemoizingCache};
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

fn main() {
    println!("LazyCell / MemoizingCache Usage Examples");
    println!("========================================");

    // Example 1: one value, many threads
    println!("\n1. Shared Lazy Value:");
    let compute_count = AtomicUsize::new(0);
    let table = LazyCell::new(|| {
        compute_count.fetch_add(1, Ordering::SeqCst);
        println!("  Building lookup table...");
        Ok::<_, Infallible>((0..16u32).map(|i| i * i).collect::<Vec<_>>())
    });

    thread::scope(|s| {
        for id in 0..4 {
            let table = &table;
            s.spawn(move || {
                if let Ok(t) = table.get() {
                    println!("  thread {id} sees {} entries", t.len());
                }
            });
        }
    });
    println!("  Compute count: {}", compute_count.load(Ordering::SeqCst));

    // Example 2: failures are retried
    println!("\n2. Retry After Failure:");
    let attempts = AtomicUsize::new(0);
    let flaky = LazyCell::new(|| match attempts.fetch_add(1, Ordering::SeqCst) {
        0 => Err("backend unavailable"),
        n => Ok(format!("connected on attempt {}", n + 1)),
    });
    for _ in 0..2 {
        match flaky.get() {
            Ok(msg) => println!("  ok: {msg}"),
            Err(e) => println!("  error: {e}"),
        }
    }

    // Example 3: keyed cache
    println!("\n3. Memoizing Cache:");
    let hex = MemoizingCache::new(|key: &i64| Ok::<_, Infallible>(format!("{key:x}")));
    for key in [27, -97, 27] {
        if let Ok(value) = hex.get(key) {
            println!("  {key} -> {value}");
        }
    }
    println!("  Cached entries: {}", hex.len());

    // Example 4: the absence sentinel
    println!("\n4. Empty Computed Value:");
    let lookup = MemoizingCache::with_partial(|name: &&str| {
        Ok::<_, Infallible>(match *name {
            "alice" => Some(1),
            "bob" => Some(2),
            _ => None,
        })
    });
    for name in ["alice", "carol"] {
        match lookup.get(name) {
            Ok(id) => println!("  {name} -> {id}"),
            Err(MemoError::EmptyComputedValue) => println!("  {name} -> no value (not cached)"),
            Err(MemoError::ComputationFailed(never)) => match never {},
        }
    }
}
