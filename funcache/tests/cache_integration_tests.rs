//! Integration tests for the cache module
//!
//! These tests verify the complete cache functionality including:
//! - Hit consistency and freshness invalidation
//! - Copy isolation
//! - Disk warm start and write-once persistence
//! - Corruption tolerance and swallowed disk failures
//! - Error pass-through and async calls

use funcache::cache::disk::ArtifactKind;
use funcache::{
    function_identity, CacheConfig, CacheError, CachePolicy, CacheTier, CachedFn, CallOutcome,
    DiskFormat, FunctionIdentity,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    (Arc::clone(&calls), calls)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Report {
    title: String,
    rows: Vec<(String, f64)>,
    totals: BTreeMap<String, f64>,
}

fn build_report(name: &String) -> Report {
    let mut totals = BTreeMap::new();
    totals.insert("sum".to_string(), 6.5);
    Report {
        title: name.to_uppercase(),
        rows: vec![("a".to_string(), 1.5), ("b".to_string(), 5.0)],
        totals,
    }
}

#[test]
fn test_hit_consistency() {
    let (seen, calls) = counter();
    let cached = CachedFn::new(function_identity!(build_report), CachePolicy::default(), move |name: &String| {
        seen.fetch_add(1, Ordering::SeqCst);
        build_report(name)
    })
    .unwrap();

    let first = cached.call(&"q3".to_string()).unwrap();
    let second = cached.call(&"q3".to_string()).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.title, "Q3");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_invalidation_on_token_change() {
    let (seen, calls) = counter();
    let generation = Arc::new(AtomicUsize::new(0));
    let token_source = Arc::clone(&generation);

    let policy = CachePolicy::<i64, u64>::default()
        .with_freshness(move |_: &i64| Ok(token_source.load(Ordering::SeqCst) as u64));
    let cached = CachedFn::new(function_identity!(scaled), policy, move |x: &i64| {
        let n = seen.fetch_add(1, Ordering::SeqCst) as i64;
        x * 10 + n
    })
    .unwrap();

    assert_eq!(*cached.call(&1).unwrap(), 10);
    assert_eq!(*cached.call(&1).unwrap(), 10);

    generation.store(1, Ordering::SeqCst);
    assert_eq!(*cached.call(&1).unwrap(), 11);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_copy_isolation() {
    let cached = CachedFn::new(function_identity!(build_report), CachePolicy::default(), |name: &String| {
        build_report(name)
    })
    .unwrap();

    let mut first = cached.call(&"q1".to_string()).unwrap();
    let owned = Arc::make_mut(&mut first);
    owned.title.push_str("-edited");
    owned.rows.clear();

    let second = cached.call(&"q1".to_string()).unwrap();
    assert_eq!(second.title, "Q1");
    assert_eq!(second.rows.len(), 2);
}

#[test]
fn test_disk_warm_start() {
    let tmp = TempDir::new().unwrap();
    let config = CacheConfig::persistent(tmp.path());
    let identity = FunctionIdentity::new("reports", "build_report");

    let warm = CachedFn::new(identity.clone(), CachePolicy::new(config.clone()), |name: &String| {
        build_report(name)
    })
    .unwrap();
    let expected = warm.call(&"q2".to_string()).unwrap();
    assert_eq!(warm.stats().disk_writes, 1);
    drop(warm);

    // Fresh instance, empty memory tier, same disk root.
    let (seen, calls) = counter();
    let cold = CachedFn::new(identity, CachePolicy::new(config), move |name: &String| {
        seen.fetch_add(1, Ordering::SeqCst);
        build_report(name)
    })
    .unwrap();

    let (value, outcome) = cold.call_with_outcome(&"q2".to_string()).unwrap();
    assert_eq!(value, expected);
    assert_eq!(outcome, CallOutcome::Hit(CacheTier::Disk));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let (_, outcome) = cold.call_with_outcome(&"q2".to_string()).unwrap();
    assert_eq!(outcome, CallOutcome::Hit(CacheTier::Memory));
    assert_eq!(cold.stats().disk_loads, 1);
}

#[test]
fn test_disk_record_needs_matching_token() {
    let tmp = TempDir::new().unwrap();
    let identity = FunctionIdentity::new("reports", "versioned");

    let v1 = CachePolicy::<i64, u64>::new(CacheConfig::persistent(tmp.path())).with_freshness(|_: &i64| Ok(1u64));
    let writer = CachedFn::new(identity.clone(), v1, |x: &i64| x + 100).unwrap();
    assert_eq!(*writer.call(&1).unwrap(), 101);

    let (seen, calls) = counter();
    let v2 = CachePolicy::<i64, u64>::new(CacheConfig::persistent(tmp.path())).with_freshness(|_: &i64| Ok(2u64));
    let reader = CachedFn::new(identity, v2, move |x: &i64| {
        seen.fetch_add(1, Ordering::SeqCst);
        x + 200
    })
    .unwrap();

    let (value, outcome) = reader.call_with_outcome(&1).unwrap();
    assert_eq!(*value, 201);
    assert_eq!(outcome, CallOutcome::Stale);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_disk_records_are_write_once() {
    let tmp = TempDir::new().unwrap();
    let identity = FunctionIdentity::new("reports", "write_once");
    let generation = Arc::new(AtomicUsize::new(0));
    let token_source = Arc::clone(&generation);

    let policy = CachePolicy::<i64, u64>::new(CacheConfig::persistent(tmp.path()))
        .with_freshness(move |_: &i64| Ok(token_source.load(Ordering::SeqCst) as u64));
    let cached = CachedFn::new(identity.clone(), policy, |x: &i64| *x).unwrap();

    cached.call(&7).unwrap();
    generation.store(1, Ordering::SeqCst);
    cached.call(&7).unwrap();

    let signature = cached.signature(&7).unwrap();
    let disk = cached.store().disk().unwrap();
    let (token, value): (u64, i64) = disk.read(&signature).unwrap().unwrap();
    assert_eq!(token, 0);
    assert_eq!(value, 7);
    assert_eq!(cached.stats().disk_writes, 1);
}

#[test]
fn test_missing_token_artifact_is_a_miss() {
    let tmp = TempDir::new().unwrap();
    let identity = FunctionIdentity::new("reports", "partial");
    let config = CacheConfig::persistent(tmp.path());

    let writer = CachedFn::new(identity.clone(), CachePolicy::new(config.clone()), |x: &i64| x * 3).unwrap();
    writer.call(&5).unwrap();
    let signature = writer.signature(&5).unwrap();
    let token_path = writer
        .store()
        .disk()
        .unwrap()
        .cache_path(&signature, ArtifactKind::Token);
    std::fs::remove_file(&token_path).unwrap();

    let (seen, calls) = counter();
    let reader = CachedFn::new(identity, CachePolicy::new(config), move |x: &i64| {
        seen.fetch_add(1, Ordering::SeqCst);
        x * 3
    })
    .unwrap();

    let (value, outcome) = reader.call_with_outcome(&5).unwrap();
    assert_eq!(*value, 15);
    assert_eq!(outcome, CallOutcome::Miss);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(reader.stats().disk_errors, 1);
}

#[test]
fn test_failed_disk_write_is_swallowed() {
    let tmp = TempDir::new().unwrap();
    // A plain file where the cache directory belongs.
    std::fs::write(tmp.path().join("func_cache"), b"").unwrap();

    let (seen, calls) = counter();
    let cached = CachedFn::new(
        FunctionIdentity::new("reports", "unwritable"),
        CachePolicy::new(CacheConfig::persistent(tmp.path())),
        move |x: &i64| {
            seen.fetch_add(1, Ordering::SeqCst);
            x * 4
        },
    )
    .unwrap();

    let (value, outcome) = cached.call_with_outcome(&2).unwrap();
    assert_eq!(*value, 8);
    assert_eq!(outcome, CallOutcome::Miss);

    let (value, outcome) = cached.call_with_outcome(&2).unwrap();
    assert_eq!(*value, 8);
    assert_eq!(outcome, CallOutcome::Hit(CacheTier::Memory));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let stats = cached.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.disk_writes, 0);
    assert_eq!(stats.disk_errors, 1);
}

#[test]
fn test_truncated_artifacts_are_a_miss() {
    let tmp = TempDir::new().unwrap();
    let identity = FunctionIdentity::new("reports", "truncated");
    let config = CacheConfig::builder()
        .disk_cache_root(tmp.path())
        .disk_format(DiskFormat::Json)
        .build();

    let policy = CachePolicy::<String>::new(config.clone())
        .with_freshness(|s: &String| Ok(format!("token-{}", s)));
    let writer = CachedFn::new(identity.clone(), policy, |s: &String| build_report(s)).unwrap();
    writer.call(&"q4".to_string()).unwrap();

    let signature = writer.signature(&"q4".to_string()).unwrap();
    let disk = writer.store().disk().unwrap();
    for kind in [ArtifactKind::Value, ArtifactKind::Token] {
        let path = disk.cache_path(&signature, kind);
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
    }

    let policy = CachePolicy::<String>::new(config)
        .with_freshness(|s: &String| Ok(format!("token-{}", s)));
    let reader = CachedFn::new(identity, policy, |s: &String| build_report(s)).unwrap();
    let (value, outcome) = reader.call_with_outcome(&"q4".to_string()).unwrap();

    assert_eq!(value.title, "Q4");
    assert_eq!(outcome, CallOutcome::Miss);
}

#[test]
fn test_unserializable_arguments() {
    let (seen, calls) = counter();
    let cached = CachedFn::new(
        function_identity!(lookup),
        CachePolicy::default(),
        move |m: &BTreeMap<(u8, u8), u8>| {
            seen.fetch_add(1, Ordering::SeqCst);
            m.len()
        },
    )
    .unwrap();

    let mut args = BTreeMap::new();
    args.insert((1, 2), 3);
    let err = cached.call(&args).unwrap_err();

    assert!(matches!(err, CacheError::UnserializableArguments(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_non_finite_float_arguments_rejected() {
    let (seen, calls) = counter();
    let cached = CachedFn::new(function_identity!(halve), CachePolicy::default(), move |x: &f64| {
        seen.fetch_add(1, Ordering::SeqCst);
        x / 2.0
    })
    .unwrap();

    for bad in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
        let err = cached.call(&bad).unwrap_err();
        assert!(matches!(err, CacheError::UnserializableArguments(_)));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    assert_eq!(*cached.call(&3.0).unwrap(), 1.5);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_optional_arguments_kept_apart() {
    let (seen, calls) = counter();
    let cached = CachedFn::new(
        function_identity!(count_items),
        CachePolicy::default(),
        move |items: &Option<Vec<i32>>| {
            seen.fetch_add(1, Ordering::SeqCst);
            items.as_ref().map_or(-1, |v| v.len() as i64)
        },
    )
    .unwrap();

    assert_eq!(*cached.call(&None).unwrap(), -1);
    assert_eq!(*cached.call(&Some(vec![])).unwrap(), 0);
    assert_eq!(*cached.call(&Some(vec![7])).unwrap(), 1);
    assert_eq!(*cached.call(&None).unwrap(), -1);

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(cached.stats().entries, 3);
}

#[test]
fn test_function_errors_pass_through() {
    let cached = CachedFn::new_fallible(function_identity!(parse), CachePolicy::default(), |s: &String| {
        s.parse::<i64>().map_err(anyhow::Error::from)
    })
    .unwrap();

    let err = cached.try_call(&"nope".to_string()).unwrap_err();
    assert!(err.downcast_ref::<std::num::ParseIntError>().is_some());
    assert!(cached.store().is_empty());

    assert_eq!(*cached.try_call(&"42".to_string()).unwrap(), 42);
}

#[test]
fn test_independent_instances() {
    let identity = FunctionIdentity::new("reports", "shared_name");
    let a = CachedFn::new(identity.clone(), CachePolicy::default(), |x: &i64| x + 1).unwrap();
    let b = CachedFn::new(identity, CachePolicy::default(), |x: &i64| x + 2).unwrap();

    assert_eq!(*a.call(&1).unwrap(), 2);
    assert_eq!(*b.call(&1).unwrap(), 3);
    assert_eq!(a.stats().entries, 1);
    assert_eq!(b.stats().entries, 1);
}

#[test]
fn test_concurrent_calls() {
    let (seen, calls) = counter();
    let cached = Arc::new(
        CachedFn::new(function_identity!(slow_square), CachePolicy::default(), move |x: &u64| {
            seen.fetch_add(1, Ordering::SeqCst);
            x * x
        })
        .unwrap(),
    );

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cached = Arc::clone(&cached);
            std::thread::spawn(move || *cached.call(&9).unwrap())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 81);
    }

    // Racing callers may recompute, but every later call is a hit.
    let before = calls.load(Ordering::SeqCst);
    assert!((1..=8).contains(&before));
    cached.call(&9).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), before);
}

#[tokio::test]
async fn test_async_calls() {
    let (seen, calls) = counter();
    let cached = CachedFn::new_async(function_identity!(fetch), CachePolicy::default(), move |id: &u32| {
        seen.fetch_add(1, Ordering::SeqCst);
        let id = *id;
        async move {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            Ok::<_, CacheError>(format!("record-{}", id))
        }
    })
    .unwrap();

    assert_eq!(*cached.call_async(&7).await.unwrap(), "record-7");
    assert_eq!(*cached.call_async(&7).await.unwrap(), "record-7");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
