//! Demonstrates validity-checked caching of a file-reading function
//!
//! This example shows how to:
//! - Wrap a function with a file-content freshness policy
//! - Persist results to a disk tier
//! - Observe hits, stale entries and disk warm starts
//!
//! Run with `RUST_LOG=funcache=debug` to see the cache decisions.

use funcache::{function_identity, CacheConfig, CachePolicy, CachedFn};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn sum_lines(path: &PathBuf) -> anyhow::Result<i64> {
    let text = std::fs::read_to_string(path)?;
    let mut total = 0;
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        total += line.trim().parse::<i64>()?;
    }
    Ok(total)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "funcache=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let workdir = tempfile::tempdir()?;
    let input = workdir.path().join("numbers.txt");
    let config = CacheConfig::persistent(workdir.path().join("cache"));

    std::fs::write(&input, "1\n2\n3\n4\n")?;

    let cached = CachedFn::new_fallible(
        function_identity!(sum_lines),
        CachePolicy::<PathBuf, String>::for_path(config.clone()),
        sum_lines,
    )?;

    println!("1. First call");
    println!("   sum = {}", cached.try_call(&input)?);

    println!("2. Same content");
    println!("   sum = {}", cached.try_call(&input)?);

    println!("3. Edited content");
    std::fs::write(&input, "10\n20\n30\n40\n")?;
    println!("   sum = {}", cached.try_call(&input)?);
    println!("   {}", cached.stats());

    println!("4. New instance on the same disk root");
    std::fs::write(&input, "1\n2\n3\n4\n")?;
    let restarted = CachedFn::new_fallible(
        function_identity!(sum_lines),
        CachePolicy::<PathBuf, String>::for_path(config),
        sum_lines,
    )?;
    let (value, outcome) = restarted.try_call_with_outcome(&input)?;
    println!("   sum = {} ({})", value, outcome);

    Ok(())
}
