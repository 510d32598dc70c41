use std::time::Duration;

use candela::{CacheConfig, ChartSession, SeriesCache, ShowOutcome, TimeRange};
use candela_demos::common::get_source;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Two charts over one LRU cache holding at most 4 windows for 10 minutes.
    let cache = SeriesCache::from_config(&CacheConfig {
        max_entries: Some(4),
        ttl: Some(Duration::from_secs(600)),
    });
    let source = get_source();
    let left = ChartSession::builder()
        .source(source.clone())
        .cache(cache.clone())
        .build()?;
    let right = ChartSession::builder()
        .source(source)
        .cache(cache.clone())
        .build()?;

    let end = chrono::Utc::now();
    for range in TimeRange::ALL {
        let a = left.show_range(range, Some(end), 10_000).await;
        let b = right.show_range(range, Some(end), 10_000).await;
        match (a, b) {
            (Ok(ShowOutcome::Applied(a)), Ok(ShowOutcome::Applied(b))) => println!(
                "{range}: left hit={} right hit={} points={}",
                a.cache_hit, b.cache_hit, b.points
            ),
            (a, b) => println!("{range}: left={a:?} right={b:?}"),
        }
    }
    println!("cached windows: {} ({:?})", cache.len().await, cache.policy());
    Ok(())
}
