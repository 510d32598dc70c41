use candela::{ChartSession, ShowOutcome, TimeRange};
use candela_demos::common::get_source;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Suggested: RUST_LOG=info,candela=debug,candela_http=debug
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
        .try_init();

    let session = ChartSession::builder().source(get_source()).build()?;

    // First load goes to the source, the second is served from the cache.
    let end = chrono::Utc::now();
    let _ = session.show_range(TimeRange::Week, Some(end), 10_000).await?;
    let again = session.show_range(TimeRange::Week, Some(end), 10_000).await?;
    if let ShowOutcome::Applied(report) = again {
        println!("second load cache_hit={} points={}", report.cache_hit, report.points);
    }

    tracing::info!(snapshot = ?session.snapshot().await, "done");
    Ok(())
}
