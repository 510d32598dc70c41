use std::time::Duration;

use candela::{ChartSession, TimeRange, ViewportState};
use candela_demos::common::get_source;
use chrono::TimeDelta;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let session = ChartSession::builder()
        .source(get_source())
        .max_points(2000)
        .build()?;

    session.show_range(TimeRange::Month, None, 10_000).await?;
    let Some((earliest, latest)) = session.snapshot().await.loaded_range else {
        println!("nothing to show");
        return Ok(());
    };
    println!("loaded {earliest} .. {latest}");

    let driver = session.spawn_viewport_driver();

    // Drag the viewport back a few hours per frame, like a user panning left.
    let span = TimeDelta::days(3);
    let mut end = latest;
    for _ in 0..20 {
        end -= TimeDelta::hours(6);
        let visible_start = end - span;
        let points_in_view =
            session.with_series(|s| s.count_between(visible_start, end)).await;
        driver.notify(ViewportState {
            visible_start,
            visible_end: end,
            points_in_view,
        });
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    // wait out the debounce and the prefetch it triggers
    tokio::time::sleep(Duration::from_secs(2)).await;
    driver.stop().await;

    let snap = session.snapshot().await;
    println!(
        "phase={:?} points={} density={:.2} range={:?}",
        snap.phase, snap.points, snap.density, snap.loaded_range
    );
    if let Some(err) = snap.last_error {
        println!("last error: {err}");
    }
    Ok(())
}
