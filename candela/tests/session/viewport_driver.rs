use std::time::Duration;

use candela::{Phase, ViewportConfig, density};

use crate::helpers::{day, dt, mock_session, mock_session_with, viewport, win};

#[tokio::test(start_paused = true)]
async fn driver_evaluates_only_the_latest_state() {
    let (session, ctrl) = mock_session();
    session
        .show(win(day(2024, 1, 1), day(2024, 1, 8), 10_000))
        .await
        .unwrap();
    let driver = session.spawn_viewport_driver();

    // burst: near the past edge, then panned away before the quiet period ends
    driver.notify(viewport(dt(2024, 1, 1, 1, 0, 0), day(2024, 1, 2), 40));
    tokio::time::sleep(Duration::from_millis(100)).await;
    driver.notify(viewport(day(2024, 1, 3), day(2024, 1, 5), 800));
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(ctrl.fetch_count(), 1);
    assert_eq!(session.density().await, density(800, 0.5));

    driver.notify(viewport(dt(2024, 1, 1, 1, 0, 0), day(2024, 1, 2), 40));
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(ctrl.fetch_count(), 2);
    assert_eq!(session.phase().await, Phase::Loaded);
    let earliest = session.with_series(|s| s.earliest()).await;
    assert_eq!(earliest, Some(dt(2023, 12, 25, 1, 20, 0)));
    driver.stop().await;
}

#[tokio::test(start_paused = true)]
async fn nothing_is_evaluated_before_the_quiet_period() {
    let cfg = ViewportConfig {
        debounce: Duration::from_millis(500),
        ..ViewportConfig::default()
    };
    let (session, ctrl) = mock_session_with(|b| b.viewport(cfg));
    session
        .show(win(day(2024, 1, 1), day(2024, 1, 8), 10_000))
        .await
        .unwrap();
    let driver = session.spawn_viewport_driver();

    for i in 0..5 {
        driver.notify(viewport(dt(2024, 1, 1, 1, i, 0), day(2024, 1, 2), 40));
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    assert_eq!(ctrl.fetch_count(), 1);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(ctrl.fetch_count(), 2);
    driver.stop().await;
}

#[tokio::test(start_paused = true)]
async fn dropped_driver_stops_prefetching() {
    let (session, ctrl) = mock_session();
    session
        .show(win(day(2024, 1, 1), day(2024, 1, 8), 10_000))
        .await
        .unwrap();
    let driver = session.spawn_viewport_driver();
    driver.notify(viewport(dt(2024, 1, 1, 1, 0, 0), day(2024, 1, 2), 40));
    drop(driver);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(ctrl.fetch_count(), 1);
}
