use std::time::Duration;

use candela::{
    CandelaError, DisplaySeries, Edge, FetchedBatch, Phase, PrefetchOutcome, ViewportConfig,
};
use candela_mock::MockBehavior;
use chrono::TimeDelta;

use crate::helpers::{day, dt, minute_points, mock_session, mock_session_with, viewport, win};

fn tight_threshold() -> ViewportConfig {
    ViewportConfig {
        edge_threshold: Duration::from_secs(3600),
        ..ViewportConfig::default()
    }
}

fn widest_gap(series: &DisplaySeries) -> TimeDelta {
    series
        .points()
        .windows(2)
        .map(|p| p[1].open_time - p[0].open_time)
        .max()
        .unwrap_or(TimeDelta::zero())
}

#[tokio::test]
async fn nearing_the_past_edge_prefetches_once() {
    let (session, ctrl) = mock_session();
    session
        .show(win(day(2024, 1, 1), day(2024, 1, 8), 10_000))
        .await
        .unwrap();
    assert_eq!(session.phase().await, Phase::Loaded);

    let plans = session
        .evaluate_viewport(viewport(dt(2024, 1, 1, 2, 0, 0), day(2024, 1, 3), 300))
        .await;
    assert_eq!(plans.len(), 1);
    let plan = plans[0];
    assert_eq!(plan.edge, Edge::Past);
    // one batch of minute candles back from the earliest point
    assert_eq!(plan.window.start(), Some(dt(2023, 12, 25, 1, 20, 0)));
    assert_eq!(plan.window.end(), day(2024, 1, 1));
    assert_eq!(plan.window.limit(), 10_000);
    assert_eq!(session.phase().await, Phase::PrefetchingPast);

    // a pan one second later while the prefetch is running
    let again = session
        .evaluate_viewport(viewport(dt(2024, 1, 1, 2, 0, 1), day(2024, 1, 3), 300))
        .await;
    assert!(again.is_empty());

    let out = session.prefetch(plan).await.unwrap();
    assert_eq!(
        out,
        PrefetchOutcome::Merged {
            added: 2000,
            cache_hit: false
        }
    );
    assert_eq!(ctrl.fetch_count(), 2);
    assert_eq!(session.phase().await, Phase::Loaded);
    session
        .with_series(|s| {
            assert_eq!(s.earliest(), Some(dt(2023, 12, 25, 1, 20, 0)));
            assert!(s.points().windows(2).all(|p| p[0].open_time < p[1].open_time));
            // every 5th minute is kept on both sides of the old edge
            assert_eq!(widest_gap(s), TimeDelta::minutes(5));
        })
        .await;
    let snap = session.snapshot().await;
    assert_eq!(
        snap.loaded_range,
        Some((dt(2023, 12, 25, 1, 20, 0), dt(2024, 1, 7, 22, 35, 0)))
    );
}

#[tokio::test]
async fn past_prefetch_continues_until_the_loaded_edge() {
    // the baseline is 5-minute data, older history is served per minute
    let cfg = ViewportConfig {
        edge_threshold: Duration::from_secs(3600),
        prefetch_limit: 100,
        candle_interval: Duration::from_secs(300),
        ..ViewportConfig::default()
    };
    let (session, ctrl) = mock_session_with(|b| b.viewport(cfg));
    let baseline = win(day(2024, 1, 1), day(2024, 1, 2), 10_000);
    let sparse = minute_points(day(2024, 1, 1), 1440).into_iter().step_by(5).collect();
    ctrl.set_behavior(&baseline, MockBehavior::Return(FetchedBatch::new(sparse)))
        .await;
    session.show(baseline).await.unwrap();

    let plans = session
        .evaluate_viewport(viewport(dt(2024, 1, 1, 0, 30, 0), dt(2024, 1, 1, 6, 0, 0), 200))
        .await;
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].window.start(), Some(dt(2023, 12, 31, 15, 40, 0)));

    let out = session.prefetch(plans[0]).await.unwrap();
    assert_eq!(
        out,
        PrefetchOutcome::Merged {
            added: 500,
            cache_hit: false
        }
    );
    // one baseline fetch, then five full batches of 100 minutes
    assert_eq!(ctrl.fetch_count(), 6);
    let requests = ctrl.requests().await;
    assert!(requests[1..].iter().all(|w| w.end() == day(2024, 1, 1)));
    assert!(requests[1..].windows(2).all(|w| w[0].start() < w[1].start()));
    session
        .with_series(|s| {
            assert_eq!(s.earliest(), Some(dt(2023, 12, 31, 15, 40, 0)));
            assert!(widest_gap(s) <= TimeDelta::minutes(5));
        })
        .await;
    assert_eq!(session.phase().await, Phase::Loaded);
}

#[tokio::test]
async fn nearing_the_future_edge_prefetches_after_latest() {
    let (session, _ctrl) = mock_session_with(|b| b.viewport(tight_threshold()));
    session
        .show(win(day(2024, 1, 1), day(2024, 1, 2), 10_000))
        .await
        .unwrap();
    let latest = dt(2024, 1, 1, 23, 59, 0);

    let plans = session
        .evaluate_viewport(viewport(dt(2024, 1, 1, 6, 0, 0), dt(2024, 1, 1, 23, 30, 0), 200))
        .await;

    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].edge, Edge::Future);
    assert_eq!(plans[0].window.start(), Some(latest + TimeDelta::milliseconds(1)));
    assert_eq!(plans[0].window.end(), latest + TimeDelta::days(30));
    assert_eq!(session.phase().await, Phase::PrefetchingFuture);

    let out = session.prefetch(plans[0]).await.unwrap();
    assert!(matches!(out, PrefetchOutcome::Merged { added, .. } if added > 0));
    let new_latest = session.with_series(|s| s.latest()).await.unwrap();
    assert!(new_latest > latest);
}

#[tokio::test]
async fn exhausted_edge_is_not_fetched_again() {
    let (session, ctrl) = mock_session_with(|b| b.viewport(tight_threshold()));
    ctrl.set_data_range(day(2024, 1, 1), None).await;
    session
        .show(win(day(2024, 1, 1), day(2024, 1, 2), 10_000))
        .await
        .unwrap();
    let near_past = viewport(dt(2024, 1, 1, 0, 30, 0), dt(2024, 1, 1, 6, 0, 0), 200);

    let plans = session.evaluate_viewport(near_past).await;
    assert_eq!(plans.len(), 1);
    let out = session.prefetch(plans[0]).await.unwrap();
    assert_eq!(out, PrefetchOutcome::Exhausted);

    assert!(session.evaluate_viewport(near_past).await.is_empty());
    assert_eq!(ctrl.fetch_count(), 2);
    assert_eq!(session.phase().await, Phase::Loaded);
    // an empty edge is not an error
    assert_eq!(session.last_error().await, None);
}

#[tokio::test]
async fn prefetch_for_replaced_display_is_discarded() {
    let (session, _ctrl) = mock_session();
    session
        .show(win(day(2024, 1, 1), day(2024, 1, 8), 10_000))
        .await
        .unwrap();
    let plans = session
        .evaluate_viewport(viewport(dt(2024, 1, 1, 2, 0, 0), day(2024, 1, 3), 300))
        .await;

    let b = win(day(2024, 6, 1), day(2024, 6, 2), 500);
    session.show(b).await.unwrap();
    let out = session.prefetch(plans[0]).await.unwrap();

    assert_eq!(out, PrefetchOutcome::Discarded);
    let earliest = session.with_series(|s| s.earliest()).await;
    assert_eq!(earliest, Some(day(2024, 6, 1)));
}

#[tokio::test]
async fn failed_prefetch_can_be_planned_again() {
    let (session, ctrl) = mock_session();
    session
        .show(win(day(2024, 1, 1), day(2024, 1, 8), 10_000))
        .await
        .unwrap();
    let near_past = viewport(dt(2024, 1, 1, 2, 0, 0), day(2024, 1, 3), 300);
    let plan = session.evaluate_viewport(near_past).await[0];
    ctrl.set_behavior(
        &plan.window,
        MockBehavior::Fail(CandelaError::fetch("mock", "timeout")),
    )
    .await;

    let err = session.prefetch(plan).await.unwrap_err();
    assert!(err.is_fetch_failure());
    assert_eq!(session.last_error().await, Some(err));
    assert_eq!(session.phase().await, Phase::Loaded);

    let retry = session.evaluate_viewport(near_past).await;
    assert_eq!(retry.len(), 1);
    assert_eq!(retry[0].window, plan.window);
}
