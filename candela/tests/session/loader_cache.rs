use std::sync::Arc;
use std::time::Duration;

use candela::{FetchedBatch, LoaderConfig, SeriesCache, ShowOutcome, WindowLoader};
use candela_mock::{Layout, MockBehavior, MockSource, candle_at};

use crate::helpers::{day, minute_points, mock_session, win};

#[tokio::test]
async fn same_window_is_fetched_once() {
    let (session, ctrl) = mock_session();
    let w = win(day(2024, 1, 1), day(2024, 1, 2), 500);

    let first = session.show(w).await.unwrap();
    let ShowOutcome::Applied(first) = first else {
        panic!("expected applied, got {first:?}");
    };
    assert!(!first.cache_hit);
    assert_eq!(first.points, 500);
    let before = session.with_series(|s| s.clone()).await;

    let second = session.show(w).await.unwrap();
    let ShowOutcome::Applied(second) = second else {
        panic!("expected applied, got {second:?}");
    };
    assert!(second.cache_hit);
    assert_eq!(session.with_series(|s| s.clone()).await, before);
    assert_eq!(ctrl.fetch_count(), 1);
}

#[tokio::test]
async fn different_limit_is_a_different_window() {
    let (session, ctrl) = mock_session();
    session.show(win(day(2024, 1, 1), day(2024, 1, 2), 500)).await.unwrap();
    session.show(win(day(2024, 1, 1), day(2024, 1, 2), 400)).await.unwrap();
    assert_eq!(ctrl.fetch_count(), 2);
}

#[tokio::test]
async fn oversized_batch_is_decimated() {
    let (source, ctrl) = MockSource::new_with_controller("mock");
    let w = win(day(2024, 1, 1), day(2024, 1, 8), 10_000);
    let raw = minute_points(day(2024, 1, 1), 5000);
    ctrl.set_behavior(&w, MockBehavior::Return(FetchedBatch::new(raw.clone())))
        .await;

    let loader = WindowLoader::new(source, SeriesCache::default(), LoaderConfig::default());
    let report = loader.load(&w).await.unwrap();

    assert_eq!(report.raw_len, 5000);
    assert_eq!(report.series.len(), 1667);
    assert_eq!(report.series.points()[0], raw[0]);
    assert_eq!(report.series.points()[1], raw[3]);
    // the cache keeps the raw batch
    let entry = loader.cache().get(&w.key()).await.unwrap();
    assert_eq!(entry.points.len(), 5000);
}

#[tokio::test]
async fn concurrent_identical_loads_fetch_once() {
    let (source, ctrl) = MockSource::new_with_controller("mock");
    ctrl.set_default_behavior(MockBehavior::Delay(Duration::from_millis(50)))
        .await;
    let loader = Arc::new(WindowLoader::new(
        source,
        SeriesCache::default(),
        LoaderConfig::default(),
    ));
    let w = win(day(2024, 1, 1), day(2024, 1, 1) + chrono::TimeDelta::hours(1), 100);

    let tasks = (0..8).map(|_| {
        let loader = Arc::clone(&loader);
        async move { loader.load(&w).await }
    });
    let reports = futures::future::join_all(tasks).await;

    assert_eq!(ctrl.fetch_count(), 1);
    let misses = reports
        .iter()
        .filter(|r| !r.as_ref().unwrap().cache_hit)
        .count();
    assert_eq!(misses, 1);
    for r in &reports {
        assert_eq!(r.as_ref().unwrap().series.len(), 60);
    }
}

#[tokio::test]
async fn reversed_batch_is_sorted() {
    let (session, ctrl) = mock_session();
    ctrl.set_layout(Layout {
        reversed: true,
        duplicated: false,
    })
    .await;
    session
        .show(win(day(2024, 1, 1), day(2024, 1, 1) + chrono::TimeDelta::hours(2), 1000))
        .await
        .unwrap();

    session
        .with_series(|s| {
            assert_eq!(s.len(), 120);
            assert!(s.points().windows(2).all(|p| p[0].open_time < p[1].open_time));
        })
        .await;
}

#[tokio::test]
async fn duplicate_timestamps_keep_first_arrival() {
    let (session, ctrl) = mock_session();
    ctrl.set_layout(Layout {
        reversed: false,
        duplicated: true,
    })
    .await;
    session
        .show(win(day(2024, 1, 1), day(2024, 1, 1) + chrono::TimeDelta::hours(1), 1000))
        .await
        .unwrap();

    session
        .with_series(|s| {
            assert_eq!(s.len(), 60);
            for p in s.points() {
                let minute = p.open_time.timestamp() / 60;
                assert_eq!(p.close, candle_at(minute).unwrap().close);
            }
        })
        .await;
}

#[tokio::test]
async fn sessions_sharing_a_cache_share_windows() {
    let cache = SeriesCache::default();
    let (a, ctrl_a) = crate::helpers::mock_session_with(|b| b.cache(cache.clone()));
    let (b, ctrl_b) = crate::helpers::mock_session_with(|b| b.cache(cache.clone()));
    let w = win(day(2024, 2, 1), day(2024, 2, 2), 300);

    a.show(w).await.unwrap();
    let out = b.show(w).await.unwrap();

    assert!(matches!(out, ShowOutcome::Applied(r) if r.cache_hit));
    assert_eq!(ctrl_a.fetch_count() + ctrl_b.fetch_count(), 1);
}
