use std::time::Duration;

use candela::{
    CandelaError, ChartSession, DisplaySeries, Presenter, ShowOutcome, TimeRange, candles,
};
use candela_mock::MockBehavior;

use crate::helpers::{day, mock_session, win};

#[tokio::test(start_paused = true)]
async fn stale_result_does_not_replace_newer_display() {
    let (session, ctrl) = mock_session();
    let a = win(day(2024, 1, 1), day(2024, 1, 2), 300);
    let b = win(day(2024, 3, 1), day(2024, 3, 2), 300);
    ctrl.set_behavior(&a, MockBehavior::Delay(Duration::from_millis(200)))
        .await;

    let slow = {
        let session = session.clone();
        tokio::spawn(async move { session.show(a).await })
    };
    // let the first request start before the second is issued
    tokio::time::sleep(Duration::from_millis(1)).await;

    let fast = session.show(b).await.unwrap();
    assert!(matches!(fast, ShowOutcome::Applied(r) if r.generation == 2));

    let stale = slow.await.unwrap().unwrap();
    assert_eq!(stale, ShowOutcome::Superseded { generation: 1 });

    let snap = session.snapshot().await;
    assert_eq!(snap.window, Some(b));
    assert_eq!(snap.generation, 2);
    assert!(!snap.loading);
    let first = session.with_series(|s| s.earliest()).await;
    assert_eq!(first, Some(day(2024, 3, 1)));
    // the overtaken window still populated the cache
    assert!(session.loader().cache().get(&a.key()).await.is_some());
}

#[tokio::test(start_paused = true)]
async fn stale_failure_is_not_recorded() {
    let (session, ctrl) = mock_session();
    let a = win(day(2024, 1, 1), day(2024, 1, 2), 300);
    let b = win(day(2024, 3, 1), day(2024, 3, 2), 300);
    ctrl.set_behavior(&a, MockBehavior::Hang).await;

    let slow = session.clone();
    let slow = tokio::spawn(async move { slow.show(a).await });
    tokio::time::sleep(Duration::from_millis(1)).await;
    session.show(b).await.unwrap();
    slow.abort();

    assert_eq!(session.last_error().await, None);
    assert_eq!(session.generation(), 2);
}

#[tokio::test]
async fn show_range_uses_preset_lookback() {
    let (session, ctrl) = mock_session();
    let out = session
        .show_range(TimeRange::Day, Some(day(2024, 1, 2)), 10_000)
        .await
        .unwrap();

    assert!(matches!(out, ShowOutcome::Applied(r) if r.points == 1440));
    let requested = ctrl.requests().await;
    assert_eq!(requested.len(), 1);
    assert_eq!(requested[0].start(), Some(day(2024, 1, 1)));
    assert_eq!(requested[0].end(), day(2024, 1, 2));
}

#[test]
fn builder_rejects_incomplete_configuration() {
    let err = ChartSession::builder().build().unwrap_err();
    assert!(matches!(err, CandelaError::InvalidArg(_)));

    let (source, _) = candela_mock::MockSource::new_with_controller("mock");
    let err = ChartSession::builder()
        .source(source)
        .max_points(0)
        .build()
        .unwrap_err();
    assert!(matches!(err, CandelaError::InvalidArg(_)));
}

#[derive(Default)]
struct Recorder {
    frames: Vec<(usize, f64)>,
}

impl Presenter for Recorder {
    fn render(&mut self, series: &DisplaySeries, density: f64) {
        self.frames.push((candles(series).len(), density));
    }
}

#[tokio::test]
async fn render_and_summary_reflect_display() {
    let (session, _ctrl) = mock_session();
    session
        .show(win(day(2024, 1, 1), day(2024, 1, 1) + chrono::TimeDelta::hours(3), 1000))
        .await
        .unwrap();

    let mut rec = Recorder::default();
    session.render(&mut rec).await;
    let density = session.density().await;
    assert_eq!(rec.frames, vec![(180, density)]);

    let summary = session.summary().await.unwrap();
    assert_eq!(summary.data_points, 180);
    assert!(summary.min_price <= summary.max_price);
}
