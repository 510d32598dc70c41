use candela::{
    Action, Edge, Event, MAX_WIDTH, MIN_WIDTH, Phase, ViewportConfig, ViewportTracker,
};
use chrono::{DateTime, TimeDelta, Utc};
use proptest::prelude::*;

use crate::helpers::{day, viewport};

fn loaded(earliest: DateTime<Utc>, latest: DateTime<Utc>) -> ViewportTracker {
    let mut t = ViewportTracker::new(ViewportConfig::default());
    t.handle(Event::Loaded { earliest, latest }, day(2025, 1, 1));
    t
}

fn prefetched_edges(actions: &[Action]) -> Vec<Edge> {
    actions
        .iter()
        .filter_map(|a| match a {
            Action::Prefetch { edge, .. } => Some(*edge),
            Action::SetDensity(_) => None,
        })
        .collect()
}

#[test]
fn idle_tracker_only_sets_density() {
    let mut t = ViewportTracker::new(ViewportConfig::default());
    let actions = t.handle(
        Event::ViewportChanged(viewport(day(2024, 1, 1), day(2024, 1, 2), 10)),
        day(2025, 1, 1),
    );
    assert_eq!(actions, vec![Action::SetDensity(0.75)]);
    assert_eq!(t.phase(), Phase::Idle);
}

#[test]
fn both_edges_in_flight_reports_past() {
    let mut t = loaded(day(2024, 1, 1), day(2024, 1, 2));
    let actions = t.handle(
        Event::ViewportChanged(viewport(day(2024, 1, 1), day(2024, 1, 2), 1440)),
        day(2025, 1, 1),
    );
    assert_eq!(prefetched_edges(&actions), vec![Edge::Past, Edge::Future]);
    assert_eq!(t.phase(), Phase::PrefetchingPast);

    t.handle(
        Event::PrefetchCompleted {
            edge: Edge::Past,
            earliest: day(2023, 12, 2),
            latest: day(2024, 1, 2),
        },
        day(2025, 1, 1),
    );
    assert_eq!(t.phase(), Phase::PrefetchingFuture);
    assert_eq!(t.loaded_range(), Some((day(2023, 12, 2), day(2024, 1, 2))));
}

#[test]
fn completion_without_new_data_exhausts_the_edge() {
    let mut t = loaded(day(2024, 1, 1), day(2024, 1, 2));
    t.handle(
        Event::ViewportChanged(viewport(day(2024, 1, 1), day(2024, 1, 1), 10)),
        day(2025, 1, 1),
    );
    t.handle(
        Event::PrefetchCompleted {
            edge: Edge::Past,
            earliest: day(2024, 1, 1),
            latest: day(2024, 1, 2),
        },
        day(2025, 1, 1),
    );
    assert!(t.is_exhausted(Edge::Past));

    // a new baseline makes the edge eligible again
    t.handle(
        Event::Loaded {
            earliest: day(2024, 1, 1),
            latest: day(2024, 1, 2),
        },
        day(2025, 1, 1),
    );
    assert!(!t.is_exhausted(Edge::Past));
}

#[test]
fn future_edge_at_now_is_skipped() {
    let now = day(2024, 1, 2);
    let mut t = ViewportTracker::new(ViewportConfig::default());
    t.handle(
        Event::Loaded {
            earliest: day(2023, 12, 1),
            latest: now,
        },
        now,
    );
    let actions = t.handle(
        Event::ViewportChanged(viewport(day(2023, 12, 20), now, 500)),
        now,
    );
    assert!(prefetched_edges(&actions).is_empty());
    assert!(!t.is_in_flight(Edge::Future));
}

proptest! {
    #[test]
    fn at_most_one_prefetch_per_edge(
        pans in proptest::collection::vec((0i64..240, 1i64..96, 0usize..5000), 1..40),
    ) {
        let earliest = day(2024, 1, 1);
        let latest = day(2024, 1, 8);
        let mut t = loaded(earliest, latest);
        let mut issued = [0usize; 2];
        for (offset_h, span_h, n) in pans {
            let start = earliest + TimeDelta::hours(offset_h - 48);
            let end = start + TimeDelta::hours(span_h);
            let actions = t.handle(Event::ViewportChanged(viewport(start, end, n)), day(2025, 1, 1));
            for a in &actions {
                match a {
                    Action::SetDensity(d) => prop_assert!((MIN_WIDTH..=MAX_WIDTH).contains(d)),
                    Action::Prefetch { edge: Edge::Past, window } => {
                        issued[0] += 1;
                        prop_assert_eq!(window.end(), earliest);
                        let span = earliest - window.start().unwrap();
                        prop_assert!(span <= TimeDelta::minutes(10_000));
                    }
                    Action::Prefetch { edge: Edge::Future, window } => {
                        issued[1] += 1;
                        prop_assert!(window.start().unwrap() > latest);
                    }
                }
            }
        }
        prop_assert!(issued[0] <= 1);
        prop_assert!(issued[1] <= 1);
    }
}
