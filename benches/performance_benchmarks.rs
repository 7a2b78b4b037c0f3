use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

use pacetrack::clock::ManualClock;
use pacetrack::config::TrackerConfig;
use pacetrack::filter::{FilterPolicy, SampleFilter};
use pacetrack::geo::{self, meters_to_lat_degrees};
use pacetrack::models::{LatLng, RawFix, RoutePoint, SessionState, WorkoutMode};
use pacetrack::session::WorkoutSession;

/// Hot-path benchmarks: every fix from the geolocation watch runs through
/// these, so they need to stay far below the fix interval.

fn create_track(points: usize) -> Vec<RawFix> {
    (0..points)
        .map(|i| {
            RawFix::new(meters_to_lat_degrees(i as f64 * 8.0), 0.0, i as i64 * 3_000)
                .with_accuracy(6.0)
                .with_altitude(100.0 + (i % 20) as f64)
        })
        .collect()
}

fn bench_haversine(c: &mut Criterion) {
    let a = LatLng::new(52.5200, 13.4050);
    let b = LatLng::new(52.5205, 13.4061);
    c.bench_function("distance_meters", |bencher| {
        bencher.iter(|| geo::distance_meters(black_box(a), black_box(b)))
    });
}

fn bench_filter(c: &mut Criterion) {
    let filter = SampleFilter::new(FilterPolicy::default());
    let track = create_track(2);
    let prior = RoutePoint::from(&track[0]);

    c.bench_function("sample_filter_accept", |bencher| {
        bencher.iter(|| {
            filter.accept(
                black_box(&track[1]),
                Some(black_box(&prior)),
                SessionState::Active,
            )
        })
    });
}

fn bench_session_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("Session Ingest");
    let config = TrackerConfig::default();

    // 30 minutes to 4 hours of fixes at one per 3 s
    for &points in &[600, 1200, 4800] {
        let track = create_track(points);

        group.throughput(Throughput::Elements(points as u64));
        group.bench_with_input(BenchmarkId::new("ingest_fix", points), &track, |b, track| {
            b.iter(|| {
                let clock = ManualClock::new(0);
                let mut session =
                    WorkoutSession::new(WorkoutMode::Run, &config, Arc::new(clock.clone()));
                let _ = session.confirm_start();
                let _ = session.activate();
                for fix in track {
                    clock.set(fix.timestamp_ms);
                    session.tick();
                    session.ingest_fix(fix);
                }
                black_box(session.snapshot())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_haversine, bench_filter, bench_session_ingest);
criterion_main!(benches);
