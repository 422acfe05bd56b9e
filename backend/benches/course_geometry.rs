use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use loop_course::directions::extract_directions;
use loop_course::geometry::{plan_circle, CourseShape, LocalProjection, RandomBearing};
use loop_course::models::{Coordinate, Leg, PathGeometry, Step};

fn benchmark_plan_circle(c: &mut Criterion) {
    let start = Coordinate {
        lat: 59.33,
        lon: 18.07,
    };
    let projection = LocalProjection::calibrated();
    let mut group = c.benchmark_group("plan_circle");

    for waypoint_count in [6usize, 12, 24] {
        let shape = CourseShape {
            waypoint_count,
            ..CourseShape::default()
        };
        group.bench_with_input(
            BenchmarkId::from_parameter(waypoint_count),
            &shape,
            |b, shape| {
                let mut bearings = RandomBearing::seeded(1);
                b.iter(|| {
                    plan_circle(
                        black_box(start),
                        black_box(10.0),
                        shape,
                        &projection,
                        &mut bearings,
                    )
                });
            },
        );
    }

    group.finish();
}

fn benchmark_extract_directions(c: &mut Criterion) {
    let legs = (0..12)
        .map(|leg| Leg {
            steps: (0..20)
                .map(|step| Step {
                    instruction: format!("Turn left onto street {leg}-{step}"),
                    distance_m: 37.5 * step as f64,
                })
                .collect(),
        })
        .collect();
    let path = PathGeometry {
        coordinates: Vec::new(),
        distance_m: 10_000.0,
        legs,
    };

    c.bench_function("extract_directions", |b| {
        b.iter(|| extract_directions(black_box(&path)));
    });
}

criterion_group!(benches, benchmark_plan_circle, benchmark_extract_directions);
criterion_main!(benches);
