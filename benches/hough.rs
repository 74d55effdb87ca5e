use cdc_seed_finder::deadline::Deadline;
use cdc_seed_finder::finder::axial_search::axial_item;
use cdc_seed_finder::finder::{AxialHoughParams, FinderParams};
use cdc_seed_finder::hits::{build_wire_hits, CylindricalLayout, LayoutParams, WireHit};
use cdc_seed_finder::hough::{AxialHitItem, AxialHitPredicate, HoughTree};
use cdc_seed_finder::synthetic::{simulate_event, SyntheticParams, TruthTrack};
use cdc_seed_finder::TrackFinder;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_tracks(count: usize, seed: u64) -> Vec<TruthTrack> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let magnitude = rng.gen_range(0.004..0.02);
            let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            TruthTrack {
                curvature: sign * magnitude,
                phi0: rng.gen_range(-3.1..3.1),
                impact: 0.0,
                z0: rng.gen_range(-10.0..10.0),
                tan_lambda: rng.gen_range(-0.8..0.8),
            }
        })
        .collect()
}

fn bench_axial_tree(c: &mut Criterion) {
    let layout = CylindricalLayout::new(LayoutParams::default()).expect("layout");
    let params = SyntheticParams {
        tracks: random_tracks(6, 11),
        noise_hits: 200,
        ..SyntheticParams::default()
    };
    let event = simulate_event(&layout, &params);
    let hits = build_wire_hits(&event.hits, &layout);
    let items: Vec<AxialHitItem> = hits.iter().map(axial_item).collect();
    let candidates: Vec<usize> = hits.iter().filter(|h| h.is_axial()).map(WireHit::id).collect();

    let hough = AxialHoughParams::default();
    let tree = HoughTree::new(
        [
            hough.phi0.build("phi0").expect("phi0 axis"),
            hough.curvature.build("curvature").expect("curvature axis"),
            hough.impact.build("impact").expect("impact axis"),
        ],
        [hough.phi0.divisions, hough.curvature.divisions, hough.impact.divisions],
        hough.max_level,
        hough.min_items_per_leaf,
    )
    .expect("tree");
    let predicate = AxialHitPredicate {
        tolerance: hough.tolerance,
    };

    c.bench_function("axial_hough_tree_6_tracks", |b| {
        b.iter(|| {
            let outcome = tree
                .search(
                    &predicate,
                    black_box(&items),
                    black_box(&candidates),
                    &Deadline::unlimited(),
                    "bench",
                )
                .expect("search");
            black_box(outcome.leaves.len())
        })
    });
}

fn bench_full_event(c: &mut Criterion) {
    let layout = CylindricalLayout::new(LayoutParams::default()).expect("layout");
    let finder = TrackFinder::new(FinderParams::default()).expect("finder");
    let event = simulate_event(
        &layout,
        &SyntheticParams {
            noise_hits: 100,
            ..SyntheticParams::default()
        },
    );
    c.bench_function("process_event_3_tracks", |b| {
        b.iter(|| {
            let result = finder
                .process_event(black_box(&event.hits), &layout)
                .expect("event");
            black_box(result.tracks.len())
        })
    });
}

criterion_group!(benches, bench_axial_tree, bench_full_event);
criterion_main!(benches);
