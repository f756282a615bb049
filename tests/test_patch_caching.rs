use nalgebra::DMatrix;
use surfit::{BicubicSurface, PatchHint};

/// A 6x6 unit-spaced grid of a smooth function, so the surface has a 5x5
/// field of patches to sweep across.
fn test_surface() -> BicubicSurface {
    let _ = env_logger::builder().is_test(true).try_init();
    let f = DMatrix::from_fn(6, 6, |i, j| {
        let (x, y) = (i as f64, j as f64);
        (0.4 * x).sin() + 0.25 * x * y
    });
    BicubicSurface::regular([0.0, 0.0], [1.0, 1.0], &f, 0.0).unwrap()
}

fn stats(surface: &BicubicSurface) -> (u64, u64, u64, u64) {
    (
        surface.num_accesses(),
        surface.num_accesses_same_point(),
        surface.num_accesses_same_patch(),
        surface.num_accesses_nearby_patch(),
    )
}

#[test]
fn test_counter_attribution_per_tier() {
    let surface = test_surface();
    let mut hint = PatchHint::new();

    // Cold hint: a plain access through the general search.
    surface.value([0.2, 0.2], &mut hint).unwrap();
    assert_eq!(stats(&surface), (1, 0, 0, 0));

    // Exact repeat: same point, same request.
    surface.value([0.2, 0.2], &mut hint).unwrap();
    assert_eq!(stats(&surface), (2, 1, 0, 0));

    // Same point but new information: counts as same patch.
    surface.derivative(&[0], [0.2, 0.2], &mut hint).unwrap();
    assert_eq!(stats(&surface), (3, 1, 1, 0));

    // A different point on the cached patch.
    surface.value([0.7, 0.3], &mut hint).unwrap();
    assert_eq!(stats(&surface), (4, 1, 2, 0));

    // One patch over: resolved by the neighbor probe.
    surface.value([1.2, 0.3], &mut hint).unwrap();
    assert_eq!(stats(&surface), (5, 1, 2, 1));

    // A far patch: back to the general search.
    surface.value([4.5, 4.5], &mut hint).unwrap();
    assert_eq!(stats(&surface), (6, 1, 2, 1));
}

#[test]
fn test_repeated_query_is_bit_identical() {
    let surface = test_surface();
    let mut hint = PatchHint::new();
    let first = surface.value([1.37, 2.81], &mut hint).unwrap();
    let second = surface.value([1.37, 2.81], &mut hint).unwrap();
    assert_eq!(first.to_bits(), second.to_bits());

    let d_first = surface.derivative(&[0, 1], [1.37, 2.81], &mut hint).unwrap();
    let d_second = surface.derivative(&[0, 1], [1.37, 2.81], &mut hint).unwrap();
    assert_eq!(d_first.to_bits(), d_second.to_bits());
}

#[test]
fn test_cached_patch_matches_independent_recomputation() {
    let surface = test_surface();
    let mut hint = PatchHint::new();
    surface.value([0.2, 0.2], &mut hint).unwrap();

    // Same-patch resolution reuses cached coefficients; the result must
    // equal a from-scratch computation at the same point.
    let cached = surface.value([0.7, 0.6], &mut hint).unwrap();
    let fresh = surface.value_at([0.7, 0.6]).unwrap();
    assert_eq!(cached.to_bits(), fresh.to_bits());
}

#[test]
fn test_shared_edge_sticks_to_the_cached_patch() {
    // An axis-aligned sweep that lands exactly on a patch boundary must
    // not oscillate between the two adjacent patches.
    let surface = test_surface();
    let mut hint = PatchHint::new();

    surface.value([0.5, 0.5], &mut hint).unwrap(); // patch (0, 0)
    surface.value([1.0, 0.5], &mut hint).unwrap(); // right edge of (0, 0)
    let (_, _, same_patch, nearby) = stats(&surface);
    assert_eq!(same_patch, 1, "edge point re-resolved the patch");
    assert_eq!(nearby, 0);

    // Approaching the same edge with a hint cached on the other side also
    // stays put.
    let mut other = PatchHint::new();
    surface.value([1.5, 0.5], &mut other).unwrap(); // patch (1, 0)
    surface.value([1.0, 0.5], &mut other).unwrap(); // left edge of (1, 0)
    let (_, _, same_patch, _) = stats(&surface);
    assert_eq!(same_patch, 2);

    // Both sides agree on the shared-edge value.
    let from_left = surface.value([1.0, 0.5], &mut hint).unwrap();
    let from_right = surface.value([1.0, 0.5], &mut other).unwrap();
    assert!((from_left - from_right).abs() < 1e-9);
}

#[test]
fn test_diagonal_neighbor_counts_as_nearby() {
    let surface = test_surface();
    let mut hint = PatchHint::new();
    surface.value([1.5, 1.5], &mut hint).unwrap(); // patch (1, 1)
    surface.value([2.5, 2.5], &mut hint).unwrap(); // patch (2, 2), diagonal
    let (_, _, _, nearby) = stats(&surface);
    assert_eq!(nearby, 1);
}

#[test]
fn test_statistics_reset() {
    let surface = test_surface();
    let mut hint = PatchHint::new();
    surface.value([0.5, 0.5], &mut hint).unwrap();
    surface.value([0.5, 0.5], &mut hint).unwrap();
    assert!(surface.num_accesses() > 0);

    surface.reset_statistics();
    assert_eq!(stats(&surface), (0, 0, 0, 0));

    // Counting resumes after a reset.
    surface.value([0.6, 0.5], &mut hint).unwrap();
    assert_eq!(surface.num_accesses(), 1);
}

#[test]
fn test_statistics_are_shared_across_hints_and_handles() {
    let s1 = test_surface();
    let s2 = s1.clone();
    let mut h1 = PatchHint::new();
    let mut h2 = PatchHint::new();

    s1.value([0.5, 0.5], &mut h1).unwrap();
    s2.value([3.5, 3.5], &mut h2).unwrap();
    s2.value([3.5, 3.5], &mut h2).unwrap();

    // One engine, one set of counters, regardless of handle or hint.
    assert_eq!(s1.num_accesses(), 3);
    assert_eq!(s2.num_accesses(), 3);
    assert_eq!(s1.num_accesses_same_point(), 1);
}

#[test]
fn test_failed_accesses_are_not_counted() {
    let surface = test_surface();
    let mut hint = PatchHint::new();
    assert!(surface.value([-1.0, 0.5], &mut hint).is_err());
    assert!(surface.derivative(&[7], [0.5, 0.5], &mut hint).is_err());
    assert_eq!(surface.num_accesses(), 0);
}

#[test]
fn test_hint_survives_surface_handles() {
    // Hints and handles have independent lifetimes; a hint may be reused
    // with another handle to the same engine.
    let s1 = test_surface();
    let mut hint = PatchHint::new();
    s1.value([0.5, 0.5], &mut hint).unwrap();

    let s2 = s1.clone();
    drop(s1);
    let z = s2.value([0.5, 0.5], &mut hint).unwrap();
    assert!(z.is_finite());
    assert_eq!(s2.num_accesses_same_point(), 1);
}
