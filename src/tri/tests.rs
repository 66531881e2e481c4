// Copyright 2025 Lars Brubaker
// Unit tests for the triangulator session surface.

use super::*;

fn run(contours: &[&[Real]]) -> Triangulator {
    let mut tri = Triangulator::new();
    for c in contours {
        tri.add_contour(c);
    }
    tri.triangulate().expect("triangulation failed");
    tri
}

#[test]
fn triangle_passes_through() {
    let tri = run(&[&[0.0, 0.0, 2.0, 0.0, 1.0, 2.0]]);
    assert_eq!(tri.triangle_count(), 1);
    let mut t = tri.triangles()[0];
    t.sort_unstable();
    assert_eq!(t, [1, 2, 3]);
}

#[test]
fn square_yields_two_triangles() {
    let tri = run(&[&[0.0, 0.0, 4.0, 0.0, 4.0, 4.0, 0.0, 4.0]]);
    assert_eq!(tri.triangle_count(), 2);
    let mut used = [false; 5];
    for t in tri.triangles() {
        for &v in t {
            assert!((1..=4).contains(&v), "index {} out of range", v);
            used[v as usize] = true;
        }
    }
    assert!(used[1..].iter().all(|&u| u), "a vertex is missing");
}

#[test]
fn pentagon_yields_three_triangles() {
    use std::f64::consts::PI;
    let mut pent = Vec::new();
    for i in 0..5 {
        let a = 2.0 * PI * i as Real / 5.0 - PI / 2.0;
        pent.push(10.0 * a.cos());
        pent.push(10.0 * a.sin());
    }
    let tri = run(&[&pent]);
    assert_eq!(tri.triangle_count(), 3);
}

#[test]
fn hole_counts_toward_genus() {
    // n + 2*(k-1) - 2 = 8 + 2 - 2 = 8 triangles for the annular region.
    let tri = run(&[
        &[0.0, 0.0, 10.0, 0.0, 10.0, 10.0, 0.0, 10.0],
        &[3.0, 3.0, 3.0, 7.0, 7.0, 7.0, 7.0, 3.0],
    ]);
    assert_eq!(tri.triangle_count(), 8);
}

#[test]
fn same_seed_same_output() {
    let square: &[Real] = &[0.0, 0.0, 5.0, 0.0, 5.0, 3.0, 2.0, 4.0, 0.0, 3.0];
    let a = run(&[square]);
    let b = run(&[square]);
    assert_eq!(a.triangles(), b.triangles());
}

#[test]
fn explicit_seed_changes_are_still_valid() {
    let square: &[Real] = &[0.0, 0.0, 5.0, 0.0, 5.0, 3.0, 2.0, 4.0, 0.0, 3.0];
    for seed in [1u64, 2, 99, 12345] {
        let mut tri = Triangulator::new();
        tri.set_seed(seed);
        tri.add_contour(square);
        let count = tri.triangulate().unwrap();
        assert_eq!(count, 3, "seed {} broke the count", seed);
    }
}

#[test]
fn empty_input_is_rejected() {
    let mut tri = Triangulator::new();
    assert!(matches!(
        tri.triangulate(),
        Err(TriangulateError::InvalidInput(_))
    ));
}

#[test]
fn two_vertex_contour_is_rejected() {
    let mut tri = Triangulator::new();
    tri.add_contour(&[0.0, 0.0, 1.0, 1.0]);
    assert!(matches!(
        tri.triangulate(),
        Err(TriangulateError::InvalidInput(_))
    ));
}

#[test]
fn duplicate_vertices_are_rejected() {
    let mut tri = Triangulator::new();
    tri.add_contour(&[0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
    assert!(matches!(
        tri.triangulate(),
        Err(TriangulateError::DegenerateContour(_))
    ));
}

#[test]
fn segment_limit_is_enforced() {
    let mut tri = Triangulator::new();
    tri.set_max_segments(3);
    tri.add_contour(&[0.0, 0.0, 4.0, 0.0, 4.0, 4.0, 0.0, 4.0]);
    assert!(matches!(
        tri.triangulate(),
        Err(TriangulateError::InvalidInput(_))
    ));
}

#[test]
fn no_output_survives_an_error() {
    let mut tri = Triangulator::new();
    tri.add_contour(&[0.0, 0.0, 4.0, 0.0, 4.0, 4.0, 0.0, 4.0]);
    tri.triangulate().unwrap();
    assert_eq!(tri.triangle_count(), 2);

    tri.clear();
    tri.add_contour(&[0.0, 0.0, 1.0, 1.0]); // invalid
    assert!(tri.triangulate().is_err());
    assert_eq!(tri.triangle_count(), 0);
    assert_eq!(tri.vertex_count(), 0);
}

#[test]
fn clear_allows_session_reuse() {
    let mut tri = Triangulator::new();
    tri.add_contour(&[0.0, 0.0, 4.0, 0.0, 4.0, 4.0, 0.0, 4.0]);
    tri.triangulate().unwrap();

    tri.clear();
    tri.add_contour(&[0.0, 0.0, 2.0, 0.0, 1.0, 2.0]);
    let count = tri.triangulate().unwrap();
    assert_eq!(count, 1);
    assert_eq!(tri.vertex_count(), 3);
}

#[test]
fn elements_buffer_is_zero_based() {
    let tri = run(&[&[0.0, 0.0, 2.0, 0.0, 1.0, 2.0]]);
    let elems = tri.elements();
    assert_eq!(elems.len(), 3);
    let mut e = elems.clone();
    e.sort_unstable();
    assert_eq!(e, vec![0, 1, 2]);
}

#[test]
fn output_is_ccw() {
    let tri = run(&[&[0.0, 0.0, 4.0, 0.0, 4.0, 4.0, 0.0, 4.0]]);
    let verts = [
        Point::new(0.0, 0.0),
        Point::new(0.0, 0.0),
        Point::new(4.0, 0.0),
        Point::new(4.0, 4.0),
        Point::new(0.0, 4.0),
    ];
    for t in tri.triangles() {
        let (a, b, c) = (
            verts[t[0] as usize],
            verts[t[1] as usize],
            verts[t[2] as usize],
        );
        let area2 = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
        assert!(area2 > 0.0, "triangle {:?} is not CCW", t);
    }
}
