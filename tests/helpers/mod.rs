// Copyright 2025 Lars Brubaker
// Shared test utilities for seidel-rust tests.

#![allow(dead_code)]

use seidel_rust::{Point, Real, Triangulator};

/// Triangulate the given contours (flat x,y pairs; outer CCW first, holes
/// CW after) with the default fixed seed.
pub fn triangulate(contours: &[&[Real]]) -> Triangulator {
    let mut tri = Triangulator::new();
    for c in contours {
        tri.add_contour(c);
    }
    tri.triangulate().expect("triangulation failed");
    tri
}

/// 1-based vertex table matching the output indices (slot 0 unused).
pub fn vertex_table(contours: &[&[Real]]) -> Vec<Point> {
    let mut verts = vec![Point::new(0.0, 0.0)];
    for c in contours {
        for xy in c.chunks_exact(2) {
            verts.push(Point::new(xy[0], xy[1]));
        }
    }
    verts
}

/// Doubled signed area of triangle (a, b, c); positive when CCW.
pub fn triangle_area2(a: Point, b: Point, c: Point) -> Real {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Sum of signed triangle areas of the output.
pub fn output_signed_area(tri: &Triangulator, verts: &[Point]) -> Real {
    let mut total = 0.0;
    for t in tri.triangles() {
        let (a, b, c) = (
            verts[t[0] as usize],
            verts[t[1] as usize],
            verts[t[2] as usize],
        );
        total += 0.5 * triangle_area2(a, b, c);
    }
    total
}

/// Signed area of one contour given as flat [x0,y0,x1,y1,...].
pub fn polygon_signed_area(flat: &[Real]) -> Real {
    let n = flat.len() / 2;
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += flat[i * 2] * flat[j * 2 + 1];
        area -= flat[j * 2] * flat[i * 2 + 1];
    }
    area * 0.5
}

/// Net signed area of a polygon with holes (outer CCW positive, holes CW
/// negative, so the sum is the interior area).
pub fn region_signed_area(contours: &[&[Real]]) -> Real {
    contours.iter().map(|c| polygon_signed_area(c)).sum()
}

/// Indices in range, every vertex used, all triangles CCW and finite.
pub fn verify_valid_output(tri: &Triangulator, contours: &[&[Real]]) {
    let verts = vertex_table(contours);
    let n = verts.len() - 1;
    assert_eq!(tri.vertex_count(), n);

    let mut used = vec![false; n + 1];
    for (i, t) in tri.triangles().iter().enumerate() {
        for &v in t {
            assert!(
                v >= 1 && v as usize <= n,
                "triangle {} index {} out of range 1..={}",
                i,
                v,
                n
            );
            used[v as usize] = true;
        }
        let (a, b, c) = (
            verts[t[0] as usize],
            verts[t[1] as usize],
            verts[t[2] as usize],
        );
        for p in [a, b, c] {
            assert!(p.x.is_finite() && p.y.is_finite());
        }
        assert!(
            triangle_area2(a, b, c) > 0.0,
            "triangle {} ({:?}) is not CCW",
            i,
            t
        );
    }
    for v in 1..=n {
        assert!(used[v], "vertex {} appears in no triangle", v);
    }
}

/// Inclusive point-in-triangle test with a small tolerance.
pub fn point_in_triangle(p: Point, a: Point, b: Point, c: Point, eps: Real) -> bool {
    let d1 = triangle_area2(p, a, b);
    let d2 = triangle_area2(p, b, c);
    let d3 = triangle_area2(p, c, a);
    let has_neg = d1 < -eps || d2 < -eps || d3 < -eps;
    let has_pos = d1 > eps || d2 > eps || d3 > eps;
    !(has_neg && has_pos)
}

/// How many output triangles contain `p`.
pub fn triangles_containing(tri: &Triangulator, verts: &[Point], p: Point, eps: Real) -> usize {
    tri.triangles()
        .iter()
        .filter(|t| {
            point_in_triangle(
                p,
                verts[t[0] as usize],
                verts[t[1] as usize],
                verts[t[2] as usize],
                eps,
            )
        })
        .count()
}

/// Even-odd ray-cast point-in-polygon over all contours (interior of the
/// region with holes). Not robust on the boundary; callers sample with a
/// margin.
pub fn point_in_region(contours: &[&[Real]], p: Point) -> bool {
    let mut inside = false;
    for c in contours {
        let n = c.len() / 2;
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = (c[i * 2], c[i * 2 + 1]);
            let (xj, yj) = (c[j * 2], c[j * 2 + 1]);
            if (yi > p.y) != (yj > p.y) && p.x < (xj - xi) * (p.y - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
    }
    inside
}
