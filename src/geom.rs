// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Geometric predicates for the trapezoidation core.
//
// Every above/below and left/right decision in the crate goes through these
// functions so that ties are broken the same way everywhere. Ordering is
// lexicographic with y dominant: two points within `eps` in y are ordered by
// x. The x tie-break is deliberately exact (no eps) so that a vertex never
// compares equal to a distinct vertex on the same horizontal.

pub type Real = f64;

/// Default comparison tolerance. Tune per coordinate scale via
/// [`Triangulator::set_epsilon`](crate::Triangulator::set_epsilon).
pub const C_EPS: Real = 1.0e-7;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: Real,
    pub y: Real,
}

impl Point {
    #[inline]
    pub fn new(x: Real, y: Real) -> Self {
        Point { x, y }
    }
}

#[inline]
pub fn fp_equal(s: Real, t: Real, eps: Real) -> bool {
    (s - t).abs() <= eps
}

/// v0 strictly after v1 in the sweep order (higher y, then larger x).
#[inline]
pub fn greater_than(v0: Point, v1: Point, eps: Real) -> bool {
    if v0.y > v1.y + eps {
        true
    } else if v0.y < v1.y - eps {
        false
    } else {
        v0.x > v1.x
    }
}

#[inline]
pub fn equal_to(v0: Point, v1: Point, eps: Real) -> bool {
    fp_equal(v0.y, v1.y, eps) && fp_equal(v0.x, v1.x, eps)
}

#[inline]
pub fn greater_than_equal_to(v0: Point, v1: Point, eps: Real) -> bool {
    if v0.y > v1.y + eps {
        true
    } else if v0.y < v1.y - eps {
        false
    } else {
        v0.x >= v1.x
    }
}

#[inline]
pub fn less_than(v0: Point, v1: Point, eps: Real) -> bool {
    if v0.y < v1.y - eps {
        true
    } else if v0.y > v1.y + eps {
        false
    } else {
        v0.x < v1.x
    }
}

/// The higher of two points in the sweep order. The x tie-break here keeps
/// `eps` slack on the x comparison, matching the ordering used when a
/// horizontal through a vertex is first recorded.
pub fn pt_max(v0: Point, v1: Point, eps: Real) -> Point {
    if v0.y > v1.y + eps {
        v0
    } else if fp_equal(v0.y, v1.y, eps) {
        if v0.x > v1.x + eps {
            v0
        } else {
            v1
        }
    } else {
        v1
    }
}

/// The lower of two points in the sweep order.
pub fn pt_min(v0: Point, v1: Point, eps: Real) -> Point {
    if v0.y < v1.y - eps {
        v0
    } else if fp_equal(v0.y, v1.y, eps) {
        if v0.x < v1.x {
            v0
        } else {
            v1
        }
    } else {
        v1
    }
}

/// 2D cross product of (v1 - v0) and (v2 - v0). Positive when the three
/// points wind counter-clockwise.
#[inline]
pub fn cross(v0: Point, v1: Point, v2: Point) -> Real {
    (v1.x - v0.x) * (v2.y - v0.y) - (v1.y - v0.y) * (v2.x - v0.x)
}

#[inline]
pub fn dot(v0: Point, v1: Point) -> Real {
    v0.x * v1.x + v0.y * v1.y
}

#[inline]
pub fn cross_sine(v0: Point, v1: Point) -> Real {
    v0.x * v1.y - v1.x * v0.y
}

#[inline]
pub fn length(v: Point) -> Real {
    (v.x * v.x + v.y * v.y).sqrt()
}

/// Returns true if `v` lies to the left of the segment (s0, s1), oriented
/// from its lower endpoint to its upper endpoint.
///
/// When `v` grazes an endpoint's horizontal (same y within `eps`), the test
/// degenerates to an x comparison against that endpoint, so a point exactly
/// level with an endpoint counts as left iff it is to the west of it.
pub fn is_left_of(s0: Point, s1: Point, v: Point, eps: Real) -> bool {
    let area = if greater_than(s1, s0, eps) {
        // segment going upwards
        if fp_equal(s1.y, v.y, eps) {
            if v.x < s1.x {
                1.0
            } else {
                -1.0
            }
        } else if fp_equal(s0.y, v.y, eps) {
            if v.x < s0.x {
                1.0
            } else {
                -1.0
            }
        } else {
            cross(s0, s1, v)
        }
    } else {
        if fp_equal(s1.y, v.y, eps) {
            if v.x < s1.x {
                1.0
            } else {
                -1.0
            }
        } else if fp_equal(s0.y, v.y, eps) {
            if v.x < s0.x {
                1.0
            } else {
                -1.0
            }
        } else {
            cross(s1, s0, v)
        }
    };
    area > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: Real, y: Real) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn ordering_y_dominant() {
        assert!(greater_than(p(0.0, 1.0), p(5.0, 0.0), C_EPS));
        assert!(less_than(p(5.0, 0.0), p(0.0, 1.0), C_EPS));
        assert!(!greater_than(p(0.0, 0.0), p(0.0, 0.0), C_EPS));
    }

    #[test]
    fn ordering_x_tiebreak() {
        // Same y within eps: larger x wins.
        assert!(greater_than(p(2.0, 0.0), p(1.0, 0.0), C_EPS));
        assert!(greater_than(p(2.0, 1e-9), p(1.0, 0.0), C_EPS));
        assert!(less_than(p(1.0, 0.0), p(2.0, 0.0), C_EPS));
    }

    #[test]
    fn equal_within_eps() {
        assert!(equal_to(p(1.0, 1.0), p(1.0 + 1e-9, 1.0 - 1e-9), C_EPS));
        assert!(!equal_to(p(1.0, 1.0), p(1.1, 1.0), C_EPS));
    }

    #[test]
    fn geq_is_reflexive() {
        assert!(greater_than_equal_to(p(3.0, 2.0), p(3.0, 2.0), C_EPS));
    }

    #[test]
    fn max_min_pick_sweep_extremes() {
        let a = p(0.0, 0.0);
        let b = p(1.0, 1.0);
        assert_eq!(pt_max(a, b, C_EPS), b);
        assert_eq!(pt_min(a, b, C_EPS), a);
        // Horizontal pair: ordered by x.
        let c = p(2.0, 0.0);
        assert_eq!(pt_max(a, c, C_EPS), c);
        assert_eq!(pt_min(a, c, C_EPS), a);
    }

    #[test]
    fn cross_sign_matches_winding() {
        assert!(cross(p(0.0, 0.0), p(1.0, 0.0), p(0.0, 1.0)) > 0.0);
        assert!(cross(p(0.0, 0.0), p(0.0, 1.0), p(1.0, 0.0)) < 0.0);
        assert_eq!(cross(p(0.0, 0.0), p(1.0, 1.0), p(2.0, 2.0)), 0.0);
    }

    #[test]
    fn left_of_upward_segment() {
        // Segment from (0,0) up to (0,2).
        assert!(is_left_of(p(0.0, 0.0), p(0.0, 2.0), p(-1.0, 1.0), C_EPS));
        assert!(!is_left_of(p(0.0, 0.0), p(0.0, 2.0), p(1.0, 1.0), C_EPS));
        // Stored downward: same oriented answer.
        assert!(is_left_of(p(0.0, 2.0), p(0.0, 0.0), p(-1.0, 1.0), C_EPS));
    }

    #[test]
    fn left_of_endpoint_graze() {
        // v level with the upper endpoint: pure x comparison.
        assert!(is_left_of(p(0.0, 0.0), p(1.0, 2.0), p(0.5, 2.0), C_EPS));
        assert!(!is_left_of(p(0.0, 0.0), p(1.0, 2.0), p(1.5, 2.0), C_EPS));
    }
}
