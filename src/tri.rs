// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Public API: the Triangulator session and its driver.
//
// One Triangulator owns every working table for a run (segments, trapezoids,
// query DAG, mono-chains), so independent instances can run on separate
// threads. The pipeline is ingest -> trapezoidate -> monotonate ->
// triangulate-monotones; all failures surface here as TriangulateError and
// no partial output survives an error.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use crate::geom::{Point, Real, C_EPS};
use crate::monotone::monotonate_trapezoids;
use crate::seg::{SegOrder, SegTable};
use crate::trap::construct_trapezoids;

#[cfg(test)]
mod tests;

/// Default RNG seed for the segment insertion order.
pub const DEFAULT_SEED: u64 = 0x5e1de1;

#[derive(Debug, Error)]
pub enum TriangulateError {
    /// A working table hit its derived size bound.
    #[error("{table} table overflow (limit {limit}) at {segments} segments")]
    CapacityExceeded {
        table: &'static str,
        limit: usize,
        segments: usize,
    },
    /// The input shape is unusable: no contours, a contour with fewer than
    /// three vertices, or more segments than the session allows.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Consecutive vertices coincide within the session tolerance.
    #[error("degenerate contour: {0}")]
    DegenerateContour(String),
    /// A structural invariant was violated mid-run. Indicates a bug or
    /// self-intersecting input (which is undefined behavior).
    #[error("internal inconsistency: {0}")]
    InternalError(&'static str),
}

/// Polygon triangulation session.
///
/// Feed one outer contour (counter-clockwise) and any holes (clockwise)
/// with [`add_contour`](Self::add_contour), then call
/// [`triangulate`](Self::triangulate). Output triangles reference input
/// vertices by 1-based index, counting across contours in input order.
///
/// ```
/// use seidel_rust::Triangulator;
///
/// let mut tri = Triangulator::new();
/// tri.add_contour(&[0.0, 0.0, 4.0, 0.0, 4.0, 4.0, 0.0, 4.0]);
/// let count = tri.triangulate().unwrap();
/// assert_eq!(count, 2);
/// ```
pub struct Triangulator {
    contours: Vec<Vec<Point>>,
    epsilon: Real,
    seed: u64,
    entropy: bool,
    max_segments: usize,
    triangles: Vec<[i32; 3]>,
    vertex_count: usize,
}

impl Default for Triangulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Triangulator {
    pub fn new() -> Self {
        Triangulator {
            contours: Vec::new(),
            epsilon: C_EPS,
            seed: DEFAULT_SEED,
            entropy: false,
            max_segments: 10_000,
            triangles: Vec::new(),
            vertex_count: 0,
        }
    }

    /// Add one contour as flat x,y pairs. The first contour is the outer
    /// boundary (CCW); later ones are holes (CW). Do not repeat the first
    /// vertex at the end.
    pub fn add_contour(&mut self, vertices: &[Real]) {
        debug_assert!(vertices.len() % 2 == 0, "odd coordinate count");
        let pts = vertices
            .chunks_exact(2)
            .map(|c| Point::new(c[0], c[1]))
            .collect();
        self.contours.push(pts);
    }

    /// Fix the RNG seed (the default is already fixed, for reproducibility).
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
        self.entropy = false;
    }

    /// Draw the insertion order from OS entropy instead of a fixed seed.
    pub fn seed_from_entropy(&mut self) {
        self.entropy = true;
    }

    /// Comparison tolerance for all geometric predicates.
    pub fn set_epsilon(&mut self, epsilon: Real) {
        self.epsilon = epsilon;
    }

    /// Upper bound on the total segment count; the trapezoid and query
    /// tables are sized per run from the actual count.
    pub fn set_max_segments(&mut self, max: usize) {
        self.max_segments = max;
    }

    /// Drop contours and output so the session can be reused.
    pub fn clear(&mut self) {
        self.contours.clear();
        self.triangles.clear();
        self.vertex_count = 0;
    }

    /// Run the full pipeline. Returns the triangle count, which is
    /// `n + 2 * (k - 1) - 2` for valid input with `n` total vertices and
    /// `k` contours (so `n - 2` for a simple polygon without holes).
    pub fn triangulate(&mut self) -> Result<usize, TriangulateError> {
        self.triangles.clear();
        self.vertex_count = 0;

        let mut st = SegTable::from_contours(&self.contours, self.epsilon)?;
        let n = st.count();
        if n > self.max_segments {
            return Err(TriangulateError::InvalidInput(format!(
                "{} segments exceed the session limit of {}",
                n, self.max_segments
            )));
        }

        let mut rng = if self.entropy {
            ChaCha8Rng::from_entropy()
        } else {
            ChaCha8Rng::seed_from_u64(self.seed)
        };
        let mut order = SegOrder::new(n, &mut rng);

        let tm = construct_trapezoids(&mut st, &mut order, self.epsilon)?;
        let mut mc = monotonate_trapezoids(&st, &tm, self.epsilon)?;

        let mut op = Vec::with_capacity(n);
        mc.triangulate_monotone_polygons(n, &mut op)?;

        self.vertex_count = n;
        self.triangles = op;
        Ok(self.triangles.len())
    }

    // ─────── Accessors ────────────────────────────────────────────────────

    /// Output triangles as 1-based input vertex indices, CCW.
    pub fn triangles(&self) -> &[[i32; 3]] {
        &self.triangles
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Total input vertex count of the last run.
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Flat 0-based index buffer (three entries per triangle), ready for
    /// mesh upload against the concatenated input vertices.
    pub fn elements(&self) -> Vec<u32> {
        self.triangles
            .iter()
            .flat_map(|t| t.iter().map(|&v| (v - 1) as u32))
            .collect()
    }
}
