// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Segment table: contour ingest, random insertion order, round schedule math.
//
// Indices into the table are 1-based i32 (slot 0 unused); zero or negative
// means "none". Each contour forms a closed cyclic chain through prev/next,
// with seg[i].v1 == seg[seg[i].next].v0.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::geom::{equal_to, Point, Real};
use crate::trap::NodeIdx;
use crate::tri::TriangulateError;

/// Index into [`SegTable::segs`]; <= 0 means none.
pub type SegIdx = i32;

/// Which endpoint of a segment, in contour order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    First,
    Last,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Segment {
    /// Endpoints along the contour traversal direction.
    pub v0: Point,
    pub v1: Point,
    /// Already threaded into the trapezoidation?
    pub is_inserted: bool,
    /// Cached query-DAG nodes to start locating v0/v1 from.
    pub root0: NodeIdx,
    pub root1: NodeIdx,
    /// Cyclic contour linkage.
    pub next: SegIdx,
    pub prev: SegIdx,
}

/// All input segments for one run, flattened across contours.
pub struct SegTable {
    pub segs: Vec<Segment>,
}

impl SegTable {
    /// Flatten the contours into one 1-based table of cyclic chains.
    ///
    /// The caller supplies the outer contour first (CCW) and holes after it
    /// (CW). Rejects empty input, contours with fewer than three vertices,
    /// and consecutive vertices that coincide within `eps` (including the
    /// closing edge of each contour).
    pub fn from_contours(contours: &[Vec<Point>], eps: Real) -> Result<SegTable, TriangulateError> {
        if contours.is_empty() {
            return Err(TriangulateError::InvalidInput(
                "at least one contour is required".into(),
            ));
        }
        for (c, contour) in contours.iter().enumerate() {
            if contour.len() < 3 {
                return Err(TriangulateError::InvalidInput(format!(
                    "contour {} has {} vertices, need at least 3",
                    c,
                    contour.len()
                )));
            }
        }

        let n: usize = contours.iter().map(|c| c.len()).sum();
        let mut segs = vec![Segment::default(); n + 1];

        let mut i = 1usize;
        for contour in contours {
            let first = i;
            let last = first + contour.len() - 1;
            for &pt in contour {
                segs[i].v0 = pt;
                if i == last {
                    segs[i].next = first as SegIdx;
                    segs[i].prev = (i - 1) as SegIdx;
                    segs[i - 1].v1 = pt;
                    segs[i].v1 = segs[first].v0;
                } else {
                    segs[i].next = (i + 1) as SegIdx;
                    segs[i].prev = (if i == first { last } else { i - 1 }) as SegIdx;
                    if i > first {
                        segs[i - 1].v1 = pt;
                    }
                }
                segs[i].is_inserted = false;
                i += 1;
            }
        }

        for i in 1..=n {
            if equal_to(segs[i].v0, segs[i].v1, eps) {
                return Err(TriangulateError::DegenerateContour(format!(
                    "segment {} has coincident endpoints ({}, {})",
                    i, segs[i].v0.x, segs[i].v0.y
                )));
            }
        }

        Ok(SegTable { segs })
    }

    /// Number of segments (the table is 1-based).
    #[inline]
    pub fn count(&self) -> usize {
        self.segs.len() - 1
    }

    /// Whether the given endpoint of `segnum` is already present in the
    /// trapezoidation, via the insertion flag of the contour neighbor that
    /// shares it.
    #[inline]
    pub fn endpoint_inserted(&self, segnum: SegIdx, which: Endpoint) -> bool {
        let s = &self.segs[segnum as usize];
        match which {
            Endpoint::First => self.segs[s.prev as usize].is_inserted,
            Endpoint::Last => self.segs[s.next as usize].is_inserted,
        }
    }
}

/// Random insertion order over segments 1..=n (Knuth shuffle).
pub struct SegOrder {
    permute: Vec<SegIdx>,
    choose_idx: usize,
}

impl SegOrder {
    pub fn new<R: Rng>(n: usize, rng: &mut R) -> Self {
        let mut permute: Vec<SegIdx> = (1..=n as SegIdx).collect();
        permute.shuffle(rng);
        SegOrder {
            permute,
            choose_idx: 0,
        }
    }

    /// Next segment in the generated random ordering.
    #[inline]
    pub fn next(&mut self) -> SegIdx {
        let s = self.permute[self.choose_idx];
        self.choose_idx += 1;
        s
    }
}

/// Iterated logarithm: the number of times log2 can be applied to `n`
/// before the value drops below 1.
pub fn math_logstar_n(n: usize) -> usize {
    let mut i = 0usize;
    let mut v = n as Real;
    while v >= 1.0 {
        v = v.log2();
        i += 1;
    }
    i - 1
}

/// N(n, h) = ceil(n / log^(h) n): the segment count threshold for round `h`
/// of Seidel's insertion schedule.
pub fn math_n(n: usize, h: usize) -> usize {
    let mut v = n as Real;
    for _ in 0..h {
        v = v.log2();
    }
    (n as Real / v).ceil() as usize
}
