// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Trapezoidal map + query DAG.
//
// The trapezoid table and the search DAG are updated in lockstep by every
// operation (each split converts a SINK in place and hangs two new sinks off
// it), so both structures live in this module and share one state struct.
//
// The map partitions the plane into cells bounded above/below by horizontals
// through segment endpoints and left/right by input segments (or infinity).
// Segments are threaded one at a time in random order; point location walks
// the DAG from a cached root. All cross-references are 1-based i32 indices
// into the two arenas; <= 0 means none.

use crate::geom::{
    equal_to, fp_equal, greater_than, greater_than_equal_to, is_left_of as geom_is_left_of,
    less_than, pt_max, pt_min, Point, Real,
};
use crate::seg::{math_logstar_n, math_n, Endpoint, SegIdx, SegOrder, SegTable};
use crate::tri::TriangulateError;

/// Index into [`TrapMap::tr`]; <= 0 means none.
pub type TrapIdx = i32;
/// Index into [`TrapMap::qs`]; <= 0 means none.
pub type NodeIdx = i32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    X,
    Y,
    Sink,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrapState {
    Valid,
    Invalid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// One node of the query DAG.
#[derive(Clone, Copy, Debug)]
pub struct Node {
    pub kind: NodeKind,
    /// Separating segment (X nodes).
    pub segnum: SegIdx,
    /// Separating horizontal (Y nodes).
    pub yval: Point,
    /// Trapezoid this sink represents (SINK nodes).
    pub trnum: TrapIdx,
    /// One parent used for sink redirection during merges; the DAG may have
    /// more after sinks are shared.
    pub parent: NodeIdx,
    pub left: NodeIdx,
    pub right: NodeIdx,
}

impl Default for Node {
    fn default() -> Self {
        Node {
            kind: NodeKind::Sink,
            segnum: 0,
            yval: Point::default(),
            trnum: 0,
            parent: 0,
            left: 0,
            right: 0,
        }
    }
}

/// One cell of the trapezoidal map.
#[derive(Clone, Copy, Debug)]
pub struct Trapezoid {
    /// Bounding segments left/right; <= 0 when open to infinity.
    pub lseg: SegIdx,
    pub rseg: SegIdx,
    /// Bounding horizontals, carrying the defining vertex for tie-breaks.
    pub hi: Point,
    pub lo: Point,
    /// Up to two neighbors above and below.
    pub u0: TrapIdx,
    pub u1: TrapIdx,
    pub d0: TrapIdx,
    pub d1: TrapIdx,
    /// Sink node in the DAG pointing at this trapezoid.
    pub sink: NodeIdx,
    /// Pending third upper neighbor while a chain of splits passes through,
    /// and which side of the splitting segment it lies on.
    pub usave: TrapIdx,
    pub uside: Side,
    pub state: TrapState,
}

impl Default for Trapezoid {
    fn default() -> Self {
        Trapezoid {
            lseg: -1,
            rseg: -1,
            hi: Point::default(),
            lo: Point::default(),
            u0: 0,
            u1: 0,
            d0: 0,
            d1: 0,
            sink: 0,
            usave: 0,
            uside: Side::Left,
            state: TrapState::Invalid,
        }
    }
}

/// The trapezoidal map and its search DAG for one run.
pub struct TrapMap {
    pub qs: Vec<Node>,
    pub tr: Vec<Trapezoid>,
    q_idx: usize,
    tr_idx: usize,
    nseg: usize,
    eps: Real,
}

impl TrapMap {
    /// Arenas are sized once from the segment count: 8n query nodes and 4n
    /// trapezoids (ratios of the classic table bounds), with slot 0 reserved
    /// as the null index.
    fn new(nseg: usize, eps: Real) -> Self {
        TrapMap {
            qs: vec![Node::default(); 8 * nseg + 8],
            tr: vec![Trapezoid::default(); 4 * nseg + 8],
            q_idx: 1,
            tr_idx: 1,
            nseg,
            eps,
        }
    }

    /// One past the last allocated trapezoid index.
    #[inline]
    pub fn trap_limit(&self) -> usize {
        self.tr_idx
    }

    fn newnode(&mut self) -> Result<NodeIdx, TriangulateError> {
        if self.q_idx < self.qs.len() {
            let i = self.q_idx;
            self.q_idx += 1;
            Ok(i as NodeIdx)
        } else {
            Err(TriangulateError::CapacityExceeded {
                table: "query",
                limit: self.qs.len(),
                segments: self.nseg,
            })
        }
    }

    fn newtrap(&mut self) -> Result<TrapIdx, TriangulateError> {
        if self.tr_idx < self.tr.len() {
            let i = self.tr_idx;
            self.tr_idx += 1;
            self.tr[i] = Trapezoid {
                state: TrapState::Valid,
                ..Trapezoid::default()
            };
            Ok(i as TrapIdx)
        } else {
            Err(TriangulateError::CapacityExceeded {
                table: "trapezoid",
                limit: self.tr.len(),
                segments: self.nseg,
            })
        }
    }

    #[inline]
    fn is_left_of(&self, st: &SegTable, segnum: SegIdx, v: Point) -> bool {
        let s = &st.segs[segnum as usize];
        geom_is_left_of(s.v0, s.v1, v, self.eps)
    }

    /// Build the initial map from the first segment: four trapezoids (above,
    /// left, right, below) and the seven-node DAG over them.
    fn init_query_structure(
        &mut self,
        st: &mut SegTable,
        segnum: SegIdx,
    ) -> Result<NodeIdx, TriangulateError> {
        let eps = self.eps;
        let s = st.segs[segnum as usize];

        let i1 = self.newnode()?;
        self.qs[i1 as usize].kind = NodeKind::Y;
        self.qs[i1 as usize].yval = pt_max(s.v0, s.v1, eps);
        let root = i1;

        let i2 = self.newnode()?;
        self.qs[i1 as usize].right = i2;
        self.qs[i2 as usize].kind = NodeKind::Sink;
        self.qs[i2 as usize].parent = i1;

        let i3 = self.newnode()?;
        self.qs[i1 as usize].left = i3;
        self.qs[i3 as usize].kind = NodeKind::Y;
        self.qs[i3 as usize].yval = pt_min(s.v0, s.v1, eps);
        self.qs[i3 as usize].parent = i1;

        let i4 = self.newnode()?;
        self.qs[i3 as usize].left = i4;
        self.qs[i4 as usize].kind = NodeKind::Sink;
        self.qs[i4 as usize].parent = i3;

        let i5 = self.newnode()?;
        self.qs[i3 as usize].right = i5;
        self.qs[i5 as usize].kind = NodeKind::X;
        self.qs[i5 as usize].segnum = segnum;
        self.qs[i5 as usize].parent = i3;

        let i6 = self.newnode()?;
        self.qs[i5 as usize].left = i6;
        self.qs[i6 as usize].kind = NodeKind::Sink;
        self.qs[i6 as usize].parent = i5;

        let i7 = self.newnode()?;
        self.qs[i5 as usize].right = i7;
        self.qs[i7 as usize].kind = NodeKind::Sink;
        self.qs[i7 as usize].parent = i5;

        let t1 = self.newtrap()?; // middle left
        let t2 = self.newtrap()?; // middle right
        let t3 = self.newtrap()?; // bottommost
        let t4 = self.newtrap()?; // topmost

        let hi = self.qs[i1 as usize].yval;
        let lo = self.qs[i3 as usize].yval;
        self.tr[t1 as usize].hi = hi;
        self.tr[t2 as usize].hi = hi;
        self.tr[t4 as usize].lo = hi;
        self.tr[t1 as usize].lo = lo;
        self.tr[t2 as usize].lo = lo;
        self.tr[t3 as usize].hi = lo;
        self.tr[t4 as usize].hi = Point::new(Real::INFINITY, Real::INFINITY);
        self.tr[t3 as usize].lo = Point::new(Real::NEG_INFINITY, Real::NEG_INFINITY);

        self.tr[t1 as usize].rseg = segnum;
        self.tr[t2 as usize].lseg = segnum;
        self.tr[t1 as usize].u0 = t4;
        self.tr[t2 as usize].u0 = t4;
        self.tr[t1 as usize].d0 = t3;
        self.tr[t2 as usize].d0 = t3;
        self.tr[t4 as usize].d0 = t1;
        self.tr[t4 as usize].d1 = t2;
        self.tr[t3 as usize].u0 = t1;
        self.tr[t3 as usize].u1 = t2;

        self.tr[t1 as usize].sink = i6;
        self.tr[t2 as usize].sink = i7;
        self.tr[t3 as usize].sink = i4;
        self.tr[t4 as usize].sink = i2;

        self.qs[i2 as usize].trnum = t4;
        self.qs[i4 as usize].trnum = t3;
        self.qs[i6 as usize].trnum = t1;
        self.qs[i7 as usize].trnum = t2;

        st.segs[segnum as usize].is_inserted = true;
        Ok(root)
    }

    /// Locate the trapezoid containing `v`, starting the DAG walk at `root`.
    ///
    /// `vo` is the other endpoint of the segment being located: when `v`
    /// sits exactly on a Y separator (a vertex already in the map) or is an
    /// endpoint of an X separator, the walk descends toward `vo`'s side so
    /// that the two halves of a segment pair route consistently.
    pub fn locate_endpoint(&self, st: &SegTable, v: Point, vo: Point, root: NodeIdx) -> TrapIdx {
        let eps = self.eps;
        let mut r = root;
        loop {
            let node = self.qs[r as usize];
            match node.kind {
                NodeKind::Sink => return node.trnum,
                NodeKind::Y => {
                    r = if greater_than(v, node.yval, eps) {
                        node.right
                    } else if equal_to(v, node.yval, eps) {
                        // v is a known vertex: direct by the far endpoint.
                        if greater_than(vo, node.yval, eps) {
                            node.right
                        } else {
                            node.left
                        }
                    } else {
                        node.left
                    };
                }
                NodeKind::X => {
                    let s = st.segs[node.segnum as usize];
                    r = if equal_to(v, s.v0, eps) || equal_to(v, s.v1, eps) {
                        if fp_equal(v.y, vo.y, eps) {
                            // horizontal segment through a shared endpoint
                            if vo.x < v.x {
                                node.left
                            } else {
                                node.right
                            }
                        } else if self.is_left_of(st, node.segnum, vo) {
                            node.left
                        } else {
                            node.right
                        }
                    } else if self.is_left_of(st, node.segnum, v) {
                        node.left
                    } else {
                        node.right
                    };
                }
            }
        }
    }

    /// Split the trapezoid containing vertex `v` horizontally at `v`,
    /// returning the new lower piece. Converts the old sink into a Y node.
    fn split_at_vertex(
        &mut self,
        st: &SegTable,
        v: Point,
        vo: Point,
        root: NodeIdx,
        segnum: SegIdx,
    ) -> Result<(TrapIdx, TrapIdx), TriangulateError> {
        let tu = self.locate_endpoint(st, v, vo, root);
        let tl = self.newtrap()?;
        self.tr[tl as usize] = self.tr[tu as usize];
        self.tr[tu as usize].lo = v;
        self.tr[tl as usize].hi = v;
        self.tr[tu as usize].d0 = tl;
        self.tr[tu as usize].d1 = 0;
        self.tr[tl as usize].u0 = tu;
        self.tr[tl as usize].u1 = 0;

        // The old lower neighbors now hang off the new lower piece.
        let tmp_d = self.tr[tl as usize].d0;
        if tmp_d > 0 && self.tr[tmp_d as usize].u0 == tu {
            self.tr[tmp_d as usize].u0 = tl;
        }
        if tmp_d > 0 && self.tr[tmp_d as usize].u1 == tu {
            self.tr[tmp_d as usize].u1 = tl;
        }
        let tmp_d = self.tr[tl as usize].d1;
        if tmp_d > 0 && self.tr[tmp_d as usize].u0 == tu {
            self.tr[tmp_d as usize].u0 = tl;
        }
        if tmp_d > 0 && self.tr[tmp_d as usize].u1 == tu {
            self.tr[tmp_d as usize].u1 = tl;
        }

        let i1 = self.newnode()?;
        let i2 = self.newnode()?;
        let sk = self.tr[tu as usize].sink;

        self.qs[sk as usize].kind = NodeKind::Y;
        self.qs[sk as usize].yval = v;
        self.qs[sk as usize].segnum = segnum;
        self.qs[sk as usize].left = i2;
        self.qs[sk as usize].right = i1;

        self.qs[i1 as usize].kind = NodeKind::Sink;
        self.qs[i1 as usize].trnum = tu;
        self.qs[i1 as usize].parent = sk;

        self.qs[i2 as usize].kind = NodeKind::Sink;
        self.qs[i2 as usize].trnum = tl;
        self.qs[i2 as usize].parent = sk;

        self.tr[tu as usize].sink = i1;
        self.tr[tl as usize].sink = i2;
        Ok((tu, tl))
    }

    /// Rewire the upper neighborhood of a freshly split pair (`t`, `tn`),
    /// where `t` keeps the left side of the threading segment and `tn` the
    /// right. `sv1` is the segment's lower endpoint (used to orient cusps).
    fn fix_upper_links(&mut self, st: &SegTable, t: TrapIdx, tn: TrapIdx, sv1: Point) {
        let tt = self.tr[t as usize];
        if tt.u0 > 0 && tt.u1 > 0 {
            // continuation of a chain from above
            if tt.usave > 0 {
                // three upper neighbors
                if tt.uside == Side::Left {
                    self.tr[tn as usize].u0 = tt.u1;
                    self.tr[t as usize].u1 = -1;
                    self.tr[tn as usize].u1 = tt.usave;

                    let u = self.tr[t as usize].u0;
                    self.tr[u as usize].d0 = t;
                    let u = self.tr[tn as usize].u0;
                    self.tr[u as usize].d0 = tn;
                    let u = self.tr[tn as usize].u1;
                    self.tr[u as usize].d0 = tn;
                } else {
                    // intersects on the right
                    self.tr[tn as usize].u1 = -1;
                    self.tr[tn as usize].u0 = tt.u1;
                    self.tr[t as usize].u1 = tt.u0;
                    self.tr[t as usize].u0 = tt.usave;

                    let u = self.tr[t as usize].u0;
                    self.tr[u as usize].d0 = t;
                    let u = self.tr[t as usize].u1;
                    self.tr[u as usize].d0 = t;
                    let u = self.tr[tn as usize].u0;
                    self.tr[u as usize].d0 = tn;
                }
                self.tr[t as usize].usave = 0;
                self.tr[tn as usize].usave = 0;
            } else {
                // no pending third neighbor: u1 moves to the right piece
                self.tr[tn as usize].u0 = tt.u1;
                self.tr[t as usize].u1 = -1;
                self.tr[tn as usize].u1 = -1;
                let u = self.tr[tn as usize].u0;
                self.tr[u as usize].d0 = tn;
            }
        } else {
            // fresh segment top or upward cusp
            let tmp_u = tt.u0;
            let (td0, td1) = if tmp_u > 0 {
                (self.tr[tmp_u as usize].d0, self.tr[tmp_u as usize].d1)
            } else {
                (0, 0)
            };
            if td0 > 0 && td1 > 0 {
                // upward cusp at the shared vertex
                if self.tr[td0 as usize].rseg > 0
                    && !self.is_left_of(st, self.tr[td0 as usize].rseg, sv1)
                {
                    self.tr[t as usize].u0 = -1;
                    self.tr[t as usize].u1 = -1;
                    self.tr[tn as usize].u1 = -1;
                    let u = self.tr[tn as usize].u0;
                    self.tr[u as usize].d1 = tn;
                } else {
                    // cusp going leftwards
                    self.tr[tn as usize].u0 = -1;
                    self.tr[tn as usize].u1 = -1;
                    self.tr[t as usize].u1 = -1;
                    let u = self.tr[t as usize].u0;
                    self.tr[u as usize].d0 = t;
                }
            } else if tmp_u > 0 {
                // fresh segment: both pieces hang under the sole neighbor
                self.tr[tmp_u as usize].d0 = t;
                self.tr[tmp_u as usize].d1 = tn;
            }
        }
    }

    /// Thread `segnum` through the map: split every trapezoid it crosses
    /// into a left and right piece, then merge vertically compatible pieces
    /// on each side.
    fn add_segment(&mut self, st: &mut SegTable, segnum: SegIdx) -> Result<(), TriangulateError> {
        let eps = self.eps;
        let mut s = st.segs[segnum as usize];
        let mut is_swapped = false;
        if greater_than(s.v1, s.v0, eps) {
            std::mem::swap(&mut s.v0, &mut s.v1);
            std::mem::swap(&mut s.root0, &mut s.root1);
            is_swapped = true;
        }

        // v0 (upper endpoint)
        let first_present = if is_swapped {
            st.endpoint_inserted(segnum, Endpoint::Last)
        } else {
            st.endpoint_inserted(segnum, Endpoint::First)
        };
        let tfirst = if !first_present {
            let (_tu, tl) = self.split_at_vertex(st, s.v0, s.v1, s.root0, segnum)?;
            tl
        } else {
            self.locate_endpoint(st, s.v0, s.v1, s.root0)
        };

        // v1 (lower endpoint)
        let last_present = if is_swapped {
            st.endpoint_inserted(segnum, Endpoint::First)
        } else {
            st.endpoint_inserted(segnum, Endpoint::Last)
        };
        let mut tribot = false;
        let tlast = if !last_present {
            let (tu, _tl) = self.split_at_vertex(st, s.v1, s.v0, s.root1, segnum)?;
            tu
        } else {
            tribot = true;
            self.locate_endpoint(st, s.v1, s.v0, s.root1)
        };

        // Walk top to bottom, splitting every crossed trapezoid into a left
        // piece (reusing t) and a right piece (tn), converting t's sink into
        // an X node as we go.
        let mut t = tfirst;
        let mut tfirstr: TrapIdx = 0;
        let mut tlastr: TrapIdx = 0;
        let tlast_lo = self.tr[tlast as usize].lo;

        while t > 0 && greater_than_equal_to(self.tr[t as usize].lo, tlast_lo, eps) {
            let sk = self.tr[t as usize].sink;
            let i1 = self.newnode()?;
            let i2 = self.newnode()?;

            self.qs[sk as usize].kind = NodeKind::X;
            self.qs[sk as usize].segnum = segnum;
            self.qs[sk as usize].left = i1;
            self.qs[sk as usize].right = i2;

            self.qs[i1 as usize].kind = NodeKind::Sink;
            self.qs[i1 as usize].trnum = t;
            self.qs[i1 as usize].parent = sk;

            let tn = self.newtrap()?;
            self.qs[i2 as usize].kind = NodeKind::Sink;
            self.qs[i2 as usize].trnum = tn;
            self.qs[i2 as usize].parent = sk;

            self.tr[tn as usize] = self.tr[t as usize];
            self.tr[t as usize].sink = i1;
            self.tr[tn as usize].sink = i2;

            if t == tfirst {
                tfirstr = tn;
            }
            if equal_to(self.tr[t as usize].lo, tlast_lo, eps) {
                tlastr = tn;
            }
            let t_sav = t;
            let tn_sav = tn;

            let d0 = self.tr[t as usize].d0;
            let d1 = self.tr[t as usize].d1;

            if d0 <= 0 && d1 <= 0 {
                return Err(TriangulateError::InternalError(
                    "mid-chain trapezoid with no lower neighbor",
                ));
            } else if d0 > 0 && d1 <= 0 {
                // one trapezoid below, hanging off d0
                self.fix_upper_links(st, t, tn, s.v1);

                if tribot && equal_to(self.tr[t as usize].lo, tlast_lo, eps) {
                    // bottom forms a triangle
                    let tri_seg = if is_swapped {
                        st.segs[segnum as usize].prev
                    } else {
                        st.segs[segnum as usize].next
                    };
                    if tri_seg > 0 && self.is_left_of(st, tri_seg, s.v0) {
                        // L-R downward cusp
                        let d = self.tr[t as usize].d0;
                        self.tr[d as usize].u0 = t;
                        self.tr[tn as usize].d0 = -1;
                        self.tr[tn as usize].d1 = -1;
                    } else {
                        // R-L downward cusp
                        let d = self.tr[tn as usize].d0;
                        self.tr[d as usize].u1 = tn;
                        self.tr[t as usize].d0 = -1;
                        self.tr[t as usize].d1 = -1;
                    }
                } else {
                    let d = self.tr[t as usize].d0;
                    if self.tr[d as usize].u0 > 0 && self.tr[d as usize].u1 > 0 {
                        // d picks up a third upper neighbor; stash it
                        if self.tr[d as usize].u0 == t {
                            self.tr[d as usize].usave = self.tr[d as usize].u1;
                            self.tr[d as usize].uside = Side::Left;
                        } else {
                            self.tr[d as usize].usave = self.tr[d as usize].u0;
                            self.tr[d as usize].uside = Side::Right;
                        }
                    }
                    self.tr[d as usize].u0 = t;
                    self.tr[d as usize].u1 = tn;
                }
                t = self.tr[t as usize].d0;
            } else if d0 <= 0 && d1 > 0 {
                // one trapezoid below, hanging off d1
                self.fix_upper_links(st, t, tn, s.v1);

                if tribot && equal_to(self.tr[t as usize].lo, tlast_lo, eps) {
                    let tri_seg = if is_swapped {
                        st.segs[segnum as usize].prev
                    } else {
                        st.segs[segnum as usize].next
                    };
                    if tri_seg > 0 && self.is_left_of(st, tri_seg, s.v0) {
                        // L-R downward cusp
                        let d = self.tr[t as usize].d1;
                        self.tr[d as usize].u0 = t;
                        self.tr[tn as usize].d0 = -1;
                        self.tr[tn as usize].d1 = -1;
                    } else {
                        // R-L downward cusp
                        let d = self.tr[tn as usize].d1;
                        self.tr[d as usize].u1 = tn;
                        self.tr[t as usize].d0 = -1;
                        self.tr[t as usize].d1 = -1;
                    }
                } else {
                    let d = self.tr[t as usize].d1;
                    if self.tr[d as usize].u0 > 0 && self.tr[d as usize].u1 > 0 {
                        if self.tr[d as usize].u0 == t {
                            self.tr[d as usize].usave = self.tr[d as usize].u1;
                            self.tr[d as usize].uside = Side::Left;
                        } else {
                            self.tr[d as usize].usave = self.tr[d as usize].u0;
                            self.tr[d as usize].uside = Side::Right;
                        }
                    }
                    self.tr[d as usize].u0 = t;
                    self.tr[d as usize].u1 = tn;
                }
                t = self.tr[t as usize].d1;
            } else {
                // two trapezoids below: pick the one the segment enters
                let lo = self.tr[t as usize].lo;
                let into_d0 = if fp_equal(lo.y, s.v0.y, eps) {
                    lo.x > s.v0.x
                } else {
                    // intersect the support line with the bottom horizontal
                    let yt = (lo.y - s.v0.y) / (s.v1.y - s.v0.y);
                    let xt = s.v0.x + yt * (s.v1.x - s.v0.x);
                    less_than(Point::new(xt, lo.y), lo, eps)
                };

                self.fix_upper_links(st, t, tn, s.v1);

                if tribot && equal_to(self.tr[t as usize].lo, tlast_lo, eps) {
                    // lowest trapezoid with the endpoint already present:
                    // the two lower cells split cleanly between t and tn
                    let d0 = self.tr[t as usize].d0;
                    self.tr[d0 as usize].u0 = t;
                    self.tr[d0 as usize].u1 = -1;
                    let d1 = self.tr[t as usize].d1;
                    self.tr[d1 as usize].u0 = tn;
                    self.tr[d1 as usize].u1 = -1;

                    self.tr[tn as usize].d0 = d1;
                    self.tr[t as usize].d1 = -1;
                    self.tr[tn as usize].d1 = -1;
                    t = -1; // bottom of the threaded span
                } else if into_d0 {
                    let d0 = self.tr[t as usize].d0;
                    self.tr[d0 as usize].u0 = t;
                    self.tr[d0 as usize].u1 = tn;
                    let d1 = self.tr[t as usize].d1;
                    self.tr[d1 as usize].u0 = tn;
                    self.tr[d1 as usize].u1 = -1;

                    self.tr[t as usize].d1 = -1;
                    t = d0;
                } else {
                    let d0 = self.tr[t as usize].d0;
                    self.tr[d0 as usize].u0 = t;
                    self.tr[d0 as usize].u1 = -1;
                    let d1 = self.tr[t as usize].d1;
                    self.tr[d1 as usize].u0 = t;
                    self.tr[d1 as usize].u1 = tn;

                    self.tr[tn as usize].d0 = d1;
                    self.tr[tn as usize].d1 = -1;
                    t = d1;
                }
            }

            self.tr[t_sav as usize].rseg = segnum;
            self.tr[tn_sav as usize].lseg = segnum;
        }

        // Merge vertically adjacent pieces bounded by the same segments.
        self.merge_trapezoids(segnum, tfirst, tlast, Side::Left);
        self.merge_trapezoids(segnum, tfirstr, tlastr, Side::Right);

        st.segs[segnum as usize].is_inserted = true;
        Ok(())
    }

    /// Walk from `tfirst` down to `tlast` on one side of the freshly
    /// threaded segment, fusing neighbor pairs that share both bounding
    /// segments. The lower cell's sink parent is redirected at the upper
    /// cell's sink and the lower cell is invalidated.
    fn merge_trapezoids(&mut self, segnum: SegIdx, tfirst: TrapIdx, tlast: TrapIdx, side: Side) {
        if tfirst <= 0 || tlast <= 0 {
            return;
        }
        let eps = self.eps;
        let tlast_lo = self.tr[tlast as usize].lo;
        let mut t = tfirst;
        while t > 0 && greater_than_equal_to(self.tr[t as usize].lo, tlast_lo, eps) {
            let mut tnext = self.tr[t as usize].d0;
            let mut cond = tnext > 0 && self.flanks(tnext, segnum, side);
            if !cond {
                tnext = self.tr[t as usize].d1;
                cond = tnext > 0 && self.flanks(tnext, segnum, side);
            }

            if cond
                && self.tr[t as usize].lseg == self.tr[tnext as usize].lseg
                && self.tr[t as usize].rseg == self.tr[tnext as usize].rseg
            {
                // same vertical strip: fuse tnext into t
                let ptnext = self.qs[self.tr[tnext as usize].sink as usize].parent;
                if self.qs[ptnext as usize].left == self.tr[tnext as usize].sink {
                    self.qs[ptnext as usize].left = self.tr[t as usize].sink;
                } else {
                    self.qs[ptnext as usize].right = self.tr[t as usize].sink;
                }

                let nd0 = self.tr[tnext as usize].d0;
                self.tr[t as usize].d0 = nd0;
                if nd0 > 0 {
                    if self.tr[nd0 as usize].u0 == tnext {
                        self.tr[nd0 as usize].u0 = t;
                    } else if self.tr[nd0 as usize].u1 == tnext {
                        self.tr[nd0 as usize].u1 = t;
                    }
                }
                let nd1 = self.tr[tnext as usize].d1;
                self.tr[t as usize].d1 = nd1;
                if nd1 > 0 {
                    if self.tr[nd1 as usize].u0 == tnext {
                        self.tr[nd1 as usize].u0 = t;
                    } else if self.tr[nd1 as usize].u1 == tnext {
                        self.tr[nd1 as usize].u1 = t;
                    }
                }

                self.tr[t as usize].lo = self.tr[tnext as usize].lo;
                self.tr[tnext as usize].state = TrapState::Invalid;
            } else {
                t = tnext;
            }
        }
    }

    /// Does `t` hang off the given side of the threading segment?
    #[inline]
    fn flanks(&self, t: TrapIdx, segnum: SegIdx, side: Side) -> bool {
        match side {
            Side::Left => self.tr[t as usize].rseg == segnum,
            Side::Right => self.tr[t as usize].lseg == segnum,
        }
    }

    /// Refresh the cached DAG roots for both endpoints of an uninserted
    /// segment, so the next location starts deep in the DAG.
    fn find_new_roots(&mut self, st: &mut SegTable, segnum: SegIdx) {
        let s = st.segs[segnum as usize];
        if s.is_inserted {
            return;
        }
        let t0 = self.locate_endpoint(st, s.v0, s.v1, s.root0);
        st.segs[segnum as usize].root0 = self.tr[t0 as usize].sink;
        let t1 = self.locate_endpoint(st, s.v1, s.v0, s.root1);
        st.segs[segnum as usize].root1 = self.tr[t1 as usize].sink;
    }
}

/// Build the full trapezoidation by inserting every segment in the given
/// random order, following Seidel's log* round schedule: after each round
/// the endpoint root caches of the remaining segments are refreshed.
pub fn construct_trapezoids(
    st: &mut SegTable,
    order: &mut SegOrder,
    eps: Real,
) -> Result<TrapMap, TriangulateError> {
    let nseg = st.count();
    let mut tm = TrapMap::new(nseg, eps);

    let root = tm.init_query_structure(st, order.next())?;
    for i in 1..=nseg {
        st.segs[i].root0 = root;
        st.segs[i].root1 = root;
    }

    let logstar = math_logstar_n(nseg);
    for h in 1..=logstar {
        for _ in (math_n(nseg, h - 1) + 1)..=math_n(nseg, h) {
            tm.add_segment(st, order.next())?;
        }
        for i in 1..=nseg {
            tm.find_new_roots(st, i as SegIdx);
        }
    }
    for _ in (math_n(nseg, logstar) + 1)..=nseg {
        tm.add_segment(st, order.next())?;
    }

    Ok(tm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::C_EPS;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn build(contours: &[Vec<Point>], seed: u64) -> (SegTable, TrapMap) {
        let mut st = SegTable::from_contours(contours, C_EPS).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut order = SegOrder::new(st.count(), &mut rng);
        let tm = construct_trapezoids(&mut st, &mut order, C_EPS).unwrap();
        (st, tm)
    }

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(0.0, 4.0),
        ]
    }

    #[test]
    fn interior_grid_locates_to_bounded_valid_traps() {
        let (st, tm) = build(&[square()], 1);
        for ix in 1..8 {
            for iy in 1..8 {
                let p = Point::new(ix as Real * 0.5, iy as Real * 0.5);
                let t = tm.locate_endpoint(&st, p, Point::new(p.x + 0.01, p.y + 0.01), 1);
                let tt = &tm.tr[t as usize];
                assert_eq!(tt.state, TrapState::Valid, "{:?} found invalid trap", p);
                assert!(
                    tt.lseg > 0 && tt.rseg > 0,
                    "{:?} located in a sideways-unbounded trap",
                    p
                );
            }
        }
    }

    #[test]
    fn interior_point_lands_in_bounded_trapezoid() {
        let (st, tm) = build(&[square()], 1);
        let c = Point::new(2.0, 2.0);
        let t = tm.locate_endpoint(&st, c, Point::new(2.1, 2.1), 1);
        let tt = &tm.tr[t as usize];
        assert_eq!(tt.state, TrapState::Valid);
        assert!(tt.lseg > 0 && tt.rseg > 0, "center must be segment-bounded");
        assert!(tt.hi.y >= 2.0 && tt.lo.y <= 2.0);
    }

    #[test]
    fn far_point_lands_in_unbounded_trapezoid() {
        let (st, tm) = build(&[square()], 1);
        let p = Point::new(2.0, 100.0);
        let t = tm.locate_endpoint(&st, p, Point::new(2.0, 101.0), 1);
        assert_eq!(tm.tr[t as usize].hi.y, Real::INFINITY);
    }

    #[test]
    fn all_segments_inserted() {
        let (st, _tm) = build(&[square()], 3);
        for i in 1..=st.count() {
            assert!(st.segs[i].is_inserted, "segment {} never threaded", i);
        }
    }

    #[test]
    fn valid_traps_have_consistent_bounds() {
        let pent: Vec<Point> = (0..5)
            .map(|i| {
                let a = 2.0 * std::f64::consts::PI * i as Real / 5.0 + 0.3;
                Point::new(a.cos() * 10.0, a.sin() * 10.0)
            })
            .collect();
        let (_st, tm) = build(&[pent], 7);
        for t in 1..tm.trap_limit() {
            let tt = &tm.tr[t];
            if tt.state != TrapState::Valid {
                continue;
            }
            assert!(
                tt.hi.y >= tt.lo.y,
                "trap {} upside down: hi {:?} lo {:?}",
                t,
                tt.hi,
                tt.lo
            );
        }
    }
}
