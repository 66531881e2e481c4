// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Monotone decomposition and triangulation.
//
// The trapezoid adjacency graph is walked once, emitting a diagonal wherever
// a trapezoid's cusp configuration calls for one; each diagonal splits a
// circularly linked "mono-chain" into two in O(1). A per-vertex hub with
// four slots tracks which chains pass through each vertex, since up to four
// monotone polygons can meet there. Each finished y-monotone chain is then
// triangulated by the greedy reflex-chain sweep (O'Rourke's corner cutting)
// in linear time.

use crate::geom::{
    cross, cross_sine, dot, equal_to, greater_than, length, less_than, Point, Real,
};
use crate::seg::SegTable;
use crate::trap::{TrapIdx, TrapMap, TrapState, Trapezoid};
use crate::tri::TriangulateError;

/// Index into [`MonotoneChains::mchain`]; <= 0 means none.
pub type ChainIdx = i32;

#[derive(Clone, Copy, Debug, Default)]
pub struct ChainNode {
    /// Input vertex (== segment index carrying it as v0).
    pub vnum: i32,
    pub next: ChainIdx,
    pub prev: ChainIdx,
    /// Consumed by the triangulator.
    pub marked: bool,
}

/// Per-input-vertex bookkeeping: the outgoing chains through this vertex.
/// `vnext[k]` is the next vertex along the k-th chain, `vpos[k]` this
/// vertex's chain node in it.
#[derive(Clone, Copy, Debug, Default)]
pub struct VertexHub {
    pub pt: Point,
    pub vnext: [i32; 4],
    pub vpos: [ChainIdx; 4],
    pub nextfree: usize,
}

/// Which boundary chain of a monotone polygon is a single edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SingleSide {
    Lhs,
    Rhs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Dir {
    FromUp,
    FromDn,
}

/// Chain state for one decomposition run.
pub struct MonotoneChains {
    pub mchain: Vec<ChainNode>,
    pub vert: Vec<VertexHub>,
    /// One representative chain node per monotone polygon.
    pub mon: Vec<ChainIdx>,
    visited: Vec<bool>,
    eps: Real,
}

/// True when the trapezoid lies inside the polygon and is triangular: both
/// sides are segments and one horizontal degenerates to a cusp, with the
/// right-bounding segment going upwards (interior on its left for CCW
/// outer / CW hole orientation).
fn inside_polygon(st: &SegTable, t: &Trapezoid, eps: Real) -> bool {
    if t.state == TrapState::Invalid {
        return false;
    }
    if t.lseg <= 0 || t.rseg <= 0 {
        return false;
    }
    if (t.u0 <= 0 && t.u1 <= 0) || (t.d0 <= 0 && t.d1 <= 0) {
        let r = &st.segs[t.rseg as usize];
        return greater_than(r.v1, r.v0, eps);
    }
    false
}

/// Monotone angle stand-in: folds the cosine into (-3, 1] so that the
/// widest counter-clockwise angle wins a plain numeric max.
fn get_angle(vp0: Point, vpnext: Point, vp1: Point) -> Real {
    let v0 = Point::new(vpnext.x - vp0.x, vpnext.y - vp0.y);
    let v1 = Point::new(vp1.x - vp0.x, vp1.y - vp0.y);
    if cross_sine(v0, v1) >= 0.0 {
        dot(v0, v1) / length(v0) / length(v1)
    } else {
        -dot(v0, v1) / length(v0) / length(v1) - 2.0
    }
}

/// Decompose the trapezoidated polygon into y-monotone chains.
pub fn monotonate_trapezoids(
    st: &SegTable,
    tm: &TrapMap,
    eps: Real,
) -> Result<MonotoneChains, TriangulateError> {
    let n = st.count();
    let mut mc = MonotoneChains {
        mchain: vec![ChainNode::default(); n + 1],
        vert: vec![VertexHub::default(); n + 1],
        mon: vec![1],
        visited: vec![false; tm.trap_limit()],
        eps,
    };

    // Each input vertex starts on exactly one chain: its contour.
    for i in 1..=n {
        mc.mchain[i].prev = st.segs[i].prev;
        mc.mchain[i].next = st.segs[i].next;
        mc.mchain[i].vnum = i as i32;
        mc.vert[i].pt = st.segs[i].v0;
        mc.vert[i].vnext[0] = st.segs[i].next;
        mc.vert[i].vpos[0] = i as ChainIdx;
        mc.vert[i].nextfree = 1;
    }

    // Start from any triangular interior trapezoid.
    let mut tr_start: TrapIdx = 0;
    for t in 1..tm.trap_limit() {
        if inside_polygon(st, &tm.tr[t], eps) {
            tr_start = t as TrapIdx;
            break;
        }
    }
    if tr_start == 0 {
        return Err(TriangulateError::InternalError(
            "no interior trapezoid found",
        ));
    }

    let start = &tm.tr[tr_start as usize];
    if start.u0 > 0 {
        mc.traverse(st, tm, 0, tr_start, start.u0, Dir::FromUp)?;
    } else if start.d0 > 0 {
        mc.traverse(st, tm, 0, tr_start, start.d0, Dir::FromDn)?;
    }

    Ok(mc)
}

impl MonotoneChains {
    fn new_chain_element(&mut self) -> ChainIdx {
        self.mchain.push(ChainNode::default());
        (self.mchain.len() - 1) as ChainIdx
    }

    /// Which chain slot at each endpoint the diagonal (v0, v1) belongs to:
    /// scan the outgoing chains and pick the one making the widest CCW
    /// angle with the diagonal.
    fn get_vertex_positions(&self, v0: i32, v1: i32) -> (usize, usize) {
        let vp0 = &self.vert[v0 as usize];
        let vp1 = &self.vert[v1 as usize];

        let mut angle = -4.0;
        let mut tp = 0;
        for i in 0..4 {
            if vp0.vnext[i] <= 0 {
                continue;
            }
            let temp = get_angle(vp0.pt, self.vert[vp0.vnext[i] as usize].pt, vp1.pt);
            if temp > angle {
                angle = temp;
                tp = i;
            }
        }

        let mut angle = -4.0;
        let mut tq = 0;
        for i in 0..4 {
            if vp1.vnext[i] <= 0 {
                continue;
            }
            let temp = get_angle(vp1.pt, self.vert[vp1.vnext[i] as usize].pt, vp0.pt);
            if temp > angle {
                angle = temp;
                tq = i;
            }
        }

        (tp, tq)
    }

    /// Split the monotone polygon `mcur` with the diagonal (v0, v1), given
    /// in counter-clockwise order on `mcur`. Splices the circular chains in
    /// O(1) and returns the id of the new polygon.
    fn make_new_monotone_poly(
        &mut self,
        mcur: i32,
        v0: i32,
        v1: i32,
    ) -> Result<i32, TriangulateError> {
        let (ip, iq) = self.get_vertex_positions(v0, v1);
        let p = self.vert[v0 as usize].vpos[ip];
        let q = self.vert[v1 as usize].vpos[iq];

        // Two fresh nodes carry the diagonal, one per side.
        let i = self.new_chain_element();
        let j = self.new_chain_element();

        self.mchain[i as usize].vnum = v0;
        self.mchain[j as usize].vnum = v1;

        self.mchain[i as usize].next = self.mchain[p as usize].next;
        let pn = self.mchain[p as usize].next;
        self.mchain[pn as usize].prev = i;
        self.mchain[i as usize].prev = j;
        self.mchain[j as usize].next = i;
        self.mchain[j as usize].prev = self.mchain[q as usize].prev;
        let qp = self.mchain[q as usize].prev;
        self.mchain[qp as usize].next = j;

        self.mchain[p as usize].next = q;
        self.mchain[q as usize].prev = p;

        let nf0 = self.vert[v0 as usize].nextfree;
        let nf1 = self.vert[v1 as usize].nextfree;
        if nf0 >= 4 || nf1 >= 4 {
            return Err(TriangulateError::InternalError(
                "more than four monotone polygons meet at a vertex",
            ));
        }

        self.vert[v0 as usize].vnext[ip] = v1;
        self.vert[v0 as usize].vpos[nf0] = i;
        let inext = self.mchain[i as usize].next;
        self.vert[v0 as usize].vnext[nf0] = self.mchain[inext as usize].vnum;
        self.vert[v1 as usize].vpos[nf1] = j;
        self.vert[v1 as usize].vnext[nf1] = v0;
        self.vert[v0 as usize].nextfree += 1;
        self.vert[v1 as usize].nextfree += 1;

        self.mon[mcur as usize] = p;
        self.mon.push(i);
        Ok((self.mon.len() - 1) as i32)
    }

    /// Visit every trapezoid reachable from the start, splitting chains at
    /// each cusp configuration. Iterative: the work stack replays the
    /// depth-first order of the natural recursion (children pushed in
    /// reverse), so diagonals are emitted in the same sequence.
    fn traverse(
        &mut self,
        st: &SegTable,
        tm: &TrapMap,
        mcur0: i32,
        trnum0: TrapIdx,
        from0: TrapIdx,
        dir0: Dir,
    ) -> Result<(), TriangulateError> {
        let mut stack: Vec<(i32, TrapIdx, TrapIdx, Dir)> = vec![(mcur0, trnum0, from0, dir0)];

        while let Some((mcur, trnum, from, dir)) = stack.pop() {
            if trnum <= 0 || self.visited[trnum as usize] {
                continue;
            }
            self.visited[trnum as usize] = true;
            let t = tm.tr[trnum as usize];

            // Push in reverse call order; the stack pops them depth-first.
            let mut visit = |items: &[(i32, TrapIdx, Dir)]| {
                for &(m, tr, d) in items.iter().rev() {
                    stack.push((m, tr, trnum, d));
                }
            };

            if t.u0 <= 0 && t.u1 <= 0 {
                if t.d0 > 0 && t.d1 > 0 {
                    // downward-opening triangle
                    let v0 = tm.tr[t.d1 as usize].lseg;
                    let v1 = t.lseg;
                    if from == t.d1 {
                        let mnew = self.make_new_monotone_poly(mcur, v1, v0)?;
                        visit(&[
                            (mcur, t.d1, Dir::FromUp),
                            (mnew, t.d0, Dir::FromUp),
                        ]);
                    } else {
                        let mnew = self.make_new_monotone_poly(mcur, v0, v1)?;
                        visit(&[
                            (mcur, t.d0, Dir::FromUp),
                            (mnew, t.d1, Dir::FromUp),
                        ]);
                    }
                } else {
                    visit(&[
                        (mcur, t.u0, Dir::FromDn),
                        (mcur, t.u1, Dir::FromDn),
                        (mcur, t.d0, Dir::FromUp),
                        (mcur, t.d1, Dir::FromUp),
                    ]);
                }
            } else if t.d0 <= 0 && t.d1 <= 0 {
                if t.u0 > 0 && t.u1 > 0 {
                    // upward-opening triangle
                    let v0 = t.rseg;
                    let v1 = tm.tr[t.u0 as usize].rseg;
                    if from == t.u1 {
                        let mnew = self.make_new_monotone_poly(mcur, v1, v0)?;
                        visit(&[
                            (mcur, t.u1, Dir::FromDn),
                            (mnew, t.u0, Dir::FromDn),
                        ]);
                    } else {
                        let mnew = self.make_new_monotone_poly(mcur, v0, v1)?;
                        visit(&[
                            (mcur, t.u0, Dir::FromDn),
                            (mnew, t.u1, Dir::FromDn),
                        ]);
                    }
                } else {
                    visit(&[
                        (mcur, t.u0, Dir::FromDn),
                        (mcur, t.u1, Dir::FromDn),
                        (mcur, t.d0, Dir::FromUp),
                        (mcur, t.d1, Dir::FromUp),
                    ]);
                }
            } else if t.u0 > 0 && t.u1 > 0 {
                if t.d0 > 0 && t.d1 > 0 {
                    // downward and upward cusps
                    let v0 = tm.tr[t.d1 as usize].lseg;
                    let v1 = tm.tr[t.u0 as usize].rseg;
                    let flip = (dir == Dir::FromDn && t.d1 == from)
                        || (dir == Dir::FromUp && t.u1 == from);
                    if flip {
                        let mnew = self.make_new_monotone_poly(mcur, v1, v0)?;
                        visit(&[
                            (mcur, t.u1, Dir::FromDn),
                            (mcur, t.d1, Dir::FromUp),
                            (mnew, t.u0, Dir::FromDn),
                            (mnew, t.d0, Dir::FromUp),
                        ]);
                    } else {
                        let mnew = self.make_new_monotone_poly(mcur, v0, v1)?;
                        visit(&[
                            (mcur, t.u0, Dir::FromDn),
                            (mcur, t.d0, Dir::FromUp),
                            (mnew, t.u1, Dir::FromDn),
                            (mnew, t.d1, Dir::FromUp),
                        ]);
                    }
                } else if equal_to(t.lo, st.segs[t.lseg as usize].v1, self.eps) {
                    // downward cusp touching the left boundary
                    let v0 = tm.tr[t.u0 as usize].rseg;
                    let v1 = st.segs[t.lseg as usize].next;
                    if dir == Dir::FromUp && t.u0 == from {
                        let mnew = self.make_new_monotone_poly(mcur, v1, v0)?;
                        visit(&[
                            (mcur, t.u0, Dir::FromDn),
                            (mnew, t.d0, Dir::FromUp),
                            (mnew, t.u1, Dir::FromDn),
                            (mnew, t.d1, Dir::FromUp),
                        ]);
                    } else {
                        let mnew = self.make_new_monotone_poly(mcur, v0, v1)?;
                        visit(&[
                            (mcur, t.u1, Dir::FromDn),
                            (mcur, t.d0, Dir::FromUp),
                            (mcur, t.d1, Dir::FromUp),
                            (mnew, t.u0, Dir::FromDn),
                        ]);
                    }
                } else {
                    // downward cusp touching the right boundary
                    let v0 = t.rseg;
                    let v1 = tm.tr[t.u0 as usize].rseg;
                    if dir == Dir::FromUp && t.u1 == from {
                        let mnew = self.make_new_monotone_poly(mcur, v1, v0)?;
                        visit(&[
                            (mcur, t.u1, Dir::FromDn),
                            (mnew, t.d1, Dir::FromUp),
                            (mnew, t.d0, Dir::FromUp),
                            (mnew, t.u0, Dir::FromDn),
                        ]);
                    } else {
                        let mnew = self.make_new_monotone_poly(mcur, v0, v1)?;
                        visit(&[
                            (mcur, t.u0, Dir::FromDn),
                            (mcur, t.d0, Dir::FromUp),
                            (mcur, t.d1, Dir::FromUp),
                            (mnew, t.u1, Dir::FromDn),
                        ]);
                    }
                }
            } else {
                // exactly one upper neighbor
                if t.d0 > 0 && t.d1 > 0 {
                    if equal_to(t.hi, st.segs[t.lseg as usize].v0, self.eps) {
                        // upward cusp touching the left boundary
                        let v0 = tm.tr[t.d1 as usize].lseg;
                        let v1 = t.lseg;
                        if !(dir == Dir::FromDn && t.d0 == from) {
                            let mnew = self.make_new_monotone_poly(mcur, v1, v0)?;
                            visit(&[
                                (mcur, t.u1, Dir::FromDn),
                                (mcur, t.d1, Dir::FromUp),
                                (mcur, t.u0, Dir::FromDn),
                                (mnew, t.d0, Dir::FromUp),
                            ]);
                        } else {
                            let mnew = self.make_new_monotone_poly(mcur, v0, v1)?;
                            visit(&[
                                (mcur, t.d0, Dir::FromUp),
                                (mnew, t.u0, Dir::FromDn),
                                (mnew, t.u1, Dir::FromDn),
                                (mnew, t.d1, Dir::FromUp),
                            ]);
                        }
                    } else {
                        // upward cusp touching the right boundary
                        let v0 = tm.tr[t.d1 as usize].lseg;
                        let v1 = st.segs[t.rseg as usize].next;
                        if dir == Dir::FromDn && t.d1 == from {
                            let mnew = self.make_new_monotone_poly(mcur, v1, v0)?;
                            visit(&[
                                (mcur, t.d1, Dir::FromUp),
                                (mnew, t.u1, Dir::FromDn),
                                (mnew, t.u0, Dir::FromDn),
                                (mnew, t.d0, Dir::FromUp),
                            ]);
                        } else {
                            let mnew = self.make_new_monotone_poly(mcur, v0, v1)?;
                            visit(&[
                                (mcur, t.u0, Dir::FromDn),
                                (mcur, t.d0, Dir::FromUp),
                                (mcur, t.u1, Dir::FromDn),
                                (mnew, t.d1, Dir::FromUp),
                            ]);
                        }
                    }
                } else {
                    // no cusp: at most one neighbor on each side
                    let lseg = &st.segs[t.lseg as usize];
                    let rseg = &st.segs[t.rseg as usize];
                    let lr_down = equal_to(t.hi, lseg.v0, self.eps)
                        && equal_to(t.lo, rseg.v0, self.eps);
                    let lr_up = equal_to(t.hi, rseg.v1, self.eps)
                        && equal_to(t.lo, lseg.v1, self.eps);
                    if lr_down || lr_up {
                        let (v0, v1) = if lr_down {
                            (t.rseg, t.lseg)
                        } else {
                            (st.segs[t.rseg as usize].next, st.segs[t.lseg as usize].next)
                        };
                        if dir == Dir::FromUp {
                            let mnew = self.make_new_monotone_poly(mcur, v1, v0)?;
                            visit(&[
                                (mcur, t.u0, Dir::FromDn),
                                (mcur, t.u1, Dir::FromDn),
                                (mnew, t.d1, Dir::FromUp),
                                (mnew, t.d0, Dir::FromUp),
                            ]);
                        } else {
                            let mnew = self.make_new_monotone_poly(mcur, v0, v1)?;
                            visit(&[
                                (mcur, t.d1, Dir::FromUp),
                                (mcur, t.d0, Dir::FromUp),
                                (mnew, t.u0, Dir::FromDn),
                                (mnew, t.u1, Dir::FromDn),
                            ]);
                        }
                    } else {
                        visit(&[
                            (mcur, t.u0, Dir::FromDn),
                            (mcur, t.d0, Dir::FromUp),
                            (mcur, t.u1, Dir::FromDn),
                            (mcur, t.d1, Dir::FromUp),
                        ]);
                    }
                }
            }
        }
        Ok(())
    }

    /// Triangulate every distinct monotone polygon, appending index triples
    /// to `op`. Chains already consumed (shared representatives) are skipped
    /// via the marked flags.
    pub fn triangulate_monotone_polygons(
        &mut self,
        nvert: usize,
        op: &mut Vec<[i32; 3]>,
    ) -> Result<(), TriangulateError> {
        let eps = self.eps;
        for i in 0..self.mon.len() {
            let head = self.mon[i];
            let vfirst = self.mchain[head as usize].vnum;
            let mut ymax = self.vert[vfirst as usize].pt;
            let mut ymin = ymax;
            let mut posmax = head;
            let mut vcount = 1usize;
            let mut processed = false;

            self.mchain[head as usize].marked = true;
            let mut p = self.mchain[head as usize].next;
            loop {
                let v = self.mchain[p as usize].vnum;
                if v == vfirst {
                    break;
                }
                if self.mchain[p as usize].marked {
                    processed = true;
                    break;
                }
                self.mchain[p as usize].marked = true;

                let pt = self.vert[v as usize].pt;
                if greater_than(pt, ymax, eps) {
                    ymax = pt;
                    posmax = p;
                }
                if less_than(pt, ymin, eps) {
                    ymin = pt;
                }
                p = self.mchain[p as usize].next;
                vcount += 1;
            }

            if processed {
                continue; // duplicate reference to an already-cut polygon
            }

            if vcount == 3 {
                let a = self.mchain[p as usize].vnum;
                let b = self.mchain[self.mchain[p as usize].next as usize].vnum;
                let c = self.mchain[self.mchain[p as usize].prev as usize].vnum;
                op.push([a, b, c]);
            } else {
                let v = self.mchain[self.mchain[posmax as usize].next as usize].vnum;
                let side = if equal_to(self.vert[v as usize].pt, ymin, eps) {
                    SingleSide::Lhs
                } else {
                    SingleSide::Rhs
                };
                self.triangulate_single_polygon(nvert, posmax, side, op)?;
            }
        }
        Ok(())
    }

    /// Greedy reflex-chain sweep over one y-monotone polygon, from its top
    /// vertex to its bottom. Strictly convex corners are cut as they form.
    fn triangulate_single_polygon(
        &self,
        nvert: usize,
        posmax: ChainIdx,
        side: SingleSide,
        op: &mut Vec<[i32; 3]>,
    ) -> Result<(), TriangulateError> {
        let mut rc: Vec<i32> = Vec::with_capacity(nvert + 1);
        let mut ri: usize = 1;
        let vpos;
        let endv;

        match side {
            SingleSide::Rhs => {
                // right chain is the single edge
                rc.push(self.mchain[posmax as usize].vnum);
                let tmp = self.mchain[posmax as usize].next;
                rc.push(self.mchain[tmp as usize].vnum);
                vpos = self.mchain[tmp as usize].next;

                let e = self.mchain[self.mchain[posmax as usize].prev as usize].vnum;
                endv = if e == 0 { nvert as i32 } else { e };
            }
            SingleSide::Lhs => {
                // left chain is the single edge
                let tmp = self.mchain[posmax as usize].next;
                rc.push(self.mchain[tmp as usize].vnum);
                let tmp = self.mchain[tmp as usize].next;
                rc.push(self.mchain[tmp as usize].vnum);
                vpos = self.mchain[tmp as usize].next;

                endv = self.mchain[posmax as usize].vnum;
            }
        }

        let mut vpos = vpos;
        let mut v = self.mchain[vpos as usize].vnum;
        let mut fuel = 4 * nvert + 16;

        while v != endv || ri > 1 {
            if fuel == 0 {
                return Err(TriangulateError::InternalError(
                    "monotone sweep failed to terminate",
                ));
            }
            fuel -= 1;

            if ri > 0 {
                let pv = self.vert[v as usize].pt;
                let pa = self.vert[rc[ri - 1] as usize].pt;
                let pb = self.vert[rc[ri] as usize].pt;
                if cross(pv, pa, pb) > 0.0 {
                    // convex corner: cut it off
                    op.push([rc[ri - 1], rc[ri], v]);
                    rc.pop();
                    ri -= 1;
                } else {
                    // reflex: keep growing the chain
                    rc.push(v);
                    ri += 1;
                    vpos = self.mchain[vpos as usize].next;
                    v = self.mchain[vpos as usize].vnum;
                }
            } else {
                rc.push(v);
                ri += 1;
                vpos = self.mchain[vpos as usize].next;
                v = self.mchain[vpos as usize].vnum;
            }
        }

        if ri < 1 {
            return Err(TriangulateError::InternalError(
                "monotone sweep emptied its reflex chain",
            ));
        }
        // bottom vertex closes the last triangle
        op.push([rc[ri - 1], rc[ri], v]);
        Ok(())
    }
}
