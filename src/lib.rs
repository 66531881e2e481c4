// seidel-rust: Polygon triangulation via Seidel's randomized incremental
// trapezoidation.
// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)

pub mod geom;
pub mod monotone;
pub mod seg;
pub mod trap;
pub mod tri;

pub use geom::{Point, Real};
pub use tri::{TriangulateError, Triangulator, DEFAULT_SEED};
