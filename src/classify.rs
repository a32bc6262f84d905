//! Land/water classification and the coplanarity oracle.
//!
//! Everything here is a pure function over an explicit [`Grid`]; all merge
//! decisions in the grower reduce to [`can_unite`].

use cgmath::{Point3, Vector3};

use crate::grid::Grid;


/// Tolerance for all real-coordinate comparisons.
pub(crate) const ADDITIVE_ERROR: f64 = 1e-6;

/// What a face describes: terrain above sea level or sea surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Land,
    Water,
}

/// Occupancy of the 2×2 point block whose top-left corner is `(col, row)`:
/// `TL << 3 | TR << 2 | BR << 1 | BL << 0`, a bit per present point.
pub fn quad_pattern(grid: &Grid, col: u32, row: u32) -> u8 {
    (u8::from(!grid.is_empty(col, row)) << 3)
        | (u8::from(!grid.is_empty(col + 1, row)) << 2)
        | (u8::from(!grid.is_empty(col + 1, row + 1)) << 1)
        | u8::from(!grid.is_empty(col, row + 1))
}

/// A face is land as soon as any of its vertices has non-zero elevation.
/// Grid elevations are exact integers, so no tolerance is involved.
pub fn classify_face(grid: &Grid, vertices: &[u32]) -> Classification {
    if vertices.iter().any(|&v| grid.point_z(v) != 0) {
        Classification::Land
    } else {
        Classification::Water
    }
}

/// Real-coordinate counterpart of [`classify_face`]: heights within the
/// tolerance band around zero count as sea level.
pub fn classify_polygon(polygon: &[Point3<f64>]) -> Classification {
    if polygon.iter().any(|p| p.z.abs() > ADDITIVE_ERROR) {
        Classification::Land
    } else {
        Classification::Water
    }
}

/// Surface normal of a planar face: cross product of its first two edges.
pub(crate) fn face_normal(grid: &Grid, vertices: &[u32]) -> Vector3<f64> {
    let a = grid.external_point(vertices[0]);
    let b = grid.external_point(vertices[1]);
    let c = grid.external_point(vertices[2]);
    (b - a).cross(c - b)
}

/// Whether two normals point along the same line (either orientation).
pub(crate) fn normals_parallel(a: Vector3<f64>, b: Vector3<f64>) -> bool {
    let cross = a.cross(b);
    cross.x.abs() <= ADDITIVE_ERROR
        && cross.y.abs() <= ADDITIVE_ERROR
        && cross.z.abs() <= ADDITIVE_ERROR
}

/// Whether two faces lie in parallel planes.
///
/// For faces sharing an edge or vertex this means "in the same plane", which
/// is the only way the grower uses it.
pub fn is_coplanar(grid: &Grid, a: &[u32], b: &[u32]) -> bool {
    normals_parallel(face_normal(grid, a), face_normal(grid, b))
}

/// The single merge gate: two faces may join iff they are coplanar and
/// describe the same kind of surface.
pub fn can_unite(grid: &Grid, a: &[u32], b: &[u32]) -> bool {
    is_coplanar(grid, a, b) && classify_face(grid, a) == classify_face(grid, b)
}
