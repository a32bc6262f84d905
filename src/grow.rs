//! Face growing: merging primitive triangles into maximal planar faces.
//!
//! Every interior grid cell decomposes into at most two primitive triangles
//! (the cell's occupancy pattern decides which, see [`cell_kinds`]). A face
//! is grown by collecting the whole edge-connected component of triangles
//! that lie in one plane and carry one classification, then walking the
//! component's boundary into a vertex ring.
//!
//! Around empty points no triangles exist; those areas are covered by a
//! boundary walk over the surrounding present points ([`empty_patch_face`]).

use cgmath::Vector3;

use crate::{
    classify::{classify_face, face_normal, normals_parallel, Classification},
    face::{Face, FaceBuilder},
    grid::Grid,
};


// ===========================================================================
// ===== Primitive triangles and their adjacency
// ===========================================================================

/// Which half of its cell a primitive triangle covers.
///
/// A fully present cell (pattern 15) splits on the TL–BR diagonal into
/// `LowerLeft` + `UpperRight`; the fixed diagonal makes the decomposition
/// identical no matter which neighbor looks at it. A cell with one empty
/// corner keeps the single triangle spanned by the other three points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TriKind {
    /// `{TL, BR, BL}` — patterns 11 and 15.
    LowerLeft,
    /// `{TL, TR, BR}` — patterns 14 and 15.
    UpperRight,
    /// `{TL, TR, BL}` — pattern 13.
    UpperLeft,
    /// `{TR, BR, BL}` — pattern 7.
    LowerRight,
}

/// A primitive triangle, identified by the flat index of its cell's top-left
/// point and the half of the cell it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Tri {
    pub(crate) cell: u32,
    pub(crate) kind: TriKind,
}

/// The triangles a cell with the given occupancy pattern contains.
pub(crate) fn cell_kinds(pattern: u8) -> &'static [TriKind] {
    match pattern {
        7 => &[TriKind::LowerRight],
        11 => &[TriKind::LowerLeft],
        13 => &[TriKind::UpperLeft],
        14 => &[TriKind::UpperRight],
        15 => &[TriKind::LowerLeft, TriKind::UpperRight],
        _ => &[],
    }
}

/// Bit position of a triangle inside the per-cell bookkeeping bitmaps. A
/// cell holds two triangles only in pattern 15, where the second one is
/// always `UpperRight`.
pub(crate) fn slot(kind: TriKind) -> u8 {
    match kind {
        TriKind::UpperRight => 1,
        _ => 0,
    }
}

/// The triangle's vertex ring, wound like the containing quad
/// (TL → TR → BR → BL).
pub(crate) fn tri_vertices(grid: &Grid, tri: Tri) -> [u32; 3] {
    let tl = tri.cell;
    let tr = tl + 1;
    let bl = tl + grid.columns();
    let br = bl + 1;
    match tri.kind {
        TriKind::LowerLeft => [tl, br, bl],
        TriKind::UpperRight => [tl, tr, br],
        TriKind::UpperLeft => [tl, tr, bl],
        TriKind::LowerRight => [tr, br, bl],
    }
}

/// The triangle on the other side of the directed edge
/// `vertices[edge] → vertices[(edge + 1) % 3]`, if that cell exists and
/// actually contains a triangle touching the edge.
pub(crate) fn neighbor_across(grid: &Grid, tri: Tri, edge: usize) -> Option<Tri> {
    use TriKind::*;

    let col = grid.point_x(tri.cell);
    let row = grid.point_y(tri.cell);

    // Each (kind, edge) pair determines the neighboring cell and which
    // triangle kinds in it can share the edge (at most one of the candidates
    // can exist in any pattern).
    let (dc, dr, candidates): (i64, i64, [TriKind; 2]) = match (tri.kind, edge) {
        // The shared TL–BR diagonal of a full cell.
        (LowerLeft, 0) => (0, 0, [UpperRight, UpperRight]),
        (UpperRight, 2) => (0, 0, [LowerLeft, LowerLeft]),
        // The cut diagonals of patterns 13/7 never have an in-cell partner.
        (UpperLeft, 1) | (LowerRight, 2) => return None,
        // Bottom edge → top edge of the cell below.
        (LowerLeft, 1) | (LowerRight, 1) => (0, 1, [UpperRight, UpperLeft]),
        // Left edge → right edge of the cell to the left.
        (LowerLeft, 2) | (UpperLeft, 2) => (-1, 0, [UpperRight, LowerRight]),
        // Top edge → bottom edge of the cell above.
        (UpperRight, 0) | (UpperLeft, 0) => (0, -1, [LowerLeft, LowerRight]),
        // Right edge → left edge of the cell to the right.
        (UpperRight, 1) | (LowerRight, 0) => (1, 0, [LowerLeft, UpperLeft]),
        _ => unreachable!("triangle edge index out of range"),
    };

    let ncol = col as i64 + dc;
    let nrow = row as i64 + dr;
    if ncol < 0
        || nrow < 0
        || ncol + 1 >= grid.columns() as i64
        || nrow + 1 >= grid.rows() as i64
    {
        return None;
    }

    let cell = grid.locate(ncol as u32, nrow as u32);
    let pattern = crate::classify::quad_pattern(grid, ncol as u32, nrow as u32);
    cell_kinds(pattern)
        .iter()
        .copied()
        .find(|kind| candidates.contains(kind))
        .map(|kind| Tri { cell, kind })
}

fn vertex_position(verts: &[u32; 3], vertex: u32) -> usize {
    verts.iter().position(|&v| v == vertex).unwrap()
}


// ===========================================================================
// ===== Region growth and boundary tracing
// ===========================================================================

/// A grown region: the component's smallest vertex index (its anchor, where
/// the boundary trace starts), the smallest cell index of any member
/// triangle (which decides the range that emits the region — every range
/// visits each of its indices as a cell, while a lone bottom-right triangle
/// has no vertex at its own cell index), the triangle to start the trace in,
/// and the component size.
pub(crate) struct Region {
    anchor: u32,
    pub(crate) owner_cell: u32,
    anchor_tri: Tri,
    tri_count: usize,
}

/// A directed boundary edge of the current region:
/// `vertices[index] → vertices[(index + 1) % 3]` of `tri`, with no in-region
/// triangle on the other side. The region lies to the edge's left.
#[derive(Clone, Copy, PartialEq, Eq)]
struct BoundaryEdge {
    tri: Tri,
    index: usize,
}

/// Grows regions of united triangles and keeps the per-scan bookkeeping:
/// which triangles were already emitted (`claimed`) and which belong to the
/// region currently being grown (`marked`). Both store one bit per cell
/// slot, so the scratch memory stays at two bytes per grid point even for
/// full-size tiles.
pub(crate) struct Grower<'g> {
    grid: &'g Grid,
    claimed: Vec<u8>,
    marked: Vec<u8>,
    stack: Vec<Tri>,
    region: Vec<Tri>,
}

impl<'g> Grower<'g> {
    pub(crate) fn new(grid: &'g Grid) -> Self {
        Self {
            grid,
            claimed: vec![0; grid.len() as usize],
            marked: vec![0; grid.len() as usize],
            stack: Vec::new(),
            region: Vec::new(),
        }
    }

    pub(crate) fn is_claimed(&self, tri: Tri) -> bool {
        self.claimed[tri.cell as usize] & (1 << slot(tri.kind)) != 0
    }

    fn is_marked(&self, tri: Tri) -> bool {
        self.marked[tri.cell as usize] & (1 << slot(tri.kind)) != 0
    }

    fn mark(&mut self, tri: Tri) {
        self.marked[tri.cell as usize] |= 1 << slot(tri.kind);
    }

    /// Grows the maximal region around `seed`: every triangle reachable over
    /// shared edges that has the seed's classification and lies in the
    /// seed's plane.
    ///
    /// The grown set is a property of the surface alone — any seed inside it
    /// produces the same region — which is what lets independent chunks
    /// agree on which of them emits it.
    pub(crate) fn grow(&mut self, seed: Tri) -> Region {
        let grid = self.grid;
        let seed_verts = tri_vertices(grid, seed);
        let class = classify_face(grid, &seed_verts);
        let plane_normal = face_normal(grid, &seed_verts);

        self.region.clear();
        self.stack.clear();
        self.mark(seed);
        self.stack.push(seed);

        while let Some(tri) = self.stack.pop() {
            self.region.push(tri);
            for edge in 0..3 {
                if let Some(n) = neighbor_across(grid, tri, edge) {
                    if !self.is_marked(n) && self.unites(n, class, plane_normal) {
                        self.mark(n);
                        self.stack.push(n);
                    }
                }
            }
        }

        let anchor = self
            .region
            .iter()
            .map(|&t| min_vertex(grid, t))
            .min()
            .unwrap();
        let anchor_tri = self
            .region
            .iter()
            .copied()
            .filter(|&t| tri_vertices(grid, t).contains(&anchor))
            .min_by_key(|&t| (t.cell, slot(t.kind)))
            .unwrap();
        let owner_cell = self.region.iter().map(|t| t.cell).min().unwrap();

        Region { anchor, owner_cell, anchor_tri, tri_count: self.region.len() }
    }

    /// `can_unite` against the region's plane, with the reference normal and
    /// classification computed once per region.
    fn unites(&self, tri: Tri, class: Classification, plane_normal: Vector3<f64>) -> bool {
        let verts = tri_vertices(self.grid, tri);
        classify_face(self.grid, &verts) == class
            && normals_parallel(face_normal(self.grid, &verts), plane_normal)
    }

    /// Walks the boundary of the current region into a single vertex ring,
    /// eliding collinear points.
    ///
    /// Returns `None` when the region encloses holes: a plain ring cannot
    /// describe such an area, so the caller falls back to per-cell faces.
    /// The check compares the ring's doubled area (exact integer shoelace in
    /// cell units) against the number of half-cell triangles in the region.
    pub(crate) fn trace(&self, region: &Region) -> Option<Face> {
        let grid = self.grid;
        let start = self.boundary_edge_at(region.anchor_tri, region.anchor);

        let mut builder = FaceBuilder::new(grid);
        let mut doubled_area = 0i64;
        let mut edge = start;
        loop {
            let v = tri_vertices(grid, edge.tri)[edge.index];
            builder.add_index(v);

            let next = self.next_boundary(edge);
            let w = tri_vertices(grid, next.tri)[next.index];
            let (vx, vy) = (grid.point_x(v) as i64, grid.point_y(v) as i64);
            let (wx, wy) = (grid.point_x(w) as i64, grid.point_y(w) as i64);
            doubled_area += vx * wy - wx * vy;

            edge = next;
            if edge == start {
                break;
            }
        }

        if doubled_area == region.tri_count as i64 {
            Some(builder.finish())
        } else {
            None
        }
    }

    /// Emits the current region triangle by triangle, joining the two halves
    /// of fully covered cells back into quads. Exact for any region shape.
    pub(crate) fn fallback_faces(&mut self, out: &mut Vec<Face>) {
        let grid = self.grid;
        self.region.sort_by_key(|t| (t.cell, slot(t.kind)));

        let mut i = 0;
        while i < self.region.len() {
            let tri = self.region[i];
            let both_halves = tri.kind == TriKind::LowerLeft
                && self.region.get(i + 1)
                    == Some(&Tri { cell: tri.cell, kind: TriKind::UpperRight });
            if both_halves {
                let tl = tri.cell;
                let bl = tl + grid.columns();
                out.push(Face::from_vertices(vec![tl, tl + 1, bl + 1, bl]));
                i += 2;
            } else {
                out.push(Face::from_vertices(tri_vertices(grid, tri).to_vec()));
                i += 1;
            }
        }
    }

    /// Marks the current region as emitted and clears its marks.
    pub(crate) fn retire_region(&mut self) {
        for tri in self.region.drain(..) {
            let bit = 1 << slot(tri.kind);
            self.claimed[tri.cell as usize] |= bit;
            self.marked[tri.cell as usize] &= !bit;
        }
    }

    /// Finds the boundary edge leaving `vertex` by pivoting through
    /// in-region triangles. `vertex` is the region anchor, so it is
    /// guaranteed to lie on the boundary and the pivot terminates.
    fn boundary_edge_at(&self, tri: Tri, vertex: u32) -> BoundaryEdge {
        let mut edge = BoundaryEdge {
            index: vertex_position(&tri_vertices(self.grid, tri), vertex),
            tri,
        };
        loop {
            match neighbor_across(self.grid, edge.tri, edge.index) {
                Some(n) if self.is_marked(n) => {
                    edge = BoundaryEdge {
                        index: vertex_position(&tri_vertices(self.grid, n), vertex),
                        tri: n,
                    };
                }
                _ => return edge,
            }
        }
    }

    /// The boundary edge following `edge`: pivot around `edge`'s endpoint
    /// until the next edge without an in-region neighbor.
    fn next_boundary(&self, edge: BoundaryEdge) -> BoundaryEdge {
        let endpoint = tri_vertices(self.grid, edge.tri)[(edge.index + 1) % 3];
        let mut edge = BoundaryEdge { tri: edge.tri, index: (edge.index + 1) % 3 };
        loop {
            match neighbor_across(self.grid, edge.tri, edge.index) {
                Some(n) if self.is_marked(n) => {
                    edge = BoundaryEdge {
                        index: vertex_position(&tri_vertices(self.grid, n), endpoint),
                        tri: n,
                    };
                }
                _ => return edge,
            }
        }
    }
}

fn min_vertex(grid: &Grid, tri: Tri) -> u32 {
    let [a, b, c] = tri_vertices(grid, tri);
    a.min(b).min(c)
}


// ===========================================================================
// ===== Boundary walk around empty patches
// ===========================================================================

/// Probe directions in 45° steps, counter-clockwise from "east" in grid
/// coordinates.
const DIRS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

fn dir_index(dc: i32, dr: i32) -> usize {
    DIRS.iter()
        .position(|&d| d == (dc, dr))
        .expect("walk step is not a neighbor offset")
}

/// Walks the ring of present points around an empty patch, starting with the
/// step `from → to`, and returns it as a face.
///
/// At every point the next step is probed in a fixed priority: begin two
/// 45°-steps counter-clockwise from the incoming direction, then rotate
/// clockwise (up to six probes). This hugs the empty patch, keeping it to
/// the walk's right, until the walk closes.
///
/// Returns `None` when the ring touches a vertex with a smaller index than
/// the walk's start: the scan position reaching that vertex owns the ring
/// and emits it instead, so every ring is produced exactly once even when
/// several cells or chunks see it.
pub(crate) fn empty_patch_face(grid: &Grid, from: (u32, u32), to: (u32, u32)) -> Option<Face> {
    let start = grid.locate(from.0, from.1);
    let mut builder = FaceBuilder::new(grid);
    builder.add_point(from.0, from.1);

    let (mut cur, mut next) = (from, to);
    let mut closed = false;
    // A closed ring visits every grid point at most once, so a walk still
    // open after `grid.len()` steps is cycling over a malformed mask.
    for _ in 0..grid.len() {
        if grid.locate(next.0, next.1) < start {
            return None;
        }

        let inc = dir_index(next.0 as i32 - cur.0 as i32, next.1 as i32 - cur.1 as i32);
        let mut probed = None;
        for k in 0..6 {
            let (dc, dr) = DIRS[(inc + 10 - k) % 8];
            let col = next.0 as i32 + dc;
            let row = next.1 as i32 + dr;
            let inside = col >= 0
                && row >= 0
                && (col as u32) < grid.columns()
                && (row as u32) < grid.rows();
            if inside && !grid.is_empty(col as u32, row as u32) {
                probed = Some((col as u32, row as u32));
                break;
            }
        }

        // A dead end means the presence mask around the patch is malformed.
        cur = next;
        next = probed?;
        builder.add_point(cur.0, cur.1);

        if grid.locate(next.0, next.1) == start {
            closed = true;
            break;
        }
    }

    if !closed || builder.len() < 3 {
        return None;
    }
    Some(builder.finish())
}
