//! Polygonal faces over grid vertices.
//!
//! A face is an ordered ring of grid-vertex indices. The common case (a lone
//! triangle or a merged quad) stays inline in a small vector; merged regions
//! with more corners spill to the heap.

use cgmath::Point3;
use smallvec::SmallVec;

use crate::grid::Grid;


/// A face in external coordinates, the form handed between threads and to
/// the writer.
pub type Polygon = Vec<Point3<f64>>;


/// An immutable ring of at least three grid-vertex indices.
///
/// The winding follows the grid convention: top-left → top-right →
/// bottom-right → bottom-left, i.e. the enclosed area lies to the left of
/// each directed edge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Face {
    vertices: SmallVec<[u32; 4]>,
}

impl Face {
    pub(crate) fn from_vertices(vertices: Vec<u32>) -> Self {
        debug_assert!(vertices.len() >= 3);
        Self { vertices: SmallVec::from_vec(vertices) }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertices(&self) -> &[u32] {
        &self.vertices
    }

    /// The face in external coordinates.
    pub fn to_polygon(&self, grid: &Grid) -> Polygon {
        self.vertices.iter().map(|&v| grid.external_point(v)).collect()
    }
}


/// Builds a face ring vertex by vertex, dropping collinear intermediate
/// points as it goes.
pub(crate) struct FaceBuilder<'g> {
    grid: &'g Grid,
    vertices: Vec<u32>,
}

impl<'g> FaceBuilder<'g> {
    pub(crate) fn new(grid: &'g Grid) -> Self {
        Self { grid, vertices: Vec::new() }
    }

    /// Appends the point at `(col, row)`. If the previous point lies on the
    /// straight line between its predecessor and the new point, it is
    /// replaced instead of extended.
    pub(crate) fn add_point(&mut self, col: u32, row: u32) {
        let index = self.grid.locate(col, row);
        if let [.., prev2, prev] = *self.vertices.as_slice() {
            if self.collinear(prev2, prev, index) {
                *self.vertices.last_mut().unwrap() = index;
                return;
            }
        }
        self.vertices.push(index);
    }

    pub(crate) fn len(&self) -> usize {
        self.vertices.len()
    }

    pub(crate) fn add_index(&mut self, index: u32) {
        self.add_point(self.grid.point_x(index), self.grid.point_y(index));
    }

    /// Closes the ring. The last vertex is elided when it is collinear with
    /// its predecessor and the ring's first vertex (the wrap-around case the
    /// incremental check cannot see).
    pub(crate) fn finish(mut self) -> Face {
        if let [first, .., prev2, last] = *self.vertices.as_slice() {
            if self.collinear(prev2, last, first) {
                self.vertices.pop();
            }
        }
        Face::from_vertices(self.vertices)
    }

    fn collinear(&self, a: u32, b: u32, c: u32) -> bool {
        let (ax, ay) = (self.grid.point_x(a) as i64, self.grid.point_y(a) as i64);
        let (bx, by) = (self.grid.point_x(b) as i64, self.grid.point_y(b) as i64);
        let (cx, cy) = (self.grid.point_x(c) as i64, self.grid.point_y(c) as i64);
        (bx - ax) * (cy - by) == (by - ay) * (cx - bx)
    }
}


/// All faces produced by one scan, in emission order.
///
/// In debug builds, [`FaceSet::new`] verifies that no two faces share the
/// same vertex ring. Two identical faces always mean a scanner bug, the
/// release build skips the O(n·log n) check.
#[derive(Debug, Default)]
pub struct FaceSet {
    faces: Vec<Face>,
}

impl FaceSet {
    pub(crate) fn new(faces: Vec<Face>) -> Self {
        #[cfg(debug_assertions)]
        {
            let mut sorted: Vec<&Face> = faces.iter().collect();
            sorted.sort();
            for pair in sorted.windows(2) {
                if pair[0] == pair[1] {
                    panic!("duplicate face emitted by scan: {:?}", pair[0]);
                }
            }
        }
        Self { faces }
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Face> {
        self.faces.iter()
    }
}

impl IntoIterator for FaceSet {
    type Item = Face;
    type IntoIter = std::vec::IntoIter<Face>;
    fn into_iter(self) -> Self::IntoIter {
        self.faces.into_iter()
    }
}
