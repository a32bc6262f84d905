//! The elevation grid: a rectangular matrix of `i16` height samples plus the
//! real-world spacing between neighboring samples.
//!
//! Grid points are addressed either by `(column, row)` or by a flat `u32`
//! index in row-major order. The flat index doubles as the total order used
//! for chunk ownership decisions, so "smaller index" always means "earlier in
//! scan order".

use cgmath::Point3;

use std::thread;


/// Shape and spacing of a standard HGT tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    /// Spacing between horizontally neighboring samples, in meters.
    pub dx: f64,
    /// Spacing between vertically neighboring samples, in meters.
    pub dy: f64,
    pub columns: u32,
    pub rows: u32,
}

/// 1 arc-second resolution (SRTM-1): 3601×3601 samples, 30m spacing.
pub const HGT_1: Resolution = Resolution {
    dx: 30.0,
    dy: 30.0,
    columns: 3601,
    rows: 3601,
};

/// 3 arc-seconds resolution (SRTM-3): 1201×1201 samples, 90m spacing.
pub const HGT_3: Resolution = Resolution {
    dx: 90.0,
    dy: 90.0,
    columns: 1201,
    rows: 1201,
};

impl Resolution {
    /// Number of `i16` samples a tile of this resolution holds.
    pub fn sample_count(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    /// Maps the byte length of a raw HGT stream to the resolution it must
    /// have. Returns `None` for any length that is neither [`HGT_1`] nor
    /// [`HGT_3`].
    pub fn from_byte_len(len: u64) -> Option<Resolution> {
        [HGT_1, HGT_3]
            .iter()
            .find(|res| len == 2 * res.sample_count() as u64)
            .copied()
    }
}


/// A rectangular height field.
///
/// Every point is "present" by default; points can be marked empty to let
/// the scanner replace locally planar neighborhoods with larger faces (see
/// [`Grid::mark_coplanar_interior`]).
#[derive(Debug, Clone)]
pub struct Grid {
    samples: Vec<i16>,
    empty: Vec<bool>,
    columns: u32,
    rows: u32,
    dx: f64,
    dy: f64,
}

impl Grid {
    /// Creates a grid from row-major samples.
    ///
    /// Panics if `samples.len() != columns * rows`.
    pub fn new(samples: Vec<i16>, columns: u32, rows: u32, dx: f64, dy: f64) -> Self {
        assert_eq!(
            samples.len(),
            columns as usize * rows as usize,
            "sample count does not match grid shape",
        );

        let empty = vec![false; samples.len()];
        Self { samples, empty, columns, rows, dx, dy }
    }

    pub fn from_resolution(samples: Vec<i16>, res: Resolution) -> Self {
        Self::new(samples, res.columns, res.rows, res.dx, res.dy)
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Total number of grid points.
    pub fn len(&self) -> u32 {
        self.columns * self.rows
    }

    pub fn is_empty(&self, col: u32, row: u32) -> bool {
        self.empty[self.locate(col, row) as usize]
    }

    pub fn is_empty_index(&self, index: u32) -> bool {
        self.empty[index as usize]
    }

    /// Flat row-major index of the point at `(col, row)`.
    pub fn locate(&self, col: u32, row: u32) -> u32 {
        row * self.columns + col
    }

    /// Column of the point with the given flat index.
    pub fn point_x(&self, index: u32) -> u32 {
        index % self.columns
    }

    /// Row of the point with the given flat index.
    pub fn point_y(&self, index: u32) -> u32 {
        index / self.columns
    }

    /// Elevation of the point with the given flat index.
    pub fn point_z(&self, index: u32) -> i16 {
        self.samples[index as usize]
    }

    /// The point in external (real-world) coordinates: columns/rows scaled
    /// by the grid spacing, elevation taken verbatim.
    pub fn external_point(&self, index: u32) -> Point3<f64> {
        Point3::new(
            self.point_x(index) as f64 * self.dx,
            self.point_y(index) as f64 * self.dy,
            self.point_z(index) as f64,
        )
    }

    #[cfg(test)]
    pub(crate) fn set_empty(&mut self, col: u32, row: u32) {
        let index = self.locate(col, row) as usize;
        self.empty[index] = true;
    }

    /// Marks every strictly interior point whose 3×3 neighborhood is a single
    /// plane of a single classification as empty.
    ///
    /// Around an empty point no primitive triangles are produced; the area is
    /// covered later by the scanner's boundary walk over the surrounding
    /// present points. The precomputation is exact: a point is only removed
    /// when all six second differences of its neighborhood vanish and the
    /// eight triangles around it agree on land/water, so the walked face
    /// describes the same surface.
    ///
    /// Rows are processed by as many threads as the machine offers.
    pub fn mark_coplanar_interior(&mut self) {
        let columns = self.columns as usize;
        let rows = self.rows as usize;
        if columns < 3 || rows < 3 {
            return;
        }

        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let rows_per_worker = (rows + workers - 1) / workers;

        let mut empty = std::mem::replace(&mut self.empty, Vec::new());
        let samples = &self.samples;

        thread::scope(|scope| {
            for (chunk_idx, chunk) in empty.chunks_mut(rows_per_worker * columns).enumerate() {
                let first_row = chunk_idx * rows_per_worker;
                scope.spawn(move || {
                    for (offset, flag) in chunk.iter_mut().enumerate() {
                        let index = first_row * columns + offset;
                        let (col, row) = (index % columns, index / columns);
                        *flag = is_planar_interior(samples, columns, rows, col, row);
                    }
                });
            }
        });

        self.empty = empty;
    }
}

/// Whether the point at `(col, row)` is strictly interior and its 3×3
/// neighborhood forms one plane with one classification.
fn is_planar_interior(
    samples: &[i16],
    columns: usize,
    rows: usize,
    col: usize,
    row: usize,
) -> bool {
    if col == 0 || row == 0 || col + 1 >= columns || row + 1 >= rows {
        return false;
    }

    let z = |dc: isize, dr: isize| {
        let c = (col as isize + dc) as usize;
        let r = (row as isize + dr) as usize;
        samples[r * columns + c] as i32
    };

    // The neighborhood is one plane iff the horizontal step is the same in
    // all three rows and on both sides of the center, and the vertical step
    // through the center is constant. Six equalities, exactly the plane's
    // missing degrees of freedom.
    let planar = z(0, 0) - z(-1, 0) == z(1, 0) - z(0, 0)
        && z(0, 0) - z(0, -1) == z(0, 1) - z(0, 0)
        && z(0, -1) - z(-1, -1) == z(0, 0) - z(-1, 0)
        && z(0, 1) - z(-1, 1) == z(0, 0) - z(-1, 0)
        && z(1, -1) - z(0, -1) == z(1, 0) - z(0, 0)
        && z(1, 1) - z(0, 1) == z(1, 0) - z(0, 0);
    if !planar {
        return false;
    }

    // All eight surrounding triangles must agree on land/water. With the
    // plane condition already established it suffices that either every
    // neighborhood point is at zero or every triangle touches a non-zero one.
    let heights = [
        z(-1, -1), z(0, -1), z(1, -1),
        z(-1, 0), z(0, 0), z(1, 0),
        z(-1, 1), z(0, 1), z(1, 1),
    ];
    let water = |i: usize| heights[i] == 0;

    // Triangles around the center, as index triples into `heights`.
    const TRIS: [[usize; 3]; 8] = [
        [0, 4, 3], [0, 1, 4],
        [1, 2, 5], [1, 5, 4],
        [3, 4, 6], [4, 7, 6],
        [4, 5, 8], [4, 8, 7],
    ];
    let first_is_water = TRIS[0].iter().all(|&i| water(i));
    TRIS.iter()
        .all(|tri| tri.iter().all(|&i| water(i)) == first_is_water)
}
