//! The matrix scanner: one forward sweep over a contiguous range of grid
//! indices, emitting every face owned by the range.
//!
//! Ranges partition the grid between workers. A region crossing a range
//! border is grown again by every bordering worker — growth is cheap and
//! pure — but only the worker whose range contains the region's smallest
//! cell index emits it, so the union of all ranges' faces equals a single
//! full scan.

use crate::{
    classify::quad_pattern,
    face::{Face, FaceSet},
    grid::Grid,
    grow::{cell_kinds, empty_patch_face, Grower, Tri},
};


/// Scans `[start, end)` and returns the faces owned by that range.
pub fn scan_range(grid: &Grid, start: u32, end: u32) -> FaceSet {
    let mut scanner = Scanner {
        grower: Grower::new(grid),
        faces: Vec::new(),
        grid,
        start,
        end,
    };

    let mut index = start;
    while index < end {
        index = scanner.step(index);
    }

    FaceSet::new(scanner.faces)
}

struct Scanner<'g> {
    grid: &'g Grid,
    grower: Grower<'g>,
    faces: Vec<Face>,
    start: u32,
    end: u32,
}

impl<'g> Scanner<'g> {
    /// Processes the cell whose top-left point is `index` and returns the
    /// next index to visit.
    fn step(&mut self, index: u32) -> u32 {
        let grid = self.grid;
        let col = grid.point_x(index);
        let row = grid.point_y(index);

        // The trailing column has no cell; the trailing row ends the sweep.
        if col + 1 >= grid.columns() {
            return index + 1;
        }
        if row + 1 >= grid.rows() {
            return grid.len();
        }

        let pattern = quad_pattern(grid, col, row);

        // Patterns with empty points below the TL–TR edge start a boundary
        // walk around the adjacent empty patch, unless the point left-below
        // is empty too (then the patch extends further left and an earlier
        // cell starts the walk).
        let walk_to = match pattern {
            10 | 14 => Some((col + 1, row + 1)),
            12 => Some((col + 1, row)),
            _ => None,
        };
        if let Some(to) = walk_to {
            if col > 0 && !grid.is_empty(col - 1, row + 1) {
                if let Some(face) = empty_patch_face(grid, (col, row), to) {
                    self.faces.push(face);
                }
            }
        }

        for &kind in cell_kinds(pattern) {
            let tri = Tri { cell: index, kind };
            if !self.grower.is_claimed(tri) {
                self.emit_region(tri);
            }
        }

        index + 1
    }

    /// Grows the region around `seed` and emits it if this range owns it.
    ///
    /// Ownership goes to the range containing the region's smallest cell
    /// index: every range visits each of its indices as a cell, so exactly
    /// one range both sees the region and owns it.
    fn emit_region(&mut self, seed: Tri) {
        let region = self.grower.grow(seed);
        if (self.start..self.end).contains(&region.owner_cell) {
            match self.grower.trace(&region) {
                Some(face) => self.faces.push(face),
                None => self.grower.fallback_faces(&mut self.faces),
            }
        }
        self.grower.retire_region();
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn flat(columns: u32, rows: u32) -> Grid {
        Grid::new(vec![0; (columns * rows) as usize], columns, rows, 1.0, 1.0)
    }

    /// Doubled signed area of a face ring, in cell units.
    fn doubled_area(grid: &Grid, face: &Face) -> i64 {
        let coords: Vec<(i64, i64)> = face
            .vertices()
            .iter()
            .map(|&v| (grid.point_x(v) as i64, grid.point_y(v) as i64))
            .collect();
        coords
            .iter()
            .zip(coords.iter().cycle().skip(1))
            .map(|(&(vx, vy), &(wx, wy))| vx * wy - wx * vy)
            .sum()
    }

    fn total_area(grid: &Grid, faces: &FaceSet) -> i64 {
        faces.iter().map(|f| doubled_area(grid, f)).sum()
    }

    #[test]
    fn flat_grid_collapses_to_one_face() {
        let g = flat(3, 3);
        let faces = scan_range(&g, 0, g.len());
        assert_eq!(faces.len(), 1);
        let face = faces.iter().next().unwrap();
        assert_eq!(face.vertices(), &[0, 2, 8, 6]);
    }

    #[test]
    fn raised_corner_splits_into_two_faces() {
        let mut samples = vec![0i16; 9];
        samples[2] = 5;
        let g = Grid::new(samples, 3, 3, 1.0, 1.0);

        let faces: Vec<Face> = scan_range(&g, 0, g.len()).into_iter().collect();
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0].vertices(), &[0, 1, 5, 8, 6]);
        assert_eq!(faces[1].vertices(), &[1, 2, 5]);
    }

    #[test]
    fn sloped_plane_collapses_to_one_face() {
        // z = 2·col: a single tilted plane.
        let samples = (0..16).map(|i| 2 * (i % 4) as i16).collect();
        let g = Grid::new(samples, 4, 4, 1.0, 1.0);

        let faces = scan_range(&g, 0, g.len());
        assert_eq!(faces.len(), 1);
        assert_eq!(faces.iter().next().unwrap().vertices(), &[0, 3, 15, 12]);
    }

    #[test]
    fn faces_cover_the_grid_exactly() {
        // A rough little landscape; whatever the faces look like, their
        // signed areas must add up to the full grid.
        let samples = vec![
            0, 0, 3, 1, //
            0, 2, 0, 0, //
            5, 0, 0, 1, //
            0, 0, 4, 0, //
        ];
        let g = Grid::new(samples, 4, 4, 1.0, 1.0);
        let faces = scan_range(&g, 0, g.len());
        assert_eq!(total_area(&g, &faces), 2 * 9);
    }

    #[test]
    fn chunked_scan_equals_full_scan() {
        let samples = (0..16).map(|i| 2 * (i % 4) as i16).collect();
        let g = Grid::new(samples, 4, 4, 1.0, 1.0);

        let full: Vec<Face> = scan_range(&g, 0, 16).into_iter().collect();
        let first: Vec<Face> = scan_range(&g, 0, 8).into_iter().collect();
        let second: Vec<Face> = scan_range(&g, 8, 16).into_iter().collect();

        // The plane's smallest cell is 0, so the first chunk owns it all.
        assert_eq!(first, full);
        assert!(second.is_empty());
    }

    #[test]
    fn regions_are_owned_by_their_smallest_cell() {
        // Rows 0–2 flat sea, rows 2–4 a rising plain: two regions whose
        // first cells (0 and 6) fall into different chunks.
        let samples = (0..15)
            .map(|i| {
                let row = i / 3;
                if row < 2 { 0 } else { 3 * (row as i16 - 2) }
            })
            .collect();
        let g = Grid::new(samples, 3, 5, 1.0, 1.0);

        let full: Vec<Face> = scan_range(&g, 0, 15).into_iter().collect();
        assert_eq!(full.len(), 2);
        assert_eq!(full[0].vertices(), &[0, 2, 8, 6]);
        assert_eq!(full[1].vertices(), &[6, 8, 14, 12]);

        let first: Vec<Face> = scan_range(&g, 0, 6).into_iter().collect();
        let second: Vec<Face> = scan_range(&g, 6, 15).into_iter().collect();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].vertices(), &[0, 2, 8, 6]);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].vertices(), &[6, 8, 14, 12]);
    }

    #[test]
    fn lone_bottom_right_triangle_survives_chunk_split() {
        // An empty top-left corner leaves cell 0 with only its bottom-right
        // triangle, whose smallest vertex index is 1 — one past the cell.
        // Splitting the ranges between index 0 and 1 must still emit the
        // triangle exactly once.
        let mut samples = vec![0i16; 9];
        samples[1] = 3;
        samples[5] = 10;
        let mut g = Grid::new(samples, 3, 3, 1.0, 1.0);
        g.set_empty(0, 0);

        let mut full: Vec<Face> = scan_range(&g, 0, 9).into_iter().collect();
        assert_eq!(full.len(), 5);
        assert!(full.iter().any(|f| f.vertices() == [1, 4, 3]));

        let mut union: Vec<Face> = scan_range(&g, 0, 1).into_iter().collect();
        union.extend(scan_range(&g, 1, 9));
        full.sort();
        union.sort();
        assert_eq!(union, full);
    }

    #[test]
    fn masked_center_produces_ring_and_corners() {
        let mut g = flat(3, 3);
        g.set_empty(1, 1);

        let faces = scan_range(&g, 0, g.len());
        // Four corner triangles and the diamond around the empty center.
        assert_eq!(faces.len(), 5);
        assert_eq!(total_area(&g, &faces), 2 * 4);
        assert!(faces.iter().any(|f| f.vertices() == [1, 5, 7, 3]));
    }

    #[test]
    fn masked_flat_grid_covers_exactly() {
        // Interior of a flat 5×5 is dropped by the precomputation; the scan
        // must still cover all 16 cells.
        let mut g = flat(5, 5);
        g.mark_coplanar_interior();

        let faces = scan_range(&g, 0, g.len());
        assert_eq!(total_area(&g, &faces), 2 * 16);
    }

    #[test]
    fn hole_fallback_still_covers_everything() {
        let mut samples = vec![0i16; 25];
        samples[12] = 1;
        let g = Grid::new(samples, 5, 5, 1.0, 1.0);

        let faces = scan_range(&g, 0, g.len());
        // 14 water faces around the bump plus 6 land triangles.
        assert_eq!(faces.len(), 20);
        assert_eq!(total_area(&g, &faces), 2 * 16);
    }

    #[test]
    fn degenerate_grids_produce_nothing() {
        assert!(scan_range(&flat(1, 1), 0, 1).is_empty());
        assert!(scan_range(&flat(5, 1), 0, 5).is_empty());
        assert!(scan_range(&flat(1, 5), 0, 5).is_empty());
    }
}
