//! The conversion entry points: HGT input → simplified polygon output.
//!
//! The grid is partitioned into near-equal contiguous index ranges, one per
//! available core. Workers scan their range into pure data; the coordinator
//! scans the first range itself (so the object headers hit the sink while
//! the workers are still running) and folds all results into the writer in
//! range order, which keeps the output byte-identical across runs.

use std::{
    cmp,
    io::{Read, Seek, SeekFrom, Write},
    panic,
    sync::{Mutex, MutexGuard},
    thread,
};

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use crate::{
    classify::{classify_face, Classification},
    domain::DomainConverter,
    face::{FaceSet, Polygon},
    grid::{Grid, Resolution},
    io::{Error, HgtStats, PolyWriter},
    scan::scan_range,
};


/// One conversion at a time: a run saturates every core already, and the
/// writer's height statistics are process-global in spirit.
static CONVERT_GATE: Mutex<()> = Mutex::new(());

fn lock_gate() -> MutexGuard<'static, ()> {
    // A poisoned gate only means some earlier conversion panicked; the gate
    // itself carries no data.
    CONVERT_GATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn worker_count() -> u32 {
    thread::available_parallelism().map(|n| n.get() as u32).unwrap_or(1)
}


/// What one worker hands back to the coordinator.
pub(crate) struct ChunkResult {
    pub(crate) min_height: i16,
    pub(crate) max_height: i16,
    pub(crate) land: Vec<Polygon>,
    pub(crate) water: Vec<Polygon>,
}

/// Scans a range and splits its faces by classification, tracking the
/// height extremes over every face vertex.
fn scan_chunk(grid: &Grid, start: u32, end: u32) -> ChunkResult {
    let mut result = ChunkResult {
        min_height: i16::MAX,
        max_height: i16::MIN,
        land: Vec::new(),
        water: Vec::new(),
    };

    for face in scan_range(grid, start, end) {
        for &v in face.vertices() {
            let z = grid.point_z(v);
            result.min_height = cmp::min(result.min_height, z);
            result.max_height = cmp::max(result.max_height, z);
        }
        let polygon = face.to_polygon(grid);
        match classify_face(grid, face.vertices()) {
            Classification::Land => result.land.push(polygon),
            Classification::Water => result.water.push(polygon),
        }
    }
    result
}


/// Converts a grid into the polygon container format.
pub fn convert_grid(
    grid: &Grid,
    converter: &dyn DomainConverter,
    sink: &mut (impl Write + Seek),
) -> Result<HgtStats, Error> {
    let _gate = lock_gate();

    let total = grid.len();
    let workers = worker_count();
    let chunk = (total + workers - 1) / workers;

    let mut writer = PolyWriter::new(sink, converter);
    thread::scope(|scope| -> Result<HgtStats, Error> {
        let mut handles = Vec::new();
        for i in 1..workers {
            let start = i * chunk;
            if start >= total {
                break;
            }
            let end = cmp::min(start + chunk, total);
            handles.push(scope.spawn(move || scan_chunk(grid, start, end)));
        }

        writer.add_chunk(scan_chunk(grid, 0, cmp::min(chunk, total)))?;
        for handle in handles {
            let result = handle
                .join()
                .unwrap_or_else(|payload| panic::resume_unwind(payload));
            writer.add_chunk(result)?;
        }
        writer.finalize()
    })
}

/// Converts a raw HGT stream into the polygon container format. The input
/// length must match one of the two standard resolutions.
pub fn convert_hgt(
    input: &mut impl Read,
    converter: &dyn DomainConverter,
    sink: &mut (impl Write + Seek),
) -> Result<HgtStats, Error> {
    let grid = read_hgt(input)?;
    convert_grid(&grid, converter, sink)
}

/// Converts a grid into the compact index-based face list:
/// `[u32 face count]` followed by each face as `[u32 vertex count]` and
/// `(u16 col, u16 row, i16 elevation)` per vertex. Returns the face count.
pub fn convert_grid_index(
    grid: &Grid,
    sink: &mut (impl Write + Seek),
) -> Result<u32, Error> {
    let _gate = lock_gate();

    let total = grid.len();
    let workers = worker_count();
    let chunk = (total + workers - 1) / workers;

    let count_pos = sink.stream_position()?;
    sink.write_u32::<LittleEndian>(0)?;

    let mut faces_written = 0;
    thread::scope(|scope| -> Result<(), Error> {
        let mut handles = Vec::new();
        for i in 1..workers {
            let start = i * chunk;
            if start >= total {
                break;
            }
            let end = cmp::min(start + chunk, total);
            handles.push(scope.spawn(move || scan_range(grid, start, end)));
        }

        write_index_faces(
            sink,
            grid,
            scan_range(grid, 0, cmp::min(chunk, total)),
            &mut faces_written,
        )?;
        for handle in handles {
            let set = handle
                .join()
                .unwrap_or_else(|payload| panic::resume_unwind(payload));
            write_index_faces(sink, grid, set, &mut faces_written)?;
        }
        Ok(())
    })?;

    sink.seek(SeekFrom::Start(count_pos))?;
    sink.write_u32::<LittleEndian>(faces_written)?;
    sink.seek(SeekFrom::End(0))?;
    Ok(faces_written)
}

/// Index-based counterpart of [`convert_hgt`].
pub fn convert_hgt_index(
    input: &mut impl Read,
    sink: &mut (impl Write + Seek),
) -> Result<u32, Error> {
    let grid = read_hgt(input)?;
    convert_grid_index(&grid, sink)
}

fn write_index_faces(
    sink: &mut impl Write,
    grid: &Grid,
    faces: FaceSet,
    faces_written: &mut u32,
) -> Result<(), Error> {
    for face in faces {
        sink.write_u32::<LittleEndian>(face.len() as u32)?;
        for &v in face.vertices() {
            sink.write_u16::<LittleEndian>(grid.point_x(v) as u16)?;
            sink.write_u16::<LittleEndian>(grid.point_y(v) as u16)?;
            sink.write_i16::<LittleEndian>(grid.point_z(v))?;
        }
        *faces_written += 1;
    }
    Ok(())
}

fn read_hgt(input: &mut impl Read) -> Result<Grid, Error> {
    let mut raw = Vec::new();
    input.read_to_end(&mut raw)?;

    let res = Resolution::from_byte_len(raw.len() as u64)
        .ok_or(Error::UnexpectedHgtSize { len: raw.len() as u64 })?;

    let mut samples = vec![0i16; res.sample_count()];
    LittleEndian::read_i16_into(&raw, &mut samples);
    Ok(Grid::from_resolution(samples, res))
}


#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use cgmath::Point3;

    use super::*;
    use crate::test_util::{decode_index_faces, decode_objects, StubConverter};

    fn raised_corner_grid() -> Grid {
        let mut samples = vec![0i16; 9];
        samples[2] = 5;
        Grid::new(samples, 3, 3, 30.0, 30.0)
    }

    #[test]
    fn flat_grid_yields_one_water_object() {
        let g = Grid::new(vec![0; 9], 3, 3, 30.0, 30.0);
        let mut sink = Cursor::new(Vec::new());
        let stats = convert_grid(&g, &StubConverter, &mut sink).unwrap();

        assert_eq!(stats, HgtStats { min_height: 0, max_height: 0, poly_count: 1 });

        let objects = decode_objects(&sink.into_inner());
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].name, "HGT water");
        assert_eq!(objects[0].faces.len(), 1);
        assert_eq!(
            objects[0].faces[0].points,
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(60.0, 0.0, 0.0),
                Point3::new(60.0, 60.0, 0.0),
                Point3::new(0.0, 60.0, 0.0),
            ],
        );
    }

    #[test]
    fn raised_corner_yields_two_objects() {
        let g = raised_corner_grid();
        let mut sink = Cursor::new(Vec::new());
        let stats = convert_grid(&g, &StubConverter, &mut sink).unwrap();

        assert_eq!(stats, HgtStats { min_height: 0, max_height: 5, poly_count: 2 });

        let objects = decode_objects(&sink.into_inner());
        assert_eq!(objects.len(), 2);

        assert_eq!(objects[0].name, "HGT land");
        assert_eq!(objects[0].faces.len(), 1);
        assert_eq!(
            objects[0].faces[0].points,
            vec![
                Point3::new(30.0, 0.0, 0.0),
                Point3::new(60.0, 0.0, 5.0),
                Point3::new(60.0, 30.0, 0.0),
            ],
        );
        assert_eq!(objects[0].domain_data.get("poly tag"), Some(&vec![b'l']));
        assert_eq!(
            objects[0].faces[0].domain_data.get("face tag"),
            Some(&vec![b'l']),
        );

        assert_eq!(objects[1].name, "HGT water");
        assert_eq!(objects[1].faces.len(), 1);
        assert_eq!(objects[1].faces[0].points.len(), 5);
        assert_eq!(objects[1].domain_data.get("poly tag"), Some(&vec![b'w']));
    }

    #[test]
    fn output_is_deterministic() {
        let g = raised_corner_grid();
        let mut first = Cursor::new(Vec::new());
        let mut second = Cursor::new(Vec::new());
        convert_grid(&g, &StubConverter, &mut first).unwrap();
        convert_grid(&g, &StubConverter, &mut second).unwrap();
        assert_eq!(first.into_inner(), second.into_inner());
    }

    #[test]
    fn hgt_input_length_is_validated() {
        let mut sink = Cursor::new(Vec::new());
        let mut bad = Cursor::new(vec![0u8; 1000 * 1000 * 2]);
        match convert_hgt(&mut bad, &StubConverter, &mut sink) {
            Err(Error::UnexpectedHgtSize { len }) => assert_eq!(len, 2_000_000),
            other => panic!("expected size error, got {:?}", other.map(|s| s.poly_count)),
        }
        // Nothing must reach the sink on a rejected input.
        assert!(sink.into_inner().is_empty());
    }

    #[test]
    fn flat_hgt3_tile_converts() {
        let mut input = Cursor::new(vec![0u8; 1201 * 1201 * 2]);
        let mut sink = Cursor::new(Vec::new());
        let stats = convert_hgt(&mut input, &StubConverter, &mut sink).unwrap();

        assert_eq!(stats.poly_count, 1);
        let objects = decode_objects(&sink.into_inner());
        assert_eq!(objects[0].name, "HGT water");
        assert_eq!(objects[0].faces.len(), 1);
        // 1200 cells of 90m spacing per side.
        assert_eq!(objects[0].faces[0].points[2], Point3::new(108_000.0, 108_000.0, 0.0));
    }

    #[test]
    fn index_variant_writes_grid_coordinates() {
        let g = raised_corner_grid();
        let mut sink = Cursor::new(Vec::new());
        let count = convert_grid_index(&g, &mut sink).unwrap();
        assert_eq!(count, 2);

        let faces = decode_index_faces(&sink.into_inner());
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0], vec![(0, 0, 0), (1, 0, 0), (2, 1, 0), (2, 2, 0), (0, 2, 0)]);
        assert_eq!(faces[1], vec![(1, 0, 0), (2, 0, 5), (2, 1, 0)]);
    }
}
