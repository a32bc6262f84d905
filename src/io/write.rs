//! The polygon stream writer.
//!
//! At most two objects are emitted per conversion: one for all land faces,
//! one for all water faces. An object's header is written the moment its
//! first face arrives, with a placeholder face count that is patched when
//! the stream is finalized. Land faces are streamed as the chunks fold in;
//! water faces are held back and written as one contiguous block at the
//! end, preserving the legacy container layout.

use std::io::{Seek, SeekFrom, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::{
    classify::Classification,
    convert::ChunkResult,
    domain::{DomainConverter, DomainDataMap},
    face::Polygon,
};

use super::Error;


/// Object type tag of a polygon set.
const OBJECT_POLY: u32 = 0;

const LAND_OBJECT_NAME: &str = "HGT land";
const WATER_OBJECT_NAME: &str = "HGT water";


/// Summary of one conversion.
///
/// With no faces at all, the heights keep their neutral initial values
/// (`min > max`) and `poly_count` is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HgtStats {
    pub min_height: i16,
    pub max_height: i16,
    /// Number of objects written (0, 1 or 2).
    pub poly_count: u32,
}

/// Per-object write state: nothing written yet, or the header is out and
/// faces are being appended.
enum ObjectState {
    Awaiting,
    Streaming { count_pos: u64, count: u32 },
}

pub struct PolyWriter<'a, W: Write + Seek> {
    sink: &'a mut W,
    land: ObjectState,
    water: ObjectState,
    land_face_data: DomainDataMap,
    water_face_data: DomainDataMap,
    land_poly_data: DomainDataMap,
    water_poly_data: DomainDataMap,
    pending_water: Vec<Polygon>,
    min_height: i16,
    max_height: i16,
    poly_count: u32,
}

impl<'a, W: Write + Seek> PolyWriter<'a, W> {
    /// Creates a writer; the converter is queried once per classification
    /// here and never again.
    pub(crate) fn new(sink: &'a mut W, converter: &dyn DomainConverter) -> Self {
        Self {
            sink,
            land: ObjectState::Awaiting,
            water: ObjectState::Awaiting,
            land_face_data: converter.constant_face_domain_data(Classification::Land),
            water_face_data: converter.constant_face_domain_data(Classification::Water),
            land_poly_data: converter.constant_poly_domain_data(Classification::Land),
            water_poly_data: converter.constant_poly_domain_data(Classification::Water),
            pending_water: Vec::new(),
            min_height: i16::MAX,
            max_height: i16::MIN,
            poly_count: 0,
        }
    }

    /// Folds one chunk's results in. Chunks must arrive in range order:
    /// land faces hit the sink immediately, water faces queue up.
    pub(crate) fn add_chunk(&mut self, chunk: ChunkResult) -> Result<(), Error> {
        self.min_height = self.min_height.min(chunk.min_height);
        self.max_height = self.max_height.max(chunk.max_height);

        for poly in &chunk.land {
            self.write_classified(Classification::Land, poly)?;
        }
        self.pending_water.extend(chunk.water);
        Ok(())
    }

    /// Flushes the buffered water faces, patches both face counts and
    /// returns the conversion summary.
    pub(crate) fn finalize(mut self) -> Result<HgtStats, Error> {
        let water = std::mem::replace(&mut self.pending_water, Vec::new());
        for poly in &water {
            self.write_classified(Classification::Water, poly)?;
        }

        patch_count(self.sink, &self.land)?;
        patch_count(self.sink, &self.water)?;

        Ok(HgtStats {
            min_height: self.min_height,
            max_height: self.max_height,
            poly_count: self.poly_count,
        })
    }

    fn write_classified(
        &mut self,
        classification: Classification,
        poly: &Polygon,
    ) -> Result<(), Error> {
        let (state, name, poly_data, face_data) = match classification {
            Classification::Land => (
                &mut self.land,
                LAND_OBJECT_NAME,
                &self.land_poly_data,
                &self.land_face_data,
            ),
            Classification::Water => (
                &mut self.water,
                WATER_OBJECT_NAME,
                &self.water_poly_data,
                &self.water_face_data,
            ),
        };

        if let ObjectState::Awaiting = *state {
            let count_pos = write_object_header(&mut *self.sink, name, poly_data)?;
            *state = ObjectState::Streaming { count_pos, count: 0 };
            self.poly_count += 1;
        }

        write_face(&mut *self.sink, poly, face_data)?;
        if let ObjectState::Streaming { count, .. } = state {
            *count += 1;
        }
        Ok(())
    }
}

/// Writes an object header and reserves its face count field, returning the
/// count's stream position.
fn write_object_header(
    sink: &mut (impl Write + Seek),
    name: &str,
    poly_data: &DomainDataMap,
) -> Result<u64, Error> {
    sink.write_u32::<LittleEndian>(name.len() as u32)?;
    sink.write_all(name.as_bytes())?;
    write_domain_map(sink, poly_data)?;
    sink.write_u32::<LittleEndian>(OBJECT_POLY)?;

    let count_pos = sink.stream_position()?;
    sink.write_u32::<LittleEndian>(0)?;
    Ok(count_pos)
}

fn write_face(
    sink: &mut (impl Write + Seek),
    poly: &Polygon,
    face_data: &DomainDataMap,
) -> Result<(), Error> {
    sink.write_u32::<LittleEndian>(poly.len() as u32)?;
    for point in poly {
        sink.write_u32::<LittleEndian>(3)?;
        sink.write_f64::<LittleEndian>(point.x)?;
        sink.write_f64::<LittleEndian>(point.y)?;
        sink.write_f64::<LittleEndian>(point.z)?;
    }
    write_domain_map(sink, face_data)
}

fn write_domain_map(sink: &mut impl Write, map: &DomainDataMap) -> Result<(), Error> {
    sink.write_u32::<LittleEndian>(map.len() as u32)?;
    for (name, blob) in map {
        sink.write_u32::<LittleEndian>(name.len() as u32)?;
        sink.write_all(name.as_bytes())?;
        sink.write_u32::<LittleEndian>(blob.len() as u32)?;
        sink.write_all(blob)?;
    }
    Ok(())
}

/// Overwrites the reserved count field of a streamed object and returns the
/// cursor to the end of the sink. Objects never opened need no patch.
fn patch_count(sink: &mut (impl Write + Seek), state: &ObjectState) -> Result<(), Error> {
    if let ObjectState::Streaming { count_pos, count } = *state {
        sink.seek(SeekFrom::Start(count_pos))?;
        sink.write_u32::<LittleEndian>(count)?;
        sink.seek(SeekFrom::End(0))?;
    }
    Ok(())
}
