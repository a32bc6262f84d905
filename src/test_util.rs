//! Helpers shared by the unit tests: a stub domain converter and decoders
//! for the two output formats.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use cgmath::Point3;

use crate::{
    classify::Classification,
    domain::{DomainConverter, DomainDataMap},
};


/// Tags faces and objects with one distinguishable byte per classification.
pub(crate) struct StubConverter;

impl DomainConverter for StubConverter {
    fn constant_face_domain_data(&self, classification: Classification) -> DomainDataMap {
        single_entry("face tag", classification)
    }

    fn constant_poly_domain_data(&self, classification: Classification) -> DomainDataMap {
        single_entry("poly tag", classification)
    }
}

fn single_entry(name: &str, classification: Classification) -> DomainDataMap {
    let tag = match classification {
        Classification::Land => b'l',
        Classification::Water => b'w',
    };
    let mut map = DomainDataMap::new();
    map.insert(name.into(), vec![tag]);
    map
}


pub(crate) struct DecodedObject {
    pub(crate) name: String,
    pub(crate) domain_data: DomainDataMap,
    pub(crate) type_tag: u32,
    pub(crate) faces: Vec<DecodedFace>,
}

pub(crate) struct DecodedFace {
    pub(crate) points: Vec<Point3<f64>>,
    pub(crate) domain_data: DomainDataMap,
}

/// Parses a polygon container stream back into objects. Panics on any
/// malformed input, which is exactly what a test wants.
pub(crate) fn decode_objects(bytes: &[u8]) -> Vec<DecodedObject> {
    let mut input = Cursor::new(bytes);
    let mut objects = Vec::new();
    while (input.position() as usize) < bytes.len() {
        let name = read_string(&mut input);
        let domain_data = read_domain_map(&mut input);
        let type_tag = input.read_u32::<LittleEndian>().unwrap();
        let face_count = input.read_u32::<LittleEndian>().unwrap();
        let faces = (0..face_count).map(|_| read_face(&mut input)).collect();
        objects.push(DecodedObject { name, domain_data, type_tag, faces });
    }
    objects
}

/// Parses an index-based face list back into `(col, row, elevation)` rings.
pub(crate) fn decode_index_faces(bytes: &[u8]) -> Vec<Vec<(u16, u16, i16)>> {
    let mut input = Cursor::new(bytes);
    let face_count = input.read_u32::<LittleEndian>().unwrap();
    let faces = (0..face_count)
        .map(|_| {
            let vertex_count = input.read_u32::<LittleEndian>().unwrap();
            (0..vertex_count)
                .map(|_| {
                    let col = input.read_u16::<LittleEndian>().unwrap();
                    let row = input.read_u16::<LittleEndian>().unwrap();
                    let z = input.read_i16::<LittleEndian>().unwrap();
                    (col, row, z)
                })
                .collect()
        })
        .collect();
    assert_eq!(input.position() as usize, bytes.len(), "trailing bytes");
    faces
}

fn read_face(input: &mut Cursor<&[u8]>) -> DecodedFace {
    let vertex_count = input.read_u32::<LittleEndian>().unwrap();
    let points = (0..vertex_count)
        .map(|_| {
            assert_eq!(input.read_u32::<LittleEndian>().unwrap(), 3);
            let x = input.read_f64::<LittleEndian>().unwrap();
            let y = input.read_f64::<LittleEndian>().unwrap();
            let z = input.read_f64::<LittleEndian>().unwrap();
            Point3::new(x, y, z)
        })
        .collect();
    let domain_data = read_domain_map(input);
    DecodedFace { points, domain_data }
}

fn read_domain_map(input: &mut Cursor<&[u8]>) -> DomainDataMap {
    let entry_count = input.read_u32::<LittleEndian>().unwrap();
    (0..entry_count)
        .map(|_| {
            let name = read_string(input);
            let len = input.read_u32::<LittleEndian>().unwrap();
            let mut blob = vec![0; len as usize];
            input.read_exact(&mut blob).unwrap();
            (name, blob)
        })
        .collect()
}

fn read_string(input: &mut Cursor<&[u8]>) -> String {
    let len = input.read_u32::<LittleEndian>().unwrap();
    let mut buf = vec![0; len as usize];
    input.read_exact(&mut buf).unwrap();
    String::from_utf8(buf).unwrap()
}
