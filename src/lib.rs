//! Height-field mesh simplification.
//!
//! This crate turns a rectangular grid of elevation samples (an HGT tile or
//! any other height field) into the smallest set of planar polygon faces
//! that reproduces the terrain exactly, classifies every face as land or
//! water, and streams the result into a binary model container.
//!
//! The pipeline, bottom to top:
//!
//! - [`grid`]: the elevation matrix and the standard HGT resolutions;
//! - [`classify`]: the land/water classifier and the coplanarity oracle
//!   behind every merge decision;
//! - [`scan`]: sweeping a grid range and growing maximal planar faces;
//! - [`io`]: the binary container writer;
//! - [`convert`]: the parallel entry points tying it all together.
//!
//! ```no_run
//! use std::{fs::File, io::BufReader};
//! # use relief::{convert_hgt, Classification, DomainConverter, DomainDataMap};
//!
//! struct Plain;
//! impl DomainConverter for Plain {
//!     fn constant_face_domain_data(&self, _: Classification) -> DomainDataMap {
//!         DomainDataMap::new()
//!     }
//!     fn constant_poly_domain_data(&self, _: Classification) -> DomainDataMap {
//!         DomainDataMap::new()
//!     }
//! }
//!
//! # fn run() -> Result<(), relief::Error> {
//! let mut input = BufReader::new(File::open("N50E006.hgt").map_err(relief::Error::Io)?);
//! let mut output = File::create("N50E006.bin").map_err(relief::Error::Io)?;
//! let stats = convert_hgt(&mut input, &Plain, &mut output)?;
//! println!("{} objects", stats.poly_count);
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod convert;
pub mod domain;
pub mod face;
pub mod grid;
mod grow;
pub mod io;
pub mod scan;

#[cfg(test)]
mod test_util;

pub use self::{
    classify::Classification,
    convert::{convert_grid, convert_grid_index, convert_hgt, convert_hgt_index},
    domain::{DomainConverter, DomainDataMap},
    face::{Face, FaceSet, Polygon},
    grid::{Grid, Resolution, HGT_1, HGT_3},
    io::{Error, HgtStats},
};
