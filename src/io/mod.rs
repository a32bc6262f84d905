//! Writing the binary model container.
//!
//! All multi-byte values are little-endian. The container is a plain
//! sequence of objects; each object is a header (name, domain data, type
//! tag) followed by a face count and that many face records. Counts are not
//! known up front, so a placeholder is written and patched once the object
//! is complete — the sink therefore has to be seekable.

use std::io;

use failure::Fail;


mod write;

pub use self::write::{HgtStats, PolyWriter};


#[derive(Debug, Fail)]
pub enum Error {
    /// The HGT input length matches none of the supported resolutions.
    #[fail(display = "unexpected HGT input size: {} bytes", len)]
    UnexpectedHgtSize { len: u64 },

    #[fail(display = "IO error: {}", _0)]
    Io(io::Error),
}

impl From<io::Error> for Error {
    fn from(src: io::Error) -> Self {
        Error::Io(src)
    }
}
