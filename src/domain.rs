//! The seam to the surrounding converter pipeline.
//!
//! The pipeline attaches application-defined blobs ("domain data") to every
//! face and every object it writes. This engine never interprets them; it
//! asks the converter once per classification and embeds the returned maps
//! verbatim into the output stream.

use std::collections::BTreeMap;

use crate::classify::Classification;


/// Named binary blobs attached to a face or object. The ordered map keeps
/// serialization deterministic.
pub type DomainDataMap = BTreeMap<String, Vec<u8>>;

/// Supplies the constant domain data for the two kinds of surface.
pub trait DomainConverter {
    /// Blobs attached to every face of the given classification.
    fn constant_face_domain_data(&self, classification: Classification) -> DomainDataMap;

    /// Blobs attached to the object (polygon set) of the given
    /// classification.
    fn constant_poly_domain_data(&self, classification: Classification) -> DomainDataMap;
}
