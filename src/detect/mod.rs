//! Frame-classification decision pipeline.
//!
//! One frame goes in, an annotated frame plus a helmet verdict comes out.
//! The active backend locates candidate regions (faces, or person/helmet
//! boxes), a zone above each candidate is tested against fixed helmet color
//! bands, and the verdict is the logical OR across all candidates.

mod backend;
mod backends;
pub mod color;
pub mod nms;
mod selector;

pub use backend::{ClassifyBackend, Classifier};
pub use backends::{FaceFinder, HeuristicBackend, SeetaFaceFinder};
#[cfg(feature = "backend-network")]
pub use backends::NetworkBackend;
pub use selector::select_backend;

use crate::frame::Region;

/// Zone where a helmet would sit relative to a detected face: from 50px
/// above the face top down to 20px below it, full face width. Clamping to
/// the frame happens at the call site.
pub fn helmet_zone_above_face(face: Region) -> Region {
    Region::new(face.x, face.y - 50, face.w, 70)
}

/// Upper slice of a person box: from 20px above the box top down to one
/// third of the box height below it, full box width.
pub fn helmet_zone_on_person(bbox: Region) -> Region {
    Region::new(bbox.x, bbox.y - 20, bbox.w, bbox.h / 3 + 20)
}
