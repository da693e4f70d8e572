//! Image intake for characters, settings and locations.
//!
//! A candidate image is validated ([`validate`], [`quick_validate`]), then
//! resolved into the URL an entity should display ([`UploadResolver`]), one
//! slot at a time or for a whole form ([`BatchUploadCoordinator`]).

pub mod batch;
pub mod candidate;
pub mod config;
pub mod fallback;
pub mod heuristics;
pub mod probe;
pub mod resolve;
pub mod sniff;
pub mod storage;
pub mod validate;

pub use batch::{BatchOptions, BatchSlots, BatchUploadCoordinator, Slot, SlotOutcome};
pub use candidate::{CandidateImage, EntityKind};
pub use config::{PolicySource, ValidationConfig};
pub use fallback::generate_fallback_url;
pub use resolve::{ImageSource, ResolveError, ResolvedImage, UploadIntent, UploadResolver};
pub use validate::{ValidationVerdict, quick_validate, validate};

#[cfg(test)]
mod tests;
