//! The storage collaborator that persists accepted image bytes.

use bytes::Bytes;
use derive_debug::Dbg;

use crate::candidate::{CandidateImage, EntityKind};

pub mod http;
pub mod local;

/// One image submitted for storage, tagged with the kind of entity it belongs to.
#[derive(Dbg, Clone)]
pub struct ImageUpload {
    pub kind: EntityKind,
    pub file_name: String,
    pub content_type: String,
    #[dbg(skip)]
    pub body: Bytes,
}

impl ImageUpload {
    pub fn from_candidate(candidate: &CandidateImage, kind: EntityKind) -> Self {
        Self {
            kind,
            file_name: candidate.file_name.clone(),
            content_type: candidate.declared_essence(),
            body: candidate.body.clone(),
        }
    }
}

pub trait Client {
    type Error: std::fmt::Display;

    /// Stores the image and returns the path or URL it is served from.
    fn put(
        &self,
        upload: ImageUpload,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;
}
