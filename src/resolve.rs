//! Decides which image URL an entity ends up with.
//!
//! The order is fixed: a freshly uploaded image wins over the existing one,
//! the existing one over a generated fallback, and a fallback over nothing.
//! [`authoritative_url`] is the only place that order is written down.

use derive_debug::Dbg;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    candidate::{CandidateImage, EntityKind},
    config::ValidationConfig,
    storage::{self, ImageUpload},
    validate,
};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImageSource {
    Uploaded,
    Existing,
    Fallback,
    Empty,
}

/// Picks the first non-empty URL in precedence order.
pub fn authoritative_url(
    uploaded: Option<&str>,
    existing: Option<&str>,
    fallback: Option<&str>,
) -> (String, ImageSource) {
    [
        (uploaded, ImageSource::Uploaded),
        (existing, ImageSource::Existing),
        (fallback, ImageSource::Fallback),
    ]
    .into_iter()
    .find_map(|(url, source)| {
        url.map(str::trim)
            .filter(|url| !url.is_empty())
            .map(|url| (url.to_owned(), source))
    })
    .unwrap_or_else(|| (String::new(), ImageSource::Empty))
}

#[derive(Dbg)]
pub struct UploadIntent {
    pub candidate: Option<CandidateImage>,
    pub kind: EntityKind,
    pub existing_url: Option<String>,
    pub preserve_existing: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolveError {
    #[error("{}", .errors.first().map(String::as_str).unwrap_or("image rejected"))]
    Rejected { errors: Vec<String> },
    #[error("failed to store image: {message}")]
    Storage { message: String },
}

/// Outcome of one resolution.
///
/// A failure carries no URL: the caller keeps whatever it had persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedImage {
    Ready { url: String, source: ImageSource },
    Failed(ResolveError),
}

impl ResolvedImage {
    pub fn is_success(&self) -> bool {
        matches!(self, ResolvedImage::Ready { .. })
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            ResolvedImage::Ready { url, .. } => Some(url),
            ResolvedImage::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ResolveError> {
        match self {
            ResolvedImage::Ready { .. } => None,
            ResolvedImage::Failed(error) => Some(error),
        }
    }
}

impl Serialize for ResolvedImage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            success: bool,
            url: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            source: Option<ImageSource>,
            #[serde(skip_serializing_if = "Option::is_none")]
            error: Option<String>,
        }
        let wire = match self {
            ResolvedImage::Ready { url, source } => Wire {
                success: true,
                url,
                source: Some(*source),
                error: None,
            },
            ResolvedImage::Failed(error) => Wire {
                success: false,
                url: "",
                source: None,
                error: Some(error.to_string()),
            },
        };
        wire.serialize(serializer)
    }
}

pub struct UploadResolver<'a, S> {
    config: &'a ValidationConfig,
    storage: &'a S,
}

impl<'a, S: storage::Client> UploadResolver<'a, S> {
    pub fn new(config: &'a ValidationConfig, storage: &'a S) -> Self {
        Self { config, storage }
    }

    pub fn config(&self) -> &'a ValidationConfig {
        self.config
    }

    pub async fn resolve(&self, intent: UploadIntent) -> ResolvedImage {
        let UploadIntent {
            candidate,
            kind,
            existing_url,
            preserve_existing,
        } = intent;
        let existing = existing_url.as_deref().filter(|_| preserve_existing);

        let Some(candidate) = candidate else {
            let (url, source) = authoritative_url(None, existing, None);
            debug!(%kind, ?source, "no new image, nothing to upload");
            return ResolvedImage::Ready { url, source };
        };

        let verdict = validate::validate(Some(&candidate), self.config).await;
        if !verdict.is_valid() {
            warn!(
                %kind,
                file_name = %candidate.file_name,
                errors = ?verdict.errors(),
                "image rejected"
            );
            return ResolvedImage::Failed(ResolveError::Rejected {
                errors: verdict.into_errors(),
            });
        }

        match self
            .storage
            .put(ImageUpload::from_candidate(&candidate, kind))
            .await
        {
            Ok(path) => {
                let (url, source) = authoritative_url(Some(&path), existing, None);
                debug!(%kind, %url, "image stored");
                ResolvedImage::Ready { url, source }
            }
            Err(error) => {
                warn!(%kind, file_name = %candidate.file_name, %error, "failed to store image");
                ResolvedImage::Failed(ResolveError::Storage {
                    message: error.to_string(),
                })
            }
        }
    }
}
