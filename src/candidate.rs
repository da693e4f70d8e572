use std::path::{Path, PathBuf};

use bytes::Bytes;
use derive_debug::Dbg;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read image file ({path:?}): {error}")]
    Read {
        error: std::io::Error,
        path: PathBuf,
    },
    #[error("path has no file name ({path:?})")]
    NoFileName { path: PathBuf },
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Character,
    Setting,
    Location,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Character => "character",
            EntityKind::Setting => "setting",
            EntityKind::Location => "location",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-supplied image that has not been accepted or stored yet.
#[derive(Dbg, Clone)]
pub struct CandidateImage {
    #[dbg(skip)]
    pub body: Bytes,
    pub declared_type: String,
    pub file_name: String,
}

impl CandidateImage {
    pub fn new(
        body: impl Into<Bytes>,
        declared_type: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            body: body.into(),
            declared_type: declared_type.into(),
            file_name: file_name.into(),
        }
    }

    /// Reads a candidate from disk, assigning the type a browser would derive
    /// from the file name.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .ok_or_else(|| Error::NoFileName {
                path: path.to_owned(),
            })?
            .to_string_lossy()
            .into_owned();
        let body = tokio::fs::read(path).await.map_err(|error| Error::Read {
            error,
            path: path.to_owned(),
        })?;
        let declared_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_owned();
        Ok(Self {
            body: body.into(),
            declared_type,
            file_name,
        })
    }

    pub fn byte_length(&self) -> u64 {
        self.body.len() as u64
    }

    /// Lowercased extension of the file name, if any.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.file_name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    pub fn declared_essence(&self) -> String {
        normalize_type(&self.declared_type)
    }
}

/// Reduces a content type to its lowercase essence, folding legacy aliases.
pub fn normalize_type(declared: &str) -> String {
    let essence = match declared.trim().parse::<mime::Mime>() {
        Ok(mime) => mime.essence_str().to_ascii_lowercase(),
        Err(_) => declared.trim().to_ascii_lowercase(),
    };
    match essence.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".into(),
        "image/x-ms-bmp" => "image/bmp".into(),
        _ => essence,
    }
}
