use std::{collections::HashSet, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read policy ({path:?}): {error}")]
    Read {
        error: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse policy ({path:?}): {error}")]
    Parse {
        error: serde_yaml::Error,
        path: PathBuf,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub width: u32,
    pub height: u32,
}

/// Acceptance policy for candidate images.
///
/// Every field falls back to [`ValidationConfig::default`] when omitted, so a
/// policy document only has to name what it overrides.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ValidationConfig {
    pub max_size_bytes: u64,
    pub min_size_bytes: u64,
    pub max_dimensions: Bounds,
    pub min_dimensions: Bounds,
    pub supported_extensions: HashSet<String>,
    pub allowed_declared_types: HashSet<String>,
    pub max_aspect_ratio: f64,
    /// Vector documents above this size are flagged as suspicious. Unset means
    /// [`VECTOR_OUTLIER_FACTOR`] times `max_size_bytes`.
    pub suspicious_vector_bytes: Option<u64>,
    pub fallback_base_url: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: 10 * 1024 * 1024,
            min_size_bytes: 100,
            max_dimensions: Bounds {
                width: 4096,
                height: 4096,
            },
            min_dimensions: Bounds {
                width: 16,
                height: 16,
            },
            supported_extensions: ["jpg", "jpeg", "png", "gif", "webp", "bmp", "svg"]
                .into_iter()
                .map(Into::into)
                .collect(),
            allowed_declared_types: [
                "image/jpeg",
                "image/png",
                "image/gif",
                "image/webp",
                "image/bmp",
                "image/svg+xml",
            ]
            .into_iter()
            .map(Into::into)
            .collect(),
            max_aspect_ratio: 4.0,
            suspicious_vector_bytes: None,
            fallback_base_url: "https://api.dicebear.com/9.x".into(),
        }
    }
}

pub const VECTOR_OUTLIER_FACTOR: u64 = 4;

impl ValidationConfig {
    pub fn vector_outlier_bytes(&self) -> u64 {
        self.suspicious_vector_bytes
            .unwrap_or_else(|| self.max_size_bytes.saturating_mul(VECTOR_OUTLIER_FACTOR))
    }

    pub fn supports_extension(&self, extension: &str) -> bool {
        self.supported_extensions
            .iter()
            .any(|supported| supported.eq_ignore_ascii_case(extension))
    }

    pub fn allows_declared_type(&self, essence: &str) -> bool {
        self.allowed_declared_types
            .iter()
            .any(|allowed| crate::candidate::normalize_type(allowed) == essence)
    }
}

/// Where the acceptance policy comes from.
#[derive(Debug, Clone)]
pub enum PolicySource {
    File(PathBuf),
    Remote(url::Url),
    Builtin,
}

impl PolicySource {
    /// Loads the policy.
    ///
    /// A remote policy that cannot be fetched degrades to the builtin default;
    /// a local file that cannot be read is a hard error since it was named
    /// explicitly.
    pub async fn load(&self) -> Result<ValidationConfig, Error> {
        match self {
            PolicySource::File(path) => {
                let src = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|error| Error::Read {
                        error,
                        path: path.clone(),
                    })?;
                let config = serde_yaml::from_str(&src).map_err(|error| Error::Parse {
                    error,
                    path: path.clone(),
                })?;
                debug!(?path, "loaded validation policy");
                Ok(config)
            }
            PolicySource::Remote(url) => Ok(fetch_remote(url).await.unwrap_or_else(|error| {
                warn!(%url, %error, "policy service unreachable, using builtin policy");
                ValidationConfig::default()
            })),
            PolicySource::Builtin => Ok(ValidationConfig::default()),
        }
    }
}

const POLICY_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const POLICY_TIMEOUT: Duration = Duration::from_secs(5);

async fn fetch_remote(url: &url::Url) -> Result<ValidationConfig, reqwest::Error> {
    let client = reqwest::Client::builder()
        .connect_timeout(POLICY_CONNECT_TIMEOUT)
        .timeout(POLICY_TIMEOUT)
        .build()?;
    let config = client
        .get(url.clone())
        .send()
        .await?
        .error_for_status()?
        .json::<ValidationConfig>()
        .await?;
    debug!(%url, "fetched validation policy");
    Ok(config)
}
