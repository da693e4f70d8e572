//! Validation pipeline: turns one candidate image into a verdict.
//!
//! Policy violations become errors, advisory findings become warnings. All
//! checks run so the verdict is complete; nothing short-circuits except a
//! missing candidate, which leaves nothing to inspect.

use serde::Serialize;
use tracing::debug;

use crate::{
    candidate::CandidateImage,
    config::ValidationConfig,
    heuristics,
    probe::{self, Dimensions},
    sniff::{self, SniffedFormat},
};

/// A non-fatal finding.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct Advisory(String);

impl Advisory {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Advisory> for String {
    fn from(value: Advisory) -> Self {
        value.0
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct VerdictMetadata {
    pub byte_length: u64,
    pub declared_type: String,
    pub sniffed_format: Option<SniffedFormat>,
    pub dimensions: Dimensions,
    pub aspect_ratio: Option<f64>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ValidationVerdict {
    is_valid: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
    metadata: VerdictMetadata,
}

impl ValidationVerdict {
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn metadata(&self) -> &VerdictMetadata {
        &self.metadata
    }

    pub fn into_errors(self) -> Vec<String> {
        self.errors
    }
}

struct VerdictBuilder {
    errors: Vec<String>,
    warnings: Vec<String>,
    metadata: VerdictMetadata,
}

impl VerdictBuilder {
    fn new(candidate: Option<&CandidateImage>) -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            metadata: VerdictMetadata {
                byte_length: candidate.map(CandidateImage::byte_length).unwrap_or(0),
                declared_type: candidate
                    .map(|c| c.declared_type.clone())
                    .unwrap_or_default(),
                sniffed_format: None,
                dimensions: Dimensions::NotMeasured,
                aspect_ratio: None,
            },
        }
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    fn warn(&mut self, advisory: Advisory) {
        self.warnings.push(advisory.into());
    }

    fn finish(self) -> ValidationVerdict {
        ValidationVerdict {
            is_valid: self.errors.is_empty(),
            errors: self.errors,
            warnings: self.warnings,
            metadata: self.metadata,
        }
    }
}

// Steps shared by the quick and the full pipeline. Both call exactly this, so
// quick validation can never accept what full validation rejects here.
fn static_checks(candidate: &CandidateImage, config: &ValidationConfig, verdict: &mut VerdictBuilder) {
    let size = candidate.byte_length();
    if size == 0 {
        verdict.error("image file is empty");
    } else if size < config.min_size_bytes {
        verdict.error(format!(
            "image is too small ({size} bytes, minimum is {} bytes)",
            config.min_size_bytes
        ));
    }
    if size > config.max_size_bytes {
        verdict.error(format!(
            "image is too large ({size} bytes, maximum is {} bytes)",
            config.max_size_bytes
        ));
    }

    match candidate.extension() {
        Some(ext) if config.supports_extension(&ext) => {}
        Some(ext) => verdict.error(format!("unsupported file extension .{ext}")),
        None => verdict.error(format!("file name {:?} has no extension", candidate.file_name)),
    }

    let essence = candidate.declared_essence();
    if !config.allows_declared_type(&essence) {
        verdict.error(format!("unsupported image type {:?}", candidate.declared_type));
    }
}

/// Size, extension and declared-type checks only. Synchronous, reads no bytes.
pub fn quick_validate(
    candidate: Option<&CandidateImage>,
    config: &ValidationConfig,
) -> ValidationVerdict {
    let mut verdict = VerdictBuilder::new(candidate);
    match candidate {
        Some(candidate) => static_checks(candidate, config, &mut verdict),
        None => verdict.error("no image provided"),
    }
    verdict.finish()
}

/// Runs every check against the candidate.
pub async fn validate(
    candidate: Option<&CandidateImage>,
    config: &ValidationConfig,
) -> ValidationVerdict {
    let mut verdict = VerdictBuilder::new(candidate);
    let Some(candidate) = candidate else {
        verdict.error("no image provided");
        return verdict.finish();
    };
    static_checks(candidate, config, &mut verdict);

    let essence = candidate.declared_essence();
    let sniffed = sniff::sniff(&candidate.body);
    verdict.metadata.sniffed_format = Some(sniffed);
    match sniffed.mime() {
        None => verdict.warn(Advisory::new("could not determine image format from content")),
        Some(mime) if mime != essence => verdict.warn(Advisory::new(format!(
            "content looks like {mime} but was declared as {essence}"
        ))),
        Some(_) => {}
    }

    let is_vector =
        sniffed.is_vector() || (sniffed == SniffedFormat::Unknown && essence == "image/svg+xml");

    if is_vector {
        verdict.metadata.dimensions = Dimensions::NotApplicable;
    } else {
        match probe::probe(candidate.body.clone(), sniffed).await {
            Ok(dimensions) => {
                check_dimensions(&dimensions, config, &mut verdict);
                verdict.metadata.aspect_ratio = dimensions.aspect_ratio();
                verdict.metadata.dimensions = dimensions;
            }
            Err(advisory) => verdict.warn(advisory),
        }
    }

    if is_vector {
        heuristics::inspect(&candidate.body, config)
            .into_iter()
            .for_each(|advisory| verdict.warn(advisory));
    }

    let verdict = verdict.finish();
    debug!(
        file_name = %candidate.file_name,
        is_valid = verdict.is_valid,
        errors = ?verdict.errors,
        warnings = ?verdict.warnings,
        "validated image"
    );
    verdict
}

fn check_dimensions(dimensions: &Dimensions, config: &ValidationConfig, verdict: &mut VerdictBuilder) {
    let Dimensions::Measured { width, height } = *dimensions else {
        return;
    };
    let max = config.max_dimensions;
    let min = config.min_dimensions;
    if width > max.width || height > max.height {
        verdict.error(format!(
            "image is {width}x{height} pixels, maximum is {}x{}",
            max.width, max.height
        ));
    }
    if width < min.width || height < min.height {
        verdict.error(format!(
            "image is {width}x{height} pixels, minimum is {}x{}",
            min.width, min.height
        ));
    }
    if let Some(elongation) = dimensions.elongation()
        && elongation > config.max_aspect_ratio
    {
        verdict.warn(Advisory::new(format!(
            "unusual aspect ratio {elongation:.2}:1 (maximum {:.2}:1)",
            config.max_aspect_ratio
        )));
    }
}
