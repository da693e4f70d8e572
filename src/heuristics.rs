//! Best-effort scanning of vector (SVG) content for active or external parts.
//!
//! Every finding is an [`Advisory`]. Nothing in here can reject an upload.

use std::sync::LazyLock;

use tracing::debug;

use crate::{config::ValidationConfig, validate::Advisory};

static SCRIPT_MARKER: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"(?i)<script\b|javascript:|\son[a-z]+\s*=").unwrap());
static EXTERNAL_REFERENCE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(
        r#"(?i)(?:href\s*=\s*["']|url\(\s*["']?|@import\s+["'])\s*((?:https?:|//)[^"')\s]*)"#,
    )
    .unwrap()
});
static DATA_URI: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r#"(?i)["'(]\s*(data:[^"')]*)"#).unwrap());

#[derive(Default, Debug)]
struct Findings {
    script: Option<String>,
    external_reference: Option<String>,
    data_uri: Option<String>,
}

impl Findings {
    fn from_tree(doc: &roxmltree::Document) -> Self {
        let mut findings = Findings::default();
        for node in doc.descendants().filter(|node| node.is_element()) {
            let tag = node.tag_name().name();
            if tag.eq_ignore_ascii_case("script") {
                findings.script.get_or_insert_with(|| "<script> element".into());
            }
            if tag.eq_ignore_ascii_case("style") {
                node.descendants()
                    .filter(|child| child.is_text())
                    .filter_map(|child| child.text())
                    .for_each(|css| findings.scan_css(css));
            }
            for attr in node.attributes() {
                let name = attr.name().to_ascii_lowercase();
                let value = attr.value().trim();
                let lower = value.to_ascii_lowercase();
                if name.starts_with("on") {
                    findings
                        .script
                        .get_or_insert_with(|| format!("{name} attribute"));
                }
                if lower.starts_with("javascript:") {
                    findings
                        .script
                        .get_or_insert_with(|| "javascript: URL".into());
                }
                if name == "href" && is_external(&lower) {
                    findings
                        .external_reference
                        .get_or_insert_with(|| value.to_owned());
                }
                if lower.starts_with("data:") {
                    findings.data_uri.get_or_insert_with(|| value.to_owned());
                }
                if name == "style" {
                    findings.scan_css(value);
                }
            }
        }
        findings
    }

    /// `url(..)` and `@import` targets inside stylesheet text.
    fn scan_css(&mut self, css: &str) {
        if self.external_reference.is_none() {
            self.external_reference = capture(&EXTERNAL_REFERENCE, css);
        }
        if self.data_uri.is_none() {
            self.data_uri = capture(&DATA_URI, css);
        }
    }

    fn from_text(text: &str) -> Self {
        Findings {
            script: SCRIPT_MARKER
                .find(text)
                .map(|m| m.as_str().trim().to_owned()),
            external_reference: capture(&EXTERNAL_REFERENCE, text),
            data_uri: capture(&DATA_URI, text),
        }
    }

    fn into_advisories(self) -> Vec<Advisory> {
        let mut advisories = Vec::new();
        if let Some(marker) = self.script {
            advisories.push(Advisory::new(format!(
                "vector image contains executable script ({marker})"
            )));
        }
        if let Some(target) = self.external_reference {
            advisories.push(Advisory::new(format!(
                "vector image references an external resource ({target})"
            )));
        }
        if let Some(uri) = self.data_uri {
            advisories.push(Advisory::new(format!(
                "vector image embeds a data URI ({})",
                data_uri_media_type(&uri)
            )));
        }
        advisories
    }
}

fn capture(pattern: &regex::Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_owned())
}

fn is_external(lower: &str) -> bool {
    lower.starts_with("http:") || lower.starts_with("https:") || lower.starts_with("//")
}

fn data_uri_media_type(uri: &str) -> String {
    match data_url::DataUrl::process(uri) {
        Ok(url) => {
            let mime = url.mime_type();
            format!("{}/{}", mime.type_, mime.subtype)
        }
        Err(_) => "unparsable".into(),
    }
}

fn scan_markup(body: &[u8]) -> Result<Vec<Advisory>, Advisory> {
    let text = std::str::from_utf8(body).map_err(|error| {
        Advisory::new(format!("could not decode vector image as text: {error}"))
    })?;
    match roxmltree::Document::parse(text) {
        Ok(doc) => Ok(Findings::from_tree(&doc).into_advisories()),
        Err(error) => {
            debug!(%error, "vector image is not well-formed, scanning raw text");
            let mut advisories = vec![Advisory::new(format!(
                "vector image is not well-formed XML: {error}"
            ))];
            advisories.extend(Findings::from_text(text).into_advisories());
            Ok(advisories)
        }
    }
}

/// Scans vector content and returns every advisory it raises.
pub fn inspect(body: &[u8], config: &ValidationConfig) -> Vec<Advisory> {
    let mut advisories = Vec::new();
    if body.len() as u64 > config.vector_outlier_bytes() {
        advisories.push(Advisory::new(format!(
            "vector image is unusually large ({} bytes)",
            body.len()
        )));
    }
    match scan_markup(body) {
        Ok(found) => advisories.extend(found),
        Err(advisory) => advisories.push(advisory),
    }
    advisories
}
