use serde::Deserialize;
use tracing::debug;

use super::ImageUpload;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    #[error("upload rejected. status: {code}, message: {message}")]
    Fail {
        code: reqwest::StatusCode,
        message: String,
    },
    #[error("missing stored path. status: {code}")]
    MissingPath { code: reqwest::StatusCode },
}

#[derive(Deserialize, Debug)]
struct Response {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Client for the REST upload endpoint of the content backend.
pub struct Client {
    endpoint: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl Client {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token,
            client: reqwest::Client::new(),
        }
    }
}

impl super::Client for Client {
    type Error = Error;

    async fn put(&self, upload: ImageUpload) -> Result<String, Self::Error> {
        let endpoint = format!("{}/upload", self.endpoint.trim_end_matches('/'));
        let part = reqwest::multipart::Part::bytes(upload.body.to_vec())
            .file_name(upload.file_name)
            .mime_str(&upload.content_type)
            .map_err(Error::Transport)?;
        let form = reqwest::multipart::Form::new()
            .part("image", part)
            .text("type", upload.kind.as_str());

        let request = self.client.post(&endpoint).multipart(form);
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await.map_err(Error::Transport)?;
        let code = response.status();
        let body = response.bytes().await.map_err(Error::Transport)?;
        let response = serde_json::from_slice::<Response>(&body).map_err(|error| {
            debug!(%code, %error, "upload response is not JSON");
            Error::Fail {
                code,
                message: String::from_utf8_lossy(&body).trim().to_owned(),
            }
        })?;
        debug!(%code, ?response, "upload response");

        if !code.is_success() || !response.success {
            return Err(Error::Fail {
                code,
                message: response.error.unwrap_or_default(),
            });
        }
        response
            .path
            .filter(|path| !path.is_empty())
            .ok_or(Error::MissingPath { code })
    }
}
