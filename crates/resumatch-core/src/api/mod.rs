//! Typed wrappers over the backend's REST endpoints.
//!
//! Authenticated endpoints rely on the client's default header; none of
//! them take a token argument.

pub mod account;
pub mod auth;
pub mod matching;
pub mod profile;

use std::path::Path;

use reqwest::multipart::Part;
use reqwest::RequestBuilder;
use serde::Deserialize;

use crate::error::{CoreError, Result, TransportError, ValidationError};
use crate::http::ApiClient;

/// A file to send as one multipart field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self { file_name, bytes })
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// MIME type guessed from the extension.
    pub fn mime_type(&self) -> &'static str {
        let ext = Path::new(&self.file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => "application/pdf",
            "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "doc" => "application/msword",
            "txt" => "text/plain",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "webp" => "image/webp",
            _ => "application/octet-stream",
        }
    }

    pub(crate) fn into_part(self) -> Result<Part> {
        let mime = self.mime_type();
        Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(mime)
            .map_err(CoreError::from)
    }
}

/// Generic `{ok, message}` acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Ack {
    #[serde(default = "default_ok")]
    pub ok: bool,
    #[serde(default)]
    pub message: Option<String>,
}

fn default_ok() -> bool {
    true
}

impl Default for Ack {
    fn default() -> Self {
        Self {
            ok: true,
            message: None,
        }
    }
}

/// Send and accept an empty body, a bare JSON string, or `{ok, message}`.
/// `"ok": false` and bodies that are not JSON fail.
pub(crate) async fn send_ack(client: &ApiClient, request: RequestBuilder) -> Result<Ack> {
    let response = client.send(request).await?;
    let bytes = response.bytes().await?;
    parse_ack(&bytes)
}

fn parse_ack(bytes: &[u8]) -> Result<Ack> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Ack::default());
    }
    let decode = |e: serde_json::Error| TransportError::Decode(e.to_string());
    let ack = match serde_json::from_slice(bytes).map_err(decode)? {
        serde_json::Value::String(message) => Ack {
            ok: true,
            message: Some(message),
        },
        value @ serde_json::Value::Object(_) => serde_json::from_value(value).map_err(decode)?,
        _ => Ack::default(),
    };
    if !ack.ok {
        let message = ack
            .message
            .unwrap_or_else(|| "the backend reported a failure".to_string());
        return Err(TransportError::Rejected(message).into());
    }
    Ok(ack)
}

pub(crate) fn require(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field.to_string()))
    } else {
        Ok(())
    }
}
