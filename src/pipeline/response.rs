//! Response stage: turn an HTTP response into an artifact or an error.
//!
//! | Status | Body | Result |
//! |--------|------|--------|
//! | 2xx | non-empty bytes | [`GeneratedArtifact`] |
//! | 2xx | empty | [`CifraError::EmptyDocument`] |
//! | other | JSON with `error` string | [`CifraError::Service`] with that message |
//! | other | JSON without it | [`CifraError::Service`] with [`DEFAULT_SERVICE_ERROR`] |
//! | other | not JSON | [`CifraError::MalformedFailureBody`] |

use super::filename::derive_filename;
use super::request::transport_error;
use crate::config::OutputFormat;
use crate::error::{CifraError, DEFAULT_SERVICE_ERROR};
use crate::output::GeneratedArtifact;
use reqwest::header::{HeaderValue, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::Url;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Read `response` to completion and classify it.
pub async fn into_artifact(
    response: reqwest::Response,
    endpoint: &Url,
    format: OutputFormat,
    timeout: Option<Duration>,
) -> Result<GeneratedArtifact, CifraError> {
    let status = response.status();
    let headers = response.headers().clone();
    debug!("HTTP {} from {} ({:?})", status, endpoint, headers);

    let body = response
        .bytes()
        .await
        .map_err(|e| transport_error(endpoint, timeout, e))?;

    if !status.is_success() {
        let err = failure_error(status.as_u16(), &body);
        warn!("Generation failed with HTTP {}: {}", status.as_u16(), err);
        return Err(err);
    }

    if body.is_empty() {
        return Err(CifraError::EmptyDocument {
            status: status.as_u16(),
        });
    }

    let content_disposition = headers.get(CONTENT_DISPOSITION).map(header_text);
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let (filename, filename_source) = derive_filename(content_disposition.as_deref(), format);

    info!(
        "Received {} bytes as '{}' ({:?})",
        body.len(),
        filename,
        filename_source
    );

    Ok(GeneratedArtifact {
        bytes: body.to_vec(),
        filename,
        filename_source,
        format,
        content_type,
    })
}

/// Header value as text. Raw non-ASCII bytes are read as UTF-8 when valid,
/// else as ISO-8859-1, rather than dropping the header.
fn header_text(value: &HeaderValue) -> String {
    if let Ok(s) = value.to_str() {
        return s.to_string();
    }
    debug!("Content-Disposition carries raw non-ASCII bytes: {:?}", value);
    let bytes = value.as_bytes();
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Build the error for a non-2xx response body.
pub fn failure_error(status: u16, body: &[u8]) -> CifraError {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value) => CifraError::Service {
            status,
            message: service_message(&value),
        },
        Err(e) => CifraError::MalformedFailureBody {
            status,
            detail: e.to_string(),
        },
    }
}

/// The `error` field of a failure body, or the fallback message.
///
/// Missing, `null`, empty, `false` and zero values use
/// [`DEFAULT_SERVICE_ERROR`]; other non-string values are rendered as JSON.
fn service_message(value: &serde_json::Value) -> String {
    use serde_json::Value;

    match value.get("error") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        None | Some(Value::Null) | Some(Value::String(_)) | Some(Value::Bool(false)) => {
            DEFAULT_SERVICE_ERROR.to_string()
        }
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => DEFAULT_SERVICE_ERROR.to_string(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::output::FilenameSource;

    #[test]
    fn error_field_is_the_message() {
        let e = failure_error(400, br#"{"error": "URL is required"}"#);
        assert_eq!(e.to_string(), "URL is required");
        assert_eq!(e.status(), Some(400));
    }

    #[test]
    fn missing_error_field_uses_fallback() {
        let e = failure_error(500, br#"{"detail": "boom"}"#);
        assert_eq!(e.to_string(), DEFAULT_SERVICE_ERROR);
        assert_eq!(e.kind(), ErrorKind::Service);
    }

    #[test]
    fn empty_or_null_error_uses_fallback() {
        assert_eq!(
            failure_error(500, br#"{"error": ""}"#).to_string(),
            DEFAULT_SERVICE_ERROR
        );
        assert_eq!(
            failure_error(500, br#"{"error": null}"#).to_string(),
            DEFAULT_SERVICE_ERROR
        );
    }

    #[test]
    fn non_object_json_uses_fallback() {
        let e = failure_error(503, b"[1, 2, 3]");
        assert_eq!(e.to_string(), DEFAULT_SERVICE_ERROR);
    }

    #[test]
    fn non_string_error_is_rendered() {
        let e = failure_error(500, br#"{"error": 42}"#);
        assert_eq!(e.to_string(), "42");
    }

    #[test]
    fn html_body_is_malformed() {
        let e = failure_error(502, b"<html><body>Bad Gateway</body></html>");
        assert_eq!(e.kind(), ErrorKind::MalformedResponse);
        assert!(e.to_string().contains("502"));
    }

    #[test]
    fn empty_failure_body_is_malformed() {
        let e = failure_error(500, b"");
        assert_eq!(e.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn raw_utf8_header_is_kept() {
        let value =
            HeaderValue::from_bytes("attachment; filename=\"Canção.pdf\"".as_bytes()).unwrap();
        assert!(value.to_str().is_err());
        let (name, src) = derive_filename(Some(&header_text(&value)), OutputFormat::Pdf);
        assert_eq!(name, "Canção.pdf");
        assert_eq!(src, FilenameSource::Header);
    }

    #[test]
    fn raw_latin1_header_is_kept() {
        let value = HeaderValue::from_bytes(b"attachment; filename=\"Can\xe7\xe3o.pdf\"").unwrap();
        let (name, _) = derive_filename(Some(&header_text(&value)), OutputFormat::Pdf);
        assert_eq!(name, "Canção.pdf");
    }
}
