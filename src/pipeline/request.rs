//! Request stage: POST the form as JSON to the generation endpoint.

use crate::config::OutputFormat;
use crate::error::CifraError;
use crate::form::FormState;
use reqwest::Url;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// JSON body of a generation request. Exactly `{url, format}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateRequest<'a> {
    pub url: &'a str,
    pub format: OutputFormat,
}

impl<'a> From<&'a FormState> for GenerateRequest<'a> {
    fn from(form: &'a FormState) -> Self {
        Self {
            url: &form.url,
            format: form.format,
        }
    }
}

/// Send one generation request and return the raw response.
///
/// Any HTTP status counts as a response here; classifying it is the
/// [`super::response`] stage's job. Only failures to get a response at all
/// are errors.
pub async fn send(
    http: &reqwest::Client,
    endpoint: &Url,
    form: &FormState,
    timeout: Option<Duration>,
) -> Result<reqwest::Response, CifraError> {
    let body = GenerateRequest::from(form);
    debug!("POST {} format={} url={}", endpoint, body.format, body.url);

    // `.json()` sets `Content-Type: application/json`.
    let mut request = http.post(endpoint.clone()).json(&body);
    if let Some(t) = timeout {
        request = request.timeout(t);
    }

    request
        .send()
        .await
        .map_err(|e| transport_error(endpoint, timeout, e))
}

/// Map a reqwest failure onto the transport variants.
pub(crate) fn transport_error(
    endpoint: &Url,
    timeout: Option<Duration>,
    e: reqwest::Error,
) -> CifraError {
    match timeout {
        Some(t) if e.is_timeout() => CifraError::Timeout {
            endpoint: endpoint.to_string(),
            millis: t.as_millis() as u64,
        },
        _ => CifraError::Transport {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        },
    }
}
