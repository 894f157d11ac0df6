//! Configuration types for talking to the cifra generation service.
//!
//! Everything that is not part of the form itself (where the service lives,
//! how long to wait, where documents land) is kept in [`ClientConfig`],
//! built via its [`ClientConfigBuilder`]. The form only ever holds the two
//! user inputs; see [`crate::form::FormState`].

use crate::error::CifraError;
use crate::progress::ObserverRef;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Base URL of the original development server.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5328";

/// Path of the generation endpoint, relative to the base URL.
pub const DEFAULT_ENDPOINT_PATH: &str = "/api/generate";

/// Configuration for a [`crate::client::GenerateClient`].
///
/// # Example
/// ```rust
/// use cifra_client::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("https://cifras.example.com")
///     .timeout_secs(30)
///     .output_dir("downloads")
///     .build()
///     .unwrap();
/// assert_eq!(
///     config.endpoint_url().unwrap().as_str(),
///     "https://cifras.example.com/api/generate"
/// );
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// Scheme, host and port of the generation service. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Endpoint path joined onto `base_url`. Default: [`DEFAULT_ENDPOINT_PATH`].
    pub endpoint_path: String,

    /// Whole-request timeout. Default: none.
    ///
    /// The service renders documents synchronously and there is no upper
    /// bound on how long that takes, so by default a slow backend simply
    /// keeps the submission pending.
    pub timeout: Option<Duration>,

    /// `User-Agent` header sent with every request.
    pub user_agent: String,

    /// Directory downloaded documents are saved into. Default: current directory.
    pub output_dir: PathBuf,

    /// Replace an existing file instead of picking `name (1).ext`. Default: false.
    pub overwrite: bool,

    /// Receives phase changes from [`crate::session::ConversionForm`].
    pub observer: Option<ObserverRef>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            endpoint_path: DEFAULT_ENDPOINT_PATH.to_string(),
            timeout: None,
            user_agent: concat!("cifra-client/", env!("CARGO_PKG_VERSION")).to_string(),
            output_dir: PathBuf::from("."),
            overwrite: false,
            observer: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("endpoint_path", &self.endpoint_path)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .field("output_dir", &self.output_dir)
            .field("overwrite", &self.overwrite)
            .field(
                "observer",
                &self.observer.as_ref().map(|_| "<dyn SubmissionObserver>"),
            )
            .finish()
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// The full URL submissions are POSTed to.
    ///
    /// `endpoint_path` is appended to any path already on `base_url`, so a
    /// service mounted under `https://host/prefix` is reached at
    /// `https://host/prefix/api/generate`.
    pub fn endpoint_url(&self) -> Result<Url, CifraError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            CifraError::InvalidConfig(format!("base URL '{}': {}", self.base_url, e))
        })?;
        if url.cannot_be_a_base() {
            return Err(CifraError::InvalidConfig(format!(
                "base URL '{}' cannot carry a path",
                self.base_url
            )));
        }
        let prefix = url.path().trim_end_matches('/').to_string();
        let path = self.endpoint_path.trim_start_matches('/');
        url.set_path(&format!("{prefix}/{path}"));
        Ok(url)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn endpoint_path(mut self, path: impl Into<String>) -> Self {
        self.config.endpoint_path = path.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Convenience over [`Self::timeout`]; `0` disables the timeout.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn overwrite(mut self, v: bool) -> Self {
        self.config.overwrite = v;
        self
    }

    pub fn observer(mut self, observer: ObserverRef) -> Self {
        self.config.observer = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, CifraError> {
        let c = &self.config;
        if !c.endpoint_path.starts_with('/') {
            return Err(CifraError::InvalidConfig(format!(
                "endpoint path must start with '/', got '{}'",
                c.endpoint_path
            )));
        }
        let url = c.endpoint_url()?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CifraError::InvalidConfig(format!(
                "base URL must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if c.timeout == Some(Duration::ZERO) {
            return Err(CifraError::InvalidConfig("timeout must be > 0".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Document format requested from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Portable Document Format. (default)
    #[default]
    Pdf,
    /// Office Open XML word-processing document.
    Docx,
}

impl OutputFormat {
    /// Every format the service can produce, in submission order.
    pub const ALL: [OutputFormat; 2] = [OutputFormat::Pdf, OutputFormat::Docx];

    /// Wire value and file extension.
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Docx => "docx",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = CifraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(OutputFormat::Pdf),
            "docx" => Ok(OutputFormat::Docx),
            other => Err(CifraError::InvalidConfig(format!(
                "unknown format '{other}' (expected pdf or docx)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoint() {
        let c = ClientConfig::default();
        assert_eq!(
            c.endpoint_url().unwrap().as_str(),
            "http://127.0.0.1:5328/api/generate"
        );
        assert!(c.timeout.is_none());
        assert!(!c.overwrite);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let c = ClientConfig::builder()
            .base_url("https://example.com/")
            .build()
            .unwrap();
        assert_eq!(
            c.endpoint_url().unwrap().as_str(),
            "https://example.com/api/generate"
        );
    }

    #[test]
    fn base_url_path_prefix_is_kept() {
        let c = ClientConfig::builder()
            .base_url("https://host.example/prefix/")
            .build()
            .unwrap();
        assert_eq!(
            c.endpoint_url().unwrap().as_str(),
            "https://host.example/prefix/api/generate"
        );
    }

    #[test]
    fn rejects_relative_endpoint_path() {
        let err = ClientConfig::builder()
            .endpoint_path("api/generate")
            .build()
            .unwrap_err();
        assert!(matches!(err, CifraError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_non_http_base() {
        let err = ClientConfig::builder()
            .base_url("ftp://example.com")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("ftp"));
    }

    #[test]
    fn rejects_unparseable_base() {
        assert!(ClientConfig::builder().base_url("not a url").build().is_err());
    }

    #[test]
    fn timeout_secs_zero_disables() {
        let c = ClientConfig::builder().timeout_secs(0).build().unwrap();
        assert!(c.timeout.is_none());
        let c = ClientConfig::builder().timeout_secs(5).build().unwrap();
        assert_eq!(c.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn format_parse_and_display() {
        assert_eq!("PDF".parse::<OutputFormat>().unwrap(), OutputFormat::Pdf);
        assert_eq!(" docx ".parse::<OutputFormat>().unwrap(), OutputFormat::Docx);
        assert!("odt".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Docx.to_string(), "docx");
        assert_eq!(OutputFormat::default(), OutputFormat::Pdf);
    }

    #[test]
    fn format_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&OutputFormat::Pdf).unwrap(), "\"pdf\"");
        let f: OutputFormat = serde_json::from_str("\"docx\"").unwrap();
        assert_eq!(f, OutputFormat::Docx);
    }
}
