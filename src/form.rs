//! The two user inputs of a conversion request.
//!
//! [`FormState`] mirrors what a user types into the form: a cifra URL and
//! one of two output formats. Validation is deliberately shallow (non-empty,
//! absolute URL); whether the page is actually a cifra is the service's call.

use crate::config::OutputFormat;
use crate::error::CifraError;
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Current form values. Persist across submissions; never reset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FormState {
    pub url: String,
    pub format: OutputFormat,
}

impl FormState {
    pub fn new(url: impl Into<String>, format: OutputFormat) -> Self {
        let mut form = Self {
            url: String::new(),
            format,
        };
        form.set_url(url);
        form
    }

    /// Replace the URL. Surrounding whitespace is stripped, as a URL input does.
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into().trim().to_string();
    }

    pub fn set_format(&mut self, format: OutputFormat) {
        self.format = format;
    }

    /// Ask the service to transpose to the key at `index`.
    ///
    /// The service reads `key=<index>` from the URL fragment; any existing
    /// fragment is replaced.
    pub fn with_key(mut self, index: u32) -> Self {
        let base = self.url.split('#').next().unwrap_or_default();
        self.url = format!("{base}#key={index}");
        self
    }

    /// Key index carried in the URL fragment, if any.
    pub fn key(&self) -> Option<u32> {
        let (_, fragment) = self.url.split_once('#')?;
        fragment
            .split('&')
            .find_map(|param| param.strip_prefix("key="))
            .and_then(|v| v.parse().ok())
    }

    /// Check the URL the way a `required` URL input would.
    ///
    /// Returns the parsed URL; the string sent to the service is still
    /// [`FormState::url`] as entered.
    pub fn validate(&self) -> Result<Url, CifraError> {
        if self.url.is_empty() {
            return Err(CifraError::MissingUrl);
        }
        Url::parse(&self.url).map_err(|e| CifraError::InvalidUrl {
            input: self.url.clone(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn default_format_is_pdf() {
        let form = FormState::default();
        assert_eq!(form.format, OutputFormat::Pdf);
        assert!(form.url.is_empty());
    }

    #[test]
    fn url_is_trimmed() {
        let form = FormState::new("  https://www.cifraclub.com.br/a/b/\n", OutputFormat::Pdf);
        assert_eq!(form.url, "https://www.cifraclub.com.br/a/b/");
    }

    #[test]
    fn empty_url_is_rejected() {
        let err = FormState::new("   ", OutputFormat::Docx).validate().unwrap_err();
        assert!(matches!(err, CifraError::MissingUrl));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn relative_url_is_rejected() {
        let err = FormState::new("cifraclub.com.br/x", OutputFormat::Pdf)
            .validate()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn absolute_url_is_accepted() {
        let url = FormState::new(
            "https://www.cifraclub.com.br/isaias-saad/bondade-de-deus/",
            OutputFormat::Pdf,
        )
        .validate()
        .unwrap();
        assert_eq!(url.host_str(), Some("www.cifraclub.com.br"));
    }

    #[test]
    fn with_key_replaces_fragment() {
        let form = FormState::new(
            "https://www.cifraclub.com.br/livres-para-adorar/liberdade/#google_vignette=true",
            OutputFormat::Pdf,
        )
        .with_key(5);
        assert_eq!(
            form.url,
            "https://www.cifraclub.com.br/livres-para-adorar/liberdade/#key=5"
        );
        assert_eq!(form.key(), Some(5));
    }

    #[test]
    fn key_is_read_among_other_params() {
        let form = FormState::new("https://x.test/song/#a=1&key=3", OutputFormat::Pdf);
        assert_eq!(form.key(), Some(3));
        let form = FormState::new("https://x.test/song/", OutputFormat::Pdf);
        assert_eq!(form.key(), None);
    }
}
