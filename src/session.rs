//! The conversion request form as a state machine.
//!
//! ```text
//!          submit (valid)                  saved
//!  Idle ─────────────────▶ Submitting ─────────────▶ DownloadTriggered ──▶ Idle
//!   ▲  \                        │         failed
//!   │   └─ submit (invalid):    └────────────────▶ ErrorShown ──────────▶ Idle
//!   │      rejected, no state change
//! ```
//!
//! [`ConversionForm`] owns the form values and the [`RequestState`] the UI
//! renders (`loading` spinner, error panel). Only the last values typed and
//! the last error survive a submission. `submit` takes `&mut self`, so a
//! form cannot have two submissions outstanding; the underlying client
//! rejects overlap across forms that share it.

use crate::client::GenerateClient;
use crate::config::OutputFormat;
use crate::error::CifraError;
use crate::form::FormState;
use crate::output::SavedDownload;
use crate::pipeline::save::{DirectorySink, DownloadSink};
use crate::progress::{ObserverRef, SubmissionObserver};
use serde::Serialize;
use tracing::debug;

/// What the form shows besides its inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestState {
    /// True from submit until the submission settles.
    pub loading: bool,
    /// Message of the last failed submission; cleared on the next submit.
    pub error: Option<String>,
}

impl RequestState {
    /// Whether the submit control is interactive.
    pub fn submit_enabled(&self) -> bool {
        !self.loading
    }
}

/// A conversion request form bound to a client and a download destination.
pub struct ConversionForm {
    client: GenerateClient,
    sink: Box<dyn DownloadSink>,
    form: FormState,
    state: RequestState,
}

impl ConversionForm {
    /// Form that saves into the client's configured output directory.
    pub fn new(client: GenerateClient) -> Self {
        let sink = DirectorySink::from_config(client.config());
        Self::with_sink(client, sink)
    }

    pub fn with_sink(client: GenerateClient, sink: impl DownloadSink + 'static) -> Self {
        Self {
            client,
            sink: Box::new(sink),
            form: FormState::default(),
            state: RequestState::default(),
        }
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    pub fn client(&self) -> &GenerateClient {
        &self.client
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.form.set_url(url);
    }

    pub fn set_format(&mut self, format: OutputFormat) {
        self.form.set_format(format);
    }

    /// Replace both inputs at once.
    pub fn set_form(&mut self, form: FormState) {
        self.form = form;
    }

    pub fn submit_enabled(&self) -> bool {
        self.state.submit_enabled()
    }

    /// Submit the current form values.
    ///
    /// An invalid URL is rejected before anything happens: no request, no
    /// loading transition, and the previous error stays on display. Any
    /// other failure is stored in [`RequestState::error`] and also returned.
    /// `loading` is cleared when the submission settles, including when the
    /// returned future is dropped mid-flight.
    pub async fn submit(&mut self) -> Result<SavedDownload, CifraError> {
        self.form.validate()?;

        let observer = self.client.config().observer.clone();
        let Self {
            client,
            sink,
            form,
            state,
        } = &mut *self;

        let settle = Settle::begin(state);
        notify(&observer, |o| o.on_submit_start(&*form, &*settle.state));

        let result = client.generate_into(&*form, &**sink).await;

        match &result {
            Ok(saved) => {
                debug!("Download triggered: {}", saved.path.display());
                notify(&observer, |o| o.on_download_triggered(saved));
            }
            Err(e) => {
                let message = e.to_string();
                debug!("Showing error: {}", message);
                notify(&observer, |o| o.on_error(e.kind(), &message));
                settle.state.error = Some(message);
            }
        }
        drop(settle);

        notify(&observer, |o| o.on_settled(&self.state));
        result
    }
}

fn notify(observer: &Option<ObserverRef>, f: impl FnOnce(&dyn SubmissionObserver)) {
    if let Some(o) = observer {
        f(o.as_ref());
    }
}

/// Sets `loading` for its lifetime and clears it on drop.
struct Settle<'a> {
    state: &'a mut RequestState,
}

impl<'a> Settle<'a> {
    fn begin(state: &'a mut RequestState) -> Self {
        state.loading = true;
        state.error = None;
        Self { state }
    }
}

impl Drop for Settle<'_> {
    fn drop(&mut self) {
        self.state.loading = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::error::ErrorKind;

    fn form() -> ConversionForm {
        ConversionForm::new(GenerateClient::new(ClientConfig::default()).unwrap())
    }

    #[test]
    fn starts_idle_with_pdf() {
        let f = form();
        assert_eq!(f.state(), &RequestState::default());
        assert!(f.submit_enabled());
        assert_eq!(f.form().format, OutputFormat::Pdf);
    }

    #[test]
    fn settle_guard_clears_loading() {
        let mut state = RequestState {
            loading: false,
            error: Some("old".into()),
        };
        {
            let settle = Settle::begin(&mut state);
            assert!(settle.state.loading);
            assert!(settle.state.error.is_none());
            assert!(!settle.state.submit_enabled());
        }
        assert!(!state.loading);
        assert!(state.submit_enabled());
    }

    #[test]
    fn invalid_submit_leaves_state_untouched() {
        let mut f = form();
        f.state.error = Some("previous failure".into());
        f.set_url("not a url");

        let err = tokio_test::block_on(f.submit()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!f.state().loading);
        assert_eq!(f.state().error.as_deref(), Some("previous failure"));
    }

    #[test]
    fn inputs_persist() {
        let mut f = form();
        f.set_url("https://www.cifraclub.com.br/a/b/");
        f.set_format(OutputFormat::Docx);
        assert_eq!(f.form().url, "https://www.cifraclub.com.br/a/b/");
        assert_eq!(f.form().format, OutputFormat::Docx);
    }
}
