//! Observer trait for submission events.
//!
//! Inject an [`ObserverRef`] via
//! [`crate::config::ClientConfigBuilder::observer`] to follow a
//! [`crate::session::ConversionForm`] through its phases. The CLI uses this
//! to drive its spinner; tests use it to check when `loading` is set.
//!
//! # Example
//!
//! ```rust
//! use cifra_client::{ClientConfig, ObserverRef, RequestState, SubmissionObserver};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingObserver {
//!     settled: AtomicUsize,
//! }
//!
//! impl SubmissionObserver for CountingObserver {
//!     fn on_settled(&self, _state: &RequestState) {
//!         self.settled.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let observer = Arc::new(CountingObserver { settled: AtomicUsize::new(0) });
//! let config = ClientConfig::builder()
//!     .observer(observer as ObserverRef)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::ErrorKind;
use crate::form::FormState;
use crate::output::SavedDownload;
use crate::session::RequestState;
use std::sync::Arc;

/// Called by [`crate::session::ConversionForm::submit`] at each transition.
///
/// Every method has a no-op default. For one accepted submission the order
/// is always `on_submit_start`, then exactly one of `on_download_triggered`
/// or `on_error`, then `on_settled`. A submission rejected by validation
/// produces no events.
pub trait SubmissionObserver: Send + Sync {
    /// The request is about to be sent; `state.loading` is true.
    fn on_submit_start(&self, form: &FormState, state: &RequestState) {
        let _ = (form, state);
    }

    /// The document was saved.
    fn on_download_triggered(&self, download: &SavedDownload) {
        let _ = download;
    }

    /// The submission failed; `message` is what the error panel shows.
    fn on_error(&self, kind: ErrorKind, message: &str) {
        let _ = (kind, message);
    }

    /// The submission settled; `state.loading` is false again.
    fn on_settled(&self, state: &RequestState) {
        let _ = state;
    }
}

/// A no-op implementation for callers that don't need events.
pub struct NoopObserver;

impl SubmissionObserver for NoopObserver {}

/// Shared observer handle stored in [`crate::config::ClientConfig`].
pub type ObserverRef = Arc<dyn SubmissionObserver>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Tracking {
        starts: AtomicUsize,
        errors: AtomicUsize,
        settled: AtomicUsize,
    }

    impl SubmissionObserver for Tracking {
        fn on_submit_start(&self, _form: &FormState, state: &RequestState) {
            assert!(state.loading);
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_error(&self, _kind: ErrorKind, _message: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_settled(&self, state: &RequestState) {
            assert!(!state.loading);
            self.settled.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_observer_does_not_panic() {
        let o = NoopObserver;
        let form = FormState::new("https://x.test/", OutputFormat::Pdf);
        o.on_submit_start(&form, &RequestState::default());
        o.on_error(ErrorKind::Service, "boom");
        o.on_settled(&RequestState::default());
    }

    #[test]
    fn tracking_observer_receives_events() {
        let t = Tracking::default();
        let form = FormState::new("https://x.test/", OutputFormat::Docx);
        let loading = RequestState {
            loading: true,
            error: None,
        };
        t.on_submit_start(&form, &loading);
        t.on_error(ErrorKind::Transport, "connection refused");
        t.on_settled(&RequestState {
            loading: false,
            error: Some("connection refused".into()),
        });
        assert_eq!(t.starts.load(Ordering::SeqCst), 1);
        assert_eq!(t.errors.load(Ordering::SeqCst), 1);
        assert_eq!(t.settled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_observer_works() {
        let o: ObserverRef = Arc::new(NoopObserver);
        o.on_settled(&RequestState::default());
    }
}
