//! Pipeline stages for one conversion request.
//!
//! Each submodule implements exactly one step, so each can be tested without
//! the others (the filename rules, for instance, never need a server).
//!
//! ## Data Flow
//!
//! ```text
//! request ──▶ response ──▶ filename ──▶ save
//! (POST JSON)  (classify)   (derive)     (scoped temp file → rename)
//! ```
//!
//! 1. [`request`]  serialise the form and POST it; the only stage that
//!    opens a connection
//! 2. [`response`] read the body, map non-2xx to the service's message
//! 3. [`filename`] `Content-Disposition` or `cifra.<format>`, sanitized
//! 4. [`save`]     stage to a temp file and commit exactly once

pub mod filename;
pub mod request;
pub mod response;
pub mod save;
