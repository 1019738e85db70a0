//! Request orchestration: input selection, extraction, provider dispatch, and rendering.
//!
//! A request moves through `receive → extract → validate length → select provider →
//! summarize → render → respond`, stopping at the first failure. Every failure is reported as
//! a [`SummarizeError`] whose [`ErrorKind`] is stable across releases.

mod service;
mod types;
mod workspace;

pub use service::{SummarizeApi, SummarizeService};
pub use types::{
    AddProviderRequest, ErrorKind, ErrorReport, HealthSnapshot, INPUT_PRECEDENCE,
    InputPrecedence, MAX_UPLOAD_BYTES, RenderedFile, SummarizeError, SummarizeRequest,
    SummaryOutcome, UploadedDocument,
};
pub use workspace::{StagedUpload, Workspace};
