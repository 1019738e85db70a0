#![deny(missing_docs)]

//! Core library for the document summarizer server.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Persistent provider credential storage.
pub mod credentials;
/// Text extraction from uploaded documents.
pub mod extraction;
/// Structured logging and tracing setup.
pub mod logging;
/// Summarization metrics helpers.
pub mod metrics;
/// Hosted summarization provider clients.
pub mod providers;
/// PDF and Word rendering of summaries.
pub mod rendering;
/// Request orchestration from input to rendered download.
pub mod summarize;
