//! # Sajkit
//!
//! Sajkit is a small toolkit for scripts and services that talk to AWS.
//! It does not hide the SDK. Instead it puts a strongly typed contract in
//! front of the few calls that need reshaping before or after they hit the
//! wire:
//!
//! - **Invocation**: a Lambda payload may arrive as structured JSON, as
//!   plain text, as a `file://` reference or as raw bytes. [`payload`]
//!   normalizes all of them into one [`payload::InvocationRequest`] whose
//!   body is always bytes, and [`invoke`] sends it through an
//!   [`invoke::Invoker`].
//! - **Parameters**: SSM answers a lookup by name with a single response
//!   (plus a list of names it could not resolve) and a lookup by path with a
//!   lazy sequence of pages. [`params`] folds either shape into a flat
//!   [`params::ParameterMap`].
//! - **Metrics**: [`metrics`] builds CloudWatch metric data stamped at call
//!   time and publishes it through a [`metrics::MetricSink`].
//!
//! For the hosts these scripts provision, [`template`] renders Jinja
//! configuration files, [`process`] runs commands and scripts with a fixed
//! environment and timeout, and [`utils`] backs files up and reads the
//! machine role.
//!
//! The vendor clients live behind traits so the normalization logic can be
//! exercised without a network. Implementations for the real SDK clients
//! are in [`aws`].
//!
//! ## Logging
//!
//! The library only emits through the `log` facade. Initializing a logger is
//! left to the hosting binary.
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`Result`] with the crate-wide [`Error`].
//! Use [`Error::kind`] to branch on the category of failure. Errors coming
//! back from AWS are carried as a structured [`remote::RemoteError`] which
//! keeps the vendor error code, message and HTTP status.

pub mod aws;
pub mod invoke;
pub mod metrics;
pub mod params;
pub mod payload;
pub mod process;
pub mod remote;
pub mod template;
#[cfg(test)]
mod test;
pub mod utils;

use remote::{RemoteError, RemoteKind};

/// Top-level error enum that encompasses all errors.
#[derive(snafu::Snafu, Debug)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Invalid request: {msg}"))]
    InvalidRequest { msg: String },

    #[snafu(display("Could not serialize payload: {source}"))]
    Serialize { source: serde_json::Error },

    #[snafu(display("Could not decode response payload as JSON: {source}"))]
    Decode { source: serde_json::Error },

    #[snafu(display("Could not parse JSON from file '{path:?}': {source}"))]
    FileContent {
        path: std::path::PathBuf,
        source: serde_json::Error,
    },

    #[snafu(display("Could not decode log tail: {source}"))]
    LogTail { source: data_encoding::DecodeError },

    #[snafu(display("File '{path:?}' not found or inaccessible: {source}"))]
    ResourceNotFound {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Could not back up '{from:?}' to '{to:?}': {source}"))]
    Backup {
        from: std::path::PathBuf,
        to: std::path::PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Could not write '{path:?}': {source}"))]
    WriteFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Could not render template '{path:?}': {source}"))]
    Template {
        path: std::path::PathBuf,
        source: minijinja::Error,
    },

    #[snafu(display("Could not start '{program}': {source}"))]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[snafu(display("Lost track of '{program}' while waiting for it: {source}"))]
    Wait {
        program: String,
        source: std::io::Error,
    },

    #[snafu(display("'{program}' did not finish within {after:?}"))]
    Timeout {
        program: String,
        after: std::time::Duration,
    },

    #[snafu(display("Parameter record is missing its {missing}"))]
    MalformedRecord { missing: &'static str },

    #[snafu(display(
        "There were '{count}' invalid parameter(s): {names:?} are either malformed or do not exist"
    ))]
    PartialLookup { count: usize, names: Vec<String> },

    #[snafu(display("Error when paginating response: {source}"))]
    Lookup { source: RemoteError },

    #[snafu(display("{source}"))]
    Remote { source: RemoteError },
}

/// The category of an [`Error`], independent of the details it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller supplied a structurally invalid input.
    InvalidRequest,
    /// Content could not be encoded or decoded.
    Serialization,
    /// A local file is missing or inaccessible.
    ResourceNotFound,
    /// A file could not be written.
    WriteFailure,
    /// A template failed to parse or render.
    Template,
    /// A child process could not be started or waited on.
    Process,
    /// A child process ran past its timeout and was killed.
    Timeout,
    /// A vendor record lacked its name or value.
    MalformedRecord,
    /// Some requested parameter names could not be resolved.
    PartialLookupFailure,
    /// The vendor failed while pages were being collected.
    LookupFailure,
    RemoteNotFound,
    RemoteValidation,
    RemoteClient,
    RemoteAuth,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Error::Serialize { .. }
            | Error::Decode { .. }
            | Error::FileContent { .. }
            | Error::LogTail { .. } => ErrorKind::Serialization,
            Error::ResourceNotFound { .. } | Error::Backup { .. } => ErrorKind::ResourceNotFound,
            Error::WriteFile { .. } => ErrorKind::WriteFailure,
            Error::Template { .. } => ErrorKind::Template,
            Error::Spawn { .. } | Error::Wait { .. } => ErrorKind::Process,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::MalformedRecord { .. } => ErrorKind::MalformedRecord,
            Error::PartialLookup { .. } => ErrorKind::PartialLookupFailure,
            Error::Lookup { .. } => ErrorKind::LookupFailure,
            Error::Remote { source } => match source.kind() {
                RemoteKind::NotFound => ErrorKind::RemoteNotFound,
                RemoteKind::Validation => ErrorKind::RemoteValidation,
                RemoteKind::Client => ErrorKind::RemoteClient,
                RemoteKind::Auth => ErrorKind::RemoteAuth,
            },
        }
    }

    /// Returns the vendor error behind this error, if there is one.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            Error::Lookup { source } | Error::Remote { source } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
