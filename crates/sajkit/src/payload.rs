//! Normalization of Lambda invocation requests.
//!
//! Callers hand over a payload in whichever shape is convenient. The
//! [`normalize`] step turns it into an [`InvocationRequest`] whose body is
//! always a byte sequence, ready for an [`Invoker`](crate::invoke::Invoker).
use std::path::{Path, PathBuf};

use snafu::prelude::*;

use crate::{
    FileContentSnafu, InvalidRequestSnafu, ResourceNotFoundSnafu, Result, SerializeSnafu,
};


/// Prefix marking a text payload as a reference to a JSON file.
pub const FILE_PREFIX: &str = "file://";

/// An invocation payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A JSON object, sent as JSON text.
    ///
    /// Any other JSON value is rejected during normalization.
    Structured(serde_json::Value),
    /// Opaque text, sent as UTF-8 without any parsing.
    Text(String),
    /// A JSON file, read and sent as if it were [`Payload::Structured`], so
    /// it must hold an object as well.
    ///
    /// Relative paths are resolved by the [`FileReader`].
    File(PathBuf),
    /// Bytes sent as-is.
    Raw(Vec<u8>),
}

impl Payload {
    /// Serializes a `serde` value into a structured payload. The value must
    /// serialize to a JSON object, eg a struct or a map.
    pub fn structured<T: serde::Serialize + ?Sized>(value: &T) -> Result<Self> {
        let value = serde_json::to_value(value).context(SerializeSnafu)?;
        ensure_object(&value)?;
        Ok(Payload::Structured(value))
    }

    /// Interprets caller-supplied text.
    ///
    /// The text is a file reference iff it starts with `file://`. Anything
    /// else is opaque text, however much it looks like JSON.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        match text.strip_prefix(FILE_PREFIX) {
            Some(path) => Payload::File(PathBuf::from(path)),
            None => Payload::Text(text),
        }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::from_text(text)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::from_text(text)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Raw(bytes)
    }
}

/// Accepts a dynamically typed payload: objects are structured, strings go
/// through [`Payload::from_text`], anything else is rejected.
impl TryFrom<serde_json::Value> for Payload {
    type Error = crate::Error;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::String(text) => Ok(Payload::from_text(text)),
            value @ serde_json::Value::Object(_) => Ok(Payload::Structured(value)),
            other => unsupported(&other),
        }
    }
}

fn unsupported<T>(value: &serde_json::Value) -> Result<T> {
    InvalidRequestSnafu {
        msg: format!(
            "unsupported payload type '{}', must be a JSON object, a string, \
             a file:// reference or bytes",
            json_type_name(value)
        ),
    }
    .fail()
}

fn ensure_object(value: &serde_json::Value) -> Result<()> {
    match value {
        serde_json::Value::Object(_) => Ok(()),
        other => unsupported(other),
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Reads and parses the JSON files behind [`Payload::File`].
pub trait FileReader {
    fn read_json(&self, path: &Path) -> Result<serde_json::Value>;
}

/// Reads files from the local filesystem.
///
/// Relative paths resolve against the current working directory at the time
/// of the read, unless a base directory was given.
#[derive(Debug, Default, Clone)]
pub struct FsReader {
    base: Option<PathBuf>,
}

impl FsReader {
    pub fn rooted(base: impl Into<PathBuf>) -> Self {
        FsReader {
            base: Some(base.into()),
        }
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf> {
        let base = match &self.base {
            Some(base) => base.clone(),
            None => std::env::current_dir().context(ResourceNotFoundSnafu { path })?,
        };
        Ok(base.join(path))
    }
}

impl FileReader for FsReader {
    fn read_json(&self, path: &Path) -> Result<serde_json::Value> {
        let path = self.resolve(path)?;
        log::debug!("reading payload from {}", path.display());
        let contents =
            std::fs::read_to_string(&path).context(ResourceNotFoundSnafu { path: &path })?;
        serde_json::from_str(&contents).context(FileContentSnafu { path })
    }
}

/// How the function should be invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationMode {
    /// Wait for the function and return its response.
    Synchronous,
    /// Queue the event and return immediately.
    Asynchronous,
    /// Only validate parameters and permissions.
    DryRun,
    /// A mode this crate does not know about. It is sent as-is and left for
    /// the service to accept or reject.
    Other(String),
}

impl InvocationMode {
    /// The wire value of this mode.
    pub fn as_str(&self) -> &str {
        match self {
            InvocationMode::Synchronous => "RequestResponse",
            InvocationMode::Asynchronous => "Event",
            InvocationMode::DryRun => "DryRun",
            InvocationMode::Other(mode) => mode,
        }
    }
}

impl From<&str> for InvocationMode {
    fn from(mode: &str) -> Self {
        match mode {
            "RequestResponse" => InvocationMode::Synchronous,
            "Event" => InvocationMode::Asynchronous,
            "DryRun" => InvocationMode::DryRun,
            other => InvocationMode::Other(other.to_owned()),
        }
    }
}

impl core::fmt::Display for InvocationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-facing description of an invocation.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct InvocationArgs {
    /// Function name, `name:qualifier` or ARN.
    pub target: String,
    pub mode: Option<InvocationMode>,
    pub payload: Option<Payload>,
    /// Ask for the last 4KB of the execution log.
    pub capture_log_tail: bool,
    /// Plain-text client context. Encoded as Base64 during normalization.
    pub caller_context: Option<String>,
    pub version: Option<String>,
}

impl InvocationArgs {
    pub fn new(target: impl Into<String>) -> Self {
        InvocationArgs {
            target: target.into(),
            ..Default::default()
        }
    }

    pub fn mode(mut self, mode: InvocationMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn payload(mut self, payload: impl Into<Payload>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn capture_log_tail(mut self, capture: bool) -> Self {
        self.capture_log_tail = capture;
        self
    }

    pub fn caller_context(mut self, context: impl Into<String>) -> Self {
        self.caller_context = Some(context.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// A fully normalized invocation, in the shape the Lambda `Invoke` API
/// expects.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRequest {
    pub target: String,
    pub mode: Option<InvocationMode>,
    pub capture_log_tail: bool,
    /// Base64 encoded client context.
    pub caller_context: Option<String>,
    pub version: Option<String>,
    /// `None` when no payload was supplied, which is not the same as an
    /// empty body.
    pub payload: Option<Vec<u8>>,
}

fn structured_bytes(value: &serde_json::Value) -> Result<Vec<u8>> {
    ensure_object(value)?;
    serde_json::to_vec(value).context(SerializeSnafu)
}

/// Turns any accepted payload shape into the bytes sent on the wire.
pub fn payload_bytes(payload: Payload, reader: &impl FileReader) -> Result<Vec<u8>> {
    match payload {
        Payload::Structured(value) => structured_bytes(&value),
        Payload::File(path) => structured_bytes(&reader.read_json(&path)?),
        Payload::Text(text) => Ok(text.into_bytes()),
        Payload::Raw(bytes) => Ok(bytes),
    }
}

/// Builds an [`InvocationRequest`].
///
/// The only side effect is reading the file behind a [`Payload::File`].
/// The mode is not validated here, the service is the authority on that.
pub fn normalize(args: InvocationArgs, reader: &impl FileReader) -> Result<InvocationRequest> {
    let InvocationArgs {
        target,
        mode,
        payload,
        capture_log_tail,
        caller_context,
        version,
    } = args;
    ensure!(
        !target.is_empty(),
        InvalidRequestSnafu {
            msg: "missing invocation target"
        }
    );

    let payload = payload.map(|p| payload_bytes(p, reader)).transpose()?;
    let caller_context =
        caller_context.map(|context| data_encoding::BASE64.encode(context.as_bytes()));
    log::trace!(
        "normalized invocation of '{target}' with {} payload bytes",
        payload.as_ref().map(Vec::len).unwrap_or_default()
    );

    Ok(InvocationRequest {
        target,
        mode,
        capture_log_tail,
        caller_context,
        version,
        payload,
    })
}
