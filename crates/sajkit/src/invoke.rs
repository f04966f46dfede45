//! Sending normalized invocations.
use std::future::Future;

use snafu::prelude::*;

use crate::{
    payload::{normalize, FileReader, InvocationArgs, InvocationRequest},
    remote::RemoteError,
    DecodeSnafu, LogTailSnafu, RemoteSnafu, Result,
};

/// The result of an invocation as reported by the service.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct InvocationResponse {
    /// 200 for synchronous calls, 202 for queued events and 204 for dry runs.
    pub status_code: i32,
    /// Set when the function itself raised an error.
    pub function_error: Option<String>,
    /// Base64 encoded tail of the execution log.
    pub log_result: Option<String>,
    pub executed_version: Option<String>,
    pub payload: Option<Vec<u8>>,
}

impl InvocationResponse {
    /// Decodes the tail of the execution log, if one was requested and
    /// returned.
    pub fn log_tail(&self) -> Result<Option<String>> {
        let Some(encoded) = self.log_result.as_deref() else {
            return Ok(None);
        };
        let bytes = data_encoding::BASE64
            .decode(encoded.as_bytes())
            .context(LogTailSnafu)?;
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Parses the response payload as JSON.
    pub fn json(&self) -> Result<Option<serde_json::Value>> {
        self.payload
            .as_deref()
            .map(|bytes| serde_json::from_slice(bytes).context(DecodeSnafu))
            .transpose()
    }
}

/// A client able to carry out an [`InvocationRequest`].
pub trait Invoker {
    fn call(
        &self,
        request: &InvocationRequest,
    ) -> impl Future<Output = Result<InvocationResponse, RemoteError>>;
}

/// Normalizes `args` and sends the resulting request.
///
/// Vendor failures are surfaced as [`Error::Remote`](crate::Error::Remote)
/// and never retried.
pub async fn invoke(
    invoker: &impl Invoker,
    reader: &impl FileReader,
    args: InvocationArgs,
) -> Result<InvocationResponse> {
    let request = normalize(args, reader)?;
    log::debug!(
        "invoking '{}' ({})",
        request.target,
        request
            .mode
            .as_ref()
            .map(|m| m.as_str())
            .unwrap_or("default mode")
    );
    let response = invoker.call(&request).await.context(RemoteSnafu)?;
    log::debug!(
        "'{}' answered with status {}",
        request.target,
        response.status_code
    );
    Ok(response)
}
