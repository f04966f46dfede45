//! Errors reported by AWS, translated into one structured type.
//!
//! Every SDK operation fails with its own `SdkError<OperationError, _>`.
//! [`RemoteError`] flattens those into a [`RemoteKind`] while keeping the
//! vendor's error code, message and HTTP status as separate fields, along
//! with the original error as its source.
use aws_smithy_runtime_api::client::{orchestrator::HttpResponse, result::SdkError};
use aws_smithy_types::error::metadata::ProvideErrorMetadata;

/// HTTP status reported when the vendor did not report one.
pub const DEFAULT_STATUS: u16 = 500;

/// Coarse classification of a vendor failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteKind {
    /// The function or parameter does not exist.
    NotFound,
    /// The vendor rejected the request as malformed.
    Validation,
    /// Any other client or service failure.
    Client,
    /// Credentials were missing, expired or rejected.
    Auth,
}

impl RemoteKind {
    /// Classifies a vendor error code.
    pub fn from_code(code: &str) -> Self {
        match code {
            "ResourceNotFoundException" | "ParameterNotFound" | "ParameterVersionNotFound" => {
                RemoteKind::NotFound
            }
            "ValidationException"
            | "ValidationError"
            | "InvalidParameterValueException"
            | "InvalidRequestContentException"
            | "InvalidParameterValue"
            | "InvalidParameterCombination"
            | "MissingParameter" => RemoteKind::Validation,
            "AccessDeniedException"
            | "AccessDenied"
            | "UnrecognizedClientException"
            | "InvalidClientTokenId"
            | "ExpiredTokenException"
            | "ExpiredToken"
            | "InvalidSignatureException"
            | "IncompleteSignature"
            | "MissingAuthenticationToken" => RemoteKind::Auth,
            _ => RemoteKind::Client,
        }
    }
}

type Source = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A failure reported by (or while reaching) an AWS service.
#[derive(Debug)]
pub struct RemoteError {
    kind: RemoteKind,
    code: Option<String>,
    message: Option<String>,
    status: Option<u16>,
    source: Option<Source>,
}

impl RemoteError {
    pub fn new(kind: RemoteKind, message: impl Into<String>) -> Self {
        RemoteError {
            kind,
            code: None,
            message: Some(message.into()),
            status: None,
            source: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_source(mut self, source: impl Into<Source>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> RemoteKind {
        self.kind
    }

    /// The vendor error code, eg `ResourceNotFoundException`.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The HTTP status of the vendor response, if a response was received.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Renders this error as an HTTP-style response body:
    ///
    /// ```json
    /// { "statusCode": 404, "body": { "message": "Function not found" } }
    /// ```
    ///
    /// The status falls back to [`DEFAULT_STATUS`].
    pub fn http_response(&self) -> serde_json::Value {
        serde_json::json!({
            "statusCode": self.status.unwrap_or(DEFAULT_STATUS),
            "body": {
                "message": self.message,
            }
        })
    }
}

impl core::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} error", self.kind)?;
        if let Some(code) = &self.code {
            write!(f, " ({code})")?;
        }
        if let Some(status) = self.status {
            write!(f, " [HTTP {status}]")?;
        }
        match (&self.message, &self.source) {
            (Some(message), _) => write!(f, ": {message}"),
            (None, Some(source)) => write!(f, ": {source}"),
            (None, None) => Ok(()),
        }
    }
}

impl std::error::Error for RemoteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Returns true if anything in the error's source chain complains about
/// credentials. The credential providers report through dispatch failures,
/// which carry no service error code.
fn mentions_credentials(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut next = Some(err);
    while let Some(e) = next {
        if e.to_string().to_lowercase().contains("credentials") {
            return true;
        }
        next = e.source();
    }
    false
}

impl<E> From<SdkError<E, HttpResponse>> for RemoteError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    fn from(err: SdkError<E, HttpResponse>) -> Self {
        let code = err.code().map(str::to_owned);
        let message = err.message().map(str::to_owned);
        let status = err.raw_response().map(|r| r.status().as_u16());
        let kind = match (&err, code.as_deref()) {
            (_, Some(code)) => RemoteKind::from_code(code),
            (SdkError::ConstructionFailure(_), None) => RemoteKind::Validation,
            (_, None) if mentions_credentials(&err) => RemoteKind::Auth,
            _ => RemoteKind::Client,
        };
        log::trace!("classified vendor error {code:?} ({status:?}) as {kind:?}");
        RemoteError {
            kind,
            code,
            message,
            status,
            source: Some(Box::new(err)),
        }
    }
}
