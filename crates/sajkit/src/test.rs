use std::{cell::RefCell, time::SystemTime};

use aws_sdk_lambda::{operation::invoke::InvokeError, types::error::ResourceNotFoundException};
use aws_smithy_runtime_api::{
    client::{orchestrator::HttpResponse, result::SdkError},
    http::StatusCode,
};
use aws_smithy_types::{body::SdkBody, error::ErrorMetadata};
use pretty_assertions::assert_eq;

use crate::{
    invoke::{invoke, InvocationResponse, Invoker},
    metrics::{put_metric, Dimension, MetricDatum, MetricSink},
    payload::{FsReader, InvocationArgs, InvocationMode, InvocationRequest},
    remote::{RemoteError, RemoteKind, DEFAULT_STATUS},
    utils::{backup_file, whoami},
    Error, ErrorKind,
};

/// Records the last request and answers with a canned response.
struct FakeInvoker {
    seen: RefCell<Option<InvocationRequest>>,
    answer: RefCell<Option<Result<InvocationResponse, RemoteError>>>,
}

impl FakeInvoker {
    fn answering(answer: Result<InvocationResponse, RemoteError>) -> Self {
        FakeInvoker {
            seen: RefCell::new(None),
            answer: RefCell::new(Some(answer)),
        }
    }
}

impl Invoker for FakeInvoker {
    async fn call(&self, request: &InvocationRequest) -> Result<InvocationResponse, RemoteError> {
        *self.seen.borrow_mut() = Some(request.clone());
        self.answer.borrow_mut().take().unwrap()
    }
}

#[derive(Default)]
struct FakeSink {
    published: RefCell<Vec<(String, Vec<MetricDatum>)>>,
}

impl MetricSink for FakeSink {
    async fn publish(&self, namespace: &str, data: &[MetricDatum]) -> Result<(), RemoteError> {
        self.published
            .borrow_mut()
            .push((namespace.to_owned(), data.to_vec()));
        Ok(())
    }
}

#[test]
fn remote_kind_from_code() {
    for (code, kind) in [
        ("ResourceNotFoundException", RemoteKind::NotFound),
        ("ParameterNotFound", RemoteKind::NotFound),
        ("ValidationException", RemoteKind::Validation),
        ("InvalidParameterValueException", RemoteKind::Validation),
        ("InvalidRequestContentException", RemoteKind::Validation),
        ("UnrecognizedClientException", RemoteKind::Auth),
        ("AccessDeniedException", RemoteKind::Auth),
        ("ExpiredTokenException", RemoteKind::Auth),
        ("ThrottlingException", RemoteKind::Client),
        ("ServiceException", RemoteKind::Client),
    ] {
        assert_eq!(kind, RemoteKind::from_code(code), "{code}");
    }
}

#[test]
fn remote_error_keeps_structure() {
    let err = RemoteError::new(RemoteKind::NotFound, "Function not found: foo")
        .with_code("ResourceNotFoundException")
        .with_status(404);
    assert_eq!(RemoteKind::NotFound, err.kind());
    assert_eq!(Some("ResourceNotFoundException"), err.code());
    assert_eq!(Some("Function not found: foo"), err.message());
    assert_eq!(Some(404), err.status());
    assert_eq!(
        "NotFound error (ResourceNotFoundException) [HTTP 404]: Function not found: foo",
        err.to_string()
    );
    assert_eq!(
        serde_json::json!({
            "statusCode": 404,
            "body": { "message": "Function not found: foo" }
        }),
        err.http_response()
    );
}

#[test]
fn remote_error_http_response_defaults_status() {
    let err = RemoteError::new(RemoteKind::Client, "boom");
    assert_eq!(
        serde_json::json!(DEFAULT_STATUS),
        err.http_response()["statusCode"]
    );
}

#[test]
fn remote_error_exposes_source() {
    let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "socket timed out");
    let err = RemoteError::new(RemoteKind::Client, "dispatch failure").with_source(io);
    let source = std::error::Error::source(&err).unwrap();
    assert_eq!("socket timed out", source.to_string());
}

fn not_found_response() -> HttpResponse {
    HttpResponse::new(StatusCode::try_from(404u16).unwrap(), SdkBody::empty())
}

#[test]
fn sdk_service_error_becomes_remote_error() {
    let service_err = InvokeError::ResourceNotFoundException(
        ResourceNotFoundException::builder()
            .message("Function not found: foo")
            .meta(
                ErrorMetadata::builder()
                    .code("ResourceNotFoundException")
                    .message("Function not found: foo")
                    .build(),
            )
            .build(),
    );
    let sdk_err = SdkError::service_error(service_err, not_found_response());

    let err = RemoteError::from(sdk_err);
    assert_eq!(RemoteKind::NotFound, err.kind());
    assert_eq!(Some("ResourceNotFoundException"), err.code());
    assert_eq!(Some("Function not found: foo"), err.message());
    assert_eq!(Some(404), err.status());
    assert_eq!(
        serde_json::json!({
            "statusCode": 404,
            "body": { "message": "Function not found: foo" }
        }),
        err.http_response()
    );
    assert!(std::error::Error::source(&err).is_some());

    let err = Error::Remote { source: err };
    assert_eq!(ErrorKind::RemoteNotFound, err.kind());
}

#[test]
fn sdk_construction_failure_is_validation() {
    let sdk_err =
        SdkError::<InvokeError, HttpResponse>::construction_failure("missing function name");
    let err = RemoteError::from(sdk_err);
    assert_eq!(RemoteKind::Validation, err.kind());
    assert_eq!(None, err.code());
    assert_eq!(None, err.status());
    assert_eq!(
        serde_json::json!(DEFAULT_STATUS),
        err.http_response()["statusCode"]
    );
}

#[test]
fn sdk_failures_without_code_are_classified_by_cause() {
    let sdk_err = SdkError::<InvokeError, HttpResponse>::timeout_error(
        "failed to load credentials from the environment",
    );
    assert_eq!(RemoteKind::Auth, RemoteError::from(sdk_err).kind());

    let sdk_err = SdkError::<InvokeError, HttpResponse>::timeout_error("read timed out");
    assert_eq!(RemoteKind::Client, RemoteError::from(sdk_err).kind());
}

#[test]
fn error_kinds_follow_remote_kinds() {
    for (kind, expected) in [
        (RemoteKind::NotFound, ErrorKind::RemoteNotFound),
        (RemoteKind::Validation, ErrorKind::RemoteValidation),
        (RemoteKind::Client, ErrorKind::RemoteClient),
        (RemoteKind::Auth, ErrorKind::RemoteAuth),
    ] {
        let err = Error::Remote {
            source: RemoteError::new(kind, "x"),
        };
        assert_eq!(expected, err.kind());
        assert!(err.remote().is_some());
    }
    let err = Error::InvalidRequest { msg: "x".into() };
    assert!(err.remote().is_none());
}

#[tokio::test]
async fn invoke_sends_normalized_request() {
    let _ = env_logger::builder().is_test(true).try_init();
    let invoker = FakeInvoker::answering(Ok(InvocationResponse {
        status_code: 200,
        executed_version: Some("$LATEST".to_owned()),
        payload: Some(b"{\"ok\":true}".to_vec()),
        ..Default::default()
    }));
    let args = InvocationArgs::new("foo")
        .mode(InvocationMode::Synchronous)
        .payload(crate::payload::Payload::Structured(
            serde_json::json!({"hello": "world"}),
        ))
        .capture_log_tail(true);

    let response = invoke(&invoker, &FsReader::default(), args).await.unwrap();
    assert_eq!(200, response.status_code);
    assert_eq!(
        Some(serde_json::json!({"ok": true})),
        response.json().unwrap()
    );

    let seen = invoker.seen.borrow_mut().take().unwrap();
    assert_eq!("foo", seen.target);
    assert_eq!(Some(InvocationMode::Synchronous), seen.mode);
    assert!(seen.capture_log_tail);
    assert_eq!(Some(b"{\"hello\":\"world\"}".to_vec()), seen.payload);
}

#[tokio::test]
async fn invoke_rejects_before_calling() {
    let invoker = FakeInvoker::answering(Ok(InvocationResponse::default()));
    let err = invoke(&invoker, &FsReader::default(), InvocationArgs::new(""))
        .await
        .unwrap_err();
    assert_eq!(ErrorKind::InvalidRequest, err.kind());
    assert!(invoker.seen.borrow().is_none());
}

#[tokio::test]
async fn invoke_surfaces_remote_errors() {
    for (remote, expected) in [
        (
            RemoteError::new(RemoteKind::NotFound, "Function not found")
                .with_code("ResourceNotFoundException")
                .with_status(404),
            ErrorKind::RemoteNotFound,
        ),
        (
            RemoteError::new(RemoteKind::Validation, "Invalid InvocationType")
                .with_code("InvalidParameterValueException")
                .with_status(400),
            ErrorKind::RemoteValidation,
        ),
    ] {
        let invoker = FakeInvoker::answering(Err(remote));
        let args = InvocationArgs::new("foo").mode(InvocationMode::from("Bogus"));
        let err = invoke(&invoker, &FsReader::default(), args)
            .await
            .unwrap_err();
        assert_eq!(expected, err.kind());
    }
}

#[test]
fn log_tail_is_decoded() {
    let response = InvocationResponse {
        status_code: 200,
        log_result: Some(data_encoding::BASE64.encode(b"START RequestId: 1\nEND RequestId: 1\n")),
        ..Default::default()
    };
    assert_eq!(
        Some("START RequestId: 1\nEND RequestId: 1\n".to_owned()),
        response.log_tail().unwrap()
    );
    assert_eq!(None, InvocationResponse::default().log_tail().unwrap());

    let garbled = InvocationResponse {
        log_result: Some("not base64!".to_owned()),
        ..Default::default()
    };
    assert_eq!(
        ErrorKind::Serialization,
        garbled.log_tail().unwrap_err().kind()
    );
}

#[test]
fn undecodable_response_payload_is_a_decode_error() {
    let response = InvocationResponse {
        status_code: 200,
        payload: Some(b"<html>Bad Gateway</html>".to_vec()),
        ..Default::default()
    };
    let err = response.json().unwrap_err();
    assert_eq!(ErrorKind::Serialization, err.kind());
    assert!(matches!(err, Error::Decode { .. }), "{err}");
    assert!(err.to_string().contains("decode"), "{err}");

    assert_eq!(None, InvocationResponse::default().json().unwrap());
}

#[test]
fn metric_datum_converts_to_cloudwatch_shape() {
    use aws_sdk_cloudwatch::{primitives::DateTime, types as aws};

    let datum = MetricDatum::new(
        "Requests",
        1.0,
        "Count",
        vec![Dimension::new("stage", "prod")],
    )
    .with_timestamp(SystemTime::UNIX_EPOCH);

    let converted = aws::MetricDatum::from(&datum);
    assert_eq!(Some("Requests"), converted.metric_name());
    assert_eq!(Some(1.0), converted.value());
    assert_eq!(Some(&aws::StandardUnit::Count), converted.unit());
    assert_eq!(Some(&DateTime::from_secs(0)), converted.timestamp());
    let dimensions = converted.dimensions();
    assert_eq!(1, dimensions.len());
    assert_eq!(Some("stage"), dimensions[0].name());
    assert_eq!(Some("prod"), dimensions[0].value());
}

#[tokio::test]
async fn put_metric_forwards_data() {
    let sink = FakeSink::default();
    let before = SystemTime::now();
    let datum = MetricDatum::new(
        "Requests",
        1.0,
        "Count",
        vec![Dimension::new("stage", "prod")],
    );
    let after = SystemTime::now();
    assert!(before <= datum.timestamp && datum.timestamp <= after);

    put_metric(&sink, "MyApp", &[datum.clone()]).await.unwrap();
    assert_eq!(
        vec![("MyApp".to_owned(), vec![datum])],
        *sink.published.borrow()
    );
}

#[test]
fn metric_timestamps_are_taken_per_datum() {
    let first = MetricDatum::new("a", 1.0, "Count", vec![]);
    std::thread::sleep(std::time::Duration::from_millis(5));
    let second = MetricDatum::new("a", 1.0, "Count", vec![]);
    assert!(first.timestamp < second.timestamp);

    let fixed = SystemTime::UNIX_EPOCH;
    assert_eq!(fixed, second.with_timestamp(fixed).timestamp);
}

#[tokio::test]
async fn put_metric_requires_namespace() {
    let sink = FakeSink::default();
    let datum = MetricDatum::new("Requests", 1.0, "Count", vec![]);
    let err = put_metric(&sink, "", &[datum]).await.unwrap_err();
    assert_eq!(ErrorKind::InvalidRequest, err.kind());
    assert!(sink.published.borrow().is_empty());
}

#[test]
fn backup_copies_with_suffix() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("nginx.conf");
    std::fs::write(&src, "worker_processes 1;").unwrap();

    let dest = backup_file(&src, Some(".bak")).unwrap();
    assert_eq!(dir.path().join("nginx.conf.bak"), dest);
    assert_eq!(
        "worker_processes 1;",
        std::fs::read_to_string(&dest).unwrap()
    );
}

#[test]
fn backup_defaults_to_timestamp_suffix() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("app.env");
    std::fs::write(&src, "A=1").unwrap();

    let dest = backup_file(&src, None).unwrap();
    let name = dest.file_name().unwrap().to_str().unwrap().to_owned();
    // app.env.YYYY-MM-DD-HHMMSS
    assert!(name.starts_with("app.env."), "{name}");
    assert_eq!("app.env.".len() + 17, name.len(), "{name}");
    assert!(dest.is_file());
}

#[test]
fn backup_of_missing_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = backup_file(dir.path().join("missing"), None).unwrap_err();
    assert_eq!(ErrorKind::ResourceNotFound, err.kind());
}

#[test]
fn whoami_reads_role_file() {
    let dir = tempfile::tempdir().unwrap();
    let location = dir.path().join("role");
    std::fs::write(&location, "webserver\n").unwrap();
    assert_eq!("webserver", whoami(&location).unwrap());

    let err = whoami(dir.path().join("missing")).unwrap_err();
    assert_eq!(ErrorKind::ResourceNotFound, err.kind());
}
