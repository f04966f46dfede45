//! AWS Lambda invocation.
use aws_sdk_lambda::{
    primitives::Blob,
    types::{InvocationType, LogType},
};

use crate::{
    invoke::{InvocationResponse, Invoker},
    payload::InvocationRequest,
    remote::RemoteError,
};

impl Invoker for aws_sdk_lambda::Client {
    async fn call(&self, request: &InvocationRequest) -> Result<InvocationResponse, RemoteError> {
        let out = self
            .invoke()
            .function_name(&request.target)
            .set_invocation_type(
                request
                    .mode
                    .as_ref()
                    .map(|mode| InvocationType::from(mode.as_str())),
            )
            .set_log_type(request.capture_log_tail.then_some(LogType::Tail))
            .set_client_context(request.caller_context.clone())
            .set_qualifier(request.version.clone())
            .set_payload(request.payload.clone().map(Blob::new))
            .send()
            .await?;
        if let Some(err) = out.function_error.as_deref() {
            log::debug!("function '{}' reported an error: {err}", request.target);
        }
        Ok(InvocationResponse {
            status_code: out.status_code,
            function_error: out.function_error,
            log_result: out.log_result,
            executed_version: out.executed_version,
            payload: out.payload.map(Blob::into_inner),
        })
    }
}
