//! AWS Systems Manager Parameter Store lookups.
use crate::{
    params::{LookupResponse, Page, PageStream, ParameterRecord, ParameterSource, PathResponse},
    remote::RemoteError,
};

fn record(parameter: aws_sdk_ssm::types::Parameter) -> ParameterRecord {
    ParameterRecord {
        name: parameter.name,
        value: parameter.value,
    }
}

/// Pages of a `GetParametersByPath` lookup, fetched one request at a time by
/// following the `NextToken` of each response.
#[derive(Debug)]
pub struct SsmPages {
    client: aws_sdk_ssm::Client,
    path: String,
    recursive: bool,
    with_decryption: bool,
    next_token: Option<String>,
    done: bool,
}

impl PageStream for SsmPages {
    async fn next_page(&mut self) -> Option<Result<Page, RemoteError>> {
        if self.done {
            return None;
        }
        let result = self
            .client
            .get_parameters_by_path()
            .path(&self.path)
            .recursive(self.recursive)
            .with_decryption(self.with_decryption)
            .set_next_token(self.next_token.take())
            .send()
            .await;
        match result {
            Ok(out) => {
                self.next_token = out.next_token;
                self.done = self.next_token.is_none();
                let page: Page = out
                    .parameters
                    .unwrap_or_default()
                    .into_iter()
                    .map(record)
                    .collect();
                log::trace!("fetched a page of {} parameter(s)", page.len());
                Some(Ok(page))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err.into()))
            }
        }
    }
}

impl ParameterSource for aws_sdk_ssm::Client {
    type Pages = SsmPages;

    async fn lookup_names(
        &self,
        names: &[String],
        with_decryption: bool,
    ) -> Result<LookupResponse, RemoteError> {
        // SSM answers 200 even when names are missing, those come back in
        // `invalid_parameters`.
        let out = self
            .get_parameters()
            .set_names(Some(names.to_vec()))
            .with_decryption(with_decryption)
            .send()
            .await?;
        Ok(LookupResponse {
            parameters: out
                .parameters
                .unwrap_or_default()
                .into_iter()
                .map(record)
                .collect(),
            invalid_parameters: out.invalid_parameters.unwrap_or_default(),
        })
    }

    /// No request is made until the first page is pulled, so every vendor
    /// failure surfaces while paging.
    async fn lookup_path(
        &self,
        path: &str,
        recursive: bool,
        with_decryption: bool,
    ) -> Result<PathResponse<SsmPages>, RemoteError> {
        Ok(PathResponse::Paged(SsmPages {
            client: self.clone(),
            path: path.to_owned(),
            recursive,
            with_decryption,
            next_token: None,
            done: false,
        }))
    }
}
