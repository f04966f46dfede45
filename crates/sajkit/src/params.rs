//! Parameter Store lookups, flattened into a name -> value map.
//!
//! A lookup by name answers with one response that also lists the names it
//! could not resolve. A lookup by path answers with a lazy sequence of pages
//! (or, for some sources, a single page). Either way the caller gets a
//! [`ParameterMap`], or an error. Partial results are never returned.
use std::{collections::HashMap, future::Future};

use snafu::prelude::*;

use crate::{
    remote::RemoteError, LookupSnafu, MalformedRecordSnafu, PartialLookupSnafu, RemoteSnafu,
    Result,
};


/// Parameter names mapped to their values.
pub type ParameterMap = HashMap<String, String>;

/// A parameter as returned by the vendor. Either attribute may be missing.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParameterRecord {
    /// The full hierarchical name, eg `/foo/bar/bind`.
    pub name: Option<String>,
    pub value: Option<String>,
}

impl ParameterRecord {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        ParameterRecord {
            name: Some(name.into()),
            value: Some(value.into()),
        }
    }
}

/// One page of records.
pub type Page = Vec<ParameterRecord>;

/// Response to a lookup by name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LookupResponse {
    pub parameters: Vec<ParameterRecord>,
    /// Names that are malformed or do not exist.
    pub invalid_parameters: Vec<String>,
}

/// A lazily fetched sequence of pages.
pub trait PageStream {
    /// Fetches the next page, or `None` once the sequence is exhausted.
    fn next_page(&mut self) -> impl Future<Output = Option<Result<Page, RemoteError>>>;
}

/// Adapts an iterator of already fetched pages into a [`PageStream`].
#[derive(Debug, Clone)]
pub struct IterPages<I>(pub I);

impl<I> PageStream for IterPages<I>
where
    I: Iterator<Item = Result<Page, RemoteError>>,
{
    async fn next_page(&mut self) -> Option<Result<Page, RemoteError>> {
        self.0.next()
    }
}

/// Response to a lookup by path.
#[derive(Debug)]
pub enum PathResponse<P> {
    Single(Page),
    Paged(P),
}

/// A client able to look parameters up.
pub trait ParameterSource {
    type Pages: PageStream;

    /// Looks up exactly the given names.
    fn lookup_names(
        &self,
        names: &[String],
        with_decryption: bool,
    ) -> impl Future<Output = Result<LookupResponse, RemoteError>>;

    /// Looks up everything under `path`. With `recursive` set this includes
    /// all sub-paths, not just the direct children.
    fn lookup_path(
        &self,
        path: &str,
        recursive: bool,
        with_decryption: bool,
    ) -> impl Future<Output = Result<PathResponse<Self::Pages>, RemoteError>>;
}

/// Pulls the name and value out of a vendor record.
pub fn extract_name_value(record: &ParameterRecord) -> Result<(String, String)> {
    let name = record
        .name
        .clone()
        .context(MalformedRecordSnafu { missing: "name" })?;
    let value = record
        .value
        .clone()
        .context(MalformedRecordSnafu { missing: "value" })?;
    Ok((name, value))
}

fn insert_page(map: &mut ParameterMap, page: &[ParameterRecord]) -> Result<()> {
    for record in page {
        let (name, value) = extract_name_value(record)?;
        map.insert(name, value);
    }
    Ok(())
}

/// Fetches the given parameters by name.
///
/// Fails with [`Error::PartialLookup`](crate::Error::PartialLookup) if any
/// name could not be resolved, even though the vendor call itself
/// succeeded.
pub async fn collect_flat(
    source: &impl ParameterSource,
    names: &[String],
    with_decryption: bool,
) -> Result<ParameterMap> {
    log::debug!("looking up {} parameter(s)", names.len());
    let response = source
        .lookup_names(names, with_decryption)
        .await
        .context(RemoteSnafu)?;
    let LookupResponse {
        parameters,
        invalid_parameters,
    } = response;
    ensure!(
        invalid_parameters.is_empty(),
        PartialLookupSnafu {
            count: invalid_parameters.len(),
            names: invalid_parameters,
        }
    );

    let mut map = ParameterMap::with_capacity(parameters.len());
    insert_page(&mut map, &parameters)?;
    Ok(map)
}

/// Fetches every parameter under `path`.
///
/// ```text
/// path = /foo/bar/
///   non-recursive: /foo/bar/secret1, /foo/bar/secret2
///   recursive:     /foo/bar/secret1, /foo/bar/secret2, /foo/bar/service/secret
/// ```
pub async fn collect_by_path(
    source: &impl ParameterSource,
    path: &str,
    recursive: bool,
    with_decryption: bool,
) -> Result<ParameterMap> {
    log::debug!("looking up parameters under '{path}' (recursive: {recursive})");
    let response = source
        .lookup_path(path, recursive, with_decryption)
        .await
        .context(RemoteSnafu)?;
    collect_response(response).await
}

/// Folds either shape of path response into one map.
///
/// A failure while fetching pages aborts the whole collection with
/// [`Error::Lookup`](crate::Error::Lookup).
pub async fn collect_response<P: PageStream>(response: PathResponse<P>) -> Result<ParameterMap> {
    let mut map = ParameterMap::new();
    match response {
        PathResponse::Single(page) => insert_page(&mut map, &page)?,
        PathResponse::Paged(mut pages) => {
            let mut count = 0;
            while let Some(page) = pages.next_page().await {
                let page = page.context(LookupSnafu)?;
                insert_page(&mut map, &page)?;
                count += 1;
            }
            log::trace!("collected {} parameter(s) over {count} page(s)", map.len());
        }
    }
    Ok(map)
}

/// Trims each name down to its final path segment.
///
/// `{"/foo/bar/bind": "value"}` becomes `{"bind": "value"}`. When two names
/// trim to the same key, the one visited later wins.
pub fn trim_keys<'a>(
    params: impl IntoIterator<Item = (&'a String, &'a String)>,
) -> ParameterMap {
    params
        .into_iter()
        .map(|(name, value)| {
            let key = name.rsplit('/').next().unwrap_or(name);
            (key.to_owned(), value.clone())
        })
        .collect()
}
