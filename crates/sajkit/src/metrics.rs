//! CloudWatch custom metrics.
use std::{future::Future, time::SystemTime};

use snafu::prelude::*;

use crate::{remote::RemoteError, InvalidRequestSnafu, RemoteSnafu, Result};

/// A name/value pair that is part of a metric's identity.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Dimension {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A single data point of a custom metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDatum {
    pub name: String,
    pub value: f64,
    /// A CloudWatch unit, eg `Count`, `Seconds` or `Bytes`.
    pub unit: String,
    pub dimensions: Vec<Dimension>,
    pub timestamp: SystemTime,
}

impl MetricDatum {
    /// Creates a data point stamped with the current time.
    pub fn new(
        name: impl Into<String>,
        value: f64,
        unit: impl Into<String>,
        dimensions: Vec<Dimension>,
    ) -> Self {
        MetricDatum {
            name: name.into(),
            value,
            unit: unit.into(),
            dimensions,
            timestamp: SystemTime::now(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// A client able to publish metric data.
pub trait MetricSink {
    fn publish(
        &self,
        namespace: &str,
        data: &[MetricDatum],
    ) -> impl Future<Output = Result<(), RemoteError>>;
}

/// Publishes `data` under the custom `namespace`.
pub async fn put_metric(
    sink: &impl MetricSink,
    namespace: &str,
    data: &[MetricDatum],
) -> Result<()> {
    ensure!(
        !namespace.is_empty(),
        InvalidRequestSnafu {
            msg: "missing metric namespace"
        }
    );
    log::debug!("publishing {} datum(s) to '{namespace}'", data.len());
    sink.publish(namespace, data).await.context(RemoteSnafu)
}
