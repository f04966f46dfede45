//! AWS CloudWatch custom metrics.
use aws_sdk_cloudwatch::{primitives::DateTime, types as aws};

use crate::{
    metrics::{Dimension, MetricDatum, MetricSink},
    remote::RemoteError,
};

impl From<&Dimension> for aws::Dimension {
    fn from(value: &Dimension) -> Self {
        aws::Dimension::builder()
            .name(&value.name)
            .value(&value.value)
            .build()
    }
}

impl From<&MetricDatum> for aws::MetricDatum {
    fn from(value: &MetricDatum) -> Self {
        aws::MetricDatum::builder()
            .metric_name(&value.name)
            .value(value.value)
            .unit(aws::StandardUnit::from(value.unit.as_str()))
            .timestamp(DateTime::from(value.timestamp))
            .set_dimensions(Some(
                value.dimensions.iter().map(aws::Dimension::from).collect(),
            ))
            .build()
    }
}

impl MetricSink for aws_sdk_cloudwatch::Client {
    async fn publish(&self, namespace: &str, data: &[MetricDatum]) -> Result<(), RemoteError> {
        self.put_metric_data()
            .namespace(namespace)
            .set_metric_data(Some(data.iter().map(aws::MetricDatum::from).collect()))
            .send()
            .await?;
        Ok(())
    }
}
