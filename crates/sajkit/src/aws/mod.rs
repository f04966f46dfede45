//! Sajkit for AWS.
//!
//! Implementations of the collaborator traits on top of the AWS SDK clients,
//! and a thin configuration wrapper to create those clients.
use aws_config::{meta::region::RegionProviderChain, BehaviorVersion, Region};

pub use aws_config::SdkConfig;
pub mod cloudwatch;
pub mod lambda;
pub mod ssm;

/// Region used when neither the caller nor the environment names one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// A wrapper around the AWS `SdkConfig` that provides `AsRef<SdkConfig>`.
#[derive(Debug, Clone)]
pub struct Aws(pub SdkConfig);

impl AsRef<SdkConfig> for Aws {
    fn as_ref(&self) -> &SdkConfig {
        &self.0
    }
}

impl Aws {
    /// Loads the shared AWS configuration.
    ///
    /// An explicit `region` wins, then the default provider chain
    /// (`AWS_REGION`, profile files, IMDS), then [`DEFAULT_REGION`].
    /// `endpoint_url` points every client at a custom endpoint, such as a
    /// local emulator.
    pub async fn load(region: Option<&str>, endpoint_url: Option<&str>) -> Self {
        let region_provider =
            RegionProviderChain::first_try(region.map(|r| Region::new(r.to_owned())))
                .or_default_provider()
                .or_else(Region::new(DEFAULT_REGION));
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region_provider);
        if let Some(url) = endpoint_url {
            log::debug!("using custom endpoint {url}");
            loader = loader.endpoint_url(url);
        }
        let cfg = loader.load().await;
        log::debug!("loaded aws config for region {:?}", cfg.region());
        Aws(cfg)
    }

    pub fn lambda(&self) -> aws_sdk_lambda::Client {
        aws_sdk_lambda::Client::new(&self.0)
    }

    pub fn ssm(&self) -> aws_sdk_ssm::Client {
        aws_sdk_ssm::Client::new(&self.0)
    }

    pub fn cloudwatch(&self) -> aws_sdk_cloudwatch::Client {
        aws_sdk_cloudwatch::Client::new(&self.0)
    }
}
