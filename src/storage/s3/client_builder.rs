//! AWS S3 client construction from a [`ClientConfig`].

use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_config::retry::RetryConfig as SdkRetryConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};

use crate::config::ClientConfig;
use crate::types::S3Credentials;

impl ClientConfig {
    /// Build a fresh S3 client from this configuration.
    ///
    /// Credential resolution order: explicit access keys, then the named
    /// profile, then the SDK's default environment chain. Request and
    /// connect timeouts are left at the SDK defaults; only the retry
    /// policy (max attempts, initial backoff) is configured here.
    pub async fn create_client(&self) -> Client {
        let retry_config = SdkRetryConfig::standard()
            .with_max_attempts(self.retry_config.aws_max_attempts)
            .with_initial_backoff(Duration::from_millis(
                self.retry_config.initial_backoff_milliseconds,
            ));

        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).retry_config(retry_config);

        match &self.credential {
            S3Credentials::Profile(profile_name) => {
                loader = loader.profile_name(profile_name);
            }
            S3Credentials::Credentials { access_keys } => {
                let credentials = Credentials::new(
                    access_keys.access_key.clone(),
                    access_keys.secret_access_key.clone(),
                    access_keys.session_token.clone(),
                    None,
                    "s3purge",
                );
                loader = loader.credentials_provider(credentials);
            }
            S3Credentials::FromEnvironment => {}
        }

        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }

        if let Some(endpoint_url) = &self.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }

        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if self.force_path_style {
            builder = builder.force_path_style(true);
        }

        Client::from_conf(builder.build())
    }
}
