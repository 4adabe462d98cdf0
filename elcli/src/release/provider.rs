//! Hub capability interface

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::errors::LeapError;
use crate::http::client::HubClient;
use crate::http::response::HubResponse;
use crate::models::configuration::Configuration;
use crate::models::twin::{TagPatch, Twin};

/// The four hub operations a release needs.
///
/// New hub providers implement this trait; the orchestrator only sees it.
#[async_trait]
pub trait HubProvider: Send + Sync {
    async fn get_configuration(
        &self,
        id: &str,
    ) -> Result<(HubResponse, Option<Configuration>), LeapError>;

    async fn create_configuration(
        &self,
        config: &Configuration,
    ) -> Result<(HubResponse, Option<Configuration>), LeapError>;

    async fn delete_configuration(&self, id: &str) -> Result<HubResponse, LeapError>;

    async fn update_twin_tags(
        &self,
        device_id: &str,
        patch: &TagPatch,
    ) -> Result<(HubResponse, Option<Twin>), LeapError>;
}

#[async_trait]
impl HubProvider for HubClient {
    async fn get_configuration(
        &self,
        id: &str,
    ) -> Result<(HubResponse, Option<Configuration>), LeapError> {
        self.configurations().get(id).await
    }

    async fn create_configuration(
        &self,
        config: &Configuration,
    ) -> Result<(HubResponse, Option<Configuration>), LeapError> {
        self.configurations().create(config).await
    }

    async fn delete_configuration(&self, id: &str) -> Result<HubResponse, LeapError> {
        self.configurations().delete(id).await
    }

    async fn update_twin_tags(
        &self,
        device_id: &str,
        patch: &TagPatch,
    ) -> Result<(HubResponse, Option<Twin>), LeapError> {
        self.twins().update_twin_tags(device_id, patch).await
    }
}

/// Supported hub providers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProviderKind {
    #[default]
    Azure,
}

impl FromStr for ProviderKind {
    type Err = LeapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "azure" => Ok(ProviderKind::Azure),
            other => Err(LeapError::UnknownProvider(other.to_string())),
        }
    }
}

impl ProviderKind {
    /// Default REST endpoint for a hub named `hub`
    pub fn base_url(&self, hub: &str) -> String {
        match self {
            ProviderKind::Azure => format!("https://{}.azure-devices.net/", hub),
        }
    }
}

/// Connection parameters for a provider
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    pub kind: ProviderKind,
    pub base_url: String,
    pub token: SecretString,
    pub timeout: Duration,
}

/// Build an authenticated provider
pub fn connect(options: &ProviderOptions) -> Result<Arc<dyn HubProvider>, LeapError> {
    match options.kind {
        ProviderKind::Azure => {
            let client = HubClient::with_timeout(&options.base_url, options.timeout)?
                .with_auth_token(&options.token)?;
            Ok(Arc::new(client))
        }
    }
}
