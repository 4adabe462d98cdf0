//! Configuration resource accessor

use http::Method;

use crate::errors::LeapError;
use crate::http::client::HubClient;
use crate::http::response::HubResponse;
use crate::models::configuration::Configuration;

/// Accessor for `configurations/{id}`
#[derive(Debug, Clone, Copy)]
pub struct Configurations<'a> {
    client: &'a HubClient,
}

impl HubClient {
    /// Configuration resources on this hub
    pub fn configurations(&self) -> Configurations<'_> {
        Configurations { client: self }
    }
}

const CONFIGURATIONS: &str = "configurations";

impl Configurations<'_> {
    /// Fetch a configuration. A missing id comes back as a 404 envelope, not an error.
    pub async fn get(&self, id: &str) -> Result<(HubResponse, Option<Configuration>), LeapError> {
        let request = self
            .client
            .new_resource_request::<()>(Method::GET, &[CONFIGURATIONS, id], None)?;
        self.client.execute("get configuration", request).await
    }

    /// Create a configuration keyed by its id
    pub async fn create(
        &self,
        config: &Configuration,
    ) -> Result<(HubResponse, Option<Configuration>), LeapError> {
        let request = self
            .client
            .new_resource_request(Method::PUT, &[CONFIGURATIONS, config.id.as_str()], Some(config))?;
        self.client.execute("create configuration", request).await
    }

    /// Delete a configuration. 204 and 404 both mean it is gone.
    pub async fn delete(&self, id: &str) -> Result<HubResponse, LeapError> {
        let request = self
            .client
            .new_resource_request::<()>(Method::DELETE, &[CONFIGURATIONS, id], None)?;
        self.client
            .execute_no_content("delete configuration", request)
            .await
    }
}
