//! Device twin accessor

use http::Method;

use crate::errors::LeapError;
use crate::http::client::HubClient;
use crate::http::response::HubResponse;
use crate::models::twin::{TagPatch, Twin};

/// Accessor for `twins/{deviceId}`
#[derive(Debug, Clone, Copy)]
pub struct Twins<'a> {
    client: &'a HubClient,
}

impl HubClient {
    /// Device twins on this hub
    pub fn twins(&self) -> Twins<'_> {
        Twins { client: self }
    }
}

const TWINS: &str = "twins";

impl Twins<'_> {
    /// Fetch a device twin
    pub async fn get_twin(&self, device_id: &str) -> Result<(HubResponse, Option<Twin>), LeapError> {
        let request = self
            .client
            .new_resource_request::<()>(Method::GET, &[TWINS, device_id], None)?;
        self.client.execute("get twin", request).await
    }

    /// Apply a partial tag patch. Only the leaves in `patch` are changed.
    pub async fn update_twin_tags(
        &self,
        device_id: &str,
        patch: &TagPatch,
    ) -> Result<(HubResponse, Option<Twin>), LeapError> {
        let request = self
            .client
            .new_resource_request(Method::PATCH, &[TWINS, device_id], Some(patch))?;
        self.client.execute("update twin tags", request).await
    }
}
