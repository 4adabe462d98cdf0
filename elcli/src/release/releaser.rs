//! Release orchestrator and device binder

use std::sync::Arc;

use http::StatusCode;
use tracing::{debug, error, info, warn};

use crate::errors::LeapError;
use crate::models::configuration::Configuration;
use crate::models::twin::TagPatch;
use crate::release::fsm::{ReleaseEvent, ReleaseFsm, ReleaseState};
use crate::release::provider::HubProvider;

/// Result of a successful release
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseOutcome {
    /// Configuration id that was released
    pub id: String,

    /// Whether an existing configuration was replaced
    pub replaced: bool,

    /// States visited during the release
    pub states: Vec<ReleaseState>,
}

/// Publishes configurations and binds devices to them.
///
/// Releases for the same configuration id must not run concurrently;
/// nothing here serializes them.
pub struct Releaser {
    provider: Arc<dyn HubProvider>,
}

impl Releaser {
    pub fn new(provider: Arc<dyn HubProvider>) -> Self {
        Self { provider }
    }

    /// Release `desired`, replacing any configuration with the same id.
    ///
    /// An existing configuration is deleted before the new one is created so
    /// two configurations never match the same devices at once. If the create
    /// fails after a delete, the previous configuration is re-created once,
    /// best effort, and the create error is returned either way.
    pub async fn release_module(&self, desired: &Configuration) -> Result<ReleaseOutcome, LeapError> {
        let id = desired.id.as_str();
        let mut fsm = ReleaseFsm::new();

        fsm.process(ReleaseEvent::Check)?;
        let previous = match self.check(id).await {
            Ok(previous) => previous,
            Err(e) => {
                fsm.process(ReleaseEvent::Abort(e.to_string()))?;
                return Err(e);
            }
        };

        let replaced = match previous {
            Some(_) => {
                fsm.process(ReleaseEvent::Found)?;
                fsm.process(ReleaseEvent::Delete)?;
                info!("Removing existing configuration '{}'", id);
                if let Err(e) = self.remove(id).await {
                    fsm.process(ReleaseEvent::Abort(e.to_string()))?;
                    return Err(e);
                }
                fsm.process(ReleaseEvent::Deleted)?;
                true
            }
            None => {
                fsm.process(ReleaseEvent::NotFound)?;
                fsm.process(ReleaseEvent::Create)?;
                false
            }
        };

        info!("Creating configuration '{}'", id);
        if let Err(e) = self.create(desired).await {
            let rollback = previous.as_ref().and_then(Option::as_ref);
            fsm.process(ReleaseEvent::CreateFailed {
                rollback: rollback.is_some(),
            })?;

            if let Some(previous) = rollback {
                self.rollback(previous).await;
                fsm.process(ReleaseEvent::RollbackFinished)?;
            }

            error!("Release of '{}' failed: {}", id, e);
            return Err(e);
        }

        fsm.process(ReleaseEvent::Created)?;
        info!("Configuration '{}' released", id);

        Ok(ReleaseOutcome {
            id: id.to_string(),
            replaced,
            states: fsm.history().to_vec(),
        })
    }

    /// Tag `device_id` so target conditions of the form
    /// `tags.application.<module>='<version>'` select it.
    ///
    /// Call this before [`Releaser::release_module`] so the new configuration
    /// never matches zero devices.
    pub async fn set_module_on_device(
        &self,
        device_id: &str,
        module_name: &str,
        module_version: &str,
    ) -> Result<(), LeapError> {
        let patch = TagPatch::application(module_name, module_version);
        info!(
            "Tagging device '{}' with application.{}={}",
            device_id, module_name, module_version
        );

        let (res, _) = self.provider.update_twin_tags(device_id, &patch).await?;
        res.expect(&[StatusCode::OK])
            .map_err(|e| LeapError::TwinUpdateFailed {
                device_id: device_id.to_string(),
                source: Box::new(e),
            })
    }

    /// Look up `id`. Outer `None` means absent; inner `None` means present
    /// but the hub sent no body to restore from.
    async fn check(&self, id: &str) -> Result<Option<Option<Configuration>>, LeapError> {
        let (res, current) = self.provider.get_configuration(id).await?;
        res.expect(&[StatusCode::OK, StatusCode::NOT_FOUND])
            .map_err(|e| LeapError::PreconditionFailed {
                id: id.to_string(),
                source: Box::new(e),
            })?;

        if res.is(StatusCode::NOT_FOUND) {
            debug!("Configuration '{}' does not exist", id);
            return Ok(None);
        }

        if current.is_none() {
            warn!("Configuration '{}' exists but the hub returned no body; rollback will not be possible", id);
        }
        Ok(Some(current))
    }

    async fn remove(&self, id: &str) -> Result<(), LeapError> {
        let res = self.provider.delete_configuration(id).await?;
        if res.is(StatusCode::NOT_FOUND) {
            debug!("Configuration '{}' was already gone", id);
        }
        res.expect(&[StatusCode::NO_CONTENT, StatusCode::NOT_FOUND])
            .map_err(|e| LeapError::RemovalFailed {
                id: id.to_string(),
                source: Box::new(e),
            })
    }

    async fn create(&self, config: &Configuration) -> Result<(), LeapError> {
        let (res, _) = self.provider.create_configuration(config).await?;
        res.expect(&[StatusCode::OK])
            .map_err(|e| LeapError::CreationFailed {
                id: config.id.clone(),
                source: Box::new(e),
            })
    }

    /// Single attempt to restore `previous`. Failures are logged only.
    async fn rollback(&self, previous: &Configuration) {
        warn!("Restoring previous configuration '{}'", previous.id);
        match self.create(&previous.without_server_fields()).await {
            Ok(()) => info!("Previous configuration '{}' restored", previous.id),
            Err(e) => error!(
                "Rollback of '{}' failed, manual intervention required: {}",
                previous.id, e
            ),
        }
    }
}
