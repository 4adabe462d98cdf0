//! Release and draft deployment flows

use tracing::info;

use crate::app::settings::Settings;
use crate::errors::LeapError;
use crate::models::configuration::{target_condition_for, Configuration, ModuleSpec};
use crate::release::provider::connect;
use crate::release::releaser::{ReleaseOutcome, Releaser};
use crate::utils::split_key_values;

/// Label carrying the release attempt id
pub const RELEASE_ID_LABEL: &str = "releaseId";

/// Settings that must be set before `release` talks to the hub
pub const RELEASE_REQUIRED: &[&str] = &[
    "deployment.id",
    "deployment.target-condition",
    "module.name",
    "module.image",
    "infra.hub",
    "auth.token",
];

/// Settings that must be set before `draft deploy` talks to the hub
pub const DRAFT_DEPLOY_REQUIRED: &[&str] = &[
    "session",
    "deployment.id",
    "device.name",
    "module.name",
    "module.image",
    "infra.hub",
    "auth.token",
];

/// Module description taken from the settings
pub fn module_from_settings(settings: &Settings) -> Result<ModuleSpec, LeapError> {
    Ok(ModuleSpec {
        name: settings.module.name.clone(),
        image: settings.module.image.clone(),
        create_options: settings.module.create_options.clone(),
        startup_order: settings.module.startup_order,
        env: split_key_values(&settings.module.env, "=")?,
    })
}

/// Configuration published by `release`
pub fn release_configuration(settings: &Settings, release_id: &str) -> Result<Configuration, LeapError> {
    let module = module_from_settings(settings)?;
    let mut config = Configuration::new(
        settings.deployment.id.clone(),
        settings.deployment.priority,
        settings.deployment.target_condition.clone(),
    )
    .with_label(RELEASE_ID_LABEL, release_id);

    config.set_content(&module);
    config.validate_content(&module.name)?;
    Ok(config)
}

/// Configuration published by `draft deploy`: one per session, targeting
/// devices tagged with that session.
pub fn draft_configuration(settings: &Settings) -> Result<Configuration, LeapError> {
    let module = module_from_settings(settings)?;
    let mut config = Configuration::new(
        draft_deployment_id(settings),
        settings.deployment.priority,
        target_condition_for(&module.name, &settings.session),
    );

    config.set_content(&module);
    config.validate_content(&module.name)?;
    Ok(config)
}

/// `<deployment id>-<session>`
pub fn draft_deployment_id(settings: &Settings) -> String {
    format!("{}-{}", settings.deployment.id, settings.session)
}

/// Publish the module described by `settings` as a labelled release
pub async fn release(
    releaser: &Releaser,
    settings: &Settings,
    release_id: &str,
) -> Result<ReleaseOutcome, LeapError> {
    let config = release_configuration(settings, release_id)?;

    info!("Releasing '{}' as release {}", config.id, release_id);
    releaser.release_module(&config).await
}

/// Tag the development device with the session, then publish the draft
/// configuration that targets it
pub async fn draft_deploy(releaser: &Releaser, settings: &Settings) -> Result<ReleaseOutcome, LeapError> {
    let config = draft_configuration(settings)?;

    releaser
        .set_module_on_device(&settings.device.name, &settings.module.name, &settings.session)
        .await?;
    releaser.release_module(&config).await
}

/// Build a releaser connected to the hub named in `settings`, once every
/// key in `required` is set
pub fn connect_releaser(settings: &Settings, required: &[&str]) -> Result<Releaser, LeapError> {
    settings.require(required)?;
    let options = settings.provider_options()?;
    Ok(Releaser::new(connect(&options)?))
}
