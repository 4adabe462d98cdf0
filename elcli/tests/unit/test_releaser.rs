//! Release orchestrator and device binder tests

use std::collections::BTreeMap;
use std::sync::Arc;

use elcli::app::run::{draft_deploy, release};
use elcli::app::settings::Settings;
use elcli::errors::LeapError;
use elcli::models::configuration::{Configuration, ModuleSpec};
use elcli::models::twin::Twin;
use elcli::release::fsm::ReleaseState;
use elcli::release::releaser::Releaser;
use http::StatusCode;
use serde_json::json;

use crate::mock_hub::{Call, MockHub};

fn web_config(image: &str) -> Configuration {
    let mut config = Configuration::new("app-web", 10, "tags.application.web='v2'");
    config.set_content(&ModuleSpec {
        name: "web".to_string(),
        image: image.to_string(),
        create_options: "{}".to_string(),
        startup_order: 1,
        env: BTreeMap::new(),
    });
    config
}

fn setup(hub: MockHub) -> (Arc<MockHub>, Releaser) {
    let hub = Arc::new(hub);
    let releaser = Releaser::new(hub.clone());
    (hub, releaser)
}

fn is_create(call: &Call) -> bool {
    matches!(call, Call::Create(_))
}

fn is_delete(call: &Call) -> bool {
    matches!(call, Call::Delete(_))
}

#[tokio::test]
async fn test_release_when_absent_creates_once() {
    let (hub, releaser) = setup(MockHub::new());
    let desired = web_config("registry/web:v2");

    let outcome = releaser.release_module(&desired).await.unwrap();

    assert!(!outcome.replaced);
    assert_eq!(outcome.states.last(), Some(&ReleaseState::Released));
    assert_eq!(hub.count(is_create), 1);
    assert_eq!(hub.count(is_delete), 0);
    assert_eq!(hub.configuration_count(), 1);
    assert_eq!(hub.configuration("app-web").unwrap().content, desired.content);
}

#[tokio::test]
async fn test_release_replaces_existing() {
    let (hub, releaser) = setup(MockHub::new().with_configuration(web_config("registry/web:v1")));
    let desired = web_config("registry/web:v2");

    let outcome = releaser.release_module(&desired).await.unwrap();

    assert!(outcome.replaced);
    assert_eq!(
        hub.calls(),
        vec![
            Call::Get("app-web".to_string()),
            Call::Delete("app-web".to_string()),
            Call::Create(desired.clone()),
        ]
    );
    assert_eq!(hub.configuration_count(), 1);
    let stored = hub.configuration("app-web").unwrap();
    assert_eq!(stored.module_image("web"), Some("registry/web:v2"));
    assert!(!outcome.states.contains(&ReleaseState::RollingBack));
}

#[tokio::test]
async fn test_failed_create_restores_previous() {
    let mut previous = web_config("registry/web:v1");
    previous.etag = Some("MQ==".to_string());
    let (hub, releaser) = setup(
        MockHub::new()
            .with_configuration(previous.clone())
            .fail_creates(&[StatusCode::INTERNAL_SERVER_ERROR]),
    );

    let err = releaser
        .release_module(&web_config("registry/web:v2"))
        .await
        .unwrap_err();

    assert!(matches!(err, LeapError::CreationFailed { .. }));
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));

    let creates: Vec<Configuration> = hub
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::Create(config) => Some(config),
            _ => None,
        })
        .collect();
    assert_eq!(creates.len(), 2);
    assert_eq!(creates[1].module_image("web"), Some("registry/web:v1"));
    assert!(creates[1].etag.is_none());

    let restored = hub.configuration("app-web").unwrap();
    assert_eq!(restored.module_image("web"), Some("registry/web:v1"));
}

#[tokio::test]
async fn test_failed_rollback_returns_original_error() {
    let (hub, releaser) = setup(
        MockHub::new()
            .with_configuration(web_config("registry/web:v1"))
            .fail_creates(&[StatusCode::INTERNAL_SERVER_ERROR, StatusCode::SERVICE_UNAVAILABLE]),
    );

    let err = releaser
        .release_module(&web_config("registry/web:v2"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(hub.count(is_create), 2);
    assert_eq!(hub.configuration_count(), 0);
}

#[tokio::test]
async fn test_failed_create_without_previous_skips_rollback() {
    let (hub, releaser) = setup(MockHub::new().fail_creates(&[StatusCode::BAD_REQUEST]));

    let err = releaser
        .release_module(&web_config("registry/web:v2"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    assert_eq!(hub.count(is_create), 1);
    assert_eq!(hub.count(is_delete), 0);
}

#[tokio::test]
async fn test_conflict_on_create_is_not_retried() {
    let (hub, releaser) = setup(MockHub::new().fail_creates(&[StatusCode::CONFLICT]));

    let err = releaser
        .release_module(&web_config("registry/web:v2"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::CONFLICT));
    assert_eq!(hub.count(is_create), 1);
}

#[tokio::test]
async fn test_precondition_failure_mutates_nothing() {
    let (hub, releaser) = setup(MockHub::new().fail_get(StatusCode::INTERNAL_SERVER_ERROR));

    let err = releaser
        .release_module(&web_config("registry/web:v2"))
        .await
        .unwrap_err();

    assert!(matches!(err, LeapError::PreconditionFailed { .. }));
    assert_eq!(hub.calls(), vec![Call::Get("app-web".to_string())]);
}

#[tokio::test]
async fn test_unauthorized_is_reported_as_token_problem() {
    let (_hub, releaser) = setup(MockHub::new().fail_get(StatusCode::UNAUTHORIZED));

    let err = releaser
        .release_module(&web_config("registry/web:v2"))
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert!(err.to_string().contains("invalid or missing token"));
}

#[tokio::test]
async fn test_transport_error_is_returned_verbatim() {
    let (hub, releaser) = setup(MockHub::new().fail_get_transport());

    let err = releaser
        .release_module(&web_config("registry/web:v2"))
        .await
        .unwrap_err();

    assert!(matches!(err, LeapError::IoError(_)));
    assert_eq!(hub.count(is_create), 0);
    assert_eq!(hub.count(is_delete), 0);
}

#[tokio::test]
async fn test_create_transport_error_restores_previous() {
    let mut previous = web_config("registry/web:v1");
    previous.etag = Some("MQ==".to_string());
    let (hub, releaser) = setup(
        MockHub::new()
            .with_configuration(previous.clone())
            .fail_create_transport(1),
    );
    let desired = web_config("registry/web:v2");

    let err = releaser.release_module(&desired).await.unwrap_err();

    match err {
        LeapError::IoError(e) => assert_eq!(e.kind(), std::io::ErrorKind::ConnectionRefused),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(
        hub.calls(),
        vec![
            Call::Get("app-web".to_string()),
            Call::Delete("app-web".to_string()),
            Call::Create(desired),
            Call::Create(previous.without_server_fields()),
        ]
    );
    let restored = hub.configuration("app-web").unwrap();
    assert_eq!(restored.module_image("web"), Some("registry/web:v1"));
}

#[tokio::test]
async fn test_create_transport_error_without_previous() {
    let (hub, releaser) = setup(MockHub::new().fail_create_transport(1));

    let err = releaser
        .release_module(&web_config("registry/web:v2"))
        .await
        .unwrap_err();

    assert!(matches!(err, LeapError::IoError(_)));
    assert_eq!(hub.count(is_create), 1);
    assert_eq!(hub.configuration_count(), 0);
}

#[tokio::test]
async fn test_delete_transport_error_skips_create() {
    let (hub, releaser) = setup(
        MockHub::new()
            .with_configuration(web_config("registry/web:v1"))
            .fail_delete_transport(),
    );

    let err = releaser
        .release_module(&web_config("registry/web:v2"))
        .await
        .unwrap_err();

    assert!(matches!(err, LeapError::IoError(_)));
    assert_eq!(hub.count(is_create), 0);
    let kept = hub.configuration("app-web").unwrap();
    assert_eq!(kept.module_image("web"), Some("registry/web:v1"));
}

#[tokio::test]
async fn test_delete_failure_skips_create() {
    let (hub, releaser) = setup(
        MockHub::new()
            .with_configuration(web_config("registry/web:v1"))
            .fail_delete(StatusCode::INTERNAL_SERVER_ERROR),
    );

    let err = releaser
        .release_module(&web_config("registry/web:v2"))
        .await
        .unwrap_err();

    assert!(matches!(err, LeapError::RemovalFailed { .. }));
    assert_eq!(hub.count(is_create), 0);
    assert_eq!(
        hub.configuration("app-web").unwrap().module_image("web"),
        Some("registry/web:v1")
    );
}

#[tokio::test]
async fn test_delete_not_found_counts_as_gone() {
    let (hub, releaser) = setup(
        MockHub::new()
            .with_configuration(web_config("registry/web:v1"))
            .deleted_elsewhere(),
    );

    let outcome = releaser
        .release_module(&web_config("registry/web:v2"))
        .await
        .unwrap();

    assert!(outcome.replaced);
    assert_eq!(hub.count(is_delete), 1);
    assert_eq!(hub.count(is_create), 1);
    assert_eq!(
        hub.configuration("app-web").unwrap().module_image("web"),
        Some("registry/web:v2")
    );
}

#[tokio::test]
async fn test_release_is_idempotent() {
    let (hub, releaser) = setup(MockHub::new());
    let desired = web_config("registry/web:v2");

    releaser.release_module(&desired).await.unwrap();
    let first = hub.configuration("app-web").unwrap();
    releaser.release_module(&desired).await.unwrap();
    let second = hub.configuration("app-web").unwrap();

    assert_eq!(hub.configuration_count(), 1);
    assert_eq!(first.without_server_fields(), second.without_server_fields());
    assert_ne!(first.etag, second.etag);
}

#[tokio::test]
async fn test_set_module_on_device_is_idempotent() {
    let twin: Twin = serde_json::from_value(json!({
        "deviceId": "edge-01",
        "tags": {"application": {"api": "v1"}, "site": "north"}
    }))
    .unwrap();
    let (hub, releaser) = setup(MockHub::new().with_twin(twin));

    releaser.set_module_on_device("edge-01", "web", "v2").await.unwrap();
    let once = hub.twin("edge-01").unwrap();
    releaser.set_module_on_device("edge-01", "web", "v2").await.unwrap();
    let twice = hub.twin("edge-01").unwrap();

    assert_eq!(once, twice);
    assert_eq!(twice.application_version("web"), Some("v2"));
    assert_eq!(twice.application_version("api"), Some("v1"));
    assert_eq!(twice.tags["site"], "north");
}

#[tokio::test]
async fn test_set_module_on_unknown_device_fails() {
    let (_hub, releaser) = setup(
        MockHub::new().fail_twin(StatusCode::NOT_FOUND, Some("DeviceNotFound")),
    );

    let err = releaser
        .set_module_on_device("ghost", "web", "v2")
        .await
        .unwrap_err();

    assert!(matches!(err, LeapError::TwinUpdateFailed { .. }));
    assert!(err.to_string().contains("DeviceNotFound"));
}

fn draft_settings() -> Settings {
    let mut settings = Settings::default();
    settings.session = "4f2a9c1d".to_string();
    settings.deployment.id = "app-web".to_string();
    settings.deployment.target_condition = "tags.application.web='v2'".to_string();
    settings.device.name = "edge-01".to_string();
    settings.module.name = "web".to_string();
    settings.module.image = "registry/web:v2".to_string();
    settings.infra.hub = "my-hub".to_string();
    settings.auth.token = "token".to_string();
    settings
}

#[tokio::test]
async fn test_draft_deploy_tags_device_before_release() {
    let twin = Twin {
        device_id: "edge-01".to_string(),
        ..Default::default()
    };
    let (hub, releaser) = setup(MockHub::new().with_twin(twin));

    let outcome = draft_deploy(&releaser, &draft_settings()).await.unwrap();

    assert_eq!(outcome.id, "app-web-4f2a9c1d");
    let calls = hub.calls();
    assert!(matches!(calls[0], Call::UpdateTwin(ref device, _) if device == "edge-01"));
    assert_eq!(calls[1], Call::Get("app-web-4f2a9c1d".to_string()));
    assert_eq!(
        hub.twin("edge-01").unwrap().application_version("web"),
        Some("4f2a9c1d")
    );
    assert_eq!(
        hub.configuration("app-web-4f2a9c1d").unwrap().target_condition,
        "tags.application.web='4f2a9c1d'"
    );
}

#[tokio::test]
async fn test_draft_deploy_stops_when_tagging_fails() {
    let (hub, releaser) = setup(MockHub::new());

    let err = draft_deploy(&releaser, &draft_settings()).await.unwrap_err();

    assert!(matches!(err, LeapError::TwinUpdateFailed { .. }));
    assert_eq!(hub.calls().len(), 1);
}

#[tokio::test]
async fn test_release_rejects_bad_env_before_hub() {
    let (hub, releaser) = setup(MockHub::new());
    let mut settings = draft_settings();
    settings.module.env = vec!["MODE".to_string()];

    let err = release(&releaser, &settings, "0123456789ab")
        .await
        .unwrap_err();

    assert!(matches!(err, LeapError::ConfigError(_)));
    assert!(hub.calls().is_empty());
}

#[tokio::test]
async fn test_release_labels_configuration() {
    let (hub, releaser) = setup(MockHub::new());

    release(&releaser, &draft_settings(), "0123456789ab")
        .await
        .unwrap();

    let stored = hub.configuration("app-web").unwrap();
    assert_eq!(stored.labels["releaseId"], "0123456789ab");
    assert_eq!(stored.priority, 50);
}
