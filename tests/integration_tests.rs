use httpmock::prelude::*;
use serde_json::json;
use sidecar_cutover::core::manifest::encode_compose;
use sidecar_cutover::domain::model::{CutoverStep, OutcomeStatus};
use sidecar_cutover::{
    AzureControlPlane, CutoverOrchestrator, CutoverState, DeploymentTarget, EngineConfig, LocalStorage,
    MigrationError, StaticTokenProvider,
};
use std::time::Duration;
use tempfile::TempDir;

const SITE: &str = "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Web/sites/app1";

const SCENARIO_MANIFEST: &str = r#"{"web": {"image":"acr/web:1.0","ports":["8080:80"]}, "worker": {"image":"acr/worker:1.0"}}"#;

fn target() -> DeploymentTarget {
    DeploymentTarget::new("sub1", "rg1", "app1", "stage")
}

fn settings(server: &MockServer, output: &TempDir) -> EngineConfig {
    let mut settings = EngineConfig::default();
    settings.platform.management_url = server.base_url();
    settings.platform.retry_delay_ms = 1;
    settings.apply.concurrency = 2;
    settings.artifact.output_path = output.path().to_str().unwrap().to_string();
    settings
}

fn orchestrator(
    server: &MockServer,
    output: &TempDir,
) -> CutoverOrchestrator<AzureControlPlane<StaticTokenProvider>, LocalStorage> {
    orchestrator_with(settings(server, output))
}

fn orchestrator_with(
    settings: EngineConfig,
) -> CutoverOrchestrator<AzureControlPlane<StaticTokenProvider>, LocalStorage> {
    let control_plane =
        AzureControlPlane::new(&settings, StaticTokenProvider::new("test-token").unwrap()).unwrap();
    let storage = LocalStorage::new(settings.artifact.output_path.clone());
    CutoverOrchestrator::new(control_plane, storage)
        .with_settings(&settings)
        .with_run_id("cutover_test")
}

fn mock_site_and_slot(server: &MockServer) -> (httpmock::Mock<'_>, httpmock::Mock<'_>) {
    let site = server.mock(|when, then| {
        when.method(GET).path(SITE);
        then.status(200).json_body(json!({ "name": "app1", "location": "westeurope" }));
    });
    let slot = server.mock(|when, then| {
        when.method(PUT)
            .path(format!("{}/slots/stage", SITE))
            .header("authorization", "Bearer test-token");
        then.status(200).json_body(json!({ "name": "app1/stage" }));
    });
    (site, slot)
}

fn mock_runtime_config<'a>(server: &'a MockServer, manifest: &str) -> httpmock::Mock<'a> {
    let value = encode_compose(manifest);
    server.mock(|when, then| {
        when.method(GET).path(format!("{}/config/web", SITE));
        then.status(200)
            .json_body(json!({ "properties": { "linuxFxVersion": value } }));
    })
}

fn mock_mode_and_restart(server: &MockServer) -> (httpmock::Mock<'_>, httpmock::Mock<'_>) {
    let mode = server.mock(|when, then| {
        when.method(httpmock::Method::PATCH)
            .path(format!("{}/slots/stage/config/web", SITE))
            .json_body(json!({ "properties": { "linuxFxVersion": "SITECONTAINERS" } }));
        then.status(200).json_body(json!({}));
    });
    let restart = server.mock(|when, then| {
        when.method(POST).path(format!("{}/slots/stage/restart", SITE));
        then.status(200);
    });
    (mode, restart)
}

#[tokio::test]
async fn test_end_to_end_cutover_against_mock_platform() {
    let output = TempDir::new().unwrap();
    let server = MockServer::start();

    let (site, slot) = mock_site_and_slot(&server);
    let config = mock_runtime_config(&server, SCENARIO_MANIFEST);
    let web = server.mock(|when, then| {
        when.method(PUT)
            .path(format!("{}/slots/stage/sitecontainers/web", SITE))
            .query_param("api-version", "2024-04-01")
            .json_body(json!({ "properties": { "image": "acr/web:1.0", "isMain": true, "targetPort": "80" } }));
        then.status(200)
            .json_body(json!({ "id": "sc/web", "properties": { "image": "acr/web:1.0", "isMain": true, "targetPort": "80" } }));
    });
    let worker = server.mock(|when, then| {
        when.method(PUT)
            .path(format!("{}/slots/stage/sitecontainers/worker", SITE))
            .json_body(json!({ "properties": { "image": "acr/worker:1.0", "isMain": false } }));
        then.status(200)
            .json_body(json!({ "id": "sc/worker", "properties": { "image": "acr/worker:1.0", "isMain": false } }));
    });
    let (mode, restart) = mock_mode_and_restart(&server);

    let report = orchestrator(&server, &output).run(&target()).await.unwrap();

    site.assert();
    slot.assert();
    config.assert();
    web.assert();
    worker.assert();
    mode.assert();
    restart.assert();

    assert_eq!(report.final_state(), CutoverState::AwaitingPromotion);
    assert_eq!(
        report.states,
        vec![
            CutoverState::Start,
            CutoverState::SlotCreated,
            CutoverState::ManifestFetched,
            CutoverState::TopologyApplied,
            CutoverState::ModeSwitched,
            CutoverState::Restarted,
            CutoverState::AwaitingPromotion,
        ]
    );

    let descriptors = report.topology.descriptors();
    assert_eq!(descriptors.len(), 2);
    assert_eq!((descriptors[0].name.as_str(), descriptors[0].port, descriptors[0].is_primary), ("web", Some(80), true));
    assert_eq!((descriptors[1].name.as_str(), descriptors[1].port, descriptors[1].is_primary), ("worker", None, false));
    assert_eq!(report.apply.applied_count(), 2);

    assert!(report.promotion_command.contains("app1"));
    assert!(report.promotion_command.contains("rg1"));
    assert!(report.promotion_command.contains("--slot stage"));

    // decoded manifest kept on disk for auditing
    let artifact = std::fs::read_to_string(output.path().join("decoded-compose.yml")).unwrap();
    assert_eq!(artifact, SCENARIO_MANIFEST);
}

#[tokio::test]
async fn test_partial_failure_still_switches_mode() {
    let output = TempDir::new().unwrap();
    let server = MockServer::start();

    let _slot_mocks = mock_site_and_slot(&server);
    let _config = mock_runtime_config(&server, SCENARIO_MANIFEST);
    server.mock(|when, then| {
        when.method(PUT).path(format!("{}/slots/stage/sitecontainers/web", SITE));
        then.status(200).json_body(json!({ "properties": { "image": "acr/web:1.0" } }));
    });
    server.mock(|when, then| {
        when.method(PUT).path(format!("{}/slots/stage/sitecontainers/worker", SITE));
        then.status(400)
            .body(r#"{"error":{"code":"InvalidImage","message":"manifest unknown"}}"#);
    });
    let (mode, restart) = mock_mode_and_restart(&server);

    let report = orchestrator(&server, &output).run(&target()).await.unwrap();

    mode.assert();
    restart.assert();
    assert!(report.apply.is_partial());
    assert_eq!(report.apply.failed_services(), vec!["worker"]);
    match &report.apply.outcomes[1].status {
        OutcomeStatus::Failed { kind, detail } => {
            assert_eq!(kind, "PlatformRequest");
            assert!(detail.contains("InvalidImage"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_retried_upsert_reports_platform_error_not_timeout() {
    let output = TempDir::new().unwrap();
    let server = MockServer::start();

    let _slot_mocks = mock_site_and_slot(&server);
    let _config = mock_runtime_config(&server, SCENARIO_MANIFEST);
    let web = server.mock(|when, then| {
        when.method(PUT).path(format!("{}/slots/stage/sitecontainers/web", SITE));
        then.status(503).delay(Duration::from_millis(700)).body("busy");
    });
    server.mock(|when, then| {
        when.method(PUT).path(format!("{}/slots/stage/sitecontainers/worker", SITE));
        then.status(200).json_body(json!({ "properties": { "image": "acr/worker:1.0" } }));
    });
    let _mode_mocks = mock_mode_and_restart(&server);

    let mut settings = settings(&server, &output);
    settings.platform.request_timeout_seconds = 1;
    settings.platform.retry_attempts = 2;

    let report = orchestrator_with(settings).run(&target()).await.unwrap();

    // every attempt ran to completion inside the call deadline
    web.assert_hits(3);
    match &report.apply.outcomes[0].status {
        OutcomeStatus::Failed { kind, detail } => {
            assert_eq!(kind, "PlatformRequest");
            assert!(detail.contains("HTTP 503"));
            assert!(detail.contains("busy"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(report.apply.is_partial());
}

#[tokio::test]
async fn test_total_failure_stops_before_mode_switch() {
    let output = TempDir::new().unwrap();
    let server = MockServer::start();

    let _slot_mocks = mock_site_and_slot(&server);
    let _config = mock_runtime_config(&server, SCENARIO_MANIFEST);
    server.mock(|when, then| {
        when.method(PUT).path_contains("/sitecontainers/");
        then.status(400).body("InvalidImage");
    });
    let (mode, restart) = mock_mode_and_restart(&server);

    let err = orchestrator(&server, &output).run(&target()).await.unwrap_err();

    mode.assert_hits(0);
    restart.assert_hits(0);
    assert_eq!(err.step(), Some(CutoverStep::ApplyTopology));
    assert!(matches!(err.root(), MigrationError::TopologyNotApplied { .. }));
}

#[tokio::test]
async fn test_empty_manifest_declares_nothing() {
    let output = TempDir::new().unwrap();
    let server = MockServer::start();

    let _slot_mocks = mock_site_and_slot(&server);
    let _config = mock_runtime_config(&server, "services: {}\n");
    let upserts = server.mock(|when, then| {
        when.method(PUT).path_contains("/sitecontainers/");
        then.status(200);
    });
    let (mode, restart) = mock_mode_and_restart(&server);

    let err = orchestrator(&server, &output).run(&target()).await.unwrap_err();

    upserts.assert_hits(0);
    mode.assert_hits(0);
    restart.assert_hits(0);
    assert_eq!(err.kind(), "EmptyTopology");
}

#[tokio::test]
async fn test_rejected_token_fails_at_slot_creation() {
    let output = TempDir::new().unwrap();
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path(SITE);
        then.status(401).body("InvalidAuthenticationToken");
    });
    let config = server.mock(|when, then| {
        when.method(GET).path(format!("{}/config/web", SITE));
        then.status(200);
    });

    let err = orchestrator(&server, &output).run(&target()).await.unwrap_err();

    config.assert_hits(0);
    assert_eq!(err.step(), Some(CutoverStep::CreateSlot));
    assert_eq!(err.kind(), "PlatformAuth");
    assert_eq!(err.severity().exit_code(), 1);
}

#[tokio::test]
async fn test_dry_run_only_reads_configuration() {
    let output = TempDir::new().unwrap();
    let server = MockServer::start();

    let (site, slot) = mock_site_and_slot(&server);
    let config = mock_runtime_config(&server, SCENARIO_MANIFEST);

    let plan = orchestrator(&server, &output).plan(&target()).await.unwrap();

    config.assert();
    site.assert_hits(0);
    slot.assert_hits(0);
    assert_eq!(plan.run_id, "cutover_test");
    assert_eq!(plan.topology.primary().name, "web");
    assert!(output.path().join("decoded-compose.yml").exists());
}
