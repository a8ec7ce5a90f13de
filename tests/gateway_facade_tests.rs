//! Peer façade tests
//!
//! Mirrored authentication toggle, tunnel port mapping, broker settings and
//! version reporting against scripted peers.

mod common;

use actix_web::http::StatusCode;
use serde_json::json;
use tempfile::TempDir;

use common::{BRIDGE, BROKER, Scripted, ScriptedTransport, TUNNEL, scripted_client};
use gnode::config::{DeviceMode, SystemConfig};
use gnode::gateway::{
    BrokerSettings, MirroredToggle, ToggleState, TunnelPortMapping, TunnelUpdate, UNKNOWN_VERSION,
    VersionInfo,
};

// =============================================================================
// 认证开关
// =============================================================================

#[tokio::test]
async fn test_toggle_confirmed_on_both_peers() {
    let transport = ScriptedTransport::new();
    transport
        .on(BROKER, "PUT", "set_api_auth_off", Scripted::ok())
        .on(BRIDGE, "PUT", "set_api_auth_off", Scripted::ok());

    let outcome = MirroredToggle::new(scripted_client(&transport))
        .apply(true, false)
        .await;

    assert!(outcome.is_confirmed());
    assert_eq!(
        transport.calls(),
        vec!["broker PUT set_api_auth_off", "bridge PUT set_api_auth_off"]
    );
}

#[tokio::test]
async fn test_toggle_broker_refusal_leaves_bridge_alone() {
    let transport = ScriptedTransport::new();
    transport.on(BROKER, "PUT", "set_api_auth_on", Scripted::refused("locked"));

    let outcome = MirroredToggle::new(scripted_client(&transport))
        .apply(false, true)
        .await;

    assert_eq!(outcome.state(), ToggleState::Unchanged);
    assert_eq!(transport.count("bridge PUT set_api_auth_on"), 0);
    let err = outcome.into_result().unwrap_err();
    assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_toggle_bridge_refusal_restores_broker() {
    let transport = ScriptedTransport::new();
    transport
        .on(BROKER, "PUT", "set_api_auth_off", Scripted::ok())
        .on(BRIDGE, "PUT", "set_api_auth_off", Scripted::refused("busy"))
        .on(BROKER, "PUT", "set_api_auth_on", Scripted::ok());

    let outcome = MirroredToggle::new(scripted_client(&transport))
        .apply(true, false)
        .await;

    assert_eq!(outcome.state(), ToggleState::RolledBack);
    assert_eq!(
        transport.calls(),
        vec![
            "broker PUT set_api_auth_off",
            "bridge PUT set_api_auth_off",
            "broker PUT set_api_auth_on",
        ]
    );
    let err = outcome.into_result().unwrap_err();
    assert_eq!(err.code(), "E014");
    assert_eq!(err.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_toggle_requires_exact_confirmation() {
    let transport = ScriptedTransport::new();
    transport
        .on(BROKER, "PUT", "set_api_auth_off", Scripted::done())
        .on(BRIDGE, "PUT", "set_api_auth_off", Scripted::ok());

    let outcome = MirroredToggle::new(scripted_client(&transport))
        .apply(true, false)
        .await;

    assert_eq!(outcome.state(), ToggleState::Unchanged);
    assert_eq!(transport.calls(), vec!["broker PUT set_api_auth_off"]);
}

#[tokio::test]
async fn test_toggle_failed_restore_is_inconsistent() {
    let transport = ScriptedTransport::new();
    transport
        .on(BROKER, "PUT", "set_api_auth_off", Scripted::ok())
        .on(BRIDGE, "PUT", "set_api_auth_off", Scripted::Unreachable);

    let outcome = MirroredToggle::new(scripted_client(&transport))
        .apply(true, false)
        .await;

    assert_eq!(outcome.state(), ToggleState::Inconsistent);
    assert_eq!(outcome.into_result().unwrap_err().code(), "E015");
}

// =============================================================================
// 隧道端口映射
// =============================================================================

#[tokio::test]
async fn test_tunnel_reads_mappings() {
    let transport = ScriptedTransport::new();
    transport.on(
        TUNNEL,
        "info",
        "",
        Scripted::doc(json!([[443, "tcp", 40443], [8080, "tcp", 40080]])),
    );

    let status = TunnelPortMapping::new(scripted_client(&transport)).read().await;

    assert_eq!(status.https, Some(true));
    assert_eq!(status.ssh, Some(false));
}

#[tokio::test]
async fn test_tunnel_unknown_when_unreachable_or_malformed() {
    let transport = ScriptedTransport::new();
    let tunnel = TunnelPortMapping::new(scripted_client(&transport));
    assert_eq!(tunnel.read().await.https, None);

    transport.on(TUNNEL, "info", "", Scripted::doc(json!([[443, "tcp"]])));
    let status = tunnel.read().await;
    assert_eq!(status.https, None);
    assert_eq!(status.ssh, None);
}

#[tokio::test]
async fn test_tunnel_write_stops_at_first_refusal() {
    let transport = ScriptedTransport::new();
    transport
        .on(TUNNEL, "https_off", "", Scripted::refused("not connected"))
        .on(TUNNEL, "ssh_on", "", Scripted::confirmed());

    let err = TunnelPortMapping::new(scripted_client(&transport))
        .write(TunnelUpdate {
            https: Some(false),
            ssh: Some(true),
        })
        .await
        .unwrap_err();

    assert_eq!(err.message(), "not connected");
    assert_eq!(transport.calls(), vec!["tunnel https_off"]);
}

#[tokio::test]
async fn test_tunnel_write_stops_without_confirmation() {
    let transport = ScriptedTransport::new();
    transport
        .on(TUNNEL, "https_on", "", Scripted::done())
        .on(TUNNEL, "ssh_on", "", Scripted::confirmed());

    let err = TunnelPortMapping::new(scripted_client(&transport))
        .write(TunnelUpdate {
            https: Some(true),
            ssh: Some(true),
        })
        .await
        .unwrap_err();

    assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);
    assert_eq!(transport.count("tunnel ssh_on"), 0);
}

#[tokio::test]
async fn test_tunnel_lowercase_ok_is_not_confirmation() {
    let transport = ScriptedTransport::new();
    transport.on(TUNNEL, "ssh_off", "", Scripted::ok());

    let result = TunnelPortMapping::new(scripted_client(&transport))
        .write(TunnelUpdate {
            https: None,
            ssh: Some(false),
        })
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_tunnel_https_only_write() {
    let transport = ScriptedTransport::new();
    transport.on(TUNNEL, "https_on", "", Scripted::confirmed());

    TunnelPortMapping::new(scripted_client(&transport))
        .write(TunnelUpdate {
            https: Some(true),
            ssh: None,
        })
        .await
        .unwrap();

    assert_eq!(transport.calls(), vec!["tunnel https_on"]);
}

// =============================================================================
// Broker 设置
// =============================================================================

#[tokio::test]
async fn test_allow_anonymous_defaults_to_false_when_unreachable() {
    let transport = ScriptedTransport::new();
    let broker = BrokerSettings::new(scripted_client(&transport));
    assert!(!broker.allow_anonymous().await);

    transport.on(BROKER, "poll", "", Scripted::flag(true));
    assert!(broker.allow_anonymous().await);
    assert_eq!(transport.count("broker poll"), 2);
}

#[tokio::test]
async fn test_set_allow_anonymous_sends_switch_byte() {
    let transport = ScriptedTransport::new();
    transport.on(BROKER, "switch_off", "", Scripted::done());
    let broker = BrokerSettings::new(scripted_client(&transport));

    broker.set_allow_anonymous(false).await.unwrap();
    assert_eq!(transport.calls(), vec!["broker switch_off"]);

    // 对端不可达时报告不可用
    let err = broker.set_allow_anonymous(true).await.unwrap_err();
    assert_eq!(err.http_status(), StatusCode::SERVICE_UNAVAILABLE);
}

// =============================================================================
// 版本信息
// =============================================================================

fn system_config(dir: &TempDir) -> SystemConfig {
    SystemConfig {
        mode: Some(DeviceMode::Virtual),
        api_version_path: dir.path().join("api_version").display().to_string(),
        serial_number_path: dir.path().join("serial").display().to_string(),
        ..SystemConfig::default()
    }
}

#[tokio::test]
async fn test_version_combines_peer_versions() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("api_version"), "1.4.0\n").unwrap();
    std::fs::write(dir.path().join("serial"), "GN-0042\n").unwrap();

    let transport = ScriptedTransport::new();
    transport.on(BRIDGE, "api_version", "", Scripted::text("2.1"));

    let version = VersionInfo::new(scripted_client(&transport), &system_config(&dir));
    let report = version.report().await.unwrap();

    assert_eq!(report.api_version, format!("1.4.0.2.1.{}", UNKNOWN_VERSION));
    assert_eq!(report.serial_number, "GN-0042");

    let info = version.info().await.unwrap();
    assert_eq!(info.mode, DeviceMode::Virtual);
    assert_eq!(serde_json::to_value(&info).unwrap()["mode"], "virtual");
}

#[tokio::test]
async fn test_version_missing_file_is_error() {
    let dir = TempDir::new().unwrap();
    let transport = ScriptedTransport::new();

    let err = VersionInfo::new(scripted_client(&transport), &system_config(&dir))
        .report()
        .await
        .unwrap_err();

    assert_eq!(err.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
}
