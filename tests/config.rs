use git_deploy::config::{Config, Credentials, TargetDescriptor, TransportKind};
use git_deploy::error::DeployError;

fn config_error(json: &str) -> String {
    match Config::from_json(json) {
        Err(DeployError::Config(message)) => message,
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn local_and_remote_targets() {
    let config = Config::from_json(
        r#"{
            "path": "/srv/src",
            "targets": [
                {"path": "/var/www"},
                {"path": "/home/deploy/www", "mode": "SSH",
                 "auth": {"host": "web1", "user": "deploy", "port": 2222}}
            ]
        }"#,
    )
    .unwrap();

    assert_eq!(config.source_path, "/srv/src");
    assert_eq!(
        config.targets,
        vec![
            TargetDescriptor::local("/var/www"),
            TargetDescriptor::remote(
                "/home/deploy/www",
                Credentials {
                    host: Some("web1".into()),
                    user: Some("deploy".into()),
                    port: Some(2222),
                    ..Credentials::default()
                }
            ),
        ]
    );
}

#[test]
fn mode_is_case_insensitive() {
    assert_eq!(TransportKind::parse("Remote"), Some(TransportKind::Remote));
    assert_eq!(TransportKind::parse("LOCAL"), Some(TransportKind::Local));
    assert_eq!(TransportKind::parse("ftp"), None);
}

#[test]
fn remote_without_auth_loads() {
    let config =
        Config::from_json(r#"{"path": "/s", "targets": [{"path": "/t", "mode": "remote"}]}"#)
            .unwrap();

    assert_eq!(config.targets[0].transport, TransportKind::Remote);
    assert!(config.targets[0].credentials.is_none());
}

#[test]
fn missing_path_and_targets_reported_together() {
    let message = config_error("{}");

    assert_eq!(message, "path is missing, targets are missing");
}

#[test]
fn empty_targets_rejected() {
    let message = config_error(r#"{"path": "/s", "targets": []}"#);

    assert_eq!(message, "targets are empty");
}

#[test]
fn target_without_path_rejected() {
    let message = config_error(r#"{"path": "/s", "targets": [{"path": "/t"}, {"mode": "local"}]}"#);

    assert_eq!(message, "target 1: path missing");
}

#[test]
fn unknown_mode_rejected() {
    let message = config_error(r#"{"path": "/s", "targets": [{"path": "/t", "mode": "ftp"}]}"#);

    assert_eq!(message, "target 0: unsupported connection mode: ftp");
}

#[test]
fn remote_home_relative_path_rejected() {
    let message = config_error(
        r#"{"path": "/s", "targets": [
            {"path": "~/site", "mode": "remote", "auth": {"host": "web1"}},
            {"path": "site", "mode": "remote", "auth": {"host": "web1"}},
            {"path": "~local"}
        ]}"#,
    );

    assert_eq!(message, "target 0: remote path must not start with ~: ~/site");
}

#[test]
fn invalid_json_rejected() {
    let message = config_error("not json");

    assert!(message.starts_with("parse error:"));
}

#[test]
fn load_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("git_deploy.config");
    std::fs::write(&path, r#"{"path": "/s", "targets": [{"path": "/t"}]}"#).unwrap();

    let config = Config::load(&path).unwrap();

    assert_eq!(config.targets.len(), 1);
}

#[test]
fn load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(&dir.path().join("absent.config")).unwrap_err();

    assert!(matches!(err, DeployError::Config(_)));
}
