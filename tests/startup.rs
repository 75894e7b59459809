//! Startup refuses configurations that would make links forgeable.

mod common;

use common::server::{free_port, run_to_exit};

const STRONG_SECRET: &str = "integration-token-key-5f0e7a91c2d84b36";

fn config(environment: &str, token_secret: Option<&str>) -> String {
    let port = free_port().unwrap();
    let secret_line = token_secret
        .map(|s| format!("token_secret = \"{s}\""))
        .unwrap_or_default();
    format!(
        r#"
[server]
name = "Bazaar"
environment = "{environment}"
public_url = "http://127.0.0.1:{port}"
metrics_port = 0

[listen]
address = "127.0.0.1:{port}"

[database]
path = ":memory:"

[security]
{secret_line}

[admin]
password = "correct horse battery staple"
session_secret = "integration-session-key-0b9c4d27e16a3f85"
"#
    )
}

#[tokio::test]
async fn test_production_refuses_missing_token_secret() {
    let exited = run_to_exit(&config("production", None)).await.unwrap();
    assert!(!exited.status.success());
    assert!(
        exited.log.contains("security.token_secret is not configured"),
        "unexpected log:\n{}",
        exited.log
    );
}

#[tokio::test]
async fn test_production_refuses_placeholder_token_secret() {
    let exited = run_to_exit(&config("production", Some("changeme")))
        .await
        .unwrap();
    assert!(!exited.status.success());
    assert!(
        exited.log.contains("security.token_secret is a placeholder"),
        "unexpected log:\n{}",
        exited.log
    );
}

#[tokio::test]
async fn test_invalid_config_refused() {
    let broken = config("production", Some(STRONG_SECRET))
        .lines()
        .map(|line| {
            if line.starts_with("public_url") {
                "public_url = \"not-a-url\""
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    let exited = run_to_exit(&broken).await.unwrap();
    assert!(!exited.status.success());
    assert!(
        exited.log.contains("server.public_url must start with"),
        "unexpected log:\n{}",
        exited.log
    );
}
