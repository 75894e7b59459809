//! Test server management.
//!
//! Spawns and manages bazaard instances for integration testing.

#![allow(dead_code)]

use reqwest::StatusCode;
use serde_json::Value;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;

/// Signing key written into every test config.
pub const TOKEN_SECRET: &str = "integration-token-key-5f0e7a91c2d84b36";
const SESSION_SECRET: &str = "integration-session-key-0b9c4d27e16a3f85";
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";

/// A test server instance.
pub struct TestServer {
    child: Child,
    port: u16,
    http: reqwest::Client,
    // Removed on drop, after the child is gone.
    _data_dir: TempDir,
}

impl TestServer {
    /// Spawn a server with the default test configuration.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with("").await
    }

    /// Spawn a server, appending `extra_security` to the `[security]` table.
    pub async fn spawn_with(extra_security: &str) -> anyhow::Result<Self> {
        let data_dir = tempfile::tempdir()?;
        let port = free_port()?;

        let config_path = data_dir.path().join("config.toml");
        let config_content = format!(
            r#"
[server]
name = "Test Bazaar"
public_url = "http://127.0.0.1:{port}"
metrics_port = 0

[listen]
address = "127.0.0.1:{port}"

[database]
path = "{db}"

[security]
token_secret = "{TOKEN_SECRET}"
{extra_security}

[admin]
password = "{ADMIN_PASSWORD}"
session_secret = "{SESSION_SECRET}"

[mail]
transport = "log"
from = "noreply@bazaar.test"
moderation_address = "mods@bazaar.test"
"#,
            db = data_dir.path().join("bazaar.db").display(),
        );
        std::fs::write(&config_path, config_content)?;

        let child = Command::new(env!("CARGO_BIN_EXE_bazaard"))
            .arg(&config_path)
            .env("RUST_LOG", "warn")
            .stdout(Stdio::null())
            .spawn()?;

        let mut server = Self {
            child,
            port,
            http: reqwest::Client::new(),
            _data_dir: data_dir,
        };

        server.wait_until_ready().await?;
        Ok(server)
    }

    /// Wait until `/health` answers.
    async fn wait_until_ready(&mut self) -> anyhow::Result<()> {
        for _ in 0..100 {
            if let Some(status) = self.child.try_wait()? {
                anyhow::bail!("bazaard exited during startup: {status}");
            }
            if let Ok(resp) = self.http.get(self.url("/health")).send().await
                && resp.status().is_success()
            {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("Server failed to start within 10 seconds")
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    pub async fn get(&self, path: &str) -> anyhow::Result<(StatusCode, Value)> {
        let resp = self.http.get(self.url(path)).send().await?;
        decode(resp).await
    }

    pub async fn post(&self, path: &str, body: Value) -> anyhow::Result<(StatusCode, Value)> {
        let resp = self.http.post(self.url(path)).json(&body).send().await?;
        decode(resp).await
    }

    /// Log in as moderator and return the bearer token.
    pub async fn admin_token(&self) -> anyhow::Result<String> {
        let (status, body) = self
            .post(
                "/admin/session",
                serde_json::json!({ "password": ADMIN_PASSWORD }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "admin login failed: {status}");
        body["token"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("login response had no token"))
    }

    pub async fn admin_get(&self, session: &str, path: &str) -> anyhow::Result<(StatusCode, Value)> {
        let resp = self
            .http
            .get(self.url(path))
            .bearer_auth(session)
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn admin_post(
        &self,
        session: &str,
        path: &str,
        body: Value,
    ) -> anyhow::Result<(StatusCode, Value)> {
        let resp = self
            .http
            .post(self.url(path))
            .bearer_auth(session)
            .json(&body)
            .send()
            .await?;
        decode(resp).await
    }

    /// Submit a listing and approve it, returning its id.
    pub async fn live_listing(&self, session: &str, title: &str) -> anyhow::Result<i64> {
        let (status, body) = self
            .post(
                "/submissions",
                serde_json::json!({
                    "title": title,
                    "description": "Barely used",
                    "priceCents": 4_000,
                    "submitterEmail": "seller@example.com",
                }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "submission failed: {status}");
        let id = body["id"]
            .as_i64()
            .ok_or_else(|| anyhow::anyhow!("submission response had no id"))?;

        let (status, _) = self
            .admin_post(
                session,
                &format!("/admin/products/{id}/approve"),
                Value::Null,
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "approval failed: {status}");
        Ok(id)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Kill the server process
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

async fn decode(resp: reqwest::Response) -> anyhow::Result<(StatusCode, Value)> {
    let status = resp.status();
    let bytes = resp.bytes().await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    Ok((status, body))
}

/// Ask the OS for a port nobody is listening on.
pub fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// Outcome of a run that was expected to stop on its own.
pub struct Exited {
    pub status: ExitStatus,
    /// Everything the process logged, stdout and stderr combined.
    pub log: String,
}

/// Run the binary with `config`, wait for it to exit and collect its log.
///
/// Gives up after ten seconds: a server that started instead of refusing
/// is killed and reported as such.
pub async fn run_to_exit(config: &str) -> anyhow::Result<Exited> {
    let dir = tempfile::tempdir()?;
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, config)?;

    let child = tokio::process::Command::new(env!("CARGO_BIN_EXE_bazaard"))
        .arg(&config_path)
        .env("RUST_LOG", "info")
        .env("NO_COLOR", "1")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let output = tokio::time::timeout(Duration::from_secs(10), child.wait_with_output())
        .await
        .map_err(|_| anyhow::anyhow!("bazaard kept running instead of refusing the config"))??;

    let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
    log.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok(Exited {
        status: output.status,
        log,
    })
}
