//! Staged `updateUpstreams`/`removeAppConfig`/`getProxyStatus`/`testConfig`
//! (spec.md §4.4). The invariant held across every partial failure: the
//! on-disk config either equals the last successfully reloaded config, or
//! equals the target config with a successful reload — never a half-written
//! file with a stale-but-running nginx process disagreeing with it.

use std::path::PathBuf;

use reqwest::Client;
use tokio::process::Command;
use tracing::{info, instrument, warn};

use crate::error::{ProxyError, Result};
use crate::status::{parse_stub_status, ProxyStatus};
use crate::template::{render_upstream_config, UpstreamServer};
use crate::validation::{validate_app_name, validate_server};

#[derive(Clone)]
pub struct NginxManager {
    conf_dir: PathBuf,
    /// Name of the container nginx runs in, if fronted via `docker exec`;
    /// `None` runs `nginx` directly on the host.
    container: Option<String>,
    status_url: String,
    client: Client,
}

impl NginxManager {
    pub fn new(conf_dir: impl Into<PathBuf>, container: Option<String>, status_url: impl Into<String>) -> Self {
        Self {
            conf_dir: conf_dir.into(),
            container,
            status_url: status_url.into(),
            client: Client::new(),
        }
    }

    fn conf_path(&self, app: &str) -> PathBuf {
        self.conf_dir.join(format!("{app}.conf"))
    }

    fn backup_path(&self, app: &str) -> PathBuf {
        self.conf_dir.join(format!("{app}.conf.bak"))
    }

    fn nginx_command(&self, args: &[&str]) -> Command {
        match &self.container {
            Some(container) => {
                let mut cmd = Command::new("docker");
                cmd.arg("exec").arg(container).arg("nginx").args(args);
                cmd
            }
            None => {
                let mut cmd = Command::new("nginx");
                cmd.args(args);
                cmd
            }
        }
    }

    /// `testConfig()`: idempotent config validity check.
    #[instrument(skip(self))]
    pub async fn test_config(&self) -> Result<()> {
        let output = self
            .nginx_command(&["-t"])
            .output()
            .await
            .map_err(|e| ProxyError::ValidationFailed(e.to_string()))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(ProxyError::ValidationFailed(String::from_utf8_lossy(&output.stderr).to_string()))
        }
    }

    #[instrument(skip(self))]
    async fn reload(&self) -> Result<()> {
        let output = self
            .nginx_command(&["-s", "reload"])
            .output()
            .await
            .map_err(|e| ProxyError::ReloadFailed(e.to_string()))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(ProxyError::ReloadFailed(String::from_utf8_lossy(&output.stderr).to_string()))
        }
    }

    /// `updateUpstreams(app, servers[])`: backup -> render -> validate ->
    /// swap -> reload -> discard-backup, with rollback on any failed stage.
    #[instrument(skip(self, servers), fields(app = %app, servers = servers.len()))]
    pub async fn update_upstreams(&self, app: &str, servers: &[UpstreamServer]) -> Result<()> {
        validate_app_name(app)?;
        for server in servers {
            validate_server(server)?;
        }

        let conf_path = self.conf_path(app);
        let backup_path = self.backup_path(app);
        let had_previous = tokio::fs::try_exists(&conf_path).await.unwrap_or(false);

        if had_previous {
            tokio::fs::copy(&conf_path, &backup_path)
                .await
                .map_err(|e| ProxyError::Io(e.to_string()))?;
        }

        let rendered = render_upstream_config(app, servers);
        tokio::fs::write(&conf_path, rendered)
            .await
            .map_err(|e| ProxyError::Io(e.to_string()))?;

        if let Err(err) = self.test_config().await {
            warn!(error = %err, "rendered config failed validation, restoring backup");
            self.restore(&conf_path, &backup_path, had_previous).await?;
            return Err(err);
        }

        if let Err(err) = self.reload().await {
            warn!(error = %err, "reload failed after valid render, restoring backup");
            self.restore(&conf_path, &backup_path, had_previous).await?;
            // The backup is by definition the last successfully-reloaded
            // config, so this second reload should succeed; if it doesn't,
            // nginx itself is down and that failure supersedes the first.
            self.reload().await?;
            return Err(err);
        }

        if had_previous {
            tokio::fs::remove_file(&backup_path).await.ok();
        }
        info!("upstreams updated");
        Ok(())
    }

    async fn restore(&self, conf_path: &PathBuf, backup_path: &PathBuf, had_previous: bool) -> Result<()> {
        if had_previous {
            tokio::fs::copy(backup_path, conf_path)
                .await
                .map_err(|e| ProxyError::Io(e.to_string()))?;
            tokio::fs::remove_file(backup_path).await.ok();
        } else {
            tokio::fs::remove_file(conf_path).await.ok();
        }
        Ok(())
    }

    /// `removeAppConfig(app)`: no rollback — the caller is explicitly
    /// tearing the app down, so a validation failure is surfaced, not
    /// reverted.
    #[instrument(skip(self))]
    pub async fn remove_app_config(&self, app: &str) -> Result<()> {
        validate_app_name(app)?;
        let conf_path = self.conf_path(app);
        tokio::fs::remove_file(&conf_path).await.ok();
        self.test_config().await?;
        self.reload().await?;
        Ok(())
    }

    /// `getProxyStatus()`.
    #[instrument(skip(self))]
    pub async fn get_proxy_status(&self) -> Result<ProxyStatus> {
        let body = self
            .client
            .get(&self.status_url)
            .send()
            .await
            .map_err(|e| ProxyError::StatusUnavailable(e.to_string()))?
            .text()
            .await
            .map_err(|e| ProxyError::StatusUnavailable(e.to_string()))?;
        parse_stub_status(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_invalid_app_name_before_touching_the_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let manager = NginxManager::new(dir.path(), None, "http://127.0.0.1:0/status");
        let err = manager
            .update_upstreams("../escape", &[UpstreamServer { host: "10.0.0.1".to_string(), port: 80 }])
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::InvalidAppName(_)));
        assert!(!dir.path().join("../escape.conf").exists());
    }

    #[tokio::test]
    async fn rejects_invalid_server_before_writing_a_config() {
        let dir = tempfile::tempdir().unwrap();
        let manager = NginxManager::new(dir.path(), None, "http://127.0.0.1:0/status");
        let err = manager
            .update_upstreams("demo", &[UpstreamServer { host: String::new(), port: 80 }])
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::InvalidServer(_)));
        assert!(!dir.path().join("demo.conf").exists());
    }
}
