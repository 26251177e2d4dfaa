// Configuration loading - YAML file with environment overrides
use anyhow::Context;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "DASH2INSIGHT";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub prometheus: PrometheusSettings,
    #[serde(default)]
    pub dashboards: Vec<DashboardSettings>,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PrometheusSettings {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardSettings {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Stdio,
    Http,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_transport")]
    pub transport: Transport,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            transport: default_transport(),
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_transport() -> Transport {
    Transport::Stdio
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8808))
}

/// Loads the config file (format picked from its extension) with
/// `DASH2INSIGHT__SECTION__KEY` environment overrides on top. Relative
/// dashboard paths are resolved against the config file's directory.
pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    if !path.is_file() {
        anyhow::bail!("config file not found: {}", path.display());
    }

    let settings = config::Config::builder()
        .add_source(config::File::from(path).required(true))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("failed to read config file {}", path.display()))?;

    let mut config: AppConfig = settings
        .try_deserialize()
        .with_context(|| format!("invalid config file {}", path.display()))?;

    let base_dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    config.resolve_dashboard_paths(base_dir);

    Ok(config)
}

impl AppConfig {
    fn resolve_dashboard_paths(&mut self, base_dir: &Path) {
        for dashboard in &mut self.dashboards {
            if dashboard.path.is_relative() {
                dashboard.path = base_dir.join(&dashboard.path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_yaml_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            r#"
prometheus:
  url: http://localhost:9090
dashboards:
  - name: node
    path: dashboards/node.json
  - name: abs
    path: /srv/dashboards/abs.json
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.prometheus.url, "http://localhost:9090");
        assert_eq!(config.prometheus.username, None);
        assert_eq!(config.prometheus.timeout, 30);
        assert_eq!(config.prometheus.retries, 3);
        assert_eq!(config.prometheus.retry_backoff_ms, 1000);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.server.transport, Transport::Stdio);
        assert_eq!(config.server.bind_addr, SocketAddr::from(([127, 0, 0, 1], 8808)));

        assert_eq!(config.dashboards.len(), 2);
        assert_eq!(config.dashboards[0].path, dir.path().join("dashboards/node.json"));
        assert_eq!(config.dashboards[1].path, PathBuf::from("/srv/dashboards/abs.json"));
    }

    #[test]
    fn test_load_full_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            r#"
prometheus:
  url: https://prom.example.com
  username: reader
  password: secret
  timeout: 10
logging:
  level: debug
  file: logs/dash2insight.log
server:
  transport: http
  bind_addr: 0.0.0.0:9000
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.prometheus.username.as_deref(), Some("reader"));
        assert_eq!(config.prometheus.timeout, 10);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, Some(PathBuf::from("logs/dash2insight.log")));
        assert_eq!(config.server.transport, Transport::Http);
        assert_eq!(config.server.bind_addr, "0.0.0.0:9000".parse().unwrap());
        assert!(config.dashboards.is_empty());
    }

    #[test]
    fn test_missing_config_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn test_missing_prometheus_section_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "dashboards: []\n").unwrap();
        assert!(load_config(&path).is_err());
    }
}
