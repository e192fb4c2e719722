use serde::{Deserialize, Serialize};

// ─── Config ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,

    // Panic recovery boundary on/off
    pub recover_panics: bool,

    // Logging
    pub logging_to_file: bool,
    pub log_dir: Option<String>,

    // Graceful shutdown grace period (seconds)
    pub shutdown_timeout: u64,

    // External monitoring sink
    pub reporter: ReporterConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            recover_panics: true,
            logging_to_file: false,
            log_dir: None,
            shutdown_timeout: 5,
            reporter: ReporterConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a YAML file and sanitize it.
    pub fn load(path: &str) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, anyhow::Error> {
        let mut config: Config = serde_yaml_ng::from_str(contents)?;
        config.sanitize();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        anyhow::ensure!(
            self.reporter.queue_capacity > 0,
            "reporter.queue-capacity must be greater than zero"
        );
        anyhow::ensure!(
            self.reporter.timeout_ms > 0,
            "reporter.timeout-ms must be greater than zero"
        );
        Ok(())
    }

    fn sanitize(&mut self) {
        self.reporter.api_key = non_empty(self.reporter.api_key.take());
        self.reporter.endpoint = non_empty(self.reporter.endpoint.take());
        self.reporter.environment = non_empty(self.reporter.environment.take());
        self.log_dir = non_empty(self.log_dir.take());
    }

    /// Apply command-line / environment overrides on top of file values.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref host) = overrides.host {
            self.host = host.clone();
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(ref raw) = overrides.recover_panics {
            self.recover_panics = parse_recover_flag(Some(raw));
        }
        if let Some(timeout) = overrides.shutdown_timeout {
            self.shutdown_timeout = timeout;
        }
        if let Some(ref key) = overrides.reporter_api_key {
            self.reporter.api_key = non_empty(Some(key.clone()));
        }
        if let Some(ref endpoint) = overrides.reporter_endpoint {
            self.reporter.endpoint = non_empty(Some(endpoint.clone()));
        }
    }
}

/// Values that win over the config file. `None` keeps the file value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub recover_panics: Option<String>,
    pub shutdown_timeout: Option<u64>,
    pub reporter_api_key: Option<String>,
    pub reporter_endpoint: Option<String>,
}

/// Interpret the recovery switch: `false` or `0` (any case, surrounding
/// whitespace ignored) disables recovery; every other value, including an
/// absent one, enables it.
pub fn parse_recover_flag(raw: Option<&str>) -> bool {
    match raw.map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) => v != "false" && v != "0",
        None => true,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ─── Reporter ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct ReporterConfig {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    /// Free-form deployment label attached to every event.
    pub environment: Option<String>,
    /// Events buffered before new ones are dropped.
    pub queue_capacity: usize,
    /// Per-delivery HTTP timeout.
    pub timeout_ms: u64,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: None,
            environment: None,
            queue_capacity: 256,
            timeout_ms: 2000,
        }
    }
}

/// How the reporter should be wired given the current settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkMode {
    /// Deliver events to `endpoint` authenticated with `api_key`.
    Active { api_key: String, endpoint: String },
    /// An API key is set but there is nowhere to send events.
    MissingEndpoint,
    Disabled,
}

impl ReporterConfig {
    pub fn mode(&self) -> SinkMode {
        match (&self.api_key, &self.endpoint) {
            (Some(api_key), Some(endpoint)) => SinkMode::Active {
                api_key: api_key.clone(),
                endpoint: endpoint.clone(),
            },
            (Some(_), None) => SinkMode::MissingEndpoint,
            (None, _) => SinkMode::Disabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 8080);
        assert!(cfg.recover_panics);
        assert_eq!(cfg.shutdown_timeout, 5);
        assert_eq!(cfg.reporter.mode(), SinkMode::Disabled);
    }

    #[test]
    fn test_recover_flag_parsing() {
        assert!(!parse_recover_flag(Some("false")));
        assert!(!parse_recover_flag(Some("0")));
        assert!(!parse_recover_flag(Some(" FALSE ")));
        assert!(parse_recover_flag(Some("true")));
        assert!(parse_recover_flag(Some("")));
        assert!(parse_recover_flag(Some("no")));
        assert!(parse_recover_flag(None));
    }

    #[test]
    fn test_yaml_deserialization() {
        let yaml = r#"
host: "127.0.0.1"
port: 9000
recover-panics: false
reporter:
  api-key: "  bs_live_123  "
  endpoint: "http://127.0.0.1:4000/events"
  environment: ""
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert!(!config.recover_panics);
        assert_eq!(config.reporter.environment, None);
        assert_eq!(
            config.reporter.mode(),
            SinkMode::Active {
                api_key: "bs_live_123".into(),
                endpoint: "http://127.0.0.1:4000/events".into(),
            }
        );
    }

    #[test]
    fn test_invalid_queue_capacity_rejected() {
        let err = Config::from_yaml("reporter:\n  queue-capacity: 0\n").unwrap_err();
        assert!(err.to_string().contains("queue-capacity"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port: 9100\nshutdown-timeout: 2").unwrap();
        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.shutdown_timeout, 2);
        assert!(config.recover_panics);
    }

    #[test]
    fn test_overrides_win_over_file() {
        let mut config = Config::default();
        config.apply_overrides(&ConfigOverrides {
            port: Some(3000),
            recover_panics: Some("0".into()),
            reporter_api_key: Some("key".into()),
            ..Default::default()
        });
        assert_eq!(config.port, 3000);
        assert!(!config.recover_panics);
        assert_eq!(config.reporter.mode(), SinkMode::MissingEndpoint);
    }
}
