//! CLI configuration.
//!
//! Settings come from, in order of precedence:
//! - command-line flags
//! - environment variables (handled by clap)
//! - the TOML config file
//! - built-in defaults
//!
//! The config file also stores the API token written by `login`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use omni_workflow::poller::DEFAULT_POLL_INTERVAL;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::Cli;
use crate::error::{CliError, CliResult};

/// Default fleet API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.omnistrate.cloud";

/// Config file contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Fleet API base URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    /// API token from the last login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Default service ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    /// Default environment ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_id: Option<String>,
    /// Seconds between workflow polls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval_secs: Option<u64>,
}

impl FileConfig {
    /// Default config file location.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("omnistrate-ctl").join("config.toml"))
    }

    /// Loads the config file. A missing file yields an empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> CliResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::config(format!(
                "failed to read config file '{}': {e}",
                path.display()
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parses config from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> CliResult<Self> {
        toml::from_str(content).map_err(|e| CliError::config(format!("invalid TOML: {e}")))
    }

    /// Writes the config file, creating parent directories.
    ///
    /// The file holds the API token, so on Unix it is readable by its owner only.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn save(&self, path: &Path) -> CliResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CliError::config(format!("failed to serialize config: {e}")))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(path, perms)?;
        }

        debug!(path = %path.display(), "Config saved");
        Ok(())
    }
}

/// Effective settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Fleet API base URL.
    pub api_url: String,
    /// API token, if logged in.
    pub token: Option<String>,
    /// Service ID.
    pub service_id: Option<String>,
    /// Environment ID.
    pub environment_id: Option<String>,
    /// Time between workflow polls.
    pub poll_interval: Duration,
    /// Config file backing these settings.
    pub config_path: PathBuf,
}

impl Settings {
    /// Resolves settings from parsed arguments and the config file.
    ///
    /// # Errors
    ///
    /// Returns an error if no config path can be determined or the file is invalid.
    pub fn load(cli: &Cli) -> CliResult<Self> {
        let config_path = match &cli.config {
            Some(path) => path.clone(),
            None => FileConfig::default_path()
                .ok_or_else(|| CliError::config("cannot determine config directory"))?,
        };
        let file = FileConfig::load(&config_path)?;
        Ok(Self::merge(cli, file, config_path))
    }

    /// Layers flag values over file values over defaults.
    #[must_use]
    pub fn merge(cli: &Cli, file: FileConfig, config_path: PathBuf) -> Self {
        let poll_interval = interval_from_secs(file.poll_interval_secs, DEFAULT_POLL_INTERVAL);

        Self {
            api_url: cli
                .api_url
                .clone()
                .or(file.api_url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            token: file.token,
            service_id: cli.service.clone().or(file.service_id),
            environment_id: cli.environment.clone().or(file.environment_id),
            poll_interval,
            config_path,
        }
    }

    /// Returns the service and environment IDs, both required for fleet calls.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming whichever is missing.
    pub fn scope(&self) -> CliResult<Scope> {
        let service_id = self
            .service_id
            .clone()
            .ok_or_else(|| CliError::config("service ID required (--service or OMNISTRATE_SERVICE_ID)"))?;
        let environment_id = self.environment_id.clone().ok_or_else(|| {
            CliError::config("environment ID required (--environment or OMNISTRATE_ENVIRONMENT_ID)")
        })?;
        Ok(Scope {
            service_id,
            environment_id,
        })
    }

    /// Returns the stored token.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::NotAuthenticated`] if there is none.
    pub fn require_token(&self) -> CliResult<&str> {
        self.token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(CliError::NotAuthenticated)
    }

}

/// Converts a configured number of seconds to an interval. Missing or zero
/// values fall back to `default`.
#[must_use]
pub fn interval_from_secs(secs: Option<u64>, default: Duration) -> Duration {
    secs.filter(|secs| *secs > 0)
        .map_or(default, Duration::from_secs)
}

/// Service environment a fleet command operates in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    /// Service ID.
    pub service_id: String,
    /// Environment ID.
    pub environment_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["omnistrate-ctl"];
        full.extend_from_slice(args);
        full.extend_from_slice(&["instance", "list"]);
        Cli::parse_from(full)
    }

    #[test]
    fn missing_file_is_empty_config() {
        let dir = TempDir::new().expect("tempdir");
        let config = FileConfig::load(&dir.path().join("absent.toml")).expect("load");
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");
        let config = FileConfig {
            token: Some("jwt-abc".into()),
            service_id: Some("s-1".into()),
            poll_interval_secs: Some(3),
            ..FileConfig::default()
        };

        config.save(&path).expect("save");
        let loaded = FileConfig::load(&path).expect("load");
        assert_eq!(loaded, config);
    }

    #[cfg(unix)]
    #[test]
    fn saved_config_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("config.toml");
        FileConfig {
            token: Some("jwt-abc".into()),
            ..FileConfig::default()
        }
        .save(&path)
        .expect("save");

        let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o077, 0, "config mode {mode:o} is group/world accessible");
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = FileConfig::from_toml("api_url = [").expect_err("invalid");
        assert!(matches!(err, CliError::Config(_)));
        assert!(err.to_string().contains("invalid TOML"));
    }

    #[test]
    fn flags_override_file() {
        let file = FileConfig::from_toml(
            r#"
            api_url = "https://file.example"
            service_id = "s-file"
            environment_id = "se-file"
            "#,
        )
        .expect("valid");
        let cli = cli(&["--api-url", "https://flag.example", "--service", "s-flag"]);

        let settings = Settings::merge(&cli, file, PathBuf::from("config.toml"));
        assert_eq!(settings.api_url, "https://flag.example");
        assert_eq!(settings.service_id.as_deref(), Some("s-flag"));
        assert_eq!(settings.environment_id.as_deref(), Some("se-file"));
    }

    #[test]
    fn defaults_fill_gaps() {
        let settings = Settings::merge(&cli(&[]), FileConfig::default(), PathBuf::new());
        assert_eq!(settings.api_url, DEFAULT_API_URL);
        assert_eq!(settings.poll_interval, DEFAULT_POLL_INTERVAL);
        assert!(settings.scope().is_err());
        assert!(matches!(
            settings.require_token(),
            Err(CliError::NotAuthenticated)
        ));
    }

    #[test]
    fn zero_poll_interval_is_ignored() {
        let file = FileConfig {
            poll_interval_secs: Some(0),
            ..FileConfig::default()
        };
        let settings = Settings::merge(&cli(&[]), file, PathBuf::new());
        assert_eq!(settings.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(
            interval_from_secs(Some(2), settings.poll_interval),
            Duration::from_secs(2)
        );
        assert_eq!(
            interval_from_secs(Some(0), settings.poll_interval),
            DEFAULT_POLL_INTERVAL
        );
    }

    #[test]
    fn scope_requires_both_ids() {
        let settings = Settings::merge(
            &cli(&["-s", "s-1", "-e", "se-1"]),
            FileConfig::default(),
            PathBuf::new(),
        );
        let scope = settings.scope().expect("scope");
        assert_eq!(scope.service_id, "s-1");
        assert_eq!(scope.environment_id, "se-1");

        let partial = Settings::merge(&cli(&["-s", "s-1"]), FileConfig::default(), PathBuf::new());
        let err = partial.scope().expect_err("missing environment");
        assert!(err.to_string().contains("environment ID required"));
    }
}
