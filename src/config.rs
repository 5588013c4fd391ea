use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

use crate::client::transport::DEFAULT_SERVER_URL;
use crate::logging::{parse_level, LogFormat};

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    pub team: Option<String>,
    pub project: Option<String>,
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub access_token: Option<SecretString>,
    pub server_url: Option<String>,
    pub preferred_open_state: Option<String>,
    pub preferred_close_state: Option<String>,
    #[serde(default)]
    pub log: LogSection,
}

#[derive(Debug, Deserialize, Default)]
pub struct LogSection {
    pub level: Option<String>,
    pub format: Option<String>,
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

impl AppConfig {
    pub fn server_url(&self) -> &str {
        self.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }

    pub fn log_level(&self) -> Option<tracing::Level> {
        self.log.level.as_deref().and_then(parse_level)
    }

    pub fn log_format(&self) -> LogFormat {
        self.log
            .format
            .as_deref()
            .and_then(LogFormat::parse)
            .unwrap_or_default()
    }

    /// Environment variables take precedence over the file.
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(team) = var("AZWORK_TEAM") {
            self.team = Some(team);
        }
        if let Some(project) = var("AZWORK_PROJECT") {
            self.project = Some(project);
        }
        if let Some(token) = var("AZWORK_TOKEN") {
            self.access_token = Some(SecretString::from(token));
        }
    }
}

fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}

pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".azwork")
}

pub fn load_config() -> Result<AppConfig> {
    let mut config = load_config_from(&config_path())?;
    config.apply_env(|name| std::env::var(name).ok().filter(|v| !v.is_empty()));
    Ok(config)
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig =
        toml::from_str(&contents).with_context(|| "Failed to parse config.toml")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("config.toml")).unwrap();
        assert!(config.team.is_none());
        assert_eq!(config.server_url(), "https://dev.azure.com");
        assert!(config.log_level().is_none());
    }

    #[test]
    fn parses_full_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
team = "contoso"
project = "Web Shop"
access_token = "pat-123"
server_url = "http://localhost:9000"
preferred_open_state = "Active"
preferred_close_state = "Closed"

[log]
level = "debug"
format = "json"
"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.team.as_deref(), Some("contoso"));
        assert_eq!(config.project.as_deref(), Some("Web Shop"));
        assert_eq!(
            config.access_token.as_ref().map(|t| t.expose_secret().to_string()),
            Some("pat-123".to_string())
        );
        assert_eq!(config.server_url(), "http://localhost:9000");
        assert_eq!(config.preferred_open_state.as_deref(), Some("Active"));
        assert_eq!(config.preferred_close_state.as_deref(), Some("Closed"));
        assert_eq!(config.log_level(), Some(tracing::Level::DEBUG));
        assert_eq!(config.log_format(), LogFormat::Json);
    }

    #[test]
    fn invalid_toml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "team = [").unwrap();
        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config.toml"));
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = [("AZWORK_TEAM", "fabrikam"), ("AZWORK_TOKEN", "from-env")]
            .into_iter()
            .collect();
        let mut config = AppConfig {
            team: Some("contoso".into()),
            project: Some("Web".into()),
            ..Default::default()
        };

        config.apply_env(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.team.as_deref(), Some("fabrikam"));
        assert_eq!(config.project.as_deref(), Some("Web"));
        assert_eq!(
            config.access_token.map(|t| t.expose_secret().to_string()),
            Some("from-env".to_string())
        );
    }

    #[test]
    fn debug_output_hides_token() {
        let config = AppConfig {
            access_token: Some(SecretString::from("top-secret".to_string())),
            ..Default::default()
        };
        assert!(!format!("{config:?}").contains("top-secret"));
    }
}
