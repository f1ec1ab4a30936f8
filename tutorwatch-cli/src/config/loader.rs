use super::types::{
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_SET_TYPE, DEFAULT_SETTLE_MS, RawEngineConfig,
    RawRunConfig, RawServerConfig, RawTutorwatchConfig, RunConfig, ServerConfig,
    TutorwatchConfig,
};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tutorwatch_client::{DEFAULT_BASE_URL, DEFAULT_STREAM_PATH};
use tutorwatch_core::EngineConfig;

/// Overrides the directory holding the project config layer.
pub const PROJECT_CONFIG_DIR_ENV: &str = "TUTORWATCH_PROJECT_CONFIG_DIR";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<TutorwatchConfig> {
        let mut layers = Vec::new();
        if let Some(user_path) = Self::user_config_path() {
            layers.push(user_path);
        }
        layers.push(Self::project_config_path());
        Self::load_layers(&layers)
    }

    /// Load and merge the given files in order; later files win, missing files are skipped
    pub fn load_layers(paths: &[PathBuf]) -> Result<TutorwatchConfig> {
        let mut raw = RawTutorwatchConfig::default();
        for path in paths {
            if let Some(layer) = Self::read_raw(path)? {
                debug!(path = %path.display(), "Loaded config layer");
                raw = Self::merge_raw(raw, layer);
            }
        }
        Self::finalize(raw)
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "tutorwatch").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get project config path
    /// Can be overridden with the TUTORWATCH_PROJECT_CONFIG_DIR env var
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var(PROJECT_CONFIG_DIR_ENV) {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".tutorwatch/config.toml")
        }
    }

    fn read_raw(path: &Path) -> Result<Option<RawTutorwatchConfig>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let raw = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(raw))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawTutorwatchConfig, overlay: RawTutorwatchConfig) -> RawTutorwatchConfig {
        RawTutorwatchConfig {
            server: RawServerConfig {
                base_url: overlay.server.base_url.or(base.server.base_url),
                stream_path: overlay.server.stream_path.or(base.server.stream_path),
                request_timeout_ms: overlay
                    .server
                    .request_timeout_ms
                    .or(base.server.request_timeout_ms),
            },
            run: RawRunConfig {
                set_type: overlay.run.set_type.or(base.run.set_type),
                settle_ms: overlay.run.settle_ms.or(base.run.settle_ms),
            },
            engine: RawEngineConfig {
                log_capacity: overlay.engine.log_capacity.or(base.engine.log_capacity),
                clamp_level_threshold: overlay
                    .engine
                    .clamp_level_threshold
                    .or(base.engine.clamp_level_threshold),
                clamp_confidence_threshold: overlay
                    .engine
                    .clamp_confidence_threshold
                    .or(base.engine.clamp_confidence_threshold),
                clamp_dampened_level: overlay
                    .engine
                    .clamp_dampened_level
                    .or(base.engine.clamp_dampened_level),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawTutorwatchConfig) -> Result<TutorwatchConfig> {
        let defaults = EngineConfig::default();
        let engine = EngineConfig {
            log_capacity: raw.engine.log_capacity.unwrap_or(defaults.log_capacity),
            clamp_level_threshold: raw
                .engine
                .clamp_level_threshold
                .unwrap_or(defaults.clamp_level_threshold),
            clamp_confidence_threshold: raw
                .engine
                .clamp_confidence_threshold
                .unwrap_or(defaults.clamp_confidence_threshold),
            clamp_dampened_level: raw
                .engine
                .clamp_dampened_level
                .unwrap_or(defaults.clamp_dampened_level),
        };
        engine.validate().context("Invalid [engine] configuration")?;

        Ok(TutorwatchConfig {
            server: ServerConfig {
                base_url: raw
                    .server
                    .base_url
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                stream_path: raw
                    .server
                    .stream_path
                    .unwrap_or_else(|| DEFAULT_STREAM_PATH.to_string()),
                request_timeout_ms: raw
                    .server
                    .request_timeout_ms
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
            },
            run: RunConfig {
                set_type: raw
                    .run
                    .set_type
                    .unwrap_or_else(|| DEFAULT_SET_TYPE.to_string()),
                settle_ms: raw.run.settle_ms.unwrap_or(DEFAULT_SETTLE_MS),
            },
            engine,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nonexistent.toml");

        let config = ConfigLoader::load_layers(&[path]).unwrap();

        assert_eq!(config, TutorwatchConfig::default());
    }

    #[test]
    fn test_project_layer_overrides_user_layer() {
        let temp_dir = TempDir::new().unwrap();
        let user = write(
            &temp_dir,
            "user.toml",
            r#"
[server]
base_url = "http://user-host:5000/api"
request_timeout_ms = 2000

[run]
set_type = "full"
"#,
        );
        let project = write(
            &temp_dir,
            "project.toml",
            r#"
[server]
base_url = "http://project-host:5000/api"

[engine]
log_capacity = 500
"#,
        );

        let config = ConfigLoader::load_layers(&[user, project]).unwrap();

        assert_eq!(config.server.base_url, "http://project-host:5000/api");
        // Unset in the project layer, so the user value survives
        assert_eq!(config.server.request_timeout_ms, 2000);
        assert_eq!(config.run.set_type, "full");
        assert_eq!(config.engine.log_capacity, 500);
        assert_eq!(config.engine.clamp_dampened_level, 3.5);
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(&temp_dir, "invalid.toml", "this is not valid toml {{{{");

        let result = ConfigLoader::load_layers(&[path]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_engine_values_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(
            &temp_dir,
            "config.toml",
            r#"
[engine]
clamp_level_threshold = 3.0
clamp_dampened_level = 3.5
"#,
        );

        let err = ConfigLoader::load_layers(&[path]).unwrap_err();
        assert!(format!("{err:#}").contains("clamp_dampened_level"));
    }

    #[test]
    fn test_merge_raw_none_preserves_base() {
        let base = RawTutorwatchConfig {
            run: RawRunConfig {
                set_type: Some("full".to_string()),
                settle_ms: Some(250),
            },
            ..Default::default()
        };
        let overlay = RawTutorwatchConfig {
            run: RawRunConfig {
                set_type: None,
                settle_ms: Some(500),
            },
            ..Default::default()
        };

        let merged = ConfigLoader::merge_raw(base, overlay);

        assert_eq!(merged.run.set_type, Some("full".to_string()));
        assert_eq!(merged.run.settle_ms, Some(500));
    }

    #[test]
    fn test_user_config_path_returns_some() {
        let path = ConfigLoader::user_config_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("tutorwatch"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    #[serial]
    fn test_project_config_path_default() {
        unsafe {
            std::env::remove_var("TUTORWATCH_PROJECT_CONFIG_DIR");
        }
        let path = ConfigLoader::project_config_path();
        assert_eq!(path, PathBuf::from(".tutorwatch/config.toml"));
    }

    #[test]
    #[serial]
    fn test_project_config_path_respects_env() {
        unsafe {
            std::env::set_var("TUTORWATCH_PROJECT_CONFIG_DIR", "/tmp/tutorwatch-e2e");
        }
        let path = ConfigLoader::project_config_path();
        unsafe {
            std::env::remove_var("TUTORWATCH_PROJECT_CONFIG_DIR");
        }
        assert_eq!(path, PathBuf::from("/tmp/tutorwatch-e2e/config.toml"));
    }
}
