//! Configuration loading

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;
use turntable_capture::{CaptureConfig, SessionConfig, SettleConfig};
use turntable_core::{CameraPatch, SceneTemplate, DEFAULT_MODEL_ZOOM};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub capture: CaptureSection,
    /// Camera overrides for new workspaces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<CameraPatch>,
    /// Default scene template (`[[scene.root]]`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene: Option<SceneTemplate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Directory holding session state, images, and model files
    #[serde(default = "default_workspace_path")]
    pub path: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            path: default_workspace_path(),
        }
    }
}

fn default_workspace_path() -> String {
    "./turntable-workspace".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSection {
    /// Run the reselect sequence after each model switch
    #[serde(default = "default_true")]
    pub settle_enabled: bool,
    /// Pause between settle steps
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,
    /// Zoom for models without a saved zoom
    #[serde(default = "default_zoom")]
    pub default_zoom: f64,
}

impl Default for CaptureSection {
    fn default() -> Self {
        Self {
            settle_enabled: true,
            settle_delay_ms: default_settle_delay(),
            default_zoom: default_zoom(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_settle_delay() -> u64 {
    150
}

fn default_zoom() -> f64 {
    DEFAULT_MODEL_ZOOM
}

impl Config {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            capture: CaptureConfig {
                settle: SettleConfig {
                    enabled: self.capture.settle_enabled,
                    delay: Duration::from_millis(self.capture.settle_delay_ms),
                },
                default_zoom: self.capture.default_zoom,
            },
            camera: self.camera.clone(),
            template: self.scene.clone().unwrap_or_default(),
        }
    }
}

/// Load configuration from file, falling back to defaults
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let config = Config {
        scene: Some(SceneTemplate::default()),
        ..Default::default()
    };

    let content = toml::to_string_pretty(&config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use turntable_core::ComponentKind;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = load_config(&temp.path().join("absent.toml")).unwrap();
        assert_eq!(config.capture.settle_delay_ms, 150);
        assert!(config.capture.settle_enabled);

        let session = config.session_config();
        assert_eq!(session.capture.default_zoom, 2.0);
        assert_eq!(session.template, SceneTemplate::default());
    }

    #[test]
    fn test_parse_sections() {
        let toml = r#"
[workspace]
path = "/tmp/shots"

[capture]
settle_enabled = false
settle_delay_ms = 40

[camera]
fov = 50
zoom = 1.5

[[scene.root]]
type = "userModel"

[[scene.root.children]]
type = "material"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.workspace.path, "/tmp/shots");

        let session = config.session_config();
        assert!(!session.capture.settle.enabled);
        assert_eq!(session.capture.settle.delay, Duration::from_millis(40));
        assert_eq!(session.capture.default_zoom, 2.0);
        assert_eq!(session.camera.as_ref().unwrap().fov, Some(50.0));
        assert_eq!(session.template.root[0].children[0].kind, ComponentKind::Material);
    }

    #[test]
    fn test_default_config_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("turntable.toml");
        save_default_config(&path).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.scene, Some(SceneTemplate::default()));
        assert_eq!(config.workspace.path, default_workspace_path());
    }
}
