//! Settings file for a swarm run.
//!
//! One file describes everything: kernel timings, the canvas API endpoint,
//! the activity ranking, the zone table and the agent roster. TOML and JSON
//! are both accepted; the format follows the file extension.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use swarm_kernel::{
    build_agent, ActivityConfig, AgentConfig, ConfigError, KernelConfig, Zone, ZoneManager,
};

/// Base URL used when neither the file nor the environment names one.
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    /// Per-request timeout (milliseconds)
    pub timeout_ms: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwarmSettings {
    #[serde(default)]
    pub kernel: KernelConfig,
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub activity: ActivityConfig,
    pub zones: Vec<Zone>,
    pub agents: Vec<AgentConfig>,
}

impl SwarmSettings {
    /// Read and validate a settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;

        let settings: Self = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&raw)
                .with_context(|| format!("Failed to parse TOML settings {}", path.display()))?,
            Some("json") => serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse JSON settings {}", path.display()))?,
            other => bail!(
                "Unsupported settings format {:?} for {} (expected .toml or .json)",
                other.unwrap_or(""),
                path.display()
            ),
        };

        settings
            .validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;
        Ok(settings)
    }

    /// Run every startup check the kernel would, without starting anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let zones = self.zone_manager()?;
        let known: HashSet<_> = zones.ids().into_iter().collect();

        let mut ids = HashSet::new();
        for agent in &self.agents {
            if !ids.insert(agent.id.as_str()) {
                return Err(ConfigError::DuplicateAgent(agent.id.clone()));
            }
            build_agent(agent.clone())?;
            for zone in agent.preferred_zones.iter().filter(|z| !known.contains(z)) {
                tracing::warn!(
                    agent = %agent.id,
                    zone = %zone,
                    "Preferred zone is not declared; it will never be chosen"
                );
            }
        }
        Ok(())
    }

    pub fn zone_manager(&self) -> Result<ZoneManager, ConfigError> {
        ZoneManager::new(self.zones.clone())
    }

    pub fn agent(&self, id: &str) -> Option<&AgentConfig> {
        self.agents.iter().find(|agent| agent.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML_SETTINGS: &str = r#"
[kernel]
cooldown_ms = 5000

[api]
base_url = "https://canvas.example.net"

[[zones]]
id = 1
name = "north"
x_start = 0
x_end = 499
y_start = 0
y_end = 249

[[zones]]
id = 2
name = "south"
x_start = 0
x_end = 499
y_start = 250
y_end = 499

[[agents]]
id = "zen-1"
name = "Zen"
type = "minimalist_zen"
colors = [0, 1]
min_delay_ms = 2000
max_delay_ms = 6000
preferred_zones = [2]
api_key = "secret"
"#;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "swarm-settings-{}-{name}",
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_toml_with_defaults() {
        let path = write_temp("ok.toml", TOML_SETTINGS);
        let settings = SwarmSettings::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.kernel.cooldown_ms, 5_000);
        assert_eq!(settings.kernel.conflict_window_ms, 10_000);
        assert_eq!(settings.api.base_url, "https://canvas.example.net");
        assert_eq!(settings.api.timeout_ms, 10_000);
        assert_eq!(settings.zones.len(), 2);

        let zen = settings.agent("zen-1").unwrap();
        assert_eq!(zen.kind, "minimalist_zen");
        assert_eq!(zen.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_load_json() {
        let json = r#"{
            "zones": [{"id": 1, "name": "all", "x_start": 0, "x_end": 499, "y_start": 0, "y_end": 499}],
            "agents": [{"id": "geo", "name": "Geo", "type": "geometric", "colors": [3],
                        "min_delay_ms": 1000, "max_delay_ms": 2000}]
        }"#;
        let path = write_temp("ok.json", json);
        let settings = SwarmSettings::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.api.base_url, DEFAULT_API_URL);
        assert!(settings.agents[0].preferred_zones.is_empty());
    }

    #[test]
    fn test_unknown_agent_type_fails_at_load() {
        let broken = TOML_SETTINGS.replace("minimalist_zen", "sculptor");
        let path = write_temp("bad-type.toml", &broken);
        let err = SwarmSettings::load(&path).unwrap_err();
        std::fs::remove_file(&path).ok();

        let root = err.root_cause().to_string();
        assert!(root.contains("sculptor"), "{root}");
    }

    #[test]
    fn test_unsupported_extension() {
        let path = write_temp("settings.yaml", TOML_SETTINGS);
        let err = SwarmSettings::load(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(err.to_string().contains("Unsupported"));
    }

    #[test]
    fn test_duplicate_agent_rejected() {
        let path = write_temp("dup.toml", TOML_SETTINGS);
        let mut settings = SwarmSettings::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        settings.agents.push(settings.agents[0].clone());
        assert_eq!(
            settings.validate().unwrap_err(),
            ConfigError::DuplicateAgent("zen-1".to_string())
        );
    }
}
