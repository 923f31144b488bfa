use super::{
    allocator::AllocatorConfig, engine::EngineConfig, evolution::EvolutionConfig,
    scoring::ScoringConfig, simulation::SimulationConfig, traits::ConfigManifest,
    traits::ConfigSection,
};
use crate::error::CurveLabError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Prefix for environment overrides, e.g. `CURVELAB_SIMULATION__STEPS=400`
pub const ENV_PREFIX: &str = "CURVELAB";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub simulation: SimulationConfig,
    pub scoring: ScoringConfig,
    pub evolution: EvolutionConfig,
    pub allocator: AllocatorConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), CurveLabError> {
        self.engine.validate()?;
        self.simulation.validate()?;
        self.scoring.validate()?;
        self.evolution.validate()?;
        self.allocator.validate()?;
        Ok(())
    }

    pub fn manifests(&self) -> Vec<ConfigManifest> {
        vec![
            self.engine.to_manifest(),
            self.simulation.to_manifest(),
            self.scoring.to_manifest(),
            self.evolution.to_manifest(),
            self.allocator.to_manifest(),
        ]
    }
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CurveLabError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CurveLabError::Configuration(format!("Failed to read config: {}", e)))?;

        let config: AppConfig = toml::from_str(&contents)
            .map_err(|e| CurveLabError::Configuration(format!("Failed to parse config: {}", e)))?;

        self.replace(config)
    }

    /// Defaults, then the optional file, then `CURVELAB_*` environment variables.
    pub fn load_layered<P: AsRef<Path>>(&self, path: Option<P>) -> Result<(), CurveLabError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&AppConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path.as_ref()));
        }

        let config: AppConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        self.replace(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CurveLabError> {
        let config = self.get();
        let toml_str = toml::to_string_pretty(&config)
            .map_err(|e| CurveLabError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)
            .map_err(|e| CurveLabError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> AppConfig {
        match self.config.read() {
            Ok(config) => config.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Apply `f` to a copy and keep it only if it still validates.
    pub fn update<F>(&self, f: F) -> Result<(), CurveLabError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut candidate = self.get();
        f(&mut candidate);
        self.replace(candidate)
    }

    fn replace(&self, config: AppConfig) -> Result<(), CurveLabError> {
        config.validate()?;
        let mut guard = self
            .config
            .write()
            .map_err(|_| CurveLabError::Configuration("Config lock poisoned".to_string()))?;
        *guard = config;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_update_is_rejected() {
        let manager = ConfigManager::new();
        let result = manager.update(|c| c.simulation.eval_path_count = 0);

        assert!(result.is_err());
        assert_eq!(manager.get().simulation.eval_path_count, 8);
    }

    #[test]
    fn test_toml_roundtrip() {
        let dir = std::env::temp_dir().join(format!("curvelab-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let manager = ConfigManager::new();
        manager.update(|c| c.evolution.population_size = 40).unwrap();
        manager.save_to_file(&path).unwrap();

        let reloaded = ConfigManager::new();
        reloaded.load_from_file(&path).unwrap();
        assert_eq!(reloaded.get().evolution.population_size, 40);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str("[simulation]\nsteps = 50\n").unwrap();
        assert_eq!(config.simulation.steps, 50);
        assert_eq!(config.simulation.path_count, 16);
        assert_eq!(config.allocator, AllocatorConfig::default());
    }
}
