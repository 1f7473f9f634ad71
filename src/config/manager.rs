use super::{
    backtesting::BacktestingConfig,
    evolution::EvolutionConfig,
    grammar::GrammarConfig,
    objectives::ObjectivesConfig,
    traits::ConfigSection,
    windows::WindowsConfig,
};
use crate::error::GpTraderError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Prefix for environment overrides, e.g. `GPTRADER__EVOLUTION__SEED=7`.
pub const ENV_PREFIX: &str = "GPTRADER";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub evolution: EvolutionConfig,
    pub backtesting: BacktestingConfig,
    pub objectives: ObjectivesConfig,
    pub grammar: GrammarConfig,
    pub windows: WindowsConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), GpTraderError> {
        self.evolution.validate()?;
        self.backtesting.validate()?;
        self.objectives.validate()?;
        self.grammar.validate()?;
        self.windows.validate()?;
        Ok(())
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, GpTraderError> {
        let config: AppConfig = toml::from_str(contents)
            .map_err(|e| GpTraderError::Configuration(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

fn poisoned<T>(_: T) -> GpTraderError {
    GpTraderError::Configuration("Configuration lock poisoned".to_string())
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), GpTraderError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| GpTraderError::Configuration(format!("Failed to read config: {}", e)))?;

        let config = AppConfig::from_toml_str(&contents)?;

        *self.config.write().map_err(poisoned)? = config;
        Ok(())
    }

    /// Load a TOML file and apply `GPTRADER__SECTION__KEY` environment overrides on top.
    pub fn load_layered<P: AsRef<Path>>(&self, path: P) -> Result<(), GpTraderError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize().map_err(|e| {
            GpTraderError::Configuration(format!("Invalid layered config: {}", e))
        })?;
        config.validate()?;

        *self.config.write().map_err(poisoned)? = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), GpTraderError> {
        let config = self.config.read().map_err(poisoned)?;
        let toml_str = toml::to_string_pretty(&*config)
            .map_err(|e| GpTraderError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)
            .map_err(|e| GpTraderError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> Result<AppConfig, GpTraderError> {
        Ok(self.config.read().map_err(poisoned)?.clone())
    }

    pub fn update<F>(&self, f: F) -> Result<(), GpTraderError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.config.write().map_err(poisoned)?;
        let mut candidate = config.clone();
        f(&mut candidate);
        candidate.validate()?;
        *config = candidate;
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
