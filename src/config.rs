use crate::analyzer::{DEFAULT_REGISTRY_PATH, DEFAULT_WORD_LIST_PATH};
use crate::cli::{Cli, OutputFormat, VerbosityLevel};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

const CONFIG_NAMES: [&str; 4] = [
    "vkregistry.toml",
    "vkregistry.json",
    ".vkregistry.toml",
    ".vkregistry.json",
];

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub output: OutputConfig,
}

/// Input locations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    /// Registry document (vk.xml)
    pub registry: PathBuf,
    /// Feature-detection header
    pub word_list: PathBuf,
    /// Treat a missing word list as empty
    pub word_list_optional: bool,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormatConfig,
    pub verbose: bool,
    /// Quiet mode (errors only)
    pub quiet: bool,
}

/// Output format configuration (serializable version of CLI OutputFormat)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormatConfig {
    Human,
    Json,
    Summary,
}

impl From<OutputFormat> for OutputFormatConfig {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputFormatConfig::Human,
            OutputFormat::Json => OutputFormatConfig::Json,
            OutputFormat::Summary => OutputFormatConfig::Summary,
        }
    }
}

impl From<OutputFormatConfig> for OutputFormat {
    fn from(format: OutputFormatConfig) -> Self {
        match format {
            OutputFormatConfig::Human => OutputFormat::Human,
            OutputFormatConfig::Json => OutputFormat::Json,
            OutputFormatConfig::Summary => OutputFormat::Summary,
        }
    }
}

impl std::str::FromStr for OutputFormatConfig {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(OutputFormatConfig::Human),
            "json" => Ok(OutputFormatConfig::Json),
            "summary" => Ok(OutputFormatConfig::Summary),
            other => Err(other.to_string()),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            registry: PathBuf::from(DEFAULT_REGISTRY_PATH),
            word_list: PathBuf::from(DEFAULT_WORD_LIST_PATH),
            word_list_optional: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormatConfig::Human,
            verbose: false,
            quiet: false,
        }
    }
}

impl Config {
    pub fn verbosity(&self) -> VerbosityLevel {
        VerbosityLevel::from_flags(self.output.verbose, self.output.quiet)
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: file -> environment -> CLI
    pub fn load_config(cli: &Cli) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            let file_config = Self::load_from_file(config_path)?;
            config = Self::merge_configs(config, file_config);
        } else if let Some(found_config) = Self::find_config_file()? {
            config = Self::merge_configs(config, found_config);
        }

        config = Self::apply_environment_overrides(config)?;
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in the current directory, then the user config directory
    pub fn find_config_file() -> Result<Option<Config>> {
        if let Some(found) = Self::find_config_file_in(Path::new("."))? {
            return Ok(Some(found));
        }

        if let Some(config_dir) = dirs::config_dir() {
            return Self::find_config_file_in(&config_dir.join("vkregistry"));
        }

        Ok(None)
    }

    /// Load the first standard config file name present in `dir`
    pub fn find_config_file_in(dir: &Path) -> Result<Option<Config>> {
        for name in &CONFIG_NAMES {
            let path = dir.join(name);
            if path.exists() {
                tracing::debug!("using configuration file {}", path.display());
                return Ok(Some(Self::load_from_file(&path)?));
            }
        }
        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        if let Some(registry) = env.get("VKREGISTRY_REGISTRY") {
            config.input.registry = PathBuf::from(registry);
        }

        if let Some(word_list) = env.get("VKREGISTRY_WORD_LIST") {
            config.input.word_list = PathBuf::from(word_list);
        }

        if let Some(optional) = env.get("VKREGISTRY_WORD_LIST_OPTIONAL") {
            config.input.word_list_optional = parse_bool("VKREGISTRY_WORD_LIST_OPTIONAL", &optional)?;
        }

        if let Some(verbose) = env.get("VKREGISTRY_VERBOSE") {
            config.output.verbose = parse_bool("VKREGISTRY_VERBOSE", &verbose)?;
        }

        if let Some(quiet) = env.get("VKREGISTRY_QUIET") {
            config.output.quiet = parse_bool("VKREGISTRY_QUIET", &quiet)?;
        }

        if let Some(format) = env.get("VKREGISTRY_FORMAT") {
            config.output.format = format.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid VKREGISTRY_FORMAT value: {}", format))
            })?;
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if let Some(registry) = &cli.registry {
            config.input.registry = registry.clone();
        }
        if let Some(word_list) = &cli.word_list {
            config.input.word_list = word_list.clone();
        }
        if cli.word_list_optional {
            config.input.word_list_optional = true;
        }

        if let Some(format) = cli.format {
            config.output.format = format.into();
        }
        if cli.verbose {
            config.output.verbose = true;
            config.output.quiet = false;
        }
        if cli.quiet {
            config.output.quiet = true;
            config.output.verbose = false;
        }

        config
    }

    /// Merge two configurations (second takes precedence)
    pub fn merge_configs(mut base: Config, override_config: Config) -> Config {
        base.input.registry = override_config.input.registry;
        base.input.word_list = override_config.input.word_list;
        base.input.word_list_optional = override_config.input.word_list_optional;

        base.output.format = override_config.output.format;
        base.output.verbose = override_config.output.verbose;
        base.output.quiet = override_config.output.quiet;

        base
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        if config.input.registry.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "Registry path must not be empty".to_string(),
            ));
        }

        if config.input.word_list.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "Word list path must not be empty".to_string(),
            ));
        }

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    value
        .parse()
        .map_err(|_| ConfigError::Environment(format!("Invalid {} value: {}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    /// Mock environment variable provider for testing
    #[derive(Default)]
    struct MockEnvProvider {
        vars: HashMap<String, String>,
    }

    impl MockEnvProvider {
        fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
            self.vars.insert(key.into(), value.into());
        }
    }

    impl EnvProvider for MockEnvProvider {
        fn get(&self, key: &str) -> Option<String> {
            self.vars.get(key).cloned()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.input.registry, PathBuf::from(DEFAULT_REGISTRY_PATH));
        assert_eq!(config.input.word_list, PathBuf::from(DEFAULT_WORD_LIST_PATH));
        assert!(!config.input.word_list_optional);

        assert_eq!(config.output.format, OutputFormatConfig::Human);
        assert!(!config.output.verbose);
        assert!(!config.output.quiet);
    }

    #[test]
    fn test_load_toml_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let toml_content = r#"
[input]
registry = "/opt/vulkan/vk.xml"
word_list = "/opt/include/feature_detect.h"
word_list_optional = true

[output]
format = "json"
verbose = true
quiet = false
"#;
        fs::write(&config_path, toml_content).unwrap();

        let config = ConfigManager::load_from_file(&config_path).unwrap();

        assert_eq!(config.input.registry, PathBuf::from("/opt/vulkan/vk.xml"));
        assert_eq!(
            config.input.word_list,
            PathBuf::from("/opt/include/feature_detect.h")
        );
        assert!(config.input.word_list_optional);
        assert_eq!(config.output.format, OutputFormatConfig::Json);
        assert!(config.output.verbose);
    }

    #[test]
    fn test_load_partial_json_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        fs::write(&config_path, r#"{ "output": { "format": "summary" } }"#).unwrap();

        let config = ConfigManager::load_from_file(&config_path).unwrap();

        assert_eq!(config.output.format, OutputFormatConfig::Summary);
        assert_eq!(config.input, InputConfig::default());
    }

    #[test]
    fn test_unsupported_file_format() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "input: {}").unwrap();

        let result = ConfigManager::load_from_file(&config_path);
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(ext)) if ext == "yaml"));
    }

    #[test]
    fn test_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[input\nregistry = ").unwrap();

        let result = ConfigManager::load_from_file(&config_path);
        assert!(matches!(result, Err(ConfigError::TomlParsing(_))));
    }

    #[test]
    fn test_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        fs::write(&config_path, "{ \"input\": ").unwrap();

        let result = ConfigManager::load_from_file(&config_path);
        assert!(matches!(result, Err(ConfigError::JsonParsing(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let mut env = MockEnvProvider::default();
        env.set("VKREGISTRY_REGISTRY", "/env/vk.xml");
        env.set("VKREGISTRY_WORD_LIST", "/env/feature_detect.h");
        env.set("VKREGISTRY_WORD_LIST_OPTIONAL", "true");
        env.set("VKREGISTRY_FORMAT", "JSON");
        env.set("VKREGISTRY_QUIET", "true");

        let config =
            ConfigManager::apply_environment_overrides_with(&env, Config::default()).unwrap();

        assert_eq!(config.input.registry, PathBuf::from("/env/vk.xml"));
        assert_eq!(config.input.word_list, PathBuf::from("/env/feature_detect.h"));
        assert!(config.input.word_list_optional);
        assert_eq!(config.output.format, OutputFormatConfig::Json);
        assert!(config.output.quiet);
    }

    #[test]
    fn test_invalid_environment_values() {
        let mut env = MockEnvProvider::default();
        env.set("VKREGISTRY_VERBOSE", "loud");
        let result = ConfigManager::apply_environment_overrides_with(&env, Config::default());
        assert!(matches!(result, Err(ConfigError::Environment(_))));

        let mut env = MockEnvProvider::default();
        env.set("VKREGISTRY_FORMAT", "xml");
        let result = ConfigManager::apply_environment_overrides_with(&env, Config::default());
        assert!(matches!(result, Err(ConfigError::Environment(_))));
    }

    #[test]
    fn test_merge_with_cli() {
        let mut config = Config::default();
        config.output.quiet = true;
        config.input.word_list = PathBuf::from("from_file.h");

        let cli = Cli::try_parse_from(["vkregistry", "my_vk.xml", "--format", "summary", "-v"])
            .unwrap();
        let merged = ConfigManager::merge_with_cli(config, &cli);

        assert_eq!(merged.input.registry, PathBuf::from("my_vk.xml"));
        assert_eq!(merged.input.word_list, PathBuf::from("from_file.h"));
        assert_eq!(merged.output.format, OutputFormatConfig::Summary);
        assert!(merged.output.verbose);
        assert!(!merged.output.quiet);
        assert_eq!(merged.verbosity(), VerbosityLevel::Verbose);
    }

    #[test]
    fn test_merge_configs() {
        let mut override_config = Config::default();
        override_config.input.registry = PathBuf::from("other.xml");
        override_config.output.format = OutputFormatConfig::Json;

        let merged = ConfigManager::merge_configs(Config::default(), override_config);
        assert_eq!(merged.input.registry, PathBuf::from("other.xml"));
        assert_eq!(merged.output.format, OutputFormatConfig::Json);
    }

    #[test]
    fn test_config_validation() {
        assert!(ConfigManager::validate_config(&Config::default()).is_ok());

        let mut config = Config::default();
        config.input.registry = PathBuf::new();
        assert!(matches!(
            ConfigManager::validate_config(&config),
            Err(ConfigError::Validation(_))
        ));

        let mut config = Config::default();
        config.output.verbose = true;
        config.output.quiet = true;
        assert!(ConfigManager::validate_config(&config).is_err());
    }

    #[test]
    fn test_output_format_conversion() {
        let config_format: OutputFormatConfig = OutputFormat::Json.into();
        assert_eq!(config_format, OutputFormatConfig::Json);

        let cli_format: OutputFormat = OutputFormatConfig::Summary.into();
        assert_eq!(cli_format, OutputFormat::Summary);
    }

    #[test]
    fn test_config_error_reaches_binary_boundary() {
        use anyhow::Context;

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        fs::write(&config_path, "format = json").unwrap();

        let err = ConfigManager::load_from_file(&config_path)
            .context("failed to load configuration")
            .unwrap_err();
        assert_eq!(err.to_string(), "failed to load configuration");
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::UnsupportedFormat(ext)) if ext == "ini"
        ));
    }

    #[test]
    fn test_find_config_file_in() {
        let temp_dir = TempDir::new().unwrap();
        assert!(
            ConfigManager::find_config_file_in(temp_dir.path())
                .unwrap()
                .is_none()
        );

        fs::write(
            temp_dir.path().join(".vkregistry.toml"),
            "[output]\nformat = \"summary\"\n",
        )
        .unwrap();
        let found = ConfigManager::find_config_file_in(temp_dir.path())
            .unwrap()
            .unwrap();
        assert_eq!(found.output.format, OutputFormatConfig::Summary);
    }

    #[test]
    fn test_load_config_integration() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("vkregistry.toml");
        fs::write(
            &config_path,
            "[input]\nregistry = \"file_vk.xml\"\n\n[output]\nformat = \"json\"\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "vkregistry",
            "--config",
            config_path.to_str().unwrap(),
            "--format",
            "summary",
        ])
        .unwrap();
        let config = ConfigManager::load_config(&cli).unwrap();

        assert_eq!(config.input.registry, PathBuf::from("file_vk.xml"));
        assert_eq!(config.output.format, OutputFormatConfig::Summary);
    }
}
