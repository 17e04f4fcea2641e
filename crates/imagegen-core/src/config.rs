use crate::secret_store::{self, SecretReference, SecretStoreError};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR_NAME: &str = "imagegen";
const CONFIG_FILE_NAME: &str = "config.toml";
const CURRENT_SCHEMA_VERSION: u32 = 1;
pub const CONFIG_DIR_ENV: &str = "IMAGEGEN_CONFIG_DIR";
pub const DEFAULT_CONFIGURATION_NAME: &str = "default";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const SHARED_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_JSON_RPC_METHOD: &str = "generate";

/// Result returned by [`load_config`], capturing the source and any non-fatal issues.
#[derive(Debug, Clone)]
pub struct ConfigLoadResult {
    pub config: FileConfig,
    pub warnings: Vec<String>,
    pub source: ConfigSource,
}

/// Indicates where the configuration was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// No persisted configuration was found or usable; defaults were synthesized.
    Default,
    /// Configuration was read from `config.toml`.
    File,
}

/// Errors that can occur when persisting configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Ser(toml::ser::Error),
    Secret(SecretStoreError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "IO error: {err}"),
            ConfigError::Ser(err) => write!(f, "TOML serialization error: {err}"),
            ConfigError::Secret(err) => write!(f, "Secret storage error: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Ser(value)
    }
}

impl From<SecretStoreError> for ConfigError {
    fn from(value: SecretStoreError) -> Self {
        Self::Secret(value)
    }
}

/// Disk-backed configuration schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default = "FileConfig::schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub backend: BackendPreferences,
    #[serde(default)]
    pub ui: UiPreferences,
    #[serde(default = "default_configurations")]
    pub configurations: BTreeMap<String, ImageModelConfiguration>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            backend: BackendPreferences::default(),
            ui: UiPreferences::default(),
            configurations: default_configurations(),
        }
    }
}

impl FileConfig {
    const fn schema_version() -> u32 {
        CURRENT_SCHEMA_VERSION
    }

    /// Names of the configured image clients, `default` first, the rest alphabetical.
    pub fn configuration_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.configurations.len());
        if self.configurations.contains_key(DEFAULT_CONFIGURATION_NAME) {
            names.push(DEFAULT_CONFIGURATION_NAME.to_string());
        }
        names.extend(
            self.configurations
                .keys()
                .filter(|name| name.as_str() != DEFAULT_CONFIGURATION_NAME)
                .cloned(),
        );
        names
    }

    pub fn configuration(&self, name: &str) -> Option<&ImageModelConfiguration> {
        self.configurations.get(name)
    }

    pub fn configuration_mut(&mut self, name: &str) -> Option<&mut ImageModelConfiguration> {
        self.configurations.get_mut(name)
    }
}

fn default_configurations() -> BTreeMap<String, ImageModelConfiguration> {
    let mut configurations = BTreeMap::new();
    configurations.insert(
        DEFAULT_CONFIGURATION_NAME.to_string(),
        ImageModelConfiguration::default(),
    );
    configurations
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SecretValue {
    Plain(String),
    Reference(SecretReference),
}

impl SecretValue {
    fn take_plain(&self) -> Option<String> {
        match self {
            SecretValue::Plain(value) => Some(value.clone()),
            SecretValue::Reference(_) => None,
        }
    }
}

/// How the provider should hand back generated pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    #[serde(rename = "url")]
    Url,
    #[serde(rename = "b64_json")]
    B64Json,
}

impl ResponseFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseFormat::Url => "url",
            ResponseFormat::B64Json => "b64_json",
        }
    }
}

/// One named image client, addressed by the panel's "Model configuration" field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageModelConfiguration {
    #[serde(default = "ImageModelConfiguration::default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<SecretValue>,
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default = "ImageModelConfiguration::default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub response_format: ResponseFormat,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub log_requests: bool,
    #[serde(default)]
    pub log_responses: bool,
}

impl Default for ImageModelConfiguration {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            api_key: None,
            organization_id: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            response_format: ResponseFormat::default(),
            user: None,
            log_requests: false,
            log_responses: false,
        }
    }
}

impl ImageModelConfiguration {
    fn default_base_url() -> String {
        DEFAULT_BASE_URL.to_string()
    }

    const fn default_timeout_secs() -> u64 {
        DEFAULT_TIMEOUT_SECS
    }

    pub fn set_api_key(&mut self, name: &str, api_key: &str) -> Result<(), SecretStoreError> {
        let trimmed = api_key.trim();
        if trimmed.is_empty() {
            self.clear_api_key()?;
            return Ok(());
        }

        if let Some(SecretValue::Reference(existing)) = self.api_key.as_ref() {
            // Previous secret; a failed delete leaves an orphan we can ignore.
            let _ = secret_store::delete_secret(existing);
        }

        let reference = secret_store::store_secret(&secret_label(name), trimmed)?;
        self.api_key = Some(SecretValue::Reference(reference));
        Ok(())
    }

    pub fn clear_api_key(&mut self) -> Result<(), SecretStoreError> {
        if let Some(SecretValue::Reference(reference)) = self.api_key.as_ref() {
            secret_store::delete_secret(reference)?;
        }
        self.api_key = None;
        Ok(())
    }

    pub fn migrate_secret(&mut self, name: &str) -> Result<bool, SecretStoreError> {
        let Some(value) = self.api_key.as_ref().and_then(SecretValue::take_plain) else {
            return Ok(false);
        };

        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.api_key = None;
            return Ok(true);
        }

        let reference = secret_store::store_secret(&secret_label(name), trimmed)?;
        self.api_key = Some(SecretValue::Reference(reference));
        Ok(true)
    }

    /// Resolve the API key from the process environment, then the secret store.
    pub fn resolve_api_key(&self, name: &str) -> Result<Option<String>, SecretStoreError> {
        self.resolve_api_key_with(name, |var| env::var(var).ok())
    }

    /// Resolution order: `IMAGEGEN_<NAME>_API_KEY`, stored secret, `OPENAI_API_KEY`.
    pub fn resolve_api_key_with<F>(
        &self,
        name: &str,
        lookup: F,
    ) -> Result<Option<String>, SecretStoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = non_empty(lookup(&api_key_env_var(name))) {
            return Ok(Some(value));
        }

        let stored = match self.api_key.as_ref() {
            Some(SecretValue::Reference(reference)) => secret_store::load_secret(reference)?,
            Some(SecretValue::Plain(value)) => Some(value.clone()),
            None => None,
        };
        if let Some(value) = non_empty(stored) {
            return Ok(Some(value));
        }

        Ok(non_empty(lookup(SHARED_API_KEY_ENV)))
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn secret_label(name: &str) -> String {
    format!("{name}_api_key")
}

/// Environment variable consulted first for a configuration's API key.
pub fn api_key_env_var(name: &str) -> String {
    let normalized: String = name
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("IMAGEGEN_{normalized}_API_KEY")
}

/// Which transport carries generation calls.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Call the provider's images endpoint directly.
    #[default]
    Direct,
    /// Forward calls to a dashboard backend speaking JSON-RPC.
    JsonRpc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendPreferences {
    #[serde(default)]
    pub kind: BackendKind,
    #[serde(default)]
    pub endpoint: Option<String>,
    /// JSON-RPC method name invoked for each generation.
    #[serde(default = "BackendPreferences::default_method")]
    pub method: String,
}

impl Default for BackendPreferences {
    fn default() -> Self {
        Self {
            kind: BackendKind::Direct,
            endpoint: None,
            method: Self::default_method(),
        }
    }
}

impl BackendPreferences {
    fn default_method() -> String {
        DEFAULT_JSON_RPC_METHOD.to_string()
    }
}

/// UI-only preferences that the GUI needs to persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiPreferences {
    #[serde(default)]
    pub theme: ThemePreference,
    #[serde(default)]
    pub show_activity_log: bool,
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            theme: ThemePreference::Dark,
            show_activity_log: false,
        }
    }
}

/// Theme preference options.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ThemePreference {
    Light,
    #[default]
    Dark,
}

/// Path to the configuration directory.
pub fn config_directory() -> PathBuf {
    if let Ok(dir) = env::var(CONFIG_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(shellexpand::tilde(dir.trim()).to_string());
        }
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Path to `config.toml`.
pub fn config_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}

/// Load the configuration from the default location, falling back to defaults.
pub fn load_config() -> ConfigLoadResult {
    let path = config_path();
    let mut result = load_config_from(&path);

    if result.source == ConfigSource::File {
        match migrate_secrets(&mut result.config) {
            Ok(true) => {
                if let Err(err) = save_config_to(&result.config, &path) {
                    result
                        .warnings
                        .push(format!("Failed to persist secure secret updates: {}", err));
                }
            }
            Ok(false) => {}
            Err(err) => result
                .warnings
                .push(format!("Failed to move API keys into secure storage: {}", err)),
        }
    }

    result
}

/// Load and sanitize a configuration file without touching the secret store.
pub fn load_config_from(path: &Path) -> ConfigLoadResult {
    let mut warnings = Vec::new();

    if path.exists() {
        match fs::read_to_string(path) {
            Ok(raw) => match toml::from_str::<FileConfig>(&raw) {
                Ok(cfg) => {
                    let (cfg, mut sanitize_warnings) = sanitize_config(cfg);
                    warnings.append(&mut sanitize_warnings);
                    return ConfigLoadResult {
                        config: cfg,
                        warnings,
                        source: ConfigSource::File,
                    };
                }
                Err(err) => {
                    warnings.push(format!(
                        "Failed to parse {} as TOML: {}. Falling back to defaults.",
                        CONFIG_FILE_NAME, err
                    ));
                }
            },
            Err(err) => {
                warnings.push(format!(
                    "Failed to read {}: {}. Falling back to defaults.",
                    CONFIG_FILE_NAME, err
                ));
            }
        }
    }

    ConfigLoadResult {
        config: FileConfig::default(),
        warnings,
        source: ConfigSource::Default,
    }
}

/// Persist the configuration to the default location.
pub fn save_config(config: &FileConfig) -> Result<(), ConfigError> {
    let mut config_to_write = config.clone();
    // the on-disk representation never regresses to plaintext
    migrate_secrets(&mut config_to_write)?;
    save_config_to(&config_to_write, &config_path())
}

/// Serialize the configuration as-is to `path`.
pub fn save_config_to(config: &FileConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let serialized = toml::to_string_pretty(config)?;
    fs::write(path, serialized)?;
    Ok(())
}

/// Move plaintext API keys into the secret store. Returns whether anything changed.
pub fn migrate_secrets(config: &mut FileConfig) -> Result<bool, SecretStoreError> {
    let mut migrated = false;
    for (name, configuration) in config.configurations.iter_mut() {
        if configuration.migrate_secret(name)? {
            migrated = true;
        }
    }
    Ok(migrated)
}

fn sanitize_config(mut config: FileConfig) -> (FileConfig, Vec<String>) {
    let mut warnings = Vec::new();

    if config.schema_version != CURRENT_SCHEMA_VERSION {
        warnings.push(format!(
            "Unsupported schema_version {} in {}; treating it as version {}.",
            config.schema_version, CONFIG_FILE_NAME, CURRENT_SCHEMA_VERSION
        ));
        config.schema_version = CURRENT_SCHEMA_VERSION;
    }

    if config.configurations.is_empty() {
        warnings.push(format!(
            "No image model configurations found; added '{}'.",
            DEFAULT_CONFIGURATION_NAME
        ));
        config.configurations = default_configurations();
    }

    let blank_names: Vec<String> = config
        .configurations
        .keys()
        .filter(|name| name.trim().is_empty())
        .cloned()
        .collect();
    for name in blank_names {
        config.configurations.remove(&name);
        warnings.push("Removed an image model configuration with a blank name.".to_string());
    }
    if config.configurations.is_empty() {
        config.configurations = default_configurations();
    }

    for (name, configuration) in config.configurations.iter_mut() {
        if configuration.base_url.trim().is_empty() {
            warnings.push(format!(
                "Configuration '{}' had an empty base_url; reset to {}.",
                name, DEFAULT_BASE_URL
            ));
            configuration.base_url = DEFAULT_BASE_URL.to_string();
        }
        if configuration.timeout_secs == 0 {
            warnings.push(format!(
                "Configuration '{}' had timeout_secs = 0; reset to {}.",
                name, DEFAULT_TIMEOUT_SECS
            ));
            configuration.timeout_secs = DEFAULT_TIMEOUT_SECS;
        }
    }

    if config.backend.kind == BackendKind::JsonRpc {
        let missing = config
            .backend
            .endpoint
            .as_ref()
            .map(|endpoint| endpoint.trim().is_empty())
            .unwrap_or(true);
        if missing {
            warnings.push(
                "The json-rpc backend requires an endpoint; falling back to direct calls."
                    .to_string(),
            );
            config.backend.kind = BackendKind::Direct;
            config.backend.endpoint = None;
        }
    }

    if config.backend.method.trim().is_empty() {
        config.backend.method = DEFAULT_JSON_RPC_METHOD.to_string();
    }

    (config, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_has_default_configuration() {
        let config = FileConfig::default();
        assert_eq!(config.configuration_names(), vec!["default".to_string()]);
        let default = config.configuration("default").unwrap();
        assert_eq!(default.base_url, DEFAULT_BASE_URL);
        assert_eq!(default.timeout_secs, 60);
        assert_eq!(default.response_format, ResponseFormat::Url);
    }

    #[test]
    fn test_configuration_names_put_default_first() {
        let mut config = FileConfig::default();
        config
            .configurations
            .insert("alpha".to_string(), ImageModelConfiguration::default());
        config
            .configurations
            .insert("zeta".to_string(), ImageModelConfiguration::default());
        assert_eq!(config.configuration_names(), vec!["default", "alpha", "zeta"]);
    }

    #[test]
    fn test_sanitize_empty_configurations() {
        let mut config = FileConfig::default();
        config.configurations.clear();

        let (sanitized, warnings) = sanitize_config(config);

        assert!(sanitized.configurations.contains_key(DEFAULT_CONFIGURATION_NAME));
        assert!(warnings.iter().any(|w| w.contains("No image model configurations")));
    }

    #[test]
    fn test_sanitize_zero_timeout_and_blank_base_url() {
        let mut config = FileConfig::default();
        config.configurations.insert(
            "broken".to_string(),
            ImageModelConfiguration {
                base_url: "  ".to_string(),
                timeout_secs: 0,
                ..ImageModelConfiguration::default()
            },
        );

        let (sanitized, warnings) = sanitize_config(config);

        let broken = sanitized.configuration("broken").unwrap();
        assert_eq!(broken.base_url, DEFAULT_BASE_URL);
        assert_eq!(broken.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(warnings.iter().any(|w| w.contains("broken") && w.contains("timeout_secs")));
        assert!(warnings.iter().any(|w| w.contains("broken") && w.contains("base_url")));
    }

    #[test]
    fn test_sanitize_json_rpc_without_endpoint() {
        let mut config = FileConfig::default();
        config.backend.kind = BackendKind::JsonRpc;

        let (sanitized, warnings) = sanitize_config(config);

        assert_eq!(sanitized.backend.kind, BackendKind::Direct);
        assert!(warnings.iter().any(|w| w.contains("json-rpc")));
    }

    #[test]
    fn test_sanitize_unknown_schema_version() {
        let mut config = FileConfig::default();
        config.schema_version = 7;
        let (sanitized, warnings) = sanitize_config(config);
        assert_eq!(sanitized.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_parse_full_toml() {
        let raw = r#"
            schema_version = 1

            [backend]
            kind = "json-rpc"
            endpoint = "http://localhost:8080/q/dev-ui/json-rpc"

            [ui]
            theme = "light"
            show_activity_log = true

            [configurations.default]
            base_url = "https://example.test/v1/"
            timeout_secs = 30
            response_format = "b64_json"
            log_requests = true

            [configurations.azure]
            base_url = "https://azure.example.test/openai/"
        "#;
        let config: FileConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.backend.kind, BackendKind::JsonRpc);
        assert_eq!(config.ui.theme, ThemePreference::Light);
        assert_eq!(config.configuration_names(), vec!["default", "azure"]);
        let default = config.configuration("default").unwrap();
        assert_eq!(default.response_format, ResponseFormat::B64Json);
        assert_eq!(default.timeout_secs, 30);
        assert!(default.log_requests);
        let azure = config.configuration("azure").unwrap();
        assert_eq!(azure.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_api_key_env_var_name() {
        assert_eq!(api_key_env_var("default"), "IMAGEGEN_DEFAULT_API_KEY");
        assert_eq!(api_key_env_var("my-azure.1"), "IMAGEGEN_MY_AZURE_1_API_KEY");
    }

    #[test]
    fn test_resolve_api_key_order() {
        let configuration = ImageModelConfiguration {
            api_key: Some(SecretValue::Plain("from-file".to_string())),
            ..ImageModelConfiguration::default()
        };

        let mut env = HashMap::new();
        env.insert(SHARED_API_KEY_ENV.to_string(), "shared".to_string());
        let lookup = |var: &str| env.get(var).cloned();
        assert_eq!(
            configuration.resolve_api_key_with("default", lookup).unwrap(),
            Some("from-file".to_string())
        );

        env.insert("IMAGEGEN_DEFAULT_API_KEY".to_string(), "specific".to_string());
        let lookup = |var: &str| env.get(var).cloned();
        assert_eq!(
            configuration.resolve_api_key_with("default", lookup).unwrap(),
            Some("specific".to_string())
        );

        let keyless = ImageModelConfiguration::default();
        let lookup = |var: &str| {
            (var == SHARED_API_KEY_ENV).then(|| "shared".to_string())
        };
        assert_eq!(
            keyless.resolve_api_key_with("default", lookup).unwrap(),
            Some("shared".to_string())
        );
        assert_eq!(keyless.resolve_api_key_with("default", |_| None).unwrap(), None);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = FileConfig::default();
        config.ui.theme = ThemePreference::Light;
        config.configurations.insert(
            "local".to_string(),
            ImageModelConfiguration {
                base_url: "http://localhost:8080/v1/".to_string(),
                timeout_secs: 15,
                response_format: ResponseFormat::B64Json,
                ..ImageModelConfiguration::default()
            },
        );

        save_config_to(&config, &path).expect("save");
        let loaded = load_config_from(&path);

        assert_eq!(loaded.source, ConfigSource::File);
        assert!(loaded.warnings.is_empty(), "warnings: {:?}", loaded.warnings);
        assert_eq!(loaded.config.ui.theme, ThemePreference::Light);
        assert_eq!(loaded.config.configuration_names(), vec!["default", "local"]);
        let local = loaded.config.configuration("local").unwrap();
        assert_eq!(local.base_url, "http://localhost:8080/v1/");
        assert_eq!(local.timeout_secs, 15);
        assert_eq!(local.response_format, ResponseFormat::B64Json);
    }

    #[test]
    fn test_invalid_toml_falls_back_to_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[configurations.default\nbase_url = ").expect("write");

        let loaded = load_config_from(&path);

        assert_eq!(loaded.source, ConfigSource::Default);
        assert_eq!(loaded.config.configuration_names(), vec!["default"]);
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("Failed to parse"));
        assert!(loaded.warnings[0].contains("Falling back to defaults"));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let loaded = load_config_from(&temp.path().join(CONFIG_FILE_NAME));

        assert_eq!(loaded.source, ConfigSource::Default);
        assert!(loaded.warnings.is_empty());
        assert_eq!(loaded.config.configuration_names(), vec!["default"]);
    }
}
