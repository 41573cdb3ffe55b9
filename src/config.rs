use crate::cli::{Cli, OutputFormat};
use crate::command::Command;
use crate::http_client::HttpClientConfig;
use crate::invoker::{DEFAULT_SYSTEM_PROPERTIES, Launcher};
use crate::translator::DEFAULT_ENTRY_POINT;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
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

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub command: Command,
    pub launcher: LauncherConfig,
    pub network: NetworkConfig,
    pub output: OutputConfig,
    pub materializer: MaterializerConfig,
}

/// How the forked JVM is started
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LauncherConfig {
    /// Java executable
    pub java: String,
    /// Options placed before the system properties
    pub jvm_options: Vec<String>,
    /// `-D` properties; replaces the defaults when given
    pub system_properties: BTreeMap<String, String>,
    /// Main class of the XJC front-end
    pub entry_point: String,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// HTTP request timeout in seconds
    pub timeout_seconds: u64,
    /// Number of retry attempts for failed downloads
    pub retry_attempts: u32,
    /// Retry delay in milliseconds
    pub retry_delay_ms: u64,
    /// Upper bound of the exponential backoff in milliseconds
    pub max_retry_delay_ms: u64,
    /// Honor HTTP_PROXY/HTTPS_PROXY when downloading
    pub use_system_proxy: bool,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format
    pub format: OutputFormatConfig,
    /// Verbose output
    pub verbose: bool,
    /// Quiet mode (errors only)
    pub quiet: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct MaterializerConfig {
    /// Where downloaded resources are stored (system temp dir when unset)
    pub temp_dir: Option<PathBuf>,
}

/// Output format configuration (serializable version of CLI OutputFormat)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormatConfig {
    Human,
    Json,
}

impl From<OutputFormat> for OutputFormatConfig {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputFormatConfig::Human,
            OutputFormat::Json => OutputFormatConfig::Json,
        }
    }
}

impl From<OutputFormatConfig> for OutputFormat {
    fn from(format: OutputFormatConfig) -> Self {
        match format {
            OutputFormatConfig::Human => OutputFormat::Human,
            OutputFormatConfig::Json => OutputFormat::Json,
        }
    }
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            java: "java".to_string(),
            jvm_options: Vec::new(),
            system_properties: DEFAULT_SYSTEM_PROPERTIES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
        }
    }
}

impl LauncherConfig {
    pub fn launcher(&self) -> Launcher {
        Launcher {
            program: self.java.clone(),
            jvm_options: self.jvm_options.clone(),
            system_properties: self.system_properties.clone(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            retry_attempts: 3,
            retry_delay_ms: 1000,
            max_retry_delay_ms: 30000,
            use_system_proxy: true,
        }
    }
}

impl NetworkConfig {
    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout_seconds: self.timeout_seconds,
            retry_attempts: self.retry_attempts,
            retry_delay_ms: self.retry_delay_ms,
            max_retry_delay_ms: self.max_retry_delay_ms,
            use_system_proxy: self.use_system_proxy,
            ..HttpClientConfig::default()
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

fn proxy_pattern() -> &'static Regex {
    static PROXY: OnceLock<Regex> = OnceLock::new();
    PROXY.get_or_init(|| {
        Regex::new(r"^(?:[^:@\s]+(?::[^@\s]*)?@)?[^:@/\s]+:\d{1,5}$")
            .expect("proxy pattern is valid")
    })
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            let file_config = Self::load_from_file(config_path).await?;
            config = Self::merge_configs(config, file_config);
        } else if let Some(found_config) = Self::find_config_file().await? {
            config = Self::merge_configs(config, found_config);
        }

        config = Self::apply_environment_overrides(config)?;
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub async fn find_config_file() -> Result<Option<Config>> {
        let config_names = [
            "xjc-driver.toml",
            "xjc-driver.json",
            ".xjc-driver.toml",
            ".xjc-driver.json",
        ];

        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("xjc-driver");
            for name in &config_names {
                let path = app_config_dir.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
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
        // Launcher settings
        if let Some(java) = env.get("XJC_JAVA") {
            config.launcher.java = java;
        }
        if let Some(options) = env.get("XJC_JVM_OPTIONS") {
            config.launcher.jvm_options =
                options.split_whitespace().map(str::to_string).collect();
        }
        if let Some(entry_point) = env.get("XJC_ENTRY_POINT") {
            config.launcher.entry_point = entry_point;
        }

        // Command settings
        if let Some(dest_dir) = env.get("XJC_DEST_DIR") {
            config.command.dest_dir = Some(PathBuf::from(dest_dir));
        }
        if let Some(package) = env.get("XJC_PACKAGE") {
            config.command.package_name = Some(package);
        }
        if let Some(proxy) = env.get("XJC_HTTP_PROXY") {
            config.command.http_proxy = Some(proxy);
        }
        if let Some(classpath) = env.get("XJC_CLASSPATH") {
            config.command.add_classpath(std::env::split_paths(&classpath));
        }
        if let Some(suppress) = env.get("XJC_SUPPRESS_WARNINGS") {
            config.command.suppress_warnings = parse_env("XJC_SUPPRESS_WARNINGS", &suppress)?;
        }

        // Network settings
        if let Some(timeout) = env.get("XJC_TIMEOUT") {
            config.network.timeout_seconds = parse_env("XJC_TIMEOUT", &timeout)?;
        }
        if let Some(retry_attempts) = env.get("XJC_RETRY_ATTEMPTS") {
            config.network.retry_attempts = parse_env("XJC_RETRY_ATTEMPTS", &retry_attempts)?;
        }
        if let Some(use_proxy) = env.get("XJC_USE_SYSTEM_PROXY") {
            config.network.use_system_proxy = parse_env("XJC_USE_SYSTEM_PROXY", &use_proxy)?;
        }

        // Output settings
        if let Some(verbose) = env.get("XJC_VERBOSE") {
            config.output.verbose = parse_env("XJC_VERBOSE", &verbose)?;
        }
        if let Some(quiet) = env.get("XJC_QUIET") {
            config.output.quiet = parse_env("XJC_QUIET", &quiet)?;
        }
        if let Some(format) = env.get("XJC_FORMAT") {
            config.output.format = match format.to_lowercase().as_str() {
                "human" => OutputFormatConfig::Human,
                "json" => OutputFormatConfig::Json,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid XJC_FORMAT value: {}",
                        format
                    )));
                }
            };
        }

        if let Some(temp_dir) = env.get("XJC_TEMP_DIR") {
            config.materializer.temp_dir = Some(PathBuf::from(temp_dir));
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        let command = &mut config.command;

        command.schemas.extend(cli.schemas.iter().cloned());
        command.bindings.extend(cli.bindings.iter().cloned());
        command.add_classpath(cli.classpath.iter().cloned());

        if let Some(dest_dir) = &cli.dest_dir {
            command.dest_dir = Some(dest_dir.clone());
        }
        if let Some(package) = &cli.package {
            command.package_name = Some(package.clone());
        }
        if cli.source_type.is_some() {
            command.source_type = cli.source_type;
        }
        if cli.target.is_some() {
            command.target_version = cli.target;
        }
        if let Some(encoding) = &cli.encoding {
            command.encoding = Some(encoding.clone());
        }
        if let Some(catalog) = &cli.catalog {
            command.catalog = Some(catalog.clone());
        }
        if let Some(proxy) = &cli.http_proxy {
            command.http_proxy = Some(proxy.clone());
        }
        if let Some(proxy_file) = &cli.http_proxy_file {
            command.http_proxy_file = Some(proxy_file.clone());
        }

        // Flags only ever switch their option away from its default
        command.generate_episode |= cli.episode;
        command.debug |= cli.debug;
        command.read_only |= cli.read_only;
        command.no_header |= cli.no_header;
        command.explicit_annotation |= cli.explicit_annotation;
        command.disable_xml_security |= cli.disable_xml_security;
        command.content_for_wildcard |= cli.content_for_wildcard;
        command.auto_name_resolution |= cli.auto_name_resolution;
        command.test_class_name_allocator |= cli.test_class_name_allocator;
        command.add_generated_annotation |= cli.mark_generated;
        command.extension |= cli.extension;
        command.lax_schema_validation |= cli.lax_schema_validation;
        command.no_package_level_annotations |= cli.no_package_level_annotations;
        command.quiet |= cli.xjc_quiet;
        command.verbose |= cli.xjc_verbose;
        if cli.no_annotate {
            command.annotate = false;
        }
        if cli.no_introspection {
            command.enable_introspection = false;
        }
        if cli.no_suppress_warnings {
            command.suppress_warnings = false;
        }

        if let Some(java) = &cli.java {
            config.launcher.java = java.clone();
        }

        if let Some(timeout) = cli.timeout {
            config.network.timeout_seconds = timeout;
        }
        if let Some(retry_attempts) = cli.retry_attempts {
            config.network.retry_attempts = retry_attempts;
        }

        if let Some(format) = cli.output_format {
            config.output.format = format.into();
        }
        config.output.verbose |= cli.verbose;
        config.output.quiet |= cli.quiet;

        if let Some(temp_dir) = &cli.temp_dir {
            config.materializer.temp_dir = Some(temp_dir.clone());
        }

        config
    }

    /// Merge two configurations (second takes precedence for set values)
    pub fn merge_configs(mut base: Config, override_config: Config) -> Config {
        base.command = override_config.command;
        base.launcher = override_config.launcher;
        base.network = override_config.network;
        base.output = override_config.output;

        if override_config.materializer.temp_dir.is_some() {
            base.materializer.temp_dir = override_config.materializer.temp_dir;
        }

        base
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        if config.network.timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if config.network.retry_attempts > 10 {
            return Err(ConfigError::Validation(
                "Retry attempts cannot exceed 10".to_string(),
            ));
        }

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        if config.launcher.java.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Java executable must not be empty".to_string(),
            ));
        }

        if let Some(proxy) = &config.command.http_proxy
            && !proxy_pattern().is_match(proxy)
        {
            return Err(ConfigError::Validation(format!(
                "Invalid http proxy '{}': expected [user[:password]@]host:port",
                proxy
            )));
        }

        if config.command.generate_episode && config.command.dest_dir.is_none() {
            return Err(ConfigError::Validation(
                "Episode generation requires a destination directory".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Environment(format!("Invalid {} value: {}", key, value)))
}
