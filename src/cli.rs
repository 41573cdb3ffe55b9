use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::command::{ResourceLocator, SourceType, TargetVersion};

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show critical errors
    Quiet,
    /// Show standard information
    #[default]
    Normal,
    /// Show detailed information
    Verbose,
    /// Show all available debugging information
    Debug,
}

impl VerbosityLevel {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            VerbosityLevel::Quiet
        } else if verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }

    /// Default log filter directive for this level
    pub fn log_filter(&self) -> &'static str {
        match self {
            VerbosityLevel::Quiet => "error",
            VerbosityLevel::Normal => "info",
            VerbosityLevel::Verbose => "debug",
            VerbosityLevel::Debug => "trace",
        }
    }
}

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Generate Java sources from XML schemas with the JAXB XJC compiler
#[derive(Parser, Debug, Clone)]
#[command(name = "xjc-driver")]
#[command(about = "Run the JAXB XJC compiler over local or remote schemas")]
#[command(version)]
pub struct Cli {
    /// Schema files or http(s) URLs
    #[arg(value_name = "SCHEMA")]
    pub schemas: Vec<ResourceLocator>,

    /// Binding customization file or URL
    #[arg(short = 'b', long = "binding", action = clap::ArgAction::Append)]
    pub bindings: Vec<ResourceLocator>,

    /// Directory receiving the generated sources
    #[arg(short = 'd', long = "dest-dir")]
    pub dest_dir: Option<PathBuf>,

    /// Target package of the generated classes
    #[arg(short = 'p', long = "package")]
    pub package: Option<String>,

    /// Classpath entry for XJC plugins
    #[arg(long = "classpath", action = clap::ArgAction::Append)]
    pub classpath: Vec<PathBuf>,

    #[arg(long = "source-type", value_parser = parse_source_type)]
    pub source_type: Option<SourceType>,

    /// Generate code for this JAXB version (2.0 or 2.1)
    #[arg(long = "target", value_parser = parse_target_version)]
    pub target: Option<TargetVersion>,

    /// Encoding of the generated sources
    #[arg(long = "encoding")]
    pub encoding: Option<String>,

    /// Catalog file resolving external entity references
    #[arg(long = "catalog")]
    pub catalog: Option<PathBuf>,

    /// Proxy as [user[:password]@]host:port
    #[arg(long = "http-proxy")]
    pub http_proxy: Option<String>,

    /// File holding the proxy setting
    #[arg(long = "http-proxy-file")]
    pub http_proxy_file: Option<PathBuf>,

    /// Write META-INF/sun-jaxb.episode into the destination directory
    #[arg(long = "episode")]
    pub episode: bool,

    #[arg(long = "debug")]
    pub debug: bool,

    /// Generated files are made read-only
    #[arg(long = "read-only")]
    pub read_only: bool,

    /// Omit the generated-file header comment
    #[arg(long = "no-header")]
    pub no_header: bool,

    #[arg(long = "explicit-annotation")]
    pub explicit_annotation: bool,

    #[arg(long = "disable-xml-security")]
    pub disable_xml_security: bool,

    #[arg(long = "content-for-wildcard")]
    pub content_for_wildcard: bool,

    #[arg(long = "auto-name-resolution")]
    pub auto_name_resolution: bool,

    #[arg(long = "test-class-name-allocator")]
    pub test_class_name_allocator: bool,

    /// Mark generated code with @javax.annotation.Generated
    #[arg(long = "mark-generated")]
    pub mark_generated: bool,

    /// Allow vendor extensions
    #[arg(long = "extension")]
    pub extension: bool,

    /// Skip strict schema validation of the input (-nv)
    #[arg(long = "lax-schema-validation")]
    pub lax_schema_validation: bool,

    /// Suppress package-level annotations (-npa)
    #[arg(long = "no-package-level-annotations")]
    pub no_package_level_annotations: bool,

    /// Pass -quiet to XJC
    #[arg(long = "xjc-quiet")]
    pub xjc_quiet: bool,

    /// Pass -verbose to XJC
    #[arg(long = "xjc-verbose")]
    pub xjc_verbose: bool,

    /// Do not pass -Xannotate
    #[arg(long = "no-annotate")]
    pub no_annotate: bool,

    /// Do not pass -enableIntrospection
    #[arg(long = "no-introspection")]
    pub no_introspection: bool,

    /// Leave generated classes without @SuppressWarnings("all")
    #[arg(long = "no-suppress-warnings")]
    pub no_suppress_warnings: bool,

    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Report format [default: human]
    #[arg(long = "format", value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    pub quiet: bool,

    /// Java executable used to launch XJC
    #[arg(long = "java")]
    pub java: Option<String>,

    /// HTTP request timeout in seconds
    #[arg(long = "timeout")]
    pub timeout: Option<u64>,

    /// Number of retry attempts for failed downloads
    #[arg(long = "retry-attempts")]
    pub retry_attempts: Option<u32>,

    /// Directory for downloaded resources
    #[arg(long = "temp-dir")]
    pub temp_dir: Option<PathBuf>,
}

fn parse_source_type(value: &str) -> Result<SourceType, String> {
    value.parse().map_err(|e: crate::error::XjcError| e.to_string())
}

fn parse_target_version(value: &str) -> Result<TargetVersion, String> {
    value.parse().map_err(|e: crate::error::XjcError| e.to_string())
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        VerbosityLevel::from_flags(self.verbose, self.quiet)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.episode && self.dest_dir.is_none() {
            return Err("--episode requires --dest-dir".to_string());
        }
        if let Some(timeout) = self.timeout
            && timeout == 0
        {
            return Err("Timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}
