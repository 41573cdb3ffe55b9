//! # xjc-driver Library
//!
//! Drives the JAXB XJC schema compiler: translates a typed option set into
//! XJC arguments, stages remote schemas and bindings as local temporary
//! files, runs the tool in a JVM subprocess or through an embedded entry
//! point, and annotates the generated sources.

pub mod annotate;
pub mod cli;
pub mod command;
pub mod compiler;
pub mod config;
pub mod error;
pub mod error_reporter;
pub mod http_client;
pub mod invoker;
pub mod materializer;
pub mod output;
pub mod router;
pub mod source_discovery;
pub mod translator;

pub use annotate::{AnnotateOutcome, AnnotationPass, AnnotationStats, SUPPRESS_WARNINGS};
pub use cli::{Cli, OutputFormat, VerbosityLevel};
pub use command::{ClassPath, Command, OrderedSet, ResourceLocator, SourceType, TargetVersion};
pub use compiler::{CompileReport, CompileStatus, PostProcessing, Stage, XjcCompiler};
pub use config::{Config, ConfigError, ConfigManager};
pub use error::{ExitStatusKind, Result, XjcError};
pub use http_client::{HttpClientConfig, ResourceFetcher};
pub use invoker::{EmbeddedTool, ExitTrap, Invocation, Launcher, ToolOutcome};
pub use materializer::{MaterializedResources, ResourceMaterializer, SchemaTransform, TempFileSet};
pub use output::Output;
pub use router::{CollectingSink, LogSink, OutputRouter, Severity, TracingSink};
pub use source_discovery::{DiscoveredSources, SourceDiscovery};
pub use translator::{ArgumentTranslator, Arguments, DEFAULT_ENTRY_POINT, EPISODE_PATH};
