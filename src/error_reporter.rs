use crate::cli::VerbosityLevel;
use crate::config::ConfigError;
use crate::error::{ExitStatusKind, XjcError};

/// Error reporter with configurable verbosity
pub struct ErrorReporter {
    verbosity: VerbosityLevel,
    show_timestamps: bool,
}

impl ErrorReporter {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_timestamps: false,
        }
    }

    pub fn with_timestamps(verbosity: VerbosityLevel, show_timestamps: bool) -> Self {
        Self {
            verbosity,
            show_timestamps,
        }
    }

    /// Print a compilation error to stderr
    pub fn report_error(&self, error: &XjcError) {
        eprintln!("{}", self.format_error(error));
    }

    /// Print a configuration error to stderr
    pub fn report_config_error(&self, error: &ConfigError) {
        eprintln!("{}", self.format_config_error(error));
    }

    pub fn format_error(&self, error: &XjcError) -> String {
        match self.verbosity {
            VerbosityLevel::Quiet => self.format_error_brief(error),
            VerbosityLevel::Normal => self.format_error_normal(error),
            VerbosityLevel::Verbose => self.format_error_verbose(error),
            VerbosityLevel::Debug => self.format_error_debug(error),
        }
    }

    pub fn format_config_error(&self, error: &ConfigError) -> String {
        match self.verbosity {
            VerbosityLevel::Quiet => format!("Config error: {}", error),
            VerbosityLevel::Normal | VerbosityLevel::Verbose => {
                format!("{}\n{}", error, self.get_config_help(error))
            }
            VerbosityLevel::Debug => {
                format!(
                    "{}\nDebug: {:?}\n{}",
                    error,
                    error,
                    self.get_config_help(error)
                )
            }
        }
    }

    /// Single-line rendering; the argument vector of a failed run is omitted
    fn format_error_brief(&self, error: &XjcError) -> String {
        match error {
            XjcError::Invocation { status, .. } => format!("ERROR: xjc finished with {}", status),
            XjcError::ResourceNotFound { path } => {
                format!("NOT FOUND: {}", path.display())
            }
            _ => format!("ERROR: {}", error),
        }
    }

    fn format_error_normal(&self, error: &XjcError) -> String {
        let timestamp = if self.show_timestamps {
            format!("[{}] ", chrono::Utc::now().format("%H:%M:%S"))
        } else {
            String::new()
        };

        format!("{}{}", timestamp, error)
    }

    fn format_error_verbose(&self, error: &XjcError) -> String {
        let mut output = self.format_error_normal(error);
        if let Some(suggestion) = self.suggestion(error) {
            output.push_str("\nSuggestion: ");
            output.push_str(&suggestion);
        }
        output
    }

    fn format_error_debug(&self, error: &XjcError) -> String {
        let mut output = self.format_error_verbose(error);
        output.push_str(&format!("\nDebug Info: {:?}", error));

        output.push_str("\nError Chain:");
        let mut current_error: &dyn std::error::Error = error;
        let mut level = 0;
        while let Some(source) = current_error.source() {
            output.push_str(&format!("\n  {}: {}", level + 1, source));
            current_error = source;
            level += 1;
        }

        output
    }

    fn suggestion(&self, error: &XjcError) -> Option<String> {
        match error {
            XjcError::Http(_) | XjcError::HttpStatus { .. } | XjcError::Timeout { .. } => {
                Some("Check network connectivity and the resource URL".to_string())
            }
            XjcError::ResourceNotFound { path } => Some(format!(
                "Verify the schema or binding file exists: {}",
                path.display()
            )),
            XjcError::UnsupportedResource { .. } => {
                Some("Use a local path, a file: URL, or an http(s) URL".to_string())
            }
            XjcError::Spawn { program, .. } => Some(format!(
                "Make sure '{}' is installed or pass --java with its full path",
                program
            )),
            XjcError::Invocation {
                status: ExitStatusKind::Code(_),
                ..
            } => Some("Inspect the [ERROR] lines logged by xjc above".to_string()),
            XjcError::Config(_) => Some("Check the destination directory and options".to_string()),
            _ => None,
        }
    }

    fn get_config_help(&self, error: &ConfigError) -> String {
        match error {
            ConfigError::Io(_) => "Check that the configuration file exists and is readable".to_string(),
            ConfigError::TomlParsing(_) | ConfigError::JsonParsing(_) => {
                "Check the configuration file syntax (TOML/JSON format expected)".to_string()
            }
            ConfigError::UnsupportedFormat(_) => {
                "Use a .toml or .json configuration file".to_string()
            }
            ConfigError::Environment(_) => {
                "Fix or unset the offending XJC_* environment variable".to_string()
            }
            ConfigError::Validation(_) => {
                "Resolve conflicting values between file, environment, and CLI".to_string()
            }
        }
    }
}
