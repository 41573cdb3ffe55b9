//! Translation of a [`Command`] into the XJC argument vector.

use std::path::{Path, PathBuf};

use crate::command::{Command, absolute_display};
use crate::error::{Result, XjcError};

/// Main class of the XJC command line front-end
pub const DEFAULT_ENTRY_POINT: &str = "com.sun.tools.xjc.XJCFacade";

/// Location of the episode file relative to the destination directory
pub const EPISODE_PATH: &str = "META-INF/sun-jaxb.episode";

/// Translates commands into argument vectors.
///
/// The entry point token is only emitted for launches that need to name the
/// main class (the subprocess mode).
#[derive(Debug, Clone)]
pub struct ArgumentTranslator {
    entry_point: Option<String>,
}

/// Translated options awaiting the materialized resource paths
#[derive(Debug, Clone, PartialEq)]
pub struct Arguments {
    options: Vec<String>,
    outputs: Vec<String>,
}

impl ArgumentTranslator {
    pub fn new(entry_point: Option<String>) -> Self {
        Self { entry_point }
    }

    pub fn for_subprocess() -> Self {
        Self::new(Some(DEFAULT_ENTRY_POINT.to_string()))
    }

    pub fn for_in_process() -> Self {
        Self::new(None)
    }

    pub fn entry_point(&self) -> Option<&str> {
        self.entry_point.as_deref()
    }

    /// Translate every option of `command`.
    ///
    /// Creates the destination directory and, for episode generation, its
    /// `META-INF` directory. Failing to do so is a configuration error.
    pub fn translate(&self, command: &Command) -> Result<Arguments> {
        let mut args = Vec::new();

        if !command.classpath.is_empty() {
            args.push("-cp".to_string());
            args.push(command.classpath.joined());
        }

        if let Some(entry_point) = &self.entry_point {
            args.push(entry_point.clone());
        }

        push_flag(&mut args, command.annotate, "-Xannotate");
        push_flag(&mut args, command.debug, "-debug");
        push_flag(&mut args, command.read_only, "-readOnly");
        push_flag(&mut args, command.no_header, "-no-header");
        push_flag(&mut args, command.explicit_annotation, "-XexplicitAnnotation");
        push_flag(&mut args, command.disable_xml_security, "-disableXmlSecurity");
        push_flag(&mut args, command.content_for_wildcard, "-contentForWildcard");
        push_flag(&mut args, command.auto_name_resolution, "-XautoNameResolution");
        push_flag(
            &mut args,
            command.test_class_name_allocator,
            "-Xtest-class-name-allocator",
        );

        if let Some(file) = &command.http_proxy_file {
            push_pair(&mut args, "-httpproxyfile", absolute_display(file));
        }
        if let Some(proxy) = &command.http_proxy {
            push_pair(&mut args, "-httpproxy", proxy.clone());
        }

        push_flag(&mut args, command.add_generated_annotation, "-mark-generated");

        if let Some(catalog) = &command.catalog {
            push_pair(&mut args, "-catalog", absolute_display(catalog));
        }

        push_flag(&mut args, command.enable_introspection, "-enableIntrospection");
        push_flag(&mut args, command.extension, "-extension");
        push_flag(&mut args, command.lax_schema_validation, "-nv");
        push_flag(&mut args, command.no_package_level_annotations, "-npa");
        push_flag(&mut args, command.quiet, "-quiet");

        if let Some(version) = command.target_version {
            push_pair(&mut args, "-target", version.as_str().to_string());
        }

        push_flag(&mut args, command.verbose, "-verbose");

        if let Some(source_type) = command.source_type {
            args.push(source_type.flag());
        }
        if let Some(encoding) = &command.encoding {
            push_pair(&mut args, "-encoding", encoding.clone());
        }
        if let Some(package) = &command.package_name {
            push_pair(&mut args, "-p", package.clone());
        }

        let outputs = self.output_arguments(command)?;

        Ok(Arguments {
            options: args,
            outputs,
        })
    }

    fn output_arguments(&self, command: &Command) -> Result<Vec<String>> {
        let mut outputs = Vec::new();

        if let Some(dest_dir) = &command.dest_dir {
            ensure_directory(dest_dir)?;
            push_pair(&mut outputs, "-d", absolute_display(dest_dir));
        }

        if command.generate_episode {
            let dest_dir = command.dest_dir.as_ref().ok_or_else(|| {
                XjcError::Config(
                    "Episode generation requires a destination directory".to_string(),
                )
            })?;
            let episode = episode_file(dest_dir);
            if let Some(parent) = episode.parent() {
                ensure_directory(parent)?;
            }
            push_pair(&mut outputs, "-episode", absolute_display(&episode));
        }

        Ok(outputs)
    }
}

impl Default for ArgumentTranslator {
    fn default() -> Self {
        Self::for_subprocess()
    }
}

impl Arguments {
    /// Option tokens, up to and excluding the resources
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Finish the argument vector with schema paths, `-b` binding pairs and
    /// the output directory arguments, in that order.
    pub fn complete(self, schemas: &[PathBuf], bindings: &[PathBuf]) -> Vec<String> {
        let Arguments {
            options: mut args,
            outputs,
        } = self;

        args.extend(schemas.iter().map(|schema| absolute_display(schema)));
        for binding in bindings {
            push_pair(&mut args, "-b", absolute_display(binding));
        }
        args.extend(outputs);
        args
    }
}

/// Path of the episode file for a destination directory
pub fn episode_file(dest_dir: &Path) -> PathBuf {
    EPISODE_PATH
        .split('/')
        .fold(dest_dir.to_path_buf(), |path, part| path.join(part))
}

fn push_flag(args: &mut Vec<String>, enabled: bool, flag: &str) {
    if enabled {
        args.push(flag.to_string());
    }
}

fn push_pair(args: &mut Vec<String>, flag: &str, value: String) {
    args.push(flag.to_string());
    args.push(value);
}

fn ensure_directory(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(dir).map_err(|e| {
        XjcError::Config(format!(
            "Unable to create output directory {}: {}",
            absolute_display(dir),
            e
        ))
    })
}
