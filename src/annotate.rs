//! Post-processing of generated sources.
//!
//! Inserts a suppression annotation directly above the first top-level public
//! class declaration of each generated file. Rewrites go through a sibling
//! temporary file that is renamed over the original, so a failure never
//! leaves a half-written source behind.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Result, XjcError};
use crate::source_discovery::SourceDiscovery;

pub const SUPPRESS_WARNINGS: &str = "@java.lang.SuppressWarnings(\"all\")";

const DECLARATION_MARKERS: [&str; 2] = ["public class", "public abstract class"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotateOutcome {
    Inserted,
    AlreadyPresent,
    NoDeclaration,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnnotationStats {
    pub files_scanned: usize,
    pub inserted: usize,
    pub already_present: usize,
    pub no_declaration: usize,
}

impl AnnotationStats {
    fn record(&mut self, outcome: AnnotateOutcome) {
        self.files_scanned += 1;
        match outcome {
            AnnotateOutcome::Inserted => self.inserted += 1,
            AnnotateOutcome::AlreadyPresent => self.already_present += 1,
            AnnotateOutcome::NoDeclaration => self.no_declaration += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnnotationPass {
    annotation: String,
    discovery: SourceDiscovery,
}

impl Default for AnnotationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationPass {
    pub fn new() -> Self {
        Self {
            annotation: SUPPRESS_WARNINGS.to_string(),
            discovery: SourceDiscovery::new(),
        }
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = annotation.into();
        self
    }

    pub fn annotation(&self) -> &str {
        &self.annotation
    }

    /// Annotate every generated source below `dest_dir`.
    ///
    /// Stops at the first file that cannot be rewritten. Files already
    /// rewritten stay rewritten.
    pub async fn run(&self, dest_dir: &Path) -> Result<AnnotationStats> {
        let found = self.discovery.discover(dest_dir).await?;
        let pass = self.clone();

        let stats = tokio::task::spawn_blocking(move || pass.annotate_all(found.files))
            .await
            .map_err(|e| XjcError::Concurrency {
                details: format!("annotation task failed: {}", e),
            })??;

        info!(
            scanned = stats.files_scanned,
            inserted = stats.inserted,
            "annotated generated sources"
        );
        Ok(stats)
    }

    fn annotate_all(&self, files: Vec<PathBuf>) -> Result<AnnotationStats> {
        let mut stats = AnnotationStats::default();
        for file in files {
            let outcome = self.annotate_file(&file)?;
            debug!(path = %file.display(), ?outcome, "annotation pass");
            stats.record(outcome);
        }
        Ok(stats)
    }

    /// Annotate a single file
    pub fn annotate_file(&self, path: &Path) -> Result<AnnotateOutcome> {
        self.rewrite(path).map_err(|e| XjcError::PostProcessing {
            path: path.to_path_buf(),
            details: e.to_string(),
        })
    }

    fn rewrite(&self, path: &Path) -> io::Result<AnnotateOutcome> {
        let source = File::open(path)?;
        let permissions = source.metadata()?.permissions();
        let mut reader = BufReader::new(source);

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let temp = NamedTempFile::new_in(parent)?;
        let mut writer = BufWriter::new(temp);

        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                // temp file is removed on drop
                return Ok(AnnotateOutcome::NoDeclaration);
            }
            if line.starts_with(self.annotation.as_bytes()) {
                return Ok(AnnotateOutcome::AlreadyPresent);
            }
            if is_declaration(&line) {
                break;
            }
            writer.write_all(&line)?;
        }

        writer.write_all(self.annotation.as_bytes())?;
        writer.write_all(line_ending(&line))?;
        writer.write_all(&line)?;
        io::copy(&mut reader, &mut writer)?;

        let temp = writer.into_inner().map_err(|e| e.into_error())?;
        temp.as_file().sync_all()?;
        fs::set_permissions(temp.path(), permissions)?;
        temp.persist(path).map_err(|e| e.error)?;
        Ok(AnnotateOutcome::Inserted)
    }
}

fn is_declaration(line: &[u8]) -> bool {
    DECLARATION_MARKERS
        .iter()
        .any(|marker| line.starts_with(marker.as_bytes()))
}

fn line_ending(line: &[u8]) -> &'static [u8] {
    if line.ends_with(b"\r\n") {
        b"\r\n"
    } else {
        b"\n"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ORDER: &str = "package com.example;\n\nimport java.util.List;\n\n/**\n * Order.\n */\npublic class Order {\n    List<String> items;\n}\n";

    fn write_source(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_inserts_above_declaration() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_source(temp_dir.path(), "Order.java", ORDER);

        let outcome = AnnotationPass::new().annotate_file(&path).unwrap();
        assert_eq!(outcome, AnnotateOutcome::Inserted);

        let expected = ORDER.replace(
            "public class Order",
            "@java.lang.SuppressWarnings(\"all\")\npublic class Order",
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), expected);
    }

    #[test]
    fn test_second_run_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_source(temp_dir.path(), "Order.java", ORDER);
        let pass = AnnotationPass::new();

        pass.annotate_file(&path).unwrap();
        let first = fs::read(&path).unwrap();
        let outcome = pass.annotate_file(&path).unwrap();
        let second = fs::read(&path).unwrap();

        assert_eq!(outcome, AnnotateOutcome::AlreadyPresent);
        assert_eq!(first, second);
        let text = String::from_utf8(second).unwrap();
        assert_eq!(text.matches(SUPPRESS_WARNINGS).count(), 1);
    }

    #[test]
    fn test_abstract_class_and_crlf() {
        let temp_dir = TempDir::new().unwrap();
        let content = "package a;\r\n\r\npublic abstract class Base {\r\n}\r\n";
        let path = write_source(temp_dir.path(), "Base.java", content);

        AnnotationPass::new().annotate_file(&path).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "package a;\r\n\r\n@java.lang.SuppressWarnings(\"all\")\r\npublic abstract class Base {\r\n}\r\n"
        );
    }

    #[test]
    fn test_no_declaration_left_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let content = "@XmlSchema(namespace = \"urn:a\")\npackage a;\n";
        let path = write_source(temp_dir.path(), "package-info.java", content);

        let outcome = AnnotationPass::new().annotate_file(&path).unwrap();

        assert_eq!(outcome, AnnotateOutcome::NoDeclaration);
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
        // only the source file remains
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_indented_declaration_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let content = "class Outer {\n    public class Inner {}\n}\n";
        let path = write_source(temp_dir.path(), "Outer.java", content);

        let outcome = AnnotationPass::new().annotate_file(&path).unwrap();
        assert_eq!(outcome, AnnotateOutcome::NoDeclaration);
    }

    #[test]
    fn test_missing_file_is_post_processing_error() {
        let result = AnnotationPass::new().annotate_file(Path::new("/nonexistent/A.java"));
        assert!(matches!(result, Err(XjcError::PostProcessing { .. })));
    }

    #[tokio::test]
    async fn test_run_over_tree() {
        let temp_dir = TempDir::new().unwrap();
        let package = temp_dir.path().join("com/example");
        fs::create_dir_all(&package).unwrap();
        write_source(&package, "Order.java", ORDER);
        write_source(&package, "package-info.java", "package com.example;\n");
        write_source(temp_dir.path(), "notes.txt", "public class NotJava\n");

        let stats = AnnotationPass::new().run(temp_dir.path()).await.unwrap();

        assert_eq!(
            stats,
            AnnotationStats {
                files_scanned: 2,
                inserted: 1,
                already_present: 0,
                no_declaration: 1,
            }
        );
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("notes.txt")).unwrap(),
            "public class NotJava\n"
        );
    }
}
