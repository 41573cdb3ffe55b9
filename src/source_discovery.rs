use crate::error::{Result, XjcError};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

/// Generated sources carry exactly this extension
const SOURCE_EXTENSION: &str = "java";

/// Async discovery of generated source files below a destination directory.
/// Symbolic links are never followed.
#[derive(Debug, Clone, Default)]
pub struct SourceDiscovery;

/// Files found by one discovery run
#[derive(Debug, Default, Clone)]
pub struct DiscoveredSources {
    pub files: Vec<PathBuf>,
    /// Entries that could not be read and were skipped
    pub errors: usize,
}

impl SourceDiscovery {
    pub fn new() -> Self {
        Self
    }

    /// Discover matching files under `root`, sorted by path.
    ///
    /// A missing or unreadable root is an error; unreadable entries below it
    /// are logged and counted instead.
    pub async fn discover(&self, root: &Path) -> Result<DiscoveredSources> {
        let metadata = fs::metadata(root).await.map_err(XjcError::from)?;

        let mut found = DiscoveredSources::default();
        if metadata.is_file() {
            if self.should_process(root) {
                found.files.push(root.to_path_buf());
            }
            return Ok(found);
        }

        let mut read_dir = fs::read_dir(root).await.map_err(XjcError::from)?;
        while let Some(entry) = read_dir.next_entry().await.map_err(XjcError::from)? {
            let entry_path = entry.path();
            if entry_path.is_symlink() {
                continue;
            }
            if let Err(e) = self.discover_recursive(&entry_path, &mut found).await {
                warn!(path = %entry_path.display(), error = %e, "skipping unreadable entry");
                found.errors += 1;
            }
        }

        found.files.sort();
        Ok(found)
    }

    fn discover_recursive<'a>(
        &'a self,
        path: &'a Path,
        found: &'a mut DiscoveredSources,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let metadata = fs::metadata(path).await.map_err(XjcError::from)?;

            if metadata.is_file() {
                if self.should_process(path) {
                    found.files.push(path.to_path_buf());
                }
            } else if metadata.is_dir() {
                let mut read_dir = fs::read_dir(path).await.map_err(XjcError::from)?;
                while let Some(entry) = read_dir.next_entry().await.map_err(XjcError::from)? {
                    let entry_path = entry.path();
                    if entry_path.is_symlink() {
                        continue;
                    }
                    if let Err(e) = self.discover_recursive(&entry_path, found).await {
                        warn!(path = %entry_path.display(), error = %e, "skipping unreadable entry");
                        found.errors += 1;
                    }
                }
            }

            Ok(())
        })
    }

    /// Whether `path` ends in `.java`, compared case-sensitively
    pub fn should_process(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == SOURCE_EXTENSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    async fn create_generated_tree() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("com/example/model")).await.unwrap();
        fs::create_dir_all(root.join("META-INF")).await.unwrap();

        fs::write(root.join("com/example/model/Order.java"), "public class Order {}")
            .await
            .unwrap();
        fs::write(root.join("com/example/model/Item.java"), "public class Item {}")
            .await
            .unwrap();
        fs::write(root.join("com/example/package-info.java"), "package com.example;")
            .await
            .unwrap();
        fs::write(root.join("META-INF/sun-jaxb.episode"), "<bindings/>")
            .await
            .unwrap();

        temp_dir
    }

    fn names(found: &DiscoveredSources) -> HashSet<String> {
        found
            .files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_discover_java_sources() {
        let temp_dir = create_generated_tree().await;
        let found = SourceDiscovery::new().discover(temp_dir.path()).await.unwrap();

        assert_eq!(found.files.len(), 3);
        assert_eq!(found.errors, 0);
        let names = names(&found);
        assert!(names.contains("Order.java"));
        assert!(names.contains("package-info.java"));
        assert!(!names.contains("sun-jaxb.episode"));
    }

    #[tokio::test]
    async fn test_results_are_sorted() {
        let temp_dir = create_generated_tree().await;
        let found = SourceDiscovery::new().discover(temp_dir.path()).await.unwrap();

        let mut sorted = found.files.clone();
        sorted.sort();
        assert_eq!(found.files, sorted);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinks_are_not_followed() {
        let temp_dir = create_generated_tree().await;
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("Stray.java"), "public class Stray {}")
            .await
            .unwrap();
        std::os::unix::fs::symlink(outside.path(), temp_dir.path().join("linked")).unwrap();

        let found = SourceDiscovery::new().discover(temp_dir.path()).await.unwrap();

        assert!(!names(&found).contains("Stray.java"));
        assert_eq!(found.files.len(), 3);
    }

    #[tokio::test]
    async fn test_should_process() {
        let discovery = SourceDiscovery::new();
        assert!(discovery.should_process(Path::new("Order.java")));
        assert!(!discovery.should_process(Path::new("Order.JAVA")));
        assert!(!discovery.should_process(Path::new("Order.Java")));
        assert!(!discovery.should_process(Path::new("Order.class")));
        assert!(!discovery.should_process(Path::new("README")));
    }

    #[tokio::test]
    async fn test_nonexistent_directory() {
        let result = SourceDiscovery::new()
            .discover(Path::new("/nonexistent/generated"))
            .await;
        assert!(matches!(result, Err(XjcError::Io(_))));
    }
}
