//! Resolution of schema and binding locators to local paths.
//!
//! XJC only accepts local paths, so every remote resource is copied into a
//! temporary file owned by a [`TempFileSet`]. The set deletes its files when
//! dropped, which covers success, failure and early returns alike.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Url;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::command::{Command, ResourceLocator, absolute_display};
use crate::error::{Result, XjcError};
use crate::http_client::ResourceFetcher;

/// Byte-level rewrite applied to schemas before they reach XJC,
/// e.g. downgrading an XSD 1.1 document to XSD 1.0.
pub trait SchemaTransform: Send + Sync {
    fn transform(&self, name: &str, source: Vec<u8>) -> Result<Vec<u8>>;
}

/// Temporary files created by one materialization
#[derive(Debug, Default)]
pub struct TempFileSet {
    paths: Vec<TempPath>,
}

impl TempFileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(|path| &**path)
    }

    fn track(&mut self, path: TempPath) -> PathBuf {
        let owned = path.to_path_buf();
        self.paths.push(path);
        owned
    }

    /// Delete every file now. Returns how many were removed together with
    /// the first failure; files that fail to delete are not retried.
    pub fn cleanup(self) -> (usize, io::Result<()>) {
        let mut removed = 0;
        let mut first_error = None;
        for path in self.paths {
            let shown = path.display().to_string();
            match path.close() {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => removed += 1,
                Err(e) => {
                    warn!(path = %shown, error = %e, "failed to delete temporary file");
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => (removed, Err(e)),
            None => (removed, Ok(())),
        }
    }
}

/// Local paths for every schema and binding file of a command
#[derive(Debug)]
pub struct MaterializedResources {
    schemas: Vec<PathBuf>,
    bindings: Vec<PathBuf>,
    temp_files: TempFileSet,
}

impl MaterializedResources {
    pub fn schemas(&self) -> &[PathBuf] {
        &self.schemas
    }

    pub fn bindings(&self) -> &[PathBuf] {
        &self.bindings
    }

    pub fn temp_files(&self) -> &TempFileSet {
        &self.temp_files
    }

    /// Delete the temporary files; see [`TempFileSet::cleanup`]
    pub fn cleanup(self) -> (usize, io::Result<()>) {
        self.temp_files.cleanup()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResourceKind {
    Schema,
    Binding,
}

/// Resolves locators to local paths, downloading remote resources
pub struct ResourceMaterializer {
    fetcher: ResourceFetcher,
    temp_dir: Option<PathBuf>,
    transform: Option<Arc<dyn SchemaTransform>>,
}

impl ResourceMaterializer {
    pub fn new(fetcher: ResourceFetcher) -> Self {
        Self {
            fetcher,
            temp_dir: None,
            transform: None,
        }
    }

    /// Create temporary files in `dir` instead of the system temp directory
    pub fn with_temp_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.temp_dir = dir;
        self
    }

    /// Pass every schema through `transform`. Binding files are left as is.
    pub fn with_transform(mut self, transform: Arc<dyn SchemaTransform>) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn temp_dir(&self) -> Option<&Path> {
        self.temp_dir.as_deref()
    }

    /// Resolve all schemas, then all bindings, in collection order.
    ///
    /// On error the temporary files created so far are deleted before the
    /// error is returned.
    pub async fn materialize(&self, command: &Command) -> Result<MaterializedResources> {
        let mut temp_files = TempFileSet::new();

        let mut schemas = Vec::with_capacity(command.schemas.len());
        for schema in &command.schemas {
            let path = self
                .materialize_one(schema, ResourceKind::Schema, &mut temp_files)
                .await?;
            schemas.push(path);
        }

        let mut bindings = Vec::with_capacity(command.bindings.len());
        for binding in &command.bindings {
            let path = self
                .materialize_one(binding, ResourceKind::Binding, &mut temp_files)
                .await?;
            bindings.push(path);
        }

        debug!(
            schemas = schemas.len(),
            bindings = bindings.len(),
            temp_files = temp_files.len(),
            "materialized resources"
        );

        Ok(MaterializedResources {
            schemas,
            bindings,
            temp_files,
        })
    }

    async fn materialize_one(
        &self,
        locator: &ResourceLocator,
        kind: ResourceKind,
        temp_files: &mut TempFileSet,
    ) -> Result<PathBuf> {
        let transform = match kind {
            ResourceKind::Schema => self.transform.as_ref(),
            ResourceKind::Binding => None,
        };

        match (locator, transform) {
            (ResourceLocator::Local(path), None) => {
                check_exists(path).await?;
                Ok(path.clone())
            }
            (ResourceLocator::Local(path), Some(transform)) => {
                check_exists(path).await?;
                let source = tokio::fs::read(path).await?;
                let bytes = transform.transform(&locator.name(), source)?;
                self.write_temp(&locator.name(), &bytes, temp_files).await
            }
            (ResourceLocator::Remote(url), None) => {
                self.download_temp(url, &locator.name(), temp_files).await
            }
            (ResourceLocator::Remote(url), Some(transform)) => {
                let source = self.fetcher.fetch(url).await?;
                let bytes = transform.transform(&locator.name(), source)?;
                self.write_temp(&locator.name(), &bytes, temp_files).await
            }
        }
    }

    async fn download_temp(
        &self,
        url: &Url,
        name: &str,
        temp_files: &mut TempFileSet,
    ) -> Result<PathBuf> {
        let (mut file, path) = self.create_temp(name, temp_files)?;
        self.fetcher.fetch_to(url, &mut file).await?;
        debug!(url = %url, path = %path.display(), "downloaded remote resource");
        Ok(path)
    }

    async fn write_temp(
        &self,
        name: &str,
        bytes: &[u8],
        temp_files: &mut TempFileSet,
    ) -> Result<PathBuf> {
        let (mut file, path) = self.create_temp(name, temp_files)?;
        file.write_all(bytes).await?;
        file.flush().await?;
        Ok(path)
    }

    /// Create an empty temp file named after the resource and track it
    fn create_temp(
        &self,
        name: &str,
        temp_files: &mut TempFileSet,
    ) -> Result<(tokio::fs::File, PathBuf)> {
        let logical = Path::new(name);
        let stem = logical
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "resource".to_string());
        let suffix = logical
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let prefix = format!("{}-", stem);

        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix).suffix(&suffix);
        let named = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        let (file, temp_path) = named.into_parts();
        let path = temp_files.track(temp_path);
        Ok((tokio::fs::File::from_std(file), path))
    }
}

async fn check_exists(path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(XjcError::ResourceNotFound {
            path: PathBuf::from(absolute_display(path)),
        }),
        Err(e) => Err(XjcError::Io(e)),
    }
}
