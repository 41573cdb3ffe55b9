//! The XJC option bag.
//!
//! A [`Command`] captures every user-facing compiler switch together with the
//! resolved classpath and the schema/binding resources. It is fully populated
//! by the configuration layer and then only borrowed by the compiler.

use reqwest::Url;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::XjcError;

/// Insertion-ordered collection without duplicates; the first occurrence wins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedSet<T> {
    items: Vec<T>,
}

impl<T> OrderedSet<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T: PartialEq> OrderedSet<T> {
    /// Append `item` unless an equal item is already present.
    /// Returns whether the set changed.
    pub fn insert(&mut self, item: T) -> bool {
        if self.items.contains(&item) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }
}

impl<T> Default for OrderedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq> FromIterator<T> for OrderedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<T: PartialEq> Extend<T> for OrderedSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.insert(item);
        }
    }
}

impl<'a, T> IntoIterator for &'a OrderedSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Serialize> Serialize for OrderedSet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de> + PartialEq> Deserialize<'de> for OrderedSet<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<T>::deserialize(deserializer).map(Self::from_iter)
    }
}

/// Classpath entries; order decides lookup precedence
pub type ClassPath = OrderedSet<PathBuf>;

impl OrderedSet<PathBuf> {
    /// Absolute entries joined by the platform path separator
    pub fn joined(&self) -> String {
        let separator = if cfg!(windows) { ";" } else { ":" };
        self.items
            .iter()
            .map(|entry| absolute_display(entry))
            .collect::<Vec<_>>()
            .join(separator)
    }
}

/// Render `path` as an absolute path without requiring it to exist
pub fn absolute_display(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

/// Location of a schema or binding file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResourceLocator {
    Local(PathBuf),
    Remote(Url),
}

impl ResourceLocator {
    pub fn is_local(&self) -> bool {
        matches!(self, ResourceLocator::Local(_))
    }

    /// Logical name of the resource: the last path segment
    pub fn name(&self) -> String {
        let name = match self {
            ResourceLocator::Local(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            ResourceLocator::Remote(url) => url
                .path_segments()
                .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
                .map(str::to_string),
        };
        name.filter(|n| !n.is_empty())
            .unwrap_or_else(|| "resource".to_string())
    }
}

impl FromStr for ResourceLocator {
    type Err = XjcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(XjcError::UnsupportedResource {
                locator: s.to_string(),
                reason: "empty locator".to_string(),
            });
        }

        let Ok(url) = Url::parse(trimmed) else {
            return Ok(ResourceLocator::Local(PathBuf::from(trimmed)));
        };

        match url.scheme() {
            "http" | "https" => Ok(ResourceLocator::Remote(url)),
            "file" => url
                .to_file_path()
                .map(ResourceLocator::Local)
                .map_err(|_| XjcError::UnsupportedResource {
                    locator: trimmed.to_string(),
                    reason: "file URL does not denote a local path".to_string(),
                }),
            // Windows drive letters parse as single-letter schemes
            scheme if scheme.len() == 1 => Ok(ResourceLocator::Local(PathBuf::from(trimmed))),
            scheme => Err(XjcError::UnsupportedResource {
                locator: trimmed.to_string(),
                reason: format!("unsupported scheme '{}'", scheme),
            }),
        }
    }
}

impl TryFrom<String> for ResourceLocator {
    type Error = XjcError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResourceLocator> for String {
    fn from(locator: ResourceLocator) -> Self {
        locator.to_string()
    }
}

impl From<PathBuf> for ResourceLocator {
    fn from(path: PathBuf) -> Self {
        ResourceLocator::Local(path)
    }
}

impl From<Url> for ResourceLocator {
    fn from(url: Url) -> Self {
        ResourceLocator::Remote(url)
    }
}

impl fmt::Display for ResourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceLocator::Local(path) => write!(f, "{}", path.display()),
            ResourceLocator::Remote(url) => write!(f, "{}", url),
        }
    }
}

/// Content type of the sources handed to XJC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Dtd,
    Wsdl,
    XmlSchema,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Dtd => "dtd",
            SourceType::Wsdl => "wsdl",
            SourceType::XmlSchema => "xmlschema",
        }
    }

    /// The single XJC flag selecting this content type
    pub fn flag(&self) -> String {
        format!("-{}", self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = XjcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dtd" => Ok(SourceType::Dtd),
            "wsdl" => Ok(SourceType::Wsdl),
            "xmlschema" => Ok(SourceType::XmlSchema),
            other => Err(XjcError::Config(format!("Unknown sourceType: {}", other))),
        }
    }
}

/// JAXB version the generated code must not exceed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetVersion {
    #[serde(rename = "2.0")]
    V2_0,
    #[serde(rename = "2.1")]
    V2_1,
}

impl TargetVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetVersion::V2_0 => "2.0",
            TargetVersion::V2_1 => "2.1",
        }
    }
}

impl FromStr for TargetVersion {
    type Err = XjcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "2.0" => Ok(TargetVersion::V2_0),
            "2.1" => Ok(TargetVersion::V2_1),
            other => Err(XjcError::Config(format!(
                "Unknown target version: {} (expected 2.0 or 2.1)",
                other
            ))),
        }
    }
}

/// Every option understood by XJC, plus the resources to compile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Command {
    /// Activate the annotate plugin (`-Xannotate`)
    pub annotate: bool,
    pub debug: bool,
    /// Generated files will be in read-only mode
    pub read_only: bool,
    /// Suppress the file header with timestamp
    #[serde(alias = "no_generated_header_comments")]
    pub no_header: bool,
    pub explicit_annotation: bool,
    pub disable_xml_security: bool,
    /// Generate content property for types with multiple xs:any derived elements
    pub content_for_wildcard: bool,
    /// Resolve name conflicts by assigning mechanical numbers
    pub auto_name_resolution: bool,
    pub test_class_name_allocator: bool,
    /// File defining `proxyHost:proxyPort`
    pub http_proxy_file: Option<PathBuf>,
    /// `[user[:password]@]proxyHost:proxyPort`
    pub http_proxy: Option<String>,
    /// Mark generated code with `@Generated`
    pub add_generated_annotation: bool,
    /// Catalog used to resolve external entity references
    pub catalog: Option<PathBuf>,
    /// Correct Boolean getters/setters for bean introspection
    pub enable_introspection: bool,
    pub encoding: Option<String>,
    /// Allow vendor extensions beyond the strict JAXB rules
    pub extension: bool,
    /// Write `META-INF/sun-jaxb.episode` under the destination directory
    pub generate_episode: bool,
    /// Less strict schema validation (`-nv`)
    pub lax_schema_validation: bool,
    /// Suppress package level annotations (`-npa`)
    pub no_package_level_annotations: bool,
    pub dest_dir: Option<PathBuf>,
    pub package_name: Option<String>,
    pub quiet: bool,
    pub verbose: bool,
    pub source_type: Option<SourceType>,
    pub target_version: Option<TargetVersion>,
    /// Insert `@SuppressWarnings("all")` into generated classes after a successful run
    pub suppress_warnings: bool,
    pub schemas: OrderedSet<ResourceLocator>,
    pub bindings: OrderedSet<ResourceLocator>,
    pub classpath: ClassPath,
}

impl Default for Command {
    fn default() -> Self {
        Self {
            annotate: true,
            debug: false,
            read_only: false,
            no_header: false,
            explicit_annotation: false,
            disable_xml_security: false,
            content_for_wildcard: false,
            auto_name_resolution: false,
            test_class_name_allocator: false,
            http_proxy_file: None,
            http_proxy: None,
            add_generated_annotation: false,
            catalog: None,
            enable_introspection: true,
            encoding: None,
            extension: false,
            generate_episode: false,
            lax_schema_validation: false,
            no_package_level_annotations: false,
            dest_dir: None,
            package_name: None,
            quiet: false,
            verbose: false,
            source_type: None,
            target_version: None,
            suppress_warnings: true,
            schemas: OrderedSet::new(),
            bindings: OrderedSet::new(),
            classpath: ClassPath::new(),
        }
    }
}

impl Command {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, schema: impl Into<ResourceLocator>) -> Self {
        self.schemas.insert(schema.into());
        self
    }

    pub fn with_binding(mut self, binding: impl Into<ResourceLocator>) -> Self {
        self.bindings.insert(binding.into());
        self
    }

    pub fn with_dest_dir(mut self, dest_dir: impl Into<PathBuf>) -> Self {
        self.dest_dir = Some(dest_dir.into());
        self
    }

    pub fn add_classpath<I, P>(&mut self, entries: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.classpath.extend(entries.into_iter().map(Into::into));
    }

    pub fn has_schemas(&self) -> bool {
        !self.schemas.is_empty()
    }
}
