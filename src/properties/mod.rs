//! Bootstrap properties and the configuration sources they come from.
//!
//! - `Properties`: an ordered string map
//! - `PropertyLoader` / `PropertyFile`: where the bootstrap set is read from
//! - `ConfigSource` / `EnvSource`: process-wide overrides, injected so
//!   lookups can be tested without touching the real environment

pub mod parser;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

pub use parser::{parse_properties, parse_properties_file};

/// Environment variable naming the bootstrap properties file.
pub const CONFIG_PATH_KEY: &str = "CONFIG";

/// Bootstrap file used when no location is configured.
pub const DEFAULT_CONFIG_PATH: &str = "conf/vault.properties";

/// An ordered map of property names to raw values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overlay `other` on top of `self`; keys in `other` win.
    pub fn extend(&mut self, other: &Properties) {
        for (k, v) in other.iter() {
            self.insert(k, v);
        }
    }
}

impl FromIterator<(String, String)> for Properties {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Properties {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

/// Supplies the bootstrap property set.
///
/// `None` means "nothing to bootstrap from"; it is not an error.
pub trait PropertyLoader: Send + Sync {
    fn load(&self) -> Option<Properties>;
}

/// Loads bootstrap properties from a `.properties` file on disk.
#[derive(Debug, Clone)]
pub struct PropertyFile {
    path: PathBuf,
}

impl PropertyFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Locate the bootstrap file: the `CONFIG` override from `source`,
    /// else [`DEFAULT_CONFIG_PATH`].
    pub fn locate(source: &dyn ConfigSource) -> Self {
        let path = source
            .get(CONFIG_PATH_KEY)
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PropertyLoader for PropertyFile {
    fn load(&self) -> Option<Properties> {
        match parse_properties_file(&self.path) {
            Ok(props) => {
                debug!(path = %self.path.display(), count = props.len(), "bootstrap properties loaded");
                Some(props)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot read bootstrap properties");
                None
            }
        }
    }
}

impl PropertyLoader for Properties {
    fn load(&self) -> Option<Properties> {
        Some(self.clone())
    }
}

// ---------------------------------------------------------------------------
// Override sources
// ---------------------------------------------------------------------------

/// A read-only source of named override values.
pub trait ConfigSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads overrides from environment variables named `<prefix><key>`.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
}

impl EnvSource {
    /// Default variable prefix, e.g. `PROPVAULT_ENCRYPTION_PASSWORD`.
    pub const DEFAULT_PREFIX: &'static str = "PROPVAULT_";

    pub fn new() -> Self {
        Self::with_prefix(Self::DEFAULT_PREFIX)
    }

    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(format!("{}{key}", self.prefix))
            .ok()
            .filter(|v| !v.is_empty())
    }
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl ConfigSource for Properties {
    fn get(&self, key: &str) -> Option<String> {
        Properties::get(self, key).map(str::to_string)
    }
}
