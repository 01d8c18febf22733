//! Module descriptors.
//!
//! A descriptor is the configuration-time view of a module: its name, its
//! directory, and the key/value properties read from
//! `<module>/<marker>/module.properties`. Recognized keys are `name`,
//! `extends`, `implements` and `requires`; everything else is carried along
//! for the module's own use.

use std::path::{Path, PathBuf};

use crate::config::Properties;
use crate::error::{WiringError, WiringResult};

/// Synthetic key holding the module's directory.
pub const PATH_KEY: &str = "__path__";

pub const NAME_KEY: &str = "name";
pub const EXTENDS_KEY: &str = "extends";
pub const IMPLEMENTS_KEY: &str = "implements";
pub const REQUIRES_KEY: &str = "requires";

/// File inside the marker directory holding the descriptor.
pub const DESCRIPTOR_FILE: &str = "module.properties";

/// Keys whose values accumulate along an extension chain instead of being
/// overridden by the descendant.
const ACCUMULATED_KEYS: &[&str] = &[IMPLEMENTS_KEY, REQUIRES_KEY];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    name: String,
    path: PathBuf,
    properties: Properties,
}

impl ModuleDescriptor {
    /// Build a descriptor; `name` is overridden by a `name` property.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, mut properties: Properties) -> Self {
        let path = path.into();
        let name = properties
            .get(NAME_KEY)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| name.into());
        properties.set(PATH_KEY, path.to_string_lossy());
        Self {
            name,
            path,
            properties,
        }
    }

    /// Load the descriptor of the module rooted at `dir`. A module without a
    /// descriptor file gets empty properties and is named after its directory.
    pub fn load(dir: &Path, marker: &str) -> WiringResult<Self> {
        let file = dir.join(marker).join(DESCRIPTOR_FILE);
        let properties = if file.is_file() {
            Properties::load(&file).map_err(|source| WiringError::Io { path: file, source })?
        } else {
            Properties::new()
        };

        let dir_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let path = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());
        Ok(Self::new(dir_name, path, properties))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Name of the extended (parent) module.
    pub fn extends(&self) -> Option<&str> {
        self.properties
            .get(EXTENDS_KEY)
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    pub fn implements(&self) -> Vec<String> {
        self.properties.get_list(IMPLEMENTS_KEY)
    }

    pub fn requires(&self) -> Vec<String> {
        self.properties.get_list(REQUIRES_KEY)
    }
}

/// Merge `ancestor` underneath `child`.
///
/// Child values win on conflicting keys; keys only the ancestor sets are
/// inherited. `implements` and `requires` are unions, child entries first.
pub fn merge(child: &Properties, ancestor: &Properties) -> Properties {
    let mut merged = child.clone();
    for key in ancestor.keys() {
        if ACCUMULATED_KEYS.contains(&key) {
            let mut values = child.get_list(key);
            for value in ancestor.get_list(key) {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
            merged.set_all(key, values);
        } else if !child.contains_key(key) {
            merged.set_all(key, ancestor.get_all(key).to_vec());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_override() {
        let d = ModuleDescriptor::new("dir", "/m/dir", Properties::parse("name = renamed\n"));
        assert_eq!(d.name(), "renamed");
        assert_eq!(d.properties().get(PATH_KEY), Some("/m/dir"));

        let d = ModuleDescriptor::new("dir", "/m/dir", Properties::new());
        assert_eq!(d.name(), "dir");
        assert_eq!(d.extends(), None);
    }

    #[test]
    fn test_recognized_keys() {
        let d = ModuleDescriptor::new(
            "m",
            "/m",
            Properties::parse("extends = base\nimplements = skin, layout\nrequires = db\n"),
        );
        assert_eq!(d.extends(), Some("base"));
        assert_eq!(d.implements(), vec!["skin", "layout"]);
        assert_eq!(d.requires(), vec!["db"]);
    }

    #[test]
    fn test_merge_child_wins() {
        let child = Properties::parse("title = child\nrequires = a\n");
        let ancestor = Properties::parse("title = parent\ncolor = blue\nrequires = b, a\nimplements = x\n");
        let merged = merge(&child, &ancestor);

        assert_eq!(merged.get("title"), Some("child"));
        assert_eq!(merged.get("color"), Some("blue"));
        assert_eq!(merged.get_list("requires"), vec!["a", "b"]);
        assert_eq!(merged.get_list("implements"), vec!["x"]);
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let module = dir.path().join("examples");
        std::fs::create_dir_all(module.join("MOD-INF")).unwrap();
        std::fs::write(module.join("MOD-INF").join(DESCRIPTOR_FILE), "implements = samples\n").unwrap();

        let d = ModuleDescriptor::load(&module, "MOD-INF").unwrap();
        assert_eq!(d.name(), "examples");
        assert_eq!(d.path(), module.as_path());
        assert_eq!(d.implements(), vec!["samples"]);
    }
}
