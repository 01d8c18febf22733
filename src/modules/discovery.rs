//! Module discovery.
//!
//! Walks module directories looking for module roots: directories holding
//! the marker entry (`MOD-INF`). A module root is not descended into.
//! Modules whose resolved name fully matches an ignore pattern are skipped.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use walkdir::WalkDir;

use crate::error::{WiringError, WiringResult};
use crate::modules::ModuleDescriptor;

#[derive(Debug)]
pub struct Discovery {
    marker: String,
    ignores: Vec<Regex>,
}

impl Discovery {
    /// Compile the ignore list. Blank patterns are dropped.
    pub fn new(marker: impl Into<String>, ignore_patterns: &[String]) -> WiringResult<Self> {
        let ignores = ignore_patterns
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(|pattern| {
                Regex::new(&format!("^(?:{pattern})$")).map_err(|source| WiringError::InvalidIgnorePattern {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .collect::<WiringResult<Vec<_>>>()?;

        Ok(Self {
            marker: marker.into(),
            ignores,
        })
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignores.iter().any(|re| re.is_match(name))
    }

    /// Scan `root`, adding every module found to `found`.
    ///
    /// A name found twice keeps the last descriptor discovered. Unreadable
    /// directories and descriptors are logged and skipped.
    pub fn scan(&self, root: &Path, found: &mut BTreeMap<String, ModuleDescriptor>) {
        tracing::debug!(path = %root.display(), "Looking for modules");
        if !root.is_dir() {
            tracing::warn!(path = %root.display(), "Module path is not a directory");
            return;
        }

        let mut entries = WalkDir::new(root).follow_links(true).sort_by_file_name().into_iter();
        while let Some(entry) = entries.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }

            let dir = entry.path();
            if !dir.join(&self.marker).exists() {
                continue;
            }
            entries.skip_current_dir();

            let descriptor = match ModuleDescriptor::load(dir, &self.marker) {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    tracing::error!(path = %dir.display(), error = %e, "Error loading module descriptor");
                    continue;
                }
            };

            let name = descriptor.name().to_string();
            if self.is_ignored(&name) {
                tracing::debug!(module = %name, "Module ignored");
                continue;
            }

            if let Some(previous) = found.insert(name.clone(), descriptor) {
                tracing::warn!(
                    module = %name,
                    replaced = %previous.path().display(),
                    path = %dir.display(),
                    "Module name discovered twice, last one wins"
                );
            } else {
                tracing::debug!(module = %name, path = %dir.display(), "Module found");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn module(root: &Path, rel: &str, descriptor: &str) {
        let dir = root.join(rel).join("MOD-INF");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("module.properties"), descriptor).unwrap();
    }

    #[test]
    fn test_finds_nested_modules() {
        let dir = tempfile::tempdir().unwrap();
        module(dir.path(), "a", "");
        module(dir.path(), "group/b", "");
        module(dir.path(), "group/c", "name = renamed\n");
        // Inside a module root: not a separate module.
        module(dir.path(), "a/inner", "");
        fs::create_dir_all(dir.path().join("plain/dir")).unwrap();

        let mut found = BTreeMap::new();
        Discovery::new("MOD-INF", &[]).unwrap().scan(dir.path(), &mut found);
        assert_eq!(found.keys().collect::<Vec<_>>(), vec!["a", "b", "renamed"]);
    }

    #[test]
    fn test_ignore_patterns_match_whole_name() {
        let dir = tempfile::tempdir().unwrap();
        module(dir.path(), "tests", "");
        module(dir.path(), "test-utils", "");
        module(dir.path(), "contest", "");

        let discovery = Discovery::new("MOD-INF", &["test.*".into(), "".into()]).unwrap();
        let mut found = BTreeMap::new();
        discovery.scan(dir.path(), &mut found);
        assert_eq!(found.keys().collect::<Vec<_>>(), vec!["contest"]);
    }

    #[test]
    fn test_duplicate_name_last_wins() {
        let dir = tempfile::tempdir().unwrap();
        module(dir.path(), "one/x", "marker = first\n");
        module(dir.path(), "two/x", "marker = second\n");

        let mut found = BTreeMap::new();
        Discovery::new("MOD-INF", &[]).unwrap().scan(dir.path(), &mut found);
        assert_eq!(found.len(), 1);
        assert_eq!(found["x"].properties().get("marker"), Some("second"));
    }

    #[test]
    fn test_invalid_ignore_pattern() {
        let err = Discovery::new("MOD-INF", &["(".into()]).unwrap_err();
        assert!(matches!(err, WiringError::InvalidIgnorePattern { .. }));
    }

    #[test]
    fn test_missing_root_is_empty() {
        let mut found = BTreeMap::new();
        Discovery::new("MOD-INF", &[]).unwrap().scan(Path::new("/definitely/not/here"), &mut found);
        assert!(found.is_empty());
    }
}
