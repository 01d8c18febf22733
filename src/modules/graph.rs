//! Module graph: an arena of module records keyed by name.
//!
//! The `extends` relation and its `extended_by` back-references are name
//! keys into the arena, never owning pointers. The graph is built once by
//! the wiring pass and read-only afterwards.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::Properties;
use crate::routing::MountPoint;

/// A wired module.
#[derive(Debug, Clone)]
pub struct Module {
    pub(crate) name: String,
    pub(crate) path: PathBuf,
    pub(crate) mount_point: Option<MountPoint>,
    pub(crate) extends: Option<String>,
    pub(crate) extended_by: BTreeSet<String>,
    pub(crate) implements: BTreeSet<String>,
    /// Interface name → module name.
    pub(crate) dependencies: BTreeMap<String, String>,
    /// Descriptor properties merged along the extension chain.
    pub(crate) properties: Properties,
}

impl Module {
    pub(crate) fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            mount_point: None,
            extends: None,
            extended_by: BTreeSet::new(),
            implements: BTreeSet::new(),
            dependencies: BTreeMap::new(),
            properties: Properties::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mount_point(&self) -> Option<&MountPoint> {
        self.mount_point.as_ref()
    }

    pub fn extends(&self) -> Option<&str> {
        self.extends.as_deref()
    }

    pub fn extended_by(&self) -> impl Iterator<Item = &str> {
        self.extended_by.iter().map(String::as_str)
    }

    pub fn implements(&self) -> impl Iterator<Item = &str> {
        self.implements.iter().map(String::as_str)
    }

    pub fn dependencies(&self) -> &BTreeMap<String, String> {
        &self.dependencies
    }

    pub fn dependency(&self, interface: &str) -> Option<&str> {
        self.dependencies.get(interface).map(String::as_str)
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// `path` relative to this module's mount path.
    pub fn relative_path<'a>(&self, path: &'a str) -> &'a str {
        match &self.mount_point {
            Some(mp) => path.strip_prefix(mp.path()).unwrap_or(path),
            None => path,
        }
    }
}

/// Serializable one-line view of a module, for `--check` output.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleSummary {
    pub name: String,
    pub path: PathBuf,
    pub mount_point: Option<MountPoint>,
    pub extends: Option<String>,
    pub implements: Vec<String>,
    pub dependencies: BTreeMap<String, String>,
}

impl From<&Module> for ModuleSummary {
    fn from(m: &Module) -> Self {
        Self {
            name: m.name.clone(),
            path: m.path.clone(),
            mount_point: m.mount_point.clone(),
            extends: m.extends.clone(),
            implements: m.implements.iter().cloned().collect(),
            dependencies: m.dependencies.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ModuleGraph {
    modules: BTreeMap<String, Module>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Module> {
        self.modules.get_mut(name)
    }

    pub(crate) fn insert(&mut self, module: Module) {
        self.modules.insert(module.name.clone(), module);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// `name` followed by each module it extends, closest first.
    pub fn extension_chain<'a>(&'a self, name: &str) -> ExtensionChain<'a> {
        ExtensionChain {
            graph: self,
            next: self.get(name),
            remaining: self.modules.len(),
        }
    }

    /// Module visible as `name` from module `from`: a dependency of `from` or
    /// of a module it extends, else the module globally named `name`.
    pub fn resolve(&self, from: &str, name: &str) -> Option<&Module> {
        let wired = self
            .extension_chain(from)
            .find_map(|m| m.dependency(name))
            .and_then(|target| self.get(target));
        let module = wired.or_else(|| self.get(name));
        tracing::trace!(from = %from, name = %name, found = ?module.map(Module::name), "Module lookup");
        module
    }

    /// Module names ordered so that dependencies come before their dependents.
    ///
    /// Dependency cycles cannot be ordered; they are logged and broken at the
    /// point of detection.
    pub fn init_order(&self) -> Vec<&str> {
        let mut ordered = Vec::with_capacity(self.modules.len());
        let mut done = HashSet::new();
        let mut in_progress = HashSet::new();
        for name in self.modules.keys() {
            self.visit(name, &mut done, &mut in_progress, &mut ordered);
        }
        ordered
    }

    fn visit<'a>(
        &'a self,
        name: &'a str,
        done: &mut HashSet<&'a str>,
        in_progress: &mut HashSet<&'a str>,
        ordered: &mut Vec<&'a str>,
    ) {
        let Some(module) = self.modules.get(name) else { return };
        if done.contains(name) {
            return;
        }
        if !in_progress.insert(name) {
            tracing::warn!(module = %name, "Circular dependencies detected");
            return;
        }
        for dependency in module.dependencies.values() {
            self.visit(dependency, done, in_progress, ordered);
        }
        in_progress.remove(name);
        done.insert(module.name.as_str());
        ordered.push(module.name.as_str());
    }
}

/// Iterator over a module and its ancestors.
pub struct ExtensionChain<'a> {
    graph: &'a ModuleGraph,
    next: Option<&'a Module>,
    /// Bounds the walk even on a malformed graph.
    remaining: usize,
}

impl<'a> Iterator for ExtensionChain<'a> {
    type Item = &'a Module;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let current = self.next?;
        self.next = current.extends.as_deref().and_then(|p| self.graph.get(p));
        Some(current)
    }
}
