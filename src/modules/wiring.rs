//! Module wiring.
//!
//! Turns discovered descriptors plus the wiring file into an immutable
//! [`Application`]: the module graph, the mount registry and the interface
//! index. Phases run in a fixed order:
//!
//! ```text
//! instantiate (extends chains, parents first)
//!     → mount (wiring entry or <default_mount_point>/<name>)
//!     → merge properties down each chain, index interfaces
//!     → inject `requires` dependencies
//!     → resolve the root module
//! ```
//!
//! Any failure aborts the whole pass; nothing partially wired is ever
//! published.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::Properties;
use crate::error::{WiringError, WiringResult};
use crate::modules::descriptor::{self, ModuleDescriptor};
use crate::modules::graph::{Module, ModuleGraph, ModuleSummary};
use crate::routing::{MountPoint, Mounter, Zone};

/// Name of the module serving `/` when nothing is mounted there.
pub const MAIN_MODULE: &str = "main";

/// A fully wired set of modules. Read-only once built.
#[derive(Debug)]
pub struct Application {
    graph: ModuleGraph,
    mounter: Mounter,
    /// Interface → names of the modules implementing it.
    interfaces: BTreeMap<String, BTreeSet<String>>,
    root: String,
}

impl Application {
    pub fn graph(&self) -> &ModuleGraph {
        &self.graph
    }

    pub fn mounter(&self) -> &Mounter {
        &self.mounter
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.graph.get(name)
    }

    pub fn root_module(&self) -> Option<&Module> {
        self.graph.get(&self.root)
    }

    pub fn implementors(&self, interface: &str) -> impl Iterator<Item = &str> {
        self.interfaces
            .get(interface)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Module owning `path` in `zone`, falling back to the root module.
    pub fn module_for(&self, path: &str, zone: Option<&Zone>) -> Option<&Module> {
        self.mounter
            .get_module(path, zone)
            .and_then(|name| self.graph.get(name))
            .or_else(|| self.root_module())
    }

    /// Modules in initialization order, as serializable summaries.
    pub fn describe(&self) -> Vec<ModuleSummary> {
        self.graph
            .init_order()
            .into_iter()
            .filter_map(|name| self.graph.get(name))
            .map(ModuleSummary::from)
            .collect()
    }
}

/// Builds an [`Application`] from discovered descriptors.
pub struct ModuleGraphBuilder {
    descriptors: BTreeMap<String, ModuleDescriptor>,
    wirings: Properties,
    default_mount_point: String,
    mounter: Mounter,
    graph: ModuleGraph,
}

impl ModuleGraphBuilder {
    /// `mounter` carries the zones already registered for this pass.
    pub fn new(
        descriptors: BTreeMap<String, ModuleDescriptor>,
        wirings: Properties,
        default_mount_point: impl Into<String>,
        mounter: Mounter,
    ) -> Self {
        Self {
            descriptors,
            wirings,
            default_mount_point: default_mount_point.into(),
            mounter,
            graph: ModuleGraph::new(),
        }
    }

    pub fn build(mut self) -> WiringResult<Application> {
        let names: Vec<String> = self.descriptors.keys().cloned().collect();

        for name in &names {
            self.instantiate(name)?;
        }
        for name in &names {
            self.mount(name)?;
        }
        let interfaces = self.merge_properties(&names);
        for name in &names {
            self.inject(name, &interfaces)?;
        }
        let root = self.resolve_root()?;

        tracing::info!(modules = self.graph.len(), root = %root, "Modules wired");
        Ok(Application {
            graph: self.graph,
            mounter: self.mounter,
            interfaces,
            root,
        })
    }

    /// Create `name` and every module it extends, ancestors first.
    fn instantiate(&mut self, name: &str) -> WiringResult<()> {
        let mut pending = Vec::new();
        let mut current = name.to_string();

        while !self.graph.contains(&current) {
            if let Some(start) = pending.iter().position(|p| *p == current) {
                let mut cycle: Vec<String> = pending[start..].to_vec();
                cycle.push(current);
                return Err(WiringError::ExtensionCycle(cycle));
            }

            let descriptor = &self.descriptors[&current];
            let parent = descriptor.extends().map(str::to_string);
            pending.push(current.clone());

            match parent {
                Some(parent) if !self.descriptors.contains_key(&parent) => {
                    return Err(WiringError::UndefinedParent { module: current, parent });
                }
                Some(parent) => current = parent,
                None => break,
            }
        }

        for module_name in pending.into_iter().rev() {
            let descriptor = &self.descriptors[&module_name];
            let mut module = Module::new(module_name.as_str(), descriptor.path());
            module.extends = descriptor.extends().map(str::to_string);

            if let Some(parent) = module.extends.as_deref().and_then(|p| self.graph.get_mut(p)) {
                parent.extended_by.insert(module_name.clone());
            }
            tracing::trace!(module = %module_name, extends = ?module.extends, "Module created");
            self.graph.insert(module);
        }
        Ok(())
    }

    fn mount(&mut self, name: &str) -> WiringResult<()> {
        let spec = match self.wirings.get(name) {
            Some(spec) => spec.to_string(),
            None => {
                let generated = format!("{}/{}", self.default_mount_point.trim_end_matches('/'), name);
                tracing::info!(module = %name, mount_point = %generated, "No mount point defined, using default");
                generated
            }
        };

        let mount_point = MountPoint::parse(&spec);
        self.mounter.register(mount_point.clone(), name)?;
        tracing::debug!(module = %name, mount_point = %mount_point, "Module mounted");

        if let Some(module) = self.graph.get_mut(name) {
            module.mount_point = Some(mount_point);
        }
        Ok(())
    }

    /// Merge each module's descriptor with its ancestors' and build the
    /// interface index from the merged `implements` lists.
    fn merge_properties(&mut self, names: &[String]) -> BTreeMap<String, BTreeSet<String>> {
        let mut interfaces: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for name in names {
            let ancestors: Vec<String> = self
                .graph
                .extension_chain(name)
                .skip(1)
                .map(|m| m.name().to_string())
                .collect();

            let mut merged = self.descriptors[name].properties().clone();
            for ancestor in &ancestors {
                merged = descriptor::merge(&merged, self.descriptors[ancestor].properties());
            }

            let implemented = merged.get_list(descriptor::IMPLEMENTS_KEY);
            for interface in &implemented {
                interfaces
                    .entry(interface.clone())
                    .or_default()
                    .insert(name.clone());
            }

            if let Some(module) = self.graph.get_mut(name) {
                module.implements.extend(implemented);
                module.properties = merged;
            }
        }

        interfaces
    }

    fn inject(&mut self, name: &str, interfaces: &BTreeMap<String, BTreeSet<String>>) -> WiringResult<()> {
        let required = match self.graph.get(name) {
            Some(module) => module.properties.get_list(descriptor::REQUIRES_KEY),
            None => return Ok(()),
        };

        for interface in required {
            let implementors = interfaces.get(&interface).ok_or_else(|| WiringError::UnsatisfiedDependency {
                module: name.to_string(),
                interface: interface.clone(),
            })?;

            let target = match implementors.iter().next() {
                Some(only) if implementors.len() == 1 => only.clone(),
                _ => self.wired_dependency(name, &interface, implementors)?,
            };

            tracing::debug!(module = %name, interface = %interface, dependency = %target, "Dependency wired");
            self.set_dependency(name, &interface, &target);
        }
        Ok(())
    }

    /// Explicit `<module>.<interface>` wiring entry for `name` or the closest
    /// ancestor that has one.
    fn wired_dependency(&self, name: &str, interface: &str, implementors: &BTreeSet<String>) -> WiringResult<String> {
        for module in self.graph.extension_chain(name) {
            let key = format!("{}.{}", module.name(), interface);
            if let Some(target) = self.wirings.get(&key) {
                let target = target.trim();
                if !self.graph.contains(target) {
                    return Err(WiringError::UnknownWiredModule {
                        key,
                        target: target.to_string(),
                    });
                }
                return Ok(target.to_string());
            }
        }

        Err(WiringError::AmbiguousDependency {
            module: name.to_string(),
            interface: interface.to_string(),
            candidates: implementors.iter().cloned().collect(),
        })
    }

    /// Record the dependency on `name` and each of its ancestors. A module
    /// keeps the first value set for an interface.
    ///
    /// Modules are injected in name order, so a descendant injected before
    /// its ancestor fixes the ancestor's value, even over the ancestor's own
    /// `<ancestor>.<interface>` entry.
    fn set_dependency(&mut self, name: &str, interface: &str, target: &str) {
        let chain: Vec<String> = self
            .graph
            .extension_chain(name)
            .map(|m| m.name().to_string())
            .collect();

        for module_name in chain {
            if let Some(module) = self.graph.get_mut(&module_name) {
                module
                    .dependencies
                    .entry(interface.to_string())
                    .or_insert_with(|| target.to_string());
            }
        }
    }

    fn resolve_root(&mut self) -> WiringResult<String> {
        if let Some(root) = self.mounter.root_module() {
            return Ok(root.to_string());
        }
        if self.graph.contains(MAIN_MODULE) {
            tracing::info!(module = MAIN_MODULE, "Nothing mounted at '/', using the main module");
            self.mounter.set_root_module(MAIN_MODULE);
            return Ok(MAIN_MODULE.to_string());
        }
        Err(WiringError::NoRootModule)
    }
}
