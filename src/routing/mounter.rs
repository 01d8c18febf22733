//! Mount point and zone registry.
//!
//! # Responsibilities
//! - Own the zone tables (by name and by context key)
//! - Own the mount point → module table and the per-path candidate sets
//! - Resolve the zone of a request and the module owning a path
//!
//! # Design Decisions
//! - Built once per configuration pass, read-only while serving
//! - Modules are referenced by name; the module graph owns the records
//! - Longest-prefix lookup walks the path's `/` boundaries from the right;
//!   no trie, mount tables are small

use std::collections::HashMap;

use crate::error::{WiringError, WiringResult};
use crate::routing::{MountPoint, RequestContext, Zone};

/// Name of the zone registered for `base_url` when no default zone is configured.
pub const MAIN_ZONE: &str = "main";

#[derive(Debug, Default)]
pub struct Mounter {
    root_module: Option<String>,
    by_mount_point: HashMap<MountPoint, String>,
    /// Literal mount path → modules registered there, in registration order.
    by_mount_path: HashMap<String, Vec<(MountPoint, String)>>,

    default_zone: Option<Zone>,
    zones_by_name: HashMap<String, Zone>,
    zones_by_context: HashMap<String, Zone>,
}

impl Mounter {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------ zones

    /// Register a zone. A later registration under the same name replaces it.
    pub fn register_zone(&mut self, name: &str, url_or_path: &str) -> WiringResult<()> {
        let zone = Zone::new(name, url_or_path)?;
        tracing::debug!(zone = %name, full = %zone.full(), "Zone registered");
        self.zones_by_context.insert(zone.full().to_string(), zone.clone());
        self.zones_by_name.insert(name.to_string(), zone);
        Ok(())
    }

    /// Select the zone used when a request matches no registered context.
    pub fn set_default_zone(&mut self, name: &str) -> WiringResult<()> {
        let zone = self
            .zones_by_name
            .get(name)
            .cloned()
            .ok_or_else(|| WiringError::UnknownDefaultZone(name.to_string()))?;
        self.default_zone = Some(zone);
        Ok(())
    }

    pub fn zone(&self, name: &str) -> Option<&Zone> {
        self.zones_by_name.get(name)
    }

    pub fn default_zone(&self) -> Option<&Zone> {
        self.default_zone.as_ref()
    }

    pub fn zone_count(&self) -> usize {
        self.zones_by_name.len()
    }

    /// Resolve the zone of a request.
    ///
    /// Only requests carrying the context header are matched: first by their
    /// absolute context (`scheme://host/context`), then by the bare context
    /// path. Everything else lands in the default zone.
    pub fn get_zone(&self, request: &RequestContext) -> Option<&Zone> {
        let mut zone = None;

        if request.has_context_header() {
            let absolute = request.true_context_path(true);
            tracing::trace!(context = %absolute, "Matching absolute context");
            zone = self.zones_by_context.get(&absolute);

            if zone.is_none() {
                let relative = request.true_context_path(false);
                tracing::trace!(context = %relative, "Matching relative context");
                zone = self.zones_by_context.get(&relative);
            }
        }

        if zone.is_none() {
            tracing::trace!("Defaulting to root zone");
        }
        zone.or(self.default_zone.as_ref())
    }

    // ---------------------------------------------------------------- modules

    /// Register `module` at `mount_point`. Duplicates are configuration-fatal.
    pub fn register(&mut self, mount_point: MountPoint, module: &str) -> WiringResult<()> {
        if let Some(existing) = self.by_mount_point.get(&mount_point) {
            return Err(WiringError::DuplicateMountPoint {
                mount_point,
                existing: existing.clone(),
                module: module.to_string(),
            });
        }

        if mount_point.is_root() {
            self.root_module = Some(module.to_string());
        }

        self.by_mount_path
            .entry(mount_point.path().to_string())
            .or_default()
            .push((mount_point.clone(), module.to_string()));
        self.by_mount_point.insert(mount_point, module.to_string());
        Ok(())
    }

    pub fn is_registered(&self, mount_point: &MountPoint) -> bool {
        self.by_mount_point.contains_key(mount_point)
    }

    /// Module registered at exactly this mount point.
    pub fn module_at(&self, mount_point: &MountPoint) -> Option<&str> {
        self.by_mount_point.get(mount_point).map(String::as_str)
    }

    pub fn root_module(&self) -> Option<&str> {
        self.root_module.as_deref()
    }

    /// Use `module` for `/` when nothing was mounted at the bare root.
    pub(crate) fn set_root_module(&mut self, module: &str) {
        self.root_module = Some(module.to_string());
    }

    pub fn len(&self) -> usize {
        self.by_mount_point.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_mount_point.is_empty()
    }

    /// Longest-prefix module lookup scoped by zone.
    ///
    /// Candidates are the prefixes of `path` ending in `/`, longest first. A
    /// path owned by a single module resolves to it whatever the zone; shared
    /// paths prefer the module mounted for `zone`, then the zone-less one.
    /// When no prefix matches, the root module answers.
    pub fn get_module(&self, path: &str, zone: Option<&Zone>) -> Option<&str> {
        let zone_name = zone.map(Zone::name);
        let mut candidate = path;

        loop {
            let Some(index) = candidate.rfind('/') else {
                return self.root_module();
            };
            let leader = &candidate[..=index];
            if let Some(module) = self.lookup_at(leader, zone_name) {
                return Some(module);
            }
            candidate = &leader[..index];
        }
    }

    fn lookup_at(&self, mount_path: &str, zone_name: Option<&str>) -> Option<&str> {
        let modules = self.by_mount_path.get(mount_path)?;
        if let [(_, only)] = modules.as_slice() {
            return Some(only);
        }

        let mut wildcard = None;
        for (mount_point, module) in modules {
            match mount_point.zone() {
                None => wildcard = Some(module.as_str()),
                Some(z) if Some(z) == zone_name => return Some(module),
                Some(_) => {}
            }
        }
        wildcard
    }
}
