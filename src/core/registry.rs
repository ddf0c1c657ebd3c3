//! # Module registry: static name → location and page → modules tables.
//!
//! The registry is built once at startup and never mutated. Every lookup is pure.
//!
//! ```text
//! modules     "tarot"            → "/js/tarot.js"            (+ optional size hint)
//! pages       "/fortune/tarot/"  → ["tarot", "fortune"]      (ordered)
//! dependents  "fortune"          → ["zodiac"]                (loaded at low priority)
//! critical    ["/js/main.js", …]                             (loaded at critical priority)
//! ```
//!
//! ## Manifest format
//! ```json
//! {
//!   "critical": ["/js/main.js"],
//!   "modules": [
//!     { "name": "tarot", "location": "/js/tarot.js", "size_hint": 20480 }
//!   ],
//!   "pages": { "/fortune/tarot/": ["tarot"] },
//!   "dependents": { "tarot": ["fortune"] }
//! }
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Size assumed for a unit that carries no size hint (10 KiB).
pub const DEFAULT_UNIT_SIZE: u64 = 10 * 1024;

/// A named, independently loadable unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// Logical name used by callers and page tables.
    pub name: String,
    /// Where the host fetches the unit from.
    pub location: String,
    /// Estimated transfer size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_hint: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct Manifest {
    #[serde(default)]
    critical: Vec<String>,
    #[serde(default)]
    modules: Vec<ModuleDescriptor>,
    #[serde(default)]
    pages: HashMap<String, Vec<String>>,
    #[serde(default)]
    dependents: HashMap<String, Vec<String>>,
}

/// Immutable lookup tables for modules, pages and dependents.
#[derive(Clone, Debug, Default)]
pub struct ModuleRegistry {
    modules: Vec<ModuleDescriptor>,
    by_name: HashMap<String, usize>,
    pages: HashMap<String, Vec<String>>,
    dependents: HashMap<String, Vec<String>>,
    critical: Vec<String>,
}

impl ModuleRegistry {
    /// Starts an empty builder.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Parses a JSON manifest (see module docs for the shape).
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let manifest: Manifest = serde_json::from_str(json)?;

        let mut builder = RegistryBuilder::default();
        for desc in manifest.modules {
            if builder.by_name.contains_key(&desc.name) {
                return Err(RegistryError::DuplicateModule { name: desc.name });
            }
            builder = builder.descriptor(desc);
        }
        builder.pages = manifest.pages;
        builder.dependents = manifest.dependents;
        builder.critical = manifest.critical;
        Ok(builder.build())
    }

    /// Resolves a logical name to its location.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.descriptor(name).map(|d| d.location.as_str())
    }

    pub fn descriptor(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.by_name.get(name).map(|&i| &self.modules[i])
    }

    /// Ordered module names the page at `path` needs (empty for unknown paths).
    pub fn required_modules(&self, path: &str) -> &[String] {
        self.pages.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True if `path` has an entry in the page table.
    pub fn knows_page(&self, path: &str) -> bool {
        self.pages.contains_key(path)
    }

    /// Declared dependents of `name` (empty if none).
    pub fn dependents(&self, name: &str) -> &[String] {
        self.dependents.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Locations preloaded at critical priority, in declaration order.
    pub fn critical_locations(&self) -> &[String] {
        &self.critical
    }

    /// All registered modules, in registration order.
    pub fn modules(&self) -> &[ModuleDescriptor] {
        &self.modules
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Estimated size of the unit at `location`.
    ///
    /// Uses the size hint of the registered module with that location, or
    /// [`DEFAULT_UNIT_SIZE`].
    pub fn estimated_size(&self, location: &str) -> u64 {
        self.modules
            .iter()
            .find(|d| d.location == location)
            .and_then(|d| d.size_hint)
            .unwrap_or(DEFAULT_UNIT_SIZE)
    }

    /// Sum of the estimated sizes of every registered module.
    pub fn total_estimated_size(&self) -> u64 {
        self.modules
            .iter()
            .map(|d| d.size_hint.unwrap_or(DEFAULT_UNIT_SIZE))
            .sum()
    }
}

/// Derives a logical name from a location: last path segment without `.js` / `.min`.
///
/// ```
/// use bundlevisor::module_name_from_location;
///
/// assert_eq!(module_name_from_location("/js/main.js"), "main");
/// assert_eq!(module_name_from_location("/js/dom-security.min.js"), "dom-security");
/// ```
pub fn module_name_from_location(location: &str) -> String {
    let file = location.rsplit('/').next().unwrap_or_default();
    file.replacen(".js", "", 1).replacen(".min", "", 1)
}

/// Incremental constructor for [`ModuleRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    modules: Vec<ModuleDescriptor>,
    by_name: HashMap<String, usize>,
    pages: HashMap<String, Vec<String>>,
    dependents: HashMap<String, Vec<String>>,
    critical: Vec<String>,
}

impl RegistryBuilder {
    /// Registers a module. Re-registering a name replaces its descriptor in place.
    pub fn module(self, name: impl Into<String>, location: impl Into<String>) -> Self {
        self.descriptor(ModuleDescriptor {
            name: name.into(),
            location: location.into(),
            size_hint: None,
        })
    }

    /// Registers a module with a size hint in bytes.
    pub fn sized_module(
        self,
        name: impl Into<String>,
        location: impl Into<String>,
        bytes: u64,
    ) -> Self {
        self.descriptor(ModuleDescriptor {
            name: name.into(),
            location: location.into(),
            size_hint: Some(bytes),
        })
    }

    pub fn descriptor(mut self, desc: ModuleDescriptor) -> Self {
        match self.by_name.get(&desc.name) {
            Some(&i) => self.modules[i] = desc,
            None => {
                self.by_name.insert(desc.name.clone(), self.modules.len());
                self.modules.push(desc);
            }
        }
        self
    }

    /// Declares the ordered module list a page path needs.
    pub fn page<I, S>(mut self, path: impl Into<String>, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pages
            .insert(path.into(), modules.into_iter().map(Into::into).collect());
        self
    }

    /// Declares modules to request (low priority) once `name` has loaded.
    pub fn dependents<I, S>(mut self, name: impl Into<String>, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependents
            .insert(name.into(), deps.into_iter().map(Into::into).collect());
        self
    }

    /// Adds a location preloaded at critical priority on start.
    pub fn critical(mut self, location: impl Into<String>) -> Self {
        self.critical.push(location.into());
        self
    }

    pub fn build(self) -> ModuleRegistry {
        ModuleRegistry {
            modules: self.modules,
            by_name: self.by_name,
            pages: self.pages,
            dependents: self.dependents,
            critical: self.critical,
        }
    }
}
