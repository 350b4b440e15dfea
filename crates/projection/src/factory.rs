//! Projection construction: a registry for dynamically registered family
//! identifiers, backed by a fixed fallback table.
//!
//! Construction sits on an interactive path, so it never fails: an unknown
//! identifier logs a warning and yields a mercator projector.

use std::collections::HashMap;

use crate::families::Family;
use crate::projector::Projector;

/// A registered projection family with its capabilities resolved once at
/// registration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilySpec {
    pub id: String,
    pub family: Family,
    pub supports_parallels: bool,
    pub supports_rotate: bool,
}

impl FamilySpec {
    fn new(id: impl Into<String>, family: Family) -> Self {
        Self {
            id: id.into(),
            family,
            supports_parallels: family.supports_parallels(),
            supports_rotate: family.supports_rotate(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProjectionRegistry {
    entries: HashMap<String, FamilySpec>,
}

impl Default for ProjectionRegistry {
    fn default() -> Self {
        let mut registry = Self {
            entries: HashMap::new(),
        };
        for family in Family::ALL {
            registry.register(family.id(), family);
        }
        registry.register("albers", Family::ConicEqualArea);
        registry
    }
}

impl ProjectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-register) an identifier for a family. Capability
    /// flags are resolved here, not re-derived on use.
    pub fn register(&mut self, id: impl Into<String>, family: Family) {
        let spec = FamilySpec::new(id, family);
        self.entries.insert(spec.id.clone(), spec);
    }

    pub fn spec(&self, id: &str) -> Option<&FamilySpec> {
        self.entries.get(id)
    }

    /// Resolve an identifier to a family: registry first, then the fixed
    /// fallback table, then mercator with a warning.
    pub fn resolve(&self, id: &str) -> Family {
        if let Some(spec) = self.entries.get(id) {
            return spec.family;
        }
        if let Some(family) = Family::from_id(id) {
            return family;
        }
        tracing::warn!(family = id, "unknown projection family, using mercator");
        Family::Mercator
    }

    /// Build a projector for the identifier. Pure construction, no side
    /// effects beyond the unknown-family warning.
    pub fn create(&self, id: &str) -> Projector {
        Projector::new(self.resolve(id))
    }
}
