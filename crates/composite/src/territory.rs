//! Territory descriptors and the declarative composite configuration.

use foundation::bounds::GeoBounds;

/// Clip rectangle from config, expressed as corner offsets in fractions of
/// the territory's scale, relative to its translate.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NormalizedClip {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// Declarative input for one territory. Immutable for the session unless the
/// atlas is reconfigured.
#[derive(Debug, Clone, PartialEq)]
pub struct TerritoryDescriptor {
    pub code: String,
    pub name: String,
    /// Geographic anchor `[lon, lat]`.
    pub center: [f64; 2],
    /// Used for forward routing, inverse validation, and the default clip.
    pub bounds: GeoBounds,
    /// Projection family identifier; `None` means the role default
    /// (conic-conformal for a mainland, mercator otherwise).
    pub projection_family: Option<String>,
    /// Config-level scale factor relative to the shared reference scale.
    pub base_scale_multiplier: Option<f64>,
    /// Default screen offset from canvas center.
    pub offset: [f64; 2],
    pub clip_extent: Option<NormalizedClip>,
}

impl TerritoryDescriptor {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        center: [f64; 2],
        bounds: GeoBounds,
        offset: [f64; 2],
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            center,
            bounds,
            projection_family: None,
            base_scale_multiplier: None,
            offset,
            clip_extent: None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TerritoryRole {
    /// Mainland: excluded from composition borders.
    Primary,
    /// Overseas/inset member.
    Secondary,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AtlasKind {
    /// One primary territory plus N insets.
    SingleFocus,
    /// N members with no hierarchy.
    EqualMembers,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeConfig {
    pub kind: AtlasKind,
    pub mainlands: Vec<TerritoryDescriptor>,
    pub overseas: Vec<TerritoryDescriptor>,
}

impl CompositeConfig {
    pub fn single_focus(mainland: TerritoryDescriptor, overseas: Vec<TerritoryDescriptor>) -> Self {
        Self {
            kind: AtlasKind::SingleFocus,
            mainlands: vec![mainland],
            overseas,
        }
    }

    pub fn equal_members(members: Vec<TerritoryDescriptor>) -> Self {
        Self {
            kind: AtlasKind::EqualMembers,
            mainlands: members,
            overseas: Vec::new(),
        }
    }

    /// Territories in composition order: mainlands first, then overseas.
    pub fn territories(&self) -> impl Iterator<Item = (TerritoryRole, &TerritoryDescriptor)> {
        self.mainlands
            .iter()
            .map(|t| (TerritoryRole::Primary, t))
            .chain(self.overseas.iter().map(|t| (TerritoryRole::Secondary, t)))
    }

    pub fn find(&self, code: &str) -> Option<(TerritoryRole, &TerritoryDescriptor)> {
        self.territories().find(|(_, t)| t.code == code)
    }

    pub fn len(&self) -> usize {
        self.mainlands.len() + self.overseas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the descriptor for `code` in place, or append under the given
    /// role when it is new.
    pub fn upsert(&mut self, role: TerritoryRole, descriptor: TerritoryDescriptor) {
        if let Some(existing) = self
            .mainlands
            .iter_mut()
            .chain(self.overseas.iter_mut())
            .find(|t| t.code == descriptor.code)
        {
            *existing = descriptor;
            return;
        }
        match role {
            TerritoryRole::Primary => self.mainlands.push(descriptor),
            TerritoryRole::Secondary => self.overseas.push(descriptor),
        }
    }
}
