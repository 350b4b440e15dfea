//! Projection family identifiers, capability flags, and the per-family
//! parameter shapes.

use crate::raw::{RawProjection, conic_conformal, conic_equal_area};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Family {
    Mercator,
    ConicConformal,
    ConicEqualArea,
    AzimuthalEqualArea,
    AzimuthalEquidistant,
    Equirectangular,
}

impl Family {
    pub const ALL: [Family; 6] = [
        Family::Mercator,
        Family::ConicConformal,
        Family::ConicEqualArea,
        Family::AzimuthalEqualArea,
        Family::AzimuthalEquidistant,
        Family::Equirectangular,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Family::Mercator => "mercator",
            Family::ConicConformal => "conic-conformal",
            Family::ConicEqualArea => "conic-equal-area",
            Family::AzimuthalEqualArea => "azimuthal-equal-area",
            Family::AzimuthalEquidistant => "azimuthal-equidistant",
            Family::Equirectangular => "equirectangular",
        }
    }

    /// Resolve a family identifier, including the `albers` alias.
    pub fn from_id(id: &str) -> Option<Family> {
        match id {
            "mercator" => Some(Family::Mercator),
            "conic-conformal" => Some(Family::ConicConformal),
            "conic-equal-area" | "albers" => Some(Family::ConicEqualArea),
            "azimuthal-equal-area" => Some(Family::AzimuthalEqualArea),
            "azimuthal-equidistant" => Some(Family::AzimuthalEquidistant),
            "equirectangular" => Some(Family::Equirectangular),
            _ => None,
        }
    }

    pub fn supports_parallels(self) -> bool {
        matches!(self, Family::ConicConformal | Family::ConicEqualArea)
    }

    pub fn supports_rotate(self) -> bool {
        // Every spherical family accepts the three-axis rotation.
        true
    }

    /// Standard parallels used when a conic family is built without any.
    pub fn default_parallels(self) -> Option<[f64; 2]> {
        match self {
            Family::ConicConformal => Some([30.0, 30.0]),
            Family::ConicEqualArea => Some([29.5, 45.5]),
            _ => None,
        }
    }

    /// Build the raw projection for this family. `parallels` is in degrees
    /// and only consulted by the conic families.
    pub fn raw(self, parallels: Option<[f64; 2]>) -> RawProjection {
        match self {
            Family::Mercator => RawProjection::Mercator,
            Family::Equirectangular => RawProjection::Equirectangular,
            Family::AzimuthalEqualArea => RawProjection::AzimuthalEqualArea,
            Family::AzimuthalEquidistant => RawProjection::AzimuthalEquidistant,
            Family::ConicConformal | Family::ConicEqualArea => {
                let [p0, p1] = parallels
                    .or_else(|| self.default_parallels())
                    .unwrap_or([30.0, 30.0]);
                let (phi0, phi1) = (p0.to_radians(), p1.to_radians());
                if self == Family::ConicConformal {
                    conic_conformal(phi0, phi1)
                } else {
                    conic_equal_area(phi0, phi1)
                }
            }
        }
    }
}

/// Geographic anchor shared by every parameter shape. Longitude/latitude in
/// degrees; `gamma` is the optional roll around the viewing axis.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FocusPoint {
    pub longitude: f64,
    pub latitude: f64,
    pub gamma: Option<f64>,
}

impl FocusPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
            gamma: None,
        }
    }
}

/// Positioning parameters, tagged per family group so invalid combinations
/// (parallels on a cylindrical projection, clip angle on a conic) cannot be
/// expressed.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum FamilyParameters {
    Conic {
        focus: FocusPoint,
        parallels: [f64; 2],
    },
    Cylindrical {
        focus: FocusPoint,
    },
    Azimuthal {
        focus: FocusPoint,
        clip_angle: Option<f64>,
    },
}

impl FamilyParameters {
    pub fn focus(&self) -> FocusPoint {
        match *self {
            FamilyParameters::Conic { focus, .. } => focus,
            FamilyParameters::Cylindrical { focus } => focus,
            FamilyParameters::Azimuthal { focus, .. } => focus,
        }
    }
}
