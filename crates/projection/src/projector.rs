//! A configured single-territory projection.
//!
//! `Projector` is an immutable-style parameter record: forward and inverse
//! mappings are recomputed from the stored parameters on every call, so there
//! is no hidden internal state that could drift as parameters are edited.
//! Screen y grows downward; the raw projections' northward y is flipped here.

use foundation::bounds::PixelRect;
use foundation::math::{Vec2, normalize_lon_deg};

use crate::families::{Family, FamilyParameters, FocusPoint};
use crate::raw::RawProjection;
use crate::rotation::Rotation;

pub const DEFAULT_SCALE: f64 = 150.0;
pub const DEFAULT_PRECISION: f64 = 0.7;

#[derive(Debug, Clone, PartialEq)]
pub struct Projector {
    family: Family,
    raw: RawProjection,
    parallels: Option<[f64; 2]>,
    /// `[lambda, phi, gamma]` rotation in degrees, applied before the raw
    /// projection.
    rotate: [f64; 3],
    /// Geographic point (degrees) that lands exactly on `translate`.
    center: [f64; 2],
    scale: f64,
    translate: Vec2,
    clip_extent: Option<PixelRect>,
    clip_angle: Option<f64>,
    precision: f64,
}

impl Projector {
    pub fn new(family: Family) -> Self {
        let parallels = family.default_parallels();
        Self {
            family,
            raw: family.raw(parallels),
            parallels,
            rotate: [0.0; 3],
            center: [0.0; 2],
            scale: DEFAULT_SCALE,
            translate: Vec2::ZERO,
            clip_extent: None,
            clip_angle: None,
            precision: DEFAULT_PRECISION,
        }
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn translate(&self) -> Vec2 {
        self.translate
    }

    pub fn center(&self) -> [f64; 2] {
        self.center
    }

    pub fn rotate(&self) -> [f64; 3] {
        self.rotate
    }

    pub fn parallels(&self) -> Option<[f64; 2]> {
        self.parallels
    }

    pub fn clip_extent(&self) -> Option<PixelRect> {
        self.clip_extent
    }

    pub fn clip_angle(&self) -> Option<f64> {
        self.clip_angle
    }

    pub fn precision(&self) -> f64 {
        self.precision
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
    }

    pub fn set_translate(&mut self, translate: Vec2) {
        self.translate = translate;
    }

    pub fn set_center(&mut self, center: [f64; 2]) {
        self.center = center;
    }

    pub fn set_rotate(&mut self, rotate: [f64; 3]) {
        self.rotate = rotate;
    }

    /// Standard parallels rebuild the raw projection. Families without the
    /// concept ignore the call (capability-gated, not an error).
    pub fn set_parallels(&mut self, parallels: [f64; 2]) {
        if !self.family.supports_parallels() {
            return;
        }
        self.parallels = Some(parallels);
        self.raw = self.family.raw(self.parallels);
    }

    pub fn set_clip_extent(&mut self, clip: Option<PixelRect>) {
        self.clip_extent = clip;
    }

    pub fn set_clip_angle(&mut self, angle: Option<f64>) {
        self.clip_angle = angle;
    }

    pub fn set_precision(&mut self, precision: f64) {
        self.precision = precision;
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.set_scale(scale);
        self
    }

    pub fn with_translate(mut self, translate: Vec2) -> Self {
        self.set_translate(translate);
        self
    }

    pub fn with_center(mut self, center: [f64; 2]) -> Self {
        self.set_center(center);
        self
    }

    pub fn with_rotate(mut self, rotate: [f64; 3]) -> Self {
        self.set_rotate(rotate);
        self
    }

    pub fn with_parallels(mut self, parallels: [f64; 2]) -> Self {
        self.set_parallels(parallels);
        self
    }

    /// Forward projection: geographic degrees to screen pixels. `None` when
    /// the point is unrepresentable under the current parameters (poles for
    /// mercator, the antipode for azimuthals).
    pub fn project(&self, lon: f64, lat: f64) -> Option<Vec2> {
        let rotation = Rotation::from_degrees(self.rotate);
        let (lambda, phi) = rotation.forward(lon.to_radians(), lat.to_radians());
        let planar = self.raw.forward(lambda, phi);
        if !planar.is_finite() {
            return None;
        }
        let focus = self.planar_focus()?;
        Some(Vec2::new(
            self.translate.x + self.scale * (planar.x - focus.x),
            self.translate.y - self.scale * (planar.y - focus.y),
        ))
    }

    /// Inverse projection: screen pixels back to geographic degrees.
    pub fn invert(&self, point: Vec2) -> Option<(f64, f64)> {
        let rotation = Rotation::from_degrees(self.rotate);
        let focus = self.planar_focus()?;
        let x = (point.x - self.translate.x) / self.scale + focus.x;
        let y = focus.y - (point.y - self.translate.y) / self.scale;
        let (lambda, phi) = self.raw.invert(x, y)?;
        let (lon, lat) = rotation.invert(lambda, phi);
        Some((normalize_lon_deg(lon.to_degrees()), lat.to_degrees()))
    }

    /// Apply a validated per-family parameter set.
    pub fn apply_parameters(&mut self, params: &FamilyParameters) {
        match *params {
            FamilyParameters::Conic { focus, parallels } => {
                self.set_parallels(parallels);
                self.set_center([focus.longitude, focus.latitude]);
                self.set_rotate([0.0, 0.0, focus.gamma.unwrap_or(0.0)]);
            }
            FamilyParameters::Cylindrical { focus } => {
                self.set_center([focus.longitude, focus.latitude]);
                self.set_rotate([0.0, 0.0, focus.gamma.unwrap_or(0.0)]);
            }
            FamilyParameters::Azimuthal { focus, clip_angle } => {
                // Azimuthal families anchor through rotation, not center.
                self.set_center([0.0, 0.0]);
                self.set_rotate([
                    -focus.longitude,
                    -focus.latitude,
                    focus.gamma.unwrap_or(0.0),
                ]);
                self.set_clip_angle(clip_angle);
            }
        }
    }

    /// Read the positioning parameters back out of the record. This is the
    /// inverse of [`Projector::apply_parameters`] and backs the export path
    /// when no parameter provider is attached.
    pub fn family_parameters(&self) -> FamilyParameters {
        let gamma = (self.rotate[2] != 0.0).then_some(self.rotate[2]);
        match self.family {
            Family::ConicConformal | Family::ConicEqualArea => FamilyParameters::Conic {
                focus: FocusPoint {
                    longitude: self.center[0],
                    latitude: self.center[1],
                    gamma,
                },
                parallels: self
                    .parallels
                    .or_else(|| self.family.default_parallels())
                    .unwrap_or([0.0, 0.0]),
            },
            Family::AzimuthalEqualArea | Family::AzimuthalEquidistant => {
                FamilyParameters::Azimuthal {
                    focus: FocusPoint {
                        longitude: -self.rotate[0],
                        latitude: -self.rotate[1],
                        gamma,
                    },
                    clip_angle: self.clip_angle,
                }
            }
            Family::Mercator | Family::Equirectangular => FamilyParameters::Cylindrical {
                focus: FocusPoint {
                    longitude: self.center[0],
                    latitude: self.center[1],
                    gamma,
                },
            },
        }
    }

    /// The raw-plane image of the configured center, shared by forward and
    /// inverse so the center always lands exactly on `translate`. The center
    /// is expressed in post-rotation coordinates, so the rotation is not
    /// applied here.
    fn planar_focus(&self) -> Option<Vec2> {
        let focus = self
            .raw
            .forward(self.center[0].to_radians(), self.center[1].to_radians());
        focus.is_finite().then_some(focus)
    }
}
