//! Effective-parameter resolution.
//!
//! One territory's parameters come from up to four layers, highest wins:
//! live provider override, territory config default, projection-family
//! default (supplied by the factory when the projector is built), and the
//! global default multiplier. Merging is presence-based: an explicit `0.0`
//! or `[0.0, 0.0]` is a value like any other and is never displaced by a
//! lower-precedence layer.

use std::fmt;

use foundation::bounds::PixelRect;

use crate::territory::TerritoryDescriptor;

pub const GLOBAL_SCALE_MULTIPLIER: f64 = 1.0;

/// Ephemeral union of parameter layers for one territory. Never persisted;
/// always re-derived on demand.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Parameters {
    pub center: Option<[f64; 2]>,
    pub rotate: Option<[f64; 3]>,
    pub parallels: Option<[f64; 2]>,
    /// Absolute scale. When present and disagreeing with the
    /// multiplier-derived scale, it wins over multiplier edits.
    pub scale: Option<f64>,
    pub scale_multiplier: Option<f64>,
    pub translate_offset: Option<[f64; 2]>,
    pub pixel_clip_extent: Option<PixelRect>,
    pub clip_angle: Option<f64>,
    pub precision: Option<f64>,
}

impl Parameters {
    /// Layer `self` over `base`; fields present in `self` win.
    pub fn over(self, base: Parameters) -> Parameters {
        Parameters {
            center: self.center.or(base.center),
            rotate: self.rotate.or(base.rotate),
            parallels: self.parallels.or(base.parallels),
            scale: self.scale.or(base.scale),
            scale_multiplier: self.scale_multiplier.or(base.scale_multiplier),
            translate_offset: self.translate_offset.or(base.translate_offset),
            pixel_clip_extent: self.pixel_clip_extent.or(base.pixel_clip_extent),
            clip_angle: self.clip_angle.or(base.clip_angle),
            precision: self.precision.or(base.precision),
        }
    }
}

/// Live parameter source, injected by the host. The engine works without one
/// (config defaults only).
pub trait ParameterProvider {
    fn effective_parameters(&self, code: &str) -> Option<Parameters>;

    /// Parameters for persistence. Defaults to the effective set.
    fn exportable_parameters(&self, code: &str) -> Option<Parameters> {
        self.effective_parameters(code)
    }
}

pub struct ParameterResolver {
    provider: Option<Box<dyn ParameterProvider>>,
}

impl fmt::Debug for ParameterResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterResolver")
            .field("provider", &self.provider.is_some())
            .finish()
    }
}

impl ParameterResolver {
    pub fn new(provider: Option<Box<dyn ParameterProvider>>) -> Self {
        if provider.is_none() {
            tracing::warn!("no parameter provider attached, resolving from config defaults only");
        }
        Self { provider }
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Merge all layers for one territory. Never fails: with no provider the
    /// config and global defaults alone are returned.
    pub fn effective(&self, descriptor: &TerritoryDescriptor) -> Parameters {
        let config = Self::config_layer(descriptor);
        let overrides = self
            .provider
            .as_ref()
            .and_then(|p| p.effective_parameters(&descriptor.code))
            .unwrap_or_default();
        let mut merged = overrides.over(config);
        if merged.scale_multiplier.is_none() {
            merged.scale_multiplier = Some(GLOBAL_SCALE_MULTIPLIER);
        }
        merged
    }

    /// Provider parameters for persistence, if a provider is attached.
    pub fn exportable(&self, code: &str) -> Option<Parameters> {
        self.provider
            .as_ref()
            .and_then(|p| p.exportable_parameters(code))
    }

    fn config_layer(descriptor: &TerritoryDescriptor) -> Parameters {
        Parameters {
            center: Some(descriptor.center),
            scale_multiplier: descriptor.base_scale_multiplier,
            translate_offset: Some(descriptor.offset),
            ..Parameters::default()
        }
    }
}
