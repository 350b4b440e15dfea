//! Per-territory projection state and its mutators.
//!
//! Scale handling follows one rule everywhere: the effective scale is always
//! `base_scale * scale_multiplier`, recomputed from those two numbers at the
//! moment it is applied. It is never read back out of a live projector and
//! re-multiplied, so repeated edits cannot accumulate drift. `base_scale`
//! itself is rewritten in exactly two places: a reference-scale change, and
//! the reconciliation step after a family switch.

use std::collections::HashMap;

use foundation::bounds::{GeoBounds, PixelRect};
use foundation::math::Vec2;
use projection::factory::ProjectionRegistry;
use projection::families::{Family, FamilyParameters};
use projection::projector::Projector;

use crate::params::Parameters;
use crate::territory::{NormalizedClip, TerritoryDescriptor, TerritoryRole};

/// Absolute tolerance for "does the restored scale still match
/// base * multiplier". Sized for the reference-scale magnitudes the shipped
/// configs use (hundreds to thousands).
pub const SCALE_RECONCILE_EPS: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct SubProjection {
    code: String,
    name: String,
    projector: Projector,
    /// Identifier the projector was built from. Kept because projector
    /// records do not remember aliases like `albers`.
    family_id: String,
    base_scale: f64,
    /// Config-level factor of the reference scale; survives reference-scale
    /// rebases.
    config_multiplier: f64,
    scale_multiplier: f64,
    translate_offset: Vec2,
    pixel_clip: Option<PixelRect>,
    normalized_clip: Option<NormalizedClip>,
    bounds: GeoBounds,
    role: TerritoryRole,
}

impl SubProjection {
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    pub fn family_id(&self) -> &str {
        &self.family_id
    }

    pub fn base_scale(&self) -> f64 {
        self.base_scale
    }

    pub fn scale_multiplier(&self) -> f64 {
        self.scale_multiplier
    }

    pub fn effective_scale(&self) -> f64 {
        self.base_scale * self.scale_multiplier
    }

    pub fn translate_offset(&self) -> Vec2 {
        self.translate_offset
    }

    pub fn pixel_clip(&self) -> Option<PixelRect> {
        self.pixel_clip
    }

    pub fn normalized_clip(&self) -> Option<NormalizedClip> {
        self.normalized_clip
    }

    pub fn bounds(&self) -> GeoBounds {
        self.bounds
    }

    pub fn role(&self) -> TerritoryRole {
        self.role
    }

    pub fn is_primary(&self) -> bool {
        self.role == TerritoryRole::Primary
    }
}

#[derive(Debug)]
pub struct SubProjectionManager {
    registry: ProjectionRegistry,
    subs: Vec<SubProjection>,
    index: HashMap<String, usize>,
    reference_scale: f64,
    generation: u64,
}

impl SubProjectionManager {
    pub fn new(reference_scale: f64) -> Self {
        Self {
            registry: ProjectionRegistry::new(),
            subs: Vec::new(),
            index: HashMap::new(),
            reference_scale,
            generation: 0,
        }
    }

    /// Monotonic counter bumped by every mutation; the composite build cache
    /// keys on it.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn reference_scale(&self) -> f64 {
        self.reference_scale
    }

    pub fn registry(&self) -> &ProjectionRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ProjectionRegistry {
        &mut self.registry
    }

    pub fn len(&self) -> usize {
        self.subs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    /// Sub-projections in composition (insertion) order.
    pub fn iter(&self) -> impl Iterator<Item = &SubProjection> {
        self.subs.iter()
    }

    pub fn get(&self, code: &str) -> Option<&SubProjection> {
        self.index.get(code).map(|&i| &self.subs[i])
    }

    fn get_mut(&mut self, code: &str) -> Option<&mut SubProjection> {
        match self.index.get(code) {
            Some(&i) => Some(&mut self.subs[i]),
            None => {
                tracing::warn!(code, "no sub-projection for territory code");
                None
            }
        }
    }

    fn bump(&mut self) {
        self.generation += 1;
    }

    /// Insert a new sub-projection, or replace the existing one for the same
    /// code in place (its composition position is kept).
    pub fn add_or_replace(
        &mut self,
        role: TerritoryRole,
        descriptor: &TerritoryDescriptor,
        params: &Parameters,
    ) {
        let family_id = descriptor
            .projection_family
            .clone()
            .unwrap_or_else(|| default_family_id(role).to_string());
        let family = self.registry.resolve(&family_id);

        let mut projector = Projector::new(family);
        apply_positioning(&mut projector, descriptor, params);
        if let Some(precision) = params.precision {
            projector.set_precision(precision);
        }
        if let Some(angle) = params.clip_angle {
            projector.set_clip_angle(Some(angle));
        }

        let config_multiplier = descriptor.base_scale_multiplier.unwrap_or(1.0);
        let scale_multiplier = params.scale_multiplier.unwrap_or(1.0);
        let mut base_scale = self.reference_scale * config_multiplier;

        // An absolute scale from the provider wins outright; fold it back
        // into base_scale so later multiplier edits stay consistent.
        match params.scale {
            Some(scale) if scale.is_finite() && scale > 0.0 => {
                base_scale = scale / scale_multiplier;
                projector.set_scale(scale);
            }
            _ => {
                projector.set_scale(base_scale * scale_multiplier);
            }
        }
        // Base translate stays at the origin; positioning flows through
        // translate_offset at build time.
        projector.set_translate(Vec2::ZERO);

        let sub = SubProjection {
            code: descriptor.code.clone(),
            name: descriptor.name.clone(),
            projector,
            family_id,
            base_scale,
            config_multiplier,
            scale_multiplier,
            translate_offset: params
                .translate_offset
                .map(|o| Vec2::new(o[0], o[1]))
                .unwrap_or(Vec2::ZERO),
            pixel_clip: params.pixel_clip_extent.filter(|c| c.is_valid()),
            normalized_clip: descriptor.clip_extent,
            bounds: descriptor.bounds,
            role,
        };

        match self.index.get(&descriptor.code).copied() {
            Some(i) => self.subs[i] = sub,
            None => {
                self.index.insert(descriptor.code.clone(), self.subs.len());
                self.subs.push(sub);
            }
        }
        self.bump();
    }

    /// Swap a territory to a new projection family, carrying over the
    /// current scale, anchor, and translate so it does not visually jump.
    pub fn update_projection_family(&mut self, code: &str, family_id: &str) {
        let family = self.registry.resolve(family_id);
        let Some(sub) = self.get_mut(code) else {
            return;
        };

        let outgoing = &sub.projector;
        let restored_scale = outgoing.scale();
        let restored_translate = outgoing.translate();
        let carried = carry_parameters(&outgoing.family_parameters(), family);

        let mut next = Projector::new(family);
        next.apply_parameters(&carried);
        next.set_scale(restored_scale);
        next.set_translate(restored_translate);
        next.set_precision(outgoing.precision());

        sub.projector = next;
        sub.family_id = family_id.to_string();

        // Reconcile: if the restored scale no longer matches
        // base * multiplier, fold the difference into base_scale so the next
        // multiplier edit starts from the truth.
        let expected = sub.base_scale * sub.scale_multiplier;
        if (restored_scale - expected).abs() > SCALE_RECONCILE_EPS {
            sub.base_scale = restored_scale / sub.scale_multiplier;
        }
        self.bump();
    }

    pub fn update_translation_offset(&mut self, code: &str, offset: [f64; 2]) {
        if !finite2(offset) {
            tracing::warn!(code, "ignoring non-finite translation offset");
            return;
        }
        let Some(sub) = self.get_mut(code) else {
            return;
        };
        sub.translate_offset = Vec2::new(offset[0], offset[1]);
        self.bump();
    }

    /// Set the user scale multiplier. When the resolved parameters carry an
    /// absolute scale that disagrees with the multiplier-derived value, that
    /// override wins and the multiplier write is skipped.
    pub fn update_scale(&mut self, code: &str, multiplier: f64, params: &Parameters) {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            tracing::warn!(code, multiplier, "ignoring invalid scale multiplier");
            return;
        }
        let Some(sub) = self.get_mut(code) else {
            return;
        };
        if let Some(scale_override) = params.scale {
            let current = sub.base_scale * sub.scale_multiplier;
            if (scale_override - current).abs() > SCALE_RECONCILE_EPS {
                return;
            }
        }
        sub.scale_multiplier = multiplier;
        sub.projector.set_scale(sub.base_scale * multiplier);
        self.bump();
    }

    /// Re-apply a freshly resolved parameter set to the live projector:
    /// center, rotation, parallels, precision, clip, and the scale
    /// multiplier. The translation offset is not touched here; it has its
    /// own mutator. Every numeric field is validated independently; a bad
    /// field keeps its prior value without blocking the rest. The effective
    /// scale is re-asserted last, unconditionally: several families reset
    /// their internal scale state when rotation or center changes.
    pub fn update_parameters(&mut self, code: &str, params: &Parameters) {
        let Some(sub) = self.get_mut(code) else {
            return;
        };

        if let Some(center) = params.center {
            if finite2(center) {
                sub.projector.set_center(center);
            } else {
                tracing::warn!(code, "skipping non-finite center");
            }
        }
        if let Some(rotate) = params.rotate {
            if finite3(rotate) {
                sub.projector.set_rotate(rotate);
            } else {
                tracing::warn!(code, "skipping non-finite rotation");
            }
        }
        if let Some(parallels) = params.parallels {
            if finite2(parallels) {
                sub.projector.set_parallels(parallels);
            } else {
                tracing::warn!(code, "skipping non-finite parallels");
            }
        }
        if let Some(precision) = params.precision {
            if precision.is_finite() && precision >= 0.0 {
                sub.projector.set_precision(precision);
            } else {
                tracing::warn!(code, precision, "skipping invalid precision");
            }
        }
        if let Some(angle) = params.clip_angle {
            if angle.is_finite() && angle > 0.0 {
                sub.projector.set_clip_angle(Some(angle));
            } else {
                tracing::warn!(code, angle, "skipping invalid clip angle");
            }
        }
        if let Some(clip) = params.pixel_clip_extent {
            if clip.is_valid() {
                sub.pixel_clip = Some(clip);
            } else {
                tracing::warn!(code, "skipping invalid pixel clip extent");
            }
        }
        if let Some(multiplier) = params.scale_multiplier {
            if multiplier.is_finite() && multiplier > 0.0 {
                sub.scale_multiplier = multiplier;
            } else {
                tracing::warn!(code, multiplier, "skipping invalid scale multiplier");
            }
        }

        // Mandatory, not an optimization: see the method doc.
        sub.projector
            .set_scale(sub.base_scale * sub.scale_multiplier);
        self.bump();
    }

    /// Rebase every territory onto a new shared reference scale, preserving
    /// multipliers.
    pub fn set_reference_scale(&mut self, reference_scale: f64) {
        if !reference_scale.is_finite() || reference_scale <= 0.0 {
            tracing::warn!(reference_scale, "ignoring invalid reference scale");
            return;
        }
        self.reference_scale = reference_scale;
        for sub in &mut self.subs {
            sub.base_scale = reference_scale * sub.config_multiplier;
            sub.projector
                .set_scale(sub.base_scale * sub.scale_multiplier);
        }
        self.bump();
    }
}

fn default_family_id(role: TerritoryRole) -> &'static str {
    match role {
        TerritoryRole::Primary => Family::ConicConformal.id(),
        TerritoryRole::Secondary => Family::Mercator.id(),
    }
}

/// Initial positioning: anchor the projector on the resolved center (or
/// explicit rotation), deriving conic parallels from the anchor latitude
/// when none are given.
fn apply_positioning(
    projector: &mut Projector,
    descriptor: &TerritoryDescriptor,
    params: &Parameters,
) {
    let center = params.center.unwrap_or(descriptor.center);
    let family = projector.family();

    match family {
        Family::AzimuthalEqualArea | Family::AzimuthalEquidistant => {
            let rotate = params
                .rotate
                .unwrap_or([-center[0], -center[1], 0.0]);
            projector.set_rotate(rotate);
            projector.set_center([0.0, 0.0]);
        }
        _ => {
            projector.set_center(center);
            if let Some(rotate) = params.rotate {
                projector.set_rotate(rotate);
            }
        }
    }

    if family.supports_parallels() {
        let parallels = params
            .parallels
            .unwrap_or([center[1] - 2.0, center[1] + 2.0]);
        projector.set_parallels(parallels);
    }
}

/// Translate positioning parameters between family groups: the focus always
/// carries over; parallels carry between conics and are otherwise derived
/// from the focus latitude; a clip angle only survives between azimuthals.
fn carry_parameters(source: &FamilyParameters, target: Family) -> FamilyParameters {
    let focus = source.focus();
    match target {
        Family::ConicConformal | Family::ConicEqualArea => {
            let parallels = match *source {
                FamilyParameters::Conic { parallels, .. } => parallels,
                _ => [focus.latitude - 2.0, focus.latitude + 2.0],
            };
            FamilyParameters::Conic { focus, parallels }
        }
        Family::AzimuthalEqualArea | Family::AzimuthalEquidistant => {
            let clip_angle = match *source {
                FamilyParameters::Azimuthal { clip_angle, .. } => clip_angle,
                _ => None,
            };
            FamilyParameters::Azimuthal { focus, clip_angle }
        }
        Family::Mercator | Family::Equirectangular => FamilyParameters::Cylindrical { focus },
    }
}

fn finite2(v: [f64; 2]) -> bool {
    v[0].is_finite() && v[1].is_finite()
}

fn finite3(v: [f64; 3]) -> bool {
    v[0].is_finite() && v[1].is_finite() && v[2].is_finite()
}

#[cfg(test)]
mod tests {
    use super::{SubProjectionManager, SCALE_RECONCILE_EPS};
    use crate::params::Parameters;
    use crate::territory::{TerritoryDescriptor, TerritoryRole};
    use foundation::bounds::GeoBounds;
    use projection::families::Family;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn mainland() -> TerritoryDescriptor {
        TerritoryDescriptor::new(
            "fr",
            "France métropolitaine",
            [2.5, 46.5],
            GeoBounds::new([-5.0, 41.0], [10.0, 51.0]),
            [0.0, 0.0],
        )
    }

    fn resolved(multiplier: f64) -> Parameters {
        Parameters {
            scale_multiplier: Some(multiplier),
            ..Parameters::default()
        }
    }

    fn manager_with_mainland() -> SubProjectionManager {
        let mut manager = SubProjectionManager::new(2700.0);
        manager.add_or_replace(TerritoryRole::Primary, &mainland(), &resolved(1.0));
        manager
    }

    #[test]
    fn add_resolves_role_default_family() {
        let manager = manager_with_mainland();
        let sub = manager.get("fr").unwrap();
        assert_eq!(sub.projector().family(), Family::ConicConformal);
        assert_eq!(sub.base_scale(), 2700.0);
        assert_eq!(sub.effective_scale(), 2700.0);
        // parallels derived from the anchor latitude
        assert_eq!(sub.projector().parallels(), Some([44.5, 48.5]));
    }

    #[test]
    fn replace_keeps_composition_position() {
        let mut manager = manager_with_mainland();
        let overseas = TerritoryDescriptor::new(
            "gp",
            "Guadeloupe",
            [-61.46, 16.14],
            GeoBounds::new([-62.0, 15.0], [-61.0, 17.0]),
            [-324.0, -38.0],
        );
        manager.add_or_replace(TerritoryRole::Secondary, &overseas, &resolved(1.0));
        manager.add_or_replace(TerritoryRole::Primary, &mainland(), &resolved(2.0));
        let order: Vec<_> = manager.iter().map(|s| s.code().to_string()).collect();
        assert_eq!(order, vec!["fr".to_string(), "gp".to_string()]);
        assert_eq!(manager.get("fr").unwrap().scale_multiplier(), 2.0);
    }

    #[test]
    fn scale_updates_never_accumulate() {
        let mut manager = manager_with_mainland();
        let params = Parameters::default();
        for _ in 0..50 {
            manager.update_scale("fr", 1.25, &params);
        }
        let once = 2700.0 * 1.25;
        assert_eq!(manager.get("fr").unwrap().projector().scale(), once);
        assert_eq!(manager.get("fr").unwrap().effective_scale(), once);
    }

    #[test]
    fn absolute_scale_override_blocks_multiplier_update() {
        let mut manager = manager_with_mainland();
        let params = Parameters {
            scale: Some(4000.0),
            ..Parameters::default()
        };
        manager.update_scale("fr", 3.0, &params);
        // override disagrees with base * multiplier, so nothing changed
        assert_eq!(manager.get("fr").unwrap().scale_multiplier(), 1.0);
        assert_eq!(manager.get("fr").unwrap().projector().scale(), 2700.0);
    }

    #[test]
    fn agreeing_scale_override_lets_multiplier_through() {
        let mut manager = manager_with_mainland();
        let params = Parameters {
            scale: Some(2700.0),
            ..Parameters::default()
        };
        manager.update_scale("fr", 1.5, &params);
        assert_eq!(manager.get("fr").unwrap().scale_multiplier(), 1.5);
    }

    #[test]
    fn family_switch_preserves_scale_and_anchor() {
        let mut manager = manager_with_mainland();
        manager.update_scale("fr", 1.4, &Parameters::default());
        manager.update_projection_family("fr", "mercator");

        let sub = manager.get("fr").unwrap();
        assert_eq!(sub.projector().family(), Family::Mercator);
        assert_close(sub.projector().scale(), 2700.0 * 1.4, 1e-9);
        assert_eq!(sub.projector().center(), [2.5, 46.5]);
        // base * multiplier still matches, so base_scale was not touched
        assert_close(sub.base_scale(), 2700.0, 1e-9);
    }

    #[test]
    fn family_switch_to_conic_derives_parallels() {
        let mut manager = manager_with_mainland();
        manager.update_projection_family("fr", "mercator");
        manager.update_projection_family("fr", "conic-equal-area");
        let sub = manager.get("fr").unwrap();
        assert_eq!(sub.projector().family(), Family::ConicEqualArea);
        assert_eq!(sub.projector().parallels(), Some([44.5, 48.5]));
    }

    #[test]
    fn repeated_family_switches_do_not_drift_scale() {
        let mut manager = manager_with_mainland();
        manager.update_scale("fr", 1.3, &Parameters::default());
        let expected = 2700.0 * 1.3;
        for _ in 0..12 {
            manager.update_projection_family("fr", "mercator");
            manager.update_projection_family("fr", "conic-conformal");
        }
        let sub = manager.get("fr").unwrap();
        assert_close(sub.projector().scale(), expected, SCALE_RECONCILE_EPS);
        // a later multiplier edit still lands where it should
        manager.update_scale("fr", 1.0, &Parameters::default());
        assert_close(
            manager.get("fr").unwrap().projector().scale(),
            2700.0,
            SCALE_RECONCILE_EPS,
        );
    }

    #[test]
    fn update_parameters_validates_per_field() {
        let mut manager = manager_with_mainland();
        let params = Parameters {
            center: Some([f64::NAN, 46.5]),
            precision: Some(0.5),
            scale_multiplier: Some(2.0),
            ..Parameters::default()
        };
        manager.update_parameters("fr", &params);
        let sub = manager.get("fr").unwrap();
        // bad center skipped, good fields applied
        assert_eq!(sub.projector().center(), [2.5, 46.5]);
        assert_eq!(sub.projector().precision(), 0.5);
        assert_eq!(sub.projector().scale(), 2700.0 * 2.0);
    }

    #[test]
    fn update_parameters_reasserts_effective_scale() {
        let mut manager = manager_with_mainland();
        let params = Parameters {
            rotate: Some([-2.0, 1.0, 0.0]),
            ..Parameters::default()
        };
        manager.update_parameters("fr", &params);
        assert_eq!(manager.get("fr").unwrap().projector().scale(), 2700.0);
    }

    #[test]
    fn unknown_code_is_a_no_op() {
        let mut manager = manager_with_mainland();
        let before = manager.generation();
        manager.update_translation_offset("xx", [1.0, 2.0]);
        manager.update_scale("xx", 2.0, &Parameters::default());
        manager.update_projection_family("xx", "mercator");
        assert_eq!(manager.generation(), before);
    }

    #[test]
    fn reference_scale_rebase_preserves_multipliers() {
        let mut manager = manager_with_mainland();
        manager.update_scale("fr", 1.5, &Parameters::default());
        manager.set_reference_scale(5400.0);
        let sub = manager.get("fr").unwrap();
        assert_eq!(sub.base_scale(), 5400.0);
        assert_eq!(sub.scale_multiplier(), 1.5);
        assert_eq!(sub.projector().scale(), 5400.0 * 1.5);
    }

    #[test]
    fn mutations_advance_the_generation() {
        let mut manager = manager_with_mainland();
        let g0 = manager.generation();
        manager.update_translation_offset("fr", [5.0, -3.0]);
        let g1 = manager.generation();
        assert!(g1 > g0);
        manager.update_scale("fr", 1.1, &Parameters::default());
        assert!(manager.generation() > g1);
    }
}
