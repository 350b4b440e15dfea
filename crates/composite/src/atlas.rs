//! The composite atlas: configuration, parameter resolution, sub-projection
//! state, and the memoized composite build, behind one facade.

use foundation::bounds::{GeoBounds, PixelRect};
use projection::factory::ProjectionRegistry;

use crate::builder::{CompositeProjection, TerritoryFrame};
use crate::params::{ParameterProvider, ParameterResolver, Parameters};
use crate::subprojection::SubProjectionManager;
use crate::territory::{CompositeConfig, TerritoryDescriptor, TerritoryRole};

#[derive(Debug)]
struct BuildCache {
    generation: u64,
    width: f64,
    height: f64,
    composite: CompositeProjection,
}

/// One exportable territory snapshot, as consumed by the serializer.
#[derive(Debug, Clone, PartialEq)]
pub struct TerritoryExport {
    pub code: String,
    pub name: String,
    pub family_id: String,
    pub parameters: Parameters,
    pub translate_offset: [f64; 2],
    pub pixel_clip_extent: Option<PixelRect>,
    pub bounds: GeoBounds,
}

pub struct CompositeAtlas {
    config: CompositeConfig,
    resolver: ParameterResolver,
    manager: SubProjectionManager,
    cache: Option<BuildCache>,
}

impl std::fmt::Debug for CompositeAtlas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeAtlas")
            .field("territories", &self.manager.len())
            .field("reference_scale", &self.manager.reference_scale())
            .field("generation", &self.manager.generation())
            .finish()
    }
}

impl CompositeAtlas {
    /// Initialize every sub-projection from the config plus resolved
    /// defaults. The provider is optional; without it the engine runs on
    /// config defaults alone.
    pub fn new(
        config: CompositeConfig,
        reference_scale: f64,
        provider: Option<Box<dyn ParameterProvider>>,
    ) -> Self {
        let resolver = ParameterResolver::new(provider);
        let mut manager = SubProjectionManager::new(reference_scale);
        for (role, descriptor) in config.territories() {
            let params = resolver.effective(descriptor);
            manager.add_or_replace(role, descriptor, &params);
        }
        Self {
            config,
            resolver,
            manager,
            cache: None,
        }
    }

    pub fn config(&self) -> &CompositeConfig {
        &self.config
    }

    pub fn manager(&self) -> &SubProjectionManager {
        &self.manager
    }

    pub fn registry(&self) -> &ProjectionRegistry {
        self.manager.registry()
    }

    pub fn registry_mut(&mut self) -> &mut ProjectionRegistry {
        self.manager.registry_mut()
    }

    pub fn reference_scale(&self) -> f64 {
        self.manager.reference_scale()
    }

    pub fn has_provider(&self) -> bool {
        self.resolver.has_provider()
    }

    /// The memoized composite. Rebuilt only when a mutation advanced the
    /// generation, the canvas changed, or `force` is set; otherwise the
    /// cached instance is returned unchanged.
    pub fn build(&mut self, width: f64, height: f64, force: bool) -> &CompositeProjection {
        let generation = self.manager.generation();
        let reusable = !force
            && self.cache.as_ref().map_or(false, |c| {
                c.generation == generation && c.width == width && c.height == height
            });
        if !reusable {
            self.cache = None;
        }
        let manager = &self.manager;
        let cache = self.cache.get_or_insert_with(|| BuildCache {
            generation,
            width,
            height,
            composite: CompositeProjection::assemble(manager, width, height),
        });
        &cache.composite
    }

    /// Insert or replace one territory without rebuilding the others.
    pub fn add_or_replace(&mut self, role: TerritoryRole, descriptor: TerritoryDescriptor) {
        let params = self.resolver.effective(&descriptor);
        self.manager.add_or_replace(role, &descriptor, &params);
        self.config.upsert(role, descriptor);
    }

    pub fn update_projection_family(&mut self, code: &str, family_id: &str) {
        self.manager.update_projection_family(code, family_id);
    }

    pub fn update_translation_offset(&mut self, code: &str, offset: [f64; 2]) {
        self.manager.update_translation_offset(code, offset);
    }

    pub fn update_scale(&mut self, code: &str, multiplier: f64) {
        let params = self.effective_for(code).unwrap_or_default();
        self.manager.update_scale(code, multiplier, &params);
    }

    /// Re-pull effective parameters for one territory and re-apply them to
    /// its live projector.
    pub fn update_parameters(&mut self, code: &str) {
        let Some(params) = self.effective_for(code) else {
            tracing::warn!(code, "no territory config, parameters not updated");
            return;
        };
        self.manager.update_parameters(code, &params);
    }

    pub fn set_reference_scale(&mut self, reference_scale: f64) {
        self.manager.set_reference_scale(reference_scale);
    }

    /// Inset frames for the non-primary territories.
    pub fn composition_borders(&mut self, width: f64, height: f64) -> Vec<TerritoryFrame> {
        self.build(width, height, false).borders()
    }

    /// Per-territory snapshot for persistence. Provider parameters are
    /// preferred; fields the provider does not carry are read directly from
    /// the projector record, so the export is complete either way.
    pub fn export_config(&self) -> Vec<TerritoryExport> {
        self.manager
            .iter()
            .map(|sub| {
                let instance = self.instance_parameters(sub.code());
                let parameters = match self.resolver.exportable(sub.code()) {
                    Some(provided) => provided.over(instance),
                    None => instance,
                };
                let offset = sub.translate_offset();
                TerritoryExport {
                    code: sub.code().to_string(),
                    name: sub.name().to_string(),
                    family_id: sub.family_id().to_string(),
                    parameters,
                    translate_offset: [offset.x, offset.y],
                    pixel_clip_extent: sub.pixel_clip(),
                    bounds: sub.bounds(),
                }
            })
            .collect()
    }

    fn effective_for(&self, code: &str) -> Option<Parameters> {
        self.config
            .find(code)
            .map(|(_, descriptor)| self.resolver.effective(descriptor))
    }

    /// Fallback parameter read from the live projector record, for
    /// standalone use without a parameter layer.
    fn instance_parameters(&self, code: &str) -> Parameters {
        let Some(sub) = self.manager.get(code) else {
            return Parameters::default();
        };
        let projector = sub.projector();
        let offset = sub.translate_offset();
        Parameters {
            center: Some(projector.center()),
            rotate: Some(projector.rotate()),
            parallels: projector.parallels(),
            scale: Some(projector.scale()),
            scale_multiplier: Some(sub.scale_multiplier()),
            translate_offset: Some([offset.x, offset.y]),
            pixel_clip_extent: sub.pixel_clip(),
            clip_angle: projector.clip_angle(),
            precision: Some(projector.precision()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CompositeAtlas;
    use crate::territory::{CompositeConfig, NormalizedClip, TerritoryDescriptor};
    use foundation::bounds::GeoBounds;
    use foundation::math::Vec2;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn france_config() -> CompositeConfig {
        let mainland = TerritoryDescriptor::new(
            "fr",
            "France métropolitaine",
            [2.5, 46.5],
            GeoBounds::new([-5.0, 41.0], [10.0, 51.0]),
            [0.0, 0.0],
        );
        let guadeloupe = TerritoryDescriptor::new(
            "gp",
            "Guadeloupe",
            [-61.46, 16.14],
            GeoBounds::new([-62.0, 15.0], [-61.0, 17.0]),
            [-324.0, -38.0],
        );
        CompositeConfig::single_focus(mainland, vec![guadeloupe])
    }

    fn france_atlas() -> CompositeAtlas {
        CompositeAtlas::new(france_config(), 2700.0, None)
    }

    #[test]
    fn forward_routes_to_the_owning_territory() {
        let mut atlas = france_atlas();
        let composite = atlas.build(800.0, 600.0, false);

        // mainland anchor lands at canvas center
        let p = composite.project(2.5, 46.5).expect("inside mainland");
        assert_close(p.x, 400.0, 1e-9);
        assert_close(p.y, 300.0, 1e-9);

        // overseas anchor lands at center + offset
        let p = composite.project(-61.46, 16.14).expect("inside overseas");
        assert_close(p.x, 400.0 - 324.0, 1e-9);
        assert_close(p.y, 300.0 - 38.0, 1e-9);
    }

    #[test]
    fn forward_misses_outside_all_bounds() {
        let mut atlas = france_atlas();
        let composite = atlas.build(800.0, 600.0, false);
        assert_eq!(composite.project(0.0, 0.0), None);
    }

    #[test]
    fn inverse_round_trips_interior_points() {
        let mut atlas = france_atlas();
        let composite = atlas.build(800.0, 600.0, false);
        for &(lon, lat) in &[(2.5, 46.5), (-1.5, 43.2), (7.0, 48.9), (-61.4, 16.0)] {
            let screen = composite.project(lon, lat).expect("inside a territory");
            let (lon2, lat2) = composite.invert(screen).expect("invertible");
            assert_close(lon2, lon, 0.01);
            assert_close(lat2, lat, 0.01);
        }
    }

    #[test]
    fn translation_moves_one_territory_only() {
        let mut atlas = france_atlas();
        let before_gp = atlas
            .build(800.0, 600.0, false)
            .project(-61.46, 16.14)
            .unwrap();
        let before_fr = atlas.build(800.0, 600.0, false).project(2.5, 46.5).unwrap();

        atlas.update_translation_offset("gp", [-300.0, -20.0]);
        let composite = atlas.build(800.0, 600.0, false);
        let after_gp = composite.project(-61.46, 16.14).unwrap();
        let after_fr = composite.project(2.5, 46.5).unwrap();

        assert_close(after_gp.x - before_gp.x, 24.0, 1e-9);
        assert_close(after_gp.y - before_gp.y, 18.0, 1e-9);
        assert_eq!(after_fr, before_fr);
    }

    #[test]
    fn build_is_memoized_on_the_generation() {
        let mut atlas = france_atlas();
        let g1 = atlas.build(800.0, 600.0, false).generation();
        let g2 = atlas.build(800.0, 600.0, false).generation();
        assert_eq!(g1, g2, "untouched build must be reused");

        atlas.update_scale("gp", 1.2);
        let g3 = atlas.build(800.0, 600.0, false).generation();
        assert!(g3 > g1, "mutation must invalidate the cache");
    }

    #[test]
    fn stale_composites_are_never_returned() {
        let mut atlas = france_atlas();
        let before = atlas
            .build(800.0, 600.0, false)
            .project(-61.46, 16.14)
            .unwrap();
        atlas.update_translation_offset("gp", [-200.0, -38.0]);
        let after = atlas
            .build(800.0, 600.0, false)
            .project(-61.46, 16.14)
            .unwrap();
        assert_close(after.x, 200.0, 1e-9);
        assert_ne!(before, after);
    }

    #[test]
    fn canvas_change_invalidates_the_cache() {
        let mut atlas = france_atlas();
        let a = atlas.build(800.0, 600.0, false).clone();
        let b = atlas.build(1024.0, 768.0, false);
        assert_close(b.project(2.5, 46.5).unwrap().x, 512.0, 1e-9);
        assert_close(a.project(2.5, 46.5).unwrap().x, 400.0, 1e-9);
    }

    #[test]
    fn borders_exclude_the_mainland() {
        let mut atlas = france_atlas();
        let frames = atlas.composition_borders(800.0, 600.0);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].code, "gp");
        // the frame sits left and above canvas center
        assert!(frames[0].rect.max[0] < 400.0);
        assert!(frames[0].rect.min[1] < 300.0);
    }

    #[test]
    fn normalized_clip_scales_with_territory_scale() {
        let mut config = france_config();
        config.overseas[0].clip_extent = Some(NormalizedClip {
            x1: -0.02,
            y1: -0.02,
            x2: 0.02,
            y2: 0.02,
        });
        let mut atlas = CompositeAtlas::new(config, 2700.0, None);
        let composite = atlas.build(800.0, 600.0, false);
        let entry = composite
            .entries()
            .iter()
            .find(|e| e.code() == "gp")
            .unwrap();
        let clip = entry.clip().expect("explicit clip resolved");
        let t = entry.projector().translate();
        assert_close(clip.min[0], t.x - 0.02 * 2700.0, 1e-9);
        assert_close(clip.max[1], t.y + 0.02 * 2700.0, 1e-9);
    }

    #[test]
    fn scale_update_keeps_anchor_pinned() {
        let mut atlas = france_atlas();
        let before = atlas.build(800.0, 600.0, false).project(2.5, 46.5).unwrap();
        atlas.update_scale("fr", 1.8);
        let after = atlas.build(800.0, 600.0, false).project(2.5, 46.5).unwrap();
        assert_eq!(before, Vec2::new(400.0, 300.0));
        assert_eq!(after, before);
    }

    #[test]
    fn family_switch_keeps_screen_position() {
        let mut atlas = france_atlas();
        let before = atlas.build(800.0, 600.0, false).project(2.5, 46.5).unwrap();
        atlas.update_projection_family("fr", "azimuthal-equal-area");
        let after = atlas.build(800.0, 600.0, false).project(2.5, 46.5).unwrap();
        assert_close(after.x, before.x, 1e-6);
        assert_close(after.y, before.y, 1e-6);
    }

    #[test]
    fn territories_can_be_added_live() {
        let mut atlas = france_atlas();
        let martinique = TerritoryDescriptor::new(
            "mq",
            "Martinique",
            [-61.0, 14.65],
            GeoBounds::new([-61.3, 14.3], [-60.8, 15.0]),
            [-324.0, 72.0],
        );
        atlas.add_or_replace(crate::territory::TerritoryRole::Secondary, martinique);
        let composite = atlas.build(800.0, 600.0, false);
        let p = composite.project(-61.0, 14.65).expect("inside new territory");
        assert_close(p.x, 400.0 - 324.0, 1e-9);
        assert_close(p.y, 300.0 + 72.0, 1e-9);
    }

    #[test]
    fn registered_families_work_through_updates() {
        use projection::families::Family;

        let mut atlas = france_atlas();
        atlas
            .registry_mut()
            .register("lambert-93", Family::ConicConformal);
        atlas.update_projection_family("gp", "lambert-93");
        let sub = atlas.manager().get("gp").unwrap();
        assert_eq!(sub.family_id(), "lambert-93");
        assert_eq!(sub.projector().family(), Family::ConicConformal);
        // switching into a conic derives parallels from the carried anchor
        assert_eq!(
            sub.projector().parallels(),
            Some([16.14 - 2.0, 16.14 + 2.0])
        );
    }

    #[test]
    fn routing_ignores_overlapping_clip_extents() {
        // Park the overseas inset right on top of the mainland so the two
        // clip extents overlap on screen.
        let mut atlas = france_atlas();
        atlas.update_translation_offset("gp", [0.0, 0.0]);
        let composite = atlas.build(800.0, 600.0, false);

        let p = composite.project(-61.46, 16.14).expect("inside overseas");
        assert_close(p.x, 400.0, 1e-9);
        assert_close(p.y, 300.0, 1e-9);
        // a mainland point still routes to the mainland
        let (lon, lat) = composite.invert(Vec2::new(400.0, 300.0)).expect("invertible");
        assert_close(lon, 2.5, 0.01);
        assert_close(lat, 46.5, 0.01);
    }

    #[test]
    fn equal_members_have_no_inset_borders() {
        let germany = TerritoryDescriptor::new(
            "de",
            "Deutschland",
            [10.0, 51.0],
            GeoBounds::new([5.0, 47.0], [15.0, 55.0]),
            [120.0, 0.0],
        );
        let france = TerritoryDescriptor::new(
            "fr",
            "France",
            [2.5, 46.5],
            GeoBounds::new([-5.0, 41.0], [10.0, 51.0]),
            [-120.0, 0.0],
        );
        let mut atlas = CompositeAtlas::new(
            CompositeConfig::equal_members(vec![france, germany]),
            2700.0,
            None,
        );
        assert!(atlas.composition_borders(800.0, 600.0).is_empty());
        // both members carry the mainland default family
        for sub in atlas.manager().iter() {
            assert_eq!(sub.family_id(), "conic-conformal");
        }
    }

    #[test]
    fn export_config_reads_instance_without_provider() {
        let atlas = france_atlas();
        let exports = atlas.export_config();
        assert_eq!(exports.len(), 2);
        let fr = &exports[0];
        assert_eq!(fr.code, "fr");
        assert_eq!(fr.family_id, "conic-conformal");
        assert_eq!(fr.parameters.center, Some([2.5, 46.5]));
        assert_eq!(fr.parameters.scale, Some(2700.0));
        assert_eq!(fr.parameters.scale_multiplier, Some(1.0));
        assert_eq!(fr.translate_offset, [0.0, 0.0]);
    }
}
