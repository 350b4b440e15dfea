//! The assembled composite projection.
//!
//! Assembly positions every sub-projection's screen origin relative to the
//! canvas center, resolves each territory's pixel clip, and exposes one
//! forward projection, one inverse projection, and one multiplexed geometry
//! stream over the whole set.

use foundation::bounds::{GeoBounds, PixelRect};
use foundation::math::Vec2;
use projection::projector::Projector;
use projection::stream::{GeometrySink, PointCapture, ProjectedSink};

use crate::subprojection::{SubProjection, SubProjectionManager};
use crate::territory::TerritoryRole;

/// Degrees shaved off bounds corners before projecting them for the default
/// clip, keeping the corner clear of numerical edge singularities.
pub const CLIP_INSET_DEG: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeEntry {
    code: String,
    projector: Projector,
    bounds: GeoBounds,
    clip: Option<PixelRect>,
    role: TerritoryRole,
}

impl CompositeEntry {
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    pub fn bounds(&self) -> GeoBounds {
        self.bounds
    }

    pub fn clip(&self) -> Option<PixelRect> {
        self.clip
    }

    pub fn role(&self) -> TerritoryRole {
        self.role
    }
}

/// Screen-space frame of one inset territory, for drawing its border.
#[derive(Debug, Clone, PartialEq)]
pub struct TerritoryFrame {
    pub code: String,
    pub rect: PixelRect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeProjection {
    width: f64,
    height: f64,
    generation: u64,
    entries: Vec<CompositeEntry>,
}

impl CompositeProjection {
    pub(crate) fn assemble(manager: &SubProjectionManager, width: f64, height: f64) -> Self {
        let center = Vec2::new(width / 2.0, height / 2.0);
        let entries = manager
            .iter()
            .map(|sub| {
                let mut projector = sub.projector().clone();
                // Absolute position first: clip extents are computed in
                // final screen space.
                projector.set_translate(center + sub.translate_offset());
                let clip = resolve_clip(sub, &projector);
                projector.set_clip_extent(clip);
                CompositeEntry {
                    code: sub.code().to_string(),
                    projector,
                    bounds: sub.bounds(),
                    clip,
                    role: sub.role(),
                }
            })
            .collect();
        Self {
            width,
            height,
            generation: manager.generation(),
            entries,
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// The manager generation this composite was assembled from.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn entries(&self) -> &[CompositeEntry] {
        &self.entries
    }

    /// Forward projection. The point is routed to the first territory (in
    /// composition order) whose geographic bounds contain it and run through
    /// that territory's rendering stream; `None` means the point is outside
    /// the atlas's coverage, which is an expected outcome. Clip extents do
    /// not participate in routing.
    pub fn project(&self, lon: f64, lat: f64) -> Option<Vec2> {
        let entry = self.entries.iter().find(|e| e.bounds.contains(lon, lat))?;
        let mut capture = PointCapture::new();
        {
            let mut sink = ProjectedSink::with_clip(&entry.projector, None, &mut capture);
            sink.point(lon, lat);
        }
        capture.take()
    }

    /// Inverse projection.
    ///
    /// Ordering contract: every invertible sub-projection is tried in
    /// composition order, and the first whose inversion lands inside its own
    /// geographic bounds wins. When two territories' clip extents overlap on
    /// screen, geography (not screen position) disambiguates; ties between
    /// overlapping geographic bounds fall to insertion order.
    pub fn invert(&self, point: Vec2) -> Option<(f64, f64)> {
        for entry in &self.entries {
            if let Some((lon, lat)) = entry.projector.invert(point) {
                if entry.bounds.contains(lon, lat) {
                    return Some((lon, lat));
                }
            }
        }
        None
    }

    /// Multiplexed geometry stream: every event is broadcast to all
    /// sub-projections, so path generation renders the whole composite in
    /// one pass without per-territory iteration.
    pub fn stream<'a, S: GeometrySink>(&'a self, sink: &'a mut S) -> MultiplexSink<'a, S> {
        MultiplexSink {
            entries: &self.entries,
            sink,
        }
    }

    /// Screen-space frames of the non-primary territories, for drawing inset
    /// borders. Not intended for hit-testing. Territories left unclipped by
    /// a failed corner projection are skipped.
    pub fn borders(&self) -> Vec<TerritoryFrame> {
        self.entries
            .iter()
            .filter(|e| e.role == TerritoryRole::Secondary)
            .filter_map(|e| {
                e.clip.map(|rect| TerritoryFrame {
                    code: e.code.clone(),
                    rect,
                })
            })
            .collect()
    }
}

/// Resolve one territory's pixel clip, in priority order: an explicit pixel
/// rectangle from the parameter layer, then the config's normalized extent
/// scaled into screen space, then the projected geographic bounds. A corner
/// that fails to project leaves the territory unclipped rather than failing
/// the build.
fn resolve_clip(sub: &SubProjection, projector: &Projector) -> Option<PixelRect> {
    if let Some(rect) = sub.pixel_clip() {
        return Some(rect);
    }
    if let Some(nc) = sub.normalized_clip() {
        let t = projector.translate();
        let k = projector.scale();
        return Some(PixelRect::from_corners(
            Vec2::new(t.x + nc.x1 * k, t.y + nc.y1 * k),
            Vec2::new(t.x + nc.x2 * k, t.y + nc.y2 * k),
        ));
    }

    let bounds = sub.bounds();
    let tl = bounds.top_left(CLIP_INSET_DEG);
    let br = bounds.bottom_right(CLIP_INSET_DEG);
    match (
        projector.project(tl[0], tl[1]),
        projector.project(br[0], br[1]),
    ) {
        (Some(a), Some(b)) => Some(PixelRect::from_corners(a, b)),
        _ => {
            tracing::warn!(
                code = sub.code(),
                "bounds corner failed to project, territory renders unclipped"
            );
            None
        }
    }
}

/// Broadcasts every stream event to each sub-projection's projecting,
/// clip-aware stream; all of them feed the same downstream sink.
pub struct MultiplexSink<'a, S: GeometrySink> {
    entries: &'a [CompositeEntry],
    sink: &'a mut S,
}

impl<S: GeometrySink> GeometrySink for MultiplexSink<'_, S> {
    fn point(&mut self, lon: f64, lat: f64) {
        for entry in self.entries {
            let mut projected =
                ProjectedSink::with_clip(&entry.projector, entry.clip, self.sink);
            projected.point(lon, lat);
        }
    }

    fn line_start(&mut self) {
        for _ in self.entries {
            self.sink.line_start();
        }
    }

    fn line_end(&mut self) {
        for _ in self.entries {
            self.sink.line_end();
        }
    }

    fn polygon_start(&mut self) {
        for _ in self.entries {
            self.sink.polygon_start();
        }
    }

    fn polygon_end(&mut self) {
        for _ in self.entries {
            self.sink.polygon_end();
        }
    }

    fn sphere(&mut self) {
        for _ in self.entries {
            self.sink.sphere();
        }
    }
}
