//! Geometry stream contract.
//!
//! Downstream path generation consumes projected geometry as a flat event
//! stream rather than materialized geometry, matching the conventional
//! forward/inverse/stream projection contract.

use foundation::bounds::PixelRect;
use foundation::math::Vec2;

use crate::projector::Projector;

pub trait GeometrySink {
    fn point(&mut self, x: f64, y: f64);
    fn line_start(&mut self);
    fn line_end(&mut self);
    fn polygon_start(&mut self);
    fn polygon_end(&mut self);
    fn sphere(&mut self) {}
}

/// Forward-projects every point through one projector before handing it to
/// the downstream sink. Points the projector cannot represent, and points
/// falling outside the clip rectangle, are dropped; all other events pass
/// through unchanged.
pub struct ProjectedSink<'a, S: GeometrySink> {
    projector: &'a Projector,
    clip: Option<PixelRect>,
    sink: &'a mut S,
}

impl<'a, S: GeometrySink> ProjectedSink<'a, S> {
    pub fn new(projector: &'a Projector, sink: &'a mut S) -> Self {
        let clip = projector.clip_extent();
        Self {
            projector,
            clip,
            sink,
        }
    }

    pub fn with_clip(projector: &'a Projector, clip: Option<PixelRect>, sink: &'a mut S) -> Self {
        Self {
            projector,
            clip,
            sink,
        }
    }
}

impl<S: GeometrySink> GeometrySink for ProjectedSink<'_, S> {
    fn point(&mut self, lon: f64, lat: f64) {
        let Some(p) = self.projector.project(lon, lat) else {
            return;
        };
        if let Some(clip) = self.clip
            && !clip.contains(p)
        {
            return;
        }
        self.sink.point(p.x, p.y);
    }

    fn line_start(&mut self) {
        self.sink.line_start();
    }

    fn line_end(&mut self) {
        self.sink.line_end();
    }

    fn polygon_start(&mut self) {
        self.sink.polygon_start();
    }

    fn polygon_end(&mut self) {
        self.sink.polygon_end();
    }

    fn sphere(&mut self) {
        self.sink.sphere();
    }
}

/// Records the last point that reached it. Used to pull a single projected
/// coordinate out of a rendering stream.
#[derive(Debug, Default)]
pub struct PointCapture {
    last: Option<Vec2>,
}

impl PointCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<Vec2> {
        self.last
    }

    pub fn take(&mut self) -> Option<Vec2> {
        self.last.take()
    }
}

impl GeometrySink for PointCapture {
    fn point(&mut self, x: f64, y: f64) {
        self.last = Some(Vec2::new(x, y));
    }

    fn line_start(&mut self) {}
    fn line_end(&mut self) {}
    fn polygon_start(&mut self) {}
    fn polygon_end(&mut self) {}
}
