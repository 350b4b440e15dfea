//! Export: live engine state to the portable document.

use composite::atlas::CompositeAtlas;
use projection::families::Family;

use crate::document::{
    AtlasDocument, CanvasDimensions, DOCUMENT_VERSION, DocumentMetadata, LayoutRecord,
    ParameterRecord, ProjectionRecord, TerritoryRecord,
};

pub const CREATED_WITH: &str = "atlas-composer";

#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub atlas_id: String,
    pub atlas_name: String,
    /// Supplied by the caller; the engine does not read clocks.
    pub export_date: String,
    pub notes: Option<String>,
    pub canvas: Option<(f64, f64)>,
}

impl ExportOptions {
    pub fn new(
        atlas_id: impl Into<String>,
        atlas_name: impl Into<String>,
        export_date: impl Into<String>,
    ) -> Self {
        Self {
            atlas_id: atlas_id.into(),
            atlas_name: atlas_name.into(),
            export_date: export_date.into(),
            notes: None,
            canvas: None,
        }
    }
}

pub fn export_document(atlas: &CompositeAtlas, opts: &ExportOptions) -> AtlasDocument {
    let territories = atlas
        .export_config()
        .into_iter()
        .map(|t| {
            let family = canonical_family(atlas, &t.family_id);
            let p = t.parameters;
            TerritoryRecord {
                code: t.code,
                name: t.name,
                projection: ProjectionRecord {
                    id: t.family_id,
                    family,
                    parameters: ParameterRecord {
                        center: p.center,
                        rotate: p.rotate,
                        parallels: p.parallels,
                        scale: p.scale,
                        scale_multiplier: p.scale_multiplier,
                        clip_angle: p.clip_angle,
                        precision: p.precision,
                    },
                },
                layout: LayoutRecord {
                    translate_offset: t.translate_offset,
                    pixel_clip_extent: t
                        .pixel_clip_extent
                        .map(|r| [r.min[0], r.min[1], r.max[0], r.max[1]]),
                },
                bounds: [t.bounds.min, t.bounds.max],
            }
        })
        .collect();

    AtlasDocument {
        version: DOCUMENT_VERSION.to_string(),
        metadata: DocumentMetadata {
            atlas_id: opts.atlas_id.clone(),
            atlas_name: opts.atlas_name.clone(),
            export_date: opts.export_date.clone(),
            created_with: CREATED_WITH.to_string(),
            notes: opts.notes.clone(),
        },
        reference_scale: Some(atlas.reference_scale()),
        canvas_dimensions: opts
            .canvas
            .map(|(width, height)| CanvasDimensions { width, height }),
        territories,
    }
}

pub fn export_json(
    atlas: &CompositeAtlas,
    opts: &ExportOptions,
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&export_document(atlas, opts))
}

fn canonical_family(atlas: &CompositeAtlas, id: &str) -> String {
    if let Some(spec) = atlas.registry().spec(id) {
        return spec.family.id().to_string();
    }
    Family::from_id(id)
        .map(|f| f.id().to_string())
        .unwrap_or_else(|| id.to_string())
}
