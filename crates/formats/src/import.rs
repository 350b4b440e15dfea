//! Import: parse, validate, and reapply a portable document.
//!
//! Validation problems are collected, not thrown, so a caller can present
//! every error and warning at once. A successful import reconstructs a
//! composite atlas whose forward/inverse mapping matches the exporting
//! state.

use std::collections::{HashMap, HashSet};

use composite::atlas::CompositeAtlas;
use composite::params::{ParameterProvider, Parameters};
use composite::territory::{CompositeConfig, TerritoryDescriptor};
use foundation::bounds::{GeoBounds, PixelRect};
use projection::families::Family;

use crate::document::{AtlasDocument, DOCUMENT_VERSION, TerritoryRecord};

/// Used when a document predates the `referenceScale` field and no
/// territory carries enough data to derive one.
const FALLBACK_REFERENCE_SCALE: f64 = 2700.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub success: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

pub struct ImportOutcome {
    pub report: ImportReport,
    pub atlas: Option<CompositeAtlas>,
}

impl std::fmt::Debug for ImportOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportOutcome")
            .field("report", &self.report)
            .field("atlas", &self.atlas.is_some())
            .finish()
    }
}

pub fn import_json(json: &str) -> ImportOutcome {
    match serde_json::from_str::<AtlasDocument>(json) {
        Ok(document) => import_document(document),
        Err(e) => ImportOutcome {
            report: ImportReport {
                success: false,
                errors: vec![format!("failed to parse document: {e}")],
                warnings: Vec::new(),
            },
            atlas: None,
        },
    }
}

pub fn import_document(document: AtlasDocument) -> ImportOutcome {
    let mut report = validate(&document);
    if !report.errors.is_empty() {
        report.success = false;
        return ImportOutcome {
            report,
            atlas: None,
        };
    }

    let reference_scale = resolve_reference_scale(&document);
    let mut descriptors = document.territories.iter().map(descriptor_from_record);
    // Roles are not part of the portable document; the first territory
    // becomes the mainland on re-import.
    let Some(mainland) = descriptors.next() else {
        report.success = false;
        report
            .errors
            .push("document contains no territories".to_string());
        return ImportOutcome {
            report,
            atlas: None,
        };
    };
    let config = CompositeConfig::single_focus(mainland, descriptors.collect());

    let provider = DocumentParameterProvider::from_document(&document);
    let atlas = CompositeAtlas::new(config, reference_scale, Some(Box::new(provider)));

    report.success = true;
    ImportOutcome {
        report,
        atlas: Some(atlas),
    }
}

fn validate(document: &AtlasDocument) -> ImportReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if document.version != DOCUMENT_VERSION {
        errors.push(format!(
            "unsupported document version '{}' (expected '{DOCUMENT_VERSION}')",
            document.version
        ));
    }
    if document.territories.is_empty() {
        errors.push("document contains no territories".to_string());
    }
    if let Some(scale) = document.reference_scale {
        if !scale.is_finite() || scale <= 0.0 {
            errors.push(format!("invalid reference scale {scale}"));
        }
    }
    if let Some(canvas) = document.canvas_dimensions
        && (canvas.width <= 0.0 || canvas.height <= 0.0)
    {
        warnings.push(format!(
            "suspicious canvas dimensions {}x{}",
            canvas.width, canvas.height
        ));
    }

    let mut seen = HashSet::new();
    for territory in &document.territories {
        if territory.code.is_empty() {
            errors.push("territory with empty code".to_string());
            continue;
        }
        if !seen.insert(territory.code.as_str()) {
            errors.push(format!("duplicate territory code '{}'", territory.code));
        }
        let bounds = GeoBounds::new(territory.bounds[0], territory.bounds[1]);
        if !bounds.is_valid() {
            errors.push(format!(
                "territory '{}' has invalid bounds {:?}",
                territory.code, territory.bounds
            ));
        }
        if Family::from_id(&territory.projection.id).is_none() {
            warnings.push(format!(
                "territory '{}' uses unknown projection family '{}', it will fall back to mercator",
                territory.code, territory.projection.id
            ));
        }
        if let Some(multiplier) = territory.projection.parameters.scale_multiplier
            && multiplier <= 0.0
        {
            warnings.push(format!(
                "territory '{}' has non-positive scale multiplier {multiplier}",
                territory.code
            ));
        }
    }

    ImportReport {
        success: errors.is_empty(),
        errors,
        warnings,
    }
}

fn resolve_reference_scale(document: &AtlasDocument) -> f64 {
    if let Some(scale) = document.reference_scale {
        return scale;
    }
    // Derive from the first territory: its base scale is scale/multiplier.
    document
        .territories
        .first()
        .and_then(|t| {
            let p = &t.projection.parameters;
            match (p.scale, p.scale_multiplier) {
                (Some(s), Some(m)) if m > 0.0 => Some(s / m),
                (Some(s), None) => Some(s),
                _ => None,
            }
        })
        .unwrap_or(FALLBACK_REFERENCE_SCALE)
}

fn descriptor_from_record(record: &TerritoryRecord) -> TerritoryDescriptor {
    let bounds = GeoBounds::new(record.bounds[0], record.bounds[1]);
    let center = record
        .projection
        .parameters
        .center
        .unwrap_or_else(|| bounds.center());
    let mut descriptor = TerritoryDescriptor::new(
        record.code.clone(),
        record.name.clone(),
        center,
        bounds,
        record.layout.translate_offset,
    );
    descriptor.projection_family = Some(record.projection.id.clone());
    descriptor
}

/// Serves the imported per-territory parameters back to the engine through
/// the regular provider seam.
struct DocumentParameterProvider {
    parameters: HashMap<String, Parameters>,
}

impl DocumentParameterProvider {
    fn from_document(document: &AtlasDocument) -> Self {
        let parameters = document
            .territories
            .iter()
            .map(|t| {
                let p = &t.projection.parameters;
                let resolved = Parameters {
                    center: p.center,
                    rotate: p.rotate,
                    parallels: p.parallels,
                    scale: p.scale,
                    scale_multiplier: p.scale_multiplier,
                    translate_offset: Some(t.layout.translate_offset),
                    pixel_clip_extent: t
                        .layout
                        .pixel_clip_extent
                        .map(|c| PixelRect::new([c[0], c[1]], [c[2], c[3]])),
                    clip_angle: p.clip_angle,
                    precision: p.precision,
                };
                (t.code.clone(), resolved)
            })
            .collect();
        Self { parameters }
    }
}

impl ParameterProvider for DocumentParameterProvider {
    fn effective_parameters(&self, code: &str) -> Option<Parameters> {
        self.parameters.get(code).copied()
    }
}
