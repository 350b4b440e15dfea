//! The portable atlas document.
//!
//! Round-trip fidelity is a hard requirement: every numeric field present in
//! the live state must survive a serialize/parse cycle unchanged, so the
//! document mirrors the engine's parameter set field for field and nothing
//! is defaulted away on write.

use serde::{Deserialize, Serialize};

pub const DOCUMENT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AtlasDocument {
    pub version: String,
    pub metadata: DocumentMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas_dimensions: Option<CanvasDimensions>,
    pub territories: Vec<TerritoryRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub atlas_id: String,
    pub atlas_name: String,
    pub export_date: String,
    pub created_with: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CanvasDimensions {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TerritoryRecord {
    pub code: String,
    pub name: String,
    pub projection: ProjectionRecord,
    pub layout: LayoutRecord,
    /// Geographic bounding box `[[min_lon, min_lat], [max_lon, max_lat]]`.
    pub bounds: [[f64; 2]; 2],
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionRecord {
    /// Identifier the projection was built from (may be an alias such as
    /// `albers`).
    pub id: String,
    /// Canonical family identifier.
    pub family: String,
    pub parameters: ParameterRecord,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParameterRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotate: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallels: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_angle: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRecord {
    pub translate_offset: [f64; 2],
    /// `[x1, y1, x2, y2]` in final screen pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_clip_extent: Option<[f64; 4]>,
}
