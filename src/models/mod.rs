mod assessment;

pub use assessment::{
    AmenityAudit, AssessmentResult, CopyStats, HeuristicResult, Impact, PhotoStats,
    SectionScores, TopFix, TrustSignals,
};

use serde::{Deserialize, Serialize};

/// Metadata for a single gallery photo
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PhotoMeta {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Resolved caption; `None` when only generic "Image N" labels were found
    pub alt: Option<String>,
    pub srcset: Vec<String>,
}

impl PhotoMeta {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = Some(alt.into());
        self
    }
}

/// Raw artifacts kept around when a render is run with debugging enabled
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DebugArtifacts {
    pub raw_html: String,
    pub photo_modal_html: Option<String>,
    pub amenities_modal_html: Option<String>,
    pub amenities_items: Vec<String>,
    pub preloaded_state: Option<serde_json::Value>,
    pub responses: Vec<String>,
}

impl DebugArtifacts {
    pub fn has_photo_modal(&self) -> bool {
        self.photo_modal_html.is_some()
    }

    pub fn has_amenities_modal(&self) -> bool {
        self.amenities_modal_html.is_some()
    }

    pub fn has_preloaded_state(&self) -> bool {
        self.preloaded_state.is_some()
    }
}

/// Structured snapshot of one rendered listing page.
///
/// Built once per render and never mutated afterwards; the heuristics engine
/// only ever borrows it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ListingContent {
    pub url: String,
    pub title: String,
    pub summary: String,
    pub description: String,
    pub full_text: String,
    pub amenities_listed: Vec<String>,
    pub house_rules: Vec<String>,
    pub reviews: Vec<String>,
    pub photos: Vec<PhotoMeta>,
    pub uses_legacy_gallery: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugArtifacts>,
}

impl ListingContent {
    /// Empty content for `url`, handy as a base for struct-update syntax
    pub fn empty(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}
