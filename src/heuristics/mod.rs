//! Deterministic listing scores.
//!
//! Four independent sections each start at 100 and lose fixed penalties for
//! the rubric conditions they violate. The result depends only on the
//! `ListingContent` and the matcher's state, so scoring the same content twice
//! gives the same answer.

pub mod amenities;
pub mod copy;
pub mod photos;
pub mod trust;

use crate::matcher::AmenityMatcher;
use crate::models::{HeuristicResult, ListingContent, SectionScores, TopFix};
use tracing::debug;

pub use photos::{resolve_legacy_gallery, LEGACY_MIN_GENERIC_PHOTOS};

/// Fixes kept after ranking
pub const MAX_TOP_FIXES: usize = 5;

/// One scored section: its diagnostics, its 0-100 score and the fixes it raised
#[derive(Debug, Clone, PartialEq)]
pub struct Section<S> {
    pub stats: S,
    pub score: u8,
    pub fixes: Vec<TopFix>,
}

pub(crate) fn clamp_score(score: i32) -> u8 {
    score.clamp(0, 100) as u8
}

/// Order fixes high → medium → low, keeping insertion order within a level
pub fn sort_top_fixes(mut fixes: Vec<TopFix>) -> Vec<TopFix> {
    fixes.sort_by_key(|fix| fix.impact.rank());
    fixes
}

/// Score a listing
pub fn score(content: &ListingContent, matcher: &AmenityMatcher) -> HeuristicResult {
    let uses_legacy_gallery = resolve_legacy_gallery(&content.photos, content.uses_legacy_gallery);

    let photos = photos::score_photos(&content.photos, uses_legacy_gallery);
    let copy = copy::score_copy(content);
    let amenities = amenities::score_amenities(content, matcher);
    let trust = trust::score_trust(content);

    let section_scores = SectionScores {
        photos: photos.score,
        copy: copy.score,
        amenities_clarity: amenities.score,
        trust_signals: trust.score,
    };

    let fixes: Vec<TopFix> = photos
        .fixes
        .into_iter()
        .chain(copy.fixes)
        .chain(amenities.fixes)
        .chain(trust.fixes)
        .collect();
    let mut recommendations = sort_top_fixes(fixes);
    recommendations.truncate(MAX_TOP_FIXES);

    let overall = section_scores.overall();
    debug!(
        url = content.url.as_str(),
        overall,
        photos = section_scores.photos,
        copy = section_scores.copy,
        amenities = section_scores.amenities_clarity,
        trust = section_scores.trust_signals,
        "listing scored"
    );

    HeuristicResult {
        overall,
        section_scores,
        photo_stats: photos.stats,
        copy_stats: copy.stats,
        amenities: amenities.stats,
        trust_stats: trust.stats,
        recommendations,
    }
}
