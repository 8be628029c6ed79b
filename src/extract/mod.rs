//! Turns captured listing HTML (plus modal captures and preloaded JSON) into
//! a [`ListingContent`]. Nothing in here fails: missing markup degrades to
//! empty fields.

pub mod amenities;
pub mod dom;
pub mod payload;
pub mod photos;
pub mod rules;
pub mod text;

use crate::browser::RawCapture;
use crate::models::{DebugArtifacts, ListingContent};
use scraper::Html;
use tracing::debug;

pub use amenities::extract_amenities;
pub use payload::{parse_payload, PayloadFacts};
pub use photos::{detect_legacy_gallery, extract_photos, is_generic_label};
pub use rules::extract_house_rules;

/// Build the listing snapshot for one render pass
pub fn extract_listing(raw: &RawCapture, url: &str) -> ListingContent {
    let page = Html::parse_document(&raw.html);
    let photo_modal = raw.modal_html.as_deref().map(Html::parse_document);
    let amenities_modal = raw.amenities_modal_html.as_deref().map(Html::parse_document);
    let facts = raw
        .preloaded_json
        .as_ref()
        .map(parse_payload)
        .unwrap_or_default();

    let mut description = text::extract_description(&page);
    if description.is_empty() {
        if let Some(from_payload) = &facts.description {
            debug!(url, "description taken from preloaded state");
            description = from_payload.clone();
        }
    }

    let mut house_rules = extract_house_rules(&page);
    if house_rules.is_empty() && !facts.house_rules.is_empty() {
        debug!(url, count = facts.house_rules.len(), "house rules taken from preloaded state");
        house_rules = dom::dedupe_preserving_order(facts.house_rules.iter().cloned());
    }

    let amenities_listed = extract_amenities(
        &page,
        amenities_modal.as_ref(),
        &raw.amenities_items,
        &facts.amenities,
    );
    let photos = extract_photos(&page, photo_modal.as_ref());
    let uses_legacy_gallery = detect_legacy_gallery(&page, photo_modal.as_ref());

    let content = ListingContent {
        url: url.to_string(),
        title: text::extract_title(&page),
        summary: text::extract_summary(&page),
        description,
        full_text: text::extract_full_text(&page),
        amenities_listed,
        house_rules,
        reviews: text::extract_reviews(&page, text::MAX_REVIEWS),
        photos,
        uses_legacy_gallery,
        debug: None,
    };

    debug!(
        url,
        photos = content.photos.len(),
        amenities = content.amenities_listed.len(),
        house_rules = content.house_rules.len(),
        reviews = content.reviews.len(),
        legacy_gallery = content.uses_legacy_gallery,
        "listing extracted"
    );
    content
}

/// Raw artifacts of a capture, attached to the listing when debugging
pub fn debug_artifacts(raw: &RawCapture) -> DebugArtifacts {
    DebugArtifacts {
        raw_html: raw.html.clone(),
        photo_modal_html: raw.modal_html.clone(),
        amenities_modal_html: raw.amenities_modal_html.clone(),
        amenities_items: raw.amenities_items.clone(),
        preloaded_state: raw.preloaded_json.clone(),
        responses: raw.responses.clone(),
    }
}
