//! End-to-end runs of the assessor against captured-page fixtures.

use async_trait::async_trait;
use hostscore::browser::{ListingRenderer, RawCapture, RenderOptions};
use hostscore::matcher::AmenityMatcher;
use hostscore::refine::{LlmClient, LlmSettings};
use hostscore::{AssessOptions, Assessor, RenderError};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING_URL: &str = "https://www.airbnb.com/rooms/4242?adults=2";

const PAGE: &str = r#"<!doctype html>
<html>
<head>
    <title>Cedar cabin - Airbnb</title>
    <meta name="description" content="Cabin by the river">
</head>
<body>
    <h1>Cedar cabin by the river</h1>
    <div data-testid="subtitle">Entire cabin in Hood River, Oregon</div>
    <picture>
        <source srcset="https://a0.muscache.com/im/pictures/cabin-1.jpg?im_w=720 720w, https://a0.muscache.com/im/pictures/cabin-1.jpg?im_w=1200 1200w">
        <img src="https://a0.muscache.com/im/pictures/cabin-1.jpg?im_w=320" alt="Listing image 1">
    </picture>
    <div data-section-id="DESCRIPTION_DEFAULT">
        <h2>About this space</h2>
        <span>Fast wifi throughout.<br>Free parking available on the drive.</span>
        <button>Show more</button>
    </div>
    <div data-section-id="POLICIES_DEFAULT">
        <div>
            <h2>House rules</h2>
            <ul><li>No pets</li><li>No parties</li><li>No parties</li></ul>
            <span>Check-out before 10am</span>
        </div>
    </div>
    <div data-section-id="REVIEWS_DEFAULT">
        <div data-testid="review-card">Spotless and calm.</div>
        <div data-testid="review-card">Great host, would return.</div>
        <div data-testid="review-card">Loved the river walks.</div>
    </div>
</body>
</html>"#;

const AMENITIES_MODAL: &str = r#"<div role="dialog" aria-label="What this place offers">
    <ul role="list">
        <li>Wifi</li>
        <li><div>Parking</div><div>Free on premises</div></li>
        <li>Sauna</li>
        <li>Unavailable: Hot tub</li>
    </ul>
</div>"#;

struct FixtureRenderer;

#[async_trait]
impl ListingRenderer for FixtureRenderer {
    async fn render(&self, _url: &str, _options: &RenderOptions) -> Result<RawCapture, RenderError> {
        Ok(RawCapture {
            amenities_modal_html: Some(AMENITIES_MODAL.to_string()),
            ..RawCapture::from_html(PAGE)
        })
    }

    fn renderer_name(&self) -> &'static str {
        "fixture"
    }
}

fn heuristic_only() -> Assessor {
    Assessor::new(Arc::new(FixtureRenderer), Arc::new(AmenityMatcher::default()))
}

fn client_for(server: &MockServer) -> LlmClient {
    let settings = LlmSettings {
        endpoint: format!("{}/v1/messages", server.uri()),
        ..LlmSettings::new("test-key")
    };
    LlmClient::new(settings)
        .expect("client builds")
        .with_backoff(Duration::from_millis(10))
}

fn reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "content": [{"type": "text", "text": text}]
    }))
}

#[tokio::test]
async fn fixture_page_is_extracted_and_scored() {
    let assessment = heuristic_only()
        .assess(LISTING_URL, &AssessOptions::default())
        .await
        .expect("fixture assesses");

    assert_eq!(assessment.url, "https://www.airbnb.com/rooms/4242");
    let listing = assessment.listing.expect("fresh assessment carries the listing");

    assert_eq!(listing.title, "Cedar cabin by the river");
    assert_eq!(listing.summary, "Entire cabin in Hood River, Oregon");
    assert_eq!(listing.photos.len(), 1);
    assert_eq!(
        listing.photos[0].url,
        "https://a0.muscache.com/im/pictures/cabin-1.jpg?im_w=1200"
    );
    assert_eq!(listing.photos[0].width, Some(1200));
    assert_eq!(listing.photos[0].alt, None);
    assert!(listing.uses_legacy_gallery);

    assert_eq!(listing.house_rules, vec!["No pets", "No parties", "Check-out before 10am"]);
    assert_eq!(listing.reviews.len(), 2);
    assert_eq!(listing.amenities_listed, vec!["Wifi", "Parking", "Sauna"]);

    let result = assessment.result;
    assert!(result.photo_stats.uses_legacy_gallery);
    assert!(!result.photo_stats.key_space_metrics_supported);
    assert_eq!(result.amenities.text_hits, vec!["Wifi", "Parking"]);
    assert_eq!(result.amenities.listed_no_text_evidence, vec!["Sauna"]);
    assert!(result.trust_signals.has_house_rules);
    assert_eq!(result.trust_signals.house_rule_count, 3);
    assert!(!result.refined);
    assert!(result.top_fixes.len() <= 5);
    assert!(result.bonus_summary.is_some());
    assert!(result.owner_overview.is_none());

    let mean: f64 = result.section_scores.values().iter().map(|v| f64::from(*v)).sum::<f64>() / 4.0;
    assert_eq!(result.overall, mean.round() as u8);
}

#[tokio::test]
async fn refinement_adjusts_within_bounds() {
    let baseline = heuristic_only()
        .assess(LISTING_URL, &AssessOptions::default())
        .await
        .expect("baseline")
        .result;

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(reply(
            r#"{"overall_adjustment": 40, "top_fixes": [{"impact": "high", "reason": "Caption your photos", "how_to_fix": "Describe each room."}]}"#,
        ))
        .mount(&server)
        .await;

    let assessor = heuristic_only().with_llm(Some(client_for(&server)));
    let refined = assessor
        .assess(LISTING_URL, &AssessOptions::default())
        .await
        .expect("refined")
        .result;

    assert!(refined.refined);
    assert_eq!(refined.overall, (baseline.overall + 5).min(100));
    assert_eq!(refined.section_scores, baseline.section_scores);
    assert_eq!(refined.top_fixes[0].reason, "Caption your photos");
    assert_eq!(
        refined.bonus_summary.as_deref().map(|s| s.ends_with("Lead with caption your photos: Describe each room.")),
        Some(true)
    );
}

#[tokio::test]
async fn failing_llm_leaves_the_heuristic_result() {
    let baseline = heuristic_only()
        .assess(LISTING_URL, &AssessOptions::default())
        .await
        .expect("baseline")
        .result;

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let assessor = heuristic_only()
        .with_llm(Some(client_for(&server)))
        .with_overview(Some(client_for(&server)));
    let options = AssessOptions {
        with_overview: true,
        ..AssessOptions::default()
    };
    let result = assessor.assess(LISTING_URL, &options).await.expect("degrades").result;

    assert_eq!(result, baseline);
}

#[tokio::test]
async fn overview_is_attached_when_requested() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(reply("Guests will love the river setting. Caption your photos next."))
        .mount(&server)
        .await;

    let assessor = heuristic_only().with_overview(Some(client_for(&server)));

    let plain = assessor
        .assess(LISTING_URL, &AssessOptions::default())
        .await
        .expect("plain");
    assert!(plain.result.owner_overview.is_none());

    let options = AssessOptions {
        with_overview: true,
        ..AssessOptions::default()
    };
    let with_overview = assessor.assess(LISTING_URL, &options).await.expect("overview");
    assert!(!with_overview.from_cache);
    assert_eq!(
        with_overview.result.owner_overview.as_deref(),
        Some("Guests will love the river setting. Caption your photos next.")
    );
}
