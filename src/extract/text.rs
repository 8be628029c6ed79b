use super::dom::{dedupe_preserving_order, element_text, meta_content, pick_text, render_text, selector};
use scraper::Html;

/// Review snippets kept per listing
pub const MAX_REVIEWS: usize = 2;

const TITLE_SELECTORS: &[&str] = &[
    r#"[data-testid="title"]"#,
    r#"[data-testid="photo-viewer-detail-title"]"#,
    "h1",
];

const SUMMARY_SELECTORS: &[&str] = &[
    r#"[data-testid="place_breadcrumb"]"#,
    r#"[data-testid="subtitle"]"#,
    r#"[data-section-id="OVERVIEW_DEFAULT_V2"] h2"#,
    r#"[data-section-id="OVERVIEW_DEFAULT"] h2"#,
    "h2",
];

const DESCRIPTION_SELECTORS: &[&str] = &[
    r#"[data-section-id="DESCRIPTION_DEFAULT"]"#,
    r#"[data-testid="listing-description"]"#,
];

pub fn extract_title(doc: &Html) -> String {
    pick_text(doc, TITLE_SELECTORS)
}

/// Subtitle/breadcrumb, then page metadata
pub fn extract_summary(doc: &Html) -> String {
    let summary = pick_text(doc, SUMMARY_SELECTORS);
    if !summary.is_empty() {
        return summary;
    }
    meta_content(doc, r#"meta[name="description"]"#)
        .or_else(|| meta_content(doc, r#"meta[property="og:description"]"#))
        .unwrap_or_default()
}

/// Description rebuilt paragraph by paragraph, headings and buttons dropped
pub fn extract_description(doc: &Html) -> String {
    for css in DESCRIPTION_SELECTORS {
        let Some(sel) = selector(css) else { continue };
        if let Some(section) = doc.select(&sel).next() {
            let text = render_text(&section, &["h1", "h2", "h3", "h4", "h5", "h6", "button"]);
            if !text.is_empty() {
                return text;
            }
        }
    }
    String::new()
}

pub fn extract_reviews(doc: &Html, limit: usize) -> Vec<String> {
    let from_section = select_texts(
        doc,
        r#"[data-section-id="REVIEWS_DEFAULT"] [data-testid="review-card"]"#,
        limit,
    );
    if !from_section.is_empty() {
        return from_section;
    }
    select_texts(
        doc,
        r#"[data-testid="review-item"], [data-testid="review-text"]"#,
        limit,
    )
}

fn select_texts(doc: &Html, css: &str, limit: usize) -> Vec<String> {
    let Some(sel) = selector(css) else {
        return Vec::new();
    };
    let texts = doc.select(&sel).map(|n| element_text(&n)).filter(|t| !t.is_empty());
    let mut unique = dedupe_preserving_order(texts);
    unique.truncate(limit);
    unique
}

/// Best-effort readable text of the whole page, used as a fallback corpus
pub fn extract_full_text(doc: &Html) -> String {
    let Some(sel) = selector("body") else {
        return String::new();
    };
    let Some(body) = doc.select(&sel).next() else {
        return String::new();
    };
    render_text(&body, &["button", "nav", "footer", "header", "form", "dialog"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_falls_back_to_meta_description() {
        let doc = Html::parse_document(
            r#"<html><head><meta name="description" content=" Loft near the river "></head><body></body></html>"#,
        );
        assert_eq!(extract_summary(&doc), "Loft near the river");

        let doc = Html::parse_document(
            r#"<html><head><meta property="og:description" content="OG summary"></head><body></body></html>"#,
        );
        assert_eq!(extract_summary(&doc), "OG summary");
    }

    #[test]
    fn title_prefers_testid() {
        let doc = Html::parse_document(
            r#"<h1>Generic heading</h1><div data-testid="title">Cliffside cabin</div>"#,
        );
        assert_eq!(extract_title(&doc), "Cliffside cabin");
    }

    #[test]
    fn description_keeps_paragraph_breaks() {
        let doc = Html::parse_document(
            r#"<div data-section-id="DESCRIPTION_DEFAULT">
                <h2>About this space</h2>
                <span><span>Sunny flat in the old town.<br><br>The space<br>Two bedrooms.</span></span>
                <button>Show more</button>
            </div>"#,
        );
        assert_eq!(
            extract_description(&doc),
            "Sunny flat in the old town.\n\nThe space\nTwo bedrooms."
        );
    }

    #[test]
    fn reviews_are_capped_and_fall_back() {
        let doc = Html::parse_document(
            r#"<div data-testid="review-text">Great stay</div>
               <div data-testid="review-text">Great stay</div>
               <div data-testid="review-text">Lovely host</div>
               <div data-testid="review-text">Would return</div>"#,
        );
        assert_eq!(extract_reviews(&doc, MAX_REVIEWS), vec!["Great stay", "Lovely host"]);
    }

    #[test]
    fn full_text_skips_scripts_and_controls() {
        let doc = Html::parse_document(
            r#"<body><p>Welcome in.</p><script>var x = 1;</script><button>Reserve</button><p>Enjoy.</p></body>"#,
        );
        assert_eq!(extract_full_text(&doc), "Welcome in.\nEnjoy.");
    }
}
