use super::dom::{collapse_whitespace, dedupe_preserving_order, render_text, selector};
use scraper::Html;

/// Item selectors tried on every document, page or modal
const ITEM_SELECTORS: &[&str] = &[
    r#"[data-section-id="AMENITIES_DEFAULT"] [data-testid="amenity-item"]"#,
    r#"[itemprop="amenityFeature"]"#,
    r#"[data-testid="pdp-section-amenities-item"]"#,
];

/// Generic list markup only counts as amenities inside a dialog
const PAGE_LIST_SELECTOR: &str = r#"[role="dialog"] ul[role="list"] li"#;
const MODAL_LIST_SELECTOR: &str = r#"ul[role="list"] li"#;

/// Merge amenity labels from the page, the amenities modal, the driver's
/// structured item list and the preloaded payload, in that order.
pub fn extract_amenities(
    page: &Html,
    modal: Option<&Html>,
    items: &[String],
    payload_amenities: &[String],
) -> Vec<String> {
    let mut collected = Vec::new();
    collect_from_document(page, PAGE_LIST_SELECTOR, &mut collected);
    if let Some(modal) = modal {
        collect_from_document(modal, MODAL_LIST_SELECTOR, &mut collected);
    }
    collected.extend(items.iter().filter_map(|item| normalize_item(item)));
    collected.extend(payload_amenities.iter().filter_map(|item| normalize_item(item)));
    dedupe_preserving_order(collected)
}

fn collect_from_document(doc: &Html, list_selector: &str, out: &mut Vec<String>) {
    for css in ITEM_SELECTORS {
        let Some(sel) = selector(css) else { continue };
        for node in doc.select(&sel) {
            if let Some(label) = normalize_item(&render_text(&node, &[])) {
                out.push(label);
            }
        }
    }

    let Some(sel) = selector(list_selector) else { return };
    for node in doc.select(&sel) {
        let rendered = render_text(&node, &[]);
        if rendered.to_lowercase().contains("amenit") {
            continue;
        }
        if let Some(label) = normalize_item(&rendered) {
            out.push(label);
        }
    }
}

/// Normalize a multi-line item to its first non-empty line
pub fn normalize_item(raw: &str) -> Option<String> {
    if is_unavailable(raw.trim()) {
        return None;
    }
    raw.lines()
        .map(collapse_whitespace)
        .find(|line| !line.is_empty())
}

fn is_unavailable(text: &str) -> bool {
    text.to_lowercase().starts_with("unavailable:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amenities_from_modal_markup() {
        let modal = r#"
            <div role="dialog">
                <section>
                    <h1>What this place offers</h1>
                    <section>
                        <h2>Bathroom</h2>
                        <ul role="list">
                            <li><div><div class="label">Hair dryer</div></div></li>
                            <li><div><div class="label">Shampoo</div></div></li>
                        </ul>
                    </section>
                    <section>
                        <h2>Services</h2>
                        <ul role="list">
                            <li><div><div>Self check-in</div></div></li>
                            <li><div><div>Lockbox</div></div></li>
                        </ul>
                    </section>
                </section>
            </div>
        "#;
        let page = Html::parse_document("<main></main>");
        let modal = Html::parse_document(modal);

        let amenities = extract_amenities(&page, Some(&modal), &[], &[]);
        assert_eq!(amenities, vec!["Hair dryer", "Shampoo", "Self check-in", "Lockbox"]);
    }

    #[test]
    fn keeps_label_line_and_drops_unavailable() {
        let page = Html::parse_document(
            r#"<div data-section-id="AMENITIES_DEFAULT">
                <div data-testid="amenity-item"><div>Wifi</div><div>Fast and reliable</div></div>
                <div data-testid="amenity-item"><del>Unavailable: Carbon monoxide alarm</del></div>
                <div data-testid="amenity-item"><span>Kitchen</span></div>
            </div>"#,
        );
        let items = vec![
            "Dedicated workspace\nIn a room with a door".to_string(),
            "unavailable: TV".to_string(),
            "Wifi".to_string(),
        ];
        let amenities = extract_amenities(&page, None, &items, &[]);
        assert_eq!(amenities, vec!["Wifi", "Kitchen", "Dedicated workspace"]);
    }

    #[test]
    fn inline_markup_stays_inside_the_label() {
        let page = Html::parse_document(
            r#"<div data-section-id="AMENITIES_DEFAULT">
                <div data-testid="amenity-item"><span>Free <b>parking</b> on premises</span></div>
                <div data-testid="amenity-item"><span><em>Fast</em> wifi – 300 Mbps</span><div>Good for calls</div></div>
            </div>"#,
        );
        assert_eq!(
            extract_amenities(&page, None, &[], &[]),
            vec!["Free parking on premises", "Fast wifi – 300 Mbps"]
        );
    }

    #[test]
    fn page_level_lists_outside_dialogs_are_ignored() {
        let page = Html::parse_document(
            r#"<ul role="list"><li>Lisbon</li><li>Portugal</li></ul>
               <div role="dialog"><ul role="list"><li>Pool</li><li>Show all 40 amenities</li></ul></div>"#,
        );
        assert_eq!(extract_amenities(&page, None, &[], &[]), vec!["Pool"]);
    }

    #[test]
    fn payload_amenities_come_last() {
        let page = Html::parse_document(
            r#"<div itemprop="amenityFeature"><span>Parking</span></div>"#,
        );
        let payload = vec!["Hot tub".to_string(), "Parking".to_string()];
        assert_eq!(extract_amenities(&page, None, &[], &payload), vec!["Parking", "Hot tub"]);
    }
}
