use super::dom::{dedupe_preserving_order, element_text, has_ancestor_named, selector};
use scraper::{ElementRef, Html};

/// UI strings that show up inside rule sections but aren't rules
const BOILERPLATE: &[&str] = &["show more", "add dates", "house rules"];
const HEADINGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

/// Extract house rules, trying the policies section, the legacy section id,
/// and finally a "House rules" dialog.
pub fn extract_house_rules(doc: &Html) -> Vec<String> {
    let rules = rules_from_policies(doc);
    if !rules.is_empty() {
        return rules;
    }
    let rules = rules_from_legacy_section(doc);
    if !rules.is_empty() {
        return rules;
    }
    rules_from_dialog(doc)
}

fn rules_from_policies(doc: &Html) -> Vec<String> {
    let Some(section_sel) = selector(r#"[data-section-id="POLICIES_DEFAULT"]"#) else {
        return Vec::new();
    };
    let Some(heading_sel) = selector("h1, h2, h3, h4, h5, h6") else {
        return Vec::new();
    };
    let Some(item_sel) = selector("li, p") else {
        return Vec::new();
    };

    let mut rules = Vec::new();
    for section in doc.select(&section_sel) {
        let Some(heading) = section
            .select(&heading_sel)
            .find(|h| element_text(h).to_lowercase().contains("house rules"))
        else {
            continue;
        };

        // Climb until the heading's wrapper has following siblings to read
        let mut anchor = heading;
        while anchor.next_siblings().filter_map(ElementRef::wrap).next().is_none() {
            match anchor.parent().and_then(ElementRef::wrap) {
                Some(parent) if parent.id() != section.id() => anchor = parent,
                _ => break,
            }
        }

        for sibling in anchor.next_siblings().filter_map(ElementRef::wrap) {
            if HEADINGS.contains(&sibling.value().name()) || sibling.select(&heading_sel).next().is_some() {
                break;
            }
            if sibling.value().name() == "button" {
                continue;
            }
            let items: Vec<ElementRef<'_>> = sibling
                .select(&item_sel)
                .filter(|item| !has_ancestor_named(item, "button"))
                .collect();
            if items.is_empty() {
                rules.push(element_text(&sibling));
            } else {
                rules.extend(items.iter().map(element_text));
            }
        }
    }
    clean(rules)
}

fn rules_from_legacy_section(doc: &Html) -> Vec<String> {
    let Some(sel) = selector(r#"[data-section-id="HOUSE_RULES_DEFAULT"] li, [data-section-id="HOUSE_RULES_DEFAULT"] p"#) else {
        return Vec::new();
    };
    clean(
        doc.select(&sel)
            .filter(|item| !has_ancestor_named(item, "button"))
            .map(|item| element_text(&item))
            .collect(),
    )
}

fn rules_from_dialog(doc: &Html) -> Vec<String> {
    let Some(dialog_sel) = selector(r#"[role="dialog"][aria-label]"#) else {
        return Vec::new();
    };
    let Some(leaf_sel) = selector("li, p, span") else {
        return Vec::new();
    };

    let mut rules = Vec::new();
    for dialog in doc.select(&dialog_sel) {
        let label = dialog.value().attr("aria-label").unwrap_or_default();
        if !label.to_lowercase().contains("house rules") {
            continue;
        }
        for node in dialog.select(&leaf_sel) {
            // Only innermost text holders, and never UI controls
            if node.select(&leaf_sel).next().is_some() || has_ancestor_named(&node, "button") {
                continue;
            }
            rules.push(element_text(&node));
        }
    }
    clean(rules)
}

fn clean(rules: Vec<String>) -> Vec<String> {
    dedupe_preserving_order(
        rules
            .into_iter()
            .filter(|rule| !rule.is_empty())
            .filter(|rule| !BOILERPLATE.contains(&rule.to_lowercase().as_str())),
    )
}
