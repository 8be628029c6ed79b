use super::dom::render_text;
use scraper::Html;
use serde_json::Value;

/// Fields recovered from the preloaded listing payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadFacts {
    pub amenities: Vec<String>,
    pub house_rules: Vec<String>,
    pub description: Option<String>,
}

/// Pull amenities, house rules and description out of the PDP sections,
/// wherever in the payload they happen to be nested.
pub fn parse_payload(payload: &Value) -> PayloadFacts {
    let mut sections = Vec::new();
    collect_sections(payload, &mut sections);

    PayloadFacts {
        amenities: find_section(&sections, "AMENITIES_DEFAULT")
            .map(amenities_from_section)
            .unwrap_or_default(),
        house_rules: find_section(&sections, "POLICIES_DEFAULT")
            .and_then(|sec| sec.get("houseRules"))
            .and_then(Value::as_array)
            .map(|rules| {
                rules
                    .iter()
                    .filter_map(|rule| rule.get("title").and_then(Value::as_str))
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default(),
        description: find_section(&sections, "DESCRIPTION_DEFAULT")
            .and_then(|sec| sec.pointer("/htmlDescription/htmlText"))
            .and_then(Value::as_str)
            .map(html_to_text)
            .filter(|d| !d.is_empty()),
    }
}

fn collect_sections<'a>(value: &'a Value, out: &mut Vec<(&'a str, &'a Value)>) {
    match value {
        Value::Object(map) => {
            if let (Some(kind), Some(section)) = (
                map.get("sectionComponentType").and_then(Value::as_str),
                map.get("section"),
            ) {
                out.push((kind, section));
            }
            for child in map.values() {
                collect_sections(child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_sections(item, out);
            }
        }
        _ => {}
    }
}

fn find_section<'a>(sections: &[(&str, &'a Value)], kind: &str) -> Option<&'a Value> {
    sections
        .iter()
        .find(|(k, section)| *k == kind && !section.is_null())
        .map(|(_, section)| *section)
}

fn amenities_from_section(section: &Value) -> Vec<String> {
    let groups = section
        .get("seeAllAmenitiesGroups")
        .or_else(|| section.get("previewAmenitiesGroups"))
        .and_then(Value::as_array);

    groups
        .into_iter()
        .flatten()
        .flat_map(|group| {
            group
                .get("amenities")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
        })
        .filter(|amenity| amenity.get("available").and_then(Value::as_bool) != Some(false))
        .filter_map(|amenity| amenity.get("title").and_then(Value::as_str))
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
        .collect()
}

/// Plain text of an HTML snippet, paragraphs and `<br>`s kept as line breaks
fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    render_text(&fragment.root_element(), &[])
}
