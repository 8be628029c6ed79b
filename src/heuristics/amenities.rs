use super::{clamp_score, Section};
use crate::matcher::AmenityMatcher;
use crate::models::{AmenityAudit, Impact, ListingContent, TopFix};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Amenity categories hosts often describe but forget to declare
static AMENITY_PATTERNS: Lazy<Vec<(&'static str, Vec<Regex>)>> = Lazy::new(|| {
    let table: &[(&str, &[&str])] = &[
        ("desk", &[r"\bworkspace\b", r"\bwork ?desk\b", r"\bdedicated desk\b", r"\boffice\b"]),
        ("parking", &[r"\bparking\b", r"\bgarage\b", r"\bdriveway\b"]),
        ("wifi", &[r"\bwi-?fi\b", r"\bwireless internet\b", r"\bhigh[- ]speed internet\b"]),
        (
            "air conditioning",
            &[r"\bair conditioning\b", r"\bcentral air\b", r"\bclimate control\b", r"\ba/c\b"],
        ),
        ("laundry", &[r"\bwasher\b", r"\bdryer\b", r"\blaundry\b"]),
    ];
    table
        .iter()
        .map(|(name, patterns)| {
            let compiled = patterns
                .iter()
                .map(|p| Regex::new(&format!("(?i){p}")).expect("valid amenity pattern"))
                .collect();
            (*name, compiled)
        })
        .collect()
});

static NON_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9 ]+").expect("valid token regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Cues that, right before a mention, turn it into an absence
const NEGATIVE_PREFIXES: &[&str] = &[
    "no",
    "without",
    "not included",
    "not available",
    "doesn't",
    "does not",
    "lack of",
    "unavailable",
];
const PREFIX_WINDOW: usize = 24;
const SUFFIX_WINDOW: usize = 16;

fn normalize_token(value: &str) -> String {
    let stripped = NON_TOKEN.replace_all(&value.to_lowercase(), "").to_string();
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

fn floor_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_boundary(text: &str, mut idx: usize) -> usize {
    while idx < text.len() && !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

fn ends_with_cue(prefix: &str, cue: &str) -> bool {
    let Some(head) = prefix.strip_suffix(cue) else {
        return false;
    };
    // "casino" must not read as "no"
    head.chars().last().map_or(true, |c| !c.is_alphanumeric())
}

/// Whether any match of `patterns` in `text` is not negated by its surroundings
pub fn has_positive_reference(text: &str, patterns: &[Regex]) -> bool {
    for pattern in patterns {
        for m in pattern.find_iter(text) {
            let prefix_start = ceil_boundary(text, m.start().saturating_sub(PREFIX_WINDOW));
            let prefix = text[prefix_start..m.start()].trim();
            let suffix_end = floor_boundary(text, (m.end() + SUFFIX_WINDOW).min(text.len()));
            let suffix = text[m.end()..suffix_end].trim();

            if NEGATIVE_PREFIXES.iter().any(|cue| ends_with_cue(prefix, cue)) {
                continue;
            }
            if suffix.starts_with("not included") || suffix.starts_with("not available") {
                continue;
            }
            return true;
        }
    }
    false
}

/// All prose on the page that can evidence an amenity
fn text_corpus(content: &ListingContent) -> String {
    [
        content.title.as_str(),
        content.summary.as_str(),
        content.description.as_str(),
        content.full_text.as_str(),
        content.house_rules.join(" ").as_str(),
        content.reviews.join(" ").as_str(),
    ]
    .join(" ")
}

pub fn score_amenities(content: &ListingContent, matcher: &AmenityMatcher) -> Section<AmenityAudit> {
    let listed: Vec<String> = content
        .amenities_listed
        .iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();
    let listed_tokens: HashSet<String> = listed.iter().map(|a| normalize_token(a)).collect();
    let listed_lower: Vec<String> = listed.iter().map(|a| a.to_lowercase()).collect();

    let corpus = text_corpus(content);
    let (text_hits, listed_no_text_evidence) = matcher.detect_amenity_mentions(&listed, &corpus);

    let blob = WHITESPACE.replace_all(&corpus.to_lowercase(), " ").to_string();
    let likely_present_not_listed: Vec<String> = AMENITY_PATTERNS
        .iter()
        .filter(|(name, _)| !listed_tokens.contains(&normalize_token(name)))
        .filter(|(_, patterns)| {
            !patterns
                .iter()
                .any(|p| listed_lower.iter().any(|name| p.is_match(name)))
        })
        .filter(|(_, patterns)| has_positive_reference(&blob, patterns))
        .map(|(name, _)| name.to_string())
        .collect();

    let mut score: i32 = 100;
    let mut fixes = Vec::new();

    if listed.len() < 10 {
        score -= 25;
        fixes.push(TopFix::new(
            Impact::High,
            "Too few amenities listed",
            "Audit and list at least 15 key amenities (wifi, parking, climate control, workspace).",
        ));
    } else if listed.len() < 15 {
        score -= 10;
    }

    if !listed_no_text_evidence.is_empty() {
        score -= (listed_no_text_evidence.len() as i32 * 3).min(20);
        fixes.push(TopFix::new(
            Impact::Medium,
            "Amenities listed without supporting copy",
            "Work a short mention of each major amenity into the description to build trust.",
        ));
    }

    if !likely_present_not_listed.is_empty() {
        score -= 12;
        fixes.push(TopFix::new(
            Impact::Medium,
            "Amenities hinted at but not listed",
            format!(
                "Add these amenities to the listing: {}.",
                likely_present_not_listed.join(", ")
            ),
        ));
    }

    Section {
        stats: AmenityAudit {
            listed,
            text_hits,
            likely_present_not_listed,
            listed_no_text_evidence,
        },
        score: clamp_score(score),
        fixes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(name: &str) -> &'static [Regex] {
        AMENITY_PATTERNS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, p)| p.as_slice())
            .unwrap()
    }

    #[test]
    fn positive_reference_respects_negation() {
        assert!(has_positive_reference("free street parking nearby", patterns("parking")));
        assert!(!has_positive_reference("sorry, no parking on site", patterns("parking")));
        assert!(!has_positive_reference("parking not available in winter", patterns("parking")));
        assert!(has_positive_reference("near the casino parking is easy", patterns("parking")));
    }

    #[test]
    fn positive_reference_is_char_boundary_safe() {
        assert!(has_positive_reference("café – séjour très agréable — wifi rapide ✓✓✓", patterns("wifi")));
    }

    #[test]
    fn hinted_but_unlisted_amenities_are_flagged() {
        let content = ListingContent {
            description: "Fast wifi throughout. Dedicated workspace by the window. No parking.".to_string(),
            amenities_listed: vec!["Wifi".to_string(), "Kitchen".to_string()],
            ..ListingContent::empty("u")
        };
        let section = score_amenities(&content, &AmenityMatcher::default());
        assert_eq!(section.stats.likely_present_not_listed, vec!["desk"]);
        assert_eq!(section.stats.text_hits, vec!["Wifi"]);
        assert_eq!(section.stats.listed_no_text_evidence, vec!["Kitchen"]);
        // -25 too few, -3 one unevidenced, -12 hinted
        assert_eq!(section.score, 60);
        assert_eq!(
            section.fixes.last().map(|f| f.how_to_fix.as_str()),
            Some("Add these amenities to the listing: desk.")
        );
    }

    #[test]
    fn listed_names_suppress_hints() {
        let content = ListingContent {
            description: "A washer and dryer are in the hallway closet.".to_string(),
            amenities_listed: vec!["Washer".to_string()],
            ..ListingContent::empty("u")
        };
        let section = score_amenities(&content, &AmenityMatcher::default());
        assert!(section.stats.likely_present_not_listed.is_empty());
    }
}
