use super::{clamp_score, Section};
use crate::models::{Impact, ListingContent, TopFix, TrustSignals};

const SNIPPETS_SHOWN: usize = 2;
const MIN_DESCRIPTION_CHARS: usize = 120;

pub fn score_trust(content: &ListingContent) -> Section<TrustSignals> {
    let mut score: i32 = 100;
    let mut fixes = Vec::new();

    let reviews: Vec<&str> = content
        .reviews
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .collect();
    let review_snippets: Vec<String> = content
        .reviews
        .iter()
        .take(SNIPPETS_SHOWN)
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect();

    if reviews.is_empty() {
        score -= 30;
        fixes.push(TopFix::new(
            Impact::Medium,
            "Listing lacks visible review quotes",
            "Feature a couple of standout review snippets near the top of the description.",
        ));
    }

    let house_rule_count = content
        .house_rules
        .iter()
        .filter(|rule| !rule.trim().is_empty())
        .count();
    if house_rule_count == 0 {
        score -= 20;
        fixes.push(TopFix::new(
            Impact::Medium,
            "House rules not surfaced",
            "Add a concise house rules section to set expectations (quiet hours, pets, etc.).",
        ));
    }

    let summary = content.summary.trim();
    let description = content.description.trim();
    let description_length = description.chars().count();
    if summary.is_empty() {
        score -= 10;
    }
    if description_length < MIN_DESCRIPTION_CHARS {
        score -= 10;
    }

    Section {
        stats: TrustSignals {
            review_count: reviews.len(),
            review_snippets,
            has_house_rules: house_rule_count > 0,
            house_rule_count,
            has_summary: !summary.is_empty(),
            summary_length: summary.chars().count(),
            description_length,
        },
        score: clamp_score(score),
        fixes,
    }
}
