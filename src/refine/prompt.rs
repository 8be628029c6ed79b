use crate::models::{AmenityAudit, AssessmentResult, Impact, ListingContent, TopFix};
use serde::Serialize;
use serde_json::Value;

pub const REFINE_SYSTEM_PROMPT: &str = "You are a conversion copy expert helping hosts improve Airbnb listings. \
Only return valid JSON. Keep each fix short (<=180 characters) and actionable. \
When assessing amenities, rely on the provided listing context to confirm evidence.";

const REFINE_INSTRUCTIONS: &str = r#"Given the heuristic assessment and listing context below, adjust the overall score by at most +/-5 points if justified,
return up to 5 prioritized fixes, and reclassify the amenities evidence list. Respond strictly with JSON matching this schema:
{
  "overall_adjustment": integer in [-5,5],
  "top_fixes": [
    {"impact":"high|medium|low","reason":string,"how_to_fix":string}
  ],
  "amenities": {
    "text_hits": [string],
    "likely_present_not_listed": [string],
    "listed_no_text_evidence": [string]
  }
}"#;

pub const OVERVIEW_SYSTEM_PROMPT: &str = "You are a hospitality conversion coach writing directly to an Airbnb host. \
Reply with plain text only: no JSON, no Markdown, no headings.";

const OVERVIEW_INSTRUCTIONS: &str = "Using the assessment and listing context below, write a warm two to three sentence overview \
for the host. Name what already works, then the single change most likely to win more bookings. Stay under 600 characters.";

pub const MAX_ADJUSTMENT: i64 = 5;
pub const MAX_REFINED_FIXES: usize = 5;
pub const MAX_OVERVIEW_CHARS: usize = 700;

const SUMMARY_LIMIT: usize = 400;
const DESCRIPTION_LIMIT: usize = 1200;
const MAX_RULES: usize = 8;
const RULE_LIMIT: usize = 160;
const MAX_REVIEWS: usize = 4;
const REVIEW_LIMIT: usize = 200;
const MAX_AMENITIES: usize = 40;

/// Listing text sent along with the assessment, already trimmed to budget
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct ListingContext {
    pub summary: String,
    pub description: String,
    pub house_rules: Vec<String>,
    pub reviews: Vec<String>,
    pub amenities_listed: Vec<String>,
}

impl ListingContext {
    pub fn from_listing(content: &ListingContent) -> Self {
        Self {
            summary: ellipsize(&content.summary, SUMMARY_LIMIT),
            description: ellipsize(&content.description, DESCRIPTION_LIMIT),
            house_rules: content
                .house_rules
                .iter()
                .take(MAX_RULES)
                .map(|r| truncate_chars(r, RULE_LIMIT))
                .collect(),
            reviews: content
                .reviews
                .iter()
                .take(MAX_REVIEWS)
                .map(|r| truncate_chars(r, REVIEW_LIMIT))
                .collect(),
            amenities_listed: content.amenities_listed.iter().take(MAX_AMENITIES).cloned().collect(),
        }
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Trim to `limit` chars, ending in "..." when anything was cut
pub fn ellipsize(text: &str, limit: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let head: String = text.chars().take(limit.saturating_sub(3)).collect();
    format!("{}...", head.trim_end())
}

pub fn refine_prompt(assessment: &AssessmentResult, context: &ListingContext) -> serde_json::Result<String> {
    Ok(format!(
        "{REFINE_INSTRUCTIONS}\n\nHeuristic assessment:\n{}\n\nListing context:\n{}\n",
        serde_json::to_string(assessment)?,
        serde_json::to_string(context)?
    ))
}

pub fn overview_prompt(assessment: &AssessmentResult, context: &ListingContext) -> serde_json::Result<String> {
    Ok(format!(
        "{OVERVIEW_INSTRUCTIONS}\n\nAssessment:\n{}\n\nListing context:\n{}\n",
        serde_json::to_string(assessment)?,
        serde_json::to_string(context)?
    ))
}

/// Drop a surrounding Markdown code fence, if the model added one
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string ("json") up to the first newline
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn as_clean_string(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => return None,
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

fn parse_adjustment(value: Option<&Value>) -> Result<i64, String> {
    let Some(value) = value else { return Ok(0) };
    let adjustment = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .ok_or_else(|| format!("unusable adjustment {n}"))?,
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| format!("unusable adjustment {s:?}: {e}"))?,
        Value::Null => 0,
        other => return Err(format!("unusable adjustment {other}")),
    };
    Ok(adjustment.clamp(-MAX_ADJUSTMENT, MAX_ADJUSTMENT))
}

/// Parse model-proposed fixes, skipping entries that are not usable
pub fn parse_fixes(value: &Value) -> Vec<TopFix> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|raw| {
            let impact = match raw.get("impact").and_then(as_clean_string) {
                None => Impact::Medium,
                Some(label) => label.parse::<Impact>().ok()?,
            };
            let reason = raw.get("reason").and_then(as_clean_string)?;
            let how_to_fix = raw.get("how_to_fix").and_then(as_clean_string).unwrap_or_default();
            Some(TopFix::new(impact, reason, how_to_fix))
        })
        .take(MAX_REFINED_FIXES)
        .collect()
}

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    value?
        .as_array()
        .map(|items| items.iter().filter_map(as_clean_string).collect())
}

fn merge_amenities(baseline: &AmenityAudit, value: Option<&Value>) -> AmenityAudit {
    let mut audit = baseline.clone();
    let Some(payload) = value.filter(|v| v.is_object()) else {
        return audit;
    };
    if let Some(hits) = string_list(payload.get("text_hits")) {
        audit.text_hits = hits;
    }
    if let Some(hinted) = string_list(payload.get("likely_present_not_listed")) {
        audit.likely_present_not_listed = hinted;
    }
    if let Some(unevidenced) = string_list(payload.get("listed_no_text_evidence")) {
        audit.listed_no_text_evidence = unevidenced;
    }
    audit
}

/// Layer a model response over the baseline, producing a new assessment
pub fn apply_refinement(baseline: &AssessmentResult, raw_text: &str) -> Result<AssessmentResult, String> {
    let payload: Value =
        serde_json::from_str(strip_code_fences(raw_text)).map_err(|e| format!("response is not JSON: {e}"))?;
    if !payload.is_object() {
        return Err("response is not a JSON object".to_string());
    }

    let adjustment = parse_adjustment(payload.get("overall_adjustment"))?;
    let overall = (i64::from(baseline.overall) + adjustment).clamp(0, 100) as u8;

    let fixes = payload.get("top_fixes").map(parse_fixes).unwrap_or_default();
    let top_fixes = if fixes.is_empty() {
        baseline.top_fixes.clone()
    } else {
        fixes
    };

    Ok(AssessmentResult {
        overall,
        top_fixes,
        amenities: merge_amenities(&baseline.amenities, payload.get("amenities")),
        refined: true,
        ..baseline.clone()
    })
}

/// Clean a free-text overview; `None` when nothing usable remains
pub fn clean_overview(raw_text: &str) -> Option<String> {
    let text = strip_code_fences(raw_text).trim().trim_matches('"').trim();
    if text.is_empty() {
        return None;
    }
    Some(ellipsize(text, MAX_OVERVIEW_CHARS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CopyStats, PhotoStats, SectionScores, TrustSignals};
    use serde_json::json;

    fn baseline() -> AssessmentResult {
        AssessmentResult {
            overall: 98,
            section_scores: SectionScores {
                photos: 100,
                copy: 100,
                amenities_clarity: 100,
                trust_signals: 92,
            },
            photo_stats: PhotoStats::default(),
            copy_stats: CopyStats::default(),
            amenities: AmenityAudit {
                listed: vec!["Wifi".into(), "Pool".into()],
                text_hits: vec!["Wifi".into()],
                likely_present_not_listed: vec![],
                listed_no_text_evidence: vec!["Pool".into()],
            },
            trust_signals: TrustSignals::default(),
            top_fixes: vec![TopFix::new(Impact::Medium, "Baseline fix", "Keep it")],
            refined: false,
            bonus_summary: None,
            owner_overview: None,
        }
    }

    #[test]
    fn context_is_trimmed_to_budget() {
        let content = ListingContent {
            summary: "s".repeat(500),
            description: format!("{}   tail", "d".repeat(1300)),
            house_rules: (0..10).map(|i| format!("{i}{}", "r".repeat(200))).collect(),
            reviews: (0..6).map(|_| "v".repeat(300)).collect(),
            amenities_listed: (0..50).map(|i| format!("a{i}")).collect(),
            ..ListingContent::empty("u")
        };
        let ctx = ListingContext::from_listing(&content);
        assert_eq!(ctx.summary.chars().count(), 400);
        assert!(ctx.summary.ends_with("..."));
        assert_eq!(ctx.description.chars().count(), 1200);
        assert_eq!(ctx.house_rules.len(), 8);
        assert!(ctx.house_rules.iter().all(|r| r.chars().count() == 160));
        assert_eq!(ctx.reviews.len(), 4);
        assert!(ctx.reviews.iter().all(|r| r.chars().count() == 200));
        assert_eq!(ctx.amenities_listed.len(), 40);
    }

    #[test]
    fn short_text_is_left_alone() {
        assert_eq!(ellipsize("  Cosy loft  ", 400), "Cosy loft");
    }

    #[test]
    fn fences_are_stripped() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n[1]\n```  "), "[1]");
        assert_eq!(strip_code_fences(" {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn adjustment_is_clamped_and_overall_bounded() {
        let refined = apply_refinement(&baseline(), r#"{"overall_adjustment": 12}"#).unwrap();
        assert_eq!(refined.overall, 100);
        assert!(refined.refined);

        let refined = apply_refinement(&baseline(), r#"{"overall_adjustment": "-9"}"#).unwrap();
        assert_eq!(refined.overall, 93);
    }

    #[test]
    fn unusable_adjustment_rejects_the_response() {
        assert!(apply_refinement(&baseline(), r#"{"overall_adjustment": "lots"}"#).is_err());
        assert!(apply_refinement(&baseline(), "not json").is_err());
        assert!(apply_refinement(&baseline(), "[1, 2]").is_err());
    }

    #[test]
    fn malformed_fixes_are_dropped() {
        let fixes = parse_fixes(&json!([
            {"impact": "HIGH", "reason": "Add photos", "how_to_fix": "Shoot the kitchen"},
            {"reason": "No impact given", "how_to_fix": "Defaults to medium"},
            {"impact": "critical", "reason": "Unknown impact", "how_to_fix": "x"},
            {"impact": "low", "reason": "   ", "how_to_fix": "empty reason"},
            "not an object"
        ]));
        assert_eq!(fixes.len(), 2);
        assert_eq!(fixes[0].impact, Impact::High);
        assert_eq!(fixes[1].impact, Impact::Medium);
    }

    #[test]
    fn empty_fix_list_keeps_baseline_fixes() {
        let refined = apply_refinement(&baseline(), r#"{"top_fixes": []}"#).unwrap();
        assert_eq!(refined.top_fixes, baseline().top_fixes);
    }

    #[test]
    fn only_list_typed_amenity_fields_replace_baseline() {
        let refined = apply_refinement(
            &baseline(),
            r#"{"amenities": {"text_hits": ["Wifi", "Pool", " "], "listed_no_text_evidence": "none"}}"#,
        )
        .unwrap();
        assert_eq!(refined.amenities.text_hits, vec!["Wifi", "Pool"]);
        assert_eq!(refined.amenities.listed_no_text_evidence, vec!["Pool"]);
        assert_eq!(refined.amenities.listed, vec!["Wifi", "Pool"]);
    }

    #[test]
    fn overview_is_cleaned_and_capped() {
        assert_eq!(clean_overview("  \"Lovely place.\"  ").as_deref(), Some("Lovely place."));
        assert!(clean_overview("   ").is_none());
        let long = clean_overview(&"word ".repeat(300)).unwrap();
        assert!(long.chars().count() <= MAX_OVERVIEW_CHARS);
        assert!(long.ends_with("..."));
    }
}
