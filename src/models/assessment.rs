use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How much a fix is expected to move conversion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    High,
    Medium,
    Low,
}

impl Impact {
    /// Sort rank, lower comes first
    pub fn rank(self) -> u8 {
        match self {
            Impact::High => 0,
            Impact::Medium => 1,
            Impact::Low => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Impact::High => "high",
            Impact::Medium => "medium",
            Impact::Low => "low",
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Impact {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Impact::High),
            "medium" => Ok(Impact::Medium),
            "low" => Ok(Impact::Low),
            other => Err(format!("unknown impact level: {other}")),
        }
    }
}

/// Single actionable suggestion for improving the listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopFix {
    pub impact: Impact,
    pub reason: String,
    pub how_to_fix: String,
}

impl TopFix {
    pub fn new(impact: Impact, reason: impl Into<String>, how_to_fix: impl Into<String>) -> Self {
        Self {
            impact,
            reason: reason.into(),
            how_to_fix: how_to_fix.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SectionScores {
    pub photos: u8,
    pub copy: u8,
    pub amenities_clarity: u8,
    pub trust_signals: u8,
}

impl SectionScores {
    pub fn values(&self) -> [u8; 4] {
        [
            self.photos,
            self.copy,
            self.amenities_clarity,
            self.trust_signals,
        ]
    }

    /// Rounded mean of the four sections
    pub fn overall(&self) -> u8 {
        let total: u32 = self.values().iter().map(|v| u32::from(*v)).sum();
        (f64::from(total) / 4.0).round() as u8
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PhotoStats {
    pub count: usize,
    pub coverage: Vec<String>,
    pub missing_coverage: Vec<String>,
    pub key_spaces_covered: usize,
    pub key_spaces_total: usize,
    pub has_exterior_night: bool,
    pub alt_text_ratio: Option<f64>,
    pub uses_legacy_gallery: bool,
    pub key_space_metrics_supported: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CopyStats {
    pub word_count: usize,
    pub flesch: Option<f64>,
    /// Percentage (0-100) of sentences addressing the guest directly
    pub second_person_pct: f64,
    pub has_sections: bool,
}

/// Cross-reference between declared amenities and the listing prose
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AmenityAudit {
    pub listed: Vec<String>,
    pub text_hits: Vec<String>,
    pub likely_present_not_listed: Vec<String>,
    pub listed_no_text_evidence: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TrustSignals {
    pub review_count: usize,
    pub review_snippets: Vec<String>,
    pub has_house_rules: bool,
    pub house_rule_count: usize,
    pub has_summary: bool,
    pub summary_length: usize,
    pub description_length: usize,
}

/// Deterministic scoring output for one `ListingContent`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeuristicResult {
    pub overall: u8,
    pub section_scores: SectionScores,
    pub photo_stats: PhotoStats,
    pub copy_stats: CopyStats,
    pub amenities: AmenityAudit,
    pub trust_stats: TrustSignals,
    pub recommendations: Vec<TopFix>,
}

/// Final assessment handed to callers.
///
/// Starts as a copy of the heuristic result; refinement and the pipeline
/// produce new values instead of editing the heuristic baseline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssessmentResult {
    pub overall: u8,
    pub section_scores: SectionScores,
    pub photo_stats: PhotoStats,
    pub copy_stats: CopyStats,
    pub amenities: AmenityAudit,
    pub trust_signals: TrustSignals,
    pub top_fixes: Vec<TopFix>,
    pub refined: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bonus_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_overview: Option<String>,
}

impl From<&HeuristicResult> for AssessmentResult {
    fn from(result: &HeuristicResult) -> Self {
        Self {
            overall: result.overall,
            section_scores: result.section_scores,
            photo_stats: result.photo_stats.clone(),
            copy_stats: result.copy_stats.clone(),
            amenities: result.amenities.clone(),
            trust_signals: result.trust_stats.clone(),
            top_fixes: result.recommendations.clone(),
            refined: false,
            bonus_summary: None,
            owner_overview: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impact_parses_case_insensitively() {
        assert_eq!("HIGH".parse::<Impact>().unwrap(), Impact::High);
        assert_eq!(" low ".parse::<Impact>().unwrap(), Impact::Low);
        assert!("critical".parse::<Impact>().is_err());
    }

    #[test]
    fn overall_is_rounded_mean() {
        let scores = SectionScores {
            photos: 55,
            copy: 90,
            amenities_clarity: 75,
            trust_signals: 40,
        };
        // 260 / 4 = 65
        assert_eq!(scores.overall(), 65);

        let scores = SectionScores {
            photos: 100,
            copy: 100,
            amenities_clarity: 100,
            trust_signals: 91,
        };
        // 97.75 rounds up
        assert_eq!(scores.overall(), 98);
    }

    #[test]
    fn section_scores_serialize_with_copy_key() {
        let scores = SectionScores {
            photos: 1,
            copy: 2,
            amenities_clarity: 3,
            trust_signals: 4,
        };
        let json = serde_json::to_value(scores).unwrap();
        assert_eq!(json["copy"], 2);
        assert_eq!(json["amenities_clarity"], 3);
    }
}
