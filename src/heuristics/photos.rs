use super::{clamp_score, Section};
use crate::extract::is_generic_label;
use crate::models::{Impact, PhotoMeta, PhotoStats, TopFix};
use std::collections::{BTreeSet, HashSet};

/// Fewest all-generic photos that mark a gallery as legacy on their own
pub const LEGACY_MIN_GENERIC_PHOTOS: usize = 3;

const COVERAGE_KEYWORDS: &[(&str, &[&str])] = &[
    ("bedroom", &["bedroom", "primary bedroom", "guest room", "bunk", "bed"]),
    ("bath", &["bathroom", "shower", "bath", "tub"]),
    ("kitchen", &["kitchen", "dining", "cook", "cookware", "stove", "oven"]),
    ("living", &["living room", "sofa", "lounge", "fireplace"]),
    ("exterior_day", &["exterior", "patio", "balcony", "yard", "terrace", "porch", "deck"]),
    ("exterior_night", &["night", "evening", "sunset"]),
];

/// Alphabetical, so missing spaces are reported in a stable order
const ESSENTIAL_SPACES: &[&str] = &["bath", "bedroom", "exterior_day", "kitchen", "living"];

/// Treat galleries whose captions are all empty or auto-numbered as legacy,
/// even when the page markup gave no explicit hint.
pub fn resolve_legacy_gallery(photos: &[PhotoMeta], flagged: bool) -> bool {
    if flagged {
        return true;
    }
    if photos.is_empty() {
        return false;
    }
    let generic = photos
        .iter()
        .filter(|photo| {
            let alt = photo.alt.as_deref().unwrap_or_default().trim();
            alt.is_empty() || is_generic_label(alt)
        })
        .count();
    generic >= LEGACY_MIN_GENERIC_PHOTOS.max(photos.len())
}

fn infer_coverage(photos: &[PhotoMeta]) -> BTreeSet<&'static str> {
    let mut coverage = BTreeSet::new();
    for photo in photos {
        let caption = photo.alt.as_deref().unwrap_or_default().to_lowercase();
        for (bucket, keywords) in COVERAGE_KEYWORDS {
            if keywords.iter().any(|k| caption.contains(k)) {
                coverage.insert(*bucket);
            }
        }
    }
    coverage
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn score_photos(photos: &[PhotoMeta], uses_legacy_gallery: bool) -> Section<PhotoStats> {
    let count = photos.len();
    let unique_urls: HashSet<&str> = photos
        .iter()
        .map(|p| p.url.as_str())
        .filter(|u| !u.is_empty())
        .collect();
    let duplicate_ratio = (count > 0 && !unique_urls.is_empty())
        .then(|| (count - unique_urls.len()) as f64 / count as f64);

    let coverage = if uses_legacy_gallery {
        BTreeSet::new()
    } else {
        infer_coverage(photos)
    };
    let missing: Vec<&str> = if uses_legacy_gallery {
        Vec::new()
    } else {
        ESSENTIAL_SPACES
            .iter()
            .copied()
            .filter(|space| !coverage.contains(space))
            .collect()
    };
    let covered = ESSENTIAL_SPACES.len() - missing.len();

    let captioned = photos
        .iter()
        .filter(|p| !p.alt.as_deref().unwrap_or_default().trim().is_empty())
        .count();
    let alt_text_ratio = match count {
        0 => None,
        _ if uses_legacy_gallery => Some(0.0),
        _ => Some(round_to(captioned as f64 / count as f64, 3)),
    };

    let mut score: i32 = 100;
    let mut fixes = Vec::new();

    if count < 5 {
        score -= 45;
        fixes.push(TopFix::new(
            Impact::High,
            "Too few gallery photos",
            "Upload at least 10 high-quality photos covering each room.",
        ));
    } else if count < 10 {
        score -= 25;
        fixes.push(TopFix::new(
            Impact::High,
            "Limited gallery depth",
            "Aim for 12-15 photos to cover bedrooms, bathrooms, kitchen, and exterior.",
        ));
    }

    match duplicate_ratio {
        Some(ratio) if ratio > 0.35 => {
            score -= 25;
            fixes.push(TopFix::new(
                Impact::Medium,
                "Gallery includes near-duplicate photos",
                "Swap repetitive angles for unique shots that show new details.",
            ));
        }
        Some(ratio) if ratio > 0.2 => score -= 12,
        _ => {}
    }

    if !missing.is_empty() {
        score -= (missing.len() as i32 * 6).min(30);
        fixes.push(TopFix::new(
            Impact::High,
            format!("Gallery missing: {}", missing.join(", ")),
            "Add clear photos for each missing area to reassure guests.",
        ));
    }

    if uses_legacy_gallery {
        fixes.push(TopFix::new(
            Impact::Low,
            "Gallery uses Airbnb's legacy layout",
            "Switch to Airbnb's newer room-by-room gallery so guests can explore each space in the guided tour.",
        ));
    }

    let supported = !uses_legacy_gallery;
    Section {
        stats: PhotoStats {
            count,
            coverage: coverage.iter().map(|b| b.to_string()).collect(),
            missing_coverage: missing.iter().map(|b| b.to_string()).collect(),
            key_spaces_covered: if supported { covered } else { 0 },
            key_spaces_total: if supported { ESSENTIAL_SPACES.len() } else { 0 },
            has_exterior_night: coverage.contains("exterior_night"),
            alt_text_ratio,
            uses_legacy_gallery,
            key_space_metrics_supported: supported,
        },
        score: clamp_score(score),
        fixes,
    }
}
