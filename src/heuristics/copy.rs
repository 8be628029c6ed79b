use super::{clamp_score, Section};
use crate::models::{CopyStats, Impact, ListingContent, TopFix};
use once_cell::sync::Lazy;
use regex::Regex;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b").expect("valid word regex"));
static SENTENCE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").expect("valid sentence regex"));
static SECOND_PERSON: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\byour?\b").expect("valid pronoun regex"));
static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|\n)\s*(?:[-*•]|\d+\.)\s+\w+").expect("valid list marker regex"));
static READABILITY_SENTENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]+").expect("valid readability regex"));

/// Flesch reading ease: higher is easier. `None` for text without words.
pub fn flesch_reading_ease(text: &str) -> Option<f64> {
    let words: Vec<&str> = WORD.find_iter(text).map(|m| m.as_str()).collect();
    if words.is_empty() {
        return None;
    }
    let sentences = READABILITY_SENTENCE
        .split(text)
        .filter(|s| WORD.is_match(s))
        .count()
        .max(1);
    let syllables: usize = words.iter().map(|w| count_syllables(w)).sum();

    let words_per_sentence = words.len() as f64 / sentences as f64;
    let syllables_per_word = syllables as f64 / words.len() as f64;
    Some(206.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word)
}

/// Vowel-group syllable estimate with a silent trailing "e"
pub fn count_syllables(word: &str) -> usize {
    let letters: Vec<char> = word
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect();
    if letters.is_empty() {
        return 0;
    }

    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
    let mut groups = 0;
    let mut in_group = false;
    for &c in &letters {
        let vowel = is_vowel(c);
        if vowel && !in_group {
            groups += 1;
        }
        in_group = vowel;
    }

    let n = letters.len();
    let silent_e = n > 2 && letters[n - 1] == 'e' && letters[n - 2] != 'l' && !is_vowel(letters[n - 2]);
    if silent_e && groups > 1 {
        groups -= 1;
    }
    groups.max(1)
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn score_copy(content: &ListingContent) -> Section<CopyStats> {
    let description = match content.description.trim() {
        "" => content.full_text.as_str(),
        trimmed => trimmed,
    };
    let word_count = WORD.find_iter(description).count();
    let flesch = flesch_reading_ease(description);

    let sentences: Vec<&str> = SENTENCE_BREAK
        .split(description)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let addressed = sentences.iter().filter(|s| SECOND_PERSON.is_match(s)).count();
    let second_person = if sentences.is_empty() {
        0.0
    } else {
        addressed as f64 / sentences.len() as f64
    };

    let has_sections = LIST_MARKER.is_match(&description.to_lowercase()) || description.contains("\n\n");

    let mut score: i32 = 100;
    let mut fixes = Vec::new();

    if word_count < 120 {
        score -= 35;
        fixes.push(TopFix::new(
            Impact::High,
            "Description is too short",
            "Expand the description to 200+ words covering layout, highlights, and nearby draws.",
        ));
    } else if word_count < 180 {
        score -= 15;
    }

    match flesch {
        Some(ease) if ease < 45.0 => {
            score -= 25;
            fixes.push(TopFix::new(
                Impact::Medium,
                "Copy is dense and hard to scan",
                "Use shorter sentences and break long paragraphs into bullets.",
            ));
        }
        Some(ease) if ease < 55.0 => score -= 10,
        _ => {}
    }

    if second_person < 0.2 {
        score -= 10;
        fixes.push(TopFix::new(
            Impact::Low,
            "Description rarely speaks to the guest",
            "Add lines that highlight benefits in second person (e.g., 'You'll love ...').",
        ));
    }

    if !has_sections {
        score -= 8;
        fixes.push(TopFix::new(
            Impact::Medium,
            "Description lacks scannable sections",
            "Introduce short headings or bullet lists for rooms, amenities, and policies.",
        ));
    }

    Section {
        stats: CopyStats {
            word_count,
            flesch: flesch.map(|f| round_to(f, 1)),
            second_person_pct: round_to(second_person * 100.0, 1),
            has_sections,
        },
        score: clamp_score(score),
        fixes,
    }
}
