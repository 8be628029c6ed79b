use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static PARENTHETICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\(.*?\)").expect("valid parenthetical regex"));
static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s]").expect("valid alnum regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Cues that flip a nearby mention into an absence
pub const NEGATION_CUES: &[&str] = &[
    "no",
    "without",
    "not included",
    "not available",
    "doesn t",
    "does not",
    "lacks",
    "lack of",
    "unavailable",
    "missing",
];

/// Words either side of a mention that are checked for negation
pub const NEGATION_WINDOW: usize = 5;

/// Curated synonyms, keyed by canonical amenity label
const SYNONYMS: &[(&str, &[&str])] = &[
    ("air conditioning", &["ac", "a/c", "aircon", "climate control", "central air", "cooling"]),
    ("heating", &["central heat", "heat", "heater", "furnace"]),
    ("wifi", &["wi-fi", "wi fi", "internet", "wireless internet", "high speed internet"]),
    ("desk", &["workspace", "work desk", "office desk", "working area"]),
    ("parking", &["garage", "driveway parking", "free parking", "onsite parking"]),
    ("ev charger", &["electric vehicle charger", "ev charging", "car charger"]),
    ("hot tub", &["spa", "jacuzzi", "soaking tub"]),
    ("pool", &["swimming pool", "lap pool", "plunge pool"]),
    ("washer", &["washing machine", "laundry machine", "in suite laundry"]),
    ("dryer", &["clothes dryer", "tumble dryer"]),
    ("bbq grill", &["barbecue", "bbq", "barbeque grill"]),
    ("fireplace", &["indoor fireplace", "wood stove", "fire pit"]),
    ("patio", &["terrace", "deck", "outdoor seating"]),
    ("balcony", &["veranda", "lanai"]),
    ("smart tv", &["streaming tv", "roku tv", "apple tv"]),
    ("crib", &["cot", "pack and play"]),
    ("coffee maker", &["espresso machine", "coffee machine", "keurig"]),
    ("gym", &["fitness room", "exercise room", "fitness center"]),
    ("beach access", &["walk to beach", "steps to beach"]),
];

/// Lowercase, trim and collapse internal whitespace
pub fn canonicalize(value: &str) -> String {
    WHITESPACE.replace_all(value.trim(), " ").to_lowercase()
}

/// Lowercased, alphanumeric-only form used for word-window comparisons
pub fn normalize_for_window(text: &str) -> String {
    let lowered = text.to_lowercase().replace(['/', '-'], " ");
    let stripped = NON_ALNUM.replace_all(&lowered, " ");
    WHITESPACE.replace_all(stripped.trim(), " ").to_string()
}

/// Every phrase that counts as a mention of `canonical`, sorted and unique
pub fn aliases_for(canonical: &str) -> Vec<String> {
    let mut aliases = BTreeSet::new();
    if !canonical.is_empty() {
        aliases.insert(canonical.to_string());
    }

    let base = PARENTHETICAL.replace_all(canonical, "");
    let base = base.trim();
    if !base.is_empty() {
        aliases.insert(base.to_string());
    }

    aliases.extend(
        canonical
            .split(['/', ',', '&'])
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(str::to_string),
    );

    if let Some((_, synonyms)) = SYNONYMS.iter().find(|(label, _)| *label == canonical) {
        aliases.extend(
            synonyms
                .iter()
                .map(|s| canonicalize(s))
                .filter(|s| !s.is_empty()),
        );
    }

    aliases.into_iter().collect()
}

/// Split prose on sentence-ending punctuation followed by whitespace
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut prev = None;

    for c in text.chars() {
        let c = if c == '\n' { ' ' } else { c };
        if c.is_whitespace() && matches!(prev, Some('.' | '!' | '?')) {
            push_trimmed(&mut sentences, &current);
            current.clear();
        } else {
            current.push(c);
        }
        prev = Some(c);
    }
    push_trimmed(&mut sentences, &current);
    sentences
}

fn push_trimmed(out: &mut Vec<String>, sentence: &str) {
    let trimmed = sentence.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

/// Whether normalized text contains any negation cue as whole words
pub fn contains_negation(normalized: &str) -> bool {
    let padded = format!(" {normalized} ");
    NEGATION_CUES
        .iter()
        .any(|cue| padded.contains(&format!(" {cue} ")))
}

/// Whether any occurrence of `alias` in the sentence sits near a negation cue
pub fn is_negated(normalized_sentence: &str, alias: &str) -> bool {
    if !normalized_sentence.contains(alias) {
        return false;
    }
    let words: Vec<&str> = normalized_sentence.split_whitespace().collect();
    let alias_words: Vec<&str> = alias.split_whitespace().collect();
    if alias_words.is_empty() || alias_words.len() > words.len() {
        return false;
    }

    (0..=words.len() - alias_words.len())
        .filter(|&idx| words[idx..idx + alias_words.len()] == alias_words[..])
        .any(|idx| {
            let start = idx.saturating_sub(NEGATION_WINDOW);
            let end = (idx + alias_words.len() + NEGATION_WINDOW).min(words.len());
            contains_negation(&words[start..end].join(" "))
        })
}
