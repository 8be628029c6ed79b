//! Weighted fuzzy similarity on a 0-100 scale.
//!
//! Combines a plain ratio with partial and token-based ratios, scaling the
//! partial scores down as the two strings diverge in length so that a short
//! alias inside a long sentence cannot dominate.

use std::collections::BTreeSet;

const UNBASE_SCALE: f64 = 0.95;

/// Plain edit-distance similarity, 0-100.
///
/// Levenshtein rather than insertion/deletion-only distance, so a dropped
/// letter costs a full edit and scores a little lower.
pub fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    strsim::normalized_levenshtein(a, b) * 100.0
}

/// Best ratio of the shorter string against any equally long window of the longer
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let (short, long) = if a.chars().count() <= b.chars().count() { (a, b) } else { (b, a) };
    let short_len = short.chars().count();
    if short_len == 0 {
        return 0.0;
    }
    let long_chars: Vec<char> = long.chars().collect();
    if long_chars.len() == short_len {
        return ratio(short, long);
    }

    let mut best: f64 = 0.0;
    for start in 0..=long_chars.len() - short_len {
        let window: String = long_chars[start..start + short_len].iter().collect();
        best = best.max(ratio(short, &window));
        if best >= 100.0 {
            break;
        }
    }
    best
}

fn tokens(s: &str) -> BTreeSet<&str> {
    s.split_whitespace().collect()
}

fn sorted_tokens(s: &str) -> String {
    let mut words: Vec<&str> = s.split_whitespace().collect();
    words.sort_unstable();
    words.join(" ")
}

pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let (ta, tb) = (tokens(a), tokens(b));
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let shared: Vec<&str> = ta.intersection(&tb).copied().collect();
    let only_a: Vec<&str> = ta.difference(&tb).copied().collect();
    let only_b: Vec<&str> = tb.difference(&ta).copied().collect();

    // One side's words are all contained in the other's
    if !shared.is_empty() && (only_a.is_empty() || only_b.is_empty()) {
        return 100.0;
    }

    let base = shared.join(" ");
    let combine = |rest: &[&str]| {
        if base.is_empty() {
            rest.join(" ")
        } else {
            format!("{base} {}", rest.join(" "))
        }
    };
    let with_a = combine(&only_a);
    let with_b = combine(&only_b);

    ratio(&base, &with_a)
        .max(ratio(&base, &with_b))
        .max(ratio(&with_a, &with_b))
}

fn partial_token_ratio(a: &str, b: &str) -> f64 {
    let (ta, tb) = (tokens(a), tokens(b));
    if ta.intersection(&tb).next().is_some() {
        return 100.0;
    }
    partial_ratio(&sorted_tokens(a), &sorted_tokens(b))
}

/// Weighted combination of the ratios above, 0-100
pub fn weighted_ratio(a: &str, b: &str) -> f64 {
    let (len_a, len_b) = (a.chars().count(), b.chars().count());
    if len_a == 0 || len_b == 0 {
        return 0.0;
    }

    let base = ratio(a, b);
    let len_ratio = len_a.max(len_b) as f64 / len_a.min(len_b) as f64;

    if len_ratio < 1.5 {
        let token = token_sort_ratio(a, b).max(token_set_ratio(a, b));
        return base.max(token * UNBASE_SCALE);
    }

    let partial_scale = if len_ratio < 8.0 { 0.9 } else { 0.6 };
    base.max(partial_ratio(a, b) * partial_scale)
        .max(partial_token_ratio(a, b) * UNBASE_SCALE * partial_scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_full() {
        assert_eq!(weighted_ratio("wifi", "wifi"), 100.0);
        assert_eq!(weighted_ratio("", "wifi"), 0.0);
    }

    #[test]
    fn small_typos_stay_above_threshold() {
        assert!(weighted_ratio("coffee maker", "coffe maker") >= 90.0);
        assert!(weighted_ratio("dryer clothes", "clothes dryer") >= 90.0);
    }

    #[test]
    fn dropped_letter_costs_one_full_edit() {
        let score = ratio("coffee maker", "coffe maker");
        assert!((score - 100.0 * 11.0 / 12.0).abs() < 1e-9);
        assert_eq!(ratio("wifi", "wifi"), 100.0);
    }

    #[test]
    fn alias_inside_moderate_sentence_matches() {
        assert!(weighted_ratio("parking", "free parking available") >= 90.0);
    }

    #[test]
    fn short_alias_in_long_sentence_is_damped() {
        let sentence = "the kitchen is large and bright with views over the old harbour";
        assert!(weighted_ratio("pool", sentence) < 90.0);
    }

    #[test]
    fn partial_ratio_finds_best_window() {
        assert_eq!(partial_ratio("tub", "hot tub"), 100.0);
        assert_eq!(partial_ratio("bbq grill", "grill"), 100.0);
        assert!(partial_ratio("jacuzzi", "the spa") < 50.0);
    }
}
