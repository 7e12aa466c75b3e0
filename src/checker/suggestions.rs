use crate::checker::dictionary::DictionaryStore;
use unicode_segmentation::UnicodeSegmentation;

const MAX_DISTANCE: usize = 2;

/// Suggest dictionary words close to `word`, nearest first.
///
/// Distance is counted in grapheme clusters, so a consonant with its vowel
/// sign counts as one letter.
pub fn generate(word: &str, dictionary: &DictionaryStore, max_suggestions: usize) -> Vec<String> {
    let target: Vec<&str> = word.graphemes(true).collect();
    if target.is_empty() || max_suggestions == 0 {
        return Vec::new();
    }

    // 1. Words sharing the first letter (cheap prefix walk)
    let mut candidates = ranked(&target, dictionary.words_with_prefix(target[0]));

    // 2. Whole dictionary, for typos in the first letter
    if candidates.len() < max_suggestions {
        for candidate in ranked(&target, dictionary.words()) {
            if !candidates.iter().any(|(_, w)| *w == candidate.1) {
                candidates.push(candidate);
            }
        }
        candidates.sort();
    }

    candidates
        .into_iter()
        .take(max_suggestions)
        .map(|(_, word)| word)
        .collect()
}

fn ranked(target: &[&str], words: Vec<String>) -> Vec<(usize, String)> {
    let mut ranked: Vec<(usize, String)> = words
        .into_iter()
        .filter_map(|candidate| {
            let graphemes: Vec<&str> = candidate.graphemes(true).collect();
            if graphemes.len().abs_diff(target.len()) > MAX_DISTANCE {
                return None;
            }
            let distance = edit_distance(target, &graphemes);
            if distance == 0 || distance > MAX_DISTANCE {
                return None;
            }
            Some((distance, candidate))
        })
        .collect();
    ranked.sort();
    ranked
}

/// Levenshtein distance over grapheme clusters
fn edit_distance(a: &[&str], b: &[&str]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, a_item) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, b_item) in b.iter().enumerate() {
            let cost = if a_item == b_item { 0 } else { 1 };
            current[j + 1] = std::cmp::min(
                std::cmp::min(
                    previous[j + 1] + 1, // deletion
                    current[j] + 1,      // insertion
                ),
                previous[j] + cost, // substitution
            );
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}
