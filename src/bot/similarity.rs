//! Word similarity measures used by bot suspicion heuristics.
//!
//! All scores are in [0, 1].

use crate::words::{CLUE_RELATIONS, SEMANTIC_GROUPS, VAGUE_WORDS};

/// How a word relates to everything else said so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordPattern {
    Outlier,
    Normal,
    Conforming,
}

fn normalize(word: &str) -> String {
    word.trim().to_lowercase()
}

/// Substring match in either direction; empty strings never match
fn loosely_contains(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && (a.contains(b) || b.contains(a))
}

fn semantic_groups_of(word: &str) -> impl Iterator<Item = usize> + '_ {
    SEMANTIC_GROUPS
        .iter()
        .enumerate()
        .filter(move |(_, group)| group.iter().any(|w| loosely_contains(word, w)))
        .map(|(i, _)| i)
}

/// Similarity between two words: exact match, shared semantic group, or edit distance
pub fn word_similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let groups_b: Vec<usize> = semantic_groups_of(&b).collect();
    if semantic_groups_of(&a).any(|g| groups_b.contains(&g)) {
        return 0.8;
    }

    strsim::normalized_levenshtein(&a, &b)
}

/// Similarity between a word and an impostor clue
pub fn clue_similarity(word: &str, clue: Option<&str>) -> f64 {
    let Some(clue) = clue else {
        return 0.0;
    };
    let word = normalize(word);
    let clue = normalize(clue);
    if word.is_empty() {
        return 0.0;
    }

    if clue
        .split_whitespace()
        .any(|keyword| loosely_contains(&word, keyword))
    {
        return 0.8;
    }

    let related = CLUE_RELATIONS
        .iter()
        .filter(|(category, _)| clue.contains(category))
        .any(|(_, words)| words.iter().any(|w| loosely_contains(&word, w)));
    if related {
        return 0.7;
    }

    0.3
}

/// Short words and generic terms give nothing away
pub fn is_vague(word: &str) -> bool {
    let w = normalize(word);
    w.chars().count() < 4 || VAGUE_WORDS.iter().any(|vague| w.contains(vague))
}

/// Classify a word by its average similarity to the other observed words
pub fn word_pattern<'a>(word: &str, others: impl IntoIterator<Item = &'a str>) -> WordPattern {
    let similarities: Vec<f64> = others
        .into_iter()
        .filter(|other| !other.eq_ignore_ascii_case(word))
        .map(|other| word_similarity(word, other))
        .collect();

    if similarities.is_empty() {
        return WordPattern::Normal;
    }

    let avg = similarities.iter().sum::<f64>() / similarities.len() as f64;
    if avg < 0.3 {
        WordPattern::Outlier
    } else if avg > 0.7 {
        WordPattern::Conforming
    } else {
        WordPattern::Normal
    }
}
