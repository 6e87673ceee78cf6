use std::collections::BTreeSet;

pub fn l2_norm(v: &[f32]) -> f32 {
    let mut sum = 0.0f32;
    for x in v {
        sum += x * x;
    }
    sum.sqrt()
}

pub fn cosine_similarity(a: &[f32], b: &[f32], a_norm: f32, b_norm: f32) -> f32 {
    let mut dot = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
    }
    dot / (a_norm * b_norm)
}

/// Jaccard overlap of lowercase word sets. Used to decide whether two
/// chunks of the same source are the same evidence.
pub fn token_overlap(a: &str, b: &str) -> f32 {
    let ta: BTreeSet<String> = a.split_whitespace().map(|w| w.to_lowercase()).collect();
    let tb: BTreeSet<String> = b.split_whitespace().map(|w| w.to_lowercase()).collect();
    let union = ta.union(&tb).count();
    if union == 0 {
        return 1.0;
    }
    let inter = ta.intersection(&tb).count();
    inter as f32 / union as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_texts_fully_overlap() {
        assert_eq!(token_overlap("one two three", "three two one"), 1.0);
    }

    #[test]
    fn disjoint_texts_do_not_overlap() {
        assert_eq!(token_overlap("alpha beta", "gamma delta"), 0.0);
    }
}
