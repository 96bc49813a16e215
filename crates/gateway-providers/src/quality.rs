//! Heuristic response quality scoring (spec.md §4.1.1).

/// Score `response` on a 0..=100 scale. Starts at 70 and applies additive
/// adjustments for length, formatting signals, and a clean ending.
#[must_use]
pub fn score_quality(response: &str) -> f64 {
    let mut score = 70.0;
    let len = response.len();

    if len > 100 {
        score += 5.0;
    }
    if len > 500 {
        score += 5.0;
    }
    if len > 2000 {
        score += 5.0;
    }
    if len > 10_000 {
        score -= 5.0;
    }

    if response.contains("```") {
        score += 5.0;
    }
    if response.contains("**") {
        score += 2.0;
    }
    if response.lines().any(|l| {
        let trimmed = l.trim_start();
        trimmed.starts_with('-') || trimmed.starts_with('*') || trimmed.starts_with("1.")
    }) {
        score += 2.0;
    }
    if response.lines().any(|l| l.trim_start().starts_with('#')) {
        score += 2.0;
    }

    if !response.contains("undefined") && !response.contains("NaN") {
        score += 3.0;
    }

    if let Some(last) = response.trim_end().chars().last() {
        if matches!(last, '.' | '!' | '?' | '`' | '"' | '\'' | ')') {
            score += 5.0;
        }
    }

    score.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_score_for_a_plain_short_sentence() {
        let score = score_quality("Hi there.");
        assert_eq!(score, 75.0); // +5 ending bonus only (len 9 < 100)
    }

    #[test]
    fn rewards_length_code_blocks_and_clean_endings() {
        let long_with_code = format!("{}\n```\nfn main() {{}}\n```\n", "x".repeat(600));
        let score = score_quality(&long_with_code);
        assert!(score > 80.0);
    }

    #[test]
    fn penalizes_very_long_responses() {
        let huge = "x".repeat(10_001);
        let score = score_quality(&huge);
        // +5 (>100) +5 (>500) +5 (>2000) -5 (>10000) +3 (no undefined/NaN), no ending bonus
        assert_eq!(score, 70.0 + 5.0 + 5.0 + 5.0 - 5.0 + 3.0);
    }

    #[test]
    fn penalizes_undefined_and_nan_sentinels() {
        let clean = score_quality("result is 42.");
        let dirty = score_quality("result is undefined.");
        assert!(dirty < clean);
    }

    #[test]
    fn score_never_leaves_the_0_to_100_range() {
        assert!(score_quality("") >= 0.0);
        assert!(score_quality(&"a".repeat(50_000)) <= 100.0);
    }
}
