// Toxicity aggregation for the two-headed classifier.
//
// Head `a` estimates "non-toxic", head `b` a secondary toxic category.
// `p_a * (1 - p_b)` is the probability the text is confidently clean and not
// in the secondary category; its complement is the toxicity estimate.

/// Collapse the two sigmoid-activated head outputs into one toxicity score.
///
/// Inputs are probabilities in [0, 1] by construction of the upstream
/// sigmoid, so no clamping is applied.
pub fn score(p_a: f64, p_b: f64) -> f64 {
    1.0 - p_a * (1.0 - p_b)
}

/// Sigmoid activation: maps any real number to (0, 1).
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confident_clean_scores_zero() {
        assert!(score(1.0, 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_clean_evidence_scores_one() {
        for p_b in [0.0, 0.3, 1.0] {
            assert!((score(0.0, p_b) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_secondary_category_certain_scores_one() {
        for p_a in [0.0, 0.5, 1.0] {
            assert!((score(p_a, 1.0) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_insult_example() {
        // 1 - 0.1 * 0.95
        assert!((score(0.1, 0.05) - 0.905).abs() < 1e-9);
    }

    #[test]
    fn test_sigmoid_zero() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-10, "sigmoid(0) should be 0.5");
    }

    #[test]
    fn test_sigmoid_symmetry() {
        for x in [0.5, 1.0, 2.0, 5.0] {
            let sum = sigmoid(x) + sigmoid(-x);
            assert!(
                (sum - 1.0).abs() < 1e-10,
                "sigmoid({x}) + sigmoid(-{x}) should equal 1.0"
            );
        }
    }
}
