// Unit tests for scoring and output functions.
//
// Tests isolated pure functions: the two-head toxicity aggregate, the
// sigmoid applied to raw logits, direction → threshold selection, and
// truncate_chars UTF-8 safety.

use toxlens::output::truncate_chars;
use toxlens::scoring::toxicity::{score, sigmoid};
use toxlens::vault::Vault;
use toxlens::verdict::Direction;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ============================================================
// toxicity::score
// ============================================================

#[test]
fn score_clear_toxic_example() {
    // 1 - 0.1 * (1 - 0.05)
    assert!(close(score(0.1, 0.05), 0.905));
}

#[test]
fn score_fully_clean() {
    // Non-toxic head certain, secondary head silent.
    assert!(close(score(1.0, 0.0), 0.0));
}

#[test]
fn score_fully_toxic_when_first_head_zero() {
    assert!(close(score(0.0, 0.0), 1.0));
    assert!(close(score(0.0, 0.7), 1.0));
}

#[test]
fn score_secondary_head_can_push_to_one() {
    assert!(close(score(1.0, 1.0), 1.0));
}

#[test]
fn score_stays_in_unit_interval() {
    for i in 0..=10 {
        for j in 0..=10 {
            let s = score(i as f64 / 10.0, j as f64 / 10.0);
            assert!((0.0..=1.0).contains(&s), "score({i}, {j}) = {s}");
        }
    }
}

#[test]
fn score_monotone_in_secondary_head() {
    assert!(score(0.6, 0.2) < score(0.6, 0.4));
}

#[test]
fn score_antitone_in_first_head() {
    assert!(score(0.8, 0.2) < score(0.4, 0.2));
}

// ============================================================
// sigmoid
// ============================================================

#[test]
fn sigmoid_midpoint() {
    assert!(close(sigmoid(0.0), 0.5));
}

#[test]
fn sigmoid_symmetry() {
    assert!(close(sigmoid(2.0) + sigmoid(-2.0), 1.0));
}

#[test]
fn sigmoid_saturates_without_nan() {
    assert!(sigmoid(1000.0) <= 1.0);
    assert!(sigmoid(-1000.0) >= 0.0);
    assert!(!sigmoid(1000.0).is_nan());
}

// ============================================================
// Direction → vault threshold
// ============================================================

#[test]
fn direction_picks_matching_threshold() {
    let vault = Vault {
        toxicity_threshold_output: 0.3,
        toxicity_threshold_input: 0.7,
        attention_threshold_percentile: 0.85,
        top_k_tokens: 3,
    };
    assert_eq!(Direction::Input.threshold(&vault), 0.7);
    assert_eq!(Direction::Output.threshold(&vault), 0.3);
}

#[test]
fn direction_parses_and_displays() {
    assert_eq!("input".parse::<Direction>().unwrap(), Direction::Input);
    assert_eq!("output".parse::<Direction>().unwrap(), Direction::Output);
    assert!("sideways".parse::<Direction>().is_err());
    assert_eq!(Direction::Output.to_string(), "output");
}

// ============================================================
// truncate_chars: UTF-8 safety
// ============================================================

#[test]
fn truncate_short_string_unchanged() {
    assert_eq!(truncate_chars("hello", 10), "hello");
}

#[test]
fn truncate_exact_length_unchanged() {
    assert_eq!(truncate_chars("hello", 5), "hello");
}

#[test]
fn truncate_long_string_gets_ellipsis() {
    assert_eq!(truncate_chars("hello world", 5), "hello...");
}

#[test]
fn truncate_cyrillic_counts_characters() {
    // 8 characters, 15 bytes
    assert_eq!(truncate_chars("ты дурак", 2), "ты...");
}

#[test]
fn truncate_emoji_does_not_panic() {
    assert_eq!(truncate_chars("🔥🔥🔥", 1), "🔥...");
}

#[test]
fn truncate_empty_string() {
    assert_eq!(truncate_chars("", 3), "");
}
