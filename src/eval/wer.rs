//! Word and character error rates

use strsim::generic_levenshtein;

/// Word edits needed to turn `reference` into `hypothesis`, per reference word
pub fn word_error_rate(reference: &str, hypothesis: &str) -> f64 {
    let reference: Vec<&str> = reference.split_whitespace().collect();
    let hypothesis: Vec<&str> = hypothesis.split_whitespace().collect();
    error_rate(reference, hypothesis)
}

/// Character edits per reference character
pub fn char_error_rate(reference: &str, hypothesis: &str) -> f64 {
    let reference: Vec<char> = reference.trim().chars().collect();
    let hypothesis: Vec<char> = hypothesis.trim().chars().collect();
    error_rate(reference, hypothesis)
}

fn error_rate<T: PartialEq>(reference: Vec<T>, hypothesis: Vec<T>) -> f64 {
    let edits = generic_levenshtein(&reference, &hypothesis);
    match reference.len() {
        // Empty reference: perfect only if the hypothesis is empty too
        0 if hypothesis.is_empty() => 0.0,
        0 => 1.0,
        n => edits as f64 / n as f64,
    }
}
