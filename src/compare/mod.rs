//! Word-level comparison of a user's transcription attempt against the
//! automated transcription, producing per-token verdicts and an accuracy
//! score for the clip.

use crate::clips::{ComparisonResult, ComparisonToken, TokenVerdict};

/// Align a user transcription against the automated reference.
///
/// Matching is case-insensitive and ignores surrounding punctuation. Words
/// that differ slightly from their aligned reference word are flagged as
/// misspelled; reference words the user skipped come back as missing, and
/// user words with no counterpart as extra. Accuracy is the fraction of
/// reference words matched exactly.
pub fn compare_transcriptions(user: &str, automated: &str) -> ComparisonResult {
    let user_tokens = tokenize(user);
    let reference_tokens = tokenize(automated);

    if reference_tokens.is_empty() {
        let tokens = user_tokens
            .iter()
            .map(|t| ComparisonToken {
                word: t.original.clone(),
                verdict: TokenVerdict::Extra,
                expected: None,
            })
            .collect::<Vec<_>>();
        let accuracy = if user_tokens.is_empty() { 1.0 } else { 0.0 };
        return ComparisonResult { tokens, accuracy };
    }

    let alignment = align(&user_tokens, &reference_tokens);

    let mut tokens = Vec::new();
    let mut correct = 0usize;
    for step in alignment {
        match step {
            Step::Match(u, _) => {
                correct += 1;
                tokens.push(ComparisonToken {
                    word: user_tokens[u].original.clone(),
                    verdict: TokenVerdict::Correct,
                    expected: None,
                });
            }
            Step::Substitute(u, r) => {
                if is_near_miss(&user_tokens[u].normalized, &reference_tokens[r].normalized) {
                    tokens.push(ComparisonToken {
                        word: user_tokens[u].original.clone(),
                        verdict: TokenVerdict::Misspelled,
                        expected: Some(reference_tokens[r].original.clone()),
                    });
                } else {
                    tokens.push(ComparisonToken {
                        word: reference_tokens[r].original.clone(),
                        verdict: TokenVerdict::Missing,
                        expected: None,
                    });
                    tokens.push(ComparisonToken {
                        word: user_tokens[u].original.clone(),
                        verdict: TokenVerdict::Extra,
                        expected: None,
                    });
                }
            }
            Step::Delete(r) => {
                tokens.push(ComparisonToken {
                    word: reference_tokens[r].original.clone(),
                    verdict: TokenVerdict::Missing,
                    expected: None,
                });
            }
            Step::Insert(u) => {
                tokens.push(ComparisonToken {
                    word: user_tokens[u].original.clone(),
                    verdict: TokenVerdict::Extra,
                    expected: None,
                });
            }
        }
    }

    ComparisonResult {
        tokens,
        accuracy: correct as f64 / reference_tokens.len() as f64,
    }
}

struct Token {
    original: String,
    normalized: String,
}

fn tokenize(text: &str) -> Vec<Token> {
    text.split_whitespace()
        .filter_map(|raw| {
            let trimmed = raw.trim_matches(|c: char| !c.is_alphanumeric());
            if trimmed.is_empty() {
                return None;
            }
            Some(Token {
                original: trimmed.to_string(),
                normalized: trimmed.to_lowercase(),
            })
        })
        .collect()
}

enum Step {
    /// User word u matches reference word r exactly
    Match(usize, usize),
    /// User word u aligned against a different reference word r
    Substitute(usize, usize),
    /// Reference word r has no user counterpart
    Delete(usize),
    /// User word u has no reference counterpart
    Insert(usize),
}

/// Needleman-Wunsch alignment over normalized words, unit gap and mismatch
/// costs, zero cost for exact matches
fn align(user: &[Token], reference: &[Token]) -> Vec<Step> {
    let n = user.len();
    let m = reference.len();
    let mut cost = vec![vec![0usize; m + 1]; n + 1];
    for (i, row) in cost.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=m {
        cost[0][j] = j;
    }
    for i in 1..=n {
        for j in 1..=m {
            let sub = if user[i - 1].normalized == reference[j - 1].normalized {
                cost[i - 1][j - 1]
            } else {
                cost[i - 1][j - 1] + 1
            };
            cost[i][j] = sub.min(cost[i - 1][j] + 1).min(cost[i][j - 1] + 1);
        }
    }

    let mut steps = Vec::new();
    let (mut i, mut j) = (n, m);
    while i > 0 || j > 0 {
        if i > 0 && j > 0 {
            let matched = user[i - 1].normalized == reference[j - 1].normalized;
            let diagonal = cost[i - 1][j - 1] + usize::from(!matched);
            if cost[i][j] == diagonal {
                steps.push(if matched {
                    Step::Match(i - 1, j - 1)
                } else {
                    Step::Substitute(i - 1, j - 1)
                });
                i -= 1;
                j -= 1;
                continue;
            }
        }
        if j > 0 && (i == 0 || cost[i][j] == cost[i][j - 1] + 1) {
            steps.push(Step::Delete(j - 1));
            j -= 1;
        } else {
            steps.push(Step::Insert(i - 1));
            i -= 1;
        }
    }
    steps.reverse();
    steps
}

/// Substituted words within a small edit distance are treated as misspellings
/// rather than an unrelated missing/extra pair
fn is_near_miss(a: &str, b: &str) -> bool {
    let limit = if a.chars().count().min(b.chars().count()) < 3 {
        1
    } else {
        2
    };
    levenshtein(a, b) <= limit
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    for (i, &ca) in a.iter().enumerate() {
        let mut current = vec![i + 1];
        for (j, &cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current.push(substitution.min(previous[j + 1] + 1).min(current[j] + 1));
        }
        previous = current;
    }
    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdicts(result: &ComparisonResult) -> Vec<TokenVerdict> {
        result.tokens.iter().map(|t| t.verdict).collect()
    }

    #[test]
    fn test_identical_transcriptions() {
        let result = compare_transcriptions("the cat sat", "the cat sat");
        assert_eq!(result.accuracy, 1.0);
        assert!(result
            .tokens
            .iter()
            .all(|t| t.verdict == TokenVerdict::Correct));
    }

    #[test]
    fn test_case_and_punctuation_ignored() {
        let result = compare_transcriptions("The cat, sat!", "the cat sat");
        assert_eq!(result.accuracy, 1.0);
    }

    #[test]
    fn test_misspelled_word_flags_expected() {
        let result = compare_transcriptions("the kat sat", "the cat sat");
        let miss = result
            .tokens
            .iter()
            .find(|t| t.verdict == TokenVerdict::Misspelled)
            .unwrap();
        assert_eq!(miss.word, "kat");
        assert_eq!(miss.expected.as_deref(), Some("cat"));
        assert!(result.accuracy < 1.0);
    }

    #[test]
    fn test_missing_word() {
        let result = compare_transcriptions("the sat", "the cat sat");
        assert!(verdicts(&result).contains(&TokenVerdict::Missing));
        assert!((result.accuracy - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_extra_word() {
        let result = compare_transcriptions("the big cat sat", "the cat sat");
        assert!(verdicts(&result).contains(&TokenVerdict::Extra));
        assert_eq!(result.accuracy, 1.0);
    }

    #[test]
    fn test_unrelated_substitution_becomes_missing_plus_extra() {
        let result = compare_transcriptions("the dog sat", "the elephant sat");
        let v = verdicts(&result);
        assert!(v.contains(&TokenVerdict::Missing));
        assert!(v.contains(&TokenVerdict::Extra));
        assert!(!v.contains(&TokenVerdict::Misspelled));
    }

    #[test]
    fn test_empty_inputs() {
        let result = compare_transcriptions("", "");
        assert!(result.tokens.is_empty());
        assert_eq!(result.accuracy, 1.0);

        let result = compare_transcriptions("hello", "");
        assert_eq!(result.accuracy, 0.0);
        assert_eq!(verdicts(&result), vec![TokenVerdict::Extra]);

        let result = compare_transcriptions("", "hello");
        assert_eq!(result.accuracy, 0.0);
        assert_eq!(verdicts(&result), vec![TokenVerdict::Missing]);
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("cat", "cat"), 0);
        assert_eq!(levenshtein("cat", "kat"), 1);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
    }
}
