//! Mock pronunciation scorer
//!
//! No speech recognition happens anywhere in this service. Scores come from
//! a fixed per-word difficulty table plus bounded random perturbation, which
//! is enough to make the demo feel responsive. Randomness flows through an
//! `Rng` parameter so tests can seed it and assert exact outcomes.

use parlo_common::db::settings::DemoSettings;
use rand::Rng;
use serde::Serialize;

/// Words the demo treats as hard; each occurrence subtracts 10-25 points
const HARD_WORDS: &[&str] = &["allegations", "thoroughly", "seriously", "responsibility"];

/// Words the demo treats as easy; each occurrence adds 5-15 points
const EASY_WORDS: &[&str] = &["appreciate", "concern", "customer", "help"];

/// Phrase-level score bounds
const PHRASE_SCORE_MIN: i64 = 45;
const PHRASE_SCORE_MAX: i64 = 95;

/// Per-word score bounds
const WORD_SCORE_MIN: i64 = 30;
const WORD_SCORE_MAX: i64 = 100;

/// Scoring tunables, extracted from [`DemoSettings`]
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub base_score: i64,
    pub progress_threshold: i64,
    pub word_issue_threshold: i64,
}

impl From<&DemoSettings> for ScoringConfig {
    fn from(settings: &DemoSettings) -> Self {
        Self {
            base_score: settings.base_score,
            progress_threshold: settings.progress_threshold,
            word_issue_threshold: settings.word_issue_threshold,
        }
    }
}

/// Per-word entry in the pronunciation report
#[derive(Debug, Clone, Serialize)]
pub struct WordReport {
    pub word: String,
    pub score: i64,
    /// Phonetic issue category, present only when the word scored below the
    /// issue threshold
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<&'static str>,
}

/// Result of scoring one phrase
#[derive(Debug, Clone, Serialize)]
pub struct PhraseScore {
    pub score: i64,
    pub can_progress: bool,
    pub feedback: Vec<String>,
    pub words: Vec<WordReport>,
}

/// Score a phrase against the word difficulty table
pub fn score_phrase(phrase: &str, config: &ScoringConfig, rng: &mut impl Rng) -> PhraseScore {
    let words: Vec<String> = phrase
        .split_whitespace()
        .map(normalize_word)
        .filter(|w| !w.is_empty())
        .collect();

    let mut score = config.base_score;
    for word in &words {
        if HARD_WORDS.contains(&word.as_str()) {
            score -= rng.gen_range(10..=25);
        } else if EASY_WORDS.contains(&word.as_str()) {
            score += rng.gen_range(5..=15);
        }
    }
    score += rng.gen_range(-10..=10);
    let score = score.clamp(PHRASE_SCORE_MIN, PHRASE_SCORE_MAX);

    let word_reports = words
        .iter()
        .map(|word| {
            let word_score = (score + rng.gen_range(-15..=15)).clamp(WORD_SCORE_MIN, WORD_SCORE_MAX);
            let issue = if word_score < config.word_issue_threshold {
                Some(detect_issue(word))
            } else {
                None
            };
            WordReport {
                word: word.clone(),
                score: word_score,
                issue,
            }
        })
        .collect();

    PhraseScore {
        score,
        can_progress: score >= config.progress_threshold,
        feedback: build_feedback(phrase, score, config.progress_threshold),
        words: word_reports,
    }
}

/// Lowercase and strip punctuation, keeping letters and apostrophes
fn normalize_word(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphabetic() || *c == '\'')
        .collect::<String>()
        .to_lowercase()
}

/// Map a low-scoring word to a phonetic issue category
///
/// Checked in fixed order: R before TH before G, with a generic fallback.
fn detect_issue(word: &str) -> &'static str {
    if word.contains('r') {
        "r_sound"
    } else if word.contains("th") {
        "th_sound"
    } else if word.contains('g') {
        "g_sound"
    } else {
        "clarity"
    }
}

/// Human-readable feedback chosen by score band, plus sound-specific tips
fn build_feedback(phrase: &str, score: i64, progress_threshold: i64) -> Vec<String> {
    let mut feedback = Vec::new();

    if score >= 85 {
        feedback.push("Excellent pronunciation! You sound very natural.".to_string());
    } else if score >= 70 {
        feedback.push("Good job! Your pronunciation is clear and easy to understand.".to_string());
    } else if score >= progress_threshold {
        feedback.push("Not bad! A bit more practice will smooth out the rough spots.".to_string());
    } else {
        feedback.push("Keep practicing! Try speaking more slowly and clearly.".to_string());
    }

    let lower = phrase.to_lowercase();
    if lower.contains('r') {
        feedback.push(
            "Watch the American R: pull your tongue back without touching the roof of your mouth."
                .to_string(),
        );
    }
    if lower.contains("th") {
        feedback.push(
            "For the TH sound, place the tip of your tongue lightly between your teeth.".to_string(),
        );
    }
    if lower.contains("allegations") {
        feedback.push("Break long words into syllables: al-le-GA-tions.".to_string());
    }

    feedback
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config() -> ScoringConfig {
        ScoringConfig {
            base_score: 75,
            progress_threshold: 60,
            word_issue_threshold: 70,
        }
    }

    #[test]
    fn same_seed_gives_same_result() {
        let cfg = config();
        let mut rng_a = StdRng::seed_from_u64(7);
        let mut rng_b = StdRng::seed_from_u64(7);
        let a = score_phrase("We take customer satisfaction seriously", &cfg, &mut rng_a);
        let b = score_phrase("We take customer satisfaction seriously", &cfg, &mut rng_b);
        assert_eq!(a.score, b.score);
        assert_eq!(a.feedback, b.feedback);
        let scores_a: Vec<i64> = a.words.iter().map(|w| w.score).collect();
        let scores_b: Vec<i64> = b.words.iter().map(|w| w.score).collect();
        assert_eq!(scores_a, scores_b);
    }

    #[test]
    fn scores_stay_within_bounds_across_seeds() {
        let cfg = config();
        let phrases = [
            "I appreciate your concern",
            "Let me investigate these allegations thoroughly",
            "seriously seriously seriously seriously seriously",
            "appreciate appreciate appreciate appreciate appreciate",
            "a",
            "!!! ??? ...",
        ];
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            for phrase in &phrases {
                let result = score_phrase(phrase, &cfg, &mut rng);
                assert!(
                    (45..=95).contains(&result.score),
                    "phrase score {} out of range for {:?}",
                    result.score,
                    phrase
                );
                for word in &result.words {
                    assert!(
                        (30..=100).contains(&word.score),
                        "word score {} out of range",
                        word.score
                    );
                }
            }
        }
    }

    #[test]
    fn can_progress_matches_threshold() {
        let cfg = config();
        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let result = score_phrase("Let me investigate these allegations", &cfg, &mut rng);
            assert_eq!(result.can_progress, result.score >= cfg.progress_threshold);
        }
    }

    #[test]
    fn easy_words_outscore_hard_words_on_average() {
        let cfg = config();
        let mut easy_total = 0i64;
        let mut hard_total = 0i64;
        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            easy_total += score_phrase("I appreciate your concern", &cfg, &mut rng).score;
            let mut rng = StdRng::seed_from_u64(seed);
            hard_total +=
                score_phrase("Thoroughly investigate these allegations seriously", &cfg, &mut rng)
                    .score;
        }
        assert!(easy_total > hard_total);
    }

    #[test]
    fn punctuation_is_stripped_from_report_words() {
        let cfg = config();
        let mut rng = StdRng::seed_from_u64(1);
        let result = score_phrase("Hello, world!", &cfg, &mut rng);
        let words: Vec<&str> = result.words.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(words, vec!["hello", "world"]);
    }

    #[test]
    fn issue_categories_follow_letter_precedence() {
        assert_eq!(detect_issue("concern"), "r_sound");
        assert_eq!(detect_issue("though"), "th_sound");
        assert_eq!(detect_issue("going"), "g_sound");
        assert_eq!(detect_issue("same"), "clarity");
    }

    #[test]
    fn low_word_scores_get_flagged_high_ones_do_not() {
        let cfg = config();
        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let result = score_phrase("We take customer satisfaction seriously", &cfg, &mut rng);
            for word in &result.words {
                if word.score < cfg.word_issue_threshold {
                    assert!(word.issue.is_some());
                } else {
                    assert!(word.issue.is_none());
                }
            }
        }
    }

    #[test]
    fn low_scores_advise_practice() {
        let feedback = build_feedback("say something", 50, 60);
        assert!(feedback[0].contains("Keep practicing"));
        let feedback = build_feedback("say something", 90, 60);
        assert!(feedback[0].contains("Excellent"));
    }
}
