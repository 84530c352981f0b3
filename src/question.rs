use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Number of choices offered per question in multiple-choice sessions,
/// capped by the number of distinct possible answers for small alphabets.
pub const OPTION_COUNT: usize = 6;

/// Which answer space the user must respond in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum AnswerMode {
    /// Prompt is a letter, expected answer is its 1-based position
    Number,
    /// Prompt is a number, expected answer is the letter at that position
    Text,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Question {
    pub prompt: String,
    pub expected: String,
    pub mode: AnswerMode,
}

impl Question {
    /// Case-insensitive for letters, exact for numbers
    pub fn matches(&self, answer: &str) -> bool {
        let answer = answer.trim();
        match self.mode {
            AnswerMode::Number => answer == self.expected,
            AnswerMode::Text => answer.eq_ignore_ascii_case(&self.expected),
        }
    }
}

/// Builds the canonical pool: both directions for every letter, so the pool
/// always holds exactly `2 * alphabet.len()` questions in alphabet order.
pub fn build_pool(alphabet: &[char]) -> Vec<Question> {
    let mut pool = Vec::with_capacity(alphabet.len() * 2);
    for (i, letter) in alphabet.iter().enumerate() {
        let number = (i + 1).to_string();
        pool.push(Question {
            prompt: letter.to_string(),
            expected: number.clone(),
            mode: AnswerMode::Number,
        });
        pool.push(Question {
            prompt: number,
            expected: letter.to_string(),
            mode: AnswerMode::Text,
        });
    }
    pool
}

/// Uniformly shuffled copy of the canonical pool
pub fn shuffled_pool(alphabet: &[char]) -> Vec<Question> {
    let mut pool = build_pool(alphabet);
    pool.shuffle(&mut rand::thread_rng());
    pool
}

/// Stateless roll for Tournament Mode: uniform letter, fair coin for the
/// direction. Repeats are allowed.
pub fn random_question(alphabet: &[char], rng: &mut impl Rng) -> Option<Question> {
    if alphabet.is_empty() {
        return None;
    }
    let i = rng.gen_range(0..alphabet.len());
    let question = if rng.gen_bool(0.5) {
        Question {
            prompt: alphabet[i].to_string(),
            expected: (i + 1).to_string(),
            mode: AnswerMode::Number,
        }
    } else {
        Question {
            prompt: (i + 1).to_string(),
            expected: alphabet[i].to_string(),
            mode: AnswerMode::Text,
        }
    };
    Some(question)
}

/// Option set for a multiple-choice question: seeded with the correct answer,
/// filled with random draws from the distinct possible answers until it
/// reaches `min(OPTION_COUNT, distinct possible answers)` members, returned
/// shuffled. Positions are always distinct, letters may repeat, so the
/// candidate space is deduplicated per mode.
pub fn options(correct: &str, mode: AnswerMode, alphabet: &[char], rng: &mut impl Rng) -> Vec<String> {
    let candidates: Vec<String> = match mode {
        AnswerMode::Number => (1..=alphabet.len()).map(|n| n.to_string()).collect(),
        AnswerMode::Text => {
            let mut seen = HashSet::new();
            alphabet
                .iter()
                .filter(|c| seen.insert(**c))
                .map(|c| c.to_string())
                .collect()
        }
    };
    let target = OPTION_COUNT.min(candidates.len()).max(1);

    let mut set = HashSet::new();
    set.insert(correct.to_string());
    while set.len() < target {
        set.insert(candidates[rng.gen_range(0..candidates.len())].clone());
    }

    let mut out: Vec<String> = set.into_iter().collect();
    out.shuffle(rng);
    out
}
