use crate::config::Config;

/// How a session ends
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum GameMode {
    /// Ends after the given number of answered questions, right or wrong
    #[strum(serialize = "fixed")]
    FixedCount(usize),
    /// Unbounded; a single wrong answer (or timeout) ends the run
    #[strum(serialize = "tournament")]
    Tournament,
}

impl GameMode {
    pub fn is_tournament(&self) -> bool {
        matches!(self, GameMode::Tournament)
    }
}

/// Per-session settings handed to the engine
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub alphabet: Vec<char>,
    pub positive_messages: Vec<String>,
    pub base_timer_ms: u64,
    /// Multiple-choice buttons when true, free-text entry when false
    pub multiple_choice: bool,
}

impl From<&Config> for SessionConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            alphabet: cfg.alphabet.chars().collect(),
            positive_messages: cfg.positive_messages.clone(),
            base_timer_ms: cfg.timer_ms,
            multiple_choice: !cfg.typed,
        }
    }
}

/// Result figures for a finished session
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionSummary {
    /// Wall-clock seconds plus the accumulated wrong-answer penalty
    pub elapsed_secs: f64,
    pub attempted: usize,
    pub correct: usize,
    /// `None` when nothing was attempted
    pub avg_secs: Option<f64>,
}
