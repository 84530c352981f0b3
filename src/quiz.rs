use crate::clock::Clock;
use crate::question::{self, Question};
use crate::scores::{time_diff_ms, AnswerRecord, HighScoreRecord, RecordKey, ScoreDb};
use crate::session::{GameMode, SessionConfig, SessionSummary};
use chrono::Local;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// How long a correct-answer affirmation stays on screen
pub const SUCCESS_DELAY_MS: u64 = 300;
/// How long the correction stays on screen after a miss
pub const FAILURE_DELAY_MS: u64 = 800;
/// Tournament Mode shaves this off the budget after every correct answer
pub const TOURNAMENT_STEP_MS: u64 = 100;
/// The budget never shrinks below this
pub const MIN_TIMER_MS: u64 = 1000;

/// Outcome of one answered question, held while feedback is on screen
#[derive(Clone, Debug, PartialEq)]
pub enum Verdict {
    Correct { message: String },
    Wrong { expected: String },
}

impl Verdict {
    pub fn is_correct(&self) -> bool {
        matches!(self, Verdict::Correct { .. })
    }

    pub fn message(&self) -> String {
        match self {
            Verdict::Correct { message } => message.clone(),
            Verdict::Wrong { expected } => {
                format!("Wrong! The correct answer was: {}", expected)
            }
        }
    }
}

/// The engine's state machine. Transitions happen only in `submit` and
/// `on_tick`, so a single tick source drives the whole session.
#[derive(Clone, Debug, PartialEq)]
pub enum Phase {
    AwaitingAnswer { deadline: SystemTime },
    Feedback { verdict: Verdict, until: SystemTime },
    Ended,
}

/// Summary of a finished session plus the stored records it is measured
/// against, with flags for the ones it beat.
#[derive(Clone, Debug)]
pub struct SessionOutcome {
    pub summary: SessionSummary,
    pub iron_man: Option<HighScoreRecord>,
    pub speed_demon: Option<HighScoreRecord>,
    pub new_iron_man: bool,
    pub new_speed_demon: bool,
}

impl SessionOutcome {
    pub fn any_new_record(&self) -> bool {
        self.new_iron_man || self.new_speed_demon
    }
}

/// A quiz session: the working question set, the per-question countdown and
/// the score/time bookkeeping. Wall-clock time comes exclusively from the
/// injected [`Clock`], so tests drive sessions with a manual clock.
#[derive(Debug)]
pub struct Quiz {
    config: SessionConfig,
    mode: GameMode,
    questions: Vec<Question>,
    current_index: usize,
    attempted: usize,
    correct: usize,
    started_at: SystemTime,
    ended_at: Option<SystemTime>,
    /// 2 x the current budget is added here for every wrong answer; reported
    /// elapsed time is wall clock plus this handicap
    penalty_ms: u64,
    /// Current per-question budget; shrinks in Tournament Mode
    timer_ms: u64,
    /// When the active question was put on screen
    armed_at: SystemTime,
    /// Double-submission guard for the active question
    has_answered: bool,
    phase: Phase,
    /// Option set for the active question; empty in typed-input sessions
    options: Vec<String>,
    /// Remaining fraction of the countdown, in [0, 1]
    progress: f64,
    clock: Arc<dyn Clock>,
    db: Option<ScoreDb>,
}

impl Quiz {
    /// Builds the shuffled working set and puts the first question on screen.
    /// A fresh `Quiz` per session is the restart mechanism, so there is never
    /// a stale deadline to cancel.
    pub fn new(
        config: SessionConfig,
        mode: GameMode,
        clock: Arc<dyn Clock>,
        db: Option<ScoreDb>,
    ) -> Self {
        let mut questions = question::shuffled_pool(&config.alphabet);
        if let GameMode::FixedCount(n) = mode {
            questions.truncate(n);
        }

        let now = clock.now();
        let timer_ms = config.base_timer_ms;
        let mut quiz = Self {
            config,
            mode,
            questions,
            current_index: 0,
            attempted: 0,
            correct: 0,
            started_at: now,
            ended_at: None,
            penalty_ms: 0,
            timer_ms,
            armed_at: now,
            has_answered: false,
            phase: Phase::Ended,
            options: Vec::new(),
            progress: 0.0,
            clock,
            db,
        };
        quiz.present();
        quiz
    }

    /// Puts the question at the cursor on screen and arms its countdown.
    /// Past-the-end means the session is over (fixed count) or that a fresh
    /// question gets appended (Tournament).
    fn present(&mut self) {
        self.has_answered = false;

        if self.current_index >= self.questions.len() {
            match self.mode {
                GameMode::FixedCount(_) => {
                    self.end();
                    return;
                }
                GameMode::Tournament => {
                    match question::random_question(&self.config.alphabet, &mut rand::thread_rng())
                    {
                        Some(q) => self.questions.push(q),
                        None => {
                            self.end();
                            return;
                        }
                    }
                }
            }
        }

        let q = &self.questions[self.current_index];
        self.options = if self.config.multiple_choice {
            question::options(
                &q.expected,
                q.mode,
                &self.config.alphabet,
                &mut rand::thread_rng(),
            )
        } else {
            Vec::new()
        };

        let now = self.clock.now();
        self.armed_at = now;
        self.progress = 1.0;
        self.phase = Phase::AwaitingAnswer {
            deadline: now + Duration::from_millis(self.timer_ms),
        };
    }

    /// Evaluates an answer for the active question. `None` is the timeout
    /// auto-submission. A second call for the same question is a no-op.
    pub fn submit(&mut self, answer: Option<&str>) {
        if self.has_answered || !matches!(self.phase, Phase::AwaitingAnswer { .. }) {
            return;
        }
        let Some(q) = self.questions.get(self.current_index).cloned() else {
            return;
        };

        self.has_answered = true;
        self.progress = 0.0;
        self.attempted += 1;

        let now = self.clock.now();
        let is_correct = answer.is_some_and(|a| q.matches(a));

        if let Some(db) = &self.db {
            let _ = db.record_answer(&AnswerRecord {
                prompt: q.prompt.clone(),
                expected: q.expected.clone(),
                given: answer.unwrap_or("").trim().to_string(),
                was_correct: is_correct,
                response_ms: time_diff_ms(self.armed_at, now),
                mode: q.mode,
                timestamp: Local::now(),
            });
        }

        let (verdict, delay_ms) = if is_correct {
            self.correct += 1;
            let message = self
                .config
                .positive_messages
                .choose(&mut rand::thread_rng())
                .cloned()
                .unwrap_or_else(|| "Correct!".to_string());
            (Verdict::Correct { message }, SUCCESS_DELAY_MS)
        } else {
            self.penalty_ms += 2 * self.timer_ms;
            (
                Verdict::Wrong {
                    expected: q.expected,
                },
                FAILURE_DELAY_MS,
            )
        };

        self.phase = Phase::Feedback {
            verdict,
            until: now + Duration::from_millis(delay_ms),
        };
    }

    /// Advances the state machine against the clock: updates the countdown
    /// fraction, auto-submits on expiry, and resolves elapsed feedback.
    pub fn on_tick(&mut self) {
        let now = self.clock.now();
        match &self.phase {
            Phase::AwaitingAnswer { deadline } => {
                let remaining = deadline.duration_since(now).unwrap_or(Duration::ZERO);
                self.progress =
                    (remaining.as_millis() as f64 / self.timer_ms as f64).clamp(0.0, 1.0);
                if remaining.is_zero() && !self.has_answered {
                    self.submit(None);
                }
            }
            Phase::Feedback { verdict, until } => {
                if now >= *until {
                    let was_correct = verdict.is_correct();
                    self.resolve(was_correct);
                }
            }
            Phase::Ended => {}
        }
    }

    /// Feedback delay elapsed: move on or end, depending on mode and verdict
    fn resolve(&mut self, was_correct: bool) {
        if was_correct {
            self.current_index += 1;
            if self.mode.is_tournament() {
                self.timer_ms = MIN_TIMER_MS.max(self.timer_ms.saturating_sub(TOURNAMENT_STEP_MS));
            }
            self.present();
        } else if self.mode.is_tournament() {
            // One miss is terminal
            self.end();
        } else {
            self.current_index += 1;
            self.present();
        }
    }

    fn end(&mut self) {
        self.progress = 0.0;
        self.ended_at = Some(self.clock.now());
        self.phase = Phase::Ended;
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn has_finished(&self) -> bool {
        matches!(self.phase, Phase::Ended)
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn is_multiple_choice(&self) -> bool {
        self.config.multiple_choice
    }

    /// Remaining fraction of the active countdown, in [0, 1]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// 1-based number of the question on screen
    pub fn question_number(&self) -> usize {
        self.current_index + 1
    }

    /// Total question count for fixed sessions; unbounded in Tournament
    pub fn total_questions(&self) -> Option<usize> {
        match self.mode {
            GameMode::FixedCount(_) => Some(self.questions.len()),
            GameMode::Tournament => None,
        }
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn timer_ms(&self) -> u64 {
        self.timer_ms
    }

    pub fn attempted(&self) -> usize {
        self.attempted
    }

    pub fn correct_count(&self) -> usize {
        self.correct
    }

    pub fn scores(&self) -> Option<&ScoreDb> {
        self.db.as_ref()
    }

    pub fn summary(&self) -> SessionSummary {
        let end = self.ended_at.unwrap_or_else(|| self.clock.now());
        let elapsed_ms = time_diff_ms(self.started_at, end) + self.penalty_ms;
        let elapsed_secs = elapsed_ms as f64 / 1000.0;
        let avg_secs = if self.attempted > 0 {
            Some(elapsed_secs / self.attempted as f64)
        } else {
            None
        };

        SessionSummary {
            elapsed_secs,
            attempted: self.attempted,
            correct: self.correct,
            avg_secs,
        }
    }

    /// Summary plus record comparison. Records are read, not written; the
    /// caller commits after collecting a holder name.
    pub fn outcome(&self) -> SessionOutcome {
        let summary = self.summary();
        let iron_man = self
            .db
            .as_ref()
            .and_then(|db| db.get_record(RecordKey::IronMan).ok().flatten());
        let speed_demon = self
            .db
            .as_ref()
            .and_then(|db| db.get_record(RecordKey::SpeedDemon).ok().flatten());

        let new_iron_man = summary.correct > 0
            && iron_man
                .as_ref()
                .map_or(true, |r| summary.correct as f64 > r.value);
        let new_speed_demon = summary.avg_secs.map_or(false, |avg| {
            speed_demon.as_ref().map_or(true, |r| avg < r.value)
        });

        SessionOutcome {
            summary,
            iron_man,
            speed_demon,
            new_iron_man,
            new_speed_demon,
        }
    }

    /// Persists every record this session beat under the given holder name
    /// and refreshes the outcome's stored-record fields.
    pub fn commit_records(&self, outcome: &mut SessionOutcome, name: &str) {
        let Some(db) = &self.db else { return };
        let name = name.trim();
        let holder = if name.is_empty() { "anonymous" } else { name };

        if outcome.new_iron_man
            && db
                .set_record(RecordKey::IronMan, outcome.summary.correct as f64, holder)
                .is_ok()
        {
            outcome.iron_man = db.get_record(RecordKey::IronMan).ok().flatten();
        }
        if outcome.new_speed_demon {
            if let Some(avg) = outcome.summary.avg_secs {
                if db.set_record(RecordKey::SpeedDemon, avg, holder).is_ok() {
                    outcome.speed_demon = db.get_record(RecordKey::SpeedDemon).ok().flatten();
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn questions(&self) -> &[Question] {
        &self.questions
    }
}
