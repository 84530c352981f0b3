pub mod question_stats;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Gauge, Paragraph, Widget, Wrap},
};

use crate::quiz::{Phase, Quiz, Verdict};
use crate::{App, AppState};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::Start => render_start(self, area, buf),
            AppState::Quiz => {
                if let Some(quiz) = &self.quiz {
                    render_quiz(self, quiz, area, buf);
                }
            }
            AppState::EnterName => render_name_entry(self, area, buf),
            AppState::Results => render_results(self, area, buf),
            // Rendered by a dedicated function that needs &mut for scrolling
            AppState::PromptStats => {}
        }
    }
}

/// Vertically centered block of `height` lines inside `area`
fn centered(area: Rect, height: u16) -> Rect {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);
    chunks[1]
}

fn render_start(app: &App, area: Rect, buf: &mut Buffer) {
    let letters = app.config.alphabet.chars().count();
    let full_pool = letters * 2;

    let lines = vec![
        Line::from(Span::styled(
            "alphadrill",
            bold().fg(Color::Magenta),
        )),
        Line::from(""),
        Line::from(Span::raw(
            "match letters to their alphabet positions before the timer runs out",
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(
                "(1) 10 questions   (2) 20 questions   (3) full pool ({})",
                full_pool
            ),
            bold(),
        )),
        Line::from(Span::styled(
            "(t) tournament - one miss ends the run, the timer tightens as you go",
            bold(),
        )),
        Line::from(Span::styled(
            format!(
                "(i) input style: {}",
                if app.config.typed {
                    "typed answers"
                } else {
                    "multiple choice"
                }
            ),
            bold(),
        )),
        Line::from(Span::styled(
            format!(
                "(enter) last used: {}",
                if app.config.tournament {
                    "tournament".to_string()
                } else {
                    format!("{} questions", app.config.question_count)
                }
            ),
            bold(),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(
                "{} letters | {:.1}s per question",
                letters,
                app.config.timer_ms as f64 / 1000.0
            ),
            dim(),
        )),
        Line::from(Span::styled(
            "(esc) quit",
            dim().add_modifier(Modifier::ITALIC),
        )),
    ];

    let height = lines.len() as u16;
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(centered(area, height), buf);
}

fn render_quiz(app: &App, quiz: &Quiz, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // question counter
            Constraint::Min(0),
            Constraint::Length(1), // prompt
            Constraint::Length(1),
            Constraint::Length(1), // options / typed entry
            Constraint::Length(1),
            Constraint::Length(1), // countdown gauge
            Constraint::Length(1),
            Constraint::Length(1), // feedback
            Constraint::Min(0),
        ])
        .split(area);

    let counter = match quiz.total_questions() {
        Some(total) => format!("Question {} / {}", quiz.question_number(), total),
        None => format!("Question {}", quiz.question_number()),
    };
    Paragraph::new(Span::styled(counter, dim()))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    if let Some(q) = quiz.current_question() {
        Paragraph::new(Span::styled(
            q.prompt.clone(),
            bold().fg(Color::Magenta),
        ))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);
    }

    if quiz.is_multiple_choice() {
        let spans: Vec<Span> = quiz
            .options()
            .iter()
            .enumerate()
            .flat_map(|(i, opt)| {
                vec![
                    Span::styled(format!("({}) ", i + 1), dim()),
                    Span::styled(format!("{}   ", opt), bold()),
                ]
            })
            .collect();
        Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .render(chunks[4], buf);
    } else {
        Paragraph::new(Line::from(vec![
            Span::styled("> ", dim()),
            Span::styled(app.typed_input.clone(), bold()),
            Span::styled("_", bold().add_modifier(Modifier::SLOW_BLINK)),
        ]))
        .alignment(Alignment::Center)
        .render(chunks[4], buf);
    }

    // Countdown: proportional remaining time, colored as it drains
    let progress = quiz.progress();
    let gauge_color = if progress > 0.5 {
        Color::Green
    } else if progress > 0.2 {
        Color::Yellow
    } else {
        Color::Red
    };
    let seconds_left = progress * quiz.timer_ms() as f64 / 1000.0;
    Gauge::default()
        .gauge_style(Style::default().fg(gauge_color))
        .ratio(progress.clamp(0.0, 1.0))
        .label(format!("{:.1}s", seconds_left))
        .render(chunks[6], buf);

    if let Phase::Feedback { verdict, .. } = quiz.phase() {
        let style = match verdict {
            Verdict::Correct { .. } => bold().fg(Color::Green),
            Verdict::Wrong { .. } => bold().fg(Color::Red),
        };
        Paragraph::new(Span::styled(verdict.message(), style))
            .alignment(Alignment::Center)
            .render(chunks[8], buf);
    }
}

fn render_name_entry(app: &App, area: Rect, buf: &mut Buffer) {
    let mut beaten = Vec::new();
    if let Some(outcome) = &app.outcome {
        if outcome.new_iron_man {
            beaten.push(format!("Iron Man ({} correct)", outcome.summary.correct));
        }
        if outcome.new_speed_demon {
            if let Some(avg) = outcome.summary.avg_secs {
                beaten.push(format!("Speed Demon ({:.2} s/question)", avg));
            }
        }
    }

    let lines = vec![
        Line::from(Span::styled("New record!", bold().fg(Color::Green))),
        Line::from(Span::raw(beaten.join("  |  "))),
        Line::from(""),
        Line::from(vec![
            Span::styled("name: ", dim()),
            Span::styled(app.name_input.clone(), bold()),
            Span::styled("_", bold().add_modifier(Modifier::SLOW_BLINK)),
        ]),
        Line::from(Span::styled(
            "(enter) save",
            dim().add_modifier(Modifier::ITALIC),
        )),
    ];

    let height = lines.len() as u16;
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(centered(area, height), buf);
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(outcome) = &app.outcome else {
        Paragraph::new(Span::styled("no finished session", dim()))
            .alignment(Alignment::Center)
            .render(centered(area, 1), buf);
        return;
    };
    let summary = &outcome.summary;

    let avg = match summary.avg_secs {
        Some(avg) => format!("{:.2} s", avg),
        None => "-".to_string(),
    };

    let new_marker = |is_new: bool| {
        if is_new {
            Span::styled(" (new!)", bold().fg(Color::Yellow))
        } else {
            Span::raw("")
        }
    };

    let iron_man = match &outcome.iron_man {
        Some(rec) => format!("Iron Man: {:.0} correct - {}", rec.value, rec.holder),
        None => "Iron Man: none yet".to_string(),
    };
    let speed_demon = match &outcome.speed_demon {
        Some(rec) => format!("Speed Demon: {:.2} s/question - {}", rec.value, rec.holder),
        None => "Speed Demon: none yet".to_string(),
    };

    let lines = vec![
        Line::from(Span::styled("Results", bold().fg(Color::Magenta))),
        Line::from(""),
        Line::from(Span::raw(format!(
            "completed in {:.2} s",
            summary.elapsed_secs
        ))),
        Line::from(Span::raw(format!("average per question: {}", avg))),
        Line::from(Span::styled(
            format!(
                "correct answers: {} / {}",
                summary.correct, summary.attempted
            ),
            bold(),
        )),
        Line::from(""),
        Line::from(Span::styled("High scores", bold())),
        Line::from(vec![
            Span::raw(iron_man),
            new_marker(outcome.new_iron_man),
        ]),
        Line::from(vec![
            Span::raw(speed_demon),
            new_marker(outcome.new_speed_demon),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "(r)estart  (s)tats  (x) reset scores  (esc) menu  (q)uit",
            dim().add_modifier(Modifier::ITALIC),
        )),
    ];

    let height = lines.len() as u16;
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(centered(area, height), buf);
}
