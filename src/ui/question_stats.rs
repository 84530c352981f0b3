use itertools::Itertools;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::scores::PromptSummary;
use crate::App;

/// Pure presenter for a single prompt stats row
pub fn present_row(summary: &PromptSummary) -> Row<'static> {
    let miss_color = if summary.miss_rate == 0.0 {
        Color::Green
    } else if summary.miss_rate < 10.0 {
        Color::Yellow
    } else {
        Color::Red
    };

    let (time_display, time_style) = match summary.avg_response_ms {
        Some(avg) => {
            let color = if avg < 1500.0 {
                Color::Green
            } else if avg < 2500.0 {
                Color::Yellow
            } else {
                Color::Red
            };
            (format!("{avg:.0}"), Style::default().fg(color))
        }
        None => ("-".to_string(), Style::default().fg(Color::Gray)),
    };

    Row::new(vec![
        Cell::from(summary.prompt.clone()).style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(summary.attempts.to_string()),
        Cell::from(format!("{:.1}", summary.miss_rate)).style(Style::default().fg(miss_color)),
        Cell::from(time_display).style(time_style),
    ])
}

/// Render the Question Statistics screen, worst prompts first
pub fn render_question_stats(app: &mut App, f: &mut Frame) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(0),    // Stats table
            Constraint::Length(4), // Instructions
        ])
        .split(area);

    let title = Paragraph::new("Question Statistics (worst first)")
        .block(Block::default().borders(Borders::ALL).title("Stats"))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let has_rows = app.stats.as_ref().is_some_and(|s| !s.is_empty());
    if has_rows {
        let summary: Vec<&PromptSummary> = app
            .stats
            .as_ref()
            .map(|s| {
                s.iter()
                    .sorted_by(|a, b| {
                        b.miss_rate
                            .partial_cmp(&a.miss_rate)
                            .unwrap_or(std::cmp::Ordering::Equal)
                            .then(
                                b.avg_response_ms
                                    .partial_cmp(&a.avg_response_ms)
                                    .unwrap_or(std::cmp::Ordering::Equal),
                            )
                    })
                    .collect()
            })
            .unwrap_or_default();

        // borders + header
        let table_height = chunks[1].height.saturating_sub(3) as usize;
        let max_scroll = summary.len().saturating_sub(table_height);
        if app.stats_scroll > max_scroll {
            app.stats_scroll = max_scroll;
        }

        let header = Row::new(vec![
            Cell::from("Prompt"),
            Cell::from("Attempts"),
            Cell::from("Miss Rate (%)"),
            Cell::from("Avg Time (ms)"),
        ])
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

        let visible_rows: Vec<Row> = summary
            .iter()
            .skip(app.stats_scroll)
            .take(table_height)
            .map(|s| present_row(s))
            .collect();

        let widths = [
            Constraint::Length(10), // Prompt
            Constraint::Length(12), // Attempts
            Constraint::Length(16), // Miss Rate
            Constraint::Min(14),    // Avg Time
        ];

        let table = Table::new(visible_rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title("Prompts"))
            .column_spacing(2);

        f.render_widget(table, chunks[1]);
    } else {
        let no_data = Paragraph::new("No answers recorded yet. Finish a session to collect data.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        f.render_widget(no_data, chunks[1]);
    }

    let instructions =
        Paragraph::new("(↑/↓) scroll  (PgUp/PgDn) page  (Home) top  (b/backspace/esc) back")
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
    f.render_widget(instructions, chunks[2]);
}
