use crate::cli::commands::{format_wait, kind_label};
use crate::tui::theme::*;
use chrono::{DateTime, Utc};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};
use vocabcontext_core::{QueueEntry, ReviewState, StudyIntensity};

pub struct Screen<'a> {
    pub queue: &'a [QueueEntry],
    pub sel: usize,
    pub detail: Option<&'a ReviewState>,
    pub intensity: StudyIntensity,
    pub status: &'a str,
    pub now: DateTime<Utc>,
}

pub fn draw_ui(f: &mut Frame, area: Rect, screen: &Screen) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(2)])
        .split(area);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[0]);

    draw_queue(f, cols[0], screen);
    draw_item(f, cols[1], screen);

    let foot = Paragraph::new(vec![
        Line::from(Span::raw(screen.status)),
        Line::from(vec![
            Span::raw(" ↑/k ↓/j select  "),
            Span::raw(" y know  "),
            Span::raw(" n don't know  "),
            Span::raw(" f forget  "),
            Span::raw(" r refresh  "),
            Span::raw(" q quit "),
        ])
        .style(footer_style()),
    ]);
    f.render_widget(foot, rows[1]);
}

fn draw_queue(f: &mut Frame, area: Rect, screen: &Screen) {
    let items: Vec<_> = screen
        .queue
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let line = Line::from(vec![
                Span::raw(format!("{:<20}", e.item_id)),
                Span::styled(format!(" {:>9}", kind_label(e.kind)), kind_style(e.kind)),
                Span::raw(format!(" {:>6}", e.priority)),
            ]);
            let line = if i == screen.sel { line.style(selected_style()) } else { line };
            ListItem::new(line)
        })
        .collect();

    let title = Line::from(vec![
        Span::raw("Queue ").style(title_style()),
        Span::raw(format!("({}) ", screen.queue.len())),
        Span::styled(screen.intensity.to_string(), intensity_style(screen.intensity)),
    ]);
    let list = List::new(items).block(Block::default().title(title).borders(Borders::ALL));
    f.render_widget(list, area);
}

fn draw_item(f: &mut Frame, area: Rect, screen: &Screen) {
    let block = Block::default().title("Item").borders(Borders::ALL);
    let Some(entry) = screen.queue.get(screen.sel) else {
        let p = Paragraph::new("Nothing due. Press r to refresh.")
            .wrap(Wrap { trim: true })
            .block(block);
        f.render_widget(p, area);
        return;
    };

    let mut text = vec![
        Line::from(Span::raw(entry.item_id.as_str()).style(title_style())),
        Line::from(""),
    ];
    match screen.detail {
        Some(s) => {
            text.push(Line::from(format!("level      {}", s.interval_level)));
            text.push(Line::from(format!("ease       {:.2}", s.ease_factor)));
            text.push(Line::from(format!(
                "answers    {} ({} right, {} wrong)",
                s.review_count, s.correct_count, s.incorrect_count
            )));
            let due = if s.is_due(screen.now) {
                format!("overdue by {}m", s.overdue_minutes(screen.now))
            } else {
                format_wait(s.next_review - screen.now)
            };
            text.push(Line::from(format!("due        {due}")));
        }
        None => text.push(Line::from(Span::raw("not studied yet").style(hint_style()))),
    }

    let p = Paragraph::new(text).wrap(Wrap { trim: true }).block(block);
    f.render_widget(p, area);
}
