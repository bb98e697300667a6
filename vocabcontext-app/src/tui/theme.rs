use ratatui::style::{Color, Style, Stylize};
use vocabcontext_core::{QueueKind, StudyIntensity};

pub fn title_style() -> Style { Style::default().fg(Color::Cyan).bold() }
pub fn hint_style() -> Style { Style::default().fg(Color::DarkGray) }
pub fn selected_style() -> Style { Style::default().fg(Color::Yellow).bold() }
pub fn footer_style() -> Style { Style::default().fg(Color::Gray) }

pub fn kind_style(kind: QueueKind) -> Style {
    match kind {
        QueueKind::Forgotten => Style::default().fg(Color::Magenta),
        QueueKind::Review => Style::default(),
    }
}

pub fn intensity_style(i: StudyIntensity) -> Style {
    let c = match i {
        StudyIntensity::None | StudyIntensity::Light => Color::Green,
        StudyIntensity::Moderate => Color::Yellow,
        StudyIntensity::Heavy => Color::LightRed,
        StudyIntensity::Intense => Color::Red,
    };
    Style::default().fg(c).bold()
}
