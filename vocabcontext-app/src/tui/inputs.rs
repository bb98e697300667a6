use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Up,
    Down,
    Known,
    Unknown,
    Forget,
    Refresh,
    None,
}

pub fn map_event(ev: Event) -> Action {
    if let Event::Key(KeyEvent { code, kind, .. }) = ev {
        if kind != KeyEventKind::Press {
            return Action::None;
        }
        match code {
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            KeyCode::Up | KeyCode::Char('k') => Action::Up,
            KeyCode::Down | KeyCode::Char('j') => Action::Down,
            KeyCode::Char('y') | KeyCode::Char('1') => Action::Known,
            KeyCode::Char('n') | KeyCode::Char('2') => Action::Unknown,
            KeyCode::Char('f') => Action::Forget,
            KeyCode::Char('r') => Action::Refresh,
            _ => Action::None,
        }
    } else {
        Action::None
    }
}
