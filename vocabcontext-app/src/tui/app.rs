use crate::cli::commands::format_wait;
use crate::tui::{
    inputs::{map_event, Action},
    views::{self, Screen},
};
use crossterm::{
    event::{self},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{stdout, Stdout};
use std::sync::Arc;
use tokio::runtime::Runtime;
use vocabcontext_core::{
    session::{check_achievements, current_queue, record_answer},
    study_intensity, Clock, ProgressStore, QueueEntry, ReviewStates, StudyIntensity, SystemClock,
};

pub struct TuiApp {
    pub store: Arc<dyn ProgressStore>,
    pub rt: Arc<Runtime>,
    clock: SystemClock,
    limit: usize,
    queue: Vec<QueueEntry>,
    states: ReviewStates,
    intensity: StudyIntensity,
    sel: usize,
    status: String,
}

impl TuiApp {
    pub fn new(store: Arc<dyn ProgressStore>, rt: Arc<Runtime>, limit: usize) -> Self {
        Self {
            store,
            rt,
            clock: SystemClock,
            limit,
            queue: vec![],
            states: ReviewStates::new(),
            intensity: StudyIntensity::None,
            sel: 0,
            status: String::new(),
        }
    }

    fn refresh(&mut self) {
        let now = self.clock.now();
        let loaded = self.rt.block_on(async {
            let states = self.store.load_states().await?;
            let queue = current_queue(&*self.store, self.limit, now).await?;
            Ok::<_, vocabcontext_core::CoreError>((states, queue))
        });
        match loaded {
            Ok((states, queue)) => {
                self.intensity = study_intensity(&states, now);
                self.states = states;
                self.queue = queue;
            }
            Err(e) => self.status = format!("load failed: {e}"),
        }
        self.sel = self.sel.min(self.queue.len().saturating_sub(1));
    }

    fn answer(&mut self, correct: bool) {
        let Some(entry) = self.queue.get(self.sel).cloned() else { return };
        let now = self.clock.now();
        match self.rt.block_on(record_answer(&*self.store, &entry.item_id, correct, now)) {
            Ok(s) => {
                self.status = format!(
                    "{} {} → next {}",
                    entry.item_id,
                    if correct { "known" } else { "missed" },
                    format_wait(s.next_review - now)
                );
                if let Ok(fresh) = self.rt.block_on(check_achievements(&*self.store, now)) {
                    for a in fresh {
                        self.status.push_str(&format!("  ★ {}", a.name));
                    }
                }
                self.queue.remove(self.sel);
                self.states.insert(entry.item_id, s);
                self.intensity = study_intensity(&self.states, now);
                self.sel = self.sel.min(self.queue.len().saturating_sub(1));
            }
            Err(e) => self.status = format!("save failed: {e}"),
        }
    }

    fn forget(&mut self) {
        let Some(entry) = self.queue.get(self.sel).cloned() else { return };
        match self.rt.block_on(self.store.mark_forgotten(&entry.item_id)) {
            Ok(_) => {
                self.status = format!("{} marked as forgotten", entry.item_id);
                self.refresh();
            }
            Err(e) => self.status = format!("save failed: {e}"),
        }
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        self.refresh();

        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let res = self.mainloop(&mut terminal);

        disable_raw_mode().ok();
        let mut out: Stdout = std::io::stdout();
        execute!(out, LeaveAlternateScreen).ok();
        terminal.show_cursor().ok();

        res
    }

    fn mainloop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
        loop {
            let now = self.clock.now();
            terminal.draw(|f| {
                let detail = self
                    .queue
                    .get(self.sel)
                    .and_then(|e| self.states.get(&e.item_id));
                let screen = Screen {
                    queue: &self.queue,
                    sel: self.sel,
                    detail,
                    intensity: self.intensity,
                    status: &self.status,
                    now,
                };
                views::draw_ui(f, f.size(), &screen);
            })?;

            if event::poll(std::time::Duration::from_millis(100))? {
                match map_event(event::read()?) {
                    Action::Quit => break,
                    Action::Up => self.sel = self.sel.saturating_sub(1),
                    Action::Down => {
                        if self.sel + 1 < self.queue.len() { self.sel += 1; }
                    }
                    Action::Known => self.answer(true),
                    Action::Unknown => self.answer(false),
                    Action::Forget => self.forget(),
                    Action::Refresh => self.refresh(),
                    Action::None => {}
                }
            }
        }
        Ok(())
    }
}
