//! Perform console: cue list, perform mode, playback
//!
//! Keys are bound through a [`ScopedListener`] on the terminal whose
//! dependency is the armed flag, so the binding is swapped whenever perform
//! mode is armed or disarmed. Host work runs on spawned tasks that report
//! back with an [`Outcome`].

use std::collections::HashSet;
use std::future::Future;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};
use showsync::model::{Cue, CueId, Show, ShowState};
use showsync::{
    ConfirmationBroker, ConfirmationContent, HostBridge, HostCommands, KeyDown, ScopedListener,
    TerminalEvents,
};
use showsync_components::{render_confirmation, DialogStyle};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// DCA columns shown in the cue table.
const DCA_COLUMNS: usize = 4;

/// What a key press asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    Up,
    Down,
    Go,
    ToggleArm,
    AddCue,
    DeleteCue,
    Quit,
}

/// Result of host work started by an intent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The host went to the cue at `index`
    Went { index: usize },
    Disarmed,
    CueDeleted(CueId),
    Failed(String),
}

#[derive(Debug)]
pub enum Msg {
    Intent(Intent),
    Outcome(Outcome),
}

pub fn disarm_confirmation() -> ConfirmationContent {
    ConfirmationContent::new(
        "Disarm performance mode",
        "Do you really want to disarm the performance mode?",
    )
    .confirm_text("Disarm")
}

fn delete_confirmation(cue: &Cue) -> ConfirmationContent {
    ConfirmationContent::new(
        "Delete cue",
        format!("Delete cue {} \"{}\"? This cannot be undone.", cue.id, cue.name),
    )
    .confirm_text("Delete")
    .destructive()
}

/// Key map. Editing keys only work while disarmed, playback only while armed.
pub fn intent_for_key(key: &KeyEvent, armed: bool) -> Option<Intent> {
    match key.code {
        KeyCode::Up => Some(Intent::Up),
        KeyCode::Down => Some(Intent::Down),
        KeyCode::Char('p') => Some(Intent::ToggleArm),
        KeyCode::Char('q') => Some(Intent::Quit),
        KeyCode::Char(' ') if armed => Some(Intent::Go),
        KeyCode::Char('a') if !armed => Some(Intent::AddCue),
        KeyCode::Char('d') if !armed => Some(Intent::DeleteCue),
        _ => None,
    }
}

pub type KeyBinding = ScopedListener<TerminalEvents, KeyDown, bool>;

fn keymap(tx: mpsc::UnboundedSender<Msg>, armed: bool) -> impl Fn(&KeyEvent) + Send + Sync + 'static {
    move |key| {
        if let Some(intent) = intent_for_key(key, armed) {
            let _ = tx.send(Msg::Intent(intent));
        }
    }
}

/// Bind the key map for the given armed state.
pub fn bind_keys(events: &TerminalEvents, tx: &mpsc::UnboundedSender<Msg>, armed: bool) -> KeyBinding {
    ScopedListener::bind_with_deps(events.clone(), armed, keymap(tx.clone(), armed))
}

/// Re-bind the key map if the armed state changed.
pub fn rebind_keys(binding: &mut KeyBinding, tx: &mpsc::UnboundedSender<Msg>, armed: bool) -> bool {
    binding.update(armed, |&armed| keymap(tx.clone(), armed))
}

/// Local view state.
#[derive(Debug, Default)]
pub struct PerformState {
    pub armed: bool,
    pub selected: Option<usize>,
    /// Cues deleted from this console. Deletions are not broadcast, so the
    /// replica still lists them.
    pub deleted: HashSet<CueId>,
    pub status: Option<String>,
    pub quit: bool,
}

impl PerformState {
    pub fn visible_cues<'a>(&self, show: &'a Show) -> Vec<&'a Cue> {
        show.cues
            .iter()
            .filter(|cue| !self.deleted.contains(&cue.id))
            .collect()
    }

    /// Move the selection by `delta`, wrapping around.
    pub fn step(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.selected = None;
            return;
        }
        let next = match self.selected {
            None => 0,
            Some(index) => (index as isize + delta).rem_euclid(len as isize) as usize,
        };
        self.selected = Some(next);
    }

    /// Keep the selection inside a list of `len` cues.
    pub fn clamp(&mut self, len: usize) {
        if let Some(index) = self.selected {
            self.selected = len.checked_sub(1).map(|last| index.min(last));
        }
    }

    pub fn apply(&mut self, outcome: Outcome, show: &Show) {
        match outcome {
            Outcome::Went { index } => {
                self.selected = Some(index);
                self.step(1, self.visible_cues(show).len());
                self.status = None;
            }
            Outcome::Disarmed => {
                self.armed = false;
                info!("Perform mode disarmed");
                self.status = Some("Disarmed".into());
            }
            Outcome::CueDeleted(id) => {
                self.deleted.insert(id);
                self.clamp(self.visible_cues(show).len());
                self.status = Some(format!("Deleted cue {id}"));
            }
            Outcome::Failed(message) => {
                self.status = Some(message);
            }
        }
    }
}

/// The console: view state plus the handles its host work needs.
pub struct Perform<B: HostBridge> {
    pub state: PerformState,
    commands: HostCommands<B>,
    broker: ConfirmationBroker,
    tx: mpsc::UnboundedSender<Msg>,
}

impl<B: HostBridge> Perform<B> {
    pub fn new(
        commands: HostCommands<B>,
        broker: ConfirmationBroker,
        tx: mpsc::UnboundedSender<Msg>,
    ) -> Self {
        Self {
            state: PerformState::default(),
            commands,
            broker,
            tx,
        }
    }

    pub fn handle(&mut self, msg: Msg, show: &Show) {
        match msg {
            Msg::Intent(intent) => self.intent(intent, show),
            Msg::Outcome(outcome) => self.state.apply(outcome, show),
        }
    }

    fn intent(&mut self, intent: Intent, show: &Show) {
        debug!(?intent, armed = self.state.armed, "Intent");
        let cues = self.state.visible_cues(show);
        let selected = self
            .state
            .selected
            .and_then(|index| cues.get(index).map(|cue| (index, *cue)));

        match intent {
            Intent::Up => self.state.step(-1, cues.len()),
            Intent::Down => self.state.step(1, cues.len()),
            Intent::Quit => self.state.quit = true,
            Intent::ToggleArm if !self.state.armed => {
                self.state.armed = true;
                self.state.selected = (!cues.is_empty()).then_some(0);
                self.state.status = None;
                info!("Perform mode armed");
            }
            Intent::ToggleArm => {
                let confirmation = self.broker.show_confirmation(disarm_confirmation());
                self.spawn(async move { confirmation.await.then_some(Outcome::Disarmed) });
            }
            Intent::Go => {
                let Some((index, cue)) = selected.filter(|_| self.state.armed) else {
                    return;
                };
                let cue_id = cue.id;
                let commands = self.commands.clone();
                self.spawn(async move {
                    Some(match commands.goto_cue(cue_id).await {
                        Ok(()) => Outcome::Went { index },
                        Err(err) => Outcome::Failed(err.to_string()),
                    })
                });
            }
            Intent::AddCue => {
                let commands = self.commands.clone();
                self.spawn(async move {
                    commands
                        .add_cue()
                        .await
                        .err()
                        .map(|err| Outcome::Failed(err.to_string()))
                });
            }
            Intent::DeleteCue => {
                let Some((_, cue)) = selected else {
                    return;
                };
                let cue_id = cue.id;
                let confirmation = self.broker.show_confirmation(delete_confirmation(cue));
                let commands = self.commands.clone();
                self.spawn(async move {
                    if !confirmation.await {
                        return None;
                    }
                    Some(match commands.delete_cue(cue_id).await {
                        Ok(()) => Outcome::CueDeleted(cue_id),
                        Err(err) => Outcome::Failed(err.to_string()),
                    })
                });
            }
        }
    }

    fn spawn(&self, work: impl Future<Output = Option<Outcome>> + Send + 'static) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            if let Some(outcome) = work.await {
                let _ = tx.send(Msg::Outcome(outcome));
            }
        });
    }

    pub fn render(&self, frame: &mut Frame, show: &Show, show_state: &ShowState) {
        let [header, body, footer] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .areas(frame.area());

        render_header(frame, header, &self.state);
        render_cues(frame, body, show, show_state, &self.state);
        render_footer(frame, footer, &self.state);

        if let Some(prompt) = self.broker.current() {
            render_confirmation(frame, &prompt, &DialogStyle::default());
        }
    }
}

fn render_header(frame: &mut Frame, area: Rect, state: &PerformState) {
    let mode = if state.armed {
        Span::styled(
            "ARMED",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled("disarmed", Style::default().fg(Color::Green))
    };
    let line = Line::from(vec![Span::raw("Perform mode: "), mode]);
    frame.render_widget(
        Paragraph::new(line).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

fn render_cues(frame: &mut Frame, area: Rect, show: &Show, show_state: &ShowState, state: &PerformState) {
    let header = ["", "Cue", "Name"]
        .into_iter()
        .map(String::from)
        .chain((1..=DCA_COLUMNS).map(|dca| format!("DCA {dca}")))
        .map(Cell::from);

    let rows = state.visible_cues(show).into_iter().map(|cue| {
        let current = state.armed && show_state.current_cue_id == Some(cue.id);
        let marker = if current { "▶" } else { "" };
        let dcas = cue
            .dca
            .assignment
            .iter()
            .take(DCA_COLUMNS)
            .map(|assignment| Cell::from(show.assignment_label(*assignment)));

        let row = Row::new(
            [
                Cell::from(marker),
                Cell::from(cue.id.to_string()),
                Cell::from(cue.name.clone()),
            ]
            .into_iter()
            .chain(dcas),
        );
        if current {
            row.style(Style::default().fg(Color::Yellow))
        } else {
            row
        }
    });

    let widths = [Constraint::Length(2), Constraint::Length(6), Constraint::Min(12)]
        .into_iter()
        .chain(std::iter::repeat(Constraint::Length(18)).take(DCA_COLUMNS));

    let table = Table::new(rows, widths)
        .header(Row::new(header).style(Style::default().add_modifier(Modifier::BOLD)))
        .block(Block::default().borders(Borders::ALL).title(" Cues "))
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut table_state = TableState::default().with_selected(state.selected);
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn render_footer(frame: &mut Frame, area: Rect, state: &PerformState) {
    let help = if state.armed {
        "↑/↓ select  space go  p disarm  q quit"
    } else {
        "↑/↓ select  a add cue  d delete cue  p arm  q quit"
    };
    let mut spans = vec![Span::styled(help, Style::default().fg(Color::DarkGray))];
    if let Some(status) = &state.status {
        spans.push(Span::raw("  |  "));
        spans.push(Span::raw(status.as_str()));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL)),
        area,
    );
}
