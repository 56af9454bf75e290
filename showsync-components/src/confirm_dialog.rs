//! Confirmation prompt dialog
//!
//! Renders the prompt a [`ConfirmationBroker`] is presenting and turns key
//! presses into answers. The dialog is modal: while a prompt is up, every key
//! goes to it.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
    Frame,
};
use showsync_core::{ConfirmStyle, ConfirmationBroker, Prompt};

use crate::modal::{centered_rect, render_modal, ModalStyle};

/// Appearance of the confirmation dialog
#[derive(Clone, Debug)]
pub struct DialogStyle {
    pub modal: ModalStyle,
    pub width: u16,
    pub border: Color,
    pub confirm: Color,
    /// Confirm button color for destructive prompts
    pub destructive: Color,
}

impl Default for DialogStyle {
    fn default() -> Self {
        Self {
            modal: ModalStyle::with_bg(Color::Rgb(24, 24, 32)),
            width: 56,
            border: Color::Cyan,
            confirm: Color::Green,
            destructive: Color::Red,
        }
    }
}

/// Map a key to an answer: `y`/Enter confirm, `n`/Esc cancel.
pub fn answer_for_key(key: &KeyEvent) -> Option<bool> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => Some(true),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Some(false),
        _ => None,
    }
}

/// Feed a key to the broker's presented prompt.
///
/// Returns `true` when a prompt is up, meaning the key belongs to the dialog
/// whether or not it answered it.
pub fn handle_confirmation_key(broker: &ConfirmationBroker, key: &KeyEvent) -> bool {
    if broker.current().is_none() {
        return false;
    }
    if let Some(confirmed) = answer_for_key(key) {
        broker.answer(confirmed);
    }
    true
}

/// Render `prompt` centered over the whole frame.
///
/// Call after rendering the rest of the screen.
pub fn render_confirmation(frame: &mut Frame, prompt: &Prompt, style: &DialogStyle) {
    let content = &prompt.content;
    let inner_width = style.width.saturating_sub(4).max(1) as usize;
    let message_lines = content
        .message
        .lines()
        .map(|line| line.chars().count().div_ceil(inner_width).max(1))
        .sum::<usize>();
    let height = u16::try_from(message_lines).unwrap_or(u16::MAX).saturating_add(5);

    let area = centered_rect(style.width, height, frame.area());
    render_modal(frame, area, &style.modal);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(style.border))
        .title(Span::styled(
            format!(" {} ", content.title),
            Style::default().add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [message_area, _, buttons_area] = Layout::vertical([
        Constraint::Min(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(inner.inner(ratatui::layout::Margin::new(1, 0)));

    frame.render_widget(
        Paragraph::new(content.message.as_str()).wrap(Wrap { trim: true }),
        message_area,
    );
    frame.render_widget(buttons(prompt, style), buttons_area);
}

fn buttons<'a>(prompt: &'a Prompt, style: &DialogStyle) -> Paragraph<'a> {
    let content = &prompt.content;
    let confirm_color = match content.confirm_style {
        ConfirmStyle::Destructive => style.destructive,
        ConfirmStyle::Default => style.confirm,
    };
    let key = Style::default().fg(Color::DarkGray);

    Paragraph::new(Line::from(vec![
        Span::styled("[n] ", key),
        Span::raw(content.cancel_label()),
        Span::raw("   "),
        Span::styled("[y] ", key),
        Span::styled(
            content.confirm_label(),
            Style::default()
                .fg(confirm_color)
                .add_modifier(Modifier::BOLD),
        ),
    ]))
    .alignment(Alignment::Right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use ratatui::{backend::TestBackend, Terminal};
    use showsync_core::{ConfirmationContent, PromptId};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn render(prompt: &Prompt) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal
            .draw(|frame| {
                frame.render_widget(Paragraph::new("cue list underneath"), frame.area());
                render_confirmation(frame, prompt, &DialogStyle::default());
            })
            .unwrap();

        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    fn prompt(content: ConfirmationContent) -> Prompt {
        let broker = ConfirmationBroker::new();
        let _pending = broker.show_confirmation(content);
        broker.current().unwrap()
    }

    #[test]
    fn test_answer_for_key() {
        assert_eq!(answer_for_key(&key(KeyCode::Char('y'))), Some(true));
        assert_eq!(answer_for_key(&key(KeyCode::Enter)), Some(true));
        assert_eq!(answer_for_key(&key(KeyCode::Char('n'))), Some(false));
        assert_eq!(answer_for_key(&key(KeyCode::Esc)), Some(false));
        assert_eq!(answer_for_key(&key(KeyCode::Char('q'))), None);

        let mut release = key(KeyCode::Enter);
        release.kind = KeyEventKind::Release;
        assert_eq!(answer_for_key(&release), None);
    }

    #[test]
    fn test_renders_title_message_and_labels() {
        let content = ConfirmationContent::new(
            "Disarm performance mode",
            "Do you really want to disarm the performance mode?",
        )
        .confirm_text("Disarm")
        .destructive();
        let text = render(&prompt(content));

        assert!(text.contains("Disarm performance mode"));
        assert!(text.contains("Do you really want to disarm"));
        assert!(text.contains("[y] Disarm"));
        assert!(text.contains("[n] Cancel"));
    }

    #[tokio::test]
    async fn test_keys_answer_presented_prompt() {
        let broker = ConfirmationBroker::new();
        assert!(!handle_confirmation_key(&broker, &key(KeyCode::Char('y'))));

        let first = broker.show_confirmation(ConfirmationContent::new("Delete cue", "Delete 1.0?"));
        let second = broker.show_confirmation(ConfirmationContent::new("Delete cue", "Delete 2.0?"));

        // Unmapped keys are swallowed while the dialog is up
        assert!(handle_confirmation_key(&broker, &key(KeyCode::Char('x'))));
        assert_eq!(broker.pending(), 2);

        assert!(handle_confirmation_key(&broker, &key(KeyCode::Esc)));
        assert!(handle_confirmation_key(&broker, &key(KeyCode::Enter)));

        assert!(!first.await);
        assert!(second.await);
        assert_eq!(broker.current().map(|p| p.id), None::<PromptId>);
    }
}
